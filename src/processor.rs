//! The `StreamProcessor` / `EventProcessor` contracts supplied by the user,
//! and the `LifecycleContext` / `StateResource` plumbing the controller uses
//! to drive them deterministically.

use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;

use crate::log::{LogWriter, Position, Record};

/// A boxed, owned future, used for the single deferred-completion slot a
/// handler may register in phase 1.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The user processor's recoverable state. The controller calls `reset` at
/// start, `restore_from` during recovery, `serialize_to` during snapshot,
/// and hands a `&mut dyn StateResource` to the handler during phase 4. No
/// other component touches it.
pub trait StateResource: Send {
    /// Return to the initial (pre-any-record) state.
    fn reset(&mut self);

    /// Serialize the current state into an opaque blob for snapshotting.
    fn serialize_to(&self) -> Vec<u8>;

    /// Restore state from a previously-serialized blob.
    fn restore_from(&mut self, bytes: &[u8]) -> anyhow::Result<()>;
}

/// Context passed to `StreamProcessor::on_open`.
pub struct OpenContext<'a> {
    pub name: &'a str,
}

/// Whether a handler is running under reprocessing (deterministic replay,
/// no side-effects or writes) or under live processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingMode {
    Reprocessing,
    Live,
}

/// Per-event context handed to `EventProcessor::process`. Lets the handler
/// register a deferred completion (phase 1 produces its result *later*,
/// e.g. after an async lookup) instead of returning synchronously.
pub struct LifecycleContext {
    mode: ProcessingMode,
    deferred: Option<BoxFuture<'static, anyhow::Result<()>>>,
}

impl LifecycleContext {
    #[must_use]
    pub fn new(mode: ProcessingMode) -> Self {
        Self {
            mode,
            deferred: None,
        }
    }

    #[must_use]
    pub fn mode(&self) -> ProcessingMode {
        self.mode
    }

    #[must_use]
    pub fn is_reprocessing(&self) -> bool {
        self.mode == ProcessingMode::Reprocessing
    }

    /// Register a future the controller must await before phase 1 is
    /// considered complete. Only one deferred completion may be registered
    /// per handler; a second call replaces the first.
    pub fn defer(&mut self, future: impl Future<Output = anyhow::Result<()>> + Send + 'static) {
        self.deferred = Some(Box::pin(future));
    }

    /// Consumed by the controller after `process` returns: awaits the
    /// registered completion, if any.
    pub(crate) async fn take_deferred(&mut self) -> anyhow::Result<()> {
        match self.deferred.take() {
            Some(future) => future.await,
            None => Ok(()),
        }
    }
}

/// Per-record, single-use four-phase handler: process → side-effects →
/// write → update-state.
#[async_trait]
pub trait EventProcessor: Send {
    /// Phase 1: decide what to do with this record. May register a deferred
    /// completion on `ctx` instead of finishing synchronously.
    async fn process(&mut self, ctx: &mut LifecycleContext) -> anyhow::Result<()>;

    /// Phase 2: execute side-effects. `Ok(false)` means "transient failure,
    /// retry"; never executed during reprocessing.
    async fn execute_side_effects(&mut self) -> anyhow::Result<bool>;

    /// Phase 3: append output via `writer`, returning the assigned position
    /// (negative means transient, retry). Never invoked for read-only
    /// processors or during reprocessing.
    async fn write_event(&mut self, writer: &mut dyn LogWriter) -> anyhow::Result<Position>;

    /// Phase 4: mutate `state`. The only phase that also runs during
    /// reprocessing.
    async fn update_state(&mut self, state: &mut dyn StateResource) -> anyhow::Result<()>;
}

/// The user-supplied per-partition processor: decides which records get a
/// handler and owns the recoverable state resource.
#[async_trait]
pub trait StreamProcessor: Send {
    /// Called once after recovery (snapshot load, if any) and before
    /// reprocessing/running begins.
    async fn on_open(&mut self, _ctx: &OpenContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Produce a handler for `record`, or `None` to skip it entirely. Called
    /// identically during reprocessing and live running.
    fn on_event(&mut self, record: &Record) -> Option<Box<dyn EventProcessor>>;

    /// Called once reprocessing has finished and the controller is about to
    /// enter `Running`. A no-op if there was nothing to reprocess.
    async fn on_recovered(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called during `Closing`, after the final snapshot attempt.
    async fn on_close(&mut self) {}

    fn state_resource(&self) -> &dyn StateResource;
    fn state_resource_mut(&mut self) -> &mut dyn StateResource;
}
