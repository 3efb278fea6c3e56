//! The controller state machine (§4.1/§4.2): this crate's core. Drives a
//! user `StreamProcessor` through recovery, reprocessing, and live running,
//! and owns every piece of mutable state described in §3 — no other task
//! may touch it, which is what lets the rest of this crate assume strict
//! serial, single-writer semantics.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;

use crate::config::{ControllerConfig, SchedulingHint};
use crate::error::{ControllerError, ControllerResult};
use crate::filter::EventFilter;
use crate::log::{Log, LogReader, LogWriter, Position, Record};
use crate::metrics::{MetricsSink, NoopMetrics};
use crate::processor::{
    EventProcessor, LifecycleContext, OpenContext, ProcessingMode, StateResource, StreamProcessor,
};
use crate::scheduler::{evaluate_snapshot, SnapshotDecision};
use crate::snapshot::{SnapshotStore, SnapshotWriter};

/// Lifecycle phase, per §4.1. `Copy` so the snapshot scheduler's pure gate
/// function can take it by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Starting,
    Reprocessing,
    Running,
    Suspended,
    Closing,
    Failed,
}

/// Minimal record of why a controller failed, kept separately from
/// `ControllerError` so the controller does not need the error type to be
/// `Clone` (it carries an `anyhow::Error`, which is not).
#[derive(Debug, Clone)]
pub struct FailureInfo {
    pub phase: &'static str,
    pub position: Position,
    pub label: &'static str,
    pub message: String,
}

struct ControllerState {
    opened: bool,
    closed: bool,
    phase: Phase,
    snapshot_position: Position,
    last_source_event_position: Position,
    last_successfully_processed_position: Position,
    last_written_position: Position,
    current_record: Option<Record>,
    /// Set once the first live or reprocessed record completes phase 4 and
    /// never cleared again. Distinct from `current_record`, which tracks
    /// only what is *currently* in flight and is cleared after every
    /// record — the snapshot gate's step 1 needs "has anything ever been
    /// handled", not "is something in flight right now".
    has_processed_any: bool,
    suspended: bool,
    failure: Option<FailureInfo>,
}

impl ControllerState {
    fn new() -> Self {
        Self {
            opened: false,
            closed: false,
            phase: Phase::Starting,
            snapshot_position: -1,
            last_source_event_position: -1,
            last_successfully_processed_position: -1,
            last_written_position: -1,
            current_record: None,
            has_processed_any: false,
            suspended: false,
            failure: None,
        }
    }
}

/// Commands an external `ControllerHandle` may submit. Drained FIFO, with
/// no preemption between submissions, by the controller's own task — see
/// the "cooperative task + condition variable" design note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerCommand {
    Suspend,
    Resume,
    Close,
}

/// A cheap, cloneable handle for requesting suspend/resume/close from
/// another task. The controller itself is not `Clone`; this is the intended
/// way for a supervisor to interact with a running controller.
#[derive(Clone)]
pub struct ControllerHandle {
    commands_tx: mpsc::Sender<ControllerCommand>,
}

impl ControllerHandle {
    pub async fn suspend(&self) -> Result<(), mpsc::error::SendError<ControllerCommand>> {
        self.commands_tx.send(ControllerCommand::Suspend).await
    }

    pub async fn resume(&self) -> Result<(), mpsc::error::SendError<ControllerCommand>> {
        self.commands_tx.send(ControllerCommand::Resume).await
    }

    pub async fn close(&self) -> Result<(), mpsc::error::SendError<ControllerCommand>> {
        self.commands_tx.send(ControllerCommand::Close).await
    }
}

const COMMAND_QUEUE_DEPTH: usize = 32;

/// The stream processor controller. Generic over the log and snapshot store
/// implementations so a host application can plug in its real durability
/// layer; the user processor itself is held as `Box<dyn StreamProcessor>`
/// since nothing else in this crate needs it to be generic.
pub struct Controller<L, N, M = NoopMetrics>
where
    L: Log,
    N: SnapshotStore,
    M: MetricsSink,
{
    config: ControllerConfig,
    log: Arc<L>,
    snapshot_store: Arc<N>,
    metrics: Arc<M>,
    processor: Box<dyn StreamProcessor>,
    reader: Option<L::Reader>,
    state: ControllerState,
    hint: SchedulingHint,
    commands_tx: mpsc::Sender<ControllerCommand>,
    commands_rx: mpsc::Receiver<ControllerCommand>,
}

impl<L, N, M> Controller<L, N, M>
where
    L: Log,
    N: SnapshotStore,
    M: MetricsSink,
{
    pub fn new(
        config: ControllerConfig,
        log: Arc<L>,
        snapshot_store: Arc<N>,
        metrics: Arc<M>,
        processor: Box<dyn StreamProcessor>,
    ) -> Result<Self, crate::config::ConfigError> {
        config.validate()?;
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        Ok(Self {
            config,
            log,
            snapshot_store,
            metrics,
            processor,
            reader: None,
            state: ControllerState::new(),
            hint: SchedulingHint::Cpu,
            commands_tx,
            commands_rx,
        })
    }

    #[must_use]
    pub fn handle(&self) -> ControllerHandle {
        ControllerHandle {
            commands_tx: self.commands_tx.clone(),
        }
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.state.phase == Phase::Failed
    }

    #[must_use]
    pub fn failure(&self) -> Option<&FailureInfo> {
        self.state.failure.as_ref()
    }

    #[must_use]
    pub fn snapshot_position(&self) -> Position {
        self.state.snapshot_position
    }

    #[must_use]
    pub fn last_source_event_position(&self) -> Position {
        self.state.last_source_event_position
    }

    #[must_use]
    pub fn last_successfully_processed_position(&self) -> Position {
        self.state.last_successfully_processed_position
    }

    #[must_use]
    pub fn last_written_position(&self) -> Position {
        self.state.last_written_position
    }

    /// The record currently in flight (between phase 1 and phase 4), if any.
    #[must_use]
    pub fn current_record(&self) -> Option<&Record> {
        self.state.current_record.as_ref()
    }

    #[must_use]
    pub fn scheduling_hint(&self) -> SchedulingHint {
        self.hint
    }

    /// Request suspend/resume synchronously, bypassing the command queue.
    /// Prefer `ControllerHandle` when driving the controller from another
    /// task; this is for callers that own `&mut Controller` directly (tests,
    /// or a host that isn't running the `run()` loop on a separate task).
    pub fn suspend(&mut self) {
        self.state.suspended = true;
        if self.state.phase == Phase::Running {
            self.state.phase = Phase::Suspended;
        }
    }

    pub fn resume(&mut self) {
        self.state.suspended = false;
        if self.state.phase == Phase::Suspended {
            self.state.phase = Phase::Running;
        }
    }

    fn reader_mut(&mut self) -> ControllerResult<&mut L::Reader> {
        self.reader
            .as_mut()
            .ok_or_else(|| ControllerError::Contract(anyhow::anyhow!("controller not opened")))
    }

    fn reader_has_next(&self) -> ControllerResult<bool> {
        self.reader
            .as_ref()
            .map(LogReader::has_next)
            .ok_or_else(|| ControllerError::Contract(anyhow::anyhow!("controller not opened")))
    }

    fn fail<T>(&mut self, phase: &'static str, position: Position, err: ControllerError) -> ControllerResult<T> {
        self.state.phase = Phase::Failed;
        let label = err.metric_label();
        let message = err.to_string();
        tracing::error!(
            controller = %self.config.name,
            phase,
            position,
            kind = label,
            "{message}"
        );
        self.metrics.record_error(&self.config.name, label);
        self.state.failure = Some(FailureInfo {
            phase,
            position,
            label,
            message,
        });
        Err(err)
    }

    // -------------------------------------------------------------
    // §4.1 Starting
    // -------------------------------------------------------------

    /// Run the `Starting` → (`Reprocessing`) → `Running` sequence. On any
    /// error the controller transitions to `Failed` and that error is
    /// returned. Calling `open` a second time on the same instance is
    /// rejected — a supervisor that wants to retry constructs a fresh
    /// `Controller` (§9 fail-stop vs. fail-restart).
    pub async fn open(&mut self) -> ControllerResult<()> {
        if self.state.opened {
            return Err(ControllerError::Contract(anyhow::anyhow!(
                "controller already opened; construct a new Controller to retry"
            )));
        }
        self.state.opened = true;
        self.state.phase = Phase::Starting;
        tracing::info!(controller = %self.config.name, "starting controller");

        self.processor.state_resource_mut().reset();

        let reader = self
            .log
            .open_reader()
            .await
            .map_err(ControllerError::Contract)?;
        self.reader = Some(reader);

        match self
            .snapshot_store
            .last_snapshot(&self.config.name)
            .await
            .map_err(ControllerError::Contract)
        {
            Ok(Some(snapshot)) => {
                if let Err(source) = self.processor.state_resource_mut().restore_from(&snapshot.blob) {
                    return self.fail(
                        "recovery",
                        snapshot.position,
                        ControllerError::HandlerError {
                            phase: "restore_from",
                            position: snapshot.position,
                            source,
                        },
                    );
                }
                self.state.snapshot_position = snapshot.position;

                let found = match self.reader_mut()?.seek(snapshot.position).await {
                    Ok(found) => found,
                    Err(source) => {
                        return self.fail("recovery", snapshot.position, ControllerError::Contract(source))
                    }
                };
                if !found {
                    return self.fail(
                        "recovery",
                        snapshot.position,
                        ControllerError::RecoveryError {
                            snapshot_position: snapshot.position,
                        },
                    );
                }
                if let Err(source) = self.reader_mut()?.seek(snapshot.position + 1).await {
                    return self.fail("recovery", snapshot.position, ControllerError::Contract(source));
                }
            }
            Ok(None) => {
                self.state.snapshot_position = -1;
            }
            Err(err) => return self.fail("recovery", -1, err),
        }

        let open_ctx = OpenContext {
            name: &self.config.name,
        };
        if let Err(source) = self.processor.on_open(&open_ctx).await {
            return self.fail(
                "on_open",
                self.state.snapshot_position,
                ControllerError::HandlerError {
                    phase: "on_open",
                    position: self.state.snapshot_position,
                    source,
                },
            );
        }

        if self.config.read_only {
            self.state.last_source_event_position = self.state.snapshot_position;
        } else if let Err(err) = self.scan_for_last_source_event().await {
            self.state.phase = Phase::Failed;
            return Err(err);
        }

        if self.state.last_source_event_position > self.state.snapshot_position {
            self.state.phase = Phase::Reprocessing;
            self.run_reprocessing().await?;
        }

        if let Err(source) = self.processor.on_recovered().await {
            return self.fail(
                "on_recovered",
                self.state.last_successfully_processed_position,
                ControllerError::HandlerError {
                    phase: "on_recovered",
                    position: self.state.last_successfully_processed_position,
                    source,
                },
            );
        }

        self.state.phase = Phase::Running;
        tracing::info!(
            controller = %self.config.name,
            snapshot_position = self.state.snapshot_position,
            last_source_event_position = self.state.last_source_event_position,
            "controller running"
        );
        Ok(())
    }

    async fn scan_for_last_source_event(&mut self) -> ControllerResult<()> {
        let mut max_seen = self.state.snapshot_position;
        loop {
            if !self.reader_has_next()? {
                break;
            }
            let record = self
                .reader_mut()?
                .next()
                .await
                .map_err(ControllerError::Contract)?;
            if record.producer_id == self.config.name && record.source_record_position > max_seen {
                max_seen = record.source_record_position;
            }
        }
        self.state.last_source_event_position = max_seen;
        self.reader_mut()?
            .seek(self.state.snapshot_position + 1)
            .await
            .map_err(ControllerError::Contract)?;
        Ok(())
    }

    // -------------------------------------------------------------
    // §4.1 Reprocessing
    // -------------------------------------------------------------

    async fn run_reprocessing(&mut self) -> ControllerResult<()> {
        let target = self.state.last_source_event_position;
        loop {
            if !self.reader_has_next()? {
                return self.fail(
                    "reprocessing",
                    target,
                    ControllerError::ReprocessingMissingSource {
                        expected: target,
                        reached: self.state.last_successfully_processed_position_if_any(),
                    },
                );
            }
            let record = self
                .reader_mut()?
                .next()
                .await
                .map_err(ControllerError::Contract)?;

            if record.position > target {
                return self.fail(
                    "reprocessing",
                    target,
                    ControllerError::ReprocessingMissingSource {
                        expected: target,
                        reached: Some(record.position),
                    },
                );
            }

            self.handle_reprocessing_record(record.clone()).await?;

            if record.position == target {
                break;
            }
        }
        Ok(())
    }

    async fn handle_reprocessing_record(&mut self, record: Record) -> ControllerResult<()> {
        if !self.config.event_filter.accept(&record) {
            self.metrics.record_skipped(&self.config.name);
            return Ok(());
        }
        let Some(mut handler) = self.processor.on_event(&record) else {
            self.metrics.record_skipped(&self.config.name);
            return Ok(());
        };

        let mut ctx = LifecycleContext::new(ProcessingMode::Reprocessing);
        if let Err(source) = handler.process(&mut ctx).await {
            return self.fail(
                "process",
                record.position,
                ControllerError::HandlerError {
                    phase: "process",
                    position: record.position,
                    source,
                },
            );
        }
        if let Err(source) = ctx.take_deferred().await {
            return self.fail(
                "process",
                record.position,
                ControllerError::HandlerError {
                    phase: "process",
                    position: record.position,
                    source,
                },
            );
        }

        if let Err(source) = handler.update_state(self.processor.state_resource_mut()).await {
            return self.fail(
                "update_state",
                record.position,
                ControllerError::HandlerError {
                    phase: "update_state",
                    position: record.position,
                    source,
                },
            );
        }

        self.state.last_successfully_processed_position = record.position;
        self.state.has_processed_any = true;
        tracing::debug!(
            controller = %self.config.name,
            position = record.position,
            "reprocessed record"
        );
        Ok(())
    }

    // -------------------------------------------------------------
    // §4.2 Running: four-phase handling of a live record
    // -------------------------------------------------------------

    /// Drain every currently-readable record while `Running`. Returns once
    /// the reader has nothing more to offer, or the phase changed (the
    /// record handler failed, or suspend/close was requested mid-sequence).
    /// This is the deterministic, timer-free entry point used by tests and
    /// by `run()`'s inner loop.
    pub async fn run_until_idle(&mut self) -> ControllerResult<()> {
        loop {
            match self.state.phase {
                Phase::Running => {
                    if !self.reader_has_next()? {
                        return Ok(());
                    }
                    self.handle_next_live_record().await?;
                }
                _ => return Ok(()),
            }
        }
    }

    async fn handle_next_live_record(&mut self) -> ControllerResult<()> {
        let record = self
            .reader_mut()?
            .next()
            .await
            .map_err(ControllerError::Contract)?;

        if !self.config.event_filter.accept(&record) {
            self.metrics.record_skipped(&self.config.name);
            return Ok(());
        }
        let Some(mut handler) = self.processor.on_event(&record) else {
            self.metrics.record_skipped(&self.config.name);
            return Ok(());
        };

        self.state.current_record = Some(record.clone());
        let started = Instant::now();

        // Phase 1: process
        let mut ctx = LifecycleContext::new(ProcessingMode::Live);
        if let Err(source) = handler.process(&mut ctx).await {
            return self.fail(
                "process",
                record.position,
                ControllerError::HandlerError {
                    phase: "process",
                    position: record.position,
                    source,
                },
            );
        }
        if let Err(source) = ctx.take_deferred().await {
            return self.fail(
                "process",
                record.position,
                ControllerError::HandlerError {
                    phase: "process",
                    position: record.position,
                    source,
                },
            );
        }
        self.metrics.observe_phase_duration(
            &self.config.name,
            "process",
            started.elapsed().as_secs_f64(),
        );

        // Phase 2: side-effects, retry-until-success-or-close.
        let mut attempts = 0u32;
        loop {
            match handler.execute_side_effects().await {
                Ok(true) => break,
                Ok(false) => {
                    attempts += 1;
                    self.metrics.record_phase_retry(&self.config.name, "side_effects");
                    if let Some(max) = self.config.max_phase_retries {
                        if attempts > max {
                            return self.fail(
                                "side_effects",
                                record.position,
                                ControllerError::RetriesExhausted {
                                    phase: "side_effects",
                                    position: record.position,
                                    attempts,
                                },
                            );
                        }
                    }
                    self.drain_commands();
                    if self.close_requested() {
                        self.state.current_record = None;
                        return Ok(());
                    }
                    tokio::task::yield_now().await;
                }
                Err(source) => {
                    return self.fail(
                        "side_effects",
                        record.position,
                        ControllerError::HandlerError {
                            phase: "side_effects",
                            position: record.position,
                            source,
                        },
                    )
                }
            }
        }

        // Phase 3: write_event, skipped entirely for read-only processors.
        let mut written_position: Position = -1;
        if !self.config.read_only {
            attempts = 0;
            loop {
                let mut writer = self
                    .log
                    .open_writer()
                    .await
                    .map_err(ControllerError::Contract)?;
                writer.producer_id(self.config.name.clone());
                writer.source_record_position(record.position);

                match handler.write_event(&mut writer).await {
                    Ok(position) if position >= 0 => {
                        written_position = position;
                        break;
                    }
                    Ok(code) => {
                        attempts += 1;
                        self.metrics.record_phase_retry(&self.config.name, "write_event");
                        if let Some(max) = self.config.max_phase_retries {
                            if attempts > max {
                                return self.fail(
                                    "write_event",
                                    record.position,
                                    ControllerError::RetriesExhausted {
                                        phase: "write_event",
                                        position: record.position,
                                        attempts,
                                    },
                                );
                            }
                        }
                        tracing::debug!(
                            controller = %self.config.name,
                            position = record.position,
                            code,
                            attempts,
                            "transient write_event result, retrying"
                        );
                        self.drain_commands();
                        if self.close_requested() {
                            self.state.current_record = None;
                            return Ok(());
                        }
                        tokio::task::yield_now().await;
                    }
                    Err(source) => {
                        return self.fail(
                            "write_event",
                            record.position,
                            ControllerError::HandlerError {
                                phase: "write_event",
                                position: record.position,
                                source,
                            },
                        )
                    }
                }
            }
        }

        // Phase 4: update_state
        if let Err(source) = handler.update_state(self.processor.state_resource_mut()).await {
            return self.fail(
                "update_state",
                record.position,
                ControllerError::HandlerError {
                    phase: "update_state",
                    position: record.position,
                    source,
                },
            );
        }

        self.state.last_successfully_processed_position = record.position;
        if written_position >= 0 {
            self.state.last_written_position = written_position;
        }
        self.state.current_record = None;
        self.state.has_processed_any = true;
        self.metrics.record_processed(&self.config.name);
        tracing::debug!(
            controller = %self.config.name,
            position = record.position,
            written_position,
            "record processed"
        );
        Ok(())
    }

    /// Whether a close has been requested. Callers drain the command queue
    /// with `drain_commands` immediately before checking this, so a
    /// `ControllerHandle::close()` sent mid-retry interrupts an unbounded
    /// retry loop rather than waiting for it to give up on its own.
    fn close_requested(&self) -> bool {
        self.state.phase == Phase::Closing || self.state.phase == Phase::Failed
    }

    // -------------------------------------------------------------
    // §4.3 Snapshot scheduler gate + write
    // -------------------------------------------------------------

    /// Evaluate the §4.3 safety gate and, if safe, write a snapshot.
    /// Returns whether a snapshot was written. Snapshot failures are
    /// logged and counted but never fail the controller. `Closing` is an
    /// eligible phase here (see `evaluate_snapshot`), so the final snapshot
    /// attempted from `close()` goes through the same steps 2-4.
    pub async fn maybe_snapshot(&mut self) -> ControllerResult<bool> {
        let decision = evaluate_snapshot(
            self.state.phase,
            self.state.has_processed_any,
            self.log.commit_position(),
            self.state.last_written_position,
            self.state.last_successfully_processed_position,
            self.state.snapshot_position,
        );
        match decision {
            SnapshotDecision::Write { position } => {
                self.write_snapshot(position).await;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn write_snapshot(&mut self, position: Position) {
        self.hint = SchedulingHint::IoBound;
        let blob = self.processor.state_resource().serialize_to();
        let outcome = Self::try_write_snapshot(&*self.snapshot_store, &self.config.name, position, &blob).await;
        self.hint = SchedulingHint::Cpu;

        match outcome {
            Ok(()) => {
                self.state.snapshot_position = position;
                self.metrics.record_snapshot_written(&self.config.name);
                tracing::info!(controller = %self.config.name, position, "snapshot committed");
            }
            Err(err) => {
                self.metrics.record_snapshot_failed(&self.config.name);
                tracing::warn!(
                    controller = %self.config.name,
                    position,
                    error = %err,
                    "snapshot write failed, aborted"
                );
            }
        }
    }

    async fn try_write_snapshot(
        store: &N,
        name: &str,
        position: Position,
        blob: &[u8],
    ) -> anyhow::Result<()> {
        let mut writer = store.create_snapshot(name, position).await?;
        match writer.write(blob).await {
            Ok(_) => writer.commit().await,
            Err(err) => {
                let _ = writer.abort().await;
                Err(err)
            }
        }
    }

    // -------------------------------------------------------------
    // §4.1 Closing
    // -------------------------------------------------------------

    /// Idempotent. If the controller is not `Failed`, attempts a final
    /// snapshot under the same §4.3 gate, calls `on_close`, and releases
    /// the reader.
    pub async fn close(&mut self) -> ControllerResult<()> {
        if self.state.closed {
            return Ok(());
        }
        self.state.closed = true;

        if self.state.phase != Phase::Failed {
            self.state.phase = Phase::Closing;
            let _ = self.maybe_snapshot().await;
            self.processor.on_close().await;
        }

        self.reader = None;
        tracing::info!(controller = %self.config.name, "controller closed");
        Ok(())
    }

    // -------------------------------------------------------------
    // The cooperative run loop: commands, commit-position watch, and the
    // snapshot timer, all serialized on this one task.
    // -------------------------------------------------------------

    /// Drive the controller until a `Close` command is processed (or the
    /// handle is dropped). Intended as the production entry point, run on
    /// its own `tokio` task; tests generally prefer `run_until_idle` plus
    /// direct calls to `maybe_snapshot`/`suspend`/`resume` for determinism.
    pub async fn run(&mut self, scheduler: &mut crate::scheduler::SnapshotScheduler) -> ControllerResult<()> {
        let mut commit_rx = self.log.watch_commit_position();
        loop {
            self.drain_commands();
            match self.state.phase {
                Phase::Failed => return Ok(()),
                Phase::Closing => {
                    self.close().await?;
                    return Ok(());
                }
                Phase::Suspended => match self.commands_rx.recv().await {
                    Some(cmd) => self.apply_command(cmd),
                    None => {
                        self.close().await?;
                        return Ok(());
                    }
                },
                Phase::Running => {
                    if self.reader_has_next()? {
                        self.handle_next_live_record().await?;
                        continue;
                    }
                    tokio::select! {
                        biased;
                        cmd = self.commands_rx.recv() => {
                            match cmd {
                                Some(cmd) => self.apply_command(cmd),
                                None => {
                                    self.close().await?;
                                    return Ok(());
                                }
                            }
                        }
                        _ = commit_rx.changed() => {}
                        _ = scheduler.tick() => {
                            let _ = self.maybe_snapshot().await;
                        }
                    }
                }
                Phase::Starting | Phase::Reprocessing => {
                    return Err(ControllerError::Contract(anyhow::anyhow!(
                        "run() called before open() completed"
                    )));
                }
            }
        }
    }

    /// Drain any commands already queued, without blocking. Called from
    /// inside the phase-2/phase-3 retry loops so a `close()` requested from
    /// another task interrupts an unbounded retry instead of waiting for it.
    fn drain_commands(&mut self) {
        while let Ok(cmd) = self.commands_rx.try_recv() {
            self.apply_command(cmd);
        }
    }

    fn apply_command(&mut self, cmd: ControllerCommand) {
        match cmd {
            ControllerCommand::Suspend => self.suspend(),
            ControllerCommand::Resume => self.resume(),
            ControllerCommand::Close => self.state.phase = Phase::Closing,
        }
    }
}

impl ControllerState {
    fn last_successfully_processed_position_if_any(&self) -> Option<Position> {
        if self.last_successfully_processed_position < 0 {
            None
        } else {
            Some(self.last_successfully_processed_position)
        }
    }
}
