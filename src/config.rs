//! In-memory, validated configuration for a controller instance.
//!
//! Loading these values from a file, environment, or CLI is out of scope
//! here (§1); this type only covers the in-process, already-parsed surface.

use std::time::Duration;
use thiserror::Error;

use crate::filter::{AcceptAll, EventFilter};

/// Advisory scheduling classification a cooperative scheduler may use to
/// route the controller's task to an appropriate thread pool. CPU-bound by
/// default; the controller switches to `IoBound` for the duration of a
/// snapshot write and restores `Cpu` afterwards (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulingHint {
    Cpu,
    IoBound,
}

/// Validated configuration for a single controller instance.
pub struct ControllerConfig {
    /// Controller identity; also the producer id stamped on every record
    /// this controller writes, and the key under which snapshots are stored.
    pub name: String,
    /// Duration between snapshot scheduler ticks.
    pub snapshot_period: Duration,
    /// If true, `scan_for_last_source_event` is skipped and phase 3
    /// (`write_event`) is never invoked.
    pub read_only: bool,
    /// Predicate applied identically during reprocessing and running.
    pub event_filter: Box<dyn EventFilter>,
    /// `None` (default) retries phases 2/3 forever on transient failure,
    /// matching the original unbounded design. `Some(n)` fails the
    /// controller after `n` retries via `ControllerError::RetriesExhausted`.
    pub max_phase_retries: Option<u32>,
}

impl std::fmt::Debug for ControllerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerConfig")
            .field("name", &self.name)
            .field("snapshot_period", &self.snapshot_period)
            .field("read_only", &self.read_only)
            .field("max_phase_retries", &self.max_phase_retries)
            .finish_non_exhaustive()
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            snapshot_period: Duration::from_secs(15),
            read_only: false,
            event_filter: Box::new(AcceptAll),
            max_phase_retries: None,
        }
    }
}

impl ControllerConfig {
    /// Start from defaults with the required `name` set.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_snapshot_period(mut self, period: Duration) -> Self {
        self.snapshot_period = period;
        self
    }

    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    #[must_use]
    pub fn with_event_filter(mut self, filter: impl EventFilter + 'static) -> Self {
        self.event_filter = Box::new(filter);
        self
    }

    #[must_use]
    pub fn with_max_phase_retries(mut self, max: u32) -> Self {
        self.max_phase_retries = Some(max);
        self
    }

    /// Validate configuration, mirroring the upstream validated-builder idiom.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }
        if self.snapshot_period.is_zero() {
            return Err(ConfigError::ZeroSnapshotPeriod);
        }
        Ok(())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("controller name must not be empty")]
    EmptyName,
    #[error("snapshot_period must be greater than zero")]
    ZeroSnapshotPeriod,
}
