//! Error taxonomy shared by the controller and the snapshot scheduler.
//!
//! Errors are categorized so the state machine can tell fatal failures
//! (which drive the controller to `Failed`) from transient ones (which are
//! retried with a cooperative yield). This mirrors the retryable/permanent
//! split used elsewhere in this workspace for upstream request errors.

use thiserror::Error;

use crate::log::Position;

/// Errors surfaced by the controller's event loop, recovery, and snapshot scheduler.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// A snapshot exists for this processor but its position was not found in the log.
    #[error("snapshot at position {snapshot_position} has no matching record in the log")]
    RecoveryError { snapshot_position: Position },

    /// The reader was exhausted before reaching `last_source_event_position`, or a
    /// record past it appeared first.
    #[error(
        "reprocessing could not reach source event position {expected}; log was missing it (reached {reached:?})"
    )]
    ReprocessingMissingSource {
        expected: Position,
        reached: Option<Position>,
    },

    /// The user processor returned an error from any of the four phases.
    #[error("handler error in phase {phase} at position {position}: {source}")]
    HandlerError {
        phase: &'static str,
        position: Position,
        #[source]
        source: anyhow::Error,
    },

    /// `write_event` returned a negative (transient) position.
    #[error("write_event returned transient code {code} at position {position}")]
    TransientWriteError { position: Position, code: i64 },

    /// `execute_side_effects` returned `false`.
    #[error("execute_side_effects reported a transient failure at position {position}")]
    TransientSideEffectError { position: Position },

    /// A snapshot write failed; the writer was aborted and the controller keeps running.
    #[error("snapshot write at position {position} failed: {source}")]
    SnapshotError {
        position: Position,
        #[source]
        source: anyhow::Error,
    },

    /// `max_phase_retries` was configured and exhausted for a transient phase.
    #[error("exhausted {attempts} retries of phase {phase} at position {position}")]
    RetriesExhausted {
        phase: &'static str,
        position: Position,
        attempts: u32,
    },

    /// The underlying log or snapshot store contract returned an error outside
    /// the specific cases above (e.g. I/O failure on `seek`/`next`).
    #[error("log or snapshot store error: {0}")]
    Contract(#[source] anyhow::Error),
}

impl ControllerError {
    /// Whether this error is fatal (drives the controller to `Failed`) as opposed
    /// to transient (retried by the four-phase loop).
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::TransientWriteError { .. } | Self::TransientSideEffectError { .. }
        )
    }

    /// Stable label for metrics, grouping by error kind regardless of position.
    #[must_use]
    pub fn metric_label(&self) -> &'static str {
        match self {
            Self::RecoveryError { .. } => "recovery_error",
            Self::ReprocessingMissingSource { .. } => "reprocessing_missing_source",
            Self::HandlerError { .. } => "handler_error",
            Self::TransientWriteError { .. } => "transient_write_error",
            Self::TransientSideEffectError { .. } => "transient_side_effect_error",
            Self::SnapshotError { .. } => "snapshot_error",
            Self::RetriesExhausted { .. } => "retries_exhausted",
            Self::Contract(_) => "contract_error",
        }
    }
}

/// Result alias used throughout the controller's internal machinery.
pub type ControllerResult<T> = Result<T, ControllerError>;
