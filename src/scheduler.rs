//! The snapshot scheduler: a periodic timer plus the pure safety-gate
//! decision from §4.3. The timer drives the controller's own task (there is
//! no separate snapshot task, so there is no snapshot/processing race); the
//! gate is kept as a free function so it can be tested without any I/O.

use std::time::Duration;
use tokio::time::{Instant, Interval, MissedTickBehavior};

use crate::controller::Phase;
use crate::log::Position;

/// Fires a tick on `period`, skipping missed ticks rather than bursting —
/// a controller that was busy for three periods takes exactly one snapshot
/// when it next gets a chance, not three back-to-back.
pub struct SnapshotScheduler {
    interval: Interval,
}

impl SnapshotScheduler {
    #[must_use]
    pub fn new(period: Duration) -> Self {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { interval }
    }

    /// Await the next tick. Intended to sit in a `tokio::select!` arm on the
    /// controller's own task.
    pub async fn tick(&mut self) -> Instant {
        self.interval.tick().await
    }
}

/// Outcome of evaluating the §4.3 safety gate for a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotDecision {
    /// Not in an eligible phase (`Running` or `Closing`), or no record has
    /// ever been handled.
    NotRunning,
    /// Nothing new has been durably processed since the last snapshot.
    NothingNew { position: Position },
    /// The most recently written output record is not yet replicated.
    WrittenPositionNotDurable {
        last_written_position: Position,
        commit_position: Position,
    },
    /// Safe to snapshot at `position`.
    Write { position: Position },
}

/// Pure evaluation of steps 1-4 of §4.3. Takes no I/O so it can be exercised
/// directly (see S4 in the test suite) independent of any log or snapshot
/// store implementation.
///
/// Step 1 only rules out phases where snapshotting is meaningless or unsafe
/// (`Starting`/`Reprocessing`/`Suspended`/`Failed`) or the case where no
/// record has ever been handled; `Closing` is deliberately eligible here so
/// the final snapshot attempted during close goes through the same steps
/// 2-4 as the periodic one, rather than being vetoed outright.
#[must_use]
pub fn evaluate_snapshot(
    phase: Phase,
    has_processed_any: bool,
    commit_position: Position,
    last_written_position: Position,
    last_successfully_processed_position: Position,
    snapshot_position: Position,
) -> SnapshotDecision {
    let eligible_phase = matches!(phase, Phase::Running | Phase::Closing);
    if !eligible_phase || !has_processed_any {
        return SnapshotDecision::NotRunning;
    }
    if last_successfully_processed_position <= snapshot_position {
        return SnapshotDecision::NothingNew {
            position: last_successfully_processed_position,
        };
    }
    if commit_position < last_written_position {
        return SnapshotDecision::WrittenPositionNotDurable {
            last_written_position,
            commit_position,
        };
    }
    SnapshotDecision::Write {
        position: last_successfully_processed_position,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_running_when_phase_is_not_eligible() {
        let decision = evaluate_snapshot(Phase::Suspended, true, 10, 5, 8, 0);
        assert_eq!(decision, SnapshotDecision::NotRunning);
    }

    #[test]
    fn not_running_before_any_record_processed() {
        let decision = evaluate_snapshot(Phase::Running, false, 10, 5, 8, 0);
        assert_eq!(decision, SnapshotDecision::NotRunning);
    }

    #[test]
    fn nothing_new_when_already_snapshotted() {
        let decision = evaluate_snapshot(Phase::Running, true, 10, 5, 8, 8);
        assert_eq!(
            decision,
            SnapshotDecision::NothingNew { position: 8 }
        );
    }

    #[test]
    fn blocked_when_written_position_not_durable() {
        // S4: commit position (3) lags last_written_position (5).
        let decision = evaluate_snapshot(Phase::Running, true, 3, 5, 8, 0);
        assert_eq!(
            decision,
            SnapshotDecision::WrittenPositionNotDurable {
                last_written_position: 5,
                commit_position: 3,
            }
        );
    }

    #[test]
    fn writes_once_commit_position_catches_up() {
        let decision = evaluate_snapshot(Phase::Running, true, 10, 5, 8, 0);
        assert_eq!(decision, SnapshotDecision::Write { position: 8 });
    }

    #[test]
    fn closing_is_an_eligible_phase_for_the_final_snapshot() {
        let decision = evaluate_snapshot(Phase::Closing, true, 10, 5, 8, 0);
        assert_eq!(decision, SnapshotDecision::Write { position: 8 });
    }

    #[test]
    fn closing_before_any_record_processed_is_still_not_running() {
        let decision = evaluate_snapshot(Phase::Closing, false, 10, 5, 8, 0);
        assert_eq!(decision, SnapshotDecision::NotRunning);
    }
}
