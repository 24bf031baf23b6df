use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use ygg_conductor::Command;
use ygg_core::RowIndex;
use ygg_core::RowPhase;
use ygg_core::ShowState;

/// The `(row_index, row_phase, version)` captured when a deferred
/// `ADVANCE_PHASE` is scheduled (spec.md §4.7). On fire, the engine
/// re-reads state and only submits the command if none of the three have
/// moved on — otherwise it silently no-ops (spec.md §7: "Timing-engine
/// stale fires are silently discarded").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledAdvance {
    pub row_index: RowIndex,
    pub row_phase: RowPhase,
    pub version: u64,
}

impl ScheduledAdvance {
    pub fn capture(state: &ShowState) -> Option<Self> {
        let row = state.current_row()?;
        Some(Self {
            row_index: row.index,
            row_phase: row.phase,
            version: state.version,
        })
    }

    /// Whether `current` is still in exactly the row+sub-phase+version this
    /// timer was scheduled for.
    pub fn still_pending(&self, current: &ShowState) -> bool {
        current.version == self.version
            && current
                .current_row()
                .map(|row| row.index == self.row_index && row.phase == self.row_phase)
                .unwrap_or(false)
    }
}

/// The configured duration to wait before auto-advancing out of the current
/// row sub-phase, or `None` for sub-phases the timing engine never
/// auto-advances (`pending`, `complete` — those only move on explicit
/// commands).
pub fn duration_for(state: &ShowState) -> Option<Duration> {
    let row = state.current_row()?;
    let timing = &state.config.timing;
    match row.phase {
        RowPhase::Audition => Some(timing.audition_per_option_ms),
        RowPhase::Voting => Some(timing.voting_window_ms),
        RowPhase::Reveal => Some(timing.reveal_duration_ms),
        RowPhase::CoupWindow => Some(timing.coup_window_ms),
        RowPhase::Pending | RowPhase::Complete => None,
    }
}

/// Schedules a deferred `ADVANCE_PHASE`, grounded directly on the teacher's
/// `Timer`/`TimerConfig` pattern (`crates/gameroom/src/timer.rs`) generalized
/// from two fixed durations to the four configurable ones in
/// `ShowConfig.timing`.
///
/// `read_state` is polled once the delay elapses to decide whether the fire
/// is still valid — the caller (ygg-server's single command-queue actor)
/// owns the authoritative state, so this engine only ever reads a snapshot
/// of it through the provided closure.
pub fn schedule<F>(
    state: &ShowState,
    commands: UnboundedSender<Command>,
    read_state: F,
) -> Option<tokio::task::JoinHandle<()>>
where
    F: Fn() -> ShowState + Send + 'static,
{
    let scheduled = ScheduledAdvance::capture(state)?;
    let delay = duration_for(state)?;
    Some(tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let current = read_state();
        if scheduled.still_pending(&current) {
            let _ = commands.send(Command::AdvancePhase {
                timestamp: current.version as i64,
            });
        } else {
            log::trace!("timing engine: stale fire discarded for row {}", scheduled.row_index);
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ygg_core::ShowConfig;
    use ygg_core::ID;

    fn state_in_phase(phase: RowPhase) -> ShowState {
        let mut state = ShowState::create_initial(ShowConfig::default(), ID::default());
        state.rows[0].phase = phase;
        state
    }

    #[test]
    fn captures_current_row_phase_and_version() {
        let state = state_in_phase(RowPhase::Voting);
        let scheduled = ScheduledAdvance::capture(&state).unwrap();
        assert_eq!(scheduled.row_index, 0);
        assert_eq!(scheduled.row_phase, RowPhase::Voting);
        assert_eq!(scheduled.version, state.version);
    }

    #[test]
    fn still_pending_true_when_nothing_moved() {
        let state = state_in_phase(RowPhase::Voting);
        let scheduled = ScheduledAdvance::capture(&state).unwrap();
        assert!(scheduled.still_pending(&state));
    }

    #[test]
    fn still_pending_false_after_version_bump() {
        let state = state_in_phase(RowPhase::Voting);
        let scheduled = ScheduledAdvance::capture(&state).unwrap();
        let mut advanced = state.clone();
        advanced.version += 1;
        assert!(!scheduled.still_pending(&advanced));
    }

    #[test]
    fn still_pending_false_after_phase_changes() {
        let state = state_in_phase(RowPhase::Voting);
        let scheduled = ScheduledAdvance::capture(&state).unwrap();
        let mut advanced = state.clone();
        advanced.rows[0].phase = RowPhase::Reveal;
        assert!(!scheduled.still_pending(&advanced));
    }

    #[test]
    fn duration_is_none_for_pending_and_complete() {
        assert!(duration_for(&state_in_phase(RowPhase::Pending)).is_none());
        assert!(duration_for(&state_in_phase(RowPhase::Complete)).is_none());
    }

    #[test]
    fn duration_matches_configured_voting_window() {
        let state = state_in_phase(RowPhase::Voting);
        assert_eq!(
            duration_for(&state).unwrap(),
            state.config.timing.voting_window_ms
        );
    }
}
