//! Pure timer state machine over [`BackgroundState`].
//!
//! Remaining time is never decremented; it is always recomputed as
//! `max(0, end_timestamp - now)` floored to whole seconds. These functions do
//! no I/O: the engine persists whatever they return.
//!
//! ```text
//! Idle -> Running <-> Paused
//! Running -> Completed -> Idle
//! Running | Paused -> Idle          (stop, skip)
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::session::SessionRecord;
use crate::storage::BackgroundState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MachineState {
    #[default]
    Idle,
    Running,
    Paused,
    Completed,
}

/// Longest interval a session, delay or paused remainder may span.
pub const MAX_SPAN_SECS: u64 = 7 * 24 * 60 * 60;

/// `now` plus `secs`, or `None` when the sum leaves the representable range.
pub fn offset_by(now: DateTime<Utc>, secs: u64) -> Option<DateTime<Utc>> {
    let secs = i64::try_from(secs).ok()?;
    now.checked_add_signed(Duration::try_seconds(secs)?)
}

/// Seconds until `end`, floored, never negative.
pub fn remaining_until(end: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let left = end.signed_duration_since(now).num_seconds();
    left.max(0) as u64
}

/// Build the state for a freshly started session. `None` if the planned
/// duration cannot be placed on the clock.
pub fn begin(session: SessionRecord, now: DateTime<Utc>) -> Option<BackgroundState> {
    let end = offset_by(now, session.planned_duration_secs)?;
    Some(BackgroundState {
        session: Some(session),
        start_timestamp: Some(now),
        end_timestamp: Some(end),
        machine_state: MachineState::Running,
        paused_remainder_secs: None,
    })
}

/// Remaining seconds as seen at `now`.
pub fn remaining(state: &BackgroundState, now: DateTime<Utc>) -> u64 {
    match state.machine_state {
        MachineState::Running => state
            .end_timestamp
            .map(|end| remaining_until(end, now))
            .unwrap_or(0),
        MachineState::Paused => state.paused_remainder_secs.unwrap_or(0),
        MachineState::Idle | MachineState::Completed => 0,
    }
}

/// A running session whose end has been reached.
pub fn is_expired(state: &BackgroundState, now: DateTime<Utc>) -> bool {
    state.machine_state == MachineState::Running
        && state.session.is_some()
        && state.end_timestamp.is_some_and(|end| now >= end)
}

/// Running -> Paused. Returns the captured remainder, or `None` if the state
/// was not running.
pub fn pause(state: &mut BackgroundState, now: DateTime<Utc>) -> Option<u64> {
    if state.machine_state != MachineState::Running {
        return None;
    }
    let left = remaining(state, now);
    state.paused_remainder_secs = Some(left);
    state.machine_state = MachineState::Paused;
    Some(left)
}

/// Paused -> Running with a fresh end timestamp. Returns the new end, or
/// `None` (state untouched) if not paused or the remainder is out of range.
pub fn resume(state: &mut BackgroundState, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if state.machine_state != MachineState::Paused {
        return None;
    }
    let left = state.paused_remainder_secs.filter(|&secs| secs <= MAX_SPAN_SECS)?;
    let end = offset_by(now, left)?;
    state.paused_remainder_secs = None;
    state.end_timestamp = Some(end);
    state.machine_state = MachineState::Running;
    Some(end)
}

/// A persisted state that cannot be driven forward: a session without a
/// live interval, or a paused session with a missing or impossible remainder.
pub fn is_unstarted_or_errored(state: &BackgroundState) -> bool {
    match state.machine_state {
        MachineState::Idle | MachineState::Completed => state.session.is_some(),
        MachineState::Running => state.session.is_none() || state.end_timestamp.is_none(),
        MachineState::Paused => {
            state.session.is_none()
                || state
                    .paused_remainder_secs
                    .map_or(true, |secs| secs > MAX_SPAN_SECS)
        }
    }
}
