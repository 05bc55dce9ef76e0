use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::{SessionOutcome, SessionType};

/// Every state change in the engine produces an Event.
/// The host drains them after each call; the CLI prints them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    SessionStarted {
        session_id: String,
        session_type: SessionType,
        duration_secs: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        adaptation_reason: Option<String>,
        at: DateTime<Utc>,
    },
    SessionPaused {
        session_id: String,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    SessionResumed {
        session_id: String,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    SessionAnnotated {
        session_id: String,
        at: DateTime<Utc>,
    },
    /// A session was closed. `kept` is false when it was too short for history.
    SessionClosed {
        session_id: String,
        session_type: SessionType,
        outcome: SessionOutcome,
        kept: bool,
        at: DateTime<Utc>,
    },
    /// Informational notice: the session was shorter than the minimum.
    SessionTooShort {
        session_id: String,
        session_type: SessionType,
        elapsed_secs: i64,
        at: DateTime<Utc>,
    },
    ContinuationScheduled {
        next_type: SessionType,
        fire_at: DateTime<Utc>,
    },
    ContinuationCancelled {
        next_type: SessionType,
        at: DateTime<Utc>,
    },
    FocusPeriodCompleted {
        rounds: u32,
        at: DateTime<Utc>,
    },
    FocusPeriodStarted {
        target_rounds: u32,
        at: DateTime<Utc>,
    },
    HyperfocusDetected {
        at: DateTime<Utc>,
    },
    SessionDeleted {
        session_id: String,
        at: DateTime<Utc>,
    },
    TimerReset {
        at: DateTime<Utc>,
    },
}
