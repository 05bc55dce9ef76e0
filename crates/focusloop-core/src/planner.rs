//! Decides what follows a completed session.

use serde::{Deserialize, Serialize};

use crate::session::SessionType;
use crate::storage::CycleConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Continuation {
    pub next_type: SessionType,
    pub auto_start: bool,
}

/// Next session after `completed`.
///
/// `focus_period_count` is the number of work sessions completed before this
/// one; a long break follows every `long_break_interval`-th work session. An
/// interval of zero never yields a long break.
pub fn decide(completed: SessionType, focus_period_count: u32, config: &CycleConfig) -> Continuation {
    match completed {
        SessionType::Work => {
            let interval = config.long_break_interval;
            let long = interval > 0 && focus_period_count % interval == interval - 1;
            Continuation {
                next_type: if long {
                    SessionType::LongBreak
                } else {
                    SessionType::ShortBreak
                },
                auto_start: config.auto_start_breaks,
            }
        }
        SessionType::ShortBreak | SessionType::LongBreak => Continuation {
            next_type: SessionType::Work,
            auto_start: config.auto_start_work,
        },
    }
}
