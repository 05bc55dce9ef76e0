//! Session history, too-short gating and aggregate statistics.
//!
//! The ledger is the only owner of closed sessions. History is append-only in
//! normal operation; [`SessionLedger::delete_session`] is the explicit user
//! operation that removes an entry.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::session::{SessionOutcome, SessionRecord, SessionType};
use crate::storage::ByteStore;

/// Sessions shorter than this are treated as accidental taps.
pub const MIN_SESSION_SECS: i64 = 40;

pub const HISTORY_KEY: &str = "session_history";
pub const COUNTERS_KEY: &str = "focus_counters";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusPeriodCounters {
    /// Completed-and-kept work sessions since the period started.
    pub current_focus_period_session_count: u32,
    /// All-time completed-and-kept work sessions.
    pub session_count: u32,
    pub target_rounds: u32,
}

impl FocusPeriodCounters {
    pub fn new(target_rounds: u32) -> Self {
        Self {
            current_focus_period_session_count: 0,
            session_count: 0,
            target_rounds,
        }
    }

    pub fn period_complete(&self) -> bool {
        self.target_rounds > 0 && self.current_focus_period_session_count >= self.target_rounds
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    pub total_sessions: u64,
    pub completed_sessions: u64,
    pub total_work_secs: u64,
    pub total_break_secs: u64,
    pub today_sessions: u64,
    pub week_sessions: u64,
    pub month_sessions: u64,
    pub current_streak_days: u32,
}

impl AggregateStats {
    /// Recompute everything from `history` as seen at `now`.
    pub fn compute(history: &[SessionRecord], now: DateTime<Utc>, offset: FixedOffset) -> Self {
        let today = now.with_timezone(&offset).date_naive();
        let mut stats = Self {
            total_sessions: history.len() as u64,
            ..Self::default()
        };

        let mut completed_days = BTreeSet::new();
        for rec in history {
            let secs = rec.elapsed_secs().unwrap_or(0).max(0) as u64;
            if rec.session_type.is_break() {
                stats.total_break_secs += secs;
            } else {
                stats.total_work_secs += secs;
            }

            if rec.outcome != Some(SessionOutcome::Completed) {
                continue;
            }
            stats.completed_sessions += 1;

            let day = local_day(rec, offset);
            completed_days.insert(day);

            if rec.session_type != SessionType::Work {
                continue;
            }
            if day == today {
                stats.today_sessions += 1;
            }
            if day.iso_week() == today.iso_week() {
                stats.week_sessions += 1;
            }
            if day.year() == today.year() && day.month() == today.month() {
                stats.month_sessions += 1;
            }
        }

        stats.current_streak_days = streak(&completed_days);
        stats
    }
}

/// Only completed work moves the focus counters.
fn counts(session_type: SessionType, outcome: SessionOutcome) -> bool {
    session_type == SessionType::Work && outcome == SessionOutcome::Completed
}

fn local_day(rec: &SessionRecord, offset: FixedOffset) -> NaiveDate {
    rec.end_time
        .unwrap_or(rec.start_time)
        .with_timezone(&offset)
        .date_naive()
}

/// Consecutive days ending at the most recent date, walking backwards until
/// the first gap.
fn streak(days: &BTreeSet<NaiveDate>) -> u32 {
    let mut iter = days.iter().rev();
    let Some(mut prev) = iter.next().copied() else {
        return 0;
    };
    let mut count = 1;
    for &day in iter {
        if prev - day == Duration::days(1) {
            count += 1;
            prev = day;
        } else {
            break;
        }
    }
    count
}

/// What a commit did with the record.
#[derive(Debug, Clone, PartialEq)]
pub enum CommitResult {
    Kept {
        stats: AggregateStats,
        counted: bool,
    },
    /// The id was already in history. Carries the stored outcome and whether
    /// that record was counted.
    AlreadyCommitted {
        outcome: SessionOutcome,
        counted: bool,
    },
    TooShort {
        elapsed_secs: i64,
    },
}

pub struct SessionLedger {
    store: Arc<dyn ByteStore>,
    history: Vec<SessionRecord>,
    counters: FocusPeriodCounters,
    offset: FixedOffset,
    stats: AggregateStats,
}

impl SessionLedger {
    /// Load history and counters from `store`. Unreadable entries are
    /// discarded with a warning.
    pub async fn load(
        store: Arc<dyn ByteStore>,
        target_rounds: u32,
        offset: FixedOffset,
        now: DateTime<Utc>,
    ) -> Self {
        let history = match store.get(HISTORY_KEY).await {
            Ok(Some(bytes)) => serde_json::from_slice::<Vec<SessionRecord>>(&bytes)
                .unwrap_or_else(|e| {
                    warn!(error = %e, "discarding unreadable session history");
                    Vec::new()
                }),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "session history unavailable, starting empty");
                Vec::new()
            }
        };

        let counters = match store.get(COUNTERS_KEY).await {
            Ok(Some(bytes)) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                warn!(error = %e, "discarding unreadable focus counters");
                FocusPeriodCounters::new(target_rounds)
            }),
            Ok(None) => FocusPeriodCounters::new(target_rounds),
            Err(e) => {
                warn!(error = %e, "focus counters unavailable, starting from zero");
                FocusPeriodCounters::new(target_rounds)
            }
        };

        let stats = AggregateStats::compute(&history, now, offset);
        Self {
            store,
            history,
            counters,
            offset,
            stats,
        }
    }

    pub fn history(&self) -> &[SessionRecord] {
        &self.history
    }

    pub fn counters(&self) -> FocusPeriodCounters {
        self.counters
    }

    pub fn stats(&self) -> &AggregateStats {
        &self.stats
    }

    /// Recompute stats relative to `now` (day/week/month buckets move).
    pub fn refresh_stats(&mut self, now: DateTime<Utc>) -> &AggregateStats {
        self.stats = AggregateStats::compute(&self.history, now, self.offset);
        &self.stats
    }

    /// Long enough to count. Uses the stored start time, never the time the
    /// closure happened to be observed.
    pub fn should_keep(record: &SessionRecord) -> bool {
        record
            .elapsed_secs()
            .is_some_and(|secs| secs >= MIN_SESSION_SECS)
    }

    /// Append a closed record if it is long enough and update counters.
    pub async fn commit(&mut self, record: SessionRecord, now: DateTime<Utc>) -> CommitResult {
        if !record.is_closed() {
            warn!(id = %record.id, "refusing to commit an open session");
            return CommitResult::TooShort { elapsed_secs: 0 };
        }
        if let Some(stored) = self.history.iter().find(|r| r.id == record.id) {
            debug!(id = %record.id, "session already committed");
            let outcome = stored.outcome.unwrap_or(SessionOutcome::Completed);
            return CommitResult::AlreadyCommitted {
                outcome,
                counted: counts(stored.session_type, outcome),
            };
        }
        if !Self::should_keep(&record) {
            let elapsed_secs = record.elapsed_secs().unwrap_or(0);
            debug!(id = %record.id, elapsed_secs, "session too short to keep");
            return CommitResult::TooShort { elapsed_secs };
        }

        let counted = record
            .outcome
            .is_some_and(|outcome| counts(record.session_type, outcome));
        if counted {
            self.counters.session_count += 1;
            self.counters.current_focus_period_session_count += 1;
        }
        self.history.push(record);

        self.persist_history().await;
        if counted {
            self.persist_counters().await;
        }

        CommitResult::Kept {
            stats: self.refresh_stats(now).clone(),
            counted,
        }
    }

    /// Explicit user deletion of one history entry.
    pub async fn delete_session(&mut self, id: &str, now: DateTime<Utc>) -> bool {
        let before = self.history.len();
        self.history.retain(|r| r.id != id);
        if self.history.len() == before {
            return false;
        }
        self.persist_history().await;
        self.refresh_stats(now);
        true
    }

    /// Begin a new focus period with the given goal.
    pub async fn start_focus_period(&mut self, target_rounds: u32) {
        self.counters.current_focus_period_session_count = 0;
        self.counters.target_rounds = target_rounds;
        self.persist_counters().await;
    }

    async fn persist_history(&self) {
        match serde_json::to_vec(&self.history) {
            Ok(bytes) => {
                if let Err(e) = self.store.set(HISTORY_KEY, &bytes).await {
                    warn!(error = %e, "failed to persist session history");
                }
            }
            Err(e) => warn!(error = %e, "failed to encode session history"),
        }
    }

    async fn persist_counters(&self) {
        match serde_json::to_vec(&self.counters) {
            Ok(bytes) => {
                if let Err(e) = self.store.set(COUNTERS_KEY, &bytes).await {
                    warn!(error = %e, "failed to persist focus counters");
                }
            }
            Err(e) => warn!(error = %e, "failed to encode focus counters"),
        }
    }
}
