//! Focus engine implementation.
//!
//! The engine is the one authoritative timer. It keeps no countdown of its
//! own: every call re-reads the persisted [`BackgroundState`] and derives the
//! remaining time from absolute timestamps, so a process can be killed at any
//! point and the next one picks up where the wall clock says it should.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = FocusEngine::open(store, config).await;
//! engine.start(SessionType::Work, SessionMeta::default()).await;
//! // On a cadence:
//! let view = engine.sync().await;
//! ```
//!
//! ## Ordering on completion
//!
//! ledger commit -> continuation planning -> persisted state cleared.
//! A crash anywhere in between leaves either the expired state or an idle
//! engine. An expired state whose session is already in the ledger only
//! re-derives the cycle position: no second notification, reward or event.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Local, Offset, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::machine::{self, MachineState};
use crate::clock::{Clock, SystemClock};
use crate::collaborators::{
    LogNotifier, NoopRewards, NoopTracker, Notifier, RewardSink, UsageTracker,
};
use crate::error::Result;
use crate::events::Event;
use crate::ledger::{AggregateStats, CommitResult, FocusPeriodCounters, SessionLedger};
use crate::planner;
use crate::policy::{self, MoodState, UserSignals};
use crate::session::{SessionMeta, SessionOutcome, SessionRecord, SessionType};
use crate::storage::{BackgroundState, ByteStore, Config, RecoveryCodec, SqliteStore};

pub const TIMER_CONTEXT_KEY: &str = "timer_context";

/// External collaborators the engine notifies on transitions.
#[derive(Clone)]
pub struct Collaborators {
    pub tracker: Arc<dyn UsageTracker>,
    pub rewards: Arc<dyn RewardSink>,
    pub notifier: Arc<dyn Notifier>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            tracker: Arc::new(NoopTracker),
            rewards: Arc::new(NoopRewards),
            notifier: Arc::new(LogNotifier),
        }
    }
}

/// An auto-start waiting for its delay to elapse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingContinuation {
    pub next_type: SessionType,
    pub fire_at: DateTime<Utc>,
    #[serde(skip)]
    generation: u64,
}

/// What the presentation layer renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentView {
    pub machine_state: MachineState,
    pub remaining_secs: u64,
    pub current_session: Option<SessionRecord>,
    /// The session type a plain "start" would begin.
    pub upcoming: SessionType,
    pub pending_continuation: Option<PendingContinuation>,
    pub counters: FocusPeriodCounters,
}

/// Signals and cycle position carried between process invocations.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
struct TimerContext {
    #[serde(default)]
    signals: UserSignals,
    #[serde(default)]
    upcoming: Option<SessionType>,
}

pub struct FocusEngine {
    config: Config,
    clock: Arc<dyn Clock>,
    store: Arc<dyn ByteStore>,
    codec: RecoveryCodec,
    ledger: SessionLedger,
    collaborators: Collaborators,
    signals: UserSignals,
    /// Cache of the persisted state; never trusted without re-reading.
    machine_state: MachineState,
    current: Option<BackgroundState>,
    /// While set, the engine shows `Completed` until this instant.
    completed_until: Option<DateTime<Utc>>,
    upcoming: SessionType,
    pending: Option<PendingContinuation>,
    /// Bumped by every explicit user transition to invalidate pending auto-starts.
    generation: u64,
    reconciling: bool,
    /// Last write to the store failed; in-memory state is authoritative.
    unsaved: bool,
    events: Vec<Event>,
}

impl FocusEngine {
    /// Open an engine on the system clock with default collaborators.
    pub async fn open(store: Arc<dyn ByteStore>, config: Config) -> Self {
        Self::open_with(store, config, Arc::new(SystemClock), Collaborators::default()).await
    }

    /// Open an engine on the SQLite store and config file in the data
    /// directory.
    pub async fn open_default() -> Result<Self> {
        let config = Config::load()?;
        let store = SqliteStore::open()?;
        debug!(
            auto_start_breaks = config.cycle.auto_start_breaks,
            auto_start_work = config.cycle.auto_start_work,
            "opening engine on disk"
        );
        Ok(Self::open(Arc::new(store), config).await)
    }

    pub async fn open_with(
        store: Arc<dyn ByteStore>,
        config: Config,
        clock: Arc<dyn Clock>,
        collaborators: Collaborators,
    ) -> Self {
        let offset = match config.stats.utc_offset_minutes {
            Some(minutes) => FixedOffset::east_opt(minutes * 60).unwrap_or_else(|| Utc.fix()),
            None => *Local::now().offset(),
        };
        let now = clock.now();
        let ledger =
            SessionLedger::load(store.clone(), config.cycle.target_rounds, offset, now).await;

        let context = match store.get(TIMER_CONTEXT_KEY).await {
            Ok(Some(bytes)) => serde_json::from_slice::<TimerContext>(&bytes).unwrap_or_else(|e| {
                warn!(error = %e, "discarding unreadable timer context");
                TimerContext::default()
            }),
            Ok(None) => TimerContext::default(),
            Err(e) => {
                warn!(error = %e, "timer context unavailable");
                TimerContext::default()
            }
        };

        Self {
            codec: RecoveryCodec::new(store.clone()),
            config,
            clock,
            store,
            ledger,
            collaborators,
            signals: context.signals,
            machine_state: MachineState::Idle,
            current: None,
            completed_until: None,
            upcoming: context.upcoming.unwrap_or(SessionType::Work),
            pending: None,
            generation: 0,
            reconciling: false,
            unsaved: false,
            events: Vec::new(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn machine_state(&self) -> MachineState {
        self.machine_state
    }

    pub fn is_reconciling(&self) -> bool {
        self.reconciling
    }

    pub fn signals(&self) -> UserSignals {
        self.signals
    }

    pub fn upcoming(&self) -> SessionType {
        self.upcoming
    }

    pub fn history(&self) -> &[SessionRecord] {
        self.ledger.history()
    }

    pub fn counters(&self) -> FocusPeriodCounters {
        self.ledger.counters()
    }

    pub fn pending_continuation(&self) -> Option<PendingContinuation> {
        self.pending
    }

    /// Aggregate statistics as of now.
    pub fn aggregate_stats(&mut self) -> AggregateStats {
        let now = self.clock.now();
        self.ledger.refresh_stats(now).clone()
    }

    /// Cached view. Call [`sync`](Self::sync) for a reconciled one.
    pub fn view(&self) -> CurrentView {
        self.view_at(self.clock.now())
    }

    /// Take every event emitted since the last drain.
    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Reconcile with persisted state, close an expired session, and run any
    /// due display timeout or auto-start.
    pub async fn sync(&mut self) -> CurrentView {
        let now = self.clock.now();
        self.reconcile(now).await;
        self.run_due(now).await;
        self.view_at(now)
    }

    /// Idle -> Running.
    pub async fn start(&mut self, session_type: SessionType, meta: SessionMeta) -> Option<Event> {
        if self.reconciling {
            warn!("start requested during reconciliation, ignoring");
            return None;
        }
        let now = self.clock.now();
        self.reconcile(now).await;
        if self.has_live_session() {
            debug!("start ignored: a session is already active");
            return None;
        }
        self.cancel_pending(now);
        self.begin_session(session_type, meta, now).await
    }

    /// Start whatever the cycle says comes next.
    pub async fn start_next(&mut self, meta: SessionMeta) -> Option<Event> {
        let now = self.clock.now();
        self.reconcile(now).await;
        let next = self.upcoming;
        self.start(next, meta).await
    }

    /// Running -> Paused.
    pub async fn pause(&mut self) -> Option<Event> {
        let now = self.clock.now();
        self.reconcile(now).await;
        if !self.has_live_session() {
            return None;
        }
        let state = self.current.as_mut()?;
        let session_id = state.session.as_ref().map(|s| s.id.clone())?;
        let remaining_secs = machine::pause(state, now)?;
        self.machine_state = MachineState::Paused;
        self.persist().await;
        debug!(%session_id, remaining_secs, "session paused");
        Some(self.emit(Event::SessionPaused {
            session_id,
            remaining_secs,
            at: now,
        }))
    }

    /// Paused -> Running with a fresh end timestamp.
    pub async fn resume(&mut self) -> Option<Event> {
        let now = self.clock.now();
        self.reconcile(now).await;
        if !self.has_live_session() {
            return None;
        }
        let state = self.current.as_mut()?;
        let session_id = state.session.as_ref().map(|s| s.id.clone())?;
        machine::resume(state, now)?;
        let remaining_secs = machine::remaining(state, now);
        self.machine_state = MachineState::Running;
        self.persist().await;
        debug!(%session_id, remaining_secs, "session resumed");
        Some(self.emit(Event::SessionResumed {
            session_id,
            remaining_secs,
            at: now,
        }))
    }

    /// Abandon the session and return to idle.
    pub async fn stop(&mut self) -> Option<Event> {
        let now = self.clock.now();
        self.reconcile(now).await;
        if !self.has_live_session() {
            return None;
        }
        self.close_current(SessionOutcome::Stopped, now, now, true).await
    }

    /// Finish the session now, as if its time had run out.
    pub async fn complete(&mut self) -> Option<Event> {
        let now = self.clock.now();
        self.reconcile(now).await;
        if !self.has_live_session() {
            return None;
        }
        self.close_current(SessionOutcome::Completed, now, now, true).await
    }

    /// Abandon the session and move on to the next stage, without the
    /// completion display delay.
    pub async fn skip(&mut self) -> Option<Event> {
        let now = self.clock.now();
        self.reconcile(now).await;
        if !self.has_live_session() {
            return None;
        }
        self.cancel_pending(now);
        self.close_current(SessionOutcome::Skipped, now, now, true).await
    }

    /// Discard an unstarted or errored session without recording it.
    pub async fn reset(&mut self) -> Option<Event> {
        let now = self.clock.now();
        self.reconcile(now).await;
        let discardable = match &self.current {
            Some(state) => machine::is_unstarted_or_errored(state),
            None => self.machine_state == MachineState::Completed || self.pending.is_some(),
        };
        if !discardable {
            debug!("reset ignored: nothing to discard");
            return None;
        }
        self.cancel_pending(now);
        if let Some(state) = self.current.take() {
            let id = state.session.as_ref().map(|s| s.id.clone()).unwrap_or_default();
            warn!(session_id = %id, "discarding unrecoverable background state");
        }
        self.machine_state = MachineState::Idle;
        self.completed_until = None;
        self.persist().await;
        Some(self.emit(Event::TimerReset { at: now }))
    }

    /// Edit label, tags or icon of the current session.
    pub async fn annotate(
        &mut self,
        task_label: Option<String>,
        tags: Option<Vec<String>>,
        icon: Option<String>,
    ) -> Option<Event> {
        let now = self.clock.now();
        self.reconcile(now).await;
        if !self.has_live_session() {
            return None;
        }
        let session = self.current.as_mut()?.session.as_mut()?;
        if !session.annotate(task_label, tags, icon) {
            return None;
        }
        let session_id = session.id.clone();
        self.persist().await;
        Some(self.emit(Event::SessionAnnotated {
            session_id,
            at: now,
        }))
    }

    pub async fn set_signals(&mut self, signals: UserSignals) {
        self.signals = signals;
        self.persist_context().await;
    }

    pub async fn start_focus_period(&mut self, target_rounds: u32) -> Event {
        let now = self.clock.now();
        self.ledger.start_focus_period(target_rounds).await;
        self.emit(Event::FocusPeriodStarted {
            target_rounds,
            at: now,
        })
    }

    /// Remove one session from history.
    pub async fn delete_session(&mut self, id: &str) -> Option<Event> {
        let now = self.clock.now();
        if !self.ledger.delete_session(id, now).await {
            return None;
        }
        Some(self.emit(Event::SessionDeleted {
            session_id: id.to_string(),
            at: now,
        }))
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn emit(&mut self, event: Event) -> Event {
        self.events.push(event.clone());
        event
    }

    fn view_at(&self, now: DateTime<Utc>) -> CurrentView {
        CurrentView {
            machine_state: self.machine_state,
            remaining_secs: self
                .current
                .as_ref()
                .map(|s| machine::remaining(s, now))
                .unwrap_or(0),
            current_session: self.current.as_ref().and_then(|s| s.session.clone()),
            upcoming: self.upcoming,
            pending_continuation: self.pending,
            counters: self.ledger.counters(),
        }
    }

    fn has_live_session(&self) -> bool {
        self.current.as_ref().is_some_and(|s| {
            matches!(s.machine_state, MachineState::Running | MachineState::Paused)
                && !machine::is_unstarted_or_errored(s)
        })
    }

    /// Refresh the cache from the store and close a session whose end has
    /// passed. Auto-start is never executed here, only scheduled.
    async fn reconcile(&mut self, now: DateTime<Utc>) {
        self.reconciling = true;

        if self.unsaved {
            self.persist().await;
        }
        let persisted = if self.unsaved {
            self.current.clone()
        } else {
            match self.codec.load().await {
                Ok(state) => state,
                Err(e) => {
                    warn!(error = %e, "background state unreachable, keeping in-memory state");
                    self.current.clone()
                }
            }
        };

        // Only a session this process was watching may trigger an auto-start.
        let observed_running = match (&self.current, &persisted) {
            (Some(mine), Some(theirs)) => {
                matches!(mine.machine_state, MachineState::Running | MachineState::Paused)
                    && same_session(mine, theirs)
            }
            _ => false,
        };

        self.current = persisted;
        self.machine_state = match &self.current {
            Some(state) => state.machine_state,
            None if self.completed_until.is_some() => MachineState::Completed,
            None => MachineState::Idle,
        };

        let expired_at = self
            .current
            .as_ref()
            .filter(|s| machine::is_expired(s, now))
            .and_then(|s| s.end_timestamp);
        if let Some(end) = expired_at {
            if !observed_running {
                info!(%end, "closing session that ran out while no engine was watching");
            }
            self.close_current(SessionOutcome::Completed, end.min(now), now, observed_running)
                .await;
        }

        self.reconciling = false;
    }

    async fn run_due(&mut self, now: DateTime<Utc>) {
        if self.machine_state == MachineState::Completed
            && self.completed_until.is_some_and(|until| now >= until)
        {
            self.machine_state = MachineState::Idle;
            self.completed_until = None;
        }

        if let Some(pending) = self.pending.filter(|p| now >= p.fire_at) {
            self.pending = None;
            self.fire_continuation(pending, now).await;
        }
    }

    async fn fire_continuation(
        &mut self,
        pending: PendingContinuation,
        now: DateTime<Utc>,
    ) -> Option<Event> {
        if self.reconciling {
            warn!("auto-start fired during reconciliation, dropping");
            return None;
        }
        if pending.generation != self.generation {
            debug!("auto-start superseded by a user action");
            return None;
        }
        if self.current.as_ref().is_some_and(|s| s.session.is_some()) {
            debug!("auto-start skipped: a newer session has begun");
            return None;
        }
        info!(next = pending.next_type.label(), "auto-starting next session");
        self.begin_session(pending.next_type, SessionMeta::default(), now)
            .await
    }

    fn cancel_pending(&mut self, now: DateTime<Utc>) {
        self.generation = self.generation.wrapping_add(1);
        if let Some(pending) = self.pending.take() {
            self.emit(Event::ContinuationCancelled {
                next_type: pending.next_type,
                at: now,
            });
        }
    }

    async fn begin_session(
        &mut self,
        session_type: SessionType,
        meta: SessionMeta,
        now: DateTime<Utc>,
    ) -> Option<Event> {
        if self.reconciling {
            return None;
        }
        if let Some(stale) = self.current.as_ref() {
            warn!(state = ?stale.machine_state, "replacing unrecoverable background state");
        }

        let base = self.config.base_duration_secs(session_type);
        let adaptive = &self.config.adaptive;
        let (duration_secs, adaptation_reason) =
            if session_type == SessionType::Work && adaptive.enabled {
                let adapted = policy::adapt(
                    base,
                    self.signals,
                    adaptive.mode,
                    adaptive.min_secs,
                    adaptive.max_secs,
                );
                (adapted.duration_secs, Some(adapted.reason))
            } else {
                (base, None)
            };

        let mut record = SessionRecord::new(session_type, duration_secs, now, meta);
        record.adaptation_reason = adaptation_reason.clone();
        let session_id = record.id.clone();

        let Some(state) = machine::begin(record, now) else {
            warn!(session = session_type.label(), duration_secs, "duration out of range, not starting");
            return None;
        };
        self.current = Some(state);
        self.machine_state = MachineState::Running;
        self.completed_until = None;
        self.persist().await;
        self.set_upcoming(session_type).await;

        if session_type == SessionType::Work
            && self.config.tracking.enabled
            && !self.collaborators.tracker.is_tracking()
        {
            if let Err(e) = self
                .collaborators
                .tracker
                .start_tracking(self.config.tracking.interval_secs)
            {
                warn!(error = %e, "usage tracking unavailable");
            }
        }
        if let Err(e) = self.collaborators.notifier.notify_start(session_type) {
            warn!(error = %e, "start notification failed");
        }

        info!(%session_id, session = session_type.label(), duration_secs, "session started");
        Some(self.emit(Event::SessionStarted {
            session_id,
            session_type,
            duration_secs,
            adaptation_reason,
            at: now,
        }))
    }

    /// Close the current session and fold it into history.
    async fn close_current(
        &mut self,
        outcome: SessionOutcome,
        closed_at: DateTime<Utc>,
        now: DateTime<Utc>,
        plan: bool,
    ) -> Option<Event> {
        let state = self.current.take()?;
        let Some(mut record) = state.session else {
            self.persist().await;
            return None;
        };
        if !record.close(outcome, closed_at) {
            debug!(session_id = %record.id, "session already closed");
            self.persist().await;
            return None;
        }

        let session_type = record.session_type;
        let session_id = record.id.clone();

        if session_type == SessionType::Work && self.collaborators.tracker.is_tracking() {
            match self.collaborators.tracker.stop_tracking() {
                Ok(usage) => record.attach_usage(usage),
                Err(e) => warn!(error = %e, "failed to collect usage summary"),
            }
        }
        let mut count_before = self.ledger.counters().session_count;
        let planned_minutes = record.planned_duration_secs / 60;
        let (outcome, kept, counted) = match self.ledger.commit(record, now).await {
            CommitResult::Kept { counted, .. } => (outcome, true, counted),
            CommitResult::AlreadyCommitted {
                outcome: stored,
                counted,
            } => {
                // A previous process committed this session but died before
                // clearing the state. Its notices were already sent.
                info!(%session_id, ?stored, "session was committed before restart");
                if counted {
                    count_before = count_before.saturating_sub(1);
                }
                self.settle_cycle(session_type, stored, count_before, false, now)
                    .await;
                self.persist().await;
                return None;
            }
            CommitResult::TooShort { elapsed_secs } => {
                self.emit(Event::SessionTooShort {
                    session_id: session_id.clone(),
                    session_type,
                    elapsed_secs,
                    at: closed_at,
                });
                (outcome, false, false)
            }
        };
        if kept && outcome == SessionOutcome::Completed {
            if let Err(e) = self.collaborators.notifier.notify_complete(session_type) {
                warn!(error = %e, "completion notification failed");
            }
        }
        if counted {
            self.reward_work_session(planned_minutes, now).await;
        }

        info!(%session_id, ?outcome, kept, "session closed");
        let closed = self.emit(Event::SessionClosed {
            session_id,
            session_type,
            outcome,
            kept,
            at: closed_at,
        });

        if counted {
            let counters = self.ledger.counters();
            if counters.current_focus_period_session_count == counters.target_rounds {
                self.emit(Event::FocusPeriodCompleted {
                    rounds: counters.target_rounds,
                    at: now,
                });
            }
        }
        // A too-short completion leaves the cycle where it was, like a stop.
        let settled = match outcome {
            SessionOutcome::Completed if !kept => SessionOutcome::Stopped,
            other => other,
        };
        self.settle_cycle(session_type, settled, count_before, plan, now)
            .await;

        // Planning is done; only now may the persisted state go.
        self.persist().await;
        Some(closed)
    }

    /// Advance the cycle after a closed session. `count_before` is the
    /// all-time work count excluding the session just closed.
    async fn settle_cycle(
        &mut self,
        session_type: SessionType,
        outcome: SessionOutcome,
        count_before: u32,
        plan: bool,
        now: DateTime<Utc>,
    ) {
        match outcome {
            SessionOutcome::Completed => {
                let continuation = planner::decide(session_type, count_before, &self.config.cycle);
                let period_done = session_type.is_break() && self.ledger.counters().period_complete();
                if continuation.auto_start && plan && !period_done {
                    self.schedule_continuation(continuation.next_type, now);
                } else if continuation.auto_start && !plan {
                    debug!("completion recovered from persisted state, not auto-starting");
                }
                self.set_upcoming(continuation.next_type).await;
                self.machine_state = MachineState::Completed;
                self.completed_until = Some(
                    machine::offset_by(now, self.config.cycle.completion_display_secs)
                        .unwrap_or(now),
                );
            }
            SessionOutcome::Skipped => {
                let continuation = planner::decide(session_type, count_before, &self.config.cycle);
                self.set_upcoming(continuation.next_type).await;
                self.machine_state = MachineState::Idle;
                self.completed_until = None;
            }
            SessionOutcome::Stopped => {
                self.machine_state = MachineState::Idle;
                self.completed_until = None;
            }
        }
    }

    fn schedule_continuation(&mut self, next_type: SessionType, now: DateTime<Utc>) {
        let fire_at =
            machine::offset_by(now, self.config.cycle.auto_start_delay_secs).unwrap_or(now);
        self.pending = Some(PendingContinuation {
            next_type,
            fire_at,
            generation: self.generation,
        });
        self.emit(Event::ContinuationScheduled { next_type, fire_at });
    }

    async fn reward_work_session(&mut self, planned_minutes: u64, now: DateTime<Utc>) {
        let points = planned_minutes.clamp(1, u32::MAX as u64) as u32;
        if let Err(e) = self
            .collaborators
            .rewards
            .award_points(points, "completed work session")
        {
            warn!(error = %e, "failed to award points");
        }
        match self.collaborators.rewards.check_hyperfocus() {
            Ok(true) => {
                self.signals.mood = MoodState::Hyperfocus;
                self.persist_context().await;
                self.emit(Event::HyperfocusDetected { at: now });
            }
            Ok(false) => {}
            Err(e) => warn!(error = %e, "hyperfocus check failed"),
        }
    }

    async fn set_upcoming(&mut self, session_type: SessionType) {
        if self.upcoming != session_type {
            self.upcoming = session_type;
            self.persist_context().await;
        }
    }

    /// Write the cached state (or its absence) as a whole-object replacement.
    async fn persist(&mut self) {
        let result = match &self.current {
            Some(state) => self.codec.save(state).await,
            None => self.codec.clear().await,
        };
        match result {
            Ok(()) => self.unsaved = false,
            Err(e) => {
                warn!(error = %e, "failed to persist background state; continuing in memory");
                self.unsaved = true;
            }
        }
    }

    async fn persist_context(&self) {
        let context = TimerContext {
            signals: self.signals,
            upcoming: Some(self.upcoming),
        };
        match serde_json::to_vec(&context) {
            Ok(bytes) => {
                if let Err(e) = self.store.set(TIMER_CONTEXT_KEY, &bytes).await {
                    warn!(error = %e, "failed to persist timer context");
                }
            }
            Err(e) => warn!(error = %e, "failed to encode timer context"),
        }
    }
}

fn same_session(a: &BackgroundState, b: &BackgroundState) -> bool {
    match (&a.session, &b.session) {
        (Some(x), Some(y)) => x.id == y.id,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::MemoryStore;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-02T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    async fn engine(config: Config) -> (FocusEngine, ManualClock, MemoryStore) {
        let store = MemoryStore::new();
        let clock = ManualClock::new(t0());
        let engine = FocusEngine::open_with(
            Arc::new(store.clone()),
            config,
            Arc::new(clock.clone()),
            Collaborators::default(),
        )
        .await;
        (engine, clock, store)
    }

    #[tokio::test]
    async fn start_pause_resume() {
        let (mut engine, clock, _store) = engine(Config::default()).await;
        assert_eq!(engine.machine_state(), MachineState::Idle);

        assert!(engine.start(SessionType::Work, SessionMeta::default()).await.is_some());
        assert_eq!(engine.machine_state(), MachineState::Running);
        assert!(engine.start(SessionType::Work, SessionMeta::default()).await.is_none());

        clock.advance_secs(100);
        assert!(engine.pause().await.is_some());
        assert_eq!(engine.machine_state(), MachineState::Paused);
        assert!(engine.pause().await.is_none());

        clock.advance_secs(600);
        assert_eq!(engine.sync().await.remaining_secs, 1400);
        assert!(engine.resume().await.is_some());
        assert_eq!(engine.machine_state(), MachineState::Running);
    }

    #[tokio::test]
    async fn invalid_transitions_are_noops() {
        let (mut engine, _clock, _store) = engine(Config::default()).await;
        assert!(engine.resume().await.is_none());
        assert!(engine.pause().await.is_none());
        assert!(engine.stop().await.is_none());
        assert!(engine.complete().await.is_none());
        assert!(engine.skip().await.is_none());
        assert!(engine.reset().await.is_none());
        assert!(engine.annotate(Some("x".into()), None, None).await.is_none());
        assert!(engine.drain_events().is_empty());
    }

    #[tokio::test]
    async fn adaptive_work_duration() {
        let mut config = Config::default();
        config.adaptive.enabled = true;
        let (mut engine, _clock, _store) = engine(config).await;
        engine
            .set_signals(UserSignals {
                energy_level: 1,
                mood: MoodState::Neutral,
            })
            .await;
        match engine.start(SessionType::Work, SessionMeta::default()).await {
            Some(Event::SessionStarted {
                duration_secs,
                adaptation_reason,
                ..
            }) => {
                assert_eq!(duration_secs, 15 * 60);
                assert!(adaptation_reason.is_some());
            }
            other => panic!("expected SessionStarted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn breaks_are_never_adapted() {
        let mut config = Config::default();
        config.adaptive.enabled = true;
        let (mut engine, _clock, _store) = engine(config).await;
        engine
            .set_signals(UserSignals {
                energy_level: 5,
                mood: MoodState::Neutral,
            })
            .await;
        engine.start(SessionType::ShortBreak, SessionMeta::default()).await;
        assert_eq!(engine.sync().await.remaining_secs, 300);
    }

    #[tokio::test]
    async fn out_of_range_durations_do_not_start_or_panic() {
        let mut config = Config::default();
        config.durations.work_secs = 100_000_000_000_000;
        config.cycle.completion_display_secs = u64::MAX;
        let (mut engine, clock, store) = engine(config).await;

        assert!(engine.start(SessionType::Work, SessionMeta::default()).await.is_none());
        assert_eq!(engine.machine_state(), MachineState::Idle);
        assert!(store.raw(crate::storage::recovery::BACKGROUND_STATE_KEY).await.is_none());

        engine.start(SessionType::ShortBreak, SessionMeta::default()).await.unwrap();
        clock.advance_secs(300);
        // No usable display delay: straight back to idle.
        assert_eq!(engine.sync().await.machine_state, MachineState::Idle);
        assert_eq!(engine.history().len(), 1);
    }

    #[tokio::test]
    async fn skip_goes_idle_immediately_and_advances() {
        let (mut engine, clock, _store) = engine(Config::default()).await;
        engine.start(SessionType::Work, SessionMeta::default()).await;
        clock.advance_secs(600);
        assert!(engine.skip().await.is_some());
        assert_eq!(engine.machine_state(), MachineState::Idle);
        assert_eq!(engine.upcoming(), SessionType::ShortBreak);
        assert_eq!(engine.history().len(), 1);
        assert_eq!(engine.history()[0].outcome, Some(SessionOutcome::Skipped));
        assert_eq!(engine.counters().session_count, 0);
    }

    #[tokio::test]
    async fn annotate_current_session() {
        let (mut engine, _clock, _store) = engine(Config::default()).await;
        engine.start(SessionType::Work, SessionMeta::default()).await;
        engine
            .annotate(Some("review PR".into()), Some(vec!["code".into()]), Some("eye".into()))
            .await
            .unwrap();
        let view = engine.sync().await;
        let session = view.current_session.unwrap();
        assert_eq!(session.meta.task_label.as_deref(), Some("review PR"));
        assert_eq!(session.meta.tags, vec!["code".to_string()]);
    }
}
