//! Integration tests for restart recovery of the focus engine.
//!
//! Each "process" is a fresh `FocusEngine` opened on a shared `MemoryStore`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset, Utc};
use focusloop_core::ledger::COUNTERS_KEY;
use focusloop_core::storage::recovery::{encode, BACKGROUND_STATE_KEY};
use focusloop_core::{
    BackgroundState, CollaboratorError, Collaborators, Config, Event, FocusEngine,
    FocusPeriodCounters, MachineState, ManualClock, MemoryStore, NoopTracker, Notifier,
    RewardSink, SessionLedger, SessionMeta, SessionOutcome, SessionRecord, SessionType,
};

fn t0() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-03-02T09:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn utc_config() -> Config {
    let mut config = Config::default();
    config.stats.utc_offset_minutes = Some(0);
    config
}

async fn open(store: &MemoryStore, clock: &ManualClock, config: Config) -> FocusEngine {
    FocusEngine::open_with(
        Arc::new(store.clone()),
        config,
        Arc::new(clock.clone()),
        Collaborators::default(),
    )
    .await
}

fn closed_events(events: &[Event]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, Event::SessionClosed { .. }))
        .count()
}

#[tokio::test]
async fn restart_mid_session_recomputes_remaining_from_timestamps() {
    let store = MemoryStore::new();
    let clock = ManualClock::new(t0());

    let mut first = open(&store, &clock, utc_config()).await;
    first.start(SessionType::Work, SessionMeta::default()).await.unwrap();
    drop(first);

    clock.advance_secs(10 * 60);
    let mut second = open(&store, &clock, utc_config()).await;
    let view = second.sync().await;
    assert_eq!(view.machine_state, MachineState::Running);
    assert_eq!(view.remaining_secs, 15 * 60);
    assert_eq!(view.current_session.unwrap().session_type, SessionType::Work);
}

#[tokio::test]
async fn expired_session_closes_exactly_once_using_stored_start() {
    let store = MemoryStore::new();
    let now = t0();
    let clock = ManualClock::new(now);

    // Written by a process that died 3h25m ago, 25 minutes into nothing.
    let start = now - Duration::minutes(3 * 60 + 25);
    let session = SessionRecord::new(SessionType::Work, 1500, start, SessionMeta::default());
    let id = session.id.clone();
    let state = BackgroundState {
        session: Some(session),
        start_timestamp: Some(start),
        end_timestamp: Some(start + Duration::seconds(1500)),
        machine_state: MachineState::Running,
        paused_remainder_secs: None,
    };
    store.plant(BACKGROUND_STATE_KEY, encode(&state).unwrap()).await;

    let mut config = utc_config();
    config.cycle.auto_start_breaks = true;
    let mut engine = open(&store, &clock, config).await;

    let view = engine.sync().await;
    assert_eq!(view.machine_state, MachineState::Completed);
    assert!(view.current_session.is_none());
    assert!(!engine.is_reconciling());

    let history = engine.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, id);
    assert_eq!(history[0].outcome, Some(SessionOutcome::Completed));
    assert_eq!(history[0].elapsed_secs(), Some(1500));
    assert_eq!(engine.counters().session_count, 1);

    // Recovered completions never auto-start.
    assert!(engine.pending_continuation().is_none());
    assert_eq!(engine.upcoming(), SessionType::ShortBreak);

    engine.sync().await;
    let events = engine.drain_events();
    assert_eq!(closed_events(&events), 1);
    assert_eq!(engine.history().len(), 1);
    assert!(store.raw(BACKGROUND_STATE_KEY).await.is_none());

    clock.advance_secs(60);
    assert_eq!(engine.sync().await.machine_state, MachineState::Idle);
    assert!(engine.sync().await.current_session.is_none());
}

#[tokio::test]
async fn second_process_does_not_reclose_a_committed_session() {
    let store = MemoryStore::new();
    let clock = ManualClock::new(t0());

    let mut first = open(&store, &clock, utc_config()).await;
    first.start(SessionType::Work, SessionMeta::default()).await.unwrap();
    clock.advance_secs(1500);
    first.sync().await;
    assert_eq!(first.history().len(), 1);

    let mut second = open(&store, &clock, utc_config()).await;
    second.sync().await;
    assert_eq!(second.history().len(), 1);
    assert_eq!(closed_events(&second.drain_events()), 0);
}

#[tokio::test]
async fn pause_survives_restart() {
    let store = MemoryStore::new();
    let clock = ManualClock::new(t0());

    let mut first = open(&store, &clock, utc_config()).await;
    first.start(SessionType::Work, SessionMeta::default()).await.unwrap();
    clock.advance_secs(100);
    first.pause().await.unwrap();
    drop(first);

    clock.advance_secs(3600);
    let mut second = open(&store, &clock, utc_config()).await;
    let view = second.sync().await;
    assert_eq!(view.machine_state, MachineState::Paused);
    assert_eq!(view.remaining_secs, 1400);

    second.resume().await.unwrap();
    clock.advance_secs(1399);
    assert_eq!(second.sync().await.remaining_secs, 1);
    clock.advance_secs(1);
    assert_eq!(second.sync().await.machine_state, MachineState::Completed);
    assert_eq!(second.history().len(), 1);
}

#[tokio::test]
async fn corrupt_state_is_discarded() {
    let store = MemoryStore::new();
    store.plant(BACKGROUND_STATE_KEY, "\u{0}garbage").await;
    let clock = ManualClock::new(t0());

    let mut engine = open(&store, &clock, utc_config()).await;
    let view = engine.sync().await;
    assert_eq!(view.machine_state, MachineState::Idle);
    assert!(store.raw(BACKGROUND_STATE_KEY).await.is_none());
    assert!(engine.start(SessionType::Work, SessionMeta::default()).await.is_some());
}

#[tokio::test]
async fn failed_writes_keep_in_memory_state_authoritative() {
    let store = MemoryStore::new();
    let clock = ManualClock::new(t0());
    let mut engine = open(&store, &clock, utc_config()).await;

    store.set_fail_writes(true);
    engine.start(SessionType::Work, SessionMeta::default()).await.unwrap();
    assert!(store.raw(BACKGROUND_STATE_KEY).await.is_none());

    clock.advance_secs(60);
    let view = engine.sync().await;
    assert_eq!(view.machine_state, MachineState::Running);
    assert_eq!(view.remaining_secs, 1440);

    store.set_fail_writes(false);
    engine.sync().await;
    assert!(store.raw(BACKGROUND_STATE_KEY).await.is_some());
}

#[tokio::test]
async fn errored_state_can_only_be_reset() {
    let store = MemoryStore::new();
    let clock = ManualClock::new(t0());
    let session = SessionRecord::new(SessionType::Work, 1500, t0(), SessionMeta::default());
    let state = BackgroundState {
        session: Some(session),
        start_timestamp: Some(t0()),
        end_timestamp: None,
        machine_state: MachineState::Running,
        paused_remainder_secs: None,
    };
    store.plant(BACKGROUND_STATE_KEY, encode(&state).unwrap()).await;

    let mut engine = open(&store, &clock, utc_config()).await;
    clock.advance_secs(3600);
    assert!(engine.pause().await.is_none());
    assert!(engine.stop().await.is_none());

    assert!(matches!(engine.reset().await, Some(Event::TimerReset { .. })));
    assert!(engine.history().is_empty());
    assert!(store.raw(BACKGROUND_STATE_KEY).await.is_none());
    assert_eq!(engine.sync().await.machine_state, MachineState::Idle);
}

#[tokio::test]
async fn reset_refuses_healthy_running_session() {
    let store = MemoryStore::new();
    let clock = ManualClock::new(t0());
    let mut engine = open(&store, &clock, utc_config()).await;
    engine.start(SessionType::Work, SessionMeta::default()).await.unwrap();
    assert!(engine.reset().await.is_none());
    assert_eq!(engine.sync().await.machine_state, MachineState::Running);
}

#[derive(Default)]
struct Tally {
    completions: AtomicUsize,
    awards: AtomicUsize,
}

impl Notifier for Tally {
    fn notify_start(&self, _session_type: SessionType) -> Result<(), CollaboratorError> {
        Ok(())
    }

    fn notify_complete(&self, _session_type: SessionType) -> Result<(), CollaboratorError> {
        self.completions.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl RewardSink for Tally {
    fn award_points(&self, _amount: u32, _reason: &str) -> Result<(), CollaboratorError> {
        self.awards.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn check_hyperfocus(&self) -> Result<bool, CollaboratorError> {
        Ok(false)
    }
}

#[tokio::test]
async fn crash_between_commit_and_clear_keeps_the_cycle() {
    let store = MemoryStore::new();
    let now = t0();
    let clock = ManualClock::new(now);

    let counters = FocusPeriodCounters {
        current_focus_period_session_count: 3,
        session_count: 3,
        target_rounds: 4,
    };
    store
        .plant(COUNTERS_KEY, serde_json::to_vec(&counters).unwrap())
        .await;

    // The fourth work session ran out, was committed, and the process died
    // before the background state was cleared.
    let start = now - Duration::minutes(30);
    let end = start + Duration::seconds(1500);
    let session = SessionRecord::new(SessionType::Work, 1500, start, SessionMeta::default());
    let state = BackgroundState {
        session: Some(session.clone()),
        start_timestamp: Some(start),
        end_timestamp: Some(end),
        machine_state: MachineState::Running,
        paused_remainder_secs: None,
    };
    store.plant(BACKGROUND_STATE_KEY, encode(&state).unwrap()).await;

    let utc = FixedOffset::east_opt(0).unwrap();
    let mut ledger = SessionLedger::load(Arc::new(store.clone()), 4, utc, now).await;
    let mut committed = session;
    committed.close(SessionOutcome::Completed, end);
    ledger.commit(committed, now).await;
    assert_eq!(ledger.counters().session_count, 4);
    drop(ledger);

    let tally = Arc::new(Tally::default());
    let collaborators = Collaborators {
        tracker: Arc::new(NoopTracker),
        rewards: tally.clone(),
        notifier: tally.clone(),
    };
    let mut config = utc_config();
    config.cycle.auto_start_breaks = true;
    let mut engine = FocusEngine::open_with(
        Arc::new(store.clone()),
        config,
        Arc::new(clock.clone()),
        collaborators,
    )
    .await;

    let view = engine.sync().await;
    assert_eq!(view.upcoming, SessionType::LongBreak);
    assert_eq!(view.machine_state, MachineState::Completed);
    assert!(view.pending_continuation.is_none());
    assert_eq!(view.counters.session_count, 4);
    assert_eq!(view.counters.current_focus_period_session_count, 4);
    assert_eq!(engine.history().len(), 1);

    assert_eq!(tally.completions.load(Ordering::SeqCst), 0);
    assert_eq!(tally.awards.load(Ordering::SeqCst), 0);
    assert!(engine.drain_events().is_empty());
    assert!(store.raw(BACKGROUND_STATE_KEY).await.is_none());
}

#[tokio::test]
async fn impossible_paused_remainder_is_reset_not_resumed() {
    let store = MemoryStore::new();
    let clock = ManualClock::new(t0());
    let session = SessionRecord::new(SessionType::Work, 1500, t0(), SessionMeta::default());
    let state = BackgroundState {
        session: Some(session),
        start_timestamp: Some(t0()),
        end_timestamp: Some(t0() + Duration::seconds(1500)),
        machine_state: MachineState::Paused,
        paused_remainder_secs: Some(u64::MAX),
    };
    store.plant(BACKGROUND_STATE_KEY, encode(&state).unwrap()).await;

    let mut engine = open(&store, &clock, utc_config()).await;
    engine.sync().await;
    assert!(engine.resume().await.is_none());
    assert!(matches!(engine.reset().await, Some(Event::TimerReset { .. })));
    assert_eq!(engine.sync().await.machine_state, MachineState::Idle);
    assert!(engine.start(SessionType::Work, SessionMeta::default()).await.is_some());
}
