//! # focusloop Core Library
//!
//! Timer scheduling and recovery engine for a focus-session timer
//! (work / short break / long break) whose host process may be killed and
//! restarted at any moment.
//!
//! ## Architecture
//!
//! - **Timer Engine**: a wall-clock-based state machine. Remaining time is
//!   always recomputed from persisted timestamps; the host calls `sync()` on a
//!   cadence instead of the engine ticking
//! - **Recovery Store**: versioned background state in an external
//!   key-value byte store (SQLite-backed for the CLI)
//! - **Session Ledger**: history, too-short gating, stats and streaks
//! - **Continuation Planner**: long-break rhythm and auto-start decisions
//! - **Duration Policy**: adaptive durations from energy and mood
//!
//! ## Key Components
//!
//! - [`FocusEngine`]: the single authoritative timer
//! - [`SessionLedger`]: closed-session history and statistics
//! - [`RecoveryCodec`]: persisted background state
//! - [`Config`]: application configuration management

pub mod clock;
pub mod collaborators;
pub mod error;
pub mod events;
pub mod ledger;
pub mod planner;
pub mod policy;
pub mod session;
pub mod storage;
pub mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use collaborators::{LogNotifier, NoopRewards, NoopTracker, Notifier, RewardSink, UsageTracker};
pub use error::{CodecError, CollaboratorError, ConfigError, CoreError, Result, StoreError};
pub use events::Event;
pub use ledger::{AggregateStats, FocusPeriodCounters, SessionLedger, MIN_SESSION_SECS};
pub use planner::{decide, Continuation};
pub use policy::{adapt, AdaptationMode, AdaptedDuration, MoodState, UserSignals};
pub use session::{SessionMeta, SessionOutcome, SessionRecord, SessionType, UsageSummary};
pub use storage::{BackgroundState, ByteStore, Config, MemoryStore, RecoveryCodec, SqliteStore};
pub use timer::{
    spawn_sync_loop, Collaborators, CurrentView, EngineHandle, FocusEngine, MachineState,
    PendingContinuation, SyncLoop,
};
