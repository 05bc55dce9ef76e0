//! Narrow interfaces to the engine's external collaborators.
//!
//! Every call is best-effort: the engine logs a [`CollaboratorError`] and
//! finishes its own transition regardless.

use tracing::info;

use crate::error::CollaboratorError;
use crate::session::{SessionType, UsageSummary};

/// Foreground-application usage poller.
pub trait UsageTracker: Send + Sync {
    fn start_tracking(&self, interval_secs: u64) -> Result<(), CollaboratorError>;
    fn stop_tracking(&self) -> Result<UsageSummary, CollaboratorError>;
    fn is_tracking(&self) -> bool;
}

/// Gamification and hyperfocus detection.
pub trait RewardSink: Send + Sync {
    fn award_points(&self, amount: u32, reason: &str) -> Result<(), CollaboratorError>;
    /// Returns `true` when prolonged continuous focus was detected.
    fn check_hyperfocus(&self) -> Result<bool, CollaboratorError>;
}

pub trait Notifier: Send + Sync {
    fn notify_start(&self, session_type: SessionType) -> Result<(), CollaboratorError>;
    fn notify_complete(&self, session_type: SessionType) -> Result<(), CollaboratorError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTracker;

impl UsageTracker for NoopTracker {
    fn start_tracking(&self, _interval_secs: u64) -> Result<(), CollaboratorError> {
        Ok(())
    }

    fn stop_tracking(&self) -> Result<UsageSummary, CollaboratorError> {
        Ok(UsageSummary::default())
    }

    fn is_tracking(&self) -> bool {
        false
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRewards;

impl RewardSink for NoopRewards {
    fn award_points(&self, _amount: u32, _reason: &str) -> Result<(), CollaboratorError> {
        Ok(())
    }

    fn check_hyperfocus(&self) -> Result<bool, CollaboratorError> {
        Ok(false)
    }
}

/// Emits notifications as tracing events.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify_start(&self, session_type: SessionType) -> Result<(), CollaboratorError> {
        info!(session = session_type.label(), "session started");
        Ok(())
    }

    fn notify_complete(&self, session_type: SessionType) -> Result<(), CollaboratorError> {
        info!(session = session_type.label(), "session complete");
        Ok(())
    }
}
