//! Session records.
//!
//! A [`SessionRecord`] is open while it is the current session and becomes
//! immutable once [`SessionRecord::close`] has set its outcome.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    Work,
    ShortBreak,
    LongBreak,
}

impl SessionType {
    pub fn is_break(self) -> bool {
        !matches!(self, SessionType::Work)
    }

    pub fn label(self) -> &'static str {
        match self {
            SessionType::Work => "Work",
            SessionType::ShortBreak => "Short Break",
            SessionType::LongBreak => "Long Break",
        }
    }
}

impl std::str::FromStr for SessionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "work" | "focus" => Ok(SessionType::Work),
            "short_break" | "short" | "break" => Ok(SessionType::ShortBreak),
            "long_break" | "long" => Ok(SessionType::LongBreak),
            other => Err(format!("unknown session type: {other}")),
        }
    }
}

/// How a session was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionOutcome {
    Completed,
    Stopped,
    Skipped,
}

/// Opaque usage payload handed back by the foreground-usage tracker.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UsageSummary(pub serde_json::Value);

/// Descriptive metadata that may be edited while a session is current.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionMeta {
    #[serde(default)]
    pub task_label: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub session_type: SessionType,
    pub planned_duration_secs: u64,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub outcome: Option<SessionOutcome>,
    #[serde(flatten)]
    pub meta: SessionMeta,
    #[serde(default)]
    pub usage: Option<UsageSummary>,
    /// Why the planned duration differs from the configured base, if it does.
    #[serde(default)]
    pub adaptation_reason: Option<String>,
}

impl SessionRecord {
    pub fn new(
        session_type: SessionType,
        planned_duration_secs: u64,
        start_time: DateTime<Utc>,
        meta: SessionMeta,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            session_type,
            planned_duration_secs,
            start_time,
            end_time: None,
            outcome: None,
            meta,
            usage: None,
            adaptation_reason: None,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.outcome.is_some()
    }

    /// Close the session. Returns `false` (and changes nothing) if it was
    /// already closed.
    pub fn close(&mut self, outcome: SessionOutcome, at: DateTime<Utc>) -> bool {
        if self.is_closed() {
            return false;
        }
        self.outcome = Some(outcome);
        self.end_time = Some(at);
        true
    }

    /// Replace descriptive metadata. Ignored once the session is closed.
    pub fn annotate(
        &mut self,
        task_label: Option<String>,
        tags: Option<Vec<String>>,
        icon: Option<String>,
    ) -> bool {
        if self.is_closed() {
            return false;
        }
        if let Some(label) = task_label {
            self.meta.task_label = Some(label);
        }
        if let Some(tags) = tags {
            self.meta.tags = tags;
        }
        if let Some(icon) = icon {
            self.meta.icon = Some(icon);
        }
        true
    }

    /// Usage payload is only kept for closed work sessions.
    pub fn attach_usage(&mut self, usage: UsageSummary) {
        if self.session_type == SessionType::Work && self.is_closed() && self.usage.is_none() {
            self.usage = Some(usage);
        }
    }

    /// Wall-clock seconds between start and closure; `None` while open.
    pub fn elapsed_secs(&self) -> Option<i64> {
        self.end_time
            .map(|end| end.signed_duration_since(self.start_time).num_seconds())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn open_work() -> SessionRecord {
        SessionRecord::new(SessionType::Work, 1500, Utc::now(), SessionMeta::default())
    }

    #[test]
    fn close_sets_outcome_once() {
        let mut rec = open_work();
        let first = rec.start_time + Duration::minutes(25);
        assert!(rec.close(SessionOutcome::Completed, first));
        assert!(!rec.close(SessionOutcome::Stopped, first + Duration::minutes(1)));
        assert_eq!(rec.outcome, Some(SessionOutcome::Completed));
        assert_eq!(rec.end_time, Some(first));
        assert_eq!(rec.elapsed_secs(), Some(1500));
    }

    #[test]
    fn annotate_only_while_open() {
        let mut rec = open_work();
        assert!(rec.annotate(Some("write docs".into()), Some(vec!["docs".into()]), None));
        rec.close(SessionOutcome::Stopped, Utc::now());
        assert!(!rec.annotate(Some("other".into()), None, Some("pen".into())));
        assert_eq!(rec.meta.task_label.as_deref(), Some("write docs"));
        assert!(rec.meta.icon.is_none());
    }

    #[test]
    fn usage_only_attached_to_closed_work() {
        let mut brk = SessionRecord::new(SessionType::ShortBreak, 300, Utc::now(), SessionMeta::default());
        brk.close(SessionOutcome::Completed, Utc::now());
        brk.attach_usage(UsageSummary(serde_json::json!({"editor": 120})));
        assert!(brk.usage.is_none());

        let mut work = open_work();
        work.attach_usage(UsageSummary(serde_json::json!({"editor": 120})));
        assert!(work.usage.is_none());
        work.close(SessionOutcome::Completed, Utc::now());
        work.attach_usage(UsageSummary(serde_json::json!({"editor": 120})));
        assert!(work.usage.is_some());
    }

    #[test]
    fn parse_session_type() {
        assert_eq!("work".parse::<SessionType>().unwrap(), SessionType::Work);
        assert_eq!("long-break".parse::<SessionType>().unwrap(), SessionType::LongBreak);
        assert!("nap".parse::<SessionType>().is_err());
    }
}
