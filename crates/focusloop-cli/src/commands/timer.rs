use std::sync::Arc;
use std::time::Duration;

use clap::Subcommand;
use focusloop_core::{
    spawn_sync_loop, CurrentView, EngineHandle, Event, SessionMeta, SessionType,
};
use serde::Serialize;
use tokio::sync::Mutex;

use super::{open_engine, print_json, CmdResult};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start a session (the next one in the cycle unless --type is given)
    Start {
        /// work, short-break or long-break
        #[arg(long = "type", value_name = "TYPE")]
        session_type: Option<SessionType>,
        /// Task label
        #[arg(long)]
        label: Option<String>,
        /// Tag (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long)]
        icon: Option<String>,
    },
    /// Pause the running session
    Pause,
    /// Resume the paused session
    Resume,
    /// Abandon the current session
    Stop,
    /// Finish the current session now
    Complete,
    /// Abandon the current session and move on to the next stage
    Skip,
    /// Discard an unrecoverable session or a pending auto-start
    Reset,
    /// Edit the current session's label, tags or icon
    Annotate {
        #[arg(long)]
        label: Option<String>,
        /// Replaces all tags (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long)]
        icon: Option<String>,
    },
    /// Print the reconciled timer state as JSON
    Status,
    /// Keep syncing and print a JSON line per view and event
    Watch {
        /// Sync period in milliseconds
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
        /// Stop after this many views
        #[arg(long)]
        count: Option<u64>,
    },
}

#[derive(Serialize)]
struct Report {
    events: Vec<Event>,
    view: CurrentView,
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum WatchLine {
    View(CurrentView),
    Event(Event),
}

fn require(event: Option<Event>, refusal: &str) -> CmdResult {
    match event {
        Some(_) => Ok(()),
        None => Err(refusal.into()),
    }
}

pub async fn run(action: TimerAction) -> CmdResult {
    if let TimerAction::Watch { interval_ms, count } = action {
        return watch(interval_ms, count).await;
    }

    let mut engine = open_engine().await?;

    match action {
        TimerAction::Start {
            session_type,
            label,
            tags,
            icon,
        } => {
            let meta = SessionMeta {
                task_label: label,
                tags,
                icon,
            };
            let started = match session_type {
                Some(session_type) => engine.start(session_type, meta).await,
                None => engine.start_next(meta).await,
            };
            require(started, "a session is already active")?;
        }
        TimerAction::Pause => require(engine.pause().await, "no running session to pause")?,
        TimerAction::Resume => require(engine.resume().await, "no paused session to resume")?,
        TimerAction::Stop => require(engine.stop().await, "no active session to stop")?,
        TimerAction::Complete => {
            require(engine.complete().await, "no active session to complete")?
        }
        TimerAction::Skip => require(engine.skip().await, "no active session to skip")?,
        TimerAction::Reset => require(engine.reset().await, "nothing to reset")?,
        TimerAction::Annotate { label, tags, icon } => {
            let tags = (!tags.is_empty()).then_some(tags);
            require(
                engine.annotate(label, tags, icon).await,
                "no active session to annotate",
            )?
        }
        TimerAction::Status | TimerAction::Watch { .. } => {}
    }

    let view = engine.sync().await;
    print_json(&Report {
        events: engine.drain_events(),
        view,
    })
}

async fn watch(interval_ms: u64, count: Option<u64>) -> CmdResult {
    let engine: EngineHandle = Arc::new(Mutex::new(open_engine().await?));
    let mut sync_loop =
        spawn_sync_loop(engine, Duration::from_millis(interval_ms.max(1))).await;

    let mut printed = 0u64;
    loop {
        tokio::select! {
            changed = sync_loop.views.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = sync_loop.views.borrow_and_update().clone();
                println!("{}", serde_json::to_string(&WatchLine::View(view))?);
                printed += 1;
                if count.is_some_and(|limit| printed >= limit) {
                    break;
                }
            }
            Some(event) = sync_loop.events.recv() => {
                println!("{}", serde_json::to_string(&WatchLine::Event(event))?);
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    sync_loop.stop();
    Ok(())
}
