//! Periodic sync driver for hosts that stay resident.
//!
//! The engine never ticks on its own. A resident host shares it behind an
//! [`EngineHandle`] and lets [`spawn_sync_loop`] call `sync()` on a cadence,
//! which is also what fires delayed auto-starts.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::debug;

use super::engine::{CurrentView, FocusEngine};
use crate::events::Event;

/// Shared handle to the single engine instance.
pub type EngineHandle = Arc<Mutex<FocusEngine>>;

pub struct SyncLoop {
    pub handle: JoinHandle<()>,
    /// Latest view after every sync.
    pub views: watch::Receiver<CurrentView>,
    /// Events drained from the engine after every sync.
    pub events: tokio::sync::mpsc::UnboundedReceiver<Event>,
}

impl SyncLoop {
    pub fn stop(&self) {
        self.handle.abort();
    }
}

/// Spawn a task that syncs `engine` every `period` until aborted.
pub async fn spawn_sync_loop(engine: EngineHandle, period: Duration) -> SyncLoop {
    let initial = engine.lock().await.sync().await;
    let (view_tx, views) = watch::channel(initial);
    let (event_tx, events) = tokio::sync::mpsc::unbounded_channel();

    let handle = tokio::spawn(async move {
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;

            let (view, drained) = {
                let mut guard = engine.lock().await;
                let view = guard.sync().await;
                (view, guard.drain_events())
            };

            for event in drained {
                if event_tx.send(event).is_err() {
                    debug!("event receiver dropped");
                }
            }
            if view_tx.send(view).is_err() {
                debug!("view receiver dropped, stopping sync loop");
                break;
            }
        }
    });

    SyncLoop {
        handle,
        views,
        events,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::session::{SessionMeta, SessionType};
    use crate::storage::{Config, MemoryStore};
    use crate::timer::{Collaborators, MachineState};

    #[tokio::test]
    async fn loop_publishes_views_and_events() {
        let clock = ManualClock::new(chrono::Utc::now());
        let engine = FocusEngine::open_with(
            Arc::new(MemoryStore::new()),
            Config::default(),
            Arc::new(clock.clone()),
            Collaborators::default(),
        )
        .await;
        let handle: EngineHandle = Arc::new(Mutex::new(engine));
        handle
            .lock()
            .await
            .start(SessionType::Work, SessionMeta::default())
            .await;

        let mut sync_loop = spawn_sync_loop(handle.clone(), Duration::from_millis(10)).await;
        assert_eq!(sync_loop.views.borrow().machine_state, MachineState::Running);

        clock.advance_secs(25 * 60);
        let mut closed = false;
        for _ in 0..50 {
            match time::timeout(Duration::from_secs(1), sync_loop.events.recv()).await {
                Ok(Some(Event::SessionClosed { .. })) => {
                    closed = true;
                    break;
                }
                Ok(Some(_)) => continue,
                _ => break,
            }
        }
        assert!(closed);
        sync_loop.stop();
    }
}
