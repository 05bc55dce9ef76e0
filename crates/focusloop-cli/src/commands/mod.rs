pub mod config;
pub mod history;
pub mod period;
pub mod signals;
pub mod stats;
pub mod timer;

use focusloop_core::FocusEngine;
use serde::Serialize;
use tracing::debug;

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Open the engine on the on-disk store with the on-disk config.
pub async fn open_engine() -> focusloop_core::Result<FocusEngine> {
    let engine = FocusEngine::open_default().await?;
    debug!(upcoming = engine.upcoming().label(), "engine opened");
    Ok(engine)
}

pub fn print_json<T: Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
