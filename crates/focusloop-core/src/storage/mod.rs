mod config;
pub mod database;
pub mod memory;
pub mod recovery;

pub use config::{
    AdaptiveConfig, Config, CycleConfig, DurationsConfig, StatsConfig, TrackingConfig,
};
pub use database::SqliteStore;
pub use memory::MemoryStore;
pub use recovery::{BackgroundState, RecoveryCodec, STATE_VERSION};

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::StoreError;

/// External key-value byte store.
///
/// Writes are whole-value replacements; there is no partial update.
#[async_trait]
pub trait ByteStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
    async fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Returns the focusloop data directory.
///
/// `FOCUSLOOP_DATA_DIR` wins if set; otherwise `~/.config/focusloop[-dev]/`
/// depending on `FOCUSLOOP_ENV`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let dir = match std::env::var_os("FOCUSLOOP_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env =
                std::env::var("FOCUSLOOP_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("focusloop-dev")
            } else {
                base_dir.join("focusloop")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
