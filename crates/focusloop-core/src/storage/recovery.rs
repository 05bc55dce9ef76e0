//! Persisted background state and its codec.
//!
//! The background state is the minimum needed for a fresh process to
//! recompute remaining time: the open session, the absolute start and end of
//! the running interval, the machine state and, while paused, the remainder.
//!
//! ## Wire format
//!
//! ```text
//! {"version": 1, "state": {"session": {...}, "start_timestamp": "...", ...}}
//! ```
//!
//! A bare state object without the envelope is accepted as a legacy payload
//! and upgraded. Any other version is rejected.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::ByteStore;
use crate::error::CodecError;
use crate::session::SessionRecord;
use crate::timer::MachineState;

pub const STATE_VERSION: u32 = 1;

pub const BACKGROUND_STATE_KEY: &str = "background_state";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackgroundState {
    #[serde(default)]
    pub session: Option<SessionRecord>,
    #[serde(default)]
    pub start_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_timestamp: Option<DateTime<Utc>>,
    pub machine_state: MachineState,
    #[serde(default)]
    pub paused_remainder_secs: Option<u64>,
}

#[derive(Serialize)]
struct EnvelopeOut<'a> {
    version: u32,
    state: &'a BackgroundState,
}

#[derive(Deserialize)]
struct EnvelopeIn {
    version: u32,
    state: serde_json::Value,
}

/// Encode a state into the versioned envelope.
pub fn encode(state: &BackgroundState) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(&EnvelopeOut {
        version: STATE_VERSION,
        state,
    })
    .map_err(|e| CodecError::Corrupt(e.to_string()))
}

/// Decode a stored payload, upgrading legacy unversioned payloads.
pub fn decode(bytes: &[u8]) -> Result<BackgroundState, CodecError> {
    let value: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|e| CodecError::Corrupt(e.to_string()))?;

    let is_envelope = value.get("version").is_some() && value.get("state").is_some();
    if !is_envelope {
        debug!("upgrading unversioned background state");
        return serde_json::from_value(value).map_err(|e| CodecError::Corrupt(e.to_string()));
    }

    let envelope: EnvelopeIn =
        serde_json::from_value(value).map_err(|e| CodecError::Corrupt(e.to_string()))?;
    match envelope.version {
        STATE_VERSION => serde_json::from_value(envelope.state)
            .map_err(|e| CodecError::Corrupt(e.to_string())),
        other => Err(CodecError::UnsupportedVersion(other)),
    }
}

/// Reads and writes [`BackgroundState`] through a [`ByteStore`].
#[derive(Clone)]
pub struct RecoveryCodec {
    store: Arc<dyn ByteStore>,
    key: String,
}

impl RecoveryCodec {
    pub fn new(store: Arc<dyn ByteStore>) -> Self {
        Self {
            store,
            key: BACKGROUND_STATE_KEY.to_string(),
        }
    }

    /// Persist the whole state, replacing whatever was stored before.
    pub async fn save(&self, state: &BackgroundState) -> Result<(), CodecError> {
        let bytes = encode(state)?;
        self.store.set(&self.key, &bytes).await?;
        Ok(())
    }

    /// Load the persisted state.
    ///
    /// A corrupt or unsupported payload is cleared and reported as absent.
    /// Only an unreachable store is returned as an error.
    pub async fn load(&self) -> Result<Option<BackgroundState>, CodecError> {
        let Some(bytes) = self.store.get(&self.key).await? else {
            return Ok(None);
        };
        match decode(&bytes) {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                warn!(error = %e, "discarding unreadable background state");
                if let Err(clear_err) = self.clear().await {
                    warn!(error = %clear_err, "failed to clear corrupt background state");
                }
                Ok(None)
            }
        }
    }

    pub async fn clear(&self) -> Result<(), CodecError> {
        self.store.delete(&self.key).await?;
        Ok(())
    }
}
