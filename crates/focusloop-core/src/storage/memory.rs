//! In-memory byte store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::ByteStore;
use crate::error::StoreError;

/// A [`ByteStore`] backed by a shared `HashMap`.
///
/// Clones share the same map, which lets a test simulate a process restart by
/// handing a clone to a fresh engine. Writes can be made to fail on demand.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `set`/`delete` fail until turned off again.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Raw access for inspecting or planting payloads.
    pub async fn raw(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.lock().await.get(key).cloned()
    }

    pub async fn plant(&self, key: &str, value: impl Into<Vec<u8>>) {
        self.entries.lock().await.insert(key.to_string(), value.into());
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Io("memory store is read-only".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl ByteStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.check_writable()?;
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.check_writable()?;
        self.entries.lock().await.remove(key);
        Ok(())
    }
}
