//! In-process state store.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::Snapshot;
use crate::storage::StateStore;

/// Single slot kept in memory; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    slot: Mutex<Option<Snapshot>>,
    saves: Mutex<usize>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing snapshot, e.g. one loaded from the real store.
    pub fn seeded(snapshot: Option<Snapshot>) -> Self {
        Self {
            slot: Mutex::new(snapshot),
            saves: Mutex::new(0),
        }
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves.lock().map(|n| *n).unwrap_or(0)
    }

    pub fn current(&self) -> Option<Snapshot> {
        self.slot.lock().ok().and_then(|s| s.clone())
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self) -> Result<Option<Snapshot>> {
        let slot = self
            .slot
            .lock()
            .map_err(|_| AppError::storage("memory store poisoned"))?;
        Ok(slot.clone())
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| AppError::storage("memory store poisoned"))?;
        *slot = Some(snapshot.clone());
        if let Ok(mut saves) = self.saves.lock() {
            *saves += 1;
        }
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
