//! Capsule persistence over a [`KeyValueStore`].
//!
//! The key is the capsule id and the value the JSON record. There is no
//! transactional read-modify-write: two sessions updating the same capsule
//! race and the last `set` wins.

use super::model::{Capsule, CapsuleId};
use crate::error::{CapsuleError, Result};
use crate::host::KeyValueStore;
use std::sync::Arc;
use tracing::debug;

/// Typed get/set/update of capsule records.
#[derive(Clone)]
pub struct CapsuleStore {
    kv: Arc<dyn KeyValueStore>,
}

impl CapsuleStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Load a capsule, `None` when nothing is stored under `id`.
    ///
    /// # Errors
    ///
    /// Propagates store read failures and returns
    /// [`CapsuleError::Serialization`] for a corrupt record.
    pub async fn load(&self, id: &CapsuleId) -> Result<Option<Capsule>> {
        let Some(raw) = self.kv.get(id.as_str()).await? else {
            return Ok(None);
        };
        let capsule: Capsule = serde_json::from_str(&raw)
            .map_err(|e| CapsuleError::Serialization(format!("capsule {id}: {e}")))?;
        Ok(Some(capsule))
    }

    /// Load a capsule that must exist.
    ///
    /// # Errors
    ///
    /// Returns [`CapsuleError::CapsuleNotFound`] when absent.
    pub async fn get(&self, id: &CapsuleId) -> Result<Capsule> {
        self.load(id)
            .await?
            .ok_or_else(|| CapsuleError::CapsuleNotFound(id.to_string()))
    }

    /// Write the whole record, replacing whatever was stored.
    ///
    /// # Errors
    ///
    /// Any store failure is reported as [`CapsuleError::StoreWriteFailed`].
    pub async fn save(&self, capsule: &Capsule) -> Result<()> {
        let json = serde_json::to_string(capsule)?;
        self.kv
            .set(capsule.id.as_str(), json)
            .await
            .map_err(|e| match e {
                CapsuleError::StoreWriteFailed(_) => e,
                other => CapsuleError::StoreWriteFailed(format!("capsule {}: {other}", capsule.id)),
            })?;
        debug!(capsule_id = %capsule.id, buried = capsule.buried, "capsule saved");
        Ok(())
    }

    /// Read, mutate and write back. Not atomic.
    ///
    /// Nothing is written when `mutate` fails.
    pub async fn update<F>(&self, id: &CapsuleId, mutate: F) -> Result<Capsule>
    where
        F: FnOnce(&mut Capsule) -> Result<()> + Send,
    {
        let mut capsule = self.get(id).await?;
        mutate(&mut capsule)?;
        self.save(&capsule).await?;
        Ok(capsule)
    }
}
