use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::{field_matches, RecordStore, StoreError};
use crate::registration::types::{RecordId, StoredRegistration};

/// In-process record store keeping each registration as a JSON document
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: RwLock<Vec<(RecordId, serde_json::Value)>>,
    offline: AtomicBool,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate losing (or regaining) the connection to the backend
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Insert a document as-is, bypassing registration types
    pub async fn seed(&self, document: serde_json::Value) -> RecordId {
        let id = RecordId::new_v4();
        self.records.write().await.push((id.clone(), document));
        id
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Snapshot of every stored document, in append order
    pub async fn records(&self) -> Vec<(RecordId, serde_json::Value)> {
        self.records.read().await.clone()
    }

    fn ensure_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "in-memory store is offline".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn exists(&self, field_name: &str, value: &str) -> Result<bool, StoreError> {
        self.ensure_online()?;
        let records = self.records.read().await;
        let found = records
            .iter()
            .any(|(_, doc)| field_matches(doc, field_name, value));
        debug!(field = field_name, found, "In-memory existence query");
        Ok(found)
    }

    async fn append(&self, record: &StoredRegistration) -> Result<RecordId, StoreError> {
        self.ensure_online()?;
        let document = serde_json::to_value(record)
            .map_err(|e| StoreError::WriteRejected(e.to_string()))?;
        let id = RecordId::new_v4();
        self.records.write().await.push((id.clone(), document));
        info!(record_id = %id, "Appended registration to in-memory store");
        Ok(id)
    }
}
