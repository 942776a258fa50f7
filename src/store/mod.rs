//! Record store abstraction
//!
//! The registration flow only ever needs two things from its backend: a
//! field-equality existence query and an append-only write. Both are async and
//! the trait is object safe, so callers can hand the flow an
//! `Arc<dyn RecordStore>` or any concrete store.
//!
//! ```rust,no_run
//! use golf_registration::store::{InMemoryRecordStore, RecordStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = InMemoryRecordStore::new();
//!     let taken = store.exists("username", "tiger").await?;
//!     assert!(!taken);
//!     Ok(())
//! }
//! ```
use thiserror::Error;

use crate::registration::types::{RecordId, StoredRegistration};

pub mod jsonl;
pub mod memory;

pub use jsonl::JsonLinesRecordStore;
pub use memory::InMemoryRecordStore;

#[cfg(any(test, feature = "testing"))]
use mockall::automock;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record store unavailable: {0}")]
    Unavailable(String),
    #[error("Record store rejected the write: {0}")]
    WriteRejected(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

/// Backend holding submitted registrations
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    /// Whether any record has `field_name` equal to `value`
    async fn exists(&self, field_name: &str, value: &str) -> Result<bool, StoreError>;

    /// Append a new record to the collection
    async fn append(&self, record: &StoredRegistration) -> Result<RecordId, StoreError>;
}

#[async_trait::async_trait]
impl<S: RecordStore + ?Sized> RecordStore for std::sync::Arc<S> {
    async fn exists(&self, field_name: &str, value: &str) -> Result<bool, StoreError> {
        (**self).exists(field_name, value).await
    }

    async fn append(&self, record: &StoredRegistration) -> Result<RecordId, StoreError> {
        (**self).append(record).await
    }
}

/// True when `document` has a top-level string `field_name` equal to `value`
pub(crate) fn field_matches(document: &serde_json::Value, field_name: &str, value: &str) -> bool {
    document
        .get(field_name)
        .and_then(serde_json::Value::as_str)
        .is_some_and(|v| v == value)
}
