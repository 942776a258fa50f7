use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::io::SeekFrom;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{field_matches, RecordStore, StoreError};
use crate::registration::types::{RecordId, StoredRegistration};

/// One line of the collection file
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Entry {
    id: RecordId,
    #[serde(flatten)]
    document: serde_json::Value,
}

/// Append-only collection stored as one JSON document per line
#[derive(Debug)]
pub struct JsonLinesRecordStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonLinesRecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_entries(&self) -> Result<Vec<Entry>, StoreError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        for (line_no, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Entry>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!(
                    path = %self.path.display(),
                    line = line_no + 1,
                    error = %e,
                    "Skipping unreadable registration line"
                ),
            }
        }
        Ok(entries)
    }

    /// Every stored document with its id, in file order
    pub async fn records(&self) -> Result<Vec<(RecordId, serde_json::Value)>, StoreError> {
        Ok(self
            .read_entries()
            .await?
            .into_iter()
            .map(|e| (e.id, e.document))
            .collect())
    }
}

#[async_trait::async_trait]
impl RecordStore for JsonLinesRecordStore {
    async fn exists(&self, field_name: &str, value: &str) -> Result<bool, StoreError> {
        let found = self
            .read_entries()
            .await?
            .iter()
            .any(|e| field_matches(&e.document, field_name, value));
        debug!(path = %self.path.display(), field = field_name, found, "File existence query");
        Ok(found)
    }

    async fn append(&self, record: &StoredRegistration) -> Result<RecordId, StoreError> {
        let entry = Entry {
            id: RecordId::new_v4(),
            document: serde_json::to_value(record)
                .map_err(|e| StoreError::WriteRejected(e.to_string()))?,
        };
        let mut line =
            serde_json::to_string(&entry).map_err(|e| StoreError::WriteRejected(e.to_string()))?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .await?;
        if ends_mid_line(&mut file).await? {
            warn!(path = %self.path.display(), "Collection file lacks a trailing newline, terminating last line");
            line.insert(0, '\n');
        }
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        info!(record_id = %entry.id, path = %self.path.display(), "Appended registration to file store");
        Ok(entry.id)
    }
}

/// Whether the last byte of a non-empty file is something other than a newline
async fn ends_mid_line(file: &mut tokio::fs::File) -> Result<bool, StoreError> {
    if file.metadata().await?.len() == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1)).await?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last).await?;
    Ok(last[0] != b'\n')
}
