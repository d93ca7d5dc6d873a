//! JSON-ledger request store persisted with atomic rewrites.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use desk_core::{
    current_unix_timestamp_ms, write_text_atomic, NewRequest, RequestRecord, RequestStatus,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::{build_record, list_newest_first, RequestStore, RequestStoreError, StoreResult};

const REQUEST_LEDGER_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RequestLedger {
    schema_version: u32,
    #[serde(default)]
    requests: Vec<RequestRecord>,
}

impl Default for RequestLedger {
    fn default() -> Self {
        Self {
            schema_version: REQUEST_LEDGER_SCHEMA_VERSION,
            requests: Vec::new(),
        }
    }
}

fn load_ledger(path: &Path) -> StoreResult<RequestLedger> {
    if !path.exists() {
        return Ok(RequestLedger::default());
    }
    let raw = std::fs::read_to_string(path)?;
    let ledger = serde_json::from_str::<RequestLedger>(&raw)?;
    if ledger.schema_version != REQUEST_LEDGER_SCHEMA_VERSION {
        return Err(RequestStoreError::UnsupportedSchema {
            expected: REQUEST_LEDGER_SCHEMA_VERSION,
            found: ledger.schema_version,
        });
    }
    Ok(ledger)
}

fn save_ledger(path: &Path, ledger: &RequestLedger) -> StoreResult<()> {
    let mut payload = serde_json::to_string_pretty(ledger)?;
    payload.push('\n');
    write_text_atomic(path, &payload)
        .map_err(|error| RequestStoreError::LedgerWrite(format!("{error:#}")))
}

/// Durable request store backed by one schema-versioned JSON ledger file.
#[derive(Debug)]
pub struct FileRequestStore {
    path: PathBuf,
    ledger: RwLock<RequestLedger>,
    next_sequence: AtomicU64,
}

impl FileRequestStore {
    /// Opens (or initializes) the ledger at `path`.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let ledger = load_ledger(&path)?;
        let next_sequence = AtomicU64::new(ledger.requests.len() as u64);
        Ok(Self {
            path,
            ledger: RwLock::new(ledger),
            next_sequence,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RequestStore for FileRequestStore {
    async fn insert_request(&self, new_request: NewRequest) -> StoreResult<RequestRecord> {
        let mut ledger = self.ledger.write().await;
        if let Some(external) = new_request.external_issue_id.as_deref() {
            if ledger
                .requests
                .iter()
                .any(|record| record.external_issue_id.as_deref() == Some(external))
            {
                return Err(RequestStoreError::DuplicateExternalIssue(
                    external.to_string(),
                ));
            }
        }
        let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let record = build_record(new_request, sequence, current_unix_timestamp_ms());
        ledger.requests.push(record.clone());
        save_ledger(&self.path, &ledger)?;
        Ok(record)
    }

    async fn get_request(&self, request_id: &str) -> StoreResult<Option<RequestRecord>> {
        let ledger = self.ledger.read().await;
        Ok(ledger
            .requests
            .iter()
            .find(|record| record.id == request_id)
            .cloned())
    }

    async fn find_by_external_issue_id(
        &self,
        external_issue_id: &str,
    ) -> StoreResult<Option<RequestRecord>> {
        let ledger = self.ledger.read().await;
        Ok(ledger
            .requests
            .iter()
            .find(|record| record.external_issue_id.as_deref() == Some(external_issue_id))
            .cloned())
    }

    async fn update_status(
        &self,
        request_id: &str,
        status: RequestStatus,
    ) -> StoreResult<RequestRecord> {
        let mut ledger = self.ledger.write().await;
        let record = ledger
            .requests
            .iter_mut()
            .find(|record| record.id == request_id)
            .ok_or_else(|| RequestStoreError::RequestNotFound(request_id.to_string()))?;
        if record.status == status {
            // Re-applied status: keep the ledger file untouched.
            return Ok(record.clone());
        }
        record.status = status;
        let updated = record.clone();
        save_ledger(&self.path, &ledger)?;
        Ok(updated)
    }

    async fn list_requests(&self, organization_id: Option<&str>) -> StoreResult<Vec<RequestRecord>> {
        let ledger = self.ledger.read().await;
        Ok(list_newest_first(&ledger.requests, organization_id))
    }
}
