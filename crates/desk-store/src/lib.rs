//! Request store abstractions plus in-memory and file-backed implementations.
//!
//! The store is the only mutable shared resource in the synchronization
//! pipeline: each handler invocation performs one scoped read-then-write on a
//! single record identified by its external issue id.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use desk_core::{current_unix_timestamp_ms, NewRequest, RequestRecord, RequestStatus};
use thiserror::Error;
use tokio::sync::RwLock;

mod file_store;

pub use file_store::FileRequestStore;

/// Result type for request store operations.
pub type StoreResult<T> = Result<T, RequestStoreError>;

/// Errors returned by store implementations.
#[derive(Debug, Error)]
pub enum RequestStoreError {
    #[error("request '{0}' not found")]
    RequestNotFound(String),
    #[error("external issue '{0}' is already joined to a request")]
    DuplicateExternalIssue(String),
    #[error("unsupported request ledger schema: expected {expected}, found {found}")]
    UnsupportedSchema { expected: u32, found: u32 },
    #[error("ledger write failed: {0}")]
    LedgerWrite(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Async store contract used by the synchronization handler and the gateway.
#[async_trait]
pub trait RequestStore: Send + Sync {
    /// Inserts a new request with `status=PENDING`, assigning its id and
    /// creation timestamp. Rejects a second request joining the same
    /// external issue id.
    async fn insert_request(&self, new_request: NewRequest) -> StoreResult<RequestRecord>;

    async fn get_request(&self, request_id: &str) -> StoreResult<Option<RequestRecord>>;

    /// Looks up the request joined to an external tracker issue, if any.
    async fn find_by_external_issue_id(
        &self,
        external_issue_id: &str,
    ) -> StoreResult<Option<RequestRecord>>;

    /// Sets the status of one request. Writing the status a record already
    /// carries is a no-op, so re-applying an already-delivered notification
    /// never produces a second effective transition.
    async fn update_status(
        &self,
        request_id: &str,
        status: RequestStatus,
    ) -> StoreResult<RequestRecord>;

    /// Lists requests newest-first, optionally scoped to one organization.
    async fn list_requests(&self, organization_id: Option<&str>) -> StoreResult<Vec<RequestRecord>>;
}

fn build_record(new_request: NewRequest, sequence: u64, now_unix_ms: u64) -> RequestRecord {
    RequestRecord {
        id: format!("req-{now_unix_ms}-{sequence}"),
        title: new_request.title,
        category: new_request.category,
        description: new_request.description,
        status: RequestStatus::Pending,
        external_issue_id: new_request.external_issue_id,
        external_issue_url: new_request.external_issue_url,
        organization_id: new_request.organization_id,
        created_by: new_request.created_by,
        created_unix_ms: now_unix_ms,
    }
}

fn list_newest_first(records: &[RequestRecord], organization_id: Option<&str>) -> Vec<RequestRecord> {
    // Reverse insertion order first so the stable sort keeps the newest
    // insert in front when creation timestamps collide.
    let mut items: Vec<RequestRecord> = records
        .iter()
        .rev()
        .filter(|record| {
            organization_id
                .map(|org| record.organization_id == org)
                .unwrap_or(true)
        })
        .cloned()
        .collect();
    items.sort_by(|left, right| right.created_unix_ms.cmp(&left.created_unix_ms));
    items
}

/// In-memory implementation for tests and local experimentation.
#[derive(Debug, Default)]
pub struct InMemoryRequestStore {
    records: RwLock<Vec<RequestRecord>>,
    next_sequence: AtomicU64,
}

impl InMemoryRequestStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RequestStore for InMemoryRequestStore {
    async fn insert_request(&self, new_request: NewRequest) -> StoreResult<RequestRecord> {
        let mut records = self.records.write().await;
        if let Some(external) = new_request.external_issue_id.as_deref() {
            if records
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
        records.push(record.clone());
        Ok(record)
    }

    async fn get_request(&self, request_id: &str) -> StoreResult<Option<RequestRecord>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .find(|record| record.id == request_id)
            .cloned())
    }

    async fn find_by_external_issue_id(
        &self,
        external_issue_id: &str,
    ) -> StoreResult<Option<RequestRecord>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .find(|record| record.external_issue_id.as_deref() == Some(external_issue_id))
            .cloned())
    }

    async fn update_status(
        &self,
        request_id: &str,
        status: RequestStatus,
    ) -> StoreResult<RequestRecord> {
        let mut records = self.records.write().await;
        let record = records
            .iter_mut()
            .find(|record| record.id == request_id)
            .ok_or_else(|| RequestStoreError::RequestNotFound(request_id.to_string()))?;
        record.status = status;
        Ok(record.clone())
    }

    async fn list_requests(&self, organization_id: Option<&str>) -> StoreResult<Vec<RequestRecord>> {
        let records = self.records.read().await;
        Ok(list_newest_first(&records, organization_id))
    }
}
