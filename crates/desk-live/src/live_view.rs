use desk_core::{RequestRecord, StatusChangeEvent};

/// Viewer-session cache of the request list, kept current by merging
/// broadcast status changes into the locally held records.
#[derive(Debug, Clone, Default)]
pub struct LiveRequestView {
    requests: Vec<RequestRecord>,
}

impl LiveRequestView {
    /// Builds the view from an initial full-list fetch, preserving the order
    /// the server returned (newest first).
    pub fn new(initial: Vec<RequestRecord>) -> Self {
        Self { requests: initial }
    }

    pub fn requests(&self) -> &[RequestRecord] {
        &self.requests
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Merges one status-change event, replacing only the status of the
    /// matching entry and leaving every other field and the list position
    /// untouched. Events for requests outside this cache (for example a view
    /// scoped to another organization) are ignored. Idempotent: applying the
    /// same event twice equals applying it once.
    pub fn apply_status_change(&mut self, event: &StatusChangeEvent) -> bool {
        match self
            .requests
            .iter_mut()
            .find(|record| record.id == event.request_id)
        {
            Some(record) => {
                let changed = record.status != event.new_status;
                record.status = event.new_status;
                changed
            }
            None => false,
        }
    }
}
