//! Maps external tracker workflow-state labels onto the internal status enum.

use crate::request_model::RequestStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Enumerates supported `StatusMapping` values.
pub enum StatusMapping {
    Mapped(RequestStatus),
    Unchanged,
}

/// Maps a free-form workflow-state label to an internal status.
///
/// Trackers name their workflow states freely, so matching is an ordered list
/// of case-insensitive substring rules with first match winning. A label that
/// matches no rule yields `Unchanged`: the request keeps whatever status it
/// already has instead of regressing on unknown states.
pub fn map_external_state(state_label: &str) -> StatusMapping {
    let label = state_label.to_ascii_lowercase();
    if label.contains("done") || label.contains("completed") {
        StatusMapping::Mapped(RequestStatus::Completed)
    } else if label.contains("progress") || label.contains("started") {
        StatusMapping::Mapped(RequestStatus::InProgress)
    } else if label.contains("cancel") {
        StatusMapping::Mapped(RequestStatus::Cancelled)
    } else {
        StatusMapping::Unchanged
    }
}
