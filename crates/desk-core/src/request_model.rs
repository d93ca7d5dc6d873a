//! Request record and status-change event types shared across Desk crates.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
/// Enumerates supported `RequestStatus` values.
pub enum RequestStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl RequestStatus {
    /// Returns the wire label used in API payloads and broadcast events.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Public struct `RequestRecord` used across Desk components.
pub struct RequestRecord {
    pub id: String,
    pub title: String,
    pub category: String,
    pub description: String,
    pub status: RequestStatus,
    #[serde(default)]
    pub external_issue_id: Option<String>,
    #[serde(default)]
    pub external_issue_url: Option<String>,
    pub organization_id: String,
    pub created_by: String,
    pub created_unix_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Creation-time fields for a request; the store assigns `id` and timestamps.
pub struct NewRequest {
    pub title: String,
    pub category: String,
    pub description: String,
    pub organization_id: String,
    pub created_by: String,
    pub external_issue_id: Option<String>,
    pub external_issue_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Transient status-change payload broadcast to live viewers. Not persisted;
/// viewers that connect later rely on the initial full-list fetch instead.
pub struct StatusChangeEvent {
    pub request_id: String,
    pub new_status: RequestStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_request_status_serializes_to_screaming_snake_case() {
        assert_eq!(
            serde_json::to_value(RequestStatus::InProgress).expect("serialize"),
            serde_json::json!("IN_PROGRESS")
        );
        assert_eq!(
            serde_json::from_value::<RequestStatus>(serde_json::json!("CANCELLED"))
                .expect("deserialize"),
            RequestStatus::Cancelled
        );
    }

    #[test]
    fn unit_status_change_event_uses_camel_case_wire_names() {
        let event = StatusChangeEvent {
            request_id: "req-1".to_string(),
            new_status: RequestStatus::Completed,
        };
        assert_eq!(
            serde_json::to_value(&event).expect("serialize"),
            serde_json::json!({"requestId": "req-1", "newStatus": "COMPLETED"})
        );
    }

    #[test]
    fn regression_request_record_tolerates_absent_external_fields() {
        let record: RequestRecord = serde_json::from_value(serde_json::json!({
            "id": "req-1",
            "title": "Fix the printer",
            "category": "Facilities",
            "description": "Third floor printer is jammed.",
            "status": "PENDING",
            "organizationId": "org-demo",
            "createdBy": "user-demo",
            "createdUnixMs": 1_700_000_000_000u64,
        }))
        .expect("deserialize");
        assert_eq!(record.external_issue_id, None);
        assert_eq!(record.external_issue_url, None);
    }
}
