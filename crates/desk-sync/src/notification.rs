//! Inbound tracker notification payload.

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
/// Body of one tracker webhook delivery. Every field defaults so that any
/// JSON object parses; irrelevant shapes fall out of the relevance filter
/// instead of erroring.
pub struct TrackerNotification {
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub data: NotificationData,
}

#[derive(Debug, Clone, Default, Deserialize)]
/// Public struct `NotificationData` used across Desk components.
pub struct NotificationData {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub state: Option<NotificationState>,
    #[serde(default, rename = "stateId")]
    pub state_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
/// Public struct `NotificationState` used across Desk components.
pub struct NotificationState {
    #[serde(default)]
    pub name: String,
}

impl TrackerNotification {
    pub fn parse(raw_body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw_body)
    }

    /// Only issue create/update notifications are relevant to status
    /// synchronization; everything else is tolerated and ignored.
    pub fn is_issue_lifecycle(&self) -> bool {
        self.kind == "Issue" && matches!(self.action.as_str(), "create" | "update")
    }

    /// Workflow-state label: the state name when present, else the raw state
    /// id, else empty (which maps to an unchanged status downstream).
    pub fn state_label(&self) -> &str {
        if let Some(state) = &self.data.state {
            if !state.name.is_empty() {
                return &state.name;
            }
        }
        self.data.state_id.as_deref().unwrap_or("")
    }
}
