//! External issue tracker client used at request creation time.
//!
//! Desk never pushes status back to the tracker; the only outbound call is
//! creating the mirrored issue when a request is submitted, and that call is
//! best-effort by contract: a tracker failure must not fail request creation
//! (the caller logs and proceeds with empty external fields).

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

pub const DEFAULT_TRACKER_API_URL: &str = "https://api.linear.app/graphql";

const ISSUE_CREATE_MUTATION: &str = r#"
mutation IssueCreate($input: IssueCreateInput!) {
  issueCreate(input: $input) {
    success
    issue {
      id
      url
    }
  }
}
"#;

/// Errors returned by tracker client implementations.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("tracker returned non-success status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("invalid tracker response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Public struct `CreateIssueRequest` used across Desk components.
pub struct CreateIssueRequest {
    pub title: String,
    pub description: String,
    pub organization_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Identifier pair of a freshly created tracker issue.
pub struct CreatedIssue {
    pub id: String,
    pub url: Option<String>,
}

#[async_trait]
/// Trait contract for `TrackerIssueClient` behavior.
pub trait TrackerIssueClient: Send + Sync {
    /// Creates the mirrored tracker issue for a new request. `Ok(None)`
    /// means the integration is disabled or the tracker accepted the call
    /// without returning an issue; either way the request proceeds without
    /// external fields.
    async fn create_issue(
        &self,
        request: &CreateIssueRequest,
    ) -> Result<Option<CreatedIssue>, TrackerError>;
}

/// No-op client selected when no tracker API key is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledTrackerClient;

#[async_trait]
impl TrackerIssueClient for DisabledTrackerClient {
    async fn create_issue(
        &self,
        _request: &CreateIssueRequest,
    ) -> Result<Option<CreatedIssue>, TrackerError> {
        Ok(None)
    }
}

#[derive(Debug, Clone)]
/// Public struct `TrackerConfig` used across Desk components.
pub struct TrackerConfig {
    pub api_url: String,
    pub api_key: String,
    pub team_id: String,
}

/// GraphQL client for the tracker's `issueCreate` mutation.
#[derive(Debug, Clone)]
pub struct HttpTrackerClient {
    config: TrackerConfig,
    http: reqwest::Client,
}

impl HttpTrackerClient {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GraphqlEnvelope {
    #[serde(default)]
    data: Option<IssueCreateData>,
    #[serde(default)]
    errors: Option<Vec<GraphqlErrorNode>>,
}

#[derive(Debug, Deserialize)]
struct GraphqlErrorNode {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct IssueCreateData {
    #[serde(rename = "issueCreate")]
    issue_create: Option<IssueCreatePayload>,
}

#[derive(Debug, Deserialize)]
struct IssueCreatePayload {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    issue: Option<IssueNode>,
}

#[derive(Debug, Deserialize)]
struct IssueNode {
    id: String,
    #[serde(default)]
    url: Option<String>,
}

#[async_trait]
impl TrackerIssueClient for HttpTrackerClient {
    async fn create_issue(
        &self,
        request: &CreateIssueRequest,
    ) -> Result<Option<CreatedIssue>, TrackerError> {
        // Issue titles carry the submitting organization so one tracker team
        // can serve many organizations.
        let title = format!("[{}] {}", request.organization_name, request.title);
        let body = json!({
            "query": ISSUE_CREATE_MUTATION,
            "variables": {
                "input": {
                    "title": title,
                    "description": request.description,
                    "teamId": self.config.team_id,
                }
            }
        });

        let response = self
            .http
            .post(&self.config.api_url)
            .header("Authorization", &self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TrackerError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: GraphqlEnvelope = response.json().await?;
        if let Some(errors) = envelope.errors.filter(|errors| !errors.is_empty()) {
            let joined = errors
                .iter()
                .map(|error| error.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(TrackerError::InvalidResponse(joined));
        }

        let payload = envelope
            .data
            .and_then(|data| data.issue_create)
            .ok_or_else(|| {
                TrackerError::InvalidResponse("response carries no issueCreate payload".to_string())
            })?;
        if !payload.success {
            return Err(TrackerError::InvalidResponse(
                "tracker reported issueCreate success=false".to_string(),
            ));
        }

        Ok(payload.issue.map(|issue| CreatedIssue {
            id: issue.id,
            url: issue.url,
        }))
    }
}
