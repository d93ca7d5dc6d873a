//! Orchestrates one inbound notification end to end.

use std::sync::Arc;

use async_trait::async_trait;
use desk_core::{map_external_state, RequestStatus, StatusChangeEvent, StatusMapping};
use desk_live::{BroadcastHub, REQUESTS_TOPIC, REQUEST_UPDATED_EVENT};
use desk_store::{RequestStore, RequestStoreError};
use thiserror::Error;

use crate::notification::TrackerNotification;
use crate::verifier::WebhookVerificationMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Enumerates supported `IgnoredReason` values.
pub enum IgnoredReason {
    /// Notification type/action outside the issue lifecycle.
    IrrelevantEvent,
    /// Issue id joined to no request; trackers carry issues unrelated to us.
    UnmappedIssue,
}

impl IgnoredReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IrrelevantEvent => "irrelevant_event",
            Self::UnmappedIssue => "unmapped_issue",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Terminal disposition of one accepted notification.
pub enum SyncOutcome {
    Ignored {
        reason: IgnoredReason,
    },
    NoOp {
        request_id: String,
    },
    Updated {
        request_id: String,
        new_status: RequestStatus,
        /// Live receivers reached by the broadcast; `None` when the publish
        /// failed and was absorbed.
        subscribers_notified: Option<usize>,
    },
}

impl SyncOutcome {
    pub fn outcome_code(&self) -> &'static str {
        match self {
            Self::Ignored {
                reason: IgnoredReason::IrrelevantEvent,
            } => "ignored_irrelevant_event",
            Self::Ignored {
                reason: IgnoredReason::UnmappedIssue,
            } => "ignored_unmapped_issue",
            Self::NoOp { .. } => "noop",
            Self::Updated { .. } => "updated",
        }
    }

    /// Transport-level success marker text; the boundary deliberately keeps
    /// accepted and ignored outcomes at the same status code.
    pub fn transport_message(&self) -> &'static str {
        match self {
            Self::Updated { .. } => "request updated",
            _ => "webhook processed",
        }
    }
}

#[derive(Debug, Error)]
/// Failures that escalate to the transport boundary.
pub enum SyncError {
    #[error("webhook signature verification failed")]
    Unauthorized,
    #[error("webhook body is not a readable notification: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("request store update failed: {0}")]
    Persistence(#[from] RequestStoreError),
}

#[async_trait]
/// Trait contract for `StatusChangePublisher` behavior.
pub trait StatusChangePublisher: Send + Sync {
    /// Publishes one status change to live viewers, returning the number of
    /// receivers reached.
    async fn publish_status_change(&self, event: &StatusChangeEvent) -> anyhow::Result<usize>;
}

/// Publishes status changes on the shared requests topic of a broadcast hub.
#[derive(Debug, Clone)]
pub struct HubStatusChangePublisher {
    hub: BroadcastHub,
}

impl HubStatusChangePublisher {
    pub fn new(hub: BroadcastHub) -> Self {
        Self { hub }
    }
}

#[async_trait]
impl StatusChangePublisher for HubStatusChangePublisher {
    async fn publish_status_change(&self, event: &StatusChangeEvent) -> anyhow::Result<usize> {
        let payload = serde_json::to_value(event)?;
        Ok(self
            .hub
            .publish(REQUESTS_TOPIC, REQUEST_UPDATED_EVENT, payload)?)
    }
}

/// Public struct `SyncHandler` used across Desk components.
///
/// Runs once per inbound notification, concurrently across notifications.
/// The persistence write and the broadcast publish are the only suspension
/// points; verification and mapping are synchronous pure computation.
pub struct SyncHandler {
    store: Arc<dyn RequestStore>,
    publisher: Arc<dyn StatusChangePublisher>,
    verification: WebhookVerificationMode,
}

impl SyncHandler {
    pub fn new(
        store: Arc<dyn RequestStore>,
        publisher: Arc<dyn StatusChangePublisher>,
        verification: WebhookVerificationMode,
    ) -> Self {
        Self {
            store,
            publisher,
            verification,
        }
    }

    pub fn verification_mode(&self) -> &WebhookVerificationMode {
        &self.verification
    }

    /// Processes one raw notification delivery.
    ///
    /// Side effects happen in the fixed order persist-then-publish: a viewer
    /// must never observe a broadcast for a status the store does not yet
    /// hold, because newly connecting viewers bootstrap from a fresh store
    /// read. A publish failure after a successful persist is logged and
    /// absorbed; the store remains the source of truth.
    pub async fn handle_notification(
        &self,
        raw_body: &str,
        signature_header: Option<&str>,
    ) -> Result<SyncOutcome, SyncError> {
        if !self
            .verification
            .verify(raw_body.as_bytes(), signature_header)
        {
            return Err(SyncError::Unauthorized);
        }

        let notification = TrackerNotification::parse(raw_body)?;
        if !notification.is_issue_lifecycle() {
            return Ok(SyncOutcome::Ignored {
                reason: IgnoredReason::IrrelevantEvent,
            });
        }

        let Some(request) = self
            .store
            .find_by_external_issue_id(&notification.data.id)
            .await?
        else {
            return Ok(SyncOutcome::Ignored {
                reason: IgnoredReason::UnmappedIssue,
            });
        };

        let new_status = match map_external_state(notification.state_label()) {
            StatusMapping::Mapped(status) => status,
            StatusMapping::Unchanged => {
                return Ok(SyncOutcome::NoOp {
                    request_id: request.id,
                })
            }
        };

        let updated = self.store.update_status(&request.id, new_status).await?;

        let event = StatusChangeEvent {
            request_id: updated.id.clone(),
            new_status,
        };
        let subscribers_notified = match self.publisher.publish_status_change(&event).await {
            Ok(count) => Some(count),
            Err(error) => {
                eprintln!(
                    "status broadcast failed: request_id={} new_status={} error={error:#}",
                    updated.id, new_status
                );
                None
            }
        };

        Ok(SyncOutcome::Updated {
            request_id: updated.id,
            new_status,
            subscribers_notified,
        })
    }
}
