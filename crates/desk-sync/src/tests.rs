use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use async_trait::async_trait;
use desk_core::{NewRequest, RequestStatus, StatusChangeEvent};
use desk_live::{BroadcastHub, REQUESTS_TOPIC, REQUEST_UPDATED_EVENT};
use desk_store::{InMemoryRequestStore, RequestStore};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;

use super::*;

#[derive(Default)]
struct RecordingPublisher {
    observe_store: Option<Arc<dyn RequestStore>>,
    events: Mutex<Vec<StatusChangeEvent>>,
    statuses_at_publish: Mutex<Vec<Option<RequestStatus>>>,
}

impl RecordingPublisher {
    fn events(&self) -> Vec<StatusChangeEvent> {
        self.events.lock().expect("events lock").clone()
    }

    fn statuses_at_publish(&self) -> Vec<Option<RequestStatus>> {
        self.statuses_at_publish
            .lock()
            .expect("statuses lock")
            .clone()
    }
}

#[async_trait]
impl StatusChangePublisher for RecordingPublisher {
    async fn publish_status_change(&self, event: &StatusChangeEvent) -> anyhow::Result<usize> {
        if let Some(store) = &self.observe_store {
            let status = store
                .get_request(&event.request_id)
                .await?
                .map(|record| record.status);
            self.statuses_at_publish
                .lock()
                .expect("statuses lock")
                .push(status);
        }
        self.events.lock().expect("events lock").push(event.clone());
        Ok(1)
    }
}

struct UnreachablePublisher;

#[async_trait]
impl StatusChangePublisher for UnreachablePublisher {
    async fn publish_status_change(&self, _event: &StatusChangeEvent) -> anyhow::Result<usize> {
        Err(anyhow!("broadcast transport unreachable"))
    }
}

fn issue_notification(action: &str, issue_id: &str, state_name: &str) -> String {
    json!({
        "type": "Issue",
        "action": action,
        "data": {"id": issue_id, "state": {"name": state_name}},
    })
    .to_string()
}

fn hmac_signature(secret: &str, body: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("hmac key");
    mac.update(body.as_bytes());
    let hex: String = mac
        .finalize()
        .into_bytes()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect();
    format!("sha256={hex}")
}

async fn seeded_store(initial_status: RequestStatus) -> (Arc<InMemoryRequestStore>, String) {
    let store = Arc::new(InMemoryRequestStore::new());
    let record = store
        .insert_request(NewRequest {
            title: "Replace badge reader".to_string(),
            category: "Security".to_string(),
            description: "Lobby badge reader stopped accepting cards.".to_string(),
            organization_id: "org-demo".to_string(),
            created_by: "user-demo".to_string(),
            external_issue_id: Some("ext-42".to_string()),
            external_issue_url: Some("https://tracker.test/issue/ext-42".to_string()),
        })
        .await
        .expect("seed insert");
    if initial_status != RequestStatus::Pending {
        store
            .update_status(&record.id, initial_status)
            .await
            .expect("seed status");
    }
    (store, record.id)
}

#[tokio::test]
async fn functional_done_notification_completes_request_and_broadcasts() {
    let (store, request_id) = seeded_store(RequestStatus::InProgress).await;
    let publisher = Arc::new(RecordingPublisher::default());
    let handler = SyncHandler::new(
        store.clone(),
        publisher.clone(),
        WebhookVerificationMode::Disabled,
    );

    let outcome = handler
        .handle_notification(&issue_notification("update", "ext-42", "Done"), None)
        .await
        .expect("sync");

    assert_eq!(
        outcome,
        SyncOutcome::Updated {
            request_id: request_id.clone(),
            new_status: RequestStatus::Completed,
            subscribers_notified: Some(1),
        }
    );
    let record = store
        .get_request(&request_id)
        .await
        .expect("get")
        .expect("record");
    assert_eq!(record.status, RequestStatus::Completed);
    assert_eq!(
        publisher.events(),
        vec![StatusChangeEvent {
            request_id,
            new_status: RequestStatus::Completed,
        }]
    );
}

#[tokio::test]
async fn regression_rejected_credential_blocks_all_side_effects() {
    let (store, request_id) = seeded_store(RequestStatus::InProgress).await;
    let publisher = Arc::new(RecordingPublisher::default());
    let handler = SyncHandler::new(
        store.clone(),
        publisher.clone(),
        WebhookVerificationMode::shared_token("hook-secret").expect("mode"),
    );

    let error = handler
        .handle_notification(
            &issue_notification("update", "ext-42", "Done"),
            Some("wrong-secret"),
        )
        .await
        .expect_err("must reject");

    assert!(matches!(error, SyncError::Unauthorized));
    let record = store
        .get_request(&request_id)
        .await
        .expect("get")
        .expect("record");
    assert_eq!(record.status, RequestStatus::InProgress);
    assert!(publisher.events().is_empty());
}

#[tokio::test]
async fn functional_irrelevant_type_or_action_is_ignored_without_side_effects() {
    let (store, _request_id) = seeded_store(RequestStatus::Pending).await;
    let publisher = Arc::new(RecordingPublisher::default());
    let handler = SyncHandler::new(store, publisher.clone(), WebhookVerificationMode::Disabled);

    for body in [
        json!({"type": "Comment", "action": "update", "data": {"id": "ext-42"}}).to_string(),
        json!({"type": "Issue", "action": "delete", "data": {"id": "ext-42"}}).to_string(),
        json!({"action": "update"}).to_string(),
    ] {
        let outcome = handler
            .handle_notification(&body, None)
            .await
            .expect("sync");
        assert_eq!(
            outcome,
            SyncOutcome::Ignored {
                reason: IgnoredReason::IrrelevantEvent,
            }
        );
    }
    assert!(publisher.events().is_empty());
}

#[tokio::test]
async fn functional_unmapped_issue_id_is_ignored_success() {
    let (store, request_id) = seeded_store(RequestStatus::Pending).await;
    let publisher = Arc::new(RecordingPublisher::default());
    let handler = SyncHandler::new(
        store.clone(),
        publisher.clone(),
        WebhookVerificationMode::Disabled,
    );

    let outcome = handler
        .handle_notification(&issue_notification("update", "ext-unrelated", "Done"), None)
        .await
        .expect("sync");

    assert_eq!(
        outcome,
        SyncOutcome::Ignored {
            reason: IgnoredReason::UnmappedIssue,
        }
    );
    let record = store
        .get_request(&request_id)
        .await
        .expect("get")
        .expect("record");
    assert_eq!(record.status, RequestStatus::Pending);
    assert!(publisher.events().is_empty());
}

#[tokio::test]
async fn functional_unmatched_state_label_is_noop_without_write_or_broadcast() {
    let (store, request_id) = seeded_store(RequestStatus::InProgress).await;
    let publisher = Arc::new(RecordingPublisher::default());
    let handler = SyncHandler::new(
        store.clone(),
        publisher.clone(),
        WebhookVerificationMode::Disabled,
    );

    let outcome = handler
        .handle_notification(&issue_notification("update", "ext-42", "Triage"), None)
        .await
        .expect("sync");

    assert_eq!(
        outcome,
        SyncOutcome::NoOp {
            request_id: request_id.clone(),
        }
    );
    let record = store
        .get_request(&request_id)
        .await
        .expect("get")
        .expect("record");
    assert_eq!(record.status, RequestStatus::InProgress);
    assert!(publisher.events().is_empty());
}

#[tokio::test]
async fn regression_duplicate_delivery_is_effectively_idempotent() {
    let (store, request_id) = seeded_store(RequestStatus::InProgress).await;
    let publisher = Arc::new(RecordingPublisher::default());
    let handler = SyncHandler::new(
        store.clone(),
        publisher.clone(),
        WebhookVerificationMode::Disabled,
    );
    let body = issue_notification("update", "ext-42", "Done");

    let first = handler.handle_notification(&body, None).await.expect("sync");
    let second = handler.handle_notification(&body, None).await.expect("sync");

    // At-least-once delivery: the re-applied notification may broadcast
    // again, but the final status and every event payload are identical.
    assert_eq!(first, second);
    let record = store
        .get_request(&request_id)
        .await
        .expect("get")
        .expect("record");
    assert_eq!(record.status, RequestStatus::Completed);
    let events = publisher.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0], events[1]);
}

#[tokio::test]
async fn functional_store_already_reflects_new_status_when_publish_runs() {
    let (store, _request_id) = seeded_store(RequestStatus::InProgress).await;
    let publisher = Arc::new(RecordingPublisher {
        observe_store: Some(store.clone()),
        ..RecordingPublisher::default()
    });
    let handler = SyncHandler::new(
        store.clone(),
        publisher.clone(),
        WebhookVerificationMode::Disabled,
    );

    handler
        .handle_notification(&issue_notification("update", "ext-42", "Done"), None)
        .await
        .expect("sync");

    assert_eq!(
        publisher.statuses_at_publish(),
        vec![Some(RequestStatus::Completed)]
    );
}

#[tokio::test]
async fn functional_publish_failure_is_absorbed_after_persist() {
    let (store, request_id) = seeded_store(RequestStatus::InProgress).await;
    let handler = SyncHandler::new(
        store.clone(),
        Arc::new(UnreachablePublisher),
        WebhookVerificationMode::Disabled,
    );

    let outcome = handler
        .handle_notification(&issue_notification("update", "ext-42", "Done"), None)
        .await
        .expect("sync");

    assert_eq!(
        outcome,
        SyncOutcome::Updated {
            request_id: request_id.clone(),
            new_status: RequestStatus::Completed,
            subscribers_notified: None,
        }
    );
    let record = store
        .get_request(&request_id)
        .await
        .expect("get")
        .expect("record");
    assert_eq!(record.status, RequestStatus::Completed);
}

#[tokio::test]
async fn integration_hub_publisher_delivers_on_the_requests_topic() {
    let (store, request_id) = seeded_store(RequestStatus::InProgress).await;
    let hub = BroadcastHub::default();
    let mut subscription = hub.subscribe(REQUESTS_TOPIC);
    let handler = SyncHandler::new(
        store,
        Arc::new(HubStatusChangePublisher::new(hub.clone())),
        WebhookVerificationMode::Disabled,
    );

    let outcome = handler
        .handle_notification(&issue_notification("update", "ext-42", "Done"), None)
        .await
        .expect("sync");
    assert_eq!(
        outcome,
        SyncOutcome::Updated {
            request_id: request_id.clone(),
            new_status: RequestStatus::Completed,
            subscribers_notified: Some(1),
        }
    );

    let envelope = subscription.recv().await.expect("envelope");
    assert_eq!(envelope.event, REQUEST_UPDATED_EVENT);
    assert_eq!(
        envelope.payload,
        json!({"requestId": request_id, "newStatus": "COMPLETED"})
    );
}

#[tokio::test]
async fn regression_malformed_body_is_a_processing_error() {
    let (store, _request_id) = seeded_store(RequestStatus::Pending).await;
    let handler = SyncHandler::new(
        store,
        Arc::new(RecordingPublisher::default()),
        WebhookVerificationMode::Disabled,
    );

    let error = handler
        .handle_notification("not a notification", None)
        .await
        .expect_err("must fail");
    assert!(matches!(error, SyncError::Payload(_)));
}

#[test]
fn unit_shared_token_mode_compares_the_header_value() {
    let mode = WebhookVerificationMode::shared_token("hook-secret").expect("mode");
    assert!(mode.verify(b"{}", Some("hook-secret")));
    assert!(mode.verify(b"{}", Some("  hook-secret  ")));
    assert!(!mode.verify(b"{}", Some("other")));
    assert!(!mode.verify(b"{}", None));
}

#[test]
fn unit_hmac_mode_accepts_signed_and_rejects_tampered_payloads() {
    let mode = WebhookVerificationMode::hmac_sha256("hook-secret").expect("mode");
    let body = issue_notification("update", "ext-42", "Done");
    let signature = hmac_signature("hook-secret", &body);

    assert!(mode.verify(body.as_bytes(), Some(&signature)));
    assert!(!mode.verify(b"tampered body", Some(&signature)));
    assert!(!mode.verify(body.as_bytes(), Some("sha256=deadbeef")));
    assert!(!mode.verify(body.as_bytes(), Some("not-a-signature")));
    assert!(!mode.verify(body.as_bytes(), None));
}

#[test]
fn unit_disabled_mode_passes_everything() {
    let mode = WebhookVerificationMode::Disabled;
    assert!(mode.verify(b"{}", None));
    assert!(mode.verify(b"{}", Some("anything")));
    assert_eq!(mode.mode_label(), "disabled");
}

#[test]
fn regression_verification_constructors_reject_empty_secrets() {
    assert!(WebhookVerificationMode::shared_token("  ").is_err());
    assert!(WebhookVerificationMode::hmac_sha256("").is_err());
}

#[test]
fn unit_state_label_falls_back_to_state_id() {
    let notification = TrackerNotification::parse(
        &json!({"type": "Issue", "action": "update", "data": {"id": "ext-1", "stateId": "done-state"}})
            .to_string(),
    )
    .expect("parse");
    assert_eq!(notification.state_label(), "done-state");

    let empty = TrackerNotification::parse(
        &json!({"type": "Issue", "action": "update", "data": {"id": "ext-1"}}).to_string(),
    )
    .expect("parse");
    assert_eq!(empty.state_label(), "");
}
