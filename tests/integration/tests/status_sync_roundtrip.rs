//! End-to-end: create a tracked request over HTTP, deliver a signed tracker
//! webhook, and watch the status change flow through the WebSocket feed into
//! a viewer-side merged view backed by the durable ledger.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use desk_core::{RequestStatus, StatusChangeEvent};
use desk_gateway::{
    build_desk_router, DeskGatewayConfig, DeskGatewayState, RequestListResponse, WebhookAck,
    LIVE_WS_ENDPOINT, REQUESTS_ENDPOINT, TRACKER_WEBHOOK_ENDPOINT,
};
use desk_live::{BroadcastEnvelope, BroadcastHub, LiveRequestView, REQUEST_UPDATED_EVENT};
use desk_store::{FileRequestStore, RequestStore};
use desk_sync::{WebhookVerificationMode, WEBHOOK_SIGNATURE_HEADER};
use desk_tracker::{CreateIssueRequest, CreatedIssue, TrackerError, TrackerIssueClient};
use futures_util::StreamExt;
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use tokio::net::TcpListener;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};

const WEBHOOK_SECRET: &str = "integration-hook-secret";

struct ScriptedTrackerClient;

#[async_trait]
impl TrackerIssueClient for ScriptedTrackerClient {
    async fn create_issue(
        &self,
        _request: &CreateIssueRequest,
    ) -> Result<Option<CreatedIssue>, TrackerError> {
        Ok(Some(CreatedIssue {
            id: "ext-roundtrip-1".to_string(),
            url: Some("https://tracker.test/issue/ext-roundtrip-1".to_string()),
        }))
    }
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

async fn spawn_gateway(state: Arc<DeskGatewayState>) -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral listener");
    let addr = listener.local_addr().expect("resolve listener addr");
    let app = build_desk_router(state);
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    (addr, handle)
}

#[tokio::test]
async fn integration_tracked_request_syncs_and_fans_out_to_viewers() {
    let tempdir = tempfile::tempdir().expect("tempdir");
    let ledger_path = tempdir.path().join("requests.json");
    let store = Arc::new(FileRequestStore::open(&ledger_path).expect("open ledger"));
    let state = Arc::new(DeskGatewayState::new(
        DeskGatewayConfig {
            bind: "127.0.0.1:0".to_string(),
            organization_id: "org-demo".to_string(),
            organization_name: "Demo Organization".to_string(),
            created_by: "user-demo".to_string(),
            verification: WebhookVerificationMode::hmac_sha256(WEBHOOK_SECRET).expect("mode"),
        },
        store,
        BroadcastHub::default(),
        Arc::new(ScriptedTrackerClient),
    ));
    let (addr, _server) = spawn_gateway(state).await;
    let client = reqwest::Client::new();

    // Create a request; the scripted tracker joins it to an external issue.
    let created: desk_core::RequestRecord = client
        .post(format!("http://{addr}{REQUESTS_ENDPOINT}"))
        .json(&json!({
            "title": "Wire up conference room display",
            "category": "IT",
            "description": "Room 5 display has no input feed.",
        }))
        .send()
        .await
        .expect("create request")
        .error_for_status()
        .expect("201 response")
        .json()
        .await
        .expect("created record");
    assert_eq!(created.status, RequestStatus::Pending);
    assert_eq!(created.external_issue_id.as_deref(), Some("ext-roundtrip-1"));

    // A viewer session: initial full-list fetch, then a live subscription.
    let initial: RequestListResponse = client
        .get(format!("http://{addr}{REQUESTS_ENDPOINT}"))
        .send()
        .await
        .expect("initial fetch")
        .json()
        .await
        .expect("initial list");
    let mut view = LiveRequestView::new(initial.requests);
    assert_eq!(view.requests()[0].status, RequestStatus::Pending);

    let (mut live, _response) = connect_async(format!("ws://{addr}{LIVE_WS_ENDPOINT}"))
        .await
        .expect("ws connect");
    tokio::time::sleep(Duration::from_millis(20)).await;

    // The tracker reports the mirrored issue as started.
    let body = json!({
        "type": "Issue",
        "action": "update",
        "data": {"id": "ext-roundtrip-1", "state": {"name": "Started"}},
    })
    .to_string();
    let ack: WebhookAck = client
        .post(format!("http://{addr}{TRACKER_WEBHOOK_ENDPOINT}"))
        .header(WEBHOOK_SIGNATURE_HEADER, hmac_signature(WEBHOOK_SECRET, &body))
        .body(body)
        .send()
        .await
        .expect("webhook post")
        .error_for_status()
        .expect("200 response")
        .json()
        .await
        .expect("ack body");
    assert!(ack.success);
    assert_eq!(ack.message, "request updated");

    // The viewer merges the live frame into its cached list.
    let frame = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(message) = live.next().await {
            if let Ok(WsMessage::Text(text)) = message {
                return Some(text.to_string());
            }
        }
        None
    })
    .await
    .expect("frame before timeout")
    .expect("text frame");
    let envelope: BroadcastEnvelope = serde_json::from_str(&frame).expect("envelope");
    assert_eq!(envelope.event, REQUEST_UPDATED_EVENT);
    let event: StatusChangeEvent =
        serde_json::from_value(envelope.payload).expect("status change event");
    assert!(view.apply_status_change(&event));
    assert_eq!(view.requests()[0].status, RequestStatus::InProgress);

    // The ledger, not the broadcast, is the source of truth for reconnects.
    let reopened = FileRequestStore::open(&ledger_path).expect("reopen ledger");
    let durable = reopened
        .get_request(&created.id)
        .await
        .expect("get")
        .expect("record");
    assert_eq!(durable.status, RequestStatus::InProgress);
}
