//! Desk gateway server: webhook ingestion, request APIs, and live fan-out.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use desk_core::{current_unix_timestamp_ms, NewRequest};
use desk_live::{BroadcastHub, REQUESTS_TOPIC};
use desk_store::RequestStore;
use desk_sync::{
    HubStatusChangePublisher, SyncError, SyncHandler, WebhookVerificationMode,
    WEBHOOK_SIGNATURE_HEADER,
};
use desk_tracker::{CreateIssueRequest, TrackerIssueClient};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

mod endpoints;
mod live_handlers;
mod request_handlers;
mod server_bootstrap;
mod types;
mod webhook_handlers;

pub use endpoints::{
    LIVE_EVENTS_ENDPOINT, LIVE_WS_ENDPOINT, LIVE_WS_HEARTBEAT_INTERVAL_SECONDS, REQUESTS_ENDPOINT,
    SERVICE_STATUS_ENDPOINT, TRACKER_WEBHOOK_ENDPOINT,
};
pub use server_bootstrap::run_desk_gateway_server;
pub use types::{CreateRequestBody, RequestListResponse, ServiceStatusReport, WebhookAck};

use live_handlers::{handle_live_events_stream, handle_live_ws_upgrade};
use request_handlers::{handle_create_request, handle_list_requests, handle_service_status};
use types::DeskApiError;
use webhook_handlers::handle_tracker_webhook;

#[derive(Debug, Clone)]
/// Public struct `DeskGatewayConfig` used across Desk components.
pub struct DeskGatewayConfig {
    pub bind: String,
    pub organization_id: String,
    pub organization_name: String,
    pub created_by: String,
    pub verification: WebhookVerificationMode,
}

/// Shared state behind every gateway route.
///
/// The broadcast hub lives here with an explicit lifecycle: constructed once
/// in bootstrap, injected into the synchronization handler and every viewer
/// session, closed when the server stops.
pub struct DeskGatewayState {
    pub config: DeskGatewayConfig,
    pub store: Arc<dyn RequestStore>,
    pub hub: BroadcastHub,
    pub sync: SyncHandler,
    pub tracker: Arc<dyn TrackerIssueClient>,
    pub started_unix_ms: u64,
}

impl DeskGatewayState {
    pub fn new(
        config: DeskGatewayConfig,
        store: Arc<dyn RequestStore>,
        hub: BroadcastHub,
        tracker: Arc<dyn TrackerIssueClient>,
    ) -> Self {
        let sync = SyncHandler::new(
            store.clone(),
            Arc::new(HubStatusChangePublisher::new(hub.clone())),
            config.verification.clone(),
        );
        Self {
            config,
            store,
            hub,
            sync,
            tracker,
            started_unix_ms: current_unix_timestamp_ms(),
        }
    }
}

pub fn build_desk_router(state: Arc<DeskGatewayState>) -> Router {
    Router::new()
        .route(
            REQUESTS_ENDPOINT,
            post(handle_create_request).get(handle_list_requests),
        )
        .route(TRACKER_WEBHOOK_ENDPOINT, post(handle_tracker_webhook))
        .route(LIVE_WS_ENDPOINT, get(handle_live_ws_upgrade))
        .route(LIVE_EVENTS_ENDPOINT, get(handle_live_events_stream))
        .route(SERVICE_STATUS_ENDPOINT, get(handle_service_status))
        .with_state(state)
}
