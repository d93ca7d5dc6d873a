//! Shared endpoint constant definitions for the Desk gateway.

pub const REQUESTS_ENDPOINT: &str = "/requests";
pub const TRACKER_WEBHOOK_ENDPOINT: &str = "/webhooks/tracker";
pub const LIVE_WS_ENDPOINT: &str = "/live/ws";
pub const LIVE_EVENTS_ENDPOINT: &str = "/live/events";
pub const SERVICE_STATUS_ENDPOINT: &str = "/status";
pub const LIVE_WS_HEARTBEAT_INTERVAL_SECONDS: u64 = 20;
