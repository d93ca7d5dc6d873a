//! Live fan-out primitives for Desk: the process-wide broadcast hub and the
//! viewer-side request view that merges status-change events.
//!
//! The hub is fire-and-forget pub/sub: no delivery acknowledgment, no
//! persistence of missed events, and slow or absent consumers simply miss
//! events. Viewers recover current state from the initial full-list fetch.

mod broadcast_hub;
mod live_view;

pub use broadcast_hub::{
    BroadcastEnvelope, BroadcastError, BroadcastHub, BroadcastHubConfig, BroadcastSubscription,
    DEFAULT_TOPIC_BUFFER_CAPACITY,
};
pub use live_view::LiveRequestView;

/// Topic carrying every request status update, shared by all organizations.
pub const REQUESTS_TOPIC: &str = "requests";

/// Event name identifying a status change on the requests topic.
pub const REQUEST_UPDATED_EVENT: &str = "request-updated";
