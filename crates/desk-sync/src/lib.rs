//! Status synchronization pipeline: webhook verification, notification
//! relevance filtering, status mapping, conditional persistence, and the
//! persist-then-publish broadcast step.

mod handler;
mod notification;
#[cfg(test)]
mod tests;
mod verifier;

pub use handler::{
    HubStatusChangePublisher, IgnoredReason, StatusChangePublisher, SyncError, SyncHandler,
    SyncOutcome,
};
pub use notification::{NotificationData, NotificationState, TrackerNotification};
pub use verifier::{WebhookVerificationMode, WEBHOOK_SIGNATURE_HEADER};
