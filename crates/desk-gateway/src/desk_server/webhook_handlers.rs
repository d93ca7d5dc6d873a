//! Inbound tracker webhook route handler.

use super::*;

pub(super) async fn handle_tracker_webhook(
    State(state): State<Arc<DeskGatewayState>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let signature = headers
        .get(WEBHOOK_SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    match state.sync.handle_notification(&body, signature).await {
        Ok(outcome) => {
            println!(
                "webhook sync: outcome={} message={}",
                outcome.outcome_code(),
                outcome.transport_message()
            );
            (
                StatusCode::OK,
                Json(WebhookAck {
                    success: true,
                    message: outcome.transport_message().to_string(),
                }),
            )
                .into_response()
        }
        Err(SyncError::Unauthorized) => {
            eprintln!("webhook sync rejected: reason=invalid_signature");
            DeskApiError::unauthorized().into_response()
        }
        Err(error) => {
            // Payload and persistence failures both surface as the
            // transport's processing failure; redelivery is the sender's
            // responsibility and re-running the handler is safe.
            eprintln!("webhook sync failed: error={error}");
            DeskApiError::internal("webhook processing failed").into_response()
        }
    }
}
