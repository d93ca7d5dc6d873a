//! Request creation, listing, and service status route handlers.

use super::types::{RequestListResponse, ServiceStatusReport};
use super::*;

pub(super) async fn handle_create_request(
    State(state): State<Arc<DeskGatewayState>>,
    Json(body): Json<CreateRequestBody>,
) -> Response {
    let title = body.title.trim();
    let category = body.category.trim();
    let description = body.description.trim();
    if title.is_empty() || category.is_empty() || description.is_empty() {
        return DeskApiError::bad_request(
            "validation_error",
            "title, category, and description are required",
        )
        .into_response();
    }

    // Best-effort mirror into the external tracker: a tracker failure never
    // fails request creation, the record just carries no external fields.
    let mut external_issue_id = None;
    let mut external_issue_url = None;
    match state
        .tracker
        .create_issue(&CreateIssueRequest {
            title: title.to_string(),
            description: description.to_string(),
            organization_name: state.config.organization_name.clone(),
        })
        .await
    {
        Ok(Some(issue)) => {
            external_issue_id = Some(issue.id);
            external_issue_url = issue.url;
        }
        Ok(None) => {}
        Err(error) => {
            eprintln!("tracker issue creation skipped: error={error}");
        }
    }

    match state
        .store
        .insert_request(NewRequest {
            title: title.to_string(),
            category: category.to_string(),
            description: description.to_string(),
            organization_id: state.config.organization_id.clone(),
            created_by: state.config.created_by.clone(),
            external_issue_id,
            external_issue_url,
        })
        .await
    {
        Ok(record) => {
            println!(
                "request created: id={} external_issue_id={}",
                record.id,
                record.external_issue_id.as_deref().unwrap_or("none")
            );
            (StatusCode::CREATED, Json(record)).into_response()
        }
        Err(error) => {
            eprintln!("request creation failed: error={error}");
            DeskApiError::internal("failed to create request").into_response()
        }
    }
}

pub(super) async fn handle_list_requests(
    State(state): State<Arc<DeskGatewayState>>,
) -> Response {
    match state
        .store
        .list_requests(Some(&state.config.organization_id))
        .await
    {
        Ok(requests) => (StatusCode::OK, Json(RequestListResponse { requests })).into_response(),
        Err(error) => {
            eprintln!("request listing failed: error={error}");
            DeskApiError::internal("failed to fetch requests").into_response()
        }
    }
}

pub(super) async fn handle_service_status(
    State(state): State<Arc<DeskGatewayState>>,
) -> Response {
    let request_count = match state.store.list_requests(None).await {
        Ok(requests) => requests.len(),
        Err(error) => {
            eprintln!("service status store read failed: error={error}");
            return DeskApiError::internal("failed to read service status").into_response();
        }
    };
    let report = ServiceStatusReport {
        status: "ok".to_string(),
        uptime_ms: current_unix_timestamp_ms().saturating_sub(state.started_unix_ms),
        request_count,
        live_subscribers: state.hub.topic_subscriber_count(REQUESTS_TOPIC),
        verification_mode: state.sync.verification_mode().mode_label().to_string(),
        organization_id: state.config.organization_id.clone(),
    };
    (StatusCode::OK, Json(report)).into_response()
}
