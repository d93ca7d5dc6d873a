//! Terminal watcher: initial full-list fetch plus live status merge.
//!
//! The watcher is a viewer session like any browser tab: it bootstraps from
//! `GET /requests`, subscribes to the live WebSocket feed, and merges
//! status-change events into its cached view by request id.

use anyhow::{bail, Context, Result};
use desk_core::StatusChangeEvent;
use desk_gateway::{RequestListResponse, LIVE_WS_ENDPOINT, REQUESTS_ENDPOINT};
use desk_live::{BroadcastEnvelope, LiveRequestView, REQUEST_UPDATED_EVENT};
use futures_util::StreamExt;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};

pub(crate) async fn run_watch(server: &str) -> Result<()> {
    let base = server.trim_end_matches('/');
    let list_url = format!("{base}{REQUESTS_ENDPOINT}");
    let initial: RequestListResponse = reqwest::Client::new()
        .get(&list_url)
        .send()
        .await
        .with_context(|| format!("failed to fetch {list_url}"))?
        .error_for_status()
        .context("request list fetch returned an error status")?
        .json()
        .await
        .context("failed to decode request list")?;

    let mut view = LiveRequestView::new(initial.requests);
    println!("{}", render_watch_summary(&view));

    let ws_url = ws_url_from_server(server)?;
    let (mut stream, _response) = connect_async(ws_url.as_str())
        .await
        .with_context(|| format!("failed to subscribe at {ws_url}"))?;
    println!("desk watch subscribed: url={ws_url}");

    while let Some(message) = stream.next().await {
        let message = match message {
            Ok(message) => message,
            Err(error) => {
                eprintln!("desk watch stream error: error={error}");
                break;
            }
        };
        let WsMessage::Text(text) = message else {
            continue;
        };
        let Some(event) = parse_status_event(text.as_str()) else {
            continue;
        };
        let applied = view.apply_status_change(&event);
        println!(
            "request update: id={} status={} applied={}",
            event.request_id, event.new_status, applied
        );
        if applied {
            println!("{}", render_watch_summary(&view));
        }
    }

    println!("desk watch stopped: reason=stream_closed");
    Ok(())
}

pub(crate) fn ws_url_from_server(server: &str) -> Result<String> {
    let trimmed = server.trim_end_matches('/');
    let ws_base = if let Some(rest) = trimmed.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = trimmed.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        bail!("server url must start with http:// or https://, got '{server}'");
    };
    Ok(format!("{ws_base}{LIVE_WS_ENDPOINT}"))
}

/// Extracts a status-change event from one live frame, tolerating frames for
/// other event names and payload shapes.
pub(crate) fn parse_status_event(raw_frame: &str) -> Option<StatusChangeEvent> {
    let envelope = serde_json::from_str::<BroadcastEnvelope>(raw_frame).ok()?;
    if envelope.event != REQUEST_UPDATED_EVENT {
        return None;
    }
    serde_json::from_value(envelope.payload).ok()
}

pub(crate) fn render_watch_summary(view: &LiveRequestView) -> String {
    use desk_core::RequestStatus;

    let mut pending = 0usize;
    let mut in_progress = 0usize;
    let mut completed = 0usize;
    let mut cancelled = 0usize;
    for record in view.requests() {
        match record.status {
            RequestStatus::Pending => pending += 1,
            RequestStatus::InProgress => in_progress += 1,
            RequestStatus::Completed => completed += 1,
            RequestStatus::Cancelled => cancelled += 1,
        }
    }
    format!(
        "desk watch view: total={} pending={} in_progress={} completed={} cancelled={}",
        view.len(),
        pending,
        in_progress,
        completed,
        cancelled
    )
}
