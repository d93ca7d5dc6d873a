//! Live viewer transports: WebSocket and SSE fan-out of the broadcast hub.

use super::*;

pub(super) async fn handle_live_ws_upgrade(
    State(state): State<Arc<DeskGatewayState>>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| run_live_ws_connection(state, socket))
}

async fn run_live_ws_connection(state: Arc<DeskGatewayState>, socket: WebSocket) {
    let mut subscription = state.hub.subscribe(REQUESTS_TOPIC);
    let (mut sender, mut receiver) = socket.split();
    let mut heartbeat = tokio::time::interval(Duration::from_secs(
        LIVE_WS_HEARTBEAT_INTERVAL_SECONDS.max(1),
    ));
    heartbeat.tick().await;

    loop {
        tokio::select! {
            envelope = subscription.recv() => {
                let Some(envelope) = envelope else {
                    break;
                };
                let Ok(raw) = serde_json::to_string(&envelope) else {
                    continue;
                };
                if sender.send(WsMessage::Text(raw.into())).await.is_err() {
                    break;
                }
            }
            inbound = receiver.next() => {
                let Some(inbound) = inbound else {
                    break;
                };
                let message = match inbound {
                    Ok(message) => message,
                    Err(_) => break,
                };
                match message {
                    WsMessage::Ping(payload) => {
                        if sender.send(WsMessage::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    WsMessage::Close(_) => break,
                    // The viewer channel is outbound-only; inbound text and
                    // pong frames are tolerated and dropped.
                    _ => {}
                }
            }
            _ = heartbeat.tick() => {
                if sender.send(WsMessage::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            }
        }
    }

    subscription.unsubscribe();
}

pub(super) async fn handle_live_events_stream(
    State(state): State<Arc<DeskGatewayState>>,
) -> Response {
    let mut subscription = state.hub.subscribe(REQUESTS_TOPIC);
    let (tx, rx) = mpsc::unbounded_channel::<Event>();
    tokio::spawn(async move {
        while let Some(envelope) = subscription.recv().await {
            let Ok(data) = serde_json::to_string(&envelope.payload) else {
                continue;
            };
            let event = Event::default().event(envelope.event.clone()).data(data);
            if tx.send(event).is_err() {
                break;
            }
        }
    });
    let stream = UnboundedReceiverStream::new(rx).map(Ok::<Event, Infallible>);
    Sse::new(stream)
        .keep_alive(KeepAlive::default())
        .into_response()
}
