//! Desk gateway bootstrap and shutdown wiring.

use super::*;

pub async fn run_desk_gateway_server(state: Arc<DeskGatewayState>) -> Result<()> {
    let bind_addr = state
        .config
        .bind
        .parse::<SocketAddr>()
        .with_context(|| format!("invalid --bind '{}'", state.config.bind))?;

    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind desk gateway on {bind_addr}"))?;
    let local_addr = listener
        .local_addr()
        .context("failed to resolve bound desk gateway address")?;

    println!(
        "desk gateway listening: addr={} webhook_endpoint={} verification_mode={} organization_id={}",
        local_addr,
        TRACKER_WEBHOOK_ENDPOINT,
        state.sync.verification_mode().mode_label(),
        state.config.organization_id
    );

    let hub = state.hub.clone();
    let app = build_desk_router(state);
    let serve_result = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;
    hub.close();
    serve_result.context("desk gateway server exited unexpectedly")?;

    println!("desk gateway stopped: reason=shutdown_requested");
    Ok(())
}
