mod watch;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use desk_gateway::{run_desk_gateway_server, DeskGatewayConfig, DeskGatewayState};
use desk_live::{BroadcastHub, BroadcastHubConfig, DEFAULT_TOPIC_BUFFER_CAPACITY};
use desk_store::{FileRequestStore, InMemoryRequestStore, RequestStore};
use desk_sync::WebhookVerificationMode;
use desk_tracker::{
    DisabledTrackerClient, HttpTrackerClient, TrackerConfig, TrackerIssueClient,
    DEFAULT_TRACKER_API_URL,
};

fn parse_positive_usize(value: &str) -> Result<usize, String> {
    let parsed = value
        .parse::<usize>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CliWebhookVerificationMode {
    Disabled,
    SharedToken,
    HmacSha256,
}

#[derive(Debug, Parser)]
#[command(
    name = "desk-rs",
    about = "Work-request desk with live tracker status synchronization",
    version
)]
struct DeskCli {
    #[command(subcommand)]
    command: DeskCommand,
}

#[derive(Debug, Subcommand)]
enum DeskCommand {
    /// Run the desk gateway server.
    Serve(ServeArgs),
    /// Follow live status updates from a running desk gateway.
    Watch(WatchArgs),
}

#[derive(Debug, Args)]
struct ServeArgs {
    #[arg(long, default_value = "127.0.0.1:8787")]
    bind: String,
    /// Requests ledger path; omitted keeps requests in memory only.
    #[arg(long)]
    state_file: Option<PathBuf>,
    #[arg(long, default_value = "org-demo")]
    organization_id: String,
    #[arg(long, default_value = "Demo Organization")]
    organization_name: String,
    #[arg(long, default_value = "user-demo")]
    created_by: String,
    #[arg(long, value_enum, default_value_t = CliWebhookVerificationMode::Disabled)]
    webhook_verification: CliWebhookVerificationMode,
    #[arg(long, env = "DESK_WEBHOOK_SECRET")]
    webhook_secret: Option<String>,
    #[arg(long, env = "DESK_TRACKER_API_KEY")]
    tracker_api_key: Option<String>,
    #[arg(long, env = "DESK_TRACKER_TEAM_ID")]
    tracker_team_id: Option<String>,
    #[arg(long, default_value = DEFAULT_TRACKER_API_URL)]
    tracker_api_url: String,
    #[arg(long, default_value_t = DEFAULT_TOPIC_BUFFER_CAPACITY, value_parser = parse_positive_usize)]
    topic_buffer_capacity: usize,
}

#[derive(Debug, Args)]
struct WatchArgs {
    /// Base URL of the running desk gateway.
    #[arg(long, default_value = "http://127.0.0.1:8787")]
    server: String,
}

fn resolve_verification_mode(args: &ServeArgs) -> Result<WebhookVerificationMode> {
    let secret = args
        .webhook_secret
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty());
    match args.webhook_verification {
        CliWebhookVerificationMode::Disabled => {
            if secret.is_some() {
                bail!(
                    "--webhook-secret is set while verification is disabled; pass --webhook-verification shared-token or hmac-sha256"
                );
            }
            Ok(WebhookVerificationMode::Disabled)
        }
        CliWebhookVerificationMode::SharedToken => {
            let secret = secret.context(
                "--webhook-secret (or DESK_WEBHOOK_SECRET) is required for shared-token verification",
            )?;
            WebhookVerificationMode::shared_token(secret)
        }
        CliWebhookVerificationMode::HmacSha256 => {
            let secret = secret.context(
                "--webhook-secret (or DESK_WEBHOOK_SECRET) is required for hmac-sha256 verification",
            )?;
            WebhookVerificationMode::hmac_sha256(secret)
        }
    }
}

fn resolve_tracker_client(args: &ServeArgs) -> Arc<dyn TrackerIssueClient> {
    let api_key = args
        .tracker_api_key
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty());
    let team_id = args
        .tracker_team_id
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty());
    match (api_key, team_id) {
        (Some(api_key), Some(team_id)) => Arc::new(HttpTrackerClient::new(TrackerConfig {
            api_url: args.tracker_api_url.clone(),
            api_key: api_key.to_string(),
            team_id: team_id.to_string(),
        })),
        _ => {
            println!("tracker integration disabled: reason=missing_api_key_or_team_id");
            Arc::new(DisabledTrackerClient)
        }
    }
}

async fn run_serve(args: ServeArgs) -> Result<()> {
    let verification = resolve_verification_mode(&args)?;
    let store: Arc<dyn RequestStore> = match &args.state_file {
        Some(path) => Arc::new(
            FileRequestStore::open(path)
                .with_context(|| format!("failed to open request ledger {}", path.display()))?,
        ),
        None => Arc::new(InMemoryRequestStore::new()),
    };
    let hub = BroadcastHub::new(BroadcastHubConfig {
        topic_buffer_capacity: args.topic_buffer_capacity,
    });
    let tracker = resolve_tracker_client(&args);

    let state = Arc::new(DeskGatewayState::new(
        DeskGatewayConfig {
            bind: args.bind.clone(),
            organization_id: args.organization_id.clone(),
            organization_name: args.organization_name.clone(),
            created_by: args.created_by.clone(),
            verification,
        },
        store,
        hub,
        tracker,
    ));
    run_desk_gateway_server(state).await
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DeskCli::parse();
    match cli.command {
        DeskCommand::Serve(args) => run_serve(args).await,
        DeskCommand::Watch(args) => watch::run_watch(&args.server).await,
    }
}
