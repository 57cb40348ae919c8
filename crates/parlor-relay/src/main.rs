//! Realtime messaging core entrypoint.
//!
//! `tallow-relay::main` is a stub (`Commands::Serve` prints and exits); this
//! binary fills in the part the teacher left as `todo!()`, wiring
//! [`ServerConfig`], [`HubManager`], and the axum router into a running
//! server, using the CLI shape the teacher sketched and the
//! `tracing_subscriber` init style shown elsewhere in the pack.

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use parlor_relay::auth::QueryParamIdentity;
use parlor_relay::config::ServerConfig;
use parlor_relay::hub_manager::HubManager;
use parlor_relay::server::{self, AppState};

#[derive(Parser)]
#[command(name = "parlor-relay")]
#[command(about = "Realtime messaging core: rooms, chat, and WebRTC signalling relay")]
struct Cli {
    /// Address to bind the WebSocket listener to.
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    addr: String,

    /// Number of hub shards. Defaults to 4x the available CPUs.
    #[arg(long)]
    shards: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cli = Cli::parse();

    let mut cfg = ServerConfig {
        bind_addr: cli.addr,
        ..ServerConfig::default()
    };
    if let Some(shards) = cli.shards {
        cfg.shard_count = shards;
    }
    cfg.validate();

    tracing::info!(
        bind_addr = %cfg.bind_addr,
        shards = cfg.shard_count,
        "starting realtime messaging core"
    );

    let hubs = Arc::new(HubManager::spawn(
        cfg.shard_count,
        cfg.hub_inbound_capacity,
        cfg.hub_disconnect_capacity,
    ));

    let state = Arc::new(AppState {
        hubs,
        identity_source: Box::new(QueryParamIdentity),
        outbound_capacity: cfg.outbound_queue_capacity,
    });

    let app = server::router(state);
    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!(bind_addr = %cfg.bind_addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
