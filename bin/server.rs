// QR Tracker - Web Server
// REST API with Axum

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use qr_tracker::api::{router, AppState};
use qr_tracker::logging::init_logging;
use qr_tracker::{ObjectRegistry, TrackerConfig};

#[derive(Parser, Debug)]
#[command(name = "qr-tracker-server", version, about = "QR Tracker REST API")]
struct Args {
    /// TOML config file
    #[arg(long, env = "QR_TRACKER_CONFIG")]
    config: Option<PathBuf>,

    /// Bind address (overrides the config file)
    #[arg(long, env = "QR_TRACKER_BIND")]
    bind: Option<String>,

    /// Start with the two demo objects registered
    #[arg(long)]
    seed_demo: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut config = TrackerConfig::load_or_default(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.server.bind_addr = bind;
    }

    let registry = ObjectRegistry::new();
    if args.seed_demo {
        registry.seed_demo_objects(chrono::Utc::now());
    }

    let addr = config.server.bind_addr.clone();
    let app = router(AppState::new(registry, config));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!("🚀 Server running on http://{}", addr);
    tracing::info!("   API: http://{}/api/objects", addr);

    axum::serve(listener, app)
        .await
        .context("Server terminated with an error")?;

    Ok(())
}
