use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use medisys_portal::{load_config, PortalConfig, PortalServer, Shutdown};

/// Server-rendered web portal for the MediSys clinical backend.
#[derive(Parser, Debug)]
#[command(name = "medisys-portal", version, about)]
struct Args {
    /// Path to the TOML configuration file. Defaults are used when absent.
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "medisys_portal=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => PortalConfig::default(),
    };

    tracing::info!(
        bind_address = %config.listener.bind_address,
        api_base_url = %config.api.base_url,
        api_timeout_secs = config.api.timeout_secs,
        "Configuration loaded"
    );

    // Metrics exporter, when enabled
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => medisys_portal::observability::metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Bind TCP listener
    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    // Ctrl+C triggers graceful shutdown
    let shutdown = Shutdown::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl+C received, shutting down");
            trigger.trigger();
        }
    });

    let server = PortalServer::new(config)?;
    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
