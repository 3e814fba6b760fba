//! lb-gateway: line-bridge main binary
//!
//! Runs the LINE channel module inside a minimal in-process host.
//!
//! Usage:
//!   lb-gateway                   - Start the webhook server
//!   lb-gateway --config <path>   - Use a specific configuration file
//!   lb-gateway --help            - Show help

mod host;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::get, Router};
use lb_core::{BroadcastEventBus, GatewayConfig, MiddlewareChain};
use lb_line::{BotState, LineApiFactory, LineModule};
use tracing_subscriber::EnvFilter;

/// Run mode
enum RunMode {
    /// Webhook server
    Server { config_path: Option<String> },
    /// Show help
    Help,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mode = parse_args(std::env::args().skip(1))?;

    let config_path = match mode {
        RunMode::Help => {
            print_help();
            return Ok(());
        }
        RunMode::Version => {
            println!("lb-gateway {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        RunMode::Server { config_path } => config_path,
    };

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    // Load .env file
    dotenvy::dotenv().ok();

    let config_path = config_path.or_else(|| std::env::var("LB_CONFIG").ok());
    let config = GatewayConfig::load(config_path.as_deref())
        .map_err(|e| anyhow::anyhow!("Config error: {}", e))?;

    tracing::info!("Starting lb-gateway...");
    run_server(config).await
}

/// Parse command line arguments
fn parse_args(args: impl IntoIterator<Item = String>) -> anyhow::Result<RunMode> {
    let mut config_path = None;
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--help" | "-h" => return Ok(RunMode::Help),
            "--version" | "-v" => return Ok(RunMode::Version),
            "--config" | "-c" => {
                let path = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config requires a path"))?;
                config_path = Some(path);
            }
            other => anyhow::bail!("Unknown argument: {}", other),
        }
    }

    Ok(RunMode::Server { config_path })
}

/// Print help message
fn print_help() {
    println!("lb-gateway - LINE channel bridge");
    println!();
    println!("Usage:");
    println!("  lb-gateway                   Start the webhook server");
    println!("  lb-gateway --config <path>   Use a specific configuration file");
    println!("  lb-gateway --help            Show this help message");
    println!("  lb-gateway --version         Show version");
    println!();
    println!("Environment Variables:");
    println!("  LB_CONFIG            Configuration file (default: line-bridge.toml)");
    println!("  LB_PORT              Webhook server port (default: 3000)");
    println!("  LB_PUBLIC_URL        Public base URL used in webhook URLs");
    println!("  LINE_API_BASE_URL    LINE API endpoint (default: https://api.line.me/v2)");
    println!("  RUST_LOG             Log filter (default: info)");
}

/// Run the webhook server until Ctrl+C
async fn run_server(config: GatewayConfig) -> anyhow::Result<()> {
    let bus = BroadcastEventBus::default();
    let chain = MiddlewareChain::new();

    let host_handle = host::spawn_host(&bus, chain.clone(), config.host.echo);
    if config.host.echo {
        tracing::info!("Echo mode enabled");
    }

    let module = LineModule::new(
        Arc::new(bus.clone()),
        chain.clone(),
        Arc::new(config.clone()),
        Arc::new(LineApiFactory::new(config.line.api_base_url.clone())),
        config.server.public_url.clone(),
    );

    module.on_server_started().await;

    for bot_id in config.bot_ids() {
        match module.on_bot_mount(&bot_id).await {
            Ok(BotState::Active) => tracing::info!("[{}] LINE channel active", bot_id),
            Ok(BotState::Disabled) => tracing::info!("[{}] LINE channel disabled", bot_id),
            Ok(BotState::Unconfigured) => tracing::warn!("[{}] LINE channel inactive", bot_id),
            Err(e) => tracing::error!("[{}] Failed to mount bot: {}", bot_id, e),
        }
    }

    if module.registry().is_empty() {
        tracing::warn!("No bot has the LINE channel active");
    }

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .merge(module.router());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Webhook server listening on {}", addr);
    tracing::info!("Press Ctrl+C to exit");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
            }
            tracing::info!("Shutting down...");
        })
        .await?;

    for bot_id in module.registry().bot_ids() {
        module.on_bot_unmount(&bot_id);
    }
    module.on_module_unmount().await;

    host_handle.abort();

    tracing::info!("Shutdown complete");
    Ok(())
}
