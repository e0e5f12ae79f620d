//! Discarr entry point.
//!
//! ```text
//! discarr                   Run with ./discarr.toml (or defaults)
//! discarr --config <path>   Load a custom config TOML
//! discarr --port <port>     Override the API port
//! discarr --gen-config      Write default config to stdout
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use discarr_server::config::ServerConfig;
use discarr_server::service::DiscarrService;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "discarr", about = "Play video into a Discord screen share")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "discarr.toml")]
    config: PathBuf,

    /// Override the HTTP port.
    #[arg(short, long)]
    port: Option<u16>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&ServerConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    // Load config, then environment and CLI overrides.
    let mut config = ServerConfig::load(&cli.config);
    config.apply_env()?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("discarr v{}", env!("CARGO_PKG_VERSION"));
    info!("output mode: {}", config.server.output_mode);
    info!("platform: {}", config.server.platform.as_str());
    info!("videos: {}", config.media.videos_path.display());

    let service = DiscarrService::new(config);
    service.run(shutdown_signal()).await?;

    Ok(())
}

/// Resolves on Ctrl-C or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Ctrl-C received, shutting down"),
        _ = terminate => info!("SIGTERM received, shutting down"),
    }
}
