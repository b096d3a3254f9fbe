//! pergamo-qs (Question Service) - Main entry point
//!
//! Loads the question tree, then serves filtering, pagination, practice
//! sessions, explanations and question reports over HTTP.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pergamo_common::config::{
    check_root_folder, config_file_path, CompiledDefaults, RootFolderResolver, TomlConfig,
};
use pergamo_qs::explain::LlmClient;
use pergamo_qs::report::ReportService;
use pergamo_qs::service::QuestionService;
use pergamo_qs::store::QuestionLoader;
use pergamo_qs::session::SessionRegistry;
use pergamo_qs::{build_router, spawn_maintenance, AppState, AssetMount};

/// Command-line arguments for pergamo-qs
#[derive(Parser, Debug)]
#[command(name = "pergamo-qs")]
#[command(about = "ENEM question service")]
#[command(version)]
struct Args {
    /// Root folder containing the question tree
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "PERGAMO_PORT")]
    port: Option<u16>,

    /// Address to bind to
    #[arg(long, env = "PERGAMO_HOST")]
    host: Option<String>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let defaults = CompiledDefaults::for_current_platform();

    // Peek at the configured level so the subscriber exists before the
    // config loader starts logging
    let level = config_file_path(args.config.as_deref())
        .and_then(|path| TomlConfig::load(&path).ok())
        .map(|config| config.logging.level)
        .unwrap_or_else(|| defaults.log_level.clone());

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("pergamo_qs={level},pergamo_common={level},tower_http=info").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting Pergamo Question Service (pergamo-qs) v{}",
        env!("CARGO_PKG_VERSION")
    );

    let config = TomlConfig::load_or_default(args.config.as_deref());

    let root_folder = RootFolderResolver::new()
        .with_cli_arg(args.root_folder.clone())
        .with_toml(&config)
        .resolve();
    info!("Question root: {}", root_folder.display());
    if let Err(e) = check_root_folder(&root_folder) {
        warn!("{} (serving an empty store)", e);
    }

    let loader = QuestionLoader::new(&root_folder).with_asset_prefix(&config.store.asset_prefix);
    let questions = QuestionService::load(loader)
        .await
        .context("Failed to load question store")?;
    info!("✓ Question store ready ({} questions)", questions.len().await);

    let explainer =
        LlmClient::new(config.explain.clone()).context("Failed to build explanation client")?;
    let reports = ReportService::from_config(
        config.reports.webhook_url.as_deref(),
        config.reports.requests_per_minute,
        Duration::from_secs(config.reports.dedup_ttl_secs),
    )
    .context("Failed to build report service")?;

    let assets = config.store.serve_assets.then(|| AssetMount {
        prefix: config.store.asset_prefix.clone(),
        root: root_folder.clone(),
    });
    if let Some(mount) = &assets {
        info!(
            "Serving assets from {} under '{}/'",
            mount.root.display(),
            mount.prefix
        );
    }

    let state = AppState::new(
        questions,
        Arc::new(explainer),
        config.explain.requests_per_minute,
        reports,
    )
    .with_assets(assets)
    .with_sessions(SessionRegistry::with_limits(
        Duration::from_secs(config.sessions.idle_ttl_secs),
        config.sessions.max_sessions,
    ))
    .with_reload(config.store.allow_reload);
    if !state.allow_reload {
        info!("POST /questions/reload is disabled (store.allow_reload = false)");
    }

    let maintenance = spawn_maintenance(
        &state,
        Duration::from_secs(config.sessions.sweep_interval_secs),
    );
    let app = build_router(state);

    let host = args
        .host
        .or(config.host.clone())
        .unwrap_or(defaults.host);
    let port = args.port.or(config.port).unwrap_or(defaults.port);
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", host, port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("pergamo-qs listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    maintenance.abort();
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
