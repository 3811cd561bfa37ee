use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use hv_domain::config::{Config, ConfigSeverity, Secrets};
use hv_gateway::api;
use hv_gateway::cli::{Cli, Command, ConfigCommand};
use hv_gateway::state::AppState;
use hv_services::{InMemoryCustomers, InMemoryImageIntake, InMemoryScheduling};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        // Default to serve when no subcommand is given.
        None | Some(Command::Serve) => {
            init_tracing();
            let config = Config::load(&cli.config)?;
            run_server(Arc::new(config)).await
        }
        Some(Command::Config(ConfigCommand::Validate)) => {
            let config = Config::load(&cli.config)?;
            let secrets = Secrets::from_env(&config);
            let issues = config.validate(&secrets);
            for issue in &issues {
                match issue.severity {
                    ConfigSeverity::Warning => eprintln!("warning: {issue}"),
                    ConfigSeverity::Error => eprintln!("error: {issue}"),
                }
            }
            if issues
                .iter()
                .any(|i| i.severity == ConfigSeverity::Error)
            {
                std::process::exit(1);
            }
            println!("config OK");
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Show)) => {
            let config = Config::load(&cli.config)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        Some(Command::Version) => {
            println!("homevoice {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Structured JSON tracing (only for the `serve` command).
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,hv_gateway=debug")),
        )
        .json()
        .init();
}

/// Start the gateway with the given configuration.
async fn run_server(config: Arc<Config>) -> anyhow::Result<()> {
    tracing::info!("HomeVoice starting");

    // ── Config validation (missing credentials are fatal) ────────────
    let secrets = Arc::new(Secrets::from_env(&config));
    let issues = config.validate(&secrets);
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues
                .iter()
                .filter(|i| i.severity == ConfigSeverity::Error)
                .count()
        );
    }

    // ── Collaborators ────────────────────────────────────────────────
    // In-memory implementations stand in for the relational layer; a
    // database deployment swaps these behind the same traits.
    let scheduling = Arc::new(InMemoryScheduling::new());
    let customers = Arc::new(InMemoryCustomers::new());
    let images = Arc::new(InMemoryImageIntake::new(
        config.server.public_base_url.clone(),
        config.uploads.url_ttl_hours,
    ));
    tracing::info!("collaborator services ready");

    // ── App state ────────────────────────────────────────────────────
    let state = AppState::new(config.clone(), secrets, scheduling, customers, images);
    tracing::info!(
        model = %config.realtime.model,
        voice = %config.realtime.voice,
        "voice agent ready"
    );

    // ── Router ───────────────────────────────────────────────────────
    let app = api::router(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::cors::CorsLayer::permissive())
        .layer(tower::limit::ConcurrencyLimitLayer::new(256));

    // ── Bind ─────────────────────────────────────────────────────────
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding to {addr}"))?;

    tracing::info!(
        addr = %addr,
        public_url = %config.server.public_base_url,
        "HomeVoice listening"
    );

    axum::serve(listener, app)
        .await
        .context("axum server error")?;

    Ok(())
}
