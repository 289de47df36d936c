//! Medibook binary - composition root.
//!
//! 1. Parse CLI flags and load configuration (TOML, then env overrides)
//! 2. Build the booking backend client and the language model client
//! 3. Start the idle-session reaper
//! 4. Serve the HTTP and WebSocket API

mod cli;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use medibook_api::routes;
use medibook_api::state::AppState;
use medibook_backend::{BookingBackend, HttpBookingBackend};
use medibook_core::config::MedibookConfig;
use medibook_dialogue::{OllamaClient, SessionRegistry};

use cli::CliArgs;

const REAPER_INTERVAL: Duration = Duration::from_secs(60);

/// Periodically drop sessions nobody has talked to for a while.
async fn session_reaper(registry: Arc<SessionRegistry>) {
    let mut interval = tokio::time::interval(REAPER_INTERVAL);
    loop {
        interval.tick().await;
        let evicted = registry.evict_idle(chrono::Utc::now());
        if evicted > 0 {
            tracing::debug!(evicted, active = registry.len(), "Idle sessions reaped");
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let mut config = MedibookConfig::load_or_default(&config_file);
    config.apply_env_overrides();
    config.server.host = args.resolve_host(&config.server.host);
    config.server.port = args.resolve_port(config.server.port);

    // Tracing. RUST_LOG wins over the flag and config file.
    let level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&level)),
        )
        .init();

    tracing::info!("Starting Medibook v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    // Collaborators.
    let backend = Arc::new(HttpBookingBackend::new(&config.backend)?);
    if backend.health_check().await {
        tracing::info!(url = %config.backend.base_url, "Booking backend reachable");
    } else {
        tracing::warn!(
            url = %config.backend.base_url,
            "Booking backend unreachable; tool calls will report connection errors"
        );
    }

    let llm = Arc::new(OllamaClient::new(&config.llm)?);
    tracing::info!(host = %config.llm.host, model = %config.llm.model, "Language model configured");

    // No speech-to-text engine is bundled; audio frames get an error event.
    tracing::info!("Speech transcription unavailable; voice WebSocket accepts text only");

    let registry = SessionRegistry::new(llm, backend, &config);
    let server_config = config.server.clone();
    let state = AppState::new(config, registry);

    // === Background tasks ===
    tokio::spawn(session_reaper(Arc::clone(&state.registry)));

    // === API server ===
    if let Err(e) = routes::start_server(&server_config, state).await {
        tracing::error!(error = %e, "API server failed");
        return Err(e.into());
    }

    Ok(())
}
