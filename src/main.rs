//! HoopCoach - AI dribbling coach backend
//!
//! An HTTP service that sends practice clips to a Gemini model and turns
//! the free-text replies into structured coaching feedback, either one
//! clip at a time or as a progressive multi-clip session that
//! consolidates once enough clips are in.

mod analysis;
mod api;
mod cli;
mod config;
mod error;
mod models;
mod oracle;
mod session;

use anyhow::{Context, Result};
use api::AppState;
use cli::Args;
use config::{Config, CONFIG_FILE};
use oracle::{GeminiClient, GeminiConfig};
use session::InMemorySessionStore;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("HoopCoach v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    serve(args).await
}

/// Handle --init-config: generate a default .hoopcoach.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "{} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("Created {} with default settings.", CONFIG_FILE);
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Wire the pipeline and serve until the process is stopped.
async fn serve(args: Args) -> Result<()> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.validate()?;

    if config.model.api_key.is_none() {
        warn!("No API key configured; analysis requests will fail until GOOGLE_API_KEY is set");
    }

    let gemini = GeminiClient::new(GeminiConfig::from_config(&config.model, &config.media))
        .context("Failed to initialize Gemini client")?;
    let sessions = InMemorySessionStore::new(config.session.default_skill_level.clone());

    let state = AppState::new(
        Arc::new(gemini),
        Arc::new(sessions),
        config.session.saturation_threshold,
    );
    let app = api::build_router(state, &config.server);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!(
        "Serving on http://{} (model {}, saturation after {} clips)",
        addr, config.model.name, config.session.saturation_threshold
    );

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
