//! Main module for the ASTRO service binary (astro).
//!
//! This module provides the main function and auxiliary functionality for
//! the service: command parsing, configuration loading, and startup of the
//! HTTP server.
//!
//! # Examples
//!
//! Running the server:
//!
//! ```sh
//! cargo run -- serve
//! astro serve --config /etc/astro/config.yaml
//! ```
//!
//! Initializing the service's configuration:
//!
//! ```sh
//! cargo run -- init
//! astro init
//! ```

use astro_chat::{BoxError, commands, config, config_dir, server};
use clap::Parser;
use once_cell::sync::OnceCell;
use std::fs;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, info};

static TRACING: OnceCell<()> = OnceCell::new();

fn main() -> Result<(), BoxError> {
    TRACING.get_or_init(|| {
        tracing_subscriber::fmt::init();
    });
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run())?;
    Ok(())
}

/// Main asynchronous function of the ASTRO service.
///
/// Parses command-line arguments, loads configuration, and executes the
/// appropriate command.
///
/// # Errors
///
/// Returns an error if there is an issue loading the configuration, loading
/// a startup artifact, or binding the server.
async fn run() -> Result<(), BoxError> {
    let cli = commands::Cli::parse();

    match cli.command {
        commands::Commands::Serve { config } => {
            let config_path = match config {
                Some(path) => path,
                None => config_dir()?.join("config.yaml"),
            };
            debug!("Loading config from: {}", config_path.display());
            let astro_config = config::load_config(
                config_path
                    .to_str()
                    .ok_or("config path is not valid UTF-8")?,
            )?;
            debug!("Config loaded: {:?}", astro_config);

            let state = server::bootstrap(&astro_config)?;
            let addr: SocketAddr =
                format!("{}:{}", astro_config.bind_address, astro_config.port).parse()?;
            server::serve(Arc::new(state), addr).await?;
        }
        commands::Commands::Init => {
            debug!("Initializing configuration");
            init()?;
        }
    }

    Ok(())
}

/// Initializes the service's configuration.
///
/// Creates the configuration directory and writes a default `config.yaml`
/// pointing at a local Ollama-compatible endpoint and the data artifacts in
/// the current directory.
///
/// # Errors
///
/// Returns an error if there is an issue creating the directory or file, or
/// serializing the configuration to YAML.
fn init() -> Result<(), BoxError> {
    let config_dir = config_dir()?;
    fs::create_dir_all(&config_dir)?;

    let config_path = config_dir.join("config.yaml");
    info!("Creating config file: {}", config_path.display());
    let config = config::AstroConfig {
        api_base: "http://localhost:11434/v1".to_string(),
        api_key: "CHANGEME".to_string(),
        model: "phi".to_string(),
        context_max_tokens: 512,
        index_path: "missions.index".into(),
        corpus_path: "mission_data.json".into(),
        custom_responses_path: Some("custom_responses.json".into()),
        bind_address: "127.0.0.1".to_string(),
        port: 5000,
        similarity_threshold: 0.75,
        top_k: 1,
        context_budget_chars: 1000,
        memory_budget_chars: 600,
        gateway_timeout_secs: 60,
        max_sessions: 1024,
    };
    let config_yaml = serde_yaml::to_string(&config)?;
    fs::write(config_path, config_yaml)?;

    Ok(())
}
