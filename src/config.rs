//! This module provides functionality for loading and handling the service's
//! configuration.
//!
//! It defines the `AstroConfig` struct, which holds the configuration
//! parameters, and a `load_config` function to load the configuration from a
//! YAML file. Retrieval policy values (similarity threshold, result count,
//! context budgets) are configuration parameters with sensible defaults, so a
//! minimal file only needs the API coordinates and the data artifact paths.
//!
//! # Examples
//!
//! Loading the configuration from a file:
//!
//! ```no_run
//! use astro_chat::config::{AstroConfig, load_config};
//!
//! let config: AstroConfig = load_config("/path/to/config.yaml").unwrap();
//! println!("{:?}", config);
//! ```

use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

use crate::BoxError;

/// Represents the service's configuration.
///
/// This struct holds the configuration parameters needed to run the service,
/// such as the summarization API coordinates, the data artifact paths, and
/// the retrieval policy knobs. It can be constructed by loading a YAML
/// configuration file using the `load_config` function.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct AstroConfig {
    /// The base URL of the OpenAI-compatible summarization API.
    pub api_base: String,

    /// The API key used to authenticate requests to the summarization API.
    pub api_key: String,

    /// The name of the model used for summarization.
    pub model: String,

    /// Maximum tokens requested per summarization completion.
    pub context_max_tokens: u16,

    /// Path to the persisted HNSW index artifact.
    pub index_path: PathBuf,

    /// Path to the mission corpus JSON file (ordered array of records with a
    /// `details` field; row order must match the index row order).
    pub corpus_path: PathBuf,

    /// Optional path to the custom-responses JSON file (greeting overrides).
    #[serde(default)]
    pub custom_responses_path: Option<PathBuf>,

    /// Address the HTTP server binds to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Port the HTTP server listens on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Similarity cutoff below which a direct match is rejected.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// Number of nearest neighbors retrieved per conversational query.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Character budget for the per-turn combined context.
    #[serde(default = "default_context_budget_chars")]
    pub context_budget_chars: usize,

    /// Character budget for the blended previous-plus-current context sent to
    /// the summarizer.
    #[serde(default = "default_memory_budget_chars")]
    pub memory_budget_chars: usize,

    /// Seconds allowed for a single summarization call.
    #[serde(default = "default_gateway_timeout_secs")]
    pub gateway_timeout_secs: u64,

    /// Maximum number of concurrently remembered sessions.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_similarity_threshold() -> f32 {
    0.75
}

fn default_top_k() -> usize {
    1
}

fn default_context_budget_chars() -> usize {
    1000
}

fn default_memory_budget_chars() -> usize {
    600
}

fn default_gateway_timeout_secs() -> u64 {
    60
}

fn default_max_sessions() -> usize {
    1024
}

/// Loads the service's configuration from a YAML file.
///
/// This function reads the file at the given path, parses it as YAML, and
/// constructs an `AstroConfig` struct from it.
///
/// # Parameters
///
/// - `file`: The path to the YAML configuration file.
///
/// # Returns
///
/// - `Ok(AstroConfig)`: The loaded configuration.
/// - `Err(BoxError)`: An error occurred while reading the file or parsing the
///   YAML.
///
/// # Examples
///
/// ```no_run
/// use astro_chat::config::load_config;
///
/// match load_config("/path/to/config.yaml") {
///     Ok(config) => println!("{:?}", config),
///     Err(err) => eprintln!("Error loading config: {}", err),
/// }
/// ```
pub fn load_config(file: &str) -> Result<AstroConfig, BoxError> {
    let content = fs::read_to_string(file)?;
    let config: AstroConfig = serde_yaml::from_str(&content)?;
    Ok(config)
}
