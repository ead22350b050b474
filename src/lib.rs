//! # ASTRO (library root)
//!
//! This crate provides the core plumbing for the **ASTRO** mission Q&A
//! service:
//! - Sentence embeddings and nearest-neighbor retrieval over a fixed mission
//!   corpus (`embedder`, `index`, `retriever`).
//! - Mission corpus and custom-response loading (`corpus`).
//! - Per-conversation short-term memory (`memory`).
//! - Small-talk detection, threshold policy, and answer assembly (`composer`).
//! - The external summarization client (`gateway`).
//! - The HTTP transport (`server`) and CLI (`commands`).
//!
//! The service answers a question by embedding it, looking up the closest
//! mission description in a prebuilt HNSW index, and either returning the
//! matched record directly (threshold-gated) or asking an OpenAI-compatible
//! model to summarize it together with the previous turn's context.
//!
//! ## Modules
//! - [`commands`], [`composer`], [`config`], [`corpus`], [`embedder`],
//!   [`gateway`], [`index`], [`memory`], [`retriever`], [`server`]

use directories::ProjectDirs;

pub mod commands;
pub mod composer;
pub mod config;
pub mod corpus;
pub mod embedder;
pub mod gateway;
pub mod index;
pub mod memory;
pub mod retriever;
pub mod server;

/// Boxed error type used throughout the crate.
///
/// `Send + Sync` so errors can cross task boundaries inside the web server.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Return the per-platform configuration directory used by ASTRO.
///
/// This uses [`directories::ProjectDirs`] with the application triple
/// `("com", "issdc", "astro")`, so you get the right place on each OS
/// (e.g., `~/.config/astro` on Linux via XDG).
///
/// The directory is **not** created by this function; callers that need it
/// should create it with `fs::create_dir_all`.
///
/// # Errors
/// Returns an error if the platform configuration directory cannot be
/// determined (rare, but possible in heavily sandboxed environments).
///
/// # Examples
/// ```rust
/// let cfg = astro_chat::config_dir().expect("has a config dir");
/// println!("config at {}", cfg.display());
/// ```
pub fn config_dir() -> Result<std::path::PathBuf, BoxError> {
    let proj_dirs =
        ProjectDirs::from("com", "issdc", "astro").ok_or("Unable to determine config directory")?;
    Ok(proj_dirs.config_dir().to_path_buf())
}
