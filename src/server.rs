//! # HTTP transport
//!
//! Axum server exposing the two response modes plus a health probe.
//!
//! - `POST /chat` — direct-match mode: `{message}` in,
//!   `{response, context, response_time}` out. A missing message is treated
//!   as the empty string.
//! - `POST /ask` — conversational mode: `{message, session_id?}` in; the
//!   session id defaults to `"default_user"`. An absent or empty message is
//!   a client error (`400 {"error": "No message received"}`); unexpected
//!   internal failures surface as `500 {"error": ...}`.
//! - `GET /health` — liveness probe with version and corpus size.
//!
//! All routes run behind permissive CORS and HTTP tracing. Each request
//! executes synchronously end-to-end on its task: the embedding, the index
//! search, and (conversational mode) the gateway call all block the handler.
//! `response_time` is seconds spent in the handler, rounded to two decimals.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::BoxError;
use crate::composer::{Composer, ResponsePolicy};
use crate::config::AstroConfig;
use crate::corpus::{CorpusStore, CustomResponses};
use crate::embedder::{Embedder, SentenceEmbedder};
use crate::gateway::SummaryGateway;
use crate::index::MissionIndex;
use crate::memory::SessionMemory;
use crate::retriever::Retriever;

/// Session id used when the caller does not supply one.
pub const DEFAULT_SESSION_ID: &str = "default_user";

/// Shared application state behind the router.
pub struct AppState {
    composer: Composer,
    corpus: Arc<CorpusStore>,
}

impl AppState {
    /// Assemble state from prebuilt parts. Used directly by tests; the
    /// binary goes through [`bootstrap`].
    pub fn new(composer: Composer, corpus: Arc<CorpusStore>) -> Self {
        Self { composer, corpus }
    }
}

/// Load every startup artifact and wire the application state.
///
/// Loads the corpus, the optional custom responses, the embedding model, and
/// the index artifact, then validates that corpus and index have the same
/// row count. Any failure here is fatal: the process must not start serving
/// with a partial or misaligned data set.
pub fn bootstrap(config: &AstroConfig) -> Result<AppState, BoxError> {
    let corpus = Arc::new(CorpusStore::load(&config.corpus_path)?);
    info!(records = corpus.len(), "mission corpus loaded");

    if let Some(path) = &config.custom_responses_path {
        // Reserved extension point; parsed so a malformed file fails fast.
        let custom = CustomResponses::load(path)?;
        info!(greetings = custom.greetings.len(), "custom responses loaded");
    }

    let embedder: Arc<dyn Embedder> = Arc::new(SentenceEmbedder::load()?);
    let index = MissionIndex::load(&config.index_path, embedder.dimension())?;
    index.validate_row_count(corpus.len())?;
    info!(dimension = index.dimension(), "vector index loaded");

    let retriever = Retriever::new(embedder, Arc::new(index));
    let memory = Arc::new(SessionMemory::new(config.max_sessions));
    let gateway = SummaryGateway::new(config);
    let policy = ResponsePolicy {
        similarity_threshold: config.similarity_threshold,
        top_k: config.top_k,
        context_budget_chars: config.context_budget_chars,
        memory_budget_chars: config.memory_budget_chars,
    };
    let composer = Composer::new(retriever, Arc::clone(&corpus), memory, gateway, policy);

    Ok(AppState::new(composer, corpus))
}

/// Direct-match request body.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// The user's question; absent means empty.
    #[serde(default)]
    pub message: String,
}

/// Conversational request body.
#[derive(Debug, Deserialize)]
pub struct AskRequest {
    /// The user's question.
    #[serde(default)]
    pub message: String,
    /// Opaque conversation identifier.
    #[serde(default = "default_session_id")]
    pub session_id: String,
}

fn default_session_id() -> String {
    DEFAULT_SESSION_ID.to_string()
}

/// Successful answer payload, shared by both endpoints.
#[derive(Debug, Serialize)]
pub struct AnswerResponse {
    pub response: String,
    pub context: String,
    pub response_time: f64,
}

/// Error payload.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Health probe payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub missions: usize,
}

fn round_seconds(started: Instant) -> f64 {
    (started.elapsed().as_secs_f64() * 100.0).round() / 100.0
}

fn internal_error(e: BoxError) -> (StatusCode, Json<ErrorResponse>) {
    error!("request failed: {e}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}

/// Health check endpoint.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        missions: state.corpus.len(),
    })
}

/// Direct-match endpoint: threshold-gated raw record lookup.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<AnswerResponse>, (StatusCode, Json<ErrorResponse>)> {
    let started = Instant::now();
    let reply = state
        .composer
        .direct_answer(&request.message)
        .map_err(internal_error)?;

    Ok(Json(AnswerResponse {
        response: reply.response,
        context: reply.context,
        response_time: round_seconds(started),
    }))
}

/// Conversational endpoint: memory-augmented summarization.
pub async fn ask(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AnswerResponse>, (StatusCode, Json<ErrorResponse>)> {
    if request.message.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "No message received".to_string(),
            }),
        ));
    }

    let started = Instant::now();
    let reply = state
        .composer
        .conversational_answer(&request.message, &request.session_id)
        .await
        .map_err(internal_error)?;

    Ok(Json(AnswerResponse {
        response: reply.response,
        context: reply.context,
        response_time: round_seconds(started),
    }))
}

/// Create the router with all routes and middleware configured.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/chat", post(chat))
        .route("/ask", post(ask))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server on the given address.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> Result<(), BoxError> {
    let router = create_router(state);

    info!(%addr, "Starting ASTRO server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
