//! # Retriever
//!
//! Embeds a query and runs it against the vector index.
//!
//! The retriever is a thin composition of [`Embedder`] and [`MissionIndex`]:
//! it recomputes the query embedding on every call (no caching) and touches
//! no other system state, so a retrieval is repeatable given the same index
//! and model.

use std::sync::Arc;

use crate::BoxError;
use crate::embedder::Embedder;
use crate::index::{MissionIndex, SearchResult};

/// Embed-then-search over the mission corpus.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<MissionIndex>,
}

impl Retriever {
    /// Create a retriever over the given embedder and index.
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<MissionIndex>) -> Self {
        Self { embedder, index }
    }

    /// Retrieve the `k` nearest corpus rows for `query_text`.
    ///
    /// # Returns
    /// Search results ordered by ascending distance, clipped to the corpus
    /// size when `k` is over-wide.
    ///
    /// # Errors
    /// Propagates embedding failures and index search failures unchanged.
    pub fn retrieve(&self, query_text: &str, k: usize) -> Result<Vec<SearchResult>, BoxError> {
        let query = self.embedder.embed(query_text)?;
        self.index.search(&query, k)
    }
}
