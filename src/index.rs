//! # Vector index
//!
//! Nearest-neighbor search over the mission embedding vectors.
//!
//! Wraps a [HNSW](https://arxiv.org/abs/1603.09320) approximate
//! nearest-neighbor index (`hora` crate). The index is rehydrated once at
//! process start from a persisted binary artifact and is read-only
//! thereafter; there is no insert/update/delete path at runtime.
//!
//! Vector ids are corpus positions: row `i` of the index must describe
//! record `i` of the corpus. [`MissionIndex::validate_row_count`] checks that
//! alignment at startup so a mismatched pair of artifacts fails fast instead
//! of silently returning wrong records.

use hora::core::ann_index::{ANNIndex, SerializableIndex};
use hora::core::metrics::Metric;
use hora::index::hnsw_idx::HNSWIndex;
use hora::index::hnsw_params::HNSWParams;
use std::path::Path;

use crate::BoxError;

/// A single nearest-neighbor hit.
///
/// `position` indexes into the corpus; `distance` is the Euclidean distance
/// between the query vector and the matched row, so smaller is closer.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// Corpus position of the matched record.
    pub position: usize,
    /// Euclidean distance to the query vector.
    pub distance: f32,
}

/// Read-only HNSW index over the mission corpus embeddings.
pub struct MissionIndex {
    index: HNSWIndex<f32, usize>,
    dimension: usize,
}

impl MissionIndex {
    /// Rehydrate the index from a persisted binary artifact.
    ///
    /// # Parameters
    /// - `path`: Location of the artifact on disk.
    /// - `dimension`: Dimensionality the embedder produces; queries are
    ///   checked against it.
    ///
    /// # Errors
    /// Returns an error if the artifact is missing or cannot be parsed. This
    /// is fatal to process startup, not recoverable per-request.
    pub fn load(path: &Path, dimension: usize) -> Result<Self, BoxError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| format!("index path is not valid UTF-8: {}", path.display()))?;
        let index = HNSWIndex::load(path_str)
            .map_err(|e| format!("failed to load vector index {}: {e}", path.display()))?;

        Ok(Self { index, dimension })
    }

    /// Build an in-memory index from vectors, one row per corpus position.
    ///
    /// Exists for tests and offline tooling; the service itself only loads
    /// prebuilt artifacts.
    ///
    /// # Errors
    /// Returns an error on dimension mismatch or if the underlying index
    /// rejects an insert or the build step.
    pub fn build(vectors: &[Vec<f32>], dimension: usize) -> Result<Self, BoxError> {
        let mut index = HNSWIndex::new(dimension, &HNSWParams::default());
        for (position, vector) in vectors.iter().enumerate() {
            if vector.len() != dimension {
                return Err(format!(
                    "vector {position} has dimension {}, expected {dimension}",
                    vector.len()
                )
                .into());
            }
            index
                .add(vector, position)
                .map_err(|e| format!("failed to add vector {position}: {e}"))?;
        }
        index
            .build(Metric::Euclidean)
            .map_err(|e| format!("failed to build index: {e}"))?;

        Ok(Self { index, dimension })
    }

    /// Dimensionality the index expects of query vectors.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Query the index for the `k` nearest rows.
    ///
    /// Results are ordered by ascending distance. If `k` exceeds the number
    /// of indexed rows, the result is clipped to what exists.
    ///
    /// # Errors
    /// Returns an error if `query` has the wrong dimensionality or the index
    /// yields a row without an id (corrupt artifact).
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>, BoxError> {
        if query.len() != self.dimension {
            return Err(format!(
                "query has dimension {}, index expects {}",
                query.len(),
                self.dimension
            )
            .into());
        }

        let k = k.max(1);
        self.index
            .search_nodes(query, k)
            .into_iter()
            .map(|(node, distance)| {
                let position =
                    (*node.idx()).ok_or("vector index returned a row without an id")?;
                Ok(SearchResult { position, distance })
            })
            .collect()
    }

    /// Verify that the index holds exactly `expected` rows.
    ///
    /// Runs a full-breadth probe search; an over-wide `k` is clipped to the
    /// row count, so the result length is the row count.
    ///
    /// # Errors
    /// Returns an error describing the mismatch; callers treat it as fatal at
    /// startup.
    pub fn validate_row_count(&self, expected: usize) -> Result<(), BoxError> {
        let probe = vec![0.0f32; self.dimension];
        let rows = self.index.search(&probe, expected + 1).len();
        if rows != expected {
            return Err(format!(
                "vector index holds {rows} rows but the corpus has {expected} records"
            )
            .into());
        }
        Ok(())
    }
}
