//! # Mission corpus
//!
//! Loading and lookup of the static mission description corpus.
//!
//! The corpus is an ordered JSON array of records, each carrying a `details`
//! text field. Row order is load-bearing: position `i` in the corpus must
//! correspond to row `i` of the persisted vector index, so records are
//! assigned their position at load time and never mutated afterwards.
//!
//! This module also loads the optional custom-responses file (greeting
//! overrides). The file is a reserved extension point: it is parsed and
//! surfaced at startup, but the response logic does not consult it yet.

use serde::Deserialize;
use std::{collections::HashMap, fs, path::Path};

use crate::BoxError;

/// A single mission description, addressable by its stable position.
///
/// `position` matches the corresponding row of the vector index.
#[derive(Debug, Clone, PartialEq)]
pub struct MissionRecord {
    /// 0-based position, stable for the lifetime of the process.
    pub position: usize,
    /// The mission description text.
    pub details: String,
}

/// On-disk shape of a corpus record. Extra fields are ignored.
#[derive(Debug, Deserialize)]
struct RawRecord {
    details: String,
}

/// The ordered, immutable collection of mission records.
///
/// Loaded once at startup; read-only thereafter, so it is safe to share
/// across request handlers behind an `Arc`.
#[derive(Debug)]
pub struct CorpusStore {
    records: Vec<MissionRecord>,
}

impl CorpusStore {
    /// Load the corpus from a JSON file.
    ///
    /// # Parameters
    /// - `path`: Path to the JSON file (ordered array of records, each with a
    ///   `details` field).
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not valid JSON of
    /// the expected shape. Both are startup-fatal for the service.
    pub fn load(path: &Path) -> Result<Self, BoxError> {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("failed to read corpus file {}: {e}", path.display()))?;
        let raw: Vec<RawRecord> = serde_json::from_str(&content)
            .map_err(|e| format!("failed to parse corpus file {}: {e}", path.display()))?;

        let records = raw
            .into_iter()
            .enumerate()
            .map(|(position, record)| MissionRecord {
                position,
                details: record.details,
            })
            .collect();

        Ok(Self { records })
    }

    /// Build a corpus directly from record texts, preserving order.
    ///
    /// Used by tests and tooling that do not go through a file.
    pub fn from_details<I, S>(details: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let records = details
            .into_iter()
            .enumerate()
            .map(|(position, details)| MissionRecord {
                position,
                details: details.into(),
            })
            .collect();
        Self { records }
    }

    /// Look up a record by position. Returns `None` if out of range.
    pub fn get(&self, position: usize) -> Option<&MissionRecord> {
        self.records.get(position)
    }

    /// Number of records in the corpus.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the corpus holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Optional greeting overrides loaded from the custom-responses file.
///
/// Reserved extension point: parsed at startup and logged, not consulted by
/// the composer.
#[derive(Debug, Default, Deserialize)]
pub struct CustomResponses {
    /// Keyword to reply overrides for greetings.
    #[serde(default)]
    pub greetings: HashMap<String, String>,
}

impl CustomResponses {
    /// Load custom responses from a JSON file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed; the caller
    /// treats this as startup-fatal, the same as the corpus itself.
    pub fn load(path: &Path) -> Result<Self, BoxError> {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("failed to read custom responses {}: {e}", path.display()))?;
        let custom: CustomResponses = serde_json::from_str(&content)
            .map_err(|e| format!("failed to parse custom responses {}: {e}", path.display()))?;
        Ok(custom)
    }
}
