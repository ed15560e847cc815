//! Discovery wire format, errors and summary.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::topic::TopicError;

/// One topic as printed by a scraper script, one JSON object per line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscoveredTopic {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("No discovery categories configured")]
    NoCategories,

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Scraper program not found: {program}")]
    ProgramNotFound { program: String },

    #[error(transparent)]
    Store(#[from] TopicError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Tally of one build-list run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscoverySummary {
    /// Well-formed lines read from the scripts.
    pub discovered: usize,

    /// New rows created.
    pub inserted: usize,

    /// Ids already present, left untouched.
    pub duplicates: usize,

    /// Lines that failed to parse, skipped.
    pub malformed: usize,

    /// Categories whose script failed (the others still ran).
    pub failed_categories: Vec<String>,
}
