//! Topic storage trait and request/filter types.

use std::path::Path;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::topic::{Stage, StageStatus, Topic};

/// Error type for topic store operations.
#[derive(Debug, Error)]
pub enum TopicError {
    /// Topic not found.
    #[error("topic not found: {0}")]
    NotFound(String),

    /// A write would violate the stage transition table.
    #[error("topic {topic_id}: stage {stage} cannot transition {from} -> {to}")]
    InvalidTransition {
        topic_id: String,
        stage: Stage,
        from: StageStatus,
        to: StageStatus,
    },

    /// Prerequisite stages are not done yet.
    #[error("topic {topic_id}: stage {stage} requires {missing} to be done first")]
    PrerequisiteNotMet {
        topic_id: String,
        stage: Stage,
        missing: Stage,
    },

    /// The compare-and-swap claim lost against a concurrent writer.
    #[error("topic {topic_id}: stage {stage} was claimed by another writer")]
    ClaimConflict { topic_id: String, stage: Stage },

    /// Configured table name is not a safe SQL identifier.
    #[error("invalid table name: {0}")]
    InvalidTableName(String),

    /// Database error.
    #[error("database error: {0}")]
    Database(String),
}

/// Request to insert a newly discovered topic.
#[derive(Debug, Clone)]
pub struct NewTopic {
    /// Source-assigned identifier.
    pub id: String,
    /// Topic title as discovered.
    pub title: String,
    /// Raw source metadata (JSON), immutable after insert.
    pub raw_metadata: serde_json::Value,
}

impl NewTopic {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            raw_metadata: serde_json::Value::Null,
        }
    }

    pub fn with_metadata(mut self, raw_metadata: serde_json::Value) -> Self {
        self.raw_metadata = raw_metadata;
        self
    }
}

/// Filter for querying topics.
#[derive(Debug, Clone, Default)]
pub struct TopicFilter {
    /// Only rows where the given stage has the given status.
    pub stage_status: Option<(Stage, StageStatus)>,
    /// Maximum number of results.
    pub limit: i64,
    /// Offset for pagination.
    pub offset: i64,
}

impl TopicFilter {
    /// Create a new filter with defaults.
    pub fn new() -> Self {
        Self {
            stage_status: None,
            limit: 100,
            offset: 0,
        }
    }

    /// Filter by one stage's status.
    pub fn with_stage_status(mut self, stage: Stage, status: StageStatus) -> Self {
        self.stage_status = Some((stage, status));
        self
    }

    /// Set limit.
    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    /// Set offset.
    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}

/// Trait for topic storage backends.
///
/// Every stage write goes through one of the transition methods below, which
/// validate the allowed-transition table before touching the row.
pub trait TopicStore: Send + Sync {
    /// Insert a newly discovered topic with all stages not started.
    /// Returns false (and changes nothing) if the id already exists.
    fn insert(&self, topic: NewTopic) -> Result<bool, TopicError>;

    /// Get a topic by id.
    fn get(&self, id: &str) -> Result<Option<Topic>, TopicError>;

    /// List topics matching the filter, oldest `created_at` first.
    fn list(&self, filter: &TopicFilter) -> Result<Vec<Topic>, TopicError>;

    /// Count topics matching the filter.
    fn count(&self, filter: &TopicFilter) -> Result<i64, TopicError>;

    /// Claim a stage: `NotStarted`/`Failed` -> `InProgress`, as a
    /// compare-and-swap on the current status. Requires all prerequisite
    /// stages to be done.
    fn begin_stage(&self, id: &str, stage: Stage) -> Result<Topic, TopicError>;

    /// Record a successful stage: `InProgress` -> `Done`, storing the
    /// artifact path and clearing the last error.
    fn complete_stage(&self, id: &str, stage: Stage, output_path: &Path)
        -> Result<Topic, TopicError>;

    /// Record a failed stage: `InProgress` -> `Failed`, storing the error
    /// message. The output path for the stage is cleared.
    fn fail_stage(&self, id: &str, stage: Stage, error: &str) -> Result<Topic, TopicError>;

    /// Manual intervention: put a `Failed` stage back to `NotStarted`.
    fn reset_stage(&self, id: &str, stage: Stage) -> Result<Topic, TopicError>;

    /// List topics whose stages are all done and which have not been handed
    /// to the upload collaborator yet, oldest first.
    fn list_ready_for_upload(&self, limit: i64) -> Result<Vec<Topic>, TopicError>;

    /// Record the upload hand-off with its scheduled publication time.
    fn mark_uploaded(&self, id: &str, publish_at: DateTime<Utc>) -> Result<Topic, TopicError>;
}
