//! Stage runner trait.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::layout::TopicLayout;
use crate::topic::Topic;

use super::error::StageError;

/// Result of one successful stage run.
#[derive(Debug, Clone, PartialEq)]
pub struct StageOutcome {
    /// Artifact path to record on the topic row.
    pub output_path: PathBuf,

    /// Wall-clock run time.
    pub duration_ms: u64,
}

/// One executable pipeline stage.
#[async_trait]
pub trait StageRunner: Send + Sync {
    /// Runner name for logging.
    fn name(&self) -> &str;

    /// Runs the stage for one topic. On success the returned output path
    /// must exist on disk; the caller records it on the topic row.
    async fn run(&self, topic: &Topic, layout: &TopicLayout) -> Result<StageOutcome, StageError>;
}
