//! Scheduler error and summary types.

use thiserror::Error;

use crate::topic::TopicError;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("Upload program not found: {program}")]
    ProgramNotFound { program: String },

    #[error(transparent)]
    Store(#[from] TopicError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Tally of one scheduling run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScheduleSummary {
    /// Topics that were ready for upload.
    pub candidates: usize,

    /// Topics handed to the upload script and marked uploaded.
    pub scheduled: usize,

    /// Topics whose upload script failed, left for the next run.
    pub failed: usize,
}
