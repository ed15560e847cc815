//! Stage execution error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::topic::Stage;

/// Errors that can occur while running a stage.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("Stage program not found: {program}")]
    ProgramNotFound { program: String },

    #[error("Stage {stage} exited with code {code:?}: {stderr_tail}")]
    NonZeroExit {
        stage: Stage,
        code: Option<i32>,
        stderr_tail: String,
    },

    #[error("Stage {stage} timed out after {timeout_secs} seconds")]
    Timeout { stage: Stage, timeout_secs: u64 },

    #[error("Stage {stage} exited successfully but produced no artifact in {path}")]
    MissingArtifact { stage: Stage, path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
