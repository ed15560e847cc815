//! Launcher error and report types.

use thiserror::Error;

use crate::topic::{Stage, TopicError};

#[derive(Debug, Error)]
pub enum LauncherError {
    #[error("Invalid stage range: {first} comes after {last}")]
    InvalidStageRange { first: Stage, last: Stage },

    #[error(transparent)]
    Store(#[from] TopicError),
}

/// Tally of one launcher run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    /// Passes actually performed.
    pub passes: u32,

    /// Stage executions attempted (claims that succeeded).
    pub attempted: usize,

    /// Stage executions that completed.
    pub succeeded: usize,

    /// Stage executions that failed.
    pub failed: usize,

    /// Claims lost to a concurrent launcher.
    pub conflicts: usize,
}

impl RunReport {
    /// Returns true if the run performed no stage work at all.
    pub fn is_empty(&self) -> bool {
        self.attempted == 0 && self.conflicts == 0
    }
}
