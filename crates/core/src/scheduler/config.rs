//! Scheduler configuration.

use serde::{Deserialize, Serialize};

use crate::stage::StageCommand;

/// Upload scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Maximum topics scheduled per invocation.
    pub limit: i64,

    /// Minutes from now to the first publication slot.
    pub start_delay_min: i64,

    /// Minutes between consecutive publication slots.
    pub interval_min: i64,

    /// Upload script invocation.
    pub upload: StageCommand,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            limit: 1,
            start_delay_min: 2,
            interval_min: 10,
            upload: StageCommand::script("upload_video.py"),
        }
    }
}
