//! Launcher configuration.

use serde::{Deserialize, Serialize};

use crate::topic::Stage;

/// Launcher configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LauncherConfig {
    /// Number of passes when the CLI gives no explicit count.
    pub runs_default: u32,

    /// Maximum topics one stage may claim per pass.
    pub stage_cap: usize,

    /// Abort the run after the first stage failure.
    pub stop_on_error: bool,

    /// Pause between passes when a pass found no work.
    pub sleep_when_empty_ms: u64,

    /// First stage a pass visits.
    pub first_stage: Stage,

    /// Last stage a pass visits.
    pub last_stage: Stage,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            runs_default: 1,
            stage_cap: 1,
            stop_on_error: false,
            sleep_when_empty_ms: 10_000,
            first_stage: Stage::Fetch,
            last_stage: Stage::Assemble,
        }
    }
}

impl LauncherConfig {
    /// Stages a pass visits, in pipeline order.
    pub fn stage_range(&self) -> impl Iterator<Item = Stage> + '_ {
        Stage::ALL
            .into_iter()
            .filter(|s| *s >= self.first_stage && *s <= self.last_stage)
    }
}
