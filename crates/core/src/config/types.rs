//! Configuration types.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::discovery::DiscoveryConfig;
use crate::launcher::LauncherConfig;
use crate::scheduler::SchedulerConfig;
use crate::stage::StagesConfig;

/// Root configuration. Every section has working defaults so an empty file
/// is a valid configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub output: OutputConfig,
    pub launcher: LauncherConfig,
    pub stages: StagesConfig,
    pub discovery: DiscoveryConfig,
    pub scheduler: SchedulerConfig,
    pub generation: GenerationConfig,
}

impl Config {
    /// Stage configuration with the generation settings merged into every
    /// stage's environment. Per-stage entries win over generation entries.
    pub fn stages_with_generation_env(&self) -> StagesConfig {
        let base = self.generation.env();
        let mut stages = self.stages.clone();
        for stage in crate::topic::Stage::ALL {
            let command = match stage {
                crate::topic::Stage::Fetch => &mut stages.fetch,
                crate::topic::Stage::Image => &mut stages.image,
                crate::topic::Stage::Audio => &mut stages.audio,
                crate::topic::Stage::Preview => &mut stages.preview,
                crate::topic::Stage::Assemble => &mut stages.assemble,
            };
            for (key, value) in &base {
                command
                    .env
                    .entry(key.clone())
                    .or_insert_with(|| value.clone());
            }
        }
        stages
    }
}

/// SQLite database configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    pub path: PathBuf,

    /// Topic table name. Must be a plain identifier.
    pub table: String,

    /// SQLite busy timeout in milliseconds.
    pub busy_timeout_ms: u64,

    /// Use WAL journal mode.
    pub wal: bool,

    /// PRAGMA synchronous mode.
    pub synchronous: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("topicreel.db"),
            table: "topics".to_string(),
            busy_timeout_ms: 60_000,
            wal: true,
            synchronous: "NORMAL".to_string(),
        }
    }
}

/// Output tree configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    /// Root of the per-topic working directories.
    pub root: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("output"),
        }
    }
}

/// Media generation settings, handed to the stage scripts through the
/// environment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationConfig {
    /// Endpoint of the local image generation engine.
    pub engine_endpoint: String,

    /// Target length of the assembled video.
    pub target_video_secs: u64,

    /// Run the scraping browser headless.
    pub browser_headless: bool,

    /// Browser page-load timeout.
    pub browser_timeout_ms: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            engine_endpoint: "http://127.0.0.1:7860".to_string(),
            target_video_secs: 600,
            browser_headless: true,
            browser_timeout_ms: 30_000,
        }
    }
}

impl GenerationConfig {
    /// Environment variables exposing these settings to stage scripts.
    pub fn env(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (
                "TOPICREEL_ENGINE_ENDPOINT".to_string(),
                self.engine_endpoint.clone(),
            ),
            (
                "TOPICREEL_TARGET_VIDEO_SECS".to_string(),
                self.target_video_secs.to_string(),
            ),
            (
                "TOPICREEL_BROWSER_HEADLESS".to_string(),
                if self.browser_headless { "1" } else { "0" }.to_string(),
            ),
            (
                "TOPICREEL_BROWSER_TIMEOUT_MS".to_string(),
                self.browser_timeout_ms.to_string(),
            ),
        ])
    }
}
