//! Core topic data types.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Pipeline stages
// ============================================================================

/// One step of the content pipeline, in fixed total order.
///
/// A stage may only complete once every stage before it has completed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Capture the full source content for a discovered topic.
    Fetch,
    /// Generate slide images from the fetched content.
    Image,
    /// Generate narration audio.
    Audio,
    /// Build the thumbnail and preview clip.
    Preview,
    /// Stitch the final video from the generated parts.
    Assemble,
}

impl Stage {
    /// All stages in pipeline order.
    pub const ALL: [Stage; 5] = [
        Stage::Fetch,
        Stage::Image,
        Stage::Audio,
        Stage::Preview,
        Stage::Assemble,
    ];

    /// Position in the pipeline order (0-based).
    pub fn index(&self) -> usize {
        match self {
            Stage::Fetch => 0,
            Stage::Image => 1,
            Stage::Audio => 2,
            Stage::Preview => 3,
            Stage::Assemble => 4,
        }
    }

    /// Stages that must be `Done` before this stage may run.
    pub fn prerequisites(&self) -> &'static [Stage] {
        &Stage::ALL[..self.index()]
    }

    /// The stage following this one, if any.
    pub fn next(&self) -> Option<Stage> {
        Stage::ALL.get(self.index() + 1).copied()
    }

    /// Stage name as stored in status column names and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Fetch => "fetch",
            Stage::Image => "image",
            Stage::Audio => "audio",
            Stage::Preview => "preview",
            Stage::Assemble => "assemble",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fetch" => Ok(Stage::Fetch),
            "image" => Ok(Stage::Image),
            "audio" => Ok(Stage::Audio),
            "preview" => Ok(Stage::Preview),
            "assemble" => Ok(Stage::Assemble),
            other => Err(format!("unknown stage: {}", other)),
        }
    }
}

// ============================================================================
// Stage status
// ============================================================================

/// Progress of one stage on one topic row.
///
/// Allowed transitions, validated on every store write:
/// ```text
/// NotStarted ─┐
///             ├─> InProgress ─> Done
/// Failed ─────┘        │
///                      └─────> Failed
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// Stage has not been attempted yet.
    NotStarted,
    /// Stage is being executed right now (excludes re-selection).
    InProgress,
    /// Stage finished and produced its artifact.
    Done,
    /// Stage was attempted and failed; eligible again on the next run.
    Failed,
}

impl StageStatus {
    /// Returns true if a runner may claim the stage from this status.
    pub fn can_begin(&self) -> bool {
        matches!(self, StageStatus::NotStarted | StageStatus::Failed)
    }

    /// Returns true if `next` is an allowed transition from this status.
    pub fn can_transition_to(&self, next: StageStatus) -> bool {
        matches!(
            (self, next),
            (
                StageStatus::NotStarted | StageStatus::Failed,
                StageStatus::InProgress
            ) | (
                StageStatus::InProgress,
                StageStatus::Done | StageStatus::Failed
            )
        )
    }

    /// Status name as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            StageStatus::NotStarted => "not_started",
            StageStatus::InProgress => "in_progress",
            StageStatus::Done => "done",
            StageStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_started" => Ok(StageStatus::NotStarted),
            "in_progress" => Ok(StageStatus::InProgress),
            "done" => Ok(StageStatus::Done),
            "failed" => Ok(StageStatus::Failed),
            other => Err(format!("unknown stage status: {}", other)),
        }
    }
}

// ============================================================================
// Per-stage progress
// ============================================================================

/// Status plus output artifact of one stage.
///
/// `output_path` is set if and only if `status` is `Done`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageProgress {
    pub status: StageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
}

impl StageProgress {
    /// Fresh progress: not started, no output.
    pub fn new() -> Self {
        Self {
            status: StageStatus::NotStarted,
            output_path: None,
        }
    }

    /// Completed progress with its artifact path.
    pub fn done(output_path: impl Into<PathBuf>) -> Self {
        Self {
            status: StageStatus::Done,
            output_path: Some(output_path.into()),
        }
    }
}

impl Default for StageProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// Progress of all five stages, indexed by [`Stage`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StageStates([StageProgress; 5]);

impl StageStates {
    /// All stages not started.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, stage: Stage) -> &StageProgress {
        &self.0[stage.index()]
    }

    pub fn get_mut(&mut self, stage: Stage) -> &mut StageProgress {
        &mut self.0[stage.index()]
    }

    /// Iterate stages with their progress, in pipeline order.
    pub fn iter(&self) -> impl Iterator<Item = (Stage, &StageProgress)> {
        Stage::ALL.iter().map(move |s| (*s, self.get(*s)))
    }
}

// ============================================================================
// Topic row
// ============================================================================

/// A persisted record of one piece of source content and its pipeline
/// progress.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Topic {
    /// Source-assigned identifier, stable across runs, never reused.
    pub id: String,

    /// Topic title captured at discovery time, immutable thereafter.
    pub title: String,

    /// Raw source metadata captured at discovery time (JSON).
    pub raw_metadata: serde_json::Value,

    /// Per-stage progress.
    pub stages: StageStates,

    /// Message of the most recent stage failure, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,

    /// Scheduled publication time, set when the upload collaborator ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_at: Option<DateTime<Utc>>,

    /// When the assembled video was handed to the upload collaborator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<DateTime<Utc>>,

    /// When the row was created.
    pub created_at: DateTime<Utc>,

    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Topic {
    /// Current status of one stage.
    pub fn status(&self, stage: Stage) -> StageStatus {
        self.stages.get(stage).status
    }

    /// Output artifact of one stage, present iff that stage is `Done`.
    pub fn output_path(&self, stage: Stage) -> Option<&Path> {
        self.stages.get(stage).output_path.as_deref()
    }

    /// Returns true if every stage before `stage` is `Done`.
    pub fn prerequisites_done(&self, stage: Stage) -> bool {
        stage
            .prerequisites()
            .iter()
            .all(|s| self.status(*s) == StageStatus::Done)
    }

    /// Returns true if `stage` may run now: its own status allows a claim
    /// and all prerequisite stages are done.
    pub fn is_eligible(&self, stage: Stage) -> bool {
        self.status(stage).can_begin() && self.prerequisites_done(stage)
    }

    /// Returns true if every stage is `Done`.
    pub fn all_stages_done(&self) -> bool {
        Stage::ALL
            .iter()
            .all(|s| self.status(*s) == StageStatus::Done)
    }

    /// Returns true if the assembled video was handed off for upload.
    pub fn is_uploaded(&self) -> bool {
        self.uploaded_at.is_some()
    }
}
