//! Launcher implementation.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::gate::select_eligible;
use crate::layout::TopicLayout;
use crate::stage::{ScriptStage, StageRunner, StagesConfig};
use crate::topic::{Stage, StageStatus, Topic, TopicError, TopicFilter, TopicStore};

use super::config::LauncherConfig;
use super::types::{LauncherError, RunReport};

/// Rows loaded per status when collecting a stage's candidates.
const CANDIDATE_FETCH_LIMIT: i64 = 256;

/// Fixed stage-to-runner mapping, resolved once at startup.
///
/// Resolution failures (bad program paths and the like) surface when the
/// process boots instead of in the middle of a pass.
pub struct StageRegistry {
    runners: [Arc<dyn StageRunner>; 5],
}

impl StageRegistry {
    /// Builds the production registry of script-backed runners.
    pub fn from_config(config: &StagesConfig) -> Self {
        Self::build(|stage| {
            Arc::new(
                ScriptStage::new(stage, config.command(stage).clone())
                    .with_scripts_dir(&config.scripts_dir),
            ) as Arc<dyn StageRunner>
        })
    }

    /// Builds a registry from an arbitrary factory (used by tests).
    pub fn build(factory: impl Fn(Stage) -> Arc<dyn StageRunner>) -> Self {
        Self {
            runners: Stage::ALL.map(factory),
        }
    }

    pub fn get(&self, stage: Stage) -> &Arc<dyn StageRunner> {
        &self.runners[stage.index()]
    }
}

/// Drives eligible topics through the pipeline stages.
pub struct Launcher {
    config: LauncherConfig,
    store: Arc<dyn TopicStore>,
    registry: StageRegistry,
    layout: TopicLayout,
}

impl Launcher {
    pub fn new(
        config: LauncherConfig,
        store: Arc<dyn TopicStore>,
        registry: StageRegistry,
        layout: TopicLayout,
    ) -> Self {
        Self {
            config,
            store,
            registry,
            layout,
        }
    }

    /// Performs up to `runs` passes (default from config when `None`).
    ///
    /// A pass visits every stage in the configured range in pipeline order.
    /// With `stop_on_error` set, the run ends after the first pass that saw
    /// a stage failure. Passes that find no work sleep briefly before the
    /// next one so a long run does not spin on an empty queue.
    pub async fn run(&self, runs: Option<u32>) -> Result<RunReport, LauncherError> {
        if self.config.first_stage > self.config.last_stage {
            return Err(LauncherError::InvalidStageRange {
                first: self.config.first_stage,
                last: self.config.last_stage,
            });
        }

        let passes = runs.unwrap_or(self.config.runs_default);
        let mut report = RunReport::default();

        for pass in 0..passes {
            debug!(pass = pass + 1, total = passes, "Starting pass");
            let before = report.clone();

            for stage in self.config.stage_range() {
                self.run_stage(stage, &mut report).await?;
            }
            report.passes += 1;

            if self.config.stop_on_error && report.failed > before.failed {
                warn!("Stage failure with stop_on_error set, ending run early");
                break;
            }

            let pass_was_empty =
                report.attempted == before.attempted && report.conflicts == before.conflicts;
            if pass_was_empty && report.passes < passes && self.config.sleep_when_empty_ms > 0 {
                debug!(
                    sleep_ms = self.config.sleep_when_empty_ms,
                    "Pass found no work, sleeping"
                );
                tokio::time::sleep(std::time::Duration::from_millis(
                    self.config.sleep_when_empty_ms,
                ))
                .await;
            }
        }

        info!(
            passes = report.passes,
            attempted = report.attempted,
            succeeded = report.succeeded,
            failed = report.failed,
            conflicts = report.conflicts,
            "Launcher run finished"
        );
        Ok(report)
    }

    /// Runs one stage over its eligible topics, oldest first, up to the cap.
    async fn run_stage(&self, stage: Stage, report: &mut RunReport) -> Result<(), LauncherError> {
        let candidates = self.load_candidates(stage)?;
        let eligible = select_eligible(&candidates, stage, self.config.stage_cap);
        if eligible.is_empty() {
            return Ok(());
        }

        let ids: Vec<String> = eligible.iter().map(|t| t.id.clone()).collect();
        for id in ids {
            self.process_topic(&id, stage, report).await?;
        }
        Ok(())
    }

    /// Loads rows whose status allows a claim for `stage`, oldest first.
    fn load_candidates(&self, stage: Stage) -> Result<Vec<Topic>, LauncherError> {
        let mut candidates = self.store.list(
            &TopicFilter::new()
                .with_stage_status(stage, StageStatus::NotStarted)
                .with_limit(CANDIDATE_FETCH_LIMIT),
        )?;
        candidates.extend(self.store.list(
            &TopicFilter::new()
                .with_stage_status(stage, StageStatus::Failed)
                .with_limit(CANDIDATE_FETCH_LIMIT),
        )?);
        candidates.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
        Ok(candidates)
    }

    /// Claims one topic, runs the stage script and records the result.
    async fn process_topic(
        &self,
        topic_id: &str,
        stage: Stage,
        report: &mut RunReport,
    ) -> Result<(), LauncherError> {
        let claimed = match self.store.begin_stage(topic_id, stage) {
            Ok(topic) => topic,
            Err(TopicError::ClaimConflict { .. }) => {
                warn!(topic_id, stage = %stage, "Lost claim to a concurrent launcher, skipping");
                report.conflicts += 1;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        report.attempted += 1;

        info!(topic_id, stage = %stage, "Running stage");
        let runner = self.registry.get(stage);
        match runner.run(&claimed, &self.layout).await {
            Ok(outcome) => {
                self.store
                    .complete_stage(topic_id, stage, &outcome.output_path)?;
                info!(
                    topic_id,
                    stage = %stage,
                    duration_ms = outcome.duration_ms,
                    output = %outcome.output_path.display(),
                    "Stage done"
                );
                report.succeeded += 1;
            }
            Err(e) => {
                let message = e.to_string();
                self.store.fail_stage(topic_id, stage, &message)?;
                warn!(topic_id, stage = %stage, error = %message, "Stage failed");
                report.failed += 1;
            }
        }
        Ok(())
    }
}
