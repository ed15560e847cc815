//! Script-backed stage runner.

use std::collections::VecDeque;
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::debug;

use crate::layout::TopicLayout;
use crate::topic::{Stage, Topic};

use super::config::StageCommand;
use super::error::StageError;
use super::traits::{StageOutcome, StageRunner};

/// Environment variables every stage script receives.
const ENV_TOPIC_ID: &str = "TOPICREEL_TOPIC_ID";
const ENV_TOPIC_DIR: &str = "TOPICREEL_TOPIC_DIR";
const ENV_STAGE: &str = "TOPICREEL_STAGE";
const ENV_STAGE_DIR: &str = "TOPICREEL_STAGE_DIR";

/// Number of trailing stderr lines kept for error reporting.
const STDERR_TAIL_LINES: usize = 20;

/// Runs one pipeline stage by shelling out to an external script.
///
/// The script gets the topic id, the topic directory and its own stage
/// subdirectory through the environment, writes its artifacts into the stage
/// subdirectory and signals failure with a non-zero exit code.
pub struct ScriptStage {
    stage: Stage,
    command: StageCommand,
    scripts_dir: Option<std::path::PathBuf>,
}

impl ScriptStage {
    pub fn new(stage: Stage, command: StageCommand) -> Self {
        Self {
            stage,
            command,
            scripts_dir: None,
        }
    }

    /// Sets the working directory the script runs in.
    pub fn with_scripts_dir(mut self, dir: impl Into<std::path::PathBuf>) -> Self {
        self.scripts_dir = Some(dir.into());
        self
    }

    fn dir_has_entries(dir: &std::path::Path) -> bool {
        std::fs::read_dir(dir)
            .map(|mut entries| entries.next().is_some())
            .unwrap_or(false)
    }
}

#[async_trait]
impl StageRunner for ScriptStage {
    fn name(&self) -> &str {
        self.stage.as_str()
    }

    async fn run(&self, topic: &Topic, layout: &TopicLayout) -> Result<StageOutcome, StageError> {
        let start = Instant::now();

        let topic_dir = layout.topic_dir(&topic.id);
        let stage_dir = layout.ensure_stage_dir(&topic.id, self.stage)?;

        let mut cmd = Command::new(&self.command.program);
        cmd.args(&self.command.args)
            .env(ENV_TOPIC_ID, &topic.id)
            .env(ENV_TOPIC_DIR, &topic_dir)
            .env(ENV_STAGE, self.stage.as_str())
            .env(ENV_STAGE_DIR, &stage_dir)
            .envs(&self.command.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(ref dir) = self.scripts_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StageError::ProgramNotFound {
                    program: self.command.program.clone(),
                }
            } else {
                StageError::Io(e)
            }
        })?;

        let stdout = child.stdout.take().expect("stdout should be captured");
        let stderr = child.stderr.take().expect("stderr should be captured");

        let stage = self.stage;
        let topic_id = topic.id.clone();
        let stderr_task = tokio::spawn(async move {
            let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(stage = %stage, topic_id = %topic_id, "stderr: {}", line);
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
            tail
        });

        let timeout_duration = Duration::from_secs(self.command.timeout_secs);
        let result = timeout(timeout_duration, async {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(stage = %self.stage, topic_id = %topic.id, "{}", line);
            }
            child.wait().await
        })
        .await;

        let status = match result {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => return Err(StageError::Io(e)),
            Err(_) => {
                let _ = child.kill().await;
                return Err(StageError::Timeout {
                    stage: self.stage,
                    timeout_secs: self.command.timeout_secs,
                });
            }
        };

        let stderr_tail = stderr_task.await.unwrap_or_default();

        if !status.success() {
            return Err(StageError::NonZeroExit {
                stage: self.stage,
                code: status.code(),
                stderr_tail: stderr_tail.into_iter().collect::<Vec<_>>().join("\n"),
            });
        }

        // A stage that wrote nothing is a failure even on exit code zero.
        if !Self::dir_has_entries(&stage_dir) {
            return Err(StageError::MissingArtifact {
                stage: self.stage,
                path: stage_dir,
            });
        }

        Ok(StageOutcome {
            output_path: stage_dir,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}
