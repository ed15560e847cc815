//! Scheduler implementation.

use std::process::Stdio;
use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::{info, warn};

use crate::layout::TopicLayout;
use crate::topic::{Stage, Topic, TopicStore};

use super::config::SchedulerConfig;
use super::types::{ScheduleError, ScheduleSummary};

const ENV_TOPIC_ID: &str = "TOPICREEL_TOPIC_ID";
const ENV_TOPIC_DIR: &str = "TOPICREEL_TOPIC_DIR";
const ENV_MOVIE_PATH: &str = "TOPICREEL_MOVIE_PATH";
const ENV_TITLE: &str = "TOPICREEL_TITLE";
const ENV_PUBLISH_AT: &str = "TOPICREEL_PUBLISH_AT";

/// Schedules finished topics for upload.
pub struct Scheduler {
    config: SchedulerConfig,
    store: Arc<dyn TopicStore>,
    layout: TopicLayout,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig, store: Arc<dyn TopicStore>, layout: TopicLayout) -> Self {
        Self {
            config,
            store,
            layout,
        }
    }

    /// Schedules up to the configured limit of ready topics.
    ///
    /// Publication slots are computed once from the current time: the first
    /// slot is `start_delay_min` minutes out, each later one another
    /// `interval_min` minutes after the previous. A failed upload leaves the
    /// row untouched so the next run retries it; later topics still run.
    pub async fn schedule(&self) -> Result<ScheduleSummary, ScheduleError> {
        let ready = self.store.list_ready_for_upload(self.config.limit)?;
        let mut summary = ScheduleSummary {
            candidates: ready.len(),
            ..ScheduleSummary::default()
        };
        if ready.is_empty() {
            info!("No topics ready for upload");
            return Ok(summary);
        }

        let base = Utc::now() + ChronoDuration::minutes(self.config.start_delay_min);
        for (idx, topic) in ready.iter().enumerate() {
            let publish_at = base + ChronoDuration::minutes(idx as i64 * self.config.interval_min);
            match self.upload_one(topic, publish_at).await {
                Ok(()) => {
                    self.store.mark_uploaded(&topic.id, publish_at)?;
                    info!(
                        topic_id = %topic.id,
                        publish_at = %publish_at.to_rfc3339(),
                        "Scheduled upload"
                    );
                    summary.scheduled += 1;
                }
                Err(e @ ScheduleError::ProgramNotFound { .. }) => return Err(e),
                Err(e) => {
                    warn!(topic_id = %topic.id, error = %e, "Upload failed, will retry");
                    summary.failed += 1;
                }
            }
        }
        Ok(summary)
    }

    async fn upload_one(
        &self,
        topic: &Topic,
        publish_at: DateTime<Utc>,
    ) -> Result<(), ScheduleError> {
        // list_ready_for_upload only returns fully assembled rows.
        let movie_path = topic
            .output_path(Stage::Assemble)
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| self.layout.stage_dir(&topic.id, Stage::Assemble));

        let command = &self.config.upload;
        let child = Command::new(&command.program)
            .args(&command.args)
            .env(ENV_TOPIC_ID, &topic.id)
            .env(ENV_TOPIC_DIR, self.layout.topic_dir(&topic.id))
            .env(ENV_MOVIE_PATH, &movie_path)
            .env(ENV_TITLE, &topic.title)
            .env(ENV_PUBLISH_AT, publish_at.to_rfc3339())
            .envs(&command.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ScheduleError::ProgramNotFound {
                        program: command.program.clone(),
                    }
                } else {
                    ScheduleError::Io(e)
                }
            })?;

        let timeout_duration = Duration::from_secs(command.timeout_secs);
        let output = match timeout(timeout_duration, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(ScheduleError::Io(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("upload timed out after {} seconds", command.timeout_secs),
                )));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ScheduleError::Io(std::io::Error::other(format!(
                "upload exited with code {:?}: {}",
                output.status.code(),
                stderr.trim()
            ))));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::StageCommand;
    use crate::topic::{NewTopic, SqliteTopicStore};
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    struct Harness {
        store: Arc<SqliteTopicStore>,
        dir: tempfile::TempDir,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                store: Arc::new(SqliteTopicStore::in_memory().unwrap()),
                dir: tempfile::tempdir().unwrap(),
            }
        }

        fn layout(&self) -> TopicLayout {
            TopicLayout::new(self.dir.path())
        }

        fn insert_finished(&self, id: &str) {
            self.store.insert(NewTopic::new(id, "title")).unwrap();
            for stage in Stage::ALL {
                self.store.begin_stage(id, stage).unwrap();
                let output = PathBuf::from(format!(
                    "/out/{}/{}",
                    id,
                    TopicLayout::stage_subdir(stage)
                ));
                self.store.complete_stage(id, stage, &output).unwrap();
            }
        }

        fn scheduler(&self, config: SchedulerConfig) -> Scheduler {
            Scheduler::new(config, self.store.clone(), self.layout())
        }
    }

    fn shell_upload(script: &str) -> StageCommand {
        StageCommand {
            program: "/bin/sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
            timeout_secs: 10,
            env: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn test_schedules_with_staggered_slots() {
        let h = Harness::new();
        h.insert_finished("t-0");
        h.insert_finished("t-1");

        let config = SchedulerConfig {
            limit: 10,
            start_delay_min: 2,
            interval_min: 10,
            upload: shell_upload("true"),
        };
        let before = Utc::now();
        let summary = h.scheduler(config).schedule().await.unwrap();

        assert_eq!(summary.candidates, 2);
        assert_eq!(summary.scheduled, 2);

        let first = h.store.get("t-0").unwrap().unwrap();
        let second = h.store.get("t-1").unwrap().unwrap();
        assert!(first.is_uploaded());
        assert!(second.is_uploaded());

        let first_at = first.publish_at.unwrap();
        let second_at = second.publish_at.unwrap();
        assert!(first_at >= before + ChronoDuration::minutes(2));
        assert_eq!(second_at - first_at, ChronoDuration::minutes(10));
    }

    #[tokio::test]
    async fn test_upload_script_gets_topic_environment() {
        let h = Harness::new();
        h.insert_finished("t-1");

        let capture = h.dir.path().join("captured.txt");
        let config = SchedulerConfig {
            upload: shell_upload(&format!(
                r#"echo "$TOPICREEL_TOPIC_ID|$TOPICREEL_PUBLISH_AT|$TOPICREEL_MOVIE_PATH" > {}"#,
                capture.display()
            )),
            ..SchedulerConfig::default()
        };
        h.scheduler(config).schedule().await.unwrap();

        let recorded = std::fs::read_to_string(&capture).unwrap();
        let fields: Vec<&str> = recorded.trim().split('|').collect();
        assert_eq!(fields[0], "t-1");
        assert!(fields[1].contains('T')); // RFC 3339 timestamp
        assert!(fields[2].ends_with("movie"));
    }

    #[tokio::test]
    async fn test_failed_upload_leaves_row_for_retry() {
        let h = Harness::new();
        h.insert_finished("t-0");
        h.insert_finished("t-1");

        let config = SchedulerConfig {
            limit: 10,
            upload: shell_upload(r#"[ "$TOPICREEL_TOPIC_ID" = "t-0" ] && exit 2; true"#),
            ..SchedulerConfig::default()
        };
        let summary = h.scheduler(config).schedule().await.unwrap();

        assert_eq!(summary.scheduled, 1);
        assert_eq!(summary.failed, 1);
        assert!(!h.store.get("t-0").unwrap().unwrap().is_uploaded());
        assert!(h.store.get("t-1").unwrap().unwrap().is_uploaded());

        // The failed topic is still ready on the next run.
        let ready = h.store.list_ready_for_upload(10).unwrap();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].id, "t-0");
    }

    #[tokio::test]
    async fn test_limit_respected() {
        let h = Harness::new();
        for i in 0..3 {
            h.insert_finished(&format!("t-{}", i));
        }

        let config = SchedulerConfig {
            limit: 2,
            upload: shell_upload("true"),
            ..SchedulerConfig::default()
        };
        let summary = h.scheduler(config).schedule().await.unwrap();
        assert_eq!(summary.candidates, 2);
        assert_eq!(summary.scheduled, 2);
    }

    #[tokio::test]
    async fn test_nothing_ready() {
        let h = Harness::new();
        h.store.insert(NewTopic::new("t-1", "title")).unwrap();

        let summary = h
            .scheduler(SchedulerConfig {
                upload: shell_upload("true"),
                ..SchedulerConfig::default()
            })
            .schedule()
            .await
            .unwrap();
        assert_eq!(summary, ScheduleSummary::default());
    }
}
