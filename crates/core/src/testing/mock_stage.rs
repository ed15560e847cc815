//! Mock stage runner that records calls and returns scripted results.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::layout::TopicLayout;
use crate::stage::{StageError, StageOutcome, StageRunner};
use crate::topic::{Stage, Topic};

/// Stage runner double. Succeeds by writing a marker file into the stage
/// directory, unless a failure was scripted for the topic id.
pub struct MockStage {
    stage: Stage,
    calls: Mutex<Vec<String>>,
    failures: Mutex<HashMap<String, String>>,
}

impl MockStage {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Scripts a failure for one topic id.
    pub fn fail_for(&self, topic_id: impl Into<String>, message: impl Into<String>) {
        self.failures
            .lock()
            .unwrap()
            .insert(topic_id.into(), message.into());
    }

    /// Removes a scripted failure so later calls succeed.
    pub fn clear_failure(&self, topic_id: &str) {
        self.failures.lock().unwrap().remove(topic_id);
    }

    /// Topic ids this runner was invoked with, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl StageRunner for MockStage {
    fn name(&self) -> &str {
        self.stage.as_str()
    }

    async fn run(&self, topic: &Topic, layout: &TopicLayout) -> Result<StageOutcome, StageError> {
        self.calls.lock().unwrap().push(topic.id.clone());

        if let Some(message) = self.failures.lock().unwrap().get(&topic.id) {
            return Err(StageError::NonZeroExit {
                stage: self.stage,
                code: Some(1),
                stderr_tail: message.clone(),
            });
        }

        let stage_dir = layout.ensure_stage_dir(&topic.id, self.stage)?;
        std::fs::write(stage_dir.join("artifact"), b"ok")?;

        Ok(StageOutcome {
            output_path: stage_dir,
            duration_ms: 0,
        })
    }
}
