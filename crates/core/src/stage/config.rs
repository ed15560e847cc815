//! Stage runner configuration.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::topic::Stage;

/// How to invoke one stage's script.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StageCommand {
    /// Program to execute.
    pub program: String,

    /// Arguments passed to the program, before the standard environment.
    pub args: Vec<String>,

    /// Hard wall-clock limit for one invocation.
    pub timeout_secs: u64,

    /// Extra environment variables for this stage only.
    pub env: BTreeMap<String, String>,
}

impl Default for StageCommand {
    fn default() -> Self {
        Self {
            program: "python3".to_string(),
            args: Vec::new(),
            timeout_secs: default_timeout_secs(),
            env: BTreeMap::new(),
        }
    }
}

impl StageCommand {
    /// Standard invocation of a script by name.
    pub fn script(name: &str) -> Self {
        Self {
            args: vec![name.to_string()],
            ..Self::default()
        }
    }
}

fn default_timeout_secs() -> u64 {
    3600
}

/// Per-stage script configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StagesConfig {
    /// Working directory the stage programs run in.
    pub scripts_dir: PathBuf,

    pub fetch: StageCommand,
    pub image: StageCommand,
    pub audio: StageCommand,
    pub preview: StageCommand,
    pub assemble: StageCommand,
}

impl Default for StagesConfig {
    fn default() -> Self {
        Self {
            scripts_dir: PathBuf::from("scripts"),
            fetch: StageCommand::script("fetch_data.py"),
            image: StageCommand::script("make_images.py"),
            audio: StageCommand::script("make_audio.py"),
            preview: StageCommand::script("make_preview.py"),
            assemble: StageCommand::script("assemble_video.py"),
        }
    }
}

impl StagesConfig {
    pub fn command(&self, stage: Stage) -> &StageCommand {
        match stage {
            Stage::Fetch => &self.fetch,
            Stage::Image => &self.image,
            Stage::Audio => &self.audio,
            Stage::Preview => &self.preview,
            Stage::Assemble => &self.assemble,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StagesConfig::default();
        assert_eq!(config.scripts_dir, PathBuf::from("scripts"));
        assert_eq!(config.fetch.program, "python3");
        assert_eq!(config.fetch.args, vec!["fetch_data.py"]);
        assert_eq!(config.assemble.args, vec!["assemble_video.py"]);
        assert_eq!(config.fetch.timeout_secs, 3600);
    }

    #[test]
    fn test_partial_toml_override() {
        let config: StagesConfig = toml::from_str(
            r#"
            scripts_dir = "/opt/pipeline"

            [image]
            program = "python3"
            args = ["make_images.py", "--engine", "local"]
            timeout_secs = 7200
            "#,
        )
        .unwrap();

        assert_eq!(config.scripts_dir, PathBuf::from("/opt/pipeline"));
        assert_eq!(config.image.timeout_secs, 7200);
        assert_eq!(config.image.args.len(), 3);
        // Unmentioned stages keep defaults.
        assert_eq!(config.audio.args, vec!["make_audio.py"]);
    }
}
