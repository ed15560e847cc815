//! On-disk layout of per-topic working directories.
//!
//! Every topic owns one directory under the output root, with a fixed
//! subdirectory per stage. Stage runners receive the topic directory and
//! write their artifacts into their own subdirectory.

use std::io;
use std::path::{Path, PathBuf};

use crate::topic::Stage;

/// Resolves per-topic paths under a configured output root.
#[derive(Debug, Clone)]
pub struct TopicLayout {
    root: PathBuf,
}

impl TopicLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory owned by one topic.
    pub fn topic_dir(&self, topic_id: &str) -> PathBuf {
        self.root.join(topic_id)
    }

    /// Subdirectory a stage writes its artifacts into.
    pub fn stage_dir(&self, topic_id: &str, stage: Stage) -> PathBuf {
        self.topic_dir(topic_id).join(Self::stage_subdir(stage))
    }

    /// Fixed per-stage subdirectory name.
    pub fn stage_subdir(stage: Stage) -> &'static str {
        match stage {
            Stage::Fetch => "data",
            Stage::Image => "images",
            Stage::Audio => "audio",
            Stage::Preview => "preview",
            Stage::Assemble => "movie",
        }
    }

    /// Creates the topic directory and the stage subdirectory, returning the
    /// stage subdirectory path.
    pub fn ensure_stage_dir(&self, topic_id: &str, stage: Stage) -> io::Result<PathBuf> {
        let dir = self.stage_dir(topic_id, stage);
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let layout = TopicLayout::new("/srv/out");
        assert_eq!(layout.topic_dir("t-1"), PathBuf::from("/srv/out/t-1"));
        assert_eq!(
            layout.stage_dir("t-1", Stage::Assemble),
            PathBuf::from("/srv/out/t-1/movie")
        );
    }

    #[test]
    fn test_subdir_names_are_distinct() {
        let mut names: Vec<_> = Stage::ALL.iter().map(|s| TopicLayout::stage_subdir(*s)).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), Stage::ALL.len());
    }

    #[test]
    fn test_ensure_stage_dir_creates_tree() {
        let dir = tempfile::tempdir().unwrap();
        let layout = TopicLayout::new(dir.path());

        let created = layout.ensure_stage_dir("t-1", Stage::Image).unwrap();
        assert!(created.is_dir());
        assert!(created.ends_with("t-1/images"));

        // Idempotent.
        layout.ensure_stage_dir("t-1", Stage::Image).unwrap();
    }
}
