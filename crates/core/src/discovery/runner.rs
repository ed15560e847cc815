//! Discovery runner.

use std::process::Stdio;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::{debug, error, info, warn};

use crate::topic::{NewTopic, TopicStore};

use super::config::{CategoryConfig, DiscoveryConfig};
use super::types::{DiscoveredTopic, DiscoveryError, DiscoverySummary};

/// Environment variable telling the scraper which category it serves.
const ENV_CATEGORY: &str = "TOPICREEL_CATEGORY";

/// Runs the configured scraper scripts and inserts what they find.
pub struct Discovery {
    config: DiscoveryConfig,
    store: Arc<dyn TopicStore>,
}

impl Discovery {
    pub fn new(config: DiscoveryConfig, store: Arc<dyn TopicStore>) -> Self {
        Self { config, store }
    }

    /// Builds the topic list for one category, or for every configured
    /// category when `category` is `None`.
    ///
    /// A category whose script fails is recorded in the summary and does not
    /// stop the remaining categories.
    pub async fn build_list(
        &self,
        category: Option<&str>,
    ) -> Result<DiscoverySummary, DiscoveryError> {
        if self.config.categories.is_empty() {
            return Err(DiscoveryError::NoCategories);
        }

        let selected: Vec<&CategoryConfig> = match category {
            Some(name) => vec![self
                .config
                .category(name)
                .ok_or_else(|| DiscoveryError::UnknownCategory(name.to_string()))?],
            None => self.config.categories.iter().collect(),
        };

        let mut summary = DiscoverySummary::default();
        for category in selected {
            match self.scrape_category(category, &mut summary).await {
                Ok(()) => {}
                Err(DiscoveryError::Store(e)) => return Err(e.into()),
                Err(e) => {
                    error!(category = %category.name, error = %e, "Scraper failed");
                    summary.failed_categories.push(category.name.clone());
                }
            }
        }

        info!(
            discovered = summary.discovered,
            inserted = summary.inserted,
            duplicates = summary.duplicates,
            malformed = summary.malformed,
            "Build-list finished"
        );
        Ok(summary)
    }

    async fn scrape_category(
        &self,
        category: &CategoryConfig,
        summary: &mut DiscoverySummary,
    ) -> Result<(), DiscoveryError> {
        info!(category = %category.name, "Scraping");

        let mut child = Command::new(&category.command.program)
            .args(&category.command.args)
            .env(ENV_CATEGORY, &category.name)
            .envs(&category.command.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    DiscoveryError::ProgramNotFound {
                        program: category.command.program.clone(),
                    }
                } else {
                    DiscoveryError::Io(e)
                }
            })?;

        let stdout = child.stdout.take().expect("stdout should be captured");

        let timeout_duration = Duration::from_secs(category.command.timeout_secs);
        let result = timeout(timeout_duration, async {
            let mut lines = BufReader::new(stdout).lines();
            let mut parsed = Vec::new();
            let mut malformed = 0usize;
            while let Ok(Some(line)) = lines.next_line().await {
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<DiscoveredTopic>(&line) {
                    Ok(topic) => parsed.push(topic),
                    Err(e) => {
                        warn!(category = %category.name, error = %e, "Skipping malformed line");
                        malformed += 1;
                    }
                }
            }
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((status, parsed, malformed))
        })
        .await;

        let (status, parsed, malformed) = match result {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(DiscoveryError::Io(e)),
            Err(_) => {
                let _ = child.kill().await;
                return Err(DiscoveryError::Io(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!(
                        "scraper timed out after {} seconds",
                        category.command.timeout_secs
                    ),
                )));
            }
        };

        if !status.success() {
            return Err(DiscoveryError::Io(std::io::Error::other(format!(
                "scraper exited with code {:?}",
                status.code()
            ))));
        }

        summary.discovered += parsed.len();
        summary.malformed += malformed;

        for discovered in parsed {
            let new_topic = NewTopic::new(discovered.id.clone(), discovered.title)
                .with_metadata(discovered.metadata);
            if self.store.insert(new_topic)? {
                debug!(category = %category.name, topic_id = %discovered.id, "Inserted topic");
                summary.inserted += 1;
            } else {
                debug!(category = %category.name, topic_id = %discovered.id, "Duplicate, skipped");
                summary.duplicates += 1;
            }
        }
        Ok(())
    }
}
