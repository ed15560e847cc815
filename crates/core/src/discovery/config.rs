//! Discovery configuration.

use serde::{Deserialize, Serialize};

use crate::stage::StageCommand;

/// One scrape source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryConfig {
    /// Category name, passed to the script and used for CLI selection.
    pub name: String,

    /// Script invocation for this category.
    #[serde(flatten)]
    pub command: StageCommand,
}

/// Discovery configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Configured scrape sources.
    pub categories: Vec<CategoryConfig>,
}

impl DiscoveryConfig {
    pub fn category(&self, name: &str) -> Option<&CategoryConfig> {
        self.categories.iter().find(|c| c.name == name)
    }
}
