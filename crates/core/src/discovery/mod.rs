//! Topic discovery.
//!
//! Builds the topic list by running one scraper script per category. Each
//! script prints one JSON object per line on stdout (`{"id", "title",
//! "metadata"}`); discovered topics are inserted as fresh rows and ids seen
//! before are skipped.

pub mod config;
pub mod runner;
pub mod types;

pub use config::{CategoryConfig, DiscoveryConfig};
pub use runner::Discovery;
pub use types::{DiscoveredTopic, DiscoveryError, DiscoverySummary};
