//! Pipeline launcher.
//!
//! Drives topics through the stages in fixed order. Each run performs a
//! bounded number of passes; a pass visits every stage in the configured
//! range, claims eligible topics and executes their stage scripts.

pub mod config;
pub mod runner;
pub mod types;

pub use config::LauncherConfig;
pub use runner::{Launcher, StageRegistry};
pub use types::{LauncherError, RunReport};
