//! Upload scheduling.
//!
//! Picks fully assembled topics, computes a staggered publication time for
//! each and hands them to the upload script. Scheduling spreads uploads out
//! so a batch does not publish all at once.

pub mod config;
pub mod runner;
pub mod types;

pub use config::SchedulerConfig;
pub use runner::Scheduler;
pub use types::{ScheduleError, ScheduleSummary};
