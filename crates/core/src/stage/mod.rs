//! Stage execution.
//!
//! Each pipeline stage is backed by an external script. The [`StageRunner`]
//! trait is the seam the launcher works against; [`ScriptStage`] is the
//! production implementation that shells out and streams script output into
//! the log.

pub mod config;
pub mod error;
pub mod script;
pub mod traits;

pub use config::{StageCommand, StagesConfig};
pub use error::StageError;
pub use script::ScriptStage;
pub use traits::{StageOutcome, StageRunner};
