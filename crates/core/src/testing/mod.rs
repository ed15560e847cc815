//! Test doubles shared across the crate's tests.

pub mod mock_stage;

pub use mock_stage::MockStage;
