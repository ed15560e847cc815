//! Topic queue: persisted rows tracking one piece of source content and its
//! progress through the production pipeline.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteTopicStore;
pub use store::{NewTopic, TopicError, TopicFilter, TopicStore};
pub use types::{Stage, StageProgress, StageStates, StageStatus, Topic};
