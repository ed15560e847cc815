pub mod config;
pub mod discovery;
pub mod gate;
pub mod launcher;
pub mod layout;
pub mod scheduler;
pub mod stage;
pub mod testing;
pub mod topic;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, DatabaseConfig,
    GenerationConfig, OutputConfig,
};
pub use discovery::{
    CategoryConfig, DiscoveredTopic, Discovery, DiscoveryConfig, DiscoveryError, DiscoverySummary,
};
pub use gate::select_eligible;
pub use launcher::{Launcher, LauncherConfig, LauncherError, RunReport, StageRegistry};
pub use layout::TopicLayout;
pub use scheduler::{ScheduleError, Scheduler, SchedulerConfig, ScheduleSummary};
pub use stage::{ScriptStage, StageCommand, StageError, StageOutcome, StageRunner, StagesConfig};
pub use topic::{
    NewTopic, SqliteTopicStore, Stage, StageStatus, Topic, TopicError, TopicFilter, TopicStore,
};
