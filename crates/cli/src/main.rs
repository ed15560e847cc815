use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sha2::{Digest, Sha256};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use topicreel_core::{
    load_config, validate_config, Config, Discovery, Launcher, Scheduler, SqliteTopicStore, Stage,
    StageRegistry, StageStatus, TopicFilter, TopicLayout, TopicStore,
};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "topicreel", version = VERSION, about = "Stage-gated content production pipeline")]
struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true, env = "TOPICREEL_CONFIG", default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run launcher passes over the pipeline stages
    Run {
        /// Number of passes (defaults to launcher.runs_default)
        #[arg(long)]
        runs: Option<u32>,

        /// First stage to visit (fetch, image, audio, preview, assemble)
        #[arg(long)]
        first_stage: Option<String>,

        /// Last stage to visit
        #[arg(long)]
        last_stage: Option<String>,

        /// Abort the run after the first stage failure
        #[arg(long)]
        stop_on_error: bool,
    },

    /// Scrape the configured sources and insert new topics
    BuildList {
        /// Only scrape one category
        #[arg(long)]
        category: Option<String>,
    },

    /// Hand finished topics to the upload script with staggered publish times
    Schedule {
        /// Maximum topics to schedule (defaults to scheduler.limit)
        #[arg(long)]
        limit: Option<i64>,
    },

    /// Show queue status
    Status {
        /// Show one topic as JSON instead of the summary
        #[arg(long)]
        id: Option<String>,
    },

    /// Put a failed stage back to not started
    Reset {
        /// Topic id
        #[arg(long)]
        id: String,

        /// Stage to reset (fetch, image, audio, preview, assemble)
        #[arg(long)]
        stage: String,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    info!("Loading configuration from {:?}", cli.config);
    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load config from {:?}", cli.config))?;
    validate_config(&config).context("Configuration validation failed")?;

    // Config hash ties a run in the logs to the exact configuration.
    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!(
        version = VERSION,
        config_hash = &config_hash[..16],
        database = %config.database.path.display(),
        "Configuration loaded"
    );

    let store: Arc<dyn TopicStore> = Arc::new(
        SqliteTopicStore::open(&config.database).context("Failed to open topic store")?,
    );
    let layout = TopicLayout::new(&config.output.root);

    match cli.command {
        Command::Run {
            runs,
            first_stage,
            last_stage,
            stop_on_error,
        } => cmd_run(config, store, layout, runs, first_stage, last_stage, stop_on_error).await,
        Command::BuildList { category } => cmd_build_list(config, store, category).await,
        Command::Schedule { limit } => cmd_schedule(config, store, layout, limit).await,
        Command::Status { id } => cmd_status(store, id),
        Command::Reset { id, stage } => cmd_reset(store, &id, &stage),
    }
}

#[allow(clippy::too_many_arguments)]
async fn cmd_run(
    config: Config,
    store: Arc<dyn TopicStore>,
    layout: TopicLayout,
    runs: Option<u32>,
    first_stage: Option<String>,
    last_stage: Option<String>,
    stop_on_error: bool,
) -> Result<()> {
    let mut launcher_config = config.launcher.clone();
    if let Some(stage) = first_stage {
        launcher_config.first_stage = stage.parse::<Stage>().map_err(anyhow::Error::msg)?;
    }
    if let Some(stage) = last_stage {
        launcher_config.last_stage = stage.parse::<Stage>().map_err(anyhow::Error::msg)?;
    }
    if stop_on_error {
        launcher_config.stop_on_error = true;
    }

    // Runners are resolved once here; a bad script path fails the whole run
    // up front instead of mid-pass.
    let registry = StageRegistry::from_config(&config.stages_with_generation_env());
    let launcher = Launcher::new(launcher_config, store, registry, layout);

    let report = launcher.run(runs).await.context("Launcher run failed")?;
    println!(
        "passes: {}  attempted: {}  succeeded: {}  failed: {}  conflicts: {}",
        report.passes, report.attempted, report.succeeded, report.failed, report.conflicts
    );
    Ok(())
}

async fn cmd_build_list(
    config: Config,
    store: Arc<dyn TopicStore>,
    category: Option<String>,
) -> Result<()> {
    let discovery = Discovery::new(config.discovery.clone(), store);
    let summary = discovery
        .build_list(category.as_deref())
        .await
        .context("Build-list failed")?;

    println!(
        "discovered: {}  inserted: {}  duplicates: {}  malformed: {}",
        summary.discovered, summary.inserted, summary.duplicates, summary.malformed
    );
    if !summary.failed_categories.is_empty() {
        println!("failed categories: {}", summary.failed_categories.join(", "));
    }
    Ok(())
}

async fn cmd_schedule(
    config: Config,
    store: Arc<dyn TopicStore>,
    layout: TopicLayout,
    limit: Option<i64>,
) -> Result<()> {
    let mut scheduler_config = config.scheduler.clone();
    if let Some(limit) = limit {
        scheduler_config.limit = limit;
    }

    let scheduler = Scheduler::new(scheduler_config, store, layout);
    let summary = scheduler.schedule().await.context("Scheduling failed")?;

    println!(
        "candidates: {}  scheduled: {}  failed: {}",
        summary.candidates, summary.scheduled, summary.failed
    );
    Ok(())
}

fn cmd_status(store: Arc<dyn TopicStore>, id: Option<String>) -> Result<()> {
    if let Some(id) = id {
        let topic = store
            .get(&id)?
            .with_context(|| format!("No topic with id {}", id))?;
        println!("{}", serde_json::to_string_pretty(&topic)?);
        return Ok(());
    }

    let total = store.count(&TopicFilter::new())?;
    println!("topics: {}", total);
    println!(
        "{:<10} {:>12} {:>12} {:>8} {:>8}",
        "stage", "not_started", "in_progress", "done", "failed"
    );
    for stage in Stage::ALL {
        let count_for = |status: StageStatus| -> Result<i64> {
            Ok(store.count(&TopicFilter::new().with_stage_status(stage, status))?)
        };
        println!(
            "{:<10} {:>12} {:>12} {:>8} {:>8}",
            stage.to_string(),
            count_for(StageStatus::NotStarted)?,
            count_for(StageStatus::InProgress)?,
            count_for(StageStatus::Done)?,
            count_for(StageStatus::Failed)?,
        );
    }

    let ready = store.list_ready_for_upload(i64::MAX)?;
    println!("ready for upload: {}", ready.len());
    Ok(())
}

fn cmd_reset(store: Arc<dyn TopicStore>, id: &str, stage: &str) -> Result<()> {
    let stage = stage.parse::<Stage>().map_err(anyhow::Error::msg)?;
    let topic = store.reset_stage(id, stage)?;
    println!(
        "topic {} stage {} reset to {}",
        topic.id,
        stage,
        topic.status(stage)
    );
    Ok(())
}
