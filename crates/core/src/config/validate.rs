use regex_lite::Regex;

use super::{types::Config, ConfigError};

const SYNCHRONOUS_MODES: [&str; 4] = ["OFF", "NORMAL", "FULL", "EXTRA"];

/// Validate configuration
/// Currently validates:
/// - database table name is a plain identifier
/// - database synchronous mode is a known value
/// - launcher caps and stage range are sane
/// - scheduler limits and stage timeouts are positive
/// - discovery category names are non-empty and unique
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Database validation
    let ident = Regex::new("^[A-Za-z_][A-Za-z0-9_]*$").expect("static regex");
    if !ident.is_match(&config.database.table) {
        return Err(ConfigError::ValidationError(format!(
            "database.table is not a valid identifier: {}",
            config.database.table
        )));
    }
    if !SYNCHRONOUS_MODES.contains(&config.database.synchronous.to_uppercase().as_str()) {
        return Err(ConfigError::ValidationError(format!(
            "database.synchronous must be one of OFF, NORMAL, FULL, EXTRA, got {}",
            config.database.synchronous
        )));
    }

    // Launcher validation
    if config.launcher.stage_cap == 0 {
        return Err(ConfigError::ValidationError(
            "launcher.stage_cap cannot be 0".to_string(),
        ));
    }
    if config.launcher.first_stage > config.launcher.last_stage {
        return Err(ConfigError::ValidationError(format!(
            "launcher.first_stage {} comes after launcher.last_stage {}",
            config.launcher.first_stage, config.launcher.last_stage
        )));
    }

    // Stage validation
    for stage in crate::topic::Stage::ALL {
        let command = config.stages.command(stage);
        if command.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(format!(
                "stages.{}.timeout_secs cannot be 0",
                stage
            )));
        }
        if command.program.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "stages.{}.program cannot be empty",
                stage
            )));
        }
    }

    // Scheduler validation
    if config.scheduler.limit <= 0 {
        return Err(ConfigError::ValidationError(
            "scheduler.limit must be positive".to_string(),
        ));
    }
    if config.scheduler.start_delay_min < 0 || config.scheduler.interval_min < 0 {
        return Err(ConfigError::ValidationError(
            "scheduler delays cannot be negative".to_string(),
        ));
    }

    // Discovery validation
    let mut seen = std::collections::HashSet::new();
    for category in &config.discovery.categories {
        if category.name.is_empty() {
            return Err(ConfigError::ValidationError(
                "discovery category name cannot be empty".to_string(),
            ));
        }
        if !seen.insert(category.name.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "duplicate discovery category: {}",
                category.name
            )));
        }
    }

    Ok(())
}
