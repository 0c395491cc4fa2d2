use crate::config::types::{Config, CrawlerConfig, PoolConfig, RetryConfig, TargetConfig};
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_retry_config(&config.retry)?;
    validate_pool_config(&config.pool)?;
    validate_target_config(&config.targets)?;
    Ok(())
}

fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.program.trim().is_empty() {
        return Err(ConfigError::Validation(
            "crawler program cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates attempt budgets
fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    let budgets = [
        ("blank_attempts", config.blank_attempts),
        ("specific_attempts", config.specific_attempts),
        ("control_target", config.control_target),
        ("control_attempts", config.control_attempts),
        ("max_consecutive_failures", config.max_consecutive_failures),
        ("survey_attempts", config.survey_attempts),
        ("survey_control_attempts", config.survey_control_attempts),
    ];

    for (name, value) in budgets {
        if value < 1 {
            return Err(ConfigError::Validation(format!(
                "{} must be >= 1, got {}",
                name, value
            )));
        }
    }

    if config.control_target > config.control_attempts {
        return Err(ConfigError::Validation(format!(
            "control_target ({}) cannot exceed control_attempts ({})",
            config.control_target, config.control_attempts
        )));
    }

    if config.control_target > config.survey_control_attempts {
        return Err(ConfigError::Validation(format!(
            "control_target ({}) cannot exceed survey_control_attempts ({})",
            config.control_target, config.survey_control_attempts
        )));
    }

    Ok(())
}

fn validate_pool_config(config: &PoolConfig) -> Result<(), ConfigError> {
    if config.parallelism < 1 || config.parallelism > 64 {
        return Err(ConfigError::Validation(format!(
            "parallelism must be between 1 and 64, got {}",
            config.parallelism
        )));
    }

    Ok(())
}

fn validate_target_config(config: &TargetConfig) -> Result<(), ConfigError> {
    if config.test.as_os_str().is_empty() || config.all.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "target site lists cannot be empty paths".to_string(),
        ));
    }

    Ok(())
}
