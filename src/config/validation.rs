use crate::config::types::{Config, CrawlMode, CrawlerConfig, RetryConfig, TargetConfig};
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_retry_config(&config.retry)?;
    validate_output_config(&config.output)?;
    validate_targets(&config.targets)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.page_size < 1 {
        return Err(ConfigError::Validation(format!(
            "page_size must be >= 1, got {}",
            config.page_size
        )));
    }

    if config.start_page < 1 {
        return Err(ConfigError::Validation(format!(
            "start_page must be >= 1 (pages are 1-based), got {}",
            config.start_page
        )));
    }

    if config.concurrency < 1 || config.concurrency > 100 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 100, got {}",
            config.concurrency
        )));
    }

    // The batch engine fetches everything in parallel, so there is no
    // "consecutive" ordering for an early-stop run to count over.
    if config.mode == CrawlMode::Batch && config.early_stop_threshold.is_some() {
        return Err(ConfigError::Validation(
            "early-stop-threshold requires sequential mode".to_string(),
        ));
    }

    if config.early_stop_threshold == Some(0) {
        return Err(ConfigError::Validation(
            "early-stop-threshold must be >= 1 when set (omit it to disable)".to_string(),
        ));
    }

    Ok(())
}

/// Validates retry configuration
fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    if config.initial_error_wait_ms == 0 {
        return Err(ConfigError::Validation(
            "initial_error_wait_ms must be > 0".to_string(),
        ));
    }

    if config.page_retry_wait_ms == 0 {
        return Err(ConfigError::Validation(
            "page_retry_wait_ms must be > 0".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &crate::config::types::OutputConfig) -> Result<(), ConfigError> {
    if config.root_dir.is_empty() {
        return Err(ConfigError::Validation(
            "root_dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates target entries
fn validate_targets(targets: &[TargetConfig]) -> Result<(), ConfigError> {
    if targets.is_empty() {
        return Err(ConfigError::Validation(
            "at least one [[target]] is required".to_string(),
        ));
    }

    let mut seen_names = HashSet::new();

    for target in targets {
        validate_target_name(&target.name)?;

        // Target names double as output subdirectories; duplicates would
        // silently interleave two registries in one document set.
        if !seen_names.insert(target.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate target name '{}'",
                target.name
            )));
        }

        validate_base_url(&target.name, &target.base_url)?;
    }

    Ok(())
}

/// Validates a target name: non-empty, filesystem-safe
fn validate_target_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::Validation(
            "target name cannot be empty".to_string(),
        ));
    }

    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "target name must contain only alphanumeric characters, hyphens and underscores, got '{}'",
            name
        )));
    }

    Ok(())
}

/// Validates a target base URL
fn validate_base_url(name: &str, base_url: &str) -> Result<(), ConfigError> {
    let url = Url::parse(base_url).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid base-url for target '{}': {}", name, e))
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "base-url for target '{}' must use http or https, got '{}'",
            name,
            url.scheme()
        )));
    }

    // Relative references are joined onto the base URL; without a trailing
    // slash the last path segment would be replaced instead of extended.
    if !url.path().ends_with('/') {
        return Err(ConfigError::Validation(format!(
            "base-url for target '{}' must end with '/', got '{}'",
            name, base_url
        )));
    }

    Ok(())
}
