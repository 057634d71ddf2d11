use crate::config::types::{Config, HarvesterConfig, MarkerConfig, OutputConfig, SourceConfig};
use crate::harvester::compile_xpath;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_harvester_config(&config.harvester)?;
    validate_source_config(&config.source)?;
    validate_marker_config(&config.markers)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates harvester limits
fn validate_harvester_config(config: &HarvesterConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    if config.max_posts < 1 {
        return Err(ConfigError::Validation(format!(
            "max_posts must be >= 1, got {}",
            config.max_posts
        )));
    }

    // max_comments = 0 is allowed and disables thread harvesting

    Ok(())
}

/// Validates the front-end source configuration
fn validate_source_config(config: &SourceConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::Validation(format!(
            "base_url '{}' must use http or https",
            config.base_url
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates that every marker is present and the end-of-feed XPath compiles
fn validate_marker_config(config: &MarkerConfig) -> Result<(), ConfigError> {
    let markers = [
        ("timeline_item_class", &config.timeline_item_class),
        ("reply_class", &config.reply_class),
        ("thread_root_class", &config.thread_root_class),
        ("error_panel_class", &config.error_panel_class),
        ("empty_class", &config.empty_class),
        ("load_more_text", &config.load_more_text),
        ("end_of_feed_xpath", &config.end_of_feed_xpath),
        ("rate_limit_text", &config.rate_limit_text),
    ];

    for (name, value) in markers {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    compile_xpath(&config.end_of_feed_xpath)
        .map_err(|e| ConfigError::Validation(format!("end_of_feed_xpath: {}", e)))?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.diagnostics_dir.is_empty() {
        return Err(ConfigError::Validation(
            "diagnostics_dir cannot be empty".to_string(),
        ));
    }

    if config.max_document_bytes == 0 {
        return Err(ConfigError::Validation(
            "max_document_bytes must be > 0".to_string(),
        ));
    }

    Ok(())
}
