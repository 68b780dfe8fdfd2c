use crate::config::types::{
    CollectorConfig, Config, CoordinatorConfig, OutputConfig, SelectorConfig, SiteConfig,
    UserAgentConfig,
};
use crate::ConfigError;
use scraper::Selector;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_selectors(&config.selectors)?;
    validate_collector_config(&config.collector)?;
    validate_coordinator_config(&config.coordinator)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    validate_countries(&config.countries)?;
    Ok(())
}

/// Validates the target site configuration
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    let base = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if base.scheme() != "http" && base.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url must use http or https, got '{}'",
            config.base_url
        )));
    }

    base.join(&config.search_path).map_err(|e| {
        ConfigError::InvalidUrl(format!(
            "search-path '{}' cannot be joined to base-url: {}",
            config.search_path, e
        ))
    })?;

    if config.entity_type.trim().is_empty() {
        return Err(ConfigError::Validation(
            "entity-type cannot be empty".to_string(),
        ));
    }

    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request-timeout-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates that every selector parses as CSS
fn validate_selectors(config: &SelectorConfig) -> Result<(), ConfigError> {
    for (name, selector) in config.named() {
        if selector.trim().is_empty() || Selector::parse(selector).is_err() {
            return Err(ConfigError::InvalidSelector {
                name: name.to_string(),
                selector: selector.to_string(),
            });
        }
    }
    Ok(())
}

/// Validates retry and delay settings
fn validate_collector_config(config: &CollectorConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 || config.max_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "max-attempts must be between 1 and 10, got {}",
            config.max_attempts
        )));
    }

    if config.ready_poll_ms == 0 {
        return Err(ConfigError::Validation(
            "ready-poll-ms must be >= 1".to_string(),
        ));
    }

    if config.ready_poll_ms > config.ready_timeout_ms {
        return Err(ConfigError::Validation(format!(
            "ready-poll-ms ({}) cannot exceed ready-timeout-ms ({})",
            config.ready_poll_ms, config.ready_timeout_ms
        )));
    }

    Ok(())
}

/// Validates worker pool settings
fn validate_coordinator_config(config: &CoordinatorConfig) -> Result<(), ConfigError> {
    if config.max_workers < 1 || config.max_workers > 100 {
        return Err(ConfigError::Validation(format!(
            "max-workers must be between 1 and 100, got {}",
            config.max_workers
        )));
    }
    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler-name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler-name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    if let Some(contact_url) = &config.contact_url {
        Url::parse(contact_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact-url: {}", e)))?;
    }

    if let Some(email) = &config.contact_email {
        validate_email(email)?;
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.dataset_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "dataset-path cannot be empty".to_string(),
        ));
    }

    if config.history_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "history-path cannot be empty".to_string(),
        ));
    }

    if config.dataset_path == config.history_path {
        return Err(ConfigError::Validation(
            "dataset-path and history-path must differ".to_string(),
        ));
    }

    Ok(())
}

/// Validates the explicit country list
fn validate_countries(countries: &[String]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for country in countries {
        if country.trim().is_empty() {
            return Err(ConfigError::Validation(
                "countries cannot contain blank entries".to_string(),
            ));
        }
        if !seen.insert(country.as_str()) {
            return Err(ConfigError::Validation(format!(
                "country '{}' is listed more than once",
                country
            )));
        }
    }
    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
