use crate::config::types::{Config, FetchConfig, RateConfig, UserAgentConfig};
use crate::{ConfigError, RateError};
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_rate_config(&config.rate)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_fetch_config(&config.fetch)?;
    Ok(())
}

/// Validates rate controller settings
///
/// Rejects anything that would let the limiter's rate leave a sane positive
/// range. Called by the controller on construction as well, so a hand-built
/// `RateConfig` gets the same checks as one loaded from a file.
pub fn validate_rate_config(config: &RateConfig) -> Result<(), RateError> {
    for (name, value) in [
        ("initial_rate", config.initial_rate),
        ("min_rate", config.min_rate),
        ("max_rate", config.max_rate),
    ] {
        validate_rate(name, value)?;
    }

    if config.min_rate > config.max_rate {
        return Err(RateError::InvertedBounds {
            min: config.min_rate,
            max: config.max_rate,
        });
    }

    if config.initial_rate < config.min_rate || config.initial_rate > config.max_rate {
        return Err(RateError::InitialOutOfBounds {
            initial: config.initial_rate,
            min: config.min_rate,
            max: config.max_rate,
        });
    }

    let factor = config.adjustment_factor;
    if !factor.is_finite() || factor <= 0.0 || factor >= 1.0 {
        return Err(RateError::InvalidFactor(factor));
    }

    if config.fast_threshold_ms > config.slow_threshold_ms {
        return Err(RateError::InvertedThresholds {
            fast: config.fast_threshold_ms,
            slow: config.slow_threshold_ms,
        });
    }

    Ok(())
}

/// Validates a single rate value
pub(crate) fn validate_rate(name: &'static str, value: f64) -> Result<(), RateError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(RateError::NonPositiveRate { name, value })
    }
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.name.is_empty() {
        return Err(ConfigError::Validation(
            "user-agent name cannot be empty".to_string(),
        ));
    }

    if config.name.chars().any(|c| c.is_whitespace() || c == '/') {
        return Err(ConfigError::Validation(format!(
            "user-agent name must not contain whitespace or '/', got '{}'",
            config.name
        )));
    }

    if config.version.is_empty() {
        return Err(ConfigError::Validation(
            "user-agent version cannot be empty".to_string(),
        ));
    }

    if let Some(contact) = &config.contact_url {
        Url::parse(contact)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact-url: {}", e)))?;
    }

    Ok(())
}

/// Validates fetch configuration
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if let Some(url) = &config.url {
        validate_target_url(url)?;
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout-secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    if config.connect_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "connect-timeout-secs must be >= 1, got {}",
            config.connect_timeout_secs
        )));
    }

    Ok(())
}

/// Validates a URL to be fetched
///
/// Only absolute http and https URLs are accepted.
pub fn validate_target_url(url: &str) -> Result<Url, ConfigError> {
    let parsed = Url::parse(url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid target URL '{}': {}", url, e)))?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(ConfigError::InvalidUrl(format!(
            "Target URL '{}' must use http or https, got '{}'",
            url, other
        ))),
    }
}
