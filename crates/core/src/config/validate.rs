use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Provider credentials and sending number are present
/// - Prompt URLs are present and the DTMF marker cannot collide with a number
/// - Poll intervals and timeouts are non-zero
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let required = [
        ("provider.account_sid", &config.provider.account_sid),
        ("provider.auth_token", &config.provider.auth_token),
        ("provider.from_number", &config.provider.from_number),
        ("provider.api_base", &config.provider.api_base),
        ("prompts.intro_url", &config.prompts.intro_url),
        ("prompts.outro_url", &config.prompts.outro_url),
    ];
    for (key, value) in required {
        if value.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "{} cannot be empty",
                key
            )));
        }
    }

    let marker = config.prompts.dtmf_marker;
    if marker.is_ascii_digit() || marker == '+' || marker.is_whitespace() {
        return Err(ConfigError::ValidationError(format!(
            "prompts.dtmf_marker '{}' would collide with phone number characters",
            marker
        )));
    }

    let orchestrator = &config.orchestrator;
    let durations = [
        ("orchestrator.status_poll_interval_secs", orchestrator.status_poll_interval_secs),
        ("orchestrator.status_timeout_secs", orchestrator.status_timeout_secs),
        (
            "orchestrator.recording_poll_interval_secs",
            orchestrator.recording_poll_interval_secs,
        ),
        ("orchestrator.recording_timeout_secs", orchestrator.recording_timeout_secs),
    ];
    for (key, value) in durations {
        if value == 0 {
            return Err(ConfigError::ValidationError(format!("{} cannot be 0", key)));
        }
    }

    if config.retry.backoff_multiplier < 1.0 {
        return Err(ConfigError::ValidationError(
            "retry.backoff_multiplier must be >= 1.0".to_string(),
        ));
    }

    Ok(())
}
