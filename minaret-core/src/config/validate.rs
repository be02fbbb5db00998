//! Configuration validation rules.

use super::schema::Config;

/// Validate configuration and return aggregated validation errors.
pub fn validate_config(config: &Config) -> crate::Result<()> {
    let mut errors = Vec::new();

    if config.gemini.api_key.trim().is_empty() {
        errors.push("gemini.api_key is required".to_string());
    }
    if config.gemini.api_base.trim().is_empty() {
        errors.push("gemini.api_base must not be empty".to_string());
    }
    if config.gemini.model.trim().is_empty() {
        errors.push("gemini.model must not be empty".to_string());
    }

    if config.telegram.enabled && config.telegram.token.trim().is_empty() {
        errors.push("telegram.token is required when telegram is enabled".to_string());
    }

    if config.assistant.persona.trim().is_empty() {
        errors.push("assistant.persona must not be empty".to_string());
    }
    if config.assistant.max_output_tokens == 0 {
        errors.push("assistant.max_output_tokens must be > 0".to_string());
    }
    if !(0.0..=2.0).contains(&config.assistant.temperature) {
        errors.push("assistant.temperature must be in [0.0, 2.0]".to_string());
    }
    if config.assistant.request_timeout_secs == 0 {
        errors.push("assistant.request_timeout_secs must be > 0".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(crate::Error::Validation(errors.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        let mut config = Config::default();
        config.gemini.api_key = "test-key".to_string();
        config
    }

    #[test]
    fn test_validate_accepts_defaults_with_key() {
        validate_config(&base_config()).unwrap();
    }

    #[test]
    fn test_validate_requires_api_key() {
        let config = Config::default();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("gemini.api_key"));
    }

    #[test]
    fn test_validate_enabled_telegram_requires_token() {
        let mut config = base_config();
        config.telegram.enabled = true;

        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("telegram.token"));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = base_config();
        config.assistant.request_timeout_secs = 0;

        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("request_timeout_secs"));
    }
}
