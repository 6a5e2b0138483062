//! Post-merge validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

const LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];
const FORMATS: &[&str] = &["pretty", "compact", "json", "full"];

/// Validate a fully merged configuration.
///
/// # Errors
///
/// Returns [`ConfigError::ValidationError`] naming the first bad field.
pub fn validate(config: &Config) -> ConfigResult<()> {
    let logging = &config.logging;

    if !LEVELS.contains(&logging.level.to_ascii_lowercase().as_str()) {
        return Err(invalid(
            "logging.level",
            format!(
                "unknown level '{}', expected one of {}",
                logging.level,
                LEVELS.join(", ")
            ),
        ));
    }

    if !FORMATS.contains(&logging.format.as_str()) {
        return Err(invalid(
            "logging.format",
            format!(
                "unknown format '{}', expected one of {}",
                logging.format,
                FORMATS.join(", ")
            ),
        ));
    }

    for directive in &logging.directives {
        if directive.trim().is_empty() || directive.chars().any(char::is_whitespace) {
            return Err(invalid(
                "logging.directives",
                format!("malformed directive '{directive}'"),
            ));
        }
    }

    Ok(())
}

fn invalid(field: &str, message: String) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_owned(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_level_case_insensitive() {
        let mut config = Config::default();
        config.logging.level = "DEBUG".to_owned();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_unknown_level() {
        let mut config = Config::default();
        config.logging.level = "loud".to_owned();
        let err = validate(&config).unwrap_err();
        assert!(
            matches!(err, ConfigError::ValidationError { ref field, .. } if field == "logging.level")
        );
    }

    #[test]
    fn test_unknown_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_owned();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_bad_directive() {
        let mut config = Config::default();
        config.logging.directives = vec!["auditlink=debug".to_owned(), String::new()];
        assert!(validate(&config).is_err());

        config.logging.directives = vec!["a = b".to_owned()];
        assert!(validate(&config).is_err());
    }
}
