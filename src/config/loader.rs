//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GuardConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading. Fatal at boot.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GuardConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: GuardConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Validate and write configuration back to a TOML file.
pub fn save_config(path: &Path, config: &GuardConfig) -> Result<(), ConfigError> {
    validate_config(config).map_err(ConfigError::Validation)?;

    let content = toml::to_string_pretty(config)?;
    fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::FirewallEntryConfig;
    use crate::firewall::EntryAction;

    #[test]
    fn test_save_then_load() {
        let path = std::env::temp_dir().join(format!("ban_cfg_{}.toml", uuid::Uuid::new_v4()));

        let mut config = GuardConfig::default();
        config
            .firewall
            .entries
            .push(FirewallEntryConfig::new("192.168.*.*", EntryAction::Deny));
        config.throttle.limit = 7;

        save_config(&path, &config).unwrap();
        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded, config);

        std::fs::remove_file(&path).unwrap_or_default();
    }

    #[test]
    fn test_invalid_file_reports_validation() {
        let path = std::env::temp_dir().join(format!("ban_cfg_{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            "[[firewall.entries]]\npattern = \"10.0.0.0/99\"\naction = \"deny\"\n",
        )
        .unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref errors) if errors.len() == 1));

        std::fs::remove_file(&path).unwrap_or_default();
    }
}
