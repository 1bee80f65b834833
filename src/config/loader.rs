//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<GatewayConfig, ConfigError> {
    let config: GatewayConfig = toml::from_str(content).map_err(ConfigError::Parse)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.toml");
        fs::write(
            &path,
            "[listener]\nbind_address = \"127.0.0.1:8088\"\n\n[application]\ndocument_root = \"/srv/shop\"\nvhosts = [\"shop.local\"]\n",
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:8088");
        assert_eq!(config.application.vhosts, vec!["shop.local".to_string()]);
    }

    #[test]
    fn test_errors_by_stage() {
        let missing = load_config(Path::new("/nonexistent/gateway.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io(_)));

        let garbage = parse_config("[listener\n").unwrap_err();
        assert!(matches!(garbage, ConfigError::Parse(_)));

        let invalid = parse_config("[application]\nmax_workers = 0\n").unwrap_err();
        assert_eq!(
            invalid.to_string(),
            "Validation failed: application.max_workers: must be greater than 0"
        );
    }
}
