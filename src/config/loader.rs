//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::AgentConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variables that override account secrets.
pub const ENV_EMAIL: &str = "SURPLUS_EMAIL";
pub const ENV_ACCESS_TOKEN: &str = "SURPLUS_ACCESS_TOKEN";
pub const ENV_REFRESH_TOKEN: &str = "SURPLUS_REFRESH_TOKEN";
pub const ENV_DATADOME: &str = "SURPLUS_DATADOME";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

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
pub fn load_config(path: &Path) -> Result<AgentConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content, |key| std::env::var(key).ok())
}

/// Parse configuration text, apply overrides from `env`, then validate.
pub fn parse_config<F>(content: &str, env: F) -> Result<AgentConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config: AgentConfig = toml::from_str(content)?;
    apply_env_overrides(&mut config, env);

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Secrets never need to live in the config file.
pub fn apply_env_overrides<F>(config: &mut AgentConfig, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    let account = &mut config.account;
    for (key, slot) in [
        (ENV_EMAIL, &mut account.email),
        (ENV_ACCESS_TOKEN, &mut account.access_token),
        (ENV_REFRESH_TOKEN, &mut account.refresh_token),
        (ENV_DATADOME, &mut account.datadome_cookie),
    ] {
        if let Some(value) = env(key).filter(|v| !v.is_empty()) {
            tracing::debug!(variable = key, "Account setting overridden from environment");
            *slot = Some(value);
        }
    }
}
