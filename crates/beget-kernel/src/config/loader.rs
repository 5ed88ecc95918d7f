//! Configuration loading.
//!
//! Sources are layered with the `config` crate, later ones overriding
//! earlier ones:
//!
//! 1. the serde defaults of [`Config`];
//! 2. one configuration file (YAML, TOML or JSON, detected by extension);
//! 3. environment variables prefixed with `BEGET_`, using `__` for nesting
//!    and `,` to separate list items, e.g. `BEGET_KAFKA__TOPICS=orders,clicks`.
//!
//! The merged result is validated before it is returned.

use super::Config;
use crate::error::ConfigError;
use config::{Config as Cfg, Environment, File, FileFormat, Map};
use std::path::Path;
use tracing::debug;

/// Prefix of environment variable overrides.
pub const ENV_PREFIX: &str = "BEGET";

/// Detect the configuration format from a file extension.
///
/// Supported: `.yaml`, `.yml`, `.toml`, `.json`.
pub fn detect_format(path: &Path) -> Result<FileFormat, ConfigError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| ConfigError::UnsupportedFormat("no file extension found".to_string()))?;

    match ext.to_ascii_lowercase().as_str() {
        "yaml" | "yml" => Ok(FileFormat::Yaml),
        "toml" => Ok(FileFormat::Toml),
        "json" => Ok(FileFormat::Json),
        _ => Err(ConfigError::UnsupportedFormat(ext.to_string())),
    }
}

/// Load and validate configuration from `path` merged with the process
/// environment.
pub fn load(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    load_with_env(path, None)
}

/// Like [`load`], reading overrides from `env` instead of the process
/// environment when it is `Some`.
pub fn load_with_env(
    path: impl AsRef<Path>,
    env: Option<Map<String, String>>,
) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ConfigError::NotFound(path.display().to_string()),
        _ => ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        },
    })?;

    debug!(path = %path.display(), "loading configuration");
    resolve(&content, format, env)
}

/// Load and validate configuration from an in-memory document, without any
/// environment overrides.
pub fn from_str(content: &str, format: FileFormat) -> Result<Config, ConfigError> {
    resolve(content, format, Some(Map::new()))
}

fn resolve(
    content: &str,
    format: FileFormat,
    env: Option<Map<String, String>>,
) -> Result<Config, ConfigError> {
    let merged = Cfg::builder()
        .add_source(File::from_str(content, format))
        .add_source(environment(env))
        .build()
        .map_err(|e| ConfigError::Parse(e.to_string()))?;

    let config: Config = merged
        .try_deserialize()
        .map_err(|e| ConfigError::Parse(e.to_string()))?;

    config.validate()?;
    Ok(config)
}

fn environment(source: Option<Map<String, String>>) -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("kafka.topics")
        .with_list_parse_key("kafka.brokers")
        .source(source)
}
