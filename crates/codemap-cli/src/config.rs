//! `codemap.toml` loading.
//!
//! ```toml
//! [store]
//! path = ".codemap/store.jsonl"
//!
//! [logging]
//! level = "info"      # error | warn | info | debug | trace
//! format = "compact"  # pretty | compact | json
//! ```
//!
//! Every key is optional. Without `--config`, a missing `./codemap.toml`
//! yields the defaults; an explicit `--config` must exist.

use crate::logging::LogFormat;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "codemap.toml";
pub const DEFAULT_STORE_PATH: &str = ".codemap/store.jsonl";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub store: StoreSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreSection {
    pub path: PathBuf,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_STORE_PATH),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSection {
    pub level: Option<String>,
    pub format: Option<LogFormat>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

pub fn load(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_PATH);
            if !default.exists() {
                return Ok(Config::default());
            }
            default
        }
    };

    let text = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    parse(&text).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

fn parse(text: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = parse("").expect("empty config parses");
        assert_eq!(config.store.path, PathBuf::from(DEFAULT_STORE_PATH));
        assert_eq!(config.logging.level, None);
    }

    #[test]
    fn sections_are_read() {
        let config = parse(
            "[store]\npath = \"maps/store.jsonl\"\n\n[logging]\nlevel = \"debug\"\nformat = \"json\"\n",
        )
        .expect("config parses");
        assert_eq!(config.store.path, PathBuf::from("maps/store.jsonl"));
        assert_eq!(config.logging.level.as_deref(), Some("debug"));
        assert_eq!(config.logging.format, Some(LogFormat::Json));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(parse("[store]\nfile = \"x\"\n").is_err());
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let missing = std::env::temp_dir().join("codemap-config-does-not-exist.toml");
        assert!(matches!(
            load(Some(&missing)),
            Err(ConfigError::Read { .. })
        ));
    }
}
