use std::fs;
use std::path::{Path, PathBuf};

use scribe::Ownership;
use scribe::renderer::DEFAULT_LINK_BASE;
use serde::Deserialize;
use thiserror::Error;

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "scribe.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read '{}'", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config '{}'", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Contents of `scribe.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Source abbreviations of the books the reader owns. Without this list
    /// every record is rendered.
    pub owned_sources: Option<Vec<String>>,
    /// Count free publications as owned.
    pub include_free_sources: bool,
    /// Base URL for internal links.
    pub link_base: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            owned_sources: None,
            include_free_sources: true,
            link_base: DEFAULT_LINK_BASE.to_string(),
        }
    }
}

impl Config {
    /// Read `explicit`, or `scribe.toml` if it exists, or fall back to the
    /// defaults. An explicit path that cannot be read is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Config, ConfigError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !path.is_file() {
                    return Ok(Config::default());
                }
                path
            }
        };
        let text = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse { path, source })
    }

    pub fn ownership(&self) -> Option<Ownership> {
        let owned = self.owned_sources.as_ref()?;
        Some(Ownership::new(owned).with_free_sources(self.include_free_sources))
    }
}
