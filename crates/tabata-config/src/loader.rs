use std::path::{Path, PathBuf};

use tabata_common::{Error, Result};
use tracing::{debug, info};

use crate::model::AppConfig;

const CANDIDATES: &[&str] = &["config.yml", "config.yaml", "config.toml"];

/// Finds and parses the config file inside a config directory.
pub struct ConfigLoader {
    config_dir: PathBuf,
}

impl ConfigLoader {
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    /// `~/.tabata`, or `./.tabata` when no home directory is known.
    pub fn default_config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".tabata")
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// The first existing candidate file, if any.
    pub fn config_path(&self) -> Option<PathBuf> {
        CANDIDATES
            .iter()
            .map(|name| self.config_dir.join(name))
            .find(|p| p.is_file())
    }

    /// Load the config, falling back to defaults when no file exists.
    pub fn load(&self) -> Result<AppConfig> {
        match self.config_path() {
            Some(path) => {
                info!("loading config from {}", path.display());
                load_file(&path)
            }
            None => {
                debug!(
                    "no config file in {}, using defaults",
                    self.config_dir.display()
                );
                Ok(AppConfig::default())
            }
        }
    }
}

fn load_file(path: &Path) -> Result<AppConfig> {
    let contents = std::fs::read_to_string(path)?;

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    match ext {
        "yml" | "yaml" => serde_yaml::from_str(&contents)
            .map_err(|e| Error::Config(format!("YAML parse error in {}: {e}", path.display()))),
        "toml" => toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("TOML parse error in {}: {e}", path.display()))),
        other => Err(Error::Config(format!(
            "unsupported config extension: {other}"
        ))),
    }
}
