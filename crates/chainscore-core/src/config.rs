use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File name looked up at the root of a scanned repository.
pub const CONFIG_FILE_NAME: &str = ".chainscore.toml";

/// Scan configuration loaded from `.chainscore.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Checks to run, by registered name. Empty means all of them.
    #[serde(default)]
    pub checks: Vec<String>,

    /// Glob patterns of repository paths that are never fed to a check
    /// (e.g. `["testdata/**"]`).
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Additional lock-file names accepted by the lock-file check
    /// (e.g. `["poetry.lock"]`).
    #[serde(default)]
    pub lock_files: Vec<String>,
}

impl Config {
    /// Compile the `exclude` patterns, rejecting malformed ones up front.
    pub fn exclude_patterns(&self) -> anyhow::Result<Vec<glob::Pattern>> {
        self.exclude
            .iter()
            .map(|p| {
                glob::Pattern::new(p).with_context(|| format!("Invalid exclude pattern '{}'", p))
            })
            .collect()
    }
}

/// Load configuration from a TOML file.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))?;
    config.exclude_patterns()?;
    Ok(config)
}

/// Load `.chainscore.toml` from `root` when present, defaults otherwise.
pub fn load_config_from_root(root: &Path) -> anyhow::Result<Config> {
    let path = root.join(CONFIG_FILE_NAME);
    if path.is_file() {
        load_config(&path)
    } else {
        Ok(Config::default())
    }
}
