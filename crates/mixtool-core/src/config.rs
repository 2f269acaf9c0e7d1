use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::platform;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub mpv: MpvConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MpvConfig {
    /// IPC socket (unix) / pipe name (windows) to reach the player on.
    #[serde(default = "default_socket")]
    pub socket: String,
    /// Spawn an idle mpv when no socket answers. Disable when another
    /// frontend owns the player and mixtool should only ride along.
    #[serde(default = "default_spawn")]
    pub spawn: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Reconciliation tick period in seconds.
    #[serde(default = "default_reconcile_secs")]
    pub reconcile_secs: u64,
    /// Corner frequency of the bass low-shelf filter in Hz.
    #[serde(default = "default_shelf_hz")]
    pub shelf_hz: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Where the parameter JSON lives.
    #[serde(default = "default_params_file")]
    pub params_file: PathBuf,
}

impl Default for MpvConfig {
    fn default() -> Self {
        Self {
            socket: default_socket(),
            spawn: default_spawn(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reconcile_secs: default_reconcile_secs(),
            shelf_hz: default_shelf_hz(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            params_file: default_params_file(),
        }
    }
}

fn default_socket() -> String {
    platform::mpv_socket_name()
}

fn default_spawn() -> bool {
    true
}

fn default_reconcile_secs() -> u64 {
    1
}

fn default_shelf_hz() -> u32 {
    200
}

fn default_params_file() -> PathBuf {
    platform::data_dir().join("params.json")
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.engine.reconcile_secs, 1);
        assert_eq!(config.engine.shelf_hz, 200);
        assert!(config.mpv.spawn);
        assert!(config.storage.params_file.ends_with("mixtool/params.json"));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str("[engine]\nshelf_hz = 120\n").unwrap();
        assert_eq!(config.engine.shelf_hz, 120);
        assert_eq!(config.engine.reconcile_secs, 1);
        assert!(config.mpv.spawn);
    }
}
