//! Application paths and persisted player settings.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::playback::PlaybackConfig;
use crate::playbacks::BackendId;

/// Settings file name
pub const SETTINGS_FILE: &str = "clapboard.json";

/// Log file name (used by `--log` without a path)
pub const LOG_FILE: &str = "clapboard.log";

/// Configuration for overriding default application paths
#[derive(Debug, Clone, Default)]
pub struct PathConfig {
    /// Custom config directory (from CLI or ENV)
    pub config_dir: Option<PathBuf>,
}

impl PathConfig {
    /// Priority: CLI args → ENV var (CLAPBOARD_CONFIG_DIR) → None (use defaults)
    pub fn from_env_and_cli(cli_dir: Option<PathBuf>) -> Self {
        let config_dir = cli_dir.or_else(|| std::env::var("CLAPBOARD_CONFIG_DIR").ok().map(PathBuf::from));
        Self { config_dir }
    }
}

/// Path to a configuration file
///
/// Priority:
/// 1. CLI --config-dir argument
/// 2. CLAPBOARD_CONFIG_DIR environment variable
/// 3. Local folder IF clapboard.json or clapboard.log exist there
/// 4. Platform config directory from dirs-next (`~/.config/clapboard` on Linux)
pub fn config_file(name: &str, config: &PathConfig) -> PathBuf {
    resolve_dir(config, dirs_next::config_dir()).join(name)
}

/// Path to a data file (logs), same priority as [`config_file`] but ending in
/// the platform data directory (`~/.local/share/clapboard` on Linux).
pub fn data_file(name: &str, config: &PathConfig) -> PathBuf {
    resolve_dir(config, dirs_next::data_dir()).join(name)
}

/// Create the configuration and data directories if missing
pub fn ensure_dirs(config: &PathConfig) -> Result<()> {
    let config_dir = resolve_dir(config, dirs_next::config_dir());
    let data_dir = resolve_dir(config, dirs_next::data_dir());

    for dir in [&config_dir, &data_dir] {
        if !dir.exists() {
            std::fs::create_dir_all(dir).with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
    }
    Ok(())
}

fn has_local_files(dir: &Path) -> bool {
    [SETTINGS_FILE, LOG_FILE].iter().any(|f| dir.join(f).exists())
}

fn resolve_dir(config: &PathConfig, platform_dir: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = &config.config_dir {
        return dir.clone();
    }
    if let Ok(current_dir) = std::env::current_dir() {
        if has_local_files(&current_dir) {
            return current_dir;
        }
    }
    if let Some(dir) = platform_dir {
        return dir.join("clapboard");
    }
    PathBuf::from(".")
}

/// Persisted player settings (`clapboard.json`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSettings {
    /// Last user volume, 0-100
    pub volume: u8,
    /// Bootstrap tuning of polling backends
    pub playback: PlaybackConfig,
    /// Backends tried in this order during selection
    pub backend_order: Vec<BackendId>,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            volume: 100,
            playback: PlaybackConfig::default(),
            backend_order: BackendId::DEFAULT_ORDER.to_vec(),
        }
    }
}

impl PlayerSettings {
    /// Read settings; a missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read settings: {}", path.display()))?;
        let settings: Self =
            serde_json::from_str(&text).with_context(|| format!("Invalid settings file: {}", path.display()))?;
        Ok(settings.sanitized())
    }

    /// Write settings as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        std::fs::write(path, text).with_context(|| format!("Failed to write settings: {}", path.display()))?;
        Ok(())
    }

    /// Clamp out-of-range values. An empty backend order falls back to the default.
    fn sanitized(mut self) -> Self {
        self.volume = self.volume.min(100);
        if self.backend_order.is_empty() {
            self.backend_order = BackendId::DEFAULT_ORDER.to_vec();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_with_custom_dir() {
        let config = PathConfig {
            config_dir: Some(PathBuf::from("/custom")),
        };
        assert_eq!(config_file("test.json", &config), PathBuf::from("/custom/test.json"));
        assert_eq!(data_file(LOG_FILE, &config), PathBuf::from("/custom/clapboard.log"));
    }

    #[test]
    fn test_settings_defaults_fill_missing_fields() {
        let settings: PlayerSettings = serde_json::from_str(r#"{"volume": 40}"#).unwrap();
        assert_eq!(settings.volume, 40);
        assert_eq!(settings.playback.max_attempts, 60);
        assert_eq!(settings.playback.bootstrap_interval_ms, 50);
        assert_eq!(settings.backend_order, BackendId::DEFAULT_ORDER.to_vec());
    }

    #[test]
    fn test_settings_save_load() {
        let dir = std::env::temp_dir().join(format!("clapboard_test_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(SETTINGS_FILE);

        assert_eq!(PlayerSettings::load(&path).unwrap(), PlayerSettings::default());

        let settings = PlayerSettings {
            volume: 35,
            playback: PlaybackConfig {
                bootstrap_interval_ms: 20,
                max_attempts: 5,
            },
            backend_order: vec![BackendId::Flash],
        };
        settings.save(&path).unwrap();
        assert_eq!(PlayerSettings::load(&path).unwrap(), settings);

        std::fs::write(&path, r#"{"volume": 250, "backend_order": []}"#).unwrap();
        assert!(PlayerSettings::load(&path).is_err());

        std::fs::write(&path, r#"{"volume": 100, "backend_order": []}"#).unwrap();
        let loaded = PlayerSettings::load(&path).unwrap();
        assert_eq!(loaded.backend_order, BackendId::DEFAULT_ORDER.to_vec());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
