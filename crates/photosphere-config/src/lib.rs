mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

const APP_DIR: &str = "photosphere";

/// Returns the config directory: <config_dir>/photosphere/
pub fn config_dir() -> Result<PathBuf> {
    let dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
        .join(APP_DIR);
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Returns the config file path: <config_dir>/photosphere/config.toml
pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Directory holding photos, panoramas and the project list.
pub fn data_dir(config: &AppConfig) -> Result<PathBuf> {
    let dir = match &config.storage.data_dir {
        Some(dir) => dir.clone(),
        None => dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?
            .join(APP_DIR),
    };
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("creating data directory {}", dir.display()))?;
    Ok(dir)
}

/// Load config from disk, or return default if not found.
pub fn load_config() -> Result<AppConfig> {
    load_config_from(&config_path()?)
}

/// Load config from an explicit path, or return default if the file does not exist.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    if path.exists() {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig =
            toml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))?;
        info!(?path, "Loaded config");
        Ok(config)
    } else {
        info!("No config found, using defaults");
        Ok(AppConfig::default())
    }
}

/// Save config to disk.
pub fn save_config(config: &AppConfig) -> Result<()> {
    save_config_to(config, &config_path()?)
}

/// Render `config` as the TOML that `save_config` writes.
pub fn to_toml(config: &AppConfig) -> Result<String> {
    toml::to_string_pretty(config).context("serializing config")
}

pub fn save_config_to(config: &AppConfig, path: &Path) -> Result<()> {
    let contents = to_toml(config)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)?;
    info!(?path, "Saved config");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = load_config_from(&dir.path().join("nope.toml")).unwrap();
        assert!((config.filter.rotation_alpha - 0.15).abs() < 1e-6);
        assert!((config.filter.gravity_alpha - 0.1).abs() < 1e-6);
        assert_eq!(config.guidance.forward_axis, Vec3::NEG_Z);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = AppConfig::default();
        config.layout.radius = 2.5;
        config.guidance.forward_axis = Vec3::new(0.0, 1.0, 0.0);
        config.camera.fail_every = 3;
        save_config_to(&config, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert!((loaded.layout.radius - 2.5).abs() < 1e-6);
        assert_eq!(loaded.guidance.forward_axis, Vec3::Y);
        assert_eq!(loaded.camera.fail_every, 3);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[guidance]\ncapture_threshold = 0.5\n").unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert!((loaded.guidance.capture_threshold - 0.5).abs() < 1e-6);
        assert!(loaded.guidance.track_gravity);
        assert!((loaded.layout.radius - 1.0).abs() < 1e-6);
    }
}
