// src/config.rs
use crate::energy::EnergyKind;
use crate::fitter::FitParams;
use crate::skeleton::HandSkeleton;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Initial value of every angle when no starting pose is given.
pub const DEFAULT_INITIAL_ANGLE: f64 = 0.001;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub skeleton: HandSkeleton,
    pub fit: FitParams,
    pub energy: EnergyKind,
    pub initial_angle: f64,
    pub output_directory: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            skeleton: HandSkeleton::default(),
            fit: FitParams::default(),
            energy: EnergyKind::default(),
            initial_angle: DEFAULT_INITIAL_ANGLE,
            output_directory: directories::UserDirs::new()
                .and_then(|dirs| dirs.document_dir().map(|p| p.join("HandFitter")))
                .unwrap_or_else(|| PathBuf::from("./output")),
        }
    }
}

impl AppConfig {
    /// Per-user location of the configuration file.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "handfitter", "hand_fitter")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config.validate()?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Loads `path` if given, else the per-user file if it exists, else the
    /// defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("Failed to write config {}", path.display()))?;
        info!(path = %path.display(), "saved configuration");
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.skeleton.validate().context("Invalid skeleton in config")?;
        self.fit.validate().context("Invalid fit parameters in config")?;
        if !self.initial_angle.is_finite() {
            anyhow::bail!("initial_angle must be finite, got {}", self.initial_angle);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = AppConfig::default();
        config.fit = FitParams::new().with_max_iterations(42).with_learning_rate(1e-4);
        config.energy = EnergyKind::Position;
        config.output_directory = dir.path().join("out");
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "energy": "limit", "fit": { "log_interval": 5 } }"#).unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.energy, EnergyKind::Limit);
        assert_eq!(config.fit.log_interval, 5);
        assert_eq!(config.fit.max_iterations, FitParams::default().max_iterations);
        assert_eq!(config.skeleton, HandSkeleton::default());
        assert_eq!(config.initial_angle, DEFAULT_INITIAL_ANGLE);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "fit": { "log_interval": 0 } }"#).unwrap();
        assert!(AppConfig::load(&path).is_err());

        fs::write(&path, "not json").unwrap();
        assert!(AppConfig::load(&path).is_err());

        assert!(AppConfig::load(&dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_explicit_path_wins() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let config = AppConfig {
            initial_angle: 0.25,
            ..AppConfig::default()
        };
        config.save(&path).unwrap();

        let loaded = AppConfig::load_or_default(Some(&path)).unwrap();
        assert_eq!(loaded.initial_angle, 0.25);
    }
}
