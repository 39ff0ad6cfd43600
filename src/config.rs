use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::filters::DEFAULT_TOLERANCE;
use crate::layout::JustifiedLayout;
use crate::palette::PaletteOptions;

/// Application configuration loaded from config.yaml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub layout: LayoutConfig,
    pub filters: FilterConfig,
    pub palette: PaletteConfig,
    pub ingest: IngestConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub target_row_height: f64,
    pub min_row_height: f64,
    pub gap: u32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        let layout = JustifiedLayout::default();
        Self {
            target_row_height: layout.target_row_height,
            min_row_height: layout.min_row_height,
            gap: layout.gap,
        }
    }
}

impl LayoutConfig {
    pub fn layout(&self) -> JustifiedLayout {
        JustifiedLayout::new(self.target_row_height, self.min_row_height, self.gap)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Tolerance applied when a color is picked without one.
    pub default_tolerance: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            default_tolerance: DEFAULT_TOLERANCE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaletteConfig {
    pub sample_width: u32,
    pub alpha_threshold: u8,
    pub workers: usize,
    /// How long to wait for a single extraction before keeping the placeholder.
    pub timeout_ms: u64,
}

impl Default for PaletteConfig {
    fn default() -> Self {
        let options = PaletteOptions::default();
        Self {
            sample_width: options.sample_width,
            alpha_threshold: options.alpha_threshold,
            workers: crate::palette::queue::DEFAULT_WORKERS,
            timeout_ms: 10_000,
        }
    }
}

impl PaletteConfig {
    pub fn options(&self) -> PaletteOptions {
        PaletteOptions {
            sample_width: self.sample_width,
            alpha_threshold: self.alpha_threshold,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub recursive: bool,
    /// 0 means unlimited.
    pub max_depth: usize,
    pub default_width: u32,
    pub default_height: u32,
    pub placeholder_color: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            recursive: true,
            max_depth: 0,
            default_width: 1200,
            default_height: 800,
            placeholder_color: "#a18072".to_string(),
        }
    }
}

impl Config {
    /// Default location: `<config dir>/stockgrid/config.yaml`.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "stockgrid").map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Parses a config file. Any read or parse failure is an error.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        // An empty document deserialises as unit, not as an empty mapping.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Loads the explicit path if given, otherwise the default location.
    ///
    /// A missing or broken default file falls back to defaults with a
    /// warning; an explicit path must load.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        let Some(path) = Self::default_path() else {
            debug!("No config directory available, using defaults");
            return Ok(Self::default());
        };
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        match Self::from_file(&path) {
            Ok(config) => Ok(config),
            Err(e) => {
                warn!(error = %format!("{e:#}"), "Failed to load config, using defaults");
                Ok(Self::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.layout.target_row_height, 260.0);
        assert_eq!(config.layout.min_row_height, 60.0);
        assert_eq!(config.layout.gap, 16);
        assert_eq!(config.filters.default_tolerance, 30.0);
        assert_eq!(config.palette.sample_width, 64);
        assert_eq!(config.palette.alpha_threshold, 16);
        assert_eq!(config.palette.workers, 2);
        assert_eq!(config.palette.timeout(), Duration::from_secs(10));
        assert!(config.ingest.recursive);
        assert_eq!(config.ingest.placeholder_color, "#a18072");
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let config = Config::from_yaml("layout:\n  gap: 4\npalette:\n  workers: 6\n").unwrap();
        assert_eq!(config.layout.gap, 4);
        assert_eq!(config.layout.target_row_height, 260.0);
        assert_eq!(config.palette.workers, 6);
        assert_eq!(config.ingest, IngestConfig::default());

        let layout = config.layout.layout();
        assert_eq!(layout.gap, 4);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(Config::from_yaml("").unwrap(), Config::default());
        assert_eq!(Config::from_yaml("  \n").unwrap(), Config::default());
    }

    #[test]
    fn test_explicit_path_must_load() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.yaml");
        assert!(Config::load(Some(&missing)).is_err());

        let broken = dir.path().join("broken.yaml");
        std::fs::write(&broken, "layout: [1, 2").unwrap();
        let err = Config::load(Some(&broken)).unwrap_err();
        assert!(format!("{err:#}").contains("broken.yaml"));

        let good = dir.path().join("good.yaml");
        std::fs::write(&good, "filters:\n  default_tolerance: 12.5\n").unwrap();
        let config = Config::load(Some(&good)).unwrap();
        assert_eq!(config.filters.default_tolerance, 12.5);
    }
}
