//! Engine configuration: the handful of run-level knobs that sit outside
//! the per-layer parameters carried in the input file itself.
//!
//! Parses an optional `metalfill.toml` (or an explicit override path);
//! unknown fields are ignored so the format can evolve without breaking
//! older config files. Absent a file, every field falls back to its
//! documented default.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct GridConfig {
    /// Tiles spanning one side of a window (`K` in `spec.md`). The
    /// original exposes this as a `DensityManager` constructor argument
    /// defaulting to 4; here it is a config/CLI knob for the same reason.
    #[serde(default = "GridConfig::default_tiles_per_window")]
    pub tiles_per_window: u32,
}

impl GridConfig {
    const fn default_tiles_per_window() -> u32 {
        4
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            tiles_per_window: Self::default_tiles_per_window(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct FillConfig {
    /// Whether to fall back to a chip-global free-region sweep when the
    /// per-tile pass leaves a window underfull. Disabling this is useful
    /// for tests that want to observe the per-tile-only result.
    #[serde(default = "FillConfig::default_chip_global_fallback")]
    pub enable_chip_global_fallback: bool,
}

impl FillConfig {
    const fn default_chip_global_fallback() -> bool {
        true
    }
}

impl Default for FillConfig {
    fn default() -> Self {
        Self {
            enable_chip_global_fallback: Self::default_chip_global_fallback(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub fill: FillConfig,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EngineConfig {
    pub grid: GridConfig,
    pub fill: FillConfig,
}

impl EngineConfig {
    /// Loads config from `path` if given, else returns the default
    /// configuration. A missing explicit path is an error; a missing
    /// default `metalfill.toml` (no `path` argument) is not.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let file: ConfigFile = toml::from_str(&raw)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        tracing::debug!(target: "config", path = %path.display(), "config_loaded");
        Ok(Self {
            grid: file.grid,
            fill: file.fill,
        })
    }
}
