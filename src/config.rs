//! Service configuration.
//!
//! Handles loading, merging and validating `rendition.toml`. Stock defaults
//! are serialized to a TOML table and the user file is merged on top of it
//! key by key, so a config file only needs the values it changes.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! library_dir = "uploads"                 # Originals, scanned for NNN-name files
//! cache_dir = "uploads/rendition-cache"   # Where renditions are written
//! base_url = "/uploads/rendition-cache"   # Public URL of cache_dir
//! jpeg_quality = 82                       # 1-100
//! # max_threads = 4                       # warm parallelism (omit for all cores)
//!
//! [presets.thumbnail]
//! width = 150
//! height = 150
//! crop = "center"
//! ```
//!
//! ## Presets
//!
//! A preset is a named [`SizeSpec`]. `width` and `height` take the same
//! tokens as a render request (`300`, `"300px"`, `"auto"`, ratio terms like
//! `16`/`9`); `height` defaults to `"auto"`. `crop` is `false` (the
//! default), `true` for a centered crop, or an anchor name.
//!
//! Presets merge like every other table: redefining `thumbnail` with only
//! `width = 200` keeps the stock `height` and `crop`.
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::Quality;
use crate::render::RenderOptions;
use crate::size::{Anchor, SizeError, SizeSpec, SizeToken};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "rendition.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `rendition.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenditionConfig {
    /// Directory holding the original images.
    pub library_dir: PathBuf,
    /// Rendition cache directory.
    pub cache_dir: PathBuf,
    /// Public URL prefix the cache directory is served under.
    pub base_url: String,
    /// JPEG encoding quality (1 = worst, 100 = best).
    pub jpeg_quality: u32,
    /// Maximum parallel workers for `warm`.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_threads: Option<usize>,
    /// Named sizes.
    pub presets: BTreeMap<String, PresetConfig>,
}

impl Default for RenditionConfig {
    fn default() -> Self {
        let presets = [
            ("thumbnail", PresetConfig::new(150, 150, Some(Anchor::Center))),
            ("medium", PresetConfig::new(300, 300, None)),
            ("medium_large", PresetConfig::auto_height(768)),
            ("large", PresetConfig::new(1024, 1024, None)),
        ]
        .into_iter()
        .map(|(name, preset)| (name.to_string(), preset))
        .collect();

        Self {
            library_dir: PathBuf::from("uploads"),
            cache_dir: PathBuf::from("uploads/rendition-cache"),
            base_url: "/uploads/rendition-cache".to_string(),
            jpeg_quality: Quality::default().value(),
            max_threads: None,
            presets,
        }
    }
}

impl RenditionConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(ConfigError::Validation("jpeg_quality must be 1-100".into()));
        }
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::Validation("base_url must not be empty".into()));
        }
        if self.max_threads == Some(0) {
            return Err(ConfigError::Validation("max_threads must be at least 1".into()));
        }
        self.preset_specs().map(|_| ())
    }

    /// Parse every preset into a [`SizeSpec`].
    pub fn preset_specs(&self) -> Result<BTreeMap<String, SizeSpec>, ConfigError> {
        self.presets
            .iter()
            .map(|(name, preset)| {
                if name.is_empty() || name.contains(char::is_whitespace) {
                    return Err(ConfigError::Validation(format!(
                        "preset name {name:?} must be a non-empty word"
                    )));
                }
                let spec = preset.size_spec().map_err(|e| {
                    ConfigError::Validation(format!("presets.{name}: {e}"))
                })?;
                Ok((name.clone(), spec))
            })
            .collect()
    }

    /// Renderer settings derived from this config.
    pub fn render_options(&self) -> Result<RenderOptions, ConfigError> {
        Ok(RenderOptions {
            quality: Quality::new(self.jpeg_quality),
            presets: self.preset_specs()?,
        })
    }
}

/// One `[presets.NAME]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PresetConfig {
    pub width: TokenValue,
    #[serde(default = "TokenValue::auto")]
    pub height: TokenValue,
    #[serde(default)]
    pub crop: CropValue,
}

impl PresetConfig {
    fn new(width: u32, height: u32, crop: Option<Anchor>) -> Self {
        Self {
            width: TokenValue::Pixels(width),
            height: TokenValue::Pixels(height),
            crop: crop.map_or(CropValue::Flag(false), |a| CropValue::Mode(a.to_string())),
        }
    }

    fn auto_height(width: u32) -> Self {
        Self {
            width: TokenValue::Pixels(width),
            height: TokenValue::auto(),
            crop: CropValue::default(),
        }
    }

    pub fn size_spec(&self) -> Result<SizeSpec, SizeError> {
        Ok(SizeSpec::new(
            self.width.token()?,
            self.height.token()?,
            self.crop.anchor()?,
        ))
    }
}

/// A size token written as a bare integer or a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TokenValue {
    Pixels(u32),
    Text(String),
}

impl TokenValue {
    fn auto() -> Self {
        Self::Text("auto".to_string())
    }

    fn token(&self) -> Result<SizeToken, SizeError> {
        match self {
            Self::Pixels(0) => Err(SizeError::InvalidSizeSpec(
                "size must be positive".to_string(),
            )),
            Self::Pixels(n) => Ok(SizeToken::from(*n)),
            Self::Text(s) => SizeToken::parse(s),
        }
    }
}

/// `crop = true | false | "anchor"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CropValue {
    Flag(bool),
    Mode(String),
}

impl Default for CropValue {
    fn default() -> Self {
        Self::Flag(false)
    }
}

impl CropValue {
    fn anchor(&self) -> Result<Option<Anchor>, SizeError> {
        match self {
            Self::Flag(true) => Ok(Some(Anchor::Center)),
            Self::Flag(false) => Ok(None),
            Self::Mode(mode) => Anchor::parse_mode(mode),
        }
    }
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &RenditionConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_threads.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged onto.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(RenditionConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<RenditionConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: RenditionConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, falling back to stock defaults when it is absent.
pub fn load_config(path: &Path) -> Result<RenditionConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `rendition.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Rendition Configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# Directory holding the original images. Files named NNN-anything.ext
# (jpg, jpeg, png, gif, webp) are source NNN.
library_dir = "uploads"

# Where generated renditions are written. A .htaccess marker is created
# alongside them.
cache_dir = "uploads/rendition-cache"

# Public URL prefix the cache directory is served under.
base_url = "/uploads/rendition-cache"

# JPEG encoding quality (1 = worst, 100 = best).
jpeg_quality = 82

# Maximum parallel workers for the warm command.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_threads = 4

# ---------------------------------------------------------------------------
# Presets
# ---------------------------------------------------------------------------
# width / height: pixels (150 or "150px"), "auto", or two small ratio terms
#   (width = 16, height = 9 crops the largest 16:9 region of the source).
# height defaults to "auto".
# crop: false (scale to fit), true (centered crop), or an anchor:
#   center, top, bottom, left, right, top-left, top-right,
#   bottom-left, bottom-right

[presets.thumbnail]
width = 150
height = 150
crop = "center"

[presets.medium]
width = 300
height = 300

[presets.medium_large]
width = 768
height = "auto"

[presets.large]
width = 1024
height = 1024
"##
}
