//! Converter configuration.
//!
//! Settings are read from `imgshift.toml` in the working directory (or the
//! file passed with `--config`). Every key is optional: the file is merged
//! on top of the stock defaults, then deserialized and validated. Command
//! line flags override whatever the file says.
//!
//! ## Configuration Options
//!
//! ```toml
//! [conversion]
//! format = "png"            # png | jpeg | webp
//! quality = 0.92            # 0.0-1.0, used by JPEG only
//! # background = "#ffffff"  # Fill behind transparent pixels (unset = auto)
//!
//! [batch]
//! # max_in_flight = 4       # Parallel conversions (omit for auto = CPU cores)
//! disambiguate_names = true # a.webp, a-1.webp, ... instead of overwriting
//! archive_name = "converted_images.zip"
//!
//! [limits]
//! max_pixels = 100000000    # Refuse to decode anything larger
//! scan_window = 65536       # Bytes scanned for EXIF metadata
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::archive::NameCollision;
use crate::convert::{BatchOptions, DEFAULT_ARCHIVE_NAME};
use crate::format::TargetFormat;
use crate::imaging::rust_backend::DEFAULT_MAX_PIXELS;
use crate::imaging::{BackgroundColor, ConvertParams, Quality};
use crate::scanner::SCAN_WINDOW;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Config file looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "imgshift.toml";

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

/// Full converter configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConverterConfig {
    /// What to produce.
    pub conversion: ConversionConfig,
    /// Batch behaviour.
    pub batch: BatchConfig,
    /// Resource limits.
    pub limits: LimitsConfig,
}

impl ConverterConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Quality::checked(self.conversion.quality)
            .map_err(|e| ConfigError::Validation(format!("conversion.quality: {e}")))?;
        if self.batch.max_in_flight == Some(0) {
            return Err(ConfigError::Validation(
                "batch.max_in_flight must be at least 1".into(),
            ));
        }
        if self.batch.archive_name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "batch.archive_name must not be empty".into(),
            ));
        }
        if self.limits.max_pixels == 0 {
            return Err(ConfigError::Validation(
                "limits.max_pixels must be non-zero".into(),
            ));
        }
        if self.limits.scan_window < 8 {
            return Err(ConfigError::Validation(
                "limits.scan_window must be at least 8 bytes".into(),
            ));
        }
        Ok(())
    }

    /// Conversion parameters for `format`, using the configured background
    /// and quality.
    pub fn params(&self, format: TargetFormat) -> ConvertParams {
        ConvertParams::new(format)
            .with_background(self.conversion.background)
            .with_quality(Quality::new(self.conversion.quality))
    }

    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            collision: if self.batch.disambiguate_names {
                NameCollision::Suffix
            } else {
                NameCollision::Overwrite
            },
            archive_name: self.batch.archive_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConversionConfig {
    pub format: TargetFormat,
    /// Encoder quality in `[0, 1]`. Ignored by PNG and WebP.
    pub quality: f32,
    /// Fill color behind transparent pixels. Unset means white for JPEG and
    /// no fill otherwise.
    pub background: Option<BackgroundColor>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            format: TargetFormat::Png,
            quality: Quality::DEFAULT,
            background: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchConfig {
    /// Maximum number of conversions running at once.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_in_flight: Option<usize>,
    /// Give duplicate archive names a numeric suffix instead of letting the
    /// last one win.
    pub disambiguate_names: bool,
    pub archive_name: String,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_in_flight: None,
            disambiguate_names: true,
            archive_name: DEFAULT_ARCHIVE_NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    /// Largest image (width × height) that will be decoded.
    pub max_pixels: u64,
    /// Leading bytes examined by the metadata scanner.
    pub scan_window: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_pixels: DEFAULT_MAX_PIXELS,
            scan_window: SCAN_WINDOW,
        }
    }
}

/// Resolve the effective worker count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &BatchConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_in_flight.map(|n| n.min(cores)).unwrap_or(cores)
}

/// The stock defaults as a `toml::Value::Table`, the base layer for merging.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(ConverterConfig::default())?)
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

/// Read a config file as a raw TOML value. `Ok(None)` if it does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto the stock defaults, deserialize and validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<ConverterConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ConverterConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, falling back to defaults when the file is absent.
pub fn load_config(path: &Path) -> Result<ConverterConfig, ConfigError> {
    let overlay = load_raw_config(path)?;
    if overlay.is_some() {
        log::debug!("loaded config from {}", path.display());
    }
    resolve_config(overlay)
}

/// A fully-commented stock `imgshift.toml` with every key and its default.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# imgshift configuration
# ======================
# All settings are optional. Values shown below are the defaults.
# Command line flags override anything set here.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Conversion
# ---------------------------------------------------------------------------
[conversion]
# Target format when --to is not given: "png", "jpeg" or "webp".
format = "png"

# Encoder quality from 0.0 (smallest) to 1.0 (best).
# Only JPEG uses it; PNG and WebP output is lossless.
quality = 0.92

# Color painted behind transparent pixels, as #RGB or #RRGGBB.
# When unset, JPEG output gets white and PNG/WebP keep their transparency.
# background = "#ffffff"

# ---------------------------------------------------------------------------
# Batch conversion
# ---------------------------------------------------------------------------
[batch]
# Maximum conversions running in parallel.
# Omit to use all CPU cores. Values above the core count are clamped down.
# max_in_flight = 4

# When two files would get the same name inside the archive
# (photo.png and photo.jpg both become photo.webp), append -1, -2, ...
# Set to false to let the last one overwrite the others.
disambiguate_names = true

# File name of the zip written by `imgshift batch` when -o is not given.
archive_name = "converted_images.zip"

# ---------------------------------------------------------------------------
# Limits
# ---------------------------------------------------------------------------
[limits]
# Images with more pixels than this (width x height) are refused before
# decoding.
max_pixels = 100000000

# How many leading bytes of each file are searched for EXIF metadata.
scan_window = 65536
"##
}
