//! Parameter types for conversions.
//!
//! These structs describe *what* to produce, not *how*. They are the interface
//! between the orchestrator (which decides what to convert) and the
//! [`backend`](super::backend) (which does the pixel work), so a mock backend
//! can stand in during tests.
//!
//! ## Types
//!
//! - [`Quality`]: encoder quality in `[0, 1]`, default `0.92`. Clamped on construction.
//! - [`BackgroundColor`]: opaque RGB fill, parsed from `#RGB` / `#RRGGBB`.
//! - [`ConvertParams`]: target format, optional background, quality.

use crate::format::{FormatError, TargetFormat};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Encoder quality in `[0, 1]`. Ignored by formats without a quality knob.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quality(f32);

impl Quality {
    pub const DEFAULT: f32 = 0.92;

    /// Clamp into `[0, 1]`. NaN falls back to the default.
    pub fn new(value: f32) -> Self {
        if value.is_nan() {
            return Self::default();
        }
        Self(value.clamp(0.0, 1.0))
    }

    /// Accept only values already in `[0, 1]`; NaN is rejected.
    pub fn checked(value: f32) -> Result<Self, FormatError> {
        if (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(FormatError::InvalidQuality(value.to_string()))
        }
    }

    pub fn value(self) -> f32 {
        self.0
    }

    /// Integer percentage for the JPEG encoder (1-100).
    pub fn to_percent(self) -> u8 {
        (self.0 * 100.0).round().clamp(1.0, 100.0) as u8
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

/// Opaque RGB fill color painted beneath the source pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BackgroundColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl BackgroundColor {
    pub const WHITE: BackgroundColor = BackgroundColor {
        r: 255,
        g: 255,
        b: 255,
    };

    pub fn rgba(self) -> image::Rgba<u8> {
        image::Rgba([self.r, self.g, self.b, 255])
    }
}

impl FromStr for BackgroundColor {
    type Err = FormatError;

    /// Parse `#RGB` or `#RRGGBB`; the `#` is optional, hex is case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || FormatError::InvalidColor(s.to_string());
        let hex = s.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |digits: &str| u8::from_str_radix(digits, 16).map_err(|_| invalid());
        match hex.len() {
            3 => {
                let expand = |i: usize| channel(&hex[i..=i].repeat(2));
                Ok(Self {
                    r: expand(0)?,
                    g: expand(1)?,
                    b: expand(2)?,
                })
            }
            6 => Ok(Self {
                r: channel(&hex[0..2])?,
                g: channel(&hex[2..4])?,
                b: channel(&hex[4..6])?,
            }),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for BackgroundColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Serialize for BackgroundColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BackgroundColor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Full specification for one conversion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvertParams {
    pub format: TargetFormat,
    pub background: Option<BackgroundColor>,
    pub quality: Quality,
}

impl ConvertParams {
    pub fn new(format: TargetFormat) -> Self {
        Self {
            format,
            background: None,
            quality: Quality::default(),
        }
    }

    pub fn with_background(mut self, background: Option<BackgroundColor>) -> Self {
        self.background = background;
        self
    }

    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }
}
