//! Target formats and file-name derivation.
//!
//! Every conversion targets one of three formats. Callers may name a format
//! by bare token (`"webp"`, `"jpeg"`, `"jpg"`) or by full MIME type
//! (`"image/webp"`); both normalize to the same [`TargetFormat`].
//!
//! ## Extension aliasing
//!
//! | Format | MIME type | File extension |
//! |--------|-----------|----------------|
//! | PNG    | `image/png`  | `png` |
//! | JPEG   | `image/jpeg` | `jpg` |
//! | WebP   | `image/webp` | `webp` |
//!
//! JPEG is the only format whose extension differs from its MIME subtype.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("Unknown target format: {0} (expected png, jpeg or webp)")]
    UnknownFormat(String),
    #[error("Invalid background color: {0} (expected #RGB or #RRGGBB)")]
    InvalidColor(String),
    #[error("Invalid quality: {0} (expected a number between 0.0 and 1.0)")]
    InvalidQuality(String),
}

/// A raster format the converter can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    Png,
    Jpeg,
    Webp,
}

impl TargetFormat {
    pub const ALL: [TargetFormat; 3] = [TargetFormat::Png, TargetFormat::Jpeg, TargetFormat::Webp];

    pub fn mime_type(self) -> &'static str {
        match self {
            TargetFormat::Png => "image/png",
            TargetFormat::Jpeg => "image/jpeg",
            TargetFormat::Webp => "image/webp",
        }
    }

    /// Canonical file extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            TargetFormat::Png => "png",
            TargetFormat::Jpeg => "jpg",
            TargetFormat::Webp => "webp",
        }
    }

    /// Whether the format can carry an alpha channel.
    pub fn supports_alpha(self) -> bool {
        !matches!(self, TargetFormat::Jpeg)
    }

    /// Whether the encoder honours a quality setting.
    pub fn supports_quality(self) -> bool {
        matches!(self, TargetFormat::Jpeg)
    }

    /// Look up a format by full MIME type (`image/png`).
    pub fn from_mime(mime: &str) -> Option<Self> {
        let subtype = mime.trim().to_ascii_lowercase();
        let subtype = subtype.strip_prefix("image/")?;
        Self::from_token(subtype)
    }

    /// Look up a format by file extension, with or without a leading dot.
    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::from_token(&ext.trim_start_matches('.').to_ascii_lowercase())
    }

    fn from_token(token: &str) -> Option<Self> {
        match token {
            "png" => Some(TargetFormat::Png),
            "jpeg" | "jpg" => Some(TargetFormat::Jpeg),
            "webp" => Some(TargetFormat::Webp),
            _ => None,
        }
    }

    pub(crate) fn image_format(self) -> image::ImageFormat {
        match self {
            TargetFormat::Png => image::ImageFormat::Png,
            TargetFormat::Jpeg => image::ImageFormat::Jpeg,
            TargetFormat::Webp => image::ImageFormat::WebP,
        }
    }
}

impl FromStr for TargetFormat {
    type Err = FormatError;

    /// Accepts a bare token or a full MIME type, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        let parsed = if lowered.contains('/') {
            Self::from_mime(&lowered)
        } else {
            Self::from_token(&lowered)
        };
        parsed.ok_or_else(|| FormatError::UnknownFormat(s.to_string()))
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}

/// Split a file name into `(base, extension)` at the last dot.
///
/// A leading dot does not start an extension: `.hidden` has no extension.
pub fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(pos) if pos > 0 => (&name[..pos], Some(&name[pos + 1..])),
        _ => (name, None),
    }
}

/// Output file name for a converted source: base name plus the target's
/// canonical extension.
///
/// ```
/// use imgshift::format::{derived_file_name, TargetFormat};
/// assert_eq!(derived_file_name("a.png", TargetFormat::Webp), "a.webp");
/// assert_eq!(derived_file_name("photo.final.png", TargetFormat::Jpeg), "photo.final.jpg");
/// ```
pub fn derived_file_name(source_name: &str, format: TargetFormat) -> String {
    let (base, _) = split_extension(source_name);
    format!("{}.{}", base, format.extension())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_tokens_and_mime_types_normalize() {
        assert_eq!("png".parse::<TargetFormat>().unwrap(), TargetFormat::Png);
        assert_eq!("image/png".parse::<TargetFormat>().unwrap(), TargetFormat::Png);
        assert_eq!("JPEG".parse::<TargetFormat>().unwrap(), TargetFormat::Jpeg);
        assert_eq!("jpg".parse::<TargetFormat>().unwrap(), TargetFormat::Jpeg);
        assert_eq!(" image/webp ".parse::<TargetFormat>().unwrap(), TargetFormat::Webp);
    }

    #[test]
    fn unknown_format_is_rejected() {
        assert_eq!(
            "gif".parse::<TargetFormat>(),
            Err(FormatError::UnknownFormat("gif".into()))
        );
        assert!("video/webp".parse::<TargetFormat>().is_err());
        assert!("image/".parse::<TargetFormat>().is_err());
    }

    #[test]
    fn jpeg_extension_is_jpg() {
        assert_eq!(TargetFormat::Jpeg.extension(), "jpg");
        assert_eq!(TargetFormat::Jpeg.mime_type(), "image/jpeg");
        assert_eq!(derived_file_name("photo.png", TargetFormat::Jpeg), "photo.jpg");
    }

    #[test]
    fn other_extensions_match_mime_subtype() {
        for format in [TargetFormat::Png, TargetFormat::Webp] {
            let subtype = format.mime_type().strip_prefix("image/").unwrap();
            assert_eq!(format.extension(), subtype);
        }
    }

    #[test]
    fn derived_name_replaces_only_last_extension() {
        assert_eq!(derived_file_name("a.png", TargetFormat::Webp), "a.webp");
        assert_eq!(derived_file_name("b.jpg", TargetFormat::Webp), "b.webp");
        assert_eq!(derived_file_name("x.tar.png", TargetFormat::Png), "x.tar.png");
    }

    #[test]
    fn derived_name_without_extension_appends() {
        assert_eq!(derived_file_name("noext", TargetFormat::Png), "noext.png");
        assert_eq!(derived_file_name(".hidden", TargetFormat::Webp), ".hidden.webp");
    }

    #[test]
    fn from_extension_accepts_dot_prefix() {
        assert_eq!(TargetFormat::from_extension(".JPG"), Some(TargetFormat::Jpeg));
        assert_eq!(TargetFormat::from_extension("tiff"), None);
    }

    #[test]
    fn alpha_and_quality_capabilities() {
        assert!(!TargetFormat::Jpeg.supports_alpha());
        assert!(TargetFormat::Png.supports_alpha());
        assert!(TargetFormat::Webp.supports_alpha());
        assert!(TargetFormat::Jpeg.supports_quality());
        assert!(!TargetFormat::Png.supports_quality());
    }
}
