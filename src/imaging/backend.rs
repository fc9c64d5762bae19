//! Image backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the three operations the rest of the
//! crate needs from a codec stack: identify, convert, and an alpha probe.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate. Tests substitute a recording mock.

use super::params::ConvertParams;
use crate::format::TargetFormat;
use crate::types::SourceImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode {name}: {reason}")]
    Decode { name: String, reason: String },
    #[error("Failed to encode {name} as {format}: {reason}")]
    Encode {
        name: String,
        format: TargetFormat,
        reason: String,
    },
}

impl ConvertError {
    pub fn decode(name: &str, reason: impl ToString) -> Self {
        ConvertError::Decode {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn encode(name: &str, format: TargetFormat, reason: impl ToString) -> Self {
        ConvertError::Encode {
            name: name.to_string(),
            format,
            reason: reason.to_string(),
        }
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, ConvertError::Decode { .. })
    }

    pub fn is_encode(&self) -> bool {
        matches!(self, ConvertError::Encode { .. })
    }
}

/// Pixel dimensions reported by the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Encoder output, tagged with the format actually produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub format: TargetFormat,
}

/// Trait for codec backends.
///
/// Implementations must be `Sync` so batch conversion can fan out across a
/// rayon pool with a shared backend reference.
pub trait ImageBackend: Sync {
    /// Decode just enough to report pixel dimensions.
    fn identify(&self, source: &SourceImage) -> Result<Dimensions, ConvertError>;

    /// Decode, composite onto a native-size surface, and re-encode.
    fn convert(
        &self,
        source: &SourceImage,
        params: &ConvertParams,
    ) -> Result<EncodedImage, ConvertError>;

    /// Whether any pixel is less than fully opaque.
    fn has_alpha(&self, source: &SourceImage) -> Result<bool, ConvertError>;
}
