//! High-level image operations.
//!
//! Thin wrappers that call the backend and enforce the output invariants
//! every backend must honour, so the orchestrator never sees an empty
//! encode.

use super::backend::{ConvertError, Dimensions, EncodedImage, ImageBackend};
use super::params::ConvertParams;
use crate::types::SourceImage;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, ConvertError>;

/// Probe pixel dimensions.
pub fn get_dimensions(backend: &impl ImageBackend, source: &SourceImage) -> Result<Dimensions> {
    backend.identify(source)
}

/// Whether any pixel is translucent.
pub fn has_alpha(backend: &impl ImageBackend, source: &SourceImage) -> Result<bool> {
    backend.has_alpha(source)
}

/// Convert one source. A zero-byte encoder result is an encode failure.
pub fn convert_image(
    backend: &impl ImageBackend,
    source: &SourceImage,
    params: &ConvertParams,
) -> Result<EncodedImage> {
    let encoded = backend.convert(source, params)?;
    if encoded.bytes.is_empty() {
        return Err(ConvertError::encode(
            &source.name,
            params.format,
            "encoder produced no data",
        ));
    }
    Ok(encoded)
}
