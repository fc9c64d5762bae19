//! Pure Rust codec backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Sniff format | `image::ImageReader::with_guessed_format` |
//! | Identify | `ImageReader::into_dimensions` (header only) |
//! | Decode (JPEG, PNG, WebP) | `image` crate decoders |
//! | Composite | [`compositor::composite`](super::compositor::composite) |
//! | Encode → PNG / JPEG / WebP | `PngEncoder`, `JpegEncoder`, `WebPEncoder` (lossless) |
//!
//! Each decode holds one temporary [`DisplayHandle`](crate::handles::DisplayHandle)
//! from the backend's registry for its duration; the guard is dropped on every
//! exit path.

use super::backend::{ConvertError, Dimensions, EncodedImage, ImageBackend};
use super::compositor;
use super::params::ConvertParams;
use crate::handles::HandleRegistry;
use crate::types::SourceImage;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;

/// Input formats with decoders compiled in.
const SUPPORTED_INPUTS: &[ImageFormat] = &[ImageFormat::Png, ImageFormat::Jpeg, ImageFormat::WebP];

/// Default decode ceiling: 100 megapixels.
pub const DEFAULT_MAX_PIXELS: u64 = 100_000_000;

/// Backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
#[derive(Debug, Clone)]
pub struct RustBackend {
    handles: HandleRegistry,
    max_pixels: u64,
}

impl RustBackend {
    pub fn new() -> Self {
        Self::with_handles(HandleRegistry::new())
    }

    /// Share a handle registry with the caller, so temporary decode handles
    /// are visible alongside catalog previews.
    pub fn with_handles(handles: HandleRegistry) -> Self {
        Self {
            handles,
            max_pixels: DEFAULT_MAX_PIXELS,
        }
    }

    /// Reject sources larger than `max_pixels` before full decode.
    pub fn with_max_pixels(mut self, max_pixels: u64) -> Self {
        self.max_pixels = max_pixels;
        self
    }

    pub fn handles(&self) -> &HandleRegistry {
        &self.handles
    }

    /// Sniff the container format from the leading bytes.
    fn sniff(&self, source: &SourceImage) -> Result<ImageFormat, ConvertError> {
        let reader = ImageReader::new(Cursor::new(&source.bytes[..]))
            .with_guessed_format()
            .map_err(|e| ConvertError::decode(&source.name, e))?;
        let format = reader
            .format()
            .ok_or_else(|| ConvertError::decode(&source.name, "unrecognized image format"))?;
        if !SUPPORTED_INPUTS.contains(&format) {
            return Err(ConvertError::decode(
                &source.name,
                format!("unsupported source format {format:?}"),
            ));
        }
        Ok(format)
    }

    fn header_dimensions(
        &self,
        source: &SourceImage,
        format: ImageFormat,
    ) -> Result<Dimensions, ConvertError> {
        let (width, height) = ImageReader::with_format(Cursor::new(&source.bytes[..]), format)
            .into_dimensions()
            .map_err(|e| ConvertError::decode(&source.name, e))?;
        Ok(Dimensions { width, height })
    }

    /// Full decode, guarded by a temporary handle and the pixel ceiling.
    fn decode(&self, source: &SourceImage) -> Result<DynamicImage, ConvertError> {
        let _handle = self.handles.acquire(format!("decode:{}", source.name));
        let format = self.sniff(source)?;

        let dims = self.header_dimensions(source, format)?;
        let pixels = dims.width as u64 * dims.height as u64;
        if pixels > self.max_pixels {
            return Err(ConvertError::decode(
                &source.name,
                format!(
                    "{}x{} exceeds the {} pixel limit",
                    dims.width, dims.height, self.max_pixels
                ),
            ));
        }

        ImageReader::with_format(Cursor::new(&source.bytes[..]), format)
            .decode()
            .map_err(|e| ConvertError::decode(&source.name, e))
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageBackend for RustBackend {
    fn identify(&self, source: &SourceImage) -> Result<Dimensions, ConvertError> {
        let _handle = self.handles.acquire(format!("identify:{}", source.name));
        let format = self.sniff(source)?;
        self.header_dimensions(source, format)
    }

    fn convert(
        &self,
        source: &SourceImage,
        params: &ConvertParams,
    ) -> Result<EncodedImage, ConvertError> {
        let decoded = self.decode(source)?;
        let fill = compositor::fill_for(params.format, params.background);
        let surface = compositor::composite(&decoded, fill);
        let encoded = compositor::encode(&surface, params.format, params.quality, &source.name)?;
        log::debug!(
            "converted {} ({}x{}) → {} ({} bytes)",
            source.name,
            surface.width(),
            surface.height(),
            encoded.format,
            encoded.bytes.len()
        );
        Ok(encoded)
    }

    fn has_alpha(&self, source: &SourceImage) -> Result<bool, ConvertError> {
        // JPEG cannot carry alpha; skip the decode.
        if source.declared_mime == "image/jpeg" || self.sniff(source)? == ImageFormat::Jpeg {
            return Ok(false);
        }
        let decoded = self.decode(source)?;
        if !decoded.color().has_alpha() {
            return Ok(false);
        }
        Ok(decoded.to_rgba8().pixels().any(|p| p[3] < 255))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::TargetFormat;
    use crate::imaging::params::{BackgroundColor, Quality};
    use crate::test_helpers::{decode_rgba, png_source, rgba_png, solid_jpeg};
    use image::Rgba;

    fn jpeg_source(name: &str, width: u32, height: u32) -> SourceImage {
        SourceImage::new(name, "image/jpeg", solid_jpeg(width, height, [40, 80, 120]))
    }

    #[test]
    fn identify_synthetic_jpeg() {
        let backend = RustBackend::new();
        let dims = backend.identify(&jpeg_source("a.jpg", 200, 150)).unwrap();
        assert_eq!(dims, Dimensions { width: 200, height: 150 });
        assert_eq!(backend.handles().live_count(), 0);
    }

    #[test]
    fn identify_garbage_is_decode_error() {
        let backend = RustBackend::new();
        let source = SourceImage::new("junk.png", "image/png", b"not an image".to_vec());
        let err = backend.identify(&source).unwrap_err();
        assert!(err.is_decode());
        assert_eq!(backend.handles().live_count(), 0);
    }

    #[test]
    fn convert_releases_handle_on_success_and_failure() {
        let backend = RustBackend::new();
        let good = png_source("ok.png", &rgba_png(2, 2, [0, 0, 0, 255]));
        let bad = SourceImage::new("bad.png", "image/png", vec![0x89, b'P', b'N', b'G']);
        let params = ConvertParams::new(TargetFormat::Png);

        backend.convert(&good, &params).unwrap();
        assert!(backend.convert(&bad, &params).unwrap_err().is_decode());
        assert_eq!(backend.handles().live_count(), 0);
    }

    #[test]
    fn convert_keeps_native_dimensions() {
        let backend = RustBackend::new();
        let source = jpeg_source("wide.jpg", 64, 16);
        for format in TargetFormat::ALL {
            let out = backend.convert(&source, &ConvertParams::new(format)).unwrap();
            assert_eq!(out.format, format);
            assert_eq!(decode_rgba(&out.bytes).dimensions(), (64, 16));
        }
    }

    #[test]
    fn transparent_to_jpeg_defaults_white() {
        let backend = RustBackend::new();
        let source = png_source("clear.png", &rgba_png(8, 8, [0, 0, 0, 0]));
        let out = backend
            .convert(&source, &ConvertParams::new(TargetFormat::Jpeg))
            .unwrap();
        let px = *decode_rgba(&out.bytes).get_pixel(0, 0);
        for channel in 0..3 {
            assert!(px[channel] >= 253, "expected white, got {px:?}");
        }
    }

    #[test]
    fn transparent_to_jpeg_uses_explicit_background() {
        let backend = RustBackend::new();
        let source = png_source("clear.png", &rgba_png(8, 8, [0, 0, 0, 0]));
        let params = ConvertParams::new(TargetFormat::Jpeg)
            .with_background(Some("#112233".parse().unwrap()))
            .with_quality(Quality::new(1.0));
        let out = backend.convert(&source, &params).unwrap();
        let px = *decode_rgba(&out.bytes).get_pixel(0, 0);
        for (got, want) in px.0[..3].iter().zip([17u8, 34, 51]) {
            assert!(got.abs_diff(want) <= 3, "expected ~(17,34,51), got {px:?}");
        }
    }

    #[test]
    fn transparent_to_jpeg_explicit_background_at_default_quality() {
        let backend = RustBackend::new();
        let source = png_source("clear.png", &rgba_png(8, 8, [0, 0, 0, 0]));
        let params = ConvertParams::new(TargetFormat::Jpeg)
            .with_background(Some("#112233".parse().unwrap()));
        assert_eq!(params.quality, Quality::default());
        let out = backend.convert(&source, &params).unwrap();
        let px = *decode_rgba(&out.bytes).get_pixel(0, 0);
        for (got, want) in px.0[..3].iter().zip([17u8, 34, 51]) {
            assert!(got.abs_diff(want) <= 3, "expected ~(17,34,51), got {px:?}");
        }
    }

    #[test]
    fn half_transparent_to_webp_keeps_alpha() {
        let backend = RustBackend::new();
        let source = png_source("half.png", &rgba_png(4, 4, [200, 100, 50, 128]));
        let out = backend
            .convert(&source, &ConvertParams::new(TargetFormat::Webp))
            .unwrap();
        let alpha = decode_rgba(&out.bytes).get_pixel(0, 0)[3];
        assert!(alpha > 0 && alpha < 255, "alpha {alpha} should be partial");
    }

    #[test]
    fn explicit_background_flattens_png() {
        let backend = RustBackend::new();
        let source = png_source("clear.png", &rgba_png(2, 2, [0, 0, 0, 0]));
        let params = ConvertParams::new(TargetFormat::Png).with_background(Some(BackgroundColor {
            r: 17,
            g: 34,
            b: 51,
        }));
        let out = backend.convert(&source, &params).unwrap();
        assert_eq!(*decode_rgba(&out.bytes).get_pixel(1, 1), Rgba([17, 34, 51, 255]));
    }

    #[test]
    fn png_round_trip_is_deterministic() {
        let backend = RustBackend::new();
        let source = png_source("opaque.png", &rgba_png(5, 5, [9, 8, 7, 255]));
        let params = ConvertParams::new(TargetFormat::Png);
        let first = backend.convert(&source, &params).unwrap();
        let second = backend.convert(&source, &params).unwrap();
        assert_eq!(first.bytes, second.bytes);
    }

    #[test]
    fn pixel_limit_rejects_before_decode() {
        let backend = RustBackend::new().with_max_pixels(10);
        let source = png_source("big.png", &rgba_png(4, 4, [0, 0, 0, 255]));
        let err = backend
            .convert(&source, &ConvertParams::new(TargetFormat::Png))
            .unwrap_err();
        assert!(err.to_string().contains("pixel limit"));
        assert_eq!(backend.handles().live_count(), 0);
    }

    #[test]
    fn has_alpha_detects_translucency() {
        let backend = RustBackend::new();
        let clear = png_source("clear.png", &rgba_png(2, 2, [0, 0, 0, 10]));
        let opaque = png_source("opaque.png", &rgba_png(2, 2, [0, 0, 0, 255]));
        assert!(backend.has_alpha(&clear).unwrap());
        assert!(!backend.has_alpha(&opaque).unwrap());
        assert!(!backend.has_alpha(&jpeg_source("a.jpg", 4, 4)).unwrap());
    }

    #[test]
    fn gif_source_is_unsupported() {
        let backend = RustBackend::new();
        let source = SourceImage::new("anim.gif", "image/gif", b"GIF89a\x01\x00\x01\x00".to_vec());
        assert!(backend.identify(&source).unwrap_err().is_decode());
    }
}
