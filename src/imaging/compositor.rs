//! Raster compositing and encoding.
//!
//! Pure pixel functions used by the backend. Everything here works on
//! in-memory buffers; decoding and handle bookkeeping live in
//! [`rust_backend`](super::rust_backend).
//!
//! A conversion always goes through a surface the exact size of the decoded
//! image:
//!
//! ```text
//! decoded ──▶ surface (w × h) ──▶ fill? ──▶ draw source over ──▶ encode
//! ```
//!
//! Metadata never survives this path; only pixels are carried forward.

use super::backend::{ConvertError, EncodedImage};
use super::params::{BackgroundColor, Quality};
use crate::format::TargetFormat;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, Rgba, RgbaImage};

/// Decide what, if anything, to paint beneath the source pixels.
///
/// - explicit background → that color
/// - JPEG target without background → opaque white (JPEG has no alpha)
/// - otherwise → nothing; transparency is preserved
pub fn fill_for(format: TargetFormat, background: Option<BackgroundColor>) -> Option<Rgba<u8>> {
    match background {
        Some(color) => Some(color.rgba()),
        None if !format.supports_alpha() => Some(BackgroundColor::WHITE.rgba()),
        None => None,
    }
}

/// Draw `image` at the origin of a native-size surface, over an optional
/// opaque fill.
pub fn composite(image: &DynamicImage, fill: Option<Rgba<u8>>) -> RgbaImage {
    let source = image.to_rgba8();
    let Some(fill) = fill else {
        return source;
    };
    let mut surface = RgbaImage::from_pixel(source.width(), source.height(), fill);
    for (dst, src) in surface.pixels_mut().zip(source.pixels()) {
        *dst = blend_over_opaque(*dst, *src);
    }
    surface
}

/// Source-over blend onto an opaque destination, in integer arithmetic so
/// fully transparent and fully opaque pixels are reproduced exactly.
fn blend_over_opaque(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    let a = src[3] as u32;
    let mix = |s: u8, d: u8| ((s as u32 * a + d as u32 * (255 - a) + 127) / 255) as u8;
    Rgba([mix(src[0], dst[0]), mix(src[1], dst[1]), mix(src[2], dst[2]), 255])
}

/// Encode a surface to `format`.
///
/// `quality` is honoured by JPEG only. The WebP encoder is lossless, so
/// alpha and pixel values survive exactly.
pub fn encode(
    surface: &RgbaImage,
    format: TargetFormat,
    quality: Quality,
    name: &str,
) -> Result<EncodedImage, ConvertError> {
    let (width, height) = surface.dimensions();
    let mut bytes = Vec::new();
    let result = match format {
        TargetFormat::Png => PngEncoder::new(&mut bytes).write_image(
            surface.as_raw(),
            width,
            height,
            ExtendedColorType::Rgba8,
        ),
        TargetFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgba8(surface.clone()).to_rgb8();
            JpegEncoder::new_with_quality(&mut bytes, quality.to_percent()).write_image(
                rgb.as_raw(),
                width,
                height,
                ExtendedColorType::Rgb8,
            )
        }
        TargetFormat::Webp => WebPEncoder::new_lossless(&mut bytes).write_image(
            surface.as_raw(),
            width,
            height,
            ExtendedColorType::Rgba8,
        ),
    };
    result.map_err(|e| ConvertError::encode(name, format, e))?;

    if bytes.is_empty() {
        return Err(ConvertError::encode(name, format, "encoder produced no data"));
    }
    Ok(EncodedImage { bytes, format })
}
