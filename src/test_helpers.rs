//! Shared fixture builders for the unit test suite.
//!
//! Images are synthesized in memory with the `image` encoders so tests never
//! depend on files checked into the repository.
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let source = png_source("clear.png", &rgba_png(8, 8, [0, 0, 0, 0]));
//! let pixels = decode_rgba(&source.bytes);
//! assert_eq!(pixels.dimensions(), (8, 8));
//! ```

use crate::types::SourceImage;
use image::{ExtendedColorType, ImageEncoder, RgbImage, RgbaImage};

// =========================================================================
// Encoded image fixtures
// =========================================================================

/// A PNG filled with one RGBA color.
pub fn rgba_png(width: u32, height: u32, pixel: [u8; 4]) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, image::Rgba(pixel));
    let mut bytes = Vec::new();
    image::codecs::png::PngEncoder::new(&mut bytes)
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgba8)
        .unwrap();
    bytes
}

/// A baseline JPEG filled with one RGB color.
pub fn solid_jpeg(width: u32, height: u32, pixel: [u8; 3]) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, image::Rgb(pixel));
    let mut bytes = Vec::new();
    image::codecs::jpeg::JpegEncoder::new(&mut bytes)
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8)
        .unwrap();
    bytes
}

/// Wrap PNG bytes as a declared `image/png` source.
pub fn png_source(name: &str, bytes: &[u8]) -> SourceImage {
    SourceImage::new(name, "image/png", bytes.to_vec())
}

/// Decode any supported encoding back to RGBA pixels. Panics on failure.
pub fn decode_rgba(bytes: &[u8]) -> RgbaImage {
    image::load_from_memory(bytes)
        .unwrap_or_else(|e| panic!("fixture failed to decode: {e}"))
        .to_rgba8()
}

// =========================================================================
// Raw container fixtures for the byte scanner
// =========================================================================

/// One PNG chunk: length, type, data, and a zeroed CRC (the scanner never
/// checks it).
pub fn png_chunk(kind: &[u8; 4], data: &[u8]) -> Vec<u8> {
    let mut chunk = Vec::with_capacity(12 + data.len());
    chunk.extend_from_slice(&(data.len() as u32).to_be_bytes());
    chunk.extend_from_slice(kind);
    chunk.extend_from_slice(data);
    chunk.extend_from_slice(&[0; 4]);
    chunk
}

/// PNG signature followed by the given chunks.
pub fn png_with_chunks(chunks: &[Vec<u8>]) -> Vec<u8> {
    let mut data = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    for chunk in chunks {
        data.extend_from_slice(chunk);
    }
    data
}

/// A real JPEG with an APP1 `Exif` segment spliced in right after SOI.
pub fn jpeg_with_exif(width: u32, height: u32) -> Vec<u8> {
    let plain = solid_jpeg(width, height, [90, 90, 90]);
    let payload = b"Exif\0\0MM\0\x2a\0\0\0\x08\0\0";
    let mut data = plain[..2].to_vec();
    data.extend_from_slice(&[0xFF, 0xE1]);
    data.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
    data.extend_from_slice(payload);
    data.extend_from_slice(&plain[2..]);
    data
}
