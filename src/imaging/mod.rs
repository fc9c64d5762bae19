//! Image conversion in pure Rust, no system codecs.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::ImageReader::into_dimensions` |
//! | **Decode** | `image` crate (PNG, JPEG, WebP) |
//! | **Composite** | integer source-over blend onto an optional fill |
//! | **Encode** | `PngEncoder`, `JpegEncoder`, lossless `WebPEncoder` |
//!
//! The module is split into:
//! - **Parameters**: what to produce (format, background, quality)
//! - **Compositor**: pure pixel functions (fill policy, blend, encode)
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: backend calls plus output invariants

pub mod backend;
pub mod compositor;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{ConvertError, Dimensions, EncodedImage, ImageBackend};
pub use operations::{convert_image, get_dimensions, has_alpha};
pub use params::{BackgroundColor, ConvertParams, Quality};
pub use rust_backend::RustBackend;
