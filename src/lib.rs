//! # imgshift
//!
//! Convert images between PNG, JPEG and WebP, one at a time or in batches
//! packed into a zip archive, and inspect them (size, dimensions, alpha,
//! embedded EXIF metadata).
//!
//! # Architecture
//!
//! ```text
//!                 ┌──────────────┐
//!   SourceImage ─▶│  Converter   │─▶ ConversionResult / BatchResult (zip)
//!                 └──────┬───────┘
//!                        │ ImageBackend
//!                 ┌──────▼───────┐
//!                 │ RustBackend  │  decode → composite → encode
//!                 └──────────────┘
//!
//!                 ┌──────────────┐
//!   SourceImage ─▶│ ImageCatalog │─▶ EntryView (dimensions, alpha, metadata)
//!                 └──────────────┘
//!                   uses the backend's prober and the byte scanner
//! ```
//!
//! Conversion is a pure function of input bytes and parameters. Nothing is
//! cached and nothing is retried; running the same conversion twice yields
//! the same bytes.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`convert`] | Single and batch conversion, progress events |
//! | [`imaging`] | Backend trait, pure-Rust backend, compositing and encoding |
//! | [`catalog`] | Ordered image list with asynchronously derived details |
//! | [`scanner`] | EXIF presence check over the leading bytes of JPEG/PNG |
//! | [`archive`] | Zip assembly and archive entry naming |
//! | [`format`] | Target formats, MIME types, extensions, derived file names |
//! | [`handles`] | Scoped display handles released on drop |
//! | [`config`] | `imgshift.toml` loading, validation and merging |
//! | [`types`] | [`SourceImage`](types::SourceImage), the shared input type |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Re-rasterize Everything
//!
//! Every conversion decodes to raw RGBA and encodes from scratch at the
//! native size. There is no metadata-preserving fast path, so EXIF and other
//! ancillary data are always dropped. The only knobs are the target format,
//! an optional background fill and the encoder quality.
//!
//! ## Background Fill
//!
//! An explicit background is painted under the whole image. Without one,
//! JPEG gets white (it cannot store transparency) and PNG/WebP keep their
//! alpha channel untouched.
//!
//! ## All-or-Nothing Batches
//!
//! A batch either produces one archive containing every converted file or
//! fails, naming the first failing file in submission order. Duplicate
//! output names get a numeric suffix (`a.webp`, `a-1.webp`) unless configured
//! to overwrite.
//!
//! ## Pure-Rust Codecs
//!
//! Decoding and encoding use the `image` crate only. The binary needs no
//! system libraries. The pure-Rust WebP encoder is lossless, so quality only
//! affects JPEG.

pub mod archive;
pub mod catalog;
pub mod config;
pub mod convert;
pub mod format;
pub mod handles;
pub mod imaging;
pub mod output;
pub mod scanner;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
