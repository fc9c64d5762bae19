//! End-to-end tests through the public library API with the real backend.
//!
//! Fixtures are encoded in memory with the `image` crate; archives are read
//! back with `zip`.

use image::{ExtendedColorType, ImageEncoder, RgbImage, RgbaImage};
use imgshift::catalog::{EntryStatus, ImageCatalog};
use imgshift::config::{ConverterConfig, load_config};
use imgshift::convert::{BatchError, BatchOptions, Converter};
use imgshift::format::TargetFormat;
use imgshift::imaging::{ConvertParams, RustBackend};
use imgshift::scanner;
use imgshift::types::SourceImage;
use std::io::{Cursor, Read};

fn png(width: u32, height: u32, pixel: [u8; 4]) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, image::Rgba(pixel));
    let mut bytes = Vec::new();
    image::codecs::png::PngEncoder::new(&mut bytes)
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgba8)
        .unwrap();
    bytes
}

fn jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, image::Rgb([120, 60, 30]));
    let mut bytes = Vec::new();
    image::codecs::jpeg::JpegEncoder::new(&mut bytes)
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8)
        .unwrap();
    bytes
}

/// Insert an APP1 Exif segment right after SOI.
fn with_exif(jpeg: &[u8]) -> Vec<u8> {
    let payload = b"Exif\0\0II\x2a\0\x08\0\0\0";
    let mut out = jpeg[..2].to_vec();
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
    out.extend_from_slice(payload);
    out.extend_from_slice(&jpeg[2..]);
    out
}

fn read_archive(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut entries: Vec<(String, Vec<u8>)> = (0..archive.len())
        .map(|i| {
            let mut file = archive.by_index(i).unwrap();
            let mut data = Vec::new();
            file.read_to_end(&mut data).unwrap();
            (file.name().to_string(), data)
        })
        .collect();
    entries.sort();
    entries
}

#[test]
fn transparent_png_to_jpeg_gets_white_background() {
    let converter = Converter::new(RustBackend::new(), BatchOptions::default());
    let source = SourceImage::new("clear.png", "image/png", png(8, 8, [0, 0, 0, 0]));

    let result = converter
        .convert_one(&source, &ConvertParams::new(TargetFormat::Jpeg))
        .unwrap();

    assert_eq!(result.file_name, "clear.jpg");
    assert_eq!(result.mime_type, "image/jpeg");
    let decoded = image::load_from_memory(&result.bytes).unwrap().to_rgb8();
    assert_eq!(decoded.dimensions(), (8, 8));
    assert!(decoded.pixels().all(|p| p.0.iter().all(|&c| c >= 250)));
}

#[test]
fn png_to_webp_keeps_alpha() {
    let converter = Converter::new(RustBackend::new(), BatchOptions::default());
    let source = SourceImage::new("glass.png", "image/png", png(4, 4, [10, 20, 30, 128]));

    let result = converter
        .convert_one(&source, &ConvertParams::new(TargetFormat::Webp))
        .unwrap();

    assert_eq!(result.mime_type, "image/webp");
    let decoded = image::load_from_memory(&result.bytes).unwrap().to_rgba8();
    assert!(decoded.pixels().all(|p| p.0 == [10, 20, 30, 128]));
}

#[test]
fn batch_to_webp_names_entries_and_decodes() {
    let converter = Converter::new(RustBackend::new(), BatchOptions::default());
    let sources = vec![
        SourceImage::new("a.png", "image/png", png(3, 2, [255, 0, 0, 255])),
        SourceImage::new("b.jpg", "image/jpeg", jpeg(5, 7)),
    ];

    let batch = converter
        .convert_many(&sources, &ConvertParams::new(TargetFormat::Webp), None)
        .unwrap();

    assert_eq!(batch.archive.file_name, "converted_images.zip");
    assert_eq!(batch.archive.mime_type, "application/zip");
    let entries = read_archive(&batch.archive.bytes);
    let names: Vec<&str> = entries.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["a.webp", "b.webp"]);

    let a = image::load_from_memory(&entries[0].1).unwrap();
    let b = image::load_from_memory(&entries[1].1).unwrap();
    assert_eq!((a.width(), a.height()), (3, 2));
    assert_eq!((b.width(), b.height()), (5, 7));
}

#[test]
fn batch_with_corrupt_file_writes_nothing() {
    let converter = Converter::new(RustBackend::new(), BatchOptions::default());
    let sources = vec![
        SourceImage::new("ok.png", "image/png", png(2, 2, [0, 0, 0, 255])),
        SourceImage::new("broken.png", "image/png", b"\x89PNG not really".to_vec()),
    ];

    let err = converter
        .convert_many(&sources, &ConvertParams::new(TargetFormat::Png), None)
        .unwrap_err();

    match err {
        BatchError::Item { index, name, .. } => {
            assert_eq!(index, 1);
            assert_eq!(name, "broken.png");
        }
        other => panic!("expected item failure, got {other}"),
    }
}

#[test]
fn conversion_strips_exif() {
    let converter = Converter::new(RustBackend::new(), BatchOptions::default());
    let tagged = with_exif(&jpeg(4, 4));
    assert!(scanner::detect_metadata(&tagged));

    let source = SourceImage::new("tagged.jpg", "image/jpeg", tagged);
    let result = converter
        .convert_one(&source, &ConvertParams::new(TargetFormat::Jpeg))
        .unwrap();

    assert!(!scanner::detect_metadata(&result.bytes));
}

#[test]
fn catalog_inspects_files_from_disk() {
    let tmp = tempfile::TempDir::new().unwrap();
    let tagged = tmp.path().join("tagged.jpg");
    let clear = tmp.path().join("clear.png");
    std::fs::write(&tagged, with_exif(&jpeg(6, 3))).unwrap();
    std::fs::write(&clear, png(2, 9, [0, 0, 0, 0])).unwrap();

    let catalog = ImageCatalog::new(RustBackend::new());
    let summary = catalog.add([
        SourceImage::from_path(&tagged).unwrap(),
        SourceImage::from_path(&clear).unwrap(),
    ]);
    catalog.wait_idle();

    assert!(summary.skipped.is_empty());
    let entries = catalog.list();
    assert_eq!(entries.len(), 2);

    assert_eq!(entries[0].name, "tagged.jpg");
    assert_eq!(entries[0].status, EntryStatus::Ready);
    assert_eq!((entries[0].width, entries[0].height), (6, 3));
    assert!(entries[0].has_metadata);

    assert_eq!(entries[1].mime_type, "image/png");
    assert_eq!(entries[1].has_alpha, Some(true));
    assert!(!entries[1].has_metadata);

    catalog.clear();
    assert_eq!(catalog.handles().live_count(), 0);
}

#[test]
fn config_file_drives_batch_naming() {
    let tmp = tempfile::TempDir::new().unwrap();
    let path = tmp.path().join("imgshift.toml");
    std::fs::write(
        &path,
        "[conversion]\nformat = \"webp\"\n\n[batch]\narchive_name = \"out.zip\"\n",
    )
    .unwrap();

    let config: ConverterConfig = load_config(&path).unwrap();
    let converter = Converter::new(RustBackend::new(), config.batch_options());
    let sources = vec![
        SourceImage::new("x.png", "image/png", png(1, 1, [1, 1, 1, 255])),
        SourceImage::new("x.jpg", "image/jpeg", jpeg(1, 1)),
    ];

    let batch = converter
        .convert_many(&sources, &config.params(config.conversion.format), None)
        .unwrap();

    assert_eq!(batch.archive.file_name, "out.zip");
    let names: Vec<String> = read_archive(&batch.archive.bytes)
        .into_iter()
        .map(|(n, _)| n)
        .collect();
    assert_eq!(names, vec!["x-1.webp", "x.webp"]);
}
