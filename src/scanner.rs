//! Binary signature scan for embedded EXIF metadata.
//!
//! This is not a metadata parser. It walks the container structure of a JPEG
//! or PNG just far enough to answer one question: does the file carry an
//! EXIF block?
//!
//! - **JPEG**: an APP1 segment (`FF E1`) anywhere before the start of scan.
//! - **PNG**: an `eXIf` chunk anywhere before `IEND`.
//!
//! Only the first [`SCAN_WINDOW`] bytes are examined. Text chunks (`tEXt`,
//! `iTXt`, `zTXt`) and JPEG comment segments do not count as metadata.
//!
//! The answer is advisory: truncated input, malformed lengths, unknown
//! containers and read failures all resolve to `false`.

use std::io::Read;

/// Number of leading bytes inspected by [`detect_metadata_in_reader`].
pub const SCAN_WINDOW: usize = 64 * 1024;

const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];
const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

const JPEG_APP1: u8 = 0xE1;
const JPEG_SOS: u8 = 0xDA;
const JPEG_EOI: u8 = 0xD9;

const PNG_EXIF: &[u8; 4] = b"eXIf";
const PNG_IEND: &[u8; 4] = b"IEND";

/// Container type recognized from the leading signature bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    Jpeg,
    Png,
}

/// Classify a byte prefix by its magic number.
pub fn classify(bytes: &[u8]) -> Option<Container> {
    if bytes.starts_with(&JPEG_SOI) {
        Some(Container::Jpeg)
    } else if bytes.starts_with(&PNG_SIGNATURE) {
        Some(Container::Png)
    } else {
        None
    }
}

/// Report whether `bytes` (a file prefix) contains an EXIF marker or chunk.
pub fn detect_metadata(bytes: &[u8]) -> bool {
    match classify(bytes) {
        Some(Container::Jpeg) => jpeg_has_app1(bytes),
        Some(Container::Png) => png_has_exif(bytes),
        None => false,
    }
}

/// Read up to [`SCAN_WINDOW`] bytes from `reader` and scan them.
///
/// Read errors resolve to `false`.
pub fn detect_metadata_in_reader<R: Read>(reader: R, window: usize) -> bool {
    let mut prefix = Vec::with_capacity(window.min(SCAN_WINDOW));
    match reader.take(window as u64).read_to_end(&mut prefix) {
        Ok(_) => detect_metadata(&prefix),
        Err(e) => {
            log::trace!("metadata scan read failed: {e}");
            false
        }
    }
}

/// Walk JPEG marker segments starting after SOI.
///
/// Each segment is `FF xx` followed (for payload-carrying markers) by a
/// big-endian length that includes the two length bytes themselves.
fn jpeg_has_app1(data: &[u8]) -> bool {
    let mut pos = 2;
    while pos + 2 <= data.len() {
        if data[pos] != 0xFF {
            return false;
        }
        let marker = data[pos + 1];
        // Fill bytes before a marker
        if marker == 0xFF {
            pos += 1;
            continue;
        }
        if marker == JPEG_APP1 {
            return true;
        }
        if marker == JPEG_SOS || marker == JPEG_EOI {
            return false;
        }
        // Standalone markers: TEM, RSTn, a stray SOI
        if marker == 0x01 || (0xD0..=0xD8).contains(&marker) {
            pos += 2;
            continue;
        }
        let Some(len_bytes) = data.get(pos + 2..pos + 4) else {
            return false;
        };
        let length = u16::from_be_bytes([len_bytes[0], len_bytes[1]]) as usize;
        if length < 2 {
            return false;
        }
        pos += 2 + length;
    }
    false
}

/// Walk PNG chunks starting after the 8-byte signature.
///
/// Chunk layout: 4-byte length, 4-byte type, `length` data bytes, 4-byte CRC.
fn png_has_exif(data: &[u8]) -> bool {
    let mut pos = PNG_SIGNATURE.len();
    while pos + 8 <= data.len() {
        let length =
            u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]]) as usize;
        let chunk_type = &data[pos + 4..pos + 8];
        if chunk_type == PNG_EXIF {
            return true;
        }
        if chunk_type == PNG_IEND {
            return false;
        }
        let Some(next) = pos.checked_add(12).and_then(|p| p.checked_add(length)) else {
            return false;
        };
        pos = next;
    }
    false
}
