//! Zip archive assembly for batch output.
//!
//! Entry names inside a zip must be unique. Two sources can derive the same
//! name (`photo.png` and `photo.jpg` both become `photo.webp`), so names are
//! resolved before writing:
//!
//! - [`NameCollision::Suffix`] (default): later entries get `-1`, `-2`, …
//!   before the extension, in submission order.
//! - [`NameCollision::Overwrite`]: the last entry with a given name wins.
//!
//! Entries are deflate-compressed with a fixed timestamp so identical inputs
//! produce identical archives.

use crate::format::split_extension;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Write};
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

pub const ZIP_MIME: &str = "application/zip";

/// How to handle two entries that derive the same file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NameCollision {
    #[default]
    Suffix,
    Overwrite,
}

/// A named member of the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Make every name unique by appending `-n` before the extension.
///
/// The first occurrence keeps its name. Generated names never collide with
/// names that appear literally elsewhere in the input.
pub fn unique_entry_names(names: &[String]) -> Vec<String> {
    let taken: HashSet<&str> = names.iter().map(String::as_str).collect();
    let mut used: HashSet<String> = HashSet::new();
    let mut counters: HashMap<&str, u32> = HashMap::new();

    names
        .iter()
        .map(|name| {
            if used.insert(name.clone()) {
                return name.clone();
            }
            let (base, ext) = split_extension(name);
            let counter = counters.entry(name.as_str()).or_insert(0);
            loop {
                *counter += 1;
                let candidate = match ext {
                    Some(ext) => format!("{base}-{counter}.{ext}"),
                    None => format!("{base}-{counter}"),
                };
                if !taken.contains(candidate.as_str()) && used.insert(candidate.clone()) {
                    return candidate;
                }
            }
        })
        .collect()
}

/// Apply a collision policy, returning the entries that will be written.
pub fn resolve_collisions(entries: Vec<ArchiveEntry>, policy: NameCollision) -> Vec<ArchiveEntry> {
    match policy {
        NameCollision::Suffix => {
            let names: Vec<String> = entries.iter().map(|e| e.name.clone()).collect();
            entries
                .into_iter()
                .zip(unique_entry_names(&names))
                .map(|(entry, name)| ArchiveEntry { name, ..entry })
                .collect()
        }
        NameCollision::Overwrite => {
            // Keep first-seen position, last-seen content.
            let mut order: Vec<String> = Vec::new();
            let mut latest: HashMap<String, Vec<u8>> = HashMap::new();
            for entry in entries {
                if latest.insert(entry.name.clone(), entry.bytes).is_none() {
                    order.push(entry.name);
                }
            }
            order
                .into_iter()
                .filter_map(|name| {
                    let bytes = latest.remove(&name)?;
                    Some(ArchiveEntry { name, bytes })
                })
                .collect()
        }
    }
}

/// Write entries into an in-memory zip. Names must already be unique.
pub fn write_zip(entries: &[ArchiveEntry]) -> Result<Vec<u8>, ArchiveError> {
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for entry in entries {
        writer.start_file(entry.name.as_str(), options)?;
        writer.write_all(&entry.bytes)?;
    }
    let cursor = writer.finish()?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn entry(name: &str, bytes: &[u8]) -> ArchiveEntry {
        ArchiveEntry {
            name: name.to_string(),
            bytes: bytes.to_vec(),
        }
    }

    fn read_zip(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        (0..archive.len())
            .map(|i| {
                let mut file = archive.by_index(i).unwrap();
                let mut data = Vec::new();
                file.read_to_end(&mut data).unwrap();
                (file.name().to_string(), data)
            })
            .collect()
    }

    #[test]
    fn unique_names_untouched() {
        let input = names(&["a.webp", "b.webp"]);
        assert_eq!(unique_entry_names(&input), input);
    }

    #[test]
    fn duplicates_get_numeric_suffix_in_order() {
        let input = names(&["a.webp", "a.webp", "b.webp", "a.webp"]);
        assert_eq!(
            unique_entry_names(&input),
            names(&["a.webp", "a-1.webp", "b.webp", "a-2.webp"])
        );
    }

    #[test]
    fn suffix_skips_literal_names() {
        let input = names(&["a.webp", "a.webp", "a-1.webp"]);
        assert_eq!(
            unique_entry_names(&input),
            names(&["a.webp", "a-2.webp", "a-1.webp"])
        );
    }

    #[test]
    fn suffix_without_extension() {
        let input = names(&["noext", "noext"]);
        assert_eq!(unique_entry_names(&input), names(&["noext", "noext-1"]));
    }

    #[test]
    fn overwrite_keeps_last_content() {
        let resolved = resolve_collisions(
            vec![entry("a.webp", b"first"), entry("b.webp", b"b"), entry("a.webp", b"second")],
            NameCollision::Overwrite,
        );
        assert_eq!(resolved, vec![entry("a.webp", b"second"), entry("b.webp", b"b")]);
    }

    #[test]
    fn zip_round_trips_entries() {
        let entries = vec![entry("a.webp", b"aaaa"), entry("b.webp", b"bbbbbbbb")];
        let bytes = write_zip(&entries).unwrap();
        assert_eq!(&bytes[0..2], b"PK");
        assert_eq!(
            read_zip(&bytes),
            vec![
                ("a.webp".to_string(), b"aaaa".to_vec()),
                ("b.webp".to_string(), b"bbbbbbbb".to_vec()),
            ]
        );
    }

    #[test]
    fn zip_is_deterministic() {
        let entries = vec![entry("a.png", &[7; 256])];
        assert_eq!(write_zip(&entries).unwrap(), write_zip(&entries).unwrap());
    }

    #[test]
    fn empty_archive_is_valid() {
        let bytes = write_zip(&[]).unwrap();
        assert!(read_zip(&bytes).is_empty());
    }
}
