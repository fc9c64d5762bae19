//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Convert
//!
//! ```text
//! photo.png → photo.webp (image/webp, 48.2 KB)
//! ```
//!
//! ## Batch
//!
//! ```text
//! 001 a.png → image/webp, 12.5 KB
//! 003 c.png → image/webp, 3 KB
//! 002 b.jpg → image/webp, 40.03 KB
//! Archive: converted_images.zip (3 files, 54.1 KB)
//!     a.png → a.webp
//!     b.jpg → b.webp
//!     c.png → c.webp
//! ```
//!
//! Progress lines follow completion order; the index is the submission
//! position.
//!
//! ## Inspect
//!
//! ```text
//! 001 photo.jpg
//!     image/jpeg, 1.2 MB, 4032×3024
//!     alpha: no, metadata: yes
//! 002 broken.png
//!     image/png, 10 Bytes
//!     failed: decode error ...
//! ```
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::catalog::{AddSummary, EntryStatus, EntryView};
use crate::convert::{BatchResult, ConversionResult, ConvertEvent};

const SIZE_UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// Human-readable byte size: base 1024, at most two decimals, trailing
/// zeros dropped.
///
/// ```
/// use imgshift::output::format_file_size;
///
/// assert_eq!(format_file_size(0), "0 Bytes");
/// assert_eq!(format_file_size(1536), "1.5 KB");
/// assert_eq!(format_file_size(1048576), "1 MB");
/// ```
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let fixed = format!("{value:.2}");
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed} {}", SIZE_UNITS[unit])
}

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

// ============================================================================
// Convert
// ============================================================================

pub fn format_conversion(source_name: &str, result: &ConversionResult) -> Vec<String> {
    vec![format!(
        "{} \u{2192} {} ({}, {})",
        source_name,
        result.file_name,
        result.mime_type,
        result.formatted_size()
    )]
}

pub fn print_conversion(source_name: &str, result: &ConversionResult) {
    for line in format_conversion(source_name, result) {
        println!("{}", line);
    }
}

// ============================================================================
// Batch
// ============================================================================

/// Format a single batch progress event.
pub fn format_convert_event(event: &ConvertEvent) -> Vec<String> {
    match event {
        ConvertEvent::ItemConverted {
            index,
            source_name,
            mime_type,
            byte_size,
        } => vec![format!(
            "{} {} \u{2192} {}, {}",
            format_index(index + 1),
            source_name,
            mime_type,
            format_file_size(*byte_size as u64)
        )],
        ConvertEvent::ItemFailed {
            index,
            source_name,
            reason,
        } => vec![format!(
            "{} {} failed: {}",
            format_index(index + 1),
            source_name,
            reason
        )],
        ConvertEvent::ArchiveWritten {
            file_name,
            entry_count,
            byte_size,
        } => vec![format!(
            "Archive: {} ({} files, {})",
            file_name,
            entry_count,
            format_file_size(*byte_size as u64)
        )],
    }
}

/// Archive membership: which source became which entry.
pub fn format_batch_summary(batch: &BatchResult) -> Vec<String> {
    batch
        .entries
        .iter()
        .map(|e| format!("    {} \u{2192} {}", e.source_name, e.file_name))
        .collect()
}

pub fn print_batch_summary(batch: &BatchResult) {
    for line in format_batch_summary(batch) {
        println!("{}", line);
    }
}

// ============================================================================
// Inspect
// ============================================================================

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

/// Format catalog entries, one block per entry in catalog order.
pub fn format_catalog(entries: &[EntryView]) -> Vec<String> {
    let mut lines = Vec::new();
    for (pos, entry) in entries.iter().enumerate() {
        lines.push(format!("{} {}", format_index(pos + 1), entry.name));
        match &entry.status {
            EntryStatus::Ready => {
                lines.push(format!(
                    "    {}, {}, {}\u{00d7}{}",
                    entry.mime_type, entry.formatted_size, entry.width, entry.height
                ));
                let alpha = entry.has_alpha.map(yes_no).unwrap_or("unknown");
                lines.push(format!(
                    "    alpha: {}, metadata: {}",
                    alpha,
                    yes_no(entry.has_metadata)
                ));
            }
            EntryStatus::Pending => {
                lines.push(format!("    {}, {}", entry.mime_type, entry.formatted_size));
                lines.push("    pending".to_string());
            }
            EntryStatus::Failed(reason) => {
                lines.push(format!("    {}, {}", entry.mime_type, entry.formatted_size));
                lines.push(format!("    failed: {}", reason));
            }
        }
    }
    lines
}

pub fn print_catalog(entries: &[EntryView]) {
    for line in format_catalog(entries) {
        println!("{}", line);
    }
}

/// Lines for files that were not added. Empty when nothing was skipped.
pub fn format_add_summary(summary: &AddSummary) -> Vec<String> {
    summary
        .skipped
        .iter()
        .map(|name| format!("Skipped {} (not an image)", name))
        .collect()
}
