//! Conversion orchestration: single files and zipped batches.
//!
//! [`Converter`] sequences conversions on top of an [`ImageBackend`] and
//! wraps encoder output with the size and naming information callers need.
//!
//! ## Single conversion
//!
//! One source in, one [`ConversionResult`] out. The file name is the source
//! name with its extension replaced by the target's canonical extension
//! (`photo.png` → `photo.jpg` for JPEG).
//!
//! ## Batch conversion
//!
//! Every source is converted independently, in parallel on the rayon pool.
//! The pool size (see `effective_threads` in [`config`](crate::config))
//! bounds how many conversions are in flight. Outputs are
//! collected into a single zip.
//!
//! Failure policy is all-or-nothing: if any item fails, no archive is
//! produced and the error names the first failing item in submission order.
//! Conversion is a pure function of bytes and parameters, so nothing is
//! retried.
//!
//! ## Progress
//!
//! Pass a `Sender<ConvertEvent>` to receive one event per finished item and
//! one for the archive. Item events arrive in completion order, not
//! submission order.

use crate::archive::{self, ArchiveEntry, ArchiveError, NameCollision, ZIP_MIME};
use crate::format::derived_file_name;
use crate::imaging::{ConvertError, ConvertParams, EncodedImage, ImageBackend, convert_image};
use crate::output::format_file_size;
use crate::types::SourceImage;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::mpsc::Sender;
use thiserror::Error;

pub const DEFAULT_ARCHIVE_NAME: &str = "converted_images.zip";

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Batch conversion failed at item {index} ({name}): {source}")]
    Item {
        index: usize,
        name: String,
        source: ConvertError,
    },
    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),
    #[error("Nothing to convert: the batch is empty")]
    Empty,
}

/// An encoded output ready to hand to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionResult {
    pub bytes: Vec<u8>,
    /// MIME type of what was actually produced.
    pub mime_type: String,
    pub file_name: String,
}

impl ConversionResult {
    pub fn byte_size(&self) -> usize {
        self.bytes.len()
    }

    pub fn formatted_size(&self) -> String {
        format_file_size(self.bytes.len() as u64)
    }
}

/// One member of a batch archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    pub source_name: String,
    /// Name inside the archive, after collision handling.
    pub file_name: String,
    pub byte_size: usize,
}

/// A zipped batch. `archive.byte_size()` is the compressed archive size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResult {
    pub archive: ConversionResult,
    pub entries: Vec<BatchEntry>,
}

/// Progress notifications from a conversion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConvertEvent {
    ItemConverted {
        index: usize,
        source_name: String,
        mime_type: String,
        byte_size: usize,
    },
    ItemFailed {
        index: usize,
        source_name: String,
        reason: String,
    },
    ArchiveWritten {
        file_name: String,
        entry_count: usize,
        byte_size: usize,
    },
}

/// Batch behaviour knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOptions {
    pub collision: NameCollision,
    pub archive_name: String,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            collision: NameCollision::default(),
            archive_name: DEFAULT_ARCHIVE_NAME.to_string(),
        }
    }
}

/// Orchestrates conversions over a backend. Holds no mutable state, so one
/// instance can serve any number of concurrent calls.
pub struct Converter<B: ImageBackend> {
    backend: B,
    options: BatchOptions,
}

impl<B: ImageBackend> Converter<B> {
    pub fn new(backend: B, options: BatchOptions) -> Self {
        Self { backend, options }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Convert a single source.
    pub fn convert_one(
        &self,
        source: &SourceImage,
        params: &ConvertParams,
    ) -> Result<ConversionResult, ConvertError> {
        let encoded = convert_image(&self.backend, source, params)?;
        Ok(wrap_result(source, encoded))
    }

    /// Convert every source and zip the outputs. All-or-nothing.
    pub fn convert_many(
        &self,
        sources: &[SourceImage],
        params: &ConvertParams,
        events: Option<&Sender<ConvertEvent>>,
    ) -> Result<BatchResult, BatchError> {
        if sources.is_empty() {
            return Err(BatchError::Empty);
        }

        let outcomes: Vec<Result<EncodedImage, ConvertError>> = sources
            .par_iter()
            .enumerate()
            .map(|(index, source)| {
                let outcome = convert_image(&self.backend, source, params);
                if let Some(tx) = events {
                    let event = match &outcome {
                        Ok(encoded) => ConvertEvent::ItemConverted {
                            index,
                            source_name: source.name.clone(),
                            mime_type: encoded.format.mime_type().to_string(),
                            byte_size: encoded.bytes.len(),
                        },
                        Err(e) => ConvertEvent::ItemFailed {
                            index,
                            source_name: source.name.clone(),
                            reason: e.to_string(),
                        },
                    };
                    // A dropped receiver only means nobody is listening.
                    let _ = tx.send(event);
                }
                outcome
            })
            .collect();

        let mut encoded = Vec::with_capacity(outcomes.len());
        for (index, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(image) => encoded.push(image),
                Err(source) => {
                    let name = sources[index].name.clone();
                    log::warn!("batch aborted: item {index} ({name}) failed: {source}");
                    return Err(BatchError::Item {
                        index,
                        name,
                        source,
                    });
                }
            }
        }

        let mut source_names = Vec::with_capacity(encoded.len());
        let mut entries = Vec::with_capacity(encoded.len());
        for (source, image) in sources.iter().zip(encoded) {
            source_names.push(source.name.clone());
            entries.push(ArchiveEntry {
                name: derived_file_name(&source.name, image.format),
                bytes: image.bytes,
            });
        }

        let batch_entries = self.describe_entries(&source_names, &entries);
        let entries = archive::resolve_collisions(entries, self.options.collision);
        let bytes = archive::write_zip(&entries)?;

        log::info!(
            "batch of {} converted to {} ({} archive entries, {})",
            sources.len(),
            params.format,
            entries.len(),
            format_file_size(bytes.len() as u64)
        );
        if let Some(tx) = events {
            let _ = tx.send(ConvertEvent::ArchiveWritten {
                file_name: self.options.archive_name.clone(),
                entry_count: entries.len(),
                byte_size: bytes.len(),
            });
        }

        Ok(BatchResult {
            archive: ConversionResult {
                bytes,
                mime_type: ZIP_MIME.to_string(),
                file_name: self.options.archive_name.clone(),
            },
            entries: batch_entries,
        })
    }

    /// One description per archive member, in archive order.
    ///
    /// With [`NameCollision::Overwrite`] a name is listed once, at its first
    /// position, describing the last source that produced it.
    fn describe_entries(&self, source_names: &[String], entries: &[ArchiveEntry]) -> Vec<BatchEntry> {
        let derived: Vec<String> = entries.iter().map(|e| e.name.clone()).collect();
        let describe = |index: usize, file_name: String| BatchEntry {
            source_name: source_names[index].clone(),
            file_name,
            byte_size: entries[index].bytes.len(),
        };
        match self.options.collision {
            NameCollision::Suffix => archive::unique_entry_names(&derived)
                .into_iter()
                .enumerate()
                .map(|(index, name)| describe(index, name))
                .collect(),
            NameCollision::Overwrite => {
                let mut last: HashMap<&str, usize> = HashMap::new();
                for (index, name) in derived.iter().enumerate() {
                    last.insert(name.as_str(), index);
                }
                let mut seen: HashSet<&str> = HashSet::new();
                derived
                    .iter()
                    .filter(|name| seen.insert(name.as_str()))
                    .filter_map(|name| {
                        let index = *last.get(name.as_str())?;
                        Some(describe(index, name.clone()))
                    })
                    .collect()
            }
        }
    }
}

fn wrap_result(source: &SourceImage, encoded: EncodedImage) -> ConversionResult {
    ConversionResult {
        file_name: derived_file_name(&source.name, encoded.format),
        mime_type: encoded.format.mime_type().to_string(),
        bytes: encoded.bytes,
    }
}
