//! Shared value types passed between the converter, the catalog and the CLI.

use std::path::Path;
use std::sync::Arc;

/// An uploaded image: raw bytes plus the caller-declared name and MIME type.
///
/// The bytes are shared, never mutated; cloning a `SourceImage` is cheap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    pub name: String,
    /// MIME type as declared by whoever supplied the file. May be empty.
    pub declared_mime: String,
    pub bytes: Arc<[u8]>,
}

impl SourceImage {
    pub fn new(name: impl Into<String>, declared_mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            declared_mime: declared_mime.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, declaring its MIME type from the extension.
    ///
    /// Unrecognized extensions get an empty declared type.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let declared_mime = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(crate::format::TargetFormat::from_extension)
            .map(|f| f.mime_type().to_string())
            .unwrap_or_default();
        Ok(Self::new(name, declared_mime, bytes))
    }

    pub fn byte_size(&self) -> usize {
        self.bytes.len()
    }

    /// Declared MIME type, or `"unknown"` when none was given.
    pub fn mime_or_unknown(&self) -> &str {
        if self.declared_mime.is_empty() {
            "unknown"
        } else {
            &self.declared_mime
        }
    }

    /// Whether the declared type is an image type at all.
    pub fn is_declared_image(&self) -> bool {
        self.declared_mime.starts_with("image/")
    }
}
