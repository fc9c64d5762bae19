//! The image catalog: an ordered list of added files and what is known
//! about them.
//!
//! Adding a file makes it visible immediately with placeholder values
//! (status `Pending`, 0×0). Dimensions, the alpha flag and the metadata flag
//! are derived on the rayon pool, one job per entry, and written back by
//! [`EntryId`] when each job finishes. Entries finish in any order; the list
//! order is always insertion order.
//!
//! Every entry owns a preview [`DisplayHandle`]. Removing the entry (or
//! clearing the catalog) drops it, which releases the handle.
//!
//! All mutations go through one mutex, so [`ImageCatalog::list`] never sees
//! a half-applied change.

use crate::handles::{DisplayHandle, HandleRegistry};
use crate::imaging::{Dimensions, ImageBackend, get_dimensions, has_alpha};
use crate::output::format_file_size;
use crate::scanner::{self, SCAN_WINDOW};
use crate::types::SourceImage;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

/// Identity of a catalog entry. Unlike an index, it survives removals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EntryId(pub(crate) u64);

impl EntryId {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "lowercase")]
pub enum EntryStatus {
    Pending,
    Ready,
    Failed(String),
}

struct CatalogEntry {
    id: EntryId,
    source: SourceImage,
    dimensions: Dimensions,
    has_alpha: Option<bool>,
    has_metadata: bool,
    status: EntryStatus,
    preview: DisplayHandle,
}

impl CatalogEntry {
    fn view(&self) -> EntryView {
        EntryView {
            id: self.id,
            name: self.source.name.clone(),
            byte_size: self.source.byte_size() as u64,
            formatted_size: format_file_size(self.source.byte_size() as u64),
            mime_type: self.source.mime_or_unknown().to_string(),
            width: self.dimensions.width,
            height: self.dimensions.height,
            preview_url: self.preview.url(),
            has_alpha: self.has_alpha,
            has_metadata: self.has_metadata,
            status: self.status.clone(),
        }
    }
}

/// A snapshot of one entry, safe to hold after the catalog changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryView {
    pub id: EntryId,
    pub name: String,
    pub byte_size: u64,
    pub formatted_size: String,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
    pub preview_url: String,
    /// `None` until derived, or when the image could not be decoded.
    pub has_alpha: Option<bool>,
    pub has_metadata: bool,
    pub status: EntryStatus,
}

/// What [`ImageCatalog::add`] did with the files it was given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddSummary {
    pub added: Vec<EntryId>,
    /// Names of files rejected because their declared type is not `image/*`.
    pub skipped: Vec<String>,
}

struct Derived {
    dimensions: Result<Dimensions, String>,
    has_alpha: Option<bool>,
    has_metadata: bool,
}

struct Shared<B> {
    backend: B,
    handles: HandleRegistry,
    scan_window: usize,
    next_id: AtomicU64,
    entries: Mutex<Vec<CatalogEntry>>,
    in_flight: Mutex<usize>,
    idle: Condvar,
}

impl<B> Shared<B> {
    // A panicking derivation job must not take the catalog down with it.
    fn lock_entries(&self) -> MutexGuard<'_, Vec<CatalogEntry>> {
        self.entries.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, usize> {
        self.in_flight.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// Decrements the in-flight count when a derivation job ends, however it ends.
struct JobGuard<B> {
    shared: Arc<Shared<B>>,
}

impl<B> Drop for JobGuard<B> {
    fn drop(&mut self) {
        let mut in_flight = self.shared.lock_in_flight();
        *in_flight = in_flight.saturating_sub(1);
        if *in_flight == 0 {
            self.shared.idle.notify_all();
        }
    }
}

/// Ordered, thread-safe collection of added images.
///
/// Cloning yields another handle to the same catalog.
pub struct ImageCatalog<B> {
    shared: Arc<Shared<B>>,
}

impl<B> Clone for ImageCatalog<B> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<B: ImageBackend + Send + 'static> ImageCatalog<B> {
    pub fn new(backend: B) -> Self {
        Self::with_scan_window(backend, SCAN_WINDOW)
    }

    /// Like [`new`](Self::new) with a custom metadata scan prefix length.
    pub fn with_scan_window(backend: B, scan_window: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                backend,
                handles: HandleRegistry::new(),
                scan_window,
                next_id: AtomicU64::new(0),
                entries: Mutex::new(Vec::new()),
                in_flight: Mutex::new(0),
                idle: Condvar::new(),
            }),
        }
    }

    /// Registry the preview handles are issued from.
    pub fn handles(&self) -> &HandleRegistry {
        &self.shared.handles
    }

    /// Append files and schedule their derivation.
    ///
    /// Files declared as something other than `image/*` are skipped.
    pub fn add(&self, files: impl IntoIterator<Item = SourceImage>) -> AddSummary {
        let mut summary = AddSummary::default();
        let mut scheduled = Vec::new();
        {
            let mut entries = self.shared.lock_entries();
            for source in files {
                if !source.is_declared_image() {
                    log::debug!(
                        "skipping {} (declared type {})",
                        source.name,
                        source.mime_or_unknown()
                    );
                    summary.skipped.push(source.name);
                    continue;
                }
                let id = EntryId(self.shared.next_id.fetch_add(1, Ordering::Relaxed) + 1);
                let preview = self.shared.handles.acquire(format!("preview:{}", source.name));
                scheduled.push((id, source.clone()));
                entries.push(CatalogEntry {
                    id,
                    source,
                    dimensions: Dimensions::default(),
                    has_alpha: None,
                    has_metadata: false,
                    status: EntryStatus::Pending,
                    preview,
                });
                summary.added.push(id);
            }
        }

        *self.shared.lock_in_flight() += scheduled.len();
        for (id, source) in scheduled {
            let guard = JobGuard {
                shared: Arc::clone(&self.shared),
            };
            rayon::spawn(move || {
                let derived = derive(&guard.shared.backend, &source, guard.shared.scan_window);
                apply(&guard.shared, id, derived);
            });
        }
        summary
    }

    /// Remove the entry at `index`, releasing its preview handle.
    pub fn remove(&self, index: usize) -> Option<EntryView> {
        let mut entries = self.shared.lock_entries();
        if index >= entries.len() {
            return None;
        }
        let entry = entries.remove(index);
        Some(entry.view())
    }

    pub fn remove_id(&self, id: EntryId) -> Option<EntryView> {
        let mut entries = self.shared.lock_entries();
        let index = entries.iter().position(|e| e.id == id)?;
        let entry = entries.remove(index);
        Some(entry.view())
    }

    /// Remove every entry, releasing all preview handles.
    pub fn clear(&self) {
        self.shared.lock_entries().clear();
    }

    pub fn get(&self, id: EntryId) -> Option<EntryView> {
        self.shared
            .lock_entries()
            .iter()
            .find(|e| e.id == id)
            .map(CatalogEntry::view)
    }

    /// Snapshot of every entry, in insertion order.
    pub fn list(&self) -> Vec<EntryView> {
        self.shared.lock_entries().iter().map(CatalogEntry::view).collect()
    }

    pub fn len(&self) -> usize {
        self.shared.lock_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Block until no derivation job is running.
    pub fn wait_idle(&self) {
        let mut in_flight = self.shared.lock_in_flight();
        while *in_flight > 0 {
            in_flight = self
                .shared
                .idle
                .wait(in_flight)
                .unwrap_or_else(|p| p.into_inner());
        }
    }
}

/// Compute everything the catalog shows about one source. Never fails: a
/// decode failure is recorded on the entry and the metadata scan is advisory.
fn derive(backend: &impl ImageBackend, source: &SourceImage, scan_window: usize) -> Derived {
    let has_metadata = scanner::detect_metadata_in_reader(&source.bytes[..], scan_window);

    match get_dimensions(backend, source) {
        Ok(dimensions) => {
            let alpha = match has_alpha(backend, source) {
                Ok(alpha) => Some(alpha),
                Err(e) => {
                    log::debug!("alpha probe failed for {}: {e}", source.name);
                    None
                }
            };
            Derived {
                dimensions: Ok(dimensions),
                has_alpha: alpha,
                has_metadata,
            }
        }
        Err(e) => {
            log::debug!("could not read dimensions of {}: {e}", source.name);
            Derived {
                dimensions: Err(e.to_string()),
                has_alpha: None,
                has_metadata,
            }
        }
    }
}

fn apply<B>(shared: &Shared<B>, id: EntryId, derived: Derived) {
    let mut entries = shared.lock_entries();
    // The entry may have been removed while its job ran.
    let Some(entry) = entries.iter_mut().find(|e| e.id == id) else {
        return;
    };
    entry.has_metadata = derived.has_metadata;
    entry.has_alpha = derived.has_alpha;
    match derived.dimensions {
        Ok(dimensions) => {
            entry.dimensions = dimensions;
            entry.status = EntryStatus::Ready;
        }
        Err(reason) => entry.status = EntryStatus::Failed(reason),
    }
}
