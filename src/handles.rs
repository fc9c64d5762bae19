//! Scoped display handles.
//!
//! A display handle stands for a transient resource tied to one image: a
//! decode buffer while converting, or a preview while an entry sits in the
//! catalog. Handles are issued by a [`HandleRegistry`] and released when the
//! [`DisplayHandle`] guard is dropped, so every exit path (success, error,
//! early return, panic unwinding) releases exactly once.
//!
//! The registry keeps a live count so leaks are observable:
//!
//! ```
//! use imgshift::handles::HandleRegistry;
//!
//! let registry = HandleRegistry::new();
//! {
//!     let _handle = registry.acquire("decode:a.png");
//!     assert_eq!(registry.live_count(), 1);
//! }
//! assert_eq!(registry.live_count(), 0);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Inner {
    next_id: AtomicU64,
    live: Mutex<HashMap<u64, String>>,
}

/// Issues [`DisplayHandle`]s and tracks which ones are still alive.
///
/// Cloning is cheap; clones share the same bookkeeping.
#[derive(Clone, Default)]
pub struct HandleRegistry {
    inner: Arc<Inner>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new handle. `label` is kept for diagnostics only.
    pub fn acquire(&self, label: impl Into<String>) -> DisplayHandle {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let label = label.into();
        log::trace!("acquire handle #{id} ({label})");
        self.lock_live().insert(id, label);
        DisplayHandle {
            id,
            registry: self.clone(),
        }
    }

    /// Number of handles acquired and not yet released.
    pub fn live_count(&self) -> usize {
        self.lock_live().len()
    }

    /// Labels of live handles, sorted by id.
    pub fn live_labels(&self) -> Vec<String> {
        let live = self.lock_live();
        let mut entries: Vec<(&u64, &String)> = live.iter().collect();
        entries.sort_by_key(|(id, _)| **id);
        entries.into_iter().map(|(_, label)| label.clone()).collect()
    }

    fn release(&self, id: u64) {
        if let Some(label) = self.lock_live().remove(&id) {
            log::trace!("release handle #{id} ({label})");
        }
    }

    // Bookkeeping stays usable even if a holder panicked mid-update.
    fn lock_live(&self) -> std::sync::MutexGuard<'_, HashMap<u64, String>> {
        self.inner
            .live
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl fmt::Debug for HandleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleRegistry")
            .field("live", &self.live_count())
            .finish()
    }
}

/// A live handle. Released when dropped.
pub struct DisplayHandle {
    id: u64,
    registry: HandleRegistry,
}

impl DisplayHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Displayable reference, analogous to an object URL.
    pub fn url(&self) -> String {
        format!("handle:{}", self.id)
    }
}

impl Drop for DisplayHandle {
    fn drop(&mut self) {
        self.registry.release(self.id);
    }
}

impl fmt::Debug for DisplayHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DisplayHandle").field(&self.id).finish()
    }
}
