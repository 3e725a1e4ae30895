//! Deterministic disposal of native handles.
//!
//! A [`DisposalRegistry`] owns the release procedure of every handle acquired
//! through it. Handles are stored in a generational arena, so a [`Tracked`]
//! reference that outlives its entry can never release a newer entry that
//! happens to reuse the same slot.
//!
//! # Guarantees
//!
//! - Each entry's release procedure runs at most once. The entry is removed from
//!   the arena before the procedure runs.
//! - Releasing an entry the registry does not (or no longer) track is a no-op.
//! - [`DisposalRegistry::release_all`] and drop release in reverse registration
//!   order, so objects created from other objects go first.
//!
//! # Example
//!
//! ```
//! use lumen_core::DisposalRegistry;
//!
//! let mut registry = DisposalRegistry::new();
//! let mut slot = Some(registry.acquire(7u64, "vertex buffer", |h| println!("release {h}")));
//! assert_eq!(slot.map(|t| t.handle()), Some(7));
//!
//! assert!(registry.release_and_clear(&mut slot));
//! assert!(slot.is_none());
//! // The second call has nothing to release.
//! assert!(!registry.release_and_clear(&mut slot));
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Key of an entry in a [`DisposalRegistry`].
    pub struct ResourceKey;
}

static NEXT_REGISTRY_ID: AtomicU64 = AtomicU64::new(1);

/// A handle registered in a [`DisposalRegistry`].
///
/// This is a plain copyable reference: holding it does not keep anything alive,
/// and releasing through a stale copy, or through a registry that did not
/// issue it, is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tracked<H> {
    registry: u64,
    key: ResourceKey,
    handle: H,
}

impl<H: Copy> Tracked<H> {
    /// The underlying native handle.
    pub fn handle(&self) -> H {
        self.handle
    }

    /// The registry key of this entry.
    pub fn key(&self) -> ResourceKey {
        self.key
    }
}

type ReleaseFn<H> = Box<dyn FnOnce(H) + Send + Sync>;

struct Entry<H> {
    handle: H,
    label: &'static str,
    release: ReleaseFn<H>,
}

/// Collector that releases tracked handles exactly once.
pub struct DisposalRegistry<H> {
    id: u64,
    entries: SlotMap<ResourceKey, Entry<H>>,
    /// Registration order, oldest first.
    order: Vec<ResourceKey>,
}

impl<H> DisposalRegistry<H>
where
    H: Copy + PartialEq + fmt::Debug,
{
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            id: NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed),
            entries: SlotMap::with_key(),
            order: Vec::new(),
        }
    }

    /// Register `handle` with its release procedure and pass it through.
    ///
    /// If the handle is already tracked by this registry, the existing entry is
    /// returned and `release` is dropped without being called.
    pub fn acquire<F>(&mut self, handle: H, label: &'static str, release: F) -> Tracked<H>
    where
        F: FnOnce(H) + Send + Sync + 'static,
    {
        if let Some(key) = self.find(handle) {
            log::trace!("DisposalRegistry: {label} {handle:?} already tracked");
            return self.tracked(key, handle);
        }

        let key = self.entries.insert(Entry {
            handle,
            label,
            release: Box::new(release),
        });
        self.order.push(key);
        log::trace!("DisposalRegistry: tracking {label} {handle:?}");

        self.tracked(key, handle)
    }

    /// Release a single tracked entry.
    ///
    /// Returns `true` if a release procedure ran.
    pub fn release(&mut self, tracked: Tracked<H>) -> bool {
        self.release_tracked(tracked)
    }

    /// Release whatever `slot` refers to and clear the slot.
    ///
    /// The slot is cleared even when its entry is not tracked here. Returns
    /// `true` if a release procedure ran.
    pub fn release_and_clear(&mut self, slot: &mut Option<Tracked<H>>) -> bool {
        match slot.take() {
            Some(tracked) => self.release_tracked(tracked),
            None => false,
        }
    }

    /// Stop tracking an entry without releasing it.
    ///
    /// Returns `true` if the entry was tracked.
    pub fn forget(&mut self, tracked: Tracked<H>) -> bool {
        if !self.contains(tracked) {
            return false;
        }
        match self.entries.remove(tracked.key) {
            Some(entry) => {
                self.order.retain(|key| *key != tracked.key);
                log::trace!("DisposalRegistry: forgot {} {:?}", entry.label, entry.handle);
                true
            }
            None => false,
        }
    }

    /// Release every tracked entry, newest first, and empty the registry.
    ///
    /// Returns the number of entries released.
    pub fn release_all(&mut self) -> usize {
        let order = std::mem::take(&mut self.order);
        let mut released = 0;
        for key in order.into_iter().rev() {
            if let Some(entry) = self.entries.remove(key) {
                Self::run(entry);
                released += 1;
            }
        }
        debug_assert!(self.entries.is_empty());
        released
    }

    /// Whether `tracked` still refers to a live entry of this registry.
    pub fn contains(&self, tracked: Tracked<H>) -> bool {
        tracked.registry == self.id
            && self
                .entries
                .get(tracked.key)
                .is_some_and(|entry| entry.handle == tracked.handle)
    }

    /// Whether `handle` is tracked by this registry.
    pub fn contains_handle(&self, handle: H) -> bool {
        self.find(handle).is_some()
    }

    /// Number of tracked entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn find(&self, handle: H) -> Option<ResourceKey> {
        self.entries
            .iter()
            .find(|(_, entry)| entry.handle == handle)
            .map(|(key, _)| key)
    }

    fn tracked(&self, key: ResourceKey, handle: H) -> Tracked<H> {
        Tracked {
            registry: self.id,
            key,
            handle,
        }
    }

    fn release_tracked(&mut self, tracked: Tracked<H>) -> bool {
        if !self.contains(tracked) {
            return false;
        }
        match self.entries.remove(tracked.key) {
            Some(entry) => {
                self.order.retain(|k| *k != tracked.key);
                Self::run(entry);
                true
            }
            None => false,
        }
    }

    fn run(entry: Entry<H>) {
        log::trace!("DisposalRegistry: releasing {} {:?}", entry.label, entry.handle);
        (entry.release)(entry.handle);
    }
}

impl<H> Default for DisposalRegistry<H>
where
    H: Copy + PartialEq + fmt::Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<H> Drop for DisposalRegistry<H> {
    fn drop(&mut self) {
        let order = std::mem::take(&mut self.order);
        for key in order.into_iter().rev() {
            if let Some(entry) = self.entries.remove(key) {
                (entry.release)(entry.handle);
            }
        }
    }
}

impl<H: fmt::Debug> fmt::Debug for DisposalRegistry<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<_> = self
            .order
            .iter()
            .filter_map(|key| self.entries.get(*key))
            .map(|entry| (entry.label, &entry.handle))
            .collect();
        f.debug_struct("DisposalRegistry")
            .field("entries", &labels)
            .finish()
    }
}

static_assertions::assert_impl_all!(DisposalRegistry<u64>: Send, Sync);
