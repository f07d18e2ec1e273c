//! Fixed-capacity page cache for rendered pages

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::range::{IndexSet, PageRange};
use super::request::InvalidIndexError;
use super::types::{PageSlot, VecExt};

/// Cache shared between the render lane (sole writer) and the presentation side
pub type SharedCache = Arc<Mutex<PageCache>>;

/// Lock a shared cache, recovering the data from a poisoned lock
pub fn lock_cache(cache: &SharedCache) -> MutexGuard<'_, PageCache> {
    cache.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One slot per page plus the window of pages the cache keeps materialized.
///
/// Every page inside the window is loaded or has a load queued on the render
/// lane; a loaded page outside the window is stale.
#[derive(Debug, Default)]
pub struct PageCache {
    slots: Vec<PageSlot>,
    window: PageRange,
}

impl PageCache {
    /// Create a cache with `page_count` empty slots and an empty window
    #[must_use]
    pub fn new(page_count: usize) -> Self {
        let mut cache = Self::default();
        cache.reset(page_count);
        cache
    }

    /// Drop every bitmap and resize to `page_count` empty slots
    pub fn reset(&mut self, page_count: usize) {
        self.slots.reset_to_len(page_count);
        self.window = PageRange::EMPTY;
    }

    /// Slot state for a page
    pub fn get(&self, page: usize) -> Result<PageSlot, InvalidIndexError> {
        InvalidIndexError::check(page, self.slots.len())?;
        Ok(self.slots[page].clone())
    }

    /// Replace a slot, returning the previous state
    pub fn set(&mut self, page: usize, slot: PageSlot) -> Result<PageSlot, InvalidIndexError> {
        InvalidIndexError::check(page, self.slots.len())?;
        Ok(std::mem::replace(&mut self.slots[page], slot))
    }

    /// Number of slots, equal to the document's page count
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn current_window(&self) -> PageRange {
        self.window
    }

    /// Install a new window wholesale, returning the old one
    pub fn replace_window(&mut self, window: PageRange) -> PageRange {
        std::mem::replace(&mut self.window, window)
    }

    #[must_use]
    pub fn is_loaded(&self, page: usize) -> bool {
        self.slots.get(page).is_some_and(PageSlot::is_loaded)
    }

    /// Pages currently holding a bitmap
    #[must_use]
    pub fn loaded_pages(&self) -> IndexSet {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_loaded())
            .map(|(page, _)| page)
            .collect()
    }

    /// Loaded pages that lie outside the current window
    #[must_use]
    pub fn stale_pages(&self) -> IndexSet {
        self.loaded_pages()
            .iter()
            .filter(|page| !self.window.contains(*page))
            .collect()
    }

    /// Number of slots holding a bitmap; at most `capacity()`
    #[must_use]
    pub fn loaded_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_loaded()).count()
    }
}
