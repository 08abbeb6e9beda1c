//! Bookmark store
//!
//! Owns the flat outline of the document being edited. Index-based mutators
//! are tolerant of stale indices: an index that no longer points at an entry
//! is ignored and reported with a `false` return, never an error.

use std::collections::HashMap;

use log::debug;

use crate::outline::{
    normalize_display_levels, normalize_levels, sort_outline, DisplayEntry, OutlineEntry,
};

#[derive(Debug, Clone, Default)]
pub struct BookmarkStore {
    outline: Vec<OutlineEntry>,
}

impl BookmarkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole outline.
    pub fn set_outline(&mut self, entries: Vec<OutlineEntry>) {
        self.outline = entries;
    }

    pub fn outline(&self) -> &[OutlineEntry] {
        &self.outline
    }

    pub fn len(&self) -> usize {
        self.outline.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outline.is_empty()
    }

    /// Append an entry and re-sort the outline by `(page, level)`.
    pub fn add_entry(&mut self, level: i32, title: impl Into<String>, page: u32) {
        self.outline.push(OutlineEntry::new(level, title, page));
        sort_outline(&mut self.outline);
    }

    /// Append entries coming from a merged document, keeping their order.
    ///
    /// Page numbers must already be offset into this document's page space.
    pub fn append(&mut self, entries: Vec<OutlineEntry>) {
        debug!("appending {} outline entries", entries.len());
        self.outline.extend(entries);
    }

    /// Overwrite the entry at `index`. Returns `false` if `index` is stale.
    pub fn update_entry(
        &mut self,
        index: usize,
        level: i32,
        title: impl Into<String>,
        page: u32,
    ) -> bool {
        match self.outline.get_mut(index) {
            Some(entry) => {
                *entry = OutlineEntry::new(level, title, page);
                true
            }
            None => {
                debug!("ignoring update of stale outline index {}", index);
                false
            }
        }
    }

    /// Remove the entry at `index`. Returns `false` if `index` is stale.
    pub fn delete_entry(&mut self, index: usize) -> bool {
        if index < self.outline.len() {
            self.outline.remove(index);
            true
        } else {
            debug!("ignoring delete of stale outline index {}", index);
            false
        }
    }

    /// Entries pointing at `page`, paired with their index in the outline.
    pub fn entries_on_page(&self, page: u32) -> Vec<(usize, &OutlineEntry)> {
        self.outline
            .iter()
            .enumerate()
            .filter(|(_, e)| e.page == page)
            .collect()
    }

    pub fn count_on_page(&self, page: u32) -> usize {
        self.outline.iter().filter(|e| e.page == page).count()
    }

    /// The stored outline with its levels repaired for writing.
    pub fn normalize_for_storage(&self) -> Vec<OutlineEntry> {
        normalize_levels(&self.outline)
    }

    /// Project the outline onto an uncommitted page order.
    ///
    /// Pages are renumbered to their display positions, entries are sorted
    /// by `(display_page, level)` and the levels are clamped in that order.
    /// Entries on pages the order does not cover keep their page number.
    pub fn normalize_for_display(&self, page_order: &[usize]) -> Vec<DisplayEntry> {
        if self.outline.is_empty() || page_order.is_empty() {
            return Vec::new();
        }

        let positions: HashMap<u32, u32> = page_order
            .iter()
            .enumerate()
            .map(|(pos, &physical)| (physical as u32 + 1, pos as u32 + 1))
            .collect();

        let mut projected: Vec<DisplayEntry> = self
            .outline
            .iter()
            .map(|e| DisplayEntry {
                level: e.level,
                title: e.title.clone(),
                display_page: positions.get(&e.page).copied().unwrap_or(e.page),
            })
            .collect();
        projected.sort_by_key(|e| (e.display_page, e.level));

        normalize_display_levels(projected)
    }
}
