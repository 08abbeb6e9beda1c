//! Page order tracking
//!
//! The tracker holds the desired output order as a permutation of physical
//! page indices. It only changes through adjacent swaps and by appending
//! indices for newly inserted pages, so at any time the pending reorder is a
//! short, inspectable list of transpositions away from the identity.

use std::collections::HashMap;

use log::{debug, info};
use serde::Serialize;
use thiserror::Error;

use crate::document::{DocumentError, PdfDocument};
use crate::outline::{sort_outline, OutlineEntry};

/// Where a page sits in the display order, both 1-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PagePosition {
    pub position: usize,
    pub original_page: usize,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderError {
    #[error("target order has {target} pages, current order has {current}")]
    LengthMismatch { current: usize, target: usize },
    #[error("page index {0} is not part of the current order")]
    UnknownPage(usize),
    #[error("page index {0} appears more than once")]
    DuplicatePage(usize),
}

#[derive(Debug, Clone, Default)]
pub struct PageOrderTracker {
    order: Vec<usize>,
}

impl PageOrderTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset to the identity order for `page_count` pages.
    pub fn initialize(&mut self, page_count: usize) {
        self.order = (0..page_count).collect();
    }

    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Append physical indices of pages added at the end of the document.
    pub fn extend(&mut self, new_pages: impl IntoIterator<Item = usize>) {
        self.order.extend(new_pages);
    }

    /// Swap the page at `index` with the one before it.
    pub fn move_up(&mut self, index: usize) -> bool {
        if index == 0 || index >= self.order.len() {
            return false;
        }
        self.order.swap(index, index - 1);
        true
    }

    /// Swap the page at `index` with the one after it.
    pub fn move_down(&mut self, index: usize) -> bool {
        if index >= self.order.len().saturating_sub(1) {
            return false;
        }
        self.order.swap(index, index + 1);
        true
    }

    pub fn has_changes(&self) -> bool {
        self.order.iter().enumerate().any(|(i, &p)| i != p)
    }

    pub fn position_info(&self, index: usize) -> Option<PagePosition> {
        self.order.get(index).map(|&page| PagePosition {
            position: index + 1,
            original_page: page + 1,
        })
    }

    /// Make the physical page order match the tracked order.
    ///
    /// Outline pages are renumbered through the new order and re-sorted by
    /// `(page, level)`; levels are left as they are. The document is asked to
    /// reorder its pages, and the tracker is reset to the identity. Without
    /// pending changes the outline is returned as given and the document is
    /// left alone.
    pub fn commit<D: PdfDocument>(
        &mut self,
        document: &mut D,
        outline: Vec<OutlineEntry>,
    ) -> Result<Vec<OutlineEntry>, DocumentError> {
        if !self.has_changes() {
            return Ok(outline);
        }

        let mapping: HashMap<u32, u32> = self
            .order
            .iter()
            .enumerate()
            .map(|(new_pos, &old_page)| (old_page as u32 + 1, new_pos as u32 + 1))
            .collect();

        let mut remapped: Vec<OutlineEntry> = outline
            .into_iter()
            .map(|mut entry| {
                match mapping.get(&entry.page) {
                    Some(&page) => entry.page = page,
                    None => debug!(
                        "outline entry {:?} points outside the page order, keeping page {}",
                        entry.title, entry.page
                    ),
                }
                entry
            })
            .collect();
        sort_outline(&mut remapped);

        document.select_pages(&self.order)?;
        info!("reordered {} pages", self.order.len());

        self.initialize(document.page_count());
        Ok(remapped)
    }
}

/// Plan the `move_up` calls that turn `current` into `target`.
///
/// Returns the indices to pass to [`PageOrderTracker::move_up`], in order.
/// Each target position is filled by bubbling its page up from wherever it
/// currently sits.
pub fn plan_moves(current: &[usize], target: &[usize]) -> Result<Vec<usize>, OrderError> {
    if current.len() != target.len() {
        return Err(OrderError::LengthMismatch {
            current: current.len(),
            target: target.len(),
        });
    }

    let mut seen = HashMap::with_capacity(target.len());
    for &page in target {
        if !current.contains(&page) {
            return Err(OrderError::UnknownPage(page));
        }
        if seen.insert(page, ()).is_some() {
            return Err(OrderError::DuplicatePage(page));
        }
    }

    let mut working = current.to_vec();
    let mut moves = Vec::new();
    for (pos, page) in target.iter().enumerate() {
        let mut at = working
            .iter()
            .position(|p| p == page)
            .ok_or(OrderError::UnknownPage(*page))?;
        while at > pos {
            working.swap(at, at - 1);
            moves.push(at);
            at -= 1;
        }
    }
    Ok(moves)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::FakeDocument;
    use proptest::prelude::*;

    fn tracker(pages: usize) -> PageOrderTracker {
        let mut t = PageOrderTracker::new();
        t.initialize(pages);
        t
    }

    #[test]
    fn test_initialize_is_identity() {
        let t = tracker(4);
        assert_eq!(t.order(), &[0, 1, 2, 3]);
        assert!(!t.has_changes());
    }

    #[test]
    fn test_move_up_boundary() {
        let mut t = tracker(3);
        assert!(!t.move_up(0));
        assert!(!t.move_up(3));
        assert_eq!(t.order(), &[0, 1, 2]);
    }

    #[test]
    fn test_move_down_boundary() {
        let mut t = tracker(3);
        assert!(!t.move_down(2));
        assert!(!t.move_down(10));
        assert_eq!(t.order(), &[0, 1, 2]);
    }

    #[test]
    fn test_move_with_largest_index_is_ignored() {
        let mut t = tracker(3);
        assert!(!t.move_down(usize::MAX));
        assert!(!t.move_up(usize::MAX));
        assert_eq!(t.order(), &[0, 1, 2]);
    }

    #[test]
    fn test_move_up_and_down() {
        let mut t = tracker(3);
        assert!(t.move_up(2));
        assert_eq!(t.order(), &[0, 2, 1]);
        assert!(t.has_changes());
        assert!(t.move_down(1));
        assert_eq!(t.order(), &[0, 1, 2]);
        assert!(!t.has_changes());
    }

    #[test]
    fn test_move_on_empty_order() {
        let mut t = PageOrderTracker::new();
        assert!(!t.move_up(0));
        assert!(!t.move_down(0));
    }

    #[test]
    fn test_extend_appends_new_pages() {
        let mut t = tracker(2);
        t.move_up(1);
        t.extend(2..4);
        assert_eq!(t.order(), &[1, 0, 2, 3]);
    }

    #[test]
    fn test_position_info() {
        let mut t = tracker(3);
        t.move_up(2);
        assert_eq!(
            t.position_info(1),
            Some(PagePosition {
                position: 2,
                original_page: 3
            })
        );
        assert_eq!(t.position_info(3), None);
    }

    #[test]
    fn test_commit_example_page_to_front() {
        let mut doc = FakeDocument::with_pages(3);
        let mut t = tracker(3);
        t.move_up(2);
        t.move_up(1);
        assert_eq!(t.order(), &[2, 0, 1]);

        let outline = vec![
            OutlineEntry::new(1, "Ch0", 1),
            OutlineEntry::new(1, "Ch2", 3),
        ];
        let remapped = t.commit(&mut doc, outline).unwrap();

        assert_eq!(
            remapped,
            vec![OutlineEntry::new(1, "Ch2", 1), OutlineEntry::new(1, "Ch0", 2)]
        );
        assert_eq!(doc.ids(), vec![2, 0, 1]);
        assert_eq!(t.order(), &[0, 1, 2]);
        assert!(!t.has_changes());
    }

    #[test]
    fn test_commit_without_changes_leaves_everything() {
        let mut doc = FakeDocument::with_pages(2);
        let mut t = tracker(2);
        let outline = vec![OutlineEntry::new(3, "b", 2), OutlineEntry::new(1, "a", 1)];
        let result = t.commit(&mut doc, outline.clone()).unwrap();
        assert_eq!(result, outline);
        assert_eq!(doc.ids(), vec![0, 1]);
    }

    #[test]
    fn test_commit_passes_unmapped_pages_through() {
        let mut doc = FakeDocument::with_pages(2);
        let mut t = tracker(2);
        t.move_up(1);
        let remapped = t
            .commit(&mut doc, vec![OutlineEntry::new(1, "stray", 0)])
            .unwrap();
        assert_eq!(remapped[0].page, 0);
    }

    #[test]
    fn test_commit_keeps_levels_unnormalized() {
        let mut doc = FakeDocument::with_pages(2);
        let mut t = tracker(2);
        t.move_down(0);
        let remapped = t
            .commit(&mut doc, vec![OutlineEntry::new(4, "deep", 1)])
            .unwrap();
        assert_eq!(remapped, vec![OutlineEntry::new(4, "deep", 2)]);
    }

    #[test]
    fn test_plan_moves_reaches_target() {
        let mut t = tracker(4);
        let target = vec![3, 1, 0, 2];
        for index in plan_moves(t.order(), &target).unwrap() {
            assert!(t.move_up(index));
        }
        assert_eq!(t.order(), target.as_slice());
    }

    #[test]
    fn test_plan_moves_rejects_bad_targets() {
        assert_eq!(
            plan_moves(&[0, 1], &[0]),
            Err(OrderError::LengthMismatch {
                current: 2,
                target: 1
            })
        );
        assert_eq!(plan_moves(&[0, 1], &[0, 5]), Err(OrderError::UnknownPage(5)));
        assert_eq!(
            plan_moves(&[0, 1], &[1, 1]),
            Err(OrderError::DuplicatePage(1))
        );
    }

    #[test]
    fn test_plan_moves_identity_is_empty() {
        assert!(plan_moves(&[0, 1, 2], &[0, 1, 2]).unwrap().is_empty());
    }

    proptest! {
        #[test]
        fn commit_moves_entries_to_their_new_position(
            target in Just((0..6usize).collect::<Vec<_>>()).prop_shuffle()
        ) {
            let mut doc = FakeDocument::with_pages(6);
            let mut t = tracker(6);
            for index in plan_moves(t.order(), &target).unwrap() {
                t.move_up(index);
            }
            let outline: Vec<OutlineEntry> = (1..=6u32)
                .map(|p| OutlineEntry::new(1, format!("p{p}"), p))
                .collect();

            let remapped = t.commit(&mut doc, outline).unwrap();

            for (i, &physical) in target.iter().enumerate() {
                let title = format!("p{}", physical + 1);
                let entry = remapped.iter().find(|e| e.title == title).unwrap();
                prop_assert_eq!(entry.page, i as u32 + 1);
            }
            prop_assert!(!t.has_changes());
            prop_assert_eq!(doc.ids(), target);
        }
    }
}
