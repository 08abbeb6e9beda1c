//! Flat outline model
//!
//! A PDF outline (table of contents) is handled as a flat list of
//! level-tagged entries. Nesting is implied by the level sequence, which is
//! why the "no skipped levels" rule matters: the writer can only rebuild a
//! tree from a sequence where every entry is at most one level deeper than
//! the entry before it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single bookmark: nesting level, title and 1-indexed page number.
///
/// Levels are not validated on construction. Raw outlines read from a file or
/// typed by a user can carry any level; [`normalize_levels`] repairs them.
/// A page of `0` marks an entry whose destination could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineEntry {
    pub level: i32,
    pub title: String,
    pub page: u32,
}

impl OutlineEntry {
    pub fn new(level: i32, title: impl Into<String>, page: u32) -> Self {
        OutlineEntry {
            level,
            title: title.into(),
            page,
        }
    }
}

/// An outline entry projected onto the current display order.
///
/// `display_page` is a position in the not-yet-committed page order and must
/// never be written back to a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayEntry {
    pub level: i32,
    pub title: String,
    pub display_page: u32,
}

/// Structural problems that make a level sequence unwritable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HierarchyError {
    #[error("outline entry {index} has level {level}, the first entry must be level 1")]
    FirstLevel { index: usize, level: i32 },
    #[error("outline entry {index} has invalid level {level}")]
    InvalidLevel { index: usize, level: i32 },
    #[error("outline entry {index} jumps from level {previous} to level {level}")]
    LevelSkip {
        index: usize,
        previous: i32,
        level: i32,
    },
}

/// Stable sort by `(page, level)`, the canonical storage order.
pub fn sort_outline(entries: &mut [OutlineEntry]) {
    entries.sort_by_key(|e| (e.page, e.level));
}

/// Clamp a single level against the running level of the forward pass.
fn clamp_level(level: i32, current: i32) -> i32 {
    level.min(current + 1).max(1)
}

/// Repair a level sequence in a single forward pass.
///
/// Each level is clamped to at most one deeper than the previous output
/// level and to at least 1. Entries are never reordered, so the caller is
/// responsible for passing them in document order.
pub fn normalize_levels(entries: &[OutlineEntry]) -> Vec<OutlineEntry> {
    let mut current = 0;
    entries
        .iter()
        .map(|entry| {
            let level = clamp_level(entry.level, current);
            current = level;
            OutlineEntry {
                level,
                title: entry.title.clone(),
                page: entry.page,
            }
        })
        .collect()
}

/// Same forward pass as [`normalize_levels`], over display entries.
pub(crate) fn normalize_display_levels(entries: Vec<DisplayEntry>) -> Vec<DisplayEntry> {
    let mut current = 0;
    entries
        .into_iter()
        .map(|mut entry| {
            entry.level = clamp_level(entry.level, current);
            current = entry.level;
            entry
        })
        .collect()
}

/// Check that a level sequence can be written as a PDF outline.
pub fn validate_levels(entries: &[OutlineEntry]) -> Result<(), HierarchyError> {
    let mut previous: Option<i32> = None;
    for (index, entry) in entries.iter().enumerate() {
        if entry.level < 1 {
            return Err(HierarchyError::InvalidLevel {
                index,
                level: entry.level,
            });
        }
        match previous {
            None if entry.level != 1 => {
                return Err(HierarchyError::FirstLevel {
                    index,
                    level: entry.level,
                })
            }
            Some(prev) if entry.level > prev + 1 => {
                return Err(HierarchyError::LevelSkip {
                    index,
                    previous: prev,
                    level: entry.level,
                })
            }
            _ => {}
        }
        previous = Some(entry.level);
    }
    Ok(())
}

/// Shift every page number by `offset`, used when a document is appended
/// after `offset` existing pages. Entries on page `0` have no resolvable
/// destination and stay on `0`.
pub fn offset_pages(entries: Vec<OutlineEntry>, offset: u32) -> Vec<OutlineEntry> {
    entries
        .into_iter()
        .map(|mut e| {
            if e.page != 0 {
                e.page += offset;
            }
            e
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(level: i32, title: &str, page: u32) -> OutlineEntry {
        OutlineEntry::new(level, title, page)
    }

    #[test]
    fn test_sort_outline_by_page_then_level() {
        let mut entries = vec![entry(1, "A", 5), entry(1, "B", 2), entry(2, "C", 2)];
        sort_outline(&mut entries);
        assert_eq!(
            entries,
            vec![entry(1, "B", 2), entry(2, "C", 2), entry(1, "A", 5)]
        );
    }

    #[test]
    fn test_sort_outline_is_stable_for_equal_keys() {
        let mut entries = vec![entry(1, "second", 3), entry(1, "first", 3)];
        sort_outline(&mut entries);
        assert_eq!(entries[0].title, "second");
        assert_eq!(entries[1].title, "first");
    }

    #[test]
    fn test_normalize_levels_clamps_skip() {
        let entries = vec![entry(1, "X", 1), entry(3, "Y", 2)];
        assert_eq!(
            normalize_levels(&entries),
            vec![entry(1, "X", 1), entry(2, "Y", 2)]
        );
    }

    #[test]
    fn test_normalize_levels_first_entry_becomes_level_one() {
        let entries = vec![entry(4, "deep", 1)];
        assert_eq!(normalize_levels(&entries)[0].level, 1);
    }

    #[test]
    fn test_normalize_levels_raises_non_positive_levels() {
        let entries = vec![entry(1, "a", 1), entry(0, "b", 1), entry(-3, "c", 2)];
        let levels: Vec<i32> = normalize_levels(&entries).iter().map(|e| e.level).collect();
        assert_eq!(levels, vec![1, 1, 1]);
    }

    #[test]
    fn test_normalize_levels_follows_input_order() {
        // 1, 3, 3, 2 -> 1, 2, 3, 2: the second 3 is legal after the clamped 2.
        let entries = vec![
            entry(1, "a", 1),
            entry(3, "b", 1),
            entry(3, "c", 1),
            entry(2, "d", 1),
        ];
        let levels: Vec<i32> = normalize_levels(&entries).iter().map(|e| e.level).collect();
        assert_eq!(levels, vec![1, 2, 3, 2]);
    }

    #[test]
    fn test_normalize_levels_empty() {
        assert!(normalize_levels(&[]).is_empty());
    }

    #[test]
    fn test_validate_levels_accepts_normalized() {
        let entries = vec![entry(1, "a", 1), entry(2, "b", 1), entry(1, "c", 2)];
        assert!(validate_levels(&entries).is_ok());
        assert!(validate_levels(&[]).is_ok());
    }

    #[test]
    fn test_validate_levels_rejects_skip() {
        let entries = vec![entry(1, "a", 1), entry(3, "b", 2)];
        assert_eq!(
            validate_levels(&entries),
            Err(HierarchyError::LevelSkip {
                index: 1,
                previous: 1,
                level: 3
            })
        );
    }

    #[test]
    fn test_validate_levels_rejects_first_level() {
        let entries = vec![entry(2, "a", 1)];
        assert!(matches!(
            validate_levels(&entries),
            Err(HierarchyError::FirstLevel { index: 0, level: 2 })
        ));
    }

    #[test]
    fn test_validate_levels_rejects_zero() {
        let entries = vec![entry(1, "a", 1), entry(0, "b", 1)];
        assert!(matches!(
            validate_levels(&entries),
            Err(HierarchyError::InvalidLevel { index: 1, level: 0 })
        ));
    }

    #[test]
    fn test_offset_pages() {
        let shifted = offset_pages(vec![entry(1, "a", 1), entry(2, "b", 3)], 10);
        assert_eq!(shifted, vec![entry(1, "a", 11), entry(2, "b", 13)]);
    }

    #[test]
    fn test_offset_pages_keeps_unresolved_entries() {
        let shifted = offset_pages(vec![entry(1, "dangling", 0), entry(1, "b", 1)], 2);
        assert_eq!(shifted, vec![entry(1, "dangling", 0), entry(1, "b", 3)]);
    }
}
