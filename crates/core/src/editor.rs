//! Editing session
//!
//! [`Editor`] bundles the three managers for one open document and runs the
//! save sequence that brings the document in line with them. The document
//! itself stays owned by the caller and is passed in by reference.

use log::{debug, info};
use serde::Deserialize;

use crate::bookmarks::BookmarkStore;
use crate::document::{DocumentError, PdfDocument, RotateDirection};
use crate::outline::{DisplayEntry, OutlineEntry};
use crate::page_order::PageOrderTracker;
use crate::transforms::{Margins, PageTransformSet};
use crate::tree::{build_tree, OutlineNode};

#[derive(Debug, Clone, Default)]
pub struct Editor {
    pub bookmarks: BookmarkStore,
    pub order: PageOrderTracker,
    pub transforms: PageTransformSet,
}

impl Editor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session on `document`, dropping any previous state.
    pub fn load<D: PdfDocument>(&mut self, document: &D) -> Result<(), DocumentError> {
        self.bookmarks.set_outline(document.outline()?);
        self.order.initialize(document.page_count());
        self.transforms = PageTransformSet::new();
        debug!(
            "loaded document with {} pages and {} outline entries",
            self.order.len(),
            self.bookmarks.len()
        );
        Ok(())
    }

    /// Record `added` pages appended after `prior_count` existing ones.
    pub fn add_pages(&mut self, prior_count: usize, added: usize) {
        self.order.extend(prior_count..prior_count + added);
    }

    /// Record an appended document: its pages and its outline, already offset
    /// by `prior_count`.
    pub fn merge_outline(&mut self, prior_count: usize, added: usize, outline: Vec<OutlineEntry>) {
        self.add_pages(prior_count, added);
        self.bookmarks.append(outline);
    }

    pub fn display_outline(&self) -> Vec<DisplayEntry> {
        self.bookmarks.normalize_for_display(self.order.order())
    }

    pub fn display_tree(&self) -> Vec<OutlineNode> {
        build_tree(&self.display_outline())
    }

    /// Write every pending change into `document`.
    ///
    /// The page order is committed first, then the staged transforms, then
    /// the normalized outline is written. A hierarchy error from the
    /// document aborts the save and leaves the store as it was before the
    /// normalization. Returns the outline that was written.
    pub fn save<D: PdfDocument>(
        &mut self,
        document: &mut D,
    ) -> Result<Vec<OutlineEntry>, DocumentError> {
        if self.order.has_changes() {
            let order = self.order.order().to_vec();
            let remapped = self
                .order
                .commit(document, self.bookmarks.outline().to_vec())?;
            // Staged transforms follow their page to its new index.
            self.transforms.reindex(&order);
            self.bookmarks.set_outline(remapped);
        }

        if self.transforms.has_pending() {
            self.transforms.commit_all(document)?;
        }

        let normalized = self.bookmarks.normalize_for_storage();
        document.set_outline(&normalized)?;
        self.bookmarks.set_outline(normalized.clone());
        info!("saved outline with {} entries", normalized.len());
        Ok(normalized)
    }

    /// Apply one scripted action. Returns `false` when the action referred to
    /// something that does not exist and was ignored.
    pub fn apply<D: PdfDocument>(&mut self, action: &EditAction, document: &mut D) -> bool {
        match action {
            EditAction::AddBookmark { level, title, page } => {
                self.bookmarks.add_entry(*level, title.clone(), *page);
                true
            }
            EditAction::UpdateBookmark {
                index,
                level,
                title,
                page,
            } => self
                .bookmarks
                .update_entry(*index, *level, title.clone(), *page),
            EditAction::DeleteBookmark { index } => self.bookmarks.delete_entry(*index),
            EditAction::MoveUp { index } => self.order.move_up(*index),
            EditAction::MoveDown { index } => self.order.move_down(*index),
            EditAction::Rotate { page, direction } => {
                self.transforms.rotate(document, *page, *direction)
            }
            EditAction::SetScale { page, scale } => {
                self.transforms.set_scale(&*document, *page, *scale)
            }
            EditAction::FitTo {
                page,
                width,
                height,
            } => self.transforms.fit_to(&*document, *page, *width, *height),
            EditAction::SetMargins { page, margins } => {
                self.transforms.set_margins(&*document, *page, *margins)
            }
            EditAction::SetUniformMargins { page, margin } => {
                self.transforms
                    .set_uniform_margins(&*document, *page, *margin)
            }
            EditAction::SetGrayscale { page, enabled } => {
                self.transforms.set_grayscale(&*document, *page, *enabled)
            }
            EditAction::ClearScale { page } => {
                self.transforms.clear_scale(*page);
                true
            }
            EditAction::ClearMargins { page } => {
                self.transforms.clear_margins(*page);
                true
            }
            EditAction::ClearGrayscale { page } => {
                self.transforms.clear_grayscale(*page);
                true
            }
        }
    }
}

/// One step of a scripted editing session.
///
/// Bookmark `page` numbers are 1-based like the outline itself; every other
/// `page` and `index` is a 0-based position.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum EditAction {
    AddBookmark {
        level: i32,
        title: String,
        page: u32,
    },
    UpdateBookmark {
        index: usize,
        level: i32,
        title: String,
        page: u32,
    },
    DeleteBookmark {
        index: usize,
    },
    MoveUp {
        index: usize,
    },
    MoveDown {
        index: usize,
    },
    Rotate {
        page: usize,
        direction: RotateDirection,
    },
    SetScale {
        page: usize,
        scale: f32,
    },
    FitTo {
        page: usize,
        width: f32,
        height: f32,
    },
    SetMargins {
        page: usize,
        margins: Margins,
    },
    SetUniformMargins {
        page: usize,
        margin: f32,
    },
    SetGrayscale {
        page: usize,
        #[serde(default = "enabled_default")]
        enabled: bool,
    },
    ClearScale {
        page: usize,
    },
    ClearMargins {
        page: usize,
    },
    ClearGrayscale {
        page: usize,
    },
}

fn enabled_default() -> bool {
    true
}

/// Parse a JSON array of [`EditAction`]s.
pub fn parse_plan(json: &str) -> Result<Vec<EditAction>, serde_json::Error> {
    serde_json::from_str(json)
}
