//! Core library for folio
//!
//! This crate implements the **Functional Core** of the folio PDF editor,
//! following the Functional Core - Imperative Shell architectural pattern.
//!
//! # Architecture Overview
//!
//! The workspace is split by responsibility:
//!
//! - **`folio_core`** (this crate): outline and page bookkeeping with zero file or process I/O
//! - **`folio_pdf`**: the lopdf-backed document, rasterization and conversion
//! - **`folio`**: command-line orchestration (the Imperative Shell)
//!
//! The core never touches a file. Everything it needs from an open PDF goes
//! through the [`PdfDocument`] trait, which keeps every rule in this crate
//! testable against a small in-memory document.
//!
//! # Module Organization
//!
//! - [`outline`]: the flat outline model, level normalization and validation
//! - [`bookmarks`]: [`BookmarkStore`], outline editing and display projection
//! - [`page_order`]: [`PageOrderTracker`], pending reorders and their commit
//! - [`transforms`]: [`PageTransformSet`], rotation and staged page transforms
//! - [`tree`]: nesting a flat outline for tree views
//! - [`editor`]: [`Editor`], one editing session and its save sequence
//! - [`document`]: the [`PdfDocument`] collaborator contract
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use folio_core::{Editor, PdfDocument};
//!
//! let mut editor = Editor::new();
//! editor.load(&document)?;
//!
//! // Move the last page to the front and make it grayscale.
//! let last = editor.order.len() - 1;
//! for index in (1..=last).rev() {
//!     editor.order.move_up(index);
//! }
//! editor.transforms.set_grayscale(&document, last, true);
//!
//! // Reorder, flatten, normalize and write the outline.
//! let outline = editor.save(&mut document)?;
//! ```

pub mod bookmarks;
pub mod document;
pub mod editor;
pub mod outline;
pub mod page_order;
pub mod transforms;
pub mod tree;

#[cfg(test)]
mod fixtures;

pub use bookmarks::BookmarkStore;
pub use document::{DocumentError, PageRect, PageSize, PdfDocument, RotateDirection};
pub use editor::{parse_plan, EditAction, Editor};
pub use outline::{DisplayEntry, HierarchyError, OutlineEntry};
pub use page_order::{plan_moves, OrderError, PagePosition, PageOrderTracker};
pub use transforms::{Margins, PageTransformSet, PendingTransform, TransformPreview};
pub use tree::{build_tree, OutlineNode};
