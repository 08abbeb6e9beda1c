//! Document collaborator contract
//!
//! The core never opens, parses or writes files. Everything it needs from a
//! PDF document goes through [`PdfDocument`], which the `folio_pdf` crate
//! implements on top of lopdf. Page indices are 0-based here; outline page
//! numbers stay 1-based as in [`OutlineEntry`].

use image::RgbImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::outline::{HierarchyError, OutlineEntry};

/// Width and height in PDF points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    pub fn new(width: f32, height: f32) -> Self {
        PageSize { width, height }
    }

    pub fn scaled(&self, factor: f32) -> Self {
        PageSize {
            width: self.width * factor,
            height: self.height * factor,
        }
    }
}

/// Rectangle in PDF points with a top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Direction of a quarter-turn rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotateDirection {
    Left,
    Right,
}

impl RotateDirection {
    /// Apply a quarter turn to a rotation in degrees, keeping it in `0..360`.
    pub fn apply(&self, degrees: u16) -> u16 {
        let current = i32::from(degrees % 360);
        let next = match self {
            RotateDirection::Left => current - 90,
            RotateDirection::Right => current + 90,
        };
        next.rem_euclid(360) as u16
    }
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("page {page} is out of range (document has {count} pages)")]
    PageOutOfRange { page: usize, count: usize },
    #[error("invalid outline hierarchy: {0}")]
    Hierarchy(#[from] HierarchyError),
    #[error("page rendering failed: {0}")]
    Render(String),
    #[error("document backend error: {0}")]
    Backend(String),
}

/// Operations the editor needs from an open PDF document.
pub trait PdfDocument {
    /// Number of pages currently in the document.
    fn page_count(&self) -> usize;

    /// Page rotation in degrees, a multiple of 90 in `0..360`.
    fn rotation(&self, page: usize) -> Result<u16, DocumentError>;

    /// Set a page's rotation; implementations store the value mod 360.
    fn set_rotation(&mut self, page: usize, degrees: u16) -> Result<(), DocumentError>;

    /// Displayed page size in points, with the page rotation applied.
    fn page_size(&self, page: usize) -> Result<PageSize, DocumentError>;

    /// Rasterize a page, `zoom` pixels per point.
    fn render_page(&self, page: usize, zoom: f32) -> Result<RgbImage, DocumentError>;

    /// Rebuild the page sequence so that position `i` holds the page that
    /// was at index `order[i]`. `order` must be a full permutation.
    fn select_pages(&mut self, order: &[usize]) -> Result<(), DocumentError>;

    /// Read the document outline as a flat list.
    fn outline(&self) -> Result<Vec<OutlineEntry>, DocumentError>;

    /// Replace the document outline. Fails with [`DocumentError::Hierarchy`]
    /// when the level sequence skips levels.
    fn set_outline(&mut self, entries: &[OutlineEntry]) -> Result<(), DocumentError>;

    /// Replace a page's content with a raster image: the page becomes a
    /// `canvas` sized white sheet with `image` drawn into `content`.
    fn replace_with_image(
        &mut self,
        page: usize,
        canvas: PageSize,
        content: PageRect,
        image: &RgbImage,
    ) -> Result<(), DocumentError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotate_right_wraps() {
        assert_eq!(RotateDirection::Right.apply(0), 90);
        assert_eq!(RotateDirection::Right.apply(270), 0);
    }

    #[test]
    fn test_rotate_left_wraps() {
        assert_eq!(RotateDirection::Left.apply(0), 270);
        assert_eq!(RotateDirection::Left.apply(90), 0);
    }

    #[test]
    fn test_rotate_normalizes_out_of_range_input() {
        assert_eq!(RotateDirection::Right.apply(450), 180);
    }

    #[test]
    fn test_page_size_scaled() {
        let size = PageSize::new(100.0, 200.0).scaled(0.5);
        assert_eq!(size, PageSize::new(50.0, 100.0));
    }
}
