//! Per-page visual transforms
//!
//! Rotation is applied to the document right away. Scale, margins and
//! grayscale are staged per page and only reach the document in
//! [`PageTransformSet::commit_all`], which flattens each affected page into a
//! raster image on a new canvas.
//!
//! Every page touched by a transform keeps a snapshot of how it looked before
//! the first change, so callers can compare against the original or tell
//! whether a page differs from it.

use std::collections::BTreeMap;

use image::{imageops, DynamicImage, RgbImage};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::document::{DocumentError, PageRect, PageSize, PdfDocument, RotateDirection};

/// Pixels per point used when flattening a page.
pub const FLATTEN_ZOOM: f32 = 3.0;

/// Margins in points added around the page content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Margins {
    pub fn new(top: f32, right: f32, bottom: f32, left: f32) -> Self {
        Margins {
            top,
            right,
            bottom,
            left,
        }
    }

    pub fn uniform(margin: f32) -> Self {
        Margins::new(margin, margin, margin, margin)
    }

    pub fn is_zero(&self) -> bool {
        !(self.top > 0.0 || self.right > 0.0 || self.bottom > 0.0 || self.left > 0.0)
    }

    pub fn horizontal(&self) -> f32 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f32 {
        self.top + self.bottom
    }
}

/// Staged fields for one page. `None` means the field was never set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PendingTransform {
    pub scale: Option<f32>,
    pub margins: Option<Margins>,
    pub grayscale: Option<bool>,
}

impl PendingTransform {
    pub fn is_empty(&self) -> bool {
        self.scale.is_none() && self.margins.is_none() && self.grayscale.is_none()
    }

    pub fn scale(&self) -> f32 {
        self.scale.unwrap_or(1.0)
    }

    pub fn margins(&self) -> Margins {
        self.margins.unwrap_or_default()
    }

    pub fn grayscale(&self) -> bool {
        self.grayscale.unwrap_or(false)
    }

    /// Whether committing this record changes the page content.
    pub fn needs_flatten(&self) -> bool {
        self.grayscale() || self.scale() != 1.0 || !self.margins().is_zero()
    }
}

/// What a page looked like before its first transform.
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    pub rotation: u16,
    pub size: PageSize,
    pub preview: Option<RgbImage>,
}

#[derive(Debug, Clone, Default)]
pub enum PageState {
    #[default]
    Unmodified,
    Modified {
        original: PageSnapshot,
        pending: PendingTransform,
    },
}

/// Canvas and content placement for a flattened page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlattenLayout {
    pub canvas: PageSize,
    pub content: PageRect,
}

/// Lay out a page of `size` under `transform`: content scaled, then padded
/// by the margins.
pub fn flatten_layout(size: PageSize, transform: &PendingTransform) -> FlattenLayout {
    let content = size.scaled(transform.scale());
    let margins = transform.margins();
    FlattenLayout {
        canvas: PageSize::new(
            content.width + margins.horizontal(),
            content.height + margins.vertical(),
        ),
        content: PageRect {
            x: margins.left,
            y: margins.top,
            width: content.width,
            height: content.height,
        },
    }
}

fn desaturate(image: &RgbImage) -> RgbImage {
    DynamicImage::ImageLuma8(imageops::grayscale(image)).to_rgb8()
}

/// Rendered page with the staged transforms applied, for display.
#[derive(Debug, Clone)]
pub struct TransformPreview {
    pub image: RgbImage,
    /// Size of the final page at the preview zoom, margins included.
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Default)]
pub struct PageTransformSet {
    pages: BTreeMap<usize, PageState>,
    snapshot_zoom: Option<f32>,
}

impl PageTransformSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also render a thumbnail at `zoom` when a page's snapshot is taken.
    pub fn with_snapshot_previews(mut self, zoom: f32) -> Self {
        self.snapshot_zoom = Some(zoom);
        self
    }

    pub fn state(&self, page: usize) -> &PageState {
        static UNMODIFIED: PageState = PageState::Unmodified;
        self.pages.get(&page).unwrap_or(&UNMODIFIED)
    }

    /// The staged record for `page`, if it has any field set.
    pub fn pending(&self, page: usize) -> Option<&PendingTransform> {
        match self.pages.get(&page) {
            Some(PageState::Modified { pending, .. }) if !pending.is_empty() => Some(pending),
            _ => None,
        }
    }

    /// Page indices with a staged record, ascending.
    pub fn pending_pages(&self) -> Vec<usize> {
        self.pages
            .keys()
            .copied()
            .filter(|&page| self.pending(page).is_some())
            .collect()
    }

    pub fn has_pending(&self) -> bool {
        self.pages
            .values()
            .any(|s| matches!(s, PageState::Modified { pending, .. } if !pending.is_empty()))
    }

    pub fn original(&self, page: usize) -> Option<&PageSnapshot> {
        match self.pages.get(&page) {
            Some(PageState::Modified { original, .. }) => Some(original),
            _ => None,
        }
    }

    /// Forget the snapshot of `page`. Staged fields are dropped with it.
    pub fn clear_original(&mut self, page: usize) {
        self.pages.remove(&page);
    }

    /// Move page state along with a page reorder: the state of page
    /// `order[i]` ends up on page `i`.
    pub fn reindex(&mut self, order: &[usize]) {
        let mut moved = BTreeMap::new();
        for (new_index, old_index) in order.iter().enumerate() {
            if let Some(state) = self.pages.remove(old_index) {
                moved.insert(new_index, state);
            }
        }
        // Anything left was keyed past the end of the order.
        for (page, state) in std::mem::take(&mut self.pages) {
            moved.entry(page).or_insert(state);
        }
        self.pages = moved;
    }

    fn snapshot<D: PdfDocument>(&self, document: &D, page: usize) -> Option<PageSnapshot> {
        let rotation = document.rotation(page).ok()?;
        let size = document.page_size(page).ok()?;
        let preview = self
            .snapshot_zoom
            .and_then(|zoom| match document.render_page(page, zoom) {
                Ok(image) => Some(image),
                Err(e) => {
                    warn!("could not render snapshot of page {}: {}", page + 1, e);
                    None
                }
            });
        Some(PageSnapshot {
            rotation,
            size,
            preview,
        })
    }

    /// Get the staged record of `page`, taking the snapshot on first touch.
    fn pending_mut<D: PdfDocument>(
        &mut self,
        document: &D,
        page: usize,
    ) -> Option<&mut PendingTransform> {
        if page >= document.page_count() {
            debug!("ignoring transform on out of range page {}", page);
            return None;
        }
        if !matches!(self.pages.get(&page), Some(PageState::Modified { .. })) {
            let original = self.snapshot(document, page)?;
            self.pages.insert(
                page,
                PageState::Modified {
                    original,
                    pending: PendingTransform::default(),
                },
            );
        }
        match self.pages.get_mut(&page) {
            Some(PageState::Modified { pending, .. }) => Some(pending),
            _ => None,
        }
    }

    fn clear_field(&mut self, page: usize, clear: impl FnOnce(&mut PendingTransform)) {
        if let Some(PageState::Modified { pending, .. }) = self.pages.get_mut(&page) {
            clear(pending);
        }
    }

    pub fn set_scale<D: PdfDocument>(&mut self, document: &D, page: usize, scale: f32) -> bool {
        if scale.is_nan() || scale <= 0.0 {
            debug!("ignoring non-positive scale {} for page {}", scale, page);
            return false;
        }
        self.pending_mut(document, page)
            .map(|p| p.scale = Some(scale))
            .is_some()
    }

    pub fn scale(&self, page: usize) -> f32 {
        self.pending(page).map_or(1.0, PendingTransform::scale)
    }

    pub fn clear_scale(&mut self, page: usize) {
        self.clear_field(page, |p| p.scale = None);
    }

    pub fn set_margins<D: PdfDocument>(
        &mut self,
        document: &D,
        page: usize,
        margins: Margins,
    ) -> bool {
        let clamped = Margins::new(
            margins.top.max(0.0),
            margins.right.max(0.0),
            margins.bottom.max(0.0),
            margins.left.max(0.0),
        );
        self.pending_mut(document, page)
            .map(|p| p.margins = Some(clamped))
            .is_some()
    }

    pub fn set_uniform_margins<D: PdfDocument>(
        &mut self,
        document: &D,
        page: usize,
        margin: f32,
    ) -> bool {
        self.set_margins(document, page, Margins::uniform(margin))
    }

    pub fn margins(&self, page: usize) -> Margins {
        self.pending(page).map_or_else(Margins::default, PendingTransform::margins)
    }

    pub fn clear_margins(&mut self, page: usize) {
        self.clear_field(page, |p| p.margins = None);
    }

    pub fn set_grayscale<D: PdfDocument>(
        &mut self,
        document: &D,
        page: usize,
        enabled: bool,
    ) -> bool {
        self.pending_mut(document, page)
            .map(|p| p.grayscale = Some(enabled))
            .is_some()
    }

    pub fn grayscale(&self, page: usize) -> bool {
        self.pending(page).is_some_and(PendingTransform::grayscale)
    }

    pub fn clear_grayscale(&mut self, page: usize) {
        self.clear_field(page, |p| p.grayscale = None);
    }

    /// Rotate `page` a quarter turn on the document.
    pub fn rotate<D: PdfDocument>(
        &mut self,
        document: &mut D,
        page: usize,
        direction: RotateDirection,
    ) -> bool {
        if self.pending_mut(&*document, page).is_none() {
            return false;
        }
        let result = document
            .rotation(page)
            .and_then(|current| document.set_rotation(page, direction.apply(current)));
        match result {
            Ok(()) => true,
            Err(e) => {
                warn!("could not rotate page {}: {}", page + 1, e);
                false
            }
        }
    }

    pub fn rotation<D: PdfDocument>(&self, document: &D, page: usize) -> u16 {
        document.rotation(page).unwrap_or(0)
    }

    /// Scale `page` to fit inside `width` x `height`, keeping its aspect ratio.
    pub fn fit_to<D: PdfDocument>(
        &mut self,
        document: &D,
        page: usize,
        width: f32,
        height: f32,
    ) -> bool {
        let size = self.page_size(document, page);
        if size.width <= 0.0 || size.height <= 0.0 {
            return false;
        }
        let scale = (width / size.width).min(height / size.height);
        self.set_scale(document, page, scale)
    }

    /// Current displayed size, zero for an unknown page.
    pub fn page_size<D: PdfDocument>(&self, document: &D, page: usize) -> PageSize {
        document
            .page_size(page)
            .unwrap_or_else(|_| PageSize::new(0.0, 0.0))
    }

    pub fn scaled_page_size<D: PdfDocument>(&self, document: &D, page: usize) -> PageSize {
        self.page_size(document, page).scaled(self.scale(page))
    }

    /// Size the page will have after commit, margins included.
    pub fn final_page_size<D: PdfDocument>(&self, document: &D, page: usize) -> PageSize {
        let scaled = self.scaled_page_size(document, page);
        let margins = self.margins(page);
        PageSize::new(
            scaled.width + margins.horizontal(),
            scaled.height + margins.vertical(),
        )
    }

    /// Staged fields, or a rotation that differs from the snapshot.
    pub fn has_page_changes<D: PdfDocument>(&self, document: &D, page: usize) -> bool {
        if self.pending(page).is_some() {
            return true;
        }
        self.original(page)
            .is_some_and(|original| original.rotation != self.rotation(document, page))
    }

    pub fn preview<D: PdfDocument>(
        &self,
        document: &D,
        page: usize,
        zoom: f32,
    ) -> Option<TransformPreview> {
        let rendered = match document.render_page(page, zoom) {
            Ok(image) => image,
            Err(e) => {
                debug!("no preview for page {}: {}", page, e);
                return None;
            }
        };
        let image = if self.grayscale(page) {
            desaturate(&rendered)
        } else {
            rendered
        };
        let scale = self.scale(page);
        let margins = self.margins(page);
        let width = (image.width() as f32 * scale) as u32 + (margins.horizontal() * zoom) as u32;
        let height = (image.height() as f32 * scale) as u32 + (margins.vertical() * zoom) as u32;
        Some(TransformPreview {
            image,
            width,
            height,
        })
    }

    /// Flatten every page with staged changes into the document.
    ///
    /// Pages are processed from the highest index down. Indices past the end
    /// of the document are skipped. On success all staged records and
    /// snapshots are dropped; on failure the pages not yet processed keep
    /// their records. Returns the number of pages rewritten.
    pub fn commit_all<D: PdfDocument>(&mut self, document: &mut D) -> Result<usize, DocumentError> {
        let page_count = document.page_count();
        let mut flattened = 0;

        for page in self.pending_pages().into_iter().rev() {
            if page >= page_count {
                debug!("skipping transform for page {} past the end", page);
                continue;
            }
            let Some(transform) = self.pending(page).cloned() else {
                continue;
            };
            if transform.needs_flatten() {
                flatten_page(document, page, &transform)?;
                flattened += 1;
            }
            self.pages.remove(&page);
        }

        self.pages.clear();
        if flattened > 0 {
            info!("flattened {} pages", flattened);
        }
        Ok(flattened)
    }
}

fn flatten_page<D: PdfDocument>(
    document: &mut D,
    page: usize,
    transform: &PendingTransform,
) -> Result<(), DocumentError> {
    let layout = flatten_layout(document.page_size(page)?, transform);
    let rendered = document.render_page(page, FLATTEN_ZOOM)?;
    let image = if transform.grayscale() {
        desaturate(&rendered)
    } else {
        rendered
    };
    debug!(
        "page {}: canvas {}x{}, content at ({}, {})",
        page + 1,
        layout.canvas.width,
        layout.canvas.height,
        layout.content.x,
        layout.content.y
    );
    document.replace_with_image(page, layout.canvas, layout.content, &image)
}
