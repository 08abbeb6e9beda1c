//! In-memory [`PdfDocument`] used by the unit tests.

use image::{Rgb, RgbImage};

use crate::document::{DocumentError, PageRect, PageSize, PdfDocument};
use crate::outline::{validate_levels, OutlineEntry};

#[derive(Debug, Clone)]
pub struct FakePage {
    /// Original index, kept across reorders so tests can follow pages.
    pub id: usize,
    pub size: PageSize,
    pub rotation: u16,
    pub flattened: Option<Flattened>,
}

#[derive(Debug, Clone)]
pub struct Flattened {
    pub canvas: PageSize,
    pub content: PageRect,
    pub image_size: (u32, u32),
    pub pixel: Rgb<u8>,
}

#[derive(Debug, Default)]
pub struct FakeDocument {
    pub pages: Vec<FakePage>,
    pub outline: Vec<OutlineEntry>,
}

impl FakeDocument {
    pub fn with_pages(count: usize) -> Self {
        let pages = (0..count)
            .map(|id| FakePage {
                id,
                size: PageSize::new(100.0, 200.0),
                rotation: 0,
                flattened: None,
            })
            .collect();
        FakeDocument {
            pages,
            ..Default::default()
        }
    }

    pub fn ids(&self) -> Vec<usize> {
        self.pages.iter().map(|p| p.id).collect()
    }

    fn check(&self, page: usize) -> Result<(), DocumentError> {
        if page < self.pages.len() {
            Ok(())
        } else {
            Err(DocumentError::PageOutOfRange {
                page,
                count: self.pages.len(),
            })
        }
    }
}

impl PdfDocument for FakeDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn rotation(&self, page: usize) -> Result<u16, DocumentError> {
        self.check(page)?;
        Ok(self.pages[page].rotation)
    }

    fn set_rotation(&mut self, page: usize, degrees: u16) -> Result<(), DocumentError> {
        self.check(page)?;
        self.pages[page].rotation = degrees % 360;
        Ok(())
    }

    fn page_size(&self, page: usize) -> Result<PageSize, DocumentError> {
        self.check(page)?;
        let p = &self.pages[page];
        if p.rotation % 180 == 90 {
            Ok(PageSize::new(p.size.height, p.size.width))
        } else {
            Ok(p.size)
        }
    }

    fn render_page(&self, page: usize, zoom: f32) -> Result<RgbImage, DocumentError> {
        let size = self.page_size(page)?;
        let id = self.pages[page].id as u8;
        let width = (size.width * zoom).round() as u32;
        let height = (size.height * zoom).round() as u32;
        Ok(RgbImage::from_pixel(
            width,
            height,
            Rgb([200, id.wrapping_mul(10), 40]),
        ))
    }

    fn select_pages(&mut self, order: &[usize]) -> Result<(), DocumentError> {
        let mut seen = vec![false; self.pages.len()];
        for &i in order {
            if i >= seen.len() || seen[i] {
                return Err(DocumentError::Backend("not a permutation".into()));
            }
            seen[i] = true;
        }
        if order.len() != self.pages.len() {
            return Err(DocumentError::Backend("not a permutation".into()));
        }
        self.pages = order.iter().map(|&i| self.pages[i].clone()).collect();
        Ok(())
    }

    fn outline(&self) -> Result<Vec<OutlineEntry>, DocumentError> {
        Ok(self.outline.clone())
    }

    fn set_outline(&mut self, entries: &[OutlineEntry]) -> Result<(), DocumentError> {
        validate_levels(entries)?;
        self.outline = entries.to_vec();
        Ok(())
    }

    fn replace_with_image(
        &mut self,
        page: usize,
        canvas: PageSize,
        content: PageRect,
        image: &RgbImage,
    ) -> Result<(), DocumentError> {
        self.check(page)?;
        let p = &mut self.pages[page];
        p.flattened = Some(Flattened {
            canvas,
            content,
            image_size: image.dimensions(),
            pixel: *image.get_pixel(0, 0),
        });
        p.size = canvas;
        p.rotation = 0;
        Ok(())
    }
}
