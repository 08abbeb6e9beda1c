//! One open document plus the editor state tracking changes to it.

use std::path::{Path, PathBuf};

use colored::Colorize;
use folio_core::{Editor, OutlineEntry, PdfDocument};
use folio_pdf::{LopdfDocument, Rasterizer};
use log::debug;

use crate::config::Config;
use crate::prelude::{println, *};

pub struct Session {
    pub document: LopdfDocument,
    pub editor: Editor,
}

impl Session {
    /// Open `path` and load its outline and page order.
    pub fn open(path: &Path, config: &Config) -> Result<Self> {
        let document = LopdfDocument::load(path)
            .wrap_err_with(|| f!("Failed to open {}", path.display()))?;
        Self::from_document(document, config)
    }

    /// Start a session on a document that is already in memory.
    pub fn from_document(mut document: LopdfDocument, config: &Config) -> Result<Self> {
        match Rasterizer::locate(config.pdftoppm.clone()) {
            Ok(rasterizer) => document.set_rasterizer(Some(rasterizer)),
            // Only page transforms need rendering; they report the problem.
            Err(e) => debug!("no rasterizer: {}", e),
        }
        let mut editor = Editor::new();
        editor.load(&document).map_err(|e| eyre!(e))?;
        Ok(Self { document, editor })
    }

    pub fn page_count(&self) -> usize {
        self.document.page_count()
    }

    /// Turn a 1-based page number from the command line into an index.
    pub fn page_index(&self, page: usize) -> Result<usize> {
        page_index(page, self.page_count())
    }

    /// Commit every pending change and write the document to `output`.
    pub fn save(&mut self, output: &Path) -> Result<Vec<OutlineEntry>> {
        let outline = self
            .editor
            .save(&mut self.document)
            .wrap_err("Failed to apply changes")?;
        self.document
            .save(output)
            .wrap_err_with(|| f!("Failed to write {}", output.display()))?;
        println!(
            "Saved {} ({} pages, {} bookmarks)",
            output.display().to_string().bright_green(),
            self.page_count(),
            outline.len()
        );
        Ok(outline)
    }
}

pub fn page_index(page: usize, count: usize) -> Result<usize> {
    if page == 0 || page > count {
        return Err(Error::PageOutOfRange { page, count }.into());
    }
    Ok(page - 1)
}

/// Validate a bookmark before it reaches the outline.
pub fn check_bookmark(level: i32, title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(Error::EmptyTitle.into());
    }
    if level < 1 {
        return Err(Error::InvalidLevel(level).into());
    }
    Ok(())
}

/// Output path shared by every command that writes a document.
#[derive(Debug, Clone, clap::Args)]
pub struct OutputOptions {
    /// Where to write the resulting PDF
    #[arg(short, long)]
    pub output: PathBuf,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::DynamicImage;

    /// Write a PDF of `pages` blank image pages carrying `outline`.
    pub(crate) fn write_sample_pdf(
        dir: &Path,
        name: &str,
        pages: u32,
        outline: &[OutlineEntry],
    ) -> PathBuf {
        let mut document = LopdfDocument::new();
        for i in 0..pages {
            document
                .append_image_page(&DynamicImage::new_rgb8(10 + i, 10))
                .unwrap();
        }
        document.set_outline(outline).unwrap();
        let path = dir.join(name);
        document.save(&path).unwrap();
        path
    }

    #[test]
    fn page_numbers_are_one_based() {
        assert_eq!(page_index(1, 3).unwrap(), 0);
        assert_eq!(page_index(3, 3).unwrap(), 2);
        assert!(page_index(0, 3).is_err());
        assert!(page_index(4, 3).is_err());
    }

    #[test]
    fn bookmarks_need_a_title_and_a_level() {
        assert!(check_bookmark(1, "Intro").is_ok());
        assert!(check_bookmark(1, "   ").is_err());
        assert!(check_bookmark(0, "Intro").is_err());
    }
}
