use std::path::{Path, PathBuf};

use duct::cmd;
use image::RgbImage;
use log::debug;
use lopdf::Document;

use crate::PdfError;

/// Resolution of a page rendered at zoom 1.
pub const BASE_DPI: f32 = 72.0;

/// Renders pages by running poppler's `pdftoppm`.
#[derive(Debug, Clone)]
pub struct Rasterizer {
    program: PathBuf,
}

impl Rasterizer {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Rasterizer {
            program: program.into(),
        }
    }

    /// Use `explicit` when given, otherwise find `pdftoppm` on `PATH`.
    pub fn locate(explicit: Option<PathBuf>) -> Result<Self, PdfError> {
        if let Some(program) = explicit {
            return Ok(Self::new(program));
        }
        which::which("pdftoppm")
            .map(Self::new)
            .map_err(|_| PdfError::Rasterizer("pdftoppm was not found on PATH".into()))
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Render the 0-based `page` of `doc` at `zoom` times its size in points.
    pub fn render(&self, doc: &Document, page: usize, zoom: f32) -> Result<RgbImage, PdfError> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("page.pdf");
        let prefix = dir.path().join("page");

        let mut copy = doc.clone();
        copy.save(&input)?;

        let number = (page + 1).to_string();
        let dpi = resolution(zoom).to_string();
        debug!(
            "rendering page {} at {} dpi with {}",
            number,
            dpi,
            self.program.display()
        );

        let output = cmd!(
            &self.program,
            "-f",
            &number,
            "-l",
            &number,
            "-r",
            &dpi,
            "-png",
            "-singlefile",
            &input,
            &prefix
        )
        .stdout_null()
        .stderr_capture()
        .unchecked()
        .run()
        .map_err(|e| {
            PdfError::Rasterizer(format!("could not run {}: {}", self.program.display(), e))
        })?;

        if !output.status.success() {
            return Err(PdfError::Rasterizer(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(image::open(prefix.with_extension("png"))?.to_rgb8())
    }
}

/// Dots per inch for `zoom`, never below 1.
fn resolution(zoom: f32) -> u32 {
    (BASE_DPI * zoom).round().max(1.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_scales_from_72_dpi() {
        assert_eq!(resolution(1.0), 72);
        assert_eq!(resolution(3.0), 216);
        assert_eq!(resolution(0.0), 1);
    }

    #[test]
    fn explicit_program_wins() {
        let raster = Rasterizer::locate(Some(PathBuf::from("/opt/poppler/pdftoppm"))).unwrap();
        assert_eq!(raster.program(), Path::new("/opt/poppler/pdftoppm"));
    }

    #[test]
    fn missing_program_is_a_rasterizer_error() {
        let raster = Rasterizer::new("/nonexistent/pdftoppm");
        let doc = crate::document::tests::sample_document(1);
        assert!(matches!(
            raster.render(doc.raw_doc(), 0, 1.0),
            Err(PdfError::Rasterizer(_))
        ));
    }
}
