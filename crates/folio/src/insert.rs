use std::path::{Path, PathBuf};

use colored::Colorize;
use folio_pdf::convert::is_convertible;
use folio_pdf::images::is_image_file;
use folio_pdf::{Converter, LopdfDocument, PdfError};
use indicatif::ProgressBar;
use log::warn;

use crate::config::Config;
use crate::prelude::{eprintln, println, *};
use crate::session::{OutputOptions, Session};

#[derive(Debug, clap::Args, Clone)]
pub struct AddImagesOptions {
    /// Existing PDF to append to; a new document is created when omitted
    #[arg(long)]
    pub into: Option<PathBuf>,

    /// Image files (png, jpg, gif, bmp, tiff, webp), one page each
    #[arg(required = true, num_args = 1..)]
    pub images: Vec<PathBuf>,

    #[clap(flatten)]
    pub out: OutputOptions,
}

#[derive(Debug, clap::Args, Clone)]
pub struct AddDocumentsOptions {
    /// Existing PDF to append to; a new document is created when omitted
    #[arg(long)]
    pub into: Option<PathBuf>,

    /// Office documents (doc, docx, odt, rtf) or PDFs, appended in order
    #[arg(required = true, num_args = 1..)]
    pub documents: Vec<PathBuf>,

    #[clap(flatten)]
    pub out: OutputOptions,
}

/// Open `--into` or start an empty document.
fn open_target(into: Option<&Path>, config: &Config) -> Result<Session> {
    match into {
        Some(path) => Session::open(path, config),
        None => Session::from_document(LopdfDocument::new(), config),
    }
}

/// Log a skipped batch input and show it above the spinner.
pub(crate) fn report_skip(spinner: &ProgressBar, path: &Path, error: &dyn std::fmt::Display) {
    warn!("skipping {}: {}", path.display(), error);
    spinner.suspend(|| eprintln!("{} {}: {}", "skipped".yellow(), path.display(), error));
}

fn finish(mut session: Session, added: usize, total: usize, output: &Path) -> Result<()> {
    if added == 0 {
        return Err(Error::NothingToDo(f!(
            "none of the {} input file(s) could be added",
            total
        ))
        .into());
    }
    println!("Added {} of {} file(s)", added.to_string().bold(), total);
    session.save(output)?;
    Ok(())
}

/// Append one page per image, skipping files that are not images or fail
/// to decode. Returns the number of images added.
fn add_images(session: &mut Session, paths: &[PathBuf], spinner: &ProgressBar) -> usize {
    let mut added = 0;
    for path in paths {
        set_spinner_msg(Some(spinner), f!("Adding {}...", path.display()));
        if !is_image_file(path) {
            report_skip(spinner, path, &"not a supported image type");
            continue;
        }
        let prior = session.page_count();
        match session.document.append_image_file(path) {
            Ok(_) => {
                session.editor.add_pages(prior, 1);
                added += 1;
            }
            Err(e) => report_skip(spinner, path, &e),
        }
    }
    added
}

pub fn run_images(options: AddImagesOptions, global: crate::Global) -> Result<()> {
    let config = Config::load(&global)?;
    let mut session = open_target(options.into.as_deref(), &config)?;
    let spinner = new_spinner()?;
    let added = add_images(&mut session, &options.images, &spinner);
    spinner.finish_and_clear();

    finish(session, added, options.images.len(), &options.out.output)
}

/// Load `path` as a PDF, converting it first unless it already is one.
fn load_document(
    path: &Path,
    converter: Option<&Converter>,
    scratch: &Path,
) -> std::result::Result<LopdfDocument, PdfError> {
    if is_pdf(path) {
        return LopdfDocument::load(path);
    }
    if !is_convertible(path) {
        return Err(PdfError::Conversion(f!(
            "unsupported file type: {}",
            path.display()
        )));
    }
    let converter = converter
        .ok_or_else(|| PdfError::Conversion("no document converter available".into()))?;
    let converted = converter.convert(path, scratch)?;
    LopdfDocument::load(converted)
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// Append every document in order, skipping the ones that fail to load,
/// convert or append. Returns the number of documents added.
fn add_documents(
    session: &mut Session,
    paths: &[PathBuf],
    converter: Option<&Converter>,
    scratch: &Path,
    spinner: &ProgressBar,
) -> usize {
    let mut added = 0;
    for path in paths {
        set_spinner_msg(Some(spinner), f!("Adding {}...", path.display()));
        let prior = session.page_count();
        let appended = load_document(path, converter, scratch)
            .and_then(|document| session.document.append_document(document));
        match appended {
            Ok(appended) => {
                session
                    .editor
                    .merge_outline(prior, appended.added, appended.outline);
                added += 1;
            }
            Err(e) => report_skip(spinner, path, &e),
        }
    }
    added
}

pub fn run_documents(options: AddDocumentsOptions, global: crate::Global) -> Result<()> {
    let config = Config::load(&global)?;

    // Only look for LibreOffice when something needs converting.
    let converter = if options.documents.iter().any(|p| is_convertible(p)) {
        Some(
            Converter::locate(config.soffice.clone())
                .map_err(|e| eyre!(e))?
                .with_timeout(config.convert_timeout),
        )
    } else {
        None
    };

    let mut session = open_target(options.into.as_deref(), &config)?;
    let scratch = tempfile::tempdir()?;
    let spinner = new_spinner()?;
    let added = add_documents(
        &mut session,
        &options.documents,
        converter.as_ref(),
        scratch.path(),
        &spinner,
    );
    spinner.finish_and_clear();

    finish(session, added, options.documents.len(), &options.out.output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::write_sample_pdf;
    use folio_core::OutlineEntry;
    use image::{Rgb, RgbImage};

    #[test]
    fn pdfs_skip_conversion() {
        assert!(is_pdf(Path::new("a/Report.PDF")));
        assert!(!is_pdf(Path::new("report.docx")));
    }

    #[test]
    fn unsupported_files_are_rejected_before_conversion() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_document(Path::new("notes.txt"), None, dir.path());
        assert!(matches!(result, Err(PdfError::Conversion(_))));
    }

    #[test]
    fn office_files_need_a_converter() {
        let dir = tempfile::tempdir().unwrap();
        match load_document(Path::new("notes.odt"), None, dir.path()) {
            Err(err) => assert!(err.to_string().contains("no document converter")),
            Ok(_) => panic!("converted without a converter"),
        }
    }

    #[test]
    fn bad_images_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let target = write_sample_pdf(dir.path(), "target.pdf", 2, &[]);
        let good = dir.path().join("photo.png");
        RgbImage::from_pixel(4, 3, Rgb([1, 2, 3])).save(&good).unwrap();
        let corrupt = dir.path().join("corrupt.png");
        std::fs::write(&corrupt, b"not a png").unwrap();
        let text = dir.path().join("notes.txt");
        std::fs::write(&text, b"hello").unwrap();

        let mut session = Session::open(&target, &Config::default()).unwrap();
        session.editor.order.move_up(1);
        let added = add_images(
            &mut session,
            &[corrupt, good, text],
            &ProgressBar::hidden(),
        );

        assert_eq!(added, 1);
        assert_eq!(session.page_count(), 3);
        assert_eq!(session.editor.order.order(), &[1, 0, 2]);
    }

    #[test]
    fn bad_documents_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let target = write_sample_pdf(dir.path(), "target.pdf", 1, &[]);
        let broken = dir.path().join("broken.pdf");
        std::fs::write(&broken, b"%PDF-1.5 truncated").unwrap();
        let appendix = write_sample_pdf(
            dir.path(),
            "appendix.pdf",
            2,
            &[OutlineEntry::new(1, "Appendix", 1)],
        );
        let report = dir.path().join("report.docx");

        let mut session = Session::open(&target, &Config::default()).unwrap();
        let added = add_documents(
            &mut session,
            &[broken, report, appendix],
            None,
            dir.path(),
            &ProgressBar::hidden(),
        );

        assert_eq!(added, 1);
        assert_eq!(session.page_count(), 3);
        assert_eq!(session.editor.order.order(), &[0, 1, 2]);
        assert_eq!(
            session.editor.bookmarks.outline(),
            &[OutlineEntry::new(1, "Appendix", 2)]
        );
    }
}
