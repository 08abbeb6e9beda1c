use std::path::PathBuf;

use colored::Colorize;
use folio_pdf::LopdfDocument;
use indicatif::ProgressBar;

use crate::config::Config;
use crate::insert::report_skip;
use crate::prelude::{println, *};
use crate::session::{OutputOptions, Session};

#[derive(Debug, clap::Args, Clone)]
pub struct MergeOptions {
    /// PDF files to merge, in order
    #[arg(required = true, num_args = 1..)]
    pub paths: Vec<PathBuf>,

    #[clap(flatten)]
    pub out: OutputOptions,
}

/// Merge `paths` in order, skipping files that fail to open or append.
///
/// The first file that opens becomes the base document. Returns the session,
/// if any file opened, and the number of files merged.
fn merge_paths(
    paths: &[PathBuf],
    config: &Config,
    spinner: &ProgressBar,
) -> Result<(Option<Session>, usize)> {
    let mut session: Option<Session> = None;
    let mut merged = 0;
    for path in paths {
        set_spinner_msg(Some(spinner), f!("Merging {}...", path.display()));
        let document = match LopdfDocument::load(path) {
            Ok(document) => document,
            Err(e) => {
                report_skip(spinner, path, &e);
                continue;
            }
        };

        let Some(current) = session.as_mut() else {
            session = Some(Session::from_document(document, config)?);
            merged += 1;
            continue;
        };

        let prior = current.page_count();
        match current.document.append_document(document) {
            Ok(appended) => {
                current
                    .editor
                    .merge_outline(prior, appended.added, appended.outline);
                merged += 1;
            }
            Err(e) => report_skip(spinner, path, &e),
        }
    }
    Ok((session, merged))
}

pub fn run(options: MergeOptions, global: crate::Global) -> Result<()> {
    let config = Config::load(&global)?;
    let spinner = new_spinner()?;
    let (session, merged) = merge_paths(&options.paths, &config, &spinner)?;
    spinner.finish_and_clear();

    let mut session = session.ok_or_eyre("None of the input files could be opened")?;
    println!(
        "Merged {} of {} file(s)",
        merged.to_string().bold(),
        options.paths.len()
    );
    session.save(&options.out.output)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::write_sample_pdf;
    use folio_core::OutlineEntry;

    #[test]
    fn unreadable_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_sample_pdf(dir.path(), "first.pdf", 2, &[]);
        let broken = dir.path().join("broken.pdf");
        std::fs::write(&broken, b"not a pdf").unwrap();
        let second = write_sample_pdf(
            dir.path(),
            "second.pdf",
            1,
            &[OutlineEntry::new(1, "appendix", 1)],
        );

        let paths = vec![first, broken, second];
        let (session, merged) =
            merge_paths(&paths, &Config::default(), &ProgressBar::hidden()).unwrap();
        let session = session.unwrap();

        assert_eq!(merged, 2);
        assert_eq!(session.page_count(), 3);
        assert_eq!(session.editor.order.order(), &[0, 1, 2]);
        assert_eq!(
            session.editor.bookmarks.outline(),
            &[OutlineEntry::new(1, "appendix", 3)]
        );
    }

    #[test]
    fn nothing_opens_without_a_readable_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.pdf");
        let (session, merged) =
            merge_paths(&[missing], &Config::default(), &ProgressBar::hidden()).unwrap();
        assert!(session.is_none());
        assert_eq!(merged, 0);
    }
}
