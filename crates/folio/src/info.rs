use std::collections::BTreeMap;
use std::path::PathBuf;

use colored::Colorize;
use folio_core::PdfDocument;
use folio_pdf::LopdfDocument;
use serde::Serialize;

use crate::prelude::{println, *};

#[derive(Debug, clap::Args, Clone)]
pub struct InfoOptions {
    /// Path to the PDF file
    pub path: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
pub struct InfoOutput {
    pub path: String,
    pub pages: usize,
    pub bookmarks: usize,
    pub metadata: BTreeMap<String, String>,
    pub page_details: Vec<PageInfo>,
}

#[derive(Debug, Serialize)]
pub struct PageInfo {
    /// 1-based page number
    pub page: usize,
    pub width: f32,
    pub height: f32,
    pub rotation: u16,
    pub bookmarks: usize,
}

pub fn collect(path: PathBuf, document: &LopdfDocument) -> Result<InfoOutput> {
    let outline = document.outline().map_err(|e| eyre!(e))?;
    let page_details = (0..document.page_count())
        .map(|i| {
            let size = document.page_size(i).map_err(|e| eyre!(e))?;
            Ok(PageInfo {
                page: i + 1,
                width: size.width,
                height: size.height,
                rotation: document.rotation(i).map_err(|e| eyre!(e))?,
                bookmarks: outline.iter().filter(|e| e.page as usize == i + 1).count(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(InfoOutput {
        path: path.display().to_string(),
        pages: document.page_count(),
        bookmarks: outline.len(),
        metadata: document.metadata(),
        page_details,
    })
}

pub fn run(options: InfoOptions, _global: crate::Global) -> Result<()> {
    let document = LopdfDocument::load(&options.path)
        .wrap_err_with(|| f!("Failed to open {}", options.path.display()))?;
    let data = collect(options.path, &document)?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    println!(
        "\n{}: {} page(s), {} bookmark(s)\n",
        data.path.bold(),
        data.pages.to_string().bright_yellow(),
        data.bookmarks.to_string().bright_yellow()
    );

    for (key, value) in &data.metadata {
        println!("{:>10}: {}", key.cyan(), value);
    }
    if !data.metadata.is_empty() {
        println!();
    }

    let mut table = new_table();
    table.add_row(prettytable::row![
        "Page".bold().cyan(),
        "Size (pt)".bold().cyan(),
        "Rotation".bold().cyan(),
        "Bookmarks".bold().cyan()
    ]);
    for page in &data.page_details {
        table.add_row(prettytable::row![
            page.page.to_string().bright_yellow(),
            f!("{:.0} x {:.0}", page.width, page.height),
            f!("{}°", page.rotation),
            page.bookmarks.to_string()
        ]);
    }
    table.printstd();

    Ok(())
}
