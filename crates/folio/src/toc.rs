use std::path::PathBuf;

use colored::Colorize;
use folio_core::{OutlineEntry, OutlineNode};

use crate::config::Config;
use crate::prelude::{println, *};
use crate::session::{check_bookmark, OutputOptions, Session};

#[derive(Debug, clap::Parser)]
#[command(name = "toc")]
#[command(about = "Bookmark (table of contents) operations")]
pub struct App {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// Print the bookmarks
    Show(ShowOptions),

    /// Add a bookmark
    Add(AddOptions),

    /// Change a bookmark, addressed by page and its position on that page
    Update(UpdateOptions),

    /// Delete a bookmark, addressed by page and its position on that page
    Delete(DeleteOptions),

    /// Rewrite the outline with valid nesting levels
    Normalize(NormalizeOptions),
}

#[derive(Debug, clap::Args, Clone)]
pub struct ShowOptions {
    /// Path to the PDF file
    pub path: PathBuf,

    /// Print the nested tree instead of the flat list
    #[arg(long)]
    pub tree: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, clap::Args, Clone)]
pub struct AddOptions {
    /// Path to the PDF file
    pub path: PathBuf,

    /// Bookmark title
    #[arg(long, short = 't')]
    pub title: String,

    /// 1-based page the bookmark points at
    #[arg(long, short = 'p')]
    pub page: usize,

    /// Nesting level, 1 for top-level entries
    #[arg(long, short = 'l', default_value = "1", allow_negative_numbers = true)]
    pub level: i32,

    #[clap(flatten)]
    pub out: OutputOptions,
}

#[derive(Debug, clap::Args, Clone)]
pub struct UpdateOptions {
    /// Path to the PDF file
    pub path: PathBuf,

    /// 1-based page holding the bookmark
    #[arg(long, short = 'p')]
    pub page: usize,

    /// 1-based position among the bookmarks on that page
    #[arg(long, default_value = "1")]
    pub index: usize,

    /// New title
    #[arg(long, short = 't')]
    pub title: Option<String>,

    /// New nesting level
    #[arg(long, short = 'l', allow_negative_numbers = true)]
    pub level: Option<i32>,

    /// New 1-based target page
    #[arg(long)]
    pub to_page: Option<usize>,

    #[clap(flatten)]
    pub out: OutputOptions,
}

#[derive(Debug, clap::Args, Clone)]
pub struct DeleteOptions {
    /// Path to the PDF file
    pub path: PathBuf,

    /// 1-based page holding the bookmark
    #[arg(long, short = 'p')]
    pub page: usize,

    /// 1-based position among the bookmarks on that page
    #[arg(long, default_value = "1")]
    pub index: usize,

    #[clap(flatten)]
    pub out: OutputOptions,
}

#[derive(Debug, clap::Args, Clone)]
pub struct NormalizeOptions {
    /// Path to the PDF file
    pub path: PathBuf,

    #[clap(flatten)]
    pub out: OutputOptions,
}

pub fn run(app: App, global: crate::Global) -> Result<()> {
    let config = Config::load(&global)?;
    match app.command {
        Commands::Show(options) => show(options, &config),
        Commands::Add(options) => add(options, &config),
        Commands::Update(options) => update(options, &config),
        Commands::Delete(options) => delete(options, &config),
        Commands::Normalize(options) => {
            let mut session = Session::open(&options.path, &config)?;
            let before = session.editor.bookmarks.outline().to_vec();
            let after = session.save(&options.out.output)?;
            let changed = before
                .iter()
                .zip(&after)
                .filter(|(b, a)| b.level != a.level)
                .count();
            println!("Adjusted the level of {} bookmark(s)", changed);
            Ok(())
        }
    }
}

fn show(options: ShowOptions, config: &Config) -> Result<()> {
    let session = Session::open(&options.path, config)?;
    let editor = &session.editor;

    if options.tree {
        let tree = editor.display_tree();
        if options.json {
            println!("{}", serde_json::to_string_pretty(&tree)?);
        } else {
            print_tree(&tree, 0);
        }
        return Ok(());
    }

    let outline = editor.bookmarks.outline();
    if options.json {
        println!("{}", serde_json::to_string_pretty(outline)?);
        return Ok(());
    }

    if outline.is_empty() {
        println!("No bookmarks.");
        return Ok(());
    }

    let mut table = new_table();
    table.add_row(prettytable::row![
        "Page".bold().cyan(),
        "Level".bold().cyan(),
        "Title".bold().cyan()
    ]);
    for entry in outline {
        table.add_row(prettytable::row![
            entry.page.to_string().bright_yellow(),
            entry.level.to_string(),
            indented(entry)
        ]);
    }
    table.printstd();
    Ok(())
}

fn indented(entry: &OutlineEntry) -> String {
    let depth = entry.level.max(1) as usize - 1;
    f!("{}{}", "  ".repeat(depth), entry.title)
}

fn print_tree(nodes: &[OutlineNode], depth: usize) {
    for node in nodes {
        println!(
            "{}{} {}",
            "  ".repeat(depth),
            node.title.bright_white(),
            f!("p.{}", node.page).dimmed()
        );
        print_tree(&node.children, depth + 1);
    }
}

/// Index into the outline of the `position`-th (1-based) bookmark on `page`.
fn locate(session: &Session, page: usize, position: usize) -> Result<usize> {
    let page_number = page as u32;
    position
        .checked_sub(1)
        .and_then(|i| {
            session
                .editor
                .bookmarks
                .entries_on_page(page_number)
                .get(i)
                .map(|(index, _)| *index)
        })
        .ok_or_else(|| {
            Error::NoSuchBookmark {
                page: page_number,
                index: position,
            }
            .into()
        })
}

fn add(options: AddOptions, config: &Config) -> Result<()> {
    check_bookmark(options.level, &options.title)?;
    let mut session = Session::open(&options.path, config)?;
    session.page_index(options.page)?;

    let title = options.title.trim().to_string();
    session
        .editor
        .bookmarks
        .add_entry(options.level, title.clone(), options.page as u32);
    println!("Added {} on page {}", title.bright_white(), options.page);
    session.save(&options.out.output)?;
    Ok(())
}

fn update(options: UpdateOptions, config: &Config) -> Result<()> {
    let mut session = Session::open(&options.path, config)?;
    let index = locate(&session, options.page, options.index)?;
    let current = session.editor.bookmarks.outline()[index].clone();

    let level = options.level.unwrap_or(current.level);
    let title = options
        .title
        .map(|t| t.trim().to_string())
        .unwrap_or(current.title);
    let page = match options.to_page {
        Some(page) => {
            session.page_index(page)?;
            page as u32
        }
        None => current.page,
    };
    check_bookmark(level, &title)?;

    session
        .editor
        .bookmarks
        .update_entry(index, level, title.clone(), page);
    println!("Updated {}", title.bright_white());
    session.save(&options.out.output)?;
    Ok(())
}

fn delete(options: DeleteOptions, config: &Config) -> Result<()> {
    let mut session = Session::open(&options.path, config)?;
    let index = locate(&session, options.page, options.index)?;
    let title = session.editor.bookmarks.outline()[index].title.clone();

    session.editor.bookmarks.delete_entry(index);
    println!("Deleted {}", title.bright_white());
    session.save(&options.out.output)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indentation_follows_level() {
        assert_eq!(indented(&OutlineEntry::new(1, "Intro", 1)), "Intro");
        assert_eq!(indented(&OutlineEntry::new(3, "Detail", 1)), "    Detail");
        assert_eq!(indented(&OutlineEntry::new(0, "Odd", 1)), "Odd");
    }
}
