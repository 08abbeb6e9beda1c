use std::path::PathBuf;

use colored::Colorize;
use folio_core::{plan_moves, Margins, PageSize, RotateDirection};
use serde::Serialize;

use crate::config::Config;
use crate::prelude::{println, *};
use crate::session::{OutputOptions, Session};

#[derive(Debug, clap::Parser)]
#[command(name = "pages")]
#[command(about = "Page order, rotation and transform operations")]
pub struct App {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// List pages with their size, rotation and bookmark count
    List(ListOptions),

    /// Put the pages in a new order
    Reorder(ReorderOptions),

    /// Rotate a page by a quarter turn
    Rotate(RotateOptions),

    /// Scale a page, add margins or make it grayscale
    Transform(TransformOptions),
}

#[derive(Debug, clap::Args, Clone)]
pub struct ListOptions {
    /// Path to the PDF file
    pub path: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, clap::Args, Clone)]
pub struct ReorderOptions {
    /// Path to the PDF file
    pub path: PathBuf,

    /// Every page number once, in the new order (e.g., "3,1,2")
    #[arg(long)]
    pub order: String,

    #[clap(flatten)]
    pub out: OutputOptions,
}

#[derive(Debug, clap::Args, Clone)]
pub struct RotateOptions {
    /// Path to the PDF file
    pub path: PathBuf,

    /// 1-based page number
    #[arg(long, short = 'p')]
    pub page: usize,

    /// Rotation direction
    #[arg(long, short = 'd', value_enum, default_value = "right")]
    pub direction: Direction,

    #[clap(flatten)]
    pub out: OutputOptions,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum Direction {
    Left,
    Right,
}

impl From<Direction> for RotateDirection {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Left => RotateDirection::Left,
            Direction::Right => RotateDirection::Right,
        }
    }
}

#[derive(Debug, clap::Args, Clone)]
pub struct TransformOptions {
    /// Path to the PDF file
    pub path: PathBuf,

    /// 1-based page number
    #[arg(long, short = 'p')]
    pub page: usize,

    /// Scale factor (e.g., 0.8)
    #[arg(long, conflicts_with = "fit")]
    pub scale: Option<f32>,

    /// Scale to fit a box, keeping the aspect ratio (e.g., "595x842")
    #[arg(long)]
    pub fit: Option<String>,

    /// Same margin on every side, in points
    #[arg(long, conflicts_with = "margins")]
    pub margin: Option<f32>,

    /// Margins in points as "top,right,bottom,left"
    #[arg(long)]
    pub margins: Option<String>,

    /// Convert the page to grayscale
    #[arg(long)]
    pub grayscale: bool,

    #[clap(flatten)]
    pub out: OutputOptions,
}

#[derive(Debug, Serialize)]
pub struct PageRow {
    pub position: usize,
    pub original_page: usize,
    pub width: f32,
    pub height: f32,
    pub rotation: u16,
    pub bookmarks: usize,
}

pub fn run(app: App, global: crate::Global) -> Result<()> {
    let config = Config::load(&global)?;
    match app.command {
        Commands::List(options) => list(options, &config),
        Commands::Reorder(options) => reorder(options, &config),
        Commands::Rotate(options) => rotate(options, &config),
        Commands::Transform(options) => transform(options, &config),
    }
}

fn list(options: ListOptions, config: &Config) -> Result<()> {
    let session = Session::open(&options.path, config)?;
    let editor = &session.editor;

    let rows: Vec<PageRow> = (0..editor.order.len())
        .filter_map(|i| editor.order.position_info(i))
        .map(|info| {
            let index = info.original_page - 1;
            let size = editor.transforms.page_size(&session.document, index);
            PageRow {
                position: info.position,
                original_page: info.original_page,
                width: size.width,
                height: size.height,
                rotation: editor.transforms.rotation(&session.document, index),
                bookmarks: editor.bookmarks.count_on_page(info.original_page as u32),
            }
        })
        .collect();

    if options.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    let mut table = new_table();
    table.add_row(prettytable::row![
        "Page".bold().cyan(),
        "Size (pt)".bold().cyan(),
        "Rotation".bold().cyan(),
        "Bookmarks".bold().cyan()
    ]);
    for row in &rows {
        let badge = match row.bookmarks {
            0 => String::new(),
            n => f!("[{}]", n).bright_magenta().to_string(),
        };
        table.add_row(prettytable::row![
            row.position.to_string().bright_yellow(),
            f!("{:.0} x {:.0}", row.width, row.height),
            f!("{}°", row.rotation),
            badge
        ]);
    }
    table.printstd();
    Ok(())
}

fn reorder(options: ReorderOptions, config: &Config) -> Result<()> {
    let mut session = Session::open(&options.path, config)?;
    let target = parse_order(&options.order)?;

    let moves = plan_moves(session.editor.order.order(), &target).map_err(|e| eyre!(e))?;
    for index in &moves {
        session.editor.order.move_up(*index);
    }
    if !session.editor.order.has_changes() {
        return Err(Error::NothingToDo("pages are already in that order".into()).into());
    }

    println!("Reordering {} pages ({} moves)", target.len(), moves.len());
    session.save(&options.out.output)?;
    Ok(())
}

fn rotate(options: RotateOptions, config: &Config) -> Result<()> {
    let mut session = Session::open(&options.path, config)?;
    let page = session.page_index(options.page)?;

    let Session { document, editor } = &mut session;
    editor
        .transforms
        .rotate(document, page, options.direction.into());
    println!(
        "Page {} is now rotated {}°",
        options.page,
        editor.transforms.rotation(&*document, page)
    );
    session.save(&options.out.output)?;
    Ok(())
}

fn transform(options: TransformOptions, config: &Config) -> Result<()> {
    let mut session = Session::open(&options.path, config)?;
    let page = session.page_index(options.page)?;
    let Session { document, editor } = &mut session;
    let document = &*document;
    let transforms = &mut editor.transforms;

    if let Some(scale) = options.scale {
        if !transforms.set_scale(document, page, scale) {
            return Err(Error::InvalidArgument {
                value: scale.to_string(),
                reason: "scale must be greater than zero".into(),
            }
            .into());
        }
    }
    if let Some(fit) = &options.fit {
        let (width, height) = parse_size(fit)?;
        transforms.fit_to(document, page, width, height);
    }
    if let Some(margin) = options.margin {
        transforms.set_uniform_margins(document, page, margin);
    }
    if let Some(margins) = &options.margins {
        transforms.set_margins(document, page, parse_margins(margins)?);
    }
    if options.grayscale {
        transforms.set_grayscale(document, page, true);
    }

    if !transforms.has_pending() {
        return Err(Error::NothingToDo(
            "pass --scale, --fit, --margin, --margins or --grayscale".into(),
        )
        .into());
    }

    let before = transforms.page_size(document, page);
    let after = transforms.final_page_size(document, page);
    println!(
        "Page {}: {} -> {}",
        options.page,
        format_size(before),
        format_size(after).bright_green()
    );
    session.save(&options.out.output)?;
    Ok(())
}

fn format_size(size: PageSize) -> String {
    f!("{:.0} x {:.0}", size.width, size.height)
}

/// Parse a 1-based page list such as "3,1,2" into 0-based indices.
fn parse_order(raw: &str) -> Result<Vec<usize>> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| match part.parse::<usize>() {
            Ok(page) if page > 0 => Ok(page - 1),
            _ => Err(Error::InvalidArgument {
                value: part.to_string(),
                reason: "page numbers start at 1".into(),
            }
            .into()),
        })
        .collect()
}

/// Parse "WIDTHxHEIGHT" in points.
fn parse_size(raw: &str) -> Result<(f32, f32)> {
    let invalid = || Error::InvalidArgument {
        value: raw.to_string(),
        reason: "expected WIDTHxHEIGHT, e.g. 595x842".into(),
    };
    let (width, height) = raw
        .split_once(['x', 'X'])
        .ok_or_else(invalid)?;
    let width: f32 = width.trim().parse().map_err(|_| invalid())?;
    let height: f32 = height.trim().parse().map_err(|_| invalid())?;
    if width <= 0.0 || height <= 0.0 {
        return Err(invalid().into());
    }
    Ok((width, height))
}

/// Parse "top,right,bottom,left" in points.
fn parse_margins(raw: &str) -> Result<Margins> {
    let values = raw
        .split(',')
        .map(|part| part.trim().parse::<f32>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .ok()
        .filter(|values| values.len() == 4)
        .ok_or_else(|| Error::InvalidArgument {
            value: raw.to_string(),
            reason: "expected four numbers: top,right,bottom,left".into(),
        })?;
    Ok(Margins::new(values[0], values[1], values[2], values[3]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_is_one_based() {
        assert_eq!(parse_order("3, 1,2").unwrap(), vec![2, 0, 1]);
        assert_eq!(parse_order("2,1,").unwrap(), vec![1, 0]);
        assert!(parse_order("0,1").is_err());
        assert!(parse_order("a,b").is_err());
    }

    #[test]
    fn size_accepts_either_x() {
        assert_eq!(parse_size("595x842").unwrap(), (595.0, 842.0));
        assert_eq!(parse_size("100 X 50.5").unwrap(), (100.0, 50.5));
        assert!(parse_size("595").is_err());
        assert!(parse_size("0x10").is_err());
    }

    #[test]
    fn margins_need_four_values() {
        assert_eq!(
            parse_margins("10,20,30,40").unwrap(),
            Margins::new(10.0, 20.0, 30.0, 40.0)
        );
        assert!(parse_margins("10,20").is_err());
        assert!(parse_margins("10,20,x,40").is_err());
    }

    #[test]
    fn direction_maps_to_rotation() {
        assert_eq!(RotateDirection::from(Direction::Left), RotateDirection::Left);
        assert_eq!(RotateDirection::from(Direction::Right), RotateDirection::Right);
    }
}
