use crate::prelude::*;
use clap::Parser;

mod config;
mod edit;
mod error;
mod info;
mod insert;
mod merge;
mod pages;
mod prelude;
mod session;
mod toc;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Edit PDF bookmarks, page order and page transforms"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// LibreOffice binary used to convert office documents
    #[clap(long, global = true)]
    soffice: Option<std::path::PathBuf>,

    /// Poppler `pdftoppm` binary used to render pages
    #[clap(long, global = true)]
    pdftoppm: Option<std::path::PathBuf>,

    /// Seconds a single document conversion may take
    #[clap(long, global = true)]
    convert_timeout: Option<u64>,

    /// Whether to display additional information.
    #[clap(long, env = "FOLIO_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// Show page count, page sizes and metadata
    Info(crate::info::InfoOptions),

    /// Bookmark (table of contents) operations
    Toc(crate::toc::App),

    /// Page order, rotation and transform operations
    Pages(crate::pages::App),

    /// Merge several PDFs into one
    Merge(crate::merge::MergeOptions),

    /// Append images as new pages
    AddImages(crate::insert::AddImagesOptions),

    /// Convert office documents and append them as new pages
    AddDocuments(crate::insert::AddDocumentsOptions),

    /// Replay a JSON plan of editing actions and save once
    Edit(crate::edit::EditOptions),
}

fn init_logging(verbose: bool) {
    if verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug"))
            .init();
    } else {
        env_logger::init();
    }
}

fn main() -> Result<()> {
    let app = App::parse();

    init_logging(app.global.verbose);
    color_eyre::install()?;

    match app.command {
        SubCommands::Info(options) => crate::info::run(options, app.global),
        SubCommands::Toc(sub_app) => crate::toc::run(sub_app, app.global),
        SubCommands::Pages(sub_app) => crate::pages::run(sub_app, app.global),
        SubCommands::Merge(options) => crate::merge::run(options, app.global),
        SubCommands::AddImages(options) => crate::insert::run_images(options, app.global),
        SubCommands::AddDocuments(options) => crate::insert::run_documents(options, app.global),
        SubCommands::Edit(options) => crate::edit::run(options, app.global),
    }
    .map_err(|err: color_eyre::eyre::Report| eyre!(err))
}
