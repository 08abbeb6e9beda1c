use std::path::PathBuf;

use colored::Colorize;
use folio_core::{parse_plan, EditAction};
use log::{debug, warn};

use crate::config::Config;
use crate::prelude::{println, *};
use crate::session::{check_bookmark, OutputOptions, Session};

#[derive(Debug, clap::Args, Clone)]
pub struct EditOptions {
    /// Path to the PDF file
    pub path: PathBuf,

    /// JSON file holding a list of actions, e.g.
    /// [{"action": "move_up", "index": 2}, {"action": "add_bookmark", "level": 1, "title": "Intro", "page": 1}]
    #[arg(long)]
    pub plan: PathBuf,

    #[clap(flatten)]
    pub out: OutputOptions,
}

/// Reject bookmark actions the outline must never receive.
fn validate(actions: &[EditAction]) -> Result<()> {
    for (step, action) in actions.iter().enumerate() {
        let checked = match action {
            EditAction::AddBookmark { level, title, .. }
            | EditAction::UpdateBookmark { level, title, .. } => check_bookmark(*level, title),
            _ => Ok(()),
        };
        checked.wrap_err_with(|| f!("Invalid step {} of the plan", step + 1))?;
    }
    Ok(())
}

pub fn run(options: EditOptions, global: crate::Global) -> Result<()> {
    let config = Config::load(&global)?;
    let raw = std::fs::read_to_string(&options.plan)
        .wrap_err_with(|| f!("Failed to read {}", options.plan.display()))?;
    let actions = parse_plan(&raw)
        .wrap_err_with(|| f!("Failed to parse {}", options.plan.display()))?;
    validate(&actions)?;

    let mut session = Session::open(&options.path, &config)?;
    let mut ignored = 0;
    for (step, action) in actions.iter().enumerate() {
        if session.editor.apply(action, &mut session.document) {
            debug!("step {}: {:?}", step + 1, action);
        } else {
            warn!("step {} had no effect: {:?}", step + 1, action);
            ignored += 1;
        }
    }

    println!(
        "Applied {} of {} action(s)",
        (actions.len() - ignored).to_string().bold(),
        actions.len()
    );

    session.save(&options.out.output)?;
    Ok(())
}
