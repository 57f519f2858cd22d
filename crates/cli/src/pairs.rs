//! `rmerge pairs`: edit the merge configuration.
//!
//! Pairs are numbered from 1 on the command line. The trailing empty pair
//! is the add slot: setting a field on it starts a new pair.

use clap::Subcommand;
use serde::Serialize;

use rostermerge_config::FileSessionStore;
use rostermerge_recon::{MergePair, MergePairEditor, Side};

use crate::exit_codes::EXIT_SESSION_MISSING_DATA;
use crate::table::pad_right;
use crate::{to_json, CliError, Context};

#[derive(Subcommand)]
pub enum PairsCommands {
    /// Show the current pairs
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Set one side of a pair (an empty COLUMN clears it)
    #[command(after_help = "\
Examples:
  rmerge pairs set 1 onesite Name
  rmerge pairs set 1 apricot FullName
  rmerge pairs set 2 onesite ''")]
    Set {
        /// Pair number as shown by `rmerge pairs show`
        number: usize,

        /// Dataset side: onesite or apricot
        side: Side,

        /// Column name from `rmerge columns`
        column: String,
    },

    /// Remove a pair
    Remove {
        /// Pair number as shown by `rmerge pairs show`
        number: usize,
    },

    /// Reset to a single empty pair
    Clear,
}

pub fn cmd_pairs(ctx: &Context, cmd: PairsCommands) -> Result<(), CliError> {
    let mut editor = MergePairEditor::open(ctx.store()).map_err(CliError::recon)?;

    match cmd {
        PairsCommands::Show { json } => {
            if json {
                println!("{}", to_json(&PairsOutput::from_editor(&editor))?);
            } else {
                print!("{}", render_pairs(editor.pairs()));
            }
            return Ok(());
        }
        PairsCommands::Set { number, side, column } => {
            let index = to_index(&editor, number)?;
            check_column(&editor, side, &column)?;
            let before = editor.len();
            editor.set_pair(index, side, column).map_err(CliError::recon)?;
            if let Some(notice) = pruned_notice(number, before, editor.len()) {
                eprintln!("{}", notice);
            }
        }
        PairsCommands::Remove { number } => {
            let index = to_index(&editor, number)?;
            if !editor.can_remove(index) {
                eprintln!("pair {} is the empty add slot; nothing removed", number);
                return Ok(());
            }
            editor.remove_pair(index).map_err(CliError::recon)?;
        }
        PairsCommands::Clear => {
            editor.clear().map_err(CliError::recon)?;
        }
    }

    print!("{}", render_pairs(editor.pairs()));
    Ok(())
}

fn to_index(editor: &MergePairEditor<FileSessionStore>, number: usize) -> Result<usize, CliError> {
    if number == 0 || number > editor.len() {
        return Err(CliError::usage(format!(
            "pair {} does not exist (have {})",
            number,
            editor.len()
        ))
        .with_hint("see `rmerge pairs show`"));
    }
    Ok(number - 1)
}

/// A non-blank column must come from the uploaded dataset's header.
fn check_column(editor: &MergePairEditor<FileSessionStore>, side: Side, column: &str) -> Result<(), CliError> {
    if column.trim().is_empty() {
        return Ok(());
    }
    let catalog = editor.catalog();
    if catalog.columns(side).is_empty() {
        return Err(CliError::new(
            EXIT_SESSION_MISSING_DATA,
            format!("no {} dataset in this session", side),
        )
        .with_hint("run `rmerge upload` or `rmerge load` first"));
    }
    if !catalog.contains(side, column) {
        return Err(CliError::usage(format!("unknown {} column '{}'", side, column))
            .with_hint("see `rmerge columns`"));
    }
    Ok(())
}

/// Clearing both sides of a pair drops it; later pairs move up one number.
fn pruned_notice(number: usize, before: usize, after: usize) -> Option<String> {
    (after < before).then(|| {
        format!(
            "pair {} is now empty and was removed; pairs after it are renumbered",
            number
        )
    })
}

#[derive(Serialize)]
struct PairsOutput {
    pairs: Vec<MergePair>,
    valid: Vec<MergePair>,
    can_proceed: bool,
}

impl PairsOutput {
    fn from_editor(editor: &MergePairEditor<FileSessionStore>) -> Self {
        Self {
            pairs: editor.pairs().to_vec(),
            valid: editor.valid_pairs(),
            can_proceed: editor.can_proceed(),
        }
    }
}

fn render_pairs(pairs: &[MergePair]) -> String {
    let width = pairs
        .iter()
        .map(|p| crate::table::display_width(&p.onesite))
        .max()
        .unwrap_or(0)
        .max("ONESITE".len());

    let mut out = format!("  #  {}  APRICOT\n", pad_right("ONESITE", width));
    for (i, pair) in pairs.iter().enumerate() {
        if pair.is_empty() {
            out.push_str(&format!("{:>3}  (add)\n", i + 1));
            continue;
        }
        let onesite = if pair.onesite.trim().is_empty() { "-" } else { &pair.onesite };
        let apricot = if pair.apricot.trim().is_empty() { "-" } else { &pair.apricot };
        out.push_str(&format!("{:>3}  {}  {}\n", i + 1, pad_right(onesite, width), apricot));
    }
    out
}
