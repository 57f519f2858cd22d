//! `rmerge session`: inspect or end the current session.

use clap::Subcommand;
use serde::Serialize;

use rostermerge_config::{SessionEntryInfo, SessionStore};

use crate::{to_json, CliError, Context};

#[derive(Subcommand)]
pub enum SessionCommands {
    /// List stored entries
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Drop every entry (uploaded datasets and merge pairs)
    Clear,
}

#[derive(Serialize)]
struct SessionOutput<'a> {
    dir: String,
    entries: &'a [SessionEntryInfo],
}

pub fn cmd_session(ctx: &Context, cmd: SessionCommands) -> Result<(), CliError> {
    let mut store = ctx.store();
    match cmd {
        SessionCommands::Show { json } => {
            let entries = store.entries().map_err(CliError::session)?;
            if json {
                let out = SessionOutput {
                    dir: store.dir().display().to_string(),
                    entries: &entries,
                };
                println!("{}", to_json(&out)?);
            } else {
                println!("session: {}", store.dir().display());
                if entries.is_empty() {
                    println!("  (empty)");
                }
                for e in &entries {
                    println!(
                        "  {:<12} {:>10} bytes  {}",
                        e.key,
                        e.bytes,
                        e.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
                    );
                }
            }
            Ok(())
        }
        SessionCommands::Clear => {
            let count = store.entries().map_err(CliError::session)?.len();
            store.clear().map_err(CliError::session)?;
            eprintln!("cleared {} entr{}", count, if count == 1 { "y" } else { "ies" });
            Ok(())
        }
    }
}
