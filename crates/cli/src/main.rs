// rmerge - roster reconciliation from the command line
//
// Upload (or load) the OneSite and Apricot datasets, declare which columns
// join them, run the remote merge once, then filter and export the result.

mod datasets;
mod exit_codes;
mod pairs;
mod results;
mod session;
mod table;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};

use rostermerge_client::{ClientError, MergeClient};
use rostermerge_config::{FileSessionStore, SessionError, Settings};
use rostermerge_recon::ReconError;

use exit_codes::{
    client_exit_code, recon_exit_code, session_exit_code, EXIT_IO, EXIT_SUCCESS, EXIT_USAGE,
};
use pairs::PairsCommands;
use results::RunArgs;
use session::SessionCommands;

#[derive(Parser)]
#[command(name = "rmerge")]
#[command(about = "Reconcile OneSite and Apricot resident rosters through the merge service")]
#[command(version)]
struct Cli {
    /// Merge service base URL [default: settings api.baseUrl, then http://localhost:8000]
    #[arg(long, global = true, value_name = "URL")]
    api_base: Option<String>,

    /// Session store directory
    #[arg(long, global = true, env = "ROSTERMERGE_SESSION_DIR", value_name = "DIR")]
    session_dir: Option<PathBuf>,

    /// Increase log output (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store upload-service output ({columns, data} JSON) in the session
    #[command(after_help = "\
Examples:
  rmerge load --onesite onesite.json --apricot apricot.json
  rmerge load --apricot apricot.json")]
    Load {
        /// OneSite dataset JSON
        #[arg(long, value_name = "FILE")]
        onesite: Option<PathBuf>,

        /// Apricot dataset JSON
        #[arg(long, value_name = "FILE")]
        apricot: Option<PathBuf>,
    },

    /// Upload OneSite (.xls) and Apricot (.xlsx) exports to the service
    #[command(after_help = "\
Examples:
  rmerge upload --onesite euclid.xls --onesite ontario.xls --apricot apricot.xlsx
  rmerge upload --apricot apricot.xlsx --api-base http://merge.internal:8000")]
    Upload {
        /// OneSite export (repeatable)
        #[arg(long, value_name = "FILE.xls")]
        onesite: Vec<PathBuf>,

        /// Apricot export
        #[arg(long, value_name = "FILE.xlsx")]
        apricot: Option<PathBuf>,
    },

    /// List the columns available for pairing
    Columns {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show or edit the merge pairs (join keys)
    Pairs {
        #[command(subcommand)]
        command: PairsCommands,
    },

    /// Run the reconciliation and show, filter or export the result
    #[command(after_help = "\
Examples:
  rmerge run
  rmerge run --primary 'Jubilee Park' --category matched
  rmerge run --primary 'Jubilee Park' --secondary 'Euclid Apartments' --mode and
  rmerge run --output result.json --export ./out
  rmerge run --input result.json --secondary Maycroft --json")]
    Run(RunArgs),

    /// Inspect or end the current session
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },
}

/// Resolved runtime context shared by every command.
pub struct Context {
    pub settings: Settings,
    pub api_base: String,
    pub session_dir: PathBuf,
}

impl Context {
    fn resolve(cli_api_base: Option<&str>, cli_session_dir: Option<PathBuf>) -> Self {
        let settings = Settings::load();
        let api_base = settings.resolve_api_base(cli_api_base);
        let session_dir = cli_session_dir
            .or_else(|| settings.session_dir.clone())
            .unwrap_or_else(FileSessionStore::default_dir);
        log::debug!("api base {}, session dir {}", api_base, session_dir.display());
        Self { settings, api_base, session_dir }
    }

    pub fn store(&self) -> FileSessionStore {
        FileSessionStore::new(&self.session_dir)
    }

    pub fn client(&self) -> Result<MergeClient, CliError> {
        let timeout = self.settings.api_timeout_secs.map(Duration::from_secs);
        MergeClient::new(&self.api_base, timeout).map_err(CliError::client)
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let ctx = Context::resolve(cli.api_base.as_deref(), cli.session_dir);

    let result = match cli.command {
        Commands::Load { onesite, apricot } => datasets::cmd_load(&ctx, onesite, apricot),
        Commands::Upload { onesite, apricot } => datasets::cmd_upload(&ctx, onesite, apricot),
        Commands::Columns { json } => datasets::cmd_columns(&ctx, json),
        Commands::Pairs { command } => pairs::cmd_pairs(&ctx, command),
        Commands::Run(args) => results::cmd_run(&ctx, args),
        Commands::Session { command } => session::cmd_session(&ctx, command),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::new(EXIT_IO, msg)
    }

    pub fn session(err: SessionError) -> Self {
        let code = session_exit_code(&err);
        let hint = match &err {
            SessionError::Corrupt { .. } => Some("run `rmerge session clear` and upload again".to_string()),
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }

    pub fn client(err: ClientError) -> Self {
        let code = client_exit_code(&err);
        let hint = match &err {
            ClientError::Network(_) => {
                Some("is the merge service running? set --api-base or ROSTERMERGE_API_BASE_URL".to_string())
            }
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }

    pub fn recon(err: ReconError) -> Self {
        let code = recon_exit_code(&err);
        let hint = match &err {
            ReconError::NoValidPairs => {
                Some("complete a pair first, e.g. `rmerge pairs set 1 onesite Name` and `rmerge pairs set 1 apricot FullName`".to_string())
            }
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Serialize `value` for `--json` output.
pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> Result<String, CliError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| CliError::new(exit_codes::EXIT_ERROR, format!("JSON serialization error: {e}")))
}
