//! `rmerge run`: one reconciliation round trip, then the results view.
//!
//! The result either comes from the service (using the session's datasets
//! and valid pairs) or from a response saved earlier with `--output`.
//! Filters only narrow what is printed; `--export` always writes every
//! row of every non-empty category.

use std::path::{Path, PathBuf};

use clap::Args;
use serde::Serialize;

use rostermerge_config::{SessionStore, APRICOT_DATA_KEY, ONESITE_DATA_KEY};
use rostermerge_recon::export::export_columns;
use rostermerge_recon::{
    export_all, Category, Dimension, ExportReport, FilterMode, FilterSelection, MergePairEditor,
    PartitionedResult, ResultPartitionStore, ResultsView, Row, UploadedDataset,
};

use crate::exit_codes::{client_exit_code, EXIT_ERROR, EXIT_SESSION_MISSING_DATA};
use crate::table::render_rows;
use crate::{to_json, CliError, Context};

#[derive(Args)]
pub struct RunArgs {
    /// Read a saved response instead of calling the service
    #[arg(long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Save the raw response JSON
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Filter value for the primary building column
    /// (matched: "Building (Apricot)", others: "Property")
    #[arg(long, value_name = "VALUE")]
    primary: Option<String>,

    /// Filter value for the secondary building column
    /// (matched: "Building (Onesite)", others: "Building")
    #[arg(long, value_name = "VALUE")]
    secondary: Option<String>,

    /// How the two filter values combine: or, and
    #[arg(long, default_value = "or")]
    mode: FilterMode,

    /// Show only one category: matched, unmatched, name_matched, dob_matched
    #[arg(long)]
    category: Option<Category>,

    /// Print at most N rows per category
    #[arg(long, value_name = "N")]
    limit: Option<usize>,

    /// Write <category>.csv files into DIR
    #[arg(long, value_name = "DIR")]
    export: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

pub fn cmd_run(ctx: &Context, args: RunArgs) -> Result<(), CliError> {
    let mut store = match &args.input {
        Some(path) => ResultPartitionStore::from_result(read_response(path)?),
        None => fetch(ctx)?,
    };

    if let Some(path) = &args.output {
        write_response(path, store.result())?;
        eprintln!("wrote {}", path.display());
    }

    store.set_selection(FilterSelection::new(args.primary, args.secondary, args.mode));
    warn_unknown_values(&store);

    let report = match &args.export {
        Some(dir) => Some(export_all(&store, dir).map_err(CliError::recon)?),
        None => None,
    };

    let categories: Vec<Category> = match args.category {
        Some(c) => vec![c],
        None => Category::ALL.to_vec(),
    };

    if args.json {
        println!("{}", to_json(&RunOutput::build(&store, &categories, report.as_ref()))?);
        return Ok(());
    }

    print!("{}", render_results(&store, &categories, args.limit));
    if let Some(report) = &report {
        print_export_summary(report);
    }
    Ok(())
}

/// Activate the results view against the session and settle it with the
/// service's answer.
fn fetch(ctx: &Context) -> Result<ResultPartitionStore, CliError> {
    let store = ctx.store();
    let editor = MergePairEditor::open(store.clone()).map_err(CliError::recon)?;
    let mut view = ResultsView::activate(editor.pairs()).map_err(CliError::recon)?;

    let onesite = require_dataset(&store, ONESITE_DATA_KEY, "OneSite")?;
    let apricot = require_dataset(&store, APRICOT_DATA_KEY, "Apricot")?;

    let client = ctx.client()?;
    eprintln!(
        "merging {} OneSite and {} Apricot row(s) on {} pair(s) via {}",
        onesite.data.len(),
        apricot.data.len(),
        editor.valid_pairs().len(),
        client.api_base(),
    );

    let outcome = client.fetch_reconciliation(&onesite.data, &apricot.data, editor.pairs());
    let code = outcome.as_ref().err().map(client_exit_code).unwrap_or(EXIT_ERROR);
    view.complete(outcome);

    match view {
        ResultsView::Ready(store) => Ok(store),
        ResultsView::Failed(message) => Err(CliError::new(code, message)),
        ResultsView::Loading => Err(CliError::new(EXIT_ERROR, "merge did not complete")),
    }
}

fn require_dataset(store: &impl SessionStore, key: &str, label: &str) -> Result<UploadedDataset, CliError> {
    store
        .get::<UploadedDataset>(key)
        .map_err(CliError::session)?
        .ok_or_else(|| {
            CliError::new(EXIT_SESSION_MISSING_DATA, format!("no {} dataset in this session", label))
                .with_hint("run `rmerge upload` or `rmerge load` first")
        })
}

fn read_response(path: &Path) -> Result<PartitionedResult, CliError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| CliError::io(format!("cannot read {}: {e}", path.display())))?;
    serde_json::from_str(&text)
        .map_err(|e| CliError::io(format!("{} is not a merge response: {e}", path.display())))
}

fn write_response(path: &Path, result: &PartitionedResult) -> Result<(), CliError> {
    let json = to_json(result)?;
    std::fs::write(path, json).map_err(|e| CliError::io(format!("cannot write {}: {e}", path.display())))
}

/// A selected value that no category knows filters everything out; say so.
fn warn_unknown_values(store: &ResultPartitionStore) {
    for dimension in Dimension::ALL {
        let Some(value) = store.selection().value(dimension) else {
            continue;
        };
        let known = Category::ALL
            .iter()
            .any(|c| store.vocabulary(*c, dimension).contains(value));
        if !known {
            log::warn!("filter value '{}' does not occur in any category", value);
        }
    }
}

fn describe_selection(selection: &FilterSelection) -> Option<String> {
    match (&selection.primary, &selection.secondary) {
        (None, None) => None,
        (Some(p), None) => Some(format!("primary = '{}'", p)),
        (None, Some(s)) => Some(format!("secondary = '{}'", s)),
        (Some(p), Some(s)) => Some(format!("primary = '{}' {} secondary = '{}'", p, selection.mode, s)),
    }
}

fn render_results(store: &ResultPartitionStore, categories: &[Category], limit: Option<usize>) -> String {
    let view = store.view();
    let mut out = String::new();

    if let Some(filter) = describe_selection(store.selection()) {
        out.push_str(&format!("filter: {}\n\n", filter));
    }

    for (i, category) in categories.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let visible = view.rows(*category);
        let total = store.rows(*category).len();
        out.push_str(&format!("{}: {} of {} row(s)\n", category.label(), visible.len(), total));
        if visible.is_empty() {
            continue;
        }

        let shown = limit.unwrap_or(visible.len()).min(visible.len());
        let columns = export_columns(store.rows(*category));
        out.push_str(&render_rows(&columns, &visible[..shown]));
        if shown < visible.len() {
            out.push_str(&format!("  ... {} more\n", visible.len() - shown));
        }
    }
    out
}

fn print_export_summary(report: &ExportReport) {
    for file in &report.written {
        eprintln!("exported {} row(s) to {}", file.rows, file.path.display());
    }
    for category in &report.skipped {
        eprintln!("skipped {} (no rows)", category);
    }
}

#[derive(Serialize)]
struct CategoryOutput<'a> {
    category: Category,
    label: &'static str,
    total: usize,
    visible: usize,
    rows: Vec<&'a Row>,
}

#[derive(Serialize)]
struct RunOutput<'a> {
    selection: &'a FilterSelection,
    categories: Vec<CategoryOutput<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    export: Option<&'a ExportReport>,
}

impl<'a> RunOutput<'a> {
    fn build(store: &'a ResultPartitionStore, categories: &[Category], export: Option<&'a ExportReport>) -> Self {
        let view = store.view();
        let categories = categories
            .iter()
            .map(|c| {
                let rows = view.rows(*c).to_vec();
                CategoryOutput {
                    category: *c,
                    label: c.label(),
                    total: store.rows(*c).len(),
                    visible: rows.len(),
                    rows,
                }
            })
            .collect();
        Self { selection: store.selection(), categories, export }
    }
}
