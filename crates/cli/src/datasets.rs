//! `rmerge load`, `rmerge upload`, `rmerge columns`: the upload step.
//!
//! Both entry points end the same way: a `{columns, data}` dataset stored
//! under `onesiteData` / `apricotData`, where the pair editor and the run
//! pick it up.

use std::path::{Path, PathBuf};

use serde::Serialize;

use rostermerge_config::{SessionStore, APRICOT_DATA_KEY, ONESITE_DATA_KEY};
use rostermerge_recon::{ColumnCatalog, MergePairEditor, Side, UploadedDataset};

use crate::{to_json, CliError, Context};

fn session_key(side: Side) -> &'static str {
    match side {
        Side::Onesite => ONESITE_DATA_KEY,
        Side::Apricot => APRICOT_DATA_KEY,
    }
}

fn store_dataset(ctx: &Context, side: Side, dataset: &UploadedDataset) -> Result<(), CliError> {
    let mut store = ctx.store();
    store.set(session_key(side), dataset).map_err(CliError::session)?;
    eprintln!(
        "{}: {} column(s), {} row(s) stored in session",
        side,
        dataset.columns.len(),
        dataset.data.len()
    );
    Ok(())
}

fn read_dataset(path: &Path) -> Result<UploadedDataset, CliError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| CliError::io(format!("cannot read {}: {e}", path.display())))?;
    serde_json::from_str(&text)
        .map_err(|e| CliError::io(format!("{} is not a {{columns, data}} dataset: {e}", path.display())))
}

pub fn cmd_load(ctx: &Context, onesite: Option<PathBuf>, apricot: Option<PathBuf>) -> Result<(), CliError> {
    if onesite.is_none() && apricot.is_none() {
        return Err(CliError::usage("nothing to load").with_hint("pass --onesite FILE and/or --apricot FILE"));
    }

    // Parse both before storing either, so a bad file leaves the session untouched
    let onesite = onesite.as_deref().map(read_dataset).transpose()?;
    let apricot = apricot.as_deref().map(read_dataset).transpose()?;

    if let Some(dataset) = &onesite {
        store_dataset(ctx, Side::Onesite, dataset)?;
    }
    if let Some(dataset) = &apricot {
        store_dataset(ctx, Side::Apricot, dataset)?;
    }
    Ok(())
}

pub fn cmd_upload(ctx: &Context, onesite: Vec<PathBuf>, apricot: Option<PathBuf>) -> Result<(), CliError> {
    if onesite.is_empty() && apricot.is_none() {
        return Err(CliError::usage("nothing to upload").with_hint("pass --onesite FILE.xls and/or --apricot FILE.xlsx"));
    }

    let client = ctx.client()?;
    if !onesite.is_empty() {
        let dataset = client.upload_onesite(&onesite).map_err(CliError::client)?;
        store_dataset(ctx, Side::Onesite, &dataset)?;
    }
    if let Some(path) = apricot {
        let dataset = client.upload_apricot(&path).map_err(CliError::client)?;
        store_dataset(ctx, Side::Apricot, &dataset)?;
    }
    Ok(())
}

#[derive(Serialize)]
struct ColumnsOutput<'a> {
    onesite: &'a [String],
    apricot: &'a [String],
}

pub fn cmd_columns(ctx: &Context, json: bool) -> Result<(), CliError> {
    let editor = MergePairEditor::open(ctx.store()).map_err(CliError::recon)?;
    let catalog = editor.catalog();

    if json {
        let out = ColumnsOutput {
            onesite: &catalog.onesite_columns,
            apricot: &catalog.apricot_columns,
        };
        println!("{}", to_json(&out)?);
        return Ok(());
    }

    print!("{}", render_catalog(catalog));
    if catalog.onesite_columns.is_empty() || catalog.apricot_columns.is_empty() {
        eprintln!("hint:  run `rmerge upload` or `rmerge load` to add the missing dataset");
    }
    Ok(())
}

fn render_catalog(catalog: &ColumnCatalog) -> String {
    let mut out = String::new();
    for side in [Side::Onesite, Side::Apricot] {
        let columns = catalog.columns(side);
        out.push_str(&format!("{} ({}):\n", side, columns.len()));
        if columns.is_empty() {
            out.push_str("  (none)\n");
        }
        for column in columns {
            out.push_str(&format!("  {}\n", column));
        }
    }
    out
}
