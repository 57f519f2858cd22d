//! CSV export: one file per category from the store's unfiltered rows.
//!
//! Bookkeeping columns are stripped. Column order follows the first row of
//! the category; columns first seen in later rows are appended in order of
//! appearance so no data is dropped. Empty categories produce no file.
//!
//! Cells are written in display form ([`cell_text`]), not wire form: the
//! service reads spreadsheets through a dataframe, so integer columns with
//! gaps arrive as floats (`101.0`). Writing the display text keeps unit and
//! ID columns identical to the source sheet and to what the tables show.
//! Strings, booleans and non-integral numbers pass through unchanged.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::ReconError;
use crate::model::{cell_text, is_bookkeeping, Category, Row};
use crate::store::ResultPartitionStore;

/// Export header for `rows`.
pub fn export_columns(rows: &[Row]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !is_bookkeeping(key) && !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

/// Write `rows` as CSV. Returns the number of data rows written; writes
/// nothing at all when `rows` is empty.
pub fn export_category(rows: &[Row], writer: impl Write) -> Result<usize, csv::Error> {
    if rows.is_empty() {
        return Ok(0);
    }

    let columns = export_columns(rows);
    let mut csv = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    csv.write_record(&columns)?;
    for row in rows {
        csv.write_record(
            columns
                .iter()
                .map(|c| row.get(c).map(cell_text).unwrap_or_default()),
        )?;
    }
    csv.flush()?;
    Ok(rows.len())
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportedFile {
    pub category: Category,
    pub path: PathBuf,
    pub rows: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportReport {
    pub written: Vec<ExportedFile>,
    /// Categories with no rows (no file emitted).
    pub skipped: Vec<Category>,
}

/// Write `<category>.csv` into `dir` for every non-empty category.
/// Filters on the store are ignored: export always covers everything loaded.
pub fn export_all(store: &ResultPartitionStore, dir: &Path) -> Result<ExportReport, ReconError> {
    std::fs::create_dir_all(dir)
        .map_err(|e| ReconError::Io(format!("cannot create {}: {e}", dir.display())))?;

    let mut report = ExportReport::default();
    for category in Category::ALL {
        let rows = store.rows(category);
        if rows.is_empty() {
            log::debug!("export: '{}' is empty, skipping", category);
            report.skipped.push(category);
            continue;
        }

        let path = dir.join(category.file_name());
        let file = std::fs::File::create(&path)
            .map_err(|e| ReconError::Io(format!("cannot create {}: {e}", path.display())))?;
        let written = export_category(rows, std::io::BufWriter::new(file)).map_err(|e| {
            ReconError::Export {
                category: category.to_string(),
                message: e.to_string(),
            }
        })?;

        log::info!("export: wrote {} row(s) to {}", written, path.display());
        report.written.push(ExportedFile { category, path, rows: written });
    }
    Ok(report)
}
