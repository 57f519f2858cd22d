//! Plain-text result tables.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use rostermerge_recon::model::cell_text;
use rostermerge_recon::{Row, RowStatus};

/// Widest a single column may render before truncation.
pub(crate) const MAX_COLUMN_WIDTH: usize = 24;

/// Display width of a string, accounting for CJK double-width, emoji, etc.
pub(crate) fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Cut `s` to at most `width` display columns, ending in ".." when cut.
pub(crate) fn truncate_display(s: &str, width: usize) -> String {
    if display_width(s) <= width {
        return s.to_string();
    }
    let budget = width.saturating_sub(2);
    let mut used = 0;
    let mut out = String::new();
    for ch in s.chars() {
        let cw = ch.width().unwrap_or(0);
        if used + cw > budget {
            break;
        }
        used += cw;
        out.push(ch);
    }
    if width >= 2 {
        out.push_str("..");
    }
    out
}

/// Pad or truncate a string to exactly `width` display columns.
pub(crate) fn pad_right(s: &str, width: usize) -> String {
    let cut = truncate_display(s, width);
    let w = display_width(&cut);
    format!("{}{}", cut, " ".repeat(width.saturating_sub(w)))
}

/// Render `rows` under `columns`, prefixed with each row's status marker.
///
/// Newlines inside cells are flattened so one record stays on one line.
pub(crate) fn render_rows(columns: &[String], rows: &[&Row]) -> String {
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|c| row.get(c).map(cell_text).unwrap_or_default().replace(['\n', '\r'], " "))
                .collect()
        })
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            cells
                .iter()
                .map(|r| display_width(&r[i]))
                .chain(std::iter::once(display_width(c)))
                .max()
                .unwrap_or(0)
                .min(MAX_COLUMN_WIDTH)
        })
        .collect();

    let mut out = String::new();
    out.push_str("  ");
    out.push_str(&join_line(columns.iter().map(String::as_str), &widths));
    out.push('\n');

    for (row, row_cells) in rows.iter().zip(&cells) {
        out.push(RowStatus::classify(row).marker());
        out.push(' ');
        out.push_str(&join_line(row_cells.iter().map(String::as_str), &widths));
        out.push('\n');
    }
    out
}

fn join_line<'a>(values: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    let parts: Vec<String> = values.zip(widths).map(|(v, w)| pad_right(v, *w)).collect();
    parts.join("  ").trim_end().to_string()
}
