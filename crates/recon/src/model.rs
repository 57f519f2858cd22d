use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// One freeform record: column name → JSON scalar, in received column order.
pub type Row = serde_json::Map<String, Value>;

pub const MATCHED_IN_BOTH: &str = "Matched in both";
pub const UNMATCHED_APRICOT: &str = "Unmatched Apricot";
pub const UNMATCHED_ONESITE: &str = "Unmatched Onesite";

/// Reserved response columns. Drive row classification, never exported.
pub const BOOKKEEPING_COLUMNS: [&str; 3] = [MATCHED_IN_BOTH, UNMATCHED_APRICOT, UNMATCHED_ONESITE];

pub fn is_bookkeeping(column: &str) -> bool {
    BOOKKEEPING_COLUMNS.contains(&column)
}

/// Render a cell as display text.
///
/// Integral floats print without a fractional part (`101.0` → `101`) so
/// spreadsheet-sourced numbers read the same as the upload step showed them.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            if n.is_f64() {
                if let Some(f) = n.as_f64() {
                    if f.fract() == 0.0 && f.abs() < 1e15 {
                        return format!("{}", f as i64);
                    }
                }
            }
            n.to_string()
        }
        other => other.to_string(),
    }
}

/// Display text of `column` in `row`, None when absent, null or blank.
pub fn row_text(row: &Row, column: &str) -> Option<String> {
    let text = cell_text(row.get(column)?);
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        _ => false,
    }
}

/// Presentation class of a row, read from its bookkeeping columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowStatus {
    MatchedInBoth,
    UnmatchedApricot,
    UnmatchedOnesite,
    Unclassified,
}

impl RowStatus {
    pub fn classify(row: &Row) -> Self {
        if is_truthy(row.get(MATCHED_IN_BOTH)) {
            Self::MatchedInBoth
        } else if is_truthy(row.get(UNMATCHED_APRICOT)) {
            Self::UnmatchedApricot
        } else if is_truthy(row.get(UNMATCHED_ONESITE)) {
            Self::UnmatchedOnesite
        } else {
            Self::Unclassified
        }
    }

    /// Single-character marker for terminal tables.
    pub fn marker(&self) -> char {
        match self {
            Self::MatchedInBoth => '=',
            Self::UnmatchedApricot => 'A',
            Self::UnmatchedOnesite => 'O',
            Self::Unclassified => ' ',
        }
    }
}

// ---------------------------------------------------------------------------
// Upload output + column catalog
// ---------------------------------------------------------------------------

/// Output of the upload service for one dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadedDataset {
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub data: Vec<Row>,
}

/// Which source dataset a column belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Onesite,
    Apricot,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Onesite => write!(f, "onesite"),
            Self::Apricot => write!(f, "apricot"),
        }
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "onesite" => Ok(Self::Onesite),
            "apricot" => Ok(Self::Apricot),
            other => Err(format!("unknown dataset '{other}' (expected onesite or apricot)")),
        }
    }
}

/// Available column names per dataset. Read-only once loaded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnCatalog {
    pub onesite_columns: Vec<String>,
    pub apricot_columns: Vec<String>,
}

impl ColumnCatalog {
    pub fn new(onesite_columns: Vec<String>, apricot_columns: Vec<String>) -> Self {
        Self { onesite_columns, apricot_columns }
    }

    pub fn columns(&self, side: Side) -> &[String] {
        match side {
            Side::Onesite => &self.onesite_columns,
            Side::Apricot => &self.apricot_columns,
        }
    }

    pub fn contains(&self, side: Side, column: &str) -> bool {
        self.columns(side).iter().any(|c| c == column)
    }
}

// ---------------------------------------------------------------------------
// Merge pairs
// ---------------------------------------------------------------------------

/// Declared correspondence between one OneSite and one Apricot column.
/// An empty (or blank) field is unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergePair {
    #[serde(default)]
    pub onesite: String,
    #[serde(default)]
    pub apricot: String,
}

impl MergePair {
    pub fn new(onesite: impl Into<String>, apricot: impl Into<String>) -> Self {
        Self { onesite: onesite.into(), apricot: apricot.into() }
    }

    pub fn set(&mut self, side: Side, value: String) {
        match side {
            Side::Onesite => self.onesite = value,
            Side::Apricot => self.apricot = value,
        }
    }

    /// Both fields set: a usable join key.
    pub fn is_complete(&self) -> bool {
        !self.onesite.trim().is_empty() && !self.apricot.trim().is_empty()
    }

    /// Neither field set: the pending "add" slot.
    pub fn is_empty(&self) -> bool {
        self.onesite.trim().is_empty() && self.apricot.trim().is_empty()
    }
}

// ---------------------------------------------------------------------------
// Categories + partitioned result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Matched,
    Unmatched,
    NameMatched,
    DobMatched,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Matched,
        Category::Unmatched,
        Category::NameMatched,
        Category::DobMatched,
    ];

    /// Canonical name (wire key and export file stem).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Matched => "matched",
            Self::Unmatched => "unmatched",
            Self::NameMatched => "name_matched",
            Self::DobMatched => "dob_matched",
        }
    }

    /// Tab title.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Matched => "All Matched",
            Self::Unmatched => "Unmatched",
            Self::NameMatched => "Name Matched",
            Self::DobMatched => "DOB Matched",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.csv", self.as_str())
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Self::Matched => 0,
            Self::Unmatched => 1,
            Self::NameMatched => 2,
            Self::DobMatched => 3,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| {
                format!("unknown category '{s}' (expected matched, unmatched, name_matched or dob_matched)")
            })
    }
}

/// The remote service's four-way partition. Missing or null categories
/// decode as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartitionedResult {
    #[serde(default, deserialize_with = "rows_or_empty")]
    pub matched: Vec<Row>,
    #[serde(default, deserialize_with = "rows_or_empty")]
    pub unmatched: Vec<Row>,
    #[serde(default, deserialize_with = "rows_or_empty")]
    pub name_matched: Vec<Row>,
    #[serde(default, deserialize_with = "rows_or_empty")]
    pub dob_matched: Vec<Row>,
}

fn rows_or_empty<'de, D>(deserializer: D) -> Result<Vec<Row>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<Vec<Row>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl PartitionedResult {
    pub fn rows(&self, category: Category) -> &[Row] {
        match category {
            Category::Matched => &self.matched,
            Category::Unmatched => &self.unmatched,
            Category::NameMatched => &self.name_matched,
            Category::DobMatched => &self.dob_matched,
        }
    }

    pub fn total_rows(&self) -> usize {
        Category::ALL.iter().map(|c| self.rows(*c).len()).sum()
    }
}
