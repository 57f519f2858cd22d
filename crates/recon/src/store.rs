//! Result Partition Store: owns the fetched four-way partition, the
//! per-category filter vocabularies derived from it, and the current
//! filter selection.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::filter::{self, FilterMode, FilterSelection, FilteredView};
use crate::model::{row_text, Category, PartitionedResult, Row};

// ---------------------------------------------------------------------------
// Dimensions
// ---------------------------------------------------------------------------

/// One of the two filterable columns of a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Primary,
    Secondary,
}

impl Dimension {
    pub const ALL: [Dimension; 2] = [Dimension::Primary, Dimension::Secondary];

    fn index(&self) -> usize {
        match self {
            Self::Primary => 0,
            Self::Secondary => 1,
        }
    }
}

/// Column names backing the two dimensions of a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimensionColumns {
    pub primary: &'static str,
    pub secondary: &'static str,
}

impl DimensionColumns {
    pub fn column(&self, dimension: Dimension) -> &'static str {
        match dimension {
            Dimension::Primary => self.primary,
            Dimension::Secondary => self.secondary,
        }
    }
}

/// `matched` rows carry both sources, so their building columns are
/// disambiguated; the other categories use the source-native names.
const MATCHED_DIMENSIONS: DimensionColumns = DimensionColumns {
    primary: "Building (Apricot)",
    secondary: "Building (Onesite)",
};

const SOURCE_DIMENSIONS: DimensionColumns = DimensionColumns {
    primary: "Property",
    secondary: "Building",
};

pub fn dimension_columns(category: Category) -> DimensionColumns {
    match category {
        Category::Matched => MATCHED_DIMENSIONS,
        Category::Unmatched | Category::NameMatched | Category::DobMatched => SOURCE_DIMENSIONS,
    }
}

/// Distinct, non-empty display values of `column` across `rows`.
pub fn distinct_values(rows: &[Row], column: &str) -> BTreeSet<String> {
    rows.iter().filter_map(|row| row_text(row, column)).collect()
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct ResultPartitionStore {
    result: PartitionedResult,
    /// Indexed by category, then dimension.
    vocabularies: [[BTreeSet<String>; 2]; 4],
    selection: FilterSelection,
}

impl ResultPartitionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_result(result: PartitionedResult) -> Self {
        let mut store = Self::new();
        store.ingest(result);
        store
    }

    /// Replace the partition, rebuild every vocabulary, reset the selection.
    pub fn ingest(&mut self, result: PartitionedResult) {
        for category in Category::ALL {
            let columns = dimension_columns(category);
            let rows = result.rows(category);
            for dimension in Dimension::ALL {
                self.vocabularies[category.index()][dimension.index()] =
                    distinct_values(rows, columns.column(dimension));
            }
        }
        self.result = result;
        self.selection = FilterSelection::default();

        log::debug!(
            "store: ingested {} matched / {} unmatched / {} name / {} dob rows",
            self.result.matched.len(),
            self.result.unmatched.len(),
            self.result.name_matched.len(),
            self.result.dob_matched.len(),
        );
    }

    pub fn result(&self) -> &PartitionedResult {
        &self.result
    }

    pub fn rows(&self, category: Category) -> &[Row] {
        self.result.rows(category)
    }

    /// Unfiltered row count per category, in [`Category::ALL`] order.
    pub fn counts(&self) -> [(Category, usize); 4] {
        Category::ALL.map(|c| (c, self.rows(c).len()))
    }

    pub fn vocabulary(&self, category: Category, dimension: Dimension) -> &BTreeSet<String> {
        &self.vocabularies[category.index()][dimension.index()]
    }

    pub fn selection(&self) -> &FilterSelection {
        &self.selection
    }

    /// Select (or with None / blank, unselect) a value for one dimension.
    pub fn select(&mut self, dimension: Dimension, value: Option<String>) {
        self.selection.set(dimension, value);
    }

    pub fn set_mode(&mut self, mode: FilterMode) {
        self.selection.mode = mode;
    }

    pub fn set_selection(&mut self, selection: FilterSelection) {
        self.selection = selection;
    }

    /// Clear the selection back to nothing selected / OR.
    pub fn reset_filters(&mut self) {
        self.selection = FilterSelection::default();
    }

    /// Filtered view under the current selection.
    pub fn view(&self) -> FilteredView<'_> {
        filter::apply(self, &self.selection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(v: serde_json::Value) -> Vec<Row> {
        serde_json::from_value(v).unwrap()
    }

    fn sample() -> PartitionedResult {
        PartitionedResult {
            matched: rows(json!([
                { "Building (Apricot)": "A", "Building (Onesite)": "A1" },
                { "Building (Apricot)": "A", "Building (Onesite)": "A2" },
                { "Building (Apricot)": null, "Building (Onesite)": "" },
            ])),
            unmatched: rows(json!([
                { "Property": "P1", "Building": null },
                { "Property": null, "Building": "B7" },
            ])),
            name_matched: vec![],
            dob_matched: rows(json!([{ "Property": 12.0, "Building": "B1" }])),
        }
    }

    #[test]
    fn test_vocabularies_per_category() {
        let store = ResultPartitionStore::from_result(sample());

        let v = store.vocabulary(Category::Matched, Dimension::Primary);
        assert_eq!(v.iter().cloned().collect::<Vec<_>>(), vec!["A".to_string()]);
        let v = store.vocabulary(Category::Matched, Dimension::Secondary);
        assert_eq!(v.len(), 2);

        assert!(store.vocabulary(Category::Unmatched, Dimension::Primary).contains("P1"));
        assert!(store.vocabulary(Category::Unmatched, Dimension::Secondary).contains("B7"));
        assert!(store.vocabulary(Category::NameMatched, Dimension::Primary).is_empty());
        assert!(store.vocabulary(Category::DobMatched, Dimension::Primary).contains("12"));
    }

    #[test]
    fn test_ingest_resets_selection_and_replaces_rows() {
        let mut store = ResultPartitionStore::from_result(sample());
        store.select(Dimension::Primary, Some("A".into()));
        store.set_mode(FilterMode::And);

        store.ingest(PartitionedResult::default());
        assert_eq!(store.selection(), &FilterSelection::default());
        assert!(store.rows(Category::Matched).is_empty());
        assert!(store.vocabulary(Category::Matched, Dimension::Primary).is_empty());
    }

    #[test]
    fn test_counts_follow_category_order() {
        let store = ResultPartitionStore::from_result(sample());
        assert_eq!(
            store.counts(),
            [
                (Category::Matched, 3),
                (Category::Unmatched, 2),
                (Category::NameMatched, 0),
                (Category::DobMatched, 1),
            ]
        );
    }

    #[test]
    fn test_dimension_table() {
        assert_eq!(dimension_columns(Category::Matched).primary, "Building (Apricot)");
        assert_eq!(dimension_columns(Category::Matched).secondary, "Building (Onesite)");
        for c in [Category::Unmatched, Category::NameMatched, Category::DobMatched] {
            assert_eq!(dimension_columns(c).column(Dimension::Primary), "Property");
            assert_eq!(dimension_columns(c).column(Dimension::Secondary), "Building");
        }
    }
}
