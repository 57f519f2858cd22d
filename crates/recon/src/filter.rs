//! Filter Engine: visible subset of every category under a selection.
//!
//! Pure and recomputed on every change. Selected values are shared across
//! categories; each category matches them against its own dimension
//! columns, so a value that only exists in one category filters the others
//! down to nothing (AND) or to their other dimension (OR).

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::{row_text, Category, Row};
use crate::store::{dimension_columns, Dimension, DimensionColumns, ResultPartitionStore};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    #[default]
    Or,
    And,
}

impl std::fmt::Display for FilterMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Or => write!(f, "OR"),
            Self::And => write!(f, "AND"),
        }
    }
}

impl FromStr for FilterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "or" => Ok(Self::Or),
            "and" => Ok(Self::And),
            other => Err(format!("unknown filter mode '{other}' (expected or / and)")),
        }
    }
}

/// At most one value per dimension plus the combination mode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterSelection {
    pub primary: Option<String>,
    pub secondary: Option<String>,
    pub mode: FilterMode,
}

impl FilterSelection {
    pub fn new(primary: Option<String>, secondary: Option<String>, mode: FilterMode) -> Self {
        let mut selection = Self { primary: None, secondary: None, mode };
        selection.set(Dimension::Primary, primary);
        selection.set(Dimension::Secondary, secondary);
        selection
    }

    pub fn value(&self, dimension: Dimension) -> Option<&str> {
        match dimension {
            Dimension::Primary => self.primary.as_deref(),
            Dimension::Secondary => self.secondary.as_deref(),
        }
    }

    /// Blank values count as unselected.
    pub fn set(&mut self, dimension: Dimension, value: Option<String>) {
        let value = value.filter(|v| !v.trim().is_empty());
        match dimension {
            Dimension::Primary => self.primary = value,
            Dimension::Secondary => self.secondary = value,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.primary.is_none() && self.secondary.is_none()
    }
}

/// Whether `row` stays visible under `selection`, using `columns` for its category.
///
/// OR keeps a row when any *selected* dimension matches; with nothing
/// selected it keeps everything. AND requires every selected dimension to
/// match (an unselected one is vacuously true).
pub fn row_matches(row: &Row, columns: DimensionColumns, selection: &FilterSelection) -> bool {
    let predicates: Vec<bool> = Dimension::ALL
        .iter()
        .filter_map(|d| {
            let wanted = selection.value(*d)?;
            Some(row_text(row, columns.column(*d)).as_deref() == Some(wanted))
        })
        .collect();

    if predicates.is_empty() {
        return true;
    }
    match selection.mode {
        FilterMode::Or => predicates.iter().any(|p| *p),
        FilterMode::And => predicates.iter().all(|p| *p),
    }
}

/// Visible rows per category, borrowed from the store.
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    categories: [Vec<&'a Row>; 4],
}

impl<'a> FilteredView<'a> {
    pub fn rows(&self, category: Category) -> &[&'a Row] {
        &self.categories[category.index()]
    }

    pub fn count(&self, category: Category) -> usize {
        self.categories[category.index()].len()
    }
}

/// Compute the filtered view of every category.
pub fn apply<'a>(store: &'a ResultPartitionStore, selection: &FilterSelection) -> FilteredView<'a> {
    let categories = Category::ALL.map(|category| {
        let columns = dimension_columns(category);
        store
            .rows(category)
            .iter()
            .filter(|row| row_matches(row, columns, selection))
            .collect()
    });
    FilteredView { categories }
}

/// Clear the selection and return the unfiltered view.
pub fn reset(store: &mut ResultPartitionStore) -> FilteredView<'_> {
    store.reset_filters();
    apply(store, &FilterSelection::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PartitionedResult;
    use serde_json::json;

    fn store() -> ResultPartitionStore {
        let result: PartitionedResult = serde_json::from_value(json!({
            "matched": [
                { "Building (Apricot)": "A", "Building (Onesite)": "A1" },
                { "Building (Apricot)": "B", "Building (Onesite)": "A1" },
                { "Building (Apricot)": "B", "Building (Onesite)": "B2" }
            ],
            "unmatched": [
                { "Property": "A", "Building": "X" },
                { "Property": "Q", "Building": "A1" }
            ],
            "name_matched": [],
            "dob_matched": [{ "Property": "Q", "Building": "Y" }]
        }))
        .unwrap();
        ResultPartitionStore::from_result(result)
    }

    fn sel(p: Option<&str>, s: Option<&str>, mode: FilterMode) -> FilterSelection {
        FilterSelection::new(p.map(String::from), s.map(String::from), mode)
    }

    #[test]
    fn test_no_selection_keeps_everything() {
        let st = store();
        for mode in [FilterMode::Or, FilterMode::And] {
            let view = apply(&st, &sel(None, None, mode));
            for c in Category::ALL {
                assert_eq!(view.count(c), st.rows(c).len());
            }
        }
    }

    #[test]
    fn test_single_dimension_filters_each_category_by_own_columns() {
        let st = store();
        let view = apply(&st, &sel(Some("A"), None, FilterMode::Or));
        assert_eq!(view.count(Category::Matched), 1);
        // "A" matches the Property column in unmatched
        assert_eq!(view.count(Category::Unmatched), 1);
        assert_eq!(view.count(Category::DobMatched), 0);
    }

    #[test]
    fn test_or_unions_dimensions() {
        let st = store();
        let view = apply(&st, &sel(Some("A"), Some("B2"), FilterMode::Or));
        assert_eq!(view.count(Category::Matched), 2);
    }

    #[test]
    fn test_and_intersects_dimensions() {
        let st = store();
        let view = apply(&st, &sel(Some("B"), Some("A1"), FilterMode::And));
        assert_eq!(view.count(Category::Matched), 1);
        assert_eq!(view.rows(Category::Matched)[0]["Building (Apricot)"], json!("B"));
    }

    #[test]
    fn test_and_with_one_selection_matches_single_dimension() {
        let st = store();
        let and_view = apply(&st, &sel(None, Some("A1"), FilterMode::And));
        let or_view = apply(&st, &sel(None, Some("A1"), FilterMode::Or));
        assert_eq!(and_view.count(Category::Matched), 2);
        assert_eq!(or_view.count(Category::Matched), 2);
    }

    #[test]
    fn test_unknown_value_matches_nothing() {
        let st = store();
        let view = apply(&st, &sel(Some("Z"), None, FilterMode::And));
        for c in Category::ALL {
            assert_eq!(view.count(c), 0);
        }
    }

    #[test]
    fn test_reset_clears_selection() {
        let mut st = store();
        st.select(Dimension::Primary, Some("A".into()));
        st.set_mode(FilterMode::And);
        assert_eq!(st.view().count(Category::Matched), 1);

        let view = reset(&mut st);
        assert_eq!(view.count(Category::Matched), 3);
        assert_eq!(st.selection(), &FilterSelection::default());
    }

    #[test]
    fn test_blank_selection_is_unset() {
        let s = sel(Some("  "), Some(""), FilterMode::Or);
        assert!(s.is_empty());
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("AND".parse::<FilterMode>().unwrap(), FilterMode::And);
        assert_eq!("or".parse::<FilterMode>().unwrap(), FilterMode::Or);
        assert!("xor".parse::<FilterMode>().is_err());
    }
}
