//! Merge Pair Editor: ordered join-key pairs over a column catalog.
//!
//! State invariant, restored after every mutation by [`normalize_pairs`]:
//! - the sequence is never empty;
//! - the last pair is never complete (completing it appends a fresh empty
//!   pair, the "add new pair" slot);
//! - a fully-empty pair only ever sits in the last position.
//!
//! Every successful mutation is written to the session store under
//! `mergePairs` before control returns.

use rostermerge_config::{SessionStore, APRICOT_DATA_KEY, MERGE_PAIRS_KEY, ONESITE_DATA_KEY};

use crate::error::ReconError;
use crate::model::{ColumnCatalog, MergePair, Side, UploadedDataset};

/// Restore the editor invariant in place.
pub fn normalize_pairs(pairs: &mut Vec<MergePair>) {
    // Interior empty pairs are dead slots; only the trailing one is the add affordance
    let last = pairs.len().saturating_sub(1);
    let mut index = 0;
    pairs.retain(|p| {
        let keep = index == last || !p.is_empty();
        index += 1;
        keep
    });

    match pairs.last() {
        None => pairs.push(MergePair::default()),
        Some(p) if p.is_complete() => pairs.push(MergePair::default()),
        Some(_) => {}
    }
}

/// Complete pairs in entry order, the join keys sent downstream.
pub fn valid_pairs(pairs: &[MergePair]) -> Vec<MergePair> {
    pairs.iter().filter(|p| p.is_complete()).cloned().collect()
}

pub struct MergePairEditor<S: SessionStore> {
    catalog: ColumnCatalog,
    pairs: Vec<MergePair>,
    store: S,
}

impl<S: SessionStore> MergePairEditor<S> {
    /// Start from `saved` when present and non-empty, else a single empty pair.
    pub fn initialize(catalog: ColumnCatalog, saved: Option<Vec<MergePair>>, store: S) -> Self {
        let mut pairs = saved.filter(|p| !p.is_empty()).unwrap_or_default();
        normalize_pairs(&mut pairs);
        Self { catalog, pairs, store }
    }

    /// Read the catalog and any saved configuration from the session store.
    ///
    /// Unreadable entries are logged and treated as absent so a damaged
    /// session never blocks the editor.
    pub fn open(store: S) -> Result<Self, ReconError> {
        let onesite = read_or_default::<S, UploadedDataset>(&store, ONESITE_DATA_KEY);
        let apricot = read_or_default::<S, UploadedDataset>(&store, APRICOT_DATA_KEY);
        let catalog = ColumnCatalog::new(onesite.columns, apricot.columns);

        let saved = match store.get::<Vec<MergePair>>(MERGE_PAIRS_KEY) {
            Ok(saved) => saved,
            Err(e) => {
                log::warn!("discarding saved merge pairs: {e}");
                None
            }
        };

        log::debug!(
            "editor: catalog {} onesite / {} apricot columns, {} saved pair(s)",
            catalog.onesite_columns.len(),
            catalog.apricot_columns.len(),
            saved.as_ref().map(Vec::len).unwrap_or(0),
        );

        Ok(Self::initialize(catalog, saved, store))
    }

    pub fn catalog(&self) -> &ColumnCatalog {
        &self.catalog
    }

    pub fn pairs(&self) -> &[MergePair] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Set one field of the pair at `index`.
    ///
    /// Completing the last pair appends a new empty pair; edits to earlier
    /// pairs never grow the sequence.
    ///
    /// # Panics
    /// If `index` is out of bounds.
    pub fn set_pair(&mut self, index: usize, side: Side, value: impl Into<String>) -> Result<(), ReconError> {
        self.check_index(index, "set_pair");

        let is_last = index == self.pairs.len() - 1;
        self.pairs[index].set(side, value.into());

        if is_last && self.pairs[index].is_complete() {
            self.pairs.push(MergePair::default());
        }
        normalize_pairs(&mut self.pairs);
        self.persist()
    }

    /// Whether the remove affordance is offered for `index`.
    /// False exactly for the trailing empty "add" slot.
    pub fn can_remove(&self, index: usize) -> bool {
        index < self.pairs.len()
            && !(index == self.pairs.len() - 1 && self.pairs[index].is_empty())
    }

    /// Delete the pair at `index`. The configuration never becomes empty;
    /// removing the trailing add slot leaves the configuration unchanged.
    ///
    /// # Panics
    /// If `index` is out of bounds.
    pub fn remove_pair(&mut self, index: usize) -> Result<(), ReconError> {
        self.check_index(index, "remove_pair");

        self.pairs.remove(index);
        normalize_pairs(&mut self.pairs);
        self.persist()
    }

    /// Reset to a single empty pair.
    pub fn clear(&mut self) -> Result<(), ReconError> {
        self.pairs = vec![MergePair::default()];
        self.persist()
    }

    pub fn valid_pairs(&self) -> Vec<MergePair> {
        valid_pairs(&self.pairs)
    }

    /// At least one complete pair: reconciliation may proceed.
    pub fn can_proceed(&self) -> bool {
        self.pairs.iter().any(MergePair::is_complete)
    }

    fn check_index(&self, index: usize, op: &str) {
        assert!(
            index < self.pairs.len(),
            "{op}: index {index} out of bounds for {} merge pair(s)",
            self.pairs.len()
        );
    }

    fn persist(&mut self) -> Result<(), ReconError> {
        self.store.set(MERGE_PAIRS_KEY, &self.pairs)?;
        log::debug!("editor: persisted {} pair(s)", self.pairs.len());
        Ok(())
    }
}

fn read_or_default<S: SessionStore, T: serde::de::DeserializeOwned + Default>(store: &S, key: &str) -> T {
    match store.get::<T>(key) {
        Ok(value) => value.unwrap_or_default(),
        Err(e) => {
            log::warn!("ignoring unreadable session entry: {e}");
            T::default()
        }
    }
}
