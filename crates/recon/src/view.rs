//! Results view lifecycle for one reconciliation activation.
//!
//! `Loading` until the single response arrives, then `Ready` or `Failed`.
//! No retry: recovery is going back to the configuration step.

use std::fmt::Display;

use crate::editor::valid_pairs;
use crate::error::ReconError;
use crate::model::{MergePair, PartitionedResult};
use crate::store::ResultPartitionStore;

/// Message shown when the exchange fails. The cause goes to the log.
pub const FETCH_FAILED_MESSAGE: &str = "Failed to fetch merge results.";

#[derive(Debug, Clone)]
pub enum ResultsView {
    Loading,
    Ready(ResultPartitionStore),
    Failed(String),
}

impl ResultsView {
    /// Enter `Loading` for a run over `pairs`. Refused when no pair is complete.
    pub fn activate(pairs: &[MergePair]) -> Result<Self, ReconError> {
        if valid_pairs(pairs).is_empty() {
            return Err(ReconError::NoValidPairs);
        }
        Ok(Self::Loading)
    }

    /// Settle a `Loading` view with the exchange outcome. Any other state
    /// ignores late completions.
    pub fn complete<E: Display>(&mut self, outcome: Result<PartitionedResult, E>) {
        if !matches!(self, Self::Loading) {
            log::warn!("results view: ignoring completion outside Loading");
            return;
        }
        *self = match outcome {
            Ok(result) => {
                log::info!("results view: received {} row(s)", result.total_rows());
                Self::Ready(ResultPartitionStore::from_result(result))
            }
            Err(e) => {
                log::error!("reconciliation failed: {e}");
                Self::Failed(FETCH_FAILED_MESSAGE.to_string())
            }
        };
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn store(&self) -> Option<&ResultPartitionStore> {
        match self {
            Self::Ready(store) => Some(store),
            _ => None,
        }
    }

    pub fn store_mut(&mut self) -> Option<&mut ResultPartitionStore> {
        match self {
            Self::Ready(store) => Some(store),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Failed(msg) => Some(msg),
            _ => None,
        }
    }
}
