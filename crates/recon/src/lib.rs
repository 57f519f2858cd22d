//! `rostermerge-recon`: merge configuration and result reconciliation view.
//!
//! Pure state crate: the merge-pair editor, the result partition store, the
//! filter engine and the CSV exporter. The matching itself runs remotely;
//! this crate only shapes what is sent and reads what comes back.

pub mod editor;
pub mod error;
pub mod export;
pub mod filter;
pub mod model;
pub mod store;
pub mod view;

pub use editor::MergePairEditor;
pub use error::ReconError;
pub use export::{export_all, export_category, ExportReport};
pub use filter::{FilterMode, FilterSelection, FilteredView};
pub use model::{Category, ColumnCatalog, MergePair, PartitionedResult, Row, RowStatus, Side, UploadedDataset};
pub use store::{Dimension, ResultPartitionStore};
pub use view::ResultsView;
