//! Price consensus engine
//!
//! Folds independently observed prices for one item into a single canonical
//! price per dimension, and applies operator edits on top of the result.

pub mod analysis;
pub mod calculator;
pub mod catalog;
pub mod item;
pub mod mutator;

pub use analysis::{round2, CalculationMethod, Dimension, PriceAnalysis};
pub use calculator::{compute_analysis, manual_retrim, try_compute_analysis, validate_prices};
pub use catalog::{items_from_rows, CatalogRow};
pub use item::{ConsensusItem, ItemEdit, NewItem, PriceAnalyses, RawRecord, RawRecordFields};
pub use mutator::{approve, edit_item, item_shows_warning, remove_price, should_show_warning};
