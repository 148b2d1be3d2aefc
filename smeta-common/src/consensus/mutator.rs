//! Operator edits applied to a computed item
//!
//! Every operation either fully applies or leaves the item untouched.
//! Storage-level concerns (locking, deletion, timestamps) live with the store.

use super::analysis::{Dimension, PriceAnalysis};
use super::calculator::manual_retrim;
use super::item::{validate_line_item, ConsensusItem, ItemEdit};
use crate::config::ConsensusConfig;
use crate::{Error, Result};

/// Remove one observed price and re-trim the dimension
///
/// Only `<dimension>_price` and that dimension's analysis change; approval
/// flags are left as they were.
pub fn remove_price(
    item: &mut ConsensusItem,
    dimension: Dimension,
    price_index: usize,
    config: &ConsensusConfig,
) -> Result<()> {
    let current = item.analysis(dimension);
    let len = current.original_prices.len();
    if price_index >= len {
        return Err(Error::IndexOutOfRange {
            index: price_index,
            len,
        });
    }

    let mut remaining = current.original_prices.clone();
    remaining.remove(price_index);

    let analysis = manual_retrim(dimension, &remaining, config)?;
    item.set_price(dimension, analysis.final_price);
    *item.price_analysis.get_mut(dimension) = analysis;
    Ok(())
}

/// Replace the operator-editable fields directly
///
/// Bypasses the calculator: the given prices override any consensus, and
/// the stored analyses are left as they were.
pub fn edit_item(item: &mut ConsensusItem, edit: &ItemEdit) -> Result<()> {
    let (name, unit) =
        validate_line_item(&edit.name, &edit.unit, edit.material_price, edit.work_price)?;

    item.name = name;
    item.unit = unit;
    item.material_price = edit.material_price;
    item.work_price = edit.work_price;
    item.material_price_approved = edit.material_price_approved;
    item.work_price_approved = edit.work_price_approved;
    Ok(())
}

/// Set the operator trust flag for one dimension
pub fn approve(item: &mut ConsensusItem, dimension: Dimension, approved: bool) {
    item.set_approved(dimension, approved);
}

/// Whether the automated warning should be displayed
pub fn should_show_warning(analysis: Option<&PriceAnalysis>, approved: bool) -> bool {
    analysis.is_some_and(|a| a.warning.is_some()) && !approved
}

/// Display flag for one dimension of an item
pub fn item_shows_warning(item: &ConsensusItem, dimension: Dimension) -> bool {
    should_show_warning(Some(item.analysis(dimension)), item.approved(dimension))
}
