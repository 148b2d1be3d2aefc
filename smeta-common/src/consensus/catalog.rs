//! Flat catalog rows for spreadsheet exchange
//!
//! Export writes one row per item with its final prices only. Import builds
//! fresh items from such rows: the listed price becomes the single observation
//! of its dimension, so the analysis of an imported item is `single_price`
//! (or `no_prices` for a dimension without a positive price).

use super::calculator::validate_prices;
use super::item::{ConsensusItem, NewItem};
use crate::config::ConsensusConfig;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Separator between source file names in the `sources` column
pub const SOURCES_SEPARATOR: &str = ", ";

/// One catalog line
///
/// Every column is optional on import; rows without a name are skipped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogRow {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub material_price: Option<f64>,
    #[serde(default)]
    pub work_price: Option<f64>,
    #[serde(default)]
    pub cluster_size: Option<usize>,
    #[serde(default)]
    pub sources: Option<String>,
}

impl CatalogRow {
    pub fn from_item(item: &ConsensusItem) -> Self {
        Self {
            name: Some(item.name.clone()),
            unit: Some(item.unit.clone()),
            material_price: Some(item.material_price),
            work_price: Some(item.work_price),
            cluster_size: Some(item.cluster_size),
            sources: Some(
                item.source_files
                    .iter()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(SOURCES_SEPARATOR),
            ),
        }
    }
}

/// Build catalog items from imported rows
///
/// Skips rows with a blank name and rows with no positive price. Fails when a
/// price is negative or not a number, or when no row survives.
pub fn items_from_rows(rows: &[CatalogRow], config: &ConsensusConfig) -> Result<Vec<ConsensusItem>> {
    let mut items = Vec::new();

    for (index, row) in rows.iter().enumerate() {
        let line = index + 1;
        let name = row.name.as_deref().map(str::trim).unwrap_or_default();
        if name.is_empty() {
            debug!("Catalog row {}: no name, skipped", line);
            continue;
        }

        let material = row.material_price.unwrap_or(0.0);
        let work = row.work_price.unwrap_or(0.0);
        validate_prices(&[material, work])
            .map_err(|e| Error::Validation(format!("Catalog row {} ('{}'): {}", line, name, e)))?;
        if material <= 0.0 && work <= 0.0 {
            debug!("Catalog row {} ('{}'): no price, skipped", line, name);
            continue;
        }

        let new_item = NewItem {
            name: name.to_string(),
            unit: row.unit.clone().unwrap_or_default(),
            material_prices: positive(material),
            work_prices: positive(work),
            cluster_size: Some(row.cluster_size.unwrap_or(1).max(1)),
            source_files: row
                .sources
                .as_deref()
                .unwrap_or_default()
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        };
        let item = ConsensusItem::from_observations(new_item, config)
            .map_err(|e| Error::Validation(format!("Catalog row {} ('{}'): {}", line, name, e)))?;
        items.push(item);
    }

    if items.is_empty() {
        return Err(Error::Validation(
            "No catalog rows with a name and a price to import".to_string(),
        ));
    }
    Ok(items)
}

fn positive(price: f64) -> Vec<f64> {
    if price > 0.0 {
        vec![price]
    } else {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::CalculationMethod;

    fn row(name: &str, material: Option<f64>, work: Option<f64>) -> CatalogRow {
        CatalogRow {
            name: Some(name.to_string()),
            unit: Some("pcs".to_string()),
            material_price: material,
            work_price: work,
            ..CatalogRow::default()
        }
    }

    #[test]
    fn test_rows_without_name_or_price_are_skipped() {
        let rows = vec![
            row("  ", Some(10.0), None),
            row("Valve DN50", Some(0.0), Some(0.0)),
            row("Valve DN65", None, Some(45.5)),
        ];

        let items = items_from_rows(&rows, &ConsensusConfig::default()).unwrap();
        assert_eq!(items.len(), 1);

        let item = &items[0];
        assert_eq!(item.name, "Valve DN65");
        assert_eq!(item.material_price, 0.0);
        assert_eq!(item.work_price, 45.5);
        assert_eq!(item.cluster_size, 1);
        assert_eq!(item.price_analysis.work.calculation_method, CalculationMethod::SinglePrice);
        assert_eq!(item.price_analysis.material.calculation_method, CalculationMethod::NoPrices);
    }

    #[test]
    fn test_sources_column_is_split() {
        let mut imported = row("Damper", Some(300.0), None);
        imported.sources = Some("b.pdf, a.xlsx,,".to_string());
        imported.cluster_size = Some(3);

        let items = items_from_rows(&[imported], &ConsensusConfig::default()).unwrap();
        let sources: Vec<&str> = items[0].source_files.iter().map(String::as_str).collect();
        assert_eq!(sources, vec!["a.xlsx", "b.pdf"]);
        assert_eq!(items[0].cluster_size, 3);

        let exported = CatalogRow::from_item(&items[0]);
        assert_eq!(exported.sources.as_deref(), Some("a.xlsx, b.pdf"));
        assert_eq!(exported.material_price, Some(300.0));
    }

    #[test]
    fn test_nothing_to_import_is_rejected() {
        let err = items_from_rows(&[row("Empty", None, None)], &ConsensusConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_negative_price_names_the_row() {
        let rows = vec![row("Pipe", Some(5.0), None), row("Elbow", Some(-1.0), None)];
        match items_from_rows(&rows, &ConsensusConfig::default()) {
            Err(Error::Validation(msg)) => assert!(msg.contains("row 2"), "{}", msg),
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}
