//! Catalog entries and the raw line items they are built from

use super::analysis::{Dimension, PriceAnalysis};
use super::calculator::{try_compute_analysis, validate_prices};
use crate::config::ConsensusConfig;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Per-dimension analyses owned by one item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceAnalyses {
    pub material: PriceAnalysis,
    pub work: PriceAnalysis,
}

impl PriceAnalyses {
    pub fn get(&self, dimension: Dimension) -> &PriceAnalysis {
        match dimension {
            Dimension::Material => &self.material,
            Dimension::Work => &self.work,
        }
    }

    pub fn get_mut(&mut self, dimension: Dimension) -> &mut PriceAnalysis {
        match dimension {
            Dimension::Material => &mut self.material,
            Dimension::Work => &mut self.work,
        }
    }
}

/// One catalog entry produced by merging raw records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusItem {
    pub id: Uuid,
    pub name: String,
    pub unit: String,
    pub material_price: f64,
    pub work_price: f64,
    pub price_analysis: PriceAnalyses,
    #[serde(default)]
    pub material_price_approved: bool,
    #[serde(default)]
    pub work_price_approved: bool,
    /// Number of raw records merged into this item
    pub cluster_size: usize,
    pub source_files: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConsensusItem {
    /// Build an item from the upstream producer's observations
    pub fn from_observations(new_item: NewItem, config: &ConsensusConfig) -> Result<Self> {
        let name = new_item.name.trim().to_string();
        if name.is_empty() {
            return Err(Error::Validation("Item name is required".to_string()));
        }
        let material = try_compute_analysis(Dimension::Material, &new_item.material_prices, config)?;
        let work = try_compute_analysis(Dimension::Work, &new_item.work_prices, config)?;
        let observed = new_item.material_prices.len().max(new_item.work_prices.len());
        let now = Utc::now();

        Ok(Self {
            id: Uuid::new_v4(),
            name,
            unit: new_item.unit.trim().to_string(),
            material_price: material.final_price,
            work_price: work.final_price,
            price_analysis: PriceAnalyses { material, work },
            material_price_approved: false,
            work_price_approved: false,
            cluster_size: new_item.cluster_size.unwrap_or(observed.max(1)),
            source_files: new_item.source_files.into_iter().collect(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Build an item from a cluster of raw records judged to be the same item
    ///
    /// Name and unit come from the first record. Only positive prices count
    /// as observations; a zero means the source did not quote that dimension.
    pub fn from_cluster(records: &[RawRecord], config: &ConsensusConfig) -> Result<Self> {
        let base = records
            .first()
            .ok_or_else(|| Error::Validation("Cluster must contain at least one record".to_string()))?;

        let new_item = NewItem {
            name: base.name.clone(),
            unit: base.unit.clone(),
            material_prices: records
                .iter()
                .map(|r| r.material_price)
                .filter(|p| *p > 0.0)
                .collect(),
            work_prices: records
                .iter()
                .map(|r| r.work_price)
                .filter(|p| *p > 0.0)
                .collect(),
            cluster_size: Some(records.len()),
            source_files: records
                .iter()
                .map(|r| r.source_file.clone())
                .filter(|s| !s.is_empty())
                .collect(),
        };

        Self::from_observations(new_item, config)
    }

    pub fn price(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::Material => self.material_price,
            Dimension::Work => self.work_price,
        }
    }

    pub(crate) fn set_price(&mut self, dimension: Dimension, price: f64) {
        match dimension {
            Dimension::Material => self.material_price = price,
            Dimension::Work => self.work_price = price,
        }
    }

    pub fn approved(&self, dimension: Dimension) -> bool {
        match dimension {
            Dimension::Material => self.material_price_approved,
            Dimension::Work => self.work_price_approved,
        }
    }

    pub(crate) fn set_approved(&mut self, dimension: Dimension, approved: bool) {
        match dimension {
            Dimension::Material => self.material_price_approved = approved,
            Dimension::Work => self.work_price_approved = approved,
        }
    }

    pub fn analysis(&self, dimension: Dimension) -> &PriceAnalysis {
        self.price_analysis.get(dimension)
    }
}

/// Upstream producer contract: observations for a new catalog entry
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NewItem {
    pub name: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub material_prices: Vec<f64>,
    #[serde(default)]
    pub work_prices: Vec<f64>,
    /// Defaults to the larger observation count
    #[serde(default)]
    pub cluster_size: Option<usize>,
    #[serde(default)]
    pub source_files: Vec<String>,
}

/// Operator-supplied replacement fields for a catalog entry
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ItemEdit {
    pub name: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub material_price: f64,
    #[serde(default)]
    pub work_price: f64,
    #[serde(default)]
    pub material_price_approved: bool,
    #[serde(default)]
    pub work_price_approved: bool,
}

/// One line item as extracted from a single source document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub id: Uuid,
    pub name: String,
    pub unit: String,
    pub material_price: f64,
    pub work_price: f64,
    pub source_file: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields of a raw record, as ingested or edited
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawRecordFields {
    pub name: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub material_price: f64,
    #[serde(default)]
    pub work_price: f64,
    /// Ignored on edit; a record never changes its source
    #[serde(default)]
    pub source_file: String,
}

impl RawRecord {
    pub fn new(fields: RawRecordFields) -> Result<Self> {
        let (name, unit) = validate_line_item(
            &fields.name,
            &fields.unit,
            fields.material_price,
            fields.work_price,
        )?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            name,
            unit,
            material_price: fields.material_price,
            work_price: fields.work_price,
            source_file: fields.source_file.trim().to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Replace name, unit and prices; the source document is kept
    pub fn apply_edit(&mut self, fields: &RawRecordFields) -> Result<()> {
        let (name, unit) = validate_line_item(
            &fields.name,
            &fields.unit,
            fields.material_price,
            fields.work_price,
        )?;
        self.name = name;
        self.unit = unit;
        self.material_price = fields.material_price;
        self.work_price = fields.work_price;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Shared rule for operator-entered line items
///
/// Name required, prices finite and non-negative, at least one price non-zero.
/// Returns the trimmed name and unit.
pub(crate) fn validate_line_item(
    name: &str,
    unit: &str,
    material_price: f64,
    work_price: f64,
) -> Result<(String, String)> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Validation("Item name is required".to_string()));
    }
    validate_prices(&[material_price, work_price])?;
    if material_price == 0.0 && work_price == 0.0 {
        return Err(Error::Validation(
            "At least one of material_price or work_price must be non-zero".to_string(),
        ));
    }
    Ok((name.to_string(), unit.trim().to_string()))
}
