//! Price analysis record shared by both price dimensions

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the two independent price axes tracked per catalog item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Material,
    Work,
}

impl Dimension {
    pub const ALL: [Dimension; 2] = [Dimension::Material, Dimension::Work];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Material => "material",
            Dimension::Work => "work",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dimension {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "material" => Ok(Dimension::Material),
            "work" => Ok(Dimension::Work),
            other => Err(Error::Validation(format!(
                "Unknown dimension '{}' (expected 'material' or 'work')",
                other
            ))),
        }
    }
}

/// Rule that produced `final_price`
///
/// Serialized as the flat tag the dashboard expects, e.g.
/// `"trimmed_average_5_prices"` or `"manual_average_3_prices"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CalculationMethod {
    NoPrices,
    SinglePrice,
    /// Plain mean of 2 or 3 observations
    Average(usize),
    /// Mean after dropping one lowest and one highest observation
    TrimmedAverage(usize),
    /// Recomputed after an operator removed an observation
    ManualAverage(usize),
}

impl fmt::Display for CalculationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalculationMethod::NoPrices => f.write_str("no_prices"),
            CalculationMethod::SinglePrice => f.write_str("single_price"),
            CalculationMethod::Average(n) => write!(f, "average_{}_prices", n),
            CalculationMethod::TrimmedAverage(n) => write!(f, "trimmed_average_{}_prices", n),
            CalculationMethod::ManualAverage(n) => write!(f, "manual_average_{}_prices", n),
        }
    }
}

impl FromStr for CalculationMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "no_prices" => return Ok(CalculationMethod::NoPrices),
            "single_price" => return Ok(CalculationMethod::SinglePrice),
            _ => {}
        }

        let counted = |prefix: &str| -> Option<usize> {
            s.strip_prefix(prefix)?
                .strip_suffix("_prices")?
                .parse::<usize>()
                .ok()
        };

        if let Some(n) = counted("trimmed_average_") {
            Ok(CalculationMethod::TrimmedAverage(n))
        } else if let Some(n) = counted("manual_average_") {
            Ok(CalculationMethod::ManualAverage(n))
        } else if let Some(n) = counted("average_") {
            Ok(CalculationMethod::Average(n))
        } else {
            Err(Error::Validation(format!("Unknown calculation method '{}'", s)))
        }
    }
}

impl TryFrom<String> for CalculationMethod {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<CalculationMethod> for String {
    fn from(method: CalculationMethod) -> Self {
        method.to_string()
    }
}

/// Consensus result for one dimension of one item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceAnalysis {
    /// Observations in the order they were ingested
    pub original_prices: Vec<f64>,
    /// Observations folded into `final_price`
    pub used_prices: Vec<f64>,
    /// Extremes dropped by trimming
    #[serde(default)]
    pub excluded_prices: Vec<f64>,
    pub calculation_method: CalculationMethod,
    pub final_price: f64,
    pub variance_percent: f64,
    pub warning: Option<String>,
}

impl PriceAnalysis {
    /// Analysis for a dimension with no observations and no warning
    ///
    /// Used as the stored shape for items created outside the calculator
    /// (e.g. direct imports); `compute_analysis(&[])` adds the no-data warning.
    pub fn empty() -> Self {
        Self {
            original_prices: Vec::new(),
            used_prices: Vec::new(),
            excluded_prices: Vec::new(),
            calculation_method: CalculationMethod::NoPrices,
            final_price: 0.0,
            variance_percent: 0.0,
            warning: None,
        }
    }

    pub fn observation_count(&self) -> usize {
        self.original_prices.len()
    }
}

/// Round to 2 decimal places (currency precision)
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
