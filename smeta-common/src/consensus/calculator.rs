//! Consensus calculator
//!
//! Reduces the observed prices of one dimension of one item to a single
//! canonical price plus a spread signal. Selection rule by observation count:
//!
//! | n   | method                     | used                    |
//! |-----|----------------------------|-------------------------|
//! | 0   | `no_prices`                | none                    |
//! | 1   | `single_price`             | all                     |
//! | 2-3 | `average_<n>_prices`       | all                     |
//! | 4+  | `trimmed_average_<n>_prices` | all but 1 min and 1 max |
//!
//! Only one pair of extremes is ever trimmed, whatever `n` is.

use super::analysis::{round2, CalculationMethod, Dimension, PriceAnalysis};
use crate::config::ConsensusConfig;
use crate::{Error, Result};
use tracing::{debug, error};

/// Observation count from which the extremes are trimmed
pub const TRIM_FROM: usize = 4;

/// Check that every observation is a finite, non-negative number
pub fn validate_prices(prices: &[f64]) -> Result<()> {
    for (index, price) in prices.iter().enumerate() {
        if !price.is_finite() || *price < 0.0 {
            return Err(Error::Validation(format!(
                "Price at index {} must be a non-negative number, got {}",
                index, price
            )));
        }
    }
    Ok(())
}

/// Compute the analysis, rejecting invalid observations
pub fn try_compute_analysis(
    dimension: Dimension,
    prices: &[f64],
    config: &ConsensusConfig,
) -> Result<PriceAnalysis> {
    validate_prices(prices)?;

    let n = prices.len();
    let (method, used_prices, excluded_prices) = select(prices);
    let final_price = consensus_price(&used_prices);
    let variance_percent = spread_percent(&used_prices);

    // Finite inputs can still overflow in the sum, the cent rounding or the spread
    if !final_price.is_finite() || !variance_percent.is_finite() {
        return Err(Error::Validation(format!(
            "{} prices are out of range: consensus of {} observations is not a finite number",
            dimension, n
        )));
    }

    let warning = if n == 0 {
        Some(format!("Recheck {} price: no observed prices", dimension))
    } else if variance_percent > config.price_variance_threshold {
        Some(format!(
            "Recheck {} price: spread {:.0}% exceeds {}%",
            dimension, variance_percent, config.price_variance_threshold
        ))
    } else {
        excluded_prices
            .iter()
            .find(|p| is_outlier(**p, final_price, config.outlier_multiple))
            .map(|p| format!("Recheck {} price: outlier {} excluded", dimension, p))
    };

    debug!(
        "{} analysis: method={} final={} variance={}%",
        dimension, method, final_price, variance_percent
    );

    Ok(PriceAnalysis {
        original_prices: prices.to_vec(),
        used_prices,
        excluded_prices,
        calculation_method: method,
        final_price,
        variance_percent,
        warning,
    })
}

/// Compute the analysis for production callers
///
/// Invalid observations are a contract violation of the upstream producer:
/// they are logged and the dimension is treated as having no observations,
/// so a corrupt value can never leak into `final_price`.
pub fn compute_analysis(
    dimension: Dimension,
    prices: &[f64],
    config: &ConsensusConfig,
) -> PriceAnalysis {
    match try_compute_analysis(dimension, prices, config) {
        Ok(analysis) => analysis,
        Err(e) => {
            error!("Rejected {} prices {:?}: {}", dimension, prices, e);
            let mut analysis = PriceAnalysis::empty();
            analysis.warning = Some(format!("Recheck {} price: no observed prices", dimension));
            analysis
        }
    }
}

/// Recompute after an operator removed an observation
///
/// Same selection rule as [`compute_analysis`], then tagged
/// `manual_average_<k>_prices` with spread and warning cleared: manual
/// intervention is authoritative.
pub fn manual_retrim(
    dimension: Dimension,
    prices: &[f64],
    config: &ConsensusConfig,
) -> Result<PriceAnalysis> {
    let mut analysis = try_compute_analysis(dimension, prices, config)?;
    analysis.calculation_method = CalculationMethod::ManualAverage(prices.len());
    analysis.variance_percent = 0.0;
    analysis.warning = None;
    Ok(analysis)
}

/// Apply the selection rule: (method, used, excluded)
fn select(prices: &[f64]) -> (CalculationMethod, Vec<f64>, Vec<f64>) {
    let n = prices.len();
    match n {
        0 => (CalculationMethod::NoPrices, Vec::new(), Vec::new()),
        1 => (CalculationMethod::SinglePrice, prices.to_vec(), Vec::new()),
        2 | 3 => (CalculationMethod::Average(n), prices.to_vec(), Vec::new()),
        _ => {
            let (min_idx, max_idx) = extreme_indices(prices);
            let used = prices
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != min_idx && *i != max_idx)
                .map(|(_, p)| *p)
                .collect();
            (
                CalculationMethod::TrimmedAverage(n),
                used,
                vec![prices[min_idx], prices[max_idx]],
            )
        }
    }
}

/// Earliest index of the minimum, then earliest other index of the maximum
fn extreme_indices(prices: &[f64]) -> (usize, usize) {
    let min_idx = (0..prices.len())
        .reduce(|best, i| if prices[i] < prices[best] { i } else { best })
        .unwrap_or(0);
    let max_idx = (0..prices.len())
        .filter(|i| *i != min_idx)
        .reduce(|best, i| if prices[i] > prices[best] { i } else { best })
        .unwrap_or(min_idx);
    (min_idx, max_idx)
}

fn mean(prices: &[f64]) -> f64 {
    prices.iter().sum::<f64>() / prices.len() as f64
}

fn consensus_price(used: &[f64]) -> f64 {
    if used.is_empty() {
        0.0
    } else {
        round2(mean(used))
    }
}

/// Range of the used prices as a whole percentage of their mean
fn spread_percent(used: &[f64]) -> f64 {
    if used.len() < 2 {
        return 0.0;
    }
    let avg = mean(used);
    if avg <= 0.0 {
        return 0.0;
    }
    let max = used.iter().copied().fold(f64::MIN, f64::max);
    let min = used.iter().copied().fold(f64::MAX, f64::min);
    (100.0 * (max - min) / avg).round()
}

fn is_outlier(price: f64, consensus: f64, multiple: f64) -> bool {
    if consensus <= 0.0 {
        return price > 0.0;
    }
    price > consensus * multiple || price * multiple < consensus
}
