//! Integration tests for the price consensus engine
//!
//! Covers the selection rule across observation counts, rounding, idempotence,
//! warning suppression, and the operator edit scenarios end to end.

use smeta_common::consensus::{
    approve, compute_analysis, edit_item, item_shows_warning, remove_price, round2,
    should_show_warning, CalculationMethod, ConsensusItem, Dimension, ItemEdit, NewItem,
};
use smeta_common::{ConsensusConfig, Error};

fn config() -> ConsensusConfig {
    ConsensusConfig::default()
}

fn item_with_material(prices: Vec<f64>) -> ConsensusItem {
    ConsensusItem::from_observations(
        NewItem {
            name: "Fan VKR-5".to_string(),
            unit: "pcs".to_string(),
            material_prices: prices,
            work_prices: vec![1500.0],
            cluster_size: Some(4),
            source_files: vec!["estimate-a.xlsx".to_string(), "estimate-b.xlsx".to_string()],
        },
        &config(),
    )
    .unwrap()
}

// =============================================================================
// Selection rule
// =============================================================================

#[test]
fn test_up_to_three_prices_are_all_used() {
    let cases: [&[f64]; 4] = [&[], &[12.0], &[12.0, 14.0], &[12.0, 14.0, 13.0]];

    for prices in cases {
        let analysis = compute_analysis(Dimension::Material, prices, &config());
        assert_eq!(analysis.used_prices, prices.to_vec());
        assert!(analysis.excluded_prices.is_empty());
    }
}

#[test]
fn test_four_or_more_prices_drop_exactly_two() {
    for n in 4..=9 {
        let prices: Vec<f64> = (0..n).map(|i| 100.0 + ((i * 37) % 11) as f64).collect();
        let analysis = compute_analysis(Dimension::Work, &prices, &config());

        let min = prices.iter().copied().fold(f64::MAX, f64::min);
        let max = prices.iter().copied().fold(f64::MIN, f64::max);

        assert_eq!(analysis.used_prices.len(), n - 2, "n = {}", n);
        assert_eq!(analysis.excluded_prices, vec![min, max], "n = {}", n);
        assert_eq!(
            analysis.calculation_method,
            CalculationMethod::TrimmedAverage(n)
        );
    }
}

#[test]
fn test_final_price_is_rounded_mean_of_used() {
    let inputs: [&[f64]; 4] = [
        &[10.0, 10.01, 10.02],
        &[1.0, 2.0],
        &[0.333, 0.333, 0.334, 5.0, 0.1],
        &[99.99, 100.005, 100.0, 101.0, 98.0, 100.3],
    ];

    for prices in inputs {
        let analysis = compute_analysis(Dimension::Material, prices, &config());
        let mean = analysis.used_prices.iter().sum::<f64>() / analysis.used_prices.len() as f64;
        assert_eq!(analysis.final_price, round2(mean));
    }
}

#[test]
fn test_compute_is_idempotent() {
    let prices = [480.0, 510.0, 495.0, 900.0, 120.0];
    let first = compute_analysis(Dimension::Material, &prices, &config());
    let second = compute_analysis(Dimension::Material, &first.original_prices, &config());
    assert_eq!(first, second);
}

#[test]
fn test_variance_threshold_is_configurable() {
    let strict = ConsensusConfig {
        price_variance_threshold: 5.0,
        ..ConsensusConfig::default()
    };
    let prices = [100.0, 110.0];

    assert!(compute_analysis(Dimension::Work, &prices, &config()).warning.is_none());
    assert!(compute_analysis(Dimension::Work, &prices, &strict).warning.is_some());
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn test_scenario_a_single_price() {
    let analysis = compute_analysis(Dimension::Material, &[100.0], &config());
    assert_eq!(analysis.final_price, 100.0);
    assert_eq!(analysis.calculation_method, CalculationMethod::SinglePrice);
    assert_eq!(analysis.variance_percent, 0.0);
    assert!(analysis.warning.is_none());
}

#[test]
fn test_scenario_b_trimmed_four() {
    let analysis = compute_analysis(Dimension::Material, &[100.0, 200.0, 300.0, 1000.0], &config());
    assert_eq!(analysis.excluded_prices, vec![100.0, 1000.0]);
    assert_eq!(analysis.used_prices, vec![200.0, 300.0]);
    assert_eq!(analysis.final_price, 250.0);
    assert_eq!(analysis.calculation_method.to_string(), "trimmed_average_4_prices");
}

#[test]
fn test_scenario_c_no_prices() {
    let analysis = compute_analysis(Dimension::Work, &[], &config());
    assert_eq!(analysis.final_price, 0.0);
    assert_eq!(analysis.calculation_method, CalculationMethod::NoPrices);
    assert!(analysis.used_prices.is_empty());
    assert!(analysis.warning.is_some());
}

#[test]
fn test_scenario_d_remove_price_after_trim() {
    let mut item = item_with_material(vec![100.0, 200.0, 300.0, 1000.0]);
    assert_eq!(item.material_price, 250.0);

    remove_price(&mut item, Dimension::Material, 0, &config()).unwrap();

    let analysis = &item.price_analysis.material;
    assert_eq!(analysis.original_prices, vec![200.0, 300.0, 1000.0]);
    assert_eq!(analysis.calculation_method.to_string(), "manual_average_3_prices");
    assert_eq!(analysis.final_price, 500.0);
    assert_eq!(analysis.variance_percent, 0.0);
    assert!(analysis.warning.is_none());
    assert!(analysis.excluded_prices.is_empty());
    assert_eq!(item.material_price, 500.0);
}

#[test]
fn test_scenario_e_both_prices_zero_rejected() {
    let mut item = item_with_material(vec![100.0, 200.0]);
    let before = item.clone();

    let err = edit_item(
        &mut item,
        &ItemEdit {
            name: before.name.clone(),
            unit: before.unit.clone(),
            material_price: 0.0,
            work_price: 0.0,
            material_price_approved: false,
            work_price_approved: false,
        },
    )
    .unwrap_err();

    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(item, before);
}

// =============================================================================
// Re-trim is not reversible, approval suppresses display only
// =============================================================================

#[test]
fn test_remove_then_readd_may_differ() {
    let original = compute_analysis(Dimension::Material, &[100.0, 200.0, 300.0, 1000.0], &config());

    let mut item = item_with_material(original.original_prices.clone());
    remove_price(&mut item, Dimension::Material, 0, &config()).unwrap();

    let mut readded = item.price_analysis.material.original_prices.clone();
    readded.push(100.0);
    let recomputed = compute_analysis(Dimension::Material, &readded, &config());

    assert_eq!(recomputed.used_prices, original.used_prices);
    assert_ne!(recomputed.original_prices, original.original_prices);
}

#[test]
fn test_approved_never_shows_warning() {
    let mut item = item_with_material(vec![10.0, 100.0]);
    let analysis = item.price_analysis.material.clone();
    assert!(analysis.warning.is_some());

    assert!(should_show_warning(Some(&analysis), false));
    assert!(!should_show_warning(Some(&analysis), true));

    approve(&mut item, Dimension::Material, true);
    assert!(!item_shows_warning(&item, Dimension::Material));
    assert_eq!(item.price_analysis.material, analysis);
}

#[test]
fn test_analysis_serializes_dashboard_shape() {
    let analysis = compute_analysis(Dimension::Material, &[100.0, 200.0, 300.0, 1000.0], &config());
    let json = serde_json::to_value(&analysis).unwrap();

    for key in [
        "original_prices",
        "used_prices",
        "excluded_prices",
        "calculation_method",
        "final_price",
        "variance_percent",
        "warning",
    ] {
        assert!(json.get(key).is_some(), "missing key {}", key);
    }
    assert_eq!(json["calculation_method"], "trimmed_average_4_prices");
}
