//! Behavioral specs for trend analysis over stored history.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use harvest::config::TrendConfig;

use crate::prelude::*;

/// Aggregate and store one run per pass rate, a day apart.
fn history(store: &FsStore, dir: &std::path::Path, pass_rates: &[usize]) {
    for (day, rate) in pass_rates.iter().enumerate() {
        let day = day as u32 + 1;
        let report = write(dir, &format!("day{day}.json"), &pytest_pass_rate(*rate));
        let request = AggregateRequest::new([report])
            .with_run_id(format!("nightly-{day}"))
            .with_created_at(at(day, 2));
        Collector::default().aggregate_run(&request, store).unwrap();
    }
}

#[test]
fn rising_pass_rate_is_improving() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsStore::new(dir.path().join("runs"));
    history(&store, dir.path(), &[70, 80, 95]);

    let runs = store.load_runs(&LoadOptions::all()).unwrap();
    let trend = TrendAnalyzer::default()
        .analyze_metric(&runs, Metric::PassRate)
        .unwrap();

    assert_eq!(trend.direction, TrendDirection::Improving);
    assert!(trend.trend_strength > 0.9, "R² = {}", trend.trend_strength);
    assert!((trend.velocity.unwrap() - 12.5).abs() < 1e-9, "one run per day");
}

#[test]
fn sudden_drop_is_an_anomaly() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsStore::new(dir.path().join("runs"));
    history(&store, dir.path(), &[90, 90, 90, 90, 40, 90]);

    let runs = store.load_runs(&LoadOptions::all()).unwrap();
    let trend = TrendAnalyzer::default()
        .analyze_metric(&runs, Metric::PassRate)
        .unwrap();

    let flagged: Vec<(&str, f64)> = trend
        .anomalies
        .iter()
        .map(|a| (a.run_id.as_str(), a.value))
        .collect();
    assert_eq!(flagged, vec![("nightly-5", 40.0)]);
}

#[test]
fn short_history_is_insufficient_data() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsStore::new(dir.path().join("runs"));
    history(&store, dir.path(), &[70, 80]);

    let runs = store.load_runs(&LoadOptions::all()).unwrap();
    let err = TrendAnalyzer::default()
        .analyze_metric(&runs, Metric::PassRate)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::InsufficientData {
            required: 3,
            found: 2,
            ..
        }
    ));
}

#[test]
fn history_window_bounds_analysis() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsStore::new(dir.path().join("runs"));
    history(&store, dir.path(), &[20, 30, 40, 90, 90, 90]);

    let analyzer = TrendAnalyzer::new(TrendConfig {
        window: Some(std::time::Duration::from_secs(3 * 24 * 60 * 60)),
        ..TrendConfig::default()
    });
    // Runs from June 4th onwards are inside the window.
    let report = analyzer.analyze_history(&store, at(7, 0)).unwrap();

    let pass_rate = &report.trends[&Metric::PassRate];
    assert_eq!(pass_rate.points.len(), 3);
    assert_eq!(pass_rate.direction, TrendDirection::Stable);
    assert_eq!(
        report.skipped.iter().map(|s| s.metric).collect::<Vec<_>>(),
        vec![Metric::Coverage]
    );
}

#[test]
fn prediction_stays_a_percentage() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsStore::new(dir.path().join("runs"));
    history(&store, dir.path(), &[70, 80, 95]);

    let runs = store.load_runs(&LoadOptions::all()).unwrap();
    let analyzer = TrendAnalyzer::default();
    let trend = analyzer.analyze_metric(&runs, Metric::PassRate).unwrap();

    assert_eq!(analyzer.predict_next_value(&trend, 10), 100.0);
    assert_eq!(trend.predicted_next, 100.0);
}
