#[path = "common/mod.rs"]
mod common;

use bulkrank::genomics::render_report;
use bulkrank::{AnalysisConfig, ScoreType};
use common::assert_snapshot;
use test_helpers::{compared_analysis, fixture_flanks};

#[test]
fn hme_report_matches_golden() {
    let mut analysis = compared_analysis(AnalysisConfig::default());
    analysis.verify_bg_bulk_pileup();

    let actual = render_report(&analysis, ScoreType::Hme, &fixture_flanks(5))
        .expect("report rendering should succeed");
    assert_snapshot("reports/hme.tsv", &actual);
}

#[test]
fn unverified_report_still_lists_background_carrier() {
    let analysis = compared_analysis(AnalysisConfig::default());
    let report = render_report(&analysis, ScoreType::Hme, &fixture_flanks(5)).unwrap();

    let positions: Vec<&str> = report
        .lines()
        .skip(1)
        .map(|line| line.split('\t').nth(3).unwrap())
        .collect();
    assert_eq!(positions, vec!["10", "20", "40"]);
    // (3 + 0.5) / (0 + 0.5)
    assert!(report.lines().nth(1).unwrap().starts_with("7.0000\t"));
}

#[test]
fn bfr_report_is_header_only_without_hemisnps() {
    let analysis = compared_analysis(AnalysisConfig::default());
    let report = render_report(&analysis, ScoreType::Bfr, &fixture_flanks(5)).unwrap();
    assert_eq!(report.lines().count(), 1);
    assert!(report.starts_with("score\tallele_frequency\t"));
}
