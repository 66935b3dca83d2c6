mod common;

use approx::assert_relative_eq;
use common::{block, survey_table};
use persuasion_core::{Analyzer, CoreError, RatingRow, RatingTable, RelevanceHint};
use persuasion_metrics::statistical::WilcoxonMethod;
use persuasion_workflow::engine::*;
use pretty_assertions::assert_eq;

fn varying(n: usize, offset: usize) -> Vec<f64> {
    (0..n).map(|i| ((i * 7 + offset) % 6) as f64).collect()
}

// ===== Block Analysis Tests =====

#[test]
fn test_constant_columns_are_excluded_with_hints() {
    let b = block(
        "Baiting",
        vec![vec![0.0; 30], varying(30, 1), vec![5.0; 30], varying(30, 4), vec![3.0; 30]],
    );

    let report = BlockAnalyzer::default().analyze_block(&b).unwrap();

    let constants: Vec<(usize, RelevanceHint)> =
        report.constant_columns.iter().map(|c| (c.index, c.hint)).collect();
    assert_eq!(
        constants,
        vec![
            (0, RelevanceHint::NotRelevant),
            (2, RelevanceHint::EspeciallyRelevant),
            (4, RelevanceHint::None),
        ]
    );
    assert_eq!(report.tested_columns, vec![1, 3]);
    assert_eq!(report.friedman.k, 2);
    assert_eq!(report.pairwise.len() + report.skipped_pairs.len(), 1);
}

#[test]
fn test_every_column_is_constant_or_tested() {
    let table = survey_table(&["a"], 30);
    let b = &persuasion_workflow::BlockPartitioner::new(30, 0)
        .partition(&table, &table.method_labels())
        .unwrap()[0];

    let report = BlockAnalyzer::default().analyze_block(b).unwrap();

    let mut all: Vec<usize> = report
        .constant_columns
        .iter()
        .map(|c| c.index)
        .chain(report.tested_columns.iter().copied())
        .collect();
    all.sort_unstable();
    assert_eq!(all, (0..6).collect::<Vec<_>>());
}

#[test]
fn test_all_constant_block_is_degenerate() {
    let b = block("Vishing", vec![vec![5.0; 30]; 6]);

    let err = BlockAnalyzer::default().analyze_block(&b).unwrap_err();
    assert!(matches!(err, CoreError::DegenerateBlock { .. }));

    let outcomes = BlockAnalyzer::default().analyze_all(&[b]);
    match &outcomes[0] {
        BlockOutcome::Failed {
            method,
            constant_columns,
            ..
        } => {
            assert_eq!(method, "Vishing");
            assert_eq!(constant_columns.len(), 6);
            assert!(constant_columns
                .iter()
                .all(|c| c.hint == RelevanceHint::EspeciallyRelevant));
        }
        other => panic!("expected failure, got {:?}", other),
    }
}

#[test]
fn test_single_outlier_column_is_tested() {
    let mut outlier = vec![5.0; 29];
    outlier.push(0.0);
    let b = block("Smishing", vec![outlier, varying(30, 2), varying(30, 5)]);

    let report = BlockAnalyzer::default().analyze_block(&b).unwrap();

    assert_eq!(report.tested_columns, vec![0, 1, 2]);
    assert!(report.skipped_pairs.is_empty());
    assert_eq!(report.pairwise.len(), 3);
    assert_eq!((report.pairwise[0].first, report.pairwise[0].second), (0, 1));
    assert_eq!(report.pairwise[0].method, WilcoxonMethod::NormalApproximation);
}

#[test]
fn test_identical_columns_skip_only_their_pair() {
    let b = block("Pretexting", vec![varying(30, 1), varying(30, 1), varying(30, 3)]);

    let report = BlockAnalyzer::default().analyze_block(&b).unwrap();

    assert_eq!(report.skipped_pairs.len(), 1);
    assert_eq!((report.skipped_pairs[0].first, report.skipped_pairs[0].second), (0, 1));
    assert_eq!(report.pairwise.len(), 2);
    // Bonferroni over the two successful tests only
    for r in &report.pairwise {
        assert_relative_eq!(r.corrected_p_value, (r.p_value * 2.0).min(1.0), epsilon = 1e-15);
    }
}

#[test]
fn test_bonferroni_and_significance_are_consistent() {
    let table = survey_table(&["a", "b"], 30);
    let blocks = persuasion_workflow::BlockPartitioner::new(30, 0)
        .partition(&table, &table.method_labels())
        .unwrap();
    let analyzer = BlockAnalyzer::new(0.05, Default::default());

    for outcome in analyzer.analyze_all(&blocks) {
        let report = outcome.report().expect("synthetic blocks are testable");
        let m = report.pairwise.len() as f64;
        for r in &report.pairwise {
            assert!(r.corrected_p_value >= r.p_value);
            assert_relative_eq!(r.corrected_p_value, (r.p_value * m).min(1.0), epsilon = 1e-15);
            assert_eq!(r.significant, r.corrected_p_value < 0.05);
        }
        assert_eq!(
            report.significant.len(),
            report.pairwise.iter().filter(|r| r.significant).count()
        );
    }
}

#[test]
fn test_direction_follows_higher_median() {
    let low: Vec<f64> = (0..30).map(|i| (i % 2) as f64).collect();
    let high: Vec<f64> = (0..30).map(|i| 4.0 + (i % 2) as f64).collect();
    let b = block("Whaling", vec![low, high]);

    let report = BlockAnalyzer::default().analyze_block(&b).unwrap();

    assert_eq!(report.significant.len(), 1);
    let diff = &report.significant[0];
    assert_eq!(diff.stronger.index, 1);
    assert_eq!(diff.weaker.index, 0);
    assert_eq!(diff.median_difference, 4.0);
    assert!(!diff.tied_medians);
}

#[test]
fn test_equal_medians_list_lower_index_first() {
    let mut first = vec![2.0; 10];
    first.extend(vec![3.0; 10]);
    first.extend(vec![5.0; 10]);
    let mut second = vec![1.0; 10];
    second.extend(vec![3.0; 20]);
    let b = block("Quid pro quo", vec![first, second]);

    let report = BlockAnalyzer::default().analyze_block(&b).unwrap();

    assert_eq!(report.significant.len(), 1);
    let diff = &report.significant[0];
    assert!(diff.tied_medians);
    assert_eq!(diff.stronger.index, 0);
    assert_eq!(diff.median_difference, 0.0);
}

#[test]
fn test_single_row_block_fails() {
    let b = block("x", vec![vec![1.0], vec![4.0], vec![2.0]]);

    let result = BlockAnalyzer::default().analyze(&b);
    assert!(matches!(result, Err(CoreError::DegenerateBlock { .. })));
}

#[test]
fn test_analyze_all_matches_single_block_analysis() {
    let table = survey_table(&["a", "b"], 30);
    let blocks = persuasion_workflow::BlockPartitioner::new(30, 0)
        .partition(&table, &table.method_labels())
        .unwrap();
    let analyzer = BlockAnalyzer::default();

    let outcomes = analyzer.analyze_all(&blocks);

    assert_eq!(outcomes.len(), 2);
    for (block, outcome) in blocks.iter().zip(&outcomes) {
        match analyzer.analyze(block) {
            Ok(report) => assert_eq!(outcome, &BlockOutcome::Analyzed(report)),
            Err(_) => assert!(outcome.report().is_none()),
        }
    }
}

// ===== Regression Tests =====

#[test]
fn test_regression_report_on_survey() {
    let table = survey_table(&["a", "b", "c"], 30);

    let report = RegressionAnalyzer::default().fit_and_diagnose(&table).unwrap();

    assert_eq!(report.ols.nobs, 90);
    assert_eq!(report.ols.coefficients.len(), 7);
    assert_eq!(report.ols.coefficients[0].name, "const");
    assert_eq!(report.vif.len(), 7);
    assert!(report.vif.iter().all(|v| v.vif >= 1.0));
    assert!(!report.multicollinear.iter().any(|m| m == "const"));

    for (plain, robust) in report.ols.coefficients.iter().zip(&report.robust.coefficients) {
        assert_relative_eq!(plain.estimate, robust.estimate, epsilon = 1e-10);
    }

    let d = &report.diagnostics;
    assert_eq!(d.residuals_vs_fitted.len(), 90);
    assert_eq!(d.lowess.len(), 90);
    assert_eq!(d.histogram.total_count, 90);
    assert_eq!(d.histogram.bins.len(), HISTOGRAM_BINS);
    assert_eq!(d.qq.len(), 90);
    assert_eq!(d.principle_fits.len(), 6);
    assert!(d.principle_fits.iter().all(|f| f.points.len() == 90 && f.fit.is_some()));
}

#[test]
fn test_duplicate_principles_report_infinite_vif() {
    let rows: Vec<RatingRow> = (0..40)
        .map(|i| {
            let a = ((i * 5) % 6) as f64;
            let b = ((i * 7 + 2) % 6) as f64;
            RatingRow::new(vec![a, a, b]).with_rate(0.1 + 0.01 * ((i * 3) % 7) as f64)
        })
        .collect();
    let names = vec!["Autorität".to_string(), "Autorität (copy)".to_string(), "Knappheit".to_string()];
    let table = RatingTable::new(names, rows).unwrap();

    match RegressionAnalyzer::default().run(&table) {
        RegressionOutcome::Failed { reason, vif } => {
            assert!(reason.contains("Singular"), "{}", reason);
            assert!(vif[1].vif.is_infinite() && vif[1].perfectly_collinear);
            assert!(vif[2].vif.is_infinite() && vif[2].perfectly_collinear);
            assert!(vif[3].vif.is_finite());
        }
        other => panic!("expected failure, got {:?}", other),
    }
}

#[test]
fn test_missing_rate_fails_regression() {
    let table = RatingTable::new(
        vec!["a".to_string(), "b".to_string()],
        vec![
            RatingRow::new(vec![1.0, 2.0]).with_rate(0.1),
            RatingRow::new(vec![2.0, 1.0]),
        ],
    )
    .unwrap();

    match RegressionAnalyzer::default().run(&table) {
        RegressionOutcome::Failed { reason, vif } => {
            assert!(reason.contains("compromise rate"));
            assert!(vif.is_empty());
        }
        other => panic!("expected failure, got {:?}", other),
    }
}

#[test]
fn test_empty_table_fails_regression() {
    let names: Vec<String> = (1..=6).map(|i| format!("P{}", i)).collect();
    let table = RatingTable::new(names, vec![]).unwrap();

    match RegressionAnalyzer::default().run(&table) {
        RegressionOutcome::Failed { reason, vif } => {
            assert!(reason.contains("Insufficient"), "{}", reason);
            assert!(vif.is_empty());
        }
        other => panic!("expected failure, got {:?}", other),
    }
    assert!(matches!(
        RegressionAnalyzer::default().fit_and_diagnose(&table),
        Err(CoreError::InsufficientData(_))
    ));
}

#[test]
fn test_fewer_rows_than_coefficients_fails_regression() {
    let rows = (0..4)
        .map(|i| RatingRow::new(vec![i as f64, (i * 2 % 3) as f64, 1.0, 0.0, 5.0, 2.0]).with_rate(0.1))
        .collect();
    let names: Vec<String> = (1..=6).map(|i| format!("P{}", i)).collect();
    let table = RatingTable::new(names, rows).unwrap();

    let outcome = RegressionAnalyzer::default().run(&table);

    assert!(matches!(outcome, RegressionOutcome::Failed { .. }));
}

#[test]
fn test_regression_serializes_infinite_vif_as_null() {
    let outcome = RegressionOutcome::Failed {
        reason: "singular".to_string(),
        vif: vec![persuasion_metrics::regression::VifEntry {
            name: "a".to_string(),
            vif: f64::INFINITY,
            r_squared: 1.0,
            flagged: true,
            perfectly_collinear: true,
        }],
    };

    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["status"], "failed");
    assert!(json["vif"][0]["vif"].is_null());
    assert_eq!(json["vif"][0]["perfectly_collinear"], true);
}
