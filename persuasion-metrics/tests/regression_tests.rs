use approx::assert_relative_eq;
use persuasion_core::CoreError;
use persuasion_metrics::regression::*;
use rstest::{fixture, rstest};

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// y = [1, 3, 2, 5, 4] on x = 1..5: slope 0.8, intercept 0.6, SSR 3.6, R² 0.64.
#[fixture]
fn small() -> (DesignMatrix, Vec<f64>) {
    let x = vec![1.0, 2.0, 3.0, 4.0, 5.0];
    let design = DesignMatrix::with_intercept(&names(&["x"]), &[x]).unwrap();
    (design, vec![1.0, 3.0, 2.0, 5.0, 4.0])
}

// ===== Design Matrix Tests =====

#[test]
fn test_design_with_intercept_puts_constant_first() {
    let design = DesignMatrix::with_intercept(&names(&["a", "b"]), &[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();

    assert_eq!(design.names(), &names(&["const", "a", "b"])[..]);
    assert_eq!(design.column(0), vec![1.0, 1.0]);
    assert!(design.has_constant());
    assert_eq!(design.without_column(0).names(), &names(&["a", "b"])[..]);
}

#[test]
fn test_design_rejects_ragged_columns() {
    let result = DesignMatrix::from_columns(names(&["a", "b"]), &[vec![1.0, 2.0], vec![3.0]]);
    assert!(matches!(result, Err(CoreError::Validation(_))));
}

// ===== OLS Tests =====

#[rstest]
fn test_ols_summary_statistics(small: (DesignMatrix, Vec<f64>)) {
    let (design, y) = small;
    let fit = fit_ols(&design, &y, CovarianceType::NonRobust).unwrap();

    let slope = fit.coefficient("x").unwrap();
    let intercept = fit.coefficient("const").unwrap();
    assert_relative_eq!(slope.estimate, 0.8, epsilon = 1e-10);
    assert_relative_eq!(intercept.estimate, 0.6, epsilon = 1e-10);
    assert_relative_eq!(slope.std_error, (1.2f64 / 10.0).sqrt(), epsilon = 1e-10);
    assert!(slope.ci_lower < slope.estimate && slope.estimate < slope.ci_upper);

    assert_relative_eq!(fit.ssr, 3.6, epsilon = 1e-10);
    assert_relative_eq!(fit.r_squared, 0.64, epsilon = 1e-10);
    assert_relative_eq!(fit.adj_r_squared, 0.52, epsilon = 1e-10);
    assert_relative_eq!(fit.f_statistic.unwrap(), 16.0 / 3.0, epsilon = 1e-10);
    assert_eq!(fit.df_model, 1.0);
    assert_eq!(fit.df_resid, 3.0);
    assert_relative_eq!(fit.aic, -2.0 * fit.log_likelihood + 4.0, epsilon = 1e-12);

    let residual_sum: f64 = fit.residuals.iter().sum();
    assert_relative_eq!(residual_sum, 0.0, epsilon = 1e-10);
}

#[rstest]
fn test_hc3_keeps_estimates_and_changes_errors(small: (DesignMatrix, Vec<f64>)) {
    let (design, y) = small;
    let plain = fit_ols(&design, &y, CovarianceType::NonRobust).unwrap();
    let robust = fit_ols(&design, &y, CovarianceType::HC3).unwrap();

    for (a, b) in plain.coefficients.iter().zip(&robust.coefficients) {
        assert_relative_eq!(a.estimate, b.estimate, epsilon = 1e-12);
    }
    assert_eq!(robust.covariance_type, CovarianceType::HC3);
    // leverages 0.6, 0.3, 0.2, 0.3, 0.6; squared residuals scaled by 1 / (1 - h)^2
    assert_relative_eq!(robust.coefficients[1].std_error, 0.415270, epsilon = 1e-6);
    assert!((plain.coefficients[1].std_error - robust.coefficients[1].std_error).abs() > 1e-6);
    assert_relative_eq!(plain.r_squared, robust.r_squared, epsilon = 1e-12);
}

#[test]
fn test_ols_duplicate_columns_is_singular() {
    let x = vec![1.0, 2.0, 4.0, 3.0, 5.0, 0.0];
    let design = DesignMatrix::with_intercept(&names(&["a", "b"]), &[x.clone(), x]).unwrap();
    let y = vec![0.1, 0.3, 0.2, 0.5, 0.4, 0.2];

    assert!(matches!(
        fit_ols(&design, &y, CovarianceType::NonRobust),
        Err(CoreError::SingularDesign(_))
    ));
}

#[rstest]
#[case(vec![2.0, 2.0, 2.0, 2.0, 2.0])]
#[case(vec![3.0, 5.0, 7.0, 9.0, 11.0])]
fn test_ols_degenerate_response(#[case] y: Vec<f64>) {
    let design = DesignMatrix::with_intercept(&names(&["x"]), &[vec![1.0, 2.0, 3.0, 4.0, 5.0]]).unwrap();

    assert!(matches!(
        fit_ols(&design, &y, CovarianceType::NonRobust),
        Err(CoreError::DegenerateSample(_))
    ));
}

#[test]
fn test_ols_needs_more_rows_than_columns() {
    let design = DesignMatrix::with_intercept(&names(&["x"]), &[vec![1.0, 2.0]]).unwrap();

    assert!(matches!(
        fit_ols(&design, &[1.0, 2.0], CovarianceType::NonRobust),
        Err(CoreError::InsufficientData(_))
    ));
}

// ===== VIF Tests =====

#[test]
fn test_vif_orthogonal_predictors_is_one() {
    let a = vec![1.0, -1.0, 1.0, -1.0];
    let b = vec![1.0, 1.0, -1.0, -1.0];
    let design = DesignMatrix::with_intercept(&names(&["a", "b"]), &[a, b]).unwrap();

    let entries = variance_inflation_factors(&design, 5.0).unwrap();

    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].name, "const");
    for entry in entries {
        assert_relative_eq!(entry.vif, 1.0, epsilon = 1e-10);
        assert!(!entry.flagged);
    }
}

#[test]
fn test_vif_at_least_one_and_flags_collinearity() {
    let a = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
    let b = vec![1.1, 2.0, 2.9, 4.2, 5.0, 5.8, 7.1, 8.0];
    let c = vec![3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0];
    let design = DesignMatrix::with_intercept(&names(&["a", "b", "c"]), &[a, b, c]).unwrap();

    let entries = variance_inflation_factors(&design, 5.0).unwrap();

    assert!(entries.iter().all(|e| e.vif >= 1.0));
    assert!(entries[1].flagged && entries[2].flagged);
    assert!(!entries[3].flagged);
}

#[test]
fn test_vif_duplicate_column_is_infinite() {
    let x = vec![1.0, 2.0, 4.0, 3.0, 5.0];
    let design = DesignMatrix::with_intercept(&names(&["a", "b"]), &[x.clone(), x]).unwrap();

    let entries = variance_inflation_factors(&design, 5.0).unwrap();

    let slopes: Vec<&VifEntry> = entries.iter().filter(|e| e.name != "const").collect();
    assert_eq!(slopes.len(), 2);
    assert!(slopes.iter().all(|e| e.perfectly_collinear && e.vif.is_infinite() && e.flagged));
    let json = serde_json::to_string(slopes[0]).unwrap();
    assert!(json.contains("\"vif\":null"));
}

// ===== Breusch-Pagan Tests =====

#[test]
fn test_breusch_pagan_constant_squared_residuals() {
    let x = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
    let design = DesignMatrix::with_intercept(&names(&["x"]), &[x]).unwrap();
    let residuals = vec![1.0, -1.0, 1.0, -1.0, 1.0, -1.0];

    let result = breusch_pagan(&residuals, &design, 0.05).unwrap();

    assert_eq!(result.lm, 0.0);
    assert_relative_eq!(result.lm_p_value, 1.0, epsilon = 1e-12);
    assert_eq!(result.df, 1);
    assert!(!result.heteroskedastic);
}

#[test]
fn test_breusch_pagan_detects_growing_spread() {
    let x: Vec<f64> = (1..=20).map(f64::from).collect();
    let residuals: Vec<f64> = x
        .iter()
        .enumerate()
        .map(|(i, v)| if i % 2 == 0 { *v } else { -*v })
        .collect();
    let design = DesignMatrix::with_intercept(&names(&["x"]), &[x]).unwrap();

    let result = breusch_pagan(&residuals, &design, 0.05).unwrap();

    // n * R² of e² = x² on x
    assert_relative_eq!(result.lm, 18.870347, epsilon = 1e-6);
    assert_relative_eq!(result.lm_p_value, 1.399e-5, epsilon = 1e-8);
    assert!(result.heteroskedastic);
}

// ===== Diagnostics Tests =====

#[rstest]
fn test_durbin_watson(small: (DesignMatrix, Vec<f64>)) {
    let (design, y) = small;
    let fit = fit_ols(&design, &y, CovarianceType::NonRobust).unwrap();

    assert_relative_eq!(durbin_watson(&fit.residuals), 12.76 / 3.6, epsilon = 1e-10);
    assert_eq!(durbin_watson(&[0.0, 0.0]), 0.0);
}

#[test]
fn test_jarque_bera_symmetric_two_point() {
    let result = jarque_bera(&[-1.0, 1.0, -1.0, 1.0]).unwrap();

    assert_relative_eq!(result.skew, 0.0, epsilon = 1e-12);
    assert_relative_eq!(result.kurtosis, 1.0, epsilon = 1e-12);
    assert_relative_eq!(result.statistic, 4.0 / 6.0, epsilon = 1e-12);
}

#[test]
fn test_condition_number_orthogonal_design() {
    let design = DesignMatrix::from_columns(
        names(&["a", "b"]),
        &[vec![1.0, 0.0, 1.0, 0.0], vec![0.0, 1.0, 0.0, 1.0]],
    )
    .unwrap();

    assert_relative_eq!(condition_number(&design), 1.0, epsilon = 1e-10);
}

#[test]
fn test_lowess_reproduces_a_line() {
    let x: Vec<f64> = (0..12).map(f64::from).collect();
    let y: Vec<f64> = x.iter().map(|v| 2.0 * v + 1.0).collect();

    let smoothed = lowess(&x, &y, 2.0 / 3.0, 3);

    assert_eq!(smoothed.len(), 12);
    for (sx, sy) in smoothed {
        assert_relative_eq!(sy, 2.0 * sx + 1.0, epsilon = 1e-9);
    }
}

#[test]
fn test_qq_points_sorted_and_centered() {
    let points = qq_points(&[3.0, 1.0, 2.0]).unwrap();

    let samples: Vec<f64> = points.iter().map(|p| p.sample).collect();
    assert_eq!(samples, vec![1.0, 2.0, 3.0]);
    assert_relative_eq!(points[1].theoretical, 0.0, epsilon = 1e-9);
    assert_relative_eq!(points[0].theoretical, -points[2].theoretical, epsilon = 1e-9);
}

#[test]
fn test_simple_linear_fit_band_contains_line() {
    let fit = simple_linear_fit(&[1.0, 2.0, 3.0, 4.0, 5.0], &[1.0, 3.0, 2.0, 5.0, 4.0], 10).unwrap();

    assert_relative_eq!(fit.slope, 0.8, epsilon = 1e-12);
    assert_relative_eq!(fit.intercept, 0.6, epsilon = 1e-12);
    assert_relative_eq!(fit.r_squared, 0.64, epsilon = 1e-12);
    assert_eq!(fit.band.len(), 10);
    for (_, fitted, lower, upper) in &fit.band {
        assert!(lower < fitted && fitted < upper);
    }
}

#[test]
fn test_simple_linear_fit_constant_regressor() {
    assert!(matches!(
        simple_linear_fit(&[2.0, 2.0, 2.0], &[1.0, 2.0, 3.0], 5),
        Err(CoreError::DegenerateSample(_))
    ));
}
