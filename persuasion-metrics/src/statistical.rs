use persuasion_core::{CoreError, Result};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF, Normal};
use statrs::statistics::{Data, Median};

/// Largest number of non-zero differences for which the exact signed-rank
/// distribution is enumerated.
pub const WILCOXON_EXACT_LIMIT: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FriedmanResult {
    pub statistic: f64,
    pub p_value: f64,
    pub degrees_of_freedom: f64,
    /// Number of replicates (rows).
    pub n: usize,
    /// Number of treatments (columns).
    pub k: usize,
    /// Divisor applied to the statistic for within-row ties.
    pub tie_correction: f64,
    /// Kendall's coefficient of concordance.
    pub kendalls_w: f64,
    pub mean_ranks: Vec<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WilcoxonMethod {
    Exact,
    NormalApproximation,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WilcoxonResult {
    /// min(W+, W-)
    pub statistic: f64,
    pub p_value: f64,
    pub w_plus: f64,
    pub w_minus: f64,
    pub n_nonzero: usize,
    pub n_zero: usize,
    pub method: WilcoxonMethod,
    pub z: Option<f64>,
    /// Matched-pairs rank-biserial correlation, in [-1, 1].
    pub rank_biserial: f64,
}

pub struct StatisticalAnalyzer;

impl StatisticalAnalyzer {
    /// Friedman test for k related samples, chi-square approximation with tie correction.
    ///
    /// `columns[j][i]` is the value of treatment `j` on replicate `i`.
    pub fn friedman_test(columns: &[&[f64]]) -> Result<FriedmanResult> {
        let k = columns.len();
        if k < 2 {
            return Err(CoreError::InsufficientData(format!(
                "Friedman test needs at least 2 samples, got {}",
                k
            )));
        }

        let n = columns[0].len();
        if columns.iter().any(|c| c.len() != n) {
            return Err(CoreError::Validation(
                "Friedman test samples must have equal length".to_string(),
            ));
        }
        if n < 2 {
            return Err(CoreError::InsufficientData(format!(
                "Friedman test needs at least 2 replicates, got {}",
                n
            )));
        }

        let mut rank_sums = vec![0.0; k];
        let mut ties = 0.0;
        let mut row = vec![0.0; k];

        for i in 0..n {
            for (j, column) in columns.iter().enumerate() {
                row[j] = column[i];
            }
            let ranks = Self::rank_data(&row);
            for (sum, rank) in rank_sums.iter_mut().zip(ranks.iter()) {
                *sum += rank;
            }
            ties += Self::tie_sizes(&row)
                .into_iter()
                .map(|t| {
                    let t = t as f64;
                    t * (t * t - 1.0)
                })
                .sum::<f64>();
        }

        let nf = n as f64;
        let kf = k as f64;
        let tie_correction = 1.0 - ties / (kf * (kf * kf - 1.0) * nf);
        if tie_correction <= f64::EPSILON {
            return Err(CoreError::DegenerateSample(
                "every replicate is fully tied across the samples".to_string(),
            ));
        }

        let ssbn: f64 = rank_sums.iter().map(|r| r * r).sum();
        let raw = 12.0 / (kf * nf * (kf + 1.0)) * ssbn - 3.0 * nf * (kf + 1.0);
        let statistic = (raw / tie_correction).max(0.0);

        let df = kf - 1.0;
        let chi_sq = ChiSquared::new(df).map_err(|e| CoreError::Distribution(e.to_string()))?;
        let p_value = chi_sq.sf(statistic);

        tracing::debug!(k, n, statistic, p_value, "friedman test");

        Ok(FriedmanResult {
            statistic,
            p_value,
            degrees_of_freedom: df,
            n,
            k,
            tie_correction,
            kendalls_w: statistic / (nf * (kf - 1.0)),
            mean_ranks: rank_sums.iter().map(|r| r / nf).collect(),
        })
    }

    /// Two-sided Wilcoxon signed-rank test on paired samples.
    ///
    /// Zero differences are discarded. The exact null distribution is used when no
    /// differences were discarded, the absolute differences have no ties and there are
    /// at most [`WILCOXON_EXACT_LIMIT`] of them; otherwise the normal approximation with
    /// tie-corrected variance (no continuity correction).
    pub fn wilcoxon_signed_rank(x: &[f64], y: &[f64]) -> Result<WilcoxonResult> {
        if x.len() != y.len() {
            return Err(CoreError::Validation(format!(
                "paired samples differ in length ({} vs {})",
                x.len(),
                y.len()
            )));
        }
        if x.is_empty() {
            return Err(CoreError::InsufficientData("paired samples are empty".to_string()));
        }

        let differences: Vec<f64> = x
            .iter()
            .zip(y.iter())
            .map(|(a, b)| a - b)
            .filter(|d| *d != 0.0)
            .collect();
        let n_zero = x.len() - differences.len();

        if differences.is_empty() {
            return Err(CoreError::DegenerateSample(
                "all paired differences are zero".to_string(),
            ));
        }

        let n = differences.len();
        let abs_diffs: Vec<f64> = differences.iter().map(|d| d.abs()).collect();
        let ranks = Self::rank_data(&abs_diffs);

        let mut w_plus = 0.0;
        let mut w_minus = 0.0;
        for (d, r) in differences.iter().zip(ranks.iter()) {
            if *d > 0.0 {
                w_plus += r;
            } else {
                w_minus += r;
            }
        }
        let statistic = w_plus.min(w_minus);
        let tie_sizes = Self::tie_sizes(&abs_diffs);

        let (p_value, method, z) = if n_zero == 0 && tie_sizes.is_empty() && n <= WILCOXON_EXACT_LIMIT {
            let p = 2.0 * Self::signed_rank_cdf(n, statistic);
            (p.min(1.0), WilcoxonMethod::Exact, None)
        } else {
            let nf = n as f64;
            let mean = nf * (nf + 1.0) / 4.0;
            let tie_term: f64 = tie_sizes
                .iter()
                .map(|&t| {
                    let t = t as f64;
                    t * (t * t - 1.0)
                })
                .sum();
            let variance = nf * (nf + 1.0) * (2.0 * nf + 1.0) / 24.0 - tie_term / 48.0;
            if variance <= 0.0 {
                return Err(CoreError::DegenerateSample(
                    "signed-rank variance is zero".to_string(),
                ));
            }
            let z = (statistic - mean) / variance.sqrt();
            let normal = Normal::new(0.0, 1.0).map_err(|e| CoreError::Distribution(e.to_string()))?;
            let p = 2.0 * normal.sf(z.abs());
            (p.min(1.0), WilcoxonMethod::NormalApproximation, Some(z))
        };

        let total = w_plus + w_minus;

        Ok(WilcoxonResult {
            statistic,
            p_value,
            w_plus,
            w_minus,
            n_nonzero: n,
            n_zero,
            method,
            z,
            rank_biserial: (w_plus - w_minus) / total,
        })
    }

    /// Bonferroni adjustment: `min(1, p * m)` with `m` the number of p-values.
    pub fn bonferroni(p_values: &[f64]) -> Vec<f64> {
        let m = p_values.len() as f64;
        p_values.iter().map(|&p| (p * m).min(1.0)).collect()
    }

    /// Median (mean of the two middle values for even counts).
    pub fn median(values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        Some(Data::new(values.to_vec()).median())
    }

    /// Average ranks, 1-based; tied values share the mean of their positions.
    pub fn rank_data(values: &[f64]) -> Vec<f64> {
        let n = values.len();
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

        let mut ranks = vec![0.0; n];
        let mut i = 0;
        while i < n {
            let mut j = i;
            while j < n && values[order[j]] == values[order[i]] {
                j += 1;
            }
            let rank = (i + j + 1) as f64 / 2.0;
            for &idx in &order[i..j] {
                ranks[idx] = rank;
            }
            i = j;
        }
        ranks
    }

    /// Sizes of the groups of equal values that contain more than one element.
    pub fn tie_sizes(values: &[f64]) -> Vec<usize> {
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let mut sizes = Vec::new();
        let mut i = 0;
        while i < sorted.len() {
            let mut j = i;
            while j < sorted.len() && sorted[j] == sorted[i] {
                j += 1;
            }
            if j - i > 1 {
                sizes.push(j - i);
            }
            i = j;
        }
        sizes
    }

    /// P(W <= w) under the null for `n` untied, non-zero differences.
    fn signed_rank_cdf(n: usize, w: f64) -> f64 {
        let max_sum = n * (n + 1) / 2;
        // counts[s] = number of subsets of {1..n} summing to s
        let mut counts = vec![0.0_f64; max_sum + 1];
        counts[0] = 1.0;
        for rank in 1..=n {
            for s in (rank..=max_sum).rev() {
                counts[s] += counts[s - rank];
            }
        }

        let limit = w.floor().max(0.0) as usize;
        let below: f64 = counts.iter().take(limit.min(max_sum) + 1).sum();
        below / 2f64.powi(n as i32)
    }
}
