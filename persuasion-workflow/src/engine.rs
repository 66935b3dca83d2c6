use persuasion_core::{
    split_constant_columns, AnalysisConfig, Analyzer, ConstantColumn, CoreError, MethodBlock,
    RatingScale, RatingTable, Result,
};
use persuasion_metrics::aggregators::{Histogram, MetricAggregator};
use persuasion_metrics::regression::{
    breusch_pagan, condition_number, durbin_watson, fit_ols, jarque_bera, lowess, qq_points,
    simple_linear_fit, variance_inflation_factors, BreuschPaganResult, CovarianceType, DesignMatrix,
    JarqueBera, OlsFit, QqPoint, SimpleFit, VifEntry, INTERCEPT_NAME,
};
use persuasion_metrics::statistical::{FriedmanResult, StatisticalAnalyzer, WilcoxonMethod};
use serde::{Deserialize, Serialize};

pub const LOWESS_FRACTION: f64 = 2.0 / 3.0;
pub const LOWESS_ITERATIONS: usize = 3;
pub const HISTOGRAM_BINS: usize = 20;
const DENSITY_POINTS: usize = 200;
const BAND_POINTS: usize = 50;

// ===== Block analysis =====

/// One Wilcoxon comparison after Bonferroni correction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CorrectedResult {
    pub first: usize,
    pub second: usize,
    pub first_name: String,
    pub second_name: String,
    pub statistic: f64,
    pub p_value: f64,
    pub corrected_p_value: f64,
    pub significant: bool,
    pub n_nonzero: usize,
    pub method: WilcoxonMethod,
    pub z: Option<f64>,
    pub rank_biserial: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkippedPair {
    pub first: usize,
    pub second: usize,
    pub first_name: String,
    pub second_name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrincipleMedian {
    pub index: usize,
    pub name: String,
    pub median: f64,
}

/// Direction of a significant pair: the principle with the higher median is `stronger`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignificantDifference {
    pub stronger: PrincipleMedian,
    pub weaker: PrincipleMedian,
    pub corrected_p_value: f64,
    pub statistic: f64,
    pub median_difference: f64,
    /// Equal medians; the lower-indexed principle is reported as `stronger`.
    pub tied_medians: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BlockReport {
    pub block_index: usize,
    pub method: String,
    pub first_row: usize,
    pub last_row: usize,
    pub n_rows: usize,
    pub friedman: FriedmanResult,
    pub constant_columns: Vec<ConstantColumn>,
    pub tested_columns: Vec<usize>,
    pub pairwise: Vec<CorrectedResult>,
    pub skipped_pairs: Vec<SkippedPair>,
    pub significant: Vec<SignificantDifference>,
}

impl BlockReport {
    pub fn friedman_significant(&self, alpha: f64) -> bool {
        self.friedman.p_value < alpha
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BlockOutcome {
    Analyzed(BlockReport),
    Failed {
        block_index: usize,
        method: String,
        reason: String,
        constant_columns: Vec<ConstantColumn>,
    },
}

impl BlockOutcome {
    pub fn method(&self) -> &str {
        match self {
            BlockOutcome::Analyzed(report) => &report.method,
            BlockOutcome::Failed { method, .. } => method,
        }
    }

    pub fn report(&self) -> Option<&BlockReport> {
        match self {
            BlockOutcome::Analyzed(report) => Some(report),
            BlockOutcome::Failed { .. } => None,
        }
    }
}

/// Friedman test per block followed by Bonferroni-corrected pairwise Wilcoxon tests.
#[derive(Debug, Clone)]
pub struct BlockAnalyzer {
    alpha: f64,
    scale: RatingScale,
}

impl Default for BlockAnalyzer {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}

impl BlockAnalyzer {
    pub fn new(alpha: f64, scale: RatingScale) -> Self {
        Self { alpha, scale }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.alpha, config.scale)
    }

    pub fn analyze_block(&self, block: &MethodBlock) -> Result<BlockReport> {
        let (first_row, last_row) = block.sheet_rows;
        tracing::info!(
            block = block.index + 1,
            method = %block.method,
            first_row,
            last_row,
            "analyzing block"
        );

        let (constant_columns, tested) = split_constant_columns(block, &self.scale);
        for column in &constant_columns {
            tracing::warn!(
                method = %block.method,
                principle = %column.name,
                value = column.value,
                hint = column.hint.describe().unwrap_or("-"),
                "constant column excluded from testing"
            );
        }

        if tested.len() < 2 {
            return Err(CoreError::degenerate_block(
                &block.method,
                format!("only {} non-constant principle(s)", tested.len()),
            ));
        }

        let samples: Vec<&[f64]> = tested.iter().map(|&j| block.column(j)).collect();
        let friedman = StatisticalAnalyzer::friedman_test(&samples)
            .map_err(|e| CoreError::degenerate_block(&block.method, e.to_string()))?;

        let mut raw = Vec::new();
        let mut skipped_pairs = Vec::new();

        for (a, &i) in tested.iter().enumerate() {
            for &j in &tested[a + 1..] {
                match StatisticalAnalyzer::wilcoxon_signed_rank(block.column(i), block.column(j)) {
                    Ok(result) => raw.push((i, j, result)),
                    Err(e) => {
                        tracing::warn!(
                            method = %block.method,
                            first = %block.principles[i],
                            second = %block.principles[j],
                            error = %e,
                            "pairwise test skipped"
                        );
                        skipped_pairs.push(SkippedPair {
                            first: i,
                            second: j,
                            first_name: block.principles[i].clone(),
                            second_name: block.principles[j].clone(),
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }

        let p_values: Vec<f64> = raw.iter().map(|(_, _, r)| r.p_value).collect();
        let corrected = StatisticalAnalyzer::bonferroni(&p_values);

        let pairwise: Vec<CorrectedResult> = raw
            .into_iter()
            .zip(corrected)
            .map(|((i, j, result), corrected_p_value)| CorrectedResult {
                first: i,
                second: j,
                first_name: block.principles[i].clone(),
                second_name: block.principles[j].clone(),
                statistic: result.statistic,
                p_value: result.p_value,
                corrected_p_value,
                significant: corrected_p_value < self.alpha,
                n_nonzero: result.n_nonzero,
                method: result.method,
                z: result.z,
                rank_biserial: result.rank_biserial,
            })
            .collect();

        let significant = pairwise
            .iter()
            .filter(|r| r.significant)
            .map(|r| self.direction(block, r))
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            method = %block.method,
            friedman_p = friedman.p_value,
            tests = pairwise.len(),
            significant = significant.len(),
            "block analyzed"
        );

        Ok(BlockReport {
            block_index: block.index,
            method: block.method.clone(),
            first_row,
            last_row,
            n_rows: block.len(),
            friedman,
            constant_columns,
            tested_columns: tested,
            pairwise,
            skipped_pairs,
            significant,
        })
    }

    /// Analyzes every block; a block that cannot be tested becomes [`BlockOutcome::Failed`].
    pub fn analyze_all(&self, blocks: &[MethodBlock]) -> Vec<BlockOutcome> {
        blocks
            .iter()
            .map(|block| match self.analyze(block) {
                Ok(report) => BlockOutcome::Analyzed(report),
                Err(e) => {
                    tracing::warn!(method = %block.method, error = %e, "block not analyzed");
                    let reason = match e {
                        CoreError::DegenerateBlock { reason, .. } => reason,
                        other => other.to_string(),
                    };
                    BlockOutcome::Failed {
                        block_index: block.index,
                        method: block.method.clone(),
                        reason,
                        constant_columns: split_constant_columns(block, &self.scale).0,
                    }
                }
            })
            .collect()
    }

    fn direction(&self, block: &MethodBlock, result: &CorrectedResult) -> Result<SignificantDifference> {
        let median_of = |j: usize| -> Result<PrincipleMedian> {
            let median = StatisticalAnalyzer::median(block.column(j)).ok_or_else(|| {
                CoreError::InsufficientData(format!("block '{}' is empty", block.method))
            })?;
            Ok(PrincipleMedian {
                index: j,
                name: block.principles[j].clone(),
                median,
            })
        };

        let first = median_of(result.first)?;
        let second = median_of(result.second)?;
        let tied_medians = first.median == second.median;

        let (stronger, weaker) = if second.median > first.median {
            (second, first)
        } else {
            (first, second)
        };

        Ok(SignificantDifference {
            median_difference: stronger.median - weaker.median,
            stronger,
            weaker,
            corrected_p_value: result.corrected_p_value,
            statistic: result.statistic,
            tied_medians,
        })
    }
}

impl Analyzer for BlockAnalyzer {
    type Input = MethodBlock;
    type Output = BlockReport;

    fn analyze(&self, input: &MethodBlock) -> Result<BlockReport> {
        self.analyze_block(input)
    }
}

// ===== Regression analysis =====

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrincipleFit {
    pub principle: String,
    /// `(rating, compromise rate)` per row.
    pub points: Vec<(f64, f64)>,
    /// `None` when the principle has no variance.
    pub fit: Option<SimpleFit>,
}

/// Series behind the residual and per-principle plots.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiagnosticSeries {
    /// `(fitted, residual)` per row.
    pub residuals_vs_fitted: Vec<(f64, f64)>,
    pub lowess: Vec<(f64, f64)>,
    pub histogram: Histogram,
    /// Kernel density scaled to histogram counts.
    pub density: Vec<(f64, f64)>,
    pub qq: Vec<QqPoint>,
    pub principle_fits: Vec<PrincipleFit>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegressionReport {
    pub response: String,
    pub vif: Vec<VifEntry>,
    /// Principles whose VIF exceeds the threshold; the intercept is never listed.
    pub multicollinear: Vec<String>,
    pub ols: OlsFit,
    pub durbin_watson: f64,
    pub jarque_bera: JarqueBera,
    pub condition_number: f64,
    pub breusch_pagan: BreuschPaganResult,
    pub robust: OlsFit,
    pub diagnostics: DiagnosticSeries,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RegressionOutcome {
    Fitted(Box<RegressionReport>),
    Failed { reason: String, vif: Vec<VifEntry> },
}

impl RegressionOutcome {
    pub fn report(&self) -> Option<&RegressionReport> {
        match self {
            RegressionOutcome::Fitted(report) => Some(report),
            RegressionOutcome::Failed { .. } => None,
        }
    }
}

/// Linear model of the compromise rate on every principle rating, with diagnostics.
#[derive(Debug, Clone)]
pub struct RegressionAnalyzer {
    alpha: f64,
    vif_threshold: f64,
    response: String,
}

impl Default for RegressionAnalyzer {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}

impl RegressionAnalyzer {
    pub fn new(alpha: f64, vif_threshold: f64) -> Self {
        Self {
            alpha,
            vif_threshold,
            response: persuasion_core::DEFAULT_RATE_COLUMN.to_string(),
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.alpha, config.vif_threshold)
    }

    pub fn with_response_name(mut self, name: impl Into<String>) -> Self {
        self.response = name.into();
        self
    }

    pub fn design(table: &RatingTable) -> Result<DesignMatrix> {
        DesignMatrix::with_intercept(table.principles(), &table.columns())
    }

    pub fn fit_and_diagnose(&self, table: &RatingTable) -> Result<RegressionReport> {
        let y = table.compromise_rates()?;
        let design = Self::design(table)?;
        let vif = variance_inflation_factors(&design, self.vif_threshold)?;
        self.fit_with_vif(table, &design, &y, vif)
    }

    /// Like [`Self::fit_and_diagnose`] but keeps the VIF table when the fit fails.
    pub fn run(&self, table: &RatingTable) -> RegressionOutcome {
        let prepared = table
            .compromise_rates()
            .and_then(|y| Self::design(table).map(|design| (y, design)));

        let (y, design) = match prepared {
            Ok(prepared) => prepared,
            Err(e) => {
                tracing::error!(error = %e, "regression input rejected");
                return RegressionOutcome::Failed {
                    reason: e.to_string(),
                    vif: vec![],
                };
            }
        };

        let vif = match variance_inflation_factors(&design, self.vif_threshold) {
            Ok(vif) => vif,
            Err(e) => {
                tracing::error!(error = %e, "variance inflation factors failed");
                return RegressionOutcome::Failed {
                    reason: e.to_string(),
                    vif: vec![],
                }
            }
        };

        match self.fit_with_vif(table, &design, &y, vif.clone()) {
            Ok(report) => RegressionOutcome::Fitted(Box::new(report)),
            Err(e) => {
                tracing::error!(error = %e, "regression failed");
                RegressionOutcome::Failed {
                    reason: e.to_string(),
                    vif,
                }
            }
        }
    }

    fn fit_with_vif(
        &self,
        table: &RatingTable,
        design: &DesignMatrix,
        y: &[f64],
        vif: Vec<VifEntry>,
    ) -> Result<RegressionReport> {
        let multicollinear: Vec<String> = vif
            .iter()
            .filter(|v| v.flagged && v.name != INTERCEPT_NAME)
            .map(|v| v.name.clone())
            .collect();
        if !multicollinear.is_empty() {
            tracing::warn!(principles = ?multicollinear, threshold = self.vif_threshold, "multicollinearity");
        }

        let ols = fit_ols(design, y, CovarianceType::NonRobust)?;
        tracing::info!(
            nobs = ols.nobs,
            r_squared = ols.r_squared,
            f_p_value = ?ols.f_p_value,
            "ols fitted"
        );

        let breusch_pagan = breusch_pagan(&ols.residuals, design, self.alpha)?;
        if breusch_pagan.heteroskedastic {
            tracing::warn!(p_value = breusch_pagan.lm_p_value, "heteroskedastic residuals");
        }

        let robust = fit_ols(design, y, CovarianceType::HC3)?;
        let diagnostics = self.diagnostic_series(table, &ols, y)?;

        Ok(RegressionReport {
            response: self.response.clone(),
            vif,
            multicollinear,
            durbin_watson: durbin_watson(&ols.residuals),
            jarque_bera: jarque_bera(&ols.residuals)?,
            condition_number: condition_number(design),
            breusch_pagan,
            robust,
            diagnostics,
            ols,
        })
    }

    fn diagnostic_series(&self, table: &RatingTable, ols: &OlsFit, y: &[f64]) -> Result<DiagnosticSeries> {
        let residuals = &ols.residuals;
        let histogram = MetricAggregator::histogram(residuals, HISTOGRAM_BINS);
        let scale = residuals.len() as f64 * histogram.bin_width();
        let density = MetricAggregator::gaussian_kde(residuals, DENSITY_POINTS)
            .into_iter()
            .map(|(x, d)| (x, d * scale))
            .collect();

        let principle_fits = table
            .principles()
            .iter()
            .enumerate()
            .map(|(j, name)| {
                let x = table.column(j);
                let fit = match simple_linear_fit(&x, y, BAND_POINTS) {
                    Ok(fit) => Some(fit),
                    Err(e) => {
                        tracing::debug!(principle = %name, error = %e, "no fitted line");
                        None
                    }
                };
                PrincipleFit {
                    principle: name.clone(),
                    points: x.into_iter().zip(y.iter().copied()).collect(),
                    fit,
                }
            })
            .collect();

        Ok(DiagnosticSeries {
            residuals_vs_fitted: ols.fitted.iter().copied().zip(residuals.iter().copied()).collect(),
            lowess: lowess(&ols.fitted, residuals, LOWESS_FRACTION, LOWESS_ITERATIONS),
            histogram,
            density,
            qq: qq_points(residuals)?,
            principle_fits,
        })
    }
}
