use persuasion_core::{AnalysisConfig, CoreError, MedianMatrix, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::PathBuf;

use super::{Task, TaskContext, TaskResult};
use crate::engine::{BlockOutcome, BlockReport, RegressionOutcome, RegressionReport};
use crate::pipeline::{AnalysisOutcome, NonparametricOutcome};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Json,
    Markdown,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Json => "json",
            ReportFormat::Markdown => "md",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportingConfig {
    pub formats: Vec<ReportFormat>,
    pub file_stem: String,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            formats: vec![ReportFormat::Json, ReportFormat::Markdown],
            file_stem: "report".to_string(),
        }
    }
}

pub struct ReportingTask {
    config: ReportingConfig,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    generated_at: chrono::DateTime<chrono::Utc>,
    config: &'a AnalysisConfig,
    analysis: &'a AnalysisOutcome,
}

impl ReportingTask {
    pub fn new(config: ReportingConfig) -> Self {
        Self { config }
    }

    /// Generate JSON report
    pub fn generate_json_report(&self, context: &TaskContext<'_>) -> Result<String> {
        let report = JsonReport {
            generated_at: chrono::Utc::now(),
            config: context.config,
            analysis: context.outcome,
        };

        Ok(serde_json::to_string_pretty(&report)?)
    }

    /// Generate Markdown report
    pub fn generate_markdown_report(&self, context: &TaskContext<'_>) -> String {
        let mut md = String::new();
        let alpha = context.config.alpha;

        md.push_str("# Persuasion Principles Analysis\n\n");
        md.push_str(&format!("**Generated:** {}\n\n", chrono::Utc::now().to_rfc3339()));
        md.push_str(&format!(
            "**Block size:** {} rows, **alpha:** {}, **VIF threshold:** {}\n\n",
            context.config.block_size, alpha, context.config.vif_threshold
        ));

        md.push_str("## Method Blocks\n\n");
        match &context.outcome.nonparametric {
            NonparametricOutcome::Completed { blocks, medians } => {
                for outcome in blocks {
                    write_block(&mut md, outcome, alpha);
                }
                write_medians(&mut md, medians);
            }
            NonparametricOutcome::Failed { reason } => {
                md.push_str(&format!("Block analysis failed: {}\n\n", reason));
            }
        }

        md.push_str("## Regression\n\n");
        match &context.outcome.regression {
            RegressionOutcome::Fitted(report) => write_regression(&mut md, report),
            RegressionOutcome::Failed { reason, vif } => {
                md.push_str(&format!("Regression failed: {}\n\n", reason));
                if !vif.is_empty() {
                    md.push_str("| Column | VIF |\n|---|---|\n");
                    for entry in vif {
                        md.push_str(&format!("| {} | {} |\n", entry.name, format_vif(entry.vif)));
                    }
                    md.push('\n');
                }
            }
        }

        md
    }

    fn save_report(&self, format: ReportFormat, content: &str, context: &TaskContext<'_>) -> Result<PathBuf> {
        let file_path = context
            .output_dir
            .join(format!("{}.{}", self.config.file_stem, format.extension()));

        std::fs::write(&file_path, content)
            .map_err(|e| CoreError::Io(format!("{}: {}", file_path.display(), e)))?;

        tracing::info!(format = ?format, path = %file_path.display(), bytes = content.len(), "report written");
        Ok(file_path)
    }
}

impl Task for ReportingTask {
    fn execute(&self, context: &TaskContext<'_>) -> Result<TaskResult> {
        std::fs::create_dir_all(context.output_dir)?;

        let mut files = Vec::new();
        for &format in &self.config.formats {
            let content = match format {
                ReportFormat::Json => self.generate_json_report(context)?,
                ReportFormat::Markdown => self.generate_markdown_report(context),
            };
            files.push(self.save_report(format, &content, context)?);
        }

        let output = json!({
            "formats": self.config.formats,
            "reports": files,
        });

        Ok(TaskResult::success(output).with_files(files))
    }

    fn name(&self) -> &str {
        "reporting"
    }
}

fn format_vif(vif: f64) -> String {
    if vif.is_finite() {
        format!("{:.2}", vif)
    } else {
        "inf".to_string()
    }
}

fn write_block(md: &mut String, outcome: &BlockOutcome, alpha: f64) {
    match outcome {
        BlockOutcome::Analyzed(report) => write_block_report(md, report, alpha),
        BlockOutcome::Failed {
            block_index,
            method,
            reason,
            constant_columns,
        } => {
            md.push_str(&format!("### Block {}: {}\n\n", block_index + 1, method));
            md.push_str(&format!("Not tested: {}\n\n", reason));
            for column in constant_columns {
                md.push_str(&format!(
                    "- {} is constant at {}{}\n",
                    column.name,
                    column.value,
                    column.hint.describe().map(|h| format!(" ({})", h)).unwrap_or_default()
                ));
            }
            md.push('\n');
        }
    }
}

fn write_block_report(md: &mut String, report: &BlockReport, alpha: f64) {
    md.push_str(&format!(
        "### Block {}: {} (rows {}-{})\n\n",
        report.block_index + 1,
        report.method,
        report.first_row,
        report.last_row
    ));

    for column in &report.constant_columns {
        md.push_str(&format!(
            "- {} is constant at {}{}\n",
            column.name,
            column.value,
            column.hint.describe().map(|h| format!(" ({})", h)).unwrap_or_default()
        ));
    }

    md.push_str(&format!(
        "\nFriedman: chi2 = {:.4}, df = {}, p = {:.4}{}\n\n",
        report.friedman.statistic,
        report.friedman.degrees_of_freedom,
        report.friedman.p_value,
        if report.friedman_significant(alpha) {
            " (significant)"
        } else {
            ""
        }
    ));

    if !report.pairwise.is_empty() {
        md.push_str("| Pair | W | p | p (Bonferroni) | Significant |\n|---|---|---|---|---|\n");
        for r in &report.pairwise {
            md.push_str(&format!(
                "| {} vs {} | {} | {:.4} | {:.4} | {} |\n",
                r.first_name,
                r.second_name,
                r.statistic,
                r.p_value,
                r.corrected_p_value,
                if r.significant { "yes" } else { "no" }
            ));
        }
        md.push('\n');
    }

    for skipped in &report.skipped_pairs {
        md.push_str(&format!(
            "- skipped {} vs {}: {}\n",
            skipped.first_name, skipped.second_name, skipped.reason
        ));
    }

    for diff in &report.significant {
        md.push_str(&format!(
            "- {} (median {}) > {} (median {}), p = {:.4}{}\n",
            diff.stronger.name,
            diff.stronger.median,
            diff.weaker.name,
            diff.weaker.median,
            diff.corrected_p_value,
            if diff.tied_medians { ", equal medians" } else { "" }
        ));
    }
    md.push('\n');
}

fn write_medians(md: &mut String, medians: &MedianMatrix) {
    md.push_str("### Median relevance per method\n\n| Method |");
    for principle in medians.principles() {
        md.push_str(&format!(" {} |", principle));
    }
    md.push_str("\n|---|");
    md.push_str(&"---|".repeat(medians.principles().len()));
    md.push('\n');

    for (method, row) in medians.methods().iter().zip(medians.rows()) {
        md.push_str(&format!("| {} |", method));
        for value in row {
            md.push_str(&format!(" {:.2} |", value));
        }
        md.push('\n');
    }
    md.push('\n');
}

fn write_regression(md: &mut String, report: &RegressionReport) {
    let ols = &report.ols;
    md.push_str(&format!(
        "Response: {}, n = {}, R² = {:.4}, adj. R² = {:.4}, F p = {}\n\n",
        report.response,
        ols.nobs,
        ols.r_squared,
        ols.adj_r_squared,
        ols.f_p_value.map_or_else(|| "-".to_string(), |p| format!("{:.4}", p))
    ));

    md.push_str("| Term | Coef | SE | t | p | SE (HC3) | p (HC3) | VIF |\n");
    md.push_str("|---|---|---|---|---|---|---|---|\n");
    for (plain, robust) in ols.coefficients.iter().zip(&report.robust.coefficients) {
        let vif = report
            .vif
            .iter()
            .find(|v| v.name == plain.name)
            .map_or_else(|| "-".to_string(), |v| format_vif(v.vif));
        md.push_str(&format!(
            "| {} | {:.4} | {:.4} | {:.3} | {:.4} | {:.4} | {:.4} | {} |\n",
            plain.name,
            plain.estimate,
            plain.std_error,
            plain.statistic,
            plain.p_value,
            robust.std_error,
            robust.p_value,
            vif
        ));
    }

    let bp = &report.breusch_pagan;
    md.push_str(&format!(
        "\nBreusch-Pagan: LM = {:.4}, p = {:.4}{}\n",
        bp.lm,
        bp.lm_p_value,
        if bp.heteroskedastic {
            " (heteroskedastic)"
        } else {
            ""
        }
    ));
    md.push_str(&format!(
        "Durbin-Watson: {:.3}, Jarque-Bera: {:.3} (p = {:.4}), condition number: {:.1}\n",
        report.durbin_watson,
        report.jarque_bera.statistic,
        report.jarque_bera.p_value,
        report.condition_number
    ));
    if !report.multicollinear.is_empty() {
        md.push_str(&format!("Multicollinearity: {}\n", report.multicollinear.join(", ")));
    }
    md.push('\n');
}
