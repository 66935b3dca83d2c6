//! `regression` command

use anyhow::{bail, Result};
use clap::Args;
use colored::Colorize;
use comfy_table::Cell;
use persuasion_metrics::regression::{
    BreuschPaganResult, Coefficient, CovarianceType, JarqueBera, OlsFit, VifEntry,
};
use persuasion_workflow::{DiagnosticSeries, RegressionOutcome, RegressionReport};
use serde::Serialize;

use crate::cli::InputArgs;
use crate::context::Context;
use crate::output::{
    format_number, format_p_value, new_table, p_value_cell, print_field, print_list_field, print_section,
    status_badge, TableDisplay,
};

#[derive(Debug, Args)]
pub struct RegressionArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Include the plot series (residuals, QQ points, scatter fits) in json/yaml output
    #[arg(long)]
    pub series: bool,
}

/// Fit statistics without the per-row vectors.
#[derive(Debug, Serialize)]
struct FitSummary<'a> {
    covariance_type: CovarianceType,
    coefficients: &'a [Coefficient],
    nobs: usize,
    df_model: f64,
    df_resid: f64,
    r_squared: f64,
    adj_r_squared: f64,
    f_statistic: Option<f64>,
    f_p_value: Option<f64>,
    log_likelihood: f64,
    aic: f64,
    bic: f64,
    ssr: f64,
}

impl<'a> From<&'a OlsFit> for FitSummary<'a> {
    fn from(fit: &'a OlsFit) -> Self {
        Self {
            covariance_type: fit.covariance_type,
            coefficients: &fit.coefficients,
            nobs: fit.nobs,
            df_model: fit.df_model,
            df_resid: fit.df_resid,
            r_squared: fit.r_squared,
            adj_r_squared: fit.adj_r_squared,
            f_statistic: fit.f_statistic,
            f_p_value: fit.f_p_value,
            log_likelihood: fit.log_likelihood,
            aic: fit.aic,
            bic: fit.bic,
            ssr: fit.ssr,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum RegressionBody<'a> {
    Fitted {
        response: &'a str,
        vif: &'a [VifEntry],
        multicollinear: &'a [String],
        ols: FitSummary<'a>,
        robust: FitSummary<'a>,
        durbin_watson: f64,
        jarque_bera: &'a JarqueBera,
        condition_number: f64,
        breusch_pagan: &'a BreuschPaganResult,
        #[serde(skip_serializing_if = "Option::is_none")]
        diagnostics: Option<&'a DiagnosticSeries>,
    },
    Failed {
        reason: &'a str,
        vif: &'a [VifEntry],
    },
}

#[derive(Debug, Serialize)]
#[serde(transparent)]
struct RegressionDisplay<'a> {
    body: RegressionBody<'a>,
    #[serde(skip)]
    outcome: &'a RegressionOutcome,
    #[serde(skip)]
    alpha: f64,
}

impl<'a> RegressionDisplay<'a> {
    fn new(outcome: &'a RegressionOutcome, alpha: f64, series: bool) -> Self {
        let body = match outcome {
            RegressionOutcome::Fitted(report) => RegressionBody::Fitted {
                response: &report.response,
                vif: &report.vif,
                multicollinear: &report.multicollinear,
                ols: FitSummary::from(&report.ols),
                robust: FitSummary::from(&report.robust),
                durbin_watson: report.durbin_watson,
                jarque_bera: &report.jarque_bera,
                condition_number: report.condition_number,
                breusch_pagan: &report.breusch_pagan,
                diagnostics: series.then_some(&report.diagnostics),
            },
            RegressionOutcome::Failed { reason, vif } => RegressionBody::Failed { reason, vif },
        };
        Self { body, outcome, alpha }
    }
}

impl TableDisplay for RegressionDisplay<'_> {
    fn to_row(&self) -> Vec<Cell> {
        match self.outcome {
            RegressionOutcome::Fitted(report) => vec![
                Cell::new(&report.response),
                Cell::new(report.ols.nobs),
                Cell::new(format!("{:.4}", report.ols.r_squared)),
                Cell::new(report.ols.f_p_value.map_or_else(|| "-".to_string(), format_p_value)),
                Cell::new(status_badge("fitted")),
            ],
            RegressionOutcome::Failed { .. } => vec![
                Cell::new("-"),
                Cell::new("-"),
                Cell::new("-"),
                Cell::new("-"),
                Cell::new(status_badge("failed")),
            ],
        }
    }

    fn display_single(&self) {
        match self.outcome {
            RegressionOutcome::Fitted(report) => display_report(report, self.alpha),
            RegressionOutcome::Failed { reason, vif } => {
                print_section("Regression");
                print_field("Status", &status_badge("failed"));
                print_field("Reason", reason);
                if !vif.is_empty() {
                    println!("{}", vif_table(vif));
                }
            }
        }
    }

    fn display_compact(&self) {
        match self.outcome {
            RegressionOutcome::Fitted(report) => {
                let terms: Vec<String> = report
                    .ols
                    .coefficients
                    .iter()
                    .map(|c| format!("{}={:.4}", c.name, c.estimate))
                    .collect();
                println!(
                    "fitted\tn={}\tr2={:.4}\tbp_p={}\t{}",
                    report.ols.nobs,
                    report.ols.r_squared,
                    format_p_value(report.breusch_pagan.lm_p_value),
                    terms.join("\t")
                );
            }
            RegressionOutcome::Failed { reason, .. } => println!("failed\t{}", reason),
        }
    }
}

fn vif_table(vif: &[VifEntry]) -> comfy_table::Table {
    let mut table = new_table(&["Column", "VIF", "R²"]);
    for entry in vif {
        let value = Cell::new(format_number(entry.vif));
        let value = if entry.flagged {
            value.fg(comfy_table::Color::Red)
        } else {
            value
        };
        table.add_row(vec![
            Cell::new(&entry.name),
            value,
            Cell::new(format!("{:.4}", entry.r_squared)),
        ]);
    }
    table
}

fn display_report(report: &RegressionReport, alpha: f64) {
    let ols = &report.ols;

    print_section(&format!("OLS: {} ~ principles", report.response));
    print_field("Observations", &ols.nobs.to_string());
    print_field(
        "R²",
        &format!("{:.4} (adjusted {:.4})", ols.r_squared, ols.adj_r_squared),
    );
    if let (Some(f), Some(p)) = (ols.f_statistic, ols.f_p_value) {
        print_field("F", &format!("{:.3} on {}/{} df, p = {}", f, ols.df_model, ols.df_resid, format_p_value(p)));
    }
    print_field("AIC / BIC", &format!("{:.2} / {:.2}", ols.aic, ols.bic));

    let mut table = new_table(&["Term", "Coef", "SE", "t", "p", "95% CI", "SE (HC3)", "p (HC3)", "VIF"]);
    for (plain, robust) in ols.coefficients.iter().zip(&report.robust.coefficients) {
        let vif = report
            .vif
            .iter()
            .find(|v| v.name == plain.name)
            .map_or_else(|| "-".to_string(), |v| format_number(v.vif));
        table.add_row(vec![
            Cell::new(&plain.name),
            Cell::new(format!("{:.4}", plain.estimate)),
            Cell::new(format!("{:.4}", plain.std_error)),
            Cell::new(format!("{:.3}", plain.statistic)),
            p_value_cell(plain.p_value, alpha),
            Cell::new(format!("[{:.4}, {:.4}]", plain.ci_lower, plain.ci_upper)),
            Cell::new(format!("{:.4}", robust.std_error)),
            p_value_cell(robust.p_value, alpha),
            Cell::new(vif),
        ]);
    }
    println!("{table}");

    print_section("Diagnostics");
    let bp = &report.breusch_pagan;
    let verdict = if bp.heteroskedastic {
        "heteroskedastic".yellow().to_string()
    } else {
        "homoskedastic".green().to_string()
    };
    print_field(
        "Breusch-Pagan",
        &format!("LM = {:.4}, p = {} ({})", bp.lm, format_p_value(bp.lm_p_value), verdict),
    );
    print_field("Durbin-Watson", &format!("{:.3}", report.durbin_watson));
    print_field(
        "Jarque-Bera",
        &format!(
            "{:.3}, p = {} (skew {:.3}, kurtosis {:.3})",
            report.jarque_bera.statistic,
            format_p_value(report.jarque_bera.p_value),
            report.jarque_bera.skew,
            report.jarque_bera.kurtosis
        ),
    );
    print_field("Condition number", &format!("{:.1}", report.condition_number));
    print_list_field("Multicollinear", &report.multicollinear);
}

pub fn execute(ctx: &Context, args: RegressionArgs) -> Result<()> {
    let (config, pipeline, table) = ctx.prepare(&args.input)?;

    let spinner = ctx.output.spinner("Fitting regression...");
    let outcome = pipeline.run_regression(&table);
    if let Some(s) = spinner {
        s.finish_and_clear();
    }

    ctx.output
        .write(&RegressionDisplay::new(&outcome, config.analysis.alpha, args.series))?;

    if let RegressionOutcome::Failed { reason, .. } = &outcome {
        bail!("Regression failed: {}", reason);
    }
    Ok(())
}
