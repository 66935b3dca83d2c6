//! `blocks` command

use anyhow::{Context as _, Result};
use clap::Args;
use colored::Colorize;
use comfy_table::Cell;
use persuasion_workflow::{BlockOutcome, BlockReport};
use serde::Serialize;

use crate::cli::InputArgs;
use crate::context::Context;
use crate::output::{
    format_p_value, new_table, p_value_cell, print_field, print_section, status_badge, OutputFormat,
    TableDisplay,
};

#[derive(Debug, Args)]
pub struct BlocksArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Print every pairwise comparison, not only the significant ones
    #[arg(long)]
    pub pairs: bool,
}

/// A block outcome as printed; serializes as the outcome itself.
#[derive(Debug, Serialize)]
#[serde(transparent)]
struct BlockDisplay<'a> {
    outcome: &'a BlockOutcome,
    #[serde(skip)]
    alpha: f64,
    #[serde(skip)]
    pairs: bool,
}

impl BlockDisplay<'_> {
    fn status(&self) -> &'static str {
        match self.outcome {
            BlockOutcome::Analyzed(_) => "analyzed",
            BlockOutcome::Failed { .. } => "failed",
        }
    }

    fn report(&self) -> Option<&BlockReport> {
        self.outcome.report()
    }
}

impl TableDisplay for BlockDisplay<'_> {
    fn to_row(&self) -> Vec<Cell> {
        match self.outcome {
            BlockOutcome::Analyzed(report) => vec![
                Cell::new(report.block_index + 1),
                Cell::new(&report.method),
                Cell::new(format!("{}-{}", report.first_row, report.last_row)),
                Cell::new(report.constant_columns.len()),
                Cell::new(format!("{:.3}", report.friedman.statistic)),
                p_value_cell(report.friedman.p_value, self.alpha),
                Cell::new(report.pairwise.len()),
                Cell::new(report.significant.len()),
                Cell::new(status_badge(self.status())),
            ],
            BlockOutcome::Failed {
                block_index,
                method,
                constant_columns,
                ..
            } => vec![
                Cell::new(block_index + 1),
                Cell::new(method),
                Cell::new("-"),
                Cell::new(constant_columns.len()),
                Cell::new("-"),
                Cell::new("-"),
                Cell::new("-"),
                Cell::new("-"),
                Cell::new(status_badge(self.status())),
            ],
        }
    }

    fn display_single(&self) {
        match self.outcome {
            BlockOutcome::Analyzed(report) => display_report(report, self.alpha, self.pairs),
            BlockOutcome::Failed {
                block_index,
                method,
                reason,
                constant_columns,
            } => {
                print_section(&format!("Block {}: {}", block_index + 1, method));
                print_field("Status", &status_badge("failed"));
                print_field("Reason", reason);
                for column in constant_columns {
                    print_constant(&column.name, column.value, column.hint.describe());
                }
            }
        }
    }

    fn display_compact(&self) {
        match self.outcome {
            BlockOutcome::Analyzed(report) => println!(
                "{}\t{}\tanalyzed\tchi2={:.3}\tp={}\tsignificant={}",
                report.block_index + 1,
                report.method,
                report.friedman.statistic,
                format_p_value(report.friedman.p_value),
                report.significant.len()
            ),
            BlockOutcome::Failed {
                block_index,
                method,
                reason,
                ..
            } => println!("{}\t{}\tfailed\t{}", block_index + 1, method, reason),
        }
    }
}

fn print_constant(name: &str, value: f64, hint: Option<&str>) {
    match hint {
        Some(hint) => print_field(name, &format!("constant at {} ({})", value, hint.yellow())),
        None => print_field(name, &format!("constant at {}", value)),
    }
}

fn display_report(report: &BlockReport, alpha: f64, pairs: bool) {
    print_section(&format!(
        "Block {}: {} (rows {}-{})",
        report.block_index + 1,
        report.method,
        report.first_row,
        report.last_row
    ));
    print_field(
        "Friedman",
        &format!(
            "chi2 = {:.4}, df = {}, p = {}, Kendall's W = {:.3}",
            report.friedman.statistic,
            report.friedman.degrees_of_freedom,
            format_p_value(report.friedman.p_value),
            report.friedman.kendalls_w
        ),
    );
    for column in &report.constant_columns {
        print_constant(&column.name, column.value, column.hint.describe());
    }
    for skipped in &report.skipped_pairs {
        print_field(
            "Skipped",
            &format!("{} vs {}: {}", skipped.first_name, skipped.second_name, skipped.reason),
        );
    }

    if pairs && !report.pairwise.is_empty() {
        let mut table = new_table(&["Pair", "W", "p", "p (Bonferroni)", "Method"]);
        for r in &report.pairwise {
            table.add_row(vec![
                Cell::new(format!("{} vs {}", r.first_name, r.second_name)),
                Cell::new(r.statistic),
                Cell::new(format_p_value(r.p_value)),
                p_value_cell(r.corrected_p_value, alpha),
                Cell::new(format!("{:?}", r.method).to_lowercase()),
            ]);
        }
        println!("{table}");
    }

    if report.significant.is_empty() {
        print_field("Significant", "none");
    }
    for diff in &report.significant {
        let tie = if diff.tied_medians { " (equal medians)" } else { "" };
        println!(
            "  {} {} > {} (medians {} / {}, p = {}){}",
            "•".green(),
            diff.stronger.name.bold(),
            diff.weaker.name,
            diff.stronger.median,
            diff.weaker.median,
            format_p_value(diff.corrected_p_value),
            tie
        );
    }
}

pub fn execute(ctx: &Context, args: BlocksArgs) -> Result<()> {
    let (config, pipeline, table) = ctx.prepare(&args.input)?;

    let spinner = ctx.output.spinner("Testing method blocks...");
    let result = pipeline.run_blocks(&table);
    if let Some(s) = spinner {
        s.finish_and_clear();
    }
    let (outcomes, _) = result.context("Block analysis failed")?;

    let alpha = config.analysis.alpha;
    let displays: Vec<BlockDisplay<'_>> = outcomes
        .iter()
        .map(|outcome| BlockDisplay {
            outcome,
            alpha,
            pairs: args.pairs,
        })
        .collect();

    ctx.output.write_list(
        &displays,
        &["#", "Method", "Rows", "Constant", "Chi²", "p", "Pairs", "Significant", "Status"],
    )?;

    if ctx.output_format == OutputFormat::Table {
        for display in &displays {
            display.display_single();
        }
    }

    let failed = displays.iter().filter(|d| d.report().is_none()).count();
    if failed > 0 {
        ctx.output.warning(&format!("{} of {} blocks could not be tested", failed, displays.len()));
    }

    Ok(())
}
