//! `analyze` command

use anyhow::{Context as _, Result};
use clap::Args;
use comfy_table::Cell;
use persuasion_workflow::{
    AnalysisOutcome, AnalysisPipeline, NonparametricOutcome, RegressionOutcome, ReportingConfig, ReportingTask,
    Task, TaskContext, TaskExecutor, TaskResult,
};
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::{InputArgs, OutputArgs};
use crate::context::Context;
use crate::output::{print_field, print_list_field, print_section, status_badge, TableDisplay};

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub output: OutputArgs,

    /// Write the reports only, no plots
    #[arg(long)]
    pub no_plots: bool,
}

#[derive(Debug, Serialize)]
struct TaskSummary {
    task: String,
    success: bool,
    files: Vec<PathBuf>,
    error: Option<String>,
}

/// What `analyze` did, printed after the files are written.
#[derive(Debug, Serialize)]
struct AnalysisSummary {
    rows: usize,
    methods: Vec<String>,
    blocks_analyzed: usize,
    blocks_failed: usize,
    significant_differences: usize,
    block_error: Option<String>,
    regression: &'static str,
    regression_error: Option<String>,
    output_dir: PathBuf,
    tasks: Vec<TaskSummary>,
}

impl AnalysisSummary {
    fn new(rows: usize, outcome: &AnalysisOutcome, output_dir: PathBuf, tasks: Vec<TaskSummary>) -> Self {
        let blocks = outcome.blocks();
        let analyzed = blocks.iter().filter_map(|b| b.report());
        let (regression, regression_error) = match &outcome.regression {
            RegressionOutcome::Fitted(_) => ("fitted", None),
            RegressionOutcome::Failed { reason, .. } => ("failed", Some(reason.clone())),
        };

        Self {
            rows,
            methods: outcome.methods.clone(),
            blocks_analyzed: analyzed.clone().count(),
            blocks_failed: blocks.iter().filter(|b| b.report().is_none()).count(),
            significant_differences: analyzed.map(|r| r.significant.len()).sum(),
            block_error: match &outcome.nonparametric {
                NonparametricOutcome::Failed { reason } => Some(reason.clone()),
                NonparametricOutcome::Completed { .. } => None,
            },
            regression,
            regression_error,
            output_dir,
            tasks,
        }
    }
}

impl TableDisplay for AnalysisSummary {
    fn to_row(&self) -> Vec<Cell> {
        vec![
            Cell::new(self.rows),
            Cell::new(self.methods.len()),
            Cell::new(self.blocks_analyzed),
            Cell::new(self.blocks_failed),
            Cell::new(status_badge(self.regression)),
        ]
    }

    fn display_single(&self) {
        print_section("Analysis");
        print_field("Rows", &self.rows.to_string());
        print_list_field("Methods", &self.methods);
        match &self.block_error {
            Some(reason) => print_field("Blocks", &format!("{} ({})", status_badge("failed"), reason)),
            None => print_field(
                "Blocks",
                &format!(
                    "{} analyzed, {} failed, {} significant differences",
                    self.blocks_analyzed, self.blocks_failed, self.significant_differences
                ),
            ),
        }
        match &self.regression_error {
            Some(reason) => print_field("Regression", &format!("{} ({})", status_badge("failed"), reason)),
            None => print_field("Regression", &status_badge(self.regression)),
        }

        print_section("Output");
        print_field("Directory", &self.output_dir.display().to_string());
        for task in &self.tasks {
            let status = if task.success { "completed" } else { "failed" };
            let detail = match &task.error {
                Some(error) => error.clone(),
                None => format!("{} file(s)", task.files.len()),
            };
            print_field(&task.task, &format!("{} ({})", status_badge(status), detail));
        }
    }

    fn display_compact(&self) {
        println!(
            "rows={}\tblocks={}/{}\tregression={}\tdir={}",
            self.rows,
            self.blocks_analyzed,
            self.blocks_analyzed + self.blocks_failed,
            self.regression,
            self.output_dir.display()
        );
    }
}

pub fn execute(ctx: &Context, args: AnalyzeArgs) -> Result<()> {
    let (config, pipeline, table) = ctx.prepare(&args.input)?;
    let output_dir = args.output.output_dir.unwrap_or(config.output.dir);
    let image_format = args
        .output
        .image_format
        .map_or(config.output.image_format, Into::into);

    let spinner = ctx.output.spinner("Running analysis...");
    let outcome = pipeline.run(&table);
    if let Some(s) = spinner {
        s.finish_and_clear();
    }

    tracing::info!(dir = %output_dir.display(), plots = !args.no_plots, "writing output");
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;

    let tasks: Vec<Box<dyn Task>> = if args.no_plots {
        vec![Box::new(ReportingTask::new(ReportingConfig::default()))]
    } else {
        AnalysisPipeline::output_tasks()
    };

    let progress = ctx.output.progress_bar(tasks.len() as u64, "Writing output");
    let mut executor = TaskExecutor::new();
    if let Some(pb) = progress.clone() {
        executor = executor.with_progress(move |p| {
            pb.set_message(p.task_name.clone());
            if p.status != "starting" {
                pb.inc(1);
            }
        });
    }

    let task_context = TaskContext::new(&outcome, pipeline.config(), &output_dir).with_image_format(image_format);
    let results: Vec<TaskResult> = executor.execute_batch(&tasks, &task_context);
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    let summaries: Vec<TaskSummary> = tasks
        .iter()
        .zip(results)
        .map(|(task, result)| TaskSummary {
            task: task.name().to_string(),
            success: result.success,
            files: result.files,
            error: result.error,
        })
        .collect();

    let failed: Vec<&str> = summaries
        .iter()
        .filter(|s| !s.success)
        .map(|s| s.task.as_str())
        .collect();
    let failed_message = (!failed.is_empty()).then(|| format!("Output tasks failed: {}", failed.join(", ")));

    let summary = AnalysisSummary::new(table.len(), &outcome, output_dir, summaries);
    ctx.output.write(&summary)?;

    match failed_message {
        Some(message) => ctx.output.warning(&message),
        None => ctx.output.success("Analysis complete"),
    }

    Ok(())
}
