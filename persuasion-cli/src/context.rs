//! CLI execution context

use anyhow::{Context as _, Result};
use persuasion_core::{RatingTable, TableSource};
use persuasion_workflow::{AnalysisPipeline, CsvTableLoader, DataLoadingConfig};

use crate::cli::{Cli, InputArgs};
use crate::config::CliConfig;
use crate::output::{OutputFormat, OutputWriter};

/// Execution context for CLI commands
pub struct Context {
    /// Layered configuration, before per-command flags
    pub config: CliConfig,

    pub output_format: OutputFormat,

    pub output: OutputWriter,
}

impl Context {
    pub fn new(cli: &Cli) -> Result<Self> {
        let config = CliConfig::load(cli.config.as_deref())?;
        let output_format = cli.output;

        Ok(Self {
            config,
            output_format,
            output: OutputWriter::new(output_format, cli.no_color),
        })
    }

    /// Configuration with the command's flags applied on top.
    pub fn effective_config(&self, args: &InputArgs) -> CliConfig {
        let mut config = self.config.clone();
        config.apply_input_args(args);
        config
    }

    /// Read the ratings table named on the command line.
    pub fn load_table(&self, args: &InputArgs, config: &CliConfig) -> Result<RatingTable> {
        let loading = DataLoadingConfig::new(&args.input)
            .with_delimiter(config.input.delimiter)
            .with_schema(config.analysis.schema.clone());

        CsvTableLoader::new(loading)
            .load()
            .with_context(|| format!("Failed to load ratings from {}", args.input.display()))
    }

    /// Validated pipeline plus the table it will run on.
    pub fn prepare(&self, args: &InputArgs) -> Result<(CliConfig, AnalysisPipeline, RatingTable)> {
        let config = self.effective_config(args);
        tracing::debug!(
            block_size = config.analysis.block_size,
            start_row = config.analysis.start_row,
            alpha = config.analysis.alpha,
            vif_threshold = config.analysis.vif_threshold,
            validate_labels = config.analysis.validate_labels,
            "effective analysis settings"
        );
        let pipeline = AnalysisPipeline::new(config.analysis.clone()).context("Invalid analysis settings")?;
        let table = self.load_table(args, &config)?;
        Ok((config, pipeline, table))
    }
}
