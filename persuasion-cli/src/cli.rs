//! Command-line arguments

use clap::{Args, Parser, Subcommand, ValueEnum};
use persuasion_workflow::ImageFormat;
use std::path::PathBuf;

use crate::commands::{analyze::AnalyzeArgs, blocks::BlocksArgs, medians::MediansArgs, regression::RegressionArgs};
use crate::output::OutputFormat;

/// Statistical analysis of persuasion-principle ratings per phishing method
#[derive(Debug, Parser)]
#[command(name = "persuasion", version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON); replaces config/default and config/local
    #[arg(short, long, global = true, env = "PERSUASION_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    pub output: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log line format on stderr
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the full analysis and write plots and reports
    Analyze(AnalyzeArgs),

    /// Friedman and pairwise Wilcoxon results per method block
    Blocks(BlocksArgs),

    /// Median rating of every principle per method
    Medians(MediansArgs),

    /// Regression of the compromise rate on the principle ratings
    Regression(RegressionArgs),
}

#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Input file and analysis overrides shared by every subcommand.
#[derive(Debug, Clone, Args)]
pub struct InputArgs {
    /// Ratings table exported as CSV
    pub input: PathBuf,

    /// Field delimiter of the CSV file
    #[arg(long)]
    pub delimiter: Option<char>,

    /// Rows per method block
    #[arg(long)]
    pub block_size: Option<usize>,

    /// Zero-based data row where the first block starts
    #[arg(long)]
    pub start_row: Option<usize>,

    /// Significance level
    #[arg(long)]
    pub alpha: Option<f64>,

    /// VIF above which a principle is reported as multicollinear
    #[arg(long)]
    pub vif_threshold: Option<f64>,

    /// Cut blocks by position only, without checking the method labels
    #[arg(long)]
    pub no_label_check: bool,
}

/// Where rendered files go.
#[derive(Debug, Clone, Args)]
pub struct OutputArgs {
    /// Directory for plots and reports
    #[arg(short = 'd', long)]
    pub output_dir: Option<PathBuf>,

    /// Image format of the plots
    #[arg(long, value_enum)]
    pub image_format: Option<ImageFormatArg>,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ImageFormatArg {
    Png,
    Svg,
}

impl From<ImageFormatArg> for ImageFormat {
    fn from(arg: ImageFormatArg) -> Self {
        match arg {
            ImageFormatArg::Png => ImageFormat::Png,
            ImageFormatArg::Svg => ImageFormat::Svg,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["persuasion", "medians", "data.csv", "-o", "json", "--no-color"]).unwrap();
        assert_eq!(cli.output, OutputFormat::Json);
        assert!(cli.no_color);
        match cli.command {
            Commands::Medians(args) => assert_eq!(args.input.input, PathBuf::from("data.csv")),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_input_overrides() {
        let cli = Cli::try_parse_from([
            "persuasion",
            "blocks",
            "data.csv",
            "--delimiter",
            ";",
            "--block-size",
            "20",
            "--alpha",
            "0.01",
            "--no-label-check",
        ])
        .unwrap();
        match cli.command {
            Commands::Blocks(args) => {
                assert_eq!(args.input.delimiter, Some(';'));
                assert_eq!(args.input.block_size, Some(20));
                assert_eq!(args.input.alpha, Some(0.01));
                assert!(args.input.no_label_check);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
