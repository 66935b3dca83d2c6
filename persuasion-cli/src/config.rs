//! CLI configuration management

use anyhow::{Context as _, Result};
use config::{Config as ConfigLoader, Environment, File};
use persuasion_core::AnalysisConfig;
use persuasion_workflow::ImageFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cli::InputArgs;

/// Prefix of environment overrides, e.g. `PERSUASION__ANALYSIS__ALPHA=0.01`.
pub const ENV_PREFIX: &str = "PERSUASION";

/// Settings after layering defaults, config files and the environment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct CliConfig {
    pub analysis: AnalysisConfig,
    pub input: InputSettings,
    pub output: OutputSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InputSettings {
    pub delimiter: char,
}

impl Default for InputSettings {
    fn default() -> Self {
        Self { delimiter: ',' }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputSettings {
    pub dir: PathBuf,
    pub image_format: ImageFormat,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
            image_format: ImageFormat::Png,
        }
    }
}

impl CliConfig {
    /// Built-in defaults, then `config/default` and `config/local` (or `file` when
    /// given), then `PERSUASION__*` environment variables.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = ConfigLoader::builder()
            .add_source(ConfigLoader::try_from(&Self::default()).context("Failed to encode default settings")?);

        builder = match file {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder
                .add_source(File::with_name("config/default").required(false))
                .add_source(File::with_name("config/local").required(false)),
        };

        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read configuration")?;

        config
            .try_deserialize()
            .context("Failed to parse configuration")
    }

    /// Command-line flags win over every other layer.
    pub fn apply_input_args(&mut self, args: &InputArgs) {
        if let Some(delimiter) = args.delimiter {
            self.input.delimiter = delimiter;
        }
        if let Some(block_size) = args.block_size {
            self.analysis.block_size = block_size;
        }
        if let Some(start_row) = args.start_row {
            self.analysis.start_row = start_row;
        }
        if let Some(alpha) = args.alpha {
            self.analysis.alpha = alpha;
        }
        if let Some(threshold) = args.vif_threshold {
            self.analysis.vif_threshold = threshold;
        }
        if args.no_label_check {
            self.analysis.validate_labels = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn input_args() -> InputArgs {
        InputArgs {
            input: PathBuf::from("data.csv"),
            delimiter: None,
            block_size: None,
            start_row: None,
            alpha: None,
            vif_threshold: None,
            no_label_check: false,
        }
    }

    #[test]
    fn test_settings_defaults() {
        let config = CliConfig::default();
        assert_eq!(config.analysis, AnalysisConfig::default());
        assert_eq!(config.input.delimiter, ',');
        assert_eq!(config.output.dir, PathBuf::from("output"));
        assert_eq!(config.output.image_format, ImageFormat::Png);
    }

    #[test]
    fn test_file_layer_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[analysis]\nblock_size = 20\nalpha = 0.01\n\n[input]\ndelimiter = \";\"\n\n[output]\nimage_format = \"svg\""
        )
        .unwrap();

        let config = CliConfig::load(Some(file.path())).unwrap();

        assert_eq!(config.analysis.block_size, 20);
        assert_eq!(config.analysis.alpha, 0.01);
        assert_eq!(config.analysis.vif_threshold, 5.0);
        assert_eq!(config.input.delimiter, ';');
        assert_eq!(config.output.image_format, ImageFormat::Svg);
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        assert!(CliConfig::load(Some(Path::new("/nonexistent/persuasion.toml"))).is_err());
    }

    #[test]
    fn test_flags_win() {
        let mut config = CliConfig::default();
        let args = InputArgs {
            delimiter: Some('\t'),
            block_size: Some(10),
            alpha: Some(0.1),
            no_label_check: true,
            ..input_args()
        };

        config.apply_input_args(&args);

        assert_eq!(config.input.delimiter, '\t');
        assert_eq!(config.analysis.block_size, 10);
        assert_eq!(config.analysis.alpha, 0.1);
        assert_eq!(config.analysis.start_row, 0);
        assert!(!config.analysis.validate_labels);
    }
}
