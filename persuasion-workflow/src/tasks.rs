pub mod data_loading;
pub mod diagnostics;
pub mod heatmap;
pub mod reporting;

pub use data_loading::*;
pub use diagnostics::*;
pub use heatmap::*;
pub use reporting::*;

use persuasion_core::{AnalysisConfig, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::pipeline::AnalysisOutcome;

/// Image encoding for rendered charts.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
    Svg,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Svg => "svg",
        }
    }
}

/// Everything an output task may read; tasks never modify the analysis.
#[derive(Debug, Clone, Copy)]
pub struct TaskContext<'a> {
    pub outcome: &'a AnalysisOutcome,
    pub config: &'a AnalysisConfig,
    pub output_dir: &'a Path,
    pub image_format: ImageFormat,
}

impl<'a> TaskContext<'a> {
    pub fn new(outcome: &'a AnalysisOutcome, config: &'a AnalysisConfig, output_dir: &'a Path) -> Self {
        Self {
            outcome,
            config,
            output_dir,
            image_format: ImageFormat::default(),
        }
    }

    pub fn with_image_format(mut self, format: ImageFormat) -> Self {
        self.image_format = format;
        self
    }

    /// `<output_dir>/<stem>.<png|svg>`
    pub fn image_path(&self, stem: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", stem, self.image_format.extension()))
    }
}

pub trait Task {
    fn execute(&self, context: &TaskContext<'_>) -> Result<TaskResult>;
    fn name(&self) -> &str;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub success: bool,
    pub output: serde_json::Value,
    pub files: Vec<PathBuf>,
    pub error: Option<String>,
}

impl TaskResult {
    pub fn success(output: serde_json::Value) -> Self {
        Self {
            success: true,
            output,
            files: vec![],
            error: None,
        }
    }

    pub fn failure(error: String) -> Self {
        Self {
            success: false,
            output: serde_json::Value::Null,
            files: vec![],
            error: Some(error),
        }
    }

    pub fn with_files(mut self, files: Vec<PathBuf>) -> Self {
        self.files = files;
        self
    }
}
