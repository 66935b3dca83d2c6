use persuasion_core::{AnalysisConfig, MedianMatrix, RatingTable, Result};
use persuasion_metrics::aggregators::MedianAggregator;
use serde::{Deserialize, Serialize};

use crate::engine::{BlockAnalyzer, BlockOutcome, RegressionAnalyzer, RegressionOutcome};
use crate::partition::BlockPartitioner;
use crate::tasks::{DiagnosticsTask, HeatmapTask, ReportingTask, Task};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NonparametricOutcome {
    Completed {
        blocks: Vec<BlockOutcome>,
        medians: MedianMatrix,
    },
    /// The table could not be cut into method blocks.
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisOutcome {
    pub methods: Vec<String>,
    pub nonparametric: NonparametricOutcome,
    pub regression: RegressionOutcome,
}

impl AnalysisOutcome {
    pub fn blocks(&self) -> &[BlockOutcome] {
        match &self.nonparametric {
            NonparametricOutcome::Completed { blocks, .. } => blocks,
            NonparametricOutcome::Failed { .. } => &[],
        }
    }

    pub fn medians(&self) -> Option<&MedianMatrix> {
        match &self.nonparametric {
            NonparametricOutcome::Completed { medians, .. } => Some(medians),
            NonparametricOutcome::Failed { .. } => None,
        }
    }
}

/// Block tests, median matrix and regression over one ratings table.
///
/// The block pipeline and the regression are independent: a partition failure does
/// not prevent the regression and vice versa.
#[derive(Debug, Clone)]
pub struct AnalysisPipeline {
    config: AnalysisConfig,
}

impl AnalysisPipeline {
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        Ok(Self {
            config: config.validated()?,
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn partitioner(&self) -> BlockPartitioner {
        BlockPartitioner::from_config(&self.config)
    }

    /// Partition, test every block and aggregate medians.
    pub fn run_blocks(&self, table: &RatingTable) -> Result<(Vec<BlockOutcome>, MedianMatrix)> {
        let methods = table.method_labels();
        let blocks = self.partitioner().partition(table, &methods)?;
        let outcomes = BlockAnalyzer::from_config(&self.config).analyze_all(&blocks);
        let medians = MedianAggregator::aggregate(&blocks)?;
        Ok((outcomes, medians))
    }

    pub fn run_regression(&self, table: &RatingTable) -> RegressionOutcome {
        RegressionAnalyzer::from_config(&self.config)
            .with_response_name(table.rate_column())
            .run(table)
    }

    pub fn run(&self, table: &RatingTable) -> AnalysisOutcome {
        tracing::info!(rows = table.len(), "starting analysis");

        let nonparametric = match self.run_blocks(table) {
            Ok((blocks, medians)) => NonparametricOutcome::Completed { blocks, medians },
            Err(e) => {
                tracing::error!(error = %e, "block analysis aborted");
                NonparametricOutcome::Failed { reason: e.to_string() }
            }
        };

        let regression = self.run_regression(table);

        AnalysisOutcome {
            methods: table.method_labels(),
            nonparametric,
            regression,
        }
    }

    /// Heatmap, diagnostic plots and reports, in that order.
    pub fn output_tasks() -> Vec<Box<dyn Task>> {
        vec![
            Box::new(HeatmapTask::default()),
            Box::new(DiagnosticsTask::default()),
            Box::new(ReportingTask::new(Default::default())),
        ]
    }
}
