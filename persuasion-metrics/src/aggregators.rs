use persuasion_core::{CoreError, MedianMatrix, MethodBlock, Result};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::statistical::StatisticalAnalyzer;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Histogram {
    pub bins: Vec<HistogramBin>,
    pub total_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistogramBin {
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub count: usize,
    pub frequency: f64,
}

impl Histogram {
    pub fn bin_width(&self) -> f64 {
        self.bins
            .first()
            .map_or(0.0, |b| b.upper_bound - b.lower_bound)
    }

    pub fn max_count(&self) -> usize {
        self.bins.iter().map(|b| b.count).max().unwrap_or(0)
    }
}

/// Builds the method × principle median matrix behind the heatmap.
pub struct MedianAggregator;

impl MedianAggregator {
    /// Median of every principle over every block's rows, constant columns included.
    pub fn aggregate(blocks: &[MethodBlock]) -> Result<MedianMatrix> {
        let principles = blocks
            .first()
            .map(|b| b.principles.clone())
            .unwrap_or_default();

        let mut methods = Vec::with_capacity(blocks.len());
        let mut values = Vec::with_capacity(blocks.len());

        for block in blocks {
            if block.principles != principles {
                return Err(CoreError::Validation(format!(
                    "block '{}' has a different principle set",
                    block.method
                )));
            }

            let row = block
                .columns
                .iter()
                .enumerate()
                .map(|(j, column)| {
                    StatisticalAnalyzer::median(column).ok_or_else(|| {
                        CoreError::InsufficientData(format!(
                            "block '{}' has no rows for '{}'",
                            block.method, principles[j]
                        ))
                    })
                })
                .collect::<Result<Vec<f64>>>()?;

            methods.push(block.method.clone());
            values.push(row);
        }

        MedianMatrix::new(methods, principles, values)
    }
}

pub struct MetricAggregator;

impl MetricAggregator {
    /// Generate histogram with specified number of bins
    pub fn histogram(values: &[f64], num_bins: usize) -> Histogram {
        if values.is_empty() || num_bins == 0 {
            return Histogram {
                bins: vec![],
                total_count: 0,
            };
        }

        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

        if min == max {
            return Histogram {
                bins: vec![HistogramBin {
                    lower_bound: min,
                    upper_bound: max,
                    count: values.len(),
                    frequency: 1.0,
                }],
                total_count: values.len(),
            };
        }

        let bin_width = (max - min) / num_bins as f64;
        let mut bins = vec![0usize; num_bins];

        for &value in values {
            let bin_index = (((value - min) / bin_width).floor() as usize).min(num_bins - 1);
            bins[bin_index] += 1;
        }

        let total = values.len();
        let histogram_bins: Vec<HistogramBin> = bins
            .into_iter()
            .enumerate()
            .map(|(i, count)| {
                let lower_bound = min + (i as f64 * bin_width);
                HistogramBin {
                    lower_bound,
                    upper_bound: lower_bound + bin_width,
                    count,
                    frequency: count as f64 / total as f64,
                }
            })
            .collect();

        Histogram {
            bins: histogram_bins,
            total_count: total,
        }
    }

    /// Gaussian kernel density estimate with Scott's bandwidth, evaluated on an even
    /// grid extending three bandwidths past the data. Empty for fewer than two distinct
    /// values.
    pub fn gaussian_kde(values: &[f64], grid_points: usize) -> Vec<(f64, f64)> {
        if values.len() < 2 || grid_points < 2 {
            return vec![];
        }

        let std_dev = values.std_dev();
        if !(std_dev > 0.0) {
            return vec![];
        }

        let n = values.len() as f64;
        let bandwidth = std_dev * n.powf(-0.2);
        let lo = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let hi = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let min = lo - 3.0 * bandwidth;
        let max = hi + 3.0 * bandwidth;
        let step = (max - min) / (grid_points - 1) as f64;
        let norm = 1.0 / (n * bandwidth * (2.0 * std::f64::consts::PI).sqrt());

        (0..grid_points)
            .map(|i| {
                let x = min + i as f64 * step;
                let density = values
                    .iter()
                    .map(|&v| {
                        let u = (x - v) / bandwidth;
                        (-0.5 * u * u).exp()
                    })
                    .sum::<f64>()
                    * norm;
                (x, density)
            })
            .collect()
    }
}
