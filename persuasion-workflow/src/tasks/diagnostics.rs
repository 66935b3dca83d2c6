use persuasion_core::{CoreError, Result};
use persuasion_metrics::regression::QqPoint;
use plotters::coord::Shift;
use plotters::prelude::*;
use serde_json::json;
use std::error::Error;
use std::path::{Path, PathBuf};

use super::{ImageFormat, Task, TaskContext, TaskResult};
use crate::engine::{DiagnosticSeries, PrincipleFit, RegressionOutcome};

pub const RESIDUALS_STEM: &str = "residuals_vs_fitted";
pub const HISTOGRAM_STEM: &str = "residual_histogram";
pub const QQ_STEM: &str = "residual_qq";
pub const SCATTER_PREFIX: &str = "scatter_";

type DrawResult = std::result::Result<(), Box<dyn Error>>;

/// File-name-safe form of a principle name: lowercase, runs of other characters
/// collapsed to `_`.
pub fn file_slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            slug.push(c);
        } else if !slug.ends_with('_') {
            slug.push('_');
        }
    }
    let slug = slug.trim_matches('_');
    if slug.is_empty() {
        "principle".to_string()
    } else {
        slug.to_string()
    }
}

/// One chart of the diagnostics set; drawing is generic over the backend.
enum Plot<'a> {
    Residuals(&'a DiagnosticSeries),
    Histogram(&'a DiagnosticSeries),
    Qq(&'a [QqPoint]),
    Scatter(&'a PrincipleFit, &'a str),
}

impl Plot<'_> {
    fn draw<DB>(&self, root: &DrawingArea<DB, Shift>) -> DrawResult
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
    {
        match self {
            Plot::Residuals(series) => draw_residuals(root, series),
            Plot::Histogram(series) => draw_histogram(root, series),
            Plot::Qq(points) => draw_qq(root, points),
            Plot::Scatter(fit, response) => draw_scatter(root, fit, response),
        }
    }
}

/// Residual, distribution and per-principle scatter plots of the regression.
pub struct DiagnosticsTask {
    size: (u32, u32),
}

impl Default for DiagnosticsTask {
    fn default() -> Self {
        Self { size: (1000, 700) }
    }
}

impl DiagnosticsTask {
    pub fn new(width: u32, height: u32) -> Self {
        Self { size: (width, height) }
    }

    fn render(&self, path: &Path, format: ImageFormat, plot: Plot<'_>) -> Result<()> {
        let drawn = match format {
            ImageFormat::Png => {
                let root = BitMapBackend::new(path, self.size).into_drawing_area();
                plot.draw(&root).and_then(|_| root.present().map_err(Into::into))
            }
            ImageFormat::Svg => {
                let root = SVGBackend::new(path, self.size).into_drawing_area();
                plot.draw(&root).and_then(|_| root.present().map_err(Into::into))
            }
        };
        drawn.map_err(|e| CoreError::Render(format!("{}: {}", path.display(), e)))
    }
}

impl Task for DiagnosticsTask {
    fn execute(&self, context: &TaskContext<'_>) -> Result<TaskResult> {
        let report = match &context.outcome.regression {
            RegressionOutcome::Fitted(report) => report,
            RegressionOutcome::Failed { reason, .. } => {
                return Ok(TaskResult::failure(format!("no regression to plot: {}", reason)));
            }
        };
        let series = &report.diagnostics;
        let response = report.response.as_str();

        std::fs::create_dir_all(context.output_dir)?;

        let mut plots = vec![
            (context.image_path(RESIDUALS_STEM), Plot::Residuals(series)),
            (context.image_path(HISTOGRAM_STEM), Plot::Histogram(series)),
            (context.image_path(QQ_STEM), Plot::Qq(&series.qq)),
        ];
        for fit in &series.principle_fits {
            let stem = format!("{}{}", SCATTER_PREFIX, file_slug(&fit.principle));
            plots.push((context.image_path(&stem), Plot::Scatter(fit, response)));
        }

        let mut files: Vec<PathBuf> = Vec::with_capacity(plots.len());
        for (path, plot) in plots {
            self.render(&path, context.image_format, plot)?;
            files.push(path);
        }

        tracing::info!(plots = files.len(), dir = %context.output_dir.display(), "diagnostic plots written");

        Ok(TaskResult::success(json!({ "plots": files.len() })).with_files(files))
    }

    fn name(&self) -> &str {
        "diagnostics"
    }
}

fn padded(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !lo.is_finite() {
        return (-1.0, 1.0);
    }
    let pad = if hi > lo { (hi - lo) * 0.05 } else { 0.5 };
    (lo - pad, hi + pad)
}

fn draw_residuals<DB>(root: &DrawingArea<DB, Shift>, series: &DiagnosticSeries) -> DrawResult
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    let points = &series.residuals_vs_fitted;
    let (x_lo, x_hi) = padded(points.iter().map(|p| p.0));
    let (y_lo, y_hi) = padded(points.iter().map(|p| p.1));

    let mut chart = ChartBuilder::on(root)
        .caption("Residuals vs fitted", ("sans-serif", 22))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)?;

    chart
        .configure_mesh()
        .x_desc("fitted values")
        .y_desc("residuals")
        .draw()?;

    chart.draw_series(std::iter::once(PathElement::new(
        vec![(x_lo, 0.0), (x_hi, 0.0)],
        BLACK.mix(0.4),
    )))?;
    chart.draw_series(points.iter().map(|&(x, y)| Circle::new((x, y), 3, BLUE.mix(0.6).filled())))?;
    chart.draw_series(LineSeries::new(series.lowess.iter().copied(), RED.stroke_width(2)))?;
    Ok(())
}

fn draw_histogram<DB>(root: &DrawingArea<DB, Shift>, series: &DiagnosticSeries) -> DrawResult
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    let bins = &series.histogram.bins;
    let (x_lo, x_hi) = padded(
        bins.iter()
            .flat_map(|b| [b.lower_bound, b.upper_bound])
            .chain(series.density.iter().map(|d| d.0)),
    );
    let y_hi = series
        .density
        .iter()
        .map(|d| d.1)
        .chain(bins.iter().map(|b| b.count as f64))
        .fold(1.0, f64::max)
        * 1.1;

    let mut chart = ChartBuilder::on(root)
        .caption("Residual distribution", ("sans-serif", 22))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_lo..x_hi, 0.0..y_hi)?;

    chart
        .configure_mesh()
        .x_desc("residuals")
        .y_desc("count")
        .draw()?;

    chart.draw_series(bins.iter().map(|b| {
        Rectangle::new(
            [(b.lower_bound, 0.0), (b.upper_bound, b.count as f64)],
            BLUE.mix(0.4).filled(),
        )
    }))?;
    chart.draw_series(LineSeries::new(series.density.iter().copied(), RED.stroke_width(2)))?;
    Ok(())
}

fn draw_qq<DB>(root: &DrawingArea<DB, Shift>, points: &[QqPoint]) -> DrawResult
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    let (lo, hi) = padded(points.iter().flat_map(|p| [p.theoretical, p.sample]));

    let mut chart = ChartBuilder::on(root)
        .caption("Normal QQ plot of residuals", ("sans-serif", 22))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(lo..hi, lo..hi)?;

    chart
        .configure_mesh()
        .x_desc("theoretical quantiles")
        .y_desc("sample quantiles")
        .draw()?;

    chart.draw_series(std::iter::once(PathElement::new(vec![(lo, lo), (hi, hi)], RED)))?;
    chart.draw_series(
        points
            .iter()
            .map(|p| Circle::new((p.theoretical, p.sample), 3, BLUE.filled())),
    )?;
    Ok(())
}

fn draw_scatter<DB>(root: &DrawingArea<DB, Shift>, fit: &PrincipleFit, response: &str) -> DrawResult
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    let (x_lo, x_hi) = padded(fit.points.iter().map(|p| p.0));
    let band_values = fit
        .fit
        .iter()
        .flat_map(|f| f.band.iter().flat_map(|b| [b.2, b.3]));
    let (y_lo, y_hi) = padded(fit.points.iter().map(|p| p.1).chain(band_values));

    let mut chart = ChartBuilder::on(root)
        .caption(format!("{} vs {}", response, fit.principle), ("sans-serif", 22))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)?;

    chart
        .configure_mesh()
        .x_desc(fit.principle.as_str())
        .y_desc(response)
        .draw()?;

    if let Some(line) = &fit.fit {
        let mut band: Vec<(f64, f64)> = line.band.iter().map(|b| (b.0, b.3)).collect();
        band.extend(line.band.iter().rev().map(|b| (b.0, b.2)));
        chart.draw_series(std::iter::once(Polygon::new(band, RED.mix(0.15).filled())))?;
        chart.draw_series(LineSeries::new(line.band.iter().map(|b| (b.0, b.1)), RED.stroke_width(2)))?;
    }

    chart.draw_series(
        fit.points
            .iter()
            .map(|&(x, y)| Circle::new((x, y), 3, BLUE.mix(0.5).filled())),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_slug() {
        assert_eq!(file_slug("Verpfl. & Konsistenz"), "verpfl_konsistenz");
        assert_eq!(file_slug("Reziprozität"), "reziprozität");
        assert_eq!(file_slug("Sozl. Bewährtheit"), "sozl_bewährtheit");
        assert_eq!(file_slug("  "), "principle");
    }

    #[test]
    fn test_padded_range() {
        assert_eq!(padded([0.0, 10.0].into_iter()), (-0.5, 10.5));
        assert_eq!(padded([2.0].into_iter()), (1.5, 2.5));
        assert_eq!(padded(std::iter::empty()), (-1.0, 1.0));
    }
}
