use persuasion_core::{CoreError, MedianMatrix, Result};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use serde_json::json;
use std::error::Error;
use std::path::Path;

use super::{ImageFormat, Task, TaskContext, TaskResult};
use crate::pipeline::NonparametricOutcome;

pub const HEATMAP_STEM: &str = "heatmap_principles_by_method";
pub const HEATMAP_TITLE: &str = "relevance of principles per method (median)";

/// ColorBrewer YlOrRd, light to dark.
const YL_OR_RD: [(u8, u8, u8); 9] = [
    (255, 255, 204),
    (255, 237, 160),
    (254, 217, 118),
    (254, 178, 76),
    (253, 141, 60),
    (252, 78, 42),
    (227, 26, 28),
    (189, 0, 38),
    (128, 0, 38),
];

/// Maps `t` in [0, 1] onto the YlOrRd ramp.
pub fn yl_or_rd(t: f64) -> RGBColor {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let scaled = t * (YL_OR_RD.len() - 1) as f64;
    let i = (scaled.floor() as usize).min(YL_OR_RD.len() - 2);
    let frac = scaled - i as f64;
    let (a, b) = (YL_OR_RD[i], YL_OR_RD[i + 1]);
    let lerp = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * frac).round() as u8;
    RGBColor(lerp(a.0, b.0), lerp(a.1, b.1), lerp(a.2, b.2))
}

#[derive(Debug, Clone)]
pub struct HeatmapConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 800,
            title: HEATMAP_TITLE.to_string(),
        }
    }
}

/// Draws the method × principle median matrix as an annotated heatmap.
pub struct HeatmapTask {
    config: HeatmapConfig,
}

impl HeatmapTask {
    pub fn new(config: HeatmapConfig) -> Self {
        Self { config }
    }

    pub fn render(&self, matrix: &MedianMatrix, path: &Path, format: ImageFormat) -> Result<()> {
        let size = (self.config.width, self.config.height);
        let drawn = match format {
            ImageFormat::Png => draw_heatmap(BitMapBackend::new(path, size).into_drawing_area(), matrix, &self.config.title),
            ImageFormat::Svg => draw_heatmap(SVGBackend::new(path, size).into_drawing_area(), matrix, &self.config.title),
        };
        drawn.map_err(|e| CoreError::Render(format!("{}: {}", path.display(), e)))
    }
}

impl Default for HeatmapTask {
    fn default() -> Self {
        Self::new(HeatmapConfig::default())
    }
}

impl Task for HeatmapTask {
    fn execute(&self, context: &TaskContext<'_>) -> Result<TaskResult> {
        let matrix = match &context.outcome.nonparametric {
            NonparametricOutcome::Completed { medians, .. } => medians,
            NonparametricOutcome::Failed { reason } => {
                return Ok(TaskResult::failure(format!("no median matrix: {}", reason)));
            }
        };
        if matrix.methods().is_empty() {
            return Ok(TaskResult::failure("median matrix is empty".to_string()));
        }

        std::fs::create_dir_all(context.output_dir)?;
        let path = context.image_path(HEATMAP_STEM);
        self.render(matrix, &path, context.image_format)?;
        tracing::info!(path = %path.display(), "heatmap written");

        Ok(TaskResult::success(json!({
            "methods": matrix.methods().len(),
            "principles": matrix.principles().len(),
        }))
        .with_files(vec![path]))
    }

    fn name(&self) -> &str {
        "heatmap"
    }
}

fn draw_heatmap<DB>(root: DrawingArea<DB, Shift>, matrix: &MedianMatrix, title: &str) -> std::result::Result<(), Box<dyn Error>>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    let root = root.titled(title, ("sans-serif", 24))?;

    let (width, _) = root.dim_in_pixel();
    let (main, bar) = root.split_horizontally(width.saturating_sub(130));

    let n_methods = matrix.methods().len() as u32;
    let n_principles = matrix.principles().len() as u32;
    let (lo, hi) = matrix.value_range().unwrap_or((0.0, 1.0));
    let span = if hi > lo { hi - lo } else { 1.0 };
    let normalize = |v: f64| (v - lo) / span;

    let methods = matrix.methods();
    let principles = matrix.principles();

    let mut chart = ChartBuilder::on(&main)
        .margin(10)
        .x_label_area_size(60)
        .y_label_area_size(200)
        .build_cartesian_2d((0u32..n_principles).into_segmented(), (0u32..n_methods).into_segmented())?;

    // Methods run top to bottom.
    let method_at = |row: u32| (n_methods - 1 - row) as usize;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(n_principles as usize)
        .y_labels(n_methods as usize)
        .x_label_formatter(&|v| match v {
            SegmentValue::CenterOf(j) => principles.get(*j as usize).cloned().unwrap_or_default(),
            _ => String::new(),
        })
        .y_label_formatter(&|v| match v {
            SegmentValue::CenterOf(i) if *i < n_methods => methods[method_at(*i)].clone(),
            _ => String::new(),
        })
        .label_style(("sans-serif", 14))
        .draw()?;

    for row in 0..n_methods {
        for col in 0..n_principles {
            let value = matrix.get(method_at(row), col as usize).unwrap_or(f64::NAN);
            let t = normalize(value);
            chart.draw_series(std::iter::once(Rectangle::new(
                [
                    (SegmentValue::Exact(col), SegmentValue::Exact(row)),
                    (SegmentValue::Exact(col + 1), SegmentValue::Exact(row + 1)),
                ],
                yl_or_rd(t).filled(),
            )))?;

            let text_color = if t > 0.6 { &WHITE } else { &BLACK };
            let style = ("sans-serif", 16)
                .into_font()
                .color(text_color)
                .pos(Pos::new(HPos::Center, VPos::Center));
            chart.draw_series(std::iter::once(Text::new(
                format!("{:.2}", value),
                (SegmentValue::CenterOf(col), SegmentValue::CenterOf(row)),
                style,
            )))?;
        }
    }

    draw_colorbar(&bar, lo, lo + span)?;
    root.present()?;
    Ok(())
}

fn draw_colorbar<DB>(area: &DrawingArea<DB, Shift>, lo: f64, hi: f64) -> std::result::Result<(), Box<dyn Error>>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let mut chart = ChartBuilder::on(area)
        .margin(10)
        .margin_bottom(70)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0..1.0, lo..hi)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .disable_x_axis()
        .y_desc("median rating")
        .y_label_formatter(&|v| format!("{:.1}", v))
        .draw()?;

    let steps = 100;
    let step = (hi - lo) / steps as f64;
    chart.draw_series((0..steps).map(|i| {
        let y0 = lo + i as f64 * step;
        Rectangle::new([(0.0, y0), (1.0, y0 + step)], yl_or_rd(i as f64 / (steps - 1) as f64).filled())
    }))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ramp_endpoints() {
        assert_eq!(yl_or_rd(0.0), RGBColor(255, 255, 204));
        assert_eq!(yl_or_rd(1.0), RGBColor(128, 0, 38));
        assert_eq!(yl_or_rd(f64::NAN), RGBColor(255, 255, 204));
    }

    #[test]
    fn test_ramp_interpolates_between_anchors() {
        let mid = yl_or_rd(0.0625);
        assert_eq!(mid, RGBColor(255, 246, 182));
    }
}
