//! Chart rendering helpers
//!
//! Thin wrappers around `plotters` used by the EDA and evaluation stages.
//! Every function writes a single PNG and maps backend errors into
//! [`ChurnError::Plot`] so callers stay on the crate's `Result`.

use crate::error::{ChurnError, Result};
use crate::model::RocCurve;
use plotters::prelude::*;
use std::path::Path;

const WIDTH: u32 = 1200;
const HEIGHT: u32 = 700;

const SERIES_COLORS: [RGBColor; 4] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
];

fn plot_err<E: std::fmt::Display>(e: E) -> ChurnError {
    ChurnError::Plot(e.to_string())
}

/// Render a histogram of `values` with `n_bins` equal-width bins.
pub fn histogram(path: &Path, title: &str, values: &[f64], n_bins: usize) -> Result<()> {
    if values.is_empty() || n_bins == 0 {
        return Err(ChurnError::Plot(format!(
            "histogram '{}' needs data and at least one bin",
            title
        )));
    }

    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    // Degenerate column: widen the range so the single bar is visible.
    let (min, max) = if (max - min).abs() < f64::EPSILON {
        (min - 0.5, max + 0.5)
    } else {
        (min, max)
    };
    let bin_width = (max - min) / n_bins as f64;

    let mut counts = vec![0usize; n_bins];
    for &v in values {
        let idx = (((v - min) / bin_width) as usize).min(n_bins - 1);
        counts[idx] += 1;
    }
    let y_max = counts.iter().copied().max().unwrap_or(1) as f64 * 1.05;

    let root = BitMapBackend::new(path, (WIDTH, HEIGHT)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 28))
        .margin(20)
        .x_label_area_size(45)
        .y_label_area_size(55)
        .build_cartesian_2d(min..max, 0.0..y_max)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .y_desc("Count")
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(counts.iter().enumerate().map(|(i, &c)| {
            let x0 = min + i as f64 * bin_width;
            let x1 = x0 + bin_width;
            Rectangle::new(
                [(x0, 0.0), (x1, c as f64)],
                SERIES_COLORS[0].mix(0.8).filled(),
            )
        }))
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    Ok(())
}

/// Render a vertical bar chart over labelled categories.
pub fn bar_chart(path: &Path, title: &str, labels: &[String], values: &[f64]) -> Result<()> {
    if labels.len() != values.len() || labels.is_empty() {
        return Err(ChurnError::Plot(format!(
            "bar chart '{}' needs matching non-empty labels and values",
            title
        )));
    }

    let y_max = values.iter().cloned().fold(0.0f64, f64::max) * 1.1;
    let y_max = if y_max > 0.0 { y_max } else { 1.0 };
    let n = labels.len();

    let root = BitMapBackend::new(path, (WIDTH, HEIGHT)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 28))
        .margin(20)
        .x_label_area_size(45)
        .y_label_area_size(55)
        .build_cartesian_2d(0.0..n as f64, 0.0..y_max)
        .map_err(plot_err)?;

    let label_names = labels.to_vec();
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&move |x| {
            let idx = x.floor() as usize;
            label_names.get(idx).cloned().unwrap_or_default()
        })
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(values.iter().enumerate().map(|(i, &v)| {
            Rectangle::new(
                [(i as f64 + 0.1, 0.0), (i as f64 + 0.9, v)],
                SERIES_COLORS[0].mix(0.8).filled(),
            )
        }))
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    Ok(())
}

/// Render one or more ROC curves with a chance diagonal. Each series is
/// labelled with its AUC in the legend.
pub fn roc_chart(path: &Path, title: &str, curves: &[(String, RocCurve)]) -> Result<()> {
    if curves.is_empty() {
        return Err(ChurnError::Plot(format!("ROC chart '{}' has no curves", title)));
    }

    let root = BitMapBackend::new(path, (WIDTH, HEIGHT)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 28))
        .margin(20)
        .x_label_area_size(45)
        .y_label_area_size(55)
        .build_cartesian_2d(0.0..1.0f64, 0.0..1.0f64)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc("False Positive Rate")
        .y_desc("True Positive Rate")
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(LineSeries::new(
            [(0.0, 0.0), (1.0, 1.0)],
            BLACK.mix(0.4).stroke_width(1),
        ))
        .map_err(plot_err)?;

    for (i, (name, curve)) in curves.iter().enumerate() {
        let color = SERIES_COLORS[i % SERIES_COLORS.len()];
        let points: Vec<(f64, f64)> = curve
            .fpr
            .iter()
            .zip(curve.tpr.iter())
            .map(|(&f, &t)| (f, t))
            .collect();

        chart
            .draw_series(LineSeries::new(points, color.stroke_width(2)))
            .map_err(plot_err)?
            .label(format!("{} (AUC = {:.3})", name, curve.auc))
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
            });
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::LowerRight)
        .border_style(BLACK)
        .background_style(WHITE.mix(0.9))
        .draw()
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    Ok(())
}

/// Render a square correlation heatmap. `matrix[i][j]` is the correlation
/// between `labels[i]` and `labels[j]`, expected in [-1, 1].
pub fn heatmap(path: &Path, title: &str, labels: &[String], matrix: &[Vec<f64>]) -> Result<()> {
    let n = labels.len();
    if n == 0 || matrix.len() != n || matrix.iter().any(|row| row.len() != n) {
        return Err(ChurnError::Plot(format!(
            "heatmap '{}' needs a square matrix matching its labels",
            title
        )));
    }

    let root = BitMapBackend::new(path, (WIDTH, HEIGHT)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 28))
        .margin(20)
        .x_label_area_size(45)
        .y_label_area_size(55)
        .build_cartesian_2d(0.0..n as f64, 0.0..n as f64)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series((0..n).flat_map(|i| {
            let row = &matrix[i];
            (0..n).map(move |j| {
                let v = row[j].clamp(-1.0, 1.0);
                // Blue for negative, red for positive, white at zero.
                let color = if v >= 0.0 {
                    RGBColor(255, (255.0 * (1.0 - v)) as u8, (255.0 * (1.0 - v)) as u8)
                } else {
                    RGBColor((255.0 * (1.0 + v)) as u8, (255.0 * (1.0 + v)) as u8, 255)
                };
                Rectangle::new(
                    [(j as f64, (n - 1 - i) as f64), (j as f64 + 1.0, (n - i) as f64)],
                    color.filled(),
                )
            })
        }))
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    Ok(())
}

/// Render a feature-importance bar chart. Bars are drawn in the order given,
/// so callers sort by importance first.
pub fn importance_chart(
    path: &Path,
    title: &str,
    names: &[String],
    importances: &[f64],
) -> Result<()> {
    if names.len() != importances.len() || names.is_empty() {
        return Err(ChurnError::Plot(format!(
            "importance chart '{}' needs matching non-empty names and values",
            title
        )));
    }

    let n = names.len();
    let y_max = importances.iter().cloned().fold(0.0f64, f64::max) * 1.1;
    let y_max = if y_max > 0.0 { y_max } else { 1.0 };

    let root = BitMapBackend::new(path, (WIDTH, HEIGHT)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 28))
        .margin(20)
        .x_label_area_size(120)
        .y_label_area_size(55)
        .build_cartesian_2d(0.0..n as f64, 0.0..y_max)
        .map_err(plot_err)?;

    let label_names = names.to_vec();
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&move |x| {
            let idx = x.floor() as usize;
            label_names.get(idx).cloned().unwrap_or_default()
        })
        .y_desc("Importance")
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(importances.iter().enumerate().map(|(i, &v)| {
            Rectangle::new(
                [(i as f64 + 0.1, 0.0), (i as f64 + 0.9, v)],
                SERIES_COLORS[2].mix(0.8).filled(),
            )
        }))
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_histogram_writes_png() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hist.png");
        let values: Vec<f64> = (0..100).map(|i| (i % 17) as f64).collect();

        histogram(&path, "ages", &values, 10).unwrap();
        assert!(path.exists());
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn test_histogram_constant_column() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("flat.png");

        histogram(&path, "flat", &[3.0; 20], 5).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_histogram_empty_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.png");
        assert!(histogram(&path, "empty", &[], 5).is_err());
    }

    #[test]
    fn test_bar_chart_writes_png() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bars.png");
        let labels = vec!["Married".to_string(), "Single".to_string()];

        bar_chart(&path, "marital", &labels, &[0.6, 0.4]).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_roc_chart_two_curves() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("roc.png");
        let curve = RocCurve {
            fpr: vec![0.0, 0.25, 1.0],
            tpr: vec![0.0, 0.75, 1.0],
            auc: 0.75,
        };

        roc_chart(
            &path,
            "ROC",
            &[("lr".to_string(), curve.clone()), ("rf".to_string(), curve)],
        )
        .unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_heatmap_rejects_ragged_matrix() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("heat.png");
        let labels = vec!["a".to_string(), "b".to_string()];
        let matrix = vec![vec![1.0, 0.5]];
        assert!(heatmap(&path, "corr", &labels, &matrix).is_err());
    }

    #[test]
    fn test_heatmap_writes_png() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("heat.png");
        let labels = vec!["a".to_string(), "b".to_string()];
        let matrix = vec![vec![1.0, -0.3], vec![-0.3, 1.0]];

        heatmap(&path, "corr", &labels, &matrix).unwrap();
        assert!(path.exists());
    }
}
