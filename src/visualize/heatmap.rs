//! Clustered expression heatmap rendered to SVG

use std::io::Write;
use std::path::Path;

use ndarray::{Array2, Axis};
use plotters::prelude::*;
use serde::{Deserialize, Serialize};

use super::cluster::{average_linkage_order, replace_zeros, zscore_rows};
use crate::data::ClassTable;
use crate::error::{DegseaError, Result};
use crate::export::{write_text, AnnotatedExpression};

/// Parameters for heatmap rendering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeatmapParams {
    /// Replacement for exact zeros after row scaling
    pub epsilon: f64,
    /// Gene labels are drawn only up to this many rows
    pub max_labeled_rows: usize,
    /// Color scale saturates at +/- this z-score
    pub clamp: f64,
    pub cell_width: u32,
    pub cell_height: u32,
    pub title: String,
}

impl Default for HeatmapParams {
    fn default() -> Self {
        Self {
            epsilon: 1e-6,
            max_labeled_rows: 100,
            clamp: 3.0,
            cell_width: 24,
            cell_height: 12,
            title: String::new(),
        }
    }
}

/// Row-scaled, row-ordered matrix ready for drawing
#[derive(Debug, Clone)]
pub struct HeatmapData {
    pub values: Array2<f64>,
    pub row_labels: Vec<String>,
    pub column_labels: Vec<String>,
    /// Class label per column
    pub column_classes: Vec<String>,
}

/// Z-score rows, substitute zeros, and order rows by average-linkage clustering
pub fn prepare_heatmap(table: &AnnotatedExpression, classes: &ClassTable, params: &HeatmapParams) -> Result<HeatmapData> {
    if table.values.ncols() != classes.n_samples() {
        return Err(DegseaError::DimensionMismatch {
            expected: format!("{} heatmap columns", classes.n_samples()),
            got: format!("{} heatmap columns", table.values.ncols()),
        });
    }

    let mut scaled = zscore_rows(table.values.view());
    replace_zeros(&mut scaled, params.epsilon);
    let order = average_linkage_order(scaled.view());

    Ok(HeatmapData {
        values: scaled.select(Axis(0), &order),
        row_labels: order.iter().map(|&i| table.names[i].clone()).collect(),
        column_labels: table.sample_headers.clone(),
        column_classes: classes.labels().to_vec(),
    })
}

const CLASS_PALETTE: [RGBColor; 8] = [
    RGBColor(27, 158, 119),
    RGBColor(217, 95, 2),
    RGBColor(117, 112, 179),
    RGBColor(231, 41, 138),
    RGBColor(102, 166, 30),
    RGBColor(230, 171, 2),
    RGBColor(166, 118, 29),
    RGBColor(102, 102, 102),
];

fn lerp(a: u8, b: u8, t: f64) -> u8 {
    (a as f64 + (b as f64 - a as f64) * t).round() as u8
}

/// Blue (low) through white to red (high), saturating at `clamp`
fn diverging_color(z: f64, clamp: f64) -> RGBColor {
    let t = (z / clamp).clamp(-1.0, 1.0);
    let (lo, hi) = ((33u8, 102u8, 172u8), (178u8, 24u8, 43u8));
    let white = (247u8, 247u8, 247u8);
    if t < 0.0 {
        let s = -t;
        RGBColor(lerp(white.0, lo.0, s), lerp(white.1, lo.1, s), lerp(white.2, lo.2, s))
    } else {
        RGBColor(lerp(white.0, hi.0, t), lerp(white.1, hi.1, t), lerp(white.2, hi.2, t))
    }
}

fn plot_error<E: std::fmt::Display>(e: E) -> DegseaError {
    DegseaError::PlotError { reason: e.to_string() }
}

/// Draw the heatmap as an SVG document
pub fn render_svg(data: &HeatmapData, groups: &[String], params: &HeatmapParams) -> Result<String> {
    let n_rows = data.values.nrows() as i32;
    let n_cols = data.values.ncols() as i32;
    let cw = params.cell_width as i32;
    let ch = params.cell_height as i32;

    let left = 20;
    let top = 50;
    let strip = 14;
    let gap = 6;
    let grid_top = top + strip + gap;
    let label_width = if data.values.nrows() <= params.max_labeled_rows { 120 } else { 10 };
    let legend_x = left + n_cols * cw + label_width;
    let width = legend_x + 180;
    let legend_height = 40 + 18 * groups.len() as i32 + 90;
    let height = (grid_top + n_rows * ch + 40).max(top + legend_height);

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (width as u32, height as u32)).into_drawing_area();
        root.fill(&WHITE).map_err(plot_error)?;

        if !params.title.is_empty() {
            root.draw(&Text::new(
                params.title.clone(),
                (left, 20),
                ("sans-serif", 16).into_font().color(&BLACK),
            ))
            .map_err(plot_error)?;
        }

        let group_color = |label: &str| {
            let idx = groups.iter().position(|g| g == label).unwrap_or(0);
            CLASS_PALETTE[idx % CLASS_PALETTE.len()]
        };

        // Class strip above the columns
        for (j, label) in data.column_classes.iter().enumerate() {
            let x = left + j as i32 * cw;
            root.draw(&Rectangle::new([(x, top), (x + cw, top + strip)], group_color(label).filled()))
                .map_err(plot_error)?;
        }

        for (i, row) in data.values.axis_iter(Axis(0)).enumerate() {
            let y = grid_top + i as i32 * ch;
            for (j, &z) in row.iter().enumerate() {
                let x = left + j as i32 * cw;
                root.draw(&Rectangle::new(
                    [(x, y), (x + cw, y + ch)],
                    diverging_color(z, params.clamp).filled(),
                ))
                .map_err(plot_error)?;
            }
            if data.values.nrows() <= params.max_labeled_rows {
                root.draw(&Text::new(
                    data.row_labels[i].clone(),
                    (left + n_cols * cw + 4, y + ch - 2),
                    ("sans-serif", (ch - 2).max(6)).into_font().color(&BLACK),
                ))
                .map_err(plot_error)?;
            }
        }

        // Class legend
        root.draw(&Text::new(
            "Class".to_string(),
            (legend_x, top + 10),
            ("sans-serif", 12).into_font().color(&BLACK),
        ))
        .map_err(plot_error)?;
        for (k, group) in groups.iter().enumerate() {
            let y = top + 24 + 18 * k as i32;
            root.draw(&Rectangle::new(
                [(legend_x, y), (legend_x + 12, y + 12)],
                CLASS_PALETTE[k % CLASS_PALETTE.len()].filled(),
            ))
            .map_err(plot_error)?;
            root.draw(&Text::new(
                group.clone(),
                (legend_x + 18, y + 10),
                ("sans-serif", 11).into_font().color(&BLACK),
            ))
            .map_err(plot_error)?;
        }

        // Color scale
        let scale_top = top + 40 + 18 * groups.len() as i32;
        let steps = 60;
        for s in 0..steps {
            let z = params.clamp - 2.0 * params.clamp * s as f64 / (steps - 1) as f64;
            let y = scale_top + s;
            root.draw(&Rectangle::new(
                [(legend_x, y), (legend_x + 12, y + 1)],
                diverging_color(z, params.clamp).filled(),
            ))
            .map_err(plot_error)?;
        }
        for (label, y) in [
            (format!("{}", params.clamp), scale_top + 6),
            ("0".to_string(), scale_top + steps / 2 + 4),
            (format!("-{}", params.clamp), scale_top + steps),
        ] {
            root.draw(&Text::new(label, (legend_x + 18, y), ("sans-serif", 10).into_font().color(&BLACK)))
                .map_err(plot_error)?;
        }

        root.present().map_err(plot_error)?;
    }
    Ok(svg)
}

/// Render the significant-gene heatmap; an empty table is skipped with a warning.
///
/// Returns whether a file was written.
pub fn write_heatmap<P: AsRef<Path>>(
    path: P,
    table: &AnnotatedExpression,
    classes: &ClassTable,
    params: &HeatmapParams,
) -> Result<bool> {
    if table.n_genes() == 0 {
        log::warn!("No significant genes to draw; heatmap skipped");
        return Ok(false);
    }
    let data = prepare_heatmap(table, classes, params)?;
    let svg = render_svg(&data, classes.groups(), params)?;
    write_text(path.as_ref(), |out| out.write_all(svg.as_bytes()))?;
    log::info!("Heatmap of {} genes written to {}", data.values.nrows(), path.as_ref().display());
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn fixture() -> (AnnotatedExpression, ClassTable) {
        let table = AnnotatedExpression {
            names: vec!["UP1".to_string(), "DOWN".to_string(), "UP2".to_string(), "FLAT".to_string()],
            descriptions: vec![String::new(); 4],
            sample_headers: vec!["s1".to_string(), "s2".to_string(), "s3".to_string(), "s4".to_string()],
            values: array![
                [1.0, 2.0, 8.0, 9.0],
                [9.0, 8.0, 2.0, 1.0],
                [2.0, 2.5, 7.0, 9.5],
                [5.0, 5.0, 5.0, 5.0]
            ],
        };
        let classes = ClassTable::new(
            table.sample_headers.clone(),
            vec!["A".to_string(), "A".to_string(), "B".to_string(), "B".to_string()],
        )
        .unwrap();
        (table, classes)
    }

    #[test]
    fn test_prepare_has_no_exact_zeros() {
        let (table, classes) = fixture();
        let data = prepare_heatmap(&table, &classes, &HeatmapParams::default()).unwrap();
        assert_eq!(data.values.dim(), (4, 4));
        assert!(data.values.iter().all(|&v| v != 0.0));
        let pos = |name: &str| data.row_labels.iter().position(|l| l == name).unwrap();
        assert_eq!((pos("UP1") as i64 - pos("UP2") as i64).abs(), 1);
        assert_eq!(data.column_classes, vec!["A", "A", "B", "B"]);
    }

    #[test]
    fn test_diverging_color_endpoints() {
        assert_eq!(diverging_color(0.0, 3.0), RGBColor(247, 247, 247));
        assert_eq!(diverging_color(10.0, 3.0), RGBColor(178, 24, 43));
        assert_eq!(diverging_color(-3.0, 3.0), RGBColor(33, 102, 172));
    }

    #[test]
    fn test_write_heatmap_svg() {
        let (table, classes) = fixture();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("heatmap.svg");
        assert!(write_heatmap(&path, &table, &classes, &HeatmapParams::default()).unwrap());

        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("UP1"));
    }

    #[test]
    fn test_empty_table_skipped() {
        let (table, classes) = fixture();
        let empty = table.select_symbols(&[]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("heatmap.svg");
        assert!(!write_heatmap(&path, &empty, &classes, &HeatmapParams::default()).unwrap());
        assert!(!path.exists());
    }
}
