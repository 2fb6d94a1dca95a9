//! Heatmap of significant genes for visual QC

mod cluster;
mod heatmap;

pub use cluster::{average_linkage_order, correlation_distance, replace_zeros, zscore_rows};
pub use heatmap::{prepare_heatmap, render_svg, write_heatmap, HeatmapData, HeatmapParams};
