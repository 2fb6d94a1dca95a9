//! Input/Output: delimited tables, run protocol and per-contrast results

mod delimited;
mod protocol;
mod results;

pub use delimited::{align_classes, read_class_table, read_count_matrix, write_matrix};
pub use protocol::{HeatmapConfig, Protocol};
pub use results::{Contrast, ContrastResult, ContrastSpec, ResultsSummary};
