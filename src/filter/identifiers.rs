//! Removal of rows without a curated gene symbol

use crate::data::{is_unannotated, CountMatrix};
use crate::error::Result;

/// Drop rows whose identifier contains `?` or starts with `LOC`
pub fn filter_unannotated(counts: &CountMatrix) -> Result<CountMatrix> {
    let keep: Vec<usize> = counts
        .gene_ids()
        .iter()
        .enumerate()
        .filter(|(_, id)| !is_unannotated(id))
        .map(|(i, _)| i)
        .collect();
    counts.subset_genes(&keep)
}
