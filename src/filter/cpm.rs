//! Counts-per-million expression filter

use ndarray::{Array2, ArrayView2, Axis};

use crate::data::CountMatrix;
use crate::error::Result;

/// Counts per million over raw column totals.
///
/// A column that sums to zero yields zero CPM throughout.
pub fn cpm(counts: ArrayView2<f64>) -> Array2<f64> {
    let totals: Vec<f64> = counts.axis_iter(Axis(1)).map(|col| col.sum()).collect();
    let mut result = counts.to_owned();
    for (j, mut col) in result.axis_iter_mut(Axis(1)).enumerate() {
        let total = totals[j];
        if total > 0.0 {
            col.mapv_inplace(|x| x * 1e6 / total);
        } else {
            col.fill(0.0);
        }
    }
    result
}

/// Row indices whose CPM is strictly above `threshold` in at least `min_samples` samples
pub fn cpm_passing_rows(counts: ArrayView2<f64>, threshold: f64, min_samples: usize) -> Vec<usize> {
    let values = cpm(counts);
    values
        .axis_iter(Axis(0))
        .enumerate()
        .filter(|(_, row)| row.iter().filter(|&&v| v > threshold).count() >= min_samples)
        .map(|(i, _)| i)
        .collect()
}

/// Keep genes expressed above `threshold` CPM in at least `min_samples` samples
pub fn filter_by_cpm(counts: &CountMatrix, threshold: f64, min_samples: usize) -> Result<CountMatrix> {
    if min_samples > counts.n_samples() {
        log::warn!(
            "min_samples ({}) exceeds the number of samples ({}); no gene can pass",
            min_samples,
            counts.n_samples()
        );
    }
    let keep = cpm_passing_rows(counts.counts(), threshold, min_samples);
    counts.subset_genes(&keep)
}
