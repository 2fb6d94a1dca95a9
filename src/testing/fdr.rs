//! P-value adjustment for multiple testing

/// Benjamini-Hochberg FDR correction.
///
/// Non-finite p-values are left out of the family and come back as NaN.
pub fn benjamini_hochberg(pvalues: &[f64]) -> Vec<f64> {
    let n = pvalues.len();
    let mut indices: Vec<usize> = (0..n).filter(|&i| pvalues[i].is_finite()).collect();
    let m = indices.len();
    let mut padj = vec![f64::NAN; n];
    if m == 0 {
        return padj;
    }

    indices.sort_by(|&a, &b| pvalues[a].total_cmp(&pvalues[b]));

    let mut cummin = f64::INFINITY;
    for (rank0, &i) in indices.iter().enumerate().rev() {
        let adj = (pvalues[i] * m as f64 / (rank0 + 1) as f64).min(1.0);
        cummin = cummin.min(adj);
        padj[i] = cummin;
    }
    padj
}
