//! Trimmed mean of M-values (TMM) normalization factors

use ndarray::{ArrayView2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{DegseaError, Result};

/// Parameters for TMM factor estimation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmmParams {
    /// Fraction of M-values trimmed from each tail
    pub trim_m: f64,
    /// Fraction of A-values trimmed from each tail
    pub trim_a: f64,
    /// Reference sample (upper-quartile rule when None)
    pub reference: Option<usize>,
}

impl Default for TmmParams {
    fn default() -> Self {
        Self {
            trim_m: 0.3,
            trim_a: 0.05,
            reference: None,
        }
    }
}

/// Library sizes with their TMM scaling factors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormFactors {
    pub library_sizes: Vec<f64>,
    /// Scaling factors, geometric mean 1
    pub factors: Vec<f64>,
    pub reference: usize,
}

impl NormFactors {
    /// Library size times normalization factor, per sample
    pub fn effective_library_sizes(&self) -> Vec<f64> {
        self.library_sizes
            .iter()
            .zip(&self.factors)
            .map(|(&lib, &f)| lib * f)
            .collect()
    }
}

/// Estimate TMM factors for a genes x samples count matrix
pub fn tmm_factors(counts: ArrayView2<f64>, params: &TmmParams) -> Result<NormFactors> {
    let (n_genes, n_samples) = counts.dim();
    if n_genes == 0 || n_samples == 0 {
        return Err(DegseaError::EmptyData {
            reason: "Cannot normalize an empty count matrix".to_string(),
        });
    }
    for (name, trim) in [("trim_m", params.trim_m), ("trim_a", params.trim_a)] {
        if !(0.0..0.5).contains(&trim) {
            return Err(DegseaError::InvalidInput {
                reason: format!("{} must be in [0, 0.5), got {}", name, trim),
            });
        }
    }

    let library_sizes: Vec<f64> = counts.axis_iter(Axis(1)).map(|c| c.sum()).collect();
    if let Some(j) = library_sizes.iter().position(|&l| l <= 0.0) {
        return Err(DegseaError::NumericalInstability {
            operation: "TMM normalization".to_string(),
            details: format!("sample {} has zero total counts", j),
        });
    }

    let reference = match params.reference {
        Some(r) if r >= n_samples => {
            return Err(DegseaError::InvalidInput {
                reason: format!("Reference sample {} out of range ({} samples)", r, n_samples),
            })
        }
        Some(r) => r,
        None => select_reference(counts, &library_sizes),
    };

    let raw: Vec<f64> = (0..n_samples)
        .into_par_iter()
        .map(|j| {
            if j == reference {
                1.0
            } else {
                tmm_factor(counts, j, reference, &library_sizes, params)
            }
        })
        .collect();

    // Rescale so the factors multiply to one
    let log_mean = raw.iter().map(|f| f.ln()).sum::<f64>() / n_samples as f64;
    let scale = log_mean.exp();
    let factors: Vec<f64> = raw.iter().map(|f| f / scale).collect();

    log::debug!("TMM reference sample {}, factors {:?}", reference, factors);

    Ok(NormFactors {
        library_sizes,
        factors,
        reference,
    })
}

/// 75th percentile (type 7) of a sorted slice
fn upper_quartile(sorted: &[f64]) -> f64 {
    let h = (sorted.len() - 1) as f64 * 0.75;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
}

/// Sample whose upper-quartile proportion is closest to the mean of all samples
fn select_reference(counts: ArrayView2<f64>, library_sizes: &[f64]) -> usize {
    let quartiles: Vec<f64> = counts
        .axis_iter(Axis(1))
        .zip(library_sizes)
        .map(|(col, &lib)| {
            let mut props: Vec<f64> = col.iter().map(|&c| c / lib).collect();
            props.sort_by(|a, b| a.total_cmp(b));
            upper_quartile(&props)
        })
        .collect();

    let mean = quartiles.iter().sum::<f64>() / quartiles.len() as f64;
    quartiles
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| (*a - mean).abs().total_cmp(&(*b - mean).abs()))
        .map(|(j, _)| j)
        .unwrap_or(0)
}

/// Precision-weighted trimmed mean of log ratios between one sample and the reference
fn tmm_factor(
    counts: ArrayView2<f64>,
    sample: usize,
    reference: usize,
    library_sizes: &[f64],
    params: &TmmParams,
) -> f64 {
    let n_obs = library_sizes[sample];
    let n_ref = library_sizes[reference];

    // (M, A, weight) for genes observed in both samples
    let values: Vec<(f64, f64, f64)> = counts
        .axis_iter(Axis(0))
        .filter_map(|row| {
            let y_obs = row[sample];
            let y_ref = row[reference];
            if y_obs <= 0.0 || y_ref <= 0.0 {
                return None;
            }
            let p_obs = y_obs / n_obs;
            let p_ref = y_ref / n_ref;
            let m = (p_obs / p_ref).log2();
            let a = 0.5 * (p_obs * p_ref).log2();
            let var = (n_obs - y_obs) / (n_obs * y_obs) + (n_ref - y_ref) / (n_ref * y_ref);
            (m.is_finite() && a.is_finite() && var > 0.0).then_some((m, a, 1.0 / var))
        })
        .collect();

    let n = values.len();
    if n == 0 {
        return 1.0;
    }

    let lo_m = (n as f64 * params.trim_m).floor() as usize;
    let hi_m = n - lo_m;
    let lo_a = (n as f64 * params.trim_a).floor() as usize;
    let hi_a = n - lo_a;

    // Rank on each axis; keep genes inside both trimmed windows
    let mut by_m: Vec<usize> = (0..n).collect();
    by_m.sort_by(|&x, &y| values[x].0.total_cmp(&values[y].0));
    let mut by_a: Vec<usize> = (0..n).collect();
    by_a.sort_by(|&x, &y| values[x].1.total_cmp(&values[y].1));

    let mut rank_m = vec![0usize; n];
    let mut rank_a = vec![0usize; n];
    for (r, &i) in by_m.iter().enumerate() {
        rank_m[i] = r;
    }
    for (r, &i) in by_a.iter().enumerate() {
        rank_a[i] = r;
    }

    let mut sum_wm = 0.0;
    let mut sum_w = 0.0;
    for (i, &(m, _, w)) in values.iter().enumerate() {
        if (lo_m..hi_m).contains(&rank_m[i]) && (lo_a..hi_a).contains(&rank_a[i]) {
            sum_wm += w * m;
            sum_w += w;
        }
    }

    if sum_w <= 0.0 {
        1.0
    } else {
        2f64.powf(sum_wm / sum_w)
    }
}
