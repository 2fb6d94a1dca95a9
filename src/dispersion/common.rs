//! Common dispersion by maximizing the mean Cox-Reid adjusted profile likelihood

use ndarray::{ArrayView2, Axis};
use rayon::prelude::*;

use super::DispersionParams;
use crate::error::{DegseaError, Result};
use crate::glm::{fit_gene, GlmFitParams};

/// Mean over genes of the adjusted profile likelihood at dispersion `phi`
pub fn mean_adjusted_profile_likelihood(
    counts: ArrayView2<f64>,
    design: ArrayView2<f64>,
    library_sizes: &[f64],
    phi: f64,
    glm: &GlmFitParams,
) -> f64 {
    let total: f64 = (0..counts.nrows())
        .into_par_iter()
        .map(|g| {
            fit_gene(counts.row(g), design, library_sizes, phi, glm).adjusted_profile_likelihood(design, phi)
        })
        .sum();
    total / counts.nrows() as f64
}

/// Golden-section search for the maximum of `f` on `[lo, hi]`
pub(super) fn golden_section_max<F: Fn(f64) -> f64>(f: F, mut lo: f64, mut hi: f64, tol: f64) -> f64 {
    let ratio = (5f64.sqrt() - 1.0) / 2.0;
    let mut x1 = hi - ratio * (hi - lo);
    let mut x2 = lo + ratio * (hi - lo);
    let mut f1 = f(x1);
    let mut f2 = f(x2);

    while (hi - lo).abs() > tol {
        if f1 < f2 {
            lo = x1;
            x1 = x2;
            f1 = f2;
            x2 = lo + ratio * (hi - lo);
            f2 = f(x2);
        } else {
            hi = x2;
            x2 = x1;
            f2 = f1;
            x1 = hi - ratio * (hi - lo);
            f1 = f(x1);
        }
    }
    0.5 * (lo + hi)
}

/// Common dispersion of all genes with enough counts
pub fn estimate_common_dispersion(
    counts: ArrayView2<f64>,
    design: ArrayView2<f64>,
    library_sizes: &[f64],
    params: &DispersionParams,
    glm: &GlmFitParams,
) -> Result<f64> {
    if counts.nrows() == 0 {
        return Err(DegseaError::EmptyData {
            reason: "No genes to estimate dispersion from".to_string(),
        });
    }
    if !(params.common_min > 0.0 && params.common_min < params.common_max) {
        return Err(DegseaError::InvalidInput {
            reason: format!(
                "Invalid common dispersion interval [{}, {}]",
                params.common_min, params.common_max
            ),
        });
    }

    let keep: Vec<usize> = counts
        .axis_iter(Axis(0))
        .enumerate()
        .filter(|(_, row)| row.sum() >= params.min_row_sum)
        .map(|(i, _)| i)
        .collect();
    let selected = if keep.is_empty() {
        log::warn!(
            "No gene has at least {} counts; using all genes for the common dispersion",
            params.min_row_sum
        );
        counts.to_owned()
    } else {
        counts.select(Axis(0), &keep)
    };
    log::debug!("Common dispersion from {} genes", selected.nrows());

    let objective = |log_phi: f64| {
        mean_adjusted_profile_likelihood(selected.view(), design, library_sizes, log_phi.exp(), glm)
    };
    let log_phi = golden_section_max(objective, params.common_min.ln(), params.common_max.ln(), params.tol);

    let common = log_phi.exp();
    if !common.is_finite() {
        return Err(DegseaError::NumericalInstability {
            operation: "common dispersion".to_string(),
            details: format!("estimate is {}", common),
        });
    }
    Ok(common)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn design() -> ndarray::Array2<f64> {
        array![[1.0, 0.0], [1.0, 0.0], [1.0, 0.0], [0.0, 1.0], [0.0, 1.0], [0.0, 1.0]]
    }

    #[test]
    fn test_golden_section_finds_parabola_peak() {
        let x = golden_section_max(|x| -(x - 1.3) * (x - 1.3), -5.0, 5.0, 1e-8);
        assert!((x - 1.3).abs() < 1e-6);
    }

    #[test]
    fn test_noisy_replicates_give_larger_dispersion() {
        let libs = [1e4; 6];
        let params = DispersionParams::default();
        let glm = GlmFitParams::default();

        let tight = array![
            [100.0, 102.0, 98.0, 200.0, 198.0, 202.0],
            [50.0, 51.0, 49.0, 80.0, 81.0, 79.0]
        ];
        let noisy = array![
            [40.0, 180.0, 80.0, 400.0, 90.0, 160.0],
            [20.0, 100.0, 35.0, 30.0, 190.0, 60.0]
        ];

        let low = estimate_common_dispersion(tight.view(), design().view(), &libs, &params, &glm).unwrap();
        let high = estimate_common_dispersion(noisy.view(), design().view(), &libs, &params, &glm).unwrap();
        assert!(low < 0.01, "tight replicates gave {}", low);
        assert!(high > 0.1, "noisy replicates gave {}", high);
        assert!(low >= params.common_min * 0.99 && high <= params.common_max * 1.01);
    }
}
