//! Likelihood ratio test of one contrast against the shared full-model fit

use ndarray::ArrayView2;
use rayon::prelude::*;

use super::fdr::benjamini_hochberg;
use super::pvalue::chisq_pvalues;
use crate::error::{DegseaError, Result};
use crate::glm::{fit_gene, reduced_design, GeneFit, GlmFitParams};
use crate::io::{Contrast, ContrastResult};

/// Everything a contrast needs from the shared per-gene fits
pub struct FullModel<'a> {
    pub counts: ArrayView2<'a, f64>,
    pub design: ArrayView2<'a, f64>,
    pub library_sizes: &'a [f64],
    pub dispersions: &'a [f64],
    pub fits: &'a [GeneFit],
    pub gene_ids: &'a [String],
    pub log_cpm: &'a [f64],
}

/// Test `contrast' beta = 0` for every gene.
///
/// The reduced model is refit per gene at the same dispersion as the full
/// model; LR = 2 (loglik_full - loglik_reduced) on one degree of freedom.
pub fn contrast_lrt(model: &FullModel<'_>, contrast: &Contrast, glm: &GlmFitParams) -> Result<ContrastResult> {
    let n_genes = model.counts.nrows();
    if model.fits.len() != n_genes || model.dispersions.len() != n_genes {
        return Err(DegseaError::DimensionMismatch {
            expected: format!("{} gene fits", n_genes),
            got: format!("{} gene fits", model.fits.len()),
        });
    }

    let reduced = reduced_design(model.design, &contrast.weights)?;

    let per_gene: Vec<(f64, f64)> = (0..n_genes)
        .into_par_iter()
        .map(|g| {
            let full = &model.fits[g];
            if full.coefficients.iter().any(|b| !b.is_finite()) || !full.log_likelihood.is_finite() {
                return (f64::NAN, f64::NAN);
            }
            let null_fit = fit_gene(
                model.counts.row(g),
                reduced.view(),
                model.library_sizes,
                model.dispersions[g],
                glm,
            );
            let lr = (2.0 * (full.log_likelihood - null_fit.log_likelihood)).max(0.0);
            let lfc = full
                .coefficients
                .iter()
                .zip(&contrast.weights)
                .map(|(b, c)| b * c)
                .sum::<f64>()
                / std::f64::consts::LN_2;
            (lr, lfc)
        })
        .collect();

    let mut result = ContrastResult::new(model.gene_ids.to_vec(), contrast.clone());
    result.lr_stat = per_gene.iter().map(|r| r.0).collect();
    result.log2_fold_changes = per_gene.iter().map(|r| r.1).collect();
    result.log_cpm = model.log_cpm.to_vec();
    result.pvalues = chisq_pvalues(&result.lr_stat, 1.0)?;
    result.padj = benjamini_hochberg(&result.pvalues);

    log::debug!(
        "{}: {} genes with p < 0.05",
        contrast.name,
        result.pvalues.iter().filter(|&&p| p < 0.05).count()
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glm::fit_genes;
    use ndarray::array;

    #[test]
    fn test_shifted_gene_is_significant() {
        let counts = array![
            [100.0, 110.0, 95.0, 400.0, 420.0, 390.0],
            [200.0, 190.0, 210.0, 205.0, 195.0, 200.0]
        ];
        let design = array![[1.0, 0.0], [1.0, 0.0], [1.0, 0.0], [0.0, 1.0], [0.0, 1.0], [0.0, 1.0]];
        let libs = [1e4; 6];
        let disp = [0.01, 0.01];
        let glm = GlmFitParams::default();
        let fits = fit_genes(counts.view(), design.view(), &libs, &disp, &glm);
        let ids = vec!["UP|1".to_string(), "FLAT|2".to_string()];
        let lcpm = vec![0.0, 0.0];

        let model = FullModel {
            counts: counts.view(),
            design: design.view(),
            library_sizes: &libs,
            dispersions: &disp,
            fits: &fits,
            gene_ids: &ids,
            log_cpm: &lcpm,
        };
        let contrast = Contrast {
            name: "B_vs_A".to_string(),
            groups: vec!["A".to_string(), "B".to_string()],
            weights: vec![-1.0, 1.0],
        };
        let res = contrast_lrt(&model, &contrast, &glm).unwrap();

        assert!((res.log2_fold_changes[0] - 2.0).abs() < 0.05);
        assert!(res.pvalues[0] < 1e-6);
        assert!(res.pvalues[1] > 0.5);
        assert!(res.padj[0] <= res.padj[1]);
        assert!(res.lr_stat.iter().all(|&s| s >= 0.0));
    }
}
