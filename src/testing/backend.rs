//! Built-in negative binomial likelihood-ratio backend

use serde::{Deserialize, Serialize};

use super::lrt::{contrast_lrt, FullModel};
use super::DifferentialExpression;
use crate::data::{ClassTable, CountMatrix};
use crate::dispersion::{estimate_dispersions, DispersionParams};
use crate::error::{DegseaError, Result};
use crate::glm::{fit_genes, group_design, GlmFitParams};
use crate::io::{Contrast, ContrastResult};
use crate::normalization::{average_log_cpm, tmm_factors, TmmParams};

/// TMM normalization, Cox-Reid common and empirical Bayes tagwise
/// dispersion, group-means NB GLM and one likelihood ratio test per contrast
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NegativeBinomialLrt {
    pub tmm: TmmParams,
    pub dispersion: DispersionParams,
    pub glm: GlmFitParams,
}

impl NegativeBinomialLrt {
    pub const NAME: &'static str = "nb-lrt";

    pub fn new(dispersion: DispersionParams) -> Self {
        Self {
            dispersion,
            ..Default::default()
        }
    }
}

fn check_contrast(contrast: &Contrast, classes: &ClassTable) -> Result<()> {
    if contrast.groups != classes.groups() || contrast.weights.len() != classes.n_groups() {
        return Err(DegseaError::InvalidContrast {
            reason: format!(
                "Contrast '{}' was resolved against groups {:?}, data has {:?}",
                contrast.name,
                contrast.groups,
                classes.groups()
            ),
        });
    }
    Ok(())
}

impl DifferentialExpression for NegativeBinomialLrt {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn effective_library_sizes(&self, counts: &CountMatrix) -> Result<Vec<f64>> {
        Ok(tmm_factors(counts.counts(), &self.tmm)?.effective_library_sizes())
    }

    fn test(&self, counts: &CountMatrix, classes: &ClassTable, contrasts: &[Contrast]) -> Result<Vec<ContrastResult>> {
        if counts.sample_ids() != classes.sample_ids() {
            return Err(DegseaError::DataMismatch {
                reason: "Class table is not aligned to the count matrix columns".to_string(),
            });
        }
        for contrast in contrasts {
            check_contrast(contrast, classes)?;
        }

        let libs = self.effective_library_sizes(counts)?;
        let design = group_design(classes)?;

        log::info!("Estimating dispersions for {} genes", counts.n_genes());
        let dispersion = estimate_dispersions(counts.counts(), design.view(), &libs, &self.dispersion, &self.glm)?;

        log::info!("Fitting group-means model");
        let fits = fit_genes(counts.counts(), design.view(), &libs, &dispersion.tagwise, &self.glm);
        let log_cpm = average_log_cpm(counts.counts(), &libs)?.to_vec();

        let model = FullModel {
            counts: counts.counts(),
            design: design.view(),
            library_sizes: &libs,
            dispersions: &dispersion.tagwise,
            fits: &fits,
            gene_ids: counts.gene_ids(),
            log_cpm: &log_cpm,
        };

        contrasts
            .iter()
            .map(|contrast| {
                log::info!("Testing contrast {}", contrast);
                contrast_lrt(&model, contrast, &self.glm)
            })
            .collect()
    }
}
