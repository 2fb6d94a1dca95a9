//! Dispersion estimation for negative binomial models

mod common;
mod tagwise;

pub use common::{estimate_common_dispersion, mean_adjusted_profile_likelihood};
pub use tagwise::estimate_tagwise_dispersions;

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

use crate::error::{DegseaError, Result};
use crate::glm::GlmFitParams;

/// Configurable parameters for dispersion estimation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispersionParams {
    /// Search interval for the common dispersion
    pub common_min: f64,
    pub common_max: f64,
    /// Genes below this total count are left out of the common estimate
    pub min_row_sum: f64,
    /// Prior degrees of freedom of the empirical Bayes shrinkage
    pub prior_df: f64,
    /// Half-width of the tagwise grid, in log2 units around the common value
    pub grid_span: f64,
    pub grid_step: f64,
    /// Bounds on tagwise dispersions
    pub tagwise_min: f64,
    pub tagwise_max: f64,
    /// Golden-section tolerance on log dispersion
    pub tol: f64,
}

impl Default for DispersionParams {
    fn default() -> Self {
        Self {
            common_min: 1e-4,
            common_max: 4.0,
            min_row_sum: 5.0,
            prior_df: 10.0,
            grid_span: 4.0,
            grid_step: 0.5,
            tagwise_min: 1e-8,
            tagwise_max: 10.0,
            tol: 1e-5,
        }
    }
}

/// Common and per-gene dispersions of one count matrix
#[derive(Debug, Clone)]
pub struct DispersionEstimate {
    pub common: f64,
    pub tagwise: Vec<f64>,
}

/// Estimate the common dispersion, then shrink per-gene estimates towards it
pub fn estimate_dispersions(
    counts: ArrayView2<f64>,
    design: ArrayView2<f64>,
    library_sizes: &[f64],
    params: &DispersionParams,
    glm: &GlmFitParams,
) -> Result<DispersionEstimate> {
    if design.nrows() <= design.ncols() {
        return Err(DegseaError::InvalidInput {
            reason: format!(
                "{} samples for {} groups leaves no replicates for dispersion estimation",
                design.nrows(),
                design.ncols()
            ),
        });
    }

    let common = estimate_common_dispersion(counts, design, library_sizes, params, glm)?;
    log::info!("Common dispersion: {:.4} (BCV {:.3})", common, common.sqrt());

    let tagwise = estimate_tagwise_dispersions(counts, design, library_sizes, common, params, glm)?;
    Ok(DispersionEstimate { common, tagwise })
}
