//! Generalized Linear Model fitting for negative binomial data

mod design;
mod fitting;
mod linalg;
mod negative_binomial;

pub use design::{check_full_rank, contrast_null_basis, group_design, reduced_design};
pub use fitting::{fit_gene, fit_genes, log_likelihood, GeneFit, GlmFitParams};
pub use linalg::{log_determinant, solve_symmetric_system, weighted_cross_product};
pub use negative_binomial::{nb_log_likelihood, nb_mean, nb_weight, MAX_ETA, MIN_MU};
