//! Statistical testing for differential expression

mod backend;
mod fdr;
mod lrt;
mod pvalue;

pub use backend::NegativeBinomialLrt;
pub use fdr::benjamini_hochberg;
pub use lrt::{contrast_lrt, FullModel};
pub use pvalue::chisq_pvalues;

use crate::data::{ClassTable, CountMatrix};
use crate::dispersion::DispersionParams;
use crate::error::{DegseaError, Result};
use crate::io::{Contrast, ContrastResult};

/// A differential expression engine.
///
/// Implementations normalize, estimate dispersion once for the full group
/// structure and return one result per contrast, in contrast order.
pub trait DifferentialExpression: Send + Sync {
    fn name(&self) -> &str;

    /// Library sizes after normalization, one per sample
    fn effective_library_sizes(&self, counts: &CountMatrix) -> Result<Vec<f64>>;

    fn test(&self, counts: &CountMatrix, classes: &ClassTable, contrasts: &[Contrast]) -> Result<Vec<ContrastResult>>;
}

/// Names accepted by [`acquire_backend`]
pub const BACKENDS: &[&str] = &[NegativeBinomialLrt::NAME];

fn backend_by_name(name: &str, dispersion: &DispersionParams) -> Option<Box<dyn DifferentialExpression>> {
    match name {
        NegativeBinomialLrt::NAME => Some(Box::new(NegativeBinomialLrt::new(dispersion.clone()))),
        _ => None,
    }
}

/// Look up a backend by name, trying `fallback` once when `primary` is unavailable
pub fn acquire_backend(
    primary: &str,
    fallback: Option<&str>,
    dispersion: &DispersionParams,
) -> Result<Box<dyn DifferentialExpression>> {
    if let Some(backend) = backend_by_name(primary, dispersion) {
        return Ok(backend);
    }
    if let Some(name) = fallback {
        log::warn!("Statistics backend '{}' unavailable, trying '{}'", primary, name);
        if let Some(backend) = backend_by_name(name, dispersion) {
            return Ok(backend);
        }
    }
    Err(DegseaError::MissingDependency {
        capability: "statistics backend".to_string(),
        reason: format!(
            "'{}'{} not available (known: {})",
            primary,
            fallback.map(|f| format!(" and fallback '{}'", f)).unwrap_or_default(),
            BACKENDS.join(", ")
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_builtin() {
        let backend = acquire_backend("nb-lrt", None, &DispersionParams::default()).unwrap();
        assert_eq!(backend.name(), "nb-lrt");
    }

    #[test]
    fn test_acquire_uses_fallback_once() {
        let backend = acquire_backend("deseq2", Some("nb-lrt"), &DispersionParams::default()).unwrap();
        assert_eq!(backend.name(), "nb-lrt");
    }

    #[test]
    fn test_missing_backend() {
        let err = acquire_backend("edger", Some("limma"), &DispersionParams::default())
            .err()
            .unwrap();
        match err {
            DegseaError::MissingDependency { capability, reason } => {
                assert_eq!(capability, "statistics backend");
                assert!(reason.contains("limma"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
