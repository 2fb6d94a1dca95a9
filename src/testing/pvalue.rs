//! P-value calculation from test statistics

use statrs::distribution::{ChiSquared, ContinuousCDF};

use crate::error::{DegseaError, Result};

/// Upper-tail chi-squared probabilities; negative or non-finite statistics give NaN
pub fn chisq_pvalues(stats: &[f64], df: f64) -> Result<Vec<f64>> {
    let chi2 = ChiSquared::new(df).map_err(|e| DegseaError::InvalidInput {
        reason: format!("Invalid degrees of freedom {}: {}", df, e),
    })?;
    Ok(stats
        .iter()
        .map(|&s| if s.is_finite() && s >= 0.0 { chi2.sf(s) } else { f64::NAN })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chisq_one_df() {
        let p = chisq_pvalues(&[0.0, 3.841458820694124, f64::NAN], 1.0).unwrap();
        assert!((p[0] - 1.0).abs() < 1e-12);
        assert!((p[1] - 0.05).abs() < 1e-8);
        assert!(p[2].is_nan());
    }

    #[test]
    fn test_huge_statistic_underflows_to_zero() {
        let p = chisq_pvalues(&[5000.0], 1.0).unwrap();
        assert!(p[0] >= 0.0 && p[0] < 1e-300);
    }

    #[test]
    fn test_invalid_df() {
        assert!(chisq_pvalues(&[1.0], 0.0).is_err());
    }
}
