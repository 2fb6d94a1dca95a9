//! Gene filtering ahead of differential expression testing

mod cpm;
mod identifiers;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::data::CountMatrix;
use crate::error::{DegseaError, Result};

pub use cpm::{cpm, cpm_passing_rows, filter_by_cpm};
pub use identifiers::filter_unannotated;

/// Parameters for gene filtering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterParams {
    /// CPM a gene must exceed (strictly)
    pub cpm_threshold: f64,
    /// Samples in which the threshold must be exceeded
    pub min_samples: usize,
    /// Drop `?` and `LOC…` identifiers
    pub drop_unannotated: bool,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            cpm_threshold: 1.0,
            min_samples: 50,
            drop_unannotated: true,
        }
    }
}

/// Row counts before and after each filtering rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSummary {
    pub input_genes: usize,
    pub dropped_low_expression: usize,
    pub dropped_unannotated: usize,
    pub kept_genes: usize,
}

impl fmt::Display for FilterSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Input genes: {}", self.input_genes)?;
        writeln!(f, "  Dropped (low expression): {}", self.dropped_low_expression)?;
        writeln!(f, "  Dropped (unannotated): {}", self.dropped_unannotated)?;
        writeln!(f, "Kept genes: {}", self.kept_genes)
    }
}

/// Apply the CPM filter, then the identifier filter.
///
/// CPM is computed over the full input library sizes, so the expression
/// rule does not depend on which unannotated rows are present.
pub fn filter_genes(counts: &CountMatrix, params: &FilterParams) -> Result<(CountMatrix, FilterSummary)> {
    let input_genes = counts.n_genes();
    let expressed = filter_by_cpm(counts, params.cpm_threshold, params.min_samples)?;
    let after_cpm = expressed.n_genes();

    let kept = if params.drop_unannotated {
        filter_unannotated(&expressed)?
    } else {
        expressed
    };

    let summary = FilterSummary {
        input_genes,
        dropped_low_expression: input_genes - after_cpm,
        dropped_unannotated: after_cpm - kept.n_genes(),
        kept_genes: kept.n_genes(),
    };
    log::info!(
        "Filtering kept {} of {} genes ({} low expression, {} unannotated)",
        summary.kept_genes,
        summary.input_genes,
        summary.dropped_low_expression,
        summary.dropped_unannotated
    );

    if kept.n_genes() == 0 {
        return Err(DegseaError::EmptyData {
            reason: format!(
                "No genes left after filtering (CPM > {} in at least {} samples)",
                params.cpm_threshold, params.min_samples
            ),
        });
    }

    Ok((kept, summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn matrix() -> CountMatrix {
        let counts = array![
            [100.0, 200.0, 150.0],
            [0.0, 0.0, 1.0],
            [500.0, 400.0, 450.0],
            [300.0, 300.0, 300.0]
        ];
        let ids = vec![
            "TP53|7157".to_string(),
            "RARE|1".to_string(),
            "LOC100|100".to_string(),
            "MYC|4609".to_string(),
        ];
        let samples = vec!["s1".to_string(), "s2".to_string(), "s3".to_string()];
        CountMatrix::new(counts, ids, samples).unwrap()
    }

    #[test]
    fn test_filter_genes_summary() {
        let params = FilterParams {
            min_samples: 2,
            ..Default::default()
        };
        let (kept, summary) = filter_genes(&matrix(), &params).unwrap();
        assert_eq!(kept.gene_ids(), &["TP53|7157".to_string(), "MYC|4609".to_string()]);
        assert_eq!(
            summary,
            FilterSummary {
                input_genes: 4,
                dropped_low_expression: 1,
                dropped_unannotated: 1,
                kept_genes: 2,
            }
        );
    }

    #[test]
    fn test_kept_rows_pass_threshold() {
        let params = FilterParams {
            cpm_threshold: 100_000.0,
            min_samples: 2,
            ..Default::default()
        };
        let input = matrix();
        let (kept, _) = filter_genes(&input, &params).unwrap();
        let values = cpm(input.counts());
        for id in kept.gene_ids() {
            let row = input.gene_ids().iter().position(|g| g == id).unwrap();
            let passing = values.row(row).iter().filter(|&&v| v > 100_000.0).count();
            assert!(passing >= 2);
        }
    }

    #[test]
    fn test_nothing_left_is_empty_data() {
        let params = FilterParams {
            cpm_threshold: 1e7,
            min_samples: 1,
            ..Default::default()
        };
        let err = filter_genes(&matrix(), &params).unwrap_err();
        assert!(matches!(err, DegseaError::EmptyData { .. }));
    }
}
