//! Count matrix representation for RNA-seq data

use std::collections::HashMap;

use ndarray::{Array2, ArrayView2, Axis};

use super::gene_id::{GeneId, SEPARATOR};
use crate::error::{DegseaError, Result};

/// Suffix for the `n`th repeat of an identifier.
///
/// The suffix goes on the accession so the symbol survives: `TP53|7157`
/// becomes `TP53|7157_1` and a bare `TP53` becomes `TP53|_1`.
fn repeat_name(name: &str, n: usize) -> String {
    if name.contains(SEPARATOR) {
        format!("{}_{}", name, n)
    } else {
        format!("{}{}_{}", name, SEPARATOR, n)
    }
}

/// Deduplicate names by suffixing _1, _2, etc. to repeats
fn deduplicate_names(names: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    for name in &names {
        *seen.entry(name.clone()).or_insert(0) += 1;
    }
    if !seen.values().any(|&c| c > 1) {
        return names;
    }

    seen.clear();
    let mut result = Vec::with_capacity(names.len());
    for name in names {
        let count = seen.entry(name.clone()).or_insert(0);
        *count += 1;
        if *count == 1 {
            result.push(name);
        } else {
            let new_name = repeat_name(&name, *count - 1);
            log::warn!("Duplicate gene identifier '{}' renamed to '{}'", name, new_name);
            result.push(new_name);
        }
    }
    result
}

/// Raw read counts, genes in rows and samples in columns.
///
/// Gene identifiers are kept verbatim (composite `symbol|accession` strings);
/// use [`CountMatrix::gene_id`] for the parsed view.
#[derive(Debug, Clone)]
pub struct CountMatrix {
    counts: Array2<f64>,
    gene_ids: Vec<String>,
    sample_ids: Vec<String>,
}

impl CountMatrix {
    /// Create a new count matrix from raw data
    pub fn new(
        counts: Array2<f64>,
        gene_ids: Vec<String>,
        sample_ids: Vec<String>,
    ) -> Result<Self> {
        let (n_genes, n_samples) = counts.dim();

        if gene_ids.len() != n_genes {
            return Err(DegseaError::DimensionMismatch {
                expected: format!("{} gene IDs", n_genes),
                got: format!("{} gene IDs", gene_ids.len()),
            });
        }

        if sample_ids.len() != n_samples {
            return Err(DegseaError::DimensionMismatch {
                expected: format!("{} sample IDs", n_samples),
                got: format!("{} sample IDs", sample_ids.len()),
            });
        }

        if counts.iter().any(|&x| x < 0.0 || !x.is_finite()) {
            return Err(DegseaError::InvalidCountMatrix {
                reason: "Counts must be non-negative finite values".to_string(),
            });
        }

        // Expected counts from quantifiers are fractional; the NB model tolerates them
        if counts.iter().any(|&x| x != x.round()) {
            log::warn!(
                "Some count values are not integers. Non-integer counts are modelled as-is."
            );
        }

        let gene_ids = deduplicate_names(gene_ids);

        Ok(Self {
            counts,
            gene_ids,
            sample_ids,
        })
    }

    /// Get the number of genes
    pub fn n_genes(&self) -> usize {
        self.counts.nrows()
    }

    /// Get the number of samples
    pub fn n_samples(&self) -> usize {
        self.counts.ncols()
    }

    /// Get the raw counts as a view
    pub fn counts(&self) -> ArrayView2<'_, f64> {
        self.counts.view()
    }

    /// Get gene IDs
    pub fn gene_ids(&self) -> &[String] {
        &self.gene_ids
    }

    /// Parsed identifier of one gene row
    pub fn gene_id(&self, gene_idx: usize) -> GeneId<'_> {
        GeneId::parse(&self.gene_ids[gene_idx])
    }

    /// Get sample IDs
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Sum of counts per sample (library size)
    pub fn library_sizes(&self) -> Vec<f64> {
        self.counts
            .axis_iter(Axis(1))
            .map(|col| col.sum())
            .collect()
    }

    /// Subset to specific genes, keeping column order
    pub fn subset_genes(&self, gene_indices: &[usize]) -> Result<Self> {
        let new_counts = self.counts.select(Axis(0), gene_indices);
        let new_gene_ids: Vec<String> = gene_indices
            .iter()
            .map(|&i| self.gene_ids[i].clone())
            .collect();

        Ok(Self {
            counts: new_counts,
            gene_ids: new_gene_ids,
            sample_ids: self.sample_ids.clone(),
        })
    }
}
