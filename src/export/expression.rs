//! Annotated normalized expression table

use std::collections::HashSet;
use std::io::Write;
use std::path::Path;

use ndarray::{Array2, Axis};

use super::write_text;
use crate::annotation::AnnotationSource;
use crate::data::CountMatrix;
use crate::error::{DegseaError, Result};
use crate::normalization::normalized_cpm;

/// Normalized expression keyed by gene symbol, with descriptions
#[derive(Debug, Clone)]
pub struct AnnotatedExpression {
    pub names: Vec<String>,
    pub descriptions: Vec<String>,
    /// Sample ids cut to the configured width
    pub sample_headers: Vec<String>,
    /// genes x samples CPM over effective library sizes
    pub values: Array2<f64>,
}

impl AnnotatedExpression {
    pub fn n_genes(&self) -> usize {
        self.names.len()
    }

    /// Rows whose symbol is in `symbols`, in table order
    pub fn select_symbols(&self, symbols: &[&str]) -> Self {
        let wanted: HashSet<&str> = symbols.iter().copied().collect();
        let keep: Vec<usize> = self
            .names
            .iter()
            .enumerate()
            .filter(|(_, n)| wanted.contains(n.as_str()))
            .map(|(i, _)| i)
            .collect();
        Self {
            names: keep.iter().map(|&i| self.names[i].clone()).collect(),
            descriptions: keep.iter().map(|&i| self.descriptions[i].clone()).collect(),
            sample_headers: self.sample_headers.clone(),
            values: self.values.select(Axis(0), &keep),
        }
    }
}

/// Build the expression table from filtered counts.
///
/// Unannotated identifiers are dropped. Descriptions are left-merged by
/// symbol: unmatched rows keep an empty description, matched rows are
/// deduplicated keeping the first occurrence.
pub fn annotate_expression(
    counts: &CountMatrix,
    effective_library_sizes: &[f64],
    source: &dyn AnnotationSource,
    sample_id_width: usize,
) -> Result<AnnotatedExpression> {
    if sample_id_width == 0 {
        return Err(DegseaError::InvalidInput {
            reason: "Sample id width must be at least 1".to_string(),
        });
    }
    let cpm = normalized_cpm(counts.counts(), effective_library_sizes)?;

    let candidates: Vec<(usize, &str)> = (0..counts.n_genes())
        .map(|i| (i, counts.gene_id(i)))
        .filter(|(_, id)| !id.is_unannotated())
        .map(|(i, id)| (i, id.symbol))
        .collect();

    let symbols: Vec<&str> = candidates.iter().map(|(_, s)| *s).collect();
    let descriptions = source.describe(&symbols)?;

    let mut seen = HashSet::new();
    let mut rows = Vec::with_capacity(candidates.len());
    let mut names = Vec::with_capacity(candidates.len());
    let mut descs = Vec::with_capacity(candidates.len());
    for (i, symbol) in candidates {
        match descriptions.get(symbol) {
            Some(desc) => {
                if !seen.insert(symbol) {
                    continue;
                }
                descs.push(desc.clone());
            }
            None => descs.push(String::new()),
        }
        rows.push(i);
        names.push(symbol.to_string());
    }

    log::info!(
        "Expression table: {} genes, {} with descriptions from {}",
        names.len(),
        seen.len(),
        source.name()
    );

    let sample_headers = counts
        .sample_ids()
        .iter()
        .map(|s| s.chars().take(sample_id_width).collect())
        .collect();

    Ok(AnnotatedExpression {
        names,
        descriptions: descs,
        sample_headers,
        values: cpm.select(Axis(0), &rows),
    })
}

/// Header `Name\tDescription\t<samples…>`, one row per gene
pub fn write_expression_table<P: AsRef<Path>>(path: P, table: &AnnotatedExpression) -> Result<()> {
    write_text(path.as_ref(), |out| {
        writeln!(out, "Name\tDescription\t{}", table.sample_headers.join("\t"))?;
        for (i, row) in table.values.axis_iter(Axis(0)).enumerate() {
            write!(out, "{}\t{}", table.names[i], table.descriptions[i])?;
            for v in row {
                write!(out, "\t{}", v)?;
            }
            writeln!(out)?;
        }
        Ok(())
    })
}
