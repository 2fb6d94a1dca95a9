//! Flat-file outputs for downstream enrichment tools

mod cls;
mod expression;
mod gene_list;
mod ranks;
mod results_table;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{DegseaError, Result};

pub use cls::{cls_content, write_cls};
pub use expression::{annotate_expression, write_expression_table, AnnotatedExpression};
pub use gene_list::write_significant_genes;
pub use ranks::{format_score, rank_score, write_rank_file};
pub use results_table::{format_pvalue, write_results_table};

pub const EXPRESSION_FILE: &str = "expression_annotated.txt";
pub const CLS_FILE: &str = "classes.cls";
pub const HEATMAP_FILE: &str = "heatmap.svg";

/// Paths of the per-contrast outputs inside `dir`
pub fn contrast_paths(dir: &Path, contrast: &str) -> (PathBuf, PathBuf, PathBuf) {
    (
        dir.join(format!("{}_allsignificantgenes.txt", contrast)),
        dir.join(format!("{}_ranks.rnk", contrast)),
        dir.join(format!("{}_results.tsv", contrast)),
    )
}

/// Create `path` and run `body` on a buffered writer; I/O failures become
/// [`DegseaError::FormatWrite`]
pub(crate) fn write_text<F>(path: &Path, body: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> std::io::Result<()>,
{
    let file = File::create(path).map_err(|e| DegseaError::write_failed(path, e))?;
    let mut out = BufWriter::new(file);
    body(&mut out)
        .and_then(|_| out.flush())
        .map_err(|e| DegseaError::write_failed(path, e))?;
    log::debug!("Wrote {}", path.display());
    Ok(())
}
