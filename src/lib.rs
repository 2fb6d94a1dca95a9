//! rust_degsea: negative binomial differential expression for class-labelled RNA-seq
//!
//! The pipeline loads a count matrix and a class table, filters low-expression
//! and unannotated genes, tests every requested contrast through a
//! [`testing::DifferentialExpression`] backend and writes flat files for
//! enrichment tools (significant-gene lists, `.rnk` rank files, an annotated
//! expression table and a `.cls` file), plus an optional clustered heatmap.
//!
//! # Example
//!
//! ```ignore
//! use rust_degsea::prelude::*;
//!
//! let protocol = Protocol::from_json_file("protocol.json")?;
//! let inputs = RunInputs::new("counts.tsv", "classes.tsv", "out");
//! let report = run_pipeline(&inputs, &protocol)?;
//! for summary in &report.contrasts {
//!     println!("{}", summary);
//! }
//! ```

pub mod annotation;
pub mod cli;
pub mod data;
pub mod dispersion;
pub mod error;
pub mod export;
pub mod filter;
pub mod glm;
pub mod io;
pub mod normalization;
pub mod testing;
pub mod visualize;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::annotation::{acquire_annotation, AnnotationSource, NoAnnotation, TableAnnotation};
    pub use crate::data::{gene_symbol, ClassTable, CountMatrix, GeneId};
    pub use crate::dispersion::{estimate_dispersions, DispersionParams};
    pub use crate::error::{DegseaError, Result};
    pub use crate::export::{
        annotate_expression, write_cls, write_expression_table, write_rank_file, write_results_table,
        write_significant_genes,
    };
    pub use crate::filter::{filter_genes, FilterParams, FilterSummary};
    pub use crate::glm::GlmFitParams;
    pub use crate::io::{
        align_classes, read_class_table, read_count_matrix, Contrast, ContrastResult, ContrastSpec, Protocol,
        ResultsSummary,
    };
    pub use crate::normalization::{tmm_factors, TmmParams};
    pub use crate::testing::{acquire_backend, benjamini_hochberg, DifferentialExpression};
    pub use crate::visualize::{write_heatmap, HeatmapParams};
    pub use crate::{load_inputs, resolve_contrasts, run_pipeline, RunInputs, RunReport};
}

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use prelude::*;

/// Input files and output directory of one run
#[derive(Debug, Clone)]
pub struct RunInputs {
    pub counts: PathBuf,
    pub classes: PathBuf,
    pub output_dir: PathBuf,
}

impl RunInputs {
    pub fn new<P: Into<PathBuf>>(counts: P, classes: P, output_dir: P) -> Self {
        Self {
            counts: counts.into(),
            classes: classes.into(),
            output_dir: output_dir.into(),
        }
    }
}

/// What a completed run produced
#[derive(Debug, Clone)]
pub struct RunReport {
    pub filter: FilterSummary,
    pub backend: String,
    pub contrasts: Vec<ResultsSummary>,
    /// Every file written, in write order
    pub outputs: Vec<PathBuf>,
}

/// Read the count matrix and class table, apply the group order and align
/// the classes to the count columns
pub fn load_inputs(counts: &Path, classes: &Path, protocol: &Protocol) -> Result<(CountMatrix, ClassTable)> {
    let matrix = read_count_matrix(counts)?;
    log::info!(
        "Loaded {} genes x {} samples from {}",
        matrix.n_genes(),
        matrix.n_samples(),
        counts.display()
    );
    for (sample, size) in matrix.sample_ids().iter().zip(matrix.library_sizes()) {
        log::debug!("  {}: {} reads", sample, size);
    }

    let mut table = read_class_table(classes, protocol.label_column.as_deref())?;
    if !protocol.group_order.is_empty() {
        table = table.with_group_order(&protocol.group_order)?;
    }
    let table = align_classes(&matrix, &table)?;
    let sizes: Vec<String> = table
        .groups()
        .iter()
        .zip(table.group_sizes())
        .map(|(g, n)| format!("{} ({})", g, n))
        .collect();
    log::info!("Classes: {}", sizes.join(", "));

    Ok((matrix, table))
}

/// Resolve the protocol's contrasts against the class table.
///
/// Contrast names become file names, so two contrasts with the same name
/// are rejected.
pub fn resolve_contrasts(protocol: &Protocol, classes: &ClassTable) -> Result<Vec<Contrast>> {
    let specs = protocol.contrast_specs(classes.groups());
    if specs.is_empty() {
        return Err(DegseaError::InvalidContrast {
            reason: format!("Nothing to compare: only one group ({})", classes.groups().join(", ")),
        });
    }

    let contrasts = specs
        .iter()
        .map(|spec| spec.resolve(classes))
        .collect::<Result<Vec<_>>>()?;

    let mut names = HashSet::new();
    for contrast in &contrasts {
        if !names.insert(contrast.name.as_str()) {
            return Err(DegseaError::InvalidContrast {
                reason: format!("Contrast name '{}' is used twice", contrast.name),
            });
        }
        log::debug!("Contrast {}", contrast);
    }
    Ok(contrasts)
}

fn heatmap_contrast(protocol: &Protocol, contrasts: &[Contrast]) -> Result<Option<usize>> {
    if !protocol.heatmap.enabled {
        return Ok(None);
    }
    match &protocol.heatmap.contrast {
        None => Ok(Some(0)),
        Some(name) => contrasts
            .iter()
            .position(|c| &c.name == name)
            .map(Some)
            .ok_or_else(|| DegseaError::InvalidContrast {
                reason: format!("Heatmap contrast '{}' is not among the tested contrasts", name),
            }),
    }
}

fn create_output_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| DegseaError::write_failed(dir, e))
}

/// Run the complete pipeline: load, filter, test, export and optionally draw
pub fn run_pipeline(inputs: &RunInputs, protocol: &Protocol) -> Result<RunReport> {
    // Step 1: Load and align
    let (counts, classes) = load_inputs(&inputs.counts, &inputs.classes, protocol)?;

    // Step 2: Filter
    let (filtered, filter_summary) = filter_genes(&counts, &protocol.filter_params())?;

    // Step 3: Acquire capabilities before any output is written
    let contrasts = resolve_contrasts(protocol, &classes)?;
    let heatmap_index = heatmap_contrast(protocol, &contrasts)?;
    let backend = acquire_backend(
        &protocol.backend,
        protocol.backend_fallback.as_deref(),
        &protocol.dispersion,
    )?;
    let annotation = acquire_annotation(protocol.annotation.as_deref(), protocol.annotation_fallback.as_deref())?;
    log::info!(
        "Testing {} contrasts with backend '{}', annotation '{}'",
        contrasts.len(),
        backend.name(),
        annotation.name()
    );

    // Step 4: Test
    let results = backend.test(&filtered, &classes, &contrasts)?;

    // Step 5: Per-contrast exports
    create_output_dir(&inputs.output_dir)?;
    let mut outputs = Vec::new();
    let mut summaries = Vec::with_capacity(results.len());
    for result in &results {
        let (sig_path, rnk_path, table_path) = export::contrast_paths(&inputs.output_dir, &result.contrast.name);
        let n_sig = write_significant_genes(&sig_path, result, protocol.alpha)?;
        write_rank_file(&rnk_path, result)?;
        write_results_table(&table_path, result)?;
        log::debug!("{}: {} significant genes written", result.contrast.name, n_sig);
        outputs.extend([sig_path, rnk_path, table_path]);

        let summary = result.summary(protocol.alpha);
        log::info!("{}", summary.to_string().trim_end());
        summaries.push(summary);
    }

    // Step 6: Run-level exports
    let libs = backend.effective_library_sizes(&filtered)?;
    let expression = annotate_expression(&filtered, &libs, annotation.as_ref(), protocol.sample_id_width)?;
    let expression_path = inputs.output_dir.join(export::EXPRESSION_FILE);
    write_expression_table(&expression_path, &expression)?;
    outputs.push(expression_path);

    let cls_path = inputs.output_dir.join(export::CLS_FILE);
    write_cls(&cls_path, &classes)?;
    outputs.push(cls_path);

    // Step 7: Heatmap of one contrast's significant genes
    if let Some(idx) = heatmap_index {
        let result = &results[idx];
        let selected = expression.select_symbols(&result.significant_symbols(protocol.alpha));
        let heatmap_path = inputs.output_dir.join(export::HEATMAP_FILE);
        let params = protocol.heatmap_params(&result.contrast.name);
        if write_heatmap(&heatmap_path, &selected, &classes, &params)? {
            outputs.push(heatmap_path);
        }
    }

    Ok(RunReport {
        filter: filter_summary,
        backend: backend.name().to_string(),
        contrasts: summaries,
        outputs,
    })
}
