//! Tab-delimited reading and writing for count matrices and class tables

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use ndarray::{Array2, ArrayView2};

use crate::data::{ClassTable, CountMatrix};
use crate::error::{DegseaError, Result};

/// A header-bearing table whose first column holds row names.
///
/// `columns` names the data columns only. Tables written with row names
/// commonly omit the row-name header cell; both layouts are accepted.
struct RowNamedTable {
    columns: Vec<String>,
    row_names: Vec<String>,
    cells: Vec<Vec<String>>,
}

fn read_row_named_table(path: &Path, what: &str) -> Result<RowNamedTable> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut records = reader.records();
    let header: Vec<String> = match records.next() {
        Some(record) => record?.iter().map(|s| s.trim().to_string()).collect(),
        None => {
            return Err(DegseaError::EmptyData {
                reason: format!("Empty {} file: {}", what, path.display()),
            })
        }
    };

    let mut rows: Vec<Vec<String>> = Vec::new();
    for record in records {
        let record = record?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        rows.push(record.iter().map(|s| s.trim().to_string()).collect());
    }

    let width = rows.first().map(|r| r.len()).unwrap_or(header.len());
    let columns: Vec<String> = if header.len() + 1 == width {
        header
    } else if header.len() == width {
        header[1..].to_vec()
    } else {
        return Err(DegseaError::InvalidInput {
            reason: format!(
                "{} header has {} columns but rows have {}",
                what,
                header.len(),
                width
            ),
        });
    };

    let mut row_names = Vec::with_capacity(rows.len());
    let mut cells = Vec::with_capacity(rows.len());
    for (line, mut row) in rows.into_iter().enumerate() {
        if row.len() != columns.len() + 1 {
            return Err(DegseaError::InvalidInput {
                reason: format!(
                    "{} row {} has {} columns, expected {}",
                    what,
                    line + 2,
                    row.len(),
                    columns.len() + 1
                ),
            });
        }
        let rest = row.split_off(1);
        row_names.push(row.pop().unwrap_or_default());
        cells.push(rest);
    }

    Ok(RowNamedTable {
        columns,
        row_names,
        cells,
    })
}

/// Read a raw count matrix: gene identifiers in the first column, one column per sample
pub fn read_count_matrix<P: AsRef<Path>>(path: P) -> Result<CountMatrix> {
    let path = path.as_ref();
    let table = read_row_named_table(path, "count matrix").map_err(|e| match e {
        DegseaError::InvalidInput { reason } => DegseaError::InvalidCountMatrix { reason },
        other => other,
    })?;

    if table.columns.is_empty() {
        return Err(DegseaError::InvalidCountMatrix {
            reason: "Not enough columns in header".to_string(),
        });
    }
    if table.row_names.is_empty() {
        return Err(DegseaError::EmptyData {
            reason: "No genes found in count matrix".to_string(),
        });
    }

    let n_genes = table.row_names.len();
    let n_samples = table.columns.len();
    let mut counts = Array2::zeros((n_genes, n_samples));

    for (i, row) in table.cells.iter().enumerate() {
        for (j, value) in row.iter().enumerate() {
            counts[[i, j]] = value.parse::<f64>().map_err(|_| DegseaError::InvalidCountMatrix {
                reason: format!(
                    "Invalid count value '{}' for gene '{}', sample '{}'",
                    value, table.row_names[i], table.columns[j]
                ),
            })?;
        }
    }

    CountMatrix::new(counts, table.row_names, table.columns)
}

/// Read a class table: sample identifiers in the first column, labels in `label_column`
/// (or the first data column when `None`)
pub fn read_class_table<P: AsRef<Path>>(path: P, label_column: Option<&str>) -> Result<ClassTable> {
    let path = path.as_ref();
    let table = read_row_named_table(path, "class table").map_err(|e| match e {
        DegseaError::InvalidInput { reason } => DegseaError::InvalidClassTable { reason },
        other => other,
    })?;

    if table.row_names.is_empty() {
        return Err(DegseaError::EmptyData {
            reason: "No samples found in class table".to_string(),
        });
    }

    let col = match label_column {
        Some(name) => table.columns.iter().position(|c| c == name).ok_or_else(|| {
            DegseaError::InvalidClassTable {
                reason: format!(
                    "Label column '{}' not found (available: {})",
                    name,
                    table.columns.join(", ")
                ),
            }
        })?,
        None if table.columns.is_empty() => {
            return Err(DegseaError::InvalidClassTable {
                reason: "Class table needs a label column".to_string(),
            })
        }
        None => 0,
    };

    let labels: Vec<String> = table.cells.iter().map(|row| row[col].clone()).collect();
    ClassTable::new(table.row_names, labels)
}

/// Reorder a class table to the count matrix column order.
///
/// Any disagreement between the two sample sets is a [`DegseaError::DataMismatch`].
pub fn align_classes(counts: &CountMatrix, table: &ClassTable) -> Result<ClassTable> {
    let aligned = table.align_to(counts.sample_ids())?;
    log::debug!(
        "Aligned {} samples across {} groups",
        aligned.n_samples(),
        aligned.n_groups()
    );
    Ok(aligned)
}

/// Write a genes x samples matrix with a `gene_id` header cell
pub fn write_matrix<P: AsRef<Path>>(
    path: P,
    values: ArrayView2<f64>,
    gene_ids: &[String],
    sample_ids: &[String],
) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| DegseaError::write_failed(path, e))?;
    let mut out = BufWriter::new(file);

    let emit = |out: &mut BufWriter<File>| -> std::io::Result<()> {
        writeln!(out, "gene_id\t{}", sample_ids.join("\t"))?;
        for (i, gene_id) in gene_ids.iter().enumerate() {
            write!(out, "{}", gene_id)?;
            for value in values.row(i) {
                write!(out, "\t{}", value)?;
            }
            writeln!(out)?;
        }
        out.flush()
    };
    emit(&mut out).map_err(|e| DegseaError::write_failed(path, e))
}
