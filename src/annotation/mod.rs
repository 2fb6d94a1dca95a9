//! Gene symbol to description lookup

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{DegseaError, Result};

/// Source of human-readable gene descriptions
pub trait AnnotationSource: Send + Sync {
    fn name(&self) -> &str;

    /// Descriptions for the symbols that are known; unknown symbols are absent
    fn describe(&self, symbols: &[&str]) -> Result<HashMap<String, String>>;
}

/// Two-column tab-delimited table: symbol, description. First entry per symbol wins.
#[derive(Debug, Clone)]
pub struct TableAnnotation {
    path: PathBuf,
    entries: HashMap<String, String>,
}

impl TableAnnotation {
    /// Load a table with a header row
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .flexible(true)
            .from_path(path)?;

        let mut entries = HashMap::new();
        for record in reader.records() {
            let record = record?;
            let symbol = record.get(0).unwrap_or("").trim();
            if symbol.is_empty() {
                continue;
            }
            let description = record.get(1).unwrap_or("").trim();
            entries
                .entry(symbol.to_string())
                .or_insert_with(|| description.to_string());
        }
        log::info!("Loaded {} gene descriptions from {}", entries.len(), path.display());

        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl AnnotationSource for TableAnnotation {
    fn name(&self) -> &str {
        self.path.to_str().unwrap_or("annotation table")
    }

    fn describe(&self, symbols: &[&str]) -> Result<HashMap<String, String>> {
        Ok(symbols
            .iter()
            .filter_map(|s| self.entries.get(*s).map(|d| (s.to_string(), d.clone())))
            .collect())
    }
}

/// Annotation source that knows nothing; every description is left empty
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAnnotation;

impl AnnotationSource for NoAnnotation {
    fn name(&self) -> &str {
        "none"
    }

    fn describe(&self, _symbols: &[&str]) -> Result<HashMap<String, String>> {
        Ok(HashMap::new())
    }
}

/// Open `primary`, trying `fallback` once if it cannot be loaded.
///
/// With neither path given the pipeline runs without descriptions.
pub fn acquire_annotation(primary: Option<&Path>, fallback: Option<&Path>) -> Result<Box<dyn AnnotationSource>> {
    let primary = match primary {
        Some(p) => p,
        None => return Ok(Box::new(NoAnnotation)),
    };

    let first_error = match TableAnnotation::from_path(primary) {
        Ok(table) => return Ok(Box::new(table)),
        Err(e) => e,
    };

    if let Some(path) = fallback {
        log::warn!(
            "Annotation source {} unavailable ({}), trying {}",
            primary.display(),
            first_error,
            path.display()
        );
        match TableAnnotation::from_path(path) {
            Ok(table) => return Ok(Box::new(table)),
            Err(e) => {
                return Err(DegseaError::MissingDependency {
                    capability: "annotation source".to_string(),
                    reason: format!("{}: {}; fallback {}: {}", primary.display(), first_error, path.display(), e),
                })
            }
        }
    }

    Err(DegseaError::MissingDependency {
        capability: "annotation source".to_string(),
        reason: format!("{}: {}", primary.display(), first_error),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn table() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "symbol\tdescription").unwrap();
        writeln!(file, "TP53\ttumor protein p53").unwrap();
        writeln!(file, "TP53\tduplicate entry").unwrap();
        writeln!(file, "MYC\tMYC proto-oncogene").unwrap();
        file
    }

    #[test]
    fn test_first_entry_wins() {
        let file = table();
        let source = TableAnnotation::from_path(file.path()).unwrap();
        assert_eq!(source.len(), 2);
        let found = source.describe(&["TP53", "EGFR"]).unwrap();
        assert_eq!(found.get("TP53").map(String::as_str), Some("tumor protein p53"));
        assert!(!found.contains_key("EGFR"));
    }

    #[test]
    fn test_fallback_then_missing_dependency() {
        let file = table();
        let missing = Path::new("/nonexistent/annotation.tsv");

        let source = acquire_annotation(Some(missing), Some(file.path())).unwrap();
        assert_eq!(source.describe(&["MYC"]).unwrap().len(), 1);

        let err = acquire_annotation(Some(missing), Some(missing)).err().unwrap();
        assert!(matches!(err, DegseaError::MissingDependency { .. }));
        let err = acquire_annotation(Some(missing), None).err().unwrap();
        assert!(matches!(err, DegseaError::MissingDependency { .. }));
    }

    #[test]
    fn test_no_annotation() {
        let source = acquire_annotation(None, None).unwrap();
        assert_eq!(source.name(), "none");
        assert!(source.describe(&["TP53"]).unwrap().is_empty());
    }
}
