//! Run protocol: the policy constants of one analysis, loadable from JSON

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::results::ContrastSpec;
use crate::dispersion::DispersionParams;
use crate::error::Result;
use crate::filter::FilterParams;
use crate::visualize::HeatmapParams;

/// Heatmap section of the protocol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatmapConfig {
    pub enabled: bool,
    /// Contrast whose significant genes are drawn (first contrast when unset)
    pub contrast: Option<String>,
    /// Replacement for exact zeros after row scaling
    pub epsilon: f64,
    /// Gene labels are drawn only up to this many rows
    pub max_labeled_rows: usize,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            contrast: None,
            epsilon: 1e-6,
            max_labeled_rows: 100,
        }
    }
}

/// Analysis protocol.
///
/// Every field has a default, so a protocol file only needs the keys it
/// changes. Command-line flags are applied on top of the loaded values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Protocol {
    /// CPM a gene must exceed (strictly) in enough samples
    pub cpm_threshold: f64,
    /// Number of samples that must pass the CPM threshold
    pub min_samples: usize,
    /// FDR cutoff for the significant-gene lists (strict)
    pub alpha: f64,
    /// Class table column holding the labels (first data column when unset)
    pub label_column: Option<String>,
    /// Group enumeration order (sorted labels when empty)
    pub group_order: Vec<String>,
    /// Contrasts to test (default set when empty)
    pub contrasts: Vec<ContrastSpec>,
    /// Sample headers of the expression table are cut to this many characters
    pub sample_id_width: usize,
    pub backend: String,
    pub backend_fallback: Option<String>,
    /// Two-column symbol/description table
    pub annotation: Option<PathBuf>,
    pub annotation_fallback: Option<PathBuf>,
    pub dispersion: DispersionParams,
    pub heatmap: HeatmapConfig,
}

impl Default for Protocol {
    fn default() -> Self {
        Self {
            cpm_threshold: 1.0,
            min_samples: 50,
            alpha: 0.05,
            label_column: None,
            group_order: Vec::new(),
            contrasts: Vec::new(),
            sample_id_width: 12,
            backend: "nb-lrt".to_string(),
            backend_fallback: None,
            annotation: None,
            annotation_fallback: None,
            dispersion: DispersionParams::default(),
            heatmap: HeatmapConfig::default(),
        }
    }
}

impl Protocol {
    /// Load a protocol from a JSON file; missing keys keep their defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let protocol: Protocol = serde_json::from_reader(BufReader::new(file))?;
        log::debug!("Loaded protocol from {}", path.as_ref().display());
        Ok(protocol)
    }

    /// Contrasts to run for the given group enumeration
    pub fn contrast_specs(&self, groups: &[String]) -> Vec<ContrastSpec> {
        if self.contrasts.is_empty() {
            ContrastSpec::default_set(groups)
        } else {
            self.contrasts.clone()
        }
    }

    pub fn filter_params(&self) -> FilterParams {
        FilterParams {
            cpm_threshold: self.cpm_threshold,
            min_samples: self.min_samples,
            ..Default::default()
        }
    }

    pub fn heatmap_params(&self, title: &str) -> HeatmapParams {
        HeatmapParams {
            epsilon: self.heatmap.epsilon,
            max_labeled_rows: self.heatmap.max_labeled_rows,
            title: title.to_string(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let p = Protocol::default();
        assert_eq!(p.cpm_threshold, 1.0);
        assert_eq!(p.min_samples, 50);
        assert_eq!(p.alpha, 0.05);
        assert_eq!(p.sample_id_width, 12);
        assert_eq!(p.backend, "nb-lrt");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"min_samples": 3, "contrasts": ["unused"], "heatmap": {{"enabled": true}}}}"#
        )
        .unwrap();
        // contrasts must be objects; a bare string is rejected
        assert!(Protocol::from_json_file(file.path()).is_err());

        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"min_samples": 3, "contrasts": [{{"one_vs_rest": {{"group": "A"}}}}], "heatmap": {{"enabled": true}}}}"#
        )
        .unwrap();
        let p = Protocol::from_json_file(file.path()).unwrap();
        assert_eq!(p.min_samples, 3);
        assert_eq!(p.cpm_threshold, 1.0);
        assert!(p.heatmap.enabled);
        assert_eq!(p.heatmap.max_labeled_rows, 100);
        assert_eq!(p.contrasts, vec![ContrastSpec::one_vs_rest("A")]);
    }

    #[test]
    fn test_contrast_specs_default_set() {
        let groups = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert_eq!(Protocol::default().contrast_specs(&groups).len(), 4);
    }

    #[test]
    fn test_filter_params_follow_protocol() {
        let p = Protocol {
            cpm_threshold: 2.5,
            min_samples: 3,
            ..Default::default()
        };
        let params = p.filter_params();
        assert_eq!(params.cpm_threshold, 2.5);
        assert_eq!(params.min_samples, 3);
        assert!(params.drop_unannotated);
    }
}
