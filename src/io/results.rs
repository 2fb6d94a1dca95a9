//! Contrast specifications and per-contrast result tables

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::data::{gene_symbol, ClassTable};
use crate::error::{DegseaError, Result};

/// Contrast as written by the user, before it is checked against the class table.
///
/// Deserializes from JSON as `{"pairwise": {...}}`, `{"one_vs_rest": {...}}`
/// or `{"weights": {...}}`; parses from the CLI as `A-B` or `A-rest`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContrastSpec {
    /// numerator group minus denominator group
    Pairwise { numerator: String, denominator: String },
    /// one group minus the mean of all other groups
    OneVsRest { group: String },
    /// arbitrary linear combination of group means
    Weights {
        name: String,
        weights: BTreeMap<String, f64>,
    },
}

impl ContrastSpec {
    pub fn pairwise(numerator: &str, denominator: &str) -> Self {
        ContrastSpec::Pairwise {
            numerator: numerator.to_string(),
            denominator: denominator.to_string(),
        }
    }

    pub fn one_vs_rest(group: &str) -> Self {
        ContrastSpec::OneVsRest {
            group: group.to_string(),
        }
    }

    /// Default protocol: first group against the second, then each group
    /// against the rest when there are more than two groups
    pub fn default_set(groups: &[String]) -> Vec<ContrastSpec> {
        let mut specs = Vec::new();
        if groups.len() >= 2 {
            specs.push(ContrastSpec::pairwise(&groups[0], &groups[1]));
        }
        if groups.len() > 2 {
            specs.extend(groups.iter().map(|g| ContrastSpec::one_vs_rest(g)));
        }
        specs
    }

    /// Turn the specification into a weight vector over `classes.groups()`
    pub fn resolve(&self, classes: &ClassTable) -> Result<Contrast> {
        let groups = classes.groups();
        let k = groups.len();
        let lookup = |g: &str| {
            classes.group_index(g).ok_or_else(|| DegseaError::InvalidContrast {
                reason: format!("Unknown group '{}' (groups: {})", g, groups.join(", ")),
            })
        };

        let mut weights = vec![0.0; k];
        let name = match self {
            ContrastSpec::Pairwise {
                numerator,
                denominator,
            } => {
                if numerator == denominator {
                    return Err(DegseaError::InvalidContrast {
                        reason: format!("'{}' compared with itself", numerator),
                    });
                }
                weights[lookup(numerator)?] = 1.0;
                weights[lookup(denominator)?] = -1.0;
                format!("{}_vs_{}", numerator, denominator)
            }
            ContrastSpec::OneVsRest { group } => {
                if k < 2 {
                    return Err(DegseaError::InvalidContrast {
                        reason: "one-vs-rest needs at least two groups".to_string(),
                    });
                }
                let idx = lookup(group)?;
                let rest = -1.0 / (k - 1) as f64;
                for (j, w) in weights.iter_mut().enumerate() {
                    *w = if j == idx { 1.0 } else { rest };
                }
                format!("{}_vs_rest", group)
            }
            ContrastSpec::Weights { name, weights: map } => {
                for (group, &w) in map {
                    weights[lookup(group)?] = w;
                }
                name.clone()
            }
        };

        if weights.iter().all(|&w| w == 0.0) {
            return Err(DegseaError::InvalidContrast {
                reason: format!("Contrast '{}' has no non-zero weight", name),
            });
        }

        Ok(Contrast {
            name: sanitize_name(&name),
            groups: groups.to_vec(),
            weights,
        })
    }
}

impl FromStr for ContrastSpec {
    type Err = DegseaError;

    fn from_str(s: &str) -> Result<Self> {
        let (left, right) = s.split_once('-').ok_or_else(|| DegseaError::InvalidContrast {
            reason: format!("'{}' is not of the form A-B or A-rest", s),
        })?;
        let (left, right) = (left.trim(), right.trim());
        if left.is_empty() || right.is_empty() {
            return Err(DegseaError::InvalidContrast {
                reason: format!("'{}' is missing a group name", s),
            });
        }
        if right.eq_ignore_ascii_case("rest") {
            Ok(ContrastSpec::one_vs_rest(left))
        } else {
            Ok(ContrastSpec::pairwise(left, right))
        }
    }
}

/// Keep file-name friendly characters only
fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// A resolved contrast: one weight per group, in group enumeration order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contrast {
    pub name: String,
    pub groups: Vec<String>,
    pub weights: Vec<f64>,
}

impl fmt::Display for Contrast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let terms: Vec<String> = self
            .groups
            .iter()
            .zip(&self.weights)
            .filter(|(_, &w)| w != 0.0)
            .map(|(g, w)| format!("{:+.4}*{}", w, g))
            .collect();
        write!(f, "{} ({})", self.name, terms.join(" "))
    }
}

/// Differential expression results for one contrast
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContrastResult {
    /// Composite gene identifiers, in filtered-matrix order
    pub gene_ids: Vec<String>,
    /// Log2 fold change of the contrast
    pub log2_fold_changes: Vec<f64>,
    /// Average log2 counts per million
    pub log_cpm: Vec<f64>,
    /// Likelihood ratio statistic
    pub lr_stat: Vec<f64>,
    /// Raw p-values
    pub pvalues: Vec<f64>,
    /// Adjusted p-values (BH corrected)
    pub padj: Vec<f64>,
    pub contrast: Contrast,
}

impl ContrastResult {
    /// Create new empty results
    pub fn new(gene_ids: Vec<String>, contrast: Contrast) -> Self {
        let n = gene_ids.len();
        Self {
            gene_ids,
            log2_fold_changes: vec![f64::NAN; n],
            log_cpm: vec![f64::NAN; n],
            lr_stat: vec![f64::NAN; n],
            pvalues: vec![f64::NAN; n],
            padj: vec![f64::NAN; n],
            contrast,
        }
    }

    pub fn n_genes(&self) -> usize {
        self.gene_ids.len()
    }

    /// Composite identifiers of genes with FDR strictly below `alpha`
    pub fn significant_genes(&self, alpha: f64) -> Vec<&str> {
        self.gene_ids
            .iter()
            .zip(self.padj.iter())
            .filter(|(_, &p)| p.is_finite() && p < alpha)
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// Symbols of significant genes, duplicates kept
    pub fn significant_symbols(&self, alpha: f64) -> Vec<&str> {
        self.significant_genes(alpha)
            .into_iter()
            .map(gene_symbol)
            .collect()
    }

    pub fn summary(&self, alpha: f64) -> ResultsSummary {
        let tested = self.pvalues.iter().filter(|p| p.is_finite()).count();
        let mut up = 0;
        let mut down = 0;
        for (&p, &lfc) in self.padj.iter().zip(&self.log2_fold_changes) {
            if p.is_finite() && p < alpha {
                if lfc > 0.0 {
                    up += 1;
                } else if lfc < 0.0 {
                    down += 1;
                }
            }
        }

        ResultsSummary {
            contrast: self.contrast.name.clone(),
            total_genes: self.n_genes(),
            genes_tested: tested,
            significant: self.significant_genes(alpha).len(),
            upregulated: up,
            downregulated: down,
            alpha,
        }
    }
}

/// Counts of tested and significant genes for one contrast
#[derive(Debug, Clone)]
pub struct ResultsSummary {
    pub contrast: String,
    pub total_genes: usize,
    pub genes_tested: usize,
    pub significant: usize,
    pub upregulated: usize,
    pub downregulated: usize,
    pub alpha: f64,
}

impl fmt::Display for ResultsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Contrast: {}", self.contrast)?;
        writeln!(f, "  Total genes: {}", self.total_genes)?;
        writeln!(f, "  Genes tested: {}", self.genes_tested)?;
        writeln!(f, "  Significant (FDR < {}): {}", self.alpha, self.significant)?;
        writeln!(f, "    Up-regulated: {}", self.upregulated)?;
        writeln!(f, "    Down-regulated: {}", self.downregulated)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classes(groups: &[&str]) -> ClassTable {
        let ids: Vec<String> = (0..groups.len()).map(|i| format!("s{}", i)).collect();
        let labels: Vec<String> = groups.iter().map(|s| s.to_string()).collect();
        ClassTable::new(ids, labels).unwrap()
    }

    #[test]
    fn test_parse_contrast_text() {
        assert_eq!(
            "Mesenchymal-Immunoreactive".parse::<ContrastSpec>().unwrap(),
            ContrastSpec::pairwise("Mesenchymal", "Immunoreactive")
        );
        assert_eq!(
            "Mesenchymal-rest".parse::<ContrastSpec>().unwrap(),
            ContrastSpec::one_vs_rest("Mesenchymal")
        );
        assert!("Mesenchymal".parse::<ContrastSpec>().is_err());
        assert!("-rest".parse::<ContrastSpec>().is_err());
    }

    #[test]
    fn test_resolve_one_vs_rest() {
        let table = classes(&["A", "B", "C", "D"]);
        let contrast = ContrastSpec::one_vs_rest("B").resolve(&table).unwrap();
        assert_eq!(contrast.name, "B_vs_rest");
        let third = -1.0 / 3.0;
        assert_eq!(contrast.weights, vec![third, 1.0, third, third]);
        assert!(contrast.weights.iter().sum::<f64>().abs() < 1e-12);
    }

    #[test]
    fn test_resolve_unknown_group() {
        let table = classes(&["A", "B"]);
        let err = ContrastSpec::pairwise("A", "Z").resolve(&table).unwrap_err();
        assert!(matches!(err, DegseaError::InvalidContrast { .. }));
    }

    #[test]
    fn test_default_set_for_four_groups() {
        let groups: Vec<String> = ["A", "B", "C", "D"].iter().map(|s| s.to_string()).collect();
        let specs = ContrastSpec::default_set(&groups);
        assert_eq!(specs.len(), 5);
        assert_eq!(specs[0], ContrastSpec::pairwise("A", "B"));

        let two: Vec<String> = vec!["x".to_string(), "y".to_string()];
        assert_eq!(ContrastSpec::default_set(&two).len(), 1);
    }

    #[test]
    fn test_contrast_spec_json() {
        let json = r#"[{"pairwise": {"numerator": "A", "denominator": "B"}},
                       {"one_vs_rest": {"group": "C"}}]"#;
        let specs: Vec<ContrastSpec> = serde_json::from_str(json).unwrap();
        assert_eq!(specs[1], ContrastSpec::one_vs_rest("C"));
    }

    #[test]
    fn test_significant_symbols_strict() {
        let table = classes(&["A", "B"]);
        let contrast = ContrastSpec::pairwise("A", "B").resolve(&table).unwrap();
        let mut res = ContrastResult::new(
            vec!["TP53|7157".to_string(), "MYC|4609".to_string(), "EGFR|1956".to_string()],
            contrast,
        );
        res.padj = vec![0.01, 0.05, f64::NAN];
        res.log2_fold_changes = vec![1.0, -1.0, 0.0];
        assert_eq!(res.significant_symbols(0.05), vec!["TP53"]);
        assert_eq!(res.summary(0.05).upregulated, 1);
    }
}
