//! Sample class labels

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{DegseaError, Result};

/// Mapping from sample identifier to a categorical class label.
///
/// `groups` is the enumeration order of the distinct labels. It drives the
/// column order of the design matrix and the header line of `.cls` files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassTable {
    sample_ids: Vec<String>,
    labels: Vec<String>,
    groups: Vec<String>,
}

impl ClassTable {
    /// Create a class table; groups are enumerated in sorted order
    pub fn new(sample_ids: Vec<String>, labels: Vec<String>) -> Result<Self> {
        if sample_ids.len() != labels.len() {
            return Err(DegseaError::DimensionMismatch {
                expected: format!("{} labels", sample_ids.len()),
                got: format!("{} labels", labels.len()),
            });
        }

        let mut seen = HashSet::new();
        for id in &sample_ids {
            if !seen.insert(id.as_str()) {
                return Err(DegseaError::DataMismatch {
                    reason: format!("Sample '{}' has more than one class label", id),
                });
            }
        }

        if let Some(pos) = labels.iter().position(|l| l.is_empty()) {
            return Err(DegseaError::DataMismatch {
                reason: format!("Sample '{}' has no class label", sample_ids[pos]),
            });
        }

        let mut groups: Vec<String> = labels.clone();
        groups.sort();
        groups.dedup();

        Ok(Self {
            sample_ids,
            labels,
            groups,
        })
    }

    /// Replace the group enumeration order.
    ///
    /// `order` must name every label present exactly once and nothing else.
    pub fn with_group_order(mut self, order: &[String]) -> Result<Self> {
        let present: HashSet<&str> = self.groups.iter().map(|s| s.as_str()).collect();
        let requested: HashSet<&str> = order.iter().map(|s| s.as_str()).collect();

        if requested.len() != order.len() {
            return Err(DegseaError::InvalidClassTable {
                reason: format!("Group order {:?} repeats a group", order),
            });
        }
        if present != requested {
            let mut missing: Vec<&str> = present.difference(&requested).copied().collect();
            let mut unknown: Vec<&str> = requested.difference(&present).copied().collect();
            missing.sort_unstable();
            unknown.sort_unstable();
            return Err(DegseaError::InvalidClassTable {
                reason: format!(
                    "Group order does not match the class labels (missing: {:?}, unknown: {:?})",
                    missing, unknown
                ),
            });
        }

        self.groups = order.to_vec();
        Ok(self)
    }

    /// Reorder to follow `sample_ids` (the count matrix column order).
    ///
    /// Fails with [`DegseaError::DataMismatch`] when the two sample sets differ.
    pub fn align_to(&self, sample_ids: &[String]) -> Result<Self> {
        let index: HashMap<&str, usize> = self
            .sample_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();

        let missing_in_classes: Vec<&str> = sample_ids
            .iter()
            .filter(|id| !index.contains_key(id.as_str()))
            .map(|s| s.as_str())
            .collect();
        let wanted: HashSet<&str> = sample_ids.iter().map(|s| s.as_str()).collect();
        let missing_in_counts: Vec<&str> = self
            .sample_ids
            .iter()
            .filter(|id| !wanted.contains(id.as_str()))
            .map(|s| s.as_str())
            .collect();

        if !missing_in_classes.is_empty() || !missing_in_counts.is_empty() || wanted.len() != sample_ids.len() {
            let mut msg = String::from("Sample IDs do not match between counts and class table.");
            if !missing_in_classes.is_empty() {
                msg.push_str(&format!(" In counts but not class table: {:?}.", missing_in_classes));
            }
            if !missing_in_counts.is_empty() {
                msg.push_str(&format!(" In class table but not counts: {:?}.", missing_in_counts));
            }
            if wanted.len() != sample_ids.len() {
                msg.push_str(" Count matrix repeats a sample ID.");
            }
            return Err(DegseaError::DataMismatch { reason: msg });
        }

        let labels: Vec<String> = sample_ids
            .iter()
            .map(|id| self.labels[index[id.as_str()]].clone())
            .collect();

        Ok(Self {
            sample_ids: sample_ids.to_vec(),
            labels,
            groups: self.groups.clone(),
        })
    }

    /// Get sample IDs
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Class label per sample, in sample order
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Distinct labels in enumeration order
    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    pub fn n_groups(&self) -> usize {
        self.groups.len()
    }

    /// Position of a group in the enumeration order
    pub fn group_index(&self, group: &str) -> Option<usize> {
        self.groups.iter().position(|g| g == group)
    }

    /// Number of samples per group, in enumeration order
    pub fn group_sizes(&self) -> Vec<usize> {
        self.groups
            .iter()
            .map(|g| self.labels.iter().filter(|l| *l == g).count())
            .collect()
    }
}
