//! Design matrices for the group-means model

use ndarray::{Array2, ArrayView2};

use crate::data::ClassTable;
use crate::error::{DegseaError, Result};

/// Group-means design (`~0 + group`): one indicator column per group,
/// columns in group enumeration order
pub fn group_design(classes: &ClassTable) -> Result<Array2<f64>> {
    let n_samples = classes.n_samples();
    let n_groups = classes.n_groups();
    if n_groups < 2 {
        return Err(DegseaError::InvalidDesignMatrix {
            reason: format!(
                "At least two groups are needed for testing, found {}",
                n_groups
            ),
        });
    }

    let mut design = Array2::zeros((n_samples, n_groups));
    for (i, label) in classes.labels().iter().enumerate() {
        let j = classes.group_index(label).ok_or_else(|| DegseaError::InvalidDesignMatrix {
            reason: format!("Label '{}' is not an enumerated group", label),
        })?;
        design[[i, j]] = 1.0;
    }

    check_full_rank(design.view())?;
    Ok(design)
}

/// Reject designs with empty columns or no residual degrees of freedom
pub fn check_full_rank(design: ArrayView2<f64>) -> Result<()> {
    let (n, p) = design.dim();
    if n == 0 || p == 0 {
        return Err(DegseaError::InvalidDesignMatrix {
            reason: "Design matrix has zero rows or columns".to_string(),
        });
    }
    if let Some(j) = (0..p).find(|&j| design.column(j).iter().all(|&v| v == 0.0)) {
        return Err(DegseaError::InvalidDesignMatrix {
            reason: format!("Column {} of the design matrix has no samples", j),
        });
    }
    if n <= p {
        log::warn!(
            "Design has {} samples for {} coefficients; no residual degrees of freedom",
            n,
            p
        );
    }
    Ok(())
}

/// Orthonormal basis (k x (k-1)) of the complement of a contrast vector.
///
/// Gram-Schmidt over the normalized contrast followed by the unit vectors.
pub fn contrast_null_basis(contrast: &[f64]) -> Result<Array2<f64>> {
    let k = contrast.len();
    let norm = contrast.iter().map(|c| c * c).sum::<f64>().sqrt();
    if norm == 0.0 || !norm.is_finite() {
        return Err(DegseaError::InvalidContrast {
            reason: "Contrast vector is zero".to_string(),
        });
    }

    let mut basis: Vec<Vec<f64>> = vec![contrast.iter().map(|c| c / norm).collect()];
    for e in 0..k {
        if basis.len() == k {
            break;
        }
        let mut v = vec![0.0; k];
        v[e] = 1.0;
        for b in &basis {
            let dot: f64 = v.iter().zip(b).map(|(x, y)| x * y).sum();
            for (x, y) in v.iter_mut().zip(b) {
                *x -= dot * y;
            }
        }
        let len = v.iter().map(|x| x * x).sum::<f64>().sqrt();
        if len > 1e-8 {
            basis.push(v.into_iter().map(|x| x / len).collect());
        }
    }

    let mut null = Array2::zeros((k, k - 1));
    for (col, b) in basis.iter().skip(1).enumerate() {
        for (row, &x) in b.iter().enumerate() {
            null[[row, col]] = x;
        }
    }
    Ok(null)
}

/// Design of the model constrained to `contrast' beta = 0`
pub fn reduced_design(design: ArrayView2<f64>, contrast: &[f64]) -> Result<Array2<f64>> {
    if contrast.len() != design.ncols() {
        return Err(DegseaError::DimensionMismatch {
            expected: format!("{} contrast weights", design.ncols()),
            got: format!("{} contrast weights", contrast.len()),
        });
    }
    let null = contrast_null_basis(contrast)?;
    Ok(design.dot(&null))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classes() -> ClassTable {
        let ids = ["s1", "s2", "s3", "s4", "s5"].iter().map(|s| s.to_string()).collect();
        let labels = ["b", "a", "c", "a", "b"].iter().map(|s| s.to_string()).collect();
        ClassTable::new(ids, labels).unwrap()
    }

    #[test]
    fn test_group_design_indicators() {
        let design = group_design(&classes()).unwrap();
        assert_eq!(design.dim(), (5, 3));
        assert_eq!(design.row(0).to_vec(), vec![0.0, 1.0, 0.0]);
        assert_eq!(design.row(1).to_vec(), vec![1.0, 0.0, 0.0]);
        assert_eq!(design.row(2).to_vec(), vec![0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_single_group_rejected() {
        let table = ClassTable::new(
            vec!["s1".to_string(), "s2".to_string()],
            vec!["a".to_string(), "a".to_string()],
        )
        .unwrap();
        assert!(matches!(
            group_design(&table),
            Err(DegseaError::InvalidDesignMatrix { .. })
        ));
    }

    #[test]
    fn test_null_basis_orthogonal_to_contrast() {
        let c = [1.0, -1.0 / 3.0, -1.0 / 3.0, -1.0 / 3.0];
        let null = contrast_null_basis(&c).unwrap();
        assert_eq!(null.dim(), (4, 3));
        for col in null.columns() {
            let dot: f64 = col.iter().zip(&c).map(|(x, y)| x * y).sum();
            assert!(dot.abs() < 1e-12);
            let len: f64 = col.iter().map(|x| x * x).sum();
            assert!((len - 1.0).abs() < 1e-12);
        }
        let cross: f64 = null.column(0).iter().zip(null.column(1).iter()).map(|(x, y)| x * y).sum();
        assert!(cross.abs() < 1e-12);
    }

    #[test]
    fn test_reduced_design_for_pairwise() {
        let design = group_design(&classes()).unwrap();
        let reduced = reduced_design(design.view(), &[1.0, -1.0, 0.0]).unwrap();
        assert_eq!(reduced.dim(), (5, 2));
        // Groups a and b share every reduced column value
        assert!((reduced.row(0).to_vec()[0] - reduced.row(1).to_vec()[0]).abs() < 1e-12);
        assert!((reduced.row(0).to_vec()[1] - reduced.row(1).to_vec()[1]).abs() < 1e-12);
    }
}
