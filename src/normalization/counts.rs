//! Normalized expression values over effective library sizes

use ndarray::{Array1, Array2, ArrayView2, Axis};

use crate::error::{DegseaError, Result};

/// Counts per million over effective (TMM-scaled) library sizes
pub fn normalized_cpm(counts: ArrayView2<f64>, effective_library_sizes: &[f64]) -> Result<Array2<f64>> {
    let n_samples = counts.ncols();
    if effective_library_sizes.len() != n_samples {
        return Err(DegseaError::DimensionMismatch {
            expected: format!("{} library sizes", n_samples),
            got: format!("{} library sizes", effective_library_sizes.len()),
        });
    }

    let mut result = counts.to_owned();
    for (mut col, &lib) in result.axis_iter_mut(Axis(1)).zip(effective_library_sizes) {
        if lib > 0.0 {
            col.mapv_inplace(|x| x * 1e6 / lib);
        } else {
            col.fill(0.0);
        }
    }
    Ok(result)
}

/// Log2 of the mean normalized CPM per gene
pub fn average_log_cpm(counts: ArrayView2<f64>, effective_library_sizes: &[f64]) -> Result<Array1<f64>> {
    let values = normalized_cpm(counts, effective_library_sizes)?;
    Ok(values
        .axis_iter(Axis(0))
        .map(|row| row.mean().unwrap_or(0.0).log2())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_normalized_cpm() {
        let counts = array![[10.0, 30.0], [90.0, 70.0]];
        let values = normalized_cpm(counts.view(), &[100.0, 200.0]).unwrap();
        assert!((values[[0, 0]] - 100_000.0).abs() < 1e-6);
        assert!((values[[0, 1]] - 150_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_average_log_cpm() {
        let counts = array![[1.0, 3.0]];
        let lcpm = average_log_cpm(counts.view(), &[1e6, 1e6]).unwrap();
        assert!((lcpm[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_library_length_mismatch() {
        let counts = array![[1.0, 3.0]];
        assert!(normalized_cpm(counts.view(), &[1.0]).is_err());
    }
}
