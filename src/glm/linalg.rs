//! Small dense solvers for per-gene normal equations.
//!
//! Matrices are flat row-major `n x n` slices.

use ndarray::ArrayView2;

/// Lower Cholesky factor; non-positive pivots are floored at 1e-12
fn cholesky(a: &[f64], n: usize) -> Vec<f64> {
    let mut l = vec![0.0; n * n];
    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[i * n + j];
            for k in 0..j {
                sum -= l[i * n + k] * l[j * n + k];
            }
            if i == j {
                if sum <= 0.0 {
                    sum = 1e-12;
                }
                l[i * n + j] = sum.sqrt();
            } else {
                l[i * n + j] = sum / l[j * n + j];
            }
        }
    }
    l
}

/// Solve `A x = b` for symmetric positive (semi)definite `A`
pub fn solve_symmetric_system(a: &[f64], b: &[f64], n: usize) -> Vec<f64> {
    let l = cholesky(a, n);

    let mut y = vec![0.0; n];
    for i in 0..n {
        let mut sum = b[i];
        for j in 0..i {
            sum -= l[i * n + j] * y[j];
        }
        y[i] = sum / l[i * n + i];
    }

    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = y[i];
        for j in (i + 1)..n {
            sum -= l[j * n + i] * x[j];
        }
        x[i] = sum / l[i * n + i];
    }
    x
}

/// Log determinant of a symmetric positive definite matrix
pub fn log_determinant(a: &[f64], n: usize) -> f64 {
    let l = cholesky(a, n);
    (0..n).map(|i| 2.0 * l[i * n + i].ln()).sum()
}

/// X'WX as a flat row-major matrix
pub fn weighted_cross_product(design: ArrayView2<f64>, weights: &[f64]) -> Vec<f64> {
    let p = design.ncols();
    let mut xtwx = vec![0.0; p * p];
    for (i, row) in design.outer_iter().enumerate() {
        let w = weights[i];
        for j in 0..p {
            let wx = w * row[j];
            for k in 0..=j {
                xtwx[j * p + k] += wx * row[k];
            }
        }
    }
    for j in 0..p {
        for k in 0..j {
            xtwx[k * p + j] = xtwx[j * p + k];
        }
    }
    xtwx
}

/// Weighted least squares with a tiny ridge on every coefficient
pub fn weighted_least_squares_ridge(design: ArrayView2<f64>, weights: &[f64], response: &[f64]) -> Vec<f64> {
    let p = design.ncols();
    let mut xtwx = weighted_cross_product(design, weights);
    for j in 0..p {
        xtwx[j * p + j] += 1e-6;
    }

    let mut xtwz = vec![0.0; p];
    for (i, row) in design.outer_iter().enumerate() {
        let wz = weights[i] * response[i];
        for j in 0..p {
            xtwz[j] += row[j] * wz;
        }
    }

    solve_symmetric_system(&xtwx, &xtwz, p)
}
