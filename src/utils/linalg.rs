//! Dense linear algebra on row-major `Vec<Vec<f64>>` matrices.
//!
//! Sized for the small systems this crate solves (parameter vectors,
//! regression designs with a handful of columns).

use crate::error::{ForecastError, Result};

/// Row-major dense matrix.
pub type Matrix = Vec<Vec<f64>>;

const PIVOT_EPSILON: f64 = 1e-12;

/// Identity matrix of size `n`.
pub fn identity(n: usize) -> Matrix {
    (0..n)
        .map(|i| {
            let mut row = vec![0.0; n];
            row[i] = 1.0;
            row
        })
        .collect()
}

/// Matrix transpose.
pub fn transpose(a: &[Vec<f64>]) -> Matrix {
    let rows = a.len();
    let cols = a.first().map(|r| r.len()).unwrap_or(0);
    (0..cols)
        .map(|j| (0..rows).map(|i| a[i][j]).collect())
        .collect()
}

/// Matrix product `a @ b`.
pub fn mat_mul(a: &[Vec<f64>], b: &[Vec<f64>]) -> Result<Matrix> {
    let inner = a.first().map(|r| r.len()).unwrap_or(0);
    if inner != b.len() {
        return Err(ForecastError::DimensionMismatch {
            expected: inner,
            got: b.len(),
        });
    }
    let cols = b.first().map(|r| r.len()).unwrap_or(0);

    let mut out = vec![vec![0.0; cols]; a.len()];
    for (i, row) in a.iter().enumerate() {
        for (k, &aik) in row.iter().enumerate() {
            if aik == 0.0 {
                continue;
            }
            for j in 0..cols {
                out[i][j] += aik * b[k][j];
            }
        }
    }
    Ok(out)
}

/// Matrix-vector product `a @ v`.
pub fn mat_vec(a: &[Vec<f64>], v: &[f64]) -> Result<Vec<f64>> {
    a.iter()
        .map(|row| {
            if row.len() != v.len() {
                return Err(ForecastError::DimensionMismatch {
                    expected: row.len(),
                    got: v.len(),
                });
            }
            Ok(row.iter().zip(v).map(|(x, y)| x * y).sum())
        })
        .collect()
}

/// Closed-form inverse of a 2x2 matrix.
pub fn inverse_2x2(a: &[Vec<f64>]) -> Result<Matrix> {
    if a.len() != 2 || a.iter().any(|r| r.len() != 2) {
        return Err(ForecastError::InvalidArgument(
            "inverse_2x2 requires a 2x2 matrix".to_string(),
        ));
    }
    let det = a[0][0] * a[1][1] - a[0][1] * a[1][0];
    if det.abs() < PIVOT_EPSILON {
        return Err(ForecastError::InvalidArgument(
            "matrix is singular".to_string(),
        ));
    }
    Ok(vec![
        vec![a[1][1] / det, -a[0][1] / det],
        vec![-a[1][0] / det, a[0][0] / det],
    ])
}

/// General matrix inverse by Gauss-Jordan elimination with partial pivoting.
///
/// # Errors
/// `InvalidArgument` if the matrix is not square or is singular.
pub fn inverse(a: &[Vec<f64>]) -> Result<Matrix> {
    let n = a.len();
    if a.iter().any(|r| r.len() != n) {
        return Err(ForecastError::InvalidArgument(
            "matrix must be square".to_string(),
        ));
    }
    if n == 2 {
        return inverse_2x2(a);
    }

    let mut work: Matrix = a.to_vec();
    let mut inv = identity(n);

    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&i, &j| {
                work[i][col]
                    .abs()
                    .partial_cmp(&work[j][col].abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(col);

        if work[pivot_row][col].abs() < PIVOT_EPSILON {
            return Err(ForecastError::InvalidArgument(
                "matrix is singular".to_string(),
            ));
        }
        work.swap(col, pivot_row);
        inv.swap(col, pivot_row);

        let pivot = work[col][col];
        for j in 0..n {
            work[col][j] /= pivot;
            inv[col][j] /= pivot;
        }

        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = work[row][col];
            if factor == 0.0 {
                continue;
            }
            for j in 0..n {
                work[row][j] -= factor * work[col][j];
                inv[row][j] -= factor * inv[col][j];
            }
        }
    }

    Ok(inv)
}

/// Cholesky factor `L` with `a = L L^T`.
///
/// # Errors
/// `InvalidArgument` if `a` is not symmetric positive definite.
pub fn cholesky(a: &[Vec<f64>]) -> Result<Matrix> {
    let n = a.len();
    let mut l = vec![vec![0.0; n]; n];

    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[i][j];
            for k in 0..j {
                sum -= l[i][k] * l[j][k];
            }

            if i == j {
                if !(sum > 0.0) {
                    return Err(ForecastError::InvalidArgument(
                        "matrix is not positive definite".to_string(),
                    ));
                }
                l[i][j] = sum.sqrt();
            } else {
                l[i][j] = sum / l[j][j];
            }
        }
    }

    Ok(l)
}

/// Solve `L L^T x = b` given the Cholesky factor `L`.
pub fn cholesky_solve(l: &[Vec<f64>], b: &[f64]) -> Vec<f64> {
    let n = b.len();

    // Forward substitution: L y = b
    let mut y = vec![0.0; n];
    for i in 0..n {
        let mut sum = b[i];
        for k in 0..i {
            sum -= l[i][k] * y[k];
        }
        y[i] = sum / l[i][i];
    }

    // Back substitution: L^T x = y
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = y[i];
        for k in (i + 1)..n {
            sum -= l[k][i] * x[k];
        }
        x[i] = sum / l[i][i];
    }

    x
}

/// Solve a symmetric positive definite system with `ridge` added to the diagonal.
pub fn solve_spd(a: &[Vec<f64>], b: &[f64], ridge: f64) -> Result<Vec<f64>> {
    if a.len() != b.len() {
        return Err(ForecastError::DimensionMismatch {
            expected: a.len(),
            got: b.len(),
        });
    }
    let l = cholesky(&with_ridge(a, ridge))?;
    Ok(cholesky_solve(&l, b))
}

/// Inverse of a symmetric positive definite matrix, one Cholesky solve per
/// identity column.
pub fn inverse_spd(a: &[Vec<f64>], ridge: f64) -> Result<Matrix> {
    let n = a.len();
    let l = cholesky(&with_ridge(a, ridge))?;
    let columns: Vec<Vec<f64>> = identity(n)
        .iter()
        .map(|e| cholesky_solve(&l, e))
        .collect();
    Ok(transpose(&columns))
}

fn with_ridge(a: &[Vec<f64>], ridge: f64) -> Matrix {
    let mut out = a.to_vec();
    for (i, row) in out.iter_mut().enumerate() {
        row[i] += ridge;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn assert_matrix_eq(a: &[Vec<f64>], b: &[Vec<f64>], eps: f64) {
        assert_eq!(a.len(), b.len());
        for (ra, rb) in a.iter().zip(b) {
            for (x, y) in ra.iter().zip(rb) {
                assert_relative_eq!(x, y, epsilon = eps);
            }
        }
    }

    #[test]
    fn transpose_and_multiply() {
        let a = vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]];
        let at = transpose(&a);
        assert_eq!(at, vec![vec![1.0, 4.0], vec![2.0, 5.0], vec![3.0, 6.0]]);

        let prod = mat_mul(&a, &at).unwrap();
        assert_eq!(prod, vec![vec![14.0, 32.0], vec![32.0, 77.0]]);

        assert!(matches!(
            mat_mul(&a, &a),
            Err(ForecastError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn mat_vec_product() {
        let a = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        assert_eq!(mat_vec(&a, &[1.0, 1.0]).unwrap(), vec![3.0, 7.0]);
        assert!(mat_vec(&a, &[1.0]).is_err());
    }

    #[test]
    fn inverse_2x2_closed_form() {
        let a = vec![vec![4.0, 7.0], vec![2.0, 6.0]];
        let inv = inverse(&a).unwrap();
        assert_matrix_eq(&inv, &[vec![0.6, -0.7], vec![-0.2, 0.4]], 1e-12);
    }

    #[test]
    fn inverse_general_with_pivoting() {
        // Zero on the leading diagonal requires a row swap
        let a = vec![
            vec![0.0, 2.0, 1.0],
            vec![1.0, 1.0, 0.0],
            vec![3.0, 0.0, 1.0],
        ];
        let inv = inverse(&a).unwrap();
        let prod = mat_mul(&a, &inv).unwrap();
        assert_matrix_eq(&prod, &identity(3), 1e-10);
    }

    #[test]
    fn inverse_detects_singular() {
        let a = vec![
            vec![1.0, 2.0, 3.0],
            vec![2.0, 4.0, 6.0],
            vec![1.0, 0.0, 1.0],
        ];
        assert!(matches!(
            inverse(&a),
            Err(ForecastError::InvalidArgument(_))
        ));
        assert!(inverse_2x2(&[vec![1.0, 2.0], vec![2.0, 4.0]]).is_err());
    }

    #[test]
    fn cholesky_round_trip() {
        let a = vec![
            vec![4.0, 12.0, -16.0],
            vec![12.0, 37.0, -43.0],
            vec![-16.0, -43.0, 98.0],
        ];
        let l = cholesky(&a).unwrap();
        assert_matrix_eq(
            &l,
            &[
                vec![2.0, 0.0, 0.0],
                vec![6.0, 1.0, 0.0],
                vec![-8.0, 5.0, 3.0],
            ],
            1e-12,
        );

        let x = solve_spd(&a, &[1.0, 2.0, 3.0], 0.0).unwrap();
        let back = mat_vec(&a, &x).unwrap();
        for (got, want) in back.iter().zip([1.0, 2.0, 3.0]) {
            assert_relative_eq!(*got, want, epsilon = 1e-9);
        }
    }

    #[test]
    fn cholesky_rejects_indefinite() {
        let a = vec![vec![1.0, 2.0], vec![2.0, 1.0]];
        assert!(cholesky(&a).is_err());
    }

    #[test]
    fn inverse_spd_matches_general_inverse() {
        let a = vec![
            vec![5.0, 1.0, 0.5],
            vec![1.0, 4.0, 0.2],
            vec![0.5, 0.2, 3.0],
        ];
        let spd = inverse_spd(&a, 0.0).unwrap();
        let general = inverse(&a).unwrap();
        assert_matrix_eq(&spd, &general, 1e-12);
    }
}
