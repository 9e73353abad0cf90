//! Least squares solvers.
//!
//! The linear model and the Lasso refit both reduce to small problems of the form:
//!
//! ```text
//! minimize Σ (y_i - x_i^T β)^2
//! ```
//!
//! Implementation choices:
//! - SVD is the primary solver: it handles tall design matrices and tolerates
//!   mildly collinear macro series (e.g. two CPI variants).
//!   (Nalgebra's `QR::solve` is intended for square systems and will panic for
//!   non-square matrices.)
//! - When SVD cannot produce a finite solution we fall back to ridge-stabilized
//!   normal equations with a tiny penalty.

use nalgebra::{DMatrix, DVector};

/// Penalty used by the ridge fallback.
pub const RIDGE_LAMBDA: f64 = 1e-8;

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Solve `(XᵀX + λI) β = Xᵀy` via Cholesky.
///
/// Returns `None` if the regularized system is still not positive definite.
pub fn solve_ridge(x: &DMatrix<f64>, y: &DVector<f64>, lambda: f64) -> Option<DVector<f64>> {
    let xt = x.transpose();
    let mut gram = &xt * x;
    for i in 0..gram.nrows() {
        gram[(i, i)] += lambda;
    }
    let rhs = &xt * y;
    let beta = gram.cholesky()?.solve(&rhs);
    beta.iter().all(|v| v.is_finite()).then_some(beta)
}

/// SVD least squares with a ridge fallback.
pub fn solve_stabilized(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    solve_least_squares(x, y).or_else(|| solve_ridge(x, y, RIDGE_LAMBDA))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn ridge_matches_ols_for_tiny_lambda() {
        let x = DMatrix::from_row_slice(4, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0, 1.0, 3.0]);
        let y = DVector::from_row_slice(&[1.0, 3.0, 5.0, 7.0]);

        let beta = solve_ridge(&x, &y, RIDGE_LAMBDA).unwrap();
        assert!((beta[0] - 1.0).abs() < 1e-6);
        assert!((beta[1] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn stabilized_handles_duplicate_columns() {
        // Two identical predictor columns: rank-deficient but still solvable.
        let x = DMatrix::from_row_slice(
            4,
            3,
            &[1.0, 1.0, 1.0, 1.0, 2.0, 2.0, 1.0, 3.0, 3.0, 1.0, 4.0, 4.0],
        );
        let y = DVector::from_row_slice(&[3.0, 5.0, 7.0, 9.0]);

        let beta = solve_stabilized(&x, &y).unwrap();
        let fitted = &x * &beta;
        for (f, t) in fitted.iter().zip(y.iter()) {
            assert!((f - t).abs() < 1e-6);
        }
    }
}
