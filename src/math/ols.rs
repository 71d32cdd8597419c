//! Dense linear least squares helpers.
//!
//! The nonlinear fitter needs two linear-algebra primitives:
//! - solving the damped normal equations for each Levenberg–Marquardt step
//! - the parameter covariance `(JᵀJ)⁺` at the solution
//!
//! Both go through an SVD. Problems here are tiny (a handful of parameters),
//! so robustness matters far more than speed.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-14, 1e-12, 1e-10] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Covariance estimate `(JᵀJ)⁻¹` from the Jacobian of weighted residuals.
///
/// Singular values below `ε · max(m, n) · s_max` are treated as zero. When any
/// is dropped the parameters are not identifiable and every entry is `+∞`,
/// including those of otherwise well-determined parameters.
pub fn covariance_from_jacobian(jacobian: &DMatrix<f64>) -> DMatrix<f64> {
    let p = jacobian.ncols();
    let infinite = DMatrix::from_element(p, p, f64::INFINITY);
    if p == 0 || jacobian.iter().any(|v| !v.is_finite()) {
        return infinite;
    }

    let svd = jacobian.clone().svd(false, true);
    let Some(v_t) = svd.v_t else {
        return infinite;
    };
    let s = &svd.singular_values;
    let s_max = s.max();
    let threshold = f64::EPSILON * jacobian.nrows().max(p) as f64 * s_max;
    if s.len() < p || s.iter().any(|&sv| sv <= threshold) {
        return infinite;
    }

    let mut cov = DMatrix::zeros(p, p);
    for (k, &sv) in s.iter().enumerate() {
        let row = v_t.row(k);
        let w = 1.0 / (sv * sv);
        for i in 0..p {
            for j in 0..p {
                cov[(i, j)] += w * row[i] * row[j];
            }
        }
    }
    cov
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

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
    fn covariance_matches_normal_equations() {
        let j = DMatrix::from_row_slice(4, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0, 1.0, 3.0]);
        let cov = covariance_from_jacobian(&j);
        let expected = (j.transpose() * &j).try_inverse().unwrap();
        for i in 0..2 {
            for k in 0..2 {
                assert_relative_eq!(cov[(i, k)], expected[(i, k)], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn rank_deficient_jacobian_gives_infinite_covariance() {
        let j = DMatrix::from_row_slice(3, 2, &[1.0, 2.0, 2.0, 4.0, 3.0, 6.0]);
        let cov = covariance_from_jacobian(&j);
        assert!(cov.iter().all(|v| v.is_infinite()));
    }

    #[test]
    fn one_dead_column_voids_every_entry() {
        // The first parameter alone is well determined.
        let j = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 2.0, 0.0, 3.0, 0.0]);
        let cov = covariance_from_jacobian(&j);
        assert!(cov[(0, 0)].is_infinite());
        assert!(cov.iter().all(|v| v.is_infinite()));
    }
}
