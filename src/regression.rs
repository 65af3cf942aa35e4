//! Ordinary least squares with an intercept, fit on two regressors
//! (`stamp_hours`, `volume`).
//!
//! The design matrix is fixed at 3 columns (intercept, stamp_hours, volume),
//! so the normal equations reduce to one 3x3 linear solve. Rather than pull
//! in a linear-algebra crate for a single fixed-size system, the solve is
//! hand-rolled: a closed-form eigendecomposition of the symmetric `X^T X`
//! builds its Moore-Penrose pseudo-inverse, which degrades gracefully on
//! rank-deficient input (e.g. a window where every transaction has the same
//! volume, making the volume column a multiple of the intercept column)
//! instead of failing the fit outright.

const EPS: f64 = 1e-9;

#[derive(Debug, Clone, Copy)]
pub struct OlsModel {
    /// Coefficients in order: intercept, stamp_hours, volume.
    coefficients: [f64; 3],
}

impl OlsModel {
    /// Predicts price at the given `stamp_hours` and `volume`.
    pub fn predict(&self, stamp_hours: f64, volume: f64) -> f64 {
        self.coefficients[0] + self.coefficients[1] * stamp_hours + self.coefficients[2] * volume
    }
}

/// Fits `price ~ 1 + stamp_hours + volume` via the normal equations
/// `(X^T X) b = X^T y`, solved for the minimum-norm `b` using the
/// pseudo-inverse of `X^T X`. Returns `None` only if there are fewer than 3
/// points or the input slices disagree in length.
pub fn ols_fit(stamp_hours: &[f64], volume: &[f64], price: &[f64]) -> Option<OlsModel> {
    let n = stamp_hours.len();
    if n < 3 || volume.len() != n || price.len() != n {
        return None;
    }

    // Build X^T X (3x3) and X^T y (3x1) directly, X columns = [1, stamp_hours, volume].
    let mut xtx = [[0.0f64; 3]; 3];
    let mut xty = [0.0f64; 3];

    for i in 0..n {
        let row = [1.0, stamp_hours[i], volume[i]];
        for a in 0..3 {
            for b in 0..3 {
                xtx[a][b] += row[a] * row[b];
            }
            xty[a] += row[a] * price[i];
        }
    }

    Some(OlsModel { coefficients: solve_normal_equations(xtx, xty) })
}

/// Solves `(X^T X) b = X^T y` for the minimum-norm `b` via the pseudo-inverse
/// of the symmetric matrix `X^T X`: `pinv(A) = sum_i (1/lambda_i) v_i v_i^T`
/// over its nonzero eigenpairs, zero contribution from the rest.
fn solve_normal_equations(xtx: [[f64; 3]; 3], xty: [f64; 3]) -> [f64; 3] {
    let (eigenvalues, eigenvectors) = symmetric_eigen(xtx);

    let mut b = [0.0f64; 3];
    for k in 0..3 {
        if eigenvalues[k].abs() < EPS {
            continue;
        }
        let v = eigenvectors[k];
        let proj = v[0] * xty[0] + v[1] * xty[1] + v[2] * xty[2];
        let scale = proj / eigenvalues[k];
        for (bi, vi) in b.iter_mut().zip(v) {
            *bi += scale * vi;
        }
    }
    b
}

/// Eigenvalues and an orthonormal basis of eigenvectors for a symmetric 3x3
/// matrix, via the closed-form trigonometric solution for its characteristic
/// cubic (the standard analytic method for symmetric 3x3 matrices).
fn symmetric_eigen(a: [[f64; 3]; 3]) -> ([f64; 3], [[f64; 3]; 3]) {
    let eigenvalues = symmetric_eigenvalues(a);

    let mut eigenvectors = [[0.0f64; 3]; 3];
    let mut found: Vec<[f64; 3]> = Vec::with_capacity(3);
    for (k, &lambda) in eigenvalues.iter().enumerate() {
        let v = eigenvector_for(a, lambda, &found).unwrap_or_else(|| orthogonal_complement(&found));
        found.push(v);
        eigenvectors[k] = v;
    }

    (eigenvalues, eigenvectors)
}

fn symmetric_eigenvalues(a: [[f64; 3]; 3]) -> [f64; 3] {
    let p1 = a[0][1] * a[0][1] + a[0][2] * a[0][2] + a[1][2] * a[1][2];
    if p1 < EPS {
        // Already diagonal: eigenvalues are the diagonal entries.
        return [a[0][0], a[1][1], a[2][2]];
    }

    let q = (a[0][0] + a[1][1] + a[2][2]) / 3.0;
    let p2 = (a[0][0] - q).powi(2) + (a[1][1] - q).powi(2) + (a[2][2] - q).powi(2) + 2.0 * p1;
    let p = (p2 / 6.0).sqrt();

    let mut b = [[0.0f64; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            b[i][j] = (a[i][j] - if i == j { q } else { 0.0 }) / p;
        }
    }

    let r = (det3(&b) / 2.0).clamp(-1.0, 1.0);
    let phi = r.acos() / 3.0;

    let eig1 = q + 2.0 * p * phi.cos();
    let eig3 = q + 2.0 * p * (phi + 2.0 * std::f64::consts::PI / 3.0).cos();
    let eig2 = 3.0 * q - eig1 - eig3;
    [eig1, eig2, eig3]
}

fn det3(m: &[[f64; 3]; 3]) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

fn cross(u: [f64; 3], v: [f64; 3]) -> [f64; 3] {
    [u[1] * v[2] - u[2] * v[1], u[2] * v[0] - u[0] * v[2], u[0] * v[1] - u[1] * v[0]]
}

fn norm(v: [f64; 3]) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

/// Finds a unit eigenvector for `lambda` as the cross product of two rows of
/// `a - lambda*I`, which spans the null space whenever that shifted matrix
/// has rank 2 (the usual case for a non-repeated eigenvalue of a symmetric
/// 3x3 matrix). Returns `None` if all three row-pairs are degenerate or the
/// result collides with a direction already in `avoid`, signaling a repeated
/// eigenvalue that needs the orthogonal-complement fallback instead.
fn eigenvector_for(a: [[f64; 3]; 3], lambda: f64, avoid: &[[f64; 3]]) -> Option<[f64; 3]> {
    let shifted = [
        [a[0][0] - lambda, a[0][1], a[0][2]],
        [a[1][0], a[1][1] - lambda, a[1][2]],
        [a[2][0], a[2][1], a[2][2] - lambda],
    ];

    let candidates =
        [cross(shifted[0], shifted[1]), cross(shifted[0], shifted[2]), cross(shifted[1], shifted[2])];

    let mut best: Option<([f64; 3], f64)> = None;
    for c in candidates {
        let n = norm(c);
        let better = match best {
            None => true,
            Some((_, best_n)) => n > best_n,
        };
        if better {
            best = Some((c, n));
        }
    }

    let (v, n) = best?;
    if n < EPS {
        return None;
    }
    let unit = [v[0] / n, v[1] / n, v[2] / n];

    for u in avoid {
        let dot = u[0] * unit[0] + u[1] * unit[1] + u[2] * unit[2];
        if dot.abs() > 1.0 - EPS {
            return None;
        }
    }
    Some(unit)
}

/// Builds a unit vector orthogonal to every vector in `found`, for repeated
/// eigenvalues where the cross-product method can't isolate a direction.
/// Any vector in the remaining eigenspace reconstructs the same projector,
/// so which one is picked doesn't matter.
fn orthogonal_complement(found: &[[f64; 3]]) -> [f64; 3] {
    for candidate in [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]] {
        let mut v = candidate;
        for u in found {
            let proj = v[0] * u[0] + v[1] * u[1] + v[2] * u[2];
            for i in 0..3 {
                v[i] -= proj * u[i];
            }
        }
        let n = norm(v);
        if n > EPS {
            return [v[0] / n, v[1] / n, v[2] / n];
        }
    }
    [0.0, 0.0, 0.0]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fits_perfect_linear_trend() {
        // volume is independent of hours (not an affine function of it), so
        // X^T X is full rank and price's true zero dependence on volume is
        // recovered exactly rather than merely approximately.
        let hours = [0.0, 1.0, 2.0, 3.0];
        let volume = [2.0, 1.0, 4.0, 3.0];
        let price = [100.0, 110.0, 120.0, 130.0];

        let model = ols_fit(&hours, &volume, &price).expect("fit");
        assert!((model.predict(0.0, 2.0) - 100.0).abs() < 1e-6);
        assert!((model.predict(3.0, 3.0) - 130.0).abs() < 1e-6);
    }

    #[test]
    fn degrades_gracefully_when_volume_is_constant() {
        // volume is identical across the whole window, so the volume column
        // is a scalar multiple of the intercept column and X^T X is exactly
        // singular. The fit must still recover the true fitted prices
        // instead of returning None.
        let hours = [0.0, 1.0, 2.0];
        let volume = [10.0, 10.0, 10.0];
        let price = [100.0, 110.0, 120.0];

        let model = ols_fit(&hours, &volume, &price).expect("fit degrades instead of failing");
        assert!((model.predict(0.0, 10.0) - 100.0).abs() < 1e-6);
        assert!((model.predict(2.0, 10.0) - 120.0).abs() < 1e-6);
    }

    #[test]
    fn degrades_gracefully_when_all_inputs_are_constant() {
        // Fully rank-deficient X^T X (repeated zero eigenvalues): every
        // column is a multiple of the intercept column. Still must not panic
        // or return None.
        let hours = [0.0, 0.0, 0.0];
        let volume = [5.0, 5.0, 5.0];
        let price = [42.0, 42.0, 42.0];

        let model = ols_fit(&hours, &volume, &price).expect("fit degrades instead of failing");
        assert!(model.predict(0.0, 5.0).is_finite());
    }

    #[test]
    fn returns_none_with_fewer_than_three_points() {
        let hours = [0.0, 1.0];
        let volume = [1.0, 1.0];
        let price = [1.0, 2.0];
        assert!(ols_fit(&hours, &volume, &price).is_none());
    }

    #[test]
    fn returns_none_on_mismatched_lengths() {
        let hours = [0.0, 1.0, 2.0];
        let volume = [1.0, 1.0];
        let price = [1.0, 2.0, 3.0];
        assert!(ols_fit(&hours, &volume, &price).is_none());
    }
}
