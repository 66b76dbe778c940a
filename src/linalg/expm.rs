//! Matrix exponential by scaling and squaring with Padé approximants.
//!
//! Follows Higham, "The scaling and squaring method for the matrix
//! exponential revisited" (2005): pick the cheapest Padé degree among
//! 3, 5, 7, 9 and 13 whose backward-error bound covers `‖A‖₁`, scaling by
//! `2^-s` first when even degree 13 does not. A diagonal power-of-two
//! balancing pass precedes everything so badly scaled operators (nH next to
//! nF) do not inflate the norm.

use super::{LuDecomposition, Matrix, Scalar};
use thiserror::Error;

/// Failure to evaluate `exp(A)` accurately.
#[derive(Error, Debug, Clone)]
#[error("{reason}")]
pub struct ExpmError {
    /// 1-norm of the (balanced) input
    pub norm: f64,
    /// Squarings attempted
    pub squarings: u32,
    pub reason: String,
}

const MAX_SQUARINGS: u32 = 64;
const BALANCE_SWEEPS: usize = 100;

/// Backward-error thresholds θ_m for degrees 3, 5, 7, 9.
const THETA: [(usize, f64); 4] = [
    (3, 1.495585217958292e-2),
    (5, 2.539398330063230e-1),
    (7, 9.504178996162932e-1),
    (9, 2.097847961257068e0),
];
const THETA_13: f64 = 5.371920351148152e0;

const PADE_3: [f64; 4] = [120.0, 60.0, 12.0, 1.0];
const PADE_5: [f64; 6] = [30240.0, 15120.0, 3360.0, 420.0, 30.0, 1.0];
const PADE_7: [f64; 8] = [
    17297280.0, 8648640.0, 1995840.0, 277200.0, 25200.0, 1512.0, 56.0, 1.0,
];
const PADE_9: [f64; 10] = [
    17643225600.0,
    8821612800.0,
    2075673600.0,
    302702400.0,
    30270240.0,
    2162160.0,
    110880.0,
    3960.0,
    90.0,
    1.0,
];
const PADE_13: [f64; 14] = [
    64764752532480000.0,
    32382376266240000.0,
    7771770303897600.0,
    1187353796428800.0,
    129060195264000.0,
    10559470521600.0,
    670442572800.0,
    33522128640.0,
    1323241920.0,
    40840800.0,
    960960.0,
    16380.0,
    182.0,
    1.0,
];

/// Compute `exp(a)` for a square matrix.
pub fn expm<T: Scalar>(a: &Matrix<T>) -> Result<Matrix<T>, ExpmError> {
    let n = a.rows();
    if !a.is_square() {
        return Err(ExpmError {
            norm: f64::NAN,
            squarings: 0,
            reason: format!("non-square {}x{} input", a.rows(), a.cols()),
        });
    }
    if !a.is_finite() {
        return Err(ExpmError {
            norm: f64::INFINITY,
            squarings: 0,
            reason: "input has non-finite entries".to_string(),
        });
    }
    if n == 0 {
        return Ok(Matrix::zeros(0, 0));
    }

    let (balanced, scale) = balance(a);
    let (work, scale) = if balanced.norm_one() < a.norm_one() {
        (balanced, Some(scale))
    } else {
        (a.clone(), None)
    };
    let norm = work.norm_one();

    let exp = pade_exp(&work, norm)?;

    Ok(match scale {
        // exp(D⁻¹AD) = D⁻¹exp(A)D
        Some(d) => Matrix::from_fn(n, n, |i, j| exp[(i, j)] * T::from_real(d[i] / d[j])),
        None => exp,
    })
}

fn pade_exp<T: Scalar>(a: &Matrix<T>, norm: f64) -> Result<Matrix<T>, ExpmError> {
    let n = a.rows();
    let ident = Matrix::<T>::identity(n);
    let a2 = a * a;

    for &(m, theta) in &THETA {
        if norm <= theta {
            let coeffs: &[f64] = match m {
                3 => &PADE_3,
                5 => &PADE_5,
                7 => &PADE_7,
                _ => &PADE_9,
            };
            let (u, v) = low_degree_uv(a, &a2, &ident, coeffs);
            return solve_pade(&u, &v, norm, 0);
        }
    }

    let squarings = if norm > THETA_13 {
        (norm / THETA_13).log2().ceil().max(0.0) as u32
    } else {
        0
    };
    if squarings > MAX_SQUARINGS {
        return Err(ExpmError {
            norm,
            squarings,
            reason: format!("norm requires {squarings} squarings"),
        });
    }

    let factor = T::from_real(0.5f64.powi(squarings as i32));
    let a1 = a.scale(factor);
    let a2 = a2.scale(factor * factor);
    let a4 = &a2 * &a2;
    let a6 = &a4 * &a2;
    let b = |k: usize| T::from_real(PADE_13[k]);

    let u_inner = &(&a6.scale(b(13)) + &a4.scale(b(11))) + &a2.scale(b(9));
    let u_tail = &(&(&a6.scale(b(7)) + &a4.scale(b(5))) + &a2.scale(b(3))) + &ident.scale(b(1));
    let u = &a1 * &(&(&a6 * &u_inner) + &u_tail);

    let v_inner = &(&a6.scale(b(12)) + &a4.scale(b(10))) + &a2.scale(b(8));
    let v_tail = &(&(&a6.scale(b(6)) + &a4.scale(b(4))) + &a2.scale(b(2))) + &ident.scale(b(0));
    let v = &(&a6 * &v_inner) + &v_tail;

    let mut r = solve_pade(&u, &v, norm, squarings)?;
    for _ in 0..squarings {
        r = &r * &r;
    }
    if !r.is_finite() {
        return Err(ExpmError {
            norm,
            squarings,
            reason: "result overflowed while squaring".to_string(),
        });
    }
    Ok(r)
}

/// Odd and even parts of the Padé numerator for degrees up to 9.
fn low_degree_uv<T: Scalar>(
    a: &Matrix<T>,
    a2: &Matrix<T>,
    ident: &Matrix<T>,
    coeffs: &[f64],
) -> (Matrix<T>, Matrix<T>) {
    let n = a.rows();
    let mut odd = Matrix::<T>::zeros(n, n);
    let mut even = Matrix::<T>::zeros(n, n);
    let mut power = ident.clone();
    for pair in coeffs.chunks(2) {
        even = &even + &power.scale(T::from_real(pair[0]));
        if let Some(&c) = pair.get(1) {
            odd = &odd + &power.scale(T::from_real(c));
        }
        power = &power * a2;
    }
    (a * &odd, even)
}

/// Solve `(V - U)·R = V + U`.
fn solve_pade<T: Scalar>(
    u: &Matrix<T>,
    v: &Matrix<T>,
    norm: f64,
    squarings: u32,
) -> Result<Matrix<T>, ExpmError> {
    let p = v + u;
    let q = v - u;
    let lu = LuDecomposition::factor(&q).map_err(|e| ExpmError {
        norm,
        squarings,
        reason: format!("Padé denominator: {e}"),
    })?;
    lu.solve_matrix(&p).map_err(|e| ExpmError {
        norm,
        squarings,
        reason: format!("Padé solve: {e}"),
    })
}

/// Power-of-two diagonal balancing. Returns `B = D⁻¹AD` and `diag(D)`.
fn balance<T: Scalar>(a: &Matrix<T>) -> (Matrix<T>, Vec<f64>) {
    const RADIX: f64 = 2.0;
    let n = a.rows();
    let mut b = a.clone();
    let mut scale = vec![1.0; n];

    for _ in 0..BALANCE_SWEEPS {
        let mut done = true;
        for i in 0..n {
            let mut c = 0.0;
            let mut r = 0.0;
            for j in 0..n {
                if j != i {
                    c += b[(j, i)].modulus();
                    r += b[(i, j)].modulus();
                }
            }
            if c == 0.0 || r == 0.0 {
                continue;
            }
            let s = c + r;
            let mut f = 1.0;
            let mut g = r / RADIX;
            while c < g {
                f *= RADIX;
                c *= RADIX * RADIX;
            }
            g = r * RADIX;
            while c > g {
                f /= RADIX;
                c /= RADIX * RADIX;
            }
            if (c + r) / f < 0.95 * s {
                done = false;
                scale[i] *= f;
                let down = T::from_real(1.0 / f);
                let up = T::from_real(f);
                for j in 0..n {
                    b[(i, j)] *= down;
                    b[(j, i)] *= up;
                }
            }
        }
        if done {
            break;
        }
    }
    (b, scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::{CMatrix, RMatrix};
    use approx::assert_relative_eq;
    use num_complex::Complex64;

    fn assert_close(a: &RMatrix, b: &RMatrix, tol: f64) {
        for i in 0..a.rows() {
            for j in 0..a.cols() {
                let scale = b[(i, j)].abs().max(1.0);
                assert!(
                    (a[(i, j)] - b[(i, j)]).abs() <= tol * scale,
                    "({i},{j}): {} vs {}",
                    a[(i, j)],
                    b[(i, j)]
                );
            }
        }
    }

    #[test]
    fn test_zero_matrix() {
        let e = expm(&RMatrix::zeros(3, 3)).unwrap();
        assert_close(&e, &RMatrix::identity(3), 1e-15);
    }

    #[test]
    fn test_diagonal_matrix() {
        // Spans every Padé degree plus several squarings
        for d in [1e-3, 0.2, -0.9, 2.0, 7.5, -30.0, 60.0] {
            let a = RMatrix::from_diagonal(&[d, 0.5 * d, -d]);
            let e = expm(&a).unwrap();
            let want = RMatrix::from_diagonal(&[d.exp(), (0.5 * d).exp(), (-d).exp()]);
            for i in 0..3 {
                assert_relative_eq!(e[(i, i)], want[(i, i)], max_relative = 1e-12);
            }
        }
    }

    #[test]
    fn test_nilpotent_matrix() {
        // Strictly upper triangular: exp(N) = I + N + N²/2 + N³/6
        let a = RMatrix::from_rows(vec![
            vec![0.0, 1.0, 2.0, 3.0],
            vec![0.0, 0.0, 4.0, 5.0],
            vec![0.0, 0.0, 0.0, 6.0],
            vec![0.0, 0.0, 0.0, 0.0],
        ])
        .unwrap();
        let a2 = &a * &a;
        let a3 = &a2 * &a;
        let want = &(&(&RMatrix::identity(4) + &a) + &a2.scale(0.5)) + &a3.scale(1.0 / 6.0);
        let e = expm(&a).unwrap();
        assert_close(&e, &want, 1e-12);
    }

    #[test]
    fn test_rotation_generator() {
        // exp([[0, -t], [t, 0]]) is a rotation by t
        let t = 10.0;
        let a = RMatrix::from_rows(vec![vec![0.0, -t], vec![t, 0.0]]).unwrap();
        let e = expm(&a).unwrap();
        assert_relative_eq!(e[(0, 0)], t.cos(), epsilon = 1e-12);
        assert_relative_eq!(e[(1, 0)], t.sin(), epsilon = 1e-12);
    }

    #[test]
    fn test_badly_scaled_block_operator() {
        // [[0, -a], [-b, 0]] with a·b = k²: exp = [[cosh k, -a sinh k / k], [-b sinh k / k, cosh k]]
        let (a, b): (f64, f64) = (4.0e6, 1.0e-6);
        let k = (a * b).sqrt();
        let m = RMatrix::from_rows(vec![vec![0.0, -a], vec![-b, 0.0]]).unwrap();
        let e = expm(&m).unwrap();
        assert_relative_eq!(e[(0, 0)], k.cosh(), max_relative = 1e-10);
        assert_relative_eq!(e[(0, 1)], -a * k.sinh() / k, max_relative = 1e-10);
        assert_relative_eq!(e[(1, 0)], -b * k.sinh() / k, max_relative = 1e-10);
    }

    #[test]
    fn test_complex_diagonal() {
        let w = Complex64::new(0.3, 2.0);
        let a = CMatrix::from_diagonal(&[w, -w]);
        let e = expm(&a).unwrap();
        assert!((e[(0, 0)] - w.exp()).norm() < 1e-12);
        assert!((e[(1, 1)] - (-w).exp()).norm() < 1e-12);
        assert!(e[(0, 1)].norm() < 1e-15);
    }

    #[test]
    fn test_non_finite_input_rejected() {
        let mut a = RMatrix::zeros(2, 2);
        a[(0, 1)] = f64::NAN;
        assert!(expm(&a).is_err());
    }

    #[test]
    fn test_excessive_norm_rejected() {
        let a = RMatrix::from_diagonal(&[1e300, 1.0]);
        let err = expm(&a).unwrap_err();
        assert!(err.squarings > MAX_SQUARINGS || !err.norm.is_finite() || err.norm > 1e299);
    }
}
