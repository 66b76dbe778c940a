//! LU decomposition with partial pivoting.

use super::{Matrix, Scalar};
use crate::error::{Result, TfmrError};

/// Factored form `P·A = L·U` of a square matrix.
///
/// `L` (unit diagonal) and `U` share one matrix; `pivots[i]` is the row of
/// `A` that ended up in row `i`.
#[derive(Debug, Clone)]
pub struct LuDecomposition<T> {
    lu: Matrix<T>,
    pivots: Vec<usize>,
    /// 1-norm of the factored matrix, kept for condition estimates
    norm_one: f64,
}

impl<T: Scalar> LuDecomposition<T> {
    /// Factor `a`. Fails with [`TfmrError::SingularMatrix`] on a pivot that is
    /// zero or negligible relative to the largest entry of `a`.
    ///
    /// The threshold is `max|a_ij|·ε` over the whole matrix, not per row or
    /// column. A matrix whose entries span more than about 1/ε (≈4.5e15) is
    /// reported singular even when it is diagonal, e.g. `diag(1e17, 1)`.
    /// Callers with widely scaled unknowns should equilibrate first.
    pub fn factor(a: &Matrix<T>) -> Result<Self> {
        if !a.is_square() {
            return Err(TfmrError::dimension("LU input columns", a.rows(), a.cols()));
        }
        let n = a.rows();
        let mut lu = a.clone();
        let mut pivots: Vec<usize> = (0..n).collect();
        let threshold = a.max_abs() * f64::EPSILON;

        for k in 0..n {
            // Find pivot
            let mut max_val = lu[(k, k)].modulus();
            let mut max_row = k;
            for i in (k + 1)..n {
                let val = lu[(i, k)].modulus();
                if val > max_val {
                    max_val = val;
                    max_row = i;
                }
            }

            if max_val == 0.0 || max_val <= threshold || !max_val.is_finite() {
                return Err(TfmrError::SingularMatrix { column: k });
            }

            if max_row != k {
                pivots.swap(k, max_row);
                for j in 0..n {
                    let tmp = lu[(k, j)];
                    lu[(k, j)] = lu[(max_row, j)];
                    lu[(max_row, j)] = tmp;
                }
            }

            // Eliminate
            let pivot = lu[(k, k)];
            for i in (k + 1)..n {
                let factor = lu[(i, k)] / pivot;
                if factor == T::zero() {
                    continue;
                }
                lu[(i, k)] = factor;
                for j in (k + 1)..n {
                    let u = lu[(k, j)];
                    lu[(i, j)] -= factor * u;
                }
            }
        }

        Ok(Self {
            lu,
            pivots,
            norm_one: a.norm_one(),
        })
    }

    pub fn dim(&self) -> usize {
        self.pivots.len()
    }

    /// Solve `A·x = b`.
    pub fn solve(&self, b: &[T]) -> Result<Vec<T>> {
        let n = self.dim();
        if b.len() != n {
            return Err(TfmrError::dimension("right-hand side", n, b.len()));
        }

        // Apply pivot permutation to b
        let mut x: Vec<T> = self.pivots.iter().map(|&p| b[p]).collect();

        // Forward substitution (L * y = Pb)
        for i in 0..n {
            for j in 0..i {
                let l = self.lu[(i, j)];
                let y = x[j];
                x[i] -= l * y;
            }
        }

        // Back substitution (U * x = y)
        for i in (0..n).rev() {
            for j in (i + 1)..n {
                let u = self.lu[(i, j)];
                let xj = x[j];
                x[i] -= u * xj;
            }
            x[i] /= self.lu[(i, i)];
        }

        Ok(x)
    }

    /// Solve `A·X = B` column by column.
    pub fn solve_matrix(&self, b: &Matrix<T>) -> Result<Matrix<T>> {
        let n = self.dim();
        if b.rows() != n {
            return Err(TfmrError::dimension("right-hand side rows", n, b.rows()));
        }
        let mut out = Matrix::zeros(n, b.cols());
        for j in 0..b.cols() {
            let col: Vec<T> = (0..n).map(|i| b[(i, j)]).collect();
            let x = self.solve(&col)?;
            for (i, v) in x.into_iter().enumerate() {
                out[(i, j)] = v;
            }
        }
        Ok(out)
    }

    /// Explicit inverse.
    pub fn inverse(&self) -> Result<Matrix<T>> {
        self.solve_matrix(&Matrix::identity(self.dim()))
    }

    /// `‖A‖₁·‖A⁻¹‖₁`, given an inverse already computed from this factorization.
    pub fn condition_from_inverse(&self, inverse: &Matrix<T>) -> f64 {
        self.norm_one * inverse.norm_one()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::{CMatrix, RMatrix};
    use approx::assert_relative_eq;
    use num_complex::Complex64;

    #[test]
    fn test_real_solve() {
        // 2x + y = 5, x + 3y = 10  =>  x = 1, y = 3
        let a = RMatrix::from_rows(vec![vec![2.0, 1.0], vec![1.0, 3.0]]).unwrap();
        let lu = LuDecomposition::factor(&a).unwrap();
        let x = lu.solve(&[5.0, 10.0]).unwrap();
        assert_relative_eq!(x[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(x[1], 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_needs_pivoting() {
        let a = RMatrix::from_rows(vec![
            vec![0.0, 1.0, 2.0],
            vec![1.0, 0.0, 3.0],
            vec![4.0, -3.0, 8.0],
        ])
        .unwrap();
        let lu = LuDecomposition::factor(&a).unwrap();
        let b = [1.0, 2.0, 3.0];
        let x = lu.solve(&b).unwrap();
        let back = a.mul_vec(&x);
        for (got, want) in back.iter().zip(b) {
            assert_relative_eq!(*got, want, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_complex_inverse() {
        let j = Complex64::i();
        let one = Complex64::new(1.0, 0.0);
        let a = CMatrix::from_rows(vec![vec![one + j, 2.0 * one], vec![-j, 3.0 * one - j]]).unwrap();
        let lu = LuDecomposition::factor(&a).unwrap();
        let inv = lu.inverse().unwrap();
        let prod = &a * &inv;
        for i in 0..2 {
            for k in 0..2 {
                let want = if i == k { one } else { Complex64::new(0.0, 0.0) };
                assert!((prod[(i, k)] - want).norm() < 1e-12);
            }
        }
        let cond = lu.condition_from_inverse(&inv);
        assert!(cond.is_finite() && cond >= 1.0);
    }

    #[test]
    fn test_singular_detected() {
        let a = RMatrix::from_rows(vec![vec![1.0, 2.0], vec![2.0, 4.0]]).unwrap();
        assert!(matches!(
            LuDecomposition::factor(&a),
            Err(TfmrError::SingularMatrix { column: 1 })
        ));

        let zero = CMatrix::zeros(3, 3);
        assert!(matches!(
            LuDecomposition::factor(&zero),
            Err(TfmrError::SingularMatrix { column: 0 })
        ));
    }

    #[test]
    fn test_threshold_is_relative_to_largest_entry() {
        let wide = RMatrix::from_diagonal(&[1e15, 1.0]);
        assert!(LuDecomposition::factor(&wide).is_ok());

        let too_wide = RMatrix::from_diagonal(&[1e17, 1.0]);
        assert!(matches!(
            LuDecomposition::factor(&too_wide),
            Err(TfmrError::SingularMatrix { column: 1 })
        ));
    }

    #[test]
    fn test_rhs_length_checked() {
        let lu = LuDecomposition::factor(&RMatrix::identity(3)).unwrap();
        assert!(lu.solve(&[1.0, 2.0]).is_err());
    }
}
