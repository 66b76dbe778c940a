//! Dense linear algebra over real and complex scalars.
//!
//! Everything the solvers need lives here: a row-major [`Matrix`], an
//! LU factorization with partial pivoting, and the matrix exponential.

mod expm;
mod lu;
mod matrix;

pub use expm::{expm, ExpmError};
pub use lu::LuDecomposition;
pub use matrix::Matrix;

use num_complex::Complex64;
use num_traits::NumAssign;
use std::fmt::Debug;
use std::ops::Neg;

/// Real matrix.
pub type RMatrix = Matrix<f64>;

/// Complex matrix.
pub type CMatrix = Matrix<Complex64>;

/// Scalar field the dense routines operate over.
pub trait Scalar: NumAssign + Neg<Output = Self> + Copy + Send + Sync + Debug + 'static {
    /// Absolute value (modulus for complex numbers).
    fn modulus(self) -> f64;

    /// Embed a real number.
    fn from_real(x: f64) -> Self;

    /// True when no component is NaN or infinite.
    fn is_finite_value(self) -> bool;
}

impl Scalar for f64 {
    fn modulus(self) -> f64 {
        self.abs()
    }

    fn from_real(x: f64) -> Self {
        x
    }

    fn is_finite_value(self) -> bool {
        self.is_finite()
    }
}

impl Scalar for Complex64 {
    fn modulus(self) -> f64 {
        self.norm()
    }

    fn from_real(x: f64) -> Self {
        Complex64::new(x, 0.0)
    }

    fn is_finite_value(self) -> bool {
        self.re.is_finite() && self.im.is_finite()
    }
}
