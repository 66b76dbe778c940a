//! Electrical parameter sources.
//!
//! Both solvers consume per-turn inductance, capacitance and resistance
//! matrices through the [`ParameterSource`] trait. All matrices are
//! `num_turns x num_turns` and per unit length: an absolute pair quantity
//! `X_ij` (H, F) is stored as `X_ij / (2π·sqrt(r_i·r_j))`, which keeps the
//! stored matrix symmetric. Resistance is diagonal and already per unit
//! length (Ω/m).
//!
//! Variants:
//! - [`AnalyticSource`]: closed-form free-space formulas, computed in-process
//! - [`TabulatedSource`]: matrices precomputed elsewhere and read from CSV
//! - [`SnapshotSource`]: another source frozen at one reference frequency

mod analytic;
mod resistance;
mod snapshot;
mod tabulated;

pub use analytic::{mutual_inductance, self_inductance, AnalyticSource, Enclosure};
pub use resistance::ResistanceModel;
pub use snapshot::SnapshotSource;
pub use tabulated::{parse_matrix_csv, read_matrix_csv, TabulatedSource};

use std::f64::consts::PI;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{Result, TfmrError};
use crate::linalg::RMatrix;
use crate::winding::Winding;

/// Frequency at which [`check_source`] samples the frequency-dependent matrices.
pub const CHECK_FREQUENCY: f64 = 1.0;

/// Supplier of per-turn electrical parameters.
///
/// Implementations are queried concurrently from sweep workers and must not
/// rely on interior mutation.
pub trait ParameterSource: Send + Sync {
    /// Number of turns every matrix is sized for.
    fn num_turns(&self) -> usize;

    /// Inductance per unit length (H/m) at `frequency`.
    fn calc_l_matrix(&self, frequency: f64) -> Result<RMatrix>;

    /// Capacitance per unit length (F/m), Maxwell form.
    fn calc_c_matrix(&self) -> Result<RMatrix>;

    /// Diagonal resistance per unit length (Ω/m) at `frequency`.
    fn calc_r_matrix(&self, frequency: f64) -> Result<RMatrix>;

    /// Centre radius of every turn (m).
    fn calc_turn_radii(&self) -> Result<Vec<f64>>;
}

/// Which parameter source to build for a winding.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceKind {
    /// Closed-form formulas
    Analytic,
    /// `C.csv` and `L_<freq>.csv` from a directory
    Tabulated { dir: PathBuf },
    /// Another source with L and R frozen at `frequency`
    Snapshot {
        base: Box<SourceKind>,
        frequency: f64,
    },
}

/// Build the configured source for `winding`.
pub fn build_source(kind: &SourceKind, winding: &Winding) -> Result<Arc<dyn ParameterSource>> {
    let source: Arc<dyn ParameterSource> = match kind {
        SourceKind::Analytic => Arc::new(AnalyticSource::new(winding)?),
        SourceKind::Tabulated { dir } => Arc::new(TabulatedSource::load(dir, winding)?),
        SourceKind::Snapshot { base, frequency } => {
            let base = build_source(base, winding)?;
            Arc::new(SnapshotSource::new(base.as_ref(), *frequency)?)
        }
    };
    if source.num_turns() != winding.num_turns() {
        return Err(TfmrError::dimension(
            "parameter source turn count",
            winding.num_turns(),
            source.num_turns(),
        ));
    }
    Ok(source)
}

/// Check that `m` is an `n x n` matrix of finite values.
pub fn check_matrix(what: &str, m: &RMatrix, n: usize) -> Result<()> {
    if m.rows() != n {
        return Err(TfmrError::dimension(format!("{what} rows"), n, m.rows()));
    }
    if m.cols() != n {
        return Err(TfmrError::dimension(format!("{what} columns"), n, m.cols()));
    }
    if !m.is_finite() {
        return Err(TfmrError::InvalidParameterMatrix {
            what: what.to_string(),
            message: "contains NaN or infinite entries".to_string(),
        });
    }
    Ok(())
}

/// Check turn radii: one per turn, each positive and finite.
pub fn check_radii(radii: &[f64], n: usize) -> Result<()> {
    if radii.len() != n {
        return Err(TfmrError::dimension("turn radius vector", n, radii.len()));
    }
    for (turn, &radius) in radii.iter().enumerate() {
        if !(radius.is_finite() && radius > 0.0) {
            return Err(TfmrError::NonPositiveRadius { turn, radius });
        }
    }
    Ok(())
}

/// Verify a source honours its contract before any solve is attempted.
pub fn check_source(source: &dyn ParameterSource) -> Result<()> {
    let n = source.num_turns();
    if n == 0 {
        return Err(TfmrError::invalid_winding("parameter source has no turns"));
    }
    check_radii(&source.calc_turn_radii()?, n)?;
    check_matrix("C", &source.calc_c_matrix()?, n)?;
    check_matrix("L", &source.calc_l_matrix(CHECK_FREQUENCY)?, n)?;
    check_matrix("R", &source.calc_r_matrix(CHECK_FREQUENCY)?, n)?;
    Ok(())
}

/// Divide absolute pair quantities by `2π·sqrt(r_i·r_j)`.
pub fn to_per_unit_length(absolute: &RMatrix, radii: &[f64]) -> RMatrix {
    RMatrix::from_fn(absolute.rows(), absolute.cols(), |i, j| {
        absolute[(i, j)] / (2.0 * PI * (radii[i] * radii[j]).sqrt())
    })
}

/// Inverse of [`to_per_unit_length`].
pub fn to_absolute(per_unit_length: &RMatrix, radii: &[f64]) -> RMatrix {
    RMatrix::from_fn(per_unit_length.rows(), per_unit_length.cols(), |i, j| {
        per_unit_length[(i, j)] * 2.0 * PI * (radii[i] * radii[j]).sqrt()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Broken {
        radii: Vec<f64>,
        c_size: usize,
    }

    impl ParameterSource for Broken {
        fn num_turns(&self) -> usize {
            3
        }
        fn calc_l_matrix(&self, _frequency: f64) -> Result<RMatrix> {
            Ok(RMatrix::identity(3))
        }
        fn calc_c_matrix(&self) -> Result<RMatrix> {
            Ok(RMatrix::identity(self.c_size))
        }
        fn calc_r_matrix(&self, _frequency: f64) -> Result<RMatrix> {
            Ok(RMatrix::identity(3))
        }
        fn calc_turn_radii(&self) -> Result<Vec<f64>> {
            Ok(self.radii.clone())
        }
    }

    #[test]
    fn test_check_source_accepts_consistent_source() {
        let ok = Broken {
            radii: vec![0.4, 0.41, 0.42],
            c_size: 3,
        };
        assert!(check_source(&ok).is_ok());
    }

    #[test]
    fn test_check_source_rejects_bad_radius() {
        let bad = Broken {
            radii: vec![0.4, 0.0, 0.42],
            c_size: 3,
        };
        assert!(matches!(
            check_source(&bad),
            Err(TfmrError::NonPositiveRadius { turn: 1, .. })
        ));

        let short = Broken {
            radii: vec![0.4, 0.41],
            c_size: 3,
        };
        assert!(matches!(
            check_source(&short),
            Err(TfmrError::DimensionMismatch { expected: 3, found: 2, .. })
        ));
    }

    #[test]
    fn test_check_source_rejects_wrong_shape() {
        let bad = Broken {
            radii: vec![0.4, 0.41, 0.42],
            c_size: 4,
        };
        let err = check_source(&bad).unwrap_err();
        assert!(matches!(err, TfmrError::DimensionMismatch { .. }));
        assert!(!err.is_per_frequency());
    }

    #[test]
    fn test_per_unit_length_round_trip_is_symmetric() {
        let radii = [0.3, 0.5];
        let abs = RMatrix::from_rows(vec![vec![2e-6, 5e-7], vec![5e-7, 4e-6]]).unwrap();
        let pul = to_per_unit_length(&abs, &radii);
        assert!(pul.is_symmetric(1e-15));
        let back = to_absolute(&pul, &radii);
        for i in 0..2 {
            for j in 0..2 {
                assert!((back[(i, j)] - abs[(i, j)]).abs() < 1e-20);
            }
        }
    }
}
