//! Lumped-reuse source: parameters frozen at one frequency.

use tracing::debug;

use super::{check_source, ParameterSource};
use crate::error::{Result, TfmrError};
use crate::linalg::RMatrix;

/// Wraps another source and replays its L and R from a single reference
/// frequency for every query.
///
/// Useful for separating distributed-line effects from frequency-dependent
/// parameter effects in a sweep.
#[derive(Debug, Clone)]
pub struct SnapshotSource {
    reference_frequency: f64,
    radii: Vec<f64>,
    l: RMatrix,
    c: RMatrix,
    r: RMatrix,
}

impl SnapshotSource {
    pub fn new(base: &dyn ParameterSource, reference_frequency: f64) -> Result<Self> {
        if !(reference_frequency.is_finite() && reference_frequency >= 0.0) {
            return Err(TfmrError::invalid_sweep(format!(
                "snapshot frequency must be non-negative, got {reference_frequency}"
            )));
        }
        check_source(base)?;
        debug!(reference_frequency, "freezing parameter source");
        Ok(Self {
            reference_frequency,
            radii: base.calc_turn_radii()?,
            l: base.calc_l_matrix(reference_frequency)?,
            c: base.calc_c_matrix()?,
            r: base.calc_r_matrix(reference_frequency)?,
        })
    }

    pub fn reference_frequency(&self) -> f64 {
        self.reference_frequency
    }
}

impl ParameterSource for SnapshotSource {
    fn num_turns(&self) -> usize {
        self.radii.len()
    }

    fn calc_l_matrix(&self, _frequency: f64) -> Result<RMatrix> {
        Ok(self.l.clone())
    }

    fn calc_c_matrix(&self) -> Result<RMatrix> {
        Ok(self.c.clone())
    }

    fn calc_r_matrix(&self, _frequency: f64) -> Result<RMatrix> {
        Ok(self.r.clone())
    }

    fn calc_turn_radii(&self) -> Result<Vec<f64>> {
        Ok(self.radii.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::AnalyticSource;
    use crate::winding::Winding;

    #[test]
    fn test_resistance_frozen() {
        let base = AnalyticSource::new(&Winding::new(2, 3)).unwrap();
        let snap = SnapshotSource::new(&base, 1e6).unwrap();
        let frozen = base.calc_r_matrix(1e6).unwrap();
        for f in [0.0, 1e3, 1e7] {
            assert_eq!(snap.calc_r_matrix(f).unwrap(), frozen);
        }
        assert_eq!(snap.calc_c_matrix().unwrap(), base.calc_c_matrix().unwrap());
        assert_eq!(snap.reference_frequency(), 1e6);
    }

    #[test]
    fn test_negative_reference_rejected() {
        let base = AnalyticSource::new(&Winding::new(1, 2)).unwrap();
        assert!(SnapshotSource::new(&base, -5.0).is_err());
    }
}
