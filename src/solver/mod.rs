//! Frequency-response solvers.
//!
//! Two formulations of the same winding:
//!
//! - [`MtlSolver`] treats each turn as a segment of a multiconductor
//!   transmission line. The telegrapher's equations
//!
//!   ```text
//!   d/dx [V]   [    0      -Γ(R + jωL) ] [V]
//!        [I] = [ -Γ(jωC)        0      ] [I]
//!   ```
//!
//!   are integrated over one normalised turn length with a matrix
//!   exponential, and the turn-to-turn connections plus terminations close
//!   the resulting boundary-value problem.
//! - [`LumpedSolver`] collapses each turn into a series R-L branch between
//!   junction nodes, with the capacitance lumped at the nodes, and inverts
//!   the nodal admittance matrix.
//!
//! [`FrequencySweep`] drives either one across a frequency grid.

mod lumped;
mod mtl;
mod sweep;

pub use lumped::LumpedSolver;
pub use mtl::MtlSolver;
pub use sweep::{
    linear_spaced, log_spaced, FrequencySweep, InvalidPoint, PointOutcome, ProgressFn,
    SweepConfig, SweepResult, SweepSpacing,
};

use num_complex::Complex64;

use crate::error::{Result, TfmrError};
use crate::linalg::RMatrix;
use crate::params::{check_matrix, ParameterSource};

/// Solution at one frequency.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSample {
    /// Frequency in Hz
    pub frequency: f64,
    /// Impedance seen at the line terminal (Ω)
    pub input_impedance: Complex64,
    /// Voltages at the line terminal, every turn-to-turn junction and the far
    /// end of the last turn, normalised so the line terminal is 1
    pub node_voltages: Vec<Complex64>,
    /// `20·log10(|V_k| / |V_0|)` for each interior junction
    pub transfer_db: Vec<f64>,
}

impl ResponseSample {
    /// Build a sample from raw junction voltages (line terminal first).
    pub(crate) fn from_junctions(
        frequency: f64,
        input_impedance: Complex64,
        junctions: &[Complex64],
        stage: &'static str,
    ) -> Result<Self> {
        let reference = junctions.first().copied().unwrap_or_default();
        let finite = |z: Complex64| z.re.is_finite() && z.im.is_finite();
        if reference.norm() == 0.0
            || !finite(input_impedance)
            || !junctions.iter().all(|&v| finite(v))
        {
            return Err(TfmrError::IllConditioned {
                frequency,
                stage,
                condition: f64::INFINITY,
            });
        }

        let node_voltages: Vec<Complex64> = junctions.iter().map(|&v| v / reference).collect();
        let interior = node_voltages.len().saturating_sub(2);
        let transfer_db = node_voltages[1..=interior]
            .iter()
            .map(|v| 20.0 * v.norm().log10())
            .collect();

        Ok(Self {
            frequency,
            input_impedance,
            node_voltages,
            transfer_db,
        })
    }
}

/// A winding model that can be solved one frequency at a time.
///
/// Solvers are shared read-only between sweep workers.
pub trait FrequencyResponseSolver: Send + Sync {
    /// Short name used in logs and reports.
    fn name(&self) -> &'static str;

    fn num_turns(&self) -> usize;

    /// Solve at a single frequency (Hz).
    fn calc_response_at_freq(&self, frequency: f64) -> Result<ResponseSample>;
}

/// Reject negative or non-finite frequencies.
fn check_frequency(frequency: f64) -> Result<()> {
    if frequency.is_finite() && frequency >= 0.0 {
        Ok(())
    } else {
        Err(TfmrError::invalid_sweep(format!(
            "frequency must be finite and non-negative, got {frequency}"
        )))
    }
}

/// Fetch and shape-check L(f) and R(f).
fn fetch_series_parameters(
    source: &dyn ParameterSource,
    frequency: f64,
    n: usize,
) -> Result<(RMatrix, RMatrix)> {
    let l = source.calc_l_matrix(frequency)?;
    check_matrix("L", &l, n)?;
    let r = source.calc_r_matrix(frequency)?;
    check_matrix("R", &r, n)?;
    Ok((l, r))
}
