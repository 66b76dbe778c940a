//! Lumped-element model of the winding.
//!
//! Each turn becomes one series branch `R + jωL` between consecutive
//! junction nodes; the capacitance matrix is lumped onto the node at the
//! start of every turn. Node 0 is the line terminal. With a grounded load the
//! far end of the last turn is the reference node and is dropped, otherwise
//! it becomes an extra node tied to ground through the load admittance.
//!
//! Injecting a unit current at node 0 makes the first row of `Y⁻¹` the node
//! voltages directly, so the source impedance never enters the result.

use std::f64::consts::PI;
use std::sync::Arc;

use num_complex::Complex64;
use tracing::debug;

use super::{check_frequency, fetch_series_parameters, FrequencyResponseSolver, ResponseSample};
use crate::error::{Result, TfmrError};
use crate::linalg::{CMatrix, LuDecomposition, RMatrix};
use crate::params::{check_source, ParameterSource};
use crate::winding::Terminals;

pub struct LumpedSolver {
    source: Arc<dyn ParameterSource>,
    terminals: Terminals,
    num_turns: usize,
    gamma: Vec<f64>,
    /// Absolute capacitance
    c_abs: RMatrix,
    /// Branch-to-node incidence
    incidence: CMatrix,
}

impl LumpedSolver {
    pub fn new(source: Arc<dyn ParameterSource>, terminals: Terminals) -> Result<Self> {
        check_source(source.as_ref())?;
        let num_turns = source.num_turns();
        let gamma: Vec<f64> = source
            .calc_turn_radii()?
            .iter()
            .map(|r| 2.0 * PI * r)
            .collect();
        let c_abs = source.calc_c_matrix()?.scale_rows(&gamma);
        let incidence = build_incidence(num_turns, terminals.load_grounded());
        debug!(
            turns = num_turns,
            nodes = incidence.cols(),
            grounded = terminals.load_grounded(),
            "lumped solver initialised"
        );

        Ok(Self {
            source,
            terminals,
            num_turns,
            gamma,
            c_abs,
            incidence,
        })
    }

    fn num_nodes(&self) -> usize {
        self.incidence.cols()
    }

    /// `Y = Qᵀ·Zb⁻¹·Q + jωC`, plus the load admittance on the far node.
    fn nodal_admittance(&self, frequency: f64, l: &RMatrix, r: &RMatrix) -> Result<CMatrix> {
        let n = self.num_turns;
        let omega = 2.0 * PI * frequency;

        let l_abs = l.scale_rows(&self.gamma);
        let r_abs = r.scale_rows(&self.gamma);
        let zb = r_abs.with_imaginary(&l_abs.scale(omega));
        let yb = LuDecomposition::factor(&zb)
            .and_then(|lu| lu.inverse())
            .map_err(|_| TfmrError::SingularSystem {
                frequency,
                stage: "branch impedance",
            })?;

        let qt = self.incidence.transpose();
        let mut y = qt.matmul(&yb).matmul(&self.incidence);
        for i in 0..n {
            for j in 0..n {
                y.add_at(i, j, Complex64::new(0.0, omega * self.c_abs[(i, j)]));
            }
        }
        if !self.terminals.load_grounded() {
            y.add_at(n, n, self.terminals.load.inv());
        }
        Ok(y)
    }
}

/// Branch `t` runs from node `t` to node `t + 1`; the last branch ends on
/// ground when there is no load node.
fn build_incidence(n: usize, grounded: bool) -> CMatrix {
    let m = if grounded { n } else { n + 1 };
    let one = Complex64::new(1.0, 0.0);
    let mut q = CMatrix::zeros(n, m);
    for t in 0..n {
        q[(t, t)] = one;
        if t + 1 < m {
            q[(t, t + 1)] = -one;
        }
    }
    q
}

impl FrequencyResponseSolver for LumpedSolver {
    fn name(&self) -> &'static str {
        "lumped"
    }

    fn num_turns(&self) -> usize {
        self.num_turns
    }

    fn calc_response_at_freq(&self, frequency: f64) -> Result<ResponseSample> {
        check_frequency(frequency)?;
        let (l, r) = fetch_series_parameters(self.source.as_ref(), frequency, self.num_turns)?;
        let y = self.nodal_admittance(frequency, &l, &r)?;

        let lu = LuDecomposition::factor(&y).map_err(|_| TfmrError::SingularSystem {
            frequency,
            stage: "nodal admittance",
        })?;
        let z = lu.inverse()?;
        let condition = lu.condition_from_inverse(&z);
        if !condition.is_finite() {
            return Err(TfmrError::IllConditioned {
                frequency,
                stage: "nodal admittance",
                condition,
            });
        }

        let mut junctions: Vec<Complex64> = z.row(0)[..self.num_nodes()].to_vec();
        if self.terminals.load_grounded() {
            junctions.push(Complex64::new(0.0, 0.0));
        }
        ResponseSample::from_junctions(frequency, z[(0, 0)], &junctions, "nodal admittance")
    }
}
