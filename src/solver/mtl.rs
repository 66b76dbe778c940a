//! Multiconductor transmission-line model of the winding.
//!
//! Unknowns of the boundary system, each block `num_turns` long:
//!
//! ```text
//! x = [ V_near | V_far | I_near | I_far ]
//! ```
//!
//! The first `2n` rows are the line equations `[V_far; I_far] = Φ·[V_near; I_near]`.
//! The last `2n` rows are `[HA | HB]`: the unit source behind the source
//! impedance, voltage continuity between consecutive turns, current
//! continuity between consecutive turns, and the load at the far end.

use std::f64::consts::PI;
use std::sync::Arc;

use num_complex::Complex64;
use tracing::debug;

use super::{check_frequency, fetch_series_parameters, FrequencyResponseSolver, ResponseSample};
use crate::error::{Result, TfmrError};
use crate::linalg::{expm, CMatrix, LuDecomposition, RMatrix};
use crate::params::{check_source, ParameterSource};
use crate::winding::Terminals;

/// MTL frequency-response solver.
pub struct MtlSolver {
    source: Arc<dyn ParameterSource>,
    terminals: Terminals,
    num_turns: usize,
    /// Per-unit-length capacitance
    c: RMatrix,
    /// Turn lengths 2πr
    gamma: Vec<f64>,
    /// Topology rows over the voltage unknowns
    ha: RMatrix,
}

impl MtlSolver {
    /// Build a solver; validates the source and precomputes everything that
    /// does not depend on frequency.
    pub fn new(source: Arc<dyn ParameterSource>, terminals: Terminals) -> Result<Self> {
        check_source(source.as_ref())?;
        let num_turns = source.num_turns();
        let c = source.calc_c_matrix()?;
        let gamma = source
            .calc_turn_radii()?
            .iter()
            .map(|r| 2.0 * PI * r)
            .collect();
        let ha = build_ha(num_turns);
        debug!(
            turns = num_turns,
            system_size = 4 * num_turns,
            "MTL solver initialised"
        );

        Ok(Self {
            source,
            terminals,
            num_turns,
            c,
            gamma,
            ha,
        })
    }

    /// Terminal rows over the current unknowns.
    fn build_hb(&self) -> CMatrix {
        let n = self.num_turns;
        let one = Complex64::new(1.0, 0.0);
        let mut hb = CMatrix::zeros(2 * n, 2 * n);
        // V_near[0] + Zs·I_near[0] = 1
        hb[(0, 0)] = self.terminals.source;
        // I_near[t+1] - I_far[t] = 0
        for t in 0..n.saturating_sub(1) {
            hb[(n + t, t + 1)] = one;
            hb[(n + t, n + t)] = -one;
        }
        // V_far[n-1] - Zl·I_far[n-1] = 0
        hb[(2 * n - 1, 2 * n - 1)] = -self.terminals.load;
        hb
    }

    /// Propagation operator over one turn length.
    fn propagation_matrix(&self, frequency: f64, l: &RMatrix, r: &RMatrix) -> CMatrix {
        let n = self.num_turns;
        let omega = 2.0 * PI * frequency;
        let mut a = CMatrix::zeros(2 * n, 2 * n);
        for i in 0..n {
            let g = self.gamma[i];
            for j in 0..n {
                a[(i, n + j)] = Complex64::new(-g * r[(i, j)], -g * omega * l[(i, j)]);
                a[(n + i, j)] = Complex64::new(0.0, -g * omega * self.c[(i, j)]);
            }
        }
        a
    }
}

/// Connectivity rows: source terminal, then `V_near[t] = V_far[t-1]`, then
/// the far-end voltage of the last turn for the load row.
fn build_ha(n: usize) -> RMatrix {
    let mut ha = RMatrix::zeros(2 * n, 2 * n);
    ha[(0, 0)] = 1.0;
    for t in 1..n {
        ha[(t, t)] = 1.0;
        ha[(t, n + t - 1)] = -1.0;
    }
    ha[(2 * n - 1, 2 * n - 1)] = 1.0;
    ha
}

impl FrequencyResponseSolver for MtlSolver {
    fn name(&self) -> &'static str {
        "mtl"
    }

    fn num_turns(&self) -> usize {
        self.num_turns
    }

    fn calc_response_at_freq(&self, frequency: f64) -> Result<ResponseSample> {
        check_frequency(frequency)?;
        let n = self.num_turns;
        let (l, r) = fetch_series_parameters(self.source.as_ref(), frequency, n)?;

        let a = self.propagation_matrix(frequency, &l, &r);
        let phi = expm(&a).map_err(|e| TfmrError::ExpmUnstable {
            frequency,
            norm: e.norm,
            squarings: e.squarings,
            message: e.reason,
        })?;

        let mut b = CMatrix::zeros(4 * n, 4 * n);
        let minus_identity = CMatrix::identity(n).scale(Complex64::new(-1.0, 0.0));
        // [Φ₁ | -I | Φ₂ |  0 ]
        // [    |  0 |    | -I ]
        b.set_block(0, 0, &phi.block(0, 0, 2 * n, n));
        b.set_block(0, 2 * n, &phi.block(0, n, 2 * n, n));
        b.set_block(0, n, &minus_identity);
        b.set_block(n, 3 * n, &minus_identity);
        // [HA | HB]
        b.set_block(2 * n, 0, &self.ha.to_complex());
        b.set_block(2 * n, 2 * n, &self.build_hb());

        let lu = LuDecomposition::factor(&b).map_err(|_| TfmrError::SingularSystem {
            frequency,
            stage: "boundary system",
        })?;
        let mut v = vec![Complex64::new(0.0, 0.0); 4 * n];
        v[2 * n] = Complex64::new(1.0, 0.0);
        let x = lu.solve(&v)?;

        let v_near0 = x[0];
        let i_near0 = x[2 * n];
        let mut junctions = Vec::with_capacity(n + 1);
        junctions.push(v_near0);
        junctions.extend_from_slice(&x[n..2 * n]);

        ResponseSample::from_junctions(frequency, v_near0 / i_near0, &junctions, "boundary system")
    }
}
