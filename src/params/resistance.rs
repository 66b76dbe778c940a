//! Per-turn AC resistance with a closed-form skin-effect correction.

use crate::linalg::RMatrix;
use crate::winding::Winding;
use crate::MU0;
use num_complex::Complex64;

/// Below this |η| the series form of `η·coth(η)` is used.
const SERIES_LIMIT: f64 = 1e-3;

/// Diagonal resistance model for rectangular strip conductors.
///
/// The DC term is `ρ/(h·w)` per unit length. Skin effect in a strip of
/// width `w` adds `Re[η·coth(η)] - 1` times that, with
/// `η = sqrt(j·2πf·μ₀·σ)·w/2`, so the correction vanishes at DC and grows
/// with frequency.
#[derive(Debug, Clone, PartialEq)]
pub struct ResistanceModel {
    num_turns: usize,
    resistivity: f64,
    height: f64,
    width: f64,
}

impl ResistanceModel {
    pub fn new(num_turns: usize, resistivity: f64, height: f64, width: f64) -> Self {
        Self {
            num_turns,
            resistivity,
            height,
            width,
        }
    }

    pub fn from_winding(winding: &Winding) -> Self {
        Self::new(
            winding.num_turns(),
            winding.material.resistivity,
            winding.conductor.height,
            winding.conductor.width,
        )
    }

    /// DC resistance per unit length, Ω/m.
    pub fn dc_resistance(&self) -> f64 {
        self.resistivity / (self.height * self.width)
    }

    /// Skin-effect excess over the DC value, Ω/m. Zero at `f = 0`.
    pub fn skin_excess(&self, frequency: f64) -> f64 {
        if frequency <= 0.0 {
            return 0.0;
        }
        let sigma = 1.0 / self.resistivity;
        let eta = (Complex64::i() * (2.0 * std::f64::consts::PI * frequency * MU0 * sigma)).sqrt()
            * (self.width / 2.0);
        // Re[η·coth η] ≥ 1 for η on the 45° ray; clamp rounding near DC
        ((eta_coth(eta).re - 1.0) / (sigma * self.height * self.width)).max(0.0)
    }

    /// Diagonal resistance matrix at `frequency`.
    ///
    /// Turn 0 carries no DC term, only the skin correction.
    pub fn calc_r_matrix(&self, frequency: f64) -> RMatrix {
        let r_dc = self.dc_resistance();
        let r_skin = self.skin_excess(frequency);
        let diag: Vec<f64> = (0..self.num_turns)
            .map(|t| if t > 0 { r_dc + r_skin } else { r_skin })
            .collect();
        RMatrix::from_diagonal(&diag)
    }
}

/// `η·coth(η)`, finite as `η → 0`.
fn eta_coth(eta: Complex64) -> Complex64 {
    if eta.norm() < SERIES_LIMIT {
        let e2 = eta * eta;
        return 1.0 + e2 / 3.0 - e2 * e2 / 45.0;
    }
    // coth η = (1 + e^{-2η}) / (1 - e^{-2η}) stays bounded for Re η > 0
    let x = (-2.0 * eta).exp();
    eta * (1.0 + x) / (1.0 - x)
}
