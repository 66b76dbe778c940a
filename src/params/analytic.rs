//! Closed-form inductance and capacitance for axisymmetric turns.
//!
//! Inductance treats every turn as a circular filament in free space: the
//! self term is the classic ring formula with a rectangular-section
//! geometric mean distance, and mutual terms use Maxwell's formula for
//! coaxial loops. Both are frequency independent.
//!
//! Capacitance is assembled as a Maxwell matrix from parallel-plate
//! couplings between nearest neighbours (paper, plus any oil gap) and from
//! the outermost turns to the grounded core, tank and yokes.

use std::f64::consts::PI;

use tracing::debug;

use super::resistance::ResistanceModel;
use super::{to_per_unit_length, ParameterSource};
use crate::error::{Result, TfmrError};
use crate::linalg::RMatrix;
use crate::winding::{validate_winding, ConductorSpec, Material, Winding};
use crate::{EPS0, MU0};

/// GMD of a rectangle is about 0.2235 of its perimeter semi-sum.
const RECT_GMD_FACTOR: f64 = 0.2235;

/// Grounded structure around the turns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Enclosure {
    /// Core leg radius (m)
    pub core_radius: f64,
    /// Tank wall radius (m)
    pub tank_radius: f64,
    /// Axial position of the bottom yoke (m)
    pub bottom_yoke: f64,
    /// Axial position of the top yoke (m)
    pub top_yoke: f64,
}

impl Enclosure {
    pub fn of_winding(winding: &Winding) -> Self {
        Self {
            core_radius: winding.layout.core_radius,
            tank_radius: winding.outer_radius() + winding.clearance.tank,
            bottom_yoke: 0.0,
            top_yoke: winding.window_height(),
        }
    }
}

/// Parameter source built from closed-form formulas.
#[derive(Debug, Clone)]
pub struct AnalyticSource {
    radii: Vec<f64>,
    /// Per-unit-length inductance
    l: RMatrix,
    /// Per-unit-length capacitance
    c: RMatrix,
    resistance: ResistanceModel,
}

impl AnalyticSource {
    /// Parameters of every turn of `winding`.
    pub fn new(winding: &Winding) -> Result<Self> {
        validate_winding(winding)?;
        let turns: Vec<(f64, f64)> = (0..winding.num_turns())
            .map(|n| winding.turn_midpoint(n))
            .collect();
        Self::from_turns(
            &turns,
            winding.conductor,
            winding.material,
            Enclosure::of_winding(winding),
        )
    }

    /// Parameters of an explicit set of `(radius, axial)` turn centres.
    pub fn from_turns(
        turns: &[(f64, f64)],
        conductor: ConductorSpec,
        material: Material,
        enclosure: Enclosure,
    ) -> Result<Self> {
        if turns.is_empty() {
            return Err(TfmrError::invalid_winding("no turns given"));
        }
        for (turn, &(radius, _)) in turns.iter().enumerate() {
            if !(radius.is_finite() && radius > 0.0) {
                return Err(TfmrError::NonPositiveRadius { turn, radius });
            }
        }

        let radii: Vec<f64> = turns.iter().map(|t| t.0).collect();
        let l_abs = inductance_matrix(turns, &conductor)?;
        let c_abs = capacitance_matrix(turns, &conductor, &material, &enclosure)?;
        debug!(
            turns = turns.len(),
            l_trace = l_abs.diagonal().iter().sum::<f64>(),
            c_trace = c_abs.diagonal().iter().sum::<f64>(),
            "analytic parameters ready"
        );

        Ok(Self {
            l: to_per_unit_length(&l_abs, &radii),
            c: to_per_unit_length(&c_abs, &radii),
            resistance: ResistanceModel::new(
                turns.len(),
                material.resistivity,
                conductor.height,
                conductor.width,
            ),
            radii,
        })
    }
}

impl ParameterSource for AnalyticSource {
    fn num_turns(&self) -> usize {
        self.radii.len()
    }

    fn calc_l_matrix(&self, _frequency: f64) -> Result<RMatrix> {
        Ok(self.l.clone())
    }

    fn calc_c_matrix(&self) -> Result<RMatrix> {
        Ok(self.c.clone())
    }

    fn calc_r_matrix(&self, frequency: f64) -> Result<RMatrix> {
        Ok(self.resistance.calc_r_matrix(frequency))
    }

    fn calc_turn_radii(&self) -> Result<Vec<f64>> {
        Ok(self.radii.clone())
    }
}

/// Self inductance of a ring of rectangular section (H).
pub fn self_inductance(radius: f64, conductor: &ConductorSpec) -> f64 {
    let gmd = RECT_GMD_FACTOR * (conductor.height + conductor.width);
    MU0 * radius * ((8.0 * radius / gmd).ln() - 2.0)
}

/// Mutual inductance of two coaxial circular filaments (H).
pub fn mutual_inductance(r1: f64, z1: f64, r2: f64, z2: f64) -> f64 {
    let dz2 = (z1 - z2).powi(2);
    let denom = (r1 + r2).powi(2) + dz2;
    let k2 = 4.0 * r1 * r2 / denom;
    // Complementary modulus without cancellation for close filaments
    let kp2 = ((r1 - r2).powi(2) + dz2) / denom;
    let k = k2.sqrt();
    let (big_k, big_e) = elliptic_ke(k2, kp2);
    MU0 * (r1 * r2).sqrt() * ((2.0 / k - k) * big_k - 2.0 / k * big_e)
}

/// Complete elliptic integrals K and E by the arithmetic-geometric mean.
fn elliptic_ke(k2: f64, kp2: f64) -> (f64, f64) {
    let mut a = 1.0f64;
    let mut b = kp2.sqrt();
    let mut sum = k2 / 2.0;
    let mut weight = 0.5;
    for _ in 0..64 {
        if (a - b).abs() <= 1e-15 * a {
            break;
        }
        let c = (a - b) / 2.0;
        let next_a = (a + b) / 2.0;
        b = (a * b).sqrt();
        a = next_a;
        weight *= 2.0;
        sum += weight * c * c;
    }
    let k = PI / (2.0 * a);
    (k, k * (1.0 - sum))
}

fn inductance_matrix(turns: &[(f64, f64)], conductor: &ConductorSpec) -> Result<RMatrix> {
    let n = turns.len();
    let mut l = RMatrix::zeros(n, n);
    for i in 0..n {
        let (ri, zi) = turns[i];
        l[(i, i)] = self_inductance(ri, conductor);
        for j in (i + 1)..n {
            let (rj, zj) = turns[j];
            if ri == rj && zi == zj {
                return Err(TfmrError::invalid_winding(format!(
                    "turns {i} and {j} share the same position"
                )));
            }
            let m = mutual_inductance(ri, zi, rj, zj);
            l[(i, j)] = m;
            l[(j, i)] = m;
        }
    }
    Ok(l)
}

/// Stack a two-terminal capacitance into a Maxwell matrix.
fn couple(k: &mut RMatrix, i: usize, j: usize, c: f64) {
    k.add_at(i, i, c);
    k.add_at(j, j, c);
    k.add_at(i, j, -c);
    k.add_at(j, i, -c);
}

/// Parallel-plate capacitance per unit area through paper and then oil.
fn layered(material: &Material, paper: f64, oil: f64) -> f64 {
    EPS0 / (paper / material.eps_paper + oil / material.eps_oil)
}

fn capacitance_matrix(
    turns: &[(f64, f64)],
    conductor: &ConductorSpec,
    material: &Material,
    enclosure: &Enclosure,
) -> Result<RMatrix> {
    let n = turns.len();
    let ti = conductor.insulation;
    let half_w = conductor.width / 2.0 + ti;
    let half_h = conductor.height / 2.0 + ti;
    let tol = 1e-6 * (conductor.width + conductor.height);
    let mut k = RMatrix::zeros(n, n);

    // Nearest neighbour outward in the same disc, and upward in the same column
    for (i, &(ri, zi)) in turns.iter().enumerate() {
        let radial = turns
            .iter()
            .enumerate()
            .filter(|&(_, &(r, z))| (z - zi).abs() < tol && r > ri + tol)
            .min_by(|a, b| a.1 .0.total_cmp(&b.1 .0));
        if let Some((j, &(rj, _))) = radial {
            let oil = (rj - ri - 2.0 * half_w).max(0.0);
            let per_area = layered(material, 2.0 * ti, oil);
            couple(&mut k, i, j, per_area * conductor.height * PI * (ri + rj));
        }

        let axial = turns
            .iter()
            .enumerate()
            .filter(|&(_, &(r, z))| (r - ri).abs() < tol && z > zi + tol)
            .min_by(|a, b| a.1 .1.total_cmp(&b.1 .1));
        if let Some((j, &(_, zj))) = axial {
            let oil = (zj - zi - 2.0 * half_h).max(0.0);
            let per_area = layered(material, 2.0 * ti, oil);
            couple(&mut k, i, j, per_area * conductor.width * 2.0 * PI * ri);
        }
    }

    // Ground: innermost turns to the core, outermost to the tank, end discs to the yokes
    let inner = turns.iter().map(|t| t.0 - half_w).fold(f64::INFINITY, f64::min);
    let outer = turns.iter().map(|t| t.0 + half_w).fold(f64::NEG_INFINITY, f64::max);
    let lowest = turns.iter().map(|t| t.1 - half_h).fold(f64::INFINITY, f64::min);
    let highest = turns.iter().map(|t| t.1 + half_h).fold(f64::NEG_INFINITY, f64::max);

    let gaps = [
        ("core", inner - enclosure.core_radius),
        ("tank", enclosure.tank_radius - outer),
        ("bottom yoke", lowest - enclosure.bottom_yoke),
        ("top yoke", enclosure.top_yoke - highest),
    ];
    for (what, gap) in gaps {
        if !(gap.is_finite() && gap >= 0.0) {
            return Err(TfmrError::invalid_winding(format!(
                "turns overlap the {what} (clearance {gap:.4e} m)"
            )));
        }
    }

    for (i, &(r, z)) in turns.iter().enumerate() {
        let length = 2.0 * PI * r;
        let mut ground = 0.0;
        if (r - half_w - inner).abs() < tol {
            ground += layered(material, ti, gaps[0].1) * conductor.height;
        }
        if (r + half_w - outer).abs() < tol {
            ground += layered(material, ti, gaps[1].1) * conductor.height;
        }
        if (z - half_h - lowest).abs() < tol {
            ground += layered(material, ti, gaps[2].1) * conductor.width;
        }
        if (z + half_h - highest).abs() < tol {
            ground += layered(material, ti, gaps[3].1) * conductor.width;
        }
        k.add_at(i, i, ground * length);
    }

    Ok(k)
}
