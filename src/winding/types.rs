//! Core types for winding representation.

use num_complex::Complex64;
use std::fmt;

use crate::INCH;

/// Location of one turn in the winding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurnAddress {
    /// Disc index, 0 at the top of the stack
    pub disc: usize,
    /// Position within the disc in winding order
    pub position: usize,
    /// Radius of the conductor centre (m)
    pub radius: f64,
    /// Axial position of the conductor centre above the bottom yoke (m)
    pub axial: f64,
}

impl fmt::Display for TurnAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "D{}.T{} (r={:.4} m, z={:.4} m)",
            self.disc, self.position, self.radius, self.axial
        )
    }
}

/// Conductor cross-section and paper covering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConductorSpec {
    /// Axial height of the bare conductor (m)
    pub height: f64,
    /// Radial width of the bare conductor (m)
    pub width: f64,
    /// Paper thickness on each side (m)
    pub insulation: f64,
}

impl ConductorSpec {
    /// Radial centre-to-centre distance of neighbouring turns.
    pub fn radial_pitch(&self) -> f64 {
        self.width + 2.0 * self.insulation
    }

    /// Axial extent of one insulated conductor.
    pub fn insulated_height(&self) -> f64 {
        self.height + 2.0 * self.insulation
    }
}

impl Default for ConductorSpec {
    fn default() -> Self {
        Self {
            height: 0.3 * INCH,
            width: 0.085 * INCH,
            insulation: 0.018 * INCH,
        }
    }
}

/// Radial build of the winding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutSpec {
    /// Inner radius of the winding (m)
    pub inner_radius: f64,
    /// Axial spacer height between discs (m)
    pub spacer: f64,
    /// Core leg radius (m)
    pub core_radius: f64,
}

impl Default for LayoutSpec {
    fn default() -> Self {
        Self {
            inner_radius: 15.25 * INCH,
            spacer: 0.188 * INCH,
            core_radius: 12.1 * INCH,
        }
    }
}

/// Oil gaps between the winding and the grounded structure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clearance {
    /// Bottom yoke to the lowest disc (m)
    pub bottom: f64,
    /// Highest disc to the top yoke (m)
    pub top: f64,
    /// Outermost turn to the tank wall (m)
    pub tank: f64,
}

impl Default for Clearance {
    fn default() -> Self {
        Self {
            bottom: 2.0 * INCH,
            top: 2.0 * INCH,
            tank: 4.0 * INCH,
        }
    }
}

/// Conductor and dielectric properties.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    /// Conductor resistivity (Ω·m)
    pub resistivity: f64,
    /// Relative permittivity of the oil
    pub eps_oil: f64,
    /// Relative permittivity of the paper
    pub eps_paper: f64,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            resistivity: 1.68e-8,
            eps_oil: 1.0,
            eps_paper: 2.2,
        }
    }
}

/// Source and load terminations.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Terminals {
    /// Impedance behind the unit source at the line terminal (Ω)
    pub source: Complex64,
    /// Impedance from the far end of the last turn to ground (Ω)
    pub load: Complex64,
}

impl Terminals {
    pub fn new(source: Complex64, load: Complex64) -> Self {
        Self { source, load }
    }

    /// True when the far end of the last turn is solidly grounded.
    pub fn load_grounded(&self) -> bool {
        self.load == Complex64::new(0.0, 0.0)
    }
}
