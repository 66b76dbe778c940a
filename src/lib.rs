//! # tfmr Core
//!
//! High-frequency response of disc-type transformer windings.
//!
//! This library provides:
//! - A small DSL for describing winding geometry, materials and sweep settings
//! - Per-turn electrical parameters (inductance, capacitance, resistance)
//!   from closed-form models or precomputed tables
//! - A multiconductor transmission-line solver and a lumped-circuit solver
//! - Parallel frequency sweeps with per-point failure isolation
//!
//! ## Architecture
//!
//! - [`dsl`] - Parser for the winding description language
//! - [`winding`] - Winding geometry and turn addressing
//! - [`params`] - Electrical parameter sources and the resistance model
//! - [`linalg`] - Dense matrices, LU factorisation and the matrix exponential
//! - [`solver`] - MTL and lumped solvers plus the frequency sweep
//! - [`report`] - CSV output (CLI only)
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info tfmr winding.wdg --model both > response.csv
//! ```
//!
//! ```no_run
//! use std::sync::Arc;
//! use tfmr_core::{build_source, FrequencySweep, MtlSolver, SourceKind, SweepConfig, Winding};
//!
//! # fn main() -> tfmr_core::Result<()> {
//! let winding = Winding::default();
//! let source = build_source(&SourceKind::Analytic, &winding)?;
//! let solver = MtlSolver::new(Arc::clone(&source), winding.terminals)?;
//! let sweep = FrequencySweep::new(SweepConfig::default())?;
//! let result = sweep.run(&solver, None)?;
//! println!("{} of {} points solved", result.valid_count(), result.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Units
//!
//! Everything is SI. Per-unit-length parameter matrices are per metre of
//! turn length; multiplying row `i` by the turn length `2π·r_i` gives the
//! absolute quantity for that turn.

pub mod dsl;
pub mod error;
pub mod linalg;
pub mod params;
pub mod solver;
pub mod winding;

#[cfg(feature = "cli")]
pub mod report;

// Re-export main types for convenience
pub use error::{Result, TfmrError};
pub use params::{build_source, ParameterSource, SourceKind};
pub use solver::{
    FrequencyResponseSolver, FrequencySweep, LumpedSolver, MtlSolver, ResponseSample,
    SweepConfig, SweepResult,
};
pub use winding::{validate_winding, Winding};

/// Permeability of free space (H/m)
pub const MU0: f64 = 4.0e-7 * std::f64::consts::PI;

/// Permittivity of free space (F/m)
pub const EPS0: f64 = 8.854_187_812_8e-12;

/// One inch in metres
pub const INCH: f64 = 0.0254;
