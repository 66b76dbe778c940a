//! Winding validation.

use crate::error::{Result, TfmrError};

use super::Winding;

/// Validate a winding before any solver is built from it.
///
/// Checks:
/// - At least one disc and one turn per disc
/// - Conductor, insulation and radial dimensions are positive and finite
/// - The core fits inside the winding
/// - Material constants are physical
/// - Terminal impedances are finite
pub fn validate_winding(winding: &Winding) -> Result<()> {
    if winding.num_discs == 0 || winding.turns_per_disc == 0 {
        return Err(TfmrError::invalid_winding(format!(
            "winding needs at least one turn ({} discs x {} turns per disc)",
            winding.num_discs, winding.turns_per_disc
        )));
    }

    let positive = [
        ("conductor height", winding.conductor.height),
        ("conductor width", winding.conductor.width),
        ("insulation thickness", winding.conductor.insulation),
        ("inner radius", winding.layout.inner_radius),
        ("resistivity", winding.material.resistivity),
        ("oil permittivity", winding.material.eps_oil),
        ("paper permittivity", winding.material.eps_paper),
    ];
    for (what, value) in positive {
        if !(value.is_finite() && value > 0.0) {
            return Err(TfmrError::invalid_winding(format!(
                "{what} must be positive, got {value}"
            )));
        }
    }

    let non_negative = [
        ("spacer height", winding.layout.spacer),
        ("core radius", winding.layout.core_radius),
        ("bottom clearance", winding.clearance.bottom),
        ("top clearance", winding.clearance.top),
        ("tank clearance", winding.clearance.tank),
    ];
    for (what, value) in non_negative {
        if !(value.is_finite() && value >= 0.0) {
            return Err(TfmrError::invalid_winding(format!(
                "{what} must be non-negative, got {value}"
            )));
        }
    }

    if winding.layout.core_radius >= winding.layout.inner_radius {
        return Err(TfmrError::invalid_winding(format!(
            "core radius {} m does not fit inside inner radius {} m",
            winding.layout.core_radius, winding.layout.inner_radius
        )));
    }

    for (what, z) in [
        ("source", winding.terminals.source),
        ("load", winding.terminals.load),
    ] {
        if !(z.re.is_finite() && z.im.is_finite()) {
            return Err(TfmrError::invalid_winding(format!(
                "{what} impedance must be finite, got {z}"
            )));
        }
    }

    Ok(())
}
