//! Winding geometry, turn addressing and validation.
//!
//! A [`Winding`] is immutable configuration: disc structure, conductor and
//! insulation dimensions, clearances to the grounded structure, material
//! constants and the source/load terminations. It owns the turn addressing
//! function that places every turn in the (r, z) half-plane.

mod geometry;
mod types;
mod validate;

pub use geometry::Winding;
pub use types::*;
pub use validate::validate_winding;
