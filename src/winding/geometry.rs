//! Winding configuration and turn addressing.

use num_complex::Complex64;

use super::types::{Clearance, ConductorSpec, LayoutSpec, Material, Terminals, TurnAddress};
use crate::dsl::{DirectiveDef, DirectiveKind, WindingAst};
use crate::error::Result;

/// A disc-type winding.
///
/// Turns are numbered along the conductor. Disc 0 sits at the top of the
/// stack; even discs wind from the outside in and odd discs from the inside
/// out, so consecutive discs join at alternating radii.
#[derive(Debug, Clone, PartialEq)]
pub struct Winding {
    /// Number of discs
    pub num_discs: usize,
    /// Turns in each disc
    pub turns_per_disc: usize,
    pub conductor: ConductorSpec,
    pub layout: LayoutSpec,
    pub clearance: Clearance,
    pub material: Material,
    pub terminals: Terminals,
}

impl Default for Winding {
    /// The 14-disc, 20-turn reference winding.
    fn default() -> Self {
        Self {
            num_discs: 14,
            turns_per_disc: 20,
            conductor: ConductorSpec::default(),
            layout: LayoutSpec::default(),
            clearance: Clearance::default(),
            material: Material::default(),
            terminals: Terminals::default(),
        }
    }
}

impl Winding {
    /// Create a winding with the given disc structure and reference dimensions.
    pub fn new(num_discs: usize, turns_per_disc: usize) -> Self {
        Self {
            num_discs,
            turns_per_disc,
            ..Self::default()
        }
    }

    pub fn with_conductor(mut self, conductor: ConductorSpec) -> Self {
        self.conductor = conductor;
        self
    }

    pub fn with_layout(mut self, layout: LayoutSpec) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_clearance(mut self, clearance: Clearance) -> Self {
        self.clearance = clearance;
        self
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    pub fn with_terminals(mut self, terminals: Terminals) -> Self {
        self.terminals = terminals;
        self
    }

    /// Build a winding from a parsed description, starting from the reference
    /// winding and overriding whatever the description sets.
    pub fn from_ast(ast: &WindingAst) -> Result<Self> {
        let mut w = Self::default();

        if let Some(d) = ast.get(DirectiveKind::Winding) {
            set_count(d, "discs", &mut w.num_discs)?;
            set_count(d, "turns_per_disc", &mut w.turns_per_disc)?;
        }
        if let Some(d) = ast.get(DirectiveKind::Conductor) {
            set_number(d, "height", &mut w.conductor.height)?;
            set_number(d, "width", &mut w.conductor.width)?;
            set_number(d, "insulation", &mut w.conductor.insulation)?;
        }
        if let Some(d) = ast.get(DirectiveKind::Layout) {
            set_number(d, "inner_radius", &mut w.layout.inner_radius)?;
            set_number(d, "spacer", &mut w.layout.spacer)?;
            set_number(d, "core_radius", &mut w.layout.core_radius)?;
        }
        if let Some(d) = ast.get(DirectiveKind::Clearance) {
            set_number(d, "bottom", &mut w.clearance.bottom)?;
            set_number(d, "top", &mut w.clearance.top)?;
            set_number(d, "tank", &mut w.clearance.tank)?;
        }
        if let Some(d) = ast.get(DirectiveKind::Material) {
            set_number(d, "resistivity", &mut w.material.resistivity)?;
            set_number(d, "eps_oil", &mut w.material.eps_oil)?;
            set_number(d, "eps_paper", &mut w.material.eps_paper)?;
        }
        if let Some(d) = ast.get(DirectiveKind::Terminals) {
            let source = Complex64::new(
                d.number("source")?.unwrap_or(0.0),
                d.number("source_x")?.unwrap_or(0.0),
            );
            let load = Complex64::new(
                d.number("load")?.unwrap_or(0.0),
                d.number("load_x")?.unwrap_or(0.0),
            );
            w.terminals = Terminals::new(source, load);
        }

        Ok(w)
    }

    pub fn num_turns(&self) -> usize {
        self.num_discs * self.turns_per_disc
    }

    /// Disc, in-disc position and centre coordinates of turn `n`.
    pub fn turn_address(&self, n: usize) -> TurnAddress {
        let disc = n / self.turns_per_disc;
        let position = n % self.turns_per_disc;
        let pitch = self.conductor.radial_pitch();
        let half = pitch / 2.0;

        let radius = if disc % 2 == 0 {
            // out to in
            self.layout.inner_radius + (self.turns_per_disc - position) as f64 * pitch - half
        } else {
            // in to out
            self.layout.inner_radius + position as f64 * pitch + half
        };

        let axial = self.clearance.bottom + self.stack_height()
            - self.conductor.insulated_height() / 2.0
            - disc as f64 * self.disc_pitch();

        TurnAddress {
            disc,
            position,
            radius,
            axial,
        }
    }

    /// `(radius, axial)` centre of turn `n`.
    pub fn turn_midpoint(&self, n: usize) -> (f64, f64) {
        let a = self.turn_address(n);
        (a.radius, a.axial)
    }

    /// Every turn in winding order.
    pub fn turn_addresses(&self) -> Vec<TurnAddress> {
        (0..self.num_turns()).map(|n| self.turn_address(n)).collect()
    }

    /// Centre radius of every turn.
    pub fn turn_radii(&self) -> Vec<f64> {
        (0..self.num_turns()).map(|n| self.turn_address(n).radius).collect()
    }

    /// Axial distance between the centres of neighbouring discs.
    pub fn disc_pitch(&self) -> f64 {
        self.conductor.insulated_height() + self.layout.spacer
    }

    /// Axial extent of the disc stack, paper included.
    pub fn stack_height(&self) -> f64 {
        let discs = self.num_discs as f64;
        discs * self.conductor.insulated_height() + (discs - 1.0).max(0.0) * self.layout.spacer
    }

    /// Radius of the outer paper surface of the outermost turns.
    pub fn outer_radius(&self) -> f64 {
        self.layout.inner_radius + self.turns_per_disc as f64 * self.conductor.radial_pitch()
    }

    /// Distance between the yokes.
    pub fn window_height(&self) -> f64 {
        self.clearance.bottom + self.stack_height() + self.clearance.top
    }
}

fn set_number(d: &DirectiveDef, key: &str, target: &mut f64) -> Result<()> {
    if let Some(v) = d.number(key)? {
        *target = v;
    }
    Ok(())
}

fn set_count(d: &DirectiveDef, key: &str, target: &mut usize) -> Result<()> {
    if let Some(v) = d.count(key)? {
        *target = v;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl;
    use crate::INCH;
    use approx::assert_relative_eq;
    use std::collections::HashSet;

    #[test]
    fn test_reference_winding() {
        let w = Winding::default();
        assert_eq!(w.num_turns(), 280);
        assert_relative_eq!(w.layout.inner_radius, 15.25 * INCH);
    }

    #[test]
    fn test_midpoint_formula() {
        let w = Winding::new(2, 3);
        let pitch = (0.085 + 2.0 * 0.018) * INCH;
        let r0 = 15.25 * INCH;

        // Disc 0 winds outside in
        assert_relative_eq!(w.turn_address(0).radius, r0 + 2.5 * pitch, max_relative = 1e-12);
        assert_relative_eq!(w.turn_address(2).radius, r0 + 0.5 * pitch, max_relative = 1e-12);
        // Disc 1 winds inside out, starting where disc 0 finished
        assert_relative_eq!(w.turn_address(3).radius, r0 + 0.5 * pitch, max_relative = 1e-12);
        assert_relative_eq!(w.turn_address(5).radius, r0 + 2.5 * pitch, max_relative = 1e-12);

        let top = w.turn_address(0).axial;
        let bottom = w.turn_address(5).axial;
        assert_relative_eq!(top - bottom, w.disc_pitch(), max_relative = 1e-12);
        assert_relative_eq!(
            bottom,
            w.clearance.bottom + w.conductor.insulated_height() / 2.0,
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_midpoint_injective() {
        let w = Winding::default();
        let addresses = w.turn_addresses();
        let slots: HashSet<(usize, usize)> =
            addresses.iter().map(|a| (a.disc, a.position)).collect();
        assert_eq!(slots.len(), w.num_turns());

        // Distinct physical locations too
        for (i, a) in addresses.iter().enumerate() {
            for b in &addresses[i + 1..] {
                let d = (a.radius - b.radius).abs() + (a.axial - b.axial).abs();
                assert!(d > 1e-6, "{a} and {b} coincide");
            }
        }
    }

    #[test]
    fn test_zig_zag_direction() {
        let w = Winding::new(4, 5);
        for disc in 0..w.num_discs {
            let radii: Vec<f64> = (0..w.turns_per_disc)
                .map(|k| w.turn_address(disc * w.turns_per_disc + k).radius)
                .collect();
            for pair in radii.windows(2) {
                if disc % 2 == 0 {
                    assert!(pair[1] < pair[0]);
                } else {
                    assert!(pair[1] > pair[0]);
                }
            }
        }
    }

    #[test]
    fn test_axial_decreases_disc_by_disc() {
        let w = Winding::new(5, 3);
        for n in 1..w.num_turns() {
            let (prev, cur) = (w.turn_address(n - 1), w.turn_address(n));
            if cur.disc == prev.disc {
                assert_eq!(cur.axial, prev.axial);
            } else {
                assert!(cur.axial < prev.axial);
            }
            assert!(cur.radius > 0.0);
        }
    }

    #[test]
    fn test_from_ast_overrides() {
        let ast = dsl::parse(
            ".winding discs=2 turns_per_disc=3\n\
             .layout inner_radius=300mm\n\
             .terminals source=50 load_x=-10",
        )
        .unwrap();
        let w = Winding::from_ast(&ast).unwrap();
        assert_eq!(w.num_turns(), 6);
        assert_relative_eq!(w.layout.inner_radius, 0.3);
        // Untouched values keep the reference winding
        assert_eq!(w.conductor, ConductorSpec::default());
        assert_eq!(w.terminals.source, Complex64::new(50.0, 0.0));
        assert_eq!(w.terminals.load, Complex64::new(0.0, -10.0));
    }
}
