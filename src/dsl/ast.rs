//! Abstract Syntax Tree types for the winding description language.

use std::collections::HashMap;

use crate::error::{Result, TfmrError};

/// Complete AST representation of a parsed winding description.
#[derive(Debug, Clone, Default)]
pub struct WindingAst {
    /// Directives in source order; each kind appears at most once
    pub directives: Vec<DirectiveDef>,
}

impl WindingAst {
    /// Create a new empty AST.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the directive of a given kind, if present.
    pub fn get(&self, kind: DirectiveKind) -> Option<&DirectiveDef> {
        self.directives.iter().find(|d| d.kind == kind)
    }
}

/// One `.directive key=value ...` line.
#[derive(Debug, Clone)]
pub struct DirectiveDef {
    /// Which directive this is
    pub kind: DirectiveKind,
    /// Parameters by lower-cased key
    pub params: HashMap<String, ParamValue>,
    /// Source line number for error reporting
    pub line: usize,
}

impl DirectiveDef {
    /// Numeric parameter, if given.
    pub fn number(&self, key: &str) -> Result<Option<f64>> {
        match self.params.get(key) {
            None => Ok(None),
            Some(ParamValue::Number(v)) => Ok(Some(*v)),
            Some(ParamValue::Word(w)) => Err(TfmrError::invalid_parameter(
                self.kind.name(),
                key,
                format!("expected a number, got '{w}'"),
            )),
        }
    }

    /// Numeric parameter that must be a non-negative whole number.
    pub fn count(&self, key: &str) -> Result<Option<usize>> {
        match self.number(key)? {
            None => Ok(None),
            Some(v) if v >= 0.0 && v.fract() == 0.0 && v <= u32::MAX as f64 => {
                Ok(Some(v as usize))
            }
            Some(v) => Err(TfmrError::invalid_parameter(
                self.kind.name(),
                key,
                format!("expected a whole number, got {v}"),
            )),
        }
    }

    /// Word parameter, if given.
    pub fn word(&self, key: &str) -> Result<Option<&str>> {
        match self.params.get(key) {
            None => Ok(None),
            Some(ParamValue::Word(w)) => Ok(Some(w.as_str())),
            Some(ParamValue::Number(v)) => Err(TfmrError::invalid_parameter(
                self.kind.name(),
                key,
                format!("expected a keyword, got {v}"),
            )),
        }
    }
}

/// Parameter value: a number (units already applied) or a bare keyword.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Number(f64),
    Word(String),
}

/// Directives supported by the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveKind {
    /// Disc and turn counts
    Winding,
    /// Conductor cross-section and paper insulation
    Conductor,
    /// Radial build and spacers
    Layout,
    /// Distances to yokes and tank
    Clearance,
    /// Conductor resistivity and permittivities
    Material,
    /// Source and load impedances
    Terminals,
    /// Frequency sweep
    Sweep,
}

impl DirectiveKind {
    /// Parse a directive from its name (with leading '.').
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            ".winding" => Some(Self::Winding),
            ".conductor" => Some(Self::Conductor),
            ".layout" => Some(Self::Layout),
            ".clearance" => Some(Self::Clearance),
            ".material" => Some(Self::Material),
            ".terminals" => Some(Self::Terminals),
            ".sweep" => Some(Self::Sweep),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Winding => ".winding",
            Self::Conductor => ".conductor",
            Self::Layout => ".layout",
            Self::Clearance => ".clearance",
            Self::Material => ".material",
            Self::Terminals => ".terminals",
            Self::Sweep => ".sweep",
        }
    }

    /// Keys accepted by this directive.
    pub fn allowed_params(&self) -> &'static [&'static str] {
        match self {
            Self::Winding => &["discs", "turns_per_disc"],
            Self::Conductor => &["height", "width", "insulation"],
            Self::Layout => &["inner_radius", "spacer", "core_radius"],
            Self::Clearance => &["bottom", "top", "tank"],
            Self::Material => &["resistivity", "eps_oil", "eps_paper"],
            Self::Terminals => &["source", "source_x", "load", "load_x"],
            Self::Sweep => &["fmin", "fmax", "points", "spacing"],
        }
    }
}
