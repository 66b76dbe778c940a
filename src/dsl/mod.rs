//! Description language for disc windings.
//!
//! A line-oriented, SPICE-flavoured text format. Every line is a directive
//! followed by `key=value` parameters; every directive is optional and
//! missing values fall back to the reference winding.
//!
//! # Grammar Overview
//!
//! ```text
//! file        = { line }
//! line        = comment | directive | empty
//! comment     = ('#' | ';') { any_char }
//! directive   = '.' directive_name { param }
//! param       = key '=' (value | keyword)
//!
//! directive_name = "winding" | "conductor" | "layout" | "clearance"
//!                | "material" | "terminals" | "sweep"
//! value       = number [unit_suffix]
//! number      = ['-'] digit+ ['.' digit+] [('e'|'E') ['-'|'+'] digit+]
//! unit_suffix = 'p' | 'n' | 'u' | 'm' | 'k' | 'M' | 'G' | "in" | "mil" | "mm" | "cm"
//! ```
//!
//! # Directives
//!
//! | Directive | Parameters |
//! |-----------|------------|
//! | .winding | `discs`, `turns_per_disc` |
//! | .conductor | `height`, `width`, `insulation` (paper thickness per side) |
//! | .layout | `inner_radius`, `spacer`, `core_radius` |
//! | .clearance | `bottom`, `top` (to the yokes), `tank` (radial, outermost turn to tank) |
//! | .material | `resistivity`, `eps_oil`, `eps_paper` |
//! | .terminals | `source`, `source_x`, `load`, `load_x` (ohms) |
//! | .sweep | `fmin`, `fmax`, `points`, `spacing` (`log` or `linear`) |
//!
//! # Example
//!
//! ```text
//! # Reference 14-disc winding
//! .winding   discs=14 turns_per_disc=20
//! .conductor height=0.3in width=0.085in insulation=0.018in
//! .layout    inner_radius=15.25in spacer=0.188in core_radius=12.1in
//! .sweep     fmin=10k fmax=1M points=100
//! ```

mod ast;
mod lexer;
mod parser;

pub use ast::*;
pub use lexer::{parse_value, Lexer, Token, TokenKind};
pub use parser::Parser;

use crate::error::Result;

/// Parse a winding description string into an AST.
pub fn parse(input: &str) -> Result<WindingAst> {
    let lexer = Lexer::new(input);
    let mut parser = Parser::new(lexer)?;
    parser.parse()
}

/// Parse a winding description file.
pub fn parse_file(path: &std::path::Path) -> Result<WindingAst> {
    let content =
        std::fs::read_to_string(path).map_err(|e| crate::error::TfmrError::FileReadError {
            path: path.display().to_string(),
            source: e,
        })?;
    parse(&content)
}
