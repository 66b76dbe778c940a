//! Error types for the winding frequency-response solvers.
//!
//! This module provides a unified error type [`TfmrError`] that covers
//! all error conditions that can occur while reading a winding description,
//! validating configuration, querying parameter sources and solving.

use thiserror::Error;

/// Result type alias using [`TfmrError`].
pub type Result<T> = std::result::Result<T, TfmrError>;

/// Unified error type for all Tfmr operations.
#[derive(Error, Debug)]
pub enum TfmrError {
    // ============ Description Parsing Errors ============
    /// Error during lexical analysis
    #[error("Lexer error at line {line}, column {column}: {message}")]
    LexerError {
        line: usize,
        column: usize,
        message: String,
    },

    /// Error during parsing
    #[error("Parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    /// Directive that the description language does not know
    #[error("Unknown directive '{directive}' at line {line}")]
    UnknownDirective { directive: String, line: usize },

    /// Directive given more than once
    #[error("Directive '{directive}' repeated at line {line}")]
    DuplicateDirective { directive: String, line: usize },

    /// Invalid parameter value
    #[error("Invalid parameter '{param}' for '{directive}': {message}")]
    InvalidParameter {
        directive: String,
        param: String,
        message: String,
    },

    // ============ Configuration Errors ============
    /// Winding configuration that cannot describe a physical winding
    #[error("Invalid winding: {message}")]
    InvalidWinding { message: String },

    /// Sweep configuration rejected before any frequency is solved
    #[error("Invalid sweep configuration: {message}")]
    InvalidSweep { message: String },

    // ============ Parameter Source Contract Errors ============
    /// Matrix or vector with the wrong shape
    #[error("{what} has dimension {found}, expected {expected}")]
    DimensionMismatch {
        what: String,
        expected: usize,
        found: usize,
    },

    /// Turn radius that is zero, negative or not finite
    #[error("Turn {turn} has non-positive radius {radius:.4e} m")]
    NonPositiveRadius { turn: usize, radius: f64 },

    /// Parameter matrix with non-finite entries
    #[error("Invalid {what} matrix: {message}")]
    InvalidParameterMatrix { what: String, message: String },

    // ============ Numerical Errors ============
    /// Matrix is singular and cannot be factored
    #[error("Singular matrix - zero pivot in column {column}")]
    SingularMatrix { column: usize },

    /// Linear system singular at a specific frequency
    #[error("Singular {stage} at {frequency:.4e} Hz")]
    SingularSystem { frequency: f64, stage: &'static str },

    /// Linear system whose condition estimate is not finite
    #[error("Ill-conditioned {stage} at {frequency:.4e} Hz (condition estimate {condition:.3e})")]
    IllConditioned {
        frequency: f64,
        stage: &'static str,
        condition: f64,
    },

    /// Matrix exponential could not be evaluated accurately.
    ///
    /// `norm` is the 1-norm of the balanced propagation operator. It is the
    /// conditioning figure for `exp(A)`: the relative sensitivity of the
    /// exponential grows with `‖A‖₁`, and it sets the squaring count.
    #[error("Matrix exponential unstable at {frequency:.4e} Hz (1-norm {norm:.3e}, {squarings} squarings): {message}")]
    ExpmUnstable {
        frequency: f64,
        norm: f64,
        squarings: u32,
        message: String,
    },

    // ============ I/O Errors ============
    /// Error reading an input file
    #[error("Failed to read file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Malformed tabulated matrix file
    #[error("Malformed matrix file '{path}' at line {line}: {message}")]
    MatrixFormat {
        path: String,
        line: usize,
        message: String,
    },

    /// Error writing results
    #[error("Output error: {message}")]
    OutputError { message: String },

    // ============ Execution Errors ============
    /// Worker pool could not be created
    #[error("Failed to build worker pool: {message}")]
    ThreadPool { message: String },
}

impl TfmrError {
    /// Create a lexer error
    pub fn lexer(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self::LexerError {
            line,
            column,
            message: message.into(),
        }
    }

    /// Create a parse error
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::ParseError {
            line,
            message: message.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(
        directive: impl Into<String>,
        param: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            directive: directive.into(),
            param: param.into(),
            message: message.into(),
        }
    }

    /// Create an invalid winding error
    pub fn invalid_winding(message: impl Into<String>) -> Self {
        Self::InvalidWinding {
            message: message.into(),
        }
    }

    /// Create an invalid sweep error
    pub fn invalid_sweep(message: impl Into<String>) -> Self {
        Self::InvalidSweep {
            message: message.into(),
        }
    }

    /// Create a dimension mismatch error
    pub fn dimension(what: impl Into<String>, expected: usize, found: usize) -> Self {
        Self::DimensionMismatch {
            what: what.into(),
            expected,
            found,
        }
    }

    /// Whether this error is confined to a single frequency point.
    ///
    /// Sweeps record these against the offending frequency and carry on;
    /// everything else aborts the sweep.
    pub fn is_per_frequency(&self) -> bool {
        matches!(
            self,
            Self::SingularMatrix { .. }
                | Self::SingularSystem { .. }
                | Self::IllConditioned { .. }
                | Self::ExpmUnstable { .. }
        )
    }
}
