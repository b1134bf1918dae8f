//! Centralized error handling for RuCube
//!
//! Every fallible operation in the crate returns [`Result`], whose error side is
//! [`RuCubeError`]. Variants are grouped into the four error kinds reported by
//! the command-line front end (see [`ErrorKind`]).

use std::fmt;
use std::path::PathBuf;

/// Coarse classification of an error, as shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed shapes, extractors, names, templates and literals
    Structural,
    /// Missing, truncated or oversized files and other I/O failures
    Io,
    /// A read would exceed the configured memory cap
    Memory,
    /// Failures surfaced from an external expression evaluator
    Expression,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Structural => "structural",
            ErrorKind::Io => "io",
            ErrorKind::Memory => "memory",
            ErrorKind::Expression => "expression",
        };
        f.write_str(name)
    }
}

/// Main error type for RuCube operations
#[derive(Debug, thiserror::Error)]
pub enum RuCubeError {
    /// Shape literal could not be parsed or has a non-positive dimension
    #[error("invalid shape '{spec}': {reason}")]
    InvalidShape { spec: String, reason: String },

    /// Extractor literal could not be parsed
    #[error("invalid extractor '{spec}': {reason}")]
    InvalidExtractor { spec: String, reason: String },

    /// Extractor rank differs from the rank of the shape it is applied to
    #[error("rank mismatch: extractor has rank {extractor} but shape has rank {shape}")]
    RankMismatch { extractor: usize, shape: usize },

    /// Integer index outside of its dimension
    #[error("index {index} is out of range for dimension of size {dim}")]
    IndexOutOfRange { index: isize, dim: usize },

    /// Split or const dimension outside of the cube rank
    #[error("dimension {dim} is out of range for rank {rank}")]
    DimensionOutOfRange { dim: usize, rank: usize },

    /// Unknown element type name
    #[error("invalid dtype '{0}'")]
    InvalidDtype(String),

    /// Unknown file format name
    #[error("unknown file format '{0}'")]
    UnknownFormat(String),

    /// Memory, time or bandwidth literal could not be parsed
    #[error("invalid units literal '{literal}': {reason}")]
    InvalidUnits { literal: String, reason: String },

    /// Filename template refers to a placeholder nobody provides
    #[error("unknown placeholder '{{{0}}}' in filename template")]
    UnknownPlaceholder(String),

    /// Filename template is syntactically broken
    #[error("invalid filename template '{template}': {reason}")]
    InvalidTemplate { template: String, reason: String },

    /// Two cubes that must agree on shape do not
    #[error("shape mismatch: {left:?} != {right:?}")]
    ShapeMismatch { left: Vec<usize>, right: Vec<usize> },

    /// Two cubes or aggregates that must agree on element type do not
    #[error("dtype mismatch: {left} != {right}")]
    DtypeMismatch { left: String, right: String },

    /// Aggregates can only be combined over adjacent element ranges
    #[error("cannot combine non-adjacent partials: expected offset {expected}, found {found}")]
    NonAdjacentPartials { expected: usize, found: usize },

    /// Generic invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// File holds fewer elements than the declared shape requires
    #[error("input truncated: '{}' holds {actual} {unit}, {expected} expected", .path.display())]
    Truncated {
        path: PathBuf,
        expected: u64,
        actual: u64,
        unit: &'static str,
    },

    /// File holds more data than the declared shape requires
    #[error(
        "file '{}' longer than expected: {actual} {unit}, {expected} expected",
        .path.display()
    )]
    TooLong {
        path: PathBuf,
        expected: u64,
        actual: u64,
        unit: &'static str,
    },

    /// Token in a text or CSV file could not be parsed as the element type
    #[error("cannot parse '{token}' as {dtype}")]
    ParseElement { token: String, dtype: String },

    /// I/O operation errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Array shape or dimension error
    #[error("array error: {0}")]
    Array(#[from] ndarray::ShapeError),

    /// A read would push the cumulative live bytes over the memory limit
    #[error(
        "out of memory: reading {requested} bytes with {used} in use \
         exceeds the limit of {limit} bytes"
    )]
    OutOfMemory {
        requested: u64,
        used: u64,
        limit: u64,
    },

    /// Error raised by an external expression evaluator, surfaced unchanged
    #[error("expression error: {0}")]
    Expression(String),
}

impl RuCubeError {
    /// Classify this error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            RuCubeError::Truncated { .. } | RuCubeError::TooLong { .. } | RuCubeError::Io(_) => {
                ErrorKind::Io
            }
            RuCubeError::OutOfMemory { .. } => ErrorKind::Memory,
            RuCubeError::Expression(_) => ErrorKind::Expression,
            _ => ErrorKind::Structural,
        }
    }
}

/// Result type alias for RuCube operations
pub type Result<T> = std::result::Result<T, RuCubeError>;
