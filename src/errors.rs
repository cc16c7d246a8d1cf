//! Error types for geometry construction and path-data parsing.
//!
//! Parse errors carry source spans for labeled diagnostics; geometry
//! errors are plain value errors surfaced synchronously to the caller.

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Errors raised while constructing or querying geometry.
///
/// These all fall under the "malformed input" category: they are reported
/// eagerly so NaN or nonsense coordinates never propagate into downstream
/// arithmetic. Numerical non-convergence is *not* an error; iterative
/// routines return their best approximation instead (see
/// [`crate::intersect::Projection::converged`]).
#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("path has no segments")]
    #[diagnostic(code(pathwork::geometry::empty_path))]
    EmptyPath,

    #[error("path has zero total length")]
    #[diagnostic(code(pathwork::geometry::zero_length_path))]
    ZeroLengthPath,

    #[error("{context} has a NaN or infinite coordinate")]
    #[diagnostic(code(pathwork::geometry::non_finite))]
    NonFinite { context: &'static str },

    #[error(
        "segment {index} starts at ({found_x}, {found_y}) but the previous segment ends at ({expected_x}, {expected_y})"
    )]
    #[diagnostic(code(pathwork::geometry::discontiguous))]
    Discontiguous {
        index: usize,
        expected_x: f64,
        expected_y: f64,
        found_x: f64,
        found_y: f64,
    },

    #[error("tangent is undefined on a degenerate segment")]
    #[diagnostic(code(pathwork::geometry::degenerate_tangent))]
    DegenerateTangent,

    #[error("segment index {index} out of range for a path with {count} segments")]
    #[diagnostic(code(pathwork::geometry::segment_index))]
    SegmentIndex { index: usize, count: usize },

    #[error("position belongs to a different path")]
    #[diagnostic(code(pathwork::geometry::foreign_position))]
    ForeignPosition,

    #[error("slice range is empty or inverted")]
    #[diagnostic(code(pathwork::geometry::empty_slice))]
    EmptySlice,
}

/// Errors that occur while parsing path-data text.
#[derive(Error, Diagnostic, Debug)]
pub enum ParseError {
    #[error("malformed path data")]
    #[diagnostic(code(pathwork::parse::syntax))]
    Syntax {
        #[source_code]
        src: NamedSource<String>,
        #[label("{message}")]
        span: SourceSpan,
        message: String,
    },

    #[error("invalid number: {value}")]
    #[diagnostic(code(pathwork::parse::invalid_number))]
    InvalidNumber {
        value: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("not a finite number")]
        span: SourceSpan,
    },

    /// The parsed commands describe invalid geometry (currently unreachable
    /// through the grammar, kept so the parser can surface construction
    /// failures without panicking).
    #[error("invalid geometry in path data")]
    #[diagnostic(code(pathwork::parse::geometry))]
    Geometry(#[from] GeometryError),
}
