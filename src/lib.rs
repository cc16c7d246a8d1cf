//! Vector path geometry and edge routing for diagram editors.
//!
//! This crate is the pure, deterministic geometry core a diagram model
//! builds on: it represents curves as chains of typed segments, converts
//! between the ways a location on a curve can be addressed, computes
//! intersections and closest-point projections, synthesizes connector
//! paths between shapes, and trims those connectors against shape
//! boundaries, arrowheads, and edge crossings. It never paints anything
//! and holds no state between calls; paths are immutable once built and
//! safe to share read-only across threads.
//!
//! # Example
//!
//! ```
//! use pathwork::{RouteOptions, RoutingMode, build_edge_path, dvec2};
//!
//! let path = build_edge_path(
//!     dvec2(0.0, 0.0),
//!     dvec2(100.0, 50.0),
//!     &[],
//!     &RouteOptions {
//!         mode: RoutingMode::Orthogonal,
//!         ..RouteOptions::default()
//!     },
//! )?;
//! assert_eq!(path.to_path_data(), "M 0 0 L 0 50 L 100 50");
//!
//! let mid = path.at_global_t(0.5)?;
//! assert_eq!(mid.point()?, dvec2(25.0, 50.0));
//! # Ok::<(), pathwork::GeometryError>(())
//! ```

pub mod arc;
pub mod clip;
pub mod errors;
pub mod intersect;
pub mod log;
pub mod parse;
pub mod path;
pub mod position;
pub mod route;
pub mod segment;
pub mod types;

pub use clip::{AnchorMode, DEFAULT_CROSSING_GAP, Terminal, clip_edge_path};
pub use errors::{GeometryError, ParseError};
pub use intersect::{Projection, SegmentHit, project_onto_segment, segment_intersections};
pub use path::{Path, PathBuilder, PathIntersection, PathProjection};
pub use position::PathPosition;
pub use route::{Direction, RouteOptions, RoutingMode, Waypoint, build_edge_path};
pub use segment::{Arc, Cubic, Line, Quadratic, Segment, SegmentOps};
pub use types::Bounds;

// Callers address geometry in glam's f64 vectors; re-export the two names
// used throughout the public API.
pub use glam::{DVec2, dvec2};
