//! The `Path` type: an ordered, contiguous chain of segments plus a start
//! point, immutable once built.
//!
//! Derived data (per-segment lengths, the cumulative arc-length table) is
//! memoized behind a `OnceLock`, so a `Path` shared read-only between
//! threads is safe: the cache is written at most once from immutable
//! inputs and recomputing it under a race would produce the same value.

use std::sync::OnceLock;

use glam::DVec2;

use crate::errors::GeometryError;
use crate::intersect::{self, SegmentHit};
use crate::parse;
use crate::position::PathPosition;
use crate::segment::{Arc, Cubic, Line, Quadratic, Segment, SegmentOps};
use crate::types::{Bounds, CONTIGUITY_EPSILON, EPSILON, ensure_finite};

/// A crossing point between two paths, stationed on `self` by segment
/// index and local parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathIntersection {
    pub point: DVec2,
    pub segment_index: usize,
    pub t: f64,
}

/// Closest-point projection onto a path.
///
/// `converged` is false when the underlying Newton search returned its
/// best approximation instead of converging; the result is still usable
/// at rendering tolerances.
#[derive(Debug)]
pub struct PathProjection<'a> {
    pub point: DVec2,
    pub distance: f64,
    pub converged: bool,
    pub position: PathPosition<'a>,
}

#[derive(Debug, Clone)]
pub(crate) struct LengthTable {
    pub segment_lengths: Vec<f64>,
    /// `cumulative[i]` is the arc length before segment `i`;
    /// `cumulative[len]` is the total.
    pub cumulative: Vec<f64>,
    pub total: f64,
}

/// An ordered, contiguous sequence of segments.
#[derive(Debug, Default)]
pub struct Path {
    start: DVec2,
    segments: Vec<Segment>,
    lengths: OnceLock<LengthTable>,
}

impl Clone for Path {
    fn clone(&self) -> Self {
        Path {
            start: self.start,
            segments: self.segments.clone(),
            lengths: OnceLock::new(),
        }
    }
}

impl PartialEq for Path {
    fn eq(&self, other: &Self) -> bool {
        self.start == other.start && self.segments == other.segments
    }
}

impl Path {
    /// Build a path, validating coordinates and the contiguity invariant:
    /// each segment must start where the previous one ends, and the first
    /// segment must start at `start`.
    pub fn new(start: DVec2, segments: Vec<Segment>) -> Result<Path, GeometryError> {
        ensure_finite(start, "path start")?;
        let mut cursor = start;
        for (index, seg) in segments.iter().enumerate() {
            validate_segment(seg)?;
            let begin = seg.start_point();
            if begin.distance(cursor) > CONTIGUITY_EPSILON {
                return Err(GeometryError::Discontiguous {
                    index,
                    expected_x: cursor.x,
                    expected_y: cursor.y,
                    found_x: begin.x,
                    found_y: begin.y,
                });
            }
            cursor = seg.end_point();
        }
        Ok(Path {
            start,
            segments,
            lengths: OnceLock::new(),
        })
    }

    /// A path with no segments. Positional queries on it fail with
    /// [`GeometryError::EmptyPath`].
    pub fn empty(start: DVec2) -> Path {
        Path {
            start,
            segments: Vec::new(),
            lengths: OnceLock::new(),
        }
    }

    /// Straight line segments through the given points, dropping
    /// zero-length legs.
    pub fn polyline(points: &[DVec2]) -> Result<Path, GeometryError> {
        let Some((&first, rest)) = points.split_first() else {
            return Err(GeometryError::EmptyPath);
        };
        let mut builder = PathBuilder::new(first);
        for &p in rest {
            builder = builder.line_to(p);
        }
        builder.build()
    }

    pub fn builder(start: DVec2) -> PathBuilder {
        PathBuilder::new(start)
    }

    pub fn start(&self) -> DVec2 {
        self.start
    }

    pub fn end_point(&self) -> DVec2 {
        self.segments
            .last()
            .map_or(self.start, SegmentOps::end_point)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub(crate) fn length_table(&self) -> &LengthTable {
        self.lengths.get_or_init(|| {
            let segment_lengths: Vec<f64> =
                self.segments.iter().map(SegmentOps::length).collect();
            let mut cumulative = Vec::with_capacity(segment_lengths.len() + 1);
            let mut running = 0.0;
            cumulative.push(running);
            for len in &segment_lengths {
                running += len;
                cumulative.push(running);
            }
            let total = running;
            LengthTable {
                segment_lengths,
                cumulative,
                total,
            }
        })
    }

    /// Total arc length, memoized on first use.
    pub fn total_length(&self) -> f64 {
        self.length_table().total
    }

    /// Global arc length of the station `(segment_index, local_t)`.
    pub fn station(&self, segment_index: usize, t: f64) -> Result<f64, GeometryError> {
        self.check_index(segment_index)?;
        let table = self.length_table();
        Ok(table.cumulative[segment_index] + self.segments[segment_index].length_at(t))
    }

    /// Inverse of [`Path::station`]: the segment and local parameter at a
    /// global arc length (clamped into range).
    pub(crate) fn locate(&self, length: f64) -> Result<(usize, f64), GeometryError> {
        if self.is_empty() {
            return Err(GeometryError::EmptyPath);
        }
        let table = self.length_table();
        if table.total < EPSILON {
            return Err(GeometryError::ZeroLengthPath);
        }
        let length = length.clamp(0.0, table.total);
        for (i, seg) in self.segments.iter().enumerate() {
            if length <= table.cumulative[i + 1] + EPSILON {
                // Skip over zero-length segments so the local parameter
                // stays well defined.
                if table.segment_lengths[i] < EPSILON {
                    continue;
                }
                return Ok((i, seg.t_at_length(length - table.cumulative[i])));
            }
        }
        Ok((self.segments.len() - 1, 1.0))
    }

    fn check_index(&self, index: usize) -> Result<(), GeometryError> {
        if index >= self.segments.len() {
            Err(GeometryError::SegmentIndex {
                index,
                count: self.segments.len(),
            })
        } else {
            Ok(())
        }
    }

    /// Position reference from a global parameter in [0, 1].
    pub fn at_global_t(&self, t: f64) -> Result<PathPosition<'_>, GeometryError> {
        PathPosition::from_global_t(self, t)
    }

    /// Position reference from a global arc length.
    pub fn at_global_length(&self, length: f64) -> Result<PathPosition<'_>, GeometryError> {
        PathPosition::from_global_length(self, length)
    }

    /// Position reference from a segment index and local parameter.
    pub fn at_segment_t(&self, index: usize, t: f64) -> Result<PathPosition<'_>, GeometryError> {
        self.check_index(index)?;
        PathPosition::from_segment_t(self, index, t)
    }

    /// Position reference from a segment index and local arc length.
    pub fn at_segment_length(
        &self,
        index: usize,
        length: f64,
    ) -> Result<PathPosition<'_>, GeometryError> {
        self.check_index(index)?;
        PathPosition::from_segment_length(self, index, length)
    }

    /// Position reference from an absolute point (projected onto the path).
    pub fn at_point(&self, point: DVec2) -> Result<PathPosition<'_>, GeometryError> {
        PathPosition::from_point(self, point)
    }

    /// Point at a global parameter.
    pub fn point_at(&self, global_t: f64) -> Result<DVec2, GeometryError> {
        self.at_global_t(global_t)?.point()
    }

    /// Unit tangent at a global parameter.
    pub fn tangent_at(&self, global_t: f64) -> Result<DVec2, GeometryError> {
        self.at_global_t(global_t)?.tangent()
    }

    /// Closest point on the path. Ties between segments go to the lowest
    /// segment index.
    pub fn project_point(&self, point: DVec2) -> Result<PathProjection<'_>, GeometryError> {
        if self.is_empty() {
            return Err(GeometryError::EmptyPath);
        }
        let mut best_index = 0;
        let mut best = intersect::project_onto_segment(&self.segments[0], point);
        for (i, seg) in self.segments.iter().enumerate().skip(1) {
            let proj = intersect::project_onto_segment(seg, point);
            if proj.distance < best.distance - EPSILON {
                best = proj;
                best_index = i;
            }
        }
        let position = PathPosition::from_segment_t(self, best_index, best.t.clamp(0.0, 1.0))?;
        Ok(PathProjection {
            point: best.point,
            distance: best.distance,
            converged: best.converged,
            position,
        })
    }

    /// All crossing points with another path, ordered along `self`.
    pub fn intersections(&self, other: &Path) -> Vec<PathIntersection> {
        let mut hits = Vec::new();
        for (i, seg) in self.segments.iter().enumerate() {
            for other_seg in other.segments.iter() {
                for SegmentHit { point, t_self, .. } in
                    intersect::segment_intersections(seg, other_seg)
                {
                    hits.push(PathIntersection {
                        point,
                        segment_index: i,
                        t: t_self,
                    });
                }
            }
        }
        hits.sort_by(|a, b| {
            (a.segment_index, a.t)
                .partial_cmp(&(b.segment_index, b.t))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let mut out: Vec<PathIntersection> = Vec::with_capacity(hits.len());
        for hit in hits {
            if !out
                .iter()
                .any(|kept| kept.point.distance(hit.point) < crate::types::INTERSECTION_EPSILON)
            {
                out.push(hit);
            }
        }
        out
    }

    /// Split into two paths at a position. Either half may be empty when
    /// the position sits on an endpoint.
    pub fn split_at(&self, position: &PathPosition<'_>) -> Result<(Path, Path), GeometryError> {
        if !std::ptr::eq(position.path(), self) {
            return Err(GeometryError::ForeignPosition);
        }
        let (index, t) = position.segment_t()?;
        let mut head_segments: Vec<Segment> = self.segments[..index].to_vec();
        let mut tail_segments: Vec<Segment> = Vec::new();
        let seg = &self.segments[index];
        if t <= EPSILON {
            tail_segments.push(*seg);
        } else if t >= 1.0 - EPSILON {
            head_segments.push(*seg);
        } else {
            let (a, b) = seg.split_at(t);
            head_segments.push(a);
            tail_segments.push(b);
        }
        tail_segments.extend_from_slice(&self.segments[index + 1..]);
        let split_point = position.point()?;
        let head = Path::new(self.start, head_segments)?;
        let tail_start = tail_segments
            .first()
            .map_or(split_point, SegmentOps::start_point);
        let tail = Path::new(tail_start, tail_segments)?;
        Ok((head, tail))
    }

    /// The sub-path between two arc-length stations (clamped into range).
    pub fn slice(&self, from: f64, to: f64) -> Result<Path, GeometryError> {
        let total = self.total_length();
        let from = from.clamp(0.0, total);
        let to = to.clamp(0.0, total);
        if to - from < EPSILON {
            return Err(GeometryError::EmptySlice);
        }
        let (i0, t0) = self.locate(from)?;
        let (i1, t1) = self.locate(to)?;

        let mut segments = Vec::new();
        if i0 == i1 {
            segments.push(sub_segment(&self.segments[i0], t0, t1));
        } else {
            if t0 < 1.0 - EPSILON {
                segments.push(sub_segment(&self.segments[i0], t0, 1.0));
            }
            segments.extend_from_slice(&self.segments[i0 + 1..i1]);
            if t1 > EPSILON {
                segments.push(sub_segment(&self.segments[i1], 0.0, t1));
            }
        }
        let start = segments
            .first()
            .map_or_else(|| self.segments[i0].point_at(t0), SegmentOps::start_point);
        Path::new(start, segments)
    }

    /// The same curve traversed end to start.
    pub fn reversed(&self) -> Path {
        let start = self.end_point();
        let segments: Vec<Segment> = self
            .segments
            .iter()
            .rev()
            .map(SegmentOps::reversed)
            .collect();
        Path {
            start,
            segments,
            lengths: OnceLock::new(),
        }
    }

    /// Exact bounding box (curve extrema, not control hulls). Empty paths
    /// yield a box containing only the start point.
    pub fn bounds(&self) -> Bounds {
        if self.is_empty() {
            return Bounds::from_points(&[self.start]);
        }
        self.segments
            .iter()
            .fold(Bounds::EMPTY, |acc, seg| acc.union(seg.bounds()))
    }

    /// Parse path-data text (`M`/`L`/`C`/`Q`/`A`). Arcs are normalized to
    /// cubic chains on ingest.
    pub fn parse(data: &str) -> Result<Path, crate::errors::ParseError> {
        parse::parse_path_data(data)
    }

    /// Serialize to path-data text. Exact inverse of [`Path::parse`] for
    /// line, cubic, and quadratic segments; arcs emit their cubic chain.
    pub fn to_path_data(&self) -> String {
        parse::emit_path_data(self)
    }
}

/// Extract the sub-curve of a segment between local parameters.
fn sub_segment(seg: &Segment, t0: f64, t1: f64) -> Segment {
    if t0 <= EPSILON && t1 >= 1.0 - EPSILON {
        return *seg;
    }
    if t0 <= EPSILON {
        return seg.split_at(t1).0;
    }
    let (_, tail) = seg.split_at(t0);
    if t1 >= 1.0 - EPSILON {
        return tail;
    }
    let relative = (t1 - t0) / (1.0 - t0);
    tail.split_at(relative).0
}

fn validate_segment(seg: &Segment) -> Result<(), GeometryError> {
    match seg {
        Segment::Line(line) => {
            ensure_finite(line.start, "line start")?;
            ensure_finite(line.end, "line end")?;
        }
        Segment::Quadratic(quad) => {
            ensure_finite(quad.start, "quadratic start")?;
            ensure_finite(quad.control, "quadratic control")?;
            ensure_finite(quad.end, "quadratic end")?;
        }
        Segment::Cubic(cubic) => {
            ensure_finite(cubic.start, "cubic start")?;
            ensure_finite(cubic.control1, "cubic control")?;
            ensure_finite(cubic.control2, "cubic control")?;
            ensure_finite(cubic.end, "cubic end")?;
        }
        Segment::Arc(arc) => {
            ensure_finite(arc.start, "arc start")?;
            ensure_finite(arc.end, "arc end")?;
            ensure_finite(arc.radii, "arc radii")?;
            if !arc.rotation.is_finite() {
                return Err(GeometryError::NonFinite {
                    context: "arc rotation",
                });
            }
        }
    }
    Ok(())
}

/// Fluent path construction that maintains the contiguity invariant: each
/// command continues from the previous endpoint.
#[derive(Debug, Clone)]
pub struct PathBuilder {
    start: DVec2,
    cursor: DVec2,
    segments: Vec<Segment>,
}

impl PathBuilder {
    pub fn new(start: DVec2) -> PathBuilder {
        PathBuilder {
            start,
            cursor: start,
            segments: Vec::new(),
        }
    }

    pub fn cursor(&self) -> DVec2 {
        self.cursor
    }

    /// Straight line to `to`. Zero-length legs are dropped.
    pub fn line_to(mut self, to: DVec2) -> PathBuilder {
        if self.cursor.distance(to) > EPSILON {
            self.segments.push(
                Line {
                    start: self.cursor,
                    end: to,
                }
                .into(),
            );
            self.cursor = to;
        }
        self
    }

    pub fn quad_to(mut self, control: DVec2, to: DVec2) -> PathBuilder {
        self.segments.push(
            Quadratic {
                start: self.cursor,
                control,
                end: to,
            }
            .into(),
        );
        self.cursor = to;
        self
    }

    pub fn cubic_to(mut self, control1: DVec2, control2: DVec2, to: DVec2) -> PathBuilder {
        self.segments.push(
            Cubic {
                start: self.cursor,
                control1,
                control2,
                end: to,
            }
            .into(),
        );
        self.cursor = to;
        self
    }

    /// Elliptical arc to `to`, normalized to its cubic chain. A
    /// zero-length chord is a no-op.
    pub fn arc_to(
        mut self,
        radii: DVec2,
        rotation: f64,
        large_arc: bool,
        sweep: bool,
        to: DVec2,
    ) -> PathBuilder {
        let arc = Arc {
            start: self.cursor,
            radii,
            rotation,
            large_arc,
            sweep,
            end: to,
        };
        for cubic in arc.to_cubics() {
            self.segments.push(cubic.into());
        }
        self.cursor = self.segments.last().map_or(self.cursor, |s| s.end_point());
        self
    }

    /// Append a pre-built segment; it must continue from the cursor.
    pub fn push(mut self, segment: Segment) -> Result<PathBuilder, GeometryError> {
        if segment.start_point().distance(self.cursor) > CONTIGUITY_EPSILON {
            return Err(GeometryError::Discontiguous {
                index: self.segments.len(),
                expected_x: self.cursor.x,
                expected_y: self.cursor.y,
                found_x: segment.start_point().x,
                found_y: segment.start_point().y,
            });
        }
        self.cursor = segment.end_point();
        self.segments.push(segment);
        Ok(self)
    }

    pub fn build(self) -> Result<Path, GeometryError> {
        Path::new(self.start, self.segments)
    }
}
