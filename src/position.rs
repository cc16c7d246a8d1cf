//! `PathPosition`: one location on a path, nameable five ways.
//!
//! A position can be constructed from any single representation (absolute
//! point, segment index with local parameter, segment index with local
//! arc length, global parameter, or global arc length) and answers the
//! others on demand. Each derived representation is computed at most once
//! and memoized; the type is immutable after construction apart from
//! those write-once caches.
//!
//! A position borrows the path it refers to, so it can never be used
//! against a different path.

use std::cell::OnceCell;

use glam::DVec2;

use crate::errors::GeometryError;
use crate::intersect;
use crate::path::Path;
use crate::segment::{Segment, SegmentOps};
use crate::types::{EPSILON, ensure_finite};

#[derive(Debug)]
pub struct PathPosition<'a> {
    path: &'a Path,
    point: OnceCell<DVec2>,
    segment_t: OnceCell<(usize, f64)>,
    segment_length: OnceCell<(usize, f64)>,
    global_t: OnceCell<f64>,
    global_length: OnceCell<f64>,
}

impl<'a> PathPosition<'a> {
    fn blank(path: &'a Path) -> PathPosition<'a> {
        PathPosition {
            path,
            point: OnceCell::new(),
            segment_t: OnceCell::new(),
            segment_length: OnceCell::new(),
            global_t: OnceCell::new(),
            global_length: OnceCell::new(),
        }
    }

    fn require_segments(path: &Path) -> Result<(), GeometryError> {
        if path.is_empty() {
            Err(GeometryError::EmptyPath)
        } else {
            Ok(())
        }
    }

    fn require_length(path: &Path) -> Result<(), GeometryError> {
        Self::require_segments(path)?;
        if path.total_length() < EPSILON {
            Err(GeometryError::ZeroLengthPath)
        } else {
            Ok(())
        }
    }

    fn require_finite(value: f64, context: &'static str) -> Result<(), GeometryError> {
        if value.is_finite() {
            Ok(())
        } else {
            Err(GeometryError::NonFinite { context })
        }
    }

    pub(crate) fn from_global_t(path: &'a Path, t: f64) -> Result<PathPosition<'a>, GeometryError> {
        Self::require_length(path)?;
        Self::require_finite(t, "global parameter")?;
        let pos = Self::blank(path);
        let _ = pos.global_t.set(t.clamp(0.0, 1.0));
        Ok(pos)
    }

    pub(crate) fn from_global_length(
        path: &'a Path,
        length: f64,
    ) -> Result<PathPosition<'a>, GeometryError> {
        Self::require_length(path)?;
        Self::require_finite(length, "global arc length")?;
        let pos = Self::blank(path);
        let _ = pos.global_length.set(length.clamp(0.0, path.total_length()));
        Ok(pos)
    }

    pub(crate) fn from_segment_t(
        path: &'a Path,
        index: usize,
        t: f64,
    ) -> Result<PathPosition<'a>, GeometryError> {
        Self::require_segments(path)?;
        Self::require_finite(t, "local parameter")?;
        if index >= path.segment_count() {
            return Err(GeometryError::SegmentIndex {
                index,
                count: path.segment_count(),
            });
        }
        let pos = Self::blank(path);
        let _ = pos.segment_t.set((index, t.clamp(0.0, 1.0)));
        Ok(pos)
    }

    pub(crate) fn from_segment_length(
        path: &'a Path,
        index: usize,
        length: f64,
    ) -> Result<PathPosition<'a>, GeometryError> {
        Self::require_segments(path)?;
        Self::require_finite(length, "local arc length")?;
        if index >= path.segment_count() {
            return Err(GeometryError::SegmentIndex {
                index,
                count: path.segment_count(),
            });
        }
        let max = path.segments()[index].length();
        let pos = Self::blank(path);
        let _ = pos.segment_length.set((index, length.clamp(0.0, max)));
        Ok(pos)
    }

    pub(crate) fn from_point(
        path: &'a Path,
        point: DVec2,
    ) -> Result<PathPosition<'a>, GeometryError> {
        Self::require_segments(path)?;
        ensure_finite(point, "position point")?;
        let pos = Self::blank(path);
        let _ = pos.point.set(point);
        Ok(pos)
    }

    /// The path this position refers to.
    pub fn path(&self) -> &'a Path {
        self.path
    }

    /// Absolute point. For a position constructed from a point this
    /// returns that point verbatim (it may lie off the curve); every
    /// other representation refers to its closest-point projection.
    pub fn point(&self) -> Result<DVec2, GeometryError> {
        if let Some(&p) = self.point.get() {
            return Ok(p);
        }
        let (index, t) = self.segment_t()?;
        let p = self.path.segments()[index].point_at(t);
        Ok(*self.point.get_or_init(|| p))
    }

    /// `(segment index, local parameter)`.
    pub fn segment_t(&self) -> Result<(usize, f64), GeometryError> {
        if let Some(&loc) = self.segment_t.get() {
            return Ok(loc);
        }
        let loc = if let Some(&(index, length)) = self.segment_length.get() {
            (index, self.path.segments()[index].t_at_length(length))
        } else if self.global_length.get().is_some() || self.global_t.get().is_some() {
            self.path.locate(self.global_length()?)?
        } else if let Some(&point) = self.point.get() {
            self.project(point)
        } else {
            // Construction guarantees at least one representation.
            unreachable!("path position has no representation")
        };
        Ok(*self.segment_t.get_or_init(|| loc))
    }

    /// `(segment index, local arc length)`.
    pub fn segment_length(&self) -> Result<(usize, f64), GeometryError> {
        if let Some(&loc) = self.segment_length.get() {
            return Ok(loc);
        }
        let (index, t) = self.segment_t()?;
        let length = self.path.segments()[index].length_at(t);
        Ok(*self.segment_length.get_or_init(|| (index, length)))
    }

    /// Arc length from the path start.
    pub fn global_length(&self) -> Result<f64, GeometryError> {
        if let Some(&len) = self.global_length.get() {
            return Ok(len);
        }
        let len = if let Some(&t) = self.global_t.get() {
            let total = self.path.total_length();
            if total < EPSILON {
                return Err(GeometryError::ZeroLengthPath);
            }
            t * total
        } else {
            let (index, local) = self.segment_length()?;
            self.path.length_table().cumulative[index] + local
        };
        Ok(*self.global_length.get_or_init(|| len))
    }

    /// Normalized arc-length parameter over the whole path, in [0, 1].
    pub fn global_t(&self) -> Result<f64, GeometryError> {
        if let Some(&t) = self.global_t.get() {
            return Ok(t);
        }
        let total = self.path.total_length();
        if total < EPSILON {
            return Err(GeometryError::ZeroLengthPath);
        }
        let t = (self.global_length()? / total).clamp(0.0, 1.0);
        Ok(*self.global_t.get_or_init(|| t))
    }

    /// The segment this position falls on.
    pub fn segment(&self) -> Result<&'a Segment, GeometryError> {
        let (index, _) = self.segment_t()?;
        Ok(&self.path.segments()[index])
    }

    /// Unit tangent of the path at this position.
    pub fn tangent(&self) -> Result<DVec2, GeometryError> {
        let (index, t) = self.segment_t()?;
        self.path.segments()[index].tangent_at(t)
    }

    /// Closest-point projection over all segments; ties go to the lowest
    /// segment index.
    fn project(&self, point: DVec2) -> (usize, f64) {
        let mut best_index = 0;
        let mut best_distance = f64::INFINITY;
        let mut best_t = 0.0;
        for (i, seg) in self.path.segments().iter().enumerate() {
            let proj = intersect::project_onto_segment(seg, point);
            if proj.distance < best_distance - EPSILON {
                best_distance = proj.distance;
                best_index = i;
                best_t = proj.t.clamp(0.0, 1.0);
            }
        }
        (best_index, best_t)
    }
}
