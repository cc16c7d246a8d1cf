//! Segment types: the atomic curve primitives a [`crate::path::Path`] is
//! built from.
//!
//! The segment kind set is closed (line, quadratic, cubic, elliptical
//! arc), so operations dispatch over an enum rather than an open trait
//! hierarchy. Quadratics are degree-elevated to cubics wherever the cubic
//! machinery (arc length, intersection) is needed; elliptical arcs are
//! never measured directly and always go through their cubic chain.

use enum_dispatch::enum_dispatch;
use glam::DVec2;

use crate::arc;
use crate::errors::GeometryError;
use crate::intersect::solve_quadratic;
use crate::types::{Bounds, EPSILON, LENGTH_TABLE_SAMPLES};

/// A straight line between two points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    pub start: DVec2,
    pub end: DVec2,
}

/// A quadratic Bezier curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quadratic {
    pub start: DVec2,
    pub control: DVec2,
    pub end: DVec2,
}

/// A cubic Bezier curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cubic {
    pub start: DVec2,
    pub control1: DVec2,
    pub control2: DVec2,
    pub end: DVec2,
}

/// An elliptical arc in SVG endpoint form: radii, ellipse rotation in
/// degrees, and the large-arc / sweep flags selecting one of the four
/// candidate arcs between the endpoints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arc {
    pub start: DVec2,
    pub radii: DVec2,
    pub rotation: f64,
    pub large_arc: bool,
    pub sweep: bool,
    pub end: DVec2,
}

/// Operations every segment kind supports.
#[enum_dispatch]
pub trait SegmentOps {
    fn start_point(&self) -> DVec2;
    fn end_point(&self) -> DVec2;

    /// Arc length. Closed form for lines, adaptive subdivision for curves.
    fn length(&self) -> f64;

    /// Evaluate the curve at parameter `t` in [0, 1].
    fn point_at(&self, t: f64) -> DVec2;

    /// Unit tangent at `t`. A vanishing derivative falls back to the chord
    /// direction; only a segment degenerate to a point reports an error.
    fn tangent_at(&self, t: f64) -> Result<DVec2, GeometryError>;

    /// Split into two same-kind segments whose concatenation reproduces
    /// the original within floating tolerance.
    fn split_at(&self, t: f64) -> (Segment, Segment);

    /// Exact axis-aligned bounding box (derivative extrema for curves,
    /// not the control hull).
    fn bounds(&self) -> Bounds;

    /// The same curve traversed in the opposite direction.
    fn reversed(&self) -> Segment;
}

/// One atomic curve piece.
#[enum_dispatch(SegmentOps)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Segment {
    Line,
    Quadratic,
    Cubic,
    Arc,
}

impl Segment {
    /// Arc length from the segment start to parameter `t`.
    pub fn length_at(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Segment::Line(line) => line.length() * t,
            _ => {
                let table = chord_table(self);
                let total = table[LENGTH_TABLE_SAMPLES];
                if total < EPSILON {
                    return 0.0;
                }
                let scaled = table_value_at(&table, t);
                scaled / total * self.length()
            }
        }
    }

    /// Inverse arc length: the parameter at which `length` units have been
    /// traversed. Clamped to [0, 1].
    pub fn t_at_length(&self, length: f64) -> f64 {
        let total = self.length();
        if total < EPSILON {
            return 0.0;
        }
        let length = length.clamp(0.0, total);
        match self {
            Segment::Line(_) => length / total,
            _ => {
                let table = chord_table(self);
                let table_total = table[LENGTH_TABLE_SAMPLES];
                if table_total < EPSILON {
                    return 0.0;
                }
                table_parameter_at(&table, length / total * table_total)
            }
        }
    }
}

/// Cumulative chord lengths at uniform parameter steps. Monotonic, so the
/// inverse lookup is a plain walk-and-interpolate; an exact closed form is
/// not needed at rendering tolerances.
fn chord_table(seg: &Segment) -> [f64; LENGTH_TABLE_SAMPLES + 1] {
    let mut table = [0.0; LENGTH_TABLE_SAMPLES + 1];
    let mut prev = seg.point_at(0.0);
    for (i, slot) in table.iter_mut().enumerate().skip(1) {
        let p = seg.point_at(i as f64 / LENGTH_TABLE_SAMPLES as f64);
        *slot = prev.distance(p);
        prev = p;
    }
    for i in 1..table.len() {
        table[i] += table[i - 1];
    }
    table
}

fn table_value_at(table: &[f64], t: f64) -> f64 {
    let scaled = t * (table.len() - 1) as f64;
    let i = (scaled.floor() as usize).min(table.len() - 2);
    let frac = scaled - i as f64;
    table[i] + (table[i + 1] - table[i]) * frac
}

fn table_parameter_at(table: &[f64], target: f64) -> f64 {
    let steps = table.len() - 1;
    for i in 0..steps {
        if table[i + 1] >= target {
            let span = table[i + 1] - table[i];
            let frac = if span < EPSILON {
                0.0
            } else {
                (target - table[i]) / span
            };
            return (i as f64 + frac) / steps as f64;
        }
    }
    1.0
}

/// Normalize `v`, falling back to the chord direction when the derivative
/// vanishes (coincident control points).
fn unit_or_chord(v: DVec2, chord: DVec2) -> Result<DVec2, GeometryError> {
    if v.length_squared() > EPSILON * EPSILON {
        Ok(v.normalize())
    } else if chord.length_squared() > EPSILON * EPSILON {
        Ok(chord.normalize())
    } else {
        Err(GeometryError::DegenerateTangent)
    }
}

impl SegmentOps for Line {
    fn start_point(&self) -> DVec2 {
        self.start
    }

    fn end_point(&self) -> DVec2 {
        self.end
    }

    fn length(&self) -> f64 {
        self.start.distance(self.end)
    }

    fn point_at(&self, t: f64) -> DVec2 {
        self.start.lerp(self.end, t)
    }

    fn tangent_at(&self, _t: f64) -> Result<DVec2, GeometryError> {
        unit_or_chord(self.end - self.start, DVec2::ZERO)
    }

    fn split_at(&self, t: f64) -> (Segment, Segment) {
        let mid = self.point_at(t);
        (
            Line {
                start: self.start,
                end: mid,
            }
            .into(),
            Line {
                start: mid,
                end: self.end,
            }
            .into(),
        )
    }

    fn bounds(&self) -> Bounds {
        Bounds::from_points(&[self.start, self.end])
    }

    fn reversed(&self) -> Segment {
        Line {
            start: self.end,
            end: self.start,
        }
        .into()
    }
}

impl Quadratic {
    /// Degree-elevate to the equivalent cubic.
    pub fn to_cubic(&self) -> Cubic {
        Cubic {
            start: self.start,
            control1: self.start + (self.control - self.start) * (2.0 / 3.0),
            control2: self.end + (self.control - self.end) * (2.0 / 3.0),
            end: self.end,
        }
    }

    fn derivative_at(&self, t: f64) -> DVec2 {
        (self.control - self.start) * (2.0 * (1.0 - t)) + (self.end - self.control) * (2.0 * t)
    }
}

impl SegmentOps for Quadratic {
    fn start_point(&self) -> DVec2 {
        self.start
    }

    fn end_point(&self) -> DVec2 {
        self.end
    }

    fn length(&self) -> f64 {
        self.to_cubic().length()
    }

    fn point_at(&self, t: f64) -> DVec2 {
        let mt = 1.0 - t;
        self.start * (mt * mt) + self.control * (2.0 * mt * t) + self.end * (t * t)
    }

    fn tangent_at(&self, t: f64) -> Result<DVec2, GeometryError> {
        unit_or_chord(self.derivative_at(t), self.end - self.start)
    }

    fn split_at(&self, t: f64) -> (Segment, Segment) {
        let q01 = self.start.lerp(self.control, t);
        let q12 = self.control.lerp(self.end, t);
        let mid = q01.lerp(q12, t);
        (
            Quadratic {
                start: self.start,
                control: q01,
                end: mid,
            }
            .into(),
            Quadratic {
                start: mid,
                control: q12,
                end: self.end,
            }
            .into(),
        )
    }

    fn bounds(&self) -> Bounds {
        let mut b = Bounds::from_points(&[self.start, self.end]);
        // Derivative is linear per axis: one potential extremum each.
        for axis in 0..2 {
            let s = axis_of(self.start, axis);
            let c = axis_of(self.control, axis);
            let e = axis_of(self.end, axis);
            let denom = s - 2.0 * c + e;
            if denom.abs() > EPSILON {
                let t = (s - c) / denom;
                if t > 0.0 && t < 1.0 {
                    b.include(self.point_at(t));
                }
            }
        }
        b
    }

    fn reversed(&self) -> Segment {
        Quadratic {
            start: self.end,
            control: self.control,
            end: self.start,
        }
        .into()
    }
}

impl Cubic {
    pub fn derivative_at(&self, t: f64) -> DVec2 {
        let mt = 1.0 - t;
        (self.control1 - self.start) * (3.0 * mt * mt)
            + (self.control2 - self.control1) * (6.0 * mt * t)
            + (self.end - self.control2) * (3.0 * t * t)
    }

    pub fn second_derivative_at(&self, t: f64) -> DVec2 {
        let mt = 1.0 - t;
        (self.control2 - 2.0 * self.control1 + self.start) * (6.0 * mt)
            + (self.end - 2.0 * self.control2 + self.control1) * (6.0 * t)
    }

    /// Extract the sub-curve between parameters `t0` and `t1`.
    pub fn sub_curve(&self, t0: f64, t1: f64) -> Cubic {
        if t1 <= t0 {
            let p = self.point_at(t0);
            return Cubic {
                start: p,
                control1: p,
                control2: p,
                end: p,
            };
        }
        let (head, _) = self.split_cubic(t1);
        let (_, tail) = head.split_cubic(t0 / t1);
        tail
    }

    /// De Casteljau subdivision, staying in the concrete type.
    pub fn split_cubic(&self, t: f64) -> (Cubic, Cubic) {
        let p01 = self.start.lerp(self.control1, t);
        let p12 = self.control1.lerp(self.control2, t);
        let p23 = self.control2.lerp(self.end, t);
        let p012 = p01.lerp(p12, t);
        let p123 = p12.lerp(p23, t);
        let mid = p012.lerp(p123, t);
        (
            Cubic {
                start: self.start,
                control1: p01,
                control2: p012,
                end: mid,
            },
            Cubic {
                start: mid,
                control1: p123,
                control2: p23,
                end: self.end,
            },
        )
    }

    fn length_recursive(&self, depth: u32) -> f64 {
        const MAX_DEPTH: u32 = 16;
        let chord = self.start.distance(self.end);
        let poly = self.start.distance(self.control1)
            + self.control1.distance(self.control2)
            + self.control2.distance(self.end);
        if depth >= MAX_DEPTH || (poly - chord).abs() < crate::types::LENGTH_TOLERANCE {
            return (chord + poly) * 0.5;
        }
        let (a, b) = self.split_cubic(0.5);
        a.length_recursive(depth + 1) + b.length_recursive(depth + 1)
    }
}

impl SegmentOps for Cubic {
    fn start_point(&self) -> DVec2 {
        self.start
    }

    fn end_point(&self) -> DVec2 {
        self.end
    }

    fn length(&self) -> f64 {
        self.length_recursive(0)
    }

    fn point_at(&self, t: f64) -> DVec2 {
        let mt = 1.0 - t;
        self.start * (mt * mt * mt)
            + self.control1 * (3.0 * mt * mt * t)
            + self.control2 * (3.0 * mt * t * t)
            + self.end * (t * t * t)
    }

    fn tangent_at(&self, t: f64) -> Result<DVec2, GeometryError> {
        unit_or_chord(self.derivative_at(t), self.end - self.start)
    }

    fn split_at(&self, t: f64) -> (Segment, Segment) {
        let (a, b) = self.split_cubic(t);
        (a.into(), b.into())
    }

    fn bounds(&self) -> Bounds {
        let mut b = Bounds::from_points(&[self.start, self.end]);
        // Derivative is quadratic per axis; extrema at its roots.
        for axis in 0..2 {
            let p0 = axis_of(self.start, axis);
            let p1 = axis_of(self.control1, axis);
            let p2 = axis_of(self.control2, axis);
            let p3 = axis_of(self.end, axis);
            let a = 3.0 * (-p0 + 3.0 * p1 - 3.0 * p2 + p3);
            let bb = 6.0 * (p0 - 2.0 * p1 + p2);
            let c = 3.0 * (p1 - p0);
            for t in solve_quadratic(a, bb, c) {
                if t > 0.0 && t < 1.0 {
                    b.include(self.point_at(t));
                }
            }
        }
        b
    }

    fn reversed(&self) -> Segment {
        Cubic {
            start: self.end,
            control1: self.control2,
            control2: self.control1,
            end: self.start,
        }
        .into()
    }
}

impl Arc {
    /// The cubic chain approximating this arc, one cubic per sub-arc of at
    /// most 120 degrees. Empty when the chord is zero-length.
    pub fn to_cubics(&self) -> Vec<Cubic> {
        arc::to_cubics(self)
    }
}

impl SegmentOps for Arc {
    fn start_point(&self) -> DVec2 {
        self.start
    }

    fn end_point(&self) -> DVec2 {
        self.end
    }

    fn length(&self) -> f64 {
        self.to_cubics().iter().map(Cubic::length).sum()
    }

    fn point_at(&self, t: f64) -> DVec2 {
        match arc::frame(self) {
            Some(frame) => frame.point_at(t),
            None => self.start.lerp(self.end, t),
        }
    }

    fn tangent_at(&self, t: f64) -> Result<DVec2, GeometryError> {
        match arc::frame(self) {
            Some(frame) => unit_or_chord(frame.velocity_at(t), self.end - self.start),
            None => unit_or_chord(DVec2::ZERO, self.end - self.start),
        }
    }

    fn split_at(&self, t: f64) -> (Segment, Segment) {
        let (a, b) = arc::split(self, t);
        (a.into(), b.into())
    }

    fn bounds(&self) -> Bounds {
        let cubics = self.to_cubics();
        if cubics.is_empty() {
            return Bounds::from_points(&[self.start, self.end]);
        }
        cubics
            .iter()
            .fold(Bounds::EMPTY, |acc, c| acc.union(c.bounds()))
    }

    fn reversed(&self) -> Segment {
        Arc {
            start: self.end,
            radii: self.radii,
            rotation: self.rotation,
            large_arc: self.large_arc,
            sweep: !self.sweep,
            end: self.start,
        }
        .into()
    }
}

fn axis_of(p: DVec2, axis: usize) -> f64 {
    if axis == 0 { p.x } else { p.y }
}
