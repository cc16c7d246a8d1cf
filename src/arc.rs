//! Elliptical arc conversion: endpoint form to center form, and center
//! form to a chain of cubic Beziers.
//!
//! Follows the standard SVG arc derivation: rotate the endpoints into the
//! ellipse's local frame, solve for the center (scaling the radii up by
//! the minimal uniform factor when they cannot span the chord), recover
//! the start/end angles, then approximate each sub-arc of at most 120
//! degrees with a single cubic via the tan(delta/4) tangent-length
//! formula.

use std::f64::consts::{PI, TAU};

use glam::{DVec2, dvec2};

use crate::segment::{Arc, Cubic};
use crate::types::EPSILON;

/// Largest angular span approximated by a single cubic.
const MAX_SWEEP_PER_CUBIC: f64 = TAU / 3.0;

/// Center parameterization of an elliptical arc.
///
/// `center` and the angles live in the ellipse's local (unrotated) frame;
/// [`ArcFrame::point_at`] rotates back into world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcFrame {
    pub center: DVec2,
    pub radii: DVec2,
    /// Ellipse rotation in radians.
    pub rotation: f64,
    /// Angle of the arc start on the ellipse.
    pub start_angle: f64,
    /// Signed angular span; positive for sweep, negative against it.
    pub sweep_angle: f64,
}

impl ArcFrame {
    fn local_point(&self, angle: f64) -> DVec2 {
        self.center + dvec2(self.radii.x * angle.cos(), self.radii.y * angle.sin())
    }

    fn local_velocity(&self, angle: f64) -> DVec2 {
        dvec2(-self.radii.x * angle.sin(), self.radii.y * angle.cos())
    }

    pub fn point_at(&self, t: f64) -> DVec2 {
        let angle = self.start_angle + self.sweep_angle * t;
        DVec2::from_angle(self.rotation).rotate(self.local_point(angle))
    }

    /// Unnormalized velocity in traversal direction.
    pub fn velocity_at(&self, t: f64) -> DVec2 {
        let angle = self.start_angle + self.sweep_angle * t;
        let v = self.local_velocity(angle) * self.sweep_angle.signum();
        DVec2::from_angle(self.rotation).rotate(v)
    }
}

/// Guard against floating rounding pushing an asin argument outside its
/// domain.
fn asin_clamped(x: f64) -> f64 {
    x.clamp(-1.0, 1.0).asin()
}

/// Compute the center parameterization of an endpoint-form arc.
///
/// Returns `None` for the degenerate cases that have no ellipse: a
/// zero-length chord or a zero radius. Radii too small for the chord are
/// corrected (scaled up uniformly) before the center is solved, so the
/// returned frame always reproduces both endpoints.
pub fn frame(arc: &Arc) -> Option<ArcFrame> {
    if arc.start.distance_squared(arc.end) < EPSILON * EPSILON {
        return None;
    }
    let mut rx = arc.radii.x.abs();
    let mut ry = arc.radii.y.abs();
    if rx < EPSILON || ry < EPSILON {
        return None;
    }

    let rotation = arc.rotation.to_radians();
    let to_local = DVec2::from_angle(-rotation);
    let p1 = to_local.rotate(arc.start);
    let p2 = to_local.rotate(arc.end);

    // Radius correction: scale both radii by the minimal uniform factor
    // that makes the chord representable, before solving for the center.
    let half = (p1 - p2) * 0.5;
    let h = (half.x * half.x) / (rx * rx) + (half.y * half.y) / (ry * ry);
    if h > 1.0 {
        let scale = h.sqrt();
        rx *= scale;
        ry *= scale;
    }

    let rx2 = rx * rx;
    let ry2 = ry * ry;
    let numerator = rx2 * ry2 - rx2 * half.y * half.y - ry2 * half.x * half.x;
    let denominator = rx2 * half.y * half.y + ry2 * half.x * half.x;
    let sign = if arc.large_arc == arc.sweep { -1.0 } else { 1.0 };
    let k = sign * (numerator / denominator).abs().sqrt();

    let center = dvec2(k * rx * half.y / ry, -k * ry * half.x / rx) + (p1 + p2) * 0.5;

    let mut f1 = asin_clamped((p1.y - center.y) / ry);
    let mut f2 = asin_clamped((p2.y - center.y) / ry);
    if p1.x < center.x {
        f1 = PI - f1;
    }
    if p2.x < center.x {
        f2 = PI - f2;
    }
    if f1 < 0.0 {
        f1 += TAU;
    }
    if f2 < 0.0 {
        f2 += TAU;
    }
    if arc.sweep && f1 > f2 {
        f1 -= TAU;
    }
    if !arc.sweep && f2 > f1 {
        f2 -= TAU;
    }

    Some(ArcFrame {
        center,
        radii: dvec2(rx, ry),
        rotation,
        start_angle: f1,
        sweep_angle: f2 - f1,
    })
}

/// Convert an endpoint-form arc into its cubic chain.
///
/// A zero-length chord yields an empty chain; a zero radius degenerates
/// to the straight chord as a single cubic. The first and last cubics
/// reproduce the arc's endpoints exactly.
pub fn to_cubics(arc: &Arc) -> Vec<Cubic> {
    if arc.start.distance_squared(arc.end) < EPSILON * EPSILON {
        return Vec::new();
    }
    let Some(frame) = frame(arc) else {
        // Zero radius: the arc collapses onto the chord.
        return vec![Cubic {
            start: arc.start,
            control1: arc.start,
            control2: arc.end,
            end: arc.end,
        }];
    };

    let to_world = DVec2::from_angle(frame.rotation);
    let mut cubics = Vec::new();
    let mut angle = frame.start_angle;
    let end_angle = frame.start_angle + frame.sweep_angle;
    let step = MAX_SWEEP_PER_CUBIC * frame.sweep_angle.signum();

    loop {
        let remaining = end_angle - angle;
        let sub = if remaining.abs() > MAX_SWEEP_PER_CUBIC {
            step
        } else {
            remaining
        };
        let next = angle + sub;

        // Tangent-length formula: handles of length (4/3) tan(delta/4)
        // along the ellipse tangents at the sub-arc endpoints.
        let alpha = (4.0 / 3.0) * (sub / 4.0).tan();
        let pa = frame.local_point(angle);
        let pb = frame.local_point(next);
        let da = frame.local_velocity(angle);
        let db = frame.local_velocity(next);

        cubics.push(Cubic {
            start: to_world.rotate(pa),
            control1: to_world.rotate(pa + da * alpha),
            control2: to_world.rotate(pb - db * alpha),
            end: to_world.rotate(pb),
        });

        angle = next;
        if (end_angle - angle).abs() < EPSILON {
            break;
        }
    }

    // Pin the chain endpoints to the exact inputs.
    if let Some(first) = cubics.first_mut() {
        first.start = arc.start;
    }
    if let Some(last) = cubics.last_mut() {
        last.end = arc.end;
    }
    cubics
}

/// Split an arc at parameter `t`, yielding two arcs on the same
/// (corrected) ellipse.
pub fn split(arc: &Arc, t: f64) -> (Arc, Arc) {
    let t = t.clamp(0.0, 1.0);
    let Some(frame) = frame(arc) else {
        // Degenerate: split the chord.
        let mid = arc.start.lerp(arc.end, t);
        let head = Arc { end: mid, ..*arc };
        let tail = Arc { start: mid, ..*arc };
        return (head, tail);
    };

    let mid = frame.point_at(t);
    let sweep_head = frame.sweep_angle * t;
    let sweep_tail = frame.sweep_angle * (1.0 - t);
    let rotation_degrees = frame.rotation.to_degrees();
    (
        Arc {
            start: arc.start,
            radii: frame.radii,
            rotation: rotation_degrees,
            large_arc: sweep_head.abs() > PI,
            sweep: arc.sweep,
            end: mid,
        },
        Arc {
            start: mid,
            radii: frame.radii,
            rotation: rotation_degrees,
            large_arc: sweep_tail.abs() > PI,
            sweep: arc.sweep,
            end: arc.end,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::SegmentOps;
    use glam::dvec2;

    const TOLERANCE: f64 = 1e-6;

    fn assert_close(actual: DVec2, expected: DVec2) {
        assert!(
            actual.distance(expected) < TOLERANCE,
            "{actual} != {expected}"
        );
    }

    fn half_circle() -> Arc {
        Arc {
            start: dvec2(0.0, 1.0),
            radii: dvec2(1.0, 1.0),
            rotation: 0.0,
            large_arc: true,
            sweep: true,
            end: dvec2(0.0, -1.0),
        }
    }

    #[test]
    fn half_circle_chain_hits_endpoints() {
        let arc = half_circle();
        let cubics = to_cubics(&arc);
        assert!(!cubics.is_empty());
        assert_close(cubics.first().unwrap().start, arc.start);
        assert_close(cubics.last().unwrap().end, arc.end);
        // Adjacent cubics share endpoints.
        for pair in cubics.windows(2) {
            assert_close(pair[0].end, pair[1].start);
        }
    }

    #[test]
    fn half_circle_stays_on_unit_circle() {
        let cubics = to_cubics(&half_circle());
        for c in &cubics {
            for i in 0..=8 {
                let p = c.point_at(i as f64 / 8.0);
                // A 120-degree sub-arc approximates its circle to ~1.5e-3.
                assert!((p.length() - 1.0).abs() < 2e-3, "off circle: {p}");
            }
        }
    }

    #[test]
    fn half_circle_length_is_pi() {
        let arc: crate::segment::Segment = half_circle().into();
        assert!((arc.length() - PI).abs() < 5e-3);
    }

    #[test]
    fn zero_chord_is_empty() {
        let arc = Arc {
            start: dvec2(2.0, 3.0),
            end: dvec2(2.0, 3.0),
            ..half_circle()
        };
        assert!(to_cubics(&arc).is_empty());
    }

    #[test]
    fn zero_radius_degenerates_to_chord() {
        let arc = Arc {
            radii: dvec2(0.0, 1.0),
            ..half_circle()
        };
        let cubics = to_cubics(&arc);
        assert_eq!(cubics.len(), 1);
        assert_close(cubics[0].start, arc.start);
        assert_close(cubics[0].control1, arc.start);
        assert_close(cubics[0].control2, arc.end);
        assert_close(cubics[0].end, arc.end);
    }

    #[test]
    fn undersized_radii_are_corrected() {
        // Chord of length 10 with radius 1: radii must scale up to fit.
        let arc = Arc {
            start: dvec2(0.0, 0.0),
            radii: dvec2(1.0, 1.0),
            rotation: 0.0,
            large_arc: false,
            sweep: true,
            end: dvec2(10.0, 0.0),
        };
        let frame = frame(&arc).unwrap();
        assert!(frame.radii.x >= 5.0 - TOLERANCE);
        let cubics = to_cubics(&arc);
        assert_close(cubics.first().unwrap().start, arc.start);
        assert_close(cubics.last().unwrap().end, arc.end);
    }

    #[test]
    fn frame_reproduces_endpoints() {
        let arc = Arc {
            start: dvec2(1.0, 0.0),
            radii: dvec2(2.0, 1.0),
            rotation: 30.0,
            large_arc: false,
            sweep: false,
            end: dvec2(3.0, 2.0),
        };
        let frame = frame(&arc).unwrap();
        assert_close(frame.point_at(0.0), arc.start);
        assert_close(frame.point_at(1.0), arc.end);
    }

    #[test]
    fn split_preserves_endpoints_and_midpoint() {
        let arc = half_circle();
        let frame = frame(&arc).unwrap();
        let (head, tail) = split(&arc, 0.5);
        assert_close(head.start, arc.start);
        assert_close(head.end, frame.point_at(0.5));
        assert_close(tail.start, frame.point_at(0.5));
        assert_close(tail.end, arc.end);
    }

    #[test]
    fn sweep_flag_selects_traversal_side() {
        let cw = Arc {
            start: dvec2(-1.0, 0.0),
            radii: dvec2(1.0, 1.0),
            rotation: 0.0,
            large_arc: false,
            sweep: true,
            end: dvec2(1.0, 0.0),
        };
        let ccw = Arc { sweep: false, ..cw };
        let mid_cw = frame(&cw).unwrap().point_at(0.5);
        let mid_ccw = frame(&ccw).unwrap().point_at(0.5);
        // Opposite sweeps pass through opposite sides of the chord.
        assert!(mid_cw.y.signum() != mid_ccw.y.signum());
        assert!((mid_cw.y.abs() - 1.0).abs() < TOLERANCE);
    }
}
