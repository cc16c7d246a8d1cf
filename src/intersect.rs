//! Intersection and closest-point projection for segments.
//!
//! Line/line goes through the determinant form (parallel lines report no
//! intersection). Line/curve substitutes the curve into the line's
//! implicit equation and solves the resulting cubic analytically.
//! Curve/curve subdivides with bounding-box rejection until the sub-curves
//! are flat enough to intersect as chords; a node budget bounds the worst
//! case so the query always terminates.
//!
//! Projection onto curves runs Newton iteration seeded from a coarse
//! sampled minimum. Non-convergence is not an error: the best
//! approximation found is returned with `converged == false` so callers
//! can retry with a tighter tolerance if they care.

use glam::DVec2;

use crate::segment::{Cubic, Line, Segment, SegmentOps};
use crate::types::{
    EPSILON, INTERSECTION_EPSILON, MAX_NEWTON_ITERATIONS, MAX_SUBDIVISION_DEPTH, NEWTON_EPSILON,
    PARAMETER_EPSILON, PROJECTION_SAMPLES, SUBDIVISION_BUDGET,
};

/// One crossing between two segments, with the parameter on each side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentHit {
    pub point: DVec2,
    pub t_self: f64,
    pub t_other: f64,
}

/// Closest-point projection result.
///
/// `t` is deliberately left unclamped so callers can detect projections
/// that fall beyond the segment's endpoints; `point` is always on the
/// segment. `converged` is false when the iterative search hit its cap
/// and returned the best sampled approximation instead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub point: DVec2,
    pub t: f64,
    pub distance: f64,
    pub iterations: u32,
    pub converged: bool,
}

/// All crossing points between two segments, ordered by `t_self`.
pub fn segment_intersections(a: &Segment, b: &Segment) -> Vec<SegmentHit> {
    let mut hits = match (decompose(a), decompose(b)) {
        (CurveParts::Line(la), CurveParts::Line(lb)) => {
            line_line(&la, &lb).into_iter().map(|(t, u, point)| SegmentHit {
                point,
                t_self: t,
                t_other: u,
            })
            .collect()
        }
        (CurveParts::Line(la), CurveParts::Cubics(cubics)) => {
            chain_hits(&cubics, |cubic| line_cubic(&la, cubic))
                .into_iter()
                .map(|(t_line, t_chain, point)| SegmentHit {
                    point,
                    t_self: t_line,
                    t_other: t_chain,
                })
                .collect()
        }
        (CurveParts::Cubics(cubics), CurveParts::Line(lb)) => {
            chain_hits(&cubics, |cubic| line_cubic(&lb, cubic))
                .into_iter()
                .map(|(t_line, t_chain, point)| SegmentHit {
                    point,
                    t_self: t_chain,
                    t_other: t_line,
                })
                .collect()
        }
        (CurveParts::Cubics(ca), CurveParts::Cubics(cb)) => {
            let mut out = Vec::new();
            for (i, cubic_a) in ca.iter().enumerate() {
                for (j, cubic_b) in cb.iter().enumerate() {
                    for (ta, tb, point) in cubic_cubic(cubic_a, cubic_b) {
                        out.push(SegmentHit {
                            point,
                            t_self: (i as f64 + ta) / ca.len() as f64,
                            t_other: (j as f64 + tb) / cb.len() as f64,
                        });
                    }
                }
            }
            out
        }
    };

    hits.sort_by(|x, y| x.t_self.total_cmp(&y.t_self));
    dedupe_hits(hits)
}

/// Closest point on `seg` to `target`.
pub fn project_onto_segment(seg: &Segment, target: DVec2) -> Projection {
    match decompose(seg) {
        CurveParts::Line(line) => project_line(&line, target),
        CurveParts::Cubics(cubics) => {
            if cubics.is_empty() {
                // Zero-length arc chord: the whole segment is one point.
                let point = seg.start_point();
                return Projection {
                    point,
                    t: 0.0,
                    distance: point.distance(target),
                    iterations: 0,
                    converged: true,
                };
            }
            let n = cubics.len() as f64;
            let mut best: Option<Projection> = None;
            for (i, cubic) in cubics.iter().enumerate() {
                let mut proj = project_cubic(cubic, target);
                proj.t = (i as f64 + proj.t) / n;
                if best.as_ref().is_none_or(|b| proj.distance < b.distance) {
                    best = Some(proj);
                }
            }
            best.expect("chain is non-empty")
        }
    }
}

enum CurveParts {
    Line(Line),
    Cubics(Vec<Cubic>),
}

/// Reduce a segment to intersection primitives: a line stays a line,
/// everything curved becomes one or more cubics.
fn decompose(seg: &Segment) -> CurveParts {
    match seg {
        Segment::Line(line) => CurveParts::Line(*line),
        Segment::Quadratic(quad) => CurveParts::Cubics(vec![quad.to_cubic()]),
        Segment::Cubic(cubic) => CurveParts::Cubics(vec![*cubic]),
        Segment::Arc(arc) => CurveParts::Cubics(arc.to_cubics()),
    }
}

/// Run a per-cubic intersection over a chain, remapping each part's local
/// parameter onto the whole chain.
fn chain_hits(
    cubics: &[Cubic],
    mut hit_fn: impl FnMut(&Cubic) -> Vec<(f64, f64, DVec2)>,
) -> Vec<(f64, f64, DVec2)> {
    let n = cubics.len() as f64;
    let mut out = Vec::new();
    for (i, cubic) in cubics.iter().enumerate() {
        for (t_line, t_cubic, point) in hit_fn(cubic) {
            out.push((t_line, (i as f64 + t_cubic) / n, point));
        }
    }
    out
}

fn dedupe_hits(hits: Vec<SegmentHit>) -> Vec<SegmentHit> {
    let mut out: Vec<SegmentHit> = Vec::with_capacity(hits.len());
    for hit in hits {
        if !out
            .iter()
            .any(|kept| kept.point.distance(hit.point) < INTERSECTION_EPSILON)
        {
            out.push(hit);
        }
    }
    out
}

fn in_unit_range(t: f64) -> bool {
    (-PARAMETER_EPSILON..=1.0 + PARAMETER_EPSILON).contains(&t)
}

/// Determinant-based line/line intersection. Parallel lines (including
/// collinear ones) report no intersection.
fn line_line(a: &Line, b: &Line) -> Option<(f64, f64, DVec2)> {
    let r = a.end - a.start;
    let s = b.end - b.start;
    let denom = r.perp_dot(s);
    if denom.abs() < 1e-12 {
        return None;
    }
    let qp = b.start - a.start;
    let t = qp.perp_dot(s) / denom;
    let u = qp.perp_dot(r) / denom;
    if in_unit_range(t) && in_unit_range(u) {
        let t = t.clamp(0.0, 1.0);
        let u = u.clamp(0.0, 1.0);
        Some((t, u, a.start + r * t))
    } else {
        None
    }
}

/// Substitute the cubic into the line's implicit equation and solve for
/// the curve parameters where it crosses, then validate the line
/// parameter.
fn line_cubic(line: &Line, cubic: &Cubic) -> Vec<(f64, f64, DVec2)> {
    let dir = line.end - line.start;
    let len2 = dir.length_squared();
    if len2 < EPSILON * EPSILON {
        return Vec::new();
    }
    let normal = dir.perp();

    let p0 = cubic.start - line.start;
    let p1 = cubic.control1 - line.start;
    let p2 = cubic.control2 - line.start;
    let p3 = cubic.end - line.start;

    // Power-basis coefficients of the signed distance to the line.
    let a = normal.dot(-p0 + 3.0 * p1 - 3.0 * p2 + p3);
    let b = normal.dot(3.0 * p0 - 6.0 * p1 + 3.0 * p2);
    let c = normal.dot(3.0 * (p1 - p0));
    let d = normal.dot(p0);

    let mut out = Vec::new();
    for t in solve_cubic(a, b, c, d) {
        if !in_unit_range(t) {
            continue;
        }
        let t = t.clamp(0.0, 1.0);
        let point = cubic.point_at(t);
        let s = (point - line.start).dot(dir) / len2;
        if in_unit_range(s) {
            out.push((s.clamp(0.0, 1.0), t, point));
        }
    }
    out
}

/// Subdivision intersection of two cubics with bounding-box rejection.
fn cubic_cubic(a: &Cubic, b: &Cubic) -> Vec<(f64, f64, DVec2)> {
    let mut out = Vec::new();
    let mut budget = SUBDIVISION_BUDGET;
    cubic_cubic_recurse(
        a,
        (0.0, 1.0),
        b,
        (0.0, 1.0),
        0,
        &mut budget,
        &mut out,
    );
    out
}

#[allow(clippy::too_many_arguments)]
fn cubic_cubic_recurse(
    a: &Cubic,
    range_a: (f64, f64),
    b: &Cubic,
    range_b: (f64, f64),
    depth: u32,
    budget: &mut u32,
    out: &mut Vec<(f64, f64, DVec2)>,
) {
    if *budget == 0 {
        return;
    }
    *budget -= 1;

    let bounds_a = a.bounds();
    let bounds_b = b.bounds();
    if !bounds_a.overlaps(&bounds_b) {
        return;
    }

    let a_flat = bounds_a.max_dimension() < INTERSECTION_EPSILON;
    let b_flat = bounds_b.max_dimension() < INTERSECTION_EPSILON;
    if (a_flat && b_flat) || depth >= MAX_SUBDIVISION_DEPTH {
        let chord_a = Line {
            start: a.start,
            end: a.end,
        };
        let chord_b = Line {
            start: b.start,
            end: b.end,
        };
        if let Some((t, u, point)) = line_line(&chord_a, &chord_b) {
            out.push((
                range_a.0 + t * (range_a.1 - range_a.0),
                range_b.0 + u * (range_b.1 - range_b.0),
                point,
            ));
        }
        return;
    }

    let split_a = if a_flat {
        false
    } else if b_flat {
        true
    } else {
        bounds_a.max_dimension() >= bounds_b.max_dimension()
    };

    if split_a {
        let (head, tail) = a.split_cubic(0.5);
        let mid = (range_a.0 + range_a.1) * 0.5;
        cubic_cubic_recurse(&head, (range_a.0, mid), b, range_b, depth + 1, budget, out);
        cubic_cubic_recurse(&tail, (mid, range_a.1), b, range_b, depth + 1, budget, out);
    } else {
        let (head, tail) = b.split_cubic(0.5);
        let mid = (range_b.0 + range_b.1) * 0.5;
        cubic_cubic_recurse(a, range_a, &head, (range_b.0, mid), depth + 1, budget, out);
        cubic_cubic_recurse(a, range_a, &tail, (mid, range_b.1), depth + 1, budget, out);
    }
}

fn project_line(line: &Line, target: DVec2) -> Projection {
    let dir = line.end - line.start;
    let len2 = dir.length_squared();
    if len2 < EPSILON * EPSILON {
        return Projection {
            point: line.start,
            t: 0.0,
            distance: line.start.distance(target),
            iterations: 0,
            converged: true,
        };
    }
    // Perpendicular foot, parameter left unclamped.
    let t = (target - line.start).dot(dir) / len2;
    let point = line.start + dir * t.clamp(0.0, 1.0);
    Projection {
        point,
        t,
        distance: point.distance(target),
        iterations: 0,
        converged: true,
    }
}

fn project_cubic(cubic: &Cubic, target: DVec2) -> Projection {
    // Coarse sampled minimum seeds the iteration.
    let mut best_t = 0.0;
    let mut best_d2 = f64::INFINITY;
    for i in 0..=PROJECTION_SAMPLES {
        let t = f64::from(i) / f64::from(PROJECTION_SAMPLES);
        let d2 = cubic.point_at(t).distance_squared(target);
        if d2 < best_d2 {
            best_d2 = d2;
            best_t = t;
        }
    }

    // Newton on g(t) = (B(t) - P) . B'(t).
    let mut t = best_t;
    let mut iterations = 0;
    let mut converged = false;
    for _ in 0..MAX_NEWTON_ITERATIONS {
        iterations += 1;
        let delta = cubic.point_at(t) - target;
        let d1 = cubic.derivative_at(t);
        let g = delta.dot(d1);
        let h = d1.length_squared() + delta.dot(cubic.second_derivative_at(t));
        if h.abs() < 1e-12 {
            break;
        }
        let step = g / h;
        let next = t - step;
        if !next.is_finite() || !(-0.5..=1.5).contains(&next) {
            t = best_t;
            break;
        }
        t = next;
        if step.abs() < NEWTON_EPSILON {
            converged = true;
            break;
        }
    }

    // Newton may settle on a worse local minimum than the sampled seed.
    let newton_point = cubic.point_at(t.clamp(0.0, 1.0));
    let newton_d2 = newton_point.distance_squared(target);
    if newton_d2 <= best_d2 + EPSILON {
        Projection {
            point: newton_point,
            t,
            distance: newton_d2.sqrt(),
            iterations,
            converged,
        }
    } else {
        let point = cubic.point_at(best_t);
        Projection {
            point,
            t: best_t,
            distance: best_d2.sqrt(),
            iterations,
            converged: false,
        }
    }
}

/// Real roots of `a x^2 + b x + c = 0`, degenerating to the linear case
/// when the leading coefficient vanishes.
pub fn solve_quadratic(a: f64, b: f64, c: f64) -> Vec<f64> {
    if a.abs() < 1e-12 {
        if b.abs() < 1e-12 {
            return Vec::new();
        }
        return vec![-c / b];
    }
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return Vec::new();
    }
    // Citardauq-style split avoids cancellation on the smaller root.
    let q = -0.5 * (b + b.signum() * disc.sqrt());
    let r1 = q / a;
    if q.abs() < 1e-300 {
        return vec![r1];
    }
    vec![r1, c / q]
}

/// Real roots of `a x^3 + b x^2 + c x + d = 0` via the depressed cubic,
/// trigonometric in the three-real-root case.
pub fn solve_cubic(a: f64, b: f64, c: f64, d: f64) -> Vec<f64> {
    if a.abs() < 1e-12 {
        return solve_quadratic(b, c, d);
    }
    let b = b / a;
    let c = c / a;
    let d = d / a;

    let p = c - b * b / 3.0;
    let q = 2.0 * b * b * b / 27.0 - b * c / 3.0 + d;
    let shift = -b / 3.0;

    let half_q = q * 0.5;
    let third_p = p / 3.0;
    let disc = half_q * half_q + third_p * third_p * third_p;

    if disc > 1e-12 {
        let sq = disc.sqrt();
        vec![(-half_q + sq).cbrt() + (-half_q - sq).cbrt() + shift]
    } else if disc < -1e-12 {
        // Three distinct real roots; p is necessarily negative here.
        let m = 2.0 * (-third_p).sqrt();
        let theta = ((3.0 * q) / (p * m)).clamp(-1.0, 1.0).acos() / 3.0;
        (0..3)
            .map(|k| m * (theta - f64::from(k) * std::f64::consts::TAU / 3.0).cos() + shift)
            .collect()
    } else {
        let u = (-half_q).cbrt();
        vec![2.0 * u + shift, -u + shift]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::dvec2;

    fn pt(x: f64, y: f64) -> DVec2 {
        dvec2(x, y)
    }

    fn line(a: DVec2, b: DVec2) -> Segment {
        Line { start: a, end: b }.into()
    }

    fn arch() -> Segment {
        Cubic {
            start: pt(0.0, 0.0),
            control1: pt(0.0, 10.0),
            control2: pt(10.0, 10.0),
            end: pt(10.0, 0.0),
        }
        .into()
    }

    #[test]
    fn crossing_lines_intersect_once() {
        let a = line(pt(0.0, 0.0), pt(2.0, 2.0));
        let b = line(pt(0.0, 2.0), pt(2.0, 0.0));
        let hits = segment_intersections(&a, &b);
        assert_eq!(hits.len(), 1);
        assert!(hits[0].point.distance(pt(1.0, 1.0)) < 1e-9);
        assert!((hits[0].t_self - 0.5).abs() < 1e-9);
        assert!((hits[0].t_other - 0.5).abs() < 1e-9);
    }

    #[test]
    fn parallel_lines_do_not_intersect() {
        let a = line(pt(0.0, 0.0), pt(10.0, 0.0));
        let b = line(pt(0.0, 1.0), pt(10.0, 1.0));
        assert!(segment_intersections(&a, &b).is_empty());
        // Collinear overlap also reports none.
        let c = line(pt(2.0, 0.0), pt(8.0, 0.0));
        assert!(segment_intersections(&a, &c).is_empty());
    }

    #[test]
    fn non_overlapping_spans_do_not_intersect() {
        let a = line(pt(0.0, 0.0), pt(1.0, 1.0));
        let b = line(pt(10.0, 0.0), pt(10.0, 5.0));
        assert!(segment_intersections(&a, &b).is_empty());
    }

    #[test]
    fn line_crosses_arch_twice() {
        let cut = line(pt(-5.0, 5.0), pt(15.0, 5.0));
        let hits = segment_intersections(&cut, &arch());
        assert_eq!(hits.len(), 2);
        for hit in &hits {
            assert!((hit.point.y - 5.0).abs() < 1e-6);
        }
        assert!(hits[0].t_self < hits[1].t_self);
    }

    #[test]
    fn line_missing_arch_reports_none() {
        let cut = line(pt(-5.0, 20.0), pt(15.0, 20.0));
        assert!(segment_intersections(&cut, &arch()).is_empty());
    }

    #[test]
    fn cubic_cubic_cross() {
        let a = arch();
        let b: Segment = Cubic {
            start: pt(5.0, -2.0),
            control1: pt(5.0, 4.0),
            control2: pt(5.0, 8.0),
            end: pt(5.0, 12.0),
        }
        .into();
        let hits = segment_intersections(&a, &b);
        assert_eq!(hits.len(), 1);
        assert!((hits[0].point.x - 5.0).abs() < 1e-3);
        assert!((hits[0].point.y - 7.5).abs() < 1e-3);
    }

    #[test]
    fn project_onto_line_unclamped_parameter() {
        let seg = line(pt(0.0, 0.0), pt(10.0, 0.0));
        let proj = project_onto_segment(&seg, pt(15.0, 3.0));
        // Beyond the endpoint: t exceeds 1 but the point stays on the segment.
        assert!(proj.t > 1.0);
        assert!(proj.point.distance(pt(10.0, 0.0)) < 1e-9);
        assert!((proj.distance - pt(15.0, 3.0).distance(pt(10.0, 0.0))).abs() < 1e-9);
    }

    #[test]
    fn project_onto_cubic_converges() {
        let seg = arch();
        let proj = project_onto_segment(&seg, pt(5.0, 9.0));
        assert!(proj.converged);
        // Apex of the arch is (5, 7.5).
        assert!(proj.point.distance(pt(5.0, 7.5)) < 1e-6);
        assert!((proj.distance - 1.5).abs() < 1e-6);
        assert!((proj.t - 0.5).abs() < 1e-6);
    }

    #[test]
    fn project_point_on_curve_has_zero_distance() {
        let seg = arch();
        let on_curve = seg.point_at(0.3);
        let proj = project_onto_segment(&seg, on_curve);
        assert!(proj.distance < 1e-9);
        assert!((proj.t - 0.3).abs() < 1e-6);
    }

    #[test]
    fn solve_cubic_three_roots() {
        // (x - 1)(x - 2)(x - 3) = x^3 - 6x^2 + 11x - 6
        let mut roots = solve_cubic(1.0, -6.0, 11.0, -6.0);
        roots.sort_by(f64::total_cmp);
        assert_eq!(roots.len(), 3);
        for (root, expected) in roots.iter().zip([1.0, 2.0, 3.0]) {
            assert!((root - expected).abs() < 1e-9, "{root} != {expected}");
        }
    }

    #[test]
    fn solve_cubic_single_root() {
        // x^3 + x = 0 has the single real root 0... plus x^3 - 8 = 0 -> 2.
        let roots = solve_cubic(1.0, 0.0, 0.0, -8.0);
        assert_eq!(roots.len(), 1);
        assert!((roots[0] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn solve_quadratic_stable_roots() {
        let mut roots = solve_quadratic(1.0, -3.0, 2.0);
        roots.sort_by(f64::total_cmp);
        assert!((roots[0] - 1.0).abs() < 1e-12);
        assert!((roots[1] - 2.0).abs() < 1e-12);
        assert!(solve_quadratic(1.0, 0.0, 1.0).is_empty());
    }
}
