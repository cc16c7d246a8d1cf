//! Edge path synthesis: build a [`Path`] between two endpoints through
//! ordered waypoints in one of four routing modes.
//!
//! Orthogonal routing keeps a direction-continuity search going between
//! consecutive points: each hop picks a cardinal direction from a stable
//! candidate ordering, produces an L-shaped pair of legs, and constrains
//! the next hop so the route never doubles back along its entry
//! direction. A rounding radius post-processes interior line corners into
//! small cubic fillets.

use glam::{DVec2, dvec2};

use crate::errors::GeometryError;
use crate::log::debug;
use crate::path::{Path, PathBuilder};
use crate::types::{EPSILON, ensure_finite};

/// Handle length factor for a quarter-turn cubic fillet,
/// (4/3)(sqrt(2) - 1).
const FILLET_HANDLE: f64 = 0.552_284_749_8;

/// Fraction of the neighbor distance used when synthesizing missing
/// bezier control points.
const DEFAULT_CONTROL_FRACTION: f64 = 0.2;

/// The curve-shape family used to synthesize an edge path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoutingMode {
    /// Polyline through the waypoints.
    #[default]
    Straight,
    /// Axis-aligned legs with direction-continuity search.
    Orthogonal,
    /// Tangent-continuous chain of quadratics through the waypoints.
    Curved,
    /// Chained cubics driven by per-waypoint control points.
    Bezier,
}

/// Cardinal directions, in screen coordinates (y grows south).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    /// Stable candidate ordering for orthogonal routing. Ties between
    /// equally valid directions resolve by this order, never by hash or
    /// set iteration order.
    pub const ROUTING_ORDER: [Direction; 4] = [
        Direction::South,
        Direction::East,
        Direction::North,
        Direction::West,
    ];

    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::East | Direction::West)
    }

    pub fn vector(self) -> DVec2 {
        match self {
            Direction::North => dvec2(0.0, -1.0),
            Direction::South => dvec2(0.0, 1.0),
            Direction::East => dvec2(1.0, 0.0),
            Direction::West => dvec2(-1.0, 0.0),
        }
    }

    /// Whether traversing this direction makes progress toward `delta`
    /// without moving away from the target along its axis.
    fn heads_toward(self, delta: DVec2) -> bool {
        match self {
            Direction::East => delta.x > EPSILON,
            Direction::West => delta.x < -EPSILON,
            Direction::South => delta.y > EPSILON,
            Direction::North => delta.y < -EPSILON,
        }
    }
}

/// An intermediate routing point. `controls` carries the bezier-mode
/// control handles as offsets from `point` (incoming, outgoing); the
/// other modes ignore them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    pub point: DVec2,
    pub controls: Option<(DVec2, DVec2)>,
}

impl Waypoint {
    pub fn at(point: DVec2) -> Waypoint {
        Waypoint {
            point,
            controls: None,
        }
    }

    pub fn with_controls(point: DVec2, incoming: DVec2, outgoing: DVec2) -> Waypoint {
        Waypoint {
            point,
            controls: Some((incoming, outgoing)),
        }
    }
}

/// Options for [`build_edge_path`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RouteOptions {
    pub mode: RoutingMode,
    /// Corner fillet radius for polyline modes; 0 disables rounding.
    pub rounding_radius: f64,
    /// Preferred exit direction from the start (orthogonal mode).
    pub start_direction: Option<Direction>,
    /// Preferred entry direction at the end (orthogonal mode).
    pub end_direction: Option<Direction>,
}

/// Synthesize an edge path from `start` to `end` through `waypoints`.
///
/// With no waypoints every mode degenerates to a single direct segment;
/// coincident endpoints with no waypoints yield an empty path, which
/// callers must treat as unrenderable rather than dividing by its length.
pub fn build_edge_path(
    start: DVec2,
    end: DVec2,
    waypoints: &[Waypoint],
    options: &RouteOptions,
) -> Result<Path, GeometryError> {
    ensure_finite(start, "edge start")?;
    ensure_finite(end, "edge end")?;
    for wp in waypoints {
        ensure_finite(wp.point, "waypoint")?;
        if let Some((incoming, outgoing)) = wp.controls {
            ensure_finite(incoming, "waypoint control")?;
            ensure_finite(outgoing, "waypoint control")?;
        }
    }

    let mut points = Vec::with_capacity(waypoints.len() + 2);
    points.push(start);
    points.extend(waypoints.iter().map(|wp| wp.point));
    points.push(end);

    match options.mode {
        RoutingMode::Straight => {
            let points = simplify_polyline(&points);
            rounded_polyline(start, &points, options.rounding_radius)
        }
        RoutingMode::Orthogonal => {
            let deduped = dedupe_points(&points);
            let routed =
                orthogonal_route(&deduped, options.start_direction, options.end_direction);
            let routed = simplify_polyline(&routed);
            rounded_polyline(start, &routed, options.rounding_radius)
        }
        RoutingMode::Curved => curved_path(start, &dedupe_points(&points)),
        RoutingMode::Bezier => bezier_path(start, end, waypoints),
    }
}

/// Drop consecutive duplicate points.
fn dedupe_points(points: &[DVec2]) -> Vec<DVec2> {
    let mut out: Vec<DVec2> = Vec::with_capacity(points.len());
    for &p in points {
        if out.last().is_none_or(|last| last.distance(p) > EPSILON) {
            out.push(p);
        }
    }
    out
}

/// Drop duplicates and merge runs of collinear same-direction legs.
fn simplify_polyline(points: &[DVec2]) -> Vec<DVec2> {
    let mut out: Vec<DVec2> = Vec::with_capacity(points.len());
    for &p in points {
        if out.last().is_some_and(|last| last.distance(p) < EPSILON) {
            continue;
        }
        while out.len() >= 2 {
            let a = out[out.len() - 2];
            let b = out[out.len() - 1];
            let ab = b - a;
            let bp = p - b;
            if ab.perp_dot(bp).abs() < EPSILON && ab.dot(bp) > 0.0 {
                out.pop();
            } else {
                break;
            }
        }
        out.push(p);
    }
    out
}

/// Polyline with optional cubic fillets at interior corners. Corners
/// whose adjacent legs are shorter than the radius are left sharp.
fn rounded_polyline(
    origin: DVec2,
    points: &[DVec2],
    radius: f64,
) -> Result<Path, GeometryError> {
    if points.len() < 2 {
        return Ok(Path::empty(origin));
    }
    if radius <= 0.0 {
        return Path::polyline(points);
    }

    let mut builder = PathBuilder::new(points[0]);
    let mut cursor = points[0];
    for i in 1..points.len() - 1 {
        let corner = points[i];
        let next = points[i + 1];
        let in_len = cursor.distance(corner);
        let out_len = corner.distance(next);
        if in_len < radius || out_len < radius {
            builder = builder.line_to(corner);
            cursor = corner;
            continue;
        }
        let dir_in = (corner - cursor) / in_len;
        let dir_out = (next - corner) / out_len;
        let fillet_start = corner - dir_in * radius;
        let fillet_end = corner + dir_out * radius;
        builder = builder.line_to(fillet_start).cubic_to(
            fillet_start + dir_in * (radius * FILLET_HANDLE),
            fillet_end - dir_out * (radius * FILLET_HANDLE),
            fillet_end,
        );
        cursor = fillet_end;
    }
    builder = builder.line_to(points[points.len() - 1]);
    builder.build()
}

/// Tangent-continuous quadratic chain: the first control point sits on
/// the chord midpoint, every later one mirrors the previous segment's
/// trailing tangent across the join.
fn curved_path(origin: DVec2, points: &[DVec2]) -> Result<Path, GeometryError> {
    if points.len() < 2 {
        return Ok(Path::empty(origin));
    }
    let mut control = points[0].lerp(points[1], 0.5);
    let mut builder = PathBuilder::new(points[0]).quad_to(control, points[1]);
    for i in 2..points.len() {
        control = points[i - 1] * 2.0 - control;
        builder = builder.quad_to(control, points[i]);
    }
    builder.build()
}

/// Chained cubics. Waypoints without explicit control handles get
/// defaults at 20% of the distance toward each neighbor.
fn bezier_path(start: DVec2, end: DVec2, waypoints: &[Waypoint]) -> Result<Path, GeometryError> {
    if waypoints.is_empty() && start.distance(end) < EPSILON {
        return Ok(Path::empty(start));
    }
    let mut anchors = Vec::with_capacity(waypoints.len() + 2);
    anchors.push(Waypoint::at(start));
    anchors.extend_from_slice(waypoints);
    anchors.push(Waypoint::at(end));

    let mut builder = PathBuilder::new(start);
    for i in 0..anchors.len() - 1 {
        let a = anchors[i];
        let b = anchors[i + 1];
        let outgoing = a
            .controls
            .map(|(_, out)| out)
            .unwrap_or_else(|| (b.point - a.point) * DEFAULT_CONTROL_FRACTION);
        let incoming = b
            .controls
            .map(|(inc, _)| inc)
            .unwrap_or_else(|| (a.point - b.point) * DEFAULT_CONTROL_FRACTION);
        builder = builder.cubic_to(a.point + outgoing, b.point + incoming, b.point);
    }
    builder.build()
}

/// One evaluated candidate for an orthogonal hop.
#[derive(Debug, Clone, Copy)]
struct Hop {
    corner: Option<DVec2>,
    exit: Direction,
}

/// Direction-continuity search over consecutive point pairs.
fn orthogonal_route(
    points: &[DVec2],
    start_direction: Option<Direction>,
    end_direction: Option<Direction>,
) -> Vec<DVec2> {
    let Some((&first, _)) = points.split_first() else {
        return Vec::new();
    };
    let mut route = vec![first];
    let mut preferred: Vec<Direction> = start_direction.into_iter().collect();
    let mut available: Vec<Direction> = Direction::ROUTING_ORDER.to_vec();

    for (index, &target) in points.iter().enumerate().skip(1) {
        let from = *route.last().expect("route starts non-empty");
        let delta = target - from;
        if delta.x.abs() < EPSILON && delta.y.abs() < EPSILON {
            continue;
        }

        // Candidate ordering: preferred directions first, then the rest of
        // the available set, then every direction as a last resort so the
        // hop always has a candidate.
        let mut candidates: Vec<Direction> = Vec::with_capacity(4);
        for &dir in &preferred {
            if available.contains(&dir) && dir.heads_toward(delta) {
                push_unique(&mut candidates, dir);
            }
        }
        for dir in Direction::ROUTING_ORDER {
            if available.contains(&dir) && dir.heads_toward(delta) {
                push_unique(&mut candidates, dir);
            }
        }
        for dir in Direction::ROUTING_ORDER {
            push_unique(&mut candidates, dir);
        }

        let hops: Vec<Hop> = candidates
            .iter()
            .map(|&dir| evaluate_hop(from, target, dir))
            .collect();
        let is_final = index == points.len() - 1;
        let chosen = if is_final {
            end_direction
                .and_then(|want| hops.iter().find(|hop| hop.exit == want))
                .or_else(|| hops.first())
        } else {
            hops.first()
        };
        // The all-directions fallback guarantees a candidate; reaching
        // this with none is a routing logic error.
        let chosen = *chosen.expect("orthogonal routing found no candidate direction");
        debug!(
            "orthogonal hop {}: exit {:?}, corner {:?}",
            index, chosen.exit, chosen.corner
        );

        if let Some(corner) = chosen.corner {
            route.push(corner);
        }
        route.push(target);
        preferred = vec![chosen.exit];
        available = Direction::ROUTING_ORDER
            .into_iter()
            .filter(|&dir| dir != chosen.exit.opposite())
            .collect();
    }
    route
}

fn push_unique(list: &mut Vec<Direction>, dir: Direction) {
    if !list.contains(&dir) {
        list.push(dir);
    }
}

/// L-shaped hop for one candidate direction: a first leg along the
/// candidate axis to the target's coordinate, then a perpendicular leg.
/// The exit direction is the second leg's direction, or the candidate
/// itself when the points are already aligned.
fn evaluate_hop(from: DVec2, target: DVec2, dir: Direction) -> Hop {
    let delta = target - from;
    if dir.is_horizontal() {
        if delta.y.abs() < EPSILON {
            Hop {
                corner: None,
                exit: dir,
            }
        } else {
            Hop {
                corner: Some(dvec2(target.x, from.y)),
                exit: if delta.y > 0.0 {
                    Direction::South
                } else {
                    Direction::North
                },
            }
        }
    } else if delta.x.abs() < EPSILON {
        Hop {
            corner: None,
            exit: dir,
        }
    } else {
        Hop {
            corner: Some(dvec2(from.x, target.y)),
            exit: if delta.x > 0.0 {
                Direction::East
            } else {
                Direction::West
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::{Segment, SegmentOps};
    use glam::dvec2;

    fn pt(x: f64, y: f64) -> DVec2 {
        dvec2(x, y)
    }

    fn assert_close(actual: DVec2, expected: DVec2) {
        assert!(
            actual.distance(expected) < 1e-9,
            "{actual} != {expected}"
        );
    }

    fn is_axis_aligned(seg: &Segment) -> bool {
        match seg {
            Segment::Line(line) => {
                let d = line.end - line.start;
                d.x.abs() < 1e-9 || d.y.abs() < 1e-9
            }
            _ => false,
        }
    }

    #[test]
    fn straight_edge_through_waypoint() {
        let path = build_edge_path(
            pt(0.0, 0.0),
            pt(100.0, 0.0),
            &[Waypoint::at(pt(50.0, 50.0))],
            &RouteOptions::default(),
        )
        .unwrap();
        assert_eq!(path.segment_count(), 2);
        assert_close(path.segments()[0].end_point(), pt(50.0, 50.0));
        assert_close(path.end_point(), pt(100.0, 0.0));
    }

    #[test]
    fn coincident_endpoints_yield_empty_path() {
        for mode in [
            RoutingMode::Straight,
            RoutingMode::Orthogonal,
            RoutingMode::Curved,
            RoutingMode::Bezier,
        ] {
            let path = build_edge_path(
                pt(5.0, 5.0),
                pt(5.0, 5.0),
                &[],
                &RouteOptions {
                    mode,
                    ..RouteOptions::default()
                },
            )
            .unwrap();
            assert!(path.is_empty(), "{mode:?} should be empty");
            assert_eq!(path.start(), pt(5.0, 5.0));
        }
    }

    #[test]
    fn orthogonal_l_route_prefers_south_first() {
        let path = build_edge_path(
            pt(0.0, 0.0),
            pt(100.0, 50.0),
            &[],
            &RouteOptions {
                mode: RoutingMode::Orthogonal,
                ..RouteOptions::default()
            },
        )
        .unwrap();
        assert_eq!(path.segment_count(), 2);
        assert_close(path.segments()[0].end_point(), pt(0.0, 50.0));
        assert_close(path.end_point(), pt(100.0, 50.0));
    }

    #[test]
    fn orthogonal_aligned_points_are_one_leg() {
        let path = build_edge_path(
            pt(0.0, 0.0),
            pt(100.0, 0.0),
            &[],
            &RouteOptions {
                mode: RoutingMode::Orthogonal,
                ..RouteOptions::default()
            },
        )
        .unwrap();
        assert_eq!(path.segment_count(), 1);
        assert_close(path.end_point(), pt(100.0, 0.0));
    }

    #[test]
    fn orthogonal_routes_are_axis_aligned_with_no_backtrack() {
        let path = build_edge_path(
            pt(0.0, 0.0),
            pt(30.0, -40.0),
            &[Waypoint::at(pt(80.0, 20.0)), Waypoint::at(pt(10.0, 60.0))],
            &RouteOptions {
                mode: RoutingMode::Orthogonal,
                ..RouteOptions::default()
            },
        )
        .unwrap();
        assert!(path.segments().iter().all(is_axis_aligned));
        // No leg immediately reverses the previous one.
        for pair in path.segments().windows(2) {
            let a = pair[0].end_point() - pair[0].start_point();
            let b = pair[1].end_point() - pair[1].start_point();
            let reversal = a.normalize().dot(b.normalize()) < -0.99;
            assert!(!reversal, "route doubles back: {a} then {b}");
        }
        assert_close(path.end_point(), pt(30.0, -40.0));
    }

    #[test]
    fn orthogonal_honors_preferred_end_direction() {
        let path = build_edge_path(
            pt(0.0, 0.0),
            pt(100.0, 50.0),
            &[],
            &RouteOptions {
                mode: RoutingMode::Orthogonal,
                end_direction: Some(Direction::South),
                ..RouteOptions::default()
            },
        )
        .unwrap();
        // Entering south means the horizontal leg comes first.
        assert_close(path.segments()[0].end_point(), pt(100.0, 0.0));
        assert_close(path.end_point(), pt(100.0, 50.0));
    }

    #[test]
    fn orthogonal_start_direction_wins_tie() {
        let path = build_edge_path(
            pt(0.0, 0.0),
            pt(100.0, 50.0),
            &[],
            &RouteOptions {
                mode: RoutingMode::Orthogonal,
                start_direction: Some(Direction::East),
                ..RouteOptions::default()
            },
        )
        .unwrap();
        assert_close(path.segments()[0].end_point(), pt(100.0, 0.0));
    }

    #[test]
    fn rounding_inserts_cubic_fillets() {
        let path = build_edge_path(
            pt(0.0, 0.0),
            pt(100.0, 50.0),
            &[],
            &RouteOptions {
                mode: RoutingMode::Orthogonal,
                rounding_radius: 10.0,
                ..RouteOptions::default()
            },
        )
        .unwrap();
        assert_eq!(path.segment_count(), 3);
        assert!(matches!(path.segments()[1], Segment::Cubic(_)));
        // Fillet endpoints sit one radius away from the corner (0, 50).
        assert_close(path.segments()[0].end_point(), pt(0.0, 40.0));
        assert_close(path.segments()[2].start_point(), pt(10.0, 50.0));
        assert_close(path.end_point(), pt(100.0, 50.0));
    }

    #[test]
    fn rounding_skips_short_legs() {
        let path = build_edge_path(
            pt(0.0, 0.0),
            pt(5.0, 3.0),
            &[],
            &RouteOptions {
                mode: RoutingMode::Orthogonal,
                rounding_radius: 10.0,
                ..RouteOptions::default()
            },
        )
        .unwrap();
        // Legs shorter than the radius stay sharp lines.
        assert!(
            path.segments()
                .iter()
                .all(|seg| matches!(seg, Segment::Line(_)))
        );
    }

    #[test]
    fn curved_chain_is_tangent_continuous() {
        let path = build_edge_path(
            pt(0.0, 0.0),
            pt(100.0, 0.0),
            &[Waypoint::at(pt(30.0, 40.0)), Waypoint::at(pt(70.0, -20.0))],
            &RouteOptions {
                mode: RoutingMode::Curved,
                ..RouteOptions::default()
            },
        )
        .unwrap();
        assert_eq!(path.segment_count(), 3);
        for pair in path.segments().windows(2) {
            let out_tangent = pair[0].tangent_at(1.0).unwrap();
            let in_tangent = pair[1].tangent_at(0.0).unwrap();
            assert!(
                out_tangent.dot(in_tangent) > 0.999,
                "tangent break: {out_tangent} vs {in_tangent}"
            );
        }
    }

    #[test]
    fn curved_without_waypoints_is_single_quadratic() {
        let path = build_edge_path(
            pt(0.0, 0.0),
            pt(10.0, 0.0),
            &[],
            &RouteOptions {
                mode: RoutingMode::Curved,
                ..RouteOptions::default()
            },
        )
        .unwrap();
        assert_eq!(path.segment_count(), 1);
        assert!(matches!(path.segments()[0], Segment::Quadratic(_)));
        assert_close(path.point_at(0.5).unwrap(), pt(5.0, 0.0));
    }

    #[test]
    fn bezier_uses_explicit_controls_and_synthesizes_missing_ones() {
        let wp = Waypoint::with_controls(pt(50.0, 50.0), pt(-10.0, 0.0), pt(10.0, 0.0));
        let path = build_edge_path(
            pt(0.0, 0.0),
            pt(100.0, 0.0),
            &[wp],
            &RouteOptions {
                mode: RoutingMode::Bezier,
                ..RouteOptions::default()
            },
        )
        .unwrap();
        assert_eq!(path.segment_count(), 2);
        let Segment::Cubic(first) = path.segments()[0] else {
            panic!("expected cubic");
        };
        // Start has no controls: synthesized at 20% toward the waypoint.
        assert_close(first.control1, pt(10.0, 10.0));
        // Waypoint's incoming handle is explicit.
        assert_close(first.control2, pt(40.0, 50.0));
        let Segment::Cubic(second) = path.segments()[1] else {
            panic!("expected cubic");
        };
        assert_close(second.control1, pt(60.0, 50.0));
        // End has no controls: synthesized at 20% back toward the waypoint.
        assert_close(second.control2, pt(90.0, 10.0));
    }

    #[test]
    fn rejects_non_finite_input() {
        let err = build_edge_path(
            pt(f64::NAN, 0.0),
            pt(1.0, 1.0),
            &[],
            &RouteOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, GeometryError::NonFinite { .. }));
    }
}
