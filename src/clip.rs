//! Edge clipping and crossing-gap insertion: trim a synthesized edge path
//! against the connected shapes' boundary paths and arrow reservations,
//! then carve small gaps where the edge crosses other edges.
//!
//! All sizes (gap width, arrow heights, stroke widths) are plain
//! parameters supplied by the caller; nothing here reads process-wide
//! configuration.

use glam::DVec2;

use crate::errors::GeometryError;
use crate::log::debug;
use crate::path::Path;
use crate::types::{EPSILON, ensure_finite};

/// Default symmetric gap carved around an edge-over-edge crossing.
pub const DEFAULT_CROSSING_GAP: f64 = 10.0;

/// Extra length reserved beyond an arrow's height for its stroke.
const ARROW_STROKE_ALLOWANCE: f64 = 1.0;

/// Literal anchors snap to a boundary intersection only within this
/// multiple of the node's stroke width.
const LITERAL_SNAP_FACTOR: f64 = 2.0;

/// How a connection anchor interacts with the shape boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnchorMode {
    /// Snap the endpoint to the boundary intersection.
    #[default]
    Clip,
    /// Keep the literal anchor position unless an intersection falls
    /// within the snap distance of it.
    Literal,
}

/// One end of an edge: the connected shape's boundary (if any), the
/// anchor semantics, and the arrow reservation.
#[derive(Debug, Clone, Default)]
pub struct Terminal {
    pub boundary: Option<Path>,
    pub anchor: AnchorMode,
    /// Stroke width of the connected node, used by literal-anchor
    /// snapping.
    pub stroke_width: f64,
    /// Arrow height; when present, `height + 1` units of path are
    /// reserved for the arrow at this end.
    pub arrow_height: Option<f64>,
}

impl Terminal {
    /// A free-floating end: no boundary, no arrow.
    pub fn free() -> Terminal {
        Terminal::default()
    }

    /// A clip-anchored end against a shape boundary.
    pub fn clipped(boundary: Path) -> Terminal {
        Terminal {
            boundary: Some(boundary),
            anchor: AnchorMode::Clip,
            stroke_width: 1.0,
            arrow_height: None,
        }
    }

    /// A literal-anchored end: only snaps to the boundary when an
    /// intersection is close to the anchor.
    pub fn literal(boundary: Path, stroke_width: f64) -> Terminal {
        Terminal {
            boundary: Some(boundary),
            anchor: AnchorMode::Literal,
            stroke_width,
            arrow_height: None,
        }
    }

    pub fn with_arrow(mut self, height: f64) -> Terminal {
        self.arrow_height = Some(height);
        self
    }
}

/// Clip an edge path and carve crossing gaps.
///
/// Returns the ordered, disjoint fragments of the clipped curve: one
/// fragment when no gaps apply, more when crossings are carved, and none
/// when clipping consumes the whole path (for example, coincident
/// terminals whose reservations overlap).
pub fn clip_edge_path(
    path: &Path,
    start: &Terminal,
    end: &Terminal,
    crossings: &[DVec2],
    gap: f64,
) -> Result<Vec<Path>, GeometryError> {
    for &crossing in crossings {
        ensure_finite(crossing, "crossing point")?;
    }
    if path.is_empty() {
        return Ok(Vec::new());
    }
    let total = path.total_length();
    if total < EPSILON {
        return Ok(Vec::new());
    }

    let mut from = terminal_station(path, start, true)?.unwrap_or(0.0);
    let mut to = terminal_station(path, end, false)?.unwrap_or(total);
    if from >= to - EPSILON {
        // The boundary clips crossed over each other (overlapping
        // shapes); abandon them and keep the literal endpoints.
        debug!("boundary clip stations inverted ({from} >= {to}), keeping anchors");
        from = 0.0;
        to = total;
    }

    if let Some(height) = start.arrow_height {
        from += height + ARROW_STROKE_ALLOWANCE;
    }
    if let Some(height) = end.arrow_height {
        to -= height + ARROW_STROKE_ALLOWANCE;
    }
    if to - from < EPSILON {
        return Ok(Vec::new());
    }

    // Crossing gaps: keep a center only when its carve range stays clear
    // of both reservation zones by half a gap width.
    let mut centers = Vec::new();
    if gap > EPSILON {
        for &crossing in crossings {
            let station = path.project_point(crossing)?.position.global_length()?;
            if station >= from + gap && station <= to - gap {
                centers.push(station);
            }
        }
        centers.sort_by(f64::total_cmp);
    }

    let mut fragments = Vec::new();
    let mut cursor = from;
    for center in centers {
        let lo = center - gap * 0.5;
        let hi = center + gap * 0.5;
        if lo <= cursor + EPSILON {
            // Crossings closer than a gap width merge into one carve.
            cursor = cursor.max(hi);
            continue;
        }
        fragments.push(path.slice(cursor, lo)?);
        cursor = hi;
    }
    if to - cursor > EPSILON {
        fragments.push(path.slice(cursor, to)?);
    }
    Ok(fragments)
}

/// The arc-length station where a terminal clips the path, or `None` to
/// keep the literal endpoint.
///
/// With multiple boundary crossings, the start terminal takes the
/// intersection nearest the path interior (greatest station) and the end
/// terminal the least; a convex boundary crossed once reduces to that
/// single intersection.
fn terminal_station(
    path: &Path,
    terminal: &Terminal,
    is_start: bool,
) -> Result<Option<f64>, GeometryError> {
    let Some(boundary) = &terminal.boundary else {
        return Ok(None);
    };
    if boundary.is_empty() {
        return Ok(None);
    }
    let hits = path.intersections(boundary);
    if hits.is_empty() {
        return Ok(None);
    }

    let mut stations = Vec::with_capacity(hits.len());
    for hit in &hits {
        stations.push(path.station(hit.segment_index, hit.t)?);
    }

    match terminal.anchor {
        AnchorMode::Clip => {
            let station = if is_start {
                stations.iter().copied().fold(f64::NEG_INFINITY, f64::max)
            } else {
                stations.iter().copied().fold(f64::INFINITY, f64::min)
            };
            Ok(Some(station))
        }
        AnchorMode::Literal => {
            let anchor = if is_start {
                path.start()
            } else {
                path.end_point()
            };
            let snap = LITERAL_SNAP_FACTOR * terminal.stroke_width;
            let nearest = hits
                .iter()
                .zip(&stations)
                .min_by(|(a, _), (b, _)| {
                    a.point
                        .distance_squared(anchor)
                        .total_cmp(&b.point.distance_squared(anchor))
                })
                .map(|(hit, &station)| (hit.point.distance(anchor), station));
            match nearest {
                Some((distance, station)) if distance <= snap => Ok(Some(station)),
                _ => Ok(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::dvec2;

    fn pt(x: f64, y: f64) -> DVec2 {
        dvec2(x, y)
    }

    /// Closed rectangular boundary as a polyline path.
    fn rect(min: DVec2, max: DVec2) -> Path {
        Path::polyline(&[
            min,
            pt(max.x, min.y),
            max,
            pt(min.x, max.y),
            min,
        ])
        .unwrap()
    }

    fn horizontal_edge() -> Path {
        Path::polyline(&[pt(0.0, 0.0), pt(100.0, 0.0)]).unwrap()
    }

    #[test]
    fn free_terminals_return_single_fragment() {
        let path = horizontal_edge();
        let fragments =
            clip_edge_path(&path, &Terminal::free(), &Terminal::free(), &[], 10.0).unwrap();
        assert_eq!(fragments.len(), 1);
        assert!((fragments[0].total_length() - 100.0).abs() < 1e-6);
    }

    #[test]
    fn empty_path_clips_to_nothing() {
        let path = Path::empty(pt(0.0, 0.0));
        let fragments =
            clip_edge_path(&path, &Terminal::free(), &Terminal::free(), &[], 10.0).unwrap();
        assert!(fragments.is_empty());
    }

    #[test]
    fn clip_anchor_snaps_to_boundary() {
        // Edge starts at the center of a 20x20 box.
        let path = horizontal_edge();
        let start = Terminal::clipped(rect(pt(-10.0, -10.0), pt(10.0, 10.0)));
        let fragments = clip_edge_path(&path, &start, &Terminal::free(), &[], 10.0).unwrap();
        assert_eq!(fragments.len(), 1);
        assert!(fragments[0].start().distance(pt(10.0, 0.0)) < 1e-6);
        assert!(fragments[0].end_point().distance(pt(100.0, 0.0)) < 1e-6);
    }

    #[test]
    fn end_clip_takes_nearest_intersection() {
        // Edge ends at the center of a box around (100, 0).
        let path = horizontal_edge();
        let end = Terminal::clipped(rect(pt(90.0, -10.0), pt(110.0, 10.0)));
        let fragments = clip_edge_path(&path, &Terminal::free(), &end, &[], 10.0).unwrap();
        assert_eq!(fragments.len(), 1);
        assert!(fragments[0].end_point().distance(pt(90.0, 0.0)) < 1e-6);
    }

    #[test]
    fn literal_anchor_far_from_boundary_stays_put() {
        let path = horizontal_edge();
        let start = Terminal::literal(rect(pt(-10.0, -10.0), pt(10.0, 10.0)), 1.0);
        let fragments = clip_edge_path(&path, &start, &Terminal::free(), &[], 10.0).unwrap();
        // The boundary crossing at (10, 0) is 10 units from the anchor,
        // beyond 2 x stroke width, so the anchor is kept.
        assert!(fragments[0].start().distance(pt(0.0, 0.0)) < 1e-6);
    }

    #[test]
    fn literal_anchor_near_boundary_snaps() {
        let path = Path::polyline(&[pt(9.0, 0.0), pt(100.0, 0.0)]).unwrap();
        let start = Terminal::literal(rect(pt(-10.0, -10.0), pt(10.0, 10.0)), 1.0);
        let fragments = clip_edge_path(&path, &start, &Terminal::free(), &[], 10.0).unwrap();
        // Crossing at (10, 0) is 1 unit away, within 2 x stroke width.
        assert!(fragments[0].start().distance(pt(10.0, 0.0)) < 1e-6);
    }

    #[test]
    fn arrow_reservation_shortens_both_ends() {
        let path = horizontal_edge();
        let start = Terminal::free().with_arrow(4.0);
        let end = Terminal::free().with_arrow(9.0);
        let fragments = clip_edge_path(&path, &start, &end, &[], 10.0).unwrap();
        assert_eq!(fragments.len(), 1);
        // Reservation is height + 1 unit of stroke allowance.
        assert!(fragments[0].start().distance(pt(5.0, 0.0)) < 1e-6);
        assert!(fragments[0].end_point().distance(pt(90.0, 0.0)) < 1e-6);
    }

    #[test]
    fn crossing_carves_centered_gap() {
        let path = horizontal_edge();
        let fragments = clip_edge_path(
            &path,
            &Terminal::free(),
            &Terminal::free(),
            &[pt(50.0, 0.0)],
            10.0,
        )
        .unwrap();
        assert_eq!(fragments.len(), 2);
        assert!(fragments[0].end_point().distance(pt(45.0, 0.0)) < 1e-6);
        assert!(fragments[1].start().distance(pt(55.0, 0.0)) < 1e-6);
        assert!(fragments[1].end_point().distance(pt(100.0, 0.0)) < 1e-6);
    }

    #[test]
    fn crossing_near_reservation_zone_is_ignored() {
        let path = horizontal_edge();
        let fragments = clip_edge_path(
            &path,
            &Terminal::free(),
            &Terminal::free(),
            &[pt(3.0, 0.0), pt(99.0, 0.0)],
            10.0,
        )
        .unwrap();
        assert_eq!(fragments.len(), 1);
        assert!((fragments[0].total_length() - 100.0).abs() < 1e-6);
    }

    #[test]
    fn adjacent_crossings_merge_into_one_gap() {
        let path = horizontal_edge();
        let fragments = clip_edge_path(
            &path,
            &Terminal::free(),
            &Terminal::free(),
            &[pt(50.0, 0.0), pt(54.0, 0.0)],
            10.0,
        )
        .unwrap();
        assert_eq!(fragments.len(), 2);
        assert!(fragments[0].end_point().distance(pt(45.0, 0.0)) < 1e-6);
        assert!(fragments[1].start().distance(pt(59.0, 0.0)) < 1e-6);
    }

    #[test]
    fn fully_consumed_path_yields_no_fragments() {
        let path = Path::polyline(&[pt(0.0, 0.0), pt(8.0, 0.0)]).unwrap();
        let start = Terminal::free().with_arrow(4.0);
        let end = Terminal::free().with_arrow(4.0);
        let fragments = clip_edge_path(&path, &start, &end, &[], 10.0).unwrap();
        assert!(fragments.is_empty());
    }

    #[test]
    fn overlapping_boundaries_keep_anchors() {
        // The two shapes overlap so far that the start clip lands beyond
        // the end clip; the inverted stations abandon boundary clipping.
        let path = horizontal_edge();
        let start = Terminal::clipped(rect(pt(-10.0, -10.0), pt(90.0, 10.0)));
        let end = Terminal::clipped(rect(pt(10.0, -10.0), pt(110.0, 10.0)));
        let fragments = clip_edge_path(&path, &start, &end, &[], 10.0).unwrap();
        assert_eq!(fragments.len(), 1);
        assert!((fragments[0].total_length() - 100.0).abs() < 1e-6);
    }

    #[test]
    fn curved_edge_clips_by_arc_length() {
        // Quadratic arch; reservation is measured along the curve, not
        // the chord.
        let path = Path::builder(pt(0.0, 0.0))
            .quad_to(pt(50.0, 80.0), pt(100.0, 0.0))
            .build()
            .unwrap();
        let total = path.total_length();
        let end = Terminal::free().with_arrow(9.0);
        let fragments = clip_edge_path(&path, &Terminal::free(), &end, &[], 10.0).unwrap();
        assert_eq!(fragments.len(), 1);
        assert!((fragments[0].total_length() - (total - 10.0)).abs() < total * 1e-3);
    }
}
