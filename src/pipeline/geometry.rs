//! Minimal planar geometry for the AOI spatial join.
//!
//! Footprints and AOIs are simple polygons in a shared projected CRS; the
//! join only needs a boolean intersection test, so this works on outer rings
//! directly instead of pulling in a full geometry stack.

use serde_json::Value;

pub type Point = (f64, f64);
pub type Ring = Vec<Point>;

/// Outer rings of a GeoJSON `Polygon` or `MultiPolygon` geometry value.
/// Unsupported geometry types yield no rings.
pub fn outer_rings(geometry: &Value) -> Vec<Ring> {
    let kind = geometry.get("type").and_then(Value::as_str).unwrap_or("");
    let coordinates = match geometry.get("coordinates") {
        Some(c) => c,
        None => return Vec::new(),
    };

    match kind {
        "Polygon" => parse_ring(coordinates.get(0)).into_iter().collect(),
        "MultiPolygon" => coordinates
            .as_array()
            .map(|polygons| {
                polygons
                    .iter()
                    .filter_map(|polygon| parse_ring(polygon.get(0)))
                    .collect()
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

fn parse_ring(ring: Option<&Value>) -> Option<Ring> {
    let positions = ring?.as_array()?;
    let parsed: Ring = positions
        .iter()
        .filter_map(|position| {
            let coords = position.as_array()?;
            Some((coords.first()?.as_f64()?, coords.get(1)?.as_f64()?))
        })
        .collect();
    (parsed.len() >= 3).then_some(parsed)
}

fn bbox(ring: &Ring) -> (f64, f64, f64, f64) {
    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for &(x, y) in ring {
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }
    (min_x, min_y, max_x, max_y)
}

fn bboxes_overlap(a: &Ring, b: &Ring) -> bool {
    let (ax0, ay0, ax1, ay1) = bbox(a);
    let (bx0, by0, bx1, by1) = bbox(b);
    ax0 <= bx1 && bx0 <= ax1 && ay0 <= by1 && by0 <= ay1
}

fn orientation(p: Point, q: Point, r: Point) -> f64 {
    (q.0 - p.0) * (r.1 - p.1) - (q.1 - p.1) * (r.0 - p.0)
}

fn on_segment(p: Point, q: Point, r: Point) -> bool {
    r.0 >= p.0.min(q.0) && r.0 <= p.0.max(q.0) && r.1 >= p.1.min(q.1) && r.1 <= p.1.max(q.1)
}

fn segments_intersect(p1: Point, p2: Point, q1: Point, q2: Point) -> bool {
    let o1 = orientation(p1, p2, q1);
    let o2 = orientation(p1, p2, q2);
    let o3 = orientation(q1, q2, p1);
    let o4 = orientation(q1, q2, p2);

    if (o1 > 0.0) != (o2 > 0.0) && (o3 > 0.0) != (o4 > 0.0) && o1 != 0.0 && o2 != 0.0 {
        return true;
    }

    // Collinear touches count as intersection.
    (o1 == 0.0 && on_segment(p1, p2, q1))
        || (o2 == 0.0 && on_segment(p1, p2, q2))
        || (o3 == 0.0 && on_segment(q1, q2, p1))
        || (o4 == 0.0 && on_segment(q1, q2, p2))
}

/// Ray-casting point-in-polygon test on a single ring.
pub fn point_in_ring(point: Point, ring: &Ring) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = ring[i];
        let (xj, yj) = ring[j];
        if (yi > point.1) != (yj > point.1)
            && point.0 < (xj - xi) * (point.1 - yi) / (yj - yi) + xi
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Whether two simple polygon rings intersect (touch, cross, or contain).
pub fn rings_intersect(a: &Ring, b: &Ring) -> bool {
    if a.len() < 3 || b.len() < 3 || !bboxes_overlap(a, b) {
        return false;
    }

    for i in 0..a.len() {
        let a1 = a[i];
        let a2 = a[(i + 1) % a.len()];
        for j in 0..b.len() {
            let b1 = b[j];
            let b2 = b[(j + 1) % b.len()];
            if segments_intersect(a1, a2, b1, b2) {
                return true;
            }
        }
    }

    // No edge crossings: one may still fully contain the other.
    point_in_ring(a[0], b) || point_in_ring(b[0], a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Ring {
        vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1), (x0, y0)]
    }

    #[test]
    fn overlapping_squares_intersect() {
        assert!(rings_intersect(
            &square(0.0, 0.0, 2.0, 2.0),
            &square(1.0, 1.0, 3.0, 3.0)
        ));
    }

    #[test]
    fn disjoint_squares_do_not_intersect() {
        assert!(!rings_intersect(
            &square(0.0, 0.0, 1.0, 1.0),
            &square(5.0, 5.0, 6.0, 6.0)
        ));
    }

    #[test]
    fn contained_square_intersects() {
        assert!(rings_intersect(
            &square(0.0, 0.0, 10.0, 10.0),
            &square(4.0, 4.0, 5.0, 5.0)
        ));
        assert!(rings_intersect(
            &square(4.0, 4.0, 5.0, 5.0),
            &square(0.0, 0.0, 10.0, 10.0)
        ));
    }

    #[test]
    fn edge_touching_squares_intersect() {
        assert!(rings_intersect(
            &square(0.0, 0.0, 1.0, 1.0),
            &square(1.0, 0.0, 2.0, 1.0)
        ));
    }

    #[test]
    fn outer_rings_handles_polygon_and_multipolygon() {
        let polygon = json!({
            "type": "Polygon",
            "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]
        });
        assert_eq!(outer_rings(&polygon).len(), 1);

        let multi = json!({
            "type": "MultiPolygon",
            "coordinates": [
                [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]],
                [[[5.0, 5.0], [6.0, 5.0], [6.0, 6.0], [5.0, 5.0]]]
            ]
        });
        assert_eq!(outer_rings(&multi).len(), 2);

        let point = json!({ "type": "Point", "coordinates": [0.0, 0.0] });
        assert!(outer_rings(&point).is_empty());
    }
}
