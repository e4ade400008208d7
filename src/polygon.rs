use geo::{Area, BooleanOps, Coord, LineString, MultiLineString, MultiPolygon, Polygon};
use nalgebra::Point3;

use crate::geometry::point_line_distance;

/// Tolerance for endpoint matching and vertex snapping, in grid length
/// units.
pub const DEFAULT_TOL: f64 = 1e-6;

/// Z value assigned to vertices created by `clip_polyline_by_polygon`.
///
/// Existing polyline vertices keep their own z; only clip points need a
/// policy, selected by caller intent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClipZPolicy {
    /// Linear interpolation along the original polyline segment.
    InterpolateFromLine,
    /// A very large sentinel value marking the vertex as synthetic.
    HugeValue,
    /// Plain zero.
    Zero,
}

pub const HUGE_Z: f64 = 1e30;

fn to_geo_polygon(vertices: &[Point3<f64>]) -> Polygon<f64> {
    let coords: Vec<Coord<f64>> = vertices.iter().map(|p| Coord { x: p.x, y: p.y }).collect();
    Polygon::new(LineString::from(coords), vec![])
}

/// Carry z values through a 2D boolean result: a vertex coinciding in xy
/// with an input vertex keeps that vertex's z, newly created intersection
/// vertices get z = 0.
fn restore_z(c: &Coord<f64>, sources: &[&[Point3<f64>]]) -> f64 {
    for source in sources {
        for p in *source {
            let dx = p.x - c.x;
            let dy = p.y - c.y;
            if dx * dx + dy * dy < DEFAULT_TOL * DEFAULT_TOL {
                return p.z;
            }
        }
    }
    0.0
}

fn from_geo_multi(result: &MultiPolygon<f64>, sources: &[&[Point3<f64>]]) -> Vec<Vec<Point3<f64>>> {
    let mut polygons = Vec::new();
    for poly in result {
        let ring = poly.exterior();
        if ring.0.len() < 4 {
            continue;
        }
        // the geo ring repeats the first coordinate at the end
        let verts: Vec<Point3<f64>> = ring.0[..ring.0.len() - 1]
            .iter()
            .map(|c| Point3::new(c.x, c.y, restore_z(c, sources)))
            .collect();
        if verts.len() >= 3 {
            polygons.push(verts);
        }
    }
    polygons
}

/// Intersection of two simple polygons, compared in xy only.
///
/// Multi-polygon results are possible for non-convex inputs.
pub fn polygon_intersection(a: &[Point3<f64>], b: &[Point3<f64>]) -> Vec<Vec<Point3<f64>>> {
    if a.len() < 3 || b.len() < 3 {
        return Vec::new();
    }
    let result = to_geo_polygon(a).intersection(&to_geo_polygon(b));
    from_geo_multi(&result, &[a, b])
}

/// `a` minus `b`, compared in xy only. Subtraction can split `a` into
/// disjoint pieces.
pub fn polygon_subtraction(a: &[Point3<f64>], b: &[Point3<f64>]) -> Vec<Vec<Point3<f64>>> {
    if a.len() < 3 {
        return Vec::new();
    }
    if b.len() < 3 {
        return vec![a.to_vec()];
    }
    let result = to_geo_polygon(a).difference(&to_geo_polygon(b));
    from_geo_multi(&result, &[a, b])
}

/// Union a set of potentially overlapping polygons into their outer
/// boundary. When the inputs are disjoint the largest piece is returned.
pub fn union_of_polygons(polygons: &[Vec<Point3<f64>>]) -> Vec<Point3<f64>> {
    let mut acc: Option<MultiPolygon<f64>> = None;
    for poly in polygons {
        if poly.len() < 3 {
            continue;
        }
        let gp = MultiPolygon::new(vec![to_geo_polygon(poly)]);
        acc = Some(match acc {
            Some(current) => current.union(&gp),
            None => gp,
        });
    }
    let Some(result) = acc else {
        return Vec::new();
    };
    let sources: Vec<&[Point3<f64>]> = polygons.iter().map(|p| p.as_slice()).collect();
    let mut pieces = from_geo_multi(&result, &sources);
    pieces.sort_by(|a, b| {
        let area_a = crate::geometry::polygon_area(a);
        let area_b = crate::geometry::polygon_area(b);
        area_b.partial_cmp(&area_a).unwrap_or(std::cmp::Ordering::Equal)
    });
    pieces.into_iter().next().unwrap_or_default()
}

/// Total unsigned area of a polygon, xy projection.
pub fn polygon_area_2d(polygon: &[Point3<f64>]) -> f64 {
    if polygon.len() < 3 {
        return 0.0;
    }
    to_geo_polygon(polygon).unsigned_area()
}

/// Ramer-Douglas-Peucker polyline simplification.
///
/// Recursive: the vertex farthest from the chord between the endpoints
/// splits the span when its perpendicular distance exceeds `epsilon`,
/// otherwise the whole span collapses to its endpoints. Spans shorter
/// than 3 vertices are returned as-is.
pub fn simplify_polyline(points: &[Point3<f64>], epsilon: f64) -> Vec<Point3<f64>> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let first = &points[0];
    let last = &points[points.len() - 1];

    let mut max_dist = 0.0;
    let mut max_idx = 0;
    for (i, p) in points.iter().enumerate().skip(1).take(points.len() - 2) {
        let d = point_line_distance(first, last, p);
        if d > max_dist {
            max_dist = d;
            max_idx = i;
        }
    }

    if max_dist > epsilon {
        let mut left = simplify_polyline(&points[..=max_idx], epsilon);
        let right = simplify_polyline(&points[max_idx..], epsilon);
        left.pop(); // joint vertex is duplicated
        left.extend(right);
        left
    } else {
        vec![*first, *last]
    }
}

/// Chain unordered line segments into polygons.
///
/// Greedy: the open polygon is extended by any remaining segment with an
/// endpoint within `tolerance` of the trailing vertex; when none matches,
/// a new polygon is started. Zero-length segments are discarded up front,
/// so degenerate contributions from edges lying exactly on a cut plane
/// vanish here. Disjoint intersection loops come out as separate
/// polygons.
pub fn create_polygon_from_line_segments(
    segments: &[[Point3<f64>; 2]],
    tolerance: f64,
) -> Vec<Vec<Point3<f64>>> {
    let tol_sq = tolerance * tolerance;
    let mut remaining: Vec<[Point3<f64>; 2]> = segments
        .iter()
        .filter(|s| (s[1] - s[0]).norm_squared() > tol_sq)
        .cloned()
        .collect();

    let mut polygons: Vec<Vec<Point3<f64>>> = Vec::new();
    while let Some(seed) = remaining.pop() {
        let mut polygon = vec![seed[0], seed[1]];
        loop {
            let tail = polygon[polygon.len() - 1];
            let mut extended = false;
            for i in 0..remaining.len() {
                let seg = remaining[i];
                let next = if (seg[0] - tail).norm_squared() < tol_sq {
                    Some(seg[1])
                } else if (seg[1] - tail).norm_squared() < tol_sq {
                    Some(seg[0])
                } else {
                    None
                };
                if let Some(p) = next {
                    remaining.swap_remove(i);
                    polygon.push(p);
                    extended = true;
                    break;
                }
            }
            if !extended {
                break;
            }
        }
        // drop the closing vertex when the chain returned to its start
        if polygon.len() > 2 {
            let first = polygon[0];
            let last = polygon[polygon.len() - 1];
            if (last - first).norm_squared() < tol_sq {
                polygon.pop();
            }
        }
        polygons.push(polygon);
    }
    polygons
}

/// Winding-number point-in-polygon test, xy only. Boundary points count
/// as inside.
pub fn point_inside_polygon_2d(p: &Point3<f64>, polygon: &[Point3<f64>]) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let mut winding = 0i32;
    for i in 0..polygon.len() {
        let a = &polygon[i];
        let b = &polygon[(i + 1) % polygon.len()];
        if a.y <= p.y {
            if b.y > p.y && is_left(a, b, p) > 0.0 {
                winding += 1;
            }
        } else if b.y <= p.y && is_left(a, b, p) < 0.0 {
            winding -= 1;
        }
    }
    winding != 0
}

#[inline]
fn is_left(a: &Point3<f64>, b: &Point3<f64>, p: &Point3<f64>) -> f64 {
    (b.x - a.x) * (p.y - a.y) - (p.x - a.x) * (b.y - a.y)
}

/// Intersection of two 2D line segments, Paul Bourke's formulation.
///
/// Returns the intersection point with z interpolated along the first
/// segment; `None` for parallel segments or crossings outside either
/// segment.
pub fn line_line_intersection_2d(
    a1: &Point3<f64>,
    a2: &Point3<f64>,
    b1: &Point3<f64>,
    b2: &Point3<f64>,
    epsilon: f64,
) -> Option<Point3<f64>> {
    let denom = (b2.y - b1.y) * (a2.x - a1.x) - (b2.x - b1.x) * (a2.y - a1.y);
    let num_a = (b2.x - b1.x) * (a1.y - b1.y) - (b2.y - b1.y) * (a1.x - b1.x);
    let num_b = (a2.x - a1.x) * (a1.y - b1.y) - (a2.y - a1.y) * (a1.x - b1.x);
    if denom.abs() < epsilon {
        return None;
    }
    let ua = num_a / denom;
    let ub = num_b / denom;
    if !(0.0..=1.0).contains(&ua) || !(0.0..=1.0).contains(&ub) {
        return None;
    }
    Some(Point3::new(
        a1.x + ua * (a2.x - a1.x),
        a1.y + ua * (a2.y - a1.y),
        a1.z + ua * (a2.z - a1.z),
    ))
}

/// Whether the segment `a`-`b` crosses any polygon edge, xy only.
pub fn line_intersects_polygon_2d(
    a: &Point3<f64>,
    b: &Point3<f64>,
    polygon: &[Point3<f64>],
) -> bool {
    for i in 0..polygon.len() {
        let e1 = &polygon[i];
        let e2 = &polygon[(i + 1) % polygon.len()];
        if line_line_intersection_2d(a, b, e1, e2, DEFAULT_TOL).is_some() {
            return true;
        }
    }
    false
}

/// Offset polygon vertices lying on the polyline by a tiny xy nudge so
/// clip points never land exactly on a polygon vertex.
fn nudge_polygon_off_polyline(
    polygon: &[Point3<f64>],
    polyline: &[Point3<f64>],
) -> Vec<Point3<f64>> {
    let mut adjusted = polygon.to_vec();
    for v in &mut adjusted {
        for w in polyline.windows(2) {
            let d = point_line_distance(&w[0], &w[1], v);
            if d < DEFAULT_TOL {
                v.x += 1.5 * DEFAULT_TOL;
                v.y += 1.5 * DEFAULT_TOL;
                break;
            }
        }
    }
    adjusted
}

/// Clip an open polyline against a polygon (xy), keeping the parts
/// inside. Vertices introduced at the polygon boundary receive their z
/// per `z_policy`.
pub fn clip_polyline_by_polygon(
    polyline: &[Point3<f64>],
    polygon: &[Point3<f64>],
    z_policy: ClipZPolicy,
) -> Vec<Vec<Point3<f64>>> {
    if polyline.len() < 2 || polygon.len() < 3 {
        return Vec::new();
    }
    let adjusted = nudge_polygon_off_polyline(polygon, polyline);
    let clip_poly = to_geo_polygon(&adjusted);
    let line: LineString<f64> = polyline.iter().map(|p| Coord { x: p.x, y: p.y }).collect();
    let clipped = clip_poly.clip(&MultiLineString::new(vec![line]), false);

    let mut result = Vec::new();
    for ls in &clipped {
        if ls.0.len() < 2 {
            continue;
        }
        let piece: Vec<Point3<f64>> = ls
            .0
            .iter()
            .map(|c| Point3::new(c.x, c.y, clip_point_z(c, polyline, z_policy)))
            .collect();
        result.push(piece);
    }
    result
}

fn clip_point_z(c: &Coord<f64>, polyline: &[Point3<f64>], z_policy: ClipZPolicy) -> f64 {
    // original polyline vertices keep their own z
    for p in polyline {
        let dx = p.x - c.x;
        let dy = p.y - c.y;
        if dx * dx + dy * dy < DEFAULT_TOL * DEFAULT_TOL {
            return p.z;
        }
    }
    match z_policy {
        ClipZPolicy::Zero => 0.0,
        ClipZPolicy::HugeValue => HUGE_Z,
        ClipZPolicy::InterpolateFromLine => {
            for w in polyline.windows(2) {
                let (a, b) = (&w[0], &w[1]);
                let seg_x = b.x - a.x;
                let seg_y = b.y - a.y;
                let len_sq = seg_x * seg_x + seg_y * seg_y;
                if len_sq == 0.0 {
                    continue;
                }
                let t = ((c.x - a.x) * seg_x + (c.y - a.y) * seg_y) / len_sq;
                if !(-DEFAULT_TOL..=1.0 + DEFAULT_TOL).contains(&t) {
                    continue;
                }
                let px = a.x + t * seg_x;
                let py = a.y + t * seg_y;
                let dx = px - c.x;
                let dy = py - c.y;
                if dx * dx + dy * dy < DEFAULT_TOL * DEFAULT_TOL {
                    return a.z + t * (b.z - a.z);
                }
            }
            0.0
        }
    }
}

/// Area-weighted extent of a polygon along the local x axis.
///
/// The polygon is cut into horizontal bands at every distinct vertex y;
/// each band contributes its x extent weighted by its area. Used for
/// effective flow-length estimates over irregular overlap footprints.
pub fn polygon_length_in_x_weighted_by_area(polygon: &[Point3<f64>]) -> f64 {
    if polygon.len() < 3 {
        return 0.0;
    }
    let mut ys: Vec<f64> = polygon.iter().map(|p| p.y).collect();
    ys.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    ys.dedup_by(|a, b| (*a - *b).abs() < DEFAULT_TOL);

    let x_min = polygon.iter().map(|p| p.x).fold(f64::MAX, f64::min) - 1.0;
    let x_max = polygon.iter().map(|p| p.x).fold(f64::MIN, f64::max) + 1.0;

    let mut weighted_sum = 0.0;
    let mut area_sum = 0.0;
    for band in ys.windows(2) {
        let (y0, y1) = (band[0], band[1]);
        if y1 - y0 < DEFAULT_TOL {
            continue;
        }
        let strip = [
            Point3::new(x_min, y0, 0.0),
            Point3::new(x_max, y0, 0.0),
            Point3::new(x_max, y1, 0.0),
            Point3::new(x_min, y1, 0.0),
        ];
        for piece in polygon_intersection(polygon, &strip) {
            let area = polygon_area_2d(&piece);
            if area <= 0.0 {
                continue;
            }
            let px_min = piece.iter().map(|p| p.x).fold(f64::MAX, f64::min);
            let px_max = piece.iter().map(|p| p.x).fold(f64::MIN, f64::max);
            weighted_sum += area * (px_max - px_min);
            area_sum += area;
        }
    }
    if area_sum > 0.0 {
        weighted_sum / area_sum
    } else {
        0.0
    }
}
