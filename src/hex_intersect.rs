use nalgebra::Point3;

use crate::bounding_box::BoundingBox;
use crate::cell::ALL_FACES;
use crate::geometry::{best_fit_quad_plane, Plane};
use crate::grid::MainGrid;
use crate::polygon::create_polygon_from_line_segments;

const INTERSECT_TOL: f64 = 1e-8;

/// The 12 edges of a hexahedron as corner-index pairs: shallow quad,
/// deep quad, then the 4 vertical edges.
pub const HEX_EDGES: [(usize, usize); 12] = [
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 0),
    (4, 5),
    (5, 6),
    (6, 7),
    (7, 4),
    (0, 4),
    (1, 5),
    (2, 6),
    (3, 7),
];

/// Intersection vertex carrying interpolation weights over the cell's 8
/// corners, for attaching per-corner scalar results to generated
/// geometry.
#[derive(Clone, Copy, Debug)]
pub struct CornerWeightedVertex {
    pub point: Point3<f64>,
    pub weights: [f64; 8],
}

impl CornerWeightedVertex {
    fn on_edge(corners: &[Point3<f64>; 8], c0: usize, c1: usize, t: f64) -> Self {
        let point = corners[c0] + (corners[c1] - corners[c0]) * t;
        let mut weights = [0.0; 8];
        weights[c0] = 1.0 - t;
        weights[c1] = t;
        Self { point, weights }
    }

    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        let point = a.point + (b.point - a.point) * t;
        let weights = std::array::from_fn(|i| a.weights[i] + (b.weights[i] - a.weights[i]) * t);
        Self { point, weights }
    }
}

/// Whether any of the 12 edges straddles (or touches) the plane.
pub fn is_hex_intersected_by_plane(corners: &[Point3<f64>; 8], plane: &Plane) -> bool {
    let dist: [f64; 8] = std::array::from_fn(|i| plane.distance_scaled(&corners[i]));
    let mut any_pos = false;
    let mut any_neg = false;
    for d in dist {
        if d >= 0.0 {
            any_pos = true;
        }
        if d <= 0.0 {
            any_neg = true;
        }
    }
    any_pos && any_neg
}

/// Per-edge plane crossings, one weighted vertex per straddling edge.
/// Entry n corresponds to `HEX_EDGES[n]`; `None` when that edge does not
/// cross.
fn edge_plane_crossings(
    corners: &[Point3<f64>; 8],
    plane: &Plane,
) -> [Option<CornerWeightedVertex>; 12] {
    let dist: [f64; 8] = std::array::from_fn(|i| plane.distance_scaled(&corners[i]));
    std::array::from_fn(|n| {
        let (c0, c1) = HEX_EDGES[n];
        let (d0, d1) = (dist[c0], dist[c1]);
        if (d0 > 0.0 && d1 > 0.0) || (d0 < 0.0 && d1 < 0.0) {
            return None;
        }
        let denom = d0 - d1;
        if denom.abs() < INTERSECT_TOL {
            // edge lies in the plane; both endpoints are picked up by the
            // neighboring edges, the degenerate contribution is dropped
            return None;
        }
        let t = (d0 / denom).clamp(0.0, 1.0);
        Some(CornerWeightedVertex::on_edge(corners, c0, c1, t))
    })
}

fn edge_slot(c0: usize, c1: usize) -> usize {
    for (n, &(a, b)) in HEX_EDGES.iter().enumerate() {
        if (a, b) == (c0, c1) || (b, a) == (c0, c1) {
            return n;
        }
    }
    unreachable!("not a hexahedron edge");
}

/// Intersection line segments of a plane with a hexahedron, one segment
/// per face that the plane crosses. Empty when no edge straddles.
pub fn plane_hex_intersection(
    corners: &[Point3<f64>; 8],
    plane: &Plane,
) -> Vec<[CornerWeightedVertex; 2]> {
    let crossings = edge_plane_crossings(corners, plane);
    let mut segments = Vec::new();
    for face in ALL_FACES {
        let idx = face.corner_indices();
        let mut hits: Vec<CornerWeightedVertex> = Vec::with_capacity(2);
        for n in 0..4 {
            let slot = edge_slot(idx[n], idx[(n + 1) % 4]);
            if let Some(v) = crossings[slot] {
                hits.push(v);
            }
        }
        if hits.len() >= 2 {
            segments.push([hits[0], hits[1]]);
        }
    }
    segments
}

/// Closed intersection polygons between a plane and a hexahedron.
///
/// Face segments are chained into loops; multiple loops are possible for
/// concave-ish warped cells. Empty for non-intersecting or degenerate
/// cells.
pub fn plane_hex_intersection_polygons(
    corners: &[Point3<f64>; 8],
    plane: &Plane,
    tolerance: f64,
) -> Vec<Vec<Point3<f64>>> {
    let segments: Vec<[Point3<f64>; 2]> = plane_hex_intersection(corners, plane)
        .iter()
        .map(|s| [s[0].point, s[1].point])
        .collect();
    create_polygon_from_line_segments(&segments, tolerance)
        .into_iter()
        .filter(|p| p.len() >= 3)
        .collect()
}

/// Weighted variant of the polygon assembly, for geometry that carries
/// corner interpolation weights through to the triangulated output.
pub fn plane_hex_intersection_polygons_weighted(
    corners: &[Point3<f64>; 8],
    plane: &Plane,
    tolerance: f64,
) -> Vec<Vec<CornerWeightedVertex>> {
    let tol_sq = tolerance * tolerance;
    let mut remaining = plane_hex_intersection(corners, plane);
    remaining.retain(|s| (s[1].point - s[0].point).norm_squared() > tol_sq);

    let mut polygons: Vec<Vec<CornerWeightedVertex>> = Vec::new();
    while let Some(seed) = remaining.pop() {
        let mut polygon = vec![seed[0], seed[1]];
        loop {
            let tail = polygon[polygon.len() - 1].point;
            let mut extended = false;
            for i in 0..remaining.len() {
                let seg = remaining[i];
                let next = if (seg[0].point - tail).norm_squared() < tol_sq {
                    Some(seg[1])
                } else if (seg[1].point - tail).norm_squared() < tol_sq {
                    Some(seg[0])
                } else {
                    None
                };
                if let Some(v) = next {
                    remaining.swap_remove(i);
                    polygon.push(v);
                    extended = true;
                    break;
                }
            }
            if !extended {
                break;
            }
        }
        if polygon.len() > 2
            && (polygon[polygon.len() - 1].point - polygon[0].point).norm_squared() < tol_sq
        {
            polygon.pop();
        }
        if polygon.len() >= 3 {
            polygons.push(polygon);
        }
    }
    polygons
}

/// Clip the finite segment `p1`-`p2` against the hexahedron's 6 best-fit
/// face planes, slab style. Returns the (up to 2) entry and exit points
/// ordered along the segment direction; empty when the segment misses
/// the cell. Collapsed faces are skipped, so heavily degenerate cells
/// degrade to fewer clip planes instead of failing.
pub fn line_hex_intersection(
    p1: &Point3<f64>,
    p2: &Point3<f64>,
    corners: &[Point3<f64>; 8],
) -> Vec<Point3<f64>> {
    let mut t_enter = 0.0f64;
    let mut t_exit = 1.0f64;
    let dir = p2 - p1;
    let mut valid_planes = 0usize;

    for face in ALL_FACES {
        let idx = face.corner_indices();
        let quad: [Point3<f64>; 4] = std::array::from_fn(|n| corners[idx[n]]);
        let Some(plane) = best_fit_quad_plane(&quad) else {
            continue;
        };
        valid_planes += 1;
        // corner_indices orders the quad with an outward normal
        let d1 = plane.distance_scaled(p1);
        let denom = plane.normal.dot(&dir);
        if denom.abs() < INTERSECT_TOL {
            if d1 > 0.0 {
                return Vec::new();
            }
            continue;
        }
        let t = -d1 / denom;
        if denom < 0.0 {
            t_enter = t_enter.max(t);
        } else {
            t_exit = t_exit.min(t);
        }
        if t_enter > t_exit {
            return Vec::new();
        }
    }

    // fewer than 3 bounding planes cannot enclose a volume
    if valid_planes < 3 {
        return Vec::new();
    }

    let mut points = Vec::with_capacity(2);
    points.push(p1 + dir * t_enter);
    if t_exit > t_enter {
        points.push(p1 + dir * t_exit);
    }
    points
}

/// Clip a weighted polygon to the slab between two planes, keeping the
/// side each plane's normal points away from. Sutherland-Hodgman per
/// plane, weights interpolated at the cuts.
pub fn clip_polygon_between_planes(
    polygon: &[CornerWeightedVertex],
    plane1: &Plane,
    plane2: &Plane,
) -> Vec<CornerWeightedVertex> {
    let first = clip_polygon_by_plane(polygon, plane1);
    clip_polygon_by_plane(&first, plane2)
}

fn clip_polygon_by_plane(
    polygon: &[CornerWeightedVertex],
    plane: &Plane,
) -> Vec<CornerWeightedVertex> {
    if polygon.len() < 3 {
        return Vec::new();
    }
    let mut result = Vec::with_capacity(polygon.len() + 2);
    for i in 0..polygon.len() {
        let a = &polygon[i];
        let b = &polygon[(i + 1) % polygon.len()];
        let da = plane.distance_scaled(&a.point);
        let db = plane.distance_scaled(&b.point);
        let a_in = da <= 0.0;
        let b_in = db <= 0.0;
        if a_in {
            result.push(*a);
        }
        if a_in != b_in {
            let t = da / (da - db);
            result.push(CornerWeightedVertex::lerp(a, b, t));
        }
    }
    if result.len() >= 3 {
        result
    } else {
        Vec::new()
    }
}

/// Intersection polygons of a plane with every candidate cell inside
/// `search_box`. Returns `(reservoir cell index, polygons)` per cell the
/// plane actually cuts.
pub fn grid_plane_intersection_polygons(
    grid: &MainGrid,
    plane: &Plane,
    search_box: &BoundingBox,
    tolerance: f64,
) -> Vec<(usize, Vec<Vec<Point3<f64>>>)> {
    let mut result = Vec::new();
    for cell_index in grid.find_intersecting_cells(search_box) {
        let Ok(corners) = grid.cell_corners(cell_index) else {
            continue;
        };
        if !is_hex_intersected_by_plane(&corners, plane) {
            continue;
        }
        let polygons = plane_hex_intersection_polygons(&corners, plane, tolerance);
        if !polygons.is_empty() {
            result.push((cell_index, polygons));
        }
    }
    result
}
