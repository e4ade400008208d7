use nalgebra::{Point3, Vector3};

use crate::cell::{FaceType, ALL_FACES};
use crate::geometry::best_fit_quad_plane;
use crate::grid::MainGrid;
use crate::polygon::{polygon_area_2d, polygon_intersection};

/// Areal overlap between the touching faces of two cells.
#[derive(Clone, Debug)]
pub struct CellFaceOverlap {
    /// Face of the first cell the overlap was found on.
    pub face: FaceType,
    /// Overlap polygon in world coordinates, lying on the first cell's
    /// face plane.
    pub polygon: Vec<Point3<f64>>,
}

/// Orthonormal frame spanning a face's best-fit plane, used to flatten
/// the quad pair for the 2D boolean kernel.
struct FacePlaneFrame {
    origin: Point3<f64>,
    u: Vector3<f64>,
    v: Vector3<f64>,
    w: Vector3<f64>,
}

impl FacePlaneFrame {
    fn from_quad(quad: &[Point3<f64>; 4]) -> Option<Self> {
        let plane = best_fit_quad_plane(quad)?;
        let w = plane.normal.normalize();
        let edge = quad[1] - quad[0];
        let u_raw = edge - w * edge.dot(&w);
        if u_raw.norm_squared() < f64::EPSILON {
            return None;
        }
        let u = u_raw.normalize();
        let v = w.cross(&u);
        Some(Self {
            origin: quad[0],
            u,
            v,
            w,
        })
    }

    fn project(&self, p: &Point3<f64>) -> Point3<f64> {
        let d = p - self.origin;
        Point3::new(d.dot(&self.u), d.dot(&self.v), d.dot(&self.w))
    }

    fn lift(&self, p: &Point3<f64>) -> Point3<f64> {
        self.origin + self.u * p.x + self.v * p.y + self.w * p.z
    }
}

/// Areal overlap between `cell_a` and `cell_b` across any of the 6 face
/// directions.
///
/// When both cells live in the same sub-grid, anything but a direct
/// (i, j, k) +-1 neighbor relation along exactly one axis is rejected up
/// front. Otherwise each face direction's quad pair is flattened into
/// the first quad's plane frame and intersected with the boolean kernel;
/// the first direction with overlap area above `tolerance` wins.
pub fn calculate_cell_face_overlap(
    grid: &MainGrid,
    cell_a: usize,
    cell_b: usize,
    tolerance: f64,
) -> Option<CellFaceOverlap> {
    let a = grid.cell(cell_a).ok()?;
    let b = grid.cell(cell_b).ok()?;

    if a.grid_index == b.grid_index {
        let (_, ia, ja, ka) = grid.grid_and_ijk(cell_a).ok()?;
        let (_, ib, jb, kb) = grid.grid_and_ijk(cell_b).ok()?;
        let delta = (
            ib as i64 - ia as i64,
            jb as i64 - ja as i64,
            kb as i64 - ka as i64,
        );
        // same-grid pairs must be direct neighbors, and the delta pins
        // down the touching face
        let face = ALL_FACES.into_iter().find(|f| f.neighbor_offset() == delta)?;
        let polygon = face_pair_overlap(grid, cell_a, face, cell_b, tolerance)?;
        return Some(CellFaceOverlap { face, polygon });
    }

    for face in ALL_FACES {
        if let Some(polygon) = face_pair_overlap(grid, cell_a, face, cell_b, tolerance) {
            return Some(CellFaceOverlap { face, polygon });
        }
    }
    None
}

/// Overlap polygon of `cell_a`'s `face` against `cell_b`'s opposite
/// face, or `None` when the overlap area is below `tolerance` or the
/// face is collapsed. No neighbor precheck; fault-driven NNC discovery
/// calls this for structurally non-adjacent pairs.
pub fn face_pair_overlap(
    grid: &MainGrid,
    cell_a: usize,
    face: FaceType,
    cell_b: usize,
    tolerance: f64,
) -> Option<Vec<Point3<f64>>> {
    let a = grid.cell(cell_a).ok()?;
    let b = grid.cell(cell_b).ok()?;
    let nodes = grid.nodes();
    let quad_a = a.face_corners(face, nodes);
    let quad_b = b.face_corners(face.opposite(), nodes);
    let frame = FacePlaneFrame::from_quad(&quad_a)?;
    let local_a: Vec<Point3<f64>> = quad_a.iter().map(|p| frame.project(p)).collect();
    let local_b: Vec<Point3<f64>> = quad_b.iter().map(|p| frame.project(p)).collect();

    // the faces must sit on the same surface; a pair that merely
    // shadows each other in projection has every corner far off the
    // reference plane
    let diag = (quad_a[2] - quad_a[0])
        .norm()
        .max((quad_a[3] - quad_a[1]).norm());
    let nearest = local_b
        .iter()
        .map(|p| p.z.abs())
        .fold(f64::INFINITY, f64::min);
    if nearest > 0.1 * diag {
        return None;
    }

    let pieces = polygon_intersection(&local_a, &local_b);
    let best = pieces.iter().max_by(|x, y| {
        polygon_area_2d(x)
            .partial_cmp(&polygon_area_2d(y))
            .unwrap_or(std::cmp::Ordering::Equal)
    })?;
    if polygon_area_2d(best) <= tolerance {
        return None;
    }
    Some(best.iter().map(|p| frame.lift(p)).collect())
}

/// Resolve a mixed index list into polygon coordinates: indices below the
/// shared-node count read the grid's node array, indices at or above it
/// read the supplied extra intersection points.
pub fn extract_polygon(
    nodes: &[Point3<f64>],
    index_list: &[usize],
    extra_points: &[Point3<f64>],
) -> Vec<Point3<f64>> {
    index_list
        .iter()
        .filter_map(|&idx| {
            if idx < nodes.len() {
                nodes.get(idx).copied()
            } else {
                extra_points.get(idx - nodes.len()).copied()
            }
        })
        .collect()
}

/// Express computed polygon vertices as a mixed index list: vertices
/// within `tolerance` of one of the candidate shared nodes reuse that
/// node's index, everything else is appended to `extra_points` and
/// addressed past the shared-node count.
pub fn polygon_to_index_list(
    polygon: &[Point3<f64>],
    candidate_nodes: &[usize],
    nodes: &[Point3<f64>],
    extra_points: &mut Vec<Point3<f64>>,
    tolerance: f64,
) -> Vec<usize> {
    let tol_sq = tolerance * tolerance;
    polygon
        .iter()
        .map(|p| {
            for &n in candidate_nodes {
                if (nodes[n] - p).norm_squared() < tol_sq {
                    return n;
                }
            }
            extra_points.push(*p);
            nodes.len() + extra_points.len() - 1
        })
        .collect()
}
