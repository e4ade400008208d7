use log::warn;
use nalgebra::{Point3, Vector3};
use serde::Serialize;

use crate::bounding_box::BoundingBox;
use crate::geometry::{best_fit_quad_plane, polygon_area_normal, tet_volume6};

/// Face identifiers of a hexahedral cell.
///
/// Corner numbering convention: corners 0-3 form the shallow (NEG_K) face,
/// corners 4-7 the deep (POS_K) face. Face-to-corner mapping and the
/// opposite-face relation are fixed lookup tables; the numbering is not
/// antipodal-symmetric, so neither can be derived arithmetically.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum FaceType {
    PosI,
    NegI,
    PosJ,
    NegJ,
    PosK,
    NegK,
}

pub const ALL_FACES: [FaceType; 6] = [
    FaceType::PosI,
    FaceType::NegI,
    FaceType::PosJ,
    FaceType::NegJ,
    FaceType::PosK,
    FaceType::NegK,
];

impl FaceType {
    /// Local corner indices of the 4 corners spanning this face,
    /// ordered so the face normal points out of the cell.
    pub fn corner_indices(self) -> [usize; 4] {
        match self {
            FaceType::PosI => [1, 2, 6, 5],
            FaceType::NegI => [0, 4, 7, 3],
            FaceType::PosJ => [3, 7, 6, 2],
            FaceType::NegJ => [0, 1, 5, 4],
            FaceType::PosK => [4, 5, 6, 7],
            FaceType::NegK => [0, 3, 2, 1],
        }
    }

    pub fn opposite(self) -> FaceType {
        match self {
            FaceType::PosI => FaceType::NegI,
            FaceType::NegI => FaceType::PosI,
            FaceType::PosJ => FaceType::NegJ,
            FaceType::NegJ => FaceType::PosJ,
            FaceType::PosK => FaceType::NegK,
            FaceType::NegK => FaceType::PosK,
        }
    }

    /// (di, dj, dk) offset of the structural neighbor behind this face.
    pub fn neighbor_offset(self) -> (i64, i64, i64) {
        match self {
            FaceType::PosI => (1, 0, 0),
            FaceType::NegI => (-1, 0, 0),
            FaceType::PosJ => (0, 1, 0),
            FaceType::NegJ => (0, -1, 0),
            FaceType::PosK => (0, 0, 1),
            FaceType::NegK => (0, 0, -1),
        }
    }

    /// Grid axis (0 = I, 1 = J, 2 = K) this face is perpendicular to.
    #[inline]
    pub fn axis(self) -> usize {
        match self {
            FaceType::PosI | FaceType::NegI => 0,
            FaceType::PosJ | FaceType::NegJ => 1,
            FaceType::PosK | FaceType::NegK => 2,
        }
    }

    #[inline]
    pub fn is_positive_direction(self) -> bool {
        matches!(self, FaceType::PosI | FaceType::PosJ | FaceType::PosK)
    }

    /// Stable slot in `ALL_FACES`, for table-indexed per-face storage.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            FaceType::PosI => 0,
            FaceType::NegI => 1,
            FaceType::PosJ => 2,
            FaceType::NegJ => 3,
            FaceType::PosK => 4,
            FaceType::NegK => 5,
        }
    }
}

/// One grid cell. The grid owns the node coordinates; the cell stores
/// indices into the shared node array.
#[derive(Clone, Debug)]
pub struct Cell {
    /// Indices into the owning grid's shared node array.
    pub corner_nodes: [usize; 8],
    /// Index of the sub-grid this cell belongs to (0 = root grid).
    pub grid_index: usize,
    /// For LGR cells, the global index of the coarse host cell.
    pub parent_cell_index: Option<usize>,
    /// Index of the refinement sub-grid replacing this cell, if any.
    pub refinement_grid_index: Option<usize>,
    /// Geometrically degenerate cells are marked invalid and skipped by
    /// spatial queries.
    pub invalid: bool,
}

impl Cell {
    pub fn new(corner_nodes: [usize; 8], grid_index: usize) -> Self {
        Self {
            corner_nodes,
            grid_index,
            parent_cell_index: None,
            refinement_grid_index: None,
            invalid: false,
        }
    }

    /// Resolve the 8 corner coordinates from the shared node array.
    pub fn corners(&self, nodes: &[Point3<f64>]) -> [Point3<f64>; 8] {
        std::array::from_fn(|i| nodes[self.corner_nodes[i]])
    }

    pub fn center(&self, nodes: &[Point3<f64>]) -> Point3<f64> {
        cell_centroid(&self.corners(nodes))
    }

    /// Node indices of a face's 4 corners.
    pub fn face_node_indices(&self, face: FaceType) -> [usize; 4] {
        let local = face.corner_indices();
        std::array::from_fn(|i| self.corner_nodes[local[i]])
    }

    /// Corner coordinates of a face.
    pub fn face_corners(&self, face: FaceType, nodes: &[Point3<f64>]) -> [Point3<f64>; 4] {
        let idx = self.face_node_indices(face);
        std::array::from_fn(|i| nodes[idx[i]])
    }

    pub fn bounding_box(&self, nodes: &[Point3<f64>]) -> BoundingBox {
        BoundingBox::from_points(&self.corners(nodes))
    }
}

#[inline]
pub fn cell_centroid(corners: &[Point3<f64>; 8]) -> Point3<f64> {
    let mut sum = Vector3::zeros();
    for c in corners {
        sum += c.coords;
    }
    Point3::from(sum / 8.0)
}

/// Hexahedron volume from 12 centroid-anchored tetrahedra.
///
/// Each of the 6 quad faces is split into 2 triangles, once along the
/// (0,2) diagonal and once along (1,3). The two decompositions are summed
/// independently and averaged, which reduces bias on warped faces. The
/// result is the absolute value, invariant under mirrored coordinate
/// frames.
pub fn cell_volume(corners: &[Point3<f64>; 8]) -> f64 {
    let centroid = cell_centroid(corners);
    let mut vol_a = 0.0;
    let mut vol_b = 0.0;
    for face in ALL_FACES {
        let [c0, c1, c2, c3] = face.corner_indices();
        let (p0, p1, p2, p3) = (&corners[c0], &corners[c1], &corners[c2], &corners[c3]);
        // diagonal (0,2)
        vol_a += tet_volume6(&centroid, p0, p1, p2);
        vol_a += tet_volume6(&centroid, p0, p2, p3);
        // diagonal (1,3)
        vol_b += tet_volume6(&centroid, p1, p2, p3);
        vol_b += tet_volume6(&centroid, p1, p3, p0);
    }
    (vol_a.abs() + vol_b.abs()) / 12.0
}

/// Count vertical-edge inversions of a cell.
///
/// Each of the 4 vertical edges connects shallow corner i to deep corner
/// i+4. The majority z-direction over the 4 edges defines the cell's
/// orientation; edges running the other way are counted as twisted.
/// Collapsed edges (zero height) never count.
///
/// Because the majority vote sets the reference direction, the count is
/// always 0..=2: a fully mirrored cell reports 0 and is handled by the
/// sign-aware tetrahedron tests downstream, not rejected here.
pub fn cell_twist_count(corners: &[Point3<f64>; 8]) -> usize {
    let dz: [f64; 4] = std::array::from_fn(|i| corners[i + 4].z - corners[i].z);
    let positive = dz.iter().filter(|v| **v > 0.0).count();
    let negative = dz.iter().filter(|v| **v < 0.0).count();
    positive.min(negative)
}

/// Where a point sits relative to one cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointCellPosition {
    Outside,
    Inside,
    /// Exactly on the given face (within tolerance). The grid applies the
    /// face-ownership rule so the point belongs to exactly one cell.
    OnFace(FaceType),
}

const FACE_HIT_TOL: f64 = 1e-6;

/// Classify `p` against the hexahedron `corners`.
///
/// Twisted cells return `Outside` with a logged warning; the tetrahedral
/// containment test is unreliable for them.
pub fn point_cell_position(corners: &[Point3<f64>; 8], p: &Point3<f64>) -> PointCellPosition {
    let mut bb = BoundingBox::from_points(corners);
    bb.expand(FACE_HIT_TOL);
    if !bb.contains(p) {
        return PointCellPosition::Outside;
    }

    if cell_twist_count(corners) > 0 {
        warn!("point containment rejected for twisted cell");
        return PointCellPosition::Outside;
    }

    let diag = bb.extent().norm().max(1.0);
    let face_tol = FACE_HIT_TOL * diag;

    for face in ALL_FACES {
        let idx = face.corner_indices();
        let quad: [Point3<f64>; 4] = std::array::from_fn(|i| corners[idx[i]]);
        if point_on_quad(&quad, p, face_tol) {
            return PointCellPosition::OnFace(face);
        }
    }

    if point_in_hex_tets(corners, p) {
        PointCellPosition::Inside
    } else {
        PointCellPosition::Outside
    }
}

/// Point-on-quad test: within `tol` of the best-fit plane and, projected
/// into the quad's plane, inside the (fan-triangulated) quad.
fn point_on_quad(quad: &[Point3<f64>; 4], p: &Point3<f64>, tol: f64) -> bool {
    let Some(plane) = best_fit_quad_plane(quad) else {
        return false;
    };
    let n = plane.normal.norm();
    if n == 0.0 {
        return false;
    }
    if plane.distance_scaled(p).abs() / n > tol {
        return false;
    }
    point_in_triangle(&quad[0], &quad[1], &quad[2], p, tol)
        || point_in_triangle(&quad[0], &quad[2], &quad[3], p, tol)
}

fn point_in_triangle(
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
    p: &Point3<f64>,
    tol: f64,
) -> bool {
    let n = (b - a).cross(&(c - a));
    let area2 = n.norm();
    if area2 == 0.0 {
        return false;
    }
    let s0 = (b - a).cross(&(p - a)).dot(&n);
    let s1 = (c - b).cross(&(p - b)).dot(&n);
    let s2 = (a - c).cross(&(p - c)).dot(&n);
    let slack = tol * area2;
    s0 >= -slack && s1 >= -slack && s2 >= -slack
}

/// Tetrahedral containment using both face-diagonal decompositions.
fn point_in_hex_tets(corners: &[Point3<f64>; 8], p: &Point3<f64>) -> bool {
    let centroid = cell_centroid(corners);
    for face in ALL_FACES {
        let [c0, c1, c2, c3] = face.corner_indices();
        let (p0, p1, p2, p3) = (&corners[c0], &corners[c1], &corners[c2], &corners[c3]);
        if point_in_tet(&centroid, p0, p1, p2, p)
            || point_in_tet(&centroid, p0, p2, p3, p)
            || point_in_tet(&centroid, p1, p2, p3, p)
            || point_in_tet(&centroid, p1, p3, p0, p)
        {
            return true;
        }
    }
    false
}

fn point_in_tet(
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
    d: &Point3<f64>,
    p: &Point3<f64>,
) -> bool {
    let v = tet_volume6(a, b, c, d);
    if v.abs() < f64::EPSILON {
        return false;
    }
    let s = v.signum();
    let tol = -1e-9 * v.abs();
    s * tet_volume6(p, b, c, d) >= tol
        && s * tet_volume6(a, p, c, d) >= tol
        && s * tet_volume6(a, b, p, d) >= tol
        && s * tet_volume6(a, b, c, p) >= tol
}

/// Area-weighted center of one face.
pub fn face_center(face_corners: &[Point3<f64>; 4]) -> Point3<f64> {
    let mut sum = Vector3::zeros();
    for c in face_corners {
        sum += c.coords;
    }
    Point3::from(sum / 4.0)
}

/// Outward face normal, length twice the face area.
pub fn face_normal(face_corners: &[Point3<f64>; 4]) -> Vector3<f64> {
    polygon_area_normal(face_corners)
}

/// Estimate the part of a hexahedron overlapping an axis-aligned box.
///
/// The x/y coordinates of every corner are clamped to the box; the z of
/// each clamped corner is re-derived by intersecting the vertical line
/// through it with the best-fit plane of the corresponding shallow or deep
/// quad, then clamped to the box's z range. Returns `None` when either
/// quad has fewer than 3 distinct corners.
pub fn estimate_hex_overlap_with_box(
    corners: &[Point3<f64>; 8],
    bbox: &BoundingBox,
) -> Option<([Point3<f64>; 8], BoundingBox)> {
    let shallow: [Point3<f64>; 4] = std::array::from_fn(|i| corners[i]);
    let deep: [Point3<f64>; 4] = std::array::from_fn(|i| corners[i + 4]);
    let shallow_plane = best_fit_quad_plane(&shallow)?;
    let deep_plane = best_fit_quad_plane(&deep)?;

    let mut overlap = *corners;
    for i in 0..8 {
        let plane = if i < 4 { &shallow_plane } else { &deep_plane };
        let mut p = corners[i];
        p.x = p.x.clamp(bbox.min.x, bbox.max.x);
        p.y = p.y.clamp(bbox.min.y, bbox.max.y);
        // vertical line through the clamped xy
        if plane.normal.z != 0.0 {
            let t = (plane.normal.dot(&(plane.point - p))) / plane.normal.z;
            p.z += t;
        }
        p.z = p.z.clamp(bbox.min.z, bbox.max.z);
        overlap[i] = p;
    }
    let overlap_bb = BoundingBox::from_points(&overlap);
    Some((overlap, overlap_bb))
}

#[cfg(test)]
mod tests {
    use super::*;

    pub fn unit_cube() -> [Point3<f64>; 8] {
        [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(1.0, 0.0, 1.0),
            Point3::new(1.0, 1.0, 1.0),
            Point3::new(0.0, 1.0, 1.0),
        ]
    }

    #[test]
    fn unit_cube_volume_is_one() {
        assert!((cell_volume(&unit_cube()) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn pos_i_face_center_and_normal_on_the_unit_cube() {
        let cube = unit_cube();
        let quad = [cube[1], cube[2], cube[6], cube[5]];
        let center = face_center(&quad);
        assert!((center - Point3::new(1.0, 0.5, 0.5)).norm() < 1e-12);
        let normal = face_normal(&quad);
        assert!(normal.x > 0.0);
        assert!(normal.y.abs() < 1e-12);
        assert!(normal.z.abs() < 1e-12);
        // length is twice the face area
        assert!((normal.norm() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn volume_invariant_under_mirroring() {
        let mut mirrored = unit_cube();
        for p in &mut mirrored {
            p.x = -p.x;
        }
        assert!((cell_volume(&mirrored) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn opposite_face_is_involution() {
        for face in ALL_FACES {
            assert_ne!(face.opposite(), face);
            assert_eq!(face.opposite().opposite(), face);
        }
    }

    #[test]
    fn twist_detected_on_flipped_edge() {
        let mut corners = unit_cube();
        corners[4].z = -0.5; // deep corner above its shallow partner
        assert_eq!(cell_twist_count(&corners), 1);
        assert_eq!(cell_twist_count(&unit_cube()), 0);
    }

    #[test]
    fn fully_mirrored_cell_counts_no_twist_and_stays_queryable() {
        let mut flipped = unit_cube();
        for p in &mut flipped {
            p.z = -p.z;
        }
        // all four vertical edges agree on direction, so no inversion
        assert_eq!(cell_twist_count(&flipped), 0);
        assert_eq!(
            point_cell_position(&flipped, &Point3::new(0.5, 0.5, -0.5)),
            PointCellPosition::Inside
        );
    }

    #[test]
    fn interior_point_is_inside() {
        let cube = unit_cube();
        assert_eq!(
            point_cell_position(&cube, &Point3::new(0.5, 0.5, 0.5)),
            PointCellPosition::Inside
        );
        assert_eq!(
            point_cell_position(&cube, &Point3::new(1.5, 0.5, 0.5)),
            PointCellPosition::Outside
        );
    }

    #[test]
    fn face_point_reports_face() {
        let cube = unit_cube();
        match point_cell_position(&cube, &Point3::new(1.0, 0.5, 0.5)) {
            PointCellPosition::OnFace(FaceType::PosI) => {}
            other => panic!("expected PosI face hit, got {other:?}"),
        }
    }

    #[test]
    fn overlap_clamps_to_box() {
        let cube = unit_cube();
        let bbox = BoundingBox::new(Point3::new(0.5, 0.0, 0.0), Point3::new(2.0, 1.0, 1.0));
        let (overlap, overlap_bb) = estimate_hex_overlap_with_box(&cube, &bbox).unwrap();
        for p in &overlap {
            assert!(p.x >= 0.5 - 1e-12);
        }
        assert!((overlap_bb.min.x - 0.5).abs() < 1e-12);
        assert!((overlap_bb.max.x - 1.0).abs() < 1e-12);
    }
}
