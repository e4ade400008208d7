use nalgebra::{Point3, Vector3};

use crate::bounding_box::BoundingBox;
use crate::cell::FaceType;
use crate::geometry::Plane;
use crate::grid::MainGrid;
use crate::hex_intersect::{
    clip_polygon_between_planes, plane_hex_intersection_polygons_weighted, CornerWeightedVertex,
};
use crate::interval_filter::IntervalFilter;
use crate::results::ActiveCellInfo;

const CHAIN_TOL: f64 = 1e-6;

/// Capability set a grid must offer to have cross-sections cut through
/// it. Implementations borrow their backing data; the generator is
/// polymorphic over structured reservoir grids and finite-element
/// meshes alike.
pub trait HexGridSource {
    /// Offset subtracted from all generated vertices, for display
    /// precision on UTM-scale coordinates.
    fn display_offset(&self) -> Vector3<f64>;
    fn bounding_box(&self) -> BoundingBox;
    fn find_intersecting_cells(&self, bbox: &BoundingBox) -> Vec<usize>;
    /// Whether a cell participates at all (visibility, element type,
    /// k-layer filter).
    fn use_cell(&self, cell_index: usize) -> bool;
    fn cell_corner_vertices(&self, cell_index: usize) -> [Point3<f64>; 8];
    fn cell_corner_indices(&self, cell_index: usize) -> [usize; 8];
    fn find_fault_from_cell_index_and_cell_face(
        &self,
        cell_index: usize,
        face: FaceType,
    ) -> Option<usize>;
    fn set_k_interval_filter(&mut self, enabled: bool, spec: &str);
}

/// Triangulated cross-section surface with back-references into the
/// source grid.
#[derive(Clone, Debug, Default)]
pub struct CrossSectionGeometry {
    /// Flat vertex list, 3 consecutive vertices per triangle, already
    /// shifted by the source's display offset.
    pub triangle_vertices: Vec<Point3<f64>>,
    /// Originating cell per triangle.
    pub triangle_to_cell: Vec<usize>,
    /// Cell-corner interpolation weights per vertex, parallel to
    /// `triangle_vertices`.
    pub vertex_weights: Vec<[f64; 8]>,
}

/// Cuts a vertically extruded surface along a polyline through a
/// `HexGridSource` and triangulates the intersection.
pub struct CrossSectionGenerator<'a> {
    source: &'a dyn HexGridSource,
    polyline: Vec<Point3<f64>>,
    extrusion_direction: Vector3<f64>,
}

impl<'a> CrossSectionGenerator<'a> {
    pub fn new(source: &'a dyn HexGridSource, polyline: Vec<Point3<f64>>) -> Self {
        Self {
            source,
            polyline,
            extrusion_direction: Vector3::new(0.0, 0.0, -1.0),
        }
    }

    pub fn with_extrusion_direction(mut self, direction: Vector3<f64>) -> Self {
        self.extrusion_direction = direction.normalize();
        self
    }

    /// Per consecutive polyline segment: swept search box, candidate
    /// cells, per-cell plane intersection, then clipping against the two
    /// side planes through the segment endpoints so triangles never leak
    /// into the neighboring segment.
    pub fn calculate(&self) -> CrossSectionGeometry {
        let mut geometry = CrossSectionGeometry::default();
        if self.polyline.len() < 2 {
            return geometry;
        }
        let grid_bb = self.source.bounding_box();
        let max_height_vec = self.extrusion_direction * grid_bb.radius() * 2.0;
        let offset = self.source.display_offset();

        for segment in self.polyline.windows(2) {
            let (p1, p2) = (segment[0], segment[1]);
            let seg_dir = p2 - p1;
            if seg_dir.norm_squared() == 0.0 {
                continue;
            }

            let mut sweep_bb = BoundingBox::empty();
            for p in [p1 + max_height_vec, p1 - max_height_vec, p2 + max_height_vec, p2 - max_height_vec] {
                sweep_bb.add_point(&p);
            }

            let Some(cut_plane) = Plane::from_points(p1, p2, p2 + max_height_vec) else {
                continue; // segment parallel to the extrusion direction
            };
            let side1 = Plane::new(p1, -seg_dir);
            let side2 = Plane::new(p2, seg_dir);

            for cell_index in self.source.find_intersecting_cells(&sweep_bb) {
                if !self.source.use_cell(cell_index) {
                    continue;
                }
                let corners = self.source.cell_corner_vertices(cell_index);
                let polygons =
                    plane_hex_intersection_polygons_weighted(&corners, &cut_plane, CHAIN_TOL);
                for polygon in polygons {
                    let clipped = clip_polygon_between_planes(&polygon, &side1, &side2);
                    emit_fan(&mut geometry, &clipped, cell_index, &offset);
                }
            }
        }
        geometry
    }
}

fn emit_fan(
    geometry: &mut CrossSectionGeometry,
    polygon: &[CornerWeightedVertex],
    cell_index: usize,
    offset: &Vector3<f64>,
) {
    if polygon.len() < 3 {
        return;
    }
    for n in 1..polygon.len() - 1 {
        for v in [&polygon[0], &polygon[n], &polygon[n + 1]] {
            geometry.triangle_vertices.push(v.point - offset);
            geometry.vertex_weights.push(v.weights);
        }
        geometry.triangle_to_cell.push(cell_index);
    }
}

/// `HexGridSource` backed by a structured corner-point grid with active
/// cell information.
pub struct ReservoirGridSource<'a> {
    grid: &'a MainGrid,
    active_cell_info: &'a ActiveCellInfo,
    show_inactive_cells: bool,
    k_filter: Option<IntervalFilter>,
}

impl<'a> ReservoirGridSource<'a> {
    pub fn new(grid: &'a MainGrid, active_cell_info: &'a ActiveCellInfo) -> Self {
        Self {
            grid,
            active_cell_info,
            show_inactive_cells: false,
            k_filter: None,
        }
    }

    pub fn show_inactive_cells(mut self, show: bool) -> Self {
        self.show_inactive_cells = show;
        self
    }
}

impl HexGridSource for ReservoirGridSource<'_> {
    fn display_offset(&self) -> Vector3<f64> {
        let bb = self.grid.bounding_box();
        if bb.is_valid() {
            bb.min.coords
        } else {
            Vector3::zeros()
        }
    }

    fn bounding_box(&self) -> BoundingBox {
        self.grid.bounding_box()
    }

    fn find_intersecting_cells(&self, bbox: &BoundingBox) -> Vec<usize> {
        self.grid.find_intersecting_cells(bbox)
    }

    fn use_cell(&self, cell_index: usize) -> bool {
        if !self.grid.is_leaf_cell(cell_index) {
            return false;
        }
        if !self.show_inactive_cells && !self.active_cell_info.is_active(cell_index) {
            return false;
        }
        if let Some(filter) = &self.k_filter {
            let Ok((_, _, _, k)) = self.grid.grid_and_ijk(cell_index) else {
                return false;
            };
            // filter specs are 1-based k layers
            if !filter.is_number_included(k + 1) {
                return false;
            }
        }
        true
    }

    fn cell_corner_vertices(&self, cell_index: usize) -> [Point3<f64>; 8] {
        self.grid
            .cell_corners(cell_index)
            .unwrap_or([Point3::origin(); 8])
    }

    fn cell_corner_indices(&self, cell_index: usize) -> [usize; 8] {
        self.grid
            .cell(cell_index)
            .map(|c| c.corner_nodes)
            .unwrap_or([0; 8])
    }

    fn find_fault_from_cell_index_and_cell_face(
        &self,
        cell_index: usize,
        face: FaceType,
    ) -> Option<usize> {
        self.grid
            .find_fault_from_cell_index_and_cell_face(cell_index, face)
    }

    fn set_k_interval_filter(&mut self, enabled: bool, spec: &str) {
        self.k_filter = enabled.then(|| IntervalFilter::from_spec(spec));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polyline_cut_produces_cell_backed_triangles() {
        let mut grid = MainGrid::uniform(2, 2, 1, 1.0, 1.0, 1.0);
        grid.compute_cached_data();
        let active = ActiveCellInfo::all_active(4);
        let source = ReservoirGridSource::new(&grid, &active);

        // cut straight through the middle of the j=0 row
        let polyline = vec![Point3::new(-0.5, 0.5, 0.5), Point3::new(2.5, 0.5, 0.5)];
        let geometry = CrossSectionGenerator::new(&source, polyline).calculate();

        assert!(!geometry.triangle_to_cell.is_empty());
        assert_eq!(
            geometry.triangle_vertices.len(),
            3 * geometry.triangle_to_cell.len()
        );
        assert_eq!(geometry.vertex_weights.len(), geometry.triangle_vertices.len());
        let mut cells: Vec<usize> = geometry.triangle_to_cell.clone();
        cells.sort_unstable();
        cells.dedup();
        assert_eq!(cells, vec![0, 1]);
        for weights in &geometry.vertex_weights {
            let sum: f64 = weights.iter().sum();
            assert!((sum - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn k_filter_drops_layers() {
        let mut grid = MainGrid::uniform(1, 1, 2, 1.0, 1.0, 1.0);
        grid.compute_cached_data();
        let active = ActiveCellInfo::all_active(2);
        let mut source = ReservoirGridSource::new(&grid, &active);
        source.set_k_interval_filter(true, "2");

        assert!(!source.use_cell(0)); // k = 0, layer 1
        assert!(source.use_cell(1)); // k = 1, layer 2
    }
}
