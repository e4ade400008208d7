use nalgebra::{Point3, Vector3};

use crate::bounding_box::{BoundingBox, BoundingBoxTree};
use crate::cell::FaceType;
use crate::cross_section::HexGridSource;
use crate::interval_filter::IntervalFilter;

/// Element topology kinds a finite-element part can carry. Only 8-node
/// hexahedra participate in cross-section geometry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementType {
    Hex8,
    Other,
}

/// Minimal finite-element node/connectivity mesh: a shared node array
/// and per-element node indices.
pub struct ElementMesh {
    nodes: Vec<Point3<f64>>,
    elements: Vec<[usize; 8]>,
    element_types: Vec<ElementType>,
    bounding_box: BoundingBox,
    search_tree: BoundingBoxTree,
}

impl ElementMesh {
    pub fn new(
        nodes: Vec<Point3<f64>>,
        elements: Vec<[usize; 8]>,
        element_types: Vec<ElementType>,
    ) -> Self {
        assert_eq!(elements.len(), element_types.len());
        let mut bounding_box = BoundingBox::empty();
        let mut items = Vec::with_capacity(elements.len());
        for (index, element) in elements.iter().enumerate() {
            let mut bb = BoundingBox::empty();
            for &n in element {
                bb.add_point(&nodes[n]);
            }
            bounding_box.add_box(&bb);
            items.push((bb, index));
        }
        let search_tree = BoundingBoxTree::build(&items);
        Self {
            nodes,
            elements,
            element_types,
            bounding_box,
            search_tree,
        }
    }

    #[inline]
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    #[inline]
    pub fn element_type(&self, index: usize) -> ElementType {
        self.element_types[index]
    }

    pub fn element_corners(&self, index: usize) -> [Point3<f64>; 8] {
        std::array::from_fn(|i| self.nodes[self.elements[index][i]])
    }
}

/// `HexGridSource` backed by a finite-element mesh; non-hexahedral
/// elements are rejected by `use_cell`, and faults do not exist in this
/// source.
pub struct ElementMeshSource<'a> {
    mesh: &'a ElementMesh,
    k_filter: Option<IntervalFilter>,
}

impl<'a> ElementMeshSource<'a> {
    pub fn new(mesh: &'a ElementMesh) -> Self {
        Self {
            mesh,
            k_filter: None,
        }
    }
}

impl HexGridSource for ElementMeshSource<'_> {
    fn display_offset(&self) -> Vector3<f64> {
        if self.mesh.bounding_box.is_valid() {
            self.mesh.bounding_box.min.coords
        } else {
            Vector3::zeros()
        }
    }

    fn bounding_box(&self) -> BoundingBox {
        self.mesh.bounding_box
    }

    fn find_intersecting_cells(&self, bbox: &BoundingBox) -> Vec<usize> {
        let mut hits = Vec::new();
        self.mesh.search_tree.find_intersections(bbox, &mut hits);
        hits
    }

    fn use_cell(&self, cell_index: usize) -> bool {
        if self.mesh.element_type(cell_index) != ElementType::Hex8 {
            return false;
        }
        match &self.k_filter {
            // element meshes have no k layering; a set filter filters by
            // 1-based element index instead
            Some(filter) => filter.is_number_included(cell_index + 1),
            None => true,
        }
    }

    fn cell_corner_vertices(&self, cell_index: usize) -> [Point3<f64>; 8] {
        self.mesh.element_corners(cell_index)
    }

    fn cell_corner_indices(&self, cell_index: usize) -> [usize; 8] {
        self.mesh.elements[cell_index]
    }

    fn find_fault_from_cell_index_and_cell_face(
        &self,
        _cell_index: usize,
        _face: FaceType,
    ) -> Option<usize> {
        None
    }

    fn set_k_interval_filter(&mut self, enabled: bool, spec: &str) {
        self.k_filter = enabled.then(|| IntervalFilter::from_spec(spec));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cross_section::CrossSectionGenerator;

    fn single_hex_mesh() -> ElementMesh {
        let nodes = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(1.0, 0.0, 1.0),
            Point3::new(1.0, 1.0, 1.0),
            Point3::new(0.0, 1.0, 1.0),
        ];
        ElementMesh::new(nodes, vec![std::array::from_fn(|i| i)], vec![ElementType::Hex8])
    }

    #[test]
    fn hex_element_is_cut_like_a_grid_cell() {
        let mesh = single_hex_mesh();
        let source = ElementMeshSource::new(&mesh);
        let polyline = vec![Point3::new(-0.5, 0.5, 0.5), Point3::new(1.5, 0.5, 0.5)];
        let geometry = CrossSectionGenerator::new(&source, polyline).calculate();
        assert!(!geometry.triangle_to_cell.is_empty());
        assert!(geometry.triangle_to_cell.iter().all(|&c| c == 0));
    }

    #[test]
    fn non_hex_elements_are_rejected() {
        let nodes = vec![Point3::origin(); 8];
        let mesh = ElementMesh::new(nodes, vec![[0; 8]], vec![ElementType::Other]);
        let source = ElementMeshSource::new(&mesh);
        assert!(!source.use_cell(0));
    }
}
