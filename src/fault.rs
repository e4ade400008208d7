use serde::Serialize;

use crate::cell::FaceType;
use crate::grid::MainGrid;
use crate::results::ActiveCellInfo;

/// Grid-unit tolerance for deciding that two supposedly shared face
/// vertices have split apart across a fault.
const FAULT_VERTEX_TOL: f64 = 1e-6;

pub const UNNAMED_GRID_FAULT_NAME: &str = "Undefined Grid Faults";
pub const UNNAMED_INACTIVE_FAULT_NAME: &str = "Undefined Grid Faults With Inactive";

/// Inclusive (i, j, k) cell range, as declared by fault input data.
#[derive(Clone, Copy, Debug)]
pub struct CellRange {
    pub min: (usize, usize, usize),
    pub max: (usize, usize, usize),
}

impl CellRange {
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, usize)> + '_ {
        let (i0, j0, k0) = self.min;
        let (i1, j1, k1) = self.max;
        (k0..=k1).flat_map(move |k| (j0..=j1).flat_map(move |j| (i0..=i1).map(move |i| (i, j, k))))
    }
}

/// One (cell, face) pair of a fault surface with its structurally
/// opposite cell, when one exists.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct FaultFace {
    pub native_reservoir_cell_index: usize,
    pub native_face: FaceType,
    pub opposite_reservoir_cell_index: Option<usize>,
}

/// Named fault surface: declared cell ranges per face direction, expanded
/// lazily into explicit fault faces, plus the NNCs attached to it.
#[derive(Clone, Debug, Default)]
pub struct Fault {
    pub name: String,
    cell_ranges_for_faces: Vec<(FaceType, CellRange)>,
    pub faces: Vec<FaultFace>,
    /// Indices into the grid's connection container.
    pub connection_indices: Vec<usize>,
}

impl Fault {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn add_cell_range(&mut self, face: FaceType, range: CellRange) {
        self.cell_ranges_for_faces.push((face, range));
    }

    /// Expand the declared ranges into explicit fault faces on the root
    /// grid. Cells at the grid boundary keep an undefined opposite side.
    pub fn compute_fault_faces_from_cell_ranges(&mut self, grid: &MainGrid) {
        self.faces.clear();
        let root = grid.root_grid();
        for (face, range) in &self.cell_ranges_for_faces {
            for (i, j, k) in range.cells() {
                let Ok(local) = root.cell_index_from_ijk(i, j, k) else {
                    continue;
                };
                let native = root.cell_start + local;
                let opposite = root
                    .ijk_neighbor(i, j, k, *face)
                    .map(|(ni, nj, nk)| root.reservoir_cell_index(ni, nj, nk));
                self.faces.push(FaultFace {
                    native_reservoir_cell_index: native,
                    native_face: *face,
                    opposite_reservoir_cell_index: opposite,
                });
            }
        }
    }
}

/// Per-cell, per-face fault membership, the fast path for
/// `find_fault_from_cell_and_face` and for attaching NNCs to faults.
#[derive(Clone, Debug, Default)]
pub struct FaultsPerCellAccumulator {
    per_cell: Vec<[Option<usize>; 6]>,
}

impl FaultsPerCellAccumulator {
    pub fn new(cell_count: usize) -> Self {
        Self {
            per_cell: vec![[None; 6]; cell_count],
        }
    }

    #[inline]
    pub fn fault_index(&self, reservoir_cell_index: usize, face: FaceType) -> Option<usize> {
        self.per_cell
            .get(reservoir_cell_index)
            .and_then(|faces| faces[face.index()])
    }

    #[inline]
    pub fn set_fault_index(&mut self, reservoir_cell_index: usize, face: FaceType, fault_index: usize) {
        if let Some(faces) = self.per_cell.get_mut(reservoir_cell_index) {
            faces[face.index()] = Some(fault_index);
        }
    }
}

impl MainGrid {
    /// Expand all declared fault ranges, then scan the root grid for
    /// geometric faults no input data named: I/J face pairs whose shared
    /// vertices have drifted apart beyond tolerance. Hits are collected
    /// into the two conventional unnamed faults, split on whether both
    /// cells are active. The per-cell accumulator is rebuilt as a side
    /// effect.
    pub fn calculate_faults(&mut self, active_cell_info: &ActiveCellInfo) {
        let mut faults = std::mem::take(&mut self.faults);
        for fault in &mut faults {
            fault.compute_fault_faces_from_cell_ranges(self);
        }

        let mut accumulator = FaultsPerCellAccumulator::new(self.cell_count());
        for (fault_index, fault) in faults.iter().enumerate() {
            for face in &fault.faces {
                accumulator.set_fault_index(
                    face.native_reservoir_cell_index,
                    face.native_face,
                    fault_index,
                );
                if let Some(opposite) = face.opposite_reservoir_cell_index {
                    accumulator.set_fault_index(
                        opposite,
                        face.native_face.opposite(),
                        fault_index,
                    );
                }
            }
        }

        let unnamed_index = faults.len();
        let unnamed_inactive_index = faults.len() + 1;
        let mut unnamed = Fault::new(UNNAMED_GRID_FAULT_NAME);
        let mut unnamed_inactive = Fault::new(UNNAMED_INACTIVE_FAULT_NAME);

        let root = self.root_grid().clone();
        for local in 0..root.cell_count() {
            let native = root.cell_start + local;
            if self.cells()[native].invalid {
                continue;
            }
            let (i, j, k) = root.ijk_from_cell_index_unguarded(local);
            for face in [FaceType::PosI, FaceType::PosJ] {
                let Some((ni, nj, nk)) = root.ijk_neighbor(i, j, k, face) else {
                    continue;
                };
                let neighbor = root.reservoir_cell_index(ni, nj, nk);
                if accumulator.fault_index(native, face).is_some() {
                    continue;
                }
                let native_active = active_cell_info.is_active(native);
                let neighbor_active = active_cell_info.is_active(neighbor);
                if !native_active && !neighbor_active {
                    continue;
                }
                if !self.face_vertices_are_split(native, neighbor, face) {
                    continue;
                }
                let fault_face = FaultFace {
                    native_reservoir_cell_index: native,
                    native_face: face,
                    opposite_reservoir_cell_index: Some(neighbor),
                };
                let fault_index = if native_active && neighbor_active {
                    unnamed.faces.push(fault_face);
                    unnamed_index
                } else {
                    unnamed_inactive.faces.push(fault_face);
                    unnamed_inactive_index
                };
                accumulator.set_fault_index(native, face, fault_index);
                accumulator.set_fault_index(neighbor, face.opposite(), fault_index);
            }
        }

        faults.push(unnamed);
        faults.push(unnamed_inactive);
        self.faults = faults;
        self.faults_per_cell = accumulator;
    }

    /// A face pair is split when any corresponding vertex pair disagrees
    /// beyond tolerance. The neighbor's opposite face is traversed in
    /// reversed winding, so corner n matches corner (4 - n) % 4.
    fn face_vertices_are_split(&self, native: usize, neighbor: usize, face: FaceType) -> bool {
        let native_nodes = self.cells()[native].face_node_indices(face);
        let neighbor_nodes = self.cells()[neighbor].face_node_indices(face.opposite());
        let nodes = self.nodes();
        let tol_sq = FAULT_VERTEX_TOL * FAULT_VERTEX_TOL;
        for n in 0..4 {
            let a = native_nodes[n];
            let b = neighbor_nodes[(4 - n) % 4];
            if a == b {
                continue;
            }
            if (nodes[a] - nodes[b]).norm_squared() > tol_sq {
                return true;
            }
        }
        false
    }

    /// Fault index registered at a (cell, face), if any.
    pub fn find_fault_from_cell_index_and_cell_face(
        &self,
        reservoir_cell_index: usize,
        face: FaceType,
    ) -> Option<usize> {
        self.faults_per_cell.fault_index(reservoir_cell_index, face)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Cell;
    use crate::grid::MainGrid;
    use nalgebra::Point3;

    #[test]
    fn range_expansion_resolves_neighbors() {
        let grid = MainGrid::uniform(3, 3, 3, 1.0, 1.0, 1.0);
        let mut fault = Fault::new("F1");
        fault.add_cell_range(
            FaceType::PosI,
            CellRange {
                min: (1, 0, 0),
                max: (1, 2, 2),
            },
        );
        fault.compute_fault_faces_from_cell_ranges(&grid);
        assert_eq!(fault.faces.len(), 9);
        for face in &fault.faces {
            assert_eq!(
                face.opposite_reservoir_cell_index,
                Some(face.native_reservoir_cell_index + 1)
            );
        }
    }

    #[test]
    fn boundary_range_leaves_opposite_undefined() {
        let grid = MainGrid::uniform(2, 1, 1, 1.0, 1.0, 1.0);
        let mut fault = Fault::new("F_EDGE");
        fault.add_cell_range(
            FaceType::PosI,
            CellRange {
                min: (1, 0, 0),
                max: (1, 0, 0),
            },
        );
        fault.compute_fault_faces_from_cell_ranges(&grid);
        assert_eq!(fault.faces.len(), 1);
        assert!(fault.faces[0].opposite_reservoir_cell_index.is_none());
    }

    /// Two 1x1x1 cells side by side along i, with cell 1 shifted down so
    /// the nominally shared face at x = 1 tears apart. Every cell has its
    /// own 8 nodes.
    fn torn_two_cell_grid() -> MainGrid {
        let hex = |x0: f64, dz: f64| -> Vec<Point3<f64>> {
            vec![
                Point3::new(x0, 0.0, dz),
                Point3::new(x0 + 1.0, 0.0, dz),
                Point3::new(x0 + 1.0, 1.0, dz),
                Point3::new(x0, 1.0, dz),
                Point3::new(x0, 0.0, dz + 1.0),
                Point3::new(x0 + 1.0, 0.0, dz + 1.0),
                Point3::new(x0 + 1.0, 1.0, dz + 1.0),
                Point3::new(x0, 1.0, dz + 1.0),
            ]
        };
        let mut nodes = hex(0.0, 0.0);
        nodes.extend(hex(1.0, 0.4));
        let cells = vec![
            Cell::new(std::array::from_fn(|i| i), 0),
            Cell::new(std::array::from_fn(|i| 8 + i), 0),
        ];
        MainGrid::from_root(2, 1, 1, nodes, cells)
    }

    #[test]
    fn unnamed_fault_found_at_split_vertices() {
        let mut grid = torn_two_cell_grid();
        let active = ActiveCellInfo::all_active(2);
        grid.calculate_faults(&active);
        let unnamed = grid
            .faults
            .iter()
            .find(|f| f.name == UNNAMED_GRID_FAULT_NAME)
            .unwrap();
        assert_eq!(unnamed.faces.len(), 1);
        assert_eq!(
            grid.find_fault_from_cell_index_and_cell_face(0, FaceType::PosI),
            grid.find_fault_from_cell_index_and_cell_face(1, FaceType::NegI),
        );
        assert!(grid
            .find_fault_from_cell_index_and_cell_face(0, FaceType::PosI)
            .is_some());
    }

    #[test]
    fn inactive_partner_goes_to_separate_unnamed_fault() {
        let mut grid = torn_two_cell_grid();
        let active = ActiveCellInfo::from_flags(&[true, false]);
        grid.calculate_faults(&active);
        let unnamed = grid
            .faults
            .iter()
            .find(|f| f.name == UNNAMED_GRID_FAULT_NAME)
            .unwrap();
        let inactive = grid
            .faults
            .iter()
            .find(|f| f.name == UNNAMED_INACTIVE_FAULT_NAME)
            .unwrap();
        assert!(unnamed.faces.is_empty());
        assert_eq!(inactive.faces.len(), 1);
    }
}
