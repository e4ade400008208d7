use log::error;
use nalgebra::Point3;

use crate::bounding_box::{BoundingBox, BoundingBoxTree};
use crate::cell::{point_cell_position, Cell, FaceType, PointCellPosition};
use crate::error::{GridError, Result};
use crate::fault::{Fault, FaultsPerCellAccumulator};
use crate::nnc::NncData;

/// One structured (i, j, k) lattice of cells.
///
/// Grid 0 is the root grid; local refinements are appended after it. Each
/// sub-grid owns a contiguous slice of the main grid's cell array, so a
/// cell's reservoir-wide index is `cell_start + local index`.
#[derive(Clone, Debug)]
pub struct SubGrid {
    pub grid_index: usize,
    pub ni: usize,
    pub nj: usize,
    pub nk: usize,
    /// Offset of this grid's first cell in the global cell array.
    pub cell_start: usize,
    /// Parent grid for local refinements, `None` for the root grid.
    pub parent_grid_index: Option<usize>,
    pub name: String,
}

impl SubGrid {
    #[inline]
    pub fn cell_count(&self) -> usize {
        self.ni * self.nj * self.nk
    }

    /// Linear local index, i fastest-varying. Guarded variant.
    pub fn cell_index_from_ijk(&self, i: usize, j: usize, k: usize) -> Result<usize> {
        if i >= self.ni || j >= self.nj || k >= self.nk {
            return Err(GridError::IjkOutOfRange {
                i,
                j,
                k,
                ni: self.ni,
                nj: self.nj,
                nk: self.nk,
            });
        }
        Ok(self.cell_index_from_ijk_unguarded(i, j, k))
    }

    /// Unguarded hot-path variant; callers guarantee bounds.
    #[inline]
    pub fn cell_index_from_ijk_unguarded(&self, i: usize, j: usize, k: usize) -> usize {
        debug_assert!(i < self.ni && j < self.nj && k < self.nk);
        i + j * self.ni + k * self.ni * self.nj
    }

    /// Inverse of `cell_index_from_ijk`. Guarded variant.
    pub fn ijk_from_cell_index(&self, cell_index: usize) -> Result<(usize, usize, usize)> {
        if cell_index >= self.cell_count() {
            return Err(GridError::CellIndexOutOfRange {
                index: cell_index,
                count: self.cell_count(),
            });
        }
        Ok(self.ijk_from_cell_index_unguarded(cell_index))
    }

    #[inline]
    pub fn ijk_from_cell_index_unguarded(&self, cell_index: usize) -> (usize, usize, usize) {
        debug_assert!(cell_index < self.cell_count());
        let i = cell_index % self.ni;
        let j = (cell_index / self.ni) % self.nj;
        let k = cell_index / (self.ni * self.nj);
        (i, j, k)
    }

    /// The (i, j, k) of the structural neighbor behind `face`, or `None`
    /// at the grid boundary.
    pub fn ijk_neighbor(
        &self,
        i: usize,
        j: usize,
        k: usize,
        face: FaceType,
    ) -> Option<(usize, usize, usize)> {
        let (di, dj, dk) = face.neighbor_offset();
        let ni = i.checked_add_signed(di as isize)?;
        let nj = j.checked_add_signed(dj as isize)?;
        let nk = k.checked_add_signed(dk as isize)?;
        if ni >= self.ni || nj >= self.nj || nk >= self.nk {
            return None;
        }
        Some((ni, nj, nk))
    }

    /// Reservoir-wide index of the cell at local (i, j, k).
    #[inline]
    pub fn reservoir_cell_index(&self, i: usize, j: usize, k: usize) -> usize {
        self.cell_start + self.cell_index_from_ijk_unguarded(i, j, k)
    }
}

/// Shared node array, global cell arena, and the sub-grid table composing
/// root grid and local refinements into one addressable cell space.
///
/// Construction is append-only and single-threaded; after
/// `compute_cached_data` the grid is read-only and spatial queries may run
/// concurrently.
pub struct MainGrid {
    nodes: Vec<Point3<f64>>,
    cells: Vec<Cell>,
    grids: Vec<SubGrid>,
    bounding_box: Option<BoundingBox>,
    cell_search_tree: Option<BoundingBoxTree>,
    pub faults: Vec<Fault>,
    pub faults_per_cell: FaultsPerCellAccumulator,
    pub nnc_data: NncData,
}

impl MainGrid {
    /// Build a grid from its root lattice. `cells` must be laid out i
    /// fastest and carry grid index 0.
    pub fn from_root(
        ni: usize,
        nj: usize,
        nk: usize,
        nodes: Vec<Point3<f64>>,
        cells: Vec<Cell>,
    ) -> Self {
        assert_eq!(cells.len(), ni * nj * nk);
        let root = SubGrid {
            grid_index: 0,
            ni,
            nj,
            nk,
            cell_start: 0,
            parent_grid_index: None,
            name: "MAIN".to_string(),
        };
        Self {
            nodes,
            cells,
            grids: vec![root],
            bounding_box: None,
            cell_search_tree: None,
            faults: Vec::new(),
            faults_per_cell: FaultsPerCellAccumulator::default(),
            nnc_data: NncData::default(),
        }
    }

    /// Axis-aligned uniform grid with cell size (dx, dy, dz), origin at
    /// zero. Mostly useful for tests and synthetic cases.
    pub fn uniform(ni: usize, nj: usize, nk: usize, dx: f64, dy: f64, dz: f64) -> Self {
        let (npi, npj, npk) = (ni + 1, nj + 1, nk + 1);
        let mut nodes = Vec::with_capacity(npi * npj * npk);
        for k in 0..npk {
            for j in 0..npj {
                for i in 0..npi {
                    nodes.push(Point3::new(i as f64 * dx, j as f64 * dy, k as f64 * dz));
                }
            }
        }
        let node_idx = |i: usize, j: usize, k: usize| i + j * npi + k * npi * npj;
        let mut cells = Vec::with_capacity(ni * nj * nk);
        for k in 0..nk {
            for j in 0..nj {
                for i in 0..ni {
                    let corners = [
                        node_idx(i, j, k),
                        node_idx(i + 1, j, k),
                        node_idx(i + 1, j + 1, k),
                        node_idx(i, j + 1, k),
                        node_idx(i, j, k + 1),
                        node_idx(i + 1, j, k + 1),
                        node_idx(i + 1, j + 1, k + 1),
                        node_idx(i, j + 1, k + 1),
                    ];
                    cells.push(Cell::new(corners, 0));
                }
            }
        }
        Self::from_root(ni, nj, nk, nodes, cells)
    }

    /// Register a local refinement. `extra_nodes` are appended to the
    /// shared node array; `cells` reference them with indices already
    /// offset by the prior node count and are appended contiguously.
    /// Each host coarse cell gets its refinement back-reference set.
    pub fn add_local_grid(
        &mut self,
        name: &str,
        ni: usize,
        nj: usize,
        nk: usize,
        parent_grid_index: usize,
        extra_nodes: Vec<Point3<f64>>,
        mut cells: Vec<Cell>,
        host_cells: &[usize],
    ) -> Result<usize> {
        if parent_grid_index >= self.grids.len() {
            return Err(GridError::GridIndexOutOfRange {
                index: parent_grid_index,
                count: self.grids.len(),
            });
        }
        assert_eq!(cells.len(), ni * nj * nk);
        let grid_index = self.grids.len();
        let cell_start = self.cells.len();
        self.nodes.extend(extra_nodes);
        for cell in &mut cells {
            cell.grid_index = grid_index;
        }
        self.cells.extend(cells);
        for &host in host_cells {
            if host >= cell_start {
                return Err(GridError::CellIndexOutOfRange {
                    index: host,
                    count: cell_start,
                });
            }
            self.cells[host].refinement_grid_index = Some(grid_index);
        }
        self.grids.push(SubGrid {
            grid_index,
            ni,
            nj,
            nk,
            cell_start,
            parent_grid_index: Some(parent_grid_index),
            name: name.to_string(),
        });
        Ok(grid_index)
    }

    #[inline]
    pub fn nodes(&self) -> &[Point3<f64>] {
        &self.nodes
    }

    #[inline]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn grids(&self) -> &[SubGrid] {
        &self.grids
    }

    #[inline]
    pub fn root_grid(&self) -> &SubGrid {
        &self.grids[0]
    }

    pub fn grid(&self, grid_index: usize) -> Result<&SubGrid> {
        self.grids
            .get(grid_index)
            .ok_or(GridError::GridIndexOutOfRange {
                index: grid_index,
                count: self.grids.len(),
            })
    }

    pub fn cell(&self, reservoir_cell_index: usize) -> Result<&Cell> {
        self.cells
            .get(reservoir_cell_index)
            .ok_or(GridError::CellIndexOutOfRange {
                index: reservoir_cell_index,
                count: self.cells.len(),
            })
    }

    /// Owning sub-grid and local (i, j, k) of a reservoir cell index.
    pub fn grid_and_ijk(&self, reservoir_cell_index: usize) -> Result<(&SubGrid, usize, usize, usize)> {
        let cell = self.cell(reservoir_cell_index)?;
        let grid = &self.grids[cell.grid_index];
        let (i, j, k) = grid.ijk_from_cell_index(reservoir_cell_index - grid.cell_start)?;
        Ok((grid, i, j, k))
    }

    /// Reservoir index of the same-grid structural neighbor behind `face`,
    /// `None` at the sub-grid boundary.
    pub fn cell_neighbor(&self, reservoir_cell_index: usize, face: FaceType) -> Option<usize> {
        let (grid, i, j, k) = self.grid_and_ijk(reservoir_cell_index).ok()?;
        let (ni, nj, nk) = grid.ijk_neighbor(i, j, k, face)?;
        Some(grid.reservoir_cell_index(ni, nj, nk))
    }

    /// Leaf cells are the ones spatial iteration sees: coarse cells
    /// replaced by a refinement are skipped in favor of their finer cells.
    #[inline]
    pub fn is_leaf_cell(&self, reservoir_cell_index: usize) -> bool {
        let cell = &self.cells[reservoir_cell_index];
        cell.refinement_grid_index.is_none() && !cell.invalid
    }

    /// Corner coordinates of a cell.
    pub fn cell_corners(&self, reservoir_cell_index: usize) -> Result<[Point3<f64>; 8]> {
        Ok(self.cell(reservoir_cell_index)?.corners(&self.nodes))
    }

    /// Build the grid bounding box and the cell search tree. Call once
    /// after construction; spatial queries fail visibly until then.
    pub fn compute_cached_data(&mut self) {
        let mut bb = BoundingBox::empty();
        let mut items = Vec::with_capacity(self.cells.len());
        for (idx, cell) in self.cells.iter().enumerate() {
            let cell_bb = cell.bounding_box(&self.nodes);
            bb.add_box(&cell_bb);
            if self.is_leaf_cell(idx) {
                items.push((cell_bb, idx));
            }
        }
        self.bounding_box = Some(bb);
        self.cell_search_tree = Some(BoundingBoxTree::build(&items));
    }

    pub fn bounding_box(&self) -> BoundingBox {
        match self.bounding_box {
            Some(bb) => bb,
            None => {
                let mut bb = BoundingBox::empty();
                for p in &self.nodes {
                    bb.add_point(p);
                }
                bb
            }
        }
    }

    #[inline]
    pub fn is_search_tree_built(&self) -> bool {
        self.cell_search_tree.is_some()
    }

    /// Reservoir indices of all leaf cells whose bounding box intersects
    /// `bbox`. Logs an error and returns empty when the search tree has
    /// not been built.
    pub fn find_intersecting_cells(&self, bbox: &BoundingBox) -> Vec<usize> {
        let Some(tree) = &self.cell_search_tree else {
            error!("cell search tree queried before compute_cached_data");
            return Vec::new();
        };
        let mut hits = Vec::new();
        tree.find_intersections(bbox, &mut hits);
        hits
    }

    /// The unique leaf cell containing `point`, if any.
    ///
    /// Points exactly on a face belong to the cell on the positive side
    /// of that face: a NEG-side hit is owned outright, a POS-side hit
    /// only when the grid has no neighbor in that direction, so boundary
    /// faces keep their points and interior faces have exactly one owner.
    pub fn find_reservoir_cell_index_from_point(&self, point: &Point3<f64>) -> Option<usize> {
        let mut query = BoundingBox::new(*point, *point);
        query.expand(1e-9);
        let mut candidates = self.find_intersecting_cells(&query);
        candidates.sort_unstable();
        for cell_index in candidates {
            let corners = self.cells[cell_index].corners(&self.nodes);
            match point_cell_position(&corners, point) {
                PointCellPosition::Inside => return Some(cell_index),
                PointCellPosition::OnFace(face) => {
                    let owned = if face.is_positive_direction() {
                        self.cell_neighbor(cell_index, face).is_none()
                    } else {
                        true
                    };
                    if owned {
                        return Some(cell_index);
                    }
                }
                PointCellPosition::Outside => {}
            }
        }
        None
    }
}
