use std::collections::{HashMap, HashSet};

use log::{info, warn};
use nalgebra::Point3;
use rayon::prelude::*;

use crate::bounding_box::BoundingBox;
use crate::cell::FaceType;
use crate::cell_face_geometry::{calculate_cell_face_overlap, face_pair_overlap};
use crate::fault::FaultFace;
use crate::grid::MainGrid;

/// Overlap-area tolerance for accepting a connection, grid length units.
const NNC_OVERLAP_TOL: f64 = 1e-6;

/// One directed non-neighbor connection. `face` is the face of `cell1`
/// the flow crosses; the polygon is empty until geometry has been
/// computed.
#[derive(Clone, Debug)]
pub struct Connection {
    pub cell1: usize,
    pub cell2: usize,
    pub face: Option<FaceType>,
    pub polygon: Vec<Point3<f64>>,
}

impl Connection {
    pub fn new(cell1: usize, cell2: usize) -> Self {
        Self {
            cell1,
            cell2,
            face: None,
            polygon: Vec::new(),
        }
    }

    #[inline]
    pub fn has_common_area(&self) -> bool {
        !self.polygon.is_empty()
    }

    /// Order-independent pair key for deduplication.
    #[inline]
    pub fn pair_key(&self) -> (usize, usize) {
        if self.cell1 <= self.cell2 {
            (self.cell1, self.cell2)
        } else {
            (self.cell2, self.cell1)
        }
    }
}

/// Columnar connection storage: parallel arrays for the index pairs,
/// faces and polygons. The first `native_count` entries are the imported
/// connections, everything after is locally discovered.
#[derive(Default)]
pub struct ConnectionContainer {
    cell1: Vec<usize>,
    cell2: Vec<usize>,
    face: Vec<Option<FaceType>>,
    polygons: Vec<Vec<Point3<f64>>>,
}

impl ConnectionContainer {
    #[inline]
    pub fn len(&self) -> usize {
        self.cell1.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cell1.is_empty()
    }

    pub fn push(&mut self, connection: Connection) {
        self.cell1.push(connection.cell1);
        self.cell2.push(connection.cell2);
        self.face.push(connection.face);
        self.polygons.push(connection.polygon);
    }

    #[inline]
    pub fn cell_pair(&self, index: usize) -> (usize, usize) {
        (self.cell1[index], self.cell2[index])
    }

    #[inline]
    pub fn face(&self, index: usize) -> Option<FaceType> {
        self.face[index]
    }

    #[inline]
    pub fn polygon(&self, index: usize) -> &[Point3<f64>] {
        &self.polygons[index]
    }

    #[inline]
    pub fn has_common_area(&self, index: usize) -> bool {
        !self.polygons[index].is_empty()
    }

    fn set_geometry(&mut self, index: usize, face: FaceType, polygon: Vec<Point3<f64>>) {
        self.face[index] = Some(face);
        self.polygons[index] = polygon;
    }

    fn pair_key(&self, index: usize) -> (usize, usize) {
        let (a, b) = self.cell_pair(index);
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }
}

/// Connection processing progress for one grid load.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NncProcessingState {
    #[default]
    Unbuilt,
    FacesComputed,
    PolygonsComputed,
    FullyProcessed,
}

/// Container plus processing state plus the per-connection scalar result
/// series (transmissibility and friends), kept index-aligned with the
/// connections.
#[derive(Default)]
pub struct NncData {
    pub connections: ConnectionContainer,
    native_count: usize,
    state: NncProcessingState,
    scalar_results: HashMap<String, Vec<f64>>,
}

impl NncData {
    #[inline]
    pub fn state(&self) -> NncProcessingState {
        self.state
    }

    #[inline]
    pub fn native_connection_count(&self) -> usize {
        self.native_count
    }

    /// Import connections from an external dataset. Pairwise duplicates
    /// are reported, not merged; the data is kept as given.
    pub fn set_native_connections(&mut self, pairs: &[(usize, usize)]) {
        self.connections = ConnectionContainer::default();
        self.state = NncProcessingState::Unbuilt;
        let mut seen: HashSet<(usize, usize)> = HashSet::with_capacity(pairs.len());
        let mut duplicates = 0usize;
        for &(cell1, cell2) in pairs {
            let connection = Connection::new(cell1, cell2);
            if !seen.insert(connection.pair_key()) {
                duplicates += 1;
            }
            self.connections.push(connection);
        }
        self.native_count = self.connections.len();
        if duplicates > 0 {
            warn!("native connection import contains {duplicates} duplicate cell pairs");
        }
    }

    /// Attach a named scalar series; length must already match the
    /// connection count.
    pub fn set_scalar_result(&mut self, name: &str, values: Vec<f64>) {
        if values.len() != self.connections.len() {
            warn!(
                "scalar result '{}' has {} values for {} connections",
                name,
                values.len(),
                self.connections.len()
            );
        }
        self.scalar_results.insert(name.to_string(), values);
    }

    pub fn scalar_result(&self, name: &str) -> Option<&[f64]> {
        self.scalar_results.get(name).map(|v| v.as_slice())
    }

    /// Compute overlap geometry for the imported connections. Pairs with
    /// no common area keep an empty polygon; their count is reported for
    /// user visibility.
    pub fn process_native_connections(&mut self, grid: &MainGrid) {
        let mut no_common_area = 0usize;
        for index in 0..self.native_count {
            let (cell1, cell2) = self.connections.cell_pair(index);
            match calculate_cell_face_overlap(grid, cell1, cell2, NNC_OVERLAP_TOL) {
                Some(overlap) => {
                    self.connections.set_geometry(index, overlap.face, overlap.polygon);
                }
                None => no_common_area += 1,
            }
        }
        if no_common_area > 0 {
            info!("native connections with no common area: {no_common_area}");
        }
        self.state = NncProcessingState::FacesComputed;
    }

    /// Fault-driven NNC discovery.
    ///
    /// Every declared fault face is scanned independently: spatial
    /// candidates from the face's bounding box, minus the direct
    /// structural neighbor and already-known pairs, restricted along the
    /// fault's axis to the direct neighbor's layer, accepted when the
    /// opposite face overlaps. The scan runs as a rayon fork-join with
    /// per-worker result lists; the sequential merge applies the
    /// unordered-pair dedup set, so no pair is ever registered twice.
    pub fn compute_other_nncs(&mut self, grid: &MainGrid) {
        let known: HashSet<(usize, usize)> = (0..self.connections.len())
            .map(|i| self.connections.pair_key(i))
            .collect();

        let fault_faces: Vec<FaultFace> = grid
            .faults
            .iter()
            .flat_map(|f| f.faces.iter().copied())
            .collect();

        let discovered: Vec<Vec<Connection>> = fault_faces
            .par_iter()
            .map(|fault_face| discover_nncs_for_fault_face(grid, fault_face, &known))
            .collect();

        self.state = NncProcessingState::PolygonsComputed;

        let mut dedup = known;
        let mut added = 0usize;
        for batch in discovered {
            for connection in batch {
                if dedup.insert(connection.pair_key()) {
                    self.connections.push(connection);
                    added += 1;
                }
            }
        }
        info!("fault scan discovered {added} additional connections");
    }

    /// Zero-fill every existing scalar series up to the new connection
    /// count so index alignment with the container is preserved.
    pub fn align_scalar_results(&mut self) {
        let count = self.connections.len();
        for values in self.scalar_results.values_mut() {
            values.resize(count, 0.0);
        }
        self.state = NncProcessingState::FullyProcessed;
    }
}

fn discover_nncs_for_fault_face(
    grid: &MainGrid,
    fault_face: &FaultFace,
    known: &HashSet<(usize, usize)>,
) -> Vec<Connection> {
    let native = fault_face.native_reservoir_cell_index;
    let face = fault_face.native_face;
    let Ok(cell) = grid.cell(native) else {
        return Vec::new();
    };
    let quad = cell.face_corners(face, grid.nodes());
    let mut bbox = BoundingBox::from_points(&quad);
    bbox.expand(NNC_OVERLAP_TOL);

    // with a direct neighbor, real candidates sit in its layer along the
    // fault's axis
    let axis = face.axis();
    let neighbor_axis_coord = fault_face.opposite_reservoir_cell_index.and_then(|nb| {
        let (_, i, j, k) = grid.grid_and_ijk(nb).ok()?;
        Some([i, j, k][axis])
    });

    let mut result = Vec::new();
    for candidate in grid.find_intersecting_cells(&bbox) {
        if candidate == native {
            continue;
        }
        if Some(candidate) == fault_face.opposite_reservoir_cell_index {
            continue;
        }
        let key = if native <= candidate {
            (native, candidate)
        } else {
            (candidate, native)
        };
        if known.contains(&key) {
            continue;
        }
        if let Some(expected) = neighbor_axis_coord {
            let Ok((cand_grid, i, j, k)) = grid.grid_and_ijk(candidate) else {
                continue;
            };
            if cand_grid.grid_index == grid.cell(native).map(|c| c.grid_index).unwrap_or(0)
                && [i, j, k][axis] != expected
            {
                continue;
            }
        }
        if let Some(polygon) = face_pair_overlap(grid, native, face, candidate, NNC_OVERLAP_TOL) {
            let mut connection = Connection::new(native, candidate);
            connection.face = Some(face);
            connection.polygon = polygon;
            result.push(connection);
        }
    }
    result
}

impl MainGrid {
    /// Run the whole connection pipeline: native overlap geometry,
    /// fault-driven discovery, scalar alignment, then attachment of the
    /// connections to their faults. Explicit call, no lazy memoization;
    /// `calculate_faults` and `compute_cached_data` must have run first.
    pub fn process_all_connection_data(&mut self) {
        let mut nnc = std::mem::take(&mut self.nnc_data);
        nnc.process_native_connections(self);
        nnc.compute_other_nncs(self);
        nnc.align_scalar_results();
        self.nnc_data = nnc;
        self.distribute_nncs_to_faults();
    }

    /// Attach every connection with a resolvable (cell, face) fault hit
    /// to that fault's connection list.
    pub fn distribute_nncs_to_faults(&mut self) {
        for fault in &mut self.faults {
            fault.connection_indices.clear();
        }
        let mut assignments: Vec<(usize, usize)> = Vec::new();
        for index in 0..self.nnc_data.connections.len() {
            let (cell1, cell2) = self.nnc_data.connections.cell_pair(index);
            let fault_index = match self.nnc_data.connections.face(index) {
                Some(face) => self
                    .faults_per_cell
                    .fault_index(cell1, face)
                    .or_else(|| self.faults_per_cell.fault_index(cell2, face.opposite())),
                None => None,
            };
            if let Some(fi) = fault_index {
                assignments.push((fi, index));
            }
        }
        for (fault_index, connection_index) in assignments {
            if let Some(fault) = self.faults.get_mut(fault_index) {
                fault.connection_indices.push(connection_index);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_key_is_order_independent() {
        assert_eq!(Connection::new(7, 3).pair_key(), Connection::new(3, 7).pair_key());
    }

    #[test]
    fn duplicate_native_pairs_are_kept_but_counted() {
        let mut nnc = NncData::default();
        nnc.set_native_connections(&[(0, 5), (5, 0), (1, 2)]);
        // duplicates reported via log, data kept as given
        assert_eq!(nnc.connections.len(), 3);
        assert_eq!(nnc.native_connection_count(), 3);
    }

    #[test]
    fn scalar_alignment_zero_fills() {
        let mut nnc = NncData::default();
        nnc.set_native_connections(&[(0, 1)]);
        nnc.set_scalar_result("TRANNNC", vec![0.5]);
        nnc.connections.push(Connection::new(2, 3));
        nnc.align_scalar_results();
        assert_eq!(nnc.scalar_result("TRANNNC"), Some([0.5, 0.0].as_slice()));
        assert_eq!(nnc.state(), NncProcessingState::FullyProcessed);
    }
}
