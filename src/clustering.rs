use log::{debug, info};
use serde::Serialize;

use crate::cell::{FaceType, ALL_FACES};
use crate::grid::MainGrid;
use crate::results::ActiveCellInfo;

/// Cluster assignment sentinel values: 0 unassigned, -1 transient
/// candidate during one growth iteration, positive values final ids.
pub const UNASSIGNED: i32 = 0;
pub const CANDIDATE: i32 = -1;

/// Admission thresholds for seeding and growing clusters.
#[derive(Clone, Copy, Debug)]
pub struct ClusteringLimits {
    pub volume: f64,
    pub pressure: f64,
    pub permeability: f64,
    pub transmissibility: f64,
    pub max_clusters: usize,
    pub max_iterations: usize,
}

/// Per-cell scalar arrays driving admission, all addressed by reservoir
/// cell index. The optional filter admits only cells where it is
/// positive.
#[derive(Clone, Copy)]
pub struct ClusteringInputs<'a> {
    pub volume: &'a [f64],
    pub pressure: &'a [f64],
    pub permeability_x: &'a [f64],
    pub permeability_y: &'a [f64],
    pub permeability_z: &'a [f64],
    pub transmissibility_x: &'a [f64],
    pub transmissibility_y: &'a [f64],
    pub transmissibility_z: &'a [f64],
    pub filter: Option<&'a [f64]>,
}

impl<'a> ClusteringInputs<'a> {
    fn permeability(&self, axis: usize) -> &'a [f64] {
        match axis {
            0 => self.permeability_x,
            1 => self.permeability_y,
            _ => self.permeability_z,
        }
    }

    fn transmissibility(&self, axis: usize) -> &'a [f64] {
        match axis {
            0 => self.transmissibility_x,
            1 => self.transmissibility_y,
            _ => self.transmissibility_z,
        }
    }

    fn passes_filter(&self, cell: usize) -> bool {
        match self.filter {
            Some(values) => values.get(cell).copied().unwrap_or(0.0) > 0.0,
            None => true,
        }
    }
}

/// Final assignment array plus the number of clusters actually found.
#[derive(Clone, Debug)]
pub struct ClusteringResult {
    pub assignment: Vec<i32>,
    pub num_clusters: usize,
}

/// Seed search: the unassigned active cell of maximum volume that clears
/// the pressure threshold, at least one permeability axis, and the
/// filter. Ties break to the lowest reservoir cell index because the
/// scan order is deterministic, first-seen wins.
pub fn find_start_cell(
    grid: &MainGrid,
    active_cell_info: &ActiveCellInfo,
    inputs: &ClusteringInputs,
    limits: &ClusteringLimits,
    assignment: &[i32],
) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for cell in 0..grid.cell_count() {
        if !active_cell_info.is_active(cell) || assignment[cell] != UNASSIGNED {
            continue;
        }
        if !grid.is_leaf_cell(cell) {
            continue;
        }
        let volume = inputs.volume[cell];
        if volume <= limits.volume {
            continue;
        }
        if inputs.pressure[cell] <= limits.pressure {
            continue;
        }
        let permeable = (0..3).any(|axis| inputs.permeability(axis)[cell] >= limits.permeability);
        if !permeable {
            continue;
        }
        if !inputs.passes_filter(cell) {
            continue;
        }
        match best {
            Some((_, best_volume)) if volume <= best_volume => {}
            _ => best = Some((cell, volume)),
        }
    }
    best.map(|(cell, _)| cell)
}

/// Directional transmissibility of the crossing from `cell` through
/// `face` to `neighbor`. POS faces read the value stored at the current
/// cell, NEG faces the one stored at the neighbor; the external dataset
/// stores face transmissibilities on the positive side.
fn face_transmissibility(
    inputs: &ClusteringInputs,
    cell: usize,
    neighbor: usize,
    face: FaceType,
) -> f64 {
    let values = inputs.transmissibility(face.axis());
    let source = if face.is_positive_direction() {
        cell
    } else {
        neighbor
    };
    values.get(source).copied().unwrap_or(0.0)
}

fn admit_neighbor(
    active_cell_info: &ActiveCellInfo,
    inputs: &ClusteringInputs,
    limits: &ClusteringLimits,
    cell: usize,
    neighbor: usize,
    face: FaceType,
) -> bool {
    if !active_cell_info.is_active(neighbor) {
        return false;
    }
    if inputs.volume[neighbor] <= limits.volume {
        return false;
    }
    if inputs.pressure[neighbor] <= limits.pressure {
        return false;
    }
    if inputs.permeability(face.axis())[neighbor] < limits.permeability {
        return false;
    }
    if face_transmissibility(inputs, cell, neighbor, face) < limits.transmissibility {
        return false;
    }
    inputs.passes_filter(neighbor)
}

/// Breadth-first growth from `start_cell`, bounded by `max_iterations`.
///
/// Admitted neighbors are marked with the transient candidate sentinel
/// so one iteration never admits a cell twice, then promoted to
/// `cluster_id` at iteration end. Returns the number of iterations
/// actually used; growth halts early when an iteration admits nothing.
pub fn grow_cluster(
    grid: &MainGrid,
    active_cell_info: &ActiveCellInfo,
    inputs: &ClusteringInputs,
    limits: &ClusteringLimits,
    assignment: &mut [i32],
    start_cell: usize,
    cluster_id: i32,
) -> usize {
    assignment[start_cell] = cluster_id;
    let mut frontier = vec![start_cell];

    for iteration in 0..limits.max_iterations {
        let mut candidates = Vec::new();
        for &cell in &frontier {
            for face in ALL_FACES {
                let Some(neighbor) = grid.cell_neighbor(cell, face) else {
                    continue;
                };
                if assignment[neighbor] != UNASSIGNED {
                    continue;
                }
                if admit_neighbor(active_cell_info, inputs, limits, cell, neighbor, face) {
                    assignment[neighbor] = CANDIDATE;
                    candidates.push(neighbor);
                }
            }
        }
        if candidates.is_empty() {
            debug!("cluster {cluster_id} converged after {iteration} iterations");
            return iteration;
        }
        for &cell in &candidates {
            assignment[cell] = cluster_id;
        }
        frontier = candidates;
    }
    limits.max_iterations
}

/// Full run: repeated seed search and growth until `max_clusters` are
/// found or no admissible start cell remains. Running out of start cells
/// is normal termination, not an error.
pub fn generate_clusters(
    grid: &MainGrid,
    active_cell_info: &ActiveCellInfo,
    inputs: &ClusteringInputs,
    limits: &ClusteringLimits,
) -> ClusteringResult {
    let mut assignment = vec![UNASSIGNED; grid.cell_count()];
    let mut num_clusters = 0;
    for cluster_id in 1..=limits.max_clusters {
        let Some(start) = find_start_cell(grid, active_cell_info, inputs, limits, &assignment)
        else {
            info!("no admissible start cell for cluster {cluster_id}, stopping");
            break;
        };
        grow_cluster(
            grid,
            active_cell_info,
            inputs,
            limits,
            &mut assignment,
            start,
            cluster_id as i32,
        );
        num_clusters = cluster_id;
    }
    ClusteringResult {
        assignment,
        num_clusters,
    }
}

/// Weighted arithmetic mean accumulator.
#[derive(Clone, Copy, Debug, Default)]
struct WeightedMeanCalculator {
    weighted_sum: f64,
    weight_sum: f64,
}

impl WeightedMeanCalculator {
    fn add(&mut self, value: f64, weight: f64) {
        self.weighted_sum += value * weight;
        self.weight_sum += weight;
    }

    fn mean(&self) -> f64 {
        if self.weight_sum > 0.0 {
            self.weighted_sum / self.weight_sum
        } else {
            0.0
        }
    }
}

/// Per-cluster summary: cell count, total volume, and pore-volume
/// weighted means of pressure and of the best permeability axis.
#[derive(Clone, Debug, Serialize)]
pub struct ClusterStatistics {
    pub id: usize,
    pub num_cells: usize,
    pub total_volume: f64,
    pub mean_pressure: f64,
    pub mean_permeability: f64,
}

pub fn generate_statistics(
    result: &ClusteringResult,
    inputs: &ClusteringInputs,
    pore_volume: &[f64],
) -> Vec<ClusterStatistics> {
    let mut stats: Vec<ClusterStatistics> = (1..=result.num_clusters)
        .map(|id| ClusterStatistics {
            id,
            num_cells: 0,
            total_volume: 0.0,
            mean_pressure: 0.0,
            mean_permeability: 0.0,
        })
        .collect();
    let mut pressure_means = vec![WeightedMeanCalculator::default(); result.num_clusters];
    let mut permeability_means = vec![WeightedMeanCalculator::default(); result.num_clusters];

    for (cell, &id) in result.assignment.iter().enumerate() {
        if id <= 0 {
            continue;
        }
        let slot = (id - 1) as usize;
        let weight = pore_volume.get(cell).copied().unwrap_or(0.0);
        stats[slot].num_cells += 1;
        stats[slot].total_volume += inputs.volume[cell];
        pressure_means[slot].add(inputs.pressure[cell], weight);
        let best_perm = inputs.permeability_x[cell]
            .max(inputs.permeability_y[cell])
            .max(inputs.permeability_z[cell]);
        permeability_means[slot].add(best_perm, weight);
    }
    for (slot, stat) in stats.iter_mut().enumerate() {
        stat.mean_pressure = pressure_means[slot].mean();
        stat.mean_permeability = permeability_means[slot].mean();
    }
    stats
}
