use nalgebra::Point3;
use resgrid::{cell_twist_count, cell_volume, FaceType, MainGrid};

#[test]
fn three_cubed_index_and_neighbor_lookup() {
    let grid = MainGrid::uniform(3, 3, 3, 1.0, 1.0, 1.0);
    let root = grid.root_grid();

    assert_eq!(root.cell_index_from_ijk(1, 1, 1).unwrap(), 13);
    assert_eq!(root.ijk_neighbor(1, 1, 1, FaceType::PosI), Some((2, 1, 1)));
    assert_eq!(root.cell_index_from_ijk(2, 1, 1).unwrap(), 14);
    assert_eq!(grid.cell_neighbor(13, FaceType::PosI), Some(14));
    assert_eq!(grid.cell_neighbor(13, FaceType::NegK), Some(4));
}

#[test]
fn guarded_lookups_fail_cleanly() {
    let grid = MainGrid::uniform(2, 2, 2, 1.0, 1.0, 1.0);
    let root = grid.root_grid();
    assert!(root.cell_index_from_ijk(2, 0, 0).is_err());
    assert!(root.ijk_from_cell_index(8).is_err());
    assert!(grid.cell(99).is_err());
}

#[test]
fn ijk_roundtrip_covers_whole_grid() {
    let grid = MainGrid::uniform(4, 3, 2, 1.0, 1.0, 1.0);
    let root = grid.root_grid();
    for idx in 0..root.cell_count() {
        let (i, j, k) = root.ijk_from_cell_index(idx).unwrap();
        assert_eq!(root.cell_index_from_ijk(i, j, k).unwrap(), idx);
    }
}

#[test]
fn uniform_grid_cells_are_sane_hexahedra() {
    let grid = MainGrid::uniform(3, 2, 2, 10.0, 20.0, 5.0);
    for idx in 0..grid.cell_count() {
        let corners = grid.cell_corners(idx).unwrap();
        assert!((cell_volume(&corners) - 1000.0).abs() < 1e-9);
        assert_eq!(cell_twist_count(&corners), 0);
    }
}

#[test]
fn spatial_queries_require_cached_data() {
    let grid = MainGrid::uniform(2, 2, 2, 1.0, 1.0, 1.0);
    // tree never built: visible failure, empty result
    assert!(!grid.is_search_tree_built());
    let bbox = grid.bounding_box();
    assert!(grid.find_intersecting_cells(&bbox).is_empty());
}

#[test]
fn point_lookup_resolves_interior_and_shared_faces() {
    let mut grid = MainGrid::uniform(3, 3, 3, 1.0, 1.0, 1.0);
    grid.compute_cached_data();

    assert_eq!(
        grid.find_reservoir_cell_index_from_point(&Point3::new(1.5, 1.5, 1.5)),
        Some(13)
    );
    // the face at x = 2 between cells (1,1,1) and (2,1,1) has one owner
    assert_eq!(
        grid.find_reservoir_cell_index_from_point(&Point3::new(2.0, 1.5, 1.5)),
        Some(14)
    );
    assert_eq!(
        grid.find_reservoir_cell_index_from_point(&Point3::new(5.0, 1.5, 1.5)),
        None
    );
}

#[test]
fn local_refinement_partitions_the_index_space() {
    let mut grid = MainGrid::uniform(2, 2, 1, 1.0, 1.0, 1.0);
    let coarse_count = grid.cell_count();

    // refine cell 0 into a 2x2x1 lattice with its own nodes
    let node_base = grid.nodes().len();
    let mut extra_nodes = Vec::new();
    for k in 0..2 {
        for j in 0..3 {
            for i in 0..3 {
                extra_nodes.push(Point3::new(i as f64 * 0.5, j as f64 * 0.5, k as f64));
            }
        }
    }
    let n = |i: usize, j: usize, k: usize| node_base + i + j * 3 + k * 9;
    let mut lgr_cells = Vec::new();
    for j in 0..2 {
        for i in 0..2 {
            lgr_cells.push(resgrid::Cell::new(
                [
                    n(i, j, 0),
                    n(i + 1, j, 0),
                    n(i + 1, j + 1, 0),
                    n(i, j + 1, 0),
                    n(i, j, 1),
                    n(i + 1, j, 1),
                    n(i + 1, j + 1, 1),
                    n(i, j + 1, 1),
                ],
                0,
            ));
        }
    }
    let lgr = grid
        .add_local_grid("LGR1", 2, 2, 1, 0, extra_nodes, lgr_cells, &[0])
        .unwrap();
    grid.compute_cached_data();

    let sub = grid.grid(lgr).unwrap();
    assert_eq!(sub.cell_start, coarse_count);
    assert_eq!(sub.cell_count(), 4);
    assert_eq!(grid.cell_count(), coarse_count + 4);
    assert!(!grid.is_leaf_cell(0));

    // a point inside the refined region resolves to an LGR cell
    let hit = grid
        .find_reservoir_cell_index_from_point(&Point3::new(0.25, 0.25, 0.5))
        .unwrap();
    assert!(hit >= coarse_count);
}
