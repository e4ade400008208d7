use nalgebra::Point3;
use resgrid::geometry::polygon_area;
use resgrid::{calculate_cell_face_overlap, Cell, CellRange, FaceType, Fault, MainGrid};
use resgrid::results::ActiveCellInfo;

/// 2x1x2 grid with half a cell of vertical throw between the two i
/// columns. Every cell owns its 8 nodes so the columns can slide freely.
///
///   i=0 column: cells 0 (z 0..1) and 2 (z 1..2)
///   i=1 column: cells 1 (z 0.5..1.5) and 3 (z 1.5..2.5)
fn faulted_grid() -> MainGrid {
    let hex = |x0: f64, z0: f64| -> Vec<Point3<f64>> {
        vec![
            Point3::new(x0, 0.0, z0),
            Point3::new(x0 + 1.0, 0.0, z0),
            Point3::new(x0 + 1.0, 1.0, z0),
            Point3::new(x0, 1.0, z0),
            Point3::new(x0, 0.0, z0 + 1.0),
            Point3::new(x0 + 1.0, 0.0, z0 + 1.0),
            Point3::new(x0 + 1.0, 1.0, z0 + 1.0),
            Point3::new(x0, 1.0, z0 + 1.0),
        ]
    };
    let mut nodes = Vec::new();
    // cell layout is i fastest: (0,0,0), (1,0,0), (0,0,1), (1,0,1)
    for (x0, z0) in [(0.0, 0.0), (1.0, 0.5), (0.0, 1.0), (1.0, 1.5)] {
        nodes.extend(hex(x0, z0));
    }
    let cells = (0..4)
        .map(|c| Cell::new(std::array::from_fn(|i| c * 8 + i), 0))
        .collect();
    let mut grid = MainGrid::from_root(2, 1, 2, nodes, cells);

    let mut fault = Fault::new("THROW");
    fault.add_cell_range(
        FaceType::PosI,
        CellRange {
            min: (0, 0, 0),
            max: (0, 0, 1),
        },
    );
    grid.faults.push(fault);

    grid.compute_cached_data();
    grid.calculate_faults(&ActiveCellInfo::all_active(4));
    grid
}

#[test]
fn fault_scan_discovers_the_offset_connection() {
    let mut grid = faulted_grid();
    grid.nnc_data.set_native_connections(&[(0, 1)]);
    grid.process_all_connection_data();

    let connections = &grid.nnc_data.connections;
    // the native pair plus the discovered (2, 1) across the throw
    assert_eq!(connections.len(), 2);
    assert!(connections.has_common_area(0));
    assert!((polygon_area(connections.polygon(0)) - 0.5).abs() < 1e-9);

    let (c1, c2) = connections.cell_pair(1);
    assert_eq!((c1, c2), (2, 1));
    assert_eq!(connections.face(1), Some(FaceType::PosI));
    assert!((polygon_area(connections.polygon(1)) - 0.5).abs() < 1e-9);
}

#[test]
fn discovery_is_idempotent() {
    let mut grid = faulted_grid();
    grid.nnc_data.set_native_connections(&[(0, 1)]);
    grid.process_all_connection_data();
    let count_after_first = grid.nnc_data.connections.len();

    grid.process_all_connection_data();
    assert_eq!(grid.nnc_data.connections.len(), count_after_first);
}

#[test]
fn connections_are_attached_to_their_fault() {
    let mut grid = faulted_grid();
    grid.nnc_data.set_native_connections(&[(0, 1)]);
    grid.process_all_connection_data();

    let fault = grid.faults.iter().find(|f| f.name == "THROW").unwrap();
    assert_eq!(fault.connection_indices.len(), 2);
}

#[test]
fn scalar_series_stay_aligned_after_discovery() {
    let mut grid = faulted_grid();
    grid.nnc_data.set_native_connections(&[(0, 1)]);
    grid.nnc_data.set_scalar_result("TRANNNC", vec![0.25]);
    grid.process_all_connection_data();

    let values = grid.nnc_data.scalar_result("TRANNNC").unwrap();
    assert_eq!(values.len(), grid.nnc_data.connections.len());
    assert_eq!(values[0], 0.25);
    assert!(values[1..].iter().all(|&v| v == 0.0));
}

#[test]
fn face_overlap_is_symmetric_between_neighbors() {
    let grid = faulted_grid();
    let ab = calculate_cell_face_overlap(&grid, 0, 1, 1e-6).unwrap();
    let ba = calculate_cell_face_overlap(&grid, 1, 0, 1e-6).unwrap();
    assert_eq!(ab.face, FaceType::PosI);
    assert_eq!(ba.face, FaceType::NegI);
    assert!((polygon_area(&ab.polygon) - polygon_area(&ba.polygon)).abs() < 1e-9);
}
