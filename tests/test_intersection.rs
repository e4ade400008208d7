use approx::assert_abs_diff_eq;
use nalgebra::{Point3, Vector3};
use resgrid::geometry::polygon_area;
use resgrid::{
    is_hex_intersected_by_plane, line_hex_intersection, plane_hex_intersection_polygons,
    BoundingBox, MainGrid, Plane,
};

fn unit_cube() -> [Point3<f64>; 8] {
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
fn unit_cube_against_x_planes() {
    let cube = unit_cube();
    let through = Plane::new(Point3::new(0.5, 0.5, 0.5), Vector3::new(1.0, 0.0, 0.0));
    let outside = Plane::new(Point3::new(1.5, 1.5, 1.5), Vector3::new(1.0, 0.0, 0.0));
    assert!(is_hex_intersected_by_plane(&cube, &through));
    assert!(!is_hex_intersected_by_plane(&cube, &outside));
}

#[test]
fn tilted_plane_cut_assembles_one_polygon() {
    let cube = unit_cube();
    let plane = Plane::new(Point3::new(0.5, 0.5, 0.5), Vector3::new(1.0, 1.0, 1.0));
    let polygons = plane_hex_intersection_polygons(&cube, &plane, 1e-6);
    assert_eq!(polygons.len(), 1);
    // a body-diagonal midplane cut of a cube is a hexagon
    assert_eq!(polygons[0].len(), 6);
    for p in &polygons[0] {
        assert_abs_diff_eq!(p.x + p.y + p.z, 1.5, epsilon = 1e-9);
    }
}

#[test]
fn degenerate_cell_is_skipped_not_an_error() {
    let collapsed = [Point3::new(1.0, 1.0, 1.0); 8];
    let plane = Plane::new(Point3::new(1.0, 1.0, 1.0), Vector3::new(1.0, 0.0, 0.0));
    let polygons = plane_hex_intersection_polygons(&collapsed, &plane, 1e-6);
    assert!(polygons.is_empty());
    assert!(line_hex_intersection(
        &Point3::new(0.0, 1.0, 1.0),
        &Point3::new(2.0, 1.0, 1.0),
        &collapsed
    )
    .is_empty());
}

#[test]
fn ray_length_through_cell() {
    let cube = unit_cube();
    let points = line_hex_intersection(
        &Point3::new(-1.0, 0.5, 0.5),
        &Point3::new(3.0, 0.5, 0.5),
        &cube,
    );
    assert_eq!(points.len(), 2);
    let length = (points[1] - points[0]).norm();
    assert_abs_diff_eq!(length, 1.0, epsilon = 1e-9);
}

#[test]
fn segment_starting_inside_exits_once() {
    let cube = unit_cube();
    let points = line_hex_intersection(
        &Point3::new(0.5, 0.5, 0.5),
        &Point3::new(2.0, 0.5, 0.5),
        &cube,
    );
    assert_eq!(points.len(), 2);
    assert_abs_diff_eq!(points[0].x, 0.5, epsilon = 1e-9);
    assert_abs_diff_eq!(points[1].x, 1.0, epsilon = 1e-9);
}

#[test]
fn grid_plane_scan_collects_cut_cells_only() {
    let mut grid = MainGrid::uniform(3, 1, 1, 1.0, 1.0, 1.0);
    grid.compute_cached_data();

    let plane = Plane::new(Point3::new(1.5, 0.5, 0.5), Vector3::new(1.0, 0.0, 0.0));
    let search = BoundingBox::new(Point3::new(0.0, 0.0, 0.0), Point3::new(3.0, 1.0, 1.0));
    let per_cell = resgrid::hex_intersect::grid_plane_intersection_polygons(&grid, &plane, &search, 1e-6);

    let mut cells: Vec<usize> = per_cell.iter().map(|(c, _)| *c).collect();
    cells.sort_unstable();
    assert_eq!(cells, vec![1]);
    let (_, polygons) = &per_cell[0];
    assert_eq!(polygons.len(), 1);
    assert_abs_diff_eq!(polygon_area(&polygons[0]), 1.0, epsilon = 1e-9);
}
