use approx::assert_abs_diff_eq;
use nalgebra::Point3;
use resgrid::polygon::{polygon_area_2d, HUGE_Z};
use resgrid::{
    clip_polyline_by_polygon, point_inside_polygon_2d, polygon_intersection, simplify_polyline,
    union_of_polygons, ClipZPolicy,
};

#[test]
fn rdp_drops_near_collinear_but_keeps_spikes() {
    let points = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.01, 0.0),
        Point3::new(2.0, 0.0, 0.0),
        Point3::new(3.0, 5.0, 0.0),
        Point3::new(4.0, 0.0, 0.0),
    ];
    let simplified = simplify_polyline(&points, 0.1);
    assert!(!simplified.contains(&Point3::new(1.0, 0.01, 0.0)));
    assert!(simplified.contains(&Point3::new(3.0, 5.0, 0.0)));
    assert_eq!(simplified.first(), points.first());
    assert_eq!(simplified.last(), points.last());
}

#[test]
fn rdp_is_idempotent_for_any_epsilon() {
    let points = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.3, 0.2),
        Point3::new(2.0, -0.1, 0.0),
        Point3::new(3.0, 2.0, 1.0),
        Point3::new(4.0, 0.0, 0.0),
        Point3::new(5.0, 0.05, 0.0),
        Point3::new(6.0, 0.0, 0.0),
    ];
    for epsilon in [0.0, 0.01, 0.5, 10.0] {
        let once = simplify_polyline(&points, epsilon);
        let twice = simplify_polyline(&once, epsilon);
        assert_eq!(once, twice, "epsilon {epsilon}");
    }
}

#[test]
fn clip_against_own_bounding_box_is_identity() {
    let a = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(2.0, 0.0, 0.0),
        Point3::new(1.0, 1.5, 0.0),
    ];
    let bbox = vec![
        Point3::new(-0.1, -0.1, 0.0),
        Point3::new(2.1, -0.1, 0.0),
        Point3::new(2.1, 1.6, 0.0),
        Point3::new(-0.1, 1.6, 0.0),
    ];
    let result = polygon_intersection(&a, &bbox);
    assert_eq!(result.len(), 1);
    assert_abs_diff_eq!(polygon_area_2d(&result[0]), polygon_area_2d(&a), epsilon = 1e-9);
    // every original vertex survives, up to rotation
    for v in &a {
        assert!(result[0]
            .iter()
            .any(|p| (p.x - v.x).abs() < 1e-9 && (p.y - v.y).abs() < 1e-9));
    }
}

#[test]
fn union_merges_overlapping_footprints() {
    let a = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(2.0, 0.0, 0.0),
        Point3::new(2.0, 1.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
    ];
    let b = vec![
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(3.0, 0.0, 0.0),
        Point3::new(3.0, 1.0, 0.0),
        Point3::new(1.0, 1.0, 0.0),
    ];
    let outer = union_of_polygons(&[a, b]);
    assert_abs_diff_eq!(polygon_area_2d(&outer), 3.0, epsilon = 1e-9);
}

#[test]
fn winding_number_handles_concave_polygons() {
    // L-shape
    let poly = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(2.0, 0.0, 0.0),
        Point3::new(2.0, 1.0, 0.0),
        Point3::new(1.0, 1.0, 0.0),
        Point3::new(1.0, 2.0, 0.0),
        Point3::new(0.0, 2.0, 0.0),
    ];
    assert!(point_inside_polygon_2d(&Point3::new(0.5, 1.5, 0.0), &poly));
    assert!(!point_inside_polygon_2d(&Point3::new(1.5, 1.5, 0.0), &poly));
}

fn unit_square() -> Vec<Point3<f64>> {
    vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(1.0, 1.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
    ]
}

#[test]
fn polyline_clip_interpolates_z_along_the_line() {
    let polyline = vec![Point3::new(-1.0, 0.5, 10.0), Point3::new(2.0, 0.5, 40.0)];
    let pieces = clip_polyline_by_polygon(&polyline, &unit_square(), ClipZPolicy::InterpolateFromLine);
    assert_eq!(pieces.len(), 1);
    let piece = &pieces[0];
    let entry = piece.first().unwrap();
    let exit = piece.last().unwrap();
    assert!((entry.x - 0.0).abs() < 1e-6 || (entry.x - 1.0).abs() < 1e-6);
    // z runs 10 at x=-1 to 40 at x=2, so 20 at x=0 and 30 at x=1
    let expected = |x: f64| 10.0 + (x + 1.0) * 10.0;
    assert_abs_diff_eq!(entry.z, expected(entry.x), epsilon = 1e-6);
    assert_abs_diff_eq!(exit.z, expected(exit.x), epsilon = 1e-6);
}

#[test]
fn polyline_clip_sentinel_and_zero_policies() {
    let polyline = vec![Point3::new(-1.0, 0.5, 10.0), Point3::new(2.0, 0.5, 40.0)];
    let huge = clip_polyline_by_polygon(&polyline, &unit_square(), ClipZPolicy::HugeValue);
    for piece in &huge {
        for p in piece {
            assert_eq!(p.z, HUGE_Z);
        }
    }
    let zero = clip_polyline_by_polygon(&polyline, &unit_square(), ClipZPolicy::Zero);
    for piece in &zero {
        for p in piece {
            assert_eq!(p.z, 0.0);
        }
    }
}
