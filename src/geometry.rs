use nalgebra::{Point3, Vector3};

/// Infinite plane in point-normal form.
#[derive(Clone, Copy, Debug)]
pub struct Plane {
    pub point: Point3<f64>,
    pub normal: Vector3<f64>,
}

impl Plane {
    pub fn new(point: Point3<f64>, normal: Vector3<f64>) -> Self {
        Self { point, normal }
    }

    /// Plane through three points. `None` when the points are collinear.
    pub fn from_points(a: Point3<f64>, b: Point3<f64>, c: Point3<f64>) -> Option<Self> {
        let normal = (b - a).cross(&(c - a));
        if normal.norm_squared() == 0.0 {
            return None;
        }
        Some(Self { point: a, normal })
    }

    /// Signed distance scaled by the (non-unit) normal length.
    ///
    /// The sign is all the straddle tests need, so the normal is left
    /// unnormalized.
    #[inline]
    pub fn distance_scaled(&self, p: &Point3<f64>) -> f64 {
        self.normal.dot(&(p - self.point))
    }

    /// Intersection of the segment `a`-`b` with the plane.
    ///
    /// Returns the intersection point when the segment crosses or touches
    /// the plane within `tolerance` of its interior, `None` when the
    /// segment is parallel or the crossing lies outside `[0, 1]`.
    pub fn line_intersection(
        &self,
        a: &Point3<f64>,
        b: &Point3<f64>,
        tolerance: f64,
    ) -> Option<Point3<f64>> {
        let dir = b - a;
        let denom = self.normal.dot(&dir);
        if denom == 0.0 {
            return None;
        }
        let t = self.normal.dot(&(self.point - a)) / denom;
        if t < -tolerance || t > 1.0 + tolerance {
            return None;
        }
        Some(a + dir * t.clamp(0.0, 1.0))
    }
}

/// Best-fit plane through the 4 corners of a possibly non-planar quad.
///
/// Uses the first 3 distinct corners; returns `None` when fewer than 3
/// distinct points exist (collapsed face).
pub fn best_fit_quad_plane(quad: &[Point3<f64>; 4]) -> Option<Plane> {
    let mut distinct: Vec<Point3<f64>> = Vec::with_capacity(4);
    for p in quad {
        if !distinct
            .iter()
            .any(|q| (p - q).norm_squared() < f64::EPSILON)
        {
            distinct.push(*p);
        }
    }
    if distinct.len() < 3 {
        return None;
    }
    Plane::from_points(distinct[0], distinct[1], distinct[2])
}

/// Project `p` onto the infinite line through `a` and `b`.
pub fn project_point_on_line(a: &Point3<f64>, b: &Point3<f64>, p: &Point3<f64>) -> Point3<f64> {
    let dir = b - a;
    let len_sq = dir.norm_squared();
    if len_sq == 0.0 {
        return *a;
    }
    let t = (p - a).dot(&dir) / len_sq;
    a + dir * t
}

/// Perpendicular distance from `p` to the infinite line through `a` and `b`.
#[inline]
pub fn point_line_distance(a: &Point3<f64>, b: &Point3<f64>, p: &Point3<f64>) -> f64 {
    (p - project_point_on_line(a, b, p)).norm()
}

/// Area-weighted normal of a planar (or nearly planar) polygon.
///
/// Newell's method; the returned vector's length is twice the polygon area.
pub fn polygon_area_normal(polygon: &[Point3<f64>]) -> Vector3<f64> {
    let mut normal = Vector3::zeros();
    if polygon.len() < 3 {
        return normal;
    }
    for i in 0..polygon.len() {
        let a = &polygon[i];
        let b = &polygon[(i + 1) % polygon.len()];
        normal.x += (a.y - b.y) * (a.z + b.z);
        normal.y += (a.z - b.z) * (a.x + b.x);
        normal.z += (a.x - b.x) * (a.y + b.y);
    }
    normal
}

/// Polygon area from the Newell normal.
#[inline]
pub fn polygon_area(polygon: &[Point3<f64>]) -> f64 {
    0.5 * polygon_area_normal(polygon).norm()
}

/// Signed volume of the tetrahedron (a, b, c, d), times 6.
#[inline]
pub fn tet_volume6(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>, d: &Point3<f64>) -> f64 {
    (b - a).cross(&(c - a)).dot(&(d - a))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_plane_rejects_collapsed_face() {
        let p = Point3::new(1.0, 2.0, 3.0);
        let quad = [p, p, p, Point3::new(2.0, 2.0, 3.0)];
        assert!(best_fit_quad_plane(&quad).is_none());
    }

    #[test]
    fn unit_square_area() {
        let poly = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        assert!((polygon_area(&poly) - 1.0).abs() < 1e-12);
    }
}
