use std::f64::consts::{PI, TAU};
use units::todo::{Anglef64, Lengthf64};
use crate::Point;

/// Azimuthal angle of the transverse position `(x, y)`, in `[0, 2π)`
pub fn azimuth(x: Lengthf64, y: Lengthf64) -> Anglef64 {
    let phi = y.atan2(x);
    if phi >= 0.0 { return phi }
    let phi = phi + TAU;
    // A tiny negative angle rounds up to 2π
    if phi < TAU { phi } else { 0.0 }
}

/// `to - from`, wrapped into `(-π, π]`. Both inputs must lie in `[0, 2π)`.
pub fn delta_azimuth(from: Anglef64, to: Anglef64) -> Anglef64 {
    let delta = to - from;
    if      delta >   PI { delta - TAU }
    else if delta <= -PI { delta + TAU }
    else                 { delta }
}

pub fn transverse_radius(p: &Point) -> Lengthf64 { p.x.hypot(p.y) }

/// Move `point` across the surface of the cylinder (around the z-axis) on
/// which it lies: by `arc` along the circumference and by `dz` along the axis.
pub fn displace_on_cylinder(point: &Point, arc: Lengthf64, dz: Lengthf64) -> Point {
    let r = transverse_radius(point);
    if r == 0.0 { return Point::new(point.x, point.y, point.z + dz) }
    let phi = point.y.atan2(point.x) + arc / r;
    Point::new(r * phi.cos(), r * phi.sin(), point.z + dz)
}

/// z-coordinate of the point of closest transverse approach to the beam axis,
/// of the line through `inner` and `outer`.
///
/// `None` if the line is parallel to the axis.
pub fn z_intercept(inner: &Point, outer: &Point) -> Option<Lengthf64> {
    let d = outer - inner;
    let aa = d.x * d.x + d.y * d.y;
    if aa == 0.0 { return None }
    let t = -(inner.x * d.x + inner.y * d.y) / aa;
    Some(inner.z + t * d.z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use proptest::prelude::*;
    use float_eq::assert_float_eq;

    #[rstest(/**/  x,    y,   expected,
             case(-1.0,  1.0, (-1.0_f64).atan() + PI),
             case( 1.0, -1.0, (-1.0_f64).atan() + TAU),
             case( 1.0,  1.0,  1.0_f64.atan()),
             case( 0.0,  1.0,  PI / 2.0),             // no division by zero on the y-axis
             case( 0.0, -1.0,  3.0 * PI / 2.0),
             case(-1.0,  0.0,  PI),
             case( 2.0,  0.0,  0.0),
             case( 1.0, -1e-300, 0.0),                // would otherwise round to 2π
    )]
    fn azimuth_quadrants(x: f64, y: f64, expected: f64) {
        assert_float_eq!(azimuth(x, y), expected, ulps <= 2);
    }

    #[rstest(/**/ from,        to,        expected,
             case(0.1,         0.3,        0.2),
             case(0.3,         0.1,       -0.2),
             case(TAU - 0.1,   0.1,        0.2), // across the 0/2π seam
             case(0.1,         TAU - 0.1, -0.2),
    )]
    fn delta_azimuth_is_wrapped(from: f64, to: f64, expected: f64) {
        assert_float_eq!(delta_azimuth(from, to), expected, abs <= 1e-12);
    }

    #[test]
    fn z_intercept_of_known_line() {
        // Line through (0, 0, 7) with slope dz/dr = 2 along x
        let inner = Point::new(40.0, 0.0,  87.0);
        let outer = Point::new(70.0, 0.0, 147.0);
        assert_float_eq!(z_intercept(&inner, &outer).unwrap(), 7.0, abs <= 1e-12);
    }

    #[test]
    fn z_intercept_of_axis_parallel_line() {
        let inner = Point::new(40.0, 0.0,  0.0);
        let outer = Point::new(40.0, 0.0, 10.0);
        assert_eq!(z_intercept(&inner, &outer), None);
    }

    proptest! {
        #[test]
        fn z_intercept_recovers_vertex(
            z0  in -300.0 .. 300.0_f64,
            phi in    0.0 .. TAU,
            cot in   -3.0 ..   3.0_f64,
        ) {
            let at = |r: f64| Point::new(r * phi.cos(), r * phi.sin(), z0 + r * cot);
            let z = z_intercept(&at(40.0), &at(70.0)).unwrap();
            assert_float_eq!(z, z0, abs <= 1e-9);
        }

        #[test]
        fn displacement_stays_on_cylinder(
            phi in 0.0 .. TAU,
            arc in -1.0 .. 1.0_f64,
            dz  in -1.0 .. 1.0_f64,
        ) {
            let p = Point::new(40.0 * phi.cos(), 40.0 * phi.sin(), 12.0);
            let q = displace_on_cylinder(&p, arc, dz);
            assert_float_eq!(transverse_radius(&q), 40.0, abs <= 1e-9);
            assert_float_eq!(q.z, 12.0 + dz, abs <= 1e-12);
            let moved = delta_azimuth(azimuth(p.x, p.y), azimuth(q.x, q.y)) * 40.0;
            assert_float_eq!(moved, arc, abs <= 1e-9);
        }
    }
}
