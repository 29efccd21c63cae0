use units::todo::{Lengthf64, Timef64};
use crate::{Point, Shell, Vector};

/// Roots closer to the start of a track than this are taken to be the point
/// where the track was created, and are ignored.
pub const EPS: Timef64 = 1e-9;

/// Where, when and on which shell a straight track first interacts
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Intersection {
    pub shell: usize,
    pub time: Timef64,
    pub point: Point,
}

/// Parameters at which the line `start + t * velocity` crosses the infinite
/// cylinder of radius `radius` around the z-axis, smaller one first.
///
/// `None` if the line misses the cylinder or runs parallel to its axis.
pub fn circle_crossing_times(start: &Point, velocity: &Vector, radius: Lengthf64) -> Option<(Timef64, Timef64)> {
    // Viète coefficients of a t² + 2b t + c = 0
    let a = velocity.x * velocity.x + velocity.y * velocity.y;
    let b = start.x * velocity.x + start.y * velocity.y;
    let c = start.x * start.x + start.y * start.y - radius * radius;
    if a == 0.0 { return None }
    let discriminant = b * b - a * c;
    if discriminant < 0.0 { return None }
    let root = discriminant.sqrt();
    Some(((-b - root) / a, (-b + root) / a))
}

/// Find the earliest interaction of a straight track with any of `shells`.
///
/// Shells are examined in slice order and a root only replaces the current
/// best if it is strictly earlier, so on ties the first shell wins. A root is
/// accepted only if it lies beyond `EPS` and its z falls inside the shell's
/// half-length.
pub fn first_intersection(start: &Point, velocity: &Vector, shells: &[Shell]) -> Option<Intersection> {
    let mut best: Option<Intersection> = None;
    for shell in shells {
        let Some((early, late)) = circle_crossing_times(start, velocity, shell.radius) else { continue };
        for time in [early, late] {
            if time <= EPS { continue }
            if best.map_or(false, |b| time >= b.time) { continue }
            let point = start + velocity * time;
            if shell.covers(point.z) {
                best = Some(Intersection { shell: shell.index, time, point });
            }
        }
    }
    best
}
