//! Concentric cylindrical shells around the beam (z) axis, and the geometric
//! queries that transport and reconstruction ask of them.

pub use nalgebra;

use units::todo::Lengthf64;

pub type Point  = nalgebra::Point3 <Lengthf64>;
pub type Vector = nalgebra::Vector3<f64>;

mod shell;
mod cylinder;
mod cylindrical;

pub use shell::{Geometry, Material, Shell, PIPE, INNER, OUTER};
pub use cylinder::{circle_crossing_times, first_intersection, Intersection, EPS};
pub use cylindrical::{azimuth, delta_azimuth, displace_on_cylinder, transverse_radius, z_intercept};
