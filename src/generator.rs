//! Particle gun: primary vertices and the particles emerging from them.

use rand::Rng;
use rand::distributions::Distribution;

use geometry::{Point, Vector};
use units::todo::Massf64;

use crate::distribution::Empirical1D;
use crate::store::PrimaryVertex;
use crate::track::{Event, Track};

#[derive(Clone, Debug)]
pub struct ParticleGun {
    pub multiplicity: Empirical1D,
    /// GeV/c
    pub momentum: Empirical1D,
    pub eta: Empirical1D,
    pub phi: Empirical1D,
    /// Beam spot, mm
    pub x: Empirical1D,
    pub y: Empirical1D,
    pub z: Empirical1D,
    pub mass: Massf64,
    pub charge: i32,
    /// Without kinematics no momentum magnitude is drawn: every particle
    /// carries 1 GeV/c.
    pub kinematics: bool,
}

impl ParticleGun {

    /// Generate one collision, adding its primary tracks and vertex to `event`.
    ///
    /// Draws the multiplicity and the vertex x, y, z, then for each particle
    /// its momentum (with kinematics only), pseudorapidity and azimuth.
    pub fn fire<R: Rng + ?Sized>(&self, event: &mut Event, rng: &mut R) -> PrimaryVertex {
        let multiplicity = self.multiplicity.sample(rng).max(0.0) as u32;
        let x = self.x.sample(rng);
        let y = self.y.sample(rng);
        let z = self.z.sample(rng);
        let origin = Point::new(x, y, z);
        for _ in 0..multiplicity {
            let p   = if self.kinematics { self.momentum.sample(rng) } else { 1.0 };
            let eta = self.eta.sample(rng);
            let phi = self.phi.sample(rng);
            let id = event.next_particle_id();
            event.tracks.push(Track::new(momentum(p, eta, phi), origin, self.mass, self.charge, id, event.id));
        }
        let vertex = PrimaryVertex { x, y, z, multiplicity, event_id: event.id };
        event.vertices.push(vertex);
        vertex
    }
}

/// Momentum vector of magnitude `p` in direction (η, φ)
pub fn momentum(p: f64, eta: f64, phi: f64) -> Vector {
    let theta = polar_angle(eta);
    let (st, ct) = theta.sin_cos();
    p * Vector::new(st * phi.cos(), st * phi.sin(), ct)
}

/// θ = 2 atan(exp(-η))
pub fn polar_angle(eta: f64) -> f64 { 2.0 * (-eta).exp().atan() }
