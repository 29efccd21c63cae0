//! Multiple-scattering deflection of a track crossing a thin shell.

use std::f64::consts::TAU;

use rand::Rng;
use rand_distr::StandardNormal;

use geometry::{Material, Point, Vector};
use units::todo::{Anglef64, Lengthf64};

use crate::track::Track;

/// Fixed effective scattering angle, in radians
pub const FIXED_THETA0: Anglef64 = 1e-3;

/// How the effective scattering angle θ₀ is chosen
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Scattering {
    /// Tracks continue undeflected
    Off,
    /// The same θ₀ for every crossing
    Fixed(Anglef64),
    /// θ₀ from the Highland formula, which needs the track's kinematics
    Highland,
}

impl Scattering {

    /// Effective angle θ₀ for `track` crossing `thickness` of `material`
    pub fn theta0(&self, track: &Track, material: &Material, thickness: Lengthf64) -> Anglef64 {
        match *self {
            Scattering::Off             => 0.0,
            Scattering::Fixed(theta0)   => theta0,
            Scattering::Highland        => highland(track, material, thickness),
        }
    }

    /// The track leaving the interaction at `point`.
    ///
    /// Draws the azimuth of the deflection uniformly in [0, 2π) and then its
    /// polar angle from a Gaussian of width θ₀. Nothing is drawn when
    /// scattering is off.
    pub fn scatter<R: Rng + ?Sized>(
        &self,
        track: &Track,
        point: Point,
        material: &Material,
        thickness: Lengthf64,
        rng: &mut R,
    ) -> Track {
        if let Scattering::Off = self {
            return track.continuation(point, track.momentum)
        }
        let theta0 = self.theta0(track, material, thickness);
        let phi_p  : Anglef64 = rng.gen_range(0.0..TAU);
        let theta_p: Anglef64 = theta0 * rng.sample::<f64, _>(StandardNormal);
        track.continuation(point, deflect(&track.momentum, theta_p, phi_p))
    }
}

/// `θ₀ = 13.6 MeV / (βcp) · Z · √(x/X₀) · (1 + 0.038 ln(x/X₀))`
pub fn highland(track: &Track, material: &Material, thickness: Lengthf64) -> Anglef64 {
    let beta_p = track.beta() * track.momentum_magnitude();
    if beta_p == 0.0 { return 0.0 }
    let x = thickness / material.radiation_length;
    0.0136 / beta_p * material.atomic_number * x.sqrt() * (1.0 + 0.038 * x.ln())
}

/// Rotate `momentum` by polar angle `theta_p` and azimuth `phi_p`, both
/// measured relative to the direction of `momentum` itself.
pub fn deflect(momentum: &Vector, theta_p: Anglef64, phi_p: Anglef64) -> Vector {
    let p = momentum.norm();
    if p == 0.0 { return *momentum }
    let theta = (momentum.z / p).clamp(-1.0, 1.0).acos();
    let phi   = momentum.y.atan2(momentum.x);
    let (st, ct) = theta.sin_cos();
    let (sp, cp) = phi  .sin_cos();
    // Columns: two unit vectors perpendicular to the incoming direction,
    // then the incoming direction itself
    let rotation = nalgebra::Matrix3::new(
        -sp, -cp * ct, st * cp,
         cp, -ct * sp, st * sp,
        0.0,       st,      ct,
    );
    let (stp, ctp) = theta_p.sin_cos();
    let local = Vector::new(stp * phi_p.cos(), stp * phi_p.sin(), ctp);
    p * (rotation * local)
}
