//! Soft-particle noise on the silicon layers.

use rand::Rng;
use rand::distributions::Distribution;

use geometry::{Geometry, Point, INNER, OUTER};

use crate::distribution::{Empirical1D, Empirical2D};
use crate::store::DetectorHit;
use crate::track::{Event, Hit};

/// Extra hits which belong to no simulated particle
#[derive(Clone, Debug)]
pub struct DetectorNoise {
    pub inner_count: Empirical1D,
    pub outer_count: Empirical1D,
    /// Positions as (φ, z) on the inner layer
    pub inner_map: Empirical2D,
    /// Positions as (φ, z) on the outer layer
    pub outer_map: Empirical2D,
}

impl DetectorNoise {

    /// Noise hits for one event: both counts are drawn first, then the
    /// positions of the inner hits, then those of the outer ones.
    pub fn generate<R: Rng + ?Sized>(&self, geometry: &Geometry, event: &mut Event, rng: &mut R) -> Vec<DetectorHit> {
        let n_inner = self.inner_count.sample(rng).max(0.0) as usize;
        let n_outer = self.outer_count.sample(rng).max(0.0) as usize;
        let layers = std::iter::repeat((INNER, &self.inner_map)).take(n_inner)
            .chain(std::iter::repeat((OUTER, &self.outer_map)).take(n_outer));
        let mut hits = Vec::with_capacity(n_inner + n_outer);
        for (shell, map) in layers {
            let (phi, z) = map.sample(rng);
            let r = geometry.shell(shell).radius;
            let position = Point::new(r * phi.cos(), r * phi.sin(), z);
            let hit_id = event.next_hit_id();
            event.hits.push(Hit { position, time: 0.0, sensitive: true, shell, energy_deposit: 0.0, hit_id, particle_id: 0 });
            hits.push(DetectorHit {
                x: position.x, y: position.y, z: position.z,
                event_id: event.id,
                particle_id: 0,
                detector_id: shell as u8,
            });
        }
        hits
    }
}
