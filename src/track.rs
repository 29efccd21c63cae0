//! Particle trajectory segments, their interactions with the detector, and
//! the events that own them.

use geometry::{Point, Vector};
use units::C;
use units::todo::{Energyf64, Massf64, Momentumf64, Timef64};

use crate::store::PrimaryVertex;

/// A straight segment of a charged particle's trajectory
///
/// Created by the particle gun, or as the continuation of a track that
/// scattered in a shell. The stop point is set if and only if the track was
/// deactivated by an interaction; a track that leaves the detector is flagged
/// `no_stop` instead.
#[derive(Clone, Debug, PartialEq)]
pub struct Track {
    /// GeV/c
    pub momentum: Vector,
    pub start: Point,
    pub stop: Option<Point>,
    pub mass: Massf64,
    /// In units of the elementary charge
    pub charge: i32,
    /// Unique per primary within an event, shared by all segments of its lineage
    pub particle_id: u64,
    pub event_id: u64,
    pub active: bool,
    pub no_stop: bool,
}

impl Track {

    pub fn new(momentum: Vector, start: Point, mass: Massf64, charge: i32, particle_id: u64, event_id: u64) -> Self {
        Self { momentum, start, stop: None, mass, charge, particle_id, event_id, active: true, no_stop: false }
    }

    pub fn momentum_magnitude(&self) -> Momentumf64 { self.momentum.norm() }

    pub fn energy(&self) -> Energyf64 { self.momentum_magnitude().hypot(self.mass) }

    /// v/c
    pub fn beta(&self) -> f64 {
        let e = self.energy();
        if e == 0.0 { 0.0 } else { self.momentum_magnitude() / e }
    }

    /// Velocity in mm/ns
    ///
    /// Without kinematics, tracks move at unit speed along their momentum.
    pub fn velocity(&self, kinematics: bool) -> Vector {
        let p = self.momentum_magnitude();
        if p == 0.0 { return Vector::zeros() }
        if kinematics { self.momentum * (C / self.energy()) }
        else          { self.momentum / p }
    }

    /// The segment ended in an interaction at `point`
    pub fn stop_at(&mut self, point: Point) {
        self.stop = Some(point);
        self.active = false;
    }

    /// The segment left the detector without interacting
    pub fn escape(&mut self) {
        self.no_stop = true;
        self.active = false;
    }

    /// Continuation of this track from `start` with new `momentum`
    pub fn continuation(&self, start: Point, momentum: Vector) -> Self {
        Self::new(momentum, start, self.mass, self.charge, self.particle_id, self.event_id)
    }
}

/// A point interaction of a track with detector material
#[derive(Clone, Debug, PartialEq)]
pub struct Hit {
    /// True interaction point, before detector response
    pub position: Point,
    /// Time of flight along the segment which produced this hit
    pub time: Timef64,
    pub sensitive: bool,
    pub shell: usize,
    pub energy_deposit: Energyf64,
    pub hit_id: u64,
    /// 0 for noise
    pub particle_id: u64,
}

/// Everything simulated for one event id
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Event {
    pub id: u64,
    pub vertices: Vec<PrimaryVertex>,
    pub tracks: Vec<Track>,
    pub hits: Vec<Hit>,
    next_particle_id: u64,
    next_hit_id: u64,
}

impl Event {

    pub fn new(id: u64) -> Self {
        Self { id, next_particle_id: 1, ..Self::default() }
    }

    /// Particle ids start at 1: 0 is reserved for noise
    pub fn next_particle_id(&mut self) -> u64 {
        let id = self.next_particle_id;
        self.next_particle_id += 1;
        id
    }

    pub fn next_hit_id(&mut self) -> u64 {
        let id = self.next_hit_id;
        self.next_hit_id += 1;
        id
    }

    /// Total number of primary particles over all collisions in the event
    pub fn multiplicity(&self) -> u32 {
        self.vertices.iter().map(|v| v.multiplicity).sum()
    }
}
