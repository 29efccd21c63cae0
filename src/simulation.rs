//! Particle Transport Simulator: generates events, follows every track
//! through the shells and records the resulting hits.

use std::collections::VecDeque;

use log::{debug, info, warn};
use rand::{Rng, SeedableRng};
use rand::distributions::Distribution;
use rand_isaac::Isaac64Rng;
use rayon::prelude::*;

use geometry::{first_intersection, displace_on_cylinder, Geometry, Intersection, Point, OUTER};

use crate::{Error, Result};
use crate::config::Config;
use crate::distribution::{Empirical1D, Empirical2D};
use crate::generator::ParticleGun;
use crate::noise::DetectorNoise;
use crate::store::{DetectorHit, HitSink, Record};
use crate::track::{Event, Hit, Track};
use crate::transport::{Scattering, FIXED_THETA0};

pub struct Simulator {
    pub geometry: Geometry,
    pub gun: ParticleGun,
    /// Collisions per event; `None` for exactly one
    pub pileup: Option<Empirical1D>,
    /// Detector response: (z, arc-length) offsets in mm
    pub smearing: Option<Empirical2D>,
    pub scattering: Scattering,
    pub kinematics: bool,
    pub noise: Option<DetectorNoise>,
}

/// How many events to simulate, and how
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RunSettings {
    pub events: u64,
    pub seed: u64,
    pub persist: bool,
    pub parallel: bool,
}

impl From<&crate::config::Run> for RunSettings {
    fn from(run: &crate::config::Run) -> Self {
        Self { events: run.events, seed: run.seed, persist: run.persist_events, parallel: run.parallel }
    }
}

impl Simulator {

    pub fn from_config(config: &Config) -> Result<Self> {
        let g = &config.generator;
        let p = &config.physics;
        let build = |name: &str, d: &crate::config::Dist1| d.build().map_err(Error::distribution(name));
        let gun = ParticleGun {
            multiplicity: build("generator.multiplicity", &g.multiplicity)?,
            momentum    : build("generator.momentum"    , &g.momentum    )?,
            eta         : build("generator.eta"         , &g.eta         )?,
            phi         : build("generator.phi"         , &g.phi         )?,
            x           : build("generator.vertex_x"    , &g.vertex_x    )?,
            y           : build("generator.vertex_y"    , &g.vertex_y    )?,
            z           : build("generator.vertex_z"    , &g.vertex_z    )?,
            mass: p.mass,
            charge: p.charge,
            kinematics: p.kinematics,
        };
        let pileup = if config.run.single_collision { None }
                     else { Some(build("run.collisions_per_event", &config.run.collisions_per_event)?) };
        let smearing = if config.smearing.enabled {
            Some(config.smearing.offsets.build().map_err(Error::distribution("smearing.offsets"))?)
        } else { None };
        let n = &config.noise;
        let noise = if n.enabled {
            Some(DetectorNoise {
                inner_count: build("noise.inner_count", &n.inner_count)?,
                outer_count: build("noise.outer_count", &n.outer_count)?,
                inner_map: n.inner_map.build().map_err(Error::distribution("noise.inner_map"))?,
                outer_map: n.outer_map.build().map_err(Error::distribution("noise.outer_map"))?,
            })
        } else { None };
        let scattering = match (p.multiple_scattering, p.highland, p.kinematics) {
            (false,     _,     _) => Scattering::Off,
            (true ,  true,  true) => Scattering::Highland,
            (true ,  true, false) => {
                warn!("Highland scattering needs kinematics: using a fixed angle of {FIXED_THETA0} rad");
                Scattering::Fixed(FIXED_THETA0)
            }
            (true , false,     _) => Scattering::Fixed(units::radian_(p.fixed_angle)),
        };
        Ok(Self {
            geometry: config.geometry.geometry(),
            gun,
            pileup,
            smearing,
            scattering,
            kinematics: p.kinematics,
            noise,
        })
    }

    /// Advance one active track to its next interaction.
    ///
    /// Returns the track continuing beyond the interaction, if any. Sensitive
    /// shell hits, after detector response, are appended to `recorded`.
    pub fn step<R: Rng + ?Sized>(
        &self,
        track: &mut Track,
        event: &mut Event,
        rng: &mut R,
        recorded: &mut Vec<DetectorHit>,
    ) -> Option<Track> {
        let velocity = track.velocity(self.kinematics);
        let Some(Intersection { shell, time, point }) = first_intersection(&track.start, &velocity, self.geometry.shells()) else {
            track.escape();
            return None
        };
        let shell = self.geometry.shell(shell);
        let measured = self.detector_response(&point, rng);
        let hit_id = event.next_hit_id();
        event.hits.push(Hit {
            position: point,
            time,
            sensitive: shell.sensitive(),
            shell: shell.index,
            energy_deposit: 0.0,
            hit_id,
            particle_id: track.particle_id,
        });
        if shell.sensitive() {
            recorded.push(DetectorHit {
                x: measured.x, y: measured.y, z: measured.z,
                event_id: event.id,
                particle_id: track.particle_id,
                detector_id: shell.index as u8,
            });
        }
        track.stop_at(point);
        if shell.index == OUTER { return None }
        Some(self.scattering.scatter(track, point, &shell.material, shell.thickness(), rng))
    }

    /// Position reported by the detector for an interaction at `point`
    pub fn detector_response<R: Rng + ?Sized>(&self, point: &Point, rng: &mut R) -> Point {
        match &self.smearing {
            Some(offsets) => {
                let (dz, arc) = offsets.sample(rng);
                displace_on_cylinder(point, arc, dz)
            }
            None => *point,
        }
    }

    /// Follow every track of `event`, and all their continuations, until none
    /// is left active. Tracks are processed in creation order.
    pub fn transport<R: Rng + ?Sized>(&self, event: &mut Event, rng: &mut R) -> Vec<DetectorHit> {
        let mut queue: VecDeque<Track> = std::mem::take(&mut event.tracks).into();
        let mut recorded = vec![];
        while let Some(mut track) = queue.pop_front() {
            if track.active {
                if let Some(continuation) = self.step(&mut track, event, rng, &mut recorded) {
                    queue.push_back(continuation);
                }
            }
            event.tracks.push(track);
        }
        recorded
    }

    /// Generate, transport and add noise to one event.
    ///
    /// Records come out in the order primary vertices, transported hits, noise hits.
    pub fn simulate_event<R: Rng + ?Sized>(&self, id: u64, rng: &mut R) -> (Event, Vec<Record>) {
        let mut event = Event::new(id);
        let collisions = match &self.pileup {
            Some(d) => d.sample(rng).max(0.0) as u32,
            None    => 1,
        };
        let mut records: Vec<Record> = vec![];
        for _ in 0..collisions {
            records.push(self.gun.fire(&mut event, rng).into());
        }
        records.extend(self.transport(&mut event, rng).into_iter().map(Record::from));
        if let Some(noise) = &self.noise {
            records.extend(noise.generate(&self.geometry, &mut event, rng).into_iter().map(Record::from));
        }
        debug!("Event {id}: {} primaries, {} records", event.multiplicity(), records.len());
        (event, records)
    }

    /// Simulate events `1..=settings.events`, appending their records to `sink`.
    ///
    /// Sequential runs draw everything from a single engine seeded with
    /// `settings.seed`, in event order. Parallel runs give each event its own
    /// engine, derived from the seed and the event id: the output is
    /// reproducible and independent of the number of threads, but differs from
    /// that of a sequential run. `progress` is called once per event, from any
    /// thread. Complete events are returned only if `settings.persist`.
    pub fn run<S: HitSink>(&self, settings: &RunSettings, sink: &mut S, progress: impl Fn(&Event) + Sync) -> Result<Vec<Event>> {
        info!("Simulating {} events with seed {}{}", settings.events, settings.seed,
              if settings.parallel { " in parallel" } else { "" });
        let keep = |event: Event| if settings.persist { Some(event) } else { None };
        let mut kept = vec![];
        if settings.parallel {
            let outputs: Vec<(Option<Event>, Vec<Record>)> = (1..=settings.events)
                .into_par_iter()
                .map(|id| {
                    let (event, records) = self.simulate_event(id, &mut event_rng(settings.seed, id));
                    progress(&event);
                    (keep(event), records)
                })
                .collect();
            for (event, records) in outputs {
                sink.append_all(records)?;
                kept.extend(event);
            }
        } else {
            let mut rng = Isaac64Rng::seed_from_u64(settings.seed);
            for id in 1..=settings.events {
                let (event, records) = self.simulate_event(id, &mut rng);
                progress(&event);
                sink.append_all(records)?;
                kept.extend(keep(event));
            }
        }
        Ok(kept)
    }
}

/// Independent engine for event `id`
pub fn event_rng(seed: u64, id: u64) -> Isaac64Rng {
    Isaac64Rng::seed_from_u64(splitmix64(seed ^ splitmix64(id)))
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::TAU;
    use geometry::{transverse_radius, Vector, INNER, PIPE};
    use rand_distr::StandardNormal;
    use rstest::rstest;
    use float_eq::assert_float_eq;
    #[allow(unused)] use pretty_assertions::{assert_eq, assert_ne};

    fn quiet_config() -> Config {
        let mut config = Config::default();
        config.noise.enabled = false;
        config.smearing.enabled = false;
        config
    }

    fn simulator(config: &Config) -> Simulator { Simulator::from_config(config).unwrap() }

    fn single_track(momentum: Vector, start: Point) -> Event {
        let mut event = Event::new(1);
        let id = event.next_particle_id();
        event.tracks.push(Track::new(momentum, start, 0.000_511, -1, id, 1));
        event
    }

    #[test]
    fn track_missing_every_shell_escapes_without_hits() {
        let sim = simulator(&quiet_config());
        let mut event = single_track(Vector::new(0.0, 0.0, 1.0), Point::origin());
        let hits = sim.transport(&mut event, &mut Isaac64Rng::seed_from_u64(1));
        assert!(hits.is_empty());
        assert!(event.hits.is_empty());
        assert_eq!(event.tracks.len(), 1);
        let track = &event.tracks[0];
        assert!(track.no_stop && !track.active);
        assert_eq!(track.stop, None);
    }

    #[test]
    fn track_starting_inside_outer_layer_stops_there() {
        let sim = simulator(&quiet_config());
        let mut event = single_track(Vector::new(1.0, 0.0, 0.0), Point::new(50.0, 0.0, 0.0));
        let hits = sim.transport(&mut event, &mut Isaac64Rng::seed_from_u64(1));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].detector_id, OUTER as u8);
        assert_eq!(event.tracks.len(), 1);
        let track = &event.tracks[0];
        assert!(!track.active && !track.no_stop);
        let stop = track.stop.unwrap();
        assert_float_eq!((stop.x, stop.y, stop.z), (70.0, 0.0, 0.0), abs <= (1e-9, 1e-9, 1e-9));
        assert_eq!(hits[0].position(), stop);
    }

    #[test]
    fn central_track_crosses_all_three_shells() {
        let sim = simulator(&quiet_config());
        let mut event = single_track(Vector::new(0.6, 0.8, 0.1), Point::origin());
        let hits = sim.transport(&mut event, &mut Isaac64Rng::seed_from_u64(1));
        let layers: Vec<_> = hits.iter().map(|h| h.detector_id).collect();
        assert_eq!(layers, vec![1, 2]);
        let shells: Vec<_> = event.hits.iter().map(|h| h.shell).collect();
        assert_eq!(shells, vec![PIPE, INNER, OUTER]);
        assert!(!event.hits[0].sensitive);
        // Parent, continuation after the pipe, continuation after the inner layer
        assert_eq!(event.tracks.len(), 3);
        assert!(event.tracks.iter().all(|t| !t.active && t.stop.is_some() && t.particle_id == 1));
        for pair in event.tracks.windows(2) {
            assert_eq!(pair[0].stop, Some(pair[1].start));
        }
    }

    #[test]
    fn without_scattering_continuations_keep_momentum() {
        let mut config = quiet_config();
        config.physics.multiple_scattering = false;
        let sim = simulator(&config);
        let p = Vector::new(0.3, -0.4, 0.2);
        let mut event = single_track(p, Point::origin());
        sim.transport(&mut event, &mut Isaac64Rng::seed_from_u64(1));
        assert!(event.tracks.iter().all(|t| t.momentum == p));
    }

    #[test]
    fn smearing_moves_recorded_hits_but_not_true_interactions() {
        let mut config = quiet_config();
        config.physics.multiple_scattering = false;
        let mut sim = simulator(&config);
        // (dz, arc) in mm
        let offsets = Empirical2D::fixed(0.5, 0.2);
        sim.smearing = Some(offsets.clone());
        let mut event = single_track(Vector::new(0.6, 0.8, 0.1), Point::origin());
        let mut rng = Isaac64Rng::seed_from_u64(3);
        let mut expected_rng = rng.clone();
        let recorded = sim.transport(&mut event, &mut rng);

        assert_eq!(event.hits.len(), 3);
        for hit in &event.hits {
            assert_float_eq!(transverse_radius(&hit.position), sim.geometry.shell(hit.shell).radius, abs <= 1e-9);
        }
        assert_eq!(recorded.len(), 2);
        for (measured, truth) in recorded.iter().zip(&event.hits[1..]) {
            let expected = displace_on_cylinder(&truth.position, 0.2, 0.5);
            assert_float_eq!((measured.x, measured.y, measured.z),
                             (expected.x, expected.y, expected.z),
                             abs <= (1e-12, 1e-12, 1e-12));
            assert_float_eq!(measured.z - truth.position.z, 0.5, abs <= 1e-12);
        }
        // One draw per interaction, the passive pipe included
        for _ in 0..3 { offsets.sample(&mut expected_rng); }
        assert_eq!(rng.gen::<u64>(), expected_rng.gen::<u64>());
    }

    #[test]
    fn smearing_is_drawn_before_scattering() {
        let mut config = quiet_config();
        config.physics.fixed_angle = units::mrad(1.0);
        let mut sim = simulator(&config);
        let offsets = Empirical2D::uniform((-0.1, 0.1), (-0.05, 0.05)).unwrap();
        sim.smearing = Some(offsets.clone());
        let mut event = single_track(Vector::new(0.6, 0.8, 0.1), Point::origin());
        let mut rng = Isaac64Rng::seed_from_u64(8);
        let mut expected_rng = rng.clone();
        sim.transport(&mut event, &mut rng);

        assert_eq!(event.hits.iter().map(|h| h.shell).collect::<Vec<_>>(), vec![PIPE, INNER, OUTER]);
        // Pipe and inner layer: smearing, then φₚ and θₚ; outer layer: smearing only
        for _ in 0..2 {
            offsets.sample(&mut expected_rng);
            let _: f64 = expected_rng.gen_range(0.0..TAU);
            let _: f64 = expected_rng.sample(StandardNormal);
        }
        offsets.sample(&mut expected_rng);
        assert_eq!(rng.gen::<u64>(), expected_rng.gen::<u64>());
    }

    #[rstest]
    #[case::off                      (false, false, true , Scattering::Off)]
    #[case::off_ignores_highland     (false, true , true , Scattering::Off)]
    #[case::fixed_configured_angle   (true , false, true , Scattering::Fixed(0.002))]
    #[case::fixed_without_kinematics (true , false, false, Scattering::Fixed(0.002))]
    #[case::highland                 (true , true , true , Scattering::Highland)]
    #[case::highland_needs_kinematics(true , true , false, Scattering::Fixed(FIXED_THETA0))]
    fn scattering_mode_selection(
        #[case] multiple_scattering: bool,
        #[case] highland: bool,
        #[case] kinematics: bool,
        #[case] expected: Scattering,
    ) {
        let mut config = quiet_config();
        config.physics.multiple_scattering = multiple_scattering;
        config.physics.highland = highland;
        config.physics.kinematics = kinematics;
        config.physics.fixed_angle = units::mrad(2.0);
        assert_eq!(simulator(&config).scattering, expected);
    }

    #[test]
    fn same_seed_same_events() {
        let sim = simulator(&Config::default());
        let settings = RunSettings { events: 20, seed: 42, persist: false, parallel: false };
        let run = || { let mut records = vec![]; sim.run(&settings, &mut records, |_| {}).unwrap(); records };
        assert_eq!(run(), run());
    }

    #[test]
    fn parallel_output_does_not_depend_on_threads() {
        let sim = simulator(&Config::default());
        let settings = RunSettings { events: 30, seed: 42, persist: true, parallel: true };
        let run = |threads| {
            let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build().unwrap();
            pool.install(|| {
                let mut records = vec![];
                let events = sim.run(&settings, &mut records, |_| {}).unwrap();
                (records, events)
            })
        };
        let (one, events) = run(1);
        let (four, _) = run(4);
        assert_eq!(one, four);
        let ids: Vec<_> = events.iter().map(|e| e.id).collect();
        assert_eq!(ids, (1..=30).collect::<Vec<_>>());
        // Records grouped by event, in event order
        let record_ids: Vec<_> = one.iter().map(Record::event_id).collect();
        assert!(record_ids.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn persistence_keeps_complete_events() {
        let sim = simulator(&Config::default());
        let mut records = vec![];
        let kept = sim.run(&RunSettings { events: 5, seed: 1, persist: false, parallel: false }, &mut records, |_| {}).unwrap();
        assert!(kept.is_empty());
        let kept = sim.run(&RunSettings { events: 5, seed: 1, persist: true, parallel: false }, &mut vec![], |_| {}).unwrap();
        assert_eq!(kept.len(), 5);
        assert!(kept.iter().all(|e| e.tracks.iter().all(|t| !t.active)));
    }

    #[test]
    fn pileup_produces_several_vertices() {
        let mut config = quiet_config();
        config.run.single_collision = false;
        config.run.collisions_per_event = crate::config::Dist1::Fixed { value: 3.0 };
        let sim = simulator(&config);
        let (event, records) = sim.simulate_event(1, &mut Isaac64Rng::seed_from_u64(5));
        assert_eq!(event.vertices.len(), 3);
        assert_eq!(records.iter().filter(|r| r.primary_vertex().is_some()).count(), 3);
        let mut ids: Vec<_> = event.tracks.iter().map(|t| t.particle_id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids, (1..=event.multiplicity() as u64).collect::<Vec<_>>());
    }

    #[test]
    fn splitmix_streams_differ_per_event() {
        assert_ne!(event_rng(1, 1).gen::<u64>(), event_rng(1, 2).gen::<u64>());
        assert_ne!(event_rng(1, 1).gen::<u64>(), event_rng(2, 1).gen::<u64>());
        assert_eq!(event_rng(7, 9).gen::<u64>(), event_rng(7, 9).gen::<u64>());
    }
}
