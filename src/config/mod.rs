//! Configuration file parser
//!
//! Every section and field has a default, so an empty file describes the
//! reference detector and run. Quantities with dimensions are written as
//! strings with explicit units, for example `radius = "4 cm"`.

pub mod distribution;

use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, de};

use geometry::{Geometry, Material, Shell};
use units::{Angle, Length, cm, mm, mrad, mm_, radian_};

use crate::{Error, Result};
pub use distribution::{Dist1, Dist2};

fn deserialize_uom<'d, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'d>,
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    String::deserialize(deserializer)?
        .parse::<T>()
        .map_err(de::Error::custom)
}

#[derive(Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    pub run: Run,
    pub geometry: GeometryConfig,
    pub physics: Physics,
    pub generator: Generator,
    pub noise: Noise,
    pub smearing: Smearing,
    pub reconstruction: Reconstruction,
    pub analysis: Analysis,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct Run {
    /// Number of events to simulate
    pub events: u64,

    /// Seed of the pseudorandom engine
    pub seed: u64,

    /// One collision per event. Otherwise the number of collisions is drawn
    /// from `collisions_per_event`.
    pub single_collision: bool,

    pub collisions_per_event: Dist1,

    /// Keep complete events (tracks and all hits) in memory
    pub persist_events: bool,

    /// Simulate events on all cores, with one random stream per event
    pub parallel: bool,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct GeometryConfig {
    pub pipe : ShellConfig,
    pub inner: ShellConfig,
    pub outer: ShellConfig,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ShellConfig {
    /// Mean radius
    #[serde(deserialize_with = "deserialize_uom")]
    pub radius: Length,

    #[serde(deserialize_with = "deserialize_uom")]
    pub thickness: Length,

    #[serde(deserialize_with = "deserialize_uom")]
    pub half_length: Length,

    pub atomic_number: f64,

    #[serde(deserialize_with = "deserialize_uom")]
    pub radiation_length: Length,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct Physics {
    pub multiple_scattering: bool,

    /// Use the Highland formula rather than a fixed angle
    pub highland: bool,

    #[serde(deserialize_with = "deserialize_uom")]
    pub fixed_angle: Angle,

    /// Relativistic velocities and momentum-dependent scattering
    pub kinematics: bool,

    /// GeV/c²
    pub mass: f64,

    pub charge: i32,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct Generator {
    pub multiplicity: Dist1,
    /// GeV/c
    pub momentum: Dist1,
    pub eta: Dist1,
    /// rad
    pub phi: Dist1,
    /// mm
    pub vertex_x: Dist1,
    pub vertex_y: Dist1,
    pub vertex_z: Dist1,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct Noise {
    pub enabled: bool,
    pub inner_count: Dist1,
    pub outer_count: Dist1,
    /// (φ in rad, z in mm)
    pub inner_map: Dist2,
    pub outer_map: Dist2,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct Smearing {
    pub enabled: bool,
    /// Pixel activation map: (z offset, arc-length offset), both in mm
    pub offsets: Dist2,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct Reconstruction {
    /// Width of the running window
    #[serde(deserialize_with = "deserialize_uom")]
    pub window: Length,

    /// Window step, as a fraction of its width
    pub step_fraction: f64,

    /// Other windows must hold fewer than this fraction of the best count
    pub confidence: f64,

    /// Minimum number of candidates in the best window
    pub min_count: usize,

    /// Estimate the azimuthal tolerance from MC truth
    pub calibrate: bool,

    pub calibration_events: usize,

    /// Tolerance in units of the RMS of the truth-matched Δφ
    pub calibration_sigmas: f64,

    /// Tolerance used without calibration, or when calibration finds nothing
    #[serde(deserialize_with = "deserialize_uom")]
    pub fallback_tolerance: Angle,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct Analysis {
    /// Only vertices within this many standard deviations of z = 0 are analysed
    pub sigmas: f64,
    pub min_multiplicity: u32,
    pub max_multiplicity: u32,
}

// ----- Defaults ------------------------------------------------------------------------
impl Default for Run {
    fn default() -> Self {
        Self {
            events: 200,
            seed: 234,
            single_collision: true,
            collisions_per_event: Dist1::Poisson { mean: 2.0, min: 0.0, max: 20.0, bins: 20 },
            persist_events: false,
            parallel: false,
        }
    }
}

const BERYLLIUM: (f64, f64) = ( 4.0, 352.8); // Z, X0 in mm
const SILICON  : (f64, f64) = (14.0,  93.7);

impl Default for GeometryConfig {
    fn default() -> Self {
        let shell = |radius, thickness, half_length, (atomic_number, x0): (f64, f64)| ShellConfig {
            radius, thickness, half_length, atomic_number, radiation_length: mm(x0),
        };
        Self {
            pipe : shell(mm(30.0), mm(0.8), cm(50.0) , BERYLLIUM),
            inner: shell(mm(40.0), mm(0.2), mm(135.0), SILICON),
            outer: shell(mm(70.0), mm(0.2), mm(135.0), SILICON),
        }
    }
}

impl Default for Physics {
    fn default() -> Self {
        Self {
            multiple_scattering: true,
            highland: false,
            fixed_angle: mrad(1.0),
            kinematics: true,
            mass: 0.000_511,
            charge: -1,
        }
    }
}

impl Default for Generator {
    fn default() -> Self {
        use Dist1::*;
        Self {
            multiplicity: Poisson { mean: 10.5, min:    1.0, max: 100.0, bins:  99 },
            momentum    : Gauss { mean: 1.2, sigma:  0.1, min:    0.0, max:  10.0, bins: 100 },
            eta         : Gauss { mean: 0.0, sigma:  4.0, min:  -10.0, max:  10.0, bins: 100 },
            phi         : Uniform { min: 0.0, max: std::f64::consts::TAU },
            vertex_x    : Gauss { mean: 0.0, sigma:  0.1, min:   -0.8, max:   0.8, bins: 1000 },
            vertex_y    : Gauss { mean: 0.0, sigma:  0.1, min:   -0.8, max:   0.8, bins: 1000 },
            vertex_z    : Gauss { mean: 0.0, sigma: 53.0, min: -300.0, max: 300.0, bins: 300 },
        }
    }
}

impl Default for Noise {
    fn default() -> Self {
        let count = Dist1::Poisson { mean: 6.5, min: 0.0, max: 100.0, bins: 100 };
        let map = Dist2::Uniform { x_min: 0.0, x_max: std::f64::consts::TAU, y_min: -250.0, y_max: 250.0 };
        Self { enabled: true, inner_count: count.clone(), outer_count: count, inner_map: map.clone(), outer_map: map }
    }
}

impl Default for Smearing {
    fn default() -> Self {
        Self {
            enabled: true,
            offsets: Dist2::Gauss { mean_x: 0.0, sigma_x: 0.120, mean_y: 0.0, sigma_y: 0.030,
                                    half_width_x: 5.0, half_width_y: 5.0, bins: 100 },
        }
    }
}

impl Default for Reconstruction {
    fn default() -> Self {
        Self {
            window: mm(5.0),
            step_fraction: 0.2,
            confidence: 1.0,
            min_count: 1,
            calibrate: true,
            calibration_events: 200,
            calibration_sigmas: 3.0,
            fallback_tolerance: mrad(20.0),
        }
    }
}

impl Default for Analysis {
    fn default() -> Self { Self { sigmas: 3.0, min_multiplicity: 3, max_multiplicity: 52 } }
}

// ----- Validation ----------------------------------------------------------------------
impl ShellConfig {
    pub fn shell(&self) -> Shell {
        let material = Material { atomic_number: self.atomic_number, radiation_length: mm_(self.radiation_length) };
        Shell::new(mm_(self.radius), mm_(self.thickness), mm_(self.half_length), material)
    }

    fn validate(&self, name: &str) -> Result<()> {
        let s = self.shell();
        let check = |ok: bool, what: &str| if ok { Ok(()) } else { Err(Error::config(format!("{name}: {what}"))) };
        check(s.radius > 0.0                        , "radius must be positive")?;
        check(s.half_thickness >= 0.0               , "thickness must not be negative")?;
        check(s.half_length > 0.0                   , "half_length must be positive")?;
        check(s.material.atomic_number > 0.0        , "atomic_number must be positive")?;
        check(s.material.radiation_length > 0.0     , "radiation_length must be positive")
    }
}

impl GeometryConfig {
    pub fn geometry(&self) -> Geometry {
        Geometry::new(self.pipe.shell(), self.inner.shell(), self.outer.shell())
    }
}

impl Config {

    /// Reject values that would make the run meaningless
    pub fn validate(&self) -> Result<()> {
        let g = &self.geometry;
        g.pipe .validate("geometry.pipe")?;
        g.inner.validate("geometry.inner")?;
        g.outer.validate("geometry.outer")?;
        if !g.geometry().is_radially_ordered() {
            return Err(Error::config("geometry: shells must be ordered pipe < inner < outer and must not overlap"))
        }
        if !(self.physics.mass >= 0.0) {
            return Err(Error::config("physics.mass must not be negative"))
        }
        if !(radian_(self.physics.fixed_angle) >= 0.0) {
            return Err(Error::config("physics.fixed_angle must not be negative"))
        }
        let r = &self.reconstruction;
        if !(mm_(r.window) > 0.0) {
            return Err(Error::config("reconstruction.window must be positive"))
        }
        if !(r.step_fraction > 0.0 && r.step_fraction <= 1.0) {
            return Err(Error::config("reconstruction.step_fraction must be in (0, 1]"))
        }
        if !(r.confidence >= 0.0) {
            return Err(Error::config("reconstruction.confidence must not be negative"))
        }
        if !(r.calibration_sigmas > 0.0) {
            return Err(Error::config("reconstruction.calibration_sigmas must be positive"))
        }
        if !(radian_(r.fallback_tolerance) >= 0.0) {
            return Err(Error::config("reconstruction.fallback_tolerance must not be negative"))
        }
        let a = &self.analysis;
        if !(a.sigmas > 0.0) {
            return Err(Error::config("analysis.sigmas must be positive"))
        }
        if a.min_multiplicity >= a.max_multiplicity {
            return Err(Error::config("analysis.min_multiplicity must be below max_multiplicity"))
        }
        Ok(())
    }
}

impl FromStr for Config {
    type Err = Error;
    fn from_str(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }
}

pub fn read_config_file(path: &Path) -> Result<Config> {
    let text = fs::read_to_string(path)
        .map_err(|source| Error::ConfigFile { path: path.into(), source })?;
    text.parse()
}
