//! Phi-Tolerance Calibrator: derive the azimuthal matching gate of the vertex
//! reconstruction from Monte-Carlo truth.

use log::{info, warn};

use geometry::{azimuth, delta_azimuth, INNER, OUTER};
use units::radian_;
use units::todo::Anglef64;

use crate::config::Reconstruction;
use crate::store::DetectorHit;

/// Differences outside (-RANGE, RANGE) radians are not accumulated
pub const RANGE: Anglef64 = 1.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Calibrator {
    pub enabled: bool,
    /// How many events, at most, contribute to the estimate
    pub events: usize,
    /// Tolerance in units of the RMS of the azimuthal differences
    pub sigmas: f64,
    /// Used when calibration is disabled or has nothing to work with
    pub fallback: Anglef64,
}

/// Outcome of a calibration
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Calibration {
    pub tolerance: Anglef64,
    /// Number of inner/outer pairs that contributed
    pub samples: usize,
}

impl Calibrator {

    pub fn from_config(config: &Reconstruction) -> Self {
        Self {
            enabled : config.calibrate,
            events  : config.calibration_events,
            sigmas  : config.calibration_sigmas,
            fallback: radian_(config.fallback_tolerance),
        }
    }

    /// Estimate the tolerance from the first `self.events` event groups.
    pub fn calibrate(&self, events: &[(u64, Vec<DetectorHit>)]) -> Calibration {
        let fallback = Calibration { tolerance: self.fallback, samples: 0 };
        if !self.enabled {
            info!("Phi tolerance calibration disabled: using {:.1} mrad", self.fallback * 1000.0);
            return fallback
        }
        let deltas: Vec<Anglef64> = events.iter()
            .take(self.events)
            .flat_map(|(_, hits)| truth_deltas(hits))
            .collect();
        let Some(rms) = rms(&deltas) else {
            warn!("No truth tracklets for phi tolerance calibration: using {:.1} mrad", self.fallback * 1000.0);
            return fallback
        };
        let tolerance = self.sigmas * rms;
        info!("Phi tolerance calibrated on {} tracklets: {:.3} mrad", deltas.len(), tolerance * 1000.0);
        Calibration { tolerance, samples: deltas.len() }
    }
}

/// Azimuthal differences, outer minus inner, between truth hits of one event.
///
/// Inner and outer hits are paired in the order in which they appear; an
/// event whose numbers of inner and outer truth hits differ is ignored, since
/// its pairing would be meaningless.
pub fn truth_deltas(hits: &[DetectorHit]) -> Vec<Anglef64> {
    let phis_on = |layer: usize| -> Vec<Anglef64> {
        hits.iter()
            .filter(|h| h.particle_id != 0 && h.detector_id as usize == layer)
            .map(|h| azimuth(h.x, h.y))
            .collect()
    };
    let inner = phis_on(INNER);
    let outer = phis_on(OUTER);
    if inner.len() != outer.len() { return vec![] }
    inner.into_iter().zip(outer)
        .map(|(i, o)| delta_azimuth(i, o))
        .filter(|d| d.abs() < RANGE)
        .collect()
}

/// Root mean square deviation from the mean; `None` for no data
fn rms(data: &[f64]) -> Option<f64> {
    if data.is_empty() { return None }
    let n = data.len() as f64;
    let mean = data.iter().sum::<f64>() / n;
    Some((data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n).sqrt())
}
