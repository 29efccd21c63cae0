//! Vertex Reconstructor: pair inner and outer hits into tracklets, and find
//! the densest cluster of their z-intercepts with a running window.

use log::{debug, info};
use ordered_float::NotNan;
use rayon::prelude::*;

use geometry::{azimuth, delta_azimuth, z_intercept, INNER, OUTER};
use units::mm_;
use units::todo::{Anglef64, Lengthf64};

use crate::config::Reconstruction;
use crate::store::{DetectorHit, ReconstructedVertex};

/// Sliding-window mode finder
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RunningWindow {
    /// mm
    pub width: Lengthf64,
    /// Step between successive window positions, as a fraction of the width
    pub step_fraction: f64,
    /// A competing window must contain fewer than this fraction of the
    /// maximum count
    pub confidence: f64,
    pub min_count: usize,
}

impl RunningWindow {

    pub fn from_config(config: &Reconstruction) -> Self {
        Self {
            width        : mm_(config.window),
            step_fraction: config.step_fraction,
            confidence   : config.confidence,
            min_count    : config.min_count,
        }
    }

    pub fn step(&self) -> Lengthf64 { self.step_fraction * self.width }

    /// Number of steps after which the window no longer overlaps its
    /// starting position
    pub fn step_limit(&self) -> usize {
        (self.width / self.step() + 1e-9).floor() as usize
    }

    /// Candidates strictly inside the window starting at `low`, as a range of
    /// indices into `sorted`
    fn window(&self, sorted: &[Lengthf64], low: Lengthf64) -> std::ops::Range<usize> {
        let high = low + self.width;
        let begin = sorted.partition_point(|&z| z <= low);
        let end   = sorted.partition_point(|&z| z <  high).max(begin);
        begin..end
    }

    /// Count the candidates in every window position.
    ///
    /// The first window is centred half a step below the smallest candidate,
    /// and windows are added until one starts at or beyond the largest. Returns
    /// the lower edge of the first window and the counts.
    pub fn scan(&self, sorted: &[Lengthf64]) -> (Lengthf64, Vec<usize>) {
        let (Some(&first), Some(&last)) = (sorted.first(), sorted.last()) else { return (0.0, vec![]) };
        let step = self.step();
        let min = first - step / 2.0;
        let mut n = 0;
        while min + n as f64 * step < last { n += 1; }
        let counts = (0..n)
            .map(|j| self.window(sorted, min + j as f64 * step).len())
            .collect();
        (min, counts)
    }

    /// Estimate the vertex z from candidates sorted in ascending order.
    ///
    /// The winning window is the first one with the highest count. It is
    /// accepted only if it holds at least `min_count` candidates and every
    /// window that does not overlap it, on either side, holds fewer than
    /// `confidence` times as many. The estimate is the mean of the candidates
    /// in the winning window.
    pub fn find_vertex(&self, sorted: &[Lengthf64]) -> Option<Lengthf64> {
        debug_assert!(sorted.windows(2).all(|w| w[0] <= w[1]));
        let (min, counts) = self.scan(sorted);
        // First strict maximum
        let (jmax, num_max) = counts.iter().copied().enumerate()
            .fold(None, |best, (j, c)| match best {
                Some((_, b)) if b >= c => best,
                _ => Some((j, c)),
            })?;
        if num_max < self.min_count { return None }
        let limit = self.step_limit();
        let left_max  = jmax.checked_sub(limit)
            .and_then(|end| counts[..end].iter().max().copied())
            .unwrap_or(0);
        let right_max = counts.get(jmax + limit..)
            .and_then(|tail| tail.iter().max().copied())
            .unwrap_or(0);
        let gate = self.confidence * num_max as f64;
        if left_max as f64 >= gate || right_max as f64 >= gate {
            debug!("Ambiguous vertex: {num_max} tracklets, competing {left_max} left and {right_max} right");
            return None
        }
        let members = &sorted[self.window(sorted, min + jmax as f64 * self.step())];
        if members.is_empty() { return None }
        Some(members.iter().sum::<f64>() / members.len() as f64)
    }
}

/// z-intercepts of all inner/outer hit pairs whose azimuths differ by no more
/// than `tolerance`, sorted in ascending order.
///
/// The azimuth difference is wrapped into (−π, π], so a pair on either side of
/// the φ = 0 seam (say 6.27 and 0.01 rad) is compared over the short arc and
/// still matches.
pub fn tracklet_candidates(hits: &[DetectorHit], tolerance: Anglef64) -> Vec<Lengthf64> {
    let on = |layer: usize| -> Vec<_> {
        hits.iter()
            .filter(|h| h.detector_id as usize == layer)
            .map(|h| (azimuth(h.x, h.y), h.position()))
            .collect()
    };
    let inner = on(INNER);
    let outer = on(OUTER);
    let mut candidates: Vec<NotNan<Lengthf64>> = itertools::iproduct!(&inner, &outer)
        .filter(|((phi_i, _), (phi_o, _))| delta_azimuth(*phi_i, *phi_o).abs() <= tolerance)
        .filter_map(|((_, p_i), (_, p_o))| z_intercept(p_i, p_o))
        .filter(|z| z.is_finite())
        .filter_map(|z| NotNan::new(z).ok())
        .collect();
    candidates.sort_unstable();
    candidates.into_iter().map(NotNan::into_inner).collect()
}

/// Reconstructs events with a fixed phi tolerance
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Reconstructor {
    pub window: RunningWindow,
    pub tolerance: Anglef64,
}

impl Reconstructor {

    pub fn reconstruct_event(&self, event_id: u64, hits: &[DetectorHit]) -> Option<ReconstructedVertex> {
        let candidates = tracklet_candidates(hits, self.tolerance);
        let z = self.window.find_vertex(&candidates);
        debug!("Event {event_id}: {} tracklets, vertex {z:?}", candidates.len());
        z.map(|z| ReconstructedVertex { z, event_id })
    }

    /// Reconstruct every event, keeping event order. Events without a vertex
    /// produce no output.
    pub fn reconstruct(&self, events: &[(u64, Vec<DetectorHit>)], parallel: bool) -> Vec<ReconstructedVertex> {
        let vertices: Vec<_> = if parallel {
            events.par_iter().filter_map(|(id, hits)| self.reconstruct_event(*id, hits)).collect()
        } else {
            events.iter().filter_map(|(id, hits)| self.reconstruct_event(*id, hits)).collect()
        };
        info!("Reconstructed {} vertices in {} events", vertices.len(), events.len());
        vertices
    }
}
