//! Efficiency and resolution of the vertex reconstruction, as functions of
//! multiplicity and of the true vertex position.

use std::collections::HashMap;
use std::fmt;

use itertools::Itertools;
use log::info;

use units::todo::Lengthf64;

use crate::config::Analysis;
use crate::store::{PrimaryVertex, ReconstructedVertex};
use crate::utils::group_digits;

/// Half-open interval `[low, high)` around `centre`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bin {
    pub centre: f64,
    pub low: f64,
    pub high: f64,
}

impl Bin {
    fn new(centre: f64, half_width: f64) -> Self {
        Self { centre, low: centre - half_width, high: centre + half_width }
    }

    pub fn contains(&self, x: f64) -> bool { self.low <= x && x < self.high }
}

/// Value with its statistical uncertainty
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Measurement {
    pub value: f64,
    pub error: f64,
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4} ± {:.4}", self.value, self.error)
    }
}

/// Truth and reconstruction outcome of one event
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Outcome {
    pub event_id: u64,
    pub z_true: Lengthf64,
    pub multiplicity: u32,
    pub z_reco: Option<Lengthf64>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BinResult {
    pub bin: Bin,
    pub events: usize,
    pub reconstructed: usize,
    pub efficiency: Measurement,
    /// `None` if nothing was reconstructed in this bin
    pub resolution: Option<Measurement>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Report {
    /// RMS of the true vertex z over all collisions, mm
    pub sigma: Lengthf64,
    pub sigmas: f64,
    /// Events within the analysed z range
    pub events: usize,
    pub reconstructed: usize,
    pub by_multiplicity: Vec<BinResult>,
    pub by_z: Vec<BinResult>,
}

/// Multiplicity bins from `start` up to (not including) centre `end`.
///
/// Low multiplicities get one bin each; higher ones are sampled with
/// growing steps and widths.
pub fn multiplicity_bins(start: u32, end: u32) -> Vec<Bin> {
    let mut bins = vec![];
    let mut centre = start as f64;
    while centre < end as f64 {
        let (half_width, step) = match centre {
            c if c < 10.0 => (0.5,  1.0),
            c if c < 25.0 => (0.5,  3.0),
            c if c < 60.0 => (1.5,  6.0),
            _             => (2.5, 10.0),
        };
        bins.push(Bin::new(centre, half_width));
        centre += step;
    }
    bins
}

/// Bins of true vertex z covering `[-k σ, k σ]`, symmetric about a central
/// bin at 0.
///
/// Bins are σ/3 wide out to the ones centred on ±σ, and 2σ/3 wide beyond
/// them, until the range is covered. Neighbouring bins share their edges, so
/// every z in the range falls in exactly one bin.
pub fn z_bins(sigma: Lengthf64, k: f64) -> Vec<Bin> {
    if !(sigma > 0.0 && k > 0.0) { return vec![] }
    // Negative edges, counted in sixths of σ from 0
    let edge = |n: u32| -> f64 {
        let sixths = if n <= 3 { 2 * n + 1 } else { 4 * n - 5 };
        -sigma * sixths as f64 / 6.0
    };
    let mut edges = vec![];
    for n in 0.. {
        let e = edge(n);
        edges.push(e);
        if e < -k * sigma { break }
    }
    let negative = edges.windows(2).map(|w| Bin { centre:  (w[0] + w[1]) / 2.0, low:  w[1], high:  w[0] });
    let positive = edges.windows(2).map(|w| Bin { centre: -(w[0] + w[1]) / 2.0, low: -w[0], high: -w[1] });
    let central = Bin { centre: 0.0, low: edge(0), high: -edge(0) };
    negative.rev().chain(std::iter::once(central)).chain(positive).collect()
}

/// Population standard deviation
fn std_dev(data: impl Iterator<Item = f64> + Clone) -> Option<f64> {
    let n = data.clone().count();
    if n == 0 { return None }
    let mean = data.clone().sum::<f64>() / n as f64;
    Some((data.map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64).sqrt())
}

/// Match every event's truth with its reconstructed vertex, if any.
///
/// The truth of an event is its first primary vertex; its multiplicity is
/// the sum over all its collisions.
pub fn outcomes(primaries: &[PrimaryVertex], reconstructed: &[ReconstructedVertex]) -> Vec<Outcome> {
    let reco: HashMap<u64, Lengthf64> = reconstructed.iter().map(|v| (v.event_id, v.z)).collect();
    primaries.iter()
        .group_by(|v| v.event_id)
        .into_iter()
        .map(|(event_id, mut vertices)| {
            let first = vertices.next().copied();
            let rest: u32 = vertices.map(|v| v.multiplicity).sum();
            (event_id, first, rest)
        })
        .filter_map(|(event_id, first, rest)| first.map(|v| Outcome {
            event_id,
            z_true: v.z,
            multiplicity: v.multiplicity + rest,
            z_reco: reco.get(&event_id).copied(),
        }))
        .collect()
}

fn summarize<'o>(bin: Bin, outcomes: impl Iterator<Item = &'o Outcome>) -> Option<BinResult> {
    let (events, residuals) = outcomes.fold((0, vec![]), |(n, mut r), o| {
        r.extend(o.z_reco.map(|z| o.z_true - z));
        (n + 1, r)
    });
    if events == 0 { return None }
    let reconstructed = residuals.len();
    let eff = reconstructed as f64 / events as f64;
    let efficiency = Measurement { value: eff, error: (eff * (1.0 - eff) / events as f64).sqrt() };
    let resolution = (reconstructed > 0).then(|| {
        let rms = (residuals.iter().map(|r| r * r).sum::<f64>() / reconstructed as f64).sqrt();
        Measurement { value: rms, error: rms / (2.0 * reconstructed as f64).sqrt() }
    });
    Some(BinResult { bin, events, reconstructed, efficiency, resolution })
}

/// Efficiency and resolution per multiplicity bin and per true-z bin.
///
/// Only events whose true z lies within `settings.sigmas` standard
/// deviations of 0 are analysed. Empty bins are omitted.
pub fn analyse(primaries: &[PrimaryVertex], reconstructed: &[ReconstructedVertex], settings: &Analysis) -> Report {
    let sigma = std_dev(primaries.iter().map(|v| v.z)).unwrap_or(0.0);
    let k = settings.sigmas;
    let selected = outcomes(primaries, reconstructed).into_iter()
        .filter(|o| o.z_true.abs() <= k * sigma)
        .collect_vec();
    let lowest = selected.iter().map(|o| o.multiplicity).min().unwrap_or(settings.min_multiplicity);
    let start = lowest.max(settings.min_multiplicity);

    let by_multiplicity = multiplicity_bins(start, settings.max_multiplicity).into_iter()
        .filter_map(|bin| summarize(bin, selected.iter().filter(|o| bin.contains(o.multiplicity as f64))))
        .collect_vec();
    let by_z = z_bins(sigma, k).into_iter()
        .filter_map(|bin| summarize(bin, selected.iter().filter(|o| bin.contains(o.z_true))))
        .collect_vec();

    let report = Report {
        sigma,
        sigmas: k,
        events: selected.len(),
        reconstructed: selected.iter().filter(|o| o.z_reco.is_some()).count(),
        by_multiplicity,
        by_z,
    };
    info!("Analysed {} events, {} reconstructed", group_digits(report.events), group_digits(report.reconstructed));
    report
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "true vertex z: σ = {:.3} mm, analysed |z| <= {} σ", self.sigma, self.sigmas)?;
        writeln!(f, "events: {}   reconstructed: {}", group_digits(self.events), group_digits(self.reconstructed))?;
        write_table(f, "multiplicity", &self.by_multiplicity)?;
        write_table(f, "z true (mm)", &self.by_z)
    }
}

fn write_table(f: &mut fmt::Formatter<'_>, title: &str, rows: &[BinResult]) -> fmt::Result {
    writeln!(f)?;
    writeln!(f, "{title:>20} {:>8} {:>8} {:>18} {:>22}", "events", "reco", "efficiency", "resolution (mm)")?;
    for r in rows {
        let range = format!("[{:.1}, {:.1})", r.bin.low, r.bin.high);
        let resolution = r.resolution.map_or_else(|| "-".into(), |m| m.to_string());
        writeln!(f, "{range:>20} {:>8} {:>8} {:>18} {:>22}",
                 r.events, r.reconstructed, r.efficiency.to_string(), resolution)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use float_eq::assert_float_eq;
    #[allow(unused)] use pretty_assertions::{assert_eq, assert_ne};

    fn pv(event_id: u64, z: f64, multiplicity: u32) -> PrimaryVertex {
        PrimaryVertex { x: 0.0, y: 0.0, z, multiplicity, event_id }
    }

    fn rv(event_id: u64, z: f64) -> ReconstructedVertex { ReconstructedVertex { z, event_id } }

    #[test]
    fn multiplicity_binning() {
        let centres = multiplicity_bins(3, 52).iter().map(|b| b.centre).collect_vec();
        assert_eq!(centres, vec![3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 13.0, 16.0, 19.0, 22.0,
                                 25.0, 31.0, 37.0, 43.0, 49.0]);
        let bins = multiplicity_bins(58, 80);
        assert_eq!(bins[0], Bin { centre: 58.0, low: 56.5, high: 59.5 });
        assert_eq!(bins[1], Bin { centre: 64.0, low: 61.5, high: 66.5 });
        assert_eq!(bins[2].centre, 74.0);
        assert!(multiplicity_bins(10, 10).is_empty());
    }

    #[test]
    fn z_binning_is_symmetric() {
        let bins = z_bins(3.0, 3.0);
        let centres = bins.iter().map(|b| b.centre).collect_vec();
        let expected = [-8.5, -6.5, -4.5, -3.0, -2.0, -1.0, 0.0, 1.0, 2.0, 3.0, 4.5, 6.5, 8.5];
        assert_eq!(centres.len(), expected.len());
        for (c, e) in centres.iter().zip(expected) {
            assert_float_eq!(*c, e, abs <= 1e-9);
        }
        assert_float_eq!(bins[ 0].high - bins[ 0].low, 2.0, abs <= 1e-12);
        assert_float_eq!(bins[ 6].high - bins[ 6].low, 1.0, abs <= 1e-12);
        assert_float_eq!(bins[12].high - bins[12].low, 2.0, abs <= 1e-12);
        assert!(z_bins(0.0, 3.0).is_empty());
    }

    #[rstest]
    #[case::reference_width(53.0 , 3.0)]
    #[case::non_integer    ( 2.887, 3.0)]
    #[case::fractional_k   (12.3 , 2.5)]
    #[case::within_one_sigma(0.7 , 0.9)]
    fn z_bins_tile_the_whole_range(#[case] sigma: f64, #[case] k: f64) {
        let bins = z_bins(sigma, k);
        assert!(bins.iter().any(|b| b.centre == 0.0));
        for pair in bins.windows(2) {
            assert_eq!(pair[0].high, pair[1].low);
        }
        let n = 10_000;
        for i in 0..=n {
            let z = (-k * sigma + 2.0 * k * sigma * i as f64 / n as f64).min(k * sigma);
            let hits = bins.iter().filter(|b| b.contains(z)).count();
            assert_eq!(hits, 1, "z = {z} falls in {hits} bins");
        }
    }

    #[test]
    fn every_analysed_event_is_binned_in_z() {
        let primaries = (0..200).map(|i| pv(i + 1, (i as f64 - 99.5) * 0.05, 5)).collect_vec();
        let reco = primaries.iter().map(|v| rv(v.event_id, v.z)).collect_vec();
        let settings = Analysis { sigmas: 3.0, min_multiplicity: 3, max_multiplicity: 52 };
        let report = analyse(&primaries, &reco, &settings);
        assert_eq!(report.events, 200);
        let binned: usize = report.by_z.iter().map(|r| r.events).sum();
        assert_eq!(binned, 200);
    }

    #[test]
    fn first_vertex_is_the_truth() {
        let primaries = [pv(1, 4.0, 10), pv(1, -20.0, 5), pv(2, 1.0, 3)];
        let reco = [rv(2, 1.1)];
        let outcomes = outcomes(&primaries, &reco);
        assert_eq!(outcomes, vec![
            Outcome { event_id: 1, z_true: 4.0, multiplicity: 15, z_reco: None },
            Outcome { event_id: 2, z_true: 1.0, multiplicity:  3, z_reco: Some(1.1) },
        ]);
    }

    #[test]
    fn efficiency_and_resolution() {
        let primaries = (1..=4).map(|id| pv(id, 0.0, 5)).collect_vec();
        let reco = [rv(1, 0.1), rv(2, -0.1), rv(3, 0.1)];
        let bin = Bin::new(5.0, 0.5);
        let outcomes = outcomes(&primaries, &reco);
        let r = summarize(bin, outcomes.iter()).unwrap();
        assert_eq!((r.events, r.reconstructed), (4, 3));
        assert_float_eq!(r.efficiency.value, 0.75, ulps <= 1);
        assert_float_eq!(r.efficiency.error, (0.75 * 0.25 / 4.0_f64).sqrt(), ulps <= 2);
        let resolution = r.resolution.unwrap();
        assert_float_eq!(resolution.value, 0.1, abs <= 1e-12);
        assert_float_eq!(resolution.error, 0.1 / 6.0_f64.sqrt(), abs <= 1e-12);
    }

    #[test]
    fn nothing_reconstructed_has_no_resolution() {
        let outcomes = outcomes(&[pv(1, 0.0, 5)], &[]);
        let r = summarize(Bin::new(5.0, 0.5), outcomes.iter()).unwrap();
        assert_eq!(r.efficiency, Measurement { value: 0.0, error: 0.0 });
        assert_eq!(r.resolution, None);
        assert_eq!(summarize(Bin::new(5.0, 0.5), [].iter()), None);
    }

    #[test]
    fn events_far_from_centre_are_excluded() {
        // The event at 50 mm lies beyond 3σ
        let mut primaries = (1..=100).map(|id| pv(id, if id % 2 == 0 { 1.0 } else { -1.0 }, 4)).collect_vec();
        primaries.push(pv(101, 50.0, 4));
        let reco = (1..=101).map(|id| rv(id, 0.0)).collect_vec();
        let settings = Analysis { sigmas: 3.0, min_multiplicity: 3, max_multiplicity: 52 };
        let report = analyse(&primaries, &reco, &settings);
        assert_eq!(report.events, 100);
        assert_eq!(report.reconstructed, 100);
        assert_eq!(report.by_multiplicity.len(), 1);
        assert_eq!(report.by_multiplicity[0].bin.centre, 4.0);
        let text = report.to_string();
        assert!(text.contains("multiplicity"));
        assert!(text.contains("resolution"));
    }
}
