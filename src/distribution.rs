//! Sampling from binned (empirical) distributions.
//!
//! A draw first picks a bin with probability proportional to its density,
//! then a uniformly distributed position inside that bin. Analytic shapes are
//! turned into this form by evaluating their density at the bin centres.

use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DistributionError {
    #[error("need at least two bin edges along each axis")]
    TooFewEdges,

    #[error("expected {expected} densities, got {got}")]
    ShapeMismatch { expected: usize, got: usize },

    #[error("bin edges must be finite and non-decreasing")]
    UnorderedEdges,

    #[error("densities must be finite, non-negative and not all zero")]
    BadDensities,

    #[error("need at least one bin")]
    NoBins,

    #[error("invalid parameter: {0}")]
    Parameter(&'static str),
}

type Result<T> = std::result::Result<T, DistributionError>;

/// One-dimensional binned distribution
#[derive(Clone, Debug)]
pub struct Empirical1D {
    edges: Vec<f64>,
    bins: WeightedIndex<f64>,
}

impl Empirical1D {

    /// `densities[i]` is the relative density between `edges[i]` and `edges[i+1]`
    pub fn new(edges: Vec<f64>, densities: &[f64]) -> Result<Self> {
        check_edges(&edges)?;
        let expected = edges.len() - 1;
        if densities.len() != expected {
            return Err(DistributionError::ShapeMismatch { expected, got: densities.len() })
        }
        let bins = weights(densities)?;
        Ok(Self { edges, bins })
    }

    /// Always produce `value`
    pub fn fixed(value: f64) -> Self {
        Self::new(vec![value, value], &[1.0])
            .unwrap_or_else(|_| unreachable!("a single unit-weight bin is always valid"))
    }

    pub fn uniform(min: f64, max: f64) -> Result<Self> {
        if !(min < max) { return Err(DistributionError::Parameter("uniform range is empty")) }
        Self::new(vec![min, max], &[1.0])
    }

    /// Tabulate `density` at the centres of `n` equal bins spanning `[min, max)`
    pub fn tabulate(min: f64, max: f64, n: usize, density: impl Fn(f64) -> f64) -> Result<Self> {
        let edges = equal_bins(min, max, n)?;
        let densities: Vec<f64> = edges.windows(2)
            .map(|w| density((w[0] + w[1]) / 2.0))
            .collect();
        Self::new(edges, &densities)
    }

    pub fn edges(&self) -> &[f64] { &self.edges }
}

impl Distribution<f64> for Empirical1D {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let i = self.bins.sample(rng);
        uniform_in(self.edges[i], self.edges[i+1], rng)
    }
}

/// Two-dimensional binned distribution
///
/// Cells are stored row-major: the density of cell `(ix, iy)` sits at
/// `ix * (y_edges.len() - 1) + iy`. Draws are `(x, y)` pairs.
#[derive(Clone, Debug)]
pub struct Empirical2D {
    x_edges: Vec<f64>,
    y_edges: Vec<f64>,
    cells: WeightedIndex<f64>,
}

impl Empirical2D {

    pub fn new(x_edges: Vec<f64>, y_edges: Vec<f64>, densities: &[f64]) -> Result<Self> {
        check_edges(&x_edges)?;
        check_edges(&y_edges)?;
        let expected = (x_edges.len() - 1) * (y_edges.len() - 1);
        if densities.len() != expected {
            return Err(DistributionError::ShapeMismatch { expected, got: densities.len() })
        }
        let cells = weights(densities)?;
        Ok(Self { x_edges, y_edges, cells })
    }

    pub fn fixed(x: f64, y: f64) -> Self {
        Self::new(vec![x, x], vec![y, y], &[1.0])
            .unwrap_or_else(|_| unreachable!("a single unit-weight cell is always valid"))
    }

    pub fn uniform((x_min, x_max): (f64, f64), (y_min, y_max): (f64, f64)) -> Result<Self> {
        if !(x_min < x_max && y_min < y_max) {
            return Err(DistributionError::Parameter("uniform range is empty"))
        }
        Self::new(vec![x_min, x_max], vec![y_min, y_max], &[1.0])
    }

    /// Tabulate `density` at the centres of an `nx` by `ny` grid of equal cells
    pub fn tabulate(
        (x_min, x_max): (f64, f64), nx: usize,
        (y_min, y_max): (f64, f64), ny: usize,
        density: impl Fn(f64, f64) -> f64,
    ) -> Result<Self> {
        let x_edges = equal_bins(x_min, x_max, nx)?;
        let y_edges = equal_bins(y_min, y_max, ny)?;
        let centres = |edges: &[f64]| -> Vec<f64> { edges.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect() };
        let (xs, ys) = (centres(&x_edges), centres(&y_edges));
        let densities: Vec<f64> = itertools::iproduct!(&xs, &ys)
            .map(|(&x, &y)| density(x, y))
            .collect();
        Self::new(x_edges, y_edges, &densities)
    }
}

impl Distribution<(f64, f64)> for Empirical2D {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> (f64, f64) {
        let ny = self.y_edges.len() - 1;
        let cell = self.cells.sample(rng);
        let (ix, iy) = (cell / ny, cell % ny);
        let x = uniform_in(self.x_edges[ix], self.x_edges[ix+1], rng);
        let y = uniform_in(self.y_edges[iy], self.y_edges[iy+1], rng);
        (x, y)
    }
}

/// Unnormalized Gaussian density
pub fn gauss(mean: f64, sigma: f64) -> impl Fn(f64) -> f64 {
    move |x| { let u = (x - mean) / sigma; (-0.5 * u * u).exp() }
}

/// Poisson probability of the integer part of `x`
pub fn poisson(mean: f64) -> impl Fn(f64) -> f64 {
    move |x| {
        if x < 0.0 { return 0.0 }
        let k = x.floor() as u64;
        let ln_factorial: f64 = (2..=k).map(|i| (i as f64).ln()).sum();
        (k as f64 * mean.ln() - mean - ln_factorial).exp()
    }
}

fn uniform_in<R: Rng + ?Sized>(lo: f64, hi: f64, rng: &mut R) -> f64 {
    lo + (hi - lo) * rng.gen::<f64>()
}

fn equal_bins(min: f64, max: f64, n: usize) -> Result<Vec<f64>> {
    if n == 0 { return Err(DistributionError::NoBins) }
    if !(min < max) { return Err(DistributionError::UnorderedEdges) }
    let width = (max - min) / n as f64;
    Ok((0..=n).map(|i| if i == n { max } else { min + i as f64 * width }).collect())
}

fn check_edges(edges: &[f64]) -> Result<()> {
    if edges.len() < 2 { return Err(DistributionError::TooFewEdges) }
    let ordered = edges.iter().all(|e| e.is_finite()) && edges.windows(2).all(|w| w[0] <= w[1]);
    if ordered { Ok(()) } else { Err(DistributionError::UnorderedEdges) }
}

fn weights(densities: &[f64]) -> Result<WeightedIndex<f64>> {
    if densities.iter().any(|d| !d.is_finite()) { return Err(DistributionError::BadDensities) }
    WeightedIndex::new(densities).map_err(|_| DistributionError::BadDensities)
}
