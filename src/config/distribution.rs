//! Distribution definitions as written in the configuration file.
//!
//! Values are plain numbers in the units of the quantity being drawn: mm for
//! positions and offsets, GeV/c for momenta, radians for angles.

use serde::Deserialize;

use crate::distribution::{gauss, poisson, DistributionError, Empirical1D, Empirical2D};

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Dist1 {
    Fixed     { value: f64 },
    Uniform   { min: f64, max: f64 },
    Gauss     { mean: f64, sigma: f64, min: f64, max: f64, bins: usize },
    Poisson   { mean: f64, min: f64, max: f64, bins: usize },
    Histogram { edges: Vec<f64>, densities: Vec<f64> },
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Dist2 {
    Fixed     { x: f64, y: f64 },
    Uniform   { x_min: f64, x_max: f64, y_min: f64, y_max: f64 },
    Gauss     { mean_x: f64, sigma_x: f64, mean_y: f64, sigma_y: f64,
                half_width_x: f64, half_width_y: f64, bins: usize },
    Histogram { x_edges: Vec<f64>, y_edges: Vec<f64>, densities: Vec<f64> },
}

impl Dist1 {
    pub fn build(&self) -> Result<Empirical1D, DistributionError> {
        use Dist1::*;
        match *self {
            Fixed { value } => Ok(Empirical1D::fixed(value)),
            Uniform { min, max } => Empirical1D::uniform(min, max),
            Gauss { mean, sigma, min, max, bins } => {
                positive(sigma, "sigma must be positive")?;
                Empirical1D::tabulate(min, max, bins, gauss(mean, sigma))
            }
            Poisson { mean, min, max, bins } => {
                positive(mean, "mean must be positive")?;
                Empirical1D::tabulate(min, max, bins, poisson(mean))
            }
            Histogram { ref edges, ref densities } => Empirical1D::new(edges.clone(), densities),
        }
    }
}

impl Dist2 {
    pub fn build(&self) -> Result<Empirical2D, DistributionError> {
        use Dist2::*;
        match *self {
            Fixed { x, y } => Ok(Empirical2D::fixed(x, y)),
            Uniform { x_min, x_max, y_min, y_max } => Empirical2D::uniform((x_min, x_max), (y_min, y_max)),
            Gauss { mean_x, sigma_x, mean_y, sigma_y, half_width_x: hx, half_width_y: hy, bins } => {
                positive(sigma_x, "sigma_x must be positive")?;
                positive(sigma_y, "sigma_y must be positive")?;
                let (gx, gy) = (gauss(mean_x, sigma_x), gauss(mean_y, sigma_y));
                Empirical2D::tabulate((mean_x - hx, mean_x + hx), bins,
                                      (mean_y - hy, mean_y + hy), bins,
                                      |x, y| gx(x) * gy(y))
            }
            Histogram { ref x_edges, ref y_edges, ref densities } =>
                Empirical2D::new(x_edges.clone(), y_edges.clone(), densities),
        }
    }
}

fn positive(x: f64, message: &'static str) -> Result<(), DistributionError> {
    if x > 0.0 { Ok(()) } else { Err(DistributionError::Parameter(message)) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Deserialize, Debug)]
    struct X { d: Dist1, e: Option<Dist2> }

    #[test]
    fn tagged_tables() {
        let x: X = toml::from_str(r#"
            d = { kind = "gauss", mean = 1.2, sigma = 0.1, min = 0.0, max = 10.0, bins = 100 }
            e = { kind = "fixed", x = 0.0, y = 0.5 }
        "#).unwrap();
        assert_eq!(x.d, Dist1::Gauss { mean: 1.2, sigma: 0.1, min: 0.0, max: 10.0, bins: 100 });
        assert_eq!(x.e, Some(Dist2::Fixed { x: 0.0, y: 0.5 }));
    }

    #[test]
    fn histogram_table() {
        let x: X = toml::from_str(r#"
            [d]
            kind = "histogram"
            edges = [0.0, 1.0, 2.0]
            densities = [3.0, 1.0]
        "#).unwrap();
        assert!(x.d.build().is_ok());
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let x: Result<X, _> = toml::from_str(r#"d = { kind = "lorentz", mean = 1.0 }"#);
        assert!(x.is_err());
    }

    #[test]
    fn bad_parameters_are_reported() {
        let zero_sigma = Dist1::Gauss { mean: 0.0, sigma: 0.0, min: -1.0, max: 1.0, bins: 10 };
        assert_eq!(zero_sigma.build().unwrap_err(), DistributionError::Parameter("sigma must be positive"));
        let no_bins = Dist2::Gauss { mean_x: 0.0, sigma_x: 1.0, mean_y: 0.0, sigma_y: 1.0,
                                     half_width_x: 1.0, half_width_y: 1.0, bins: 0 };
        assert_eq!(no_bins.build().unwrap_err(), DistributionError::NoBins);
    }
}
