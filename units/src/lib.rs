//! Quantities used across the transport and reconstruction code.
//!
//! Configuration and command-line values carry explicit units via `uom`. The
//! numerical core works in a fixed set of units (mm, ns, GeV/c, GeV/c²) on
//! plain `f64`s, whose aliases live in `todo`.

pub mod todo;

pub use uom;
pub use float_eq;

pub use uom::si::Quantity;
pub use uom::si::f64::{Angle, Length, Mass, Ratio, Time, Velocity};

mod units {
  pub use uom::si::{length  ::{micrometer, millimeter, centimeter, meter},
                    time    ::{nanosecond, picosecond},
                    velocity::meter_per_second,
                    ratio   ::ratio,
                    angle   ::{radian, degree, revolution},
  };
}

pub use units::{micrometer, millimeter, centimeter, nanosecond};

// Making values from float literals is very long-winded, so provide some
// pithily-named convenience constructors.

/// Generate a function called NAME which returns QUANTITY by interpreting its
/// argument as UNIT
///
/// wrap!(NAME QUANTITY UNIT);
macro_rules! wrap {
  ($name:ident $quantity:ident $unit:ident ) => {
    pub fn $name(x: f64) -> $quantity { $quantity::new::<units::$unit>(x) }
  };
}

wrap!(m      Length              meter);
wrap!(cm     Length         centimeter);
wrap!(mm     Length         millimeter);
wrap!(um     Length         micrometer);
wrap!(ns     Time           nanosecond);
wrap!(ps     Time           picosecond);
wrap!(m_s    Velocity meter_per_second);
wrap!(ratio  Ratio               ratio);
wrap!(radian Angle              radian);
wrap!(degree Angle              degree);
wrap!(turn   Angle          revolution);

pub fn mrad(x: f64) -> Angle { radian(x / 1000.0) }

// Reverse direction of the above: back to the plain floats of the numerical core.
pub fn mm_(x: Length) -> todo::Lengthf64 { x.get::<units::millimeter>() }
pub fn um_(x: Length) -> todo::Lengthf64 { x.get::<units::micrometer>() }
pub fn ns_(x: Time  ) -> todo::Timef64   { x.get::<units::nanosecond>() }
pub fn ps_(x: Time  ) -> todo::Timef64   { x.get::<units::picosecond>() }

pub fn ratio_ (x: Ratio) -> todo::Ratiof64 { x.get::<units::ratio>() }
pub fn radian_(x: Angle) -> todo::Anglef64 { x.get::<units::radian>() }
pub fn mrad_  (x: Angle) -> todo::Anglef64 { radian_(x) * 1000.0 }

/// Speed of light in the units of the numerical core
#[allow(clippy::excessive_precision)] // Stick to official definition of c
pub const C: todo::Velocityf64 = 299.792_458; // mm / ns

/// The full circle constant (τ) Equal to 2π.
pub const TWOPI: todo::Anglef64 = std::f64::consts::TAU;

#[macro_export]
macro_rules! assert_uom_eq {
  ($unit:ident, $lhs:expr, $rhs:expr, $algo:ident <= $tol:expr) => {
    $crate::float_eq::assert_float_eq!($lhs.get::<$unit>(), $rhs.get::<$unit>(), $algo <= $tol)
  };
}

#[cfg(test)]
mod tests {
  use super::*;
  use float_eq::assert_float_eq;

  #[test]
  fn lengths_sum_across_units() {
    let v = vec![mm(1.0), cm(1.0), um(500.0)];
    let total: Length = v.into_iter().sum();
    assert_uom_eq!(micrometer, total, mm(11.5), ulps <= 2);
  }

  #[test]
  fn reverse_accessors_use_core_units() {
    assert_float_eq!(mm_(cm(4.0))   ,   40.0, ulps <= 1);
    assert_float_eq!(um_(mm(0.12))  ,  120.0, r2nd <= 1e-12);
    assert_float_eq!(ns_(ps(1500.0)),    1.5, ulps <= 1);
    assert_float_eq!(mrad_(mrad(20.0)), 20.0, r2nd <= 1e-12);
  }

  #[test]
  fn parse_quantities_with_units() -> Result<(), Box<dyn std::error::Error>> {
    let l: Length = "4 cm".parse()?;
    assert_eq!(l, cm(4.0));
    let l: Length = "200 µm".parse()?;
    assert_uom_eq!(millimeter, l, mm(0.2), r2nd <= 1e-12);
    let a: Angle = "0.001 rad".parse()?;
    assert_eq!(a, mrad(1.0));
    Ok(())
  }
}
