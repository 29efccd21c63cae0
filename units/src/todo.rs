/// Units which are simply type aliases for `f64` rather than having an
/// implementation as a `uom` `Quantity`.
///
/// The transport and reconstruction loops work on `nalgebra` vectors of plain
/// floats, in a fixed set of units:
///
/// + lengths in mm
///
/// + times in ns
///
/// + momenta in GeV/c, masses and energies in GeV (natural units)
///
/// These aliases are clues in the source as to what each float represents.

pub type Lengthf64   = f64;
pub type Timef64     = f64;
pub type Velocityf64 = f64;
pub type Ratiof64    = f64;
pub type Anglef64    = f64;
pub type Momentumf64 = f64; // GeV/c
pub type Massf64     = f64; // GeV/c²
pub type Energyf64   = f64; // GeV
