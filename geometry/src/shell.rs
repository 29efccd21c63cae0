use units::todo::Lengthf64;

pub const PIPE : usize = 0;
pub const INNER: usize = 1;
pub const OUTER: usize = 2;

/// Scattering properties of the material a shell is made of
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    /// Atomic number entering the Highland formula
    pub atomic_number: f64,
    pub radiation_length: Lengthf64,
}

/// One cylindrical layer, centred on the z-axis
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Shell {
    /// Position in the geometry: 0 is the passive beam pipe, 1 and 2 are the
    /// sensitive silicon layers, inner then outer.
    pub index: usize,

    /// Mean radius: the surface on which interactions are placed
    pub radius: Lengthf64,

    pub half_thickness: Lengthf64,

    /// Interactions are only accepted for `|z| < half_length`
    pub half_length: Lengthf64,

    pub material: Material,
}

impl Shell {

    pub fn new(radius: Lengthf64, thickness: Lengthf64, half_length: Lengthf64, material: Material) -> Self {
        Self { index: 0, radius, half_thickness: thickness / 2.0, half_length, material }
    }

    pub fn thickness   (&self) -> Lengthf64 { 2.0 * self.half_thickness }
    pub fn inner_radius(&self) -> Lengthf64 { self.radius - self.half_thickness }
    pub fn outer_radius(&self) -> Lengthf64 { self.radius + self.half_thickness }

    pub fn sensitive(&self) -> bool { self.index != PIPE }

    pub fn covers(&self, z: Lengthf64) -> bool { z.abs() < self.half_length }
}

/// The three shells of the detector, in physical order
#[derive(Clone, Debug, PartialEq)]
pub struct Geometry {
    shells: [Shell; 3],
}

impl Geometry {

    /// Assemble the detector. Indices are assigned in argument order, which
    /// must also be increasing radial order.
    pub fn new(pipe: Shell, inner: Shell, outer: Shell) -> Self {
        let mut shells = [pipe, inner, outer];
        for (index, shell) in shells.iter_mut().enumerate() {
            shell.index = index;
        }
        Self { shells }
    }

    pub fn shells(&self) -> &[Shell; 3] { &self.shells }

    pub fn pipe (&self) -> &Shell { &self.shells[PIPE ] }
    pub fn inner(&self) -> &Shell { &self.shells[INNER] }
    pub fn outer(&self) -> &Shell { &self.shells[OUTER] }

    pub fn shell(&self, index: usize) -> &Shell { &self.shells[index] }

    /// Check that shells do not overlap and are radially ordered
    pub fn is_radially_ordered(&self) -> bool {
        self.shells.windows(2).all(|pair| pair[0].outer_radius() <= pair[1].inner_radius())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SI: Material = Material { atomic_number: 14.0, radiation_length: 93.7 };

    fn layer(radius: Lengthf64) -> Shell { Shell::new(radius, 0.2, 135.0, SI) }

    #[test]
    fn indices_follow_construction_order() {
        let g = Geometry::new(layer(30.0), layer(40.0), layer(70.0));
        let indices: Vec<_> = g.shells().iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert!(!g.pipe().sensitive());
        assert!( g.inner().sensitive());
        assert!( g.outer().sensitive());
    }

    #[test]
    fn radial_order() {
        assert!( Geometry::new(layer(30.0), layer(40.0), layer(70.0)).is_radially_ordered());
        assert!(!Geometry::new(layer(40.0), layer(30.0), layer(70.0)).is_radially_ordered());
        // Overlapping thicknesses
        assert!(!Geometry::new(layer(30.0), layer(30.1), layer(70.0)).is_radially_ordered());
    }

    #[test]
    fn half_length_window_is_open() {
        let s = layer(40.0);
        assert!( s.covers(134.9));
        assert!( s.covers(-134.9));
        assert!(!s.covers(135.0));
        assert!(!s.covers(-135.0));
    }
}
