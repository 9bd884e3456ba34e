//! Macro-particles.

/// An ion macro-particle.
///
/// The position is split into the AMR index of the cell holding the
/// particle and the offset within that cell, so that positions stay exact
/// far from the origin and level changes are integer arithmetic.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
    /// Density contribution of the particle (density normalized).
    pub weight: f64,
    /// Charge.
    pub charge: f64,
    /// AMR index of the cell holding the particle.
    pub i_cell: i32,
    /// Offset within the cell, in `[0, 1)`.
    pub delta: f64,
    /// Velocity.
    pub v: [f64; 3],
}

/// A list of particles.
pub type ParticleArray = Vec<Particle>;

impl Particle {
    /// Particle located at `position`, expressed in cell units of its level.
    pub fn at_position(position: f64, weight: f64, charge: f64, v: [f64; 3]) -> Self {
        let mut p = Self {
            weight,
            charge,
            i_cell: 0,
            delta: 0.0,
            v,
        };
        p.set_position(position);
        p
    }

    /// Position in cell units of the particle's level.
    pub fn position(&self) -> f64 {
        self.i_cell as f64 + self.delta
    }

    /// Move the particle to `position` (cell units).
    pub fn set_position(&mut self, position: f64) {
        let cell = position.floor();
        let mut delta = position - cell;
        let mut i_cell = cell as i32;
        if delta >= 1.0 {
            delta -= 1.0;
            i_cell += 1;
        }
        self.i_cell = i_cell;
        self.delta = delta.max(0.0);
    }

    /// Translate the particle by a whole number of cells.
    pub fn shifted(mut self, cells: i32) -> Self {
        self.i_cell += cells;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_positions_split_towards_lower_cell() {
        let p = Particle::at_position(-0.25, 1.0, 1.0, [0.0; 3]);
        assert_eq!(p.i_cell, -1);
        assert!((p.delta - 0.75).abs() < 1e-15);
    }

    #[test]
    fn delta_stays_below_one() {
        let p = Particle::at_position(3.0 - f64::EPSILON, 1.0, 1.0, [0.0; 3]);
        assert!(p.delta < 1.0 && p.delta >= 0.0);
        assert!((p.position() - 3.0).abs() < 1e-12);
    }
}
