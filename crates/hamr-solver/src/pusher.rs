//! Particle pusher.
//!
//! Positions are in cell units of the particle's level, so a velocity
//! `v` moves a particle by `v dt / dx` cells per step. The modified Boris
//! scheme splits the position update around the velocity update:
//!
//! ```text
//! x(n+1/2) = x(n) + vx(n) dt / 2dx
//! v(n+1)   = boris(v(n), E(x(n+1/2)), B(x(n+1/2)))
//! x(n+1)   = x(n+1/2) + vx(n+1) dt / 2dx
//! ```

use std::fmt;
use std::str::FromStr;

use hamr_core::{AmrBox, Particle, ParticleArray};
use hamr_model::interpolator::gather_vector;

use crate::numerics::{cross, VecRef};
use crate::SolverError;

/// Known particle pushers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Pusher {
    /// Boris rotation with split position updates.
    #[default]
    ModifiedBoris,
}

impl Pusher {
    /// Configuration name.
    pub fn name(self) -> &'static str {
        match self {
            Self::ModifiedBoris => "modified_boris",
        }
    }

    /// Stepper for particles of `mass` over `dt` on cells of `mesh_size`.
    pub fn stepper(self, dt: f64, mass: f64, mesh_size: f64) -> ModifiedBoris {
        match self {
            Self::ModifiedBoris => ModifiedBoris::new(dt, mass, mesh_size),
        }
    }
}

impl FromStr for Pusher {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "modified_boris" => Ok(Self::ModifiedBoris),
            other => Err(SolverError::UnknownPusher {
                name: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Pusher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether a push commits the moved particles to the patch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PushMode {
    /// Moments are deposited from moved copies; particles stay put.
    MomentsOnly,
    /// Moved particles replace the patch particles.
    Commit,
}

/// Modified Boris stepper for one species and time step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModifiedBoris {
    half_dt_over_dx: f64,
    dt_over_2m: f64,
}

impl ModifiedBoris {
    /// Stepper for particles of `mass` over `dt` on cells of `mesh_size`.
    pub fn new(dt: f64, mass: f64, mesh_size: f64) -> Self {
        Self {
            half_dt_over_dx: 0.5 * dt / mesh_size,
            dt_over_2m: 0.5 * dt / mass,
        }
    }

    fn advance_position(&self, particle: &mut Particle) {
        let x = particle.position() + self.half_dt_over_dx * particle.v[0];
        particle.set_position(x);
    }

    /// Boris velocity update in fields `e`, `b`.
    pub fn accelerate(&self, v: [f64; 3], charge: f64, e: [f64; 3], b: [f64; 3]) -> [f64; 3] {
        let k = charge * self.dt_over_2m;
        let minus = [0, 1, 2].map(|c| v[c] + k * e[c]);
        let t = b.map(|c| k * c);
        let t2 = t.iter().map(|c| c * c).sum::<f64>();
        let s = t.map(|c| 2.0 * c / (1.0 + t2));
        let prime = {
            let r = cross(minus, t);
            [0, 1, 2].map(|c| minus[c] + r[c])
        };
        let plus = {
            let r = cross(prime, s);
            [0, 1, 2].map(|c| minus[c] + r[c])
        };
        [0, 1, 2].map(|c| plus[c] + k * e[c])
    }

    /// Advance `particle` one step in the fields `e`, `b`.
    pub fn push(&self, particle: &mut Particle, e: VecRef<'_>, b: VecRef<'_>) {
        self.advance_position(particle);
        let ep = gather_vector(e, particle);
        let bp = gather_vector(b, particle);
        particle.v = self.accelerate(particle.v, particle.charge, ep, bp);
        self.advance_position(particle);
    }

    /// Push a copy of every particle of `particles`.
    pub fn push_copies(
        &self,
        particles: &[Particle],
        e: VecRef<'_>,
        b: VecRef<'_>,
    ) -> ParticleArray {
        particles
            .iter()
            .map(|p| {
                let mut p = *p;
                self.push(&mut p, e, b);
                p
            })
            .collect()
    }
}

/// Particles of `moved` whose cell lies in `cells`.
pub fn select_in(moved: &[Particle], cells: AmrBox) -> impl Iterator<Item = &Particle> + '_ {
    moved.iter().filter(move |p| cells.contains(p.i_cell))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hamr_amr::FieldData;
    use hamr_core::{GridLayout, Quantity};
    use proptest::prelude::*;

    fn uniform(quantities: [Quantity; 3], values: [f64; 3]) -> [FieldData; 3] {
        let layout = GridLayout::new(AmrBox::new(0, 19), 0.1, 0.0);
        [0, 1, 2].map(|c| {
            let mut f = FieldData::new(quantities[c], layout.clone(), 0.0);
            f.fill(values[c]);
            f
        })
    }

    fn em(e: [f64; 3], b: [f64; 3]) -> ([FieldData; 3], [FieldData; 3]) {
        (
            uniform([Quantity::Ex, Quantity::Ey, Quantity::Ez], e),
            uniform([Quantity::Bx, Quantity::By, Quantity::Bz], b),
        )
    }

    fn refs(v: &[FieldData; 3]) -> VecRef<'_> {
        [&v[0], &v[1], &v[2]]
    }

    #[test]
    fn names_round_trip_through_the_config_string() {
        assert_eq!("modified_boris".parse::<Pusher>(), Ok(Pusher::ModifiedBoris));
        assert_eq!(Pusher::default().to_string(), "modified_boris");
        assert!(matches!(
            "leapfrog".parse::<Pusher>(),
            Err(SolverError::UnknownPusher { name }) if name == "leapfrog"
        ));
    }

    #[test]
    fn free_particle_drifts_by_v_dt_over_dx_cells() {
        let (e, b) = em([0.0; 3], [0.0; 3]);
        let boris = ModifiedBoris::new(0.01, 1.0, 0.1);
        let mut p = Particle::at_position(5.5, 1.0, 1.0, [2.0, 1.0, 0.0]);
        boris.push(&mut p, refs(&e), refs(&b));
        assert!((p.position() - 5.7).abs() < 1e-12);
        assert_eq!(p.v, [2.0, 1.0, 0.0]);
    }

    #[test]
    fn uniform_electric_field_accelerates_by_q_e_dt_over_m() {
        let (e, b) = em([0.0, 3.0, 0.0], [0.0; 3]);
        let boris = ModifiedBoris::new(0.01, 2.0, 0.1);
        let mut p = Particle::at_position(5.5, 1.0, 1.0, [0.0; 3]);
        boris.push(&mut p, refs(&e), refs(&b));
        assert!((p.v[1] - 0.015).abs() < 1e-14);
    }

    #[test]
    fn magnetic_rotation_turns_vy_towards_minus_vz_for_bx() {
        let boris = ModifiedBoris::new(0.1, 1.0, 0.1);
        let v = boris.accelerate([0.0, 1.0, 0.0], 1.0, [0.0; 3], [1.0, 0.0, 0.0]);
        assert!(v[2] < 0.0);
        assert!(v[1] > 0.0 && v[1] < 1.0);
    }

    #[test]
    fn copies_leave_the_originals_in_place() {
        let (e, b) = em([0.0; 3], [0.0; 3]);
        let boris = ModifiedBoris::new(0.1, 1.0, 0.1);
        let particles = vec![Particle::at_position(3.2, 1.0, 1.0, [1.0, 0.0, 0.0])];
        let moved = boris.push_copies(&particles, refs(&e), refs(&b));
        assert_eq!(particles[0].i_cell, 3);
        assert_eq!(moved[0].i_cell, 4);
        assert_eq!(select_in(&moved, AmrBox::new(0, 3)).count(), 0);
        assert_eq!(select_in(&moved, AmrBox::new(4, 9)).count(), 1);
    }

    proptest! {
        #[test]
        fn pure_magnetic_push_conserves_speed(
            vx in -2.0f64..2.0, vy in -2.0f64..2.0, vz in -2.0f64..2.0,
            bx in -3.0f64..3.0, by in -3.0f64..3.0, bz in -3.0f64..3.0,
        ) {
            let boris = ModifiedBoris::new(0.05, 1.0, 0.1);
            let v = [vx, vy, vz];
            let after = boris.accelerate(v, 1.0, [0.0; 3], [bx, by, bz]);
            let speed = |v: [f64; 3]| v.iter().map(|c| c * c).sum::<f64>();
            prop_assert!((speed(after) - speed(v)).abs() < 1e-10);
        }
    }
}
