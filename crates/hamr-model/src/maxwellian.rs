//! Maxwellian particle loading.
//!
//! Every cell receives `nbr_part_per_cell` particles of weight
//! `n / nbr_part_per_cell` (density normalized), uniformly placed in the
//! cell, with velocities drawn from a drifting Maxwellian. In the magnetic
//! basis the thermal velocity components are parallel and perpendicular
//! to the local magnetic field instead of along x, y and z.
//!
//! Loading is deterministic: the RNG is a `ChaCha8Rng` seeded from the
//! population seed and a caller-provided stream number.

use std::fmt;
use std::str::FromStr;

use hamr_core::dict::constant;
use hamr_core::{Centering, Dict, GridLayout, Particle, ParticleArray, ScalarFunction};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::ModelError;

/// Frame in which thermal velocities are given.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Basis {
    /// x, y, z.
    #[default]
    Cartesian,
    /// Parallel to B, then two perpendicular directions.
    Magnetic,
}

impl FromStr for Basis {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cartesian" => Ok(Self::Cartesian),
            "magnetic" => Ok(Self::Magnetic),
            _ => Err(ModelError::UnknownBasis {
                name: s.to_string(),
            }),
        }
    }
}

/// Fluid moments of one cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellMoments {
    /// Number density.
    pub density: f64,
    /// Bulk velocity.
    pub bulk_velocity: [f64; 3],
    /// Thermal velocity per component (or parallel, perp1, perp2).
    pub thermal_velocity: [f64; 3],
    /// Local magnetic field, used by the magnetic basis.
    pub magnetic_field: [f64; 3],
}

/// Box-Muller standard normal sample.
fn box_muller(rng: &mut ChaCha8Rng) -> f64 {
    let u1: f64 = rng.random::<f64>().max(1e-300);
    let u2: f64 = rng.random();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Drifting Maxwellian sample.
pub fn maxwellian_velocity(rng: &mut ChaCha8Rng, bulk: [f64; 3], thermal: [f64; 3]) -> [f64; 3] {
    let mut v = [0.0; 3];
    for ((out, b), vth) in v.iter_mut().zip(bulk).zip(thermal) {
        *out = b + vth * box_muller(rng);
    }
    v
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn normalized(v: [f64; 3]) -> Option<[f64; 3]> {
    let norm = v.iter().map(|c| c * c).sum::<f64>().sqrt();
    (norm > 0.0).then(|| v.map(|c| c / norm))
}

/// Orthonormal basis `(b̂, ê1, ê2)` attached to the field `b`. A null
/// field gives the Cartesian basis.
pub fn local_magnetic_basis(b: [f64; 3]) -> [[f64; 3]; 3] {
    let Some(e0) = normalized(b) else {
        return [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
    };
    // any axis not parallel to b
    let axis = if e0[0].abs() < 0.9 {
        [1.0, 0.0, 0.0]
    } else {
        [0.0, 1.0, 0.0]
    };
    let e1 = normalized(cross(e0, axis)).unwrap_or([0.0, 0.0, 1.0]);
    let e2 = cross(e0, e1);
    [e0, e1, e2]
}

/// Express `v`, given in `basis`, in Cartesian components.
pub fn basis_transform(basis: &[[f64; 3]; 3], v: [f64; 3]) -> [f64; 3] {
    let mut out = [0.0; 3];
    for (e, c) in basis.iter().zip(v) {
        for (o, ei) in out.iter_mut().zip(e) {
            *o += c * ei;
        }
    }
    out
}

/// Load one cell.
pub fn load_cell(
    rng: &mut ChaCha8Rng,
    cell: i32,
    moments: &CellMoments,
    basis: Basis,
    charge: f64,
    nbr_part_per_cell: usize,
    out: &mut ParticleArray,
) {
    if nbr_part_per_cell == 0 || moments.density <= 0.0 {
        return;
    }
    let weight = moments.density / nbr_part_per_cell as f64;
    let frame = match basis {
        Basis::Cartesian => None,
        Basis::Magnetic => Some(local_magnetic_basis(moments.magnetic_field)),
    };
    for _ in 0..nbr_part_per_cell {
        let v = match &frame {
            None => maxwellian_velocity(rng, moments.bulk_velocity, moments.thermal_velocity),
            Some(frame) => {
                let thermal = maxwellian_velocity(rng, [0.0; 3], moments.thermal_velocity);
                let t = basis_transform(frame, thermal);
                [
                    moments.bulk_velocity[0] + t[0],
                    moments.bulk_velocity[1] + t[1],
                    moments.bulk_velocity[2] + t[2],
                ]
            }
        };
        let delta: f64 = rng.random();
        out.push(Particle::at_position(cell as f64 + delta, weight, charge, v));
    }
}

/// Profiles of one population and how to sample them.
#[derive(Clone)]
pub struct MaxwellianInitializer {
    density: ScalarFunction,
    bulk_velocity: [ScalarFunction; 3],
    thermal_velocity: [ScalarFunction; 3],
    magnetic_field: Option<[ScalarFunction; 3]>,
    charge: f64,
    nbr_part_per_cell: usize,
    basis: Basis,
    seed: u64,
}

impl fmt::Debug for MaxwellianInitializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaxwellianInitializer")
            .field("charge", &self.charge)
            .field("nbr_part_per_cell", &self.nbr_part_per_cell)
            .field("basis", &self.basis)
            .field("seed", &self.seed)
            .finish_non_exhaustive()
    }
}

fn components(dict: &Dict, prefix: &str, default: f64) -> Result<[ScalarFunction; 3], ModelError> {
    let read = |c: &str| dict.value_or(&format!("{prefix}_{c}"), constant(default));
    Ok([read("x")?, read("y")?, read("z")?])
}

impl MaxwellianInitializer {
    /// Read a `particle_initializer` node:
    ///
    /// - `name`: `"maxwellian"` (default);
    /// - `density`, `bulk_velocity_{x,y,z}`, `thermal_velocity_{x,y,z}`:
    ///   scalar functions;
    /// - `nbr_part_per_cell`, `charge`, `basis` (`"cartesian"` or
    ///   `"magnetic"`), `seed`.
    ///
    /// `magnetic_field` is required by the magnetic basis.
    pub fn from_dict(
        dict: &Dict,
        magnetic_field: Option<[ScalarFunction; 3]>,
    ) -> Result<Self, ModelError> {
        let name: String = dict.value_or("name", "maxwellian".to_string())?;
        if !name.eq_ignore_ascii_case("maxwellian") {
            return Err(ModelError::UnknownInitializer { name });
        }
        let basis: Basis = dict.value_or("basis", "cartesian".to_string())?.parse()?;
        if basis == Basis::Magnetic && magnetic_field.is_none() {
            return Err(ModelError::InvalidParameter {
                key: "basis".to_string(),
                reason: "magnetic basis without a magnetic field".to_string(),
            });
        }
        let nbr_part_per_cell: usize = dict.value("nbr_part_per_cell")?;
        if nbr_part_per_cell == 0 {
            return Err(ModelError::InvalidParameter {
                key: "nbr_part_per_cell".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        let seed: i64 = dict.value_or("seed", 1)?;
        Ok(Self {
            density: dict.value("density")?,
            bulk_velocity: components(dict, "bulk_velocity", 0.0)?,
            thermal_velocity: components(dict, "thermal_velocity", 0.0)?,
            magnetic_field,
            charge: dict.value_or("charge", 1.0)?,
            nbr_part_per_cell,
            basis,
            seed: seed as u64,
        })
    }

    /// Uniform initializer, mostly for tests.
    pub fn uniform(density: f64, thermal_velocity: f64, nbr_part_per_cell: usize) -> Self {
        let vth = constant(thermal_velocity);
        let zero = constant(0.0);
        Self {
            density: constant(density),
            bulk_velocity: [zero.clone(), zero.clone(), zero],
            thermal_velocity: [vth.clone(), vth.clone(), vth],
            magnetic_field: None,
            charge: 1.0,
            nbr_part_per_cell,
            basis: Basis::Cartesian,
            seed: 1,
        }
    }

    /// Particle charge.
    pub fn charge(&self) -> f64 {
        self.charge
    }

    /// Particles per cell.
    pub fn nbr_part_per_cell(&self) -> usize {
        self.nbr_part_per_cell
    }

    /// Velocity basis.
    pub fn basis(&self) -> Basis {
        self.basis
    }

    /// Thermal velocity profile, used when loading from fluid moments.
    pub fn thermal_velocity(&self, x: f64) -> [f64; 3] {
        [
            (self.thermal_velocity[0])(x),
            (self.thermal_velocity[1])(x),
            (self.thermal_velocity[2])(x),
        ]
    }

    /// Moments of the cell centered at `x`.
    pub fn moments(&self, x: f64) -> CellMoments {
        CellMoments {
            density: (self.density)(x),
            bulk_velocity: [
                (self.bulk_velocity[0])(x),
                (self.bulk_velocity[1])(x),
                (self.bulk_velocity[2])(x),
            ],
            thermal_velocity: self.thermal_velocity(x),
            magnetic_field: match &self.magnetic_field {
                Some(b) => [(b[0])(x), (b[1])(x), (b[2])(x)],
                None => [0.0; 3],
            },
        }
    }

    /// RNG for one loading stream.
    pub fn rng(&self, stream: u64) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.seed ^ stream.wrapping_mul(0x9E37_79B9_7F4A_7C15))
    }

    /// Load the physical cells of `layout`.
    pub fn load(&self, layout: &GridLayout, stream: u64) -> ParticleArray {
        let mut rng = self.rng(stream);
        let cells = layout.amr_box();
        let mut particles = ParticleArray::with_capacity(cells.len() * self.nbr_part_per_cell);
        for (k, cell) in cells.cells().enumerate() {
            let x = layout.coordinate(
                Centering::Dual,
                layout.physical_start_index(Centering::Dual) + k,
            );
            load_cell(
                &mut rng,
                cell,
                &self.moments(x),
                self.basis,
                self.charge,
                self.nbr_part_per_cell,
                &mut particles,
            );
        }
        particles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hamr_core::AmrBox;
    use proptest::prelude::*;

    #[test]
    fn basis_names_parse_case_insensitively() {
        assert_eq!("Cartesian".parse::<Basis>().unwrap(), Basis::Cartesian);
        assert_eq!("magnetic".parse::<Basis>().unwrap(), Basis::Magnetic);
        assert!(matches!(
            "spherical".parse::<Basis>(),
            Err(ModelError::UnknownBasis { .. })
        ));
    }

    #[test]
    fn load_places_particles_in_their_cells_with_density_weights() {
        let init = MaxwellianInitializer::uniform(2.0, 0.1, 10);
        let layout = GridLayout::new(AmrBox::new(4, 7), 0.5, 0.0);
        let particles = init.load(&layout, 3);
        assert_eq!(particles.len(), 40);
        assert!(particles.iter().all(|p| (4..=7).contains(&p.i_cell)));
        assert!(particles.iter().all(|p| (p.weight - 0.2).abs() < 1e-15));
        assert!(particles.iter().all(|p| (0.0..1.0).contains(&p.delta)));
    }

    #[test]
    fn same_stream_same_particles() {
        let init = MaxwellianInitializer::uniform(1.0, 1.0, 5);
        let layout = GridLayout::new(AmrBox::new(0, 9), 0.1, 0.0);
        assert_eq!(init.load(&layout, 7), init.load(&layout, 7));
        assert_ne!(init.load(&layout, 7), init.load(&layout, 8));
    }

    #[test]
    fn sampled_velocities_have_the_requested_spread() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let n = 20_000;
        let samples: Vec<[f64; 3]> = (0..n)
            .map(|_| maxwellian_velocity(&mut rng, [1.0, 0.0, -1.0], [0.5, 0.5, 0.5]))
            .collect();
        let mean_x = samples.iter().map(|v| v[0]).sum::<f64>() / n as f64;
        let var_x = samples.iter().map(|v| (v[0] - mean_x).powi(2)).sum::<f64>() / n as f64;
        assert!((mean_x - 1.0).abs() < 0.02);
        assert!((var_x.sqrt() - 0.5).abs() < 0.02);
    }

    #[test]
    fn magnetic_basis_needs_a_field() {
        let dict = Dict::new()
            .with("density", 1.0)
            .with("nbr_part_per_cell", 4usize)
            .with("basis", "magnetic");
        assert!(matches!(
            MaxwellianInitializer::from_dict(&dict, None),
            Err(ModelError::InvalidParameter { .. })
        ));
    }

    proptest! {
        #[test]
        fn magnetic_basis_is_orthonormal(
            bx in -5.0f64..5.0, by in -5.0f64..5.0, bz in -5.0f64..5.0
        ) {
            prop_assume!(bx * bx + by * by + bz * bz > 1e-6);
            let basis = local_magnetic_basis([bx, by, bz]);
            for i in 0..3 {
                for j in 0..3 {
                    let dot: f64 = (0..3).map(|k| basis[i][k] * basis[j][k]).sum();
                    let expected = if i == j { 1.0 } else { 0.0 };
                    prop_assert!((dot - expected).abs() < 1e-12);
                }
            }
        }
    }
}
