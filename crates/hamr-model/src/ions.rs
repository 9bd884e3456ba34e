//! Ion populations and their moments.

use hamr_amr::{FieldData, HierarchyError, Patch, ResourcesManager};
use hamr_core::{
    Dict, Particle, Quantity, ResourceId, ScalarFunction, VecFieldDescriptor, VectorQuantity,
};
use tracing::debug;

use crate::electromag::{allocate_vecfield, register_vecfield, VecIds};
use crate::info::PopulationInfo;
use crate::interpolator;
use crate::{MaxwellianInitializer, ModelError};

/// One ion species.
#[derive(Clone, Debug)]
pub struct IonPopulation {
    name: String,
    mass: f64,
    particles: String,
    density: String,
    flux: VecFieldDescriptor,
    initializer: MaxwellianInitializer,
}

/// Resolved ids of an [`IonPopulation`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PopulationIds {
    /// Particle arrays.
    pub particles: ResourceId,
    /// Density.
    pub density: ResourceId,
    /// Flux.
    pub flux: VecIds,
}

impl IonPopulation {
    /// Population `name` with resources `"<name>_particles"`,
    /// `"<name>_rho"` and `"<name>_flux"`.
    pub fn new(name: impl Into<String>, mass: f64, initializer: MaxwellianInitializer) -> Self {
        let name = name.into();
        Self {
            particles: format!("{name}_particles"),
            density: format!("{name}_rho"),
            flux: VecFieldDescriptor::new(format!("{name}_flux"), VectorQuantity::V),
            name,
            mass,
            initializer,
        }
    }

    /// Population name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Particle mass.
    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Particle resource name.
    pub fn particles_name(&self) -> &str {
        &self.particles
    }

    /// Density resource name.
    pub fn density_name(&self) -> &str {
        &self.density
    }

    /// Flux resource.
    pub fn flux(&self) -> &VecFieldDescriptor {
        &self.flux
    }

    /// Particle loader.
    pub fn initializer(&self) -> &MaxwellianInitializer {
        &self.initializer
    }

    /// Messenger-facing description.
    pub fn info(&self) -> PopulationInfo {
        PopulationInfo {
            name: self.name.clone(),
            particles: self.particles.clone(),
            density: self.density.clone(),
            flux: self.flux.clone(),
            mass: self.mass,
        }
    }
}

/// All ion populations plus the total moments.
#[derive(Clone, Debug)]
pub struct Ions {
    density: String,
    bulk_velocity: VecFieldDescriptor,
    populations: Vec<IonPopulation>,
}

/// Resolved ids of [`Ions`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IonsIds {
    /// Total density.
    pub density: ResourceId,
    /// Bulk velocity.
    pub bulk_velocity: VecIds,
    /// Per population, in declaration order.
    pub populations: Vec<PopulationIds>,
}

impl Ions {
    /// Ions with total moments `"rho"` and `"bulkVel"`.
    pub fn new(populations: Vec<IonPopulation>) -> Self {
        Self {
            density: "rho".to_string(),
            bulk_velocity: VecFieldDescriptor::new("bulkVel", VectorQuantity::V),
            populations,
        }
    }

    /// Read an `ions` node: `nbrPopulations`, then `pop0`, `pop1`, ...
    /// each with `name`, `mass` and `particle_initializer`.
    pub fn from_dict(
        dict: &Dict,
        magnetic_field: Option<&[ScalarFunction; 3]>,
    ) -> Result<Self, ModelError> {
        let count: usize = dict.value("nbrPopulations")?;
        let mut populations = Vec::with_capacity(count);
        for i in 0..count {
            let pop = dict.node(&format!("pop{i}"))?;
            let name: String = pop.value("name")?;
            let mass: f64 = pop.value_or("mass", 1.0)?;
            if mass <= 0.0 {
                return Err(ModelError::InvalidParameter {
                    key: format!("pop{i}.mass"),
                    reason: "must be positive".to_string(),
                });
            }
            let initializer = MaxwellianInitializer::from_dict(
                pop.node("particle_initializer")?,
                magnetic_field.cloned(),
            )?;
            populations.push(IonPopulation::new(name, mass, initializer));
        }
        debug!(populations = count, "ions configured");
        Ok(Self::new(populations))
    }

    /// Total density resource name.
    pub fn density_name(&self) -> &str {
        &self.density
    }

    /// Bulk velocity resource.
    pub fn bulk_velocity(&self) -> &VecFieldDescriptor {
        &self.bulk_velocity
    }

    /// Populations.
    pub fn populations(&self) -> &[IonPopulation] {
        &self.populations
    }

    /// Register every ion resource.
    pub fn register(&self, resources: &mut ResourcesManager) -> Result<IonsIds, HierarchyError> {
        let density = resources.register_field(&self.density, Quantity::Rho)?;
        let bulk_velocity = register_vecfield(resources, &self.bulk_velocity)?;
        let populations = self
            .populations
            .iter()
            .map(|pop| {
                Ok(PopulationIds {
                    particles: resources.register_particles(&pop.particles)?,
                    density: resources.register_field(&pop.density, Quantity::Rho)?,
                    flux: register_vecfield(resources, &pop.flux)?,
                })
            })
            .collect::<Result<Vec<_>, HierarchyError>>()?;
        Ok(IonsIds {
            density,
            bulk_velocity,
            populations,
        })
    }
}

impl IonsIds {
    /// Allocate every ion resource on `patch`.
    pub fn allocate(
        &self,
        resources: &ResourcesManager,
        patch: &mut Patch,
        time: f64,
    ) -> Result<(), HierarchyError> {
        resources.allocate(patch, self.density, time)?;
        allocate_vecfield(resources, patch, &self.bulk_velocity, time)?;
        for pop in &self.populations {
            resources.allocate(patch, pop.particles, time)?;
            resources.allocate(patch, pop.density, time)?;
            allocate_vecfield(resources, patch, &pop.flux, time)?;
        }
        Ok(())
    }
}

/// Owned density and flux of one population, taken out of a patch so that
/// particles of the same patch can be read while depositing.
#[derive(Debug)]
pub struct MomentBuffers {
    ids: PopulationIds,
    /// Density.
    pub density: FieldData,
    /// Flux.
    pub flux: [FieldData; 3],
}

impl MomentBuffers {
    /// Take the moments of `ids` out of `patch`.
    pub fn take(patch: &mut Patch, ids: PopulationIds) -> Result<Self, HierarchyError> {
        Ok(Self {
            density: patch.take_field(ids.density)?,
            flux: [
                patch.take_field(ids.flux[0])?,
                patch.take_field(ids.flux[1])?,
                patch.take_field(ids.flux[2])?,
            ],
            ids,
        })
    }

    /// Zero density and flux.
    pub fn reset(&mut self) {
        self.density.fill(0.0);
        for f in &mut self.flux {
            f.fill(0.0);
        }
    }

    /// Accumulate `particles` scaled by `factor`.
    pub fn deposit<'a>(&mut self, particles: impl IntoIterator<Item = &'a Particle>, factor: f64) {
        interpolator::deposit(particles, &mut self.density, &mut self.flux, factor);
    }

    /// Put the moments back on `patch`.
    pub fn restore(self, patch: &mut Patch) {
        let [fx, fy, fz] = self.flux;
        patch.put_field(self.ids.density, self.density);
        patch.put_field(self.ids.flux[0], fx);
        patch.put_field(self.ids.flux[1], fy);
        patch.put_field(self.ids.flux[2], fz);
    }
}

/// Recompute the density and flux of every population on `patch` from its
/// domain, patch-ghost and level-ghost particles.
pub fn compute_population_moments(patch: &mut Patch, ions: &IonsIds) -> Result<(), HierarchyError> {
    for &pop in &ions.populations {
        let mut buffers = MomentBuffers::take(patch, pop)?;
        buffers.reset();
        let particles = patch.particles(pop.particles)?;
        buffers.deposit(
            particles
                .domain
                .iter()
                .chain(&particles.patch_ghost)
                .chain(&particles.level_ghost),
            1.0,
        );
        buffers.restore(patch);
    }
    Ok(())
}

/// Total density `Σ n_p` and bulk velocity `Σ m_p F_p / Σ m_p n_p` on
/// every node of `patch`. Nodes without ions get a zero velocity.
pub fn compute_total_moments(
    patch: &mut Patch,
    ions: &IonsIds,
    masses: &[f64],
) -> Result<(), HierarchyError> {
    let len = patch.field(ions.density)?.len();
    let mut density = vec![0.0; len];
    let mut mass_density = vec![0.0; len];
    let mut momentum = [vec![0.0; len], vec![0.0; len], vec![0.0; len]];
    for (pop, &mass) in ions.populations.iter().zip(masses) {
        let n = patch.field(pop.density)?;
        for (i, v) in n.values().iter().enumerate() {
            density[i] += v;
            mass_density[i] += mass * v;
        }
        for (c, &flux_id) in pop.flux.iter().enumerate() {
            for (m, f) in momentum[c].iter_mut().zip(patch.field(flux_id)?.values()) {
                *m += mass * f;
            }
        }
    }
    patch.field_mut(ions.density)?.values_mut().copy_from_slice(&density);
    for (c, &id) in ions.bulk_velocity.iter().enumerate() {
        let v = patch.field_mut(id)?.values_mut();
        for ((out, m), rho) in v.iter_mut().zip(&momentum[c]).zip(&mass_density) {
            *out = if *rho > 0.0 { m / rho } else { 0.0 };
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn population_resource_names() {
        let pop = IonPopulation::new("protons", 1.0, MaxwellianInitializer::uniform(1.0, 0.1, 2));
        assert_eq!(pop.particles_name(), "protons_particles");
        assert_eq!(pop.density_name(), "protons_rho");
        assert_eq!(pop.flux().name(), "protons_flux");
        assert_eq!(pop.info().mass, 1.0);
    }

    #[test]
    fn populations_are_read_in_order() {
        let mut dict = Dict::new();
        dict.insert("nbrPopulations", 2usize);
        for (i, name) in ["protons", "alpha"].iter().enumerate() {
            let pop = dict.node_mut(&format!("pop{i}"));
            pop.insert("name", *name).insert("mass", 1.0 + i as f64);
            pop.node_mut("particle_initializer")
                .insert("density", 1.0)
                .insert("nbr_part_per_cell", 10usize);
        }
        let ions = Ions::from_dict(&dict, None).unwrap();
        let names: Vec<&str> = ions.populations().iter().map(IonPopulation::name).collect();
        assert_eq!(names, ["protons", "alpha"]);
        assert_eq!(ions.populations()[1].mass(), 2.0);
    }

    #[test]
    fn missing_population_node_is_a_config_error() {
        let dict = Dict::new().with("nbrPopulations", 1usize);
        assert!(matches!(
            Ions::from_dict(&dict, None),
            Err(ModelError::Config(_))
        ));
    }
}
