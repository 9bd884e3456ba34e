//! The hybrid model: kinetic ions, isothermal fluid electrons.

use hamr_amr::{HierarchyError, Patch, PatchHierarchy, ResourcesManager};
use hamr_core::{Dict, VecFieldDescriptor, VectorQuantity};
use tracing::info;

use crate::electromag::{allocate_vecfield, register_vecfield, ElectromagIds, VecIds};
use crate::ions::{compute_population_moments, compute_total_moments};
use crate::{Electromag, ElectromagInitializer, Ions, IonsIds, MessengerInfo, ModelError};

/// Massless isothermal electrons.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Electrons {
    te: f64,
}

impl Electrons {
    /// Electrons at temperature `te`.
    pub fn isothermal(te: f64) -> Self {
        Self { te }
    }

    /// Read `pressure_closure.{name, Te}`; only `"isothermal"` is known.
    pub fn from_dict(dict: &Dict) -> Result<Self, ModelError> {
        let closure = dict.node("pressure_closure")?;
        let name: String = closure.value_or("name", "isothermal".to_string())?;
        if name != "isothermal" {
            return Err(ModelError::InvalidParameter {
                key: "pressure_closure.name".to_string(),
                reason: format!("unknown closure '{name}'"),
            });
        }
        Ok(Self::isothermal(closure.value("Te")?))
    }

    /// Electron temperature.
    pub fn temperature(&self) -> f64 {
        self.te
    }

    /// Electron pressure at density `n`.
    pub fn pressure(&self, n: f64) -> f64 {
        n * self.te
    }
}

/// Resolved ids of a [`HybridModel`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HybridIds {
    /// E and B.
    pub electromag: ElectromagIds,
    /// Current density.
    pub current: VecIds,
    /// Ion moments and particles.
    pub ions: IonsIds,
}

/// Hybrid PIC model state description.
#[derive(Clone, Debug)]
pub struct HybridModel {
    electromag: Electromag,
    current: VecFieldDescriptor,
    ions: Ions,
    electrons: Electrons,
    resistivity: f64,
    initializer: ElectromagInitializer,
    ids: Option<HybridIds>,
}

impl HybridModel {
    /// Model name.
    pub const NAME: &'static str = "HybridModel";

    /// Model from parts.
    pub fn new(
        ions: Ions,
        electrons: Electrons,
        initializer: ElectromagInitializer,
        resistivity: f64,
    ) -> Self {
        Self {
            electromag: Electromag::new("EM"),
            current: VecFieldDescriptor::new("J", VectorQuantity::J),
            ions,
            electrons,
            resistivity,
            initializer,
            ids: None,
        }
    }

    /// Read the `electromag`, `ions`, `electrons` nodes and the optional
    /// `resistivity` of a job dictionary.
    pub fn from_dict(dict: &Dict) -> Result<Self, ModelError> {
        let initializer = match dict.node("electromag") {
            Ok(em) => ElectromagInitializer::from_dict(em)?,
            Err(_) => ElectromagInitializer::zero(),
        };
        let ions = Ions::from_dict(dict.node("ions")?, Some(&initializer.magnetic))?;
        let electrons = Electrons::from_dict(dict.node("electrons")?)?;
        let resistivity = dict.value_or("resistivity", 0.0)?;
        if resistivity < 0.0 {
            return Err(ModelError::InvalidParameter {
                key: "resistivity".to_string(),
                reason: "must not be negative".to_string(),
            });
        }
        Ok(Self::new(ions, electrons, initializer, resistivity))
    }

    /// Model fields E and B.
    pub fn electromag(&self) -> &Electromag {
        &self.electromag
    }

    /// Current density.
    pub fn current(&self) -> &VecFieldDescriptor {
        &self.current
    }

    /// Ions.
    pub fn ions(&self) -> &Ions {
        &self.ions
    }

    /// Electrons.
    pub fn electrons(&self) -> &Electrons {
        &self.electrons
    }

    /// Resistivity of Ohm's law.
    pub fn resistivity(&self) -> f64 {
        self.resistivity
    }

    /// Particle masses, population order.
    pub fn masses(&self) -> Vec<f64> {
        self.ions.populations().iter().map(|p| p.mass()).collect()
    }

    /// Resolved ids.
    pub fn ids(&self) -> Result<&HybridIds, ModelError> {
        self.ids.as_ref().ok_or(ModelError::NotRegistered { model: Self::NAME })
    }

    /// Register every model resource.
    pub fn register_resources(
        &mut self,
        resources: &mut ResourcesManager,
    ) -> Result<(), ModelError> {
        let ids = HybridIds {
            electromag: self.electromag.register(resources)?,
            current: register_vecfield(resources, &self.current)?,
            ions: self.ions.register(resources)?,
        };
        self.ids = Some(ids);
        Ok(())
    }

    /// Allocate every model resource on `patch`.
    pub fn allocate(
        &self,
        resources: &ResourcesManager,
        patch: &mut Patch,
        time: f64,
    ) -> Result<(), ModelError> {
        let ids = self.ids()?;
        ids.electromag.allocate(resources, patch, time)?;
        allocate_vecfield(resources, patch, &ids.current, time)?;
        ids.ions.allocate(resources, patch, time)?;
        Ok(())
    }

    /// Declare the model quantities to a messenger.
    pub fn fill_messenger_info(&self, info: &mut MessengerInfo) -> Result<(), ModelError> {
        let kind = info.kind();
        let info = info.as_hybrid_mut().ok_or(ModelError::InfoMismatch {
            model: Self::NAME,
            info: kind,
        })?;
        info.model_electric = Some(self.electromag.electric().clone());
        info.model_magnetic = Some(self.electromag.magnetic().clone());
        info.model_current = Some(self.current.clone());
        info.model_ion_density = Some(self.ions.density_name().to_string());
        info.model_ion_bulk_velocity = Some(self.ions.bulk_velocity().clone());
        info.ghost_electric.push(self.electromag.electric().clone());
        info.ghost_magnetic.push(self.electromag.magnetic().clone());
        info.ghost_current.push(self.current.clone());
        info.populations = self.ions.populations().iter().map(|p| p.info()).collect();
        Ok(())
    }

    /// Set the fields from their initial profiles and load particles on
    /// every patch of `level`, then compute the ion moments.
    pub fn initialize(
        &self,
        hierarchy: &mut PatchHierarchy,
        level: usize,
        time: f64,
    ) -> Result<(), ModelError> {
        let ids = self.ids()?;
        let mut loaded = 0usize;
        for (p, patch) in hierarchy.level_mut(level)?.patches_mut().iter_mut().enumerate() {
            self.initializer.initialize(patch, &ids.electromag)?;
            for (pop, pop_ids) in self.ions.populations().iter().zip(&ids.ions.populations) {
                let stream = ((level as u64) << 32) | p as u64;
                let particles = pop.initializer().load(patch.layout(), stream);
                loaded += particles.len();
                let data = patch.particles_mut(pop_ids.particles)?;
                data.domain = particles;
                data.clear_ghosts();
                data.time = time;
            }
            self.compute_moments(patch)?;
        }
        info!(level, particles = loaded, "hybrid level initialized");
        Ok(())
    }

    /// Recompute population and total moments on `patch` from all its
    /// particle arrays.
    pub fn compute_moments(&self, patch: &mut Patch) -> Result<(), HierarchyError> {
        let Some(ids) = self.ids.as_ref() else {
            return Ok(());
        };
        compute_population_moments(patch, &ids.ions)?;
        compute_total_moments(patch, &ids.ions, &self.masses())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{IonPopulation, MaxwellianInitializer};
    use hamr_amr::GridGeometry;
    use hamr_core::AmrBox;

    fn model() -> HybridModel {
        let ions = Ions::new(vec![IonPopulation::new(
            "protons",
            1.0,
            MaxwellianInitializer::uniform(1.0, 0.1, 20),
        )]);
        HybridModel::new(
            ions,
            Electrons::isothermal(0.2),
            ElectromagInitializer::zero(),
            0.0,
        )
    }

    #[test]
    fn info_lists_model_quantities() {
        let model = model();
        let mut info = MessengerInfo::hybrid();
        model.fill_messenger_info(&mut info).unwrap();
        let info = info.as_hybrid().unwrap();
        assert_eq!(info.model_magnetic.as_ref().unwrap().name(), "EM_B");
        assert_eq!(info.model_ion_density.as_deref(), Some("rho"));
        assert_eq!(info.populations[0].particles, "protons_particles");

        let mut mhd = MessengerInfo::mhd();
        assert!(matches!(
            model.fill_messenger_info(&mut mhd),
            Err(ModelError::InfoMismatch { .. })
        ));
    }

    #[test]
    fn initialize_before_registration_fails() {
        let geometry = GridGeometry::new(0.0, 0.1, 10, true).unwrap();
        let mut h = PatchHierarchy::new(geometry, 1);
        h.make_level(0, &[AmrBox::new(0, 9)]).unwrap();
        assert!(matches!(
            model().initialize(&mut h, 0, 0.0),
            Err(ModelError::NotRegistered { .. })
        ));
    }

    #[test]
    fn initialized_uniform_plasma_has_unit_interior_density() {
        let mut model = model();
        let mut rm = ResourcesManager::new();
        model.register_resources(&mut rm).unwrap();
        let geometry = GridGeometry::new(0.0, 0.1, 10, true).unwrap();
        let mut h = PatchHierarchy::new(geometry, 1);
        h.make_level(0, &[AmrBox::new(0, 9)]).unwrap();
        for patch in h.level_mut(0).unwrap().patches_mut() {
            model.allocate(&rm, patch, 0.0).unwrap();
        }
        model.initialize(&mut h, 0, 0.0).unwrap();

        let ids = model.ids().unwrap();
        let patch = h.level(0).unwrap().patch(0);
        let rho = patch.field(ids.ions.density).unwrap();
        let total: f64 = (0..=10).map(|a| rho.at_amr(a).unwrap()).sum();
        assert!((total - 10.0).abs() < 1e-9);
        assert_eq!(rho.at_amr(-1), Some(0.0));
        assert_eq!(
            patch.particles(ids.ions.populations[0].particles).unwrap().domain.len(),
            200
        );
    }
}
