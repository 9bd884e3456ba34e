//! The ideal MHD model used on coarse levels.

use hamr_amr::{Patch, PatchHierarchy, ResourcesManager};
use hamr_core::dict::constant;
use hamr_core::{Dict, Quantity, ResourceId, ScalarFunction, VecFieldDescriptor, VectorQuantity};
use tracing::info;

use crate::electromag::{allocate_vecfield, register_vecfield, VecIds};
use crate::{MessengerInfo, ModelError};

/// Resolved ids of an [`MhdModel`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MhdIds {
    /// Magnetic field.
    pub magnetic: VecIds,
    /// Electric field.
    pub electric: VecIds,
    /// Bulk velocity.
    pub velocity: VecIds,
    /// Density.
    pub density: ResourceId,
}

/// MHD model state description.
#[derive(Clone)]
pub struct MhdModel {
    magnetic: VecFieldDescriptor,
    electric: VecFieldDescriptor,
    velocity: VecFieldDescriptor,
    density: String,
    density_init: ScalarFunction,
    velocity_init: [ScalarFunction; 3],
    magnetic_init: [ScalarFunction; 3],
    temperature: f64,
    ids: Option<MhdIds>,
}

impl std::fmt::Debug for MhdModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MhdModel")
            .field("temperature", &self.temperature)
            .field("ids", &self.ids)
            .finish_non_exhaustive()
    }
}

impl MhdModel {
    /// Model name.
    pub const NAME: &'static str = "MHDModel";

    /// Uniform plasma at rest with density `density`, field `magnetic` and
    /// ion temperature `temperature`.
    pub fn uniform(density: f64, magnetic: [f64; 3], temperature: f64) -> Self {
        Self::with_profiles(
            constant(density),
            [constant(0.0), constant(0.0), constant(0.0)],
            magnetic.map(constant),
            temperature,
        )
    }

    fn with_profiles(
        density_init: ScalarFunction,
        velocity_init: [ScalarFunction; 3],
        magnetic_init: [ScalarFunction; 3],
        temperature: f64,
    ) -> Self {
        Self {
            magnetic: VecFieldDescriptor::new("MHD_B", VectorQuantity::B),
            electric: VecFieldDescriptor::new("MHD_E", VectorQuantity::E),
            velocity: VecFieldDescriptor::new("MHD_V", VectorQuantity::V),
            density: "MHD_rho".to_string(),
            density_init,
            velocity_init,
            magnetic_init,
            temperature,
            ids: None,
        }
    }

    /// Read the `mhd` node of a job dictionary: `density`,
    /// `velocity_{x,y,z}`, `magnetic_{x,y,z}`, `temperature`.
    pub fn from_dict(dict: &Dict) -> Result<Self, ModelError> {
        let mhd = dict.node("mhd")?;
        let read = |key: String| mhd.value_or(&key, constant(0.0));
        let temperature: f64 = mhd.value_or("temperature", 0.0)?;
        if temperature < 0.0 {
            return Err(ModelError::InvalidParameter {
                key: "mhd.temperature".to_string(),
                reason: "must not be negative".to_string(),
            });
        }
        Ok(Self::with_profiles(
            mhd.value("density")?,
            [
                read("velocity_x".into())?,
                read("velocity_y".into())?,
                read("velocity_z".into())?,
            ],
            [
                read("magnetic_x".into())?,
                read("magnetic_y".into())?,
                read("magnetic_z".into())?,
            ],
            temperature,
        ))
    }

    /// Magnetic field.
    pub fn magnetic(&self) -> &VecFieldDescriptor {
        &self.magnetic
    }

    /// Electric field.
    pub fn electric(&self) -> &VecFieldDescriptor {
        &self.electric
    }

    /// Bulk velocity.
    pub fn velocity(&self) -> &VecFieldDescriptor {
        &self.velocity
    }

    /// Density resource name.
    pub fn density_name(&self) -> &str {
        &self.density
    }

    /// Ion temperature, used to give loaded particles a thermal spread.
    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Resolved ids.
    pub fn ids(&self) -> Result<&MhdIds, ModelError> {
        self.ids.as_ref().ok_or(ModelError::NotRegistered { model: Self::NAME })
    }

    /// Register every model resource.
    pub fn register_resources(
        &mut self,
        resources: &mut ResourcesManager,
    ) -> Result<(), ModelError> {
        self.ids = Some(MhdIds {
            magnetic: register_vecfield(resources, &self.magnetic)?,
            electric: register_vecfield(resources, &self.electric)?,
            velocity: register_vecfield(resources, &self.velocity)?,
            density: resources.register_field(&self.density, Quantity::Rho)?,
        });
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
        allocate_vecfield(resources, patch, &ids.magnetic, time)?;
        allocate_vecfield(resources, patch, &ids.electric, time)?;
        allocate_vecfield(resources, patch, &ids.velocity, time)?;
        resources.allocate(patch, ids.density, time)?;
        Ok(())
    }

    /// Declare the model quantities to a messenger.
    pub fn fill_messenger_info(&self, info: &mut MessengerInfo) -> Result<(), ModelError> {
        let kind = info.kind();
        let info = info.as_mhd_mut().ok_or(ModelError::InfoMismatch {
            model: Self::NAME,
            info: kind,
        })?;
        info.model_magnetic = Some(self.magnetic.clone());
        info.model_electric = Some(self.electric.clone());
        info.model_velocity = Some(self.velocity.clone());
        info.model_density = Some(self.density.clone());
        info.temperature = Some(self.temperature);
        info.ghost_magnetic.push(self.magnetic.clone());
        info.ghost_electric.push(self.electric.clone());
        Ok(())
    }

    fn ideal_electric(&self, x: f64) -> [f64; 3] {
        let v = [
            (self.velocity_init[0])(x),
            (self.velocity_init[1])(x),
            (self.velocity_init[2])(x),
        ];
        let b = [
            (self.magnetic_init[0])(x),
            (self.magnetic_init[1])(x),
            (self.magnetic_init[2])(x),
        ];
        [
            -(v[1] * b[2] - v[2] * b[1]),
            -(v[2] * b[0] - v[0] * b[2]),
            -(v[0] * b[1] - v[1] * b[0]),
        ]
    }

    /// Evaluate the initial profiles on every patch of `level`; E is the
    /// ideal field `-V×B`.
    pub fn initialize(
        &self,
        hierarchy: &mut PatchHierarchy,
        level: usize,
        _time: f64,
    ) -> Result<(), ModelError> {
        let ids = *self.ids()?;
        for patch in hierarchy.level_mut(level)?.patches_mut() {
            patch.field_mut(ids.density)?.fill_with(|x| (self.density_init)(x));
            for c in 0..3 {
                patch
                    .field_mut(ids.velocity[c])?
                    .fill_with(|x| (self.velocity_init[c])(x));
                patch
                    .field_mut(ids.magnetic[c])?
                    .fill_with(|x| (self.magnetic_init[c])(x));
                patch
                    .field_mut(ids.electric[c])?
                    .fill_with(|x| self.ideal_electric(x)[c]);
            }
        }
        info!(level, "MHD level initialized");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hamr_amr::GridGeometry;
    use hamr_core::AmrBox;

    #[test]
    fn density_is_required() {
        let mut dict = Dict::new();
        dict.node_mut("mhd").insert("temperature", 0.1);
        assert!(matches!(MhdModel::from_dict(&dict), Err(ModelError::Config(_))));
    }

    #[test]
    fn initial_electric_field_is_ideal() {
        let mut dict = Dict::new();
        dict.node_mut("mhd")
            .insert("density", 1.0)
            .insert("velocity_x", 2.0)
            .insert("magnetic_y", 3.0);
        let mut model = MhdModel::from_dict(&dict).unwrap();
        let mut rm = ResourcesManager::new();
        model.register_resources(&mut rm).unwrap();
        let mut h = PatchHierarchy::new(GridGeometry::new(0.0, 0.1, 8, true).unwrap(), 1);
        h.make_level(0, &[AmrBox::new(0, 7)]).unwrap();
        for patch in h.level_mut(0).unwrap().patches_mut() {
            model.allocate(&rm, patch, 0.0).unwrap();
        }
        model.initialize(&mut h, 0, 0.0).unwrap();
        let ids = model.ids().unwrap();
        let ez = h.level(0).unwrap().patch(0).field(ids.electric[2]).unwrap();
        // Ez = -(vx by - vy bx)
        assert!(ez.values().iter().all(|v| (*v + 6.0).abs() < 1e-15));
    }
}
