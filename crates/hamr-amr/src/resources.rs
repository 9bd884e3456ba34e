//! Registry of named quantities and their per-patch allocation.

use hamr_core::{Quantity, ResourceId, VecFieldDescriptor};
use indexmap::IndexMap;
use tracing::trace;

use crate::{FieldData, HierarchyError, ParticlesData, Patch, PatchData};

/// What a resource holds on each patch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceKind {
    /// A scalar field of the given quantity.
    Field(Quantity),
    /// Particle arrays of one population.
    Particles,
}

/// Hands out [`ResourceId`]s for named quantities and allocates their
/// data on patches.
///
/// Registration is idempotent: registering a name twice with the same kind
/// returns the first id. Models, solvers and messengers share one manager
/// so that ids are unique across the run.
#[derive(Clone, Debug, Default)]
pub struct ResourcesManager {
    resources: IndexMap<String, ResourceKind>,
}

impl ResourcesManager {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&mut self, name: &str, kind: ResourceKind) -> Result<ResourceId, HierarchyError> {
        if let Some((index, _, existing)) = self.resources.get_full(name) {
            if *existing != kind {
                return Err(HierarchyError::ResourceKindMismatch {
                    name: name.to_string(),
                });
            }
            return Ok(ResourceId(index as u32));
        }
        let (index, _) = self.resources.insert_full(name.to_string(), kind);
        trace!(name, index, "resource registered");
        Ok(ResourceId(index as u32))
    }

    /// Register a scalar field.
    pub fn register_field(
        &mut self,
        name: &str,
        quantity: Quantity,
    ) -> Result<ResourceId, HierarchyError> {
        self.register(name, ResourceKind::Field(quantity))
    }

    /// Register the three components of a vector field.
    pub fn register_vecfield(
        &mut self,
        field: &VecFieldDescriptor,
    ) -> Result<[ResourceId; 3], HierarchyError> {
        let mut ids = [ResourceId(0); 3];
        for (slot, (name, quantity)) in ids.iter_mut().zip(field.components()) {
            *slot = self.register_field(name, quantity)?;
        }
        Ok(ids)
    }

    /// Register the particle arrays of one population.
    pub fn register_particles(&mut self, name: &str) -> Result<ResourceId, HierarchyError> {
        self.register(name, ResourceKind::Particles)
    }

    /// Id of `name`, `None` when it was never registered.
    pub fn id(&self, name: &str) -> Option<ResourceId> {
        self.resources.get_index_of(name).map(|i| ResourceId(i as u32))
    }

    /// Kind of `id`.
    pub fn kind(&self, id: ResourceId) -> Option<ResourceKind> {
        self.resources.get_index(id.index()).map(|(_, k)| *k)
    }

    /// Name of `id`.
    pub fn name(&self, id: ResourceId) -> Option<&str> {
        self.resources.get_index(id.index()).map(|(n, _)| n.as_str())
    }

    /// Number of registered resources.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Ensure `patch` holds data for `id`. Existing data is kept and
    /// re-stamped with `time`.
    pub fn allocate(
        &self,
        patch: &mut Patch,
        id: ResourceId,
        time: f64,
    ) -> Result<(), HierarchyError> {
        let kind = self.kind(id).ok_or(HierarchyError::UnknownResource { id })?;
        if let Some(data) = patch.data_mut(id) {
            data.set_time(time);
            return Ok(());
        }
        let data = match kind {
            ResourceKind::Field(quantity) => {
                PatchData::Field(FieldData::new(quantity, patch.layout().clone(), time))
            }
            ResourceKind::Particles => PatchData::Particles(ParticlesData::new(time)),
        };
        patch.set_data(id, data);
        Ok(())
    }

    /// Allocate every named resource on `patch`.
    pub fn allocate_all<'a>(
        &self,
        patch: &mut Patch,
        names: impl IntoIterator<Item = &'a str>,
        time: f64,
    ) -> Result<(), HierarchyError> {
        for name in names {
            let id = self.id(name).ok_or_else(|| HierarchyError::UnregisteredResource {
                name: name.to_string(),
            })?;
            self.allocate(patch, id, time)?;
        }
        Ok(())
    }

    /// Stamp the data of `id` on `patch` with `time`.
    pub fn set_time(
        &self,
        patch: &mut Patch,
        id: ResourceId,
        time: f64,
    ) -> Result<(), HierarchyError> {
        let patch_id = patch.id();
        patch
            .data_mut(id)
            .ok_or(HierarchyError::MissingData {
                patch: patch_id,
                id,
            })?
            .set_time(time);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hamr_core::VectorQuantity;

    #[test]
    fn registration_is_idempotent() {
        let mut rm = ResourcesManager::new();
        let b = VecFieldDescriptor::new("EM_B", VectorQuantity::B);
        let first = rm.register_vecfield(&b).unwrap();
        let second = rm.register_vecfield(&b).unwrap();
        assert_eq!(first, second);
        assert_eq!(rm.len(), 3);
        assert_eq!(rm.id("EM_B_y"), Some(first[1]));
        assert_eq!(rm.id("EM_B_w"), None);
    }

    #[test]
    fn same_name_different_kind_is_rejected() {
        let mut rm = ResourcesManager::new();
        rm.register_field("rho", Quantity::Rho).unwrap();
        assert!(matches!(
            rm.register_particles("rho"),
            Err(HierarchyError::ResourceKindMismatch { .. })
        ));
    }
}
