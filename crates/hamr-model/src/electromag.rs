//! Electromagnetic field pairs.

use std::fmt;

use hamr_amr::{HierarchyError, Patch, ResourcesManager};
use hamr_core::dict::constant;
use hamr_core::{Dict, ResourceId, ScalarFunction, VecFieldDescriptor, VectorQuantity};

use crate::ModelError;

/// Resolved ids of a vector field, x first.
pub type VecIds = [ResourceId; 3];

/// Register every component of `field`.
pub fn register_vecfield(
    resources: &mut ResourcesManager,
    field: &VecFieldDescriptor,
) -> Result<VecIds, HierarchyError> {
    resources.register_vecfield(field)
}

/// Allocate every component of `ids` on `patch`.
pub fn allocate_vecfield(
    resources: &ResourcesManager,
    patch: &mut Patch,
    ids: &VecIds,
    time: f64,
) -> Result<(), HierarchyError> {
    for &id in ids {
        resources.allocate(patch, id, time)?;
    }
    Ok(())
}

/// An `(E, B)` pair named `"<name>_E"` and `"<name>_B"`.
#[derive(Clone, Debug, PartialEq)]
pub struct Electromag {
    name: String,
    electric: VecFieldDescriptor,
    magnetic: VecFieldDescriptor,
}

/// Resolved ids of an [`Electromag`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ElectromagIds {
    /// Electric field.
    pub electric: VecIds,
    /// Magnetic field.
    pub magnetic: VecIds,
}

impl Electromag {
    /// Fields `"<name>_E"` and `"<name>_B"`.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            electric: VecFieldDescriptor::new(format!("{name}_E"), VectorQuantity::E),
            magnetic: VecFieldDescriptor::new(format!("{name}_B"), VectorQuantity::B),
            name,
        }
    }

    /// Pair name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Electric field.
    pub fn electric(&self) -> &VecFieldDescriptor {
        &self.electric
    }

    /// Magnetic field.
    pub fn magnetic(&self) -> &VecFieldDescriptor {
        &self.magnetic
    }

    /// Register both fields.
    pub fn register(
        &self,
        resources: &mut ResourcesManager,
    ) -> Result<ElectromagIds, HierarchyError> {
        Ok(ElectromagIds {
            electric: register_vecfield(resources, &self.electric)?,
            magnetic: register_vecfield(resources, &self.magnetic)?,
        })
    }
}

impl ElectromagIds {
    /// Allocate both fields on `patch`.
    pub fn allocate(
        &self,
        resources: &ResourcesManager,
        patch: &mut Patch,
        time: f64,
    ) -> Result<(), HierarchyError> {
        allocate_vecfield(resources, patch, &self.electric, time)?;
        allocate_vecfield(resources, patch, &self.magnetic, time)
    }
}

/// Initial profiles of E and B.
#[derive(Clone)]
pub struct ElectromagInitializer {
    /// Electric field components.
    pub electric: [ScalarFunction; 3],
    /// Magnetic field components.
    pub magnetic: [ScalarFunction; 3],
}

impl fmt::Debug for ElectromagInitializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElectromagInitializer").finish_non_exhaustive()
    }
}

fn vector_initializer(dict: Option<&Dict>) -> Result<[ScalarFunction; 3], ModelError> {
    let Some(dict) = dict else {
        return Ok([constant(0.0), constant(0.0), constant(0.0)]);
    };
    let init = dict.node("initializer")?;
    let read = |key: &str| init.value_or(key, constant(0.0));
    Ok([read("x_component")?, read("y_component")?, read("z_component")?])
}

impl ElectromagInitializer {
    /// Read `electric.initializer.{x,y,z}_component` and the magnetic
    /// counterpart. Absent fields are zero.
    pub fn from_dict(dict: &Dict) -> Result<Self, ModelError> {
        Ok(Self {
            electric: vector_initializer(dict.node("electric").ok())?,
            magnetic: vector_initializer(dict.node("magnetic").ok())?,
        })
    }

    /// Zero fields.
    pub fn zero() -> Self {
        Self {
            electric: [constant(0.0), constant(0.0), constant(0.0)],
            magnetic: [constant(0.0), constant(0.0), constant(0.0)],
        }
    }

    /// Fill every node of the fields of `ids` on `patch`.
    pub fn initialize(&self, patch: &mut Patch, ids: &ElectromagIds) -> Result<(), HierarchyError> {
        for (id, f) in ids.electric.iter().zip(&self.electric) {
            patch.field_mut(*id)?.fill_with(|x| f(x));
        }
        for (id, f) in ids.magnetic.iter().zip(&self.magnetic) {
            patch.field_mut(*id)?.fill_with(|x| f(x));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_names_follow_the_prefix() {
        let em = Electromag::new("EMPred");
        assert_eq!(em.electric().name(), "EMPred_E");
        assert_eq!(em.magnetic().component_name(hamr_core::Component::Z), "EMPred_B_z");
    }

    #[test]
    fn missing_initializer_nodes_mean_zero_fields() {
        let mut dict = Dict::new();
        dict.node_mut("magnetic")
            .node_mut("initializer")
            .insert("x_component", 1.5);
        let init = ElectromagInitializer::from_dict(&dict).unwrap();
        assert_eq!((init.magnetic[0])(0.3), 1.5);
        assert_eq!((init.magnetic[1])(0.3), 0.0);
        assert_eq!((init.electric[2])(0.3), 0.0);
    }
}
