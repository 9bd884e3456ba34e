//! What each diagnostic kind extracts from a patch.
//!
//! Entries are addressed by paths rooted at the patch:
//!
//! ```text
//! /t/<time>/pl<level>/p<rank>#<index>/electromag/EM_B_y
//! /t/<time>/pl<level>/p<rank>#<index>/ions/density
//! /t/<time>/pl<level>/p<rank>#<index>/ions/pop/<name>/flux_x
//! /t/<time>/pl<level>/p<rank>#<index>/ions/pop/<name>/domain
//! ```

use hamr_amr::{FieldData, Patch};
use hamr_core::{ParticleArray, ResourceId, VecFieldDescriptor};
use hamr_model::{HybridModel, MhdModel, PhysicalModel, VecIds};
use serde::Serialize;

use crate::DiagnosticError;

const COMPONENTS: [&str; 3] = ["x", "y", "z"];

/// One record of a dump.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entry {
    /// Values of a field on the physical nodes of a patch.
    Field {
        /// Dataset path.
        path: String,
        /// Time stamp of the data.
        time: f64,
        /// AMR index of the first value.
        lower: i32,
        /// Node values.
        values: Vec<f64>,
    },
    /// One particle array of a population.
    Particles {
        /// Dataset path.
        path: String,
        /// Time of the dump.
        time: f64,
        /// Number of particles.
        size: usize,
        /// Weights.
        weight: Vec<f64>,
        /// Charges.
        charge: Vec<f64>,
        /// AMR cell indices.
        i_cell: Vec<i32>,
        /// Offsets in the cells.
        delta: Vec<f64>,
        /// Velocities.
        v: Vec<[f64; 3]>,
    },
    /// Placeholder keeping the entry count of a level equal on all ranks.
    Padding {
        /// Path of the missing patch.
        path: String,
        /// Time of the dump.
        time: f64,
    },
}

impl Entry {
    /// Dataset path.
    pub fn path(&self) -> &str {
        match self {
            Self::Field { path, .. }
            | Self::Particles { path, .. }
            | Self::Padding { path, .. } => path,
        }
    }

    fn field(path: String, field: &FieldData, lower: i32) -> Self {
        Self::Field {
            path,
            time: field.time(),
            lower,
            values: field.values()[field.physical_range()].to_vec(),
        }
    }

    fn particles(path: String, time: f64, particles: &ParticleArray) -> Self {
        Self::Particles {
            path,
            time,
            size: particles.len(),
            weight: particles.iter().map(|p| p.weight).collect(),
            charge: particles.iter().map(|p| p.charge).collect(),
            i_cell: particles.iter().map(|p| p.i_cell).collect(),
            delta: particles.iter().map(|p| p.delta).collect(),
            v: particles.iter().map(|p| p.v).collect(),
        }
    }
}

/// A family of diagnostics, written to its own output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// Electric and magnetic fields.
    Electromag,
    /// Ion (or MHD fluid) moments.
    Fluid,
    /// Ion particle arrays.
    Particles,
}

impl DiagnosticKind {
    /// Every kind, in output order.
    pub const ALL: [DiagnosticKind; 3] = [Self::Electromag, Self::Fluid, Self::Particles];

    /// Output name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Electromag => "electromag",
            Self::Fluid => "fluid",
            Self::Particles => "particles",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Self::Electromag => 0,
            Self::Fluid => 1,
            Self::Particles => 2,
        }
    }

    /// Append the entries of `patch` under `prefix` to `out`.
    pub fn collect(
        self,
        patch: &Patch,
        model: &PhysicalModel,
        prefix: &str,
        time: f64,
        out: &mut Vec<Entry>,
    ) -> Result<(), DiagnosticError> {
        match (self, model) {
            (Self::Electromag, PhysicalModel::Hybrid(m)) => {
                let ids = &m.ids()?.electromag;
                let em = m.electromag();
                vector(
                    patch,
                    em.electric(),
                    &ids.electric,
                    &format!("{prefix}/electromag"),
                    out,
                )?;
                vector(
                    patch,
                    em.magnetic(),
                    &ids.magnetic,
                    &format!("{prefix}/electromag"),
                    out,
                )
            }
            (Self::Electromag, PhysicalModel::Mhd(m)) => {
                let ids = m.ids()?;
                vector(
                    patch,
                    m.electric(),
                    &ids.electric,
                    &format!("{prefix}/electromag"),
                    out,
                )?;
                vector(
                    patch,
                    m.magnetic(),
                    &ids.magnetic,
                    &format!("{prefix}/electromag"),
                    out,
                )
            }
            (Self::Fluid, PhysicalModel::Hybrid(m)) => hybrid_fluid(patch, m, prefix, out),
            (Self::Fluid, PhysicalModel::Mhd(m)) => mhd_fluid(patch, m, prefix, out),
            (Self::Particles, PhysicalModel::Hybrid(m)) => particles(patch, m, prefix, time, out),
            (Self::Particles, PhysicalModel::Mhd(_)) => Ok(()),
        }
    }
}

fn scalar(
    patch: &Patch,
    id: ResourceId,
    path: String,
    out: &mut Vec<Entry>,
) -> Result<(), DiagnosticError> {
    out.push(Entry::field(path, patch.field(id)?, patch.amr_box().lower));
    Ok(())
}

/// Components of a vector field, named after the registered components.
fn vector(
    patch: &Patch,
    descriptor: &VecFieldDescriptor,
    ids: &VecIds,
    dir: &str,
    out: &mut Vec<Entry>,
) -> Result<(), DiagnosticError> {
    for ((name, _), id) in descriptor.components().zip(ids) {
        scalar(patch, *id, format!("{dir}/{name}"), out)?;
    }
    Ok(())
}

/// Components of a vector field, named `<base>_<x|y|z>`.
fn suffixed(
    patch: &Patch,
    ids: &VecIds,
    base: &str,
    out: &mut Vec<Entry>,
) -> Result<(), DiagnosticError> {
    for (c, id) in COMPONENTS.iter().zip(ids) {
        scalar(patch, *id, format!("{base}_{c}"), out)?;
    }
    Ok(())
}

fn hybrid_fluid(
    patch: &Patch,
    model: &HybridModel,
    prefix: &str,
    out: &mut Vec<Entry>,
) -> Result<(), DiagnosticError> {
    let ids = &model.ids()?.ions;
    scalar(patch, ids.density, format!("{prefix}/ions/density"), out)?;
    suffixed(
        patch,
        &ids.bulk_velocity,
        &format!("{prefix}/ions/bulkVelocity"),
        out,
    )?;
    for (pop, pop_ids) in model.ions().populations().iter().zip(&ids.populations) {
        let dir = format!("{prefix}/ions/pop/{}", pop.name());
        scalar(patch, pop_ids.density, format!("{dir}/density"), out)?;
        suffixed(patch, &pop_ids.flux, &format!("{dir}/flux"), out)?;
    }
    Ok(())
}

fn mhd_fluid(
    patch: &Patch,
    model: &MhdModel,
    prefix: &str,
    out: &mut Vec<Entry>,
) -> Result<(), DiagnosticError> {
    let ids = model.ids()?;
    scalar(patch, ids.density, format!("{prefix}/mhd/density"), out)?;
    suffixed(patch, &ids.velocity, &format!("{prefix}/mhd/velocity"), out)
}

fn particles(
    patch: &Patch,
    model: &HybridModel,
    prefix: &str,
    time: f64,
    out: &mut Vec<Entry>,
) -> Result<(), DiagnosticError> {
    let ids = &model.ids()?.ions;
    for (pop, pop_ids) in model.ions().populations().iter().zip(&ids.populations) {
        let data = patch.particles(pop_ids.particles)?;
        let dir = format!("{prefix}/ions/pop/{}", pop.name());
        for (name, array) in [
            ("domain", &data.domain),
            ("patchGhost", &data.patch_ghost),
            ("levelGhost", &data.level_ghost),
        ] {
            out.push(Entry::particles(format!("{dir}/{name}"), time, array));
        }
    }
    Ok(())
}
