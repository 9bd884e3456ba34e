//! Borrowing vector fields out of a patch.
//!
//! Outputs are moved out of the patch while inputs are borrowed from it,
//! then moved back.

use hamr_amr::{FieldData, HierarchyError, Patch};
use hamr_model::VecIds;

use crate::numerics::VecRef;

pub(crate) fn vec_ref<'a>(patch: &'a Patch, ids: &VecIds) -> Result<VecRef<'a>, HierarchyError> {
    Ok([patch.field(ids[0])?, patch.field(ids[1])?, patch.field(ids[2])?])
}

pub(crate) fn take_vec(patch: &mut Patch, ids: &VecIds) -> Result<[FieldData; 3], HierarchyError> {
    Ok([
        patch.take_field(ids[0])?,
        patch.take_field(ids[1])?,
        patch.take_field(ids[2])?,
    ])
}

pub(crate) fn put_vec(patch: &mut Patch, ids: &VecIds, fields: [FieldData; 3]) {
    for (&id, field) in ids.iter().zip(fields) {
        patch.put_field(id, field);
    }
}

/// Stamp every component of `ids` with `time`.
pub(crate) fn set_vec_time(
    patch: &mut Patch,
    ids: &VecIds,
    time: f64,
) -> Result<(), HierarchyError> {
    for &id in ids {
        patch.field_mut(id)?.set_time(time);
    }
    Ok(())
}
