//! Ideal induction solver of the MHD model.

use hamr_amr::{PatchHierarchy, ResourcesManager};
use hamr_messenger::{MessengerError, MessengerInfo, MhdMessenger, SolverQuantities};
use hamr_model::MhdModel;
use tracing::debug;

use crate::access::{put_vec, set_vec_time, take_vec, vec_ref};
use crate::numerics;
use crate::SolverError;

/// Advances the magnetic field of an MHD level with `E = -V×B`, the
/// density and velocity being held fixed.
#[derive(Clone, Copy, Debug, Default)]
pub struct SolverMhd;

impl SolverMhd {
    /// Solver name.
    pub const NAME: &'static str = "MHDSolver";

    /// The solver owns no resource.
    pub fn register_resources(
        &mut self,
        _resources: &mut ResourcesManager,
    ) -> Result<(), SolverError> {
        Ok(())
    }

    /// Advance `level` from `current_time` to `new_time`: E from the
    /// current fields, B by Faraday, then E again from the new B.
    pub fn advance_level(
        &self,
        hierarchy: &mut PatchHierarchy,
        level: usize,
        model: &MhdModel,
        messenger: &MhdMessenger,
        current_time: f64,
        new_time: f64,
    ) -> Result<(), SolverError> {
        let ids = *model.ids()?;
        let dt = new_time - current_time;
        for patch in hierarchy.level_mut(level)?.patches_mut() {
            let mut e = take_vec(patch, &ids.electric)?;
            numerics::ideal_electric(
                vec_ref(patch, &ids.velocity)?,
                vec_ref(patch, &ids.magnetic)?,
                &mut e,
            );
            let mut b = take_vec(patch, &ids.magnetic)?;
            numerics::faraday([&e[0], &e[1], &e[2]], &mut b, dt);
            numerics::ideal_electric(
                vec_ref(patch, &ids.velocity)?,
                [&b[0], &b[1], &b[2]],
                &mut e,
            );
            put_vec(patch, &ids.magnetic, b);
            put_vec(patch, &ids.electric, e);
            for fields in [&ids.magnetic, &ids.electric, &ids.velocity] {
                set_vec_time(patch, fields, new_time)?;
            }
            patch.field_mut(ids.density)?.set_time(new_time);
        }
        messenger.fill_ghosts(hierarchy, level, new_time)?;
        debug!(level, current_time, new_time, "MHD level advanced");
        Ok(())
    }
}

impl SolverQuantities for SolverMhd {
    fn model_name(&self) -> &str {
        MhdModel::NAME
    }

    fn fill_messenger_info(&self, info: &mut MessengerInfo) -> Result<(), MessengerError> {
        match info.as_mhd() {
            Some(_) => Ok(()),
            None => Err(MessengerError::WrongPhysics {
                messenger: Self::NAME.to_string(),
                expected: "an MHD messenger info",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_mhd_infos_are_accepted() {
        let solver = SolverMhd;
        assert!(solver.fill_messenger_info(&mut MessengerInfo::mhd()).is_ok());
        assert!(solver.fill_messenger_info(&mut MessengerInfo::hybrid()).is_err());
        assert_eq!(solver.model_name(), "MHDModel");
    }
}
