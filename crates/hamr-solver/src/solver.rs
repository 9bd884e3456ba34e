//! The solver of a level, whichever model it advances.

use hamr_amr::{Patch, PatchHierarchy, ResourcesManager};
use hamr_messenger::{Messenger, MessengerError, MessengerInfo, SolverQuantities};
use hamr_model::PhysicalModel;

use crate::{SolverError, SolverMhd, SolverPpc};

/// A level solver.
#[derive(Debug)]
pub enum Solver {
    /// Hybrid predictor-predictor-corrector.
    Ppc(SolverPpc),
    /// Ideal MHD induction.
    Mhd(SolverMhd),
}

impl Solver {
    /// Solver name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ppc(_) => SolverPpc::NAME,
            Self::Mhd(_) => SolverMhd::NAME,
        }
    }

    /// Register the solver's own resources.
    pub fn register_resources(
        &mut self,
        resources: &mut ResourcesManager,
    ) -> Result<(), SolverError> {
        match self {
            Self::Ppc(s) => s.register_resources(resources),
            Self::Mhd(s) => s.register_resources(resources),
        }
    }

    /// Allocate the solver's own resources on `patch`.
    pub fn allocate(
        &self,
        resources: &ResourcesManager,
        patch: &mut Patch,
        time: f64,
    ) -> Result<(), SolverError> {
        match self {
            Self::Ppc(s) => s.allocate(resources, patch, time),
            Self::Mhd(_) => Ok(()),
        }
    }

    /// Advance `level` of `model` from `current_time` to `new_time`,
    /// filling ghosts through `messenger`.
    pub fn advance_level(
        &self,
        hierarchy: &mut PatchHierarchy,
        level: usize,
        model: &PhysicalModel,
        messenger: &Messenger,
        current_time: f64,
        new_time: f64,
    ) -> Result<(), SolverError> {
        let name = self.name();
        match self {
            Self::Ppc(s) => {
                let model = model.as_hybrid().ok_or(SolverError::WrongPhysics {
                    solver: name,
                    expected: "the hybrid model",
                })?;
                let messenger = messenger.as_hybrid().ok_or(SolverError::WrongPhysics {
                    solver: name,
                    expected: "a hybrid messenger",
                })?;
                s.advance_level(hierarchy, level, model, messenger, current_time, new_time)
            }
            Self::Mhd(s) => {
                let model = model.as_mhd().ok_or(SolverError::WrongPhysics {
                    solver: name,
                    expected: "the MHD model",
                })?;
                let messenger = messenger.as_mhd().ok_or(SolverError::WrongPhysics {
                    solver: name,
                    expected: "an MHD messenger",
                })?;
                s.advance_level(hierarchy, level, model, messenger, current_time, new_time)
            }
        }
    }
}

impl SolverQuantities for Solver {
    fn model_name(&self) -> &str {
        match self {
            Self::Ppc(s) => s.model_name(),
            Self::Mhd(s) => s.model_name(),
        }
    }

    fn fill_messenger_info(&self, info: &mut MessengerInfo) -> Result<(), MessengerError> {
        match self {
            Self::Ppc(s) => s.fill_messenger_info(info),
            Self::Mhd(s) => s.fill_messenger_info(info),
        }
    }
}

impl From<SolverPpc> for Solver {
    fn from(s: SolverPpc) -> Self {
        Self::Ppc(s)
    }
}

impl From<SolverMhd> for Solver {
    fn from(s: SolverMhd) -> Self {
        Self::Mhd(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hamr_model::MhdModel;

    #[test]
    fn names_follow_the_variant() {
        let ppc = Solver::from(SolverPpc::default());
        let mhd = Solver::from(SolverMhd);
        assert_eq!((ppc.name(), ppc.model_name()), ("PPC", "HybridModel"));
        assert_eq!((mhd.name(), mhd.model_name()), ("MHDSolver", MhdModel::NAME));
    }
}
