//! Checked hand-off of model and solver quantities to a messenger.

use hamr_amr::ResourcesManager;
use hamr_model::{MessengerInfo, PhysicalModel};
use tracing::debug;

use crate::{Messenger, MessengerError};

/// What a solver declares to the messenger of its levels.
pub trait SolverQuantities {
    /// Name of the model the solver advances.
    fn model_name(&self) -> &str;

    /// Add the solver's own quantities (temporaries needing ghosts) to
    /// `info`.
    fn fill_messenger_info(&self, info: &mut MessengerInfo) -> Result<(), MessengerError>;
}

/// Registers the quantities of a model pair and a solver with a
/// messenger.
#[derive(Clone, Copy, Debug, Default)]
pub struct MessengerRegistration;

fn check(what: &'static str, expected: &str, found: &str) -> Result<(), MessengerError> {
    if expected == found {
        Ok(())
    } else {
        Err(MessengerError::NameMismatch {
            what,
            expected: expected.to_string(),
            found: found.to_string(),
        })
    }
}

impl MessengerRegistration {
    /// Check that `messenger` bridges `coarse_model` and `fine_model` and
    /// that `solver` advances the fine model, then fill the messenger
    /// infos: the fine model and the solver describe what comes from the
    /// coarser level, the coarse model what comes from the finer level.
    pub fn register_quantities<S: SolverQuantities + ?Sized>(
        messenger: &mut Messenger,
        coarse_model: &PhysicalModel,
        fine_model: &PhysicalModel,
        solver: &S,
        resources: &ResourcesManager,
    ) -> Result<(), MessengerError> {
        check("fine model", messenger.fine_model_name(), fine_model.name())?;
        check(
            "coarse model",
            messenger.coarse_model_name(),
            coarse_model.name(),
        )?;
        check("solver model", fine_model.name(), solver.model_name())?;

        let mut from_coarser = messenger.empty_info_from_coarser();
        let mut from_finer = messenger.empty_info_from_finer();
        fine_model.fill_messenger_info(&mut from_coarser)?;
        solver.fill_messenger_info(&mut from_coarser)?;
        coarse_model.fill_messenger_info(&mut from_finer)?;
        debug!(messenger = messenger.name(), "messenger infos filled");
        messenger.register_quantities(from_coarser, from_finer, resources)
    }
}
