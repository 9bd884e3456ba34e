//! Predictor-predictor-corrector solver of the hybrid model.
//!
//! One step from `t` to `t + dt` runs three phases:
//!
//! ```text
//! predictor 1: B* = B - dt curl E      E* = ohm(n, V, B*)   avg = (EM + EM*)/2
//!              ions moved through avg, moments only
//! predictor 2: B* = B - dt curl E_avg  E* = ohm(n, V, B*)   avg = (EM + EM*)/2
//!              ions moved through avg and committed
//! corrector:   B  = B - dt curl E_avg  E  = ohm(n, V, B)
//! ```
//!
//! Predictions live in the solver's own `"EMPred"` and `"EMAvg"` fields;
//! only the corrector writes the model E and B.

use hamr_amr::{Patch, PatchHierarchy, ResourcesManager};
use hamr_core::ParticleArray;
use hamr_messenger::{HybridMessenger, MessengerError, MessengerInfo, SolverQuantities};
use hamr_model::{Electromag, ElectromagIds, HybridIds, HybridModel, MomentBuffers, VecIds};
use tracing::{debug, trace};

use crate::access::{put_vec, set_vec_time, take_vec, vec_ref};
use crate::numerics::{self, OhmInputs};
use crate::pusher::select_in;
use crate::{PushMode, Pusher, SolverError};

/// The hybrid PPC solver.
#[derive(Debug)]
pub struct SolverPpc {
    pusher: Pusher,
    predicted: Electromag,
    averaged: Electromag,
    ids: Option<PpcIds>,
}

#[derive(Clone, Copy, Debug)]
struct PpcIds {
    predicted: ElectromagIds,
    averaged: ElectromagIds,
}

/// Which field set a phase writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Predictor1,
    Predictor2,
    Corrector,
}

impl SolverPpc {
    /// Solver name.
    pub const NAME: &'static str = "PPC";

    /// Solver pushing ions with `pusher`.
    pub fn new(pusher: Pusher) -> Self {
        Self {
            pusher,
            predicted: Electromag::new("EMPred"),
            averaged: Electromag::new("EMAvg"),
            ids: None,
        }
    }

    /// The pusher.
    pub fn pusher(&self) -> Pusher {
        self.pusher
    }

    /// Predicted fields.
    pub fn predicted(&self) -> &Electromag {
        &self.predicted
    }

    /// Time-averaged fields.
    pub fn averaged(&self) -> &Electromag {
        &self.averaged
    }

    fn ids(&self) -> Result<PpcIds, SolverError> {
        self.ids.ok_or(SolverError::NotRegistered { solver: Self::NAME })
    }

    /// Register the predicted and averaged fields.
    pub fn register_resources(
        &mut self,
        resources: &mut ResourcesManager,
    ) -> Result<(), SolverError> {
        self.ids = Some(PpcIds {
            predicted: self.predicted.register(resources)?,
            averaged: self.averaged.register(resources)?,
        });
        Ok(())
    }

    /// Allocate the predicted and averaged fields on `patch`.
    pub fn allocate(
        &self,
        resources: &ResourcesManager,
        patch: &mut Patch,
        time: f64,
    ) -> Result<(), SolverError> {
        let ids = self.ids()?;
        ids.predicted.allocate(resources, patch, time)?;
        ids.averaged.allocate(resources, patch, time)?;
        Ok(())
    }

    /// Advance `level` from `current_time` to `new_time`.
    pub fn advance_level(
        &self,
        hierarchy: &mut PatchHierarchy,
        level: usize,
        model: &HybridModel,
        messenger: &HybridMessenger,
        current_time: f64,
        new_time: f64,
    ) -> Result<(), SolverError> {
        let ids = self.ids()?;
        let model_ids = model.ids()?;
        let dt = new_time - current_time;
        let mut step = Step {
            hierarchy,
            level,
            model,
            model_ids,
            messenger,
            current_time,
            new_time,
            dt,
        };

        step.fields(Phase::Predictor1, &ids, &self.predicted)?;
        step.average(&ids)?;
        step.move_ions(self.pusher, &ids.averaged, PushMode::MomentsOnly)?;

        step.fields(Phase::Predictor2, &ids, &self.predicted)?;
        step.average(&ids)?;
        step.move_ions(self.pusher, &ids.averaged, PushMode::Commit)?;

        step.fields(Phase::Corrector, &ids, &self.predicted)?;
        debug!(level, current_time, new_time, "hybrid level advanced");
        Ok(())
    }
}

impl Default for SolverPpc {
    fn default() -> Self {
        Self::new(Pusher::default())
    }
}

impl SolverQuantities for SolverPpc {
    fn model_name(&self) -> &str {
        HybridModel::NAME
    }

    fn fill_messenger_info(&self, info: &mut MessengerInfo) -> Result<(), MessengerError> {
        let info = info.as_hybrid_mut().ok_or(MessengerError::WrongPhysics {
            messenger: Self::NAME.to_string(),
            expected: "a hybrid messenger info",
        })?;
        info.ghost_magnetic.push(self.predicted.magnetic().clone());
        info.ghost_electric.push(self.predicted.electric().clone());
        Ok(())
    }
}

/// State shared by the phases of one step.
struct Step<'a> {
    hierarchy: &'a mut PatchHierarchy,
    level: usize,
    model: &'a HybridModel,
    model_ids: &'a HybridIds,
    messenger: &'a HybridMessenger,
    current_time: f64,
    new_time: f64,
    dt: f64,
}

impl Step<'_> {
    /// Faraday, Ampere and Ohm of one phase, each followed by the ghost
    /// fill of what it wrote.
    fn fields(
        &mut self,
        phase: Phase,
        ids: &PpcIds,
        predicted: &Electromag,
    ) -> Result<(), SolverError> {
        let model: &HybridModel = self.model;
        let em = self.model_ids.electromag;
        let (e_source, out, out_fields) = match phase {
            Phase::Predictor1 => (em.electric, ids.predicted, predicted),
            Phase::Predictor2 => (ids.averaged.electric, ids.predicted, predicted),
            Phase::Corrector => (ids.averaged.electric, em, model.electromag()),
        };
        let current = self.model_ids.current;

        self.faraday(&em.magnetic, &e_source, &out.magnetic)?;
        self.messenger.fill_magnetic_ghosts(
            out_fields.magnetic(),
            self.hierarchy,
            self.level,
            self.new_time,
        )?;

        self.ampere(&out.magnetic, &current)?;
        self.messenger.fill_current_ghosts(
            model.current(),
            self.hierarchy,
            self.level,
            self.new_time,
        )?;

        self.ohm(&out.magnetic, &out.electric)?;
        self.messenger.fill_electric_ghosts(
            out_fields.electric(),
            self.hierarchy,
            self.level,
            self.new_time,
        )?;

        if phase == Phase::Corrector {
            for patch in self.hierarchy.level_mut(self.level)?.patches_mut() {
                set_vec_time(patch, &em.magnetic, self.new_time)?;
                set_vec_time(patch, &em.electric, self.new_time)?;
                set_vec_time(patch, &current, self.new_time)?;
            }
        }
        trace!(level = self.level, ?phase, "fields computed");
        Ok(())
    }

    fn faraday(&mut self, b: &VecIds, e: &VecIds, out: &VecIds) -> Result<(), SolverError> {
        for patch in self.hierarchy.level_mut(self.level)?.patches_mut() {
            let mut fields = take_vec(patch, out)?;
            if out != b {
                for (field, &id) in fields.iter_mut().zip(b) {
                    field.copy_from(patch.field(id)?);
                }
            }
            numerics::faraday(vec_ref(patch, e)?, &mut fields, self.dt);
            put_vec(patch, out, fields);
        }
        Ok(())
    }

    fn ampere(&mut self, b: &VecIds, j: &VecIds) -> Result<(), SolverError> {
        for patch in self.hierarchy.level_mut(self.level)?.patches_mut() {
            let mut fields = take_vec(patch, j)?;
            numerics::ampere(vec_ref(patch, b)?, &mut fields);
            put_vec(patch, j, fields);
        }
        Ok(())
    }

    fn ohm(&mut self, b: &VecIds, out: &VecIds) -> Result<(), SolverError> {
        let ions = &self.model_ids.ions;
        for patch in self.hierarchy.level_mut(self.level)?.patches_mut() {
            let mut fields = take_vec(patch, out)?;
            let inputs = OhmInputs {
                density: patch.field(ions.density)?,
                bulk_velocity: vec_ref(patch, &ions.bulk_velocity)?,
                magnetic: vec_ref(patch, b)?,
                current: vec_ref(patch, &self.model_ids.current)?,
                electrons: self.model.electrons(),
                resistivity: self.model.resistivity(),
            };
            numerics::ohm(&inputs, &mut fields);
            put_vec(patch, out, fields);
        }
        Ok(())
    }

    /// `EMAvg = (EM + EMPred) / 2`.
    fn average(&mut self, ids: &PpcIds) -> Result<(), SolverError> {
        let em = self.model_ids.electromag;
        for patch in self.hierarchy.level_mut(self.level)?.patches_mut() {
            for (model, predicted, averaged) in [
                (&em.electric, &ids.predicted.electric, &ids.averaged.electric),
                (&em.magnetic, &ids.predicted.magnetic, &ids.averaged.magnetic),
            ] {
                let mut fields = take_vec(patch, averaged)?;
                numerics::average(
                    vec_ref(patch, model)?,
                    vec_ref(patch, predicted)?,
                    &mut fields,
                );
                put_vec(patch, averaged, fields);
            }
        }
        Ok(())
    }

    /// Push every population through `fields` and deposit the moments of
    /// the particles ending in the patch interior, then complete ghost
    /// particles and moments through the messenger.
    ///
    /// Domain, patch-ghost and level-ghost particles are moved as copies
    /// and selected against the interior box of the patch.
    fn move_ions(
        &mut self,
        pusher: Pusher,
        fields: &ElectromagIds,
        mode: PushMode,
    ) -> Result<(), SolverError> {
        let populations = self.model.ions().populations();
        let mut committed = 0usize;
        for patch in self.hierarchy.level_mut(self.level)?.patches_mut() {
            let interior = patch.amr_box();
            let mesh_size = patch.layout().mesh_size();
            for (pop, &pop_ids) in populations.iter().zip(&self.model_ids.ions.populations) {
                let stepper = pusher.stepper(self.dt, pop.mass(), mesh_size);
                let mut buffers = MomentBuffers::take(patch, pop_ids)?;
                buffers.reset();
                let e = vec_ref(patch, &fields.electric)?;
                let b = vec_ref(patch, &fields.magnetic)?;
                let data = patch.particles(pop_ids.particles)?;
                let domain = stepper.push_copies(&data.domain, e, b);
                let patch_ghost = stepper.push_copies(&data.patch_ghost, e, b);
                let level_ghost = stepper.push_copies(&data.level_ghost, e, b);
                for moved in [&domain, &patch_ghost, &level_ghost] {
                    buffers.deposit(select_in(moved, interior), 1.0);
                }
                buffers.restore(patch);

                if mode == PushMode::Commit {
                    let mut inside: ParticleArray = select_in(&domain, interior).copied().collect();
                    inside.extend(select_in(&patch_ghost, interior).copied());
                    inside.extend(select_in(&level_ghost, interior).copied());
                    committed += inside.len();
                    let data = patch.particles_mut(pop_ids.particles)?;
                    data.domain = inside;
                    data.patch_ghost = patch_ghost;
                    data.level_ghost = level_ghost;
                    data.time = self.new_time;
                }
            }
        }
        if mode == PushMode::Commit {
            debug!(level = self.level, particles = committed, "ions committed");
        }
        self.messenger
            .fill_ion_ghost_particles(self.hierarchy, self.level, self.new_time)?;
        self.messenger.fill_ion_moment_ghosts(
            self.model,
            self.hierarchy,
            self.level,
            self.current_time,
            self.new_time,
        )?;
        Ok(())
    }
}
