//! Level-range registration of models, solvers and messengers.
//!
//! A [`MultiPhysicsIntegrator`] partitions the levels of a hierarchy into
//! contiguous ranges, each advanced by one physical model and one solver.
//! Every level then gets the messenger bridging the model of its coarser
//! level and its own model, one messenger per distinct pair:
//!
//! ```text
//! level  model        solver     messenger
//!   0    MHDModel     MHDSolver  MHDModel-MHDModel
//!   1    MHDModel     MHDSolver  MHDModel-MHDModel
//!   2    HybridModel  PPC        MHDModel-HybridModel
//!   3    HybridModel  PPC        HybridModel-HybridModel
//! ```
//!
//! The integrator is the [`LevelStrategy`] driven by the
//! [`TimeRefinementIntegrator`](crate::TimeRefinementIntegrator).

use hamr_amr::{PatchHierarchy, PatchLevel, ResourcesManager};
use hamr_messenger::{Messenger, MessengerFactory, MessengerRegistration, SolverQuantities};
use hamr_model::PhysicalModel;
use hamr_solver::Solver;
use tracing::{debug, info};

use crate::error::{IntegratorError, Registered};
use crate::tagging::{magnetic_ids, GradientTagger, Tags};
use crate::time_refinement::LevelStrategy;

/// An item registered over the levels `level_min..=level_max`.
#[derive(Debug)]
struct Ranged<T> {
    level_min: usize,
    level_max: usize,
    item: T,
}

/// Indices of what advances one level.
#[derive(Clone, Copy, Debug, Default)]
struct LevelSlots {
    model: Option<usize>,
    solver: Option<usize>,
    messenger: Option<usize>,
}

/// Indices of a fully set up level.
#[derive(Clone, Copy, Debug)]
struct LevelDescriptor {
    model: usize,
    solver: usize,
    messenger: usize,
}

/// Models, solvers and messengers of every level of a hierarchy.
#[derive(Debug)]
pub struct MultiPhysicsIntegrator {
    resources: ResourcesManager,
    models: Vec<Ranged<PhysicalModel>>,
    solvers: Vec<Ranged<Solver>>,
    messengers: Vec<Messenger>,
    levels: Vec<LevelSlots>,
    tagger: Option<GradientTagger>,
    substeps: Vec<(f64, f64)>,
}

impl MultiPhysicsIntegrator {
    /// Integrator for the levels `0..=max_level_number`.
    pub fn new(max_level_number: usize) -> Self {
        let nbr_levels = max_level_number + 1;
        Self {
            resources: ResourcesManager::default(),
            models: Vec::new(),
            solvers: Vec::new(),
            messengers: Vec::new(),
            levels: vec![LevelSlots::default(); nbr_levels],
            tagger: None,
            substeps: vec![(0.0, 0.0); nbr_levels],
        }
    }

    /// Tag cells for refinement with `tagger`.
    pub fn with_tagger(mut self, tagger: GradientTagger) -> Self {
        self.tagger = Some(tagger);
        self
    }

    /// Number of levels the integrator covers.
    pub fn nbr_levels(&self) -> usize {
        self.levels.len()
    }

    /// Resources registered by the models, solvers and messengers.
    pub fn resources(&self) -> &ResourcesManager {
        &self.resources
    }

    fn check_range(
        &self,
        what: Registered,
        level_min: usize,
        level_max: usize,
    ) -> Result<(), IntegratorError> {
        if level_min > level_max {
            return Err(IntegratorError::ReversedRange {
                what,
                level_min,
                level_max,
            });
        }
        let max_level = self.levels.len() - 1;
        if level_max > max_level {
            return Err(IntegratorError::LevelOutOfRange {
                what,
                level: level_max,
                max_level,
            });
        }
        let taken = |slots: &LevelSlots| match what {
            Registered::Model => slots.model.is_some(),
            Registered::Solver => slots.solver.is_some(),
        };
        match (level_min..=level_max).find(|&l| taken(&self.levels[l])) {
            Some(level) => Err(IntegratorError::Overlap { what, level }),
            None => Ok(()),
        }
    }

    /// Advance the levels `level_min..=level_max` with `model`, whose
    /// resources are registered here.
    pub fn register_model(
        &mut self,
        level_min: usize,
        level_max: usize,
        model: impl Into<PhysicalModel>,
    ) -> Result<(), IntegratorError> {
        self.check_range(Registered::Model, level_min, level_max)?;
        let mut model = model.into();
        model.register_resources(&mut self.resources)?;
        let index = self.models.len();
        for slots in &mut self.levels[level_min..=level_max] {
            slots.model = Some(index);
        }
        info!(
            model = model.name(),
            level_min,
            level_max,
            "model registered"
        );
        self.models.push(Ranged {
            level_min,
            level_max,
            item: model,
        });
        Ok(())
    }

    /// Advance the levels `level_min..=level_max` with `solver`. The
    /// levels must already run the model the solver advances.
    pub fn register_and_init_solver(
        &mut self,
        level_min: usize,
        level_max: usize,
        solver: impl Into<Solver>,
    ) -> Result<(), IntegratorError> {
        self.check_range(Registered::Solver, level_min, level_max)?;
        let mut solver = solver.into();
        for level in level_min..=level_max {
            let model = self.model_index(level)?;
            let model_name = self.models[model].item.name();
            if model_name != solver.model_name() {
                return Err(IntegratorError::ModelMismatch {
                    level,
                    model: model_name.to_string(),
                    solver_model: solver.model_name().to_string(),
                });
            }
        }
        solver.register_resources(&mut self.resources)?;
        let index = self.solvers.len();
        for slots in &mut self.levels[level_min..=level_max] {
            slots.solver = Some(index);
        }
        info!(
            solver = solver.name(),
            level_min,
            level_max,
            "solver registered"
        );
        self.solvers.push(Ranged {
            level_min,
            level_max,
            item: solver,
        });
        Ok(())
    }

    /// Build the messenger of every level with `factory`, once every
    /// level has a model and a solver.
    ///
    /// Level `L` gets the messenger `"<model(L-1)>-<model(L)>"` (level 0
    /// pairs its model with itself). Levels sharing a pair share the
    /// messenger, whose first level is the lowest level of its fine model.
    pub fn register_and_setup_messengers(
        &mut self,
        factory: &MessengerFactory,
    ) -> Result<(), IntegratorError> {
        for level in 0..self.levels.len() {
            self.model_index(level)?;
            self.solver_index(level)?;
        }
        self.messengers.clear();
        let mut names: Vec<String> = Vec::new();
        for level in 0..self.levels.len() {
            let fine = self.model_index(level)?;
            let coarse = self.model_index(level.saturating_sub(1))?;
            let solver = self.solver_index(level)?;
            let name = format!(
                "{}-{}",
                self.models[coarse].item.name(),
                self.models[fine].item.name()
            );
            let index = match names.iter().position(|n| *n == name) {
                Some(index) => index,
                None => {
                    let mut messenger = factory.create(
                        &name,
                        &self.models[coarse].item,
                        &self.models[fine].item,
                        &mut self.resources,
                        self.models[fine].level_min,
                    )?;
                    MessengerRegistration::register_quantities(
                        &mut messenger,
                        &self.models[coarse].item,
                        &self.models[fine].item,
                        &self.solvers[solver].item,
                        &self.resources,
                    )?;
                    self.messengers.push(messenger);
                    names.push(name);
                    names.len() - 1
                }
            };
            self.levels[level].messenger = Some(index);
        }
        info!(messengers = ?names, "messengers set up");
        Ok(())
    }

    fn slots(&self, what: Registered, level: usize) -> Result<&LevelSlots, IntegratorError> {
        self.levels
            .get(level)
            .ok_or(IntegratorError::LevelOutOfRange {
                what,
                level,
                max_level: self.levels.len() - 1,
            })
    }

    fn model_index(&self, level: usize) -> Result<usize, IntegratorError> {
        self.slots(Registered::Model, level)?
            .model
            .ok_or(IntegratorError::Gap {
                what: Registered::Model,
                level,
            })
    }

    fn solver_index(&self, level: usize) -> Result<usize, IntegratorError> {
        self.slots(Registered::Solver, level)?
            .solver
            .ok_or(IntegratorError::Gap {
                what: Registered::Solver,
                level,
            })
    }

    fn messenger_index(&self, level: usize) -> Result<usize, IntegratorError> {
        self.slots(Registered::Model, level)?
            .messenger
            .ok_or(IntegratorError::MessengersNotReady { level })
    }

    fn descriptor(&self, level: usize) -> Result<LevelDescriptor, IntegratorError> {
        Ok(LevelDescriptor {
            model: self.model_index(level)?,
            solver: self.solver_index(level)?,
            messenger: self.messenger_index(level)?,
        })
    }

    /// Model advanced on `level`.
    pub fn model(&self, level: usize) -> Result<&PhysicalModel, IntegratorError> {
        Ok(&self.models[self.model_index(level)?].item)
    }

    /// Solver of `level`.
    pub fn solver(&self, level: usize) -> Result<&Solver, IntegratorError> {
        Ok(&self.solvers[self.solver_index(level)?].item)
    }

    /// Messenger of `level`.
    pub fn messenger(&self, level: usize) -> Result<&Messenger, IntegratorError> {
        Ok(&self.messengers[self.messenger_index(level)?])
    }

    /// Name of the model advanced on `level`.
    pub fn model_name(&self, level: usize) -> Result<&'static str, IntegratorError> {
        Ok(self.model(level)?.name())
    }

    /// Name of the solver of `level`.
    pub fn solver_name(&self, level: usize) -> Result<&'static str, IntegratorError> {
        Ok(self.solver(level)?.name())
    }

    /// Name of the messenger of `level`.
    pub fn messenger_name(&self, level: usize) -> Result<&'static str, IntegratorError> {
        Ok(self.messenger(level)?.name())
    }

    /// Levels covered by the model of `level`.
    pub fn model_range(&self, level: usize) -> Result<(usize, usize), IntegratorError> {
        let model = &self.models[self.model_index(level)?];
        Ok((model.level_min, model.level_max))
    }

    /// Levels covered by the solver of `level`.
    pub fn solver_range(&self, level: usize) -> Result<(usize, usize), IntegratorError> {
        let solver = &self.solvers[self.solver_index(level)?];
        Ok((solver.level_min, solver.level_max))
    }
}

impl LevelStrategy for MultiPhysicsIntegrator {
    fn initialize_level_data(
        &mut self,
        hierarchy: &mut PatchHierarchy,
        level: usize,
        time: f64,
        old_level: Option<&PatchLevel>,
    ) -> Result<(), IntegratorError> {
        let d = self.descriptor(level)?;
        // the messenger of the next level snapshots this one
        let finer = self
            .levels
            .get(level + 1)
            .and_then(|slots| slots.messenger)
            .filter(|&m| m != d.messenger);
        let model = &self.models[d.model].item;
        let solver = &self.solvers[d.solver].item;
        for patch in hierarchy.level_mut(level)?.patches_mut() {
            model.allocate(&self.resources, patch, time)?;
            solver.allocate(&self.resources, patch, time)?;
            self.messengers[d.messenger].allocate(&self.resources, patch, time)?;
            if let Some(m) = finer {
                self.messengers[m].allocate(&self.resources, patch, time)?;
            }
        }

        let messenger = &mut self.messengers[d.messenger];
        match old_level {
            Some(old) => messenger.regrid(model, hierarchy, level, old, time)?,
            None if level == 0 => {
                model.initialize(hierarchy, level, time)?;
                messenger.register_level(hierarchy, level)?;
                messenger.fill_root_ghosts(model, hierarchy, level, time)?;
            }
            None => messenger.init_level(model, hierarchy, level, time)?,
        }
        info!(
            level,
            model = model.name(),
            regrid = old_level.is_some(),
            time,
            "level data initialized"
        );
        Ok(())
    }

    fn reset_hierarchy_configuration(
        &mut self,
        hierarchy: &mut PatchHierarchy,
        coarsest: usize,
        finest: usize,
    ) -> Result<(), IntegratorError> {
        for level in coarsest..=finest {
            let m = self.messenger_index(level)?;
            self.messengers[m].register_level(hierarchy, level)?;
        }
        for messenger in &mut self.messengers {
            messenger.remove_finer(finest);
        }
        debug!(coarsest, finest, "hierarchy configuration reset");
        Ok(())
    }

    fn advance_level(
        &mut self,
        hierarchy: &mut PatchHierarchy,
        level: usize,
        current_time: f64,
        new_time: f64,
        first_step: bool,
        last_step: bool,
    ) -> Result<(), IntegratorError> {
        let d = self.descriptor(level)?;
        self.substeps[level] = (current_time, new_time);
        let model = &self.models[d.model].item;

        let has_finer = hierarchy
            .finest_level_number()
            .is_some_and(|finest| finest > level);
        if has_finer {
            let m = self.messenger_index(level + 1)?;
            self.messengers[m].prepare_step(model, hierarchy, level)?;
        }
        if level > 0 && first_step {
            let coarse_time = self.substeps[level - 1].1;
            self.messengers[d.messenger].first_step(model, hierarchy, level, coarse_time)?;
        }

        self.solvers[d.solver].item.advance_level(
            hierarchy,
            level,
            model,
            &self.messengers[d.messenger],
            current_time,
            new_time,
        )?;

        if level > 0 && last_step {
            self.messengers[d.messenger].last_step(hierarchy, level)?;
        }
        debug!(level, current_time, new_time, "level advanced");
        Ok(())
    }

    fn standard_level_synchronize(
        &mut self,
        hierarchy: &mut PatchHierarchy,
        coarsest: usize,
        finest: usize,
        time: f64,
    ) -> Result<(), IntegratorError> {
        for level in (coarsest + 1..=finest).rev() {
            let m = self.messenger_index(level)?;
            self.messengers[m].synchronize(hierarchy, level)?;
        }
        debug!(coarsest, finest, time, "levels synchronized");
        Ok(())
    }

    fn apply_gradient_detector(
        &self,
        hierarchy: &PatchHierarchy,
        level: usize,
        _time: f64,
    ) -> Result<Tags, IntegratorError> {
        let patch_level = hierarchy.level(level)?;
        let mut tags = Tags::for_level(patch_level);
        let Some(tagger) = self.tagger else {
            return Ok(tags);
        };
        let magnetic = magnetic_ids(self.model(level)?)?;
        for patch in patch_level.patches() {
            tagger.tag(patch, &magnetic, &mut tags)?;
        }
        debug!(level, tagged = tags.count(), "cells tagged");
        Ok(tags)
    }
}
