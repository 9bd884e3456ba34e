//! Recursive subcycling of a patch hierarchy.
//!
//! Each level takes [`REFINEMENT_RATIO`] steps per step of its coarser
//! level. A level step is followed by the substeps of the next finer
//! level, then by the restriction of the finer level onto it:
//!
//! ```text
//! L0  [------------------ dt ------------------]  sync(0, 1)
//! L1  [------ dt/2 -------][------ dt/2 -------]  sync(1, 2) after each
//! L2  [ dt/4 ][ dt/4 ]     [ dt/4 ][ dt/4 ]
//! ```
//!
//! Every `regrid_interval` coarse steps, when gridding is enabled, the
//! levels above 0 are rebuilt from the cells the strategy tags.

use hamr_amr::{HierarchyError, PatchHierarchy, PatchLevel, REFINEMENT_RATIO};
use hamr_core::AmrBox;
use tracing::{debug, info};

use crate::error::IntegratorError;
use crate::tagging::{cluster, Tags};

/// What the time-refinement driver asks of the levels it advances.
pub trait LevelStrategy {
    /// Allocate and fill the data of the freshly built `level`, from
    /// `old_level` when the level replaced one, otherwise from the initial
    /// conditions (level 0) or the coarser level.
    fn initialize_level_data(
        &mut self,
        hierarchy: &mut PatchHierarchy,
        level: usize,
        time: f64,
        old_level: Option<&PatchLevel>,
    ) -> Result<(), IntegratorError>;

    /// Rebuild the communication of `coarsest..=finest` after the
    /// hierarchy changed, and forget finer levels.
    fn reset_hierarchy_configuration(
        &mut self,
        hierarchy: &mut PatchHierarchy,
        coarsest: usize,
        finest: usize,
    ) -> Result<(), IntegratorError>;

    /// Advance `level` from `current_time` to `new_time`. `first_step`
    /// and `last_step` flag the first and last substeps of the coarser
    /// level's step.
    fn advance_level(
        &mut self,
        hierarchy: &mut PatchHierarchy,
        level: usize,
        current_time: f64,
        new_time: f64,
        first_step: bool,
        last_step: bool,
    ) -> Result<(), IntegratorError>;

    /// Restrict the levels `coarsest + 1..=finest` onto their coarser
    /// level, finest first, at `time`.
    fn standard_level_synchronize(
        &mut self,
        hierarchy: &mut PatchHierarchy,
        coarsest: usize,
        finest: usize,
        time: f64,
    ) -> Result<(), IntegratorError>;

    /// Cells of `level` needing refinement at `time`.
    fn apply_gradient_detector(
        &self,
        hierarchy: &PatchHierarchy,
        level: usize,
        time: f64,
    ) -> Result<Tags, IntegratorError>;
}

/// Parameters of tag-driven level construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GriddingConfig {
    /// Coarse steps between two regrids; 0 never regrids after
    /// initialization.
    pub regrid_interval: u64,
    /// Cells added around each tagged cell.
    pub tag_buffer: i32,
}

impl Default for GriddingConfig {
    fn default() -> Self {
        Self {
            regrid_interval: 4,
            tag_buffer: 2,
        }
    }
}

/// Drives a [`LevelStrategy`] over a hierarchy it owns.
#[derive(Debug)]
pub struct TimeRefinementIntegrator<S> {
    hierarchy: PatchHierarchy,
    strategy: S,
    gridding: Option<GriddingConfig>,
    time: f64,
    step: u64,
}

impl<S: LevelStrategy> TimeRefinementIntegrator<S> {
    /// Integrator starting at `start_time` over the levels already built
    /// in `hierarchy`.
    pub fn new(hierarchy: PatchHierarchy, strategy: S, start_time: f64) -> Self {
        Self {
            hierarchy,
            strategy,
            gridding: None,
            time: start_time,
            step: 0,
        }
    }

    /// Build and rebuild levels from tagged cells.
    pub fn with_gridding(mut self, gridding: GriddingConfig) -> Self {
        self.gridding = Some(gridding);
        self
    }

    /// Hierarchy advanced.
    pub fn hierarchy(&self) -> &PatchHierarchy {
        &self.hierarchy
    }

    /// Level strategy.
    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// Time of the coarsest level.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Coarse steps taken.
    pub fn step_count(&self) -> u64 {
        self.step
    }

    /// Initialize the levels of the hierarchy, coarsest first, then add
    /// tag-driven levels when gridding is enabled.
    pub fn initialize_hierarchy(&mut self) -> Result<(), IntegratorError> {
        let existing = self.hierarchy.number_of_levels();
        if existing == 0 {
            return Err(HierarchyError::LevelOutOfRange {
                level: 0,
                available: 0,
            }
            .into());
        }
        for level in 0..existing {
            self.strategy
                .initialize_level_data(&mut self.hierarchy, level, self.time, None)?;
        }
        if let Some(gridding) = self.gridding {
            let mut level = existing - 1;
            while level + 1 < self.hierarchy.max_levels() {
                let boxes = self.tagged_boxes(level, gridding.tag_buffer)?;
                if boxes.is_empty() {
                    break;
                }
                self.hierarchy.make_level(level + 1, &boxes)?;
                self.strategy
                    .initialize_level_data(&mut self.hierarchy, level + 1, self.time, None)?;
                level += 1;
            }
        }
        self.reset_configuration()?;
        info!(
            levels = self.hierarchy.number_of_levels(),
            time = self.time,
            "hierarchy initialized"
        );
        Ok(())
    }

    fn reset_configuration(&mut self) -> Result<(), IntegratorError> {
        let finest = self.hierarchy.finest_level_number().unwrap_or(0);
        self.strategy
            .reset_hierarchy_configuration(&mut self.hierarchy, 0, finest)
    }

    fn tagged_boxes(&self, level: usize, buffer: i32) -> Result<Vec<AmrBox>, IntegratorError> {
        let tags = self
            .strategy
            .apply_gradient_detector(&self.hierarchy, level, self.time)?;
        Ok(cluster(
            &tags,
            self.hierarchy.level(level)?,
            buffer,
            REFINEMENT_RATIO,
        ))
    }

    /// Advance the whole hierarchy by one coarse step `dt`, then regrid
    /// if due. Returns the new time.
    pub fn advance(&mut self, dt: f64) -> Result<f64, IntegratorError> {
        let new_time = self.time + dt;
        self.advance_recursive(0, self.time, new_time, true, true)?;
        self.time = new_time;
        self.step += 1;
        if let Some(gridding) = self.gridding {
            if gridding.regrid_interval > 0 && self.step % gridding.regrid_interval == 0 {
                self.regrid(gridding)?;
            }
        }
        Ok(new_time)
    }

    fn advance_recursive(
        &mut self,
        level: usize,
        current_time: f64,
        new_time: f64,
        first_step: bool,
        last_step: bool,
    ) -> Result<(), IntegratorError> {
        self.strategy.advance_level(
            &mut self.hierarchy,
            level,
            current_time,
            new_time,
            first_step,
            last_step,
        )?;
        let finer = level + 1;
        if finer < self.hierarchy.number_of_levels() {
            let substeps = REFINEMENT_RATIO as usize;
            let dt = (new_time - current_time) / substeps as f64;
            for k in 0..substeps {
                let start = current_time + k as f64 * dt;
                let end = if k + 1 == substeps {
                    new_time
                } else {
                    start + dt
                };
                self.advance_recursive(finer, start, end, k == 0, k + 1 == substeps)?;
            }
            self.strategy
                .standard_level_synchronize(&mut self.hierarchy, level, finer, new_time)?;
        }
        Ok(())
    }

    /// Rebuild every level above 0 from the tags of its coarser level.
    fn regrid(&mut self, gridding: GriddingConfig) -> Result<(), IntegratorError> {
        let mut level = 0;
        while level + 1 < self.hierarchy.max_levels()
            && level < self.hierarchy.number_of_levels()
        {
            let boxes = self.tagged_boxes(level, gridding.tag_buffer)?;
            if boxes.is_empty() {
                self.hierarchy.remove_finer_levels(level);
                break;
            }
            let old = self.hierarchy.make_level(level + 1, &boxes)?;
            self.strategy.initialize_level_data(
                &mut self.hierarchy,
                level + 1,
                self.time,
                old.as_ref(),
            )?;
            debug!(level = level + 1, boxes = boxes.len(), "level rebuilt");
            level += 1;
        }
        self.reset_configuration()?;
        info!(
            step = self.step,
            levels = self.hierarchy.number_of_levels(),
            "hierarchy regridded"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hamr_amr::GridGeometry;

    #[derive(Clone, Debug, PartialEq)]
    enum Call {
        Init(usize, bool),
        Reset(usize),
        Advance(usize, f64, f64, bool, bool),
        Sync(usize, usize),
    }

    /// Records calls; tags a fixed run of cells on every level.
    #[derive(Default)]
    struct Recorder {
        calls: Vec<Call>,
        tagged: Option<(i32, i32)>,
    }

    impl LevelStrategy for Recorder {
        fn initialize_level_data(
            &mut self,
            _: &mut PatchHierarchy,
            level: usize,
            _: f64,
            old: Option<&PatchLevel>,
        ) -> Result<(), IntegratorError> {
            self.calls.push(Call::Init(level, old.is_some()));
            Ok(())
        }

        fn reset_hierarchy_configuration(
            &mut self,
            _: &mut PatchHierarchy,
            _: usize,
            finest: usize,
        ) -> Result<(), IntegratorError> {
            self.calls.push(Call::Reset(finest));
            Ok(())
        }

        fn advance_level(
            &mut self,
            _: &mut PatchHierarchy,
            level: usize,
            current_time: f64,
            new_time: f64,
            first_step: bool,
            last_step: bool,
        ) -> Result<(), IntegratorError> {
            self.calls.push(Call::Advance(
                level,
                current_time,
                new_time,
                first_step,
                last_step,
            ));
            Ok(())
        }

        fn standard_level_synchronize(
            &mut self,
            _: &mut PatchHierarchy,
            coarsest: usize,
            finest: usize,
            _: f64,
        ) -> Result<(), IntegratorError> {
            self.calls.push(Call::Sync(coarsest, finest));
            Ok(())
        }

        fn apply_gradient_detector(
            &self,
            hierarchy: &PatchHierarchy,
            level: usize,
            _: f64,
        ) -> Result<Tags, IntegratorError> {
            let mut tags = Tags::for_level(hierarchy.level(level)?);
            if let Some((lower, upper)) = self.tagged {
                let shift = hierarchy.geometry().ratio_to_level_zero(level);
                for cell in lower * shift..=upper * shift {
                    tags.set(cell);
                }
            }
            Ok(tags)
        }
    }

    fn hierarchy(levels: usize) -> PatchHierarchy {
        let geometry = GridGeometry::new(0.0, 0.1, 32, true).unwrap();
        let mut h = PatchHierarchy::new(geometry, 3);
        h.make_level(0, &[AmrBox::new(0, 31)]).unwrap();
        if levels > 1 {
            h.make_level(1, &[AmrBox::new(16, 47)]).unwrap();
        }
        if levels > 2 {
            h.make_level(2, &[AmrBox::new(40, 79)]).unwrap();
        }
        h
    }

    #[test]
    fn fine_levels_take_two_substeps_then_synchronize() {
        let mut integrator = TimeRefinementIntegrator::new(hierarchy(3), Recorder::default(), 0.0);
        integrator.advance(1.0).unwrap();
        let advances: Vec<Call> = integrator
            .strategy()
            .calls
            .iter()
            .filter(|c| !matches!(c, Call::Init(..) | Call::Reset(_)))
            .cloned()
            .collect();
        assert_eq!(
            advances,
            vec![
                Call::Advance(0, 0.0, 1.0, true, true),
                Call::Advance(1, 0.0, 0.5, true, false),
                Call::Advance(2, 0.0, 0.25, true, false),
                Call::Advance(2, 0.25, 0.5, false, true),
                Call::Sync(1, 2),
                Call::Advance(1, 0.5, 1.0, false, true),
                Call::Advance(2, 0.5, 0.75, true, false),
                Call::Advance(2, 0.75, 1.0, false, true),
                Call::Sync(1, 2),
                Call::Sync(0, 1),
            ]
        );
        assert_eq!(integrator.time(), 1.0);
        assert_eq!(integrator.step_count(), 1);
    }

    #[test]
    fn existing_levels_are_initialized_coarsest_first() {
        let mut integrator = TimeRefinementIntegrator::new(hierarchy(2), Recorder::default(), 0.0);
        integrator.initialize_hierarchy().unwrap();
        assert_eq!(
            integrator.strategy().calls,
            vec![Call::Init(0, false), Call::Init(1, false), Call::Reset(1)]
        );
    }

    #[test]
    fn tags_build_finer_levels_up_to_the_maximum() {
        let recorder = Recorder {
            tagged: Some((12, 19)),
            ..Recorder::default()
        };
        let mut integrator = TimeRefinementIntegrator::new(hierarchy(1), recorder, 0.0)
            .with_gridding(GriddingConfig {
                regrid_interval: 1,
                tag_buffer: 1,
            });
        integrator.initialize_hierarchy().unwrap();
        assert_eq!(integrator.hierarchy().number_of_levels(), 3);
        assert_eq!(
            integrator.hierarchy().level(1).unwrap().boxes(),
            vec![AmrBox::new(22, 41)]
        );

        integrator.advance(0.1).unwrap();
        let calls = &integrator.strategy().calls;
        assert!(calls.contains(&Call::Init(1, true)));
        assert!(calls.contains(&Call::Init(2, true)));
        assert_eq!(calls.last(), Some(&Call::Reset(2)));
    }

    #[test]
    fn an_empty_hierarchy_cannot_be_initialized() {
        let geometry = GridGeometry::new(0.0, 0.1, 32, true).unwrap();
        let h = PatchHierarchy::new(geometry, 2);
        let mut integrator = TimeRefinementIntegrator::new(h, Recorder::default(), 0.0);
        assert!(matches!(
            integrator.initialize_hierarchy(),
            Err(IntegratorError::Hierarchy(_))
        ));
    }
}
