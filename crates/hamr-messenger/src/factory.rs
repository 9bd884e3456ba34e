//! Messenger construction from model names.

use std::fmt;

use hamr_amr::{ParticleSplit, ResourcesManager};
use hamr_model::{HybridModel, MhdModel, PhysicalModel};
use tracing::info;

use crate::strategy::{HybridHybridStrategy, HybridMessengerStrategy, MhdHybridStrategy};
use crate::{HybridMessenger, Messenger, MessengerError, MhdMessenger};

/// A (coarse model, fine model) pair needing a messenger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessengerDescriptor {
    /// Model of the coarser level.
    pub coarse_model: String,
    /// Model of the finer level.
    pub fine_model: String,
}

impl MessengerDescriptor {
    /// `"<Coarse>-<Fine>"`.
    pub fn name(&self) -> String {
        format!("{}-{}", self.coarse_model, self.fine_model)
    }
}

impl fmt::Display for MessengerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.coarse_model, self.fine_model)
    }
}

/// Descriptors for models ordered from the coarsest levels up: each
/// model with itself and each model with the next one.
///
/// `["MHDModel", "HybridModel"]` gives `MHD-MHD`, `MHD-Hybrid` and
/// `Hybrid-Hybrid`, in that order.
pub fn make_descriptors(models: &[&str]) -> Vec<MessengerDescriptor> {
    let pair = |coarse: &str, fine: &str| MessengerDescriptor {
        coarse_model: coarse.to_string(),
        fine_model: fine.to_string(),
    };
    let mut descriptors = Vec::with_capacity(2 * models.len());
    for (i, model) in models.iter().enumerate() {
        descriptors.push(pair(model, model));
        if let Some(next) = models.get(i + 1) {
            descriptors.push(pair(model, next));
        }
    }
    descriptors
}

/// Builds messengers by name.
#[derive(Debug)]
pub struct MessengerFactory {
    descriptors: Vec<MessengerDescriptor>,
    split: ParticleSplit,
}

impl MessengerFactory {
    /// Factory able to build the messengers of `descriptors`.
    pub fn new(descriptors: Vec<MessengerDescriptor>) -> Self {
        Self {
            descriptors,
            split: ParticleSplit::default(),
        }
    }

    /// Use `split` to refine hybrid particles.
    pub fn with_split(mut self, split: ParticleSplit) -> Self {
        self.split = split;
        self
    }

    /// Descriptors served.
    pub fn descriptors(&self) -> &[MessengerDescriptor] {
        &self.descriptors
    }

    /// Names of the messengers this factory builds.
    pub fn names(&self) -> impl Iterator<Item = String> + '_ {
        self.descriptors.iter().map(MessengerDescriptor::name)
    }

    /// Build messenger `name` between `coarse_model` and `fine_model`,
    /// whose hybrid levels start at `first_level`. Messenger scratch
    /// resources are registered with `resources`.
    pub fn create(
        &self,
        name: &str,
        coarse_model: &PhysicalModel,
        fine_model: &PhysicalModel,
        resources: &mut ResourcesManager,
        first_level: usize,
    ) -> Result<Messenger, MessengerError> {
        if !self.descriptors.iter().any(|d| d.name() == name) {
            return Err(MessengerError::UnknownMessenger {
                name: name.to_string(),
            });
        }
        let pair = format!("{}-{}", coarse_model.name(), fine_model.name());
        if pair != name {
            return Err(MessengerError::NameMismatch {
                what: "messenger models",
                expected: name.to_string(),
                found: pair,
            });
        }
        let messenger = match (coarse_model.name(), fine_model.name()) {
            (HybridModel::NAME, HybridModel::NAME) => Messenger::Hybrid(HybridMessenger::new(
                HybridMessengerStrategy::HybridHybrid(HybridHybridStrategy::new(
                    resources,
                    first_level,
                    self.split,
                )?),
            )),
            (MhdModel::NAME, HybridModel::NAME) => Messenger::Hybrid(HybridMessenger::new(
                HybridMessengerStrategy::MhdHybrid(MhdHybridStrategy::new(resources, first_level)?),
            )),
            (MhdModel::NAME, MhdModel::NAME) => Messenger::Mhd(MhdMessenger::new(resources)?),
            _ => {
                return Err(MessengerError::UnknownMessenger {
                    name: name.to_string(),
                })
            }
        };
        info!(messenger = name, first_level, "messenger created");
        Ok(messenger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn descriptors_pair_each_model_with_itself_and_the_next() {
        let names: Vec<String> = make_descriptors(&["MHDModel", "HybridModel"])
            .iter()
            .map(MessengerDescriptor::name)
            .collect();
        assert_eq!(
            names,
            ["MHDModel-MHDModel", "MHDModel-HybridModel", "HybridModel-HybridModel"]
        );
    }

    #[test]
    fn single_model_gives_one_descriptor() {
        let d = make_descriptors(&["HybridModel"]);
        assert_eq!(d.len(), 1);
        assert_eq!(d[0].to_string(), "HybridModel-HybridModel");
    }

    #[test]
    fn no_model_gives_no_descriptor() {
        assert!(make_descriptors(&[]).is_empty());
    }

    proptest! {
        #[test]
        fn descriptors_chain_from_coarse_to_fine(
            models in prop::collection::vec("[A-Z][a-z]{1,6}", 1..6),
        ) {
            let names: Vec<&str> = models.iter().map(String::as_str).collect();
            let d = make_descriptors(&names);
            prop_assert_eq!(d.len(), 2 * names.len() - 1);
            prop_assert_eq!(&d[0].coarse_model, &models[0]);
            prop_assert_eq!(&d[d.len() - 1].fine_model, &models[models.len() - 1]);
            for pair in d.windows(2) {
                prop_assert_eq!(&pair[0].fine_model, &pair[1].coarse_model);
            }
        }
    }
}
