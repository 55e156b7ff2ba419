use std::path::Path;

use crate::dataloader::dataloader::BatchSequence;
use crate::dataloader::error::Result;
use crate::tensor::tensor::Tensor;

use super::hyperparameters::Hyperparameters;

/// Concrete model code plugs in here. The generators are only visible through
/// `BatchSequence`.
///
/// `predict` must return one row of `[positive, negative]` confidences per
/// sample, in the order the testing sequence yields them.
pub trait ModelPlugin {
    type Model;

    fn train(
        &mut self,
        training: &mut dyn BatchSequence,
        validation: &mut dyn BatchSequence,
        hyperparameters: &Hyperparameters,
    ) -> Result<Self::Model>;

    fn predict(
        &mut self,
        model: &Self::Model,
        testing: &mut dyn BatchSequence,
        hyperparameters: &Hyperparameters,
    ) -> Result<Tensor>;

    fn save_model(&self, model: &Self::Model, path: &Path) -> Result<()>;

    fn load_model(&self, path: &Path) -> Result<Self::Model>;
}
