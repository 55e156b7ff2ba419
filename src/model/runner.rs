use std::fmt;
use std::path::Path;
use std::str::FromStr;

use tracing::info;

use crate::dataloader::error::{DataLoaderError, Result};
use crate::dataloader::generator::VolumeBatchGenerator;
use crate::labels::export::PredictionExport;

use super::hyperparameters::Hyperparameters;
use super::plugin::ModelPlugin;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Train,
    Predict,
    TrainAndPredict,
}

impl Operation {
    pub fn trains(self) -> bool {
        matches!(self, Operation::Train | Operation::TrainAndPredict)
    }

    pub fn predicts(self) -> bool {
        matches!(self, Operation::Predict | Operation::TrainAndPredict)
    }
}

impl FromStr for Operation {
    type Err = DataLoaderError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Train" => Ok(Operation::Train),
            "Predict" | "Guess" => Ok(Operation::Predict),
            "TrainAndPredict" | "TrainAndGuess" => Ok(Operation::TrainAndPredict),
            other => Err(DataLoaderError::Configuration(format!(
                "invalid operation {other:?}"
            ))),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Train => "Train",
            Operation::Predict => "Predict",
            Operation::TrainAndPredict => "TrainAndPredict",
        };
        f.write_str(name)
    }
}

pub fn train<P: ModelPlugin>(
    plugin: &mut P,
    training: &mut VolumeBatchGenerator,
    validation: &mut VolumeBatchGenerator,
    hyperparameters: &Hyperparameters,
) -> Result<P::Model> {
    info!(
        training_samples = training.sample_count(),
        validation_samples = validation.sample_count(),
        seed = training.seed(),
        "training"
    );
    plugin.train(training, validation, hyperparameters)
}

/// Runs the plugin over `testing` in catalog order and decodes its output
/// with the testing generator's labels. Row `i` of the export is sample `i`.
pub fn predict<P: ModelPlugin>(
    plugin: &mut P,
    model: &P::Model,
    testing: &mut VolumeBatchGenerator,
    hyperparameters: &Hyperparameters,
) -> Result<PredictionExport> {
    testing.use_for_inference();
    info!(samples = testing.sample_count(), "predicting");

    let predictions = plugin.predict(model, testing, hyperparameters)?;
    let export = testing.labels().export_predictions(&predictions)?;
    if export.len() != testing.sample_count() {
        return Err(DataLoaderError::ShapeMismatch(format!(
            "plugin returned {} predictions for {} samples",
            export.len(),
            testing.sample_count()
        )));
    }
    Ok(export)
}

pub fn train_and_predict<P: ModelPlugin>(
    plugin: &mut P,
    training: &mut VolumeBatchGenerator,
    validation: &mut VolumeBatchGenerator,
    testing: &mut VolumeBatchGenerator,
    hyperparameters: &Hyperparameters,
) -> Result<(P::Model, PredictionExport)> {
    let model = train(plugin, training, validation, hyperparameters)?;
    let export = predict(plugin, &model, testing, hyperparameters)?;
    Ok((model, export))
}

/// Generators and paths for one `run`. Which ones are required depends on
/// the operation: training needs `training` and `validation`, prediction needs
/// `testing`, and `Predict` alone needs `model_path` to load from.
#[derive(Default)]
pub struct Job<'a> {
    pub training: Option<&'a mut VolumeBatchGenerator>,
    pub validation: Option<&'a mut VolumeBatchGenerator>,
    pub testing: Option<&'a mut VolumeBatchGenerator>,
    // Saved to after training, loaded from for Predict
    pub model_path: Option<&'a Path>,
    pub predictions_path: Option<&'a Path>,
}

pub struct RunOutput<M> {
    pub model: M,
    pub predictions: Option<PredictionExport>,
}

pub fn run<P: ModelPlugin>(
    plugin: &mut P,
    operation: Operation,
    job: Job<'_>,
    hyperparameters: &Hyperparameters,
) -> Result<RunOutput<P::Model>> {
    info!(%operation, "running model plugin");

    let model = if operation.trains() {
        let training = job.training.ok_or_else(|| missing(operation, "a training generator"))?;
        let validation = job
            .validation
            .ok_or_else(|| missing(operation, "a validation generator"))?;
        let model = train(plugin, training, validation, hyperparameters)?;
        if let Some(path) = job.model_path {
            plugin.save_model(&model, path)?;
            info!(path = %path.display(), "model saved");
        }
        model
    } else {
        let path = job.model_path.ok_or_else(|| missing(operation, "a model path"))?;
        info!(path = %path.display(), "loading model");
        plugin.load_model(path)?
    };

    let predictions = if operation.predicts() {
        let testing = job.testing.ok_or_else(|| missing(operation, "a testing generator"))?;
        let export = predict(plugin, &model, testing, hyperparameters)?;
        if let Some(path) = job.predictions_path {
            export.write_json(path)?;
        }
        Some(export)
    } else {
        None
    };

    Ok(RunOutput { model, predictions })
}

fn missing(operation: Operation, what: &str) -> DataLoaderError {
    DataLoaderError::Configuration(format!("{operation} needs {what}"))
}
