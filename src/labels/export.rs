use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dataloader::error::{DataLoaderError, Result};
use crate::tensor::tensor::Tensor;

/// Per-class confidence columns for persisting binary predictions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionExport {
    pub positive_confidence: Vec<f32>,
    pub negative_confidence: Vec<f32>,
}

impl PredictionExport {
    pub fn len(&self) -> usize {
        self.positive_confidence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positive_confidence.is_empty()
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), self)?;
        Ok(())
    }
}

// After squeezing, one sample is a bare [2] vector and N samples are [N, 2].
// Anything else fails before a single value is copied out.
pub fn decode_binary_predictions(predictions: &Tensor) -> Result<PredictionExport> {
    let squeezed = predictions.desc.squeeze();
    let samples = match squeezed.shape.as_slice() {
        [2] => 1,
        [n, 2] => *n,
        _ => {
            return Err(DataLoaderError::ShapeMismatch(format!(
                "binary predictions must squeeze to (2,) or (N, 2), got {:?}",
                predictions.shape()
            )))
        }
    };

    let (positive_confidence, negative_confidence) = predictions
        .data
        .chunks_exact(2)
        .take(samples)
        .map(|row| (row[0], row[1]))
        .unzip();

    Ok(PredictionExport {
        positive_confidence,
        negative_confidence,
    })
}
