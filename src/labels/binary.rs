use tracing::warn;

use crate::dataloader::error::{DataLoaderError, Result};
use crate::tensor::tensor::Tensor;
use crate::tensor::tensor_desc::TensorDesc;

use super::export::{decode_binary_predictions, PredictionExport};

/// One-hot labels for binary classification. Column 0 marks a positive
/// sample, column 1 a negative one.
#[derive(Clone, Debug, PartialEq)]
pub struct BinaryClassificationLabels {
    one_hot: Vec<[f32; 2]>,
    positive_label: i64,
    negative_label: i64,
}

impl BinaryClassificationLabels {
    pub fn new(raw_labels: &[i64], positive_label: i64, negative_label: i64) -> Result<Self> {
        if positive_label == negative_label {
            return Err(DataLoaderError::Configuration(format!(
                "positive and negative label are both {positive_label}"
            )));
        }

        let unmatched = raw_labels
            .iter()
            .filter(|&&l| l != positive_label && l != negative_label)
            .count();
        if unmatched > 0 {
            warn!(
                unmatched,
                positive_label, negative_label, "raw labels match neither class value, encoded as negative"
            );
        }

        let one_hot = raw_labels
            .iter()
            .map(|&l| if l == positive_label { [1.0, 0.0] } else { [0.0, 1.0] })
            .collect();

        Ok(Self {
            one_hot,
            positive_label,
            negative_label,
        })
    }

    /// Takes a pre-computed encoding. Every row must sum to exactly one.
    pub fn from_one_hot(rows: Vec<[f32; 2]>, positive_label: i64, negative_label: i64) -> Result<Self> {
        for (i, row) in rows.iter().enumerate() {
            let valid = matches!(row, [a, b] if (*a == 1.0 && *b == 0.0) || (*a == 0.0 && *b == 1.0));
            if !valid {
                return Err(DataLoaderError::Configuration(format!(
                    "one-hot row {i} is {row:?}, expected exactly one column set to 1"
                )));
            }
        }

        Ok(Self {
            one_hot: rows,
            positive_label,
            negative_label,
        })
    }

    pub fn len(&self) -> usize {
        self.one_hot.len()
    }

    pub fn is_empty(&self) -> bool {
        self.one_hot.is_empty()
    }

    pub fn positive_label(&self) -> i64 {
        self.positive_label
    }

    pub fn negative_label(&self) -> i64 {
        self.negative_label
    }

    pub fn rows(&self) -> &[[f32; 2]] {
        &self.one_hot
    }

    /// Label rows for `indices`, in the same order, as a `[n, 2]` tensor.
    pub fn labels_for_indices(&self, indices: &[usize]) -> Result<Tensor> {
        let mut labels = Tensor::zeros(TensorDesc::new_matrix(indices.len(), 2));
        for (row, &index) in labels.data.chunks_exact_mut(2).zip(indices) {
            let one_hot = self.one_hot.get(index).ok_or_else(|| {
                DataLoaderError::ShapeMismatch(format!(
                    "label requested for sample {index} but only {} labels exist",
                    self.one_hot.len()
                ))
            })?;
            row.copy_from_slice(one_hot);
        }
        Ok(labels)
    }

    pub fn export_predictions(&self, predictions: &Tensor) -> Result<PredictionExport> {
        decode_binary_predictions(predictions)
    }
}
