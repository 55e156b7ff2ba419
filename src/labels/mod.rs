pub mod binary;
pub mod export;

use serde::{Deserialize, Serialize};

use crate::dataloader::error::Result;

use self::binary::BinaryClassificationLabels;

/// Where a generator's labels come from. Tagged by `label_type` in manifests.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "label_type")]
pub enum LabelSource {
    BinaryClassification {
        labels: Vec<i64>,
        positive_label: i64,
        negative_label: i64,
    },
}

impl LabelSource {
    pub fn build(&self) -> Result<BinaryClassificationLabels> {
        match self {
            LabelSource::BinaryClassification {
                labels,
                positive_label,
                negative_label,
            } => BinaryClassificationLabels::new(labels, *positive_label, *negative_label),
        }
    }
}
