use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::labels::LabelSource;
use crate::volume::store::VolumeStore;

use super::catalog::{CatalogInput, SampleCatalog};
use super::config::DataLoaderConfig;
use super::error::{DataLoaderError, Result};
use super::generator::VolumeBatchGenerator;

const LABEL_TYPES: &[&str] = &["BinaryClassification"];

/// Everything needed to rebuild a generator, as stored next to a dataset.
///
/// The catalog arrays sit at the top level of the JSON object; labels live
/// under `label_source`, tagged by `label_type`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeneratorManifest {
    #[serde(flatten)]
    pub catalog: CatalogInput,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub store_all_in_ram: bool,
    #[serde(default = "default_true")]
    pub use_image: bool,
    #[serde(default)]
    pub use_mask: bool,
    #[serde(default)]
    pub mask_as_extra_channel: bool,
    pub label_source: LabelSource,
}

fn default_batch_size() -> usize {
    DataLoaderConfig::default().batch_size
}

fn default_true() -> bool {
    true
}

impl GeneratorManifest {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        check_label_type(&value)?;
        Ok(serde_json::from_value(value)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn into_generator(
        self,
        store: Arc<dyn VolumeStore>,
        shuffle_seed: Option<u64>,
    ) -> Result<VolumeBatchGenerator> {
        let base = DataLoaderConfig {
            shuffle_seed,
            ..Default::default()
        };
        self.into_generator_with(store, base)
    }

    /// Like `into_generator` but with caller-chosen threads, names and limits.
    /// The manifest's flags and batch size still win.
    pub fn into_generator_with(
        self,
        store: Arc<dyn VolumeStore>,
        base: DataLoaderConfig,
    ) -> Result<VolumeBatchGenerator> {
        let config = DataLoaderConfig {
            batch_size: self.batch_size,
            store_all_in_ram: self.store_all_in_ram,
            use_image: self.use_image,
            use_mask: self.use_mask,
            mask_as_extra_channel: self.mask_as_extra_channel,
            ..base
        };
        let labels = self.label_source.build()?;
        let catalog = SampleCatalog::new(self.catalog, config)?;
        VolumeBatchGenerator::new(catalog, labels, store)
    }
}

fn check_label_type(value: &Value) -> Result<()> {
    let label_type = value
        .get("label_source")
        .and_then(|source| source.get("label_type"))
        .and_then(Value::as_str)
        .ok_or_else(|| {
            DataLoaderError::Configuration("manifest has no label_source.label_type".to_string())
        })?;

    if !LABEL_TYPES.contains(&label_type) {
        return Err(DataLoaderError::Configuration(format!(
            "unknown label type {label_type:?}, expected one of {LABEL_TYPES:?}"
        )));
    }
    Ok(())
}
