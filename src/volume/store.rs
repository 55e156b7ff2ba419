use std::collections::HashMap;

use crate::dataloader::error::{DataLoaderError, Result};

use super::array::VolumeArray;

/// Read side of wherever per-sample volumes live.
///
/// `key` is a sample's file path from the catalog. Implementations return every
/// requested name or fail with [`DataLoaderError::NotFound`]. Retrying flaky
/// storage is the implementation's business; callers never retry.
pub trait VolumeStore: Send + Sync {
    fn read_named_arrays(&self, key: &str, names: &[&str]) -> Result<HashMap<String, VolumeArray>>;
}

#[derive(Default)]
pub struct InMemoryVolumeStore {
    samples: HashMap<String, HashMap<String, VolumeArray>>,
}

impl InMemoryVolumeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, name: impl Into<String>, array: impl Into<VolumeArray>) {
        self.samples
            .entry(key.into())
            .or_default()
            .insert(name.into(), array.into());
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl VolumeStore for InMemoryVolumeStore {
    fn read_named_arrays(&self, key: &str, names: &[&str]) -> Result<HashMap<String, VolumeArray>> {
        let arrays = self.samples.get(key);

        names
            .iter()
            .map(|&name| {
                arrays
                    .and_then(|arrays| arrays.get(name))
                    .map(|array| (name.to_string(), array.clone()))
                    .ok_or_else(|| DataLoaderError::NotFound {
                        key: key.to_string(),
                        name: name.to_string(),
                    })
            })
            .collect()
    }
}
