use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dataloader::error::{DataLoaderError, Result};

/// Free-form settings handed to a model plugin untouched. Stored as a flat
/// JSON object.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Hyperparameters {
    values: BTreeMap<String, Value>,
}

impl Hyperparameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// `Ok(None)` when absent, an error when present with the wrong type.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.values.get(key) {
            None => Ok(None),
            Some(value) => T::deserialize(value).map(Some).map_err(|e| {
                DataLoaderError::Configuration(format!("hyperparameter `{key}`: {e}"))
            }),
        }
    }

    pub fn require<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        self.get_as(key)?.ok_or_else(|| {
            DataLoaderError::Configuration(format!("missing hyperparameter `{key}`"))
        })
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
