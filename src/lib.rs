pub mod dataloader;
pub mod labels;
pub mod model;
pub mod tensor;
pub mod volume;

pub use dataloader::catalog::{CatalogInput, SampleCatalog};
pub use dataloader::config::DataLoaderConfig;
pub use dataloader::dataloader::BatchSequence;
pub use dataloader::error::{DataLoaderError, Result};
pub use dataloader::generator::VolumeBatchGenerator;
pub use dataloader::manifest::GeneratorManifest;
pub use labels::binary::BinaryClassificationLabels;
pub use model::hyperparameters::Hyperparameters;
pub use model::plugin::ModelPlugin;
pub use tensor::tensor::Tensor;
pub use volume::store::{InMemoryVolumeStore, VolumeStore};
