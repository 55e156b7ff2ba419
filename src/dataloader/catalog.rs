use serde::{Deserialize, Serialize};

use crate::volume::bounding_box::BoundingBox;

use super::config::DataLoaderConfig;
use super::error::{DataLoaderError, Result};

/// Parallel per-sample arrays plus the shared box dimensions, as handed over
/// by whoever prepared the dataset. Index `i` of every array is sample `i`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogInput {
    pub file_paths: Vec<String>,
    // Empty means no ROIs at all
    #[serde(default)]
    pub roi_numbers: Vec<Option<u32>>,
    #[serde(default)]
    pub image_box_origins: Vec<[usize; 3]>,
    #[serde(default)]
    pub image_box_dimensions: Option<[usize; 3]>,
    #[serde(default)]
    pub mask_box_origins: Vec<[usize; 3]>,
    #[serde(default)]
    pub mask_box_dimensions: Option<[usize; 3]>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sample {
    pub file_path: String,
    pub roi_number: Option<u32>,
    pub image_box_origin: Option<[usize; 3]>,
    pub mask_box_origin: Option<[usize; 3]>,
}

/// Immutable table of samples. Box dimensions are shared by every sample so
/// every batch has the same tensor shape.
#[derive(Clone, Debug)]
pub struct SampleCatalog {
    samples: Vec<Sample>,
    image_box_dimensions: Option<[usize; 3]>,
    mask_box_dimensions: Option<[usize; 3]>,
    config: DataLoaderConfig,
}

impl SampleCatalog {
    pub fn new(input: CatalogInput, config: DataLoaderConfig) -> Result<Self> {
        let config = config.build()?;
        let n = input.file_paths.len();
        if n == 0 {
            return Err(DataLoaderError::EmptyDataset);
        }

        check_parallel_len("roi_numbers", input.roi_numbers.len(), n, true)?;
        check_parallel_len("image_box_origins", input.image_box_origins.len(), n, !config.use_image)?;
        check_parallel_len("mask_box_origins", input.mask_box_origins.len(), n, !config.use_mask)?;

        if config.use_image {
            check_dimensions("image_box_dimensions", input.image_box_dimensions)?;
        }
        if config.use_mask {
            check_dimensions("mask_box_dimensions", input.mask_box_dimensions)?;
            if input.roi_numbers.len() != n || input.roi_numbers.iter().any(Option::is_none) {
                return Err(DataLoaderError::Configuration(
                    "use_mask requires an ROI number for every sample".into(),
                ));
            }
        }
        if config.use_image
            && config.use_mask
            && input.image_box_dimensions != input.mask_box_dimensions
        {
            return Err(DataLoaderError::Configuration(format!(
                "stacked image and mask channels need equal box dimensions, got {:?} and {:?}",
                input.image_box_dimensions, input.mask_box_dimensions
            )));
        }

        let slot_dims = if config.use_image {
            input.image_box_dimensions
        } else {
            input.mask_box_dimensions
        };
        let slot_bytes = slot_dims
            .unwrap_or([0, 0, 0])
            .iter()
            .try_fold(config.channel_count() * std::mem::size_of::<f32>(), |acc, &d| {
                acc.checked_mul(d)
            });
        if slot_bytes.is_none() {
            return Err(DataLoaderError::Configuration(format!(
                "box dimensions {slot_dims:?} are too large to address"
            )));
        }

        let samples = input
            .file_paths
            .into_iter()
            .enumerate()
            .map(|(i, file_path)| Sample {
                file_path,
                roi_number: input.roi_numbers.get(i).copied().flatten(),
                image_box_origin: input.image_box_origins.get(i).copied(),
                mask_box_origin: input.mask_box_origins.get(i).copied(),
            })
            .collect();

        Ok(Self {
            samples,
            image_box_dimensions: input.image_box_dimensions,
            mask_box_dimensions: input.mask_box_dimensions,
            config,
        })
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn sample(&self, index: usize) -> Option<&Sample> {
        self.samples.get(index)
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn shared_image_box_dimensions(&self) -> Option<[usize; 3]> {
        self.image_box_dimensions
    }

    pub fn shared_mask_box_dimensions(&self) -> Option<[usize; 3]> {
        self.mask_box_dimensions
    }

    pub fn image_bounding_box(&self, index: usize) -> Option<BoundingBox> {
        let origin = self.samples.get(index)?.image_box_origin?;
        Some(BoundingBox::new(origin, self.image_box_dimensions?))
    }

    pub fn mask_bounding_box(&self, index: usize) -> Option<BoundingBox> {
        let origin = self.samples.get(index)?.mask_box_origin?;
        Some(BoundingBox::new(origin, self.mask_box_dimensions?))
    }

    /// Spatial shape of one tensor slot.
    pub fn sample_box_dimensions(&self) -> [usize; 3] {
        let dims = if self.config.use_image {
            self.image_box_dimensions
        } else {
            self.mask_box_dimensions
        };
        // validated in new()
        dims.unwrap_or([0, 0, 0])
    }

    pub fn channel_count(&self) -> usize {
        self.config.channel_count()
    }

    /// Number of f32 values one sample occupies in a batch tensor.
    pub fn elements_per_sample(&self) -> usize {
        self.sample_box_dimensions().iter().product::<usize>() * self.channel_count()
    }

    pub fn use_image(&self) -> bool {
        self.config.use_image
    }

    pub fn use_mask(&self) -> bool {
        self.config.use_mask
    }

    pub fn mask_as_extra_channel(&self) -> bool {
        self.config.mask_as_extra_channel
    }

    pub fn store_all_in_ram(&self) -> bool {
        self.config.store_all_in_ram
    }

    pub fn batch_size(&self) -> usize {
        self.config.batch_size
    }

    pub fn config(&self) -> &DataLoaderConfig {
        &self.config
    }
}

fn check_parallel_len(name: &str, len: usize, expected: usize, may_be_empty: bool) -> Result<()> {
    if len == expected || (may_be_empty && len == 0) {
        return Ok(());
    }
    Err(DataLoaderError::Configuration(format!(
        "{name} has {len} entries but there are {expected} samples"
    )))
}

fn check_dimensions(name: &str, dimensions: Option<[usize; 3]>) -> Result<()> {
    match dimensions {
        Some(dims) if dims.iter().all(|&d| d > 0) => Ok(()),
        Some(dims) => Err(DataLoaderError::Configuration(format!(
            "{name} must be positive on every axis, got {dims:?}"
        ))),
        None => Err(DataLoaderError::Configuration(format!("{name} is required"))),
    }
}
