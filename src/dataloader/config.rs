use super::error::{DataLoaderError, Result};

pub const DEFAULT_IMAGE_ARRAY_NAME: &str = "image_data";
pub const DEFAULT_LABEL_MAP_ARRAY_NAME: &str = "label_maps";

// Plain pub fields, validated once by build(). Callers tweak a Default and build it.
#[derive(Clone, Debug)]
pub struct DataLoaderConfig {
    pub batch_size: usize,
    pub store_all_in_ram: bool,
    pub use_image: bool,
    pub use_mask: bool,
    pub mask_as_extra_channel: bool,
    pub shuffle_seed: Option<u64>,
    pub threads: usize,
    pub prefetch_count: usize,
    pub ram_limit_bytes: Option<u64>,
    pub image_array_name: String,
    pub label_map_array_name: String,
}

impl DataLoaderConfig {
    pub fn build(self) -> Result<Self> {
        if self.batch_size == 0 {
            return Err(DataLoaderError::Configuration(
                "batch_size must be at least 1".into(),
            ));
        }
        if self.threads == 0 {
            return Err(DataLoaderError::Configuration(
                "threads must be at least 1".into(),
            ));
        }
        if self.prefetch_count == 0 {
            return Err(DataLoaderError::Configuration(
                "prefetch_count must be at least 1".into(),
            ));
        }
        check_data_modes(self.use_image, self.use_mask, self.mask_as_extra_channel)?;

        Ok(self)
    }

    /// Number of channels in every batch tensor.
    pub fn channel_count(&self) -> usize {
        if self.mask_as_extra_channel {
            self.use_image as usize + self.use_mask as usize
        } else {
            1
        }
    }
}

impl Default for DataLoaderConfig {
    fn default() -> Self {
        Self {
            batch_size: 32,
            store_all_in_ram: false,
            use_image: true,
            use_mask: false,
            mask_as_extra_channel: false,
            shuffle_seed: None,
            threads: num_cpus::get(),
            prefetch_count: 2,
            ram_limit_bytes: None,
            image_array_name: DEFAULT_IMAGE_ARRAY_NAME.to_string(),
            label_map_array_name: DEFAULT_LABEL_MAP_ARRAY_NAME.to_string(),
        }
    }
}

fn check_data_modes(use_image: bool, use_mask: bool, mask_as_extra_channel: bool) -> Result<()> {
    if !use_image && !use_mask {
        return Err(DataLoaderError::Configuration(
            "at least one of use_image or use_mask must be set".into(),
        ));
    }
    // Image and mask as two separate inputs is not supported, only as stacked channels
    if use_image && use_mask && !mask_as_extra_channel {
        return Err(DataLoaderError::Configuration(
            "use_image and use_mask together require mask_as_extra_channel".into(),
        ));
    }
    Ok(())
}
