use std::sync::Arc;

use crate::volume::store::VolumeStore;
use crate::volume::volume::Volume;

use super::catalog::SampleCatalog;
use super::error::{DataLoaderError, Result};

/// One sample after reading, ROI decoding and cropping. A side is `None`
/// when the catalog does not use it.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedSample {
    pub image: Option<Volume<f32>>,
    pub mask: Option<Volume<bool>>,
}

pub struct SampleLoader {
    catalog: Arc<SampleCatalog>,
    store: Arc<dyn VolumeStore>,
}

impl SampleLoader {
    pub fn new(catalog: Arc<SampleCatalog>, store: Arc<dyn VolumeStore>) -> Self {
        Self { catalog, store }
    }

    pub fn load(&self, index: usize) -> Result<LoadedSample> {
        let catalog = &*self.catalog;
        let config = catalog.config();
        let sample = catalog
            .sample(index)
            .ok_or(DataLoaderError::SampleOutOfRange {
                index,
                count: catalog.sample_count(),
            })?;

        let image_name = config.image_array_name.as_str();
        let label_map_name = config.label_map_array_name.as_str();

        // Only ask the store for what is actually used
        let mut names = Vec::with_capacity(2);
        if catalog.use_image() {
            names.push(image_name);
        }
        if catalog.use_mask() {
            names.push(label_map_name);
        }

        let mut arrays = self.store.read_named_arrays(&sample.file_path, &names)?;
        let mut take = |name: &str| {
            arrays.remove(name).ok_or_else(|| DataLoaderError::MissingData {
                key: sample.file_path.clone(),
                name: name.to_string(),
            })
        };

        let image = if catalog.use_image() {
            let volume = take(image_name)?.into_f32_volume()?;
            let bbox = catalog
                .image_bounding_box(index)
                .ok_or_else(|| missing_box(index, "image"))?;
            Some(bbox.extract(&volume)?)
        } else {
            None
        };

        let mask = if catalog.use_mask() {
            let roi_number = sample.roi_number.ok_or_else(|| {
                DataLoaderError::Configuration(format!("sample {index} has no ROI number"))
            })?;
            let volume = take(label_map_name)?.decode_roi_mask(roi_number)?;
            let bbox = catalog
                .mask_bounding_box(index)
                .ok_or_else(|| missing_box(index, "mask"))?;
            Some(bbox.extract(&volume)?)
        } else {
            None
        };

        Ok(LoadedSample { image, mask })
    }

    /// Loads sample `index` straight into its slot of a batch tensor.
    pub fn write_slot(&self, index: usize, slot: &mut [f32]) -> Result<()> {
        let loaded = self.load(index)?;
        write_sample(&loaded, self.catalog.channel_count(), slot)
    }

    pub fn catalog(&self) -> &SampleCatalog {
        &self.catalog
    }
}

fn missing_box(index: usize, kind: &str) -> DataLoaderError {
    DataLoaderError::Configuration(format!("sample {index} has no {kind} bounding box"))
}

// Slot layout is [x, y, z, channel] with channel fastest. The image channel
// comes first, the mask (as 0.0 / 1.0) after it.
pub fn write_sample(sample: &LoadedSample, channels: usize, slot: &mut [f32]) -> Result<()> {
    let voxels = slot.len() / channels;
    let mut channel = 0;

    if let Some(image) = &sample.image {
        check_slot(image.len(), voxels)?;
        for (dst, &v) in slot.iter_mut().skip(channel).step_by(channels).zip(&image.data) {
            *dst = v;
        }
        channel += 1;
    }

    if let Some(mask) = &sample.mask {
        check_slot(mask.len(), voxels)?;
        for (dst, &m) in slot.iter_mut().skip(channel).step_by(channels).zip(&mask.data) {
            *dst = if m { 1.0 } else { 0.0 };
        }
        channel += 1;
    }

    if channel != channels {
        return Err(DataLoaderError::ShapeMismatch(format!(
            "sample provides {channel} channels but the batch expects {channels}"
        )));
    }
    Ok(())
}

fn check_slot(voxels: usize, expected: usize) -> Result<()> {
    if voxels != expected {
        return Err(DataLoaderError::ShapeMismatch(format!(
            "sample has {voxels} voxels but a batch slot holds {expected}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataloader::catalog::CatalogInput;
    use crate::dataloader::config::DataLoaderConfig;
    use crate::volume::array::NdArray;
    use crate::volume::store::InMemoryVolumeStore;

    fn store() -> Arc<InMemoryVolumeStore> {
        let mut store = InMemoryVolumeStore::new();
        let image: Vec<f32> = (0..4 * 4 * 4).map(|v| v as f32).collect();
        store.insert("s0", "image_data", NdArray::new(vec![4, 4, 4], image).unwrap());
        // ROI 1 on the first half along x, ROI 2 everywhere
        let labels: Vec<u8> = (0..64).map(|i| if i < 32 { 0b110 } else { 0b100 }).collect();
        store.insert("s0", "label_maps", NdArray::new(vec![4, 4, 4], labels).unwrap());
        // 2D image for promotion
        store.insert("flat", "image_data", NdArray::new(vec![3, 3], vec![1u8; 9]).unwrap());
        Arc::new(store)
    }

    fn catalog(config: DataLoaderConfig, paths: &[&str], roi: u32) -> Arc<SampleCatalog> {
        let n = paths.len();
        Arc::new(
            SampleCatalog::new(
                CatalogInput {
                    file_paths: paths.iter().map(|p| p.to_string()).collect(),
                    roi_numbers: vec![Some(roi); n],
                    image_box_origins: vec![[1, 1, 1]; n],
                    image_box_dimensions: Some([2, 2, 1]),
                    mask_box_origins: vec![[1, 1, 1]; n],
                    mask_box_dimensions: Some([2, 2, 1]),
                },
                config,
            )
            .unwrap(),
        )
    }

    #[test]
    fn image_only_skips_the_label_map() {
        let loader = SampleLoader::new(catalog(DataLoaderConfig::default(), &["s0"], 1), store());
        let loaded = loader.load(0).unwrap();
        assert!(loaded.mask.is_none());
        let image = loaded.image.unwrap();
        assert_eq!(image.shape(), [2, 2, 1]);
        assert_eq!(image.get(0, 0, 0), 21.0);
        assert_eq!(image.get(1, 1, 0), 41.0);
    }

    #[test]
    fn mask_only_decodes_the_roi() {
        let config = DataLoaderConfig {
            use_image: false,
            use_mask: true,
            ..Default::default()
        };
        let loader = SampleLoader::new(catalog(config, &["s0"], 1), store());
        let loaded = loader.load(0).unwrap();
        assert!(loaded.image.is_none());
        let mask = loaded.mask.unwrap();
        // x = 1 lies in the first half, x = 2 does not
        assert!(mask.get(0, 0, 0));
        assert!(!mask.get(1, 0, 0));
    }

    #[test]
    fn two_dimensional_image_is_promoted() {
        let catalog = Arc::new(
            SampleCatalog::new(
                CatalogInput {
                    file_paths: vec!["flat".into()],
                    image_box_origins: vec![[1, 1, 0]],
                    image_box_dimensions: Some([2, 2, 1]),
                    ..Default::default()
                },
                DataLoaderConfig::default(),
            )
            .unwrap(),
        );
        let loader = SampleLoader::new(catalog, store());
        let image = loader.load(0).unwrap().image.unwrap();
        assert_eq!(image.shape(), [2, 2, 1]);
        assert!(image.data.iter().all(|&v| v == 1.0));
    }

    #[test]
    fn stacked_slot_layout() {
        let config = DataLoaderConfig {
            use_image: true,
            use_mask: true,
            mask_as_extra_channel: true,
            ..Default::default()
        };
        let loader = SampleLoader::new(catalog(config, &["s0"], 2), store());
        let mut slot = vec![-1.0; 8];
        loader.write_slot(0, &mut slot).unwrap();
        assert_eq!(slot, vec![21.0, 1.0, 25.0, 1.0, 37.0, 1.0, 41.0, 1.0]);
    }

    #[test]
    fn missing_sample_in_store() {
        let loader = SampleLoader::new(catalog(DataLoaderConfig::default(), &["nope"], 0), store());
        assert!(matches!(
            loader.load(0),
            Err(DataLoaderError::NotFound { .. })
        ));
    }

    #[test]
    fn sample_index_past_the_catalog() {
        let loader = SampleLoader::new(catalog(DataLoaderConfig::default(), &["s0"], 0), store());
        assert!(matches!(
            loader.load(1),
            Err(DataLoaderError::SampleOutOfRange { index: 1, count: 1 })
        ));
    }

    struct ForgetfulStore;

    impl VolumeStore for ForgetfulStore {
        fn read_named_arrays(
            &self,
            _key: &str,
            _names: &[&str],
        ) -> Result<std::collections::HashMap<String, crate::volume::array::VolumeArray>> {
            Ok(Default::default())
        }
    }

    #[test]
    fn store_response_without_array_is_missing_data() {
        let loader = SampleLoader::new(
            catalog(DataLoaderConfig::default(), &["s0"], 0),
            Arc::new(ForgetfulStore),
        );
        assert!(matches!(
            loader.load(0),
            Err(DataLoaderError::MissingData { name, .. }) if name == "image_data"
        ));
    }

    #[test]
    fn box_outside_volume() {
        let catalog = Arc::new(
            SampleCatalog::new(
                CatalogInput {
                    file_paths: vec!["s0".into()],
                    image_box_origins: vec![[3, 3, 3]],
                    image_box_dimensions: Some([2, 2, 2]),
                    ..Default::default()
                },
                DataLoaderConfig::default(),
            )
            .unwrap(),
        );
        let loader = SampleLoader::new(catalog, store());
        assert!(matches!(
            loader.load(0),
            Err(DataLoaderError::OutOfBounds { .. })
        ));
    }
}
