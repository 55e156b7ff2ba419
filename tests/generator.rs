use std::fs;
use std::path::Path;
use std::sync::Arc;

use image::{GrayImage, ImageBuffer, Luma};

use volume_batcher::dataloader::par_iter::ParallelBatchIterator;
use volume_batcher::volume::array::NdArray;
use volume_batcher::volume::image_stack::ImageStackStore;
use volume_batcher::{
    BinaryClassificationLabels, CatalogInput, DataLoaderConfig, DataLoaderError,
    GeneratorManifest, InMemoryVolumeStore, SampleCatalog, VolumeBatchGenerator,
};

const SAMPLES: usize = 7;
const SHAPE: [usize; 3] = [6, 5, 4];

fn voxel_value(sample: usize, voxel: usize) -> u16 {
    ((sample * 31 + voxel * 7) % 251) as u16
}

// Every voxel carries ROI 0; ROI 3 covers voxels with an even index
fn label_value(voxel: usize) -> u16 {
    if voxel % 2 == 0 {
        0b1001
    } else {
        0b0001
    }
}

fn store() -> Arc<InMemoryVolumeStore> {
    let voxels: usize = SHAPE.iter().product();
    let mut store = InMemoryVolumeStore::new();
    for sample in 0..SAMPLES {
        let image = (0..voxels).map(|v| voxel_value(sample, v)).collect();
        let labels = (0..voxels).map(label_value).collect();
        store.insert(format!("p{sample}"), "image_data", NdArray::new(SHAPE.to_vec(), image).unwrap());
        store.insert(format!("p{sample}"), "label_maps", NdArray::new(SHAPE.to_vec(), labels).unwrap());
    }
    Arc::new(store)
}

fn catalog_input() -> CatalogInput {
    CatalogInput {
        file_paths: (0..SAMPLES).map(|i| format!("p{i}")).collect(),
        roi_numbers: vec![Some(3); SAMPLES],
        image_box_origins: (0..SAMPLES).map(|i| [i % 3, i % 2, 1]).collect(),
        image_box_dimensions: Some([3, 3, 3]),
        mask_box_origins: (0..SAMPLES).map(|i| [i % 3, i % 2, 1]).collect(),
        mask_box_dimensions: Some([3, 3, 3]),
    }
}

fn stacked_config(store_all_in_ram: bool) -> DataLoaderConfig {
    DataLoaderConfig {
        batch_size: 3,
        store_all_in_ram,
        use_image: true,
        use_mask: true,
        mask_as_extra_channel: true,
        shuffle_seed: Some(1234),
        threads: 3,
        ..Default::default()
    }
}

fn raw_labels() -> Vec<i64> {
    (0..SAMPLES as i64).map(|i| if i % 3 == 0 { 2 } else { 5 }).collect()
}

fn generator(config: DataLoaderConfig) -> VolumeBatchGenerator {
    let catalog = SampleCatalog::new(catalog_input(), config).unwrap();
    let labels = BinaryClassificationLabels::new(&raw_labels(), 2, 5).unwrap();
    VolumeBatchGenerator::new(catalog, labels, store()).unwrap()
}

fn assert_ram_disk_parity(input: CatalogInput, config: DataLoaderConfig) {
    let build = |store_all_in_ram| {
        let config = DataLoaderConfig {
            store_all_in_ram,
            ..config.clone()
        };
        let catalog = SampleCatalog::new(input.clone(), config).unwrap();
        let labels = BinaryClassificationLabels::new(&raw_labels(), 2, 5).unwrap();
        VolumeBatchGenerator::new(catalog, labels, store()).unwrap()
    };
    let mut in_ram = build(true);
    let mut from_disk = build(false);
    assert!(in_ram.is_in_ram());
    assert!(!from_disk.is_in_ram());

    for _epoch in 0..3 {
        assert_eq!(in_ram.ordering(), from_disk.ordering());
        for index in 0..in_ram.batch_count() {
            let a = in_ram.get_batch(index).unwrap();
            let b = from_disk.get_batch(index).unwrap();
            assert_eq!(a.sample_indices, b.sample_indices);
            assert_eq!(a.data.shape(), b.data.shape());
            assert!(a
                .data
                .data
                .iter()
                .zip(&b.data.data)
                .all(|(x, y)| x.to_bits() == y.to_bits()));
            assert_eq!(a.labels, b.labels);
        }
        in_ram.begin_epoch();
        from_disk.begin_epoch();
    }
}

#[test]
fn ram_and_disk_batches_are_identical() {
    assert_ram_disk_parity(catalog_input(), stacked_config(false));
}

#[test]
fn ram_and_disk_agree_for_images_only() {
    let mut input = catalog_input();
    input.roi_numbers.clear();
    input.mask_box_origins.clear();
    input.mask_box_dimensions = None;
    input.image_box_dimensions = Some([2, 3, 1]);
    let config = DataLoaderConfig {
        use_mask: false,
        mask_as_extra_channel: false,
        ..stacked_config(false)
    };
    assert_ram_disk_parity(input, config);
}

#[test]
fn ram_and_disk_agree_for_masks_only() {
    let mut input = catalog_input();
    input.image_box_origins.clear();
    input.image_box_dimensions = None;
    // Differs from the image geometry so the slot shape must come from the mask
    input.mask_box_dimensions = Some([3, 2, 2]);
    let config = DataLoaderConfig {
        use_image: false,
        mask_as_extra_channel: false,
        ..stacked_config(false)
    };
    assert_ram_disk_parity(input.clone(), config.clone());

    let catalog = SampleCatalog::new(input, config).unwrap();
    let labels = BinaryClassificationLabels::new(&raw_labels(), 2, 5).unwrap();
    let generator = VolumeBatchGenerator::new(catalog, labels, store()).unwrap();
    assert_eq!(generator.get_batch(0).unwrap().data.shape(), &[3, 3, 2, 2, 1]);
}

#[test]
fn every_sample_once_per_epoch() {
    let mut generator = generator(stacked_config(false));
    for _epoch in 0..4 {
        let mut seen: Vec<usize> = (0..generator.batch_count())
            .flat_map(|i| generator.batch_window(i).unwrap().to_vec())
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..SAMPLES).collect::<Vec<_>>());
        generator.begin_epoch();
    }
}

#[test]
fn stacked_channels_are_image_then_mask() {
    let mut generator = generator(stacked_config(false));
    generator.use_for_inference();

    // Sample 1 has origin [1, 1, 1]
    let batch = generator.get_batch(0).unwrap();
    assert_eq!(batch.data.shape(), &[3, 3, 3, 3, 2]);
    assert_eq!(batch.sample_indices, vec![0, 1, 2]);

    let [_, dy, dz] = SHAPE;
    for (x, y, z) in [(0, 0, 0), (1, 2, 0), (2, 1, 2)] {
        let voxel = ((x + 1) * dy + (y + 1)) * dz + (z + 1);
        let image = batch.data.get(&[1, x, y, z, 0]).unwrap();
        let mask = batch.data.get(&[1, x, y, z, 1]).unwrap();
        assert_eq!(image, voxel_value(1, voxel) as f32);
        assert_eq!(mask, if voxel % 2 == 0 { 1.0 } else { 0.0 });
    }

    // Samples 0 and 1: raw 2 is the positive class, raw 5 negative
    assert_eq!(&batch.labels.data[..4], &[1.0, 0.0, 0.0, 1.0]);
}

#[test]
fn mask_only_batches_use_mask_geometry() {
    let mut input = catalog_input();
    input.image_box_dimensions = None;
    input.image_box_origins.clear();
    input.mask_box_dimensions = Some([2, 4, 1]);
    let config = DataLoaderConfig {
        batch_size: 4,
        use_image: false,
        use_mask: true,
        shuffle_seed: Some(8),
        ..Default::default()
    };
    let catalog = SampleCatalog::new(input, config).unwrap();
    let labels = BinaryClassificationLabels::new(&raw_labels(), 2, 5).unwrap();
    let generator = VolumeBatchGenerator::new(catalog, labels, store()).unwrap();

    let batch = generator.get_batch(1).unwrap();
    assert_eq!(batch.data.shape(), &[3, 2, 4, 1, 1]);
    assert!(batch.data.data.iter().all(|&v| v == 0.0 || v == 1.0));
}

#[test]
fn missing_array_fails_the_whole_batch() {
    let mut input = catalog_input();
    input.file_paths[4] = "gone".into();

    let catalog = SampleCatalog::new(input.clone(), stacked_config(false)).unwrap();
    let labels = BinaryClassificationLabels::new(&raw_labels(), 2, 5).unwrap();
    let mut from_disk = VolumeBatchGenerator::new(catalog, labels.clone(), store()).unwrap();
    from_disk.use_for_inference();
    assert!(from_disk.get_batch(0).is_ok());
    assert!(matches!(
        from_disk.get_batch(1),
        Err(DataLoaderError::NotFound { key, .. }) if key == "gone"
    ));

    // The RAM cache reads everything up front
    let catalog = SampleCatalog::new(input, stacked_config(true)).unwrap();
    assert!(matches!(
        VolumeBatchGenerator::new(catalog, labels, store()),
        Err(DataLoaderError::NotFound { .. })
    ));
}

#[test]
fn ram_cache_respects_its_budget() {
    // 7 samples * 27 voxels * 2 channels * 4 bytes
    let needed = (SAMPLES * 27 * 2 * 4) as u64;

    let config = DataLoaderConfig {
        ram_limit_bytes: Some(needed - 1),
        ..stacked_config(true)
    };
    let catalog = SampleCatalog::new(catalog_input(), config).unwrap();
    let labels = BinaryClassificationLabels::new(&raw_labels(), 2, 5).unwrap();
    assert!(matches!(
        VolumeBatchGenerator::new(catalog, labels, store()),
        Err(DataLoaderError::OutOfMemory(_))
    ));

    let config = DataLoaderConfig {
        ram_limit_bytes: Some(needed),
        ..stacked_config(true)
    };
    let catalog = SampleCatalog::new(catalog_input(), config).unwrap();
    let labels = BinaryClassificationLabels::new(&raw_labels(), 2, 5).unwrap();
    assert!(VolumeBatchGenerator::new(catalog, labels, store()).is_ok());
}

#[test]
fn prefetching_matches_direct_batches() {
    let generator = Arc::new(generator(stacked_config(true)));
    let prefetched: Vec<_> = Arc::clone(&generator)
        .par_iter()
        .map(|batch| batch.unwrap())
        .collect();
    assert_eq!(prefetched.len(), generator.batch_count());
    for (index, batch) in prefetched.iter().enumerate() {
        let direct = generator.get_batch(index).unwrap();
        assert_eq!(batch.data, direct.data);
        assert_eq!(batch.labels, direct.labels);
    }
}

fn write_gray_slices(dir: &Path, slices: &[Vec<u8>], width: u32, height: u32) {
    fs::create_dir_all(dir).unwrap();
    for (i, pixels) in slices.iter().enumerate() {
        GrayImage::from_raw(width, height, pixels.clone())
            .unwrap()
            .save(dir.join(format!("slice_{i:03}.png")))
            .unwrap();
    }
}

fn write_label_slices(dir: &Path, slices: &[Vec<u16>], width: u32, height: u32) {
    fs::create_dir_all(dir).unwrap();
    for (i, pixels) in slices.iter().enumerate() {
        ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(width, height, pixels.clone())
            .unwrap()
            .save(dir.join(format!("slice_{i:03}.png")))
            .unwrap();
    }
}

#[test]
fn manifest_over_an_image_stack() {
    let root = tempfile::tempdir().unwrap();
    // 3 rows x 4 cols, 2 slices per sample
    for (sample, key) in ["left", "right"].iter().enumerate() {
        let base = root.path().join(key);
        let image: Vec<Vec<u8>> = (0..2)
            .map(|z| (0..12).map(|p| (sample * 100 + z * 20 + p) as u8).collect())
            .collect();
        // ROI 1 on the top row of every slice
        let labels: Vec<Vec<u16>> = (0..2)
            .map(|_| (0..12).map(|p| if p < 4 { 0b10 } else { 0 }).collect())
            .collect();
        write_gray_slices(&base.join("image_data"), &image, 4, 3);
        write_label_slices(&base.join("label_maps"), &labels, 4, 3);
    }

    let manifest_path = root.path().join("generator.json");
    fs::write(
        &manifest_path,
        r#"{
            "file_paths": ["left", "right"],
            "roi_numbers": [1, 1],
            "image_box_origins": [[0, 1, 0], [1, 0, 0]],
            "image_box_dimensions": [2, 3, 2],
            "mask_box_origins": [[0, 1, 0], [1, 0, 0]],
            "mask_box_dimensions": [2, 3, 2],
            "batch_size": 2,
            "use_mask": true,
            "mask_as_extra_channel": true,
            "label_source": {
                "label_type": "BinaryClassification",
                "labels": [1, 0],
                "positive_label": 1,
                "negative_label": 0
            }
        }"#,
    )
    .unwrap();

    let store = Arc::new(ImageStackStore::new(root.path()).unwrap());
    let mut generator = GeneratorManifest::load(&manifest_path)
        .unwrap()
        .into_generator(store, Some(0))
        .unwrap();
    generator.use_for_inference();

    let batch = generator.get_batch(0).unwrap();
    assert_eq!(batch.data.shape(), &[2, 2, 3, 2, 2]);

    // left, row 0, col 1, slice 1: image 20 + 1, on the ROI row
    assert_eq!(batch.data.get(&[0, 0, 0, 1, 0]), Some(21.0));
    assert_eq!(batch.data.get(&[0, 0, 0, 1, 1]), Some(1.0));
    // right, row 1, col 0, slice 0: image 100 + 4, below the ROI row
    assert_eq!(batch.data.get(&[1, 0, 0, 0, 0]), Some(104.0));
    assert_eq!(batch.data.get(&[1, 0, 0, 0, 1]), Some(0.0));

    assert_eq!(batch.labels.data, vec![1.0, 0.0, 0.0, 1.0]);
}
