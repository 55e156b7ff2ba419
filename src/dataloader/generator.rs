use std::sync::Arc;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

use crate::labels::binary::BinaryClassificationLabels;
use crate::tensor::tensor::Tensor;
use crate::tensor::tensor_desc::TensorDesc;
use crate::volume::store::VolumeStore;

use super::batch::DataBatch;
use super::cache::{MemoryBudget, RamCache};
use super::catalog::SampleCatalog;
use super::dataloader::BatchSequence;
use super::epoch::{EpochScheduler, OrderingMode};
use super::error::{DataLoaderError, Result};
use super::info::log_dataset_info;
use super::loader::{LoadedSample, SampleLoader};

/// Assembles fixed-shape batches `[samples, x, y, z, channels]` plus their
/// one-hot labels from a sample catalog.
///
/// With `store_all_in_ram` every sample is read, decoded and cropped once,
/// here in the constructor, and batches are copied out of that cache without
/// touching the volume store. Otherwise each batch reads its samples from the
/// store. Both paths write slots through the same code and give identical
/// tensors.
pub struct VolumeBatchGenerator {
    catalog: Arc<SampleCatalog>,
    labels: BinaryClassificationLabels,
    loader: SampleLoader,
    scheduler: EpochScheduler,
    cache: Option<RamCache>,
    pool: ThreadPool,
}

impl VolumeBatchGenerator {
    pub fn new(
        catalog: SampleCatalog,
        labels: BinaryClassificationLabels,
        store: Arc<dyn VolumeStore>,
    ) -> Result<Self> {
        if labels.len() != catalog.sample_count() {
            return Err(DataLoaderError::Configuration(format!(
                "{} labels given for {} samples",
                labels.len(),
                catalog.sample_count()
            )));
        }

        let config = catalog.config().clone();
        let catalog = Arc::new(catalog);
        let pool = ThreadPoolBuilder::new().num_threads(config.threads).build()?;
        let loader = SampleLoader::new(Arc::clone(&catalog), store);

        let cache = if config.store_all_in_ram {
            let mut budget = config
                .ram_limit_bytes
                .map(MemoryBudget::new)
                .unwrap_or_else(MemoryBudget::unlimited);
            Some(RamCache::populate(&loader, &pool, &mut budget)?)
        } else {
            None
        };

        let mut scheduler = EpochScheduler::new(catalog.sample_count(), config.shuffle_seed);
        scheduler.begin_epoch();

        let generator = Self {
            catalog,
            labels,
            loader,
            scheduler,
            cache,
            pool,
        };
        log_dataset_info(&generator);
        Ok(generator)
    }

    pub fn batch_count(&self) -> usize {
        self.catalog.sample_count().div_ceil(self.catalog.batch_size())
    }

    /// Sample indices of batch `index` under the current epoch ordering. Every
    /// batch holds `batch_size` samples except possibly the last.
    pub fn batch_window(&self, index: usize) -> Result<&[usize]> {
        let count = self.batch_count();
        if index >= count {
            return Err(DataLoaderError::BatchOutOfRange { index, count });
        }

        let batch_size = self.catalog.batch_size();
        let ordering = self.scheduler.ordering();
        let start = index * batch_size;
        let end = (start + batch_size).min(ordering.len());
        Ok(&ordering[start..end])
    }

    pub fn batch_desc(&self, samples: usize) -> TensorDesc {
        TensorDesc::new_batch5d(
            samples,
            self.catalog.sample_box_dimensions(),
            self.catalog.channel_count(),
        )
    }

    /// Either the whole batch assembles or the call fails.
    pub fn get_batch(&self, index: usize) -> Result<DataBatch> {
        let sample_indices = self.batch_window(index)?.to_vec();
        let per_sample = self.catalog.elements_per_sample();
        let mut data = Tensor::zeros(self.batch_desc(sample_indices.len()));

        match &self.cache {
            Some(cache) => {
                for (slot, &sample) in data.data.chunks_exact_mut(per_sample).zip(&sample_indices) {
                    let cached = cache.sample(sample).ok_or(DataLoaderError::SampleOutOfRange {
                        index: sample,
                        count: cache.sample_count(),
                    })?;
                    slot.copy_from_slice(cached);
                }
            }
            None => {
                let loader = &self.loader;
                self.pool.install(|| {
                    data.data
                        .par_chunks_exact_mut(per_sample)
                        .zip(sample_indices.par_iter())
                        .try_for_each(|(slot, &sample)| loader.write_slot(sample, slot))
                })?;
            }
        }

        let labels = self.labels.labels_for_indices(&sample_indices)?;

        debug!(
            batch = index,
            samples = sample_indices.len(),
            from_ram = self.cache.is_some(),
            "batch assembled"
        );

        Ok(DataBatch {
            data,
            labels,
            sample_indices,
            batch_number: index,
        })
    }

    /// Reads one sample through the loader, bypassing any cache.
    pub fn load(&self, index: usize) -> Result<LoadedSample> {
        self.loader.load(index)
    }

    /// Replaces the ordering. Batch indices handed out before this call refer
    /// to the previous epoch.
    pub fn begin_epoch(&mut self) {
        self.scheduler.begin_epoch();
    }

    /// Fixes the order to 0..n so predictions line up with the catalog.
    pub fn use_for_inference(&mut self) {
        if self.scheduler.mode() != OrderingMode::Sequential {
            self.scheduler.set_sequential();
            self.scheduler.begin_epoch();
        }
    }

    pub fn ordering(&self) -> &[usize] {
        self.scheduler.ordering()
    }

    pub fn ordering_mode(&self) -> OrderingMode {
        self.scheduler.mode()
    }

    pub fn seed(&self) -> u64 {
        self.scheduler.seed()
    }

    pub fn sample_count(&self) -> usize {
        self.catalog.sample_count()
    }

    pub fn batch_size(&self) -> usize {
        self.catalog.batch_size()
    }

    pub fn catalog(&self) -> &SampleCatalog {
        &self.catalog
    }

    pub fn labels(&self) -> &BinaryClassificationLabels {
        &self.labels
    }

    pub fn is_in_ram(&self) -> bool {
        self.cache.is_some()
    }
}

impl BatchSequence for VolumeBatchGenerator {
    fn len(&self) -> usize {
        self.batch_count()
    }

    fn get_item(&self, index: usize) -> Result<DataBatch> {
        self.get_batch(index)
    }

    fn on_epoch_end(&mut self) {
        self.begin_epoch();
    }
}
