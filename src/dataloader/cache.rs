use rayon::prelude::*;
use rayon::ThreadPool;
use tracing::info;

use super::error::{DataLoaderError, Result};
use super::loader::SampleLoader;

// Always works in byte counts
pub struct MemoryBudget {
    maximum: u64,
    current: u64,
}

impl MemoryBudget {
    pub fn new(maximum: u64) -> Self {
        Self {
            maximum,
            current: 0,
        }
    }

    pub fn unlimited() -> Self {
        Self::new(u64::MAX)
    }

    pub fn allocate(&mut self, size: u64) -> Result<()> {
        let new_usage = self.current.checked_add(size).ok_or_else(|| {
            DataLoaderError::OutOfMemory(format!(
                "allocation would overflow: current {} + size {}",
                self.current, size
            ))
        })?;
        if new_usage > self.maximum {
            return Err(DataLoaderError::OutOfMemory(format!(
                "tried to allocate {} bytes when {} of {} bytes are used",
                size, self.current, self.maximum
            )));
        }
        self.current = new_usage;
        Ok(())
    }

    pub fn current(&self) -> u64 {
        self.current
    }

    pub fn maximum(&self) -> u64 {
        self.maximum
    }

    pub fn available(&self) -> u64 {
        self.maximum - self.current
    }
}

/// Every sample, cropped and laid out exactly as it appears in a batch slot.
/// Filled once at construction and read-only afterwards.
pub struct RamCache {
    data: Box<[f32]>,
    elements_per_sample: usize,
}

impl RamCache {
    pub fn populate(
        loader: &SampleLoader,
        pool: &ThreadPool,
        budget: &mut MemoryBudget,
    ) -> Result<Self> {
        let catalog = loader.catalog();
        let elements_per_sample = catalog.elements_per_sample();
        let total = elements_per_sample
            .checked_mul(catalog.sample_count())
            .filter(|t| t.checked_mul(std::mem::size_of::<f32>()).is_some())
            .ok_or_else(|| {
                DataLoaderError::OutOfMemory(format!(
                    "{} samples of {} values each cannot be addressed",
                    catalog.sample_count(),
                    elements_per_sample
                ))
            })?;
        let bytes = (total * std::mem::size_of::<f32>()) as u64;

        budget.allocate(bytes)?;

        let mut data = vec![0.0f32; total].into_boxed_slice();
        pool.install(|| {
            data.par_chunks_exact_mut(elements_per_sample)
                .enumerate()
                .try_for_each(|(index, slot)| loader.write_slot(index, slot))
        })?;

        info!(
            samples = catalog.sample_count(),
            bytes, "RAM cache populated"
        );

        Ok(Self {
            data,
            elements_per_sample,
        })
    }

    pub fn sample(&self, index: usize) -> Option<&[f32]> {
        let start = index.checked_mul(self.elements_per_sample)?;
        self.data.get(start..start + self.elements_per_sample)
    }

    pub fn sample_count(&self) -> usize {
        self.data.len() / self.elements_per_sample
    }

    pub fn size_in_bytes(&self) -> usize {
        self.data.len() * std::mem::size_of::<f32>()
    }
}
