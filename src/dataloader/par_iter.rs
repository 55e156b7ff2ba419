use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, Receiver};
use tracing::warn;

use super::batch::DataBatch;
use super::error::Result;
use super::generator::VolumeBatchGenerator;

/// Walks one epoch of batches in order while a background thread assembles
/// up to `prefetch_count` batches ahead. Stops after the first error.
pub struct PrefetchingBatchIterator {
    receiver: Receiver<Result<DataBatch>>,
}

impl PrefetchingBatchIterator {
    pub fn new(generator: Arc<VolumeBatchGenerator>) -> Self {
        let prefetch = generator.catalog().config().prefetch_count;
        let (sender, receiver) = bounded(prefetch);

        thread::spawn(move || {
            for index in 0..generator.batch_count() {
                let batch = generator.get_batch(index);
                let failed = batch.is_err();
                if sender.send(batch).is_err() {
                    break;
                }
                if failed {
                    warn!(batch = index, "batch failed, prefetching stopped");
                    break;
                }
            }
        });

        Self { receiver }
    }
}

impl Iterator for PrefetchingBatchIterator {
    type Item = Result<DataBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        self.receiver.recv().ok()
    }
}

pub trait ParallelBatchIterator {
    fn par_iter(self: Arc<Self>) -> PrefetchingBatchIterator;
}

impl ParallelBatchIterator for VolumeBatchGenerator {
    fn par_iter(self: Arc<Self>) -> PrefetchingBatchIterator {
        PrefetchingBatchIterator::new(self)
    }
}
