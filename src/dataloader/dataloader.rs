use super::batch::DataBatch;
use super::error::Result;

/// What a training framework needs from a batch source: a length, indexed
/// batch fetch and an end-of-epoch hook.
pub trait BatchSequence {
    fn len(&self) -> usize;

    fn get_item(&self, index: usize) -> Result<DataBatch>;

    fn on_epoch_end(&mut self);

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
