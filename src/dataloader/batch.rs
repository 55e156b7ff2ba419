use crate::tensor::tensor::Tensor;

pub struct DataBatch {
    // [samples, x, y, z, channels]
    pub data: Tensor,
    // [samples, 2]
    pub labels: Tensor,
    pub sample_indices: Vec<usize>,
    pub batch_number: usize,
}

impl DataBatch {
    pub fn samples_in_batch(&self) -> usize {
        self.sample_indices.len()
    }

    pub fn elements_per_sample(&self) -> usize {
        match self.samples_in_batch() {
            0 => 0,
            n => self.data.data.len() / n,
        }
    }

    /// Tensor slot of the `i`th sample in this batch.
    pub fn sample_data(&self, i: usize) -> Option<&[f32]> {
        self.data.outer_slice(i)
    }
}
