use crate::dataloader::error::{DataLoaderError, Result};

use super::tensor_desc::TensorDesc;

/// Dense row-major `f32` tensor, last axis fastest.
#[derive(Clone, Debug, PartialEq)]
pub struct Tensor {
    pub desc: TensorDesc,
    pub data: Vec<f32>,
}

impl Tensor {
    pub fn zeros(desc: TensorDesc) -> Self {
        let data = vec![0.0; desc.num_elements()];
        Self { desc, data }
    }

    pub fn from_vec(shape: Vec<usize>, data: Vec<f32>) -> Result<Self> {
        let desc = TensorDesc::new(shape);
        if desc.num_elements() != data.len() {
            return Err(DataLoaderError::ShapeMismatch(format!(
                "shape {:?} needs {} elements but {} were given",
                desc.shape,
                desc.num_elements(),
                data.len()
            )));
        }
        Ok(Self { desc, data })
    }

    pub fn shape(&self) -> &[usize] {
        &self.desc.shape
    }

    fn offset(&self, index: &[usize]) -> Option<usize> {
        if index.len() != self.desc.rank() {
            return None;
        }
        let mut offset = 0;
        for (&i, &d) in index.iter().zip(self.desc.shape.iter()) {
            if i >= d {
                return None;
            }
            offset = offset * d + i;
        }
        Some(offset)
    }

    pub fn get(&self, index: &[usize]) -> Option<f32> {
        self.offset(index).map(|o| self.data[o])
    }

    /// Contiguous block of everything below the first axis at `i`.
    pub fn outer_slice(&self, i: usize) -> Option<&[f32]> {
        let (&outer, _) = self.desc.shape.split_first()?;
        if i >= outer {
            return None;
        }
        let stride = self.data.len() / outer;
        Some(&self.data[i * stride..(i + 1) * stride])
    }
}
