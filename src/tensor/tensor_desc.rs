#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TensorDesc {
    pub shape: Vec<usize>,
}

impl TensorDesc {
    pub fn new(shape: Vec<usize>) -> Self {
        Self { shape }
    }

    pub fn new_matrix(rows: usize, cols: usize) -> Self {
        Self::new(vec![rows, cols])
    }

    // [samples, x, y, z, channels], the layout of every volume batch
    pub fn new_batch5d(samples: usize, dims: [usize; 3], channels: usize) -> Self {
        Self::new(vec![samples, dims[0], dims[1], dims[2], channels])
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn num_elements(&self) -> usize {
        self.shape.iter().product()
    }

    /// Drops every axis of length one.
    pub fn squeeze(&self) -> Self {
        Self::new(self.shape.iter().copied().filter(|&d| d != 1).collect())
    }
}
