use crate::dataloader::error::{DataLoaderError, Result};

// Volume is a dense 3D array with shape [x, y, z]. Row-major, z fastest,
// so voxel (x, y, z) lives at ((x * dy) + y) * dz + z.
#[derive(Debug, Clone, PartialEq)]
pub struct Volume<T> {
    shape: [usize; 3],
    pub data: Vec<T>,
}

impl<T: Copy> Volume<T> {
    pub fn new(shape: [usize; 3], data: Vec<T>) -> Result<Self> {
        let expected = shape.iter().product::<usize>();
        if data.len() != expected {
            return Err(DataLoaderError::ShapeMismatch(format!(
                "volume of shape {:?} needs {} voxels but {} were given",
                shape,
                expected,
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    pub fn filled(shape: [usize; 3], value: T) -> Self {
        let n = shape.iter().product::<usize>();
        Self {
            shape,
            data: vec![value; n],
        }
    }

    pub fn from_fn(shape: [usize; 3], mut f: impl FnMut(usize, usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(shape.iter().product::<usize>());
        for x in 0..shape[0] {
            for y in 0..shape[1] {
                for z in 0..shape[2] {
                    data.push(f(x, y, z));
                }
            }
        }
        Self { shape, data }
    }

    fn get_index(&self, x: usize, y: usize, z: usize) -> usize {
        ((self.shape[1] * x) + y) * self.shape[2] + z
    }

    pub fn get(&self, x: usize, y: usize, z: usize) -> T {
        let index = self.get_index(x, y, z);
        self.data[index]
    }

    pub fn set(&mut self, x: usize, y: usize, z: usize, value: T) {
        let index = self.get_index(x, y, z);
        self.data[index] = value
    }

    pub fn map<U>(&self, f: impl Fn(T) -> U) -> Volume<U> {
        Volume {
            shape: self.shape,
            data: self.data.iter().copied().map(f).collect(),
        }
    }

    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
