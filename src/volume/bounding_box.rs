use serde::{Deserialize, Serialize};

use crate::dataloader::error::{DataLoaderError, Result};

use super::volume::Volume;

/// Axis-aligned crop. `origin` is per sample, `dimensions` is shared by the
/// whole catalog so that every crop has the same shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub origin: [usize; 3],
    pub dimensions: [usize; 3],
}

impl BoundingBox {
    pub fn new(origin: [usize; 3], dimensions: [usize; 3]) -> Self {
        Self { origin, dimensions }
    }

    /// Requires `origin + dimensions <= shape` on every axis. Anything else is
    /// an error, never a silently truncated crop.
    pub fn check_fits(&self, shape: [usize; 3]) -> Result<()> {
        for axis in 0..3 {
            let end = self.origin[axis].checked_add(self.dimensions[axis]);
            if end.map_or(true, |end| end > shape[axis]) {
                return Err(DataLoaderError::OutOfBounds {
                    origin: self.origin,
                    dimensions: self.dimensions,
                    shape,
                });
            }
        }
        Ok(())
    }

    pub fn extract<T: Copy>(&self, volume: &Volume<T>) -> Result<Volume<T>> {
        let shape = volume.shape();
        self.check_fits(shape)?;

        let [ox, oy, oz] = self.origin;
        let [dx, dy, dz] = self.dimensions;
        let mut data = Vec::with_capacity(dx * dy * dz);
        for x in ox..ox + dx {
            for y in oy..oy + dy {
                // z rows are contiguous in the source
                let start = ((shape[1] * x) + y) * shape[2] + oz;
                data.extend_from_slice(&volume.data[start..start + dz]);
            }
        }

        Volume::new(self.dimensions, data)
    }
}
