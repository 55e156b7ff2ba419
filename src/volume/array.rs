use crate::dataloader::error::{DataLoaderError, Result};

use super::mask::extract_roi_mask;
use super::volume::Volume;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceFormat {
    U8,
    U16,
    U32,
    U64,
    I16,
    I32,
    F32,
    F64,
}

/// Array as handed out by a volume store: rank 2 or 3, row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct NdArray<T> {
    pub shape: Vec<usize>,
    pub data: Vec<T>,
}

impl<T: Copy> NdArray<T> {
    pub fn new(shape: Vec<usize>, data: Vec<T>) -> Result<Self> {
        let expected = shape.iter().product::<usize>();
        if data.len() != expected {
            return Err(DataLoaderError::ShapeMismatch(format!(
                "array of shape {:?} needs {} elements but {} were given",
                shape,
                expected,
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    // 2D arrays gain a trailing singleton axis, everything downstream is rank 3
    pub fn into_volume(self) -> Result<Volume<T>> {
        let shape = match self.shape.as_slice() {
            &[x, y] => [x, y, 1],
            &[x, y, z] => [x, y, z],
            other => {
                return Err(DataLoaderError::ShapeMismatch(format!(
                    "expected a 2D or 3D array, got shape {:?}",
                    other
                )))
            }
        };
        Volume::new(shape, self.data)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum VolumeArray {
    U8(NdArray<u8>),
    U16(NdArray<u16>),
    U32(NdArray<u32>),
    U64(NdArray<u64>),
    I16(NdArray<i16>),
    I32(NdArray<i32>),
    F32(NdArray<f32>),
    F64(NdArray<f64>),
}

impl VolumeArray {
    pub fn format(&self) -> SourceFormat {
        match self {
            VolumeArray::U8(_) => SourceFormat::U8,
            VolumeArray::U16(_) => SourceFormat::U16,
            VolumeArray::U32(_) => SourceFormat::U32,
            VolumeArray::U64(_) => SourceFormat::U64,
            VolumeArray::I16(_) => SourceFormat::I16,
            VolumeArray::I32(_) => SourceFormat::I32,
            VolumeArray::F32(_) => SourceFormat::F32,
            VolumeArray::F64(_) => SourceFormat::F64,
        }
    }

    pub fn shape(&self) -> &[usize] {
        match self {
            VolumeArray::U8(a) => &a.shape,
            VolumeArray::U16(a) => &a.shape,
            VolumeArray::U32(a) => &a.shape,
            VolumeArray::U64(a) => &a.shape,
            VolumeArray::I16(a) => &a.shape,
            VolumeArray::I32(a) => &a.shape,
            VolumeArray::F32(a) => &a.shape,
            VolumeArray::F64(a) => &a.shape,
        }
    }

    /// Image data converted to f32, promoted to rank 3. 8 and 16 bit integers
    /// are exact; wider integers and f64 round to the nearest f32.
    pub fn into_f32_volume(self) -> Result<Volume<f32>> {
        match self {
            VolumeArray::U8(a) => Ok(a.into_volume()?.map(f32::from)),
            VolumeArray::U16(a) => Ok(a.into_volume()?.map(f32::from)),
            VolumeArray::U32(a) => Ok(a.into_volume()?.map(|v| v as f32)),
            VolumeArray::U64(a) => Ok(a.into_volume()?.map(|v| v as f32)),
            VolumeArray::I16(a) => Ok(a.into_volume()?.map(f32::from)),
            VolumeArray::I32(a) => Ok(a.into_volume()?.map(|v| v as f32)),
            VolumeArray::F32(a) => a.into_volume(),
            VolumeArray::F64(a) => Ok(a.into_volume()?.map(|v| v as f32)),
        }
    }

    /// Treats the array as a packed label map and pulls out one ROI bit plane.
    /// Only unsigned integer arrays are label maps.
    pub fn decode_roi_mask(self, roi_number: u32) -> Result<Volume<bool>> {
        match self {
            VolumeArray::U8(a) => extract_roi_mask(&a.into_volume()?, roi_number),
            VolumeArray::U16(a) => extract_roi_mask(&a.into_volume()?, roi_number),
            VolumeArray::U32(a) => extract_roi_mask(&a.into_volume()?, roi_number),
            VolumeArray::U64(a) => extract_roi_mask(&a.into_volume()?, roi_number),
            other => Err(DataLoaderError::UnsupportedFormat(format!(
                "label maps must hold unsigned integers, got {:?}",
                other.format()
            ))),
        }
    }
}

macro_rules! impl_from_nd_array {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<NdArray<$t>> for VolumeArray {
                fn from(value: NdArray<$t>) -> Self {
                    VolumeArray::$variant(value)
                }
            }
        )*
    };
}

impl_from_nd_array!(
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    i16 => I16,
    i32 => I32,
    f32 => F32,
    f64 => F64,
);
