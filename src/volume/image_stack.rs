use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use image::ColorType;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::dataloader::error::{DataLoaderError, Result};

use super::array::{NdArray, VolumeArray};
use super::store::VolumeStore;

// Volume store backed by directories of 2D slice images:
//
//   <root>/<sample key>/<array name>/<slice files>
//
// Slices are ordered by file name and become the last axis, so an array has
// shape [rows, cols, slices]. Grayscale 8-bit, 16-bit and 32-bit float images
// are supported. A 16-bit PNG stack is enough for label maps with up to 16 ROIs.
pub struct ImageStackStore {
    root: PathBuf,
    valid_extensions: HashSet<String>,
}

enum SliceData {
    U8(Vec<u8>),
    U16(Vec<u16>),
    F32(Vec<f32>),
}

struct DecodedSlice {
    rows: usize,
    cols: usize,
    data: SliceData,
}

impl ImageStackStore {
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(DataLoaderError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("volume store root {} is not a directory", root.display()),
            )));
        }

        let valid_extensions = image::ImageFormat::all()
            .flat_map(|format| format.extensions_str())
            .map(|ext| ext.to_string())
            .collect();

        Ok(Self {
            root: root.to_owned(),
            valid_extensions,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_valid_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.valid_extensions.contains(&ext.to_lowercase()))
            .unwrap_or(false)
    }

    fn slice_paths(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && self.is_valid_extension(path))
            .collect();

        // read_dir order depends on the filesystem
        paths.sort_unstable();
        Ok(paths)
    }

    fn read_array(&self, key: &str, name: &str) -> Result<VolumeArray> {
        let not_found = || DataLoaderError::NotFound {
            key: key.to_string(),
            name: name.to_string(),
        };

        let dir = self.root.join(key).join(name);
        if !dir.is_dir() {
            return Err(not_found());
        }
        let paths = self.slice_paths(&dir)?;
        if paths.is_empty() {
            return Err(not_found());
        }

        let slices = paths
            .par_iter()
            .map(|path| decode_slice(path))
            .collect::<Result<Vec<_>>>()?;

        stack_slices(slices)
    }
}

impl VolumeStore for ImageStackStore {
    fn read_named_arrays(&self, key: &str, names: &[&str]) -> Result<HashMap<String, VolumeArray>> {
        names
            .iter()
            .map(|&name| Ok((name.to_string(), self.read_array(key, name)?)))
            .collect()
    }
}

fn decode_slice(path: &Path) -> Result<DecodedSlice> {
    let img = image::open(path)?;
    let rows = img.height() as usize;
    let cols = img.width() as usize;

    let data = match img.color() {
        ColorType::L8 => SliceData::U8(img.into_luma8().into_raw()),
        ColorType::L16 => SliceData::U16(img.into_luma16().into_raw()),
        ColorType::Rgb32F => SliceData::F32(gray_channel(path, &img.into_rgb32f().into_raw(), 3)?),
        ColorType::Rgba32F => SliceData::F32(gray_channel(path, &img.into_rgba32f().into_raw(), 4)?),
        other => {
            return Err(DataLoaderError::UnsupportedFormat(format!(
                "{} has colour type {:?}, expected single channel grayscale",
                path.display(),
                other
            )))
        }
    };

    Ok(DecodedSlice { rows, cols, data })
}

// Float formats only decode as RGB(A). A grayscale slice carries the same bits
// in R, G and B; its value is taken from R unchanged.
fn gray_channel(path: &Path, raw: &[f32], stride: usize) -> Result<Vec<f32>> {
    raw.chunks_exact(stride)
        .map(|px| {
            if px[0].to_bits() == px[1].to_bits() && px[1].to_bits() == px[2].to_bits() {
                Ok(px[0])
            } else {
                Err(DataLoaderError::UnsupportedFormat(format!(
                    "{} is a colour float image, expected single channel grayscale",
                    path.display()
                )))
            }
        })
        .collect()
}

fn stack_slices(slices: Vec<DecodedSlice>) -> Result<VolumeArray> {
    let rows = slices[0].rows;
    let cols = slices[0].cols;
    if slices.iter().any(|s| s.rows != rows || s.cols != cols) {
        return Err(DataLoaderError::ShapeMismatch(
            "all slices of an image stack must have the same size".into(),
        ));
    }

    let depth = slices.len();
    let mismatch = || DataLoaderError::UnsupportedFormat("image stack mixes pixel formats".into());

    match &slices[0].data {
        SliceData::U8(_) => {
            let planes = slices
                .iter()
                .map(|s| match &s.data {
                    SliceData::U8(d) => Ok(d.as_slice()),
                    _ => Err(mismatch()),
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(interleave(rows, cols, depth, &planes)?.into())
        }
        SliceData::U16(_) => {
            let planes = slices
                .iter()
                .map(|s| match &s.data {
                    SliceData::U16(d) => Ok(d.as_slice()),
                    _ => Err(mismatch()),
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(interleave(rows, cols, depth, &planes)?.into())
        }
        SliceData::F32(_) => {
            let planes = slices
                .iter()
                .map(|s| match &s.data {
                    SliceData::F32(d) => Ok(d.as_slice()),
                    _ => Err(mismatch()),
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(interleave(rows, cols, depth, &planes)?.into())
        }
    }
}

// Slice pixels are row-major (row, col). The volume wants the slice axis fastest.
fn interleave<T: Copy>(rows: usize, cols: usize, depth: usize, planes: &[&[T]]) -> Result<NdArray<T>> {
    let mut data = Vec::with_capacity(rows * cols * depth);
    for pixel in 0..rows * cols {
        for plane in planes {
            data.push(plane[pixel]);
        }
    }
    NdArray::new(vec![rows, cols, depth], data)
}
