use thiserror::Error;

pub type Result<T> = std::result::Result<T, DataLoaderError>;

#[derive(Error, Debug)]
pub enum DataLoaderError {
    // Construction time
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Dataset contains no samples")]
    EmptyDataset,

    #[error("Out of memory error: {0}")]
    OutOfMemory(String),

    // Per sample
    #[error("Bounding box out of bounds: origin {origin:?} + dimensions {dimensions:?} exceeds array shape {shape:?}")]
    OutOfBounds {
        origin: [usize; 3],
        dimensions: [usize; 3],
        shape: [usize; 3],
    },

    #[error("Missing data: array `{name}` was not returned for sample `{key}`")]
    MissingData { key: String, name: String },

    #[error("Not found: array `{name}` does not exist for sample `{key}`")]
    NotFound { key: String, name: String },

    #[error("ROI number {roi} is out of range for a {bits}-bit label map")]
    RoiOutOfRange { roi: u32, bits: u32 },

    #[error("Unsupported array format: {0}")]
    UnsupportedFormat(String),

    // Batches and predictions
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Sample {index} requested but only {count} samples exist")]
    SampleOutOfRange { index: usize, count: usize },

    #[error("Batch {index} requested but only {count} batches exist")]
    BatchOutOfRange { index: usize, count: usize },

    #[error("Model plugin error: {0}")]
    Plugin(String),

    // Wrapped
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Thread pool error: {0}")]
    ThreadPoolError(#[from] rayon::ThreadPoolBuildError),
}
