use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("invalid target prefix {prefix:?}: {found:?} is not a hexadecimal digit")]
    InvalidPrefix { prefix: String, found: char },

    #[error("unknown hash algorithm {0:?} (expected sha256, sha384 or sha512)")]
    UnknownAlgorithm(String),

    #[error("pixel buffer holds {actual} samples, shape requires {expected}")]
    SampleCountMismatch { expected: usize, actual: usize },

    #[error("unsupported channel count: {0} (expected 1 to 4)")]
    UnsupportedChannels(usize),

    #[error("image dimensions {width}x{height} exceed the encoder limit")]
    DimensionsTooLarge { width: usize, height: usize },

    #[error("worker count must be at least 1")]
    InvalidWorkers,

    #[error("could not write output image {}: {message}", .path.display())]
    SaveFailed { path: PathBuf, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;
