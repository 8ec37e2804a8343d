use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RasterError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid image {path}: {message}")]
    InvalidImage { path: PathBuf, message: String },

    #[error("image buffer holds {got} bytes, expected {expected}")]
    BufferSize { expected: usize, got: usize },

    #[error("layer images differ in size: expected {expected:?}, got {got:?}")]
    SizeMismatch {
        expected: (usize, usize),
        got: (usize, usize),
    },

    #[error("manifest {path}: {source}")]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("manifest {path}: {message}")]
    InvalidManifest { path: PathBuf, message: String },

    #[error("layer {index} at z={z} lies below the previous layer at z={prev}")]
    UnorderedLayers { index: usize, z: f32, prev: f32 },

    #[error("layer index {index} out of range ({count} layers)")]
    LayerOutOfRange { index: usize, count: usize },

    #[error("quality factor must be at least 1")]
    ZeroQuality,
}

impl RasterError {
    pub(crate) fn invalid_image(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::InvalidImage {
            path: path.into(),
            message: message.into(),
        }
    }
}
