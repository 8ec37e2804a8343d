use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MeshIoError {
    #[error("unknown mesh format: .{extension} (expected stl, ply, obj, off, amf, wrl or 3mf)")]
    UnknownFormat { extension: String },

    #[error("output path {path} has no extension to pick a mesh format from")]
    MissingExtension { path: PathBuf },

    #[error("mesh writer used before begin_write")]
    NotStarted,

    #[error("begin_write called twice")]
    AlreadyStarted,

    #[error("binary STL cannot hold more than {max} triangles")]
    TooManyTriangles { max: u64 },

    #[error("could not move finished mesh to {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("zip container: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
