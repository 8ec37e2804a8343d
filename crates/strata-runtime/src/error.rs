use strata_io::MeshIoError;
use strata_raster::RasterError;
use thiserror::Error;

use crate::observer::Stage;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    #[error("layers are empty after cropping, rotation and down-sampling")]
    EmptyGrid,

    #[error("{stage} failed: {source}")]
    Raster {
        stage: Stage,
        #[source]
        source: RasterError,
    },

    #[error("{stage} failed: {source}")]
    Mesh {
        stage: Stage,
        #[source]
        source: MeshIoError,
    },

    #[error("could not build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("could not start the layer loader: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("layer loader thread panicked")]
    LoaderPanicked,

    #[error("cancelled during {stage}")]
    Cancelled { stage: Stage },
}

impl ExportError {
    /// Stage the error belongs to.
    pub fn stage(&self) -> Stage {
        match self {
            ExportError::InvalidOptions(_) | ExportError::ThreadPool(_) => Stage::Setup,
            ExportError::EmptyGrid | ExportError::Spawn(_) | ExportError::LoaderPanicked => {
                Stage::Extract
            }
            ExportError::Raster { stage, .. }
            | ExportError::Mesh { stage, .. }
            | ExportError::Cancelled { stage } => *stage,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExportError::Cancelled { .. })
    }

    pub(crate) fn raster(stage: Stage) -> impl FnOnce(RasterError) -> Self {
        move |source| ExportError::Raster { stage, source }
    }

    pub(crate) fn mesh(stage: Stage) -> impl FnOnce(MeshIoError) -> Self {
        move |source| ExportError::Mesh { stage, source }
    }
}
