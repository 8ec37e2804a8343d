//! Layer stack to mesh export: options, progress reporting and the staged
//! extract / collapse / emit pipeline.
#![forbid(unsafe_code)]

mod error;
mod export;
mod observer;
mod options;

pub use error::ExportError;
pub use export::{ExportReport, StageTimings, export_mesh};
pub use observer::{ExportObserver, LogObserver, NoopObserver, Stage};
pub use options::ExportOptions;
pub use strata_voxel::CancelToken;
