use std::fmt;

/// Pipeline stage, used for progress and error reporting.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Stage {
    /// Option checks, output format and layer metadata.
    Setup,
    /// Loading, preparing, face extraction and run merging.
    Extract,
    Collapse,
    /// Triangulation and writing.
    Emit,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Setup => "setup",
            Stage::Extract => "face extraction",
            Stage::Collapse => "face collapsing",
            Stage::Emit => "mesh emission",
        })
    }
}

/// Progress callbacks. `layer_done` may be called from worker threads and,
/// within the collapse stage, out of layer order.
pub trait ExportObserver: Send + Sync {
    fn stage_started(&self, stage: Stage, layers: usize);

    fn layer_done(&self, stage: Stage, layer: usize);
}

pub struct NoopObserver;

impl ExportObserver for NoopObserver {
    fn stage_started(&self, _stage: Stage, _layers: usize) {}

    fn layer_done(&self, _stage: Stage, _layer: usize) {}
}

/// Reports progress through the `log` facade.
pub struct LogObserver;

impl ExportObserver for LogObserver {
    fn stage_started(&self, stage: Stage, layers: usize) {
        log::info!(target: "export", "{stage}: {layers} layers");
    }

    fn layer_done(&self, stage: Stage, layer: usize) {
        log::trace!(target: "export", "{stage}: layer {layer} done");
    }
}
