use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative cancellation flag shared between the caller and the stages.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// A stage stopped at a checkpoint because its token was cancelled.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Cancelled;

static IGNORE_LAYER: fn(usize) = |_| {};

/// Per-layer checkpoint handed to every stage call: cancellation plus progress.
pub struct StageCtl<'a> {
    cancel: &'a CancelToken,
    on_layer: &'a (dyn Fn(usize) + Sync),
}

impl<'a> StageCtl<'a> {
    pub fn new(cancel: &'a CancelToken, on_layer: &'a (dyn Fn(usize) + Sync)) -> Self {
        Self { cancel, on_layer }
    }

    /// No progress reporting.
    pub fn silent(cancel: &'a CancelToken) -> Self {
        Self {
            cancel,
            on_layer: &IGNORE_LAYER,
        }
    }

    #[inline]
    pub fn checkpoint(&self) -> Result<(), Cancelled> {
        if self.cancel.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }

    #[inline]
    pub fn layer_done(&self, layer: usize) {
        (self.on_layer)(layer);
    }
}
