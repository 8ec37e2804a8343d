//! Streaming triangle mesh writers (STL, PLY, OBJ, OFF, AMF, WRL, 3MF).
//!
//! Every writer stages its output in a temporary file beside the destination
//! and moves it into place only when `end_write` succeeds.
#![forbid(unsafe_code)]

mod amf;
mod atomic;
mod error;
mod format;
mod obj;
mod off;
mod ply;
mod sink;
mod spool;
mod stl;
mod threemf;
mod writer;
mod wrl;

pub use amf::AmfWriter;
pub use atomic::AtomicFile;
pub use error::MeshIoError;
pub use format::{MeshEncoding, MeshFormat};
pub use obj::ObjWriter;
pub use off::OffWriter;
pub use ply::PlyWriter;
pub use sink::MeshSink;
pub use spool::{DEFAULT_VERTEX_CACHE, IndexedSpool, VertexCache};
pub use stl::StlWriter;
pub use threemf::{MODEL_PART, ThreeMfWriter};
pub use writer::MeshWriter;
pub use wrl::WrlWriter;

/// Producer tag written into file headers.
pub const PRODUCER: &str = concat!("strata ", env!("CARGO_PKG_VERSION"));
