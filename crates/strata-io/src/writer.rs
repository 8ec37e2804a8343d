use std::path::Path;

use strata_geom::Vec3;

use crate::amf::AmfWriter;
use crate::error::MeshIoError;
use crate::format::{MeshEncoding, MeshFormat};
use crate::obj::ObjWriter;
use crate::off::OffWriter;
use crate::ply::PlyWriter;
use crate::sink::MeshSink;
use crate::spool::DEFAULT_VERTEX_CACHE;
use crate::stl::StlWriter;
use crate::threemf::ThreeMfWriter;
use crate::wrl::WrlWriter;

/// Writer for any supported format, chosen from the output extension.
pub enum MeshWriter {
    Stl(StlWriter),
    Ply(PlyWriter),
    Obj(ObjWriter),
    Off(OffWriter),
    Amf(AmfWriter),
    Wrl(WrlWriter),
    ThreeMf(ThreeMfWriter),
}

impl MeshWriter {
    /// Picks the writer from `path`'s extension. Touches no files.
    pub fn for_path(path: &Path, encoding: MeshEncoding) -> Result<Self, MeshIoError> {
        let format = MeshFormat::from_path(path)?;
        Ok(Self::new(path, format, encoding, DEFAULT_VERTEX_CACHE))
    }

    pub fn new(
        path: &Path,
        format: MeshFormat,
        encoding: MeshEncoding,
        vertex_cache: usize,
    ) -> Self {
        if !format.supports_binary() && encoding == MeshEncoding::Binary {
            log::debug!("{format} has no binary layout, writing text");
        }
        match format {
            MeshFormat::Stl => MeshWriter::Stl(StlWriter::new(path, encoding)),
            MeshFormat::Ply => MeshWriter::Ply(PlyWriter::new(path, encoding, vertex_cache)),
            MeshFormat::Obj => MeshWriter::Obj(ObjWriter::new(path, vertex_cache)),
            MeshFormat::Off => MeshWriter::Off(OffWriter::new(path, vertex_cache)),
            MeshFormat::Amf => MeshWriter::Amf(AmfWriter::new(path, vertex_cache)),
            MeshFormat::Wrl => MeshWriter::Wrl(WrlWriter::new(path, vertex_cache)),
            MeshFormat::ThreeMf => MeshWriter::ThreeMf(ThreeMfWriter::new(path, vertex_cache)),
        }
    }

    pub fn format(&self) -> MeshFormat {
        match self {
            MeshWriter::Stl(_) => MeshFormat::Stl,
            MeshWriter::Ply(_) => MeshFormat::Ply,
            MeshWriter::Obj(_) => MeshFormat::Obj,
            MeshWriter::Off(_) => MeshFormat::Off,
            MeshWriter::Amf(_) => MeshFormat::Amf,
            MeshWriter::Wrl(_) => MeshFormat::Wrl,
            MeshWriter::ThreeMf(_) => MeshFormat::ThreeMf,
        }
    }

    fn sink(&mut self) -> &mut dyn MeshSink {
        match self {
            MeshWriter::Stl(w) => w,
            MeshWriter::Ply(w) => w,
            MeshWriter::Obj(w) => w,
            MeshWriter::Off(w) => w,
            MeshWriter::Amf(w) => w,
            MeshWriter::Wrl(w) => w,
            MeshWriter::ThreeMf(w) => w,
        }
    }
}

impl MeshSink for MeshWriter {
    fn begin_write(&mut self) -> Result<(), MeshIoError> {
        self.sink().begin_write()
    }

    fn write_triangle(
        &mut self,
        p1: Vec3,
        p2: Vec3,
        p3: Vec3,
        normal: Vec3,
    ) -> Result<(), MeshIoError> {
        self.sink().write_triangle(p1, p2, p3, normal)
    }

    fn end_write(&mut self) -> Result<(), MeshIoError> {
        self.sink().end_write()
    }

    fn triangles_written(&self) -> u64 {
        match self {
            MeshWriter::Stl(w) => w.triangles_written(),
            MeshWriter::Ply(w) => w.triangles_written(),
            MeshWriter::Obj(w) => w.triangles_written(),
            MeshWriter::Off(w) => w.triangles_written(),
            MeshWriter::Amf(w) => w.triangles_written(),
            MeshWriter::Wrl(w) => w.triangles_written(),
            MeshWriter::ThreeMf(w) => w.triangles_written(),
        }
    }
}

