//! PLY output: indexed vertices, triangle faces as `vertex_indices` lists.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use strata_geom::Vec3;

use crate::PRODUCER;
use crate::atomic::AtomicFile;
use crate::error::MeshIoError;
use crate::format::MeshEncoding;
use crate::sink::MeshSink;
use crate::spool::IndexedSpool;

pub struct PlyWriter {
    path: PathBuf,
    encoding: MeshEncoding,
    cache_capacity: usize,
    spool: Option<IndexedSpool>,
    triangles: u64,
}

impl PlyWriter {
    pub fn new(path: &Path, encoding: MeshEncoding, cache_capacity: usize) -> Self {
        Self {
            path: path.to_path_buf(),
            encoding,
            cache_capacity,
            spool: None,
            triangles: 0,
        }
    }
}

impl MeshSink for PlyWriter {
    fn begin_write(&mut self) -> Result<(), MeshIoError> {
        if self.spool.is_some() {
            return Err(MeshIoError::AlreadyStarted);
        }
        self.spool = Some(IndexedSpool::new(self.cache_capacity)?);
        self.triangles = 0;
        Ok(())
    }

    fn write_triangle(
        &mut self,
        p1: Vec3,
        p2: Vec3,
        p3: Vec3,
        _normal: Vec3,
    ) -> Result<(), MeshIoError> {
        let spool = self.spool.as_mut().ok_or(MeshIoError::NotStarted)?;
        let binary = self.encoding == MeshEncoding::Binary;
        let encode = move |w: &mut BufWriter<File>, p: Vec3| {
            if binary {
                w.write_all(&p.x.to_le_bytes())?;
                w.write_all(&p.y.to_le_bytes())?;
                w.write_all(&p.z.to_le_bytes())
            } else {
                writeln!(w, "{} {} {}", p.x, p.y, p.z)
            }
        };
        let idx = [
            spool.vertex(p1, encode)?,
            spool.vertex(p2, encode)?,
            spool.vertex(p3, encode)?,
        ];
        spool.face(|w| {
            if binary {
                w.write_all(&[3u8])?;
                for i in idx {
                    w.write_all(&(i as i32).to_le_bytes())?;
                }
                Ok(())
            } else {
                writeln!(w, "3 {} {} {}", idx[0], idx[1], idx[2])
            }
        })?;
        self.triangles += 1;
        Ok(())
    }

    fn end_write(&mut self) -> Result<(), MeshIoError> {
        let spool = self.spool.take().ok_or(MeshIoError::NotStarted)?;
        let mut file = AtomicFile::create(&self.path)?;
        let w = file.writer();
        let format = match self.encoding {
            MeshEncoding::Binary => "binary_little_endian",
            MeshEncoding::Ascii => "ascii",
        };
        writeln!(w, "ply")?;
        writeln!(w, "format {format} 1.0")?;
        writeln!(w, "comment generated by {PRODUCER}")?;
        writeln!(w, "element vertex {}", spool.vertex_count())?;
        writeln!(w, "property float x")?;
        writeln!(w, "property float y")?;
        writeln!(w, "property float z")?;
        writeln!(w, "element face {}", spool.face_count())?;
        writeln!(w, "property list uchar int vertex_indices")?;
        writeln!(w, "end_header")?;
        let faces = spool.face_count();
        spool.drain_into(w)?;
        let path = file.commit()?;
        log::debug!("wrote {faces} faces to {}", path.display());
        Ok(())
    }

    fn triangles_written(&self) -> u64 {
        self.triangles
    }
}
