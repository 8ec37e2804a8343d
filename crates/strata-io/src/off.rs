//! Object File Format output (text).

use std::io::Write;
use std::path::{Path, PathBuf};

use strata_geom::Vec3;

use crate::PRODUCER;
use crate::atomic::AtomicFile;
use crate::error::MeshIoError;
use crate::sink::MeshSink;
use crate::spool::IndexedSpool;

pub struct OffWriter {
    path: PathBuf,
    cache_capacity: usize,
    spool: Option<IndexedSpool>,
    triangles: u64,
}

impl OffWriter {
    pub fn new(path: &Path, cache_capacity: usize) -> Self {
        Self {
            path: path.to_path_buf(),
            cache_capacity,
            spool: None,
            triangles: 0,
        }
    }
}

impl MeshSink for OffWriter {
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
        let mut idx = [0u32; 3];
        for (slot, p) in idx.iter_mut().zip([p1, p2, p3]) {
            *slot = spool.vertex(p, |w, p| writeln!(w, "{} {} {}", p.x, p.y, p.z))?;
        }
        spool.face(|w| writeln!(w, "3 {} {} {}", idx[0], idx[1], idx[2]))?;
        self.triangles += 1;
        Ok(())
    }

    fn end_write(&mut self) -> Result<(), MeshIoError> {
        let spool = self.spool.take().ok_or(MeshIoError::NotStarted)?;
        let mut file = AtomicFile::create(&self.path)?;
        let w = file.writer();
        writeln!(w, "OFF")?;
        writeln!(w, "# generated by {PRODUCER}")?;
        writeln!(w, "{} {} 0", spool.vertex_count(), spool.face_count())?;
        spool.drain_into(w)?;
        file.commit()?;
        Ok(())
    }

    fn triangles_written(&self) -> u64 {
        self.triangles
    }
}
