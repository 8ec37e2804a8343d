//! VRML 2.0 output: one `IndexedFaceSet` shape.

use std::io::Write;
use std::path::{Path, PathBuf};

use strata_geom::Vec3;

use crate::PRODUCER;
use crate::atomic::AtomicFile;
use crate::error::MeshIoError;
use crate::sink::MeshSink;
use crate::spool::IndexedSpool;

pub struct WrlWriter {
    path: PathBuf,
    cache_capacity: usize,
    spool: Option<IndexedSpool>,
    triangles: u64,
}

impl WrlWriter {
    pub fn new(path: &Path, cache_capacity: usize) -> Self {
        Self {
            path: path.to_path_buf(),
            cache_capacity,
            spool: None,
            triangles: 0,
        }
    }
}

impl MeshSink for WrlWriter {
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
            *slot = spool.vertex(p, |w, p| writeln!(w, "\t\t\t\t{} {} {},", p.x, p.y, p.z))?;
        }
        // -1 closes each polygon
        spool.face(|w| writeln!(w, "\t\t\t{} {} {} -1,", idx[0], idx[1], idx[2]))?;
        self.triangles += 1;
        Ok(())
    }

    fn end_write(&mut self) -> Result<(), MeshIoError> {
        let spool = self.spool.take().ok_or(MeshIoError::NotStarted)?;
        let mut file = AtomicFile::create(&self.path)?;
        let w = file.writer();
        writeln!(w, "#VRML V2.0 utf8")?;
        writeln!(w, "WorldInfo {{ info \"generated by {PRODUCER}\" }}")?;
        writeln!(w, "Shape {{")?;
        writeln!(w, "\tgeometry IndexedFaceSet {{")?;
        writeln!(w, "\t\tcoord Coordinate {{")?;
        writeln!(w, "\t\t\tpoint [")?;
        spool.drain_split_into(w, b"\t\t\t]\n\t\t}\n\t\tcoordIndex [\n")?;
        writeln!(w, "\t\t]")?;
        writeln!(w, "\t}}")?;
        writeln!(w, "}}")?;
        file.commit()?;
        Ok(())
    }

    fn triangles_written(&self) -> u64 {
        self.triangles
    }
}
