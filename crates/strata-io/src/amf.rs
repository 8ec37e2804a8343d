//! Additive Manufacturing File output (XML inside a single-entry zip).

use std::io::Write;
use std::path::{Path, PathBuf};

use strata_geom::Vec3;
use zip::ZipWriter;

use crate::PRODUCER;
use crate::atomic::AtomicFile;
use crate::error::MeshIoError;
use crate::sink::MeshSink;
use crate::spool::IndexedSpool;
use crate::threemf::deflated;

pub struct AmfWriter {
    path: PathBuf,
    cache_capacity: usize,
    spool: Option<IndexedSpool>,
    triangles: u64,
}

impl AmfWriter {
    pub fn new(path: &Path, cache_capacity: usize) -> Self {
        Self {
            path: path.to_path_buf(),
            cache_capacity,
            spool: None,
            triangles: 0,
        }
    }

    /// The archive holds one document named like the output file.
    fn entry_name(&self) -> String {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("model.amf")
            .to_string()
    }
}

impl MeshSink for AmfWriter {
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
            *slot = spool.vertex(p, |w, p| {
                writeln!(
                    w,
                    "<vertex><coordinates><x>{}</x><y>{}</y><z>{}</z></coordinates></vertex>",
                    p.x, p.y, p.z
                )
            })?;
        }
        spool.face(|w| {
            writeln!(
                w,
                "<triangle><v1>{}</v1><v2>{}</v2><v3>{}</v3></triangle>",
                idx[0], idx[1], idx[2]
            )
        })?;
        self.triangles += 1;
        Ok(())
    }

    fn end_write(&mut self) -> Result<(), MeshIoError> {
        let spool = self.spool.take().ok_or(MeshIoError::NotStarted)?;
        let mut file = AtomicFile::create(&self.path)?;
        let mut zip = ZipWriter::new(file.writer());
        zip.start_file(self.entry_name(), deflated())?;
        writeln!(zip, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
        writeln!(zip, r#"<amf unit="millimeter" version="1.1">"#)?;
        writeln!(zip, r#"<metadata type="producer">{PRODUCER}</metadata>"#)?;
        writeln!(zip, r#"<object id="0">"#)?;
        writeln!(zip, "<mesh>")?;
        writeln!(zip, "<vertices>")?;
        spool.drain_split_into(
            &mut zip,
            b"</vertices>\n<volume>\n<metadata type=\"name\">Model</metadata>\n",
        )?;
        writeln!(zip, "</volume>")?;
        writeln!(zip, "</mesh>")?;
        writeln!(zip, "</object>")?;
        writeln!(zip, "</amf>")?;
        zip.finish()?;
        file.commit()?;
        Ok(())
    }

    fn triangles_written(&self) -> u64 {
        self.triangles
    }
}
