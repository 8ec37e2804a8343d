//! 3D Manufacturing Format output: an OPC zip package around one model part.

use std::io::Write;
use std::path::{Path, PathBuf};

use strata_geom::Vec3;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::PRODUCER;
use crate::atomic::AtomicFile;
use crate::error::MeshIoError;
use crate::sink::MeshSink;
use crate::spool::IndexedSpool;

/// Package path of the model part.
pub const MODEL_PART: &str = "3D/3dmodel.model";

const CORE_NAMESPACE: &str = "http://schemas.microsoft.com/3dmanufacturing/core/2015/02";

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="model" ContentType="application/vnd.ms-package.3dmanufacturing-3dmodel+xml"/>
</Types>
"#;

const RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Target="/3D/3dmodel.model" Id="rel0" Type="http://schemas.microsoft.com/3dmanufacturing/2013/01/3dmodel"/>
</Relationships>
"#;

pub(crate) fn deflated() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

pub struct ThreeMfWriter {
    path: PathBuf,
    cache_capacity: usize,
    spool: Option<IndexedSpool>,
    triangles: u64,
}

impl ThreeMfWriter {
    pub fn new(path: &Path, cache_capacity: usize) -> Self {
        Self {
            path: path.to_path_buf(),
            cache_capacity,
            spool: None,
            triangles: 0,
        }
    }
}

impl MeshSink for ThreeMfWriter {
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
                writeln!(w, r#"<vertex x="{}" y="{}" z="{}"/>"#, p.x, p.y, p.z)
            })?;
        }
        spool.face(|w| {
            writeln!(
                w,
                r#"<triangle v1="{}" v2="{}" v3="{}"/>"#,
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
        zip.start_file("[Content_Types].xml", deflated())?;
        zip.write_all(CONTENT_TYPES_XML.as_bytes())?;
        zip.start_file("_rels/.rels", deflated())?;
        zip.write_all(RELS_XML.as_bytes())?;

        zip.start_file(MODEL_PART, deflated())?;
        writeln!(zip, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
        writeln!(
            zip,
            r#"<model unit="millimeter" xml:lang="en-US" xmlns="{CORE_NAMESPACE}">"#
        )?;
        writeln!(zip, r#"<metadata name="Application">{PRODUCER}</metadata>"#)?;
        writeln!(zip, "<resources>")?;
        writeln!(zip, r#"<object id="1" type="model">"#)?;
        writeln!(zip, "<mesh>")?;
        writeln!(zip, "<vertices>")?;
        spool.drain_split_into(&mut zip, b"</vertices>\n<triangles>\n")?;
        writeln!(zip, "</triangles>")?;
        writeln!(zip, "</mesh>")?;
        writeln!(zip, "</object>")?;
        writeln!(zip, "</resources>")?;
        writeln!(zip, "<build>")?;
        writeln!(zip, r#"<item objectid="1"/>"#)?;
        writeln!(zip, "</build>")?;
        writeln!(zip, "</model>")?;
        zip.finish()?;
        file.commit()?;
        Ok(())
    }

    fn triangles_written(&self) -> u64 {
        self.triangles
    }
}
