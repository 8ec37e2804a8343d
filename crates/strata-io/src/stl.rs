//! STL output, binary or ASCII.
//!
//! Binary layout: 80-byte header, `u32` triangle count, then per triangle
//! the normal and three vertices as little-endian `f32` plus a zero `u16`.
//! The count is patched in once the stream ends.

use std::io::Write;
use std::path::{Path, PathBuf};

use strata_geom::Vec3;

use crate::PRODUCER;
use crate::atomic::AtomicFile;
use crate::error::MeshIoError;
use crate::format::MeshEncoding;
use crate::sink::MeshSink;

const HEADER_SIZE: usize = 80;
const SOLID_NAME: &str = "strata";

pub struct StlWriter {
    path: PathBuf,
    encoding: MeshEncoding,
    file: Option<AtomicFile>,
    triangles: u64,
}

impl StlWriter {
    pub fn new(path: &Path, encoding: MeshEncoding) -> Self {
        Self {
            path: path.to_path_buf(),
            encoding,
            file: None,
            triangles: 0,
        }
    }
}

fn write_vec_le(w: &mut impl Write, v: Vec3) -> std::io::Result<()> {
    w.write_all(&v.x.to_le_bytes())?;
    w.write_all(&v.y.to_le_bytes())?;
    w.write_all(&v.z.to_le_bytes())
}

impl MeshSink for StlWriter {
    fn begin_write(&mut self) -> Result<(), MeshIoError> {
        if self.file.is_some() {
            return Err(MeshIoError::AlreadyStarted);
        }
        let mut file = AtomicFile::create(&self.path)?;
        let w = file.writer();
        match self.encoding {
            MeshEncoding::Binary => {
                let mut header = [b' '; HEADER_SIZE];
                let text = format!("{PRODUCER} binary STL");
                let n = text.len().min(HEADER_SIZE);
                header[..n].copy_from_slice(&text.as_bytes()[..n]);
                w.write_all(&header)?;
                w.write_all(&0u32.to_le_bytes())?;
            }
            MeshEncoding::Ascii => writeln!(w, "solid {SOLID_NAME}")?,
        }
        self.triangles = 0;
        self.file = Some(file);
        Ok(())
    }

    fn write_triangle(
        &mut self,
        p1: Vec3,
        p2: Vec3,
        p3: Vec3,
        normal: Vec3,
    ) -> Result<(), MeshIoError> {
        let file = self.file.as_mut().ok_or(MeshIoError::NotStarted)?;
        let w = file.writer();
        match self.encoding {
            MeshEncoding::Binary => {
                if self.triangles >= u32::MAX as u64 {
                    return Err(MeshIoError::TooManyTriangles {
                        max: u32::MAX as u64,
                    });
                }
                write_vec_le(w, normal)?;
                write_vec_le(w, p1)?;
                write_vec_le(w, p2)?;
                write_vec_le(w, p3)?;
                w.write_all(&0u16.to_le_bytes())?;
            }
            MeshEncoding::Ascii => {
                writeln!(
                    w,
                    "  facet normal {:e} {:e} {:e}",
                    normal.x, normal.y, normal.z
                )?;
                writeln!(w, "    outer loop")?;
                for p in [p1, p2, p3] {
                    writeln!(w, "      vertex {:e} {:e} {:e}", p.x, p.y, p.z)?;
                }
                writeln!(w, "    endloop")?;
                writeln!(w, "  endfacet")?;
            }
        }
        self.triangles += 1;
        Ok(())
    }

    fn end_write(&mut self) -> Result<(), MeshIoError> {
        let mut file = self.file.take().ok_or(MeshIoError::NotStarted)?;
        match self.encoding {
            MeshEncoding::Binary => {
                file.patch(HEADER_SIZE as u64, &(self.triangles as u32).to_le_bytes())?
            }
            MeshEncoding::Ascii => writeln!(file.writer(), "endsolid {SOLID_NAME}")?,
        }
        let path = file.commit()?;
        log::debug!("wrote {} triangles to {}", self.triangles, path.display());
        Ok(())
    }

    fn triangles_written(&self) -> u64 {
        self.triangles
    }
}
