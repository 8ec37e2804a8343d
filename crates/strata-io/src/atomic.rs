use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::MeshIoError;

/// Output file that only appears at its destination once committed.
///
/// Data goes to a hidden temporary file next to the destination; `commit`
/// renames it into place. Dropping without committing removes it.
pub struct AtomicFile {
    dest: PathBuf,
    out: BufWriter<NamedTempFile>,
}

impl AtomicFile {
    pub fn create(dest: &Path) -> Result<Self, MeshIoError> {
        let dir = match dest.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let tmp = tempfile::Builder::new()
            .prefix(".strata-")
            .suffix(".part")
            .tempfile_in(dir)?;
        log::debug!(
            "writing {} through {}",
            dest.display(),
            tmp.path().display()
        );
        Ok(Self {
            dest: dest.to_path_buf(),
            out: BufWriter::new(tmp),
        })
    }

    #[inline]
    pub fn writer(&mut self) -> &mut BufWriter<NamedTempFile> {
        &mut self.out
    }

    /// Overwrites bytes at `offset` after everything buffered is flushed.
    pub fn patch(&mut self, offset: u64, bytes: &[u8]) -> Result<(), MeshIoError> {
        self.out.flush()?;
        let file = self.out.get_mut();
        let end = file.stream_position()?;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(bytes)?;
        file.seek(SeekFrom::Start(end))?;
        Ok(())
    }

    pub fn commit(self) -> Result<PathBuf, MeshIoError> {
        let tmp = self
            .out
            .into_inner()
            .map_err(|e| MeshIoError::Io(e.into_error()))?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.dest).map_err(|e| MeshIoError::Persist {
            path: self.dest.clone(),
            source: e.error,
        })?;
        Ok(self.dest)
    }
}
