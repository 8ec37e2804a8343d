use std::fs::File;
use std::io::{self, BufReader, BufWriter, Seek, SeekFrom, Write};

use hashbrown::HashMap;
use strata_geom::Vec3;

/// Entries kept before the vertex cache starts over.
pub const DEFAULT_VERTEX_CACHE: usize = 1 << 20;

/// Bounded position -> index map. When full it is cleared, so a vertex seen
/// long ago may be written again under a new index.
pub struct VertexCache {
    map: HashMap<[u32; 3], u32>,
    capacity: usize,
}

impl VertexCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            map: HashMap::with_capacity(capacity.min(1 << 16)),
            capacity: capacity.max(1),
        }
    }

    pub fn get(&self, p: Vec3) -> Option<u32> {
        self.map.get(&p.to_bits()).copied()
    }

    pub fn insert(&mut self, p: Vec3, index: u32) {
        if self.map.len() >= self.capacity {
            log::debug!("vertex cache full ({} entries), clearing", self.map.len());
            self.map.clear();
        }
        self.map.insert(p.to_bits(), index);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Vertex and face records of an indexed mesh, spooled to anonymous
/// temporary files until the header counts are known.
pub struct IndexedSpool {
    cache: VertexCache,
    vertices: BufWriter<File>,
    faces: BufWriter<File>,
    vertex_count: u32,
    face_count: u64,
}

impl IndexedSpool {
    pub fn new(cache_capacity: usize) -> io::Result<Self> {
        Ok(Self {
            cache: VertexCache::new(cache_capacity),
            vertices: BufWriter::new(tempfile::tempfile()?),
            faces: BufWriter::new(tempfile::tempfile()?),
            vertex_count: 0,
            face_count: 0,
        })
    }

    /// Index of `p`, writing a new vertex record through `encode` on a cache miss.
    pub fn vertex(
        &mut self,
        p: Vec3,
        encode: impl FnOnce(&mut BufWriter<File>, Vec3) -> io::Result<()>,
    ) -> io::Result<u32> {
        if let Some(i) = self.cache.get(p) {
            return Ok(i);
        }
        let i = self.vertex_count;
        encode(&mut self.vertices, p)?;
        self.vertex_count += 1;
        self.cache.insert(p, i);
        Ok(i)
    }

    pub fn face(
        &mut self,
        encode: impl FnOnce(&mut BufWriter<File>) -> io::Result<()>,
    ) -> io::Result<()> {
        encode(&mut self.faces)?;
        self.face_count += 1;
        Ok(())
    }

    #[inline]
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    #[inline]
    pub fn face_count(&self) -> u64 {
        self.face_count
    }

    /// Appends all vertex records, then all face records, to `out`.
    pub fn drain_into(self, out: &mut impl Write) -> io::Result<()> {
        self.drain_split_into(out, b"")
    }

    /// Like `drain_into`, with `between` written after the last vertex record.
    pub fn drain_split_into(self, out: &mut impl Write, between: &[u8]) -> io::Result<()> {
        let [vertices, faces] = [self.vertices, self.faces].map(|s| s.into_inner());
        let mut vertices = vertices.map_err(|e| e.into_error())?;
        let mut faces = faces.map_err(|e| e.into_error())?;
        vertices.seek(SeekFrom::Start(0))?;
        io::copy(&mut BufReader::new(vertices), out)?;
        out.write_all(between)?;
        faces.seek(SeekFrom::Start(0))?;
        io::copy(&mut BufReader::new(faces), out)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_dedups_and_clears_when_full() {
        let mut c = VertexCache::new(2);
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(1.0, 0.0, 0.0);
        c.insert(a, 0);
        c.insert(b, 1);
        assert_eq!(c.get(a), Some(0));
        assert_eq!(c.get(Vec3::new(-0.0, 0.0, 0.0)), Some(0));
        c.insert(Vec3::new(2.0, 0.0, 0.0), 2);
        assert_eq!(c.len(), 1);
        assert_eq!(c.get(a), None);
    }

    #[test]
    fn spool_writes_vertices_before_faces() {
        let mut s = IndexedSpool::new(16).unwrap();
        let enc = |w: &mut BufWriter<File>, p: Vec3| writeln!(w, "v {}", p.x);
        let i0 = s.vertex(Vec3::new(1.0, 0.0, 0.0), enc).unwrap();
        let i1 = s.vertex(Vec3::new(2.0, 0.0, 0.0), enc).unwrap();
        let again = s.vertex(Vec3::new(1.0, 0.0, 0.0), enc).unwrap();
        assert_eq!((i0, i1, again), (0, 1, 0));
        s.face(|w| writeln!(w, "f {i0} {i1}")).unwrap();
        assert_eq!(s.vertex_count(), 2);
        assert_eq!(s.face_count(), 1);
        let mut out = Vec::new();
        s.drain_into(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "v 1\nv 2\nf 0 1\n");
    }

    #[test]
    fn split_drain_puts_separator_between_sections() {
        let mut s = IndexedSpool::new(16).unwrap();
        let i = s.vertex(Vec3::new(3.0, 0.0, 0.0), |w, p| writeln!(w, "{}", p.x)).unwrap();
        s.face(|w| writeln!(w, "[{i}]")).unwrap();
        let mut out = Vec::new();
        s.drain_split_into(&mut out, b"--\n").unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "3\n--\n[0]\n");
    }
}
