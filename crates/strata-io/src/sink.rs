use strata_geom::Vec3;

use crate::error::MeshIoError;

/// Streaming triangle consumer.
///
/// Call order is `begin_write`, any number of `write_triangle`, `end_write`.
/// Nothing appears at the destination path before `end_write` succeeds.
pub trait MeshSink {
    fn begin_write(&mut self) -> Result<(), MeshIoError>;

    fn write_triangle(
        &mut self,
        p1: Vec3,
        p2: Vec3,
        p3: Vec3,
        normal: Vec3,
    ) -> Result<(), MeshIoError>;

    fn end_write(&mut self) -> Result<(), MeshIoError>;

    fn triangles_written(&self) -> u64;
}
