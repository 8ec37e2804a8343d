//! Voxel layer meshing: exposed-face extraction, run merging, vertical
//! collapsing and triangulation.
#![forbid(unsafe_code)]

pub mod collapse;
pub mod control;
pub mod emit;
pub mod extract;
pub mod face;
pub mod merge;
pub mod uvface;

use rayon::prelude::*;
use strata_raster::LayerImage;

pub use collapse::{FaceKey, LayerFaceIndex, collapse_target, link_layers};
pub use control::{CancelToken, Cancelled, StageCtl};
pub use emit::{
    FaceExtent, GridGeometry, Triangle, extent_quad, root_extent, triangulate_layer,
    triangulate_quad, walk_chain,
};
pub use extract::{LayerPoints, extract_layer_points, open_faces};
pub use face::{FaceSet, Orientation, RunAxis};
pub use merge::{merge_layer, merge_runs};
pub use uvface::{FaceRef, LayerFaces, UvFace, resolve};

/// Face counts after each stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FaceStats {
    /// Exposed voxel faces before merging.
    pub raw_faces: usize,
    /// Faces after run merging.
    pub run_faces: usize,
    /// Faces left without a parent after collapsing.
    pub root_faces: usize,
    pub links: usize,
}

impl FaceStats {
    pub fn count_roots(layers: &[Vec<UvFace>]) -> usize {
        layers
            .iter()
            .map(|faces| faces.iter().filter(|f| f.is_root()).count())
            .sum()
    }
}

/// Extracts and merges the faces of one layer.
pub fn layer_faces(
    layer: usize,
    current: &LayerImage,
    below: Option<&LayerImage>,
    above: Option<&LayerImage>,
) -> (Vec<UvFace>, usize) {
    let points = extract_layer_points(current, below, above);
    let raw = points.total();
    (merge_layer(layer, &points), raw)
}

/// Runs extraction, merging and collapsing over a stack held in memory.
pub fn build_faces(
    images: &[LayerImage],
    ctl: &StageCtl<'_>,
) -> Result<(LayerFaces, FaceStats), Cancelled> {
    let per_layer: Vec<(Vec<UvFace>, usize)> = images
        .par_iter()
        .enumerate()
        .map(|(l, current)| -> Result<_, Cancelled> {
            ctl.checkpoint()?;
            let below = l.checked_sub(1).and_then(|i| images.get(i));
            let above = images.get(l + 1);
            Ok(layer_faces(l, current, below, above))
        })
        .collect::<Result<_, Cancelled>>()?;

    let mut stats = FaceStats::default();
    let mut layers: LayerFaces = Vec::with_capacity(per_layer.len());
    for (faces, raw) in per_layer {
        stats.raw_faces += raw;
        stats.run_faces += faces.len();
        layers.push(faces);
    }
    stats.links = link_layers(&mut layers, ctl)?;
    stats.root_faces = FaceStats::count_roots(&layers);
    Ok((layers, stats))
}

/// Triangulates every layer in order.
pub fn triangulate_all(layers: &[Vec<UvFace>], geom: &GridGeometry) -> Vec<Triangle> {
    (0..layers.len())
        .flat_map(|l| triangulate_layer(layers, l, geom))
        .collect()
}
