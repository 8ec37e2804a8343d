#![allow(dead_code)]

use hashbrown::HashMap;
use proptest::prelude::*;
use strata_raster::LayerImage;
use strata_voxel::{
    CancelToken, FaceStats, LayerFaces, Orientation, StageCtl, build_faces, open_faces, walk_chain,
};

pub type Cell = (u32, Orientation, u32, u32);

/// Small random stacks: 1..=4 layers of one shared size up to 6x6.
pub fn stack() -> impl Strategy<Value = Vec<LayerImage>> {
    (1usize..=6, 1usize..=6, 1usize..=4).prop_flat_map(|(w, h, n)| {
        proptest::collection::vec(proptest::collection::vec(any::<bool>(), w * h), n).prop_map(
            move |layers| {
                layers
                    .into_iter()
                    .map(|bits| {
                        let mut img = LayerImage::new(w, h);
                        for (i, b) in bits.into_iter().enumerate() {
                            img.set(i % w, i / w, b);
                        }
                        img
                    })
                    .collect()
            },
        )
    })
}

pub fn build(images: &[LayerImage]) -> (LayerFaces, FaceStats) {
    let token = CancelToken::new();
    build_faces(images, &StageCtl::silent(&token)).expect("not cancelled")
}

/// Every exposed voxel face as (layer, orientation, x, y).
pub fn exposed_cells(images: &[LayerImage]) -> Vec<Cell> {
    let mut out = Vec::new();
    for (l, cur) in images.iter().enumerate() {
        let below = l.checked_sub(1).map(|i| &images[i]);
        let above = images.get(l + 1);
        for y in 0..cur.height() {
            for x in 0..cur.width() {
                for o in open_faces(cur, below, above, x, y).iter() {
                    out.push((l as u32, o, x as u32, y as u32));
                }
            }
        }
    }
    out.sort();
    out
}

/// Voxel faces covered by the emitted (root) faces, chains expanded.
/// Duplicates are kept so double coverage shows up.
pub fn covered_cells(layers: &LayerFaces) -> Vec<Cell> {
    let mut out = Vec::new();
    for faces in layers {
        for root in faces.iter().filter(|f| f.is_root()) {
            for f in walk_chain(layers, root) {
                for (x, y) in f.rect.cells() {
                    out.push((f.layer, f.orientation, x, y));
                }
            }
        }
    }
    out.sort();
    out
}

pub fn roots_by_orientation(layers: &LayerFaces) -> HashMap<Orientation, usize> {
    let mut m = HashMap::new();
    for f in layers.iter().flatten().filter(|f| f.is_root()) {
        *m.entry(f.orientation).or_insert(0) += 1;
    }
    m
}
