//! Vertical face collapsing.
//!
//! A lateral run that repeats unchanged on the layer below continues that
//! face instead of starting its own; a top/bottom run that repeats on the
//! previous row of its own layer does the same inside the layer plane.
//! Linking happens in three passes: index every layer, compute all links with
//! read-only lookups, then write each layer's links from that layer's task.

use hashbrown::HashMap;
use rayon::prelude::*;

use crate::control::{Cancelled, StageCtl};
use crate::face::Orientation;
use crate::uvface::{FaceRef, UvFace};

/// Spatial key of a run face: orientation plus its min corner.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct FaceKey {
    pub orientation: Orientation,
    pub x: u32,
    pub y: u32,
}

impl FaceKey {
    #[inline]
    pub fn of(face: &UvFace) -> Self {
        Self {
            orientation: face.orientation,
            x: face.rect.x,
            y: face.rect.y,
        }
    }
}

/// Read-only lookup from [`FaceKey`] to slot within one layer's face list.
#[derive(Clone, Debug, Default)]
pub struct LayerFaceIndex {
    slots: HashMap<FaceKey, u32>,
}

impl LayerFaceIndex {
    pub fn build(faces: &[UvFace]) -> Self {
        let mut slots = HashMap::with_capacity(faces.len());
        for (slot, face) in faces.iter().enumerate() {
            slots.insert(FaceKey::of(face), slot as u32);
        }
        Self { slots }
    }

    #[inline]
    pub fn get(&self, key: &FaceKey) -> Option<u32> {
        self.slots.get(key).copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Where a face looks for the face it may continue: the previous layer at
/// the same corner for lateral faces, the previous row of the same layer for
/// top/bottom faces.
pub fn collapse_target(face: &UvFace) -> Option<(usize, FaceKey)> {
    let layer = face.layer as usize;
    let key = FaceKey::of(face);
    if face.orientation.is_lateral() {
        let below = layer.checked_sub(1)?;
        Some((below, key))
    } else {
        let y = face.rect.y.checked_sub(1)?;
        Some((layer, FaceKey { y, ..key }))
    }
}

fn find_parent(
    layers: &[Vec<UvFace>],
    indices: &[LayerFaceIndex],
    face: &UvFace,
) -> Option<FaceRef> {
    let (target, key) = collapse_target(face)?;
    let slot = indices.get(target)?.get(&key)?;
    let candidate = layers.get(target)?.get(slot as usize)?;
    candidate
        .rect
        .same_size(&face.rect)
        .then(|| FaceRef::new(target, slot as usize))
}

/// Links every face to the face it continues. Returns the number of links.
///
/// Expects freshly merged faces with no links set.
pub fn link_layers(layers: &mut [Vec<UvFace>], ctl: &StageCtl<'_>) -> Result<usize, Cancelled> {
    ctl.checkpoint()?;
    let indices: Vec<LayerFaceIndex> = layers
        .par_iter()
        .map(|faces| LayerFaceIndex::build(faces))
        .collect();

    let links: Vec<Vec<Option<FaceRef>>> = {
        let shared: &[Vec<UvFace>] = layers;
        shared
            .par_iter()
            .map(|faces| -> Result<Vec<Option<FaceRef>>, Cancelled> {
                ctl.checkpoint()?;
                Ok(faces
                    .iter()
                    .map(|f| find_parent(shared, &indices, f))
                    .collect())
            })
            .collect::<Result<_, Cancelled>>()?
    };
    drop(indices);

    let total = layers
        .par_iter_mut()
        .enumerate()
        .map(|(l, faces)| -> Result<usize, Cancelled> {
            ctl.checkpoint()?;
            let mut count = 0usize;
            for (slot, parent) in links[l].iter().enumerate() {
                if let Some(p) = parent {
                    faces[slot].parent = Some(*p);
                    count += 1;
                }
            }
            // children on this layer: same-layer links plus links from the layer above
            let same_layer = links[l].iter().enumerate().map(|(s, p)| (l, s, *p));
            let upper = links
                .get(l + 1)
                .into_iter()
                .flat_map(|v| v.iter().enumerate().map(move |(s, p)| (l + 1, s, *p)));
            for (child_layer, child_slot, parent) in same_layer.chain(upper) {
                let Some(p) = parent.filter(|p| p.layer as usize == l) else {
                    continue;
                };
                let target = &mut faces[p.slot as usize];
                debug_assert!(target.child.is_none());
                target.child = Some(FaceRef::new(child_layer, child_slot));
            }
            ctl.layer_done(l);
            Ok(count)
        })
        .try_reduce(|| 0, |a, b| Ok(a + b))?;

    #[cfg(debug_assertions)]
    assert_links_descend(layers);

    log::debug!("collapsed {total} faces into parent chains");
    Ok(total)
}

/// Every link points to a strictly lower (layer, row) position, so chains
/// cannot cycle.
#[cfg(debug_assertions)]
fn assert_links_descend(layers: &[Vec<UvFace>]) {
    for faces in layers {
        for f in faces {
            if let Some(p) = f.parent {
                let parent = &layers[p.layer as usize][p.slot as usize];
                debug_assert_eq!(parent.orientation, f.orientation);
                debug_assert!(parent.rect.same_size(&f.rect));
                debug_assert!((parent.layer, parent.rect.y) < (f.layer, f.rect.y));
            }
        }
    }
}
