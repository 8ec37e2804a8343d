use strata_geom::GridRect;

use crate::face::Orientation;

/// Handle to a face: layer index plus position in that layer's face list.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct FaceRef {
    pub layer: u32,
    pub slot: u32,
}

impl FaceRef {
    #[inline]
    pub fn new(layer: usize, slot: usize) -> Self {
        Self {
            layer: layer as u32,
            slot: slot as u32,
        }
    }
}

/// Exposed face rectangle on one layer.
///
/// `parent` points at the face this one continues; faces with a parent are
/// never emitted on their own. `child` points the other way. Z extent comes
/// from the layer's `LayerInfo` in `GridGeometry`, not from the face.
#[derive(Clone, Debug, PartialEq)]
pub struct UvFace {
    pub layer: u32,
    pub orientation: Orientation,
    pub rect: GridRect,
    pub parent: Option<FaceRef>,
    pub child: Option<FaceRef>,
}

impl UvFace {
    pub fn new(layer: usize, orientation: Orientation, rect: GridRect) -> Self {
        Self {
            layer: layer as u32,
            orientation,
            rect,
            parent: None,
            child: None,
        }
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Face list of every distinct-Z layer, indexed by layer.
pub type LayerFaces = Vec<Vec<UvFace>>;

/// Looks up a face by handle.
#[inline]
pub fn resolve(layers: &[Vec<UvFace>], r: FaceRef) -> Option<&UvFace> {
    layers.get(r.layer as usize)?.get(r.slot as usize)
}
