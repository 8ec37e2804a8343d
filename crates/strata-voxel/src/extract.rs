use rayon::prelude::*;
use strata_raster::LayerImage;

use crate::face::{FaceSet, Orientation};

/// Exposed faces of voxel `(x, y)` in `current`. A face is exposed when its
/// neighbor is background, lies outside the grid or belongs to a missing layer.
pub fn open_faces(
    current: &LayerImage,
    below: Option<&LayerImage>,
    above: Option<&LayerImage>,
    x: usize,
    y: usize,
) -> FaceSet {
    let mut set = FaceSet::EMPTY;
    if !current.get(x, y) {
        return set;
    }
    let (xi, yi) = (x as i64, y as i64);
    for o in Orientation::ALL {
        let (dx, dy, dz) = o.delta();
        let covered = match dz {
            0 => current.is_solid(xi + dx as i64, yi + dy as i64),
            1 => above.is_some_and(|img| img.is_solid(xi, yi)),
            _ => below.is_some_and(|img| img.is_solid(xi, yi)),
        };
        if !covered {
            set.insert(o);
        }
    }
    set
}

/// Exposed voxel cells of one layer, grouped by orientation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LayerPoints {
    pub points: [Vec<(u32, u32)>; 6],
}

impl LayerPoints {
    #[inline]
    pub fn get(&self, o: Orientation) -> &[(u32, u32)] {
        &self.points[o.index()]
    }

    pub fn total(&self) -> usize {
        self.points.iter().map(Vec::len).sum()
    }

    fn append(mut self, mut other: LayerPoints) -> LayerPoints {
        for (dst, src) in self.points.iter_mut().zip(other.points.iter_mut()) {
            dst.append(src);
        }
        self
    }
}

/// Collects the exposed cells of a layer. Rows are scanned in parallel and
/// folded into per-task point lists, which are concatenated once at the end.
pub fn extract_layer_points(
    current: &LayerImage,
    below: Option<&LayerImage>,
    above: Option<&LayerImage>,
) -> LayerPoints {
    (0..current.height())
        .into_par_iter()
        .filter(|&y| current.row_has_foreground(y))
        .fold(LayerPoints::default, |mut acc, y| {
            for x in 0..current.width() {
                for o in open_faces(current, below, above, x, y).iter() {
                    acc.points[o.index()].push((x as u32, y as u32));
                }
            }
            acc
        })
        .reduce(LayerPoints::default, LayerPoints::append)
}
