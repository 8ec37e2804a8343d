use strata_geom::GridRect;

use crate::extract::LayerPoints;
use crate::face::{Orientation, RunAxis};
use crate::uvface::UvFace;

/// Merges same-orientation rectangles of one layer into maximal runs.
///
/// Runs grow along X (rows) or Y (columns) depending on `axis`. Input order
/// does not matter; already merged runs pass through unchanged.
pub fn merge_runs(axis: RunAxis, mut rects: Vec<GridRect>) -> Vec<GridRect> {
    match axis {
        RunAxis::X => rects.sort_unstable_by_key(|r| (r.y, r.x)),
        RunAxis::Y => rects.sort_unstable_by_key(|r| (r.x, r.y)),
    }
    rects.dedup();

    let mut out: Vec<GridRect> = Vec::with_capacity(rects.len());
    let mut iter = rects.into_iter();
    let Some(mut run) = iter.next() else {
        return out;
    };
    for r in iter {
        let extends = match axis {
            RunAxis::X => r.y == run.y && r.h == run.h && r.x == run.right(),
            RunAxis::Y => r.x == run.x && r.w == run.w && r.y == run.bottom(),
        };
        if extends {
            match axis {
                RunAxis::X => run.w += r.w,
                RunAxis::Y => run.h += r.h,
            }
        } else {
            out.push(run);
            run = r;
        }
    }
    out.push(run);
    out
}

/// Turns the exposed cells of a layer into run faces, orientation by orientation.
pub fn merge_layer(layer: usize, points: &LayerPoints) -> Vec<UvFace> {
    let mut faces = Vec::new();
    for o in Orientation::ALL {
        let cells = points.get(o);
        if cells.is_empty() {
            continue;
        }
        let rects = cells.iter().map(|&(x, y)| GridRect::cell(x, y)).collect();
        faces.extend(
            merge_runs(o.run_axis(), rects)
                .into_iter()
                .map(|rect| UvFace::new(layer, o, rect)),
        );
    }
    faces
}
