mod common;

use strata_raster::{LayerImage, LayerInfo};
use strata_voxel::{
    CancelToken, GridGeometry, Orientation, StageCtl, build_faces, extent_quad, root_extent,
    triangulate_all,
};

use common::{build, roots_by_orientation};

#[test]
fn stacked_squares_share_lateral_faces() {
    let sq = LayerImage::from_ascii(&["##", "##"]);
    let (layers, stats) = build(&[sq.clone(), sq]);
    let roots = roots_by_orientation(&layers);
    for o in Orientation::ALL {
        assert_eq!(roots.get(&o), Some(&1), "{o:?}");
    }
    let left = layers
        .iter()
        .flatten()
        .find(|f| f.orientation == Orientation::Left && f.is_root())
        .unwrap();
    assert_eq!(left.layer, 0);
    assert!(left.child.is_some());
    let top = layers
        .iter()
        .flatten()
        .find(|f| f.orientation == Orientation::Top && f.is_root())
        .unwrap();
    assert_eq!(top.layer, 1);
    let bottom = layers
        .iter()
        .flatten()
        .find(|f| f.orientation == Orientation::Bottom && f.is_root())
        .unwrap();
    assert_eq!(bottom.layer, 0);
    assert_eq!(stats.root_faces, 6);
}

#[test]
fn isolated_pixel_emits_six_unit_faces() {
    let img = LayerImage::from_ascii(&["...", ".#.", "..."]);
    let (layers, stats) = build(&[img]);
    assert_eq!(stats.root_faces, 6);
    assert_eq!(stats.raw_faces, 6);
    for f in layers.iter().flatten() {
        assert_eq!((f.rect.w, f.rect.h), (1, 1));
    }
    let geom = GridGeometry::new(
        1.0,
        1.0,
        vec![LayerInfo {
            position_z: 1.0,
            thickness: 1.0,
        }],
    );
    assert_eq!(triangulate_all(&layers, &geom).len(), 12);
}

#[test]
fn z_follows_each_layer_thickness() {
    let wide = LayerImage::from_ascii(&["##"]);
    let narrow = LayerImage::from_ascii(&["#."]);
    let images = [wide, narrow];
    let token = CancelToken::new();
    let (layers, _) = build_faces(&images, &StageCtl::silent(&token)).unwrap();
    let geom = GridGeometry::new(
        0.05,
        0.05,
        vec![
            LayerInfo {
                position_z: 0.05,
                thickness: 0.05,
            },
            LayerInfo {
                position_z: 0.15,
                thickness: 0.1,
            },
        ],
    );
    let tris = triangulate_all(&layers, &geom);
    let mut zs: Vec<f32> = tris.iter().flat_map(|t| [t.a.z, t.b.z, t.c.z]).collect();
    zs.sort_by(f32::total_cmp);
    zs.dedup_by(|a, b| (*a - *b).abs() < 1e-6);
    assert_eq!(zs.len(), 3);
    assert!((zs[0] - 0.0).abs() < 1e-6);
    assert!((zs[1] - 0.05).abs() < 1e-6);
    assert!((zs[2] - 0.15).abs() < 1e-6);

    // the front run of layer 1 is narrower, so it spans only its own layer
    let front1 = layers[1]
        .iter()
        .find(|f| f.orientation == Orientation::Front)
        .unwrap();
    assert!(front1.is_root());
    let q = extent_quad(&geom, &root_extent(&layers, front1));
    assert!(q.iter().all(|v| v.z > 0.05 - 1e-6 && v.z < 0.15 + 1e-6));
}

#[test]
fn identical_layers_with_different_thickness_chain_across_both() {
    let px = LayerImage::from_ascii(&["#"]);
    let token = CancelToken::new();
    let (layers, _) = build_faces(&[px.clone(), px], &StageCtl::silent(&token)).unwrap();
    let geom = GridGeometry::new(
        1.0,
        1.0,
        vec![
            LayerInfo {
                position_z: 0.05,
                thickness: 0.05,
            },
            LayerInfo {
                position_z: 0.25,
                thickness: 0.2,
            },
        ],
    );
    let tris = triangulate_all(&layers, &geom);
    // 4 lateral chains + top + bottom
    assert_eq!(tris.len(), 12);
    for t in tris.iter().filter(|t| t.normal.z == 0.0) {
        let (lo, hi) = [t.a.z, t.b.z, t.c.z]
            .into_iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), z| (lo.min(z), hi.max(z)));
        assert!(lo.abs() < 1e-6);
        assert!((hi - 0.25).abs() < 1e-6);
    }
}

#[test]
fn empty_stack_yields_nothing() {
    let blank = LayerImage::new(4, 4);
    let (layers, stats) = build(&[blank.clone(), blank]);
    assert_eq!(stats.raw_faces, 0);
    assert!(layers.iter().all(Vec::is_empty));
}
