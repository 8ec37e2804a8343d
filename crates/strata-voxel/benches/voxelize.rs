use criterion::{Criterion, black_box, criterion_group, criterion_main};

use strata_raster::{LayerImage, LayerInfo};
use strata_voxel::{CancelToken, GridGeometry, StageCtl, build_faces, triangulate_all};

/// Disc whose radius shrinks with height, so every layer differs a little.
fn cone(size: usize, layers: usize) -> Vec<LayerImage> {
    let c = size as f32 / 2.0;
    (0..layers)
        .map(|l| {
            let r = c * (1.0 - l as f32 / layers as f32);
            let mut img = LayerImage::new(size, size);
            for y in 0..size {
                for x in 0..size {
                    let (dx, dy) = (x as f32 + 0.5 - c, y as f32 + 0.5 - c);
                    if dx * dx + dy * dy <= r * r {
                        img.set(x, y, true);
                    }
                }
            }
            img
        })
        .collect()
}

fn bench_build_faces(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_faces");
    let images = cone(256, 64);
    let token = CancelToken::new();
    group.bench_function("cone_256x256x64", |b| {
        b.iter(|| {
            let out = build_faces(&images, &StageCtl::silent(&token));
            black_box(out)
        })
    });
    group.finish();
}

fn bench_triangulate(c: &mut Criterion) {
    let mut group = c.benchmark_group("triangulate_all");
    let images = cone(256, 64);
    let token = CancelToken::new();
    let Ok((layers, _)) = build_faces(&images, &StageCtl::silent(&token)) else {
        return;
    };
    let geom = GridGeometry::new(
        0.035,
        0.035,
        (0..images.len())
            .map(|i| LayerInfo {
                position_z: (i + 1) as f32 * 0.05,
                thickness: 0.05,
            })
            .collect(),
    );
    group.bench_function("cone_256x256x64", |b| {
        b.iter(|| black_box(triangulate_all(&layers, &geom)))
    });
    group.finish();
}

criterion_group!(benches, bench_build_faces, bench_triangulate);
criterion_main!(benches);
