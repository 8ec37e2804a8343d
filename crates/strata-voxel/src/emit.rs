use strata_geom::{GridRect, Vec3};
use strata_raster::LayerInfo;

use crate::face::Orientation;
use crate::uvface::{UvFace, resolve};

/// Maps grid coordinates to world space.
#[derive(Clone, Debug, PartialEq)]
pub struct GridGeometry {
    /// World size of one grid cell along X (pixel size times quality).
    pub cell_x: f32,
    pub cell_y: f32,
    /// Z placement of every distinct-Z layer.
    pub layers: Vec<LayerInfo>,
}

impl GridGeometry {
    pub fn new(cell_x: f32, cell_y: f32, layers: Vec<LayerInfo>) -> Self {
        Self {
            cell_x,
            cell_y,
            layers,
        }
    }

    #[inline]
    fn x(&self, gx: u32) -> f32 {
        gx as f32 * self.cell_x
    }

    #[inline]
    fn y(&self, gy: u32) -> f32 {
        gy as f32 * self.cell_y
    }

    #[inline]
    fn bottom(&self, layer: u32) -> f32 {
        self.layers
            .get(layer as usize)
            .map(LayerInfo::bottom)
            .unwrap_or(0.0)
    }

    #[inline]
    fn top(&self, layer: u32) -> f32 {
        self.layers
            .get(layer as usize)
            .map(LayerInfo::top)
            .unwrap_or(0.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Triangle {
    pub a: Vec3,
    pub b: Vec3,
    pub c: Vec3,
    pub normal: Vec3,
}

impl Triangle {
    /// Normal implied by the vertex order (not normalized).
    #[inline]
    pub fn winding_normal(&self) -> Vec3 {
        (self.b - self.a).cross(self.c - self.a)
    }
}

/// Grid extent of a root face together with its whole child chain.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FaceExtent {
    pub orientation: Orientation,
    pub rect: GridRect,
    /// First and last layer spanned (equal for top/bottom faces).
    pub first_layer: u32,
    pub last_layer: u32,
}

/// Iterates a face followed by its children.
pub fn walk_chain<'a>(
    layers: &'a [Vec<UvFace>],
    root: &'a UvFace,
) -> impl Iterator<Item = &'a UvFace> + 'a {
    std::iter::successors(Some(root), move |f| f.child.and_then(|c| resolve(layers, c)))
}

pub fn root_extent(layers: &[Vec<UvFace>], root: &UvFace) -> FaceExtent {
    let mut rect = root.rect;
    let mut last_layer = root.layer;
    for f in walk_chain(layers, root).skip(1) {
        rect = rect.union(&f.rect);
        last_layer = last_layer.max(f.layer);
    }
    FaceExtent {
        orientation: root.orientation,
        rect,
        first_layer: root.layer,
        last_layer,
    }
}

/// World-space corners of an extent in perimeter order. Winding is fixed
/// later by [`triangulate_quad`].
pub fn extent_quad(geom: &GridGeometry, e: &FaceExtent) -> [Vec3; 4] {
    let r = e.rect;
    let (x0, x1) = (geom.x(r.x), geom.x(r.right()));
    let (y0, y1) = (geom.y(r.y), geom.y(r.bottom()));
    let (z0, z1) = (geom.bottom(e.first_layer), geom.top(e.last_layer));
    match e.orientation {
        Orientation::Top | Orientation::Bottom => {
            let z = if e.orientation == Orientation::Top {
                z1
            } else {
                z0
            };
            [
                Vec3::new(x0, y0, z),
                Vec3::new(x1, y0, z),
                Vec3::new(x1, y1, z),
                Vec3::new(x0, y1, z),
            ]
        }
        Orientation::Front | Orientation::Back => {
            let y = if e.orientation == Orientation::Front {
                y0
            } else {
                y1
            };
            [
                Vec3::new(x0, y, z0),
                Vec3::new(x1, y, z0),
                Vec3::new(x1, y, z1),
                Vec3::new(x0, y, z1),
            ]
        }
        Orientation::Left | Orientation::Right => {
            let x = if e.orientation == Orientation::Left {
                x0
            } else {
                x1
            };
            [
                Vec3::new(x, y0, z0),
                Vec3::new(x, y1, z0),
                Vec3::new(x, y1, z1),
                Vec3::new(x, y0, z1),
            ]
        }
    }
}

/// Splits a quad into two triangles facing along `n`. The vertex order is
/// flipped when the quad winds the other way.
pub fn triangulate_quad(q: [Vec3; 4], n: Vec3) -> [Triangle; 2] {
    let mut vs = q;
    if (vs[1] - vs[0]).cross(vs[2] - vs[0]).dot(n) < 0.0 {
        vs.swap(1, 3);
    }
    [
        Triangle {
            a: vs[0],
            b: vs[1],
            c: vs[2],
            normal: n,
        },
        Triangle {
            a: vs[0],
            b: vs[2],
            c: vs[3],
            normal: n,
        },
    ]
}

/// Triangles of every root face on `layer`.
pub fn triangulate_layer(
    layers: &[Vec<UvFace>],
    layer: usize,
    geom: &GridGeometry,
) -> Vec<Triangle> {
    let Some(faces) = layers.get(layer) else {
        return Vec::new();
    };
    let mut out = Vec::with_capacity(faces.len() * 2);
    for face in faces.iter().filter(|f| f.is_root()) {
        let extent = root_extent(layers, face);
        let quad = extent_quad(geom, &extent);
        out.extend(triangulate_quad(quad, face.orientation.normal()));
    }
    out
}
