use strata_geom::GridRect;

use crate::error::RasterError;
use crate::image::GrayImage;

/// Pixel pitch used when a stack reports none.
pub const DEFAULT_PIXEL_SIZE_MM: f32 = 0.035;
/// Raw layers closer than this in Z share one distinct-Z layer.
pub const Z_EPSILON: f32 = 1e-4;

/// Physical placement of a distinct-Z layer. The layer occupies
/// `[position_z - thickness, position_z]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayerInfo {
    pub position_z: f32,
    pub thickness: f32,
}

impl LayerInfo {
    #[inline]
    pub fn bottom(&self) -> f32 {
        self.position_z - self.thickness
    }

    #[inline]
    pub fn top(&self) -> f32 {
        self.position_z
    }
}

/// Physical size of one raster pixel in millimetres.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PixelSize {
    pub x: f32,
    pub y: f32,
}

impl Default for PixelSize {
    fn default() -> Self {
        Self {
            x: DEFAULT_PIXEL_SIZE_MM,
            y: DEFAULT_PIXEL_SIZE_MM,
        }
    }
}

impl PixelSize {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Non-positive components fall back to [`DEFAULT_PIXEL_SIZE_MM`].
    pub fn effective(self) -> Self {
        let fix = |v: f32| {
            if v > 0.0 && v.is_finite() {
                v
            } else {
                DEFAULT_PIXEL_SIZE_MM
            }
        };
        Self {
            x: fix(self.x),
            y: fix(self.y),
        }
    }
}

/// Metadata of one layer as it comes from the slicer, before Z grouping.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RawLayer {
    pub position_z: f32,
    pub thickness: Option<f32>,
}

impl RawLayer {
    pub fn new(position_z: f32, thickness: Option<f32>) -> Self {
        Self {
            position_z,
            thickness,
        }
    }
}

/// Raw layers sharing one Z position.
#[derive(Clone, Debug, PartialEq)]
pub struct ZGroup {
    pub info: LayerInfo,
    /// Indices into the raw layer list, ascending.
    pub members: Vec<usize>,
}

/// Folds raw layers with equal Z into distinct-Z groups.
///
/// Z must be non-decreasing. A group's thickness is the largest explicit
/// member thickness; without one it is the distance to the previous group
/// (the first group uses its own Z, or the spacing to the next group when
/// it sits at zero).
pub fn group_by_z(raw: &[RawLayer]) -> Result<Vec<ZGroup>, RasterError> {
    let mut groups: Vec<(f32, Option<f32>, Vec<usize>)> = Vec::new();
    let mut prev_z: Option<f32> = None;
    for (index, layer) in raw.iter().enumerate() {
        let z = layer.position_z;
        if let Some(prev) = prev_z {
            if z < prev - Z_EPSILON {
                return Err(RasterError::UnorderedLayers { index, z, prev });
            }
        }
        prev_z = Some(z);
        let explicit = layer.thickness.filter(|t| *t > 0.0);
        let same_z = groups
            .last()
            .is_some_and(|(gz, _, _)| (z - gz).abs() <= Z_EPSILON);
        if !same_z {
            groups.push((z, explicit, vec![index]));
        } else if let Some((_, thick, members)) = groups.last_mut() {
            members.push(index);
            *thick = match (*thick, explicit) {
                (Some(a), Some(b)) => Some(a.max(b)),
                (a, b) => a.or(b),
            };
        }
    }

    let zs: Vec<f32> = groups.iter().map(|g| g.0).collect();
    let out = groups
        .into_iter()
        .enumerate()
        .map(|(i, (z, thick, members))| {
            let thickness = thick.unwrap_or_else(|| {
                let derived = if i == 0 { z } else { z - zs[i - 1] };
                if derived > 0.0 {
                    derived
                } else {
                    zs.get(i + 1).map(|next| next - z).unwrap_or(0.0)
                }
            });
            if thickness <= 0.0 {
                log::warn!("layer group at z={z} has no usable thickness");
            }
            ZGroup {
                info: LayerInfo {
                    position_z: z,
                    thickness,
                },
                members,
            }
        })
        .collect();
    Ok(out)
}

/// Ordered access to distinct-Z layers of a sliced model.
///
/// Layer indices run over distinct Z positions; raw layers sharing a Z are
/// already folded together by the provider.
pub trait LayerStack: Send + Sync {
    fn layer_count(&self) -> usize;

    fn layer_info(&self, index: usize) -> Result<LayerInfo, RasterError>;

    /// Decodes the (merged) image of one layer.
    fn load_layer(&self, index: usize) -> Result<GrayImage, RasterError>;

    fn pixel_size(&self) -> PixelSize;

    /// Model bounding rectangle in raster pixels, when known.
    fn bounds(&self) -> Option<GridRect> {
        None
    }
}

/// Layer stack held fully in memory.
#[derive(Clone, Debug)]
pub struct MemoryStack {
    pixel_size: PixelSize,
    bounds: Option<GridRect>,
    infos: Vec<LayerInfo>,
    images: Vec<GrayImage>,
}

impl MemoryStack {
    /// Groups the raw layers by Z and merges images that share a position.
    pub fn new(
        pixel_size: PixelSize,
        layers: Vec<(RawLayer, GrayImage)>,
    ) -> Result<Self, RasterError> {
        let raw: Vec<RawLayer> = layers.iter().map(|(r, _)| *r).collect();
        let groups = group_by_z(&raw)?;
        let mut slots: Vec<Option<GrayImage>> = layers.into_iter().map(|(_, g)| Some(g)).collect();
        let mut infos = Vec::with_capacity(groups.len());
        let mut images = Vec::with_capacity(groups.len());
        for group in groups {
            let mut merged: Option<GrayImage> = None;
            for &m in &group.members {
                let Some(img) = slots[m].take() else { continue };
                match merged.as_mut() {
                    Some(acc) => acc.merge_max(&img)?,
                    None => merged = Some(img),
                }
            }
            if let Some(img) = merged {
                infos.push(group.info);
                images.push(img);
            }
        }
        Ok(Self {
            pixel_size,
            bounds: None,
            infos,
            images,
        })
    }

    /// Evenly spaced layers: layer `i` sits at `(i + 1) * layer_height`.
    pub fn uniform(
        pixel_size: PixelSize,
        layer_height: f32,
        images: Vec<GrayImage>,
    ) -> Result<Self, RasterError> {
        let layers = images
            .into_iter()
            .enumerate()
            .map(|(i, img)| {
                (
                    RawLayer::new((i + 1) as f32 * layer_height, Some(layer_height)),
                    img,
                )
            })
            .collect();
        Self::new(pixel_size, layers)
    }

    pub fn with_bounds(mut self, bounds: GridRect) -> Self {
        self.bounds = Some(bounds);
        self
    }
}

impl LayerStack for MemoryStack {
    fn layer_count(&self) -> usize {
        self.infos.len()
    }

    fn layer_info(&self, index: usize) -> Result<LayerInfo, RasterError> {
        self.infos
            .get(index)
            .copied()
            .ok_or(RasterError::LayerOutOfRange {
                index,
                count: self.infos.len(),
            })
    }

    fn load_layer(&self, index: usize) -> Result<GrayImage, RasterError> {
        self.images
            .get(index)
            .cloned()
            .ok_or(RasterError::LayerOutOfRange {
                index,
                count: self.images.len(),
            })
    }

    fn pixel_size(&self) -> PixelSize {
        self.pixel_size
    }

    fn bounds(&self) -> Option<GridRect> {
        self.bounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_equal_z_and_keeps_thickest() {
        let raw = [
            RawLayer::new(0.05, Some(0.05)),
            RawLayer::new(0.10, Some(0.05)),
            RawLayer::new(0.10, Some(0.08)),
            RawLayer::new(0.15, None),
        ];
        let groups = group_by_z(&raw).unwrap();
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[1].members, vec![1, 2]);
        assert!((groups[1].info.thickness - 0.08).abs() < 1e-6);
        assert!((groups[2].info.thickness - 0.05).abs() < 1e-6);
    }

    #[test]
    fn first_layer_at_zero_uses_next_spacing() {
        let raw = [RawLayer::new(0.0, None), RawLayer::new(0.1, None)];
        let groups = group_by_z(&raw).unwrap();
        assert!((groups[0].info.thickness - 0.1).abs() < 1e-6);
        assert!((groups[1].info.thickness - 0.1).abs() < 1e-6);
    }

    #[test]
    fn decreasing_z_is_rejected() {
        let raw = [RawLayer::new(0.2, None), RawLayer::new(0.1, None)];
        assert!(matches!(
            group_by_z(&raw),
            Err(RasterError::UnorderedLayers { index: 1, .. })
        ));
    }

    #[test]
    fn memory_stack_merges_shared_z_by_max() {
        let a = GrayImage::new(2, 1, vec![255, 0]).unwrap();
        let b = GrayImage::new(2, 1, vec![0, 128]).unwrap();
        let stack = MemoryStack::new(
            PixelSize::default(),
            vec![
                (RawLayer::new(0.05, Some(0.05)), a),
                (RawLayer::new(0.05, Some(0.05)), b),
            ],
        )
        .unwrap();
        assert_eq!(stack.layer_count(), 1);
        assert_eq!(stack.load_layer(0).unwrap().data, vec![255, 128]);
        assert!(matches!(
            stack.load_layer(1),
            Err(RasterError::LayerOutOfRange { index: 1, count: 1 })
        ));
    }

    #[test]
    fn layer_info_spans_below_position() {
        let info = LayerInfo {
            position_z: 0.3,
            thickness: 0.1,
        };
        assert!((info.bottom() - 0.2).abs() < 1e-6);
        assert_eq!(info.top(), 0.3);
    }

    #[test]
    fn pixel_size_fallback() {
        let p = PixelSize::new(0.0, 0.05).effective();
        assert_eq!(p.x, DEFAULT_PIXEL_SIZE_MM);
        assert_eq!(p.y, 0.05);
    }
}
