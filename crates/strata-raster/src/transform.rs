use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use strata_geom::GridRect;

use crate::error::RasterError;
use crate::image::{GrayImage, LayerImage};

/// Gray level above which a pixel counts as solid when anti-aliasing is stripped.
pub const AA_STRIP_THRESHOLD: u8 = 127;

/// Clockwise rotation applied to every layer before meshing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
pub enum Rotate {
    #[default]
    #[serde(rename = "none", alias = "0")]
    None,
    #[serde(rename = "90", alias = "cw90")]
    Cw90,
    #[serde(rename = "180", alias = "cw180")]
    Cw180,
    #[serde(rename = "270", alias = "cw270")]
    Cw270,
}

impl Rotate {
    /// Dimensions of a `w`x`h` image after rotation.
    #[inline]
    pub fn dims(self, w: usize, h: usize) -> (usize, usize) {
        match self {
            Rotate::None | Rotate::Cw180 => (w, h),
            Rotate::Cw90 | Rotate::Cw270 => (h, w),
        }
    }

    /// Source pixel for destination `(x, y)` of a rotated `w`x`h` source image.
    #[inline]
    fn source(self, x: usize, y: usize, w: usize, h: usize) -> (usize, usize) {
        match self {
            Rotate::None => (x, y),
            Rotate::Cw90 => (y, h - 1 - x),
            Rotate::Cw180 => (w - 1 - x, h - 1 - y),
            Rotate::Cw270 => (w - 1 - y, x),
        }
    }
}

impl FromStr for Rotate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "0" => Ok(Rotate::None),
            "90" | "cw90" => Ok(Rotate::Cw90),
            "180" | "cw180" => Ok(Rotate::Cw180),
            "270" | "cw270" => Ok(Rotate::Cw270),
            other => Err(format!(
                "unknown rotation '{other}' (expected none, 90, 180 or 270)"
            )),
        }
    }
}

impl fmt::Display for Rotate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Rotate::None => "none",
            Rotate::Cw90 => "90",
            Rotate::Cw180 => "180",
            Rotate::Cw270 => "270",
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mirror {
    #[default]
    None,
    Horizontal,
    Vertical,
    Both,
}

impl Mirror {
    #[inline]
    pub fn flips_x(self) -> bool {
        matches!(self, Mirror::Horizontal | Mirror::Both)
    }

    #[inline]
    pub fn flips_y(self) -> bool {
        matches!(self, Mirror::Vertical | Mirror::Both)
    }

    fn from_flags(flip_x: bool, flip_y: bool) -> Self {
        match (flip_x, flip_y) {
            (false, false) => Mirror::None,
            (true, false) => Mirror::Horizontal,
            (false, true) => Mirror::Vertical,
            (true, true) => Mirror::Both,
        }
    }

    /// Adds or removes the vertical flip.
    pub fn toggle_vertical(self) -> Self {
        Self::from_flags(self.flips_x(), !self.flips_y())
    }
}

impl FromStr for Mirror {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Mirror::None),
            "horizontal" | "h" => Ok(Mirror::Horizontal),
            "vertical" | "v" => Ok(Mirror::Vertical),
            "both" => Ok(Mirror::Both),
            other => Err(format!(
                "unknown mirror '{other}' (expected none, horizontal, vertical or both)"
            )),
        }
    }
}

impl fmt::Display for Mirror {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mirror::None => "none",
            Mirror::Horizontal => "horizontal",
            Mirror::Vertical => "vertical",
            Mirror::Both => "both",
        })
    }
}

/// How raw slice images are turned into voxel layers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PrepareOptions {
    /// Down-sampling factor; 1 keeps full resolution.
    pub quality: u32,
    pub rotate: Rotate,
    pub mirror: Mirror,
    pub strip_anti_aliasing: bool,
    /// Region of the raster holding the model. `None` uses the whole image.
    pub bounds: Option<GridRect>,
}

impl Default for PrepareOptions {
    fn default() -> Self {
        Self {
            quality: 1,
            rotate: Rotate::None,
            mirror: Mirror::None,
            strip_anti_aliasing: true,
            bounds: None,
        }
    }
}

impl PrepareOptions {
    #[inline]
    pub fn threshold(&self) -> u8 {
        if self.strip_anti_aliasing {
            AA_STRIP_THRESHOLD
        } else {
            0
        }
    }

    /// Mirror actually applied to the raster. Image rows grow downward while
    /// the mesh Y axis grows upward, so the vertical flip is inverted.
    #[inline]
    pub fn effective_mirror(&self) -> Mirror {
        self.mirror.toggle_vertical()
    }

    /// Grid dimensions produced for a `w`x`h` source image.
    pub fn output_dims(&self, w: usize, h: usize) -> (usize, usize) {
        let (w, h) = match self.bounds {
            Some(b) => (
                (b.right() as usize).min(w) - (b.x as usize).min(w),
                (b.bottom() as usize).min(h) - (b.y as usize).min(h),
            ),
            None => (w, h),
        };
        let (w, h) = self.rotate.dims(w, h);
        let q = self.quality.max(1) as usize;
        (w.div_ceil(q), h.div_ceil(q))
    }
}

/// Crop, threshold, rotate, mirror and down-sample one layer.
pub fn prepare_layer(gray: &GrayImage, opts: &PrepareOptions) -> Result<LayerImage, RasterError> {
    if opts.quality == 0 {
        return Err(RasterError::ZeroQuality);
    }
    let cropped;
    let src = match opts.bounds {
        Some(roi) => {
            cropped = gray.crop(roi);
            &cropped
        }
        None => gray,
    };
    let bin = LayerImage::from_gray(src, opts.threshold());
    let oriented = orient(&bin, opts.rotate, opts.effective_mirror());
    Ok(downsample(&oriented, opts.quality as usize))
}

/// Rotates clockwise, then mirrors.
pub fn orient(img: &LayerImage, rotate: Rotate, mirror: Mirror) -> LayerImage {
    if rotate == Rotate::None && mirror == Mirror::None {
        return img.clone();
    }
    let (sw, sh) = img.dims();
    let (dw, dh) = rotate.dims(sw, sh);
    LayerImage::from_fn(dw, dh, |x, y| {
        let mx = if mirror.flips_x() { dw - 1 - x } else { x };
        let my = if mirror.flips_y() { dh - 1 - y } else { y };
        let (sx, sy) = rotate.source(mx, my, sw, sh);
        img.get(sx, sy)
    })
}

/// Shrinks by `factor` on both axes. A block is foreground if any of its
/// cells is; partial blocks on the right/bottom edge are kept.
pub fn downsample(img: &LayerImage, factor: usize) -> LayerImage {
    if factor <= 1 {
        return img.clone();
    }
    let (sw, sh) = img.dims();
    LayerImage::from_fn(sw.div_ceil(factor), sh.div_ceil(factor), |x, y| {
        let (x0, y0) = (x * factor, y * factor);
        let (x1, y1) = ((x0 + factor).min(sw), (y0 + factor).min(sh));
        (y0..y1).any(|sy| (x0..x1).any(|sx| img.get(sx, sy)))
    })
}
