//! `stack.toml` layer manifests.
//!
//! ```toml
//! pixel_size = [0.05, 0.05]
//! bounds = [10, 10, 200, 120]   # optional: x, y, w, h in pixels
//! layer_height = 0.05           # optional: default step for layers without z
//!
//! [[layer]]
//! image = "layers/0000.pgm"
//! z = 0.05
//! thickness = 0.05              # optional
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use strata_geom::GridRect;

use crate::error::RasterError;
use crate::image::GrayImage;
use crate::pnm::load_pnm;
use crate::stack::{LayerInfo, LayerStack, PixelSize, RawLayer, ZGroup, group_by_z};

#[derive(Deserialize)]
struct ManifestConfig {
    #[serde(default)]
    pixel_size: Option<[f32; 2]>,
    #[serde(default)]
    bounds: Option<[u32; 4]>,
    #[serde(default)]
    layer_height: Option<f32>,
    #[serde(default, rename = "layer")]
    layers: Vec<LayerEntry>,
}

#[derive(Deserialize)]
struct LayerEntry {
    image: PathBuf,
    #[serde(default)]
    z: Option<f32>,
    #[serde(default)]
    thickness: Option<f32>,
}

/// Layer stack described by a manifest file; images are decoded on demand.
#[derive(Clone, Debug)]
pub struct ManifestStack {
    pixel_size: PixelSize,
    bounds: Option<GridRect>,
    images: Vec<PathBuf>,
    groups: Vec<ZGroup>,
}

impl ManifestStack {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, RasterError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| RasterError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_toml_str(&text, base, path)
    }

    /// Parses manifest text. Image paths resolve against `base_dir`;
    /// `origin` labels errors.
    pub fn from_toml_str(text: &str, base_dir: &Path, origin: &Path) -> Result<Self, RasterError> {
        let cfg: ManifestConfig =
            toml::from_str(text).map_err(|source| RasterError::ManifestParse {
                path: origin.to_path_buf(),
                source,
            })?;
        let invalid = |message: String| RasterError::InvalidManifest {
            path: origin.to_path_buf(),
            message,
        };
        if cfg.layers.is_empty() {
            return Err(invalid("no [[layer]] entries".into()));
        }
        if let Some(h) = cfg.layer_height {
            if h <= 0.0 {
                return Err(invalid(format!("layer_height must be positive, got {h}")));
            }
        }

        let mut raw = Vec::with_capacity(cfg.layers.len());
        let mut images = Vec::with_capacity(cfg.layers.len());
        for (i, entry) in cfg.layers.into_iter().enumerate() {
            let z = match (entry.z, cfg.layer_height) {
                (Some(z), _) => z,
                (None, Some(h)) => (i + 1) as f32 * h,
                (None, None) => {
                    return Err(invalid(format!(
                        "layer {i} has no z and the manifest has no layer_height"
                    )));
                }
            };
            raw.push(RawLayer::new(z, entry.thickness.or(cfg.layer_height)));
            images.push(base_dir.join(entry.image));
        }
        let groups = group_by_z(&raw)?;
        if groups.len() < raw.len() {
            log::debug!(
                "{}: {} raw layers fold into {} distinct Z positions",
                origin.display(),
                raw.len(),
                groups.len()
            );
        }

        let pixel_size = match cfg.pixel_size {
            Some([x, y]) => PixelSize::new(x, y),
            None => PixelSize::default(),
        };
        let bounds = match cfg.bounds {
            Some([x, y, w, h]) => Some(GridRect::try_new(x, y, w, h).ok_or_else(|| {
                invalid(format!("bounds [{x}, {y}, {w}, {h}] extend past the u32 range"))
            })?),
            None => None,
        };
        Ok(Self {
            pixel_size,
            bounds,
            images,
            groups,
        })
    }

    /// Image files backing one distinct-Z layer.
    pub fn layer_files(&self, index: usize) -> Option<Vec<&Path>> {
        let group = self.groups.get(index)?;
        Some(
            group
                .members
                .iter()
                .map(|&m| self.images[m].as_path())
                .collect(),
        )
    }

    fn group(&self, index: usize) -> Result<&ZGroup, RasterError> {
        self.groups.get(index).ok_or(RasterError::LayerOutOfRange {
            index,
            count: self.groups.len(),
        })
    }
}

impl LayerStack for ManifestStack {
    fn layer_count(&self) -> usize {
        self.groups.len()
    }

    fn layer_info(&self, index: usize) -> Result<LayerInfo, RasterError> {
        Ok(self.group(index)?.info)
    }

    fn load_layer(&self, index: usize) -> Result<GrayImage, RasterError> {
        let group = self.group(index)?;
        let mut merged: Option<GrayImage> = None;
        for &m in &group.members {
            let img = load_pnm(&self.images[m])?;
            match merged.as_mut() {
                Some(acc) => acc.merge_max(&img)?,
                None => merged = Some(img),
            }
        }
        merged.ok_or(RasterError::LayerOutOfRange {
            index,
            count: self.groups.len(),
        })
    }

    fn pixel_size(&self) -> PixelSize {
        self.pixel_size
    }

    fn bounds(&self) -> Option<GridRect> {
        self.bounds
    }
}
