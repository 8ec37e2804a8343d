use std::fs;
use std::ops::Range;
use std::path::Path;

use serde::Deserialize;
use strata_geom::GridRect;
use strata_io::MeshEncoding;
use strata_raster::{Mirror, PrepareOptions, Rotate};

use crate::error::ExportError;

/// Export settings. Every field has a default so a config file may set any subset.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportOptions {
    /// Down-sampling factor applied to every layer; 1 keeps full resolution.
    pub quality: u32,
    pub rotate: Rotate,
    pub mirror: Mirror,
    /// Treat only pixels above mid-gray as solid.
    pub strip_anti_aliasing: bool,
    pub encoding: MeshEncoding,
    /// Worker threads; `None` uses the available parallelism.
    pub threads: Option<usize>,
    /// Layers triangulated ahead of the writer.
    pub emit_window: usize,
    /// First layer to export.
    pub layer_start: usize,
    /// Last layer to export, inclusive; `None` runs to the top of the stack.
    pub layer_end: Option<usize>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            quality: 1,
            rotate: Rotate::None,
            mirror: Mirror::None,
            strip_anti_aliasing: true,
            encoding: MeshEncoding::Binary,
            threads: None,
            emit_window: 8,
            layer_start: 0,
            layer_end: None,
        }
    }
}

impl ExportOptions {
    pub fn from_toml_str(text: &str) -> Result<Self, ExportError> {
        toml::from_str(text).map_err(|e| ExportError::InvalidOptions(e.to_string()))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ExportError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            ExportError::InvalidOptions(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ExportError> {
        if self.quality == 0 {
            return Err(ExportError::InvalidOptions(
                "quality must be at least 1".into(),
            ));
        }
        if self.emit_window == 0 {
            return Err(ExportError::InvalidOptions(
                "emit_window must be at least 1".into(),
            ));
        }
        if self.threads == Some(0) {
            return Err(ExportError::InvalidOptions(
                "threads must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Indices of the exported layers in a stack of `count` layers. Layers
    /// outside the range are treated as empty space.
    pub fn layer_range(&self, count: usize) -> Result<Range<usize>, ExportError> {
        let start = self.layer_start;
        if count == 0 && start == 0 && self.layer_end.is_none() {
            return Ok(0..0);
        }
        let end = self.layer_end.unwrap_or(count.saturating_sub(1));
        if end >= count {
            return Err(ExportError::InvalidOptions(format!(
                "layer_end {end} is past the last layer ({count} layers)"
            )));
        }
        if start > end {
            return Err(ExportError::InvalidOptions(format!(
                "layer_start {start} is after layer_end {end}"
            )));
        }
        Ok(start..end + 1)
    }

    pub fn thread_count(&self) -> usize {
        self.threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    pub fn prepare(&self, bounds: Option<GridRect>) -> PrepareOptions {
        PrepareOptions {
            quality: self.quality,
            rotate: self.rotate,
            mirror: self.mirror,
            strip_anti_aliasing: self.strip_anti_aliasing,
            bounds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let opts = ExportOptions::from_toml_str(
            "quality = 2\nrotate = \"90\"\nmirror = \"horizontal\"\nencoding = \"ascii\"\n",
        )
        .unwrap();
        assert_eq!(opts.quality, 2);
        assert_eq!(opts.rotate, Rotate::Cw90);
        assert_eq!(opts.mirror, Mirror::Horizontal);
        assert_eq!(opts.encoding, MeshEncoding::Ascii);
        assert!(opts.strip_anti_aliasing);
        assert_eq!(opts.emit_window, 8);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(ExportOptions::from_toml_str("qualty = 2").is_err());
        assert!(ExportOptions::from_toml_str("rotate = \"45\"").is_err());
        let zero = ExportOptions {
            quality: 0,
            ..ExportOptions::default()
        };
        assert!(matches!(zero.validate(), Err(ExportError::InvalidOptions(_))));
        let no_threads = ExportOptions {
            threads: Some(0),
            ..ExportOptions::default()
        };
        assert!(no_threads.validate().is_err());
        assert!(ExportOptions::default().validate().is_ok());
    }

    #[test]
    fn layer_range_is_inclusive_and_checked() {
        let all = ExportOptions::default();
        assert_eq!(all.layer_range(5).unwrap(), 0..5);
        assert_eq!(all.layer_range(0).unwrap(), 0..0);
        let mid = ExportOptions::from_toml_str("layer_start = 1\nlayer_end = 3\n").unwrap();
        assert_eq!(mid.layer_range(5).unwrap(), 1..4);
        assert!(mid.layer_range(3).is_err());
        let from = ExportOptions {
            layer_start: 4,
            ..ExportOptions::default()
        };
        assert_eq!(from.layer_range(5).unwrap(), 4..5);
        assert!(from.layer_range(4).is_err());
        assert!(from.layer_range(0).is_err());
        let single = ExportOptions {
            layer_start: 2,
            layer_end: Some(2),
            ..ExportOptions::default()
        };
        assert_eq!(single.layer_range(3).unwrap(), 2..3);
        let backwards = ExportOptions {
            layer_start: 3,
            layer_end: Some(1),
            ..ExportOptions::default()
        };
        assert!(matches!(
            backwards.layer_range(5),
            Err(ExportError::InvalidOptions(_))
        ));
    }
}
