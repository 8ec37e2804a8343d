use std::path::PathBuf;

use clap::{ArgAction, Parser};
use log::LevelFilter;
use strata_io::MeshEncoding;
use strata_raster::{Mirror, RasterError, Rotate};
use strata_runtime::{ExportError, ExportOptions};
use thiserror::Error;

/// Turn a stack of sliced layer images into a watertight surface mesh.
#[derive(Debug, Parser)]
#[command(name = "strata", version, about, long_about = None)]
pub struct Cli {
    /// Layer manifest (`stack.toml`)
    #[arg(value_name = "MANIFEST")]
    pub manifest: PathBuf,

    /// Mesh to write; the extension picks the format (stl, ply, obj, off, amf, wrl, 3mf)
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: PathBuf,

    /// TOML file with export defaults; flags below override it
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Down-sampling factor, 1 keeps full resolution
    #[arg(long)]
    pub quality: Option<u32>,

    /// Clockwise rotation: none, 90, 180 or 270
    #[arg(long)]
    pub rotate: Option<Rotate>,

    /// Mirror: none, horizontal, vertical or both
    #[arg(long)]
    pub mirror: Option<Mirror>,

    /// Write text STL/PLY instead of binary
    #[arg(long)]
    pub ascii: bool,

    /// Count every non-black pixel as solid
    #[arg(long)]
    pub keep_anti_aliasing: bool,

    /// First layer to export
    #[arg(long, value_name = "LAYER")]
    pub from: Option<usize>,

    /// Last layer to export, inclusive
    #[arg(long, value_name = "LAYER")]
    pub to: Option<usize>,

    /// Worker threads (default: all cores)
    #[arg(long)]
    pub threads: Option<usize>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("cannot load manifest: {0}")]
    Manifest(#[from] RasterError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

impl CliError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CliError::Export(e) if e.is_cancelled())
    }
}

impl Cli {
    /// Options from `--config` (or the defaults) with command-line overrides applied.
    pub fn export_options(&self) -> Result<ExportOptions, ExportError> {
        let mut opts = match &self.config {
            Some(path) => ExportOptions::from_path(path)?,
            None => ExportOptions::default(),
        };
        if let Some(q) = self.quality {
            opts.quality = q;
        }
        if let Some(r) = self.rotate {
            opts.rotate = r;
        }
        if let Some(m) = self.mirror {
            opts.mirror = m;
        }
        if self.ascii {
            opts.encoding = MeshEncoding::Ascii;
        }
        if self.keep_anti_aliasing {
            opts.strip_anti_aliasing = false;
        }
        if self.threads.is_some() {
            opts.threads = self.threads;
        }
        if let Some(from) = self.from {
            opts.layer_start = from;
        }
        if self.to.is_some() {
            opts.layer_end = self.to;
        }
        Ok(opts)
    }

    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "strata",
            "stack.toml",
            "-o",
            "out.ply",
            "--quality",
            "3",
            "--rotate",
            "270",
            "--mirror",
            "both",
            "--ascii",
            "--keep-anti-aliasing",
            "-vv",
        ])
        .unwrap();
        let opts = cli.export_options().unwrap();
        assert_eq!(opts.quality, 3);
        assert_eq!(opts.rotate, Rotate::Cw270);
        assert_eq!(opts.mirror, Mirror::Both);
        assert_eq!(opts.encoding, MeshEncoding::Ascii);
        assert!(!opts.strip_anti_aliasing);
        assert_eq!(opts.threads, None);
        assert_eq!(cli.log_level(), LevelFilter::Trace);
    }

    #[test]
    fn config_file_then_flags() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = dir.path().join("strata.toml");
        std::fs::write(&cfg, "quality = 2\nmirror = \"vertical\"\nthreads = 4\n").unwrap();
        let args: Vec<std::ffi::OsString> = vec![
            "strata".into(),
            "stack.toml".into(),
            "-o".into(),
            "out.stl".into(),
            "--config".into(),
            cfg.into_os_string(),
            "--threads".into(),
            "1".into(),
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        let opts = cli.export_options().unwrap();
        assert_eq!(opts.quality, 2);
        assert_eq!(opts.mirror, Mirror::Vertical);
        assert_eq!(opts.threads, Some(1));
        assert_eq!(opts.encoding, MeshEncoding::Binary);
    }

    #[test]
    fn layer_range_flags() {
        let cli =
            Cli::try_parse_from(["strata", "s.toml", "-o", "o.3mf", "--from", "2", "--to", "5"])
                .unwrap();
        let opts = cli.export_options().unwrap();
        assert_eq!((opts.layer_start, opts.layer_end), (2, Some(5)));
        assert_eq!(opts.layer_range(10).unwrap(), 2..6);
        let open = Cli::try_parse_from(["strata", "s.toml", "-o", "o.stl", "--from", "3"]).unwrap();
        assert_eq!(open.export_options().unwrap().layer_range(4).unwrap(), 3..4);
        assert!(Cli::try_parse_from(["strata", "s.toml", "-o", "o.stl", "--to", "-1"]).is_err());
    }

    #[test]
    fn rejects_unknown_rotation() {
        assert!(Cli::try_parse_from(["strata", "s.toml", "-o", "o.stl", "--rotate", "45"]).is_err());
        assert!(Cli::try_parse_from(["strata", "s.toml"]).is_err());
    }
}
