use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::MeshIoError;

/// Output file format, picked from the file extension.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum MeshFormat {
    Stl,
    Ply,
    Obj,
    Off,
    Amf,
    Wrl,
    ThreeMf,
}

impl MeshFormat {
    pub const ALL: [MeshFormat; 7] = [
        MeshFormat::Stl,
        MeshFormat::Ply,
        MeshFormat::Obj,
        MeshFormat::Off,
        MeshFormat::Amf,
        MeshFormat::Wrl,
        MeshFormat::ThreeMf,
    ];

    pub fn from_extension(ext: &str) -> Result<Self, MeshIoError> {
        match ext.to_ascii_lowercase().as_str() {
            "stl" => Ok(MeshFormat::Stl),
            "ply" => Ok(MeshFormat::Ply),
            "obj" => Ok(MeshFormat::Obj),
            "off" => Ok(MeshFormat::Off),
            "amf" => Ok(MeshFormat::Amf),
            "wrl" => Ok(MeshFormat::Wrl),
            "3mf" => Ok(MeshFormat::ThreeMf),
            _ => Err(MeshIoError::UnknownFormat {
                extension: ext.to_string(),
            }),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, MeshIoError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| MeshIoError::MissingExtension {
                path: path.to_path_buf(),
            })?;
        Self::from_extension(ext)
    }

    pub fn extension(self) -> &'static str {
        match self {
            MeshFormat::Stl => "stl",
            MeshFormat::Ply => "ply",
            MeshFormat::Obj => "obj",
            MeshFormat::Off => "off",
            MeshFormat::Amf => "amf",
            MeshFormat::Wrl => "wrl",
            MeshFormat::ThreeMf => "3mf",
        }
    }

    /// STL and PLY have a binary layout. The rest are text, zipped for AMF and 3MF.
    pub fn supports_binary(self) -> bool {
        matches!(self, MeshFormat::Stl | MeshFormat::Ply)
    }
}

impl fmt::Display for MeshFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeshEncoding {
    #[default]
    Binary,
    Ascii,
}

impl FromStr for MeshEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "binary" | "bin" => Ok(MeshEncoding::Binary),
            "ascii" | "text" => Ok(MeshEncoding::Ascii),
            other => Err(format!("unknown encoding '{other}' (expected binary or ascii)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_case_insensitive() {
        assert_eq!(
            MeshFormat::from_path(Path::new("out/part.STL")).unwrap(),
            MeshFormat::Stl
        );
        assert_eq!(
            MeshFormat::from_path(Path::new("a.Ply")).unwrap(),
            MeshFormat::Ply
        );
        assert_eq!(
            MeshFormat::from_path(Path::new("part.3MF")).unwrap(),
            MeshFormat::ThreeMf
        );
        for f in MeshFormat::ALL {
            assert_eq!(MeshFormat::from_extension(f.extension()).unwrap(), f);
        }
    }

    #[test]
    fn unknown_and_missing_extensions() {
        assert!(matches!(
            MeshFormat::from_path(Path::new("mesh.dxf")),
            Err(MeshIoError::UnknownFormat { extension }) if extension == "dxf"
        ));
        assert!(matches!(
            MeshFormat::from_path(Path::new("mesh")),
            Err(MeshIoError::MissingExtension { .. })
        ));
    }
}
