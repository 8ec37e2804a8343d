//! Netpbm decoding for slice images: PBM (P1/P4) and PGM (P2/P5).
//!
//! PGM samples are rescaled to 0..=255. PBM set bits decode as 255, so a
//! bitmap slice reads the same way as a white-on-black PGM slice.

use std::path::Path;

use crate::error::RasterError;
use crate::image::GrayImage;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Kind {
    AsciiBitmap,
    AsciiGray,
    BinaryBitmap,
    BinaryGray,
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn skip_space_and_comments(&mut self) {
        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b'#' => {
                    while self.pos < self.bytes.len() && self.bytes[self.pos] != b'\n' {
                        self.pos += 1;
                    }
                }
                c if c.is_ascii_whitespace() => self.pos += 1,
                _ => break,
            }
        }
    }

    fn number(&mut self) -> Option<u32> {
        self.skip_space_and_comments();
        let start = self.pos;
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_digit() {
            self.pos += 1;
        }
        if start == self.pos {
            return None;
        }
        std::str::from_utf8(&self.bytes[start..self.pos])
            .ok()?
            .parse()
            .ok()
    }

    /// Single bitmap digit; P1 allows digits without separators.
    fn bit(&mut self) -> Option<bool> {
        self.skip_space_and_comments();
        let b = *self.bytes.get(self.pos)?;
        self.pos += 1;
        match b {
            b'0' => Some(false),
            b'1' => Some(true),
            _ => None,
        }
    }

    fn rest(&self) -> &'a [u8] {
        &self.bytes[self.pos.min(self.bytes.len())..]
    }
}

/// Decodes a PBM or PGM image. `origin` only labels errors.
pub fn decode_pnm(bytes: &[u8], origin: &Path) -> Result<GrayImage, RasterError> {
    let bad = |msg: &str| RasterError::invalid_image(origin, msg);
    let kind = match bytes.get(..2) {
        Some(b"P1") => Kind::AsciiBitmap,
        Some(b"P2") => Kind::AsciiGray,
        Some(b"P4") => Kind::BinaryBitmap,
        Some(b"P5") => Kind::BinaryGray,
        _ => return Err(bad("not a PBM/PGM file (expected P1, P2, P4 or P5)")),
    };
    let mut cur = Cursor { bytes, pos: 2 };
    let width = cur.number().ok_or_else(|| bad("missing width"))? as usize;
    let height = cur.number().ok_or_else(|| bad("missing height"))? as usize;
    let maxval = match kind {
        Kind::AsciiGray | Kind::BinaryGray => {
            let m = cur.number().ok_or_else(|| bad("missing maxval"))?;
            if m == 0 || m > u16::MAX as u32 {
                return Err(bad("maxval out of range"));
            }
            m
        }
        Kind::AsciiBitmap | Kind::BinaryBitmap => 1,
    };
    let scale = |v: u32| -> u8 { ((v.min(maxval) * 255 + maxval / 2) / maxval) as u8 };
    let count = width
        .checked_mul(height)
        .ok_or_else(|| bad("image dimensions overflow"))?;
    let mut data = Vec::new();

    match kind {
        Kind::AsciiBitmap => {
            // every sample takes at least one byte of input
            data.reserve(count.min(cur.rest().len()));
            for _ in 0..count {
                let bit = cur.bit().ok_or_else(|| bad("truncated bitmap data"))?;
                data.push(if bit { 255 } else { 0 });
            }
        }
        Kind::AsciiGray => {
            data.reserve(count.min(cur.rest().len()));
            for _ in 0..count {
                let v = cur.number().ok_or_else(|| bad("truncated sample data"))?;
                data.push(scale(v));
            }
        }
        Kind::BinaryBitmap | Kind::BinaryGray => {
            // exactly one whitespace byte separates the header from the raster
            cur.pos += 1;
            let raw = cur.rest();
            if kind == Kind::BinaryBitmap {
                let stride = width.div_ceil(8);
                if stride.checked_mul(height).is_none_or(|n| raw.len() < n) {
                    return Err(bad("truncated bitmap data"));
                }
                data.reserve(count);
                for y in 0..height {
                    let row = &raw[y * stride..(y + 1) * stride];
                    for x in 0..width {
                        let bit = (row[x >> 3] >> (7 - (x & 7))) & 1;
                        data.push(if bit != 0 { 255 } else { 0 });
                    }
                }
            } else if maxval < 256 {
                if raw.len() < count {
                    return Err(bad("truncated sample data"));
                }
                data.reserve(count);
                data.extend(raw[..count].iter().map(|&v| scale(v as u32)));
            } else {
                if count.checked_mul(2).is_none_or(|n| raw.len() < n) {
                    return Err(bad("truncated sample data"));
                }
                data.reserve(count);
                data.extend(
                    raw[..count * 2]
                        .chunks_exact(2)
                        .map(|c| scale(u16::from_be_bytes([c[0], c[1]]) as u32)),
                );
            }
        }
    }
    GrayImage::new(width, height, data)
}

/// Reads and decodes an image file.
pub fn load_pnm(path: &Path) -> Result<GrayImage, RasterError> {
    let bytes = std::fs::read(path).map_err(|source| RasterError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    decode_pnm(&bytes, path)
}
