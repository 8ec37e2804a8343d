use strata_geom::GridRect;

use crate::error::RasterError;

const BITS_PER_WORD: usize = 64;
const WORD_INDEX_SHIFT: usize = 6; // log2(64)
const WORD_INDEX_MASK: usize = 63;

/// 8-bit single channel slice image as delivered by a layer provider.
/// Row 0 is the top row of the raster.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl GrayImage {
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Result<Self, RasterError> {
        let expected = width * height;
        if data.len() != expected {
            return Err(RasterError::BufferSize {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// All-black image.
    pub fn blank(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height],
        }
    }

    #[inline]
    pub fn idx(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[self.idx(x, y)]
    }

    #[inline]
    pub fn put(&mut self, x: usize, y: usize, v: u8) {
        let i = self.idx(x, y);
        self.data[i] = v;
    }

    #[inline]
    pub fn dims(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Per-pixel maximum with another image of the same size.
    /// Used to fold raw layers that share a Z position into one.
    pub fn merge_max(&mut self, other: &GrayImage) -> Result<(), RasterError> {
        if self.dims() != other.dims() {
            return Err(RasterError::SizeMismatch {
                expected: self.dims(),
                got: other.dims(),
            });
        }
        for (dst, &src) in self.data.iter_mut().zip(&other.data) {
            *dst = (*dst).max(src);
        }
        Ok(())
    }

    /// Copies the region of interest, clamped to the image.
    pub fn crop(&self, roi: GridRect) -> GrayImage {
        let x0 = (roi.x as usize).min(self.width);
        let y0 = (roi.y as usize).min(self.height);
        let x1 = (roi.right() as usize).min(self.width);
        let y1 = (roi.bottom() as usize).min(self.height);
        let (w, h) = (x1 - x0, y1 - y0);
        let mut data = Vec::with_capacity(w * h);
        for y in y0..y1 {
            let row = self.idx(x0, y);
            data.extend_from_slice(&self.data[row..row + w]);
        }
        GrayImage {
            width: w,
            height: h,
            data,
        }
    }
}

/// Binary voxel layer: one bit per grid cell, set means foreground.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayerImage {
    width: usize,
    height: usize,
    words: Vec<u64>,
}

impl LayerImage {
    pub fn new(width: usize, height: usize) -> Self {
        let nbits = width * height;
        Self {
            width,
            height,
            words: vec![0; (nbits + WORD_INDEX_MASK) / BITS_PER_WORD],
        }
    }

    /// Binarizes a gray image: a pixel is foreground when it is strictly above `threshold`.
    pub fn from_gray(gray: &GrayImage, threshold: u8) -> Self {
        let mut img = Self::new(gray.width, gray.height);
        for (i, &v) in gray.data.iter().enumerate() {
            if v > threshold {
                img.set_bit(i);
            }
        }
        img
    }

    /// Builds a layer from rows of `'#'` (foreground) and any other character.
    /// Convenient for tests and small fixtures.
    pub fn from_ascii(rows: &[&str]) -> Self {
        let height = rows.len();
        let width = rows.iter().map(|r| r.len()).max().unwrap_or(0);
        let mut img = Self::new(width, height);
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.bytes().enumerate() {
                if ch == b'#' {
                    img.set(x, y, true);
                }
            }
        }
        img
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn dims(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    fn set_bit(&mut self, i: usize) {
        self.words[i >> WORD_INDEX_SHIFT] |= 1u64 << (i & WORD_INDEX_MASK);
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: bool) {
        let i = y * self.width + x;
        let w = i >> WORD_INDEX_SHIFT;
        let b = i & WORD_INDEX_MASK;
        if v {
            self.words[w] |= 1u64 << b;
        } else {
            self.words[w] &= !(1u64 << b);
        }
    }

    /// Foreground test for an in-bounds cell.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> bool {
        let i = y * self.width + x;
        (self.words[i >> WORD_INDEX_SHIFT] >> (i & WORD_INDEX_MASK)) & 1 != 0
    }

    /// Foreground test that treats anything outside the grid as background.
    #[inline]
    pub fn is_solid(&self, x: i64, y: i64) -> bool {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return false;
        }
        self.get(x as usize, y as usize)
    }

    /// True when at least one cell of row `y` is foreground.
    pub fn row_has_foreground(&self, y: usize) -> bool {
        (0..self.width).any(|x| self.get(x, y))
    }

    pub fn count_foreground(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Builds a new image of the given size by sampling `src(x, y)` for every cell.
    pub(crate) fn from_fn(
        width: usize,
        height: usize,
        mut src: impl FnMut(usize, usize) -> bool,
    ) -> Self {
        let mut img = Self::new(width, height);
        for y in 0..height {
            for x in 0..width {
                if src(x, y) {
                    img.set(x, y, true);
                }
            }
        }
        img
    }
}
