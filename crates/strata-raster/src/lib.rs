//! Layer rasters: decoded slice images, binary voxel layers and layer-stack providers.
#![forbid(unsafe_code)]

mod error;
mod image;
mod manifest;
mod pnm;
mod stack;
mod transform;

pub use error::RasterError;
pub use image::{GrayImage, LayerImage};
pub use manifest::ManifestStack;
pub use pnm::{decode_pnm, load_pnm};
pub use stack::{
    DEFAULT_PIXEL_SIZE_MM, LayerInfo, LayerStack, MemoryStack, PixelSize, RawLayer, Z_EPSILON,
    ZGroup, group_by_z,
};
pub use transform::{
    AA_STRIP_THRESHOLD, Mirror, PrepareOptions, Rotate, downsample, orient, prepare_layer,
};
