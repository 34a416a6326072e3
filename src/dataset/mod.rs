//! @ai:module:intent Cover image dataset: scanning, decoding and channel normalization
//! @ai:module:layer domain
//! @ai:module:public_api CoverImage, DatasetLoader, DatasetLoaderTrait, Raster

pub mod cover;
pub mod loader;
pub mod raster;

pub use cover::CoverImage;
pub use loader::{DatasetLoader, DatasetLoaderTrait};
pub use raster::Raster;
