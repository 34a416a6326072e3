//! @ai:module:intent Cover image type handed to the orchestrator
//! @ai:module:layer domain
//! @ai:module:public_api CoverImage
//! @ai:module:stateless true

use crate::dataset::raster::normalize;
use image::DynamicImage;
use std::path::{Path, PathBuf};

/// @ai:intent A decoded, normalized cover image and its identifier
#[derive(Debug, Clone)]
pub struct CoverImage {
    /// File name, used as `image_id` in records.
    pub id: String,
    pub path: PathBuf,
    pub image: DynamicImage,
}

impl CoverImage {
    /// @ai:intent Wrap a decoded image, normalizing its channels
    /// @ai:effects pure
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>, image: DynamicImage) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            image: normalize(image),
        }
    }

    /// @ai:intent Decode an image file
    /// @ai:effects fs:read
    pub fn open(path: &Path) -> Result<Self, image::ImageError> {
        let image = image::open(path)?;
        let id = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(id, path, image))
    }
}
