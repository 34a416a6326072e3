//! @ai:module:intent Recursive image dataset scanner
//! @ai:module:layer infrastructure
//! @ai:module:public_api DatasetLoader, DatasetLoaderTrait, IMAGE_EXTENSIONS
//! @ai:module:stateless true

use crate::dataset::cover::CoverImage;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

/// Recognized cover image extensions, matched case-insensitively.
pub const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "bmp", "tiff", "tif"];

/// @ai:intent Trait for loading cover images
pub trait DatasetLoaderTrait: Send + Sync {
    /// @ai:intent Sorted, de-duplicated image paths under a directory
    fn find_images(&self, dataset_dir: &Path) -> Vec<PathBuf>;

    /// @ai:intent Decode up to `limit` images, skipping unreadable files
    fn load(&self, dataset_dir: &Path, limit: Option<usize>) -> Vec<CoverImage>;
}

/// @ai:intent Loads cover images from a directory tree
pub struct DatasetLoader;

impl DatasetLoader {
    /// @ai:intent Create a new dataset loader
    /// @ai:effects pure
    pub fn new() -> Self {
        Self
    }

    fn is_image(path: &Path) -> bool {
        path.extension()
            .map(|ext| {
                let ext = ext.to_string_lossy().to_ascii_lowercase();
                IMAGE_EXTENSIONS.contains(&ext.as_str())
            })
            .unwrap_or(false)
    }
}

impl Default for DatasetLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DatasetLoaderTrait for DatasetLoader {
    /// @ai:effects fs:read
    fn find_images(&self, dataset_dir: &Path) -> Vec<PathBuf> {
        if !dataset_dir.exists() {
            warn!("Dataset path does not exist: {}", dataset_dir.display());
            return Vec::new();
        }

        let paths: BTreeSet<PathBuf> = WalkDir::new(dataset_dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && Self::is_image(e.path()))
            .map(|e| e.path().to_path_buf())
            .collect();

        info!("Found {} images in {}", paths.len(), dataset_dir.display());
        paths.into_iter().collect()
    }

    /// @ai:effects fs:read
    fn load(&self, dataset_dir: &Path, limit: Option<usize>) -> Vec<CoverImage> {
        let mut paths = self.find_images(dataset_dir);
        if let Some(limit) = limit.filter(|l| *l > 0) {
            paths.truncate(limit);
        }

        paths
            .iter()
            .filter_map(|path| match CoverImage::open(path) {
                Ok(cover) => Some(cover),
                Err(e) => {
                    warn!("Failed to load image {}: {}", path.display(), e);
                    None
                }
            })
            .collect()
    }
}
