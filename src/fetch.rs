//! @ai:module:intent Dataset acquisition: Lorem Picsum downloads and synthetic cover generation
//! @ai:module:layer infrastructure
//! @ai:module:public_api DatasetFetcher, PicsumVariant, FetchSummary, synthetic_cover
//! @ai:module:stateless false

use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Side of downloaded and generated covers.
pub const COVER_SIDE: u32 = 512;
const SHAPES_PER_COVER: usize = 10;

/// @ai:intent Picsum image flavor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PicsumVariant {
    Gray,
    Color,
}

impl PicsumVariant {
    /// @ai:intent Subdirectory and file prefix for this flavor
    /// @ai:effects pure
    pub fn as_str(&self) -> &'static str {
        match self {
            PicsumVariant::Gray => "picsum_gray",
            PicsumVariant::Color => "picsum_color",
        }
    }

    /// @ai:intent Download URL; the index defeats caching so each file is distinct
    /// @ai:effects pure
    pub fn url(&self, index: usize) -> String {
        match self {
            PicsumVariant::Gray => {
                format!("https://picsum.photos/{COVER_SIDE}/{COVER_SIDE}?grayscale&random={index}")
            }
            PicsumVariant::Color => format!("https://picsum.photos/{COVER_SIDE}/{COVER_SIDE}?random={index}"),
        }
    }
}

/// @ai:intent Outcome counts of one acquisition step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchSummary {
    pub written: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// @ai:intent Populates a dataset directory with cover images
pub struct DatasetFetcher {
    client: reqwest::Client,
    root: PathBuf,
    show_progress: bool,
}

impl DatasetFetcher {
    /// @ai:intent Create a fetcher rooted at the dataset directory
    /// @ai:effects pure
    pub fn new(root: PathBuf, show_progress: bool) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent(concat!("stegoeval/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            root,
            show_progress,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn progress(&self, total: u64, label: &str) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar.set_message(label.to_string());
        bar
    }

    /// @ai:intent Download one image unless it already exists
    /// @ai:effects network, fs:write
    async fn download_one(&self, url: &str, path: &Path) -> Result<bool> {
        if path.exists() {
            return Ok(false);
        }

        let bytes = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        tokio::fs::write(path, &bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(true)
    }

    /// @ai:intent Download `count` Picsum images into `<root>/<variant>/`
    /// @ai:post per-file failures are warned about and counted, never fatal
    /// @ai:effects network, fs:write
    pub async fn download_picsum(&self, variant: PicsumVariant, count: usize) -> Result<FetchSummary> {
        let dir = self.root.join(variant.as_str());
        std::fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;

        let bar = self.progress(count as u64, variant.as_str());
        let mut summary = FetchSummary::default();

        for index in 0..count {
            let path = dir.join(format!("{}_{:03}.jpg", variant.as_str(), index));
            let url = variant.url(index);
            match self.download_one(&url, &path).await {
                Ok(true) => summary.written += 1,
                Ok(false) => summary.skipped += 1,
                Err(e) => {
                    warn!("Failed to download {}: {:#}", url, e);
                    summary.failed += 1;
                }
            }
            bar.inc(1);
        }
        bar.finish_and_clear();

        info!(
            "{}: {} downloaded, {} already present, {} failed",
            variant.as_str(),
            summary.written,
            summary.skipped,
            summary.failed
        );
        Ok(summary)
    }

    /// @ai:intent Generate `count` synthetic covers into `<root>/synthetic/`
    /// @ai:post existing files are left untouched
    /// @ai:effects fs:write
    pub fn generate_synthetic<R: Rng>(&self, count: usize, rng: &mut R) -> Result<FetchSummary> {
        let dir = self.root.join("synthetic");
        std::fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;

        let mut summary = FetchSummary::default();
        for index in 0..count {
            let path = dir.join(format!("synth_{index:03}.png"));
            if path.exists() {
                summary.skipped += 1;
                continue;
            }
            synthetic_cover(index, COVER_SIDE, rng)
                .save(&path)
                .with_context(|| format!("Failed to save {}", path.display()))?;
            summary.written += 1;
        }

        info!("synthetic: {} generated, {} already present", summary.written, summary.skipped);
        Ok(summary)
    }
}

/// @ai:intent Synthetic cover: uniform noise for even indices, random filled shapes on white for odd
/// @ai:effects pure
pub fn synthetic_cover<R: Rng>(index: usize, side: u32, rng: &mut R) -> RgbImage {
    if index % 2 == 0 {
        return RgbImage::from_fn(side, side, |_, _| Rgb(rng.gen()));
    }

    let mut image = RgbImage::from_pixel(side, side, Rgb([255, 255, 255]));
    let half = (side / 2).max(1);
    for _ in 0..SHAPES_PER_COVER {
        let (x0, y0) = (rng.gen_range(0..half), rng.gen_range(0..half));
        let (x1, y1) = (rng.gen_range(half..side.max(half + 1)), rng.gen_range(half..side.max(half + 1)));
        let color = Rgb(rng.gen());
        if rng.gen_bool(0.5) {
            fill_rectangle(&mut image, (x0, y0, x1, y1), color);
        } else {
            fill_ellipse(&mut image, (x0, y0, x1, y1), color);
        }
    }
    image
}

/// Inclusive bounds, clipped to the image.
fn fill_rectangle(image: &mut RgbImage, (x0, y0, x1, y1): (u32, u32, u32, u32), color: Rgb<u8>) {
    for y in y0..=y1.min(image.height() - 1) {
        for x in x0..=x1.min(image.width() - 1) {
            image.put_pixel(x, y, color);
        }
    }
}

/// Ellipse inscribed in the inclusive bounding box.
fn fill_ellipse(image: &mut RgbImage, (x0, y0, x1, y1): (u32, u32, u32, u32), color: Rgb<u8>) {
    let (cx, cy) = ((x0 + x1) as f64 / 2.0, (y0 + y1) as f64 / 2.0);
    let (rx, ry) = (((x1 - x0) as f64 / 2.0).max(0.5), ((y1 - y0) as f64 / 2.0).max(0.5));

    for y in y0..=y1.min(image.height() - 1) {
        for x in x0..=x1.min(image.width() - 1) {
            let (dx, dy) = ((x as f64 - cx) / rx, (y as f64 - cy) / ry);
            if dx * dx + dy * dy <= 1.0 {
                image.put_pixel(x, y, color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{DatasetLoader, DatasetLoaderTrait};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tempfile::TempDir;

    #[test]
    fn test_picsum_urls_are_unique_per_index() {
        assert_eq!(
            PicsumVariant::Gray.url(3),
            "https://picsum.photos/512/512?grayscale&random=3"
        );
        assert_eq!(PicsumVariant::Color.url(0), "https://picsum.photos/512/512?random=0");
        assert_ne!(PicsumVariant::Color.url(1), PicsumVariant::Color.url(2));
    }

    #[test]
    fn test_odd_synthetic_cover_has_white_background_and_shapes() {
        let mut rng = StdRng::seed_from_u64(5);
        let image = synthetic_cover(1, 64, &mut rng);

        let white = image.pixels().filter(|p| p.0 == [255, 255, 255]).count();
        assert!(white > 0, "corners outside every shape stay white");
        assert!(white < 64 * 64, "at least one shape is drawn");
    }

    #[test]
    fn test_even_synthetic_cover_is_noise() {
        let mut rng = StdRng::seed_from_u64(6);
        let image = synthetic_cover(0, 32, &mut rng);
        let distinct: std::collections::HashSet<_> = image.pixels().map(|p| p.0).collect();
        assert!(distinct.len() > 500);
    }

    #[test]
    fn test_generate_synthetic_is_loadable_and_skips_existing() {
        let temp = TempDir::new().unwrap();
        let fetcher = DatasetFetcher::new(temp.path().to_path_buf(), false).unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        let first = fetcher.generate_synthetic(3, &mut rng).unwrap();
        assert_eq!(first, FetchSummary { written: 3, skipped: 0, failed: 0 });

        let second = fetcher.generate_synthetic(4, &mut rng).unwrap();
        assert_eq!(second, FetchSummary { written: 1, skipped: 3, failed: 0 });

        let covers = DatasetLoader::new().load(temp.path(), None);
        assert_eq!(covers.len(), 4);
        assert_eq!(covers[0].image.width(), COVER_SIDE);
    }
}
