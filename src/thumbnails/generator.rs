//! Thumbnail generation using the image crate.
//!
//! Thumbnails fit inside a square of `target_size` pixels while preserving
//! aspect ratio, which suits the fixed-size cells of the folder grid.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{GenericImageView, ImageFormat, RgbImage};
use tracing::debug;

/// Default longest edge for thumbnails in pixels.
pub const DEFAULT_THUMB_SIZE: u32 = 192;

/// JPEG quality for thumbnail encoding (0-100).
const JPEG_QUALITY: u8 = 85;

/// Thumbnail generator that creates resized images for caching.
pub struct ThumbnailGenerator;

impl ThumbnailGenerator {
    /// Decode `src`, scale it to fit `target_size`, write it to `dst` as JPEG
    /// and return the decoded pixels.
    pub fn generate(src: &Path, dst: &Path, target_size: u32) -> Result<RgbImage> {
        debug!(?src, ?dst, target_size, "Generating thumbnail");

        let img = image::open(src).with_context(|| format!("Failed to load image: {:?}", src))?;
        let (src_width, src_height) = img.dimensions();
        let (thumb_width, thumb_height) =
            Self::calculate_dimensions(src_width, src_height, target_size);

        let thumbnail = img
            .resize_exact(thumb_width, thumb_height, FilterType::CatmullRom)
            .to_rgb8();

        if let Some(parent) = dst.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create thumbnail directory: {:?}", parent))?;
        }
        Self::save_thumbnail(&thumbnail, dst)?;

        Ok(thumbnail)
    }

    /// Fit `src` into a `target` square without upscaling.
    fn calculate_dimensions(src_width: u32, src_height: u32, target: u32) -> (u32, u32) {
        if src_width == 0 || src_height == 0 {
            return (target.max(1), target.max(1));
        }

        let longest = src_width.max(src_height);
        if longest <= target {
            return (src_width, src_height);
        }

        let scale = target as f64 / longest as f64;
        let width = (src_width as f64 * scale).round() as u32;
        let height = (src_height as f64 * scale).round() as u32;
        (width.max(1), height.max(1))
    }

    fn save_thumbnail(img: &RgbImage, dst: &Path) -> Result<()> {
        let file = File::create(dst)
            .with_context(|| format!("Failed to create thumbnail file: {:?}", dst))?;
        let mut writer = BufWriter::new(file);

        let encoder = JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY);
        img.write_with_encoder(encoder)
            .with_context(|| format!("Failed to encode thumbnail: {:?}", dst))?;

        debug!(?dst, "Saved thumbnail");
        Ok(())
    }

    fn format_from_extension(path: &Path) -> Option<ImageFormat> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "png" => Some(ImageFormat::Png),
            "webp" => Some(ImageFormat::WebP),
            "gif" => Some(ImageFormat::Gif),
            "bmp" => Some(ImageFormat::Bmp),
            "tiff" | "tif" => Some(ImageFormat::Tiff),
            _ => None,
        }
    }

    /// Check if a source file can be decoded into a thumbnail.
    pub fn can_generate(path: &Path) -> bool {
        Self::format_from_extension(path).is_some()
    }
}
