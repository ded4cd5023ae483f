use std::path::Path;

use anyhow::{anyhow, Context, Result};
use fxrender::ImageDimensions;
use image::{DynamicImage, RgbaImage};

/// A decoded image held as tightly packed RGBA8, ready for the GPU pass.
pub struct LoadedImage {
    pub pixels: Vec<u8>,
    pub dimensions: ImageDimensions,
    /// Whether the file carried alpha; images without it are saved as RGB.
    pub had_alpha: bool,
}

pub fn load(path: &Path) -> Result<LoadedImage> {
    let image = image::open(path)
        .with_context(|| format!("failed to open image {}", path.display()))?;
    let had_alpha = image.color().has_alpha();
    let rgba = image.into_rgba8();
    let dimensions = ImageDimensions::rgba(rgba.width(), rgba.height());
    tracing::debug!(path = %path.display(), %dimensions, had_alpha, "decoded image");
    Ok(LoadedImage {
        pixels: rgba.into_raw(),
        dimensions,
        had_alpha,
    })
}

pub fn save(path: &Path, image: LoadedImage) -> Result<()> {
    let LoadedImage {
        pixels,
        dimensions,
        had_alpha,
    } = image;
    let buffer = RgbaImage::from_raw(dimensions.width, dimensions.height, pixels)
        .ok_or_else(|| anyhow!("pixel buffer does not match {dimensions}"))?;
    let result = if had_alpha {
        buffer.save(path)
    } else {
        DynamicImage::ImageRgba8(buffer).into_rgb8().save(path)
    };
    result.with_context(|| format!("failed to save image {}", path.display()))
}
