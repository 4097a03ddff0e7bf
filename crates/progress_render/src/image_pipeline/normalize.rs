use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};

use crate::{DeviceProfile, ProgressError};

/// Prepares a cover for the grid: drops color on grayscale devices and
/// locks the cover to the screen's aspect ratio, keeping its width.
///
/// The stretch to the final cell size happens in the compositor.
pub fn normalize(cover: &RgbaImage, profile: &DeviceProfile) -> Result<RgbaImage, ProgressError> {
    let (width, _) = cover.dimensions();
    if width == 0 || cover.height() == 0 {
        return Err(ProgressError::EmptyImage);
    }
    if profile.width == 0 || profile.height == 0 {
        return Err(ProgressError::InvalidLayout(format!(
            "device size {}x{}",
            profile.width, profile.height
        )));
    }

    let height = (u64::from(width) * u64::from(profile.height) / u64::from(profile.width))
        .clamp(1, u64::from(u32::MAX)) as u32;

    if profile.is_grayscale {
        // Luma plus alpha, so transparent corners stay transparent.
        let gray = DynamicImage::ImageRgba8(cover.clone()).grayscale().into_rgba8();
        Ok(imageops::resize(&gray, width, height, FilterType::CatmullRom))
    } else {
        Ok(imageops::resize(cover, width, height, FilterType::CatmullRom))
    }
}
