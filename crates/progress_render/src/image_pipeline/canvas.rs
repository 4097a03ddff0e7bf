use image::RgbaImage;
use rand::Rng;

use crate::ProgressError;

/// Spread of the static noise background around mid-gray.
pub const DEFAULT_NOISE_SIGMA: f32 = 8.0;

const NOISE_CENTER: f32 = 128.0;

/// Generates an opaque gray noise background of the given size.
pub fn generate_template(width: u32, height: u32) -> Result<RgbaImage, ProgressError> {
    generate_template_with(width, height, DEFAULT_NOISE_SIGMA, &mut rand::thread_rng())
}

pub fn generate_template_with<R: Rng + ?Sized>(
    width: u32,
    height: u32,
    sigma: f32,
    rng: &mut R,
) -> Result<RgbaImage, ProgressError> {
    if width == 0 || height == 0 {
        return Err(ProgressError::InvalidLayout(format!("canvas size {width}x{height}")));
    }

    let too_large = || ProgressError::CanvasTooLarge { width, height };
    let len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(4))
        .ok_or_else(too_large)?;

    let mut data = Vec::new();
    data.try_reserve_exact(len).map_err(|_| too_large())?;

    for _ in 0..len / 4 {
        let value = (NOISE_CENTER + sigma * gaussian(rng)).round().clamp(0.0, 255.0) as u8;
        data.extend_from_slice(&[value, value, value, u8::MAX]);
    }

    RgbaImage::from_raw(width, height, data).ok_or_else(too_large)
}

/// Standard normal sample using the Box-Muller transform.
fn gaussian<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    let u1: f32 = rng.gen_range(f32::EPSILON..1.0);
    let u2: f32 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (std::f32::consts::TAU * u2).cos()
}
