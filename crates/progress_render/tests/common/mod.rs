//! Helpers shared by the engine integration tests.

use image::{Rgba, RgbaImage};
use progress_render::{LabelFace, TextBounds};
use rand::rngs::StdRng;
use rand::SeedableRng;

pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Monospaced stand-in font. Each glyph is a solid block `size / 2` pixels
/// wide and `size` pixels tall, so label widths are easy to predict.
pub struct BlockFace;

impl LabelFace for BlockFace {
    fn measure(&self, text: &str, size: u32) -> Option<TextBounds> {
        let width = text.chars().count() as u32 * (size / 2);
        (width > 0).then_some(TextBounds { left: 0, top: 0, width, height: size })
    }

    fn draw(
        &self,
        target: &mut RgbaImage,
        text: &str,
        size: u32,
        origin: (i32, i32),
        color: Rgba<u8>,
    ) {
        let width = text.chars().count() as i32 * (size / 2) as i32;
        for y in origin.1.max(0)..(origin.1 + size as i32).min(target.height() as i32) {
            for x in origin.0.max(0)..(origin.0 + width).min(target.width() as i32) {
                target.put_pixel(x as u32, y as u32, color);
            }
        }
    }
}

/// White covers with the portrait proportions of a typical thumbnail.
pub fn white_covers(count: usize) -> Vec<RgbaImage> {
    (0..count).map(|_| RgbaImage::from_pixel(120, 180, WHITE)).collect()
}

pub fn seeded() -> StdRng {
    StdRng::seed_from_u64(0x5eed)
}
