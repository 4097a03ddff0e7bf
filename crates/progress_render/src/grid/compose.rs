use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use super::plan::GridPlan;

/// Where a cover landed on the canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TilePosition {
    pub index: usize,
    pub column: u32,
    pub row: u32,
    pub x: u32,
    pub y: u32,
}

#[derive(Clone, Debug)]
pub struct Composite {
    pub canvas: RgbaImage,
    pub placed: usize,
    pub last_tile: Option<TilePosition>,
}

/// Paints covers row-major into the planned cells of a copy of `template`.
///
/// Covers are stretched to the cell size and blended through their own
/// alpha. Covers past the plan's capacity are not placed.
pub fn composite(
    template: &RgbaImage,
    covers: &[RgbaImage],
    plan: &GridPlan,
    header_height: u32,
) -> Composite {
    let mut canvas = template.clone();
    let mut last_tile = None;

    let placed = covers.len().min(plan.capacity());
    for (index, cover) in covers.iter().take(placed).enumerate() {
        let (x, y) = plan.cell_origin(index, header_height);
        let tile =
            imageops::resize(cover, plan.cell_width, plan.cell_height, FilterType::CatmullRom);
        paste_masked(&mut canvas, &tile, x, y);

        last_tile = Some(TilePosition {
            index,
            column: (index % plan.columns as usize) as u32,
            row: (index / plan.columns as usize) as u32,
            x,
            y,
        });
    }

    Composite { canvas, placed, last_tile }
}

/// Pastes `tile` at `(x, y)` using the tile's alpha as the paste mask.
/// Parts of the tile outside the canvas are clipped.
pub(crate) fn paste_masked(canvas: &mut RgbaImage, tile: &RgbaImage, x: u32, y: u32) {
    let width = tile.width().min(canvas.width().saturating_sub(x));
    let height = tile.height().min(canvas.height().saturating_sub(y));

    for ty in 0..height {
        for tx in 0..width {
            let src = tile.get_pixel(tx, ty);
            let dst = canvas.get_pixel_mut(x + tx, y + ty);
            match src[3] {
                0 => {},
                u8::MAX => *dst = *src,
                _ => blend_pixel(dst, src),
            }
        }
    }
}

fn blend_pixel(dst: &mut Rgba<u8>, src: &Rgba<u8>) {
    let alpha = f32::from(src[3]) / 255.0;
    let inv_alpha = 1.0 - alpha;
    for channel in 0..3 {
        dst[channel] = (f32::from(src[channel]) * alpha + f32::from(dst[channel]) * inv_alpha)
            .round()
            .clamp(0.0, 255.0) as u8;
    }
    dst[3] = (f32::from(src[3]) + f32::from(dst[3]) * inv_alpha).round().clamp(0.0, 255.0) as u8;
}
