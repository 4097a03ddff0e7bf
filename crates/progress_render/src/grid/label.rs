use std::fs;
use std::path::Path;

use image::{Rgba, RgbaImage};
use rusttype::{point, Font, Scale};

use super::compose::{paste_masked, TilePosition};
use super::plan::GridPlan;
use crate::ProgressError;

const MAX_FONT_SIZE: u32 = 4096;

/// Ink extent of a run of text, relative to the top-left of its line box.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextBounds {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

/// A font able to measure and rasterize a single line of text.
pub trait LabelFace {
    /// Returns `None` when the text has no visible ink at this size.
    fn measure(&self, text: &str, size: u32) -> Option<TextBounds>;

    /// Draws `text` with the top-left of its line box at `origin`.
    fn draw(
        &self,
        target: &mut RgbaImage,
        text: &str,
        size: u32,
        origin: (i32, i32),
        color: Rgba<u8>,
    );
}

/// Canvas rectangle reserved for the label.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LabelRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

pub struct TrueTypeFace {
    font: Font<'static>,
}

impl TrueTypeFace {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ProgressError> {
        Font::try_from_vec(bytes)
            .map(|font| Self { font })
            .ok_or_else(|| ProgressError::FontUnavailable("not a TrueType or OpenType font".into()))
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ProgressError> {
        let path = path.as_ref();
        let bytes = fs::read(path)
            .map_err(|source| ProgressError::Io { path: path.to_path_buf(), source })?;
        Self::from_bytes(bytes).map_err(|_| {
            ProgressError::FontUnavailable(format!("{} is not a usable font", path.display()))
        })
    }
}

impl LabelFace for TrueTypeFace {
    fn measure(&self, text: &str, size: u32) -> Option<TextBounds> {
        let scale = Scale::uniform(size as f32);
        let ascent = self.font.v_metrics(scale).ascent;

        let (mut min_x, mut min_y, mut max_x, mut max_y) = (i32::MAX, i32::MAX, i32::MIN, i32::MIN);
        for glyph in self.font.layout(text, scale, point(0.0, ascent)) {
            if let Some(bb) = glyph.pixel_bounding_box() {
                min_x = min_x.min(bb.min.x);
                min_y = min_y.min(bb.min.y);
                max_x = max_x.max(bb.max.x);
                max_y = max_y.max(bb.max.y);
            }
        }

        if min_x > max_x {
            return None;
        }

        Some(TextBounds {
            left: min_x,
            top: min_y,
            width: (max_x - min_x) as u32,
            height: (max_y - min_y) as u32,
        })
    }

    fn draw(
        &self,
        target: &mut RgbaImage,
        text: &str,
        size: u32,
        origin: (i32, i32),
        color: Rgba<u8>,
    ) {
        let scale = Scale::uniform(size as f32);
        let ascent = self.font.v_metrics(scale).ascent;
        let (width, height) = (target.width() as i32, target.height() as i32);
        let start = point(origin.0 as f32, origin.1 as f32 + ascent);

        for glyph in self.font.layout(text, scale, start) {
            let Some(bb) = glyph.pixel_bounding_box() else {
                continue;
            };
            glyph.draw(|gx, gy, coverage| {
                let px = bb.min.x + gx as i32;
                let py = bb.min.y + gy as i32;
                if px < 0 || py < 0 || px >= width || py >= height {
                    return;
                }

                let alpha = (coverage * f32::from(color[3])).round().clamp(0.0, 255.0) as u8;
                let pixel = target.get_pixel_mut(px as u32, py as u32);
                if alpha > pixel[3] {
                    *pixel = Rgba([color[0], color[1], color[2], alpha]);
                }
            });
        }
    }
}

/// Largest font size whose measured width is at most `max_width`, or `None`
/// if not even size 1 fits.
pub fn fit_font_size(face: &dyn LabelFace, text: &str, max_width: u32) -> Option<u32> {
    let fits =
        |size: u32| face.measure(text, size).map_or(true, |bounds| bounds.width <= max_width);

    if max_width == 0 || !fits(1) {
        return None;
    }

    // Grow until the text overflows, then bisect; `low` always fits and
    // `high` never does.
    let mut low = 1;
    let mut high = 2;
    while high <= MAX_FONT_SIZE && fits(high) {
        low = high;
        high *= 2;
    }
    high = high.min(MAX_FONT_SIZE + 1);

    while high - low > 1 {
        let mid = low + (high - low) / 2;
        if fits(mid) {
            low = mid;
        } else {
            high = mid;
        }
    }

    Some(low)
}

/// Finds the empty space left after the last placed tile.
///
/// Trailing space in the last occupied row wins; a grid with whole empty rows
/// below the covers offers its bottom-right cell instead.
pub fn leftover_region(
    plan: &GridPlan,
    last: TilePosition,
    header_height: u32,
    canvas_width: u32,
    canvas_height: u32,
) -> Option<LabelRegion> {
    let (x, y) = if canvas_width.saturating_sub(last.x) > plan.cell_width {
        (last.x + plan.cell_width, last.y)
    } else if last.row + 1 < plan.rows {
        plan.cell_origin(plan.capacity() - 1, header_height)
    } else {
        return None;
    };

    if x >= canvas_width || y >= canvas_height {
        return None;
    }

    Some(LabelRegion { x, y, width: canvas_width - x, height: canvas_height - y })
}

/// Draws `text` centered in `region` at the largest size that fits its
/// width. Returns the chosen size, or `None` if the text cannot fit.
pub fn overlay_label(
    canvas: &mut RgbaImage,
    region: LabelRegion,
    text: &str,
    face: &dyn LabelFace,
    color: Rgba<u8>,
) -> Result<Option<u32>, ProgressError> {
    if text.trim().is_empty() {
        return Err(ProgressError::EmptyLabel);
    }

    let Some(size) = fit_font_size(face, text, region.width) else {
        return Ok(None);
    };
    let bounds = face.measure(text, size).unwrap_or_default();

    let origin = (
        (region.width as i32 - bounds.width as i32) / 2 - bounds.left,
        (region.height as i32 - bounds.height as i32) / 2 - bounds.top,
    );

    let mut layer = RgbaImage::new(region.width, region.height);
    face.draw(&mut layer, text, size, origin, color);
    paste_masked(canvas, &layer, region.x, region.y);

    Ok(Some(size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorKind, LayoutMode};

    /// Monospaced face: every glyph is a solid block `size / 2` wide and
    /// `size` tall.
    struct BlockFace;

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
            for y in origin.1..origin.1 + size as i32 {
                for x in origin.0..origin.0 + width {
                    let (x, y) = (x as u32, y as u32);
                    if x < target.width() && y < target.height() {
                        target.put_pixel(x, y, color);
                    }
                }
            }
        }
    }

    fn tile(index: usize, plan: &GridPlan) -> TilePosition {
        let (x, y) = plan.cell_origin(index, 0);
        TilePosition {
            index,
            column: (index % plan.columns as usize) as u32,
            row: (index / plan.columns as usize) as u32,
            x,
            y,
        }
    }

    #[test]
    fn font_size_is_largest_that_fits() {
        assert_eq!(fit_font_size(&BlockFace, "2026", 530), Some(265));
        assert_eq!(fit_font_size(&BlockFace, "2026", 531), Some(265));
        assert_eq!(fit_font_size(&BlockFace, "2026", 532), Some(267));
    }

    #[test]
    fn font_size_matches_linear_search() {
        for max_width in [4, 7, 10, 99, 100, 353, 1024, 5000] {
            let mut linear = 1;
            while BlockFace.measure("2026", linear + 1).unwrap().width <= max_width {
                linear += 1;
            }
            assert_eq!(fit_font_size(&BlockFace, "2026", max_width), Some(linear), "{max_width}");
        }
    }

    #[test]
    fn nothing_fits_a_zero_width_region() {
        assert_eq!(fit_font_size(&BlockFace, "2026", 0), None);
    }

    #[test]
    fn font_size_is_capped() {
        assert_eq!(fit_font_size(&BlockFace, "2026", u32::MAX), Some(MAX_FONT_SIZE));
    }

    #[test]
    fn trailing_row_space_becomes_region() {
        let plan = GridPlan::compute(5, 1072, 1448, 0, LayoutMode::Balanced).unwrap();
        let region = leftover_region(&plan, tile(4, &plan), 0, 1072, 1448).unwrap();
        assert_eq!(region, LabelRegion { x: 718, y: 728, width: 354, height: 720 });
    }

    #[test]
    fn empty_row_offers_bottom_right_cell() {
        let plan = GridPlan::compute(2, 1072, 1448, 0, LayoutMode::Balanced).unwrap();
        let region = leftover_region(&plan, tile(1, &plan), 0, 1072, 1448).unwrap();
        assert_eq!(region, LabelRegion { x: 542, y: 730, width: 530, height: 718 });
    }

    #[test]
    fn full_grid_has_no_region() {
        let plan = GridPlan::compute(6, 1072, 1448, 0, LayoutMode::FullScreen).unwrap();
        assert_eq!(leftover_region(&plan, tile(5, &plan), 0, 1072, 1448), None);

        let plan = GridPlan::compute(1, 1072, 1448, 0, LayoutMode::Balanced).unwrap();
        assert_eq!(leftover_region(&plan, tile(0, &plan), 0, 1072, 1448), None);
    }

    #[test]
    fn label_is_centered_inside_region_only() {
        let background = Rgba([0, 0, 0, 255]);
        let gray = Rgba([128, 128, 128, 255]);
        let mut canvas = RgbaImage::from_pixel(100, 100, background);
        let region = LabelRegion { x: 50, y: 50, width: 50, height: 50 };

        let size = overlay_label(&mut canvas, region, "2026", &BlockFace, gray).unwrap();
        assert_eq!(size, Some(25));

        // 4 glyphs of 12px make a 48x25 block centered in the 50x50 region.
        assert_eq!(canvas.get_pixel(51, 62), &gray);
        assert_eq!(canvas.get_pixel(98, 86), &gray);
        assert_eq!(canvas.get_pixel(50, 62), &background);
        assert_eq!(canvas.get_pixel(51, 61), &background);
        assert_eq!(canvas.get_pixel(99, 62), &background);
        assert_eq!(canvas.get_pixel(51, 87), &background);
        assert!(canvas
            .enumerate_pixels()
            .filter(|(x, y, _)| *x < 50 || *y < 50)
            .all(|(_, _, pixel)| *pixel == background));
    }

    #[test]
    fn empty_label_is_rejected() {
        let mut canvas = RgbaImage::new(10, 10);
        let region = LabelRegion { x: 0, y: 0, width: 10, height: 10 };
        let err = overlay_label(&mut canvas, region, " ", &BlockFace, Rgba([0; 4])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn garbage_font_is_unavailable() {
        let err = TrueTypeFace::from_bytes(vec![0, 1, 2, 3]).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::AssetUnavailable);
        let err = TrueTypeFace::open("/nonexistent/font.ttf").err().unwrap();
        assert_eq!(err.kind(), ErrorKind::AssetUnavailable);
    }
}
