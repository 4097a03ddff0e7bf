mod device;
mod grid;
mod image_pipeline;

use std::path::PathBuf;

use image::{Rgba, RgbaImage};
use rand::Rng;

pub use device::{known_devices, DeviceProfile, DEFAULT_DEVICE};
pub use grid::{
    compose::{composite, Composite, TilePosition},
    label::{
        fit_font_size, leftover_region, overlay_label, LabelFace, LabelRegion, TextBounds,
        TrueTypeFace,
    },
    plan::{GridPlan, LayoutMode},
};
pub use image_pipeline::{
    canvas::{generate_template, generate_template_with, DEFAULT_NOISE_SIGMA},
    loader::{decode_cover, open_cover},
    normalize::normalize,
};

/// Gray used for the year badge drawn in leftover grid space.
pub const LABEL_COLOR: Rgba<u8> = Rgba([128, 128, 128, 255]);

#[derive(Debug, thiserror::Error)]
pub enum ProgressError {
    #[error("no cover images were supplied")]
    EmptyCoverList,
    #[error("unsupported grid layout: {0}")]
    InvalidLayout(String),
    #[error("cover image has no pixels")]
    EmptyImage,
    #[error("label text is empty")]
    EmptyLabel,
    #[error("failed to decode image: {0}")]
    Image(#[from] image::ImageError),
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("font unavailable: {0}")]
    FontUnavailable(String),
    #[error("canvas of {width}x{height} pixels cannot be allocated")]
    CanvasTooLarge { width: u32, height: u32 },
}

/// Coarse classification of [`ProgressError`] for callers that only care
/// about who is at fault.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    AssetUnavailable,
    ResourceExhaustion,
}

impl ProgressError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProgressError::EmptyCoverList
            | ProgressError::InvalidLayout(_)
            | ProgressError::EmptyImage
            | ProgressError::EmptyLabel => ErrorKind::InvalidInput,
            ProgressError::Image(_)
            | ProgressError::Io { .. }
            | ProgressError::FontUnavailable(_) => ErrorKind::AssetUnavailable,
            ProgressError::CanvasTooLarge { .. } => ErrorKind::ResourceExhaustion,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ProgressOptions {
    /// Height of the reserved band at the top of the canvas.
    pub header_height: u32,
    pub layout: LayoutMode,
    /// Standard deviation of the background noise around mid-gray.
    pub noise_sigma: f32,
    /// Year drawn into leftover grid space, `None` disables the label.
    pub label_year: Option<i32>,
    pub label_color: Rgba<u8>,
}

impl Default for ProgressOptions {
    fn default() -> Self {
        Self {
            header_height: 0,
            layout: LayoutMode::Balanced,
            noise_sigma: DEFAULT_NOISE_SIGMA,
            label_year: None,
            label_color: LABEL_COLOR,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RenderOutput {
    pub canvas: RgbaImage,
    pub plan: GridPlan,
    /// Number of covers placed on the canvas. Smaller than the input in
    /// full-screen mode when the last row would be partial.
    pub placed: usize,
    pub last_tile: Option<TilePosition>,
    /// Region and font size of the drawn label, if one was drawn.
    pub label: Option<(LabelRegion, u32)>,
}

#[derive(Default)]
pub struct ProgressRenderer;

impl ProgressRenderer {
    pub fn render(
        &self,
        covers: &[RgbaImage],
        profile: &DeviceProfile,
        options: &ProgressOptions,
        face: Option<&dyn LabelFace>,
    ) -> Result<RenderOutput, ProgressError> {
        self.render_with_rng(covers, profile, options, face, &mut rand::thread_rng())
    }

    pub fn render_with_rng<R: Rng + ?Sized>(
        &self,
        covers: &[RgbaImage],
        profile: &DeviceProfile,
        options: &ProgressOptions,
        face: Option<&dyn LabelFace>,
        rng: &mut R,
    ) -> Result<RenderOutput, ProgressError> {
        if covers.is_empty() {
            return Err(ProgressError::EmptyCoverList);
        }

        let template =
            generate_template_with(profile.width, profile.height, options.noise_sigma, rng)?;
        self.render_onto(&template, covers, profile, options, face)
    }

    /// Renders onto a caller-built template. The template is left untouched.
    pub fn render_onto(
        &self,
        template: &RgbaImage,
        covers: &[RgbaImage],
        profile: &DeviceProfile,
        options: &ProgressOptions,
        face: Option<&dyn LabelFace>,
    ) -> Result<RenderOutput, ProgressError> {
        if covers.is_empty() {
            return Err(ProgressError::EmptyCoverList);
        }

        let normalized =
            covers.iter().map(|cover| normalize(cover, profile)).collect::<Result<Vec<_>, _>>()?;

        let (width, height) = template.dimensions();
        let header_height = options.header_height;
        let plan =
            GridPlan::compute(normalized.len(), width, height, header_height, options.layout)?;

        let Composite { mut canvas, placed, last_tile } =
            composite(template, &normalized, &plan, header_height);

        let mut label = None;
        if let (Some(year), Some(face), Some(last)) = (options.label_year, face, last_tile) {
            if let Some(region) = leftover_region(&plan, last, header_height, width, height) {
                let text = format!("{year:04}");
                if let Some(size) =
                    overlay_label(&mut canvas, region, &text, face, options.label_color)?
                {
                    label = Some((region, size));
                }
            }
        }

        Ok(RenderOutput { canvas, plan, placed, last_tile, label })
    }
}
