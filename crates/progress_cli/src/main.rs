mod kobo;
mod logging;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Datelike;
use clap::{Parser, Subcommand};
use image::{ImageFormat, RgbaImage};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use progress_render::{
    known_devices, open_cover, DeviceProfile, LabelFace, LayoutMode, ProgressOptions,
    ProgressRenderer, TrueTypeFace, DEFAULT_DEVICE, DEFAULT_NOISE_SIGMA,
};
use walkdir::WalkDir;

/// Fonts tried, in order, when no `--font` is given.
const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

#[derive(Parser, Debug)]
#[command(author, version, about = "Build a reading progress screensaver from book covers")]
struct Cli {
    /// Log debug details
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build this year's screensaver from a connected Kobo and store it on the device
    Generate(GenerateArgs),
    /// Build a screensaver from image files or directories
    Compose(ComposeArgs),
    /// List the known device profiles
    Devices,
}

#[derive(Parser, Debug)]
struct GenerateArgs {
    /// Root of the mounted e-reader; probed when omitted
    #[arg(long, env = "KOBO_MOUNT")]
    mount: Option<PathBuf>,
    /// Write here instead of the device's screensaver folder
    #[arg(short, long)]
    output: Option<PathBuf>,
    #[command(flatten)]
    settings: RenderSettings,
}

#[derive(Parser, Debug)]
struct ComposeArgs {
    /// Cover images or directories of covers, in placement order
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
    /// Output PNG path
    #[arg(short, long)]
    output: PathBuf,
    #[command(flatten)]
    settings: RenderSettings,
}

#[derive(Parser, Debug, Clone)]
struct RenderSettings {
    /// Device profile that sets canvas size and color handling
    #[arg(long, default_value = DEFAULT_DEVICE)]
    device: String,
    /// Height of the empty band kept at the top of the screen
    #[arg(long, default_value_t = 0)]
    header: u32,
    /// Drop covers that would leave the last row partly empty
    #[arg(long, default_value_t = false)]
    full_screen: bool,
    /// Do not draw the year into leftover grid space
    #[arg(long, default_value_t = false)]
    no_label: bool,
    /// Year used for the label and the file name (defaults to the current year)
    #[arg(long)]
    year: Option<i32>,
    /// TrueType font for the year label
    #[arg(long, env = "PROGRESS_FONT")]
    font: Option<PathBuf>,
    /// Strength of the background noise
    #[arg(long, default_value_t = DEFAULT_NOISE_SIGMA)]
    noise: f32,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;

    match cli.command {
        Commands::Generate(args) => generate(args),
        Commands::Compose(args) => compose(args),
        Commands::Devices => {
            list_devices();
            Ok(())
        },
    }
}

fn generate(args: GenerateArgs) -> Result<()> {
    let profile = args.settings.profile()?;

    let Some(mount) = args.mount.or_else(kobo::locate_mount) else {
        info!("Kobo eReader not connected.");
        return Ok(());
    };
    if !kobo::is_kobo_mount(&mount) {
        anyhow::bail!("{:?} does not look like a Kobo eReader", mount);
    }
    info!("Kobo eReader found at {}", mount.display());

    let image_ids = kobo::Library::open(&mount)?.recently_read_image_ids()?;
    if image_ids.is_empty() {
        info!("No recently read books found.");
        return Ok(());
    }
    info!("{} recently read books found.", image_ids.len());

    let index = kobo::CoverIndex::scan(&mount);
    debug!("indexed {} library thumbnails", index.len());
    let paths: Vec<PathBuf> = image_ids
        .iter()
        .filter_map(|id| {
            let path = index.find(id);
            if path.is_none() {
                debug!("no cover thumbnail for {id}");
            }
            path.map(Path::to_path_buf)
        })
        .collect();

    let covers = load_covers(&paths);
    if covers.is_empty() {
        info!("No cover images found.");
        return Ok(());
    }
    info!("{} cover images found.", covers.len());

    let year = args.settings.year();
    let output = args.output.unwrap_or_else(|| kobo::screensaver_path(&mount, year));
    render_and_save(&covers, &profile, &args.settings, year, &output)?;
    info!("Screensaver saved to {}", output.display());
    Ok(())
}

fn compose(args: ComposeArgs) -> Result<()> {
    let profile = args.settings.profile()?;

    let paths = collect_inputs(&args.inputs)?;
    let covers = load_covers(&paths);
    if covers.is_empty() {
        anyhow::bail!("none of the {} inputs could be decoded", paths.len());
    }

    let year = args.settings.year();
    render_and_save(&covers, &profile, &args.settings, year, &args.output)?;
    info!("Screensaver written to {}", args.output.display());
    Ok(())
}

fn list_devices() {
    for (name, profile) in known_devices() {
        let color = if profile.is_grayscale { "grayscale" } else { "color" };
        println!("{name:<14} {:>4}x{:<4} {color}", profile.width, profile.height);
    }
}

fn render_and_save(
    covers: &[RgbaImage],
    profile: &DeviceProfile,
    settings: &RenderSettings,
    year: i32,
    output: &Path,
) -> Result<()> {
    let face = if settings.no_label { None } else { settings.label_face() };
    let options = settings.to_options(year);

    let rendered = ProgressRenderer
        .render(covers, profile, &options, face.as_ref().map(|face| face as &dyn LabelFace))
        .context("failed to compose screensaver")?;

    if rendered.placed < covers.len() {
        info!(
            "full-screen layout left out {} of {} covers",
            covers.len() - rendered.placed,
            covers.len()
        );
    }
    if let Some((region, size)) = rendered.label {
        debug!(
            "drew {year} at {size}px into {}x{} at ({}, {})",
            region.width, region.height, region.x, region.y
        );
    }

    save_png(&rendered.canvas, output)
}

/// Decodes covers in order, skipping the ones that fail.
fn load_covers(paths: &[PathBuf]) -> Vec<RgbaImage> {
    let progress = ProgressBar::new(paths.len() as u64);
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} covers",
    ) {
        progress.set_style(style.progress_chars("=> "));
    }

    let mut covers = Vec::with_capacity(paths.len());
    for path in paths {
        match open_cover(path) {
            Ok(cover) => covers.push(cover),
            Err(err) => warn!("skipping cover {}: {err}", path.display()),
        }
        progress.inc(1);
    }

    progress.finish_and_clear();
    covers
}

fn collect_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut entries: Vec<PathBuf> = WalkDir::new(input)
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file())
                .map(|entry| entry.into_path())
                .collect();
            entries.sort();
            paths.extend(entries);
        } else if input.is_file() {
            paths.push(input.clone());
        } else {
            anyhow::bail!("input {:?} does not exist", input);
        }
    }

    if paths.is_empty() {
        anyhow::bail!("no image files found in {:?}", inputs);
    }
    Ok(paths)
}

fn save_png(canvas: &RgbaImage, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory {:?}", parent))?;
    }
    canvas
        .save_with_format(path, ImageFormat::Png)
        .with_context(|| format!("failed to write {:?}", path))
}

impl RenderSettings {
    fn profile(&self) -> Result<DeviceProfile> {
        DeviceProfile::by_name(&self.device).with_context(|| {
            let known: Vec<_> = known_devices().map(|(name, _)| name).collect();
            format!("unknown device {:?}, expected one of: {}", self.device, known.join(", "))
        })
    }

    fn year(&self) -> i32 {
        self.year.unwrap_or_else(|| chrono::Local::now().year())
    }

    fn to_options(&self, year: i32) -> ProgressOptions {
        ProgressOptions {
            header_height: self.header,
            layout: if self.full_screen { LayoutMode::FullScreen } else { LayoutMode::Balanced },
            noise_sigma: self.noise.max(0.0),
            label_year: (!self.no_label).then_some(year),
            ..ProgressOptions::default()
        }
    }

    /// Loads the label font. A missing font only costs the label.
    fn label_face(&self) -> Option<TrueTypeFace> {
        let path = match &self.font {
            Some(path) => path.clone(),
            None => match SYSTEM_FONTS.iter().map(PathBuf::from).find(|path| path.is_file()) {
                Some(path) => path,
                None => {
                    warn!("no label font found, pass --font to draw the year");
                    return None;
                },
            },
        };

        match TrueTypeFace::open(&path) {
            Ok(face) => Some(face),
            Err(err) => {
                warn!("label disabled: {err}");
                None
            },
        }
    }
}
