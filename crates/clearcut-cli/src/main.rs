//! clearcut: command-line front end for the raster engine.
//!
//! Decodes image files, runs one engine operation, and writes the result
//! as PNG (raster operations) or prints it (aspect ratio, palette).
//!
//! # Usage
//!
//! ```text
//! clearcut aspect photo.jpg
//! clearcut remove-bg photo.jpg --mask mask.png -o cutout.png
//! clearcut wand photo.jpg --x 10 --y 10 --tolerance 30 -o cutout.png
//! clearcut resize photo.jpg --width 800 -o small.png
//! clearcut palette photo.jpg --max-colors 8 --json
//! ```
//!
//! Set `RUST_LOG=debug` (or pass `-v`) for per-operation diagnostics.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};
use clearcut_raster::{
    Dimensions, RasterBuffer, ResampleFilter, ResizeTarget, SelectionTolerance, codec,
};

/// Background removal, resizing, and palette extraction.
#[derive(Parser)]
#[command(name = "clearcut", version)]
struct Cli {
    /// Log at debug level (overridden by `RUST_LOG`).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the segmentation aspect ratio closest to the image.
    Aspect {
        /// Input image (PNG, JPEG, BMP, WebP).
        image: PathBuf,
    },

    /// Apply a segmentation mask (white = subject) as the alpha channel.
    RemoveBg {
        /// Input image.
        image: PathBuf,

        /// Grayscale mask returned by the segmentation service.
        #[arg(long)]
        mask: PathBuf,

        /// Output PNG path.
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Clear the connected region of similar color around a seed pixel.
    Wand {
        /// Input image (always the unedited original).
        image: PathBuf,

        /// Seed column.
        #[arg(long)]
        x: u32,

        /// Seed row.
        #[arg(long)]
        y: u32,

        /// Per-channel color tolerance (0-100).
        #[arg(long, default_value_t = SelectionTolerance::DEFAULT.get(), value_parser = clap::value_parser!(u8).range(0..=100))]
        tolerance: u8,

        /// Output PNG path.
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Stretch the image to new dimensions.
    ///
    /// With only one of `--width`/`--height` the other side follows the
    /// source ratio.
    Resize {
        /// Input image.
        image: PathBuf,

        /// Target width in pixels.
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        width: Option<u32>,

        /// Target height in pixels.
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        height: Option<u32>,

        /// Uniform scale factor (e.g. 0.5).
        #[arg(long, conflicts_with_all = ["width", "height"])]
        scale: Option<f64>,

        /// Resampling filter.
        #[arg(long, value_enum, default_value_t = Filter::Triangle)]
        filter: Filter,

        /// Output PNG path. Defaults to `resized-{w}x{h}-{stem}.png` next
        /// to the input.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the dominant colors, most frequent first.
    Palette {
        /// Input image.
        image: PathBuf,

        /// Maximum number of colors.
        #[arg(long, default_value_t = clearcut_raster::DEFAULT_MAX_COLORS)]
        max_colors: usize,

        /// Print JSON instead of one hex code per line.
        #[arg(long)]
        json: bool,
    },
}

/// Resampling filter selection.
#[derive(Clone, Copy, ValueEnum)]
enum Filter {
    /// Nearest-neighbor (fastest, blocky).
    Nearest,
    /// Bilinear interpolation (fast, decent quality).
    Triangle,
    /// Bicubic Catmull-Rom (moderate, good quality).
    CatmullRom,
    /// Gaussian (moderate, smooth).
    Gaussian,
    /// Lanczos with 3 lobes (slowest, sharpest).
    Lanczos3,
}

impl From<Filter> for ResampleFilter {
    fn from(filter: Filter) -> Self {
        match filter {
            Filter::Nearest => Self::Nearest,
            Filter::Triangle => Self::Triangle,
            Filter::CatmullRom => Self::CatmullRom,
            Filter::Gaussian => Self::Gaussian,
            Filter::Lanczos3 => Self::Lanczos3,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{msg}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<(), String> {
    match command {
        Command::Aspect { image } => {
            let buffer = load(&image)?;
            let ratio = clearcut_raster::match_aspect_ratio(buffer.width(), buffer.height())
                .map_err(|e| format!("Aspect ratio error: {e}"))?;
            println!("{ratio}");
        }
        Command::RemoveBg {
            image,
            mask,
            output,
        } => {
            let original = load(&image)?;
            let mask = load(&mask)?;
            let started = Instant::now();
            let cutout = clearcut_raster::composite_mask(&original, &mask)
                .map_err(|e| format!("Compositing error: {e}"))?;
            log::info!("Composited mask in {:.3}ms", ms(started));
            save(&cutout, &output)?;
        }
        Command::Wand {
            image,
            x,
            y,
            tolerance,
            output,
        } => {
            let original = load(&image)?;
            let tolerance =
                SelectionTolerance::new(tolerance).map_err(|e| format!("Invalid tolerance: {e}"))?;
            let started = Instant::now();
            let selection = clearcut_raster::select_region_mask(&original, x, y, tolerance)
                .map_err(|e| format!("Magic wand error: {e}"))?;
            log::info!(
                "Selected {} pixels in {:.3}ms",
                selection.pixel_count(),
                ms(started),
            );
            let edited = selection
                .apply(&original)
                .map_err(|e| format!("Magic wand error: {e}"))?;
            save(&edited, &output)?;
        }
        Command::Resize {
            image,
            width,
            height,
            scale,
            filter,
            output,
        } => {
            let source = load(&image)?;
            let target = resize_target(width, height, scale)?
                .resolve(source.dimensions())
                .map_err(|e| format!("Resize error: {e}"))?;
            let started = Instant::now();
            let resized =
                clearcut_raster::resample_with(&source, target.width, target.height, filter.into())
                    .map_err(|e| format!("Resize error: {e}"))?;
            log::info!(
                "Resized {}x{} -> {}x{} in {:.3}ms",
                source.width(),
                source.height(),
                target.width,
                target.height,
                ms(started),
            );
            let output = output.unwrap_or_else(|| default_resize_output(&image, target));
            save(&resized, &output)?;
        }
        Command::Palette {
            image,
            max_colors,
            json,
        } => {
            let buffer = load(&image)?;
            let palette = clearcut_raster::extract_palette(&buffer, max_colors)
                .map_err(|e| format!("Palette error: {e}"))?;
            if json {
                let text = serde_json::to_string_pretty(&palette)
                    .map_err(|e| format!("Error serializing palette: {e}"))?;
                println!("{text}");
            } else {
                for color in &palette {
                    println!("{}  rgb({}, {}, {})", color.hex, color.r, color.g, color.b);
                }
            }
        }
    }
    Ok(())
}

/// Turn the `resize` flags into a [`ResizeTarget`].
fn resize_target(
    width: Option<u32>,
    height: Option<u32>,
    scale: Option<f64>,
) -> Result<ResizeTarget, String> {
    match (width, height, scale) {
        (_, _, Some(factor)) => Ok(ResizeTarget::Scale { factor }),
        (Some(width), Some(height), None) => Ok(ResizeTarget::Exact { width, height }),
        (Some(width), None, None) => Ok(ResizeTarget::FitWidth { width }),
        (None, Some(height), None) => Ok(ResizeTarget::FitHeight { height }),
        (None, None, None) => Err("resize needs --width, --height, or --scale".to_string()),
    }
}

/// `resized-{w}x{h}-{stem}.png` in the input's directory. The output is
/// always PNG whatever the input format.
fn default_resize_output(input: &Path, target: Dimensions) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    let name = format!("{stem}.png");
    input.with_file_name(clearcut_raster::resized_file_name(target, &name))
}

fn load(path: &Path) -> Result<RasterBuffer, String> {
    let bytes =
        std::fs::read(path).map_err(|e| format!("Error reading {}: {e}", path.display()))?;
    log::info!("Image: {} ({} bytes)", path.display(), bytes.len());
    let buffer =
        codec::decode(&bytes).map_err(|e| format!("Error decoding {}: {e}", path.display()))?;
    log::debug!("Decoded {}x{}", buffer.width(), buffer.height());
    Ok(buffer)
}

fn save(buffer: &RasterBuffer, path: &Path) -> Result<(), String> {
    let png = codec::encode_png(buffer).map_err(|e| format!("Error encoding PNG: {e}"))?;
    std::fs::write(path, &png)
        .map_err(|e| format!("Error writing {}: {e}", path.display()))?;
    log::info!("Written to {} ({} bytes)", path.display(), png.len());
    Ok(())
}

fn ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}
