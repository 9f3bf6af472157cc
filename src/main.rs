use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, FromArgMatches, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use glyphcam::config::{load_and_validate_config, SessionConfig};
use glyphcam::export::{write_png, write_text};
use glyphcam::filter::PixelFilter;
use glyphcam::palette::{extract_from_source, extract_palette};
use glyphcam::pipeline::{AsciiPipeline, PixelPipeline, PixelSettings, DEFAULT_RESOLUTION};
use glyphcam::scheduler::{LatestSurfaces, Scheduler, View};
use glyphcam::source::{FfmpegSource, FfmpegSourceConfig, StillSource};

#[derive(Debug, Parser)]
#[command(name = "glyphcam")]
#[command(about = "Live ASCII, pixel-art filter and palette rendering")]
struct Cli {
    /// Log at debug level (RUST_LOG overrides).
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Render one ASCII frame from a still image.
    Ascii {
        #[arg(short, long)]
        input: PathBuf,
        /// Write the glyph grid as text.
        #[arg(long)]
        text: Option<PathBuf>,
        /// Write the 600x750 glyph surface.
        #[arg(long)]
        png: Option<PathBuf>,
    },
    /// Run the pixel pipeline over a still image and export the surface.
    Pixel {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long, default_value = "none")]
        filter: String,
        #[arg(short, long, default_value_t = DEFAULT_RESOLUTION)]
        resolution: u32,
        /// Ticks to run before exporting; matters for noisy filters and trails.
        #[arg(long, default_value_t = 1)]
        frames: u64,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Extract the 12-color palette from an image.
    Palette {
        #[arg(short, long)]
        input: PathBuf,
        /// Write the 600x50 swatch strip.
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print the palette as JSON instead of one color per line.
        #[arg(long)]
        json: bool,
    },
    /// Drive the render loop from a camera or video through ffmpeg.
    Live(LiveArgs),
}

#[derive(Debug, Args)]
struct LiveArgs {
    /// Session YAML; flags below override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Video file or capture device passed to ffmpeg.
    #[arg(short, long)]
    input: Option<String>,
    /// ffmpeg demuxer for capture devices, e.g. v4l2 or avfoundation.
    #[arg(long)]
    format: Option<String>,
    #[arg(long, value_enum)]
    view: Option<View>,
    #[arg(short, long)]
    filter: Option<String>,
    #[arg(short, long)]
    resolution: Option<u32>,
    #[arg(long)]
    fps: Option<u32>,
    #[arg(long)]
    frames: Option<u64>,
    #[arg(long)]
    seed: Option<u64>,
    /// Where the last surfaces are written when the loop ends.
    #[arg(long, default_value = "renders")]
    out_dir: PathBuf,
    /// Also extract a palette from the final frame.
    #[arg(long)]
    palette: bool,
}

fn main() -> Result<()> {
    let matches = Cli::command().version(version_string()).get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|error| error.exit());
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Ascii { input, text, png } => run_ascii(&input, text.as_deref(), png.as_deref()),
        Commands::Pixel {
            input,
            filter,
            resolution,
            frames,
            seed,
            output,
        } => run_pixel(
            &input,
            PixelSettings {
                filter: PixelFilter::parse(&filter),
                resolution,
            },
            frames,
            seed,
            &output,
        ),
        Commands::Palette {
            input,
            output,
            json,
        } => run_palette(&input, output.as_deref(), json),
        Commands::Live(args) => run_live(args),
    }
}

fn version_string() -> String {
    match option_env!("GLYPHCAM_GIT_HASH") {
        Some(hash) => format!("{} ({hash})", env!("CARGO_PKG_VERSION")),
        None => env!("CARGO_PKG_VERSION").to_owned(),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_ascii(input: &Path, text: Option<&Path>, png: Option<&Path>) -> Result<()> {
    let mut source = StillSource::open(input)?;
    let mut pipeline = AsciiPipeline::new();
    pipeline.tick(&mut source)?;

    let grid = pipeline
        .last_grid()
        .context("ascii pipeline produced no grid")?;
    match text {
        Some(path) => write_text(&grid.to_text(), path)?,
        None if png.is_none() => print!("{}", grid.to_text()),
        None => {}
    }
    if let (Some(path), Some(surface)) = (png, pipeline.surface()) {
        write_png(surface, path)?;
    }
    Ok(())
}

fn run_pixel(
    input: &Path,
    settings: PixelSettings,
    frames: u64,
    seed: Option<u64>,
    output: &Path,
) -> Result<()> {
    let mut source = StillSource::open(input)?;
    let mut pipeline = PixelPipeline::new(seed)?;
    for _ in 0..frames.max(1) {
        pipeline.tick(&mut source, settings)?;
    }
    info!(
        filter = %settings.filter,
        resolution = settings.resolution,
        frames = frames.max(1),
        "pixel render done"
    );
    write_png(pipeline.surface(), output)?;
    Ok(())
}

fn run_palette(input: &Path, output: Option<&Path>, json: bool) -> Result<()> {
    let bytes =
        std::fs::read(input).with_context(|| format!("failed to read {}", input.display()))?;
    let source = StillSource::from_bytes(&bytes)
        .with_context(|| format!("failed to load {}", input.display()))?;
    let palette = extract_palette(source.image());

    if json {
        println!("{}", serde_json::to_string_pretty(&palette)?);
    } else {
        for color in palette.colors() {
            println!("{}", color.to_hex());
        }
    }
    if let Some(path) = output {
        write_png(&palette.render_strip()?, path)?;
    }
    Ok(())
}

fn run_live(args: LiveArgs) -> Result<()> {
    let config = resolve_live_config(&args)?;
    let source_config = config
        .source
        .clone()
        .context("live needs --input or a config with a source")?;

    let mut scheduler = Scheduler::from_config(&config)?;
    let mut source = FfmpegSource::spawn(&source_config)?;
    let mut sink = LatestSurfaces::default();
    info!(
        view = config.view.label(),
        filter = %config.filter,
        resolution = config.resolution,
        fps = config.fps,
        "live session starting"
    );

    let summary = scheduler.run(&mut source, &mut sink, config.frames)?;

    if let Some(surface) = sink.get(View::Pixel) {
        write_png(surface, &args.out_dir.join("pixel_art.png"))?;
    }
    if let Some(surface) = sink.get(View::Ascii) {
        write_png(surface, &args.out_dir.join("ascii.png"))?;
    }
    if let Some(grid) = scheduler.ascii().last_grid() {
        write_text(&grid.to_text(), &args.out_dir.join("ascii.txt"))?;
    }
    if args.palette {
        let palette = extract_from_source(&mut source);
        write_png(&palette.render_strip()?, &args.out_dir.join("palette.png"))?;
        println!("{}", palette.to_hex_strings().join(" "));
    }

    source.finish()?;
    println!(
        "Rendered {} tick(s) ({} ascii, {} pixel, {} overrun)",
        summary.ticks, summary.ascii_frames, summary.pixel_frames, summary.overruns
    );
    Ok(())
}

fn resolve_live_config(args: &LiveArgs) -> Result<SessionConfig> {
    let mut config = match &args.config {
        Some(path) => load_and_validate_config(path)?,
        None => SessionConfig::default(),
    };

    if let Some(input) = &args.input {
        let source = config.source.get_or_insert_with(FfmpegSourceConfig::default);
        source.input = input.clone();
    }
    if let Some(format) = &args.format {
        let source = config.source.get_or_insert_with(FfmpegSourceConfig::default);
        source.format = Some(format.clone());
    }
    if let Some(view) = args.view {
        config.view = view;
    }
    if let Some(filter) = &args.filter {
        config.filter = PixelFilter::parse(filter);
    }
    if let Some(resolution) = args.resolution {
        config.resolution = resolution;
    }
    if let Some(fps) = args.fps {
        config.fps = fps;
    }
    if args.frames.is_some() {
        config.frames = args.frames;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }

    config.validate()?;
    Ok(config)
}
