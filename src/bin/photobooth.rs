use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use photobooth::{
    BoothConfig, CaptureMode, CaptureSequencer, Clock, Compositor, DirectoryCamera,
    DirectoryDelivery, FileDelivery as _, FilterSpec, ManualClock, OutputFormat,
    Progress, RawFrame, Rgb8, Status, SystemClock, drive,
};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug)]
#[command(name = "photobooth", version)]
struct Cli {
    /// Booth settings JSON. Command-line flags override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Capture one photo and export it.
    Single(SingleArgs),
    /// Capture a three-photo strip and export it.
    Strip(StripArgs),
    /// Composite existing image files (1 or 3) without capturing.
    Compose(ComposeArgs),
}

#[derive(Args, Debug)]
struct StyleArgs {
    /// Filter: normal, monochrome, sepia-tone, polaroid, film, old-photo.
    #[arg(long)]
    filter: Option<FilterSpec>,

    /// Frame color: a palette name (white, blush, mint, lemon, lavender, black) or #rrggbb.
    #[arg(long = "color")]
    frame_color: Option<Rgb8>,

    /// Label text drawn under the photos.
    #[arg(long)]
    label: Option<String>,

    /// Do not draw the label.
    #[arg(long, default_value_t = false)]
    no_label: bool,

    /// Output format: jpg or png.
    #[arg(long)]
    format: Option<OutputFormat>,

    /// TTF/OTF font used for the label (default: built-in DejaVu Sans).
    #[arg(long)]
    font: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct SingleArgs {
    /// Directory of still frames standing in for the camera.
    #[arg(long)]
    camera_dir: PathBuf,

    /// Output directory.
    #[arg(long, default_value = ".")]
    out: PathBuf,

    /// Skip the countdown and capture right away.
    #[arg(long, default_value_t = false)]
    immediate: bool,

    /// Run the countdown on a virtual clock instead of waiting.
    #[arg(long, default_value_t = false)]
    no_wait: bool,

    #[command(flatten)]
    style: StyleArgs,
}

#[derive(Args, Debug)]
struct StripArgs {
    /// Directory of still frames standing in for the camera.
    #[arg(long)]
    camera_dir: PathBuf,

    /// Output directory.
    #[arg(long, default_value = ".")]
    out: PathBuf,

    /// Run the countdown on a virtual clock instead of waiting.
    #[arg(long, default_value_t = false)]
    no_wait: bool,

    #[command(flatten)]
    style: StyleArgs,
}

#[derive(Args, Debug)]
struct ComposeArgs {
    /// Input images, in slot order.
    #[arg(long = "in", required = true, num_args = 1..)]
    inputs: Vec<PathBuf>,

    /// Output directory.
    #[arg(long, default_value = ".")]
    out: PathBuf,

    #[command(flatten)]
    style: StyleArgs,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let cfg = match &cli.config {
        Some(path) => BoothConfig::from_path(path)?,
        None => BoothConfig::default(),
    };
    match cli.cmd {
        Command::Single(args) => cmd_capture(cfg, CaptureMode::Single, args.into()),
        Command::Strip(args) => cmd_capture(cfg, CaptureMode::Strip, args.into()),
        Command::Compose(args) => cmd_compose(cfg, args),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

struct CaptureArgs {
    camera_dir: PathBuf,
    out: PathBuf,
    immediate: bool,
    no_wait: bool,
    style: StyleArgs,
}

impl From<SingleArgs> for CaptureArgs {
    fn from(a: SingleArgs) -> Self {
        Self {
            camera_dir: a.camera_dir,
            out: a.out,
            immediate: a.immediate,
            no_wait: a.no_wait,
            style: a.style,
        }
    }
}

impl From<StripArgs> for CaptureArgs {
    fn from(a: StripArgs) -> Self {
        Self {
            camera_dir: a.camera_dir,
            out: a.out,
            immediate: false,
            no_wait: a.no_wait,
            style: a.style,
        }
    }
}

fn cmd_capture(mut cfg: BoothConfig, mode: CaptureMode, args: CaptureArgs) -> anyhow::Result<()> {
    cfg.mode = mode;
    apply_style(&mut cfg, args.style);
    let compositor = build_compositor(&cfg)?;

    let camera = DirectoryCamera::open(&args.camera_dir)?;
    let mut sequencer = CaptureSequencer::new(camera).with_timing(cfg.timing)?;

    let capture = if args.immediate {
        sequencer.capture_now()?
    } else {
        let mut system = SystemClock;
        let mut manual = ManualClock::default();
        let clock: &mut dyn Clock = if args.no_wait {
            &mut manual
        } else {
            &mut system
        };
        drive(&mut sequencer, cfg.mode, clock, report_progress)?
    };

    let image = compositor.export_capture(&capture)?;
    let mut delivery = DirectoryDelivery::new(&args.out);
    delivery.deliver(&image)?;
    eprintln!("wrote {}", delivery.path_for(&image).display());
    Ok(())
}

fn cmd_compose(mut cfg: BoothConfig, args: ComposeArgs) -> anyhow::Result<()> {
    apply_style(&mut cfg, args.style);
    let compositor = build_compositor(&cfg)?;

    let slots = args
        .inputs
        .iter()
        .map(|path| {
            let bytes = std::fs::read(path)
                .with_context(|| format!("read input image '{}'", path.display()))?;
            Ok(Some(RawFrame::from_encoded(bytes)?))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let image = compositor.export(&slots)?;
    let mut delivery = DirectoryDelivery::new(&args.out);
    delivery.deliver(&image)?;
    eprintln!("wrote {}", delivery.path_for(&image).display());
    Ok(())
}

fn apply_style(cfg: &mut BoothConfig, style: StyleArgs) {
    if let Some(filter) = style.filter {
        cfg.filter = filter;
    }
    if let Some(color) = style.frame_color {
        cfg.frame_color = color;
    }
    if let Some(label) = style.label {
        cfg.label_text = label;
    }
    if style.no_label {
        cfg.show_label = false;
    }
    if let Some(format) = style.format {
        cfg.format = format;
    }
    if let Some(font) = style.font {
        cfg.label_font = Some(font);
    }
}

fn build_compositor(cfg: &BoothConfig) -> anyhow::Result<Compositor> {
    let mut compositor = Compositor::new(cfg.composition())?;
    if let Some(font) = cfg.load_label_font()? {
        compositor = compositor.with_label_font(font);
    }
    Ok(compositor)
}

fn report_progress(p: &Progress) {
    match p.status {
        Status::CountingDown(n) => {
            tracing::info!(shot = p.shots_taken + 1, of = p.shots_required, "{n}...")
        }
        Status::Paused => {
            tracing::info!(taken = p.shots_taken, of = p.shots_required, "next shot")
        }
        Status::Capturing | Status::Complete | Status::Idle => {}
    }
}

