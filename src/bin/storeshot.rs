use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "storeshot", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compose a single screenshot into a marketing image.
    Compose(ComposeArgs),
    /// Compose every screenshot for every device in a build config.
    Batch(BatchArgs),
    /// List the frame catalog.
    Frames(FramesArgs),
}

#[derive(Parser, Debug)]
struct ComposeArgs {
    /// Input screenshot (PNG or JPEG).
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Device class: phone, tablet, desktop or watch.
    #[arg(long, default_value = "phone")]
    class: String,

    /// Output width in pixels.
    #[arg(long)]
    width: u32,

    /// Output height in pixels.
    #[arg(long)]
    height: u32,

    /// Explicit frame name (orientation-compatible preferences win).
    #[arg(long)]
    frame: Option<String>,

    /// Directory holding bezel art (`<frame name>.png`).
    #[arg(long)]
    frames_dir: Option<PathBuf>,

    /// Caption text (already localized).
    #[arg(long)]
    caption: Option<String>,

    /// Caption font file (TTF/OTF). Without one, captions render blank.
    #[arg(long)]
    font: Option<PathBuf>,

    /// Gradient preset id for the background.
    #[arg(long)]
    preset: Option<String>,

    /// Frame catalog JSON replacing the builtin table.
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Downsample the output for quick inspection.
    #[arg(long)]
    preview: bool,
}

#[derive(Parser, Debug)]
struct BatchArgs {
    /// Build config JSON: `{ "defaults": {...}, "devices": [...] }`.
    #[arg(long)]
    config: PathBuf,

    /// Output directory.
    #[arg(long)]
    out: PathBuf,

    /// Directory holding bezel art (`<frame name>.png`).
    #[arg(long)]
    frames_dir: Option<PathBuf>,

    /// Uniform caption applied to every screenshot.
    #[arg(long)]
    caption: Option<String>,

    /// JSON object mapping file stems to captions.
    #[arg(long)]
    captions: Option<PathBuf>,

    /// Concurrent compositions per group.
    #[arg(long, default_value_t = storeshot::batch::DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Frame catalog JSON replacing the builtin table.
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Downsample outputs for quick inspection.
    #[arg(long)]
    preview: bool,
}

#[derive(Parser, Debug)]
struct FramesArgs {
    /// Frame catalog JSON replacing the builtin table.
    #[arg(long)]
    catalog: Option<PathBuf>,
}

#[derive(serde::Deserialize, Debug)]
struct BuildConfig {
    #[serde(default)]
    defaults: storeshot::Defaults,
    devices: Vec<storeshot::DeviceConfig>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Compose(args) => cmd_compose(args),
        Command::Batch(args) => cmd_batch(args),
        Command::Frames(args) => cmd_frames(args),
    }
}

fn load_registry(catalog: Option<&Path>) -> anyhow::Result<storeshot::FrameRegistry> {
    Ok(match catalog {
        Some(path) => storeshot::FrameRegistry::from_json_file(path)?,
        None => storeshot::FrameRegistry::builtin(),
    })
}

fn parse_class(s: &str) -> anyhow::Result<storeshot::DeviceClass> {
    Ok(match s {
        "phone" => storeshot::DeviceClass::Phone,
        "tablet" => storeshot::DeviceClass::Tablet,
        "desktop" => storeshot::DeviceClass::Desktop,
        "watch" => storeshot::DeviceClass::Watch,
        other => anyhow::bail!("unknown device class '{other}'"),
    })
}

fn cmd_compose(args: ComposeArgs) -> anyhow::Result<()> {
    let registry = load_registry(args.catalog.as_deref())?;
    let class = parse_class(&args.class)?;

    let screenshot = image::open(&args.in_path)
        .with_context(|| format!("decode screenshot '{}'", args.in_path.display()))?
        .to_rgba8();
    let (sw, sh) = screenshot.dimensions();

    let frame = storeshot::select_frame(&registry, sw, sh, class, args.frame.as_deref()).cloned();
    let frame_art = match (&frame, &args.frames_dir) {
        (Some(f), Some(dir)) => registry.load_frame_art(f, dir),
        _ => None,
    };

    let font = args
        .font
        .as_deref()
        .and_then(storeshot::CaptionFont::load)
        .map(std::sync::Arc::new);
    let caption = args.caption.map(|text| storeshot::CaptionRequest {
        text,
        settings: storeshot::CaptionSettings::default(),
        font,
    });

    let gradient = args
        .preset
        .as_deref()
        .and_then(storeshot::background::preset)
        .unwrap_or_else(storeshot::background::default_gradient);

    let request = storeshot::CompositionRequest {
        screenshot,
        frame,
        frame_art,
        caption,
        background: storeshot::BackgroundSpec::Gradient(gradient),
        output_width: args.width,
        output_height: args.height,
        frame_position: storeshot::FramePosition::default(),
        frame_scale: 1.0,
        partial_frame_pct: 0.0,
        corner_radius: 0,
        preview: args.preview,
    };

    let out = storeshot::compose(&request)?;
    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    out.image
        .save_with_format(&args.out, image::ImageFormat::Png)
        .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!(
        "wrote {} ({}x{}, frame: {})",
        args.out.display(),
        out.report.width,
        out.report.height,
        out.report.frame_used.as_deref().unwrap_or("none")
    );
    Ok(())
}

fn cmd_batch(args: BatchArgs) -> anyhow::Result<()> {
    let registry = load_registry(args.catalog.as_deref())?;

    let bytes = std::fs::read(&args.config)
        .with_context(|| format!("read build config '{}'", args.config.display()))?;
    let build: BuildConfig =
        serde_json::from_slice(&bytes).context("parse build config JSON")?;

    let captions = if let Some(path) = &args.captions {
        let bytes = std::fs::read(path)
            .with_context(|| format!("read captions '{}'", path.display()))?;
        storeshot::CaptionSource::PerStem(
            serde_json::from_slice(&bytes).context("parse captions JSON")?,
        )
    } else if let Some(text) = args.caption {
        storeshot::CaptionSource::Uniform(text)
    } else {
        storeshot::CaptionSource::None
    };

    let mut failed_total = 0u64;
    for device in &build.devices {
        let resolved = storeshot::resolve(&build.defaults, device)?;
        let opts = storeshot::BatchOptions {
            concurrency: args.concurrency,
            output_dir: args.out.join(device.input_dir.file_name().unwrap_or_default()),
            frames_dir: args.frames_dir.clone(),
            preview: args.preview,
        };
        let (outcomes, stats) = storeshot::run_batch(&registry, &resolved, &captions, &opts)?;
        for outcome in outcomes.iter().filter(|o| !o.succeeded()) {
            eprintln!(
                "failed: {} ({})",
                outcome.input.display(),
                outcome.error.as_deref().unwrap_or("unknown")
            );
        }
        eprintln!(
            "{}: {} composed, {} failed",
            device.input_dir.display(),
            stats.succeeded,
            stats.failed
        );
        failed_total += stats.failed;
    }

    if failed_total > 0 {
        anyhow::bail!("{failed_total} composition(s) failed");
    }
    Ok(())
}

fn cmd_frames(args: FramesArgs) -> anyhow::Result<()> {
    let registry = load_registry(args.catalog.as_deref())?;
    for f in registry.frames() {
        println!(
            "{:<24} {:<10} {:<10} {}x{} screen {}x{}+{}+{}",
            f.name,
            format!("{:?}", f.class).to_lowercase(),
            format!("{:?}", f.orientation).to_lowercase(),
            f.width,
            f.height,
            f.screen.width,
            f.screen.height,
            f.screen.x,
            f.screen.y
        );
    }
    Ok(())
}
