use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::Level;

use photonreel::{
    ConverterConfig, EncoderKind, FrameStatus, MovieConfig, Overrides, ProjectConfig, Vec3,
};

#[derive(Parser, Debug)]
#[command(name = "photonreel", version)]
struct Cli {
    /// Log debug detail, including every external command line.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a starter project file for a built-in preset.
    Init(InitArgs),
    /// Write the scene file of every frame without rendering.
    Generate(GenerateArgs),
    /// Generate, render and assemble a project.
    Render(RenderArgs),
    /// Assemble previously rendered frame images into a movie.
    Assemble(AssembleArgs),
    /// List built-in presets.
    Presets,
}

#[derive(Args, Debug)]
struct InitArgs {
    #[arg(long, default_value = "room1")]
    preset: String,

    /// Output project JSON.
    #[arg(long, default_value = "project.json")]
    out: PathBuf,

    /// Spell out the preset's scene instead of referencing it by name.
    #[arg(long)]
    inline: bool,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Project JSON.
    #[arg(long)]
    config: PathBuf,

    #[arg(long)]
    out_dir: PathBuf,

    #[command(flatten)]
    overrides: OverrideArgs,
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// Project JSON.
    #[arg(long)]
    config: PathBuf,

    /// Directory for scene files and rendered images.
    #[arg(long)]
    work_dir: PathBuf,

    /// Stop after rendering.
    #[arg(long)]
    no_movie: bool,

    #[command(flatten)]
    overrides: OverrideArgs,
}

#[derive(Args, Debug)]
struct AssembleArgs {
    /// Directory holding the rendered frame images.
    #[arg(long)]
    dir: PathBuf,

    /// Output movie path.
    #[arg(long)]
    out: PathBuf,

    /// Extension of the rendered frame images.
    #[arg(long, default_value = "ppm")]
    ext: String,

    #[arg(long, default_value_t = 10)]
    fps: u32,

    #[arg(long, default_value = "msmpeg4v2")]
    codec: String,

    #[arg(long, default_value_t = 800)]
    bitrate: u32,

    /// Intermediate image quality (1-100).
    #[arg(long, default_value_t = 100)]
    quality: u8,

    #[arg(long, value_enum, default_value_t = EncoderChoice::Ffmpeg)]
    encoder: EncoderChoice,

    /// External image converter (e.g. `convert`); the built-in converter is used when absent.
    #[arg(long)]
    converter: Option<String>,

    /// Per-command timeout in seconds.
    #[arg(long)]
    timeout: Option<u64>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum EncoderChoice {
    Ffmpeg,
    Mencoder,
}

#[derive(Args, Debug)]
struct OverrideArgs {
    /// Renderer thread count.
    #[arg(long)]
    threads: Option<u32>,

    #[arg(long)]
    ray_depth: Option<u32>,

    #[arg(long)]
    anti_aliasing: Option<bool>,

    #[arg(long)]
    photon_depth: Option<u32>,

    #[arg(long)]
    photon_count: Option<u32>,

    #[arg(long)]
    photon_radius: Option<f64>,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    /// Camera eye as `x,y,z`.
    #[arg(long, value_parser = parse_vec3)]
    eye: Option<Vec3>,

    /// Camera look-at point as `x,y,z`.
    #[arg(long, value_parser = parse_vec3)]
    look_at: Option<Vec3>,

    /// First frame index of the sweep.
    #[arg(long)]
    first_frame: Option<u64>,

    /// Frame index the sweep stops before.
    #[arg(long)]
    end_frame: Option<u64>,

    /// Per-command timeout in seconds.
    #[arg(long)]
    timeout: Option<u64>,

    #[arg(long)]
    fps: Option<u32>,

    #[arg(long)]
    codec: Option<String>,

    #[arg(long)]
    bitrate: Option<u32>,
}

impl OverrideArgs {
    fn into_overrides(self) -> Overrides {
        Overrides {
            threads: self.threads,
            max_ray_depth: self.ray_depth,
            anti_aliasing: self.anti_aliasing,
            max_photon_depth: self.photon_depth,
            photon_search_count: self.photon_count,
            photon_search_radius: self.photon_radius,
            width: self.width,
            height: self.height,
            eye: self.eye,
            look_at: self.look_at,
            first_frame: self.first_frame,
            end_frame: self.end_frame,
            timeout_secs: self.timeout,
            fps: self.fps,
            codec: self.codec,
            bitrate_kbps: self.bitrate,
        }
    }
}

fn parse_vec3(s: &str) -> Result<Vec3, String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    let &[x, y, z] = parts.as_slice() else {
        return Err(format!("expected x,y,z but got '{s}'"));
    };
    let num = |v: &str| {
        v.parse::<f64>()
            .map_err(|e| format!("invalid number '{v}': {e}"))
    };
    Ok(Vec3::new(num(x)?, num(y)?, num(z)?))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);
    match cli.cmd {
        Command::Init(args) => cmd_init(args),
        Command::Generate(args) => cmd_generate(args),
        Command::Render(args) => cmd_render(args),
        Command::Assemble(args) => cmd_assemble(args),
        Command::Presets => cmd_presets(),
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let level = if verbose {
        Level::DEBUG
    } else if quiet {
        Level::WARN
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .init();
}

fn load_project(path: &Path, overrides: OverrideArgs) -> anyhow::Result<ProjectConfig> {
    let mut cfg = ProjectConfig::load(path)?;
    overrides
        .into_overrides()
        .apply(&mut cfg)
        .with_context(|| format!("apply command-line overrides to '{}'", path.display()))?;
    Ok(cfg)
}

fn cmd_init(args: InitArgs) -> anyhow::Result<()> {
    let mut cfg = ProjectConfig::for_preset(&args.preset)?;
    if args.inline {
        cfg.materialize()?;
    }
    cfg.save(&args.out)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_generate(args: GenerateArgs) -> anyhow::Result<()> {
    let cfg = load_project(&args.config, args.overrides)?;
    let written = cfg.generate(&args.out_dir)?;
    eprintln!(
        "wrote {} scene file(s) to {}",
        written.len(),
        args.out_dir.display()
    );
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let cfg = load_project(&args.config, args.overrides)?;
    let mut renderer = cfg.command_renderer(None);
    let report = cfg.render_with(&args.work_dir, &mut renderer, None)?;

    let summary = report.summary();
    println!("{summary}");
    for f in report.failures() {
        match &f.status {
            FrameStatus::Failed(why) => eprintln!("  frame {}: {why}", f.index),
            FrameStatus::Invalid(defects) => {
                for d in defects {
                    eprintln!("  frame {}: {d}", f.index);
                }
            }
            FrameStatus::Rendered | FrameStatus::Skipped => {}
        }
    }

    if !args.no_movie {
        let movie = cfg.assemble(&report, None)?;
        println!(
            "wrote {} ({} frame(s))",
            movie.out_path.display(),
            movie.frames
        );
    }

    if !summary.is_clean() {
        anyhow::bail!(
            "{} of {} frame(s) did not render",
            summary.total - summary.rendered,
            summary.total
        );
    }
    Ok(())
}

fn cmd_assemble(args: AssembleArgs) -> anyhow::Result<()> {
    let frames = photonreel::collect_frame_images(&args.dir, &args.ext)?;
    let cfg = MovieConfig {
        out_path: args.out,
        fps: args.fps,
        codec: args.codec,
        bitrate_kbps: args.bitrate,
        quality: args.quality,
        encoder: match args.encoder {
            EncoderChoice::Ffmpeg => EncoderKind::Ffmpeg,
            EncoderChoice::Mencoder => EncoderKind::Mencoder,
        },
        converter: match args.converter {
            Some(program) => ConverterConfig::External { program },
            None => ConverterConfig::Builtin,
        },
        timeout_secs: args.timeout,
        ..MovieConfig::default()
    };
    let movie = photonreel::assemble_with_config(&frames, &cfg, None)?;
    println!(
        "wrote {} ({} frame(s))",
        movie.out_path.display(),
        movie.frames
    );
    Ok(())
}

fn cmd_presets() -> anyhow::Result<()> {
    for name in photonreel::PRESET_NAMES {
        let p = photonreel::scene::presets::by_name(name)?;
        println!("{:<8} {}", p.name, p.summary);
    }
    Ok(())
}
