use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use fxchain_core::hash::hash_frame;
use fxchain_core::{FrameBuffer, FrameClock, FxResult, ParamValue, PresetConfig};
use fxchain_render::image_loader::{load_image, resize_exact, save_image};
use fxchain_render::{Composer, EffectRegistry};

#[derive(Parser)]
#[command(
    name = "fxchain",
    version,
    about = "fxchain: ordered post-processing stages over images",
    long_about = "Runs a TOML preset of post-processing stages over a source image.\nStages are built-in effects or small per-pixel programs."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a preset over an image
    Render {
        /// Path to the preset (.toml)
        #[arg()]
        preset: PathBuf,

        /// Source image
        #[arg(short, long)]
        input: PathBuf,

        /// Where to write the last frame
        #[arg(short, long)]
        output: PathBuf,

        /// Number of frames to run; time advances at the preset fps
        #[arg(long, default_value_t = 1)]
        frames: u64,

        /// Print the last frame report as JSON
        #[arg(long)]
        report: bool,
    },

    /// Build a preset's pipeline and report every stage
    Check {
        /// Path to the preset (.toml)
        #[arg()]
        preset: PathBuf,
    },

    /// List built-in effect kinds and their parameters
    Effects {
        /// Machine-readable output
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let json_stdout = matches!(
        cli.command,
        Commands::Effects { json: true } | Commands::Render { report: true, .. }
    );

    let subscriber = tracing_subscriber::fmt().with_env_filter(
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    );

    if json_stdout {
        // Keep stdout parseable.
        subscriber
            .with_ansi(false)
            .with_writer(std::io::stderr)
            .init();
    } else {
        subscriber.init();
    }

    match cli.command {
        Commands::Render {
            preset,
            input,
            output,
            frames,
            report,
        } => cmd_render(&preset, &input, &output, frames, report),
        Commands::Check { preset } => cmd_check(&preset),
        Commands::Effects { json } => cmd_effects(json),
    }
}

/// Load a preset and build its pipeline. Texture paths are relative to the
/// preset file.
fn build_pipeline(preset_path: &Path) -> Result<(PresetConfig, Composer)> {
    let preset = PresetConfig::load_from_file(preset_path)
        .with_context(|| format!("failed to load preset: {}", preset_path.display()))?;
    let base = preset_path.parent().unwrap_or(Path::new(".")).to_path_buf();
    let registry = EffectRegistry::with_builtins();
    let mut load_texture = |p: &Path| -> FxResult<FrameBuffer> { load_image(&base.join(p)) };
    let composer = Composer::from_preset(&preset, &registry, &mut load_texture)
        .with_context(|| format!("failed to build pipeline from {}", preset_path.display()))?;
    Ok((preset, composer))
}

fn cmd_render(
    preset_path: &Path,
    input: &Path,
    output: &Path,
    frames: u64,
    report: bool,
) -> Result<()> {
    let start = Instant::now();
    let (preset, mut composer) = build_pipeline(preset_path)?;
    let (width, height) = (preset.output.width, preset.output.height);

    let mut source = load_image(input)?;
    if source.dimensions() != (width, height) {
        tracing::info!(
            from = ?source.dimensions(),
            to = ?(width, height),
            "resampling input to preset resolution"
        );
        source = resize_exact(&source, width, height);
    }

    // With --report, stdout carries only the JSON report.
    let status = |line: String| {
        if report {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
    };

    status(format!("▶ Rendering {}", preset_path.display()));
    status(format!("   Input:  {}", input.display()));
    status(format!(
        "   Stages: {} ({} enabled)",
        composer.len(),
        composer.enabled_count()
    ));

    let mut clock = FrameClock::new(preset.output.fps, width, height);
    let mut last = None;
    for _ in 0..frames.max(1) {
        let ctx = clock.tick();
        let frame = composer
            .render(&source, &ctx)
            .with_context(|| format!("frame {} failed", ctx.frame.index))?;
        last = Some(frame);
    }
    let last = last.unwrap_or(source);

    save_image(&last, output)?;
    let hash = hash_frame(&last);
    tracing::info!(hash = %hash, "frame written");

    status(format!(
        "   ✓ Wrote {} ({}x{})",
        output.display(),
        last.width,
        last.height
    ));
    status(format!("   Hash:   {}", hash));
    status(format!("   Time:   {:.2?}", start.elapsed()));

    if report {
        if let Some(r) = composer.last_report() {
            println!("{}", serde_json::to_string_pretty(r)?);
        }
    }
    Ok(())
}

fn cmd_check(preset_path: &Path) -> Result<()> {
    println!("🔍 Checking {}", preset_path.display());
    let (preset, composer) = build_pipeline(preset_path)?;
    println!(
        "   ✓ Output {}x{} @ {} fps",
        preset.output.width, preset.output.height, preset.output.fps
    );
    for stage in composer.stages() {
        let state = if stage.is_enabled() { "on" } else { "off" };
        println!("   ✓ {} [{}] {}", stage.id(), stage.kind(), state);
        for (def, value) in stage.params().iter() {
            println!("       {} = {}", def.name, describe(value));
        }
    }
    println!("   ✓ {} stage(s) OK", composer.len());
    Ok(())
}

fn describe(value: &ParamValue) -> String {
    match value {
        ParamValue::Texture(t) => format!("texture '{}'", t.name()),
        ParamValue::Color(c) => c.to_string(),
        other => serde_json::to_string(other).unwrap_or_else(|_| other.kind().to_string()),
    }
}

fn cmd_effects(json: bool) -> Result<()> {
    let registry = EffectRegistry::with_builtins();
    let list = registry.list();
    if json {
        println!("{}", serde_json::to_string_pretty(&list)?);
        return Ok(());
    }
    for info in list {
        println!("{:<12} {}", info.kind, info.description);
        for def in &info.params {
            println!("    {:<14} {}", def.name, def.param_type);
        }
    }
    Ok(())
}
