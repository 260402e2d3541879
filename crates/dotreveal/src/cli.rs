use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "dotreveal",
    author,
    version,
    about = "Animated dot-matrix reveal effect",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Flags shared by every mode that builds the effect.
#[derive(Args, Debug, Clone, Default)]
pub struct EffectArgs {
    /// Effect configuration file; defaults to `effect.toml` in the config directory.
    #[arg(long, value_name = "FILE", env = "DOTREVEAL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the reveal animation speed.
    #[arg(long, value_name = "FACTOR", value_parser = parse_finite)]
    pub speed: Option<f32>,

    /// Override the lit square size inside each cell.
    #[arg(long, value_name = "PIXELS", value_parser = parse_positive)]
    pub dot_size: Option<f32>,

    /// Disable the bottom fade overlay.
    #[arg(long)]
    pub no_gradient: bool,
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    #[command(flatten)]
    pub effect: EffectArgs,

    /// Cap on `u_time` updates per second.
    #[arg(long, value_name = "FPS", value_parser = parse_positive)]
    pub fps: Option<f32>,

    /// Window size in logical pixels (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<(u32, u32)>,

    /// Hold `u_time` at this many seconds instead of animating.
    #[arg(long, value_name = "SECONDS", value_parser = parse_non_negative)]
    pub still_time: Option<f32>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render one frame on the CPU and write it as PNG.
    Export(ExportArgs),
    /// Print the uniforms of every layer as JSON.
    Uniforms(InspectArgs),
    /// Print generated shader source.
    Shader(ShaderArgs),
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    #[command(flatten)]
    pub effect: EffectArgs,

    /// Seconds of animation to evaluate.
    #[arg(long, value_name = "SECONDS", default_value_t = 5.0, value_parser = parse_non_negative)]
    pub time: f32,

    /// Destination PNG path.
    #[arg(long, short, value_name = "PATH", value_parser = parse_export_path)]
    pub output: PathBuf,

    /// Image size in logical pixels; defaults to the configured surface size.
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<(u32, u32)>,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    #[command(flatten)]
    pub effect: EffectArgs,

    /// Viewport used to report `u_resolution`.
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<(u32, u32)>,
}

#[derive(Args, Debug)]
pub struct ShaderArgs {
    #[command(flatten)]
    pub effect: EffectArgs,

    /// Print the vertex stage instead of the fragment stage.
    #[arg(long)]
    pub vertex: bool,

    /// Print the gradient overlay instead of the dot matrix.
    #[arg(long)]
    pub overlay: bool,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let (w, h) = value
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(|| "expected WIDTHxHEIGHT".to_string())?;
    let width = w
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid width '{}'", w.trim()))?;
    let height = h
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid height '{}'", h.trim()))?;
    if width == 0 || height == 0 {
        return Err("size must be greater than zero".into());
    }
    Ok((width, height))
}

fn parse_float(value: &str) -> Result<f32, String> {
    let parsed = value
        .trim()
        .parse::<f32>()
        .map_err(|_| format!("'{value}' is not a number"))?;
    if !parsed.is_finite() {
        return Err(format!("'{value}' is not a finite number"));
    }
    Ok(parsed)
}

pub fn parse_finite(value: &str) -> Result<f32, String> {
    parse_float(value)
}

pub fn parse_positive(value: &str) -> Result<f32, String> {
    let parsed = parse_float(value)?;
    if parsed <= 0.0 {
        return Err(format!("value must be greater than zero, got {parsed}"));
    }
    Ok(parsed)
}

pub fn parse_non_negative(value: &str) -> Result<f32, String> {
    let parsed = parse_float(value)?;
    if parsed < 0.0 {
        return Err(format!("value must be non-negative, got {parsed}"));
    }
    Ok(parsed)
}

pub fn parse_export_path(value: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(value);
    match extension(&path).as_deref() {
        Some("png") => Ok(path),
        None => Err("export path has no extension; expected .png".to_string()),
        Some(other) => Err(format!(
            "unsupported export format '.{other}'; expected .png"
        )),
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}
