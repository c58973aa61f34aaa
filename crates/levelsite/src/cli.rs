use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use renderer::{Antialiasing, ColorSpaceMode};

#[derive(Parser, Debug)]
#[command(
    name = "levelsite",
    author,
    version,
    about = "LEVEL studio site: liquid chrome background, stories and pages",
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open the site window (the default when no subcommand is given).
    Run(RunArgs),
    /// Render one frame of the background on the CPU and save it as PNG.
    Snapshot(SnapshotArgs),
    /// Print a page of the site as text or JSON.
    Page(PageArgs),
    /// Validate, print or locate the site configuration.
    Config(ConfigCommand),
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Site configuration file; defaults to `<config dir>/site.toml`, then the bundled content.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Initial window size in logical pixels (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<(u32, u32)>,

    /// Optional FPS cap for the background (0 = follow the display).
    #[arg(long, value_name = "FPS")]
    pub fps: Option<f32>,

    /// Anti-aliasing policy: `auto`, `off`, or an explicit MSAA sample count (e.g. `4`).
    #[arg(long, value_name = "MODE", value_parser = parse_antialias, default_value = "auto")]
    pub antialias: Antialiasing,

    /// Output color space handling: `auto`, `gamma`, or `linear`.
    #[arg(long, value_name = "MODE", value_parser = parse_color_space, default_value = "auto")]
    pub color_space: ColorSpaceMode,

    /// Poll the configuration file and apply background changes without reopening the window.
    #[arg(long)]
    pub watch: bool,

    /// Open the N-th story (1-based) as soon as the window appears.
    #[arg(long, value_name = "N")]
    pub story: Option<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct SnapshotArgs {
    /// Destination PNG path.
    #[arg(long, value_name = "FILE")]
    pub out: PathBuf,

    /// Image size in pixels.
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size, default_value = "1280x720")]
    pub size: (u32, u32),

    /// Wall-clock seconds of animation to simulate before capturing.
    #[arg(long, value_name = "SECONDS", default_value_t = 0.0)]
    pub time: f64,

    /// Normalised pointer position `X,Y` in `[0,1]`, origin bottom-left.
    #[arg(long, value_name = "X,Y", value_parser = parse_pointer)]
    pub pointer: Option<(f32, f32)>,

    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct PageArgs {
    /// Route to print, e.g. `/pricing`.
    #[arg(value_name = "PATH", default_value = "/")]
    pub path: String,

    /// Logical viewport width used to pick the navigation layout.
    #[arg(long, value_name = "PX", default_value_t = 1280.0)]
    pub width: f64,

    /// Emit JSON instead of text.
    #[arg(long)]
    pub json: bool,

    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Parse and validate the configuration.
    Check(ConfigFileArgs),
    /// Print the effective configuration as TOML.
    Show(ConfigFileArgs),
    /// Print resolved directories and the default config location.
    Where,
}

#[derive(Args, Debug, Clone)]
pub struct ConfigFileArgs {
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let trimmed = value.trim();
    let (w, h) = trimmed
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("invalid size '{trimmed}'; expected WIDTHxHEIGHT"))?;
    let width: u32 = w
        .trim()
        .parse()
        .map_err(|_| format!("invalid width '{}'", w.trim()))?;
    let height: u32 = h
        .trim()
        .parse()
        .map_err(|_| format!("invalid height '{}'", h.trim()))?;
    if width == 0 || height == 0 {
        return Err("size must be greater than zero".to_string());
    }
    Ok((width, height))
}

pub fn parse_antialias(value: &str) -> Result<Antialiasing, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("anti-alias mode must not be empty".to_string());
    }

    let normalized = trimmed.to_ascii_lowercase();
    match normalized.as_str() {
        "auto" | "max" | "default" => Ok(Antialiasing::Auto),
        "off" | "none" | "disable" | "disabled" | "0" | "1" => Ok(Antialiasing::Off),
        _ => {
            let samples: u32 = normalized.parse().map_err(|_| {
                format!("invalid anti-alias sample count '{trimmed}'; use auto/off or 2/4/8/16")
            })?;
            if !matches!(samples, 2 | 4 | 8 | 16) {
                return Err(format!(
                    "unsupported sample count {samples}; supported values are 2, 4, 8, or 16"
                ));
            }
            Ok(Antialiasing::Samples(samples))
        }
    }
}

pub fn parse_color_space(value: &str) -> Result<ColorSpaceMode, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("color space must not be empty".to_string());
    }

    match trimmed.to_ascii_lowercase().as_str() {
        "auto" => Ok(ColorSpaceMode::Auto),
        "gamma" | "srgb-off" => Ok(ColorSpaceMode::Gamma),
        "linear" | "srgb" => Ok(ColorSpaceMode::Linear),
        other => Err(format!(
            "unknown color space '{other}'; expected auto, gamma, or linear"
        )),
    }
}

pub fn parse_pointer(value: &str) -> Result<(f32, f32), String> {
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| format!("invalid pointer '{value}'; expected X,Y"))?;
    let parse = |raw: &str| -> Result<f32, String> {
        let parsed: f32 = raw
            .trim()
            .parse()
            .map_err(|_| format!("invalid pointer coordinate '{}'", raw.trim()))?;
        if !(0.0..=1.0).contains(&parsed) {
            return Err(format!("pointer coordinate {parsed} must be within [0, 1]"));
        }
        Ok(parsed)
    };
    Ok((parse(x)?, parse(y)?))
}
