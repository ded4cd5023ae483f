use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use fxconfig::PowerSetting;

#[derive(Parser, Debug)]
#[command(
    name = "shaderfx",
    author,
    version,
    about = "Apply GPU shader effects to still images",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub overrides: Overrides,
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Settings that take precedence over the configuration file.
#[derive(Parser, Debug, Default)]
pub struct Overrides {
    /// Configuration file to load instead of the per-user one.
    #[arg(long, env = "SHADERFX_CONFIG", value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Directory the interactive menu lists images from.
    #[arg(long, value_name = "DIR", global = true)]
    pub input_dir: Option<PathBuf>,

    /// Directory processed images are written to (created if missing).
    #[arg(long, value_name = "DIR", global = true)]
    pub output_dir: Option<PathBuf>,

    /// Directory shader files are resolved against.
    #[arg(long, value_name = "DIR", global = true)]
    pub shader_root: Option<PathBuf>,

    /// GPU power preference: `high` or `low`.
    #[arg(long, value_name = "PREF", value_parser = parse_power, global = true)]
    pub power: Option<PowerSetting>,

    /// Accept a software rasteriser when no hardware adapter is present.
    #[arg(long, global = true)]
    pub allow_software: bool,

    /// How long to pause after a failed attempt (e.g. `5s`, `500ms`).
    #[arg(long, value_name = "DURATION", value_parser = parse_pause, global = true)]
    pub failure_pause: Option<Duration>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Apply one effect to one image and exit.
    Apply(ApplyArgs),
    /// List the effects in the active catalog.
    Effects,
    /// Initialize the GPU and print the selected adapter.
    Probe,
}

#[derive(Parser, Debug)]
pub struct ApplyArgs {
    /// Image to process.
    #[arg(value_name = "IMAGE")]
    pub image: PathBuf,

    /// Effect suffix (e.g. `blur`) or display name (e.g. "Color Inversion").
    #[arg(long, short, value_name = "SUFFIX|NAME")]
    pub effect: String,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_power(value: &str) -> Result<PowerSetting, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "high" | "high-performance" | "performance" => Ok(PowerSetting::High),
        "low" | "low-power" => Ok(PowerSetting::Low),
        other => Err(format!("invalid power preference '{other}'; expected `high` or `low`")),
    }
}

pub fn parse_pause(value: &str) -> Result<Duration, String> {
    let trimmed = value.trim();
    if let Ok(seconds) = trimmed.parse::<u64>() {
        return Ok(Duration::from_secs(seconds));
    }
    humantime::parse_duration(trimmed).map_err(|err| format!("invalid duration '{trimmed}': {err}"))
}
