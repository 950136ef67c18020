use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::device::Model;
use crate::display::Rect;
use crate::mapping::ScalingMode;
use crate::orientation::Orientation;

#[derive(Parser)]
#[command(name = "rm-mouse")]
#[command(about = "Use a reMarkable tablet as a mouse or pen tablet")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Enable debug messages
    #[arg(long)]
    pub debug: bool,

    /// reMarkable host (IP or hostname)
    #[arg(long, env = "RMMOUSE_HOST")]
    pub host: Option<String>,

    /// SSH key path for authentication
    #[arg(long)]
    pub key_path: Option<String>,

    /// SSH password (if set, key_path is ignored)
    #[arg(long, env = "RMMOUSE_PASSWORD")]
    pub password: Option<String>,

    /// Device model, skips probing (rm1, rm2, rmpp)
    #[arg(long, value_parser = clap::value_parser!(Model))]
    pub device: Option<Model>,

    /// Pen input device path on reMarkable
    #[arg(long)]
    pub pen_device: Option<String>,

    /// Touch input device path on reMarkable
    #[arg(long)]
    pub touch_device: Option<String>,

    /// Run pen input only (no touch)
    #[arg(long)]
    pub pen_only: bool,

    /// Run touch input only (no pen)
    #[arg(long)]
    pub touch_only: bool,

    /// Where pen input goes: the host cursor or a virtual pen tablet
    #[arg(long, value_enum)]
    pub output: Option<Output>,

    /// Move the cursor by deltas instead of absolute positions
    #[arg(long)]
    pub relative: bool,

    /// Scaling: fit (whole tablet visible), fill (whole monitor used), stretch
    #[arg(long, value_parser = clap::value_parser!(ScalingMode))]
    pub mode: Option<ScalingMode>,

    /// Edge of the tablet with the charging port (top, bottom, left, right)
    #[arg(long, value_parser = clap::value_parser!(Orientation))]
    pub orientation: Option<Orientation>,

    /// Monitor to map onto (index into --display list)
    #[arg(long)]
    pub monitor: Option<usize>,

    /// Map onto this desktop region instead of a monitor (WxH+X+Y)
    #[arg(long, value_parser = clap::value_parser!(Rect))]
    pub region: Option<Rect>,

    /// Monitor geometry (WxH+X+Y); repeat once per monitor
    #[arg(long = "display", value_parser = clap::value_parser!(Rect))]
    pub displays: Vec<Rect>,

    /// Stylus pressure threshold for a click
    #[arg(long)]
    pub threshold: Option<i32>,

    /// Allow mapped points outside the chosen monitor or region
    #[arg(long)]
    pub no_clamp: bool,

    /// Exit when a stream fails instead of reconnecting
    #[arg(long)]
    pub no_reconnect: bool,

    /// Path to config file
    #[arg(long, env = "RMMOUSE_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Dump raw input events for debugging
    Dump {
        /// Device to dump: "pen", "touch" or "button"
        device: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Output {
    /// Move the host cursor; pressure above the threshold clicks
    #[default]
    Cursor,
    /// Create a virtual pen tablet with pressure and tilt
    Tablet,
}
