mod cli;
mod file;

pub use cli::{Cli, Command, Output};

use std::path::PathBuf;

use crate::device::Model;
use crate::display::{DisplayLayout, MonitorProvider, Rect};
use crate::error::RelayError;
use crate::mapping::ScalingMode;
use crate::orientation::Orientation;

const DEFAULT_THRESHOLD: i32 = 600;
const DEFAULT_READ_TIMEOUT_MS: u32 = 500;
const DEFAULT_KEY: &str = ".ssh/remarkable";

/// Authentication method for SSH connection.
#[derive(Clone)]
pub enum Auth {
    Key(PathBuf),
    Password(String),
    Agent,
}

/// Merged configuration from CLI args and TOML file.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub key_path: Option<String>,
    pub password: Option<String>,
    pub device: Option<Model>,
    pub pen_device: Option<String>,
    pub touch_device: Option<String>,
    pub pen_only: bool,
    pub touch_only: bool,
    pub output: Output,
    pub relative: bool,
    pub mode: ScalingMode,
    pub orientation: Orientation,
    pub monitor: usize,
    pub region: Option<Rect>,
    pub displays: Vec<Rect>,
    pub threshold: i32,
    pub clamp: bool,
    pub reconnect: bool,
    pub read_timeout_ms: u32,
}

impl Config {
    /// Load configuration by merging TOML file with CLI overrides.
    ///
    /// A missing `--config` file or an invalid value in the file is an error.
    pub fn load(cli: &Cli) -> Result<Self, RelayError> {
        let file_config = match Self::source_path(cli)? {
            Some(path) => file::load_from_path(&path)?,
            None => file::FileConfig::default(),
        };

        Ok(Self::merge(cli, file_config))
    }

    /// The TOML file `load` reads, if any.
    pub fn source_path(cli: &Cli) -> Result<Option<PathBuf>, RelayError> {
        file::resolve_path(cli.config.as_deref())
    }

    fn merge(cli: &Cli, file: file::FileConfig) -> Self {
        Self {
            host: cli
                .host
                .clone()
                .or(file.host)
                .unwrap_or_else(|| file::DEFAULT_HOST.into()),
            key_path: cli.key_path.clone().or(file.key_path),
            password: cli.password.clone().or(file.password),
            device: cli.device.or(file.device),
            pen_device: cli.pen_device.clone().or(file.pen_device),
            touch_device: cli.touch_device.clone().or(file.touch_device),
            pen_only: cli.pen_only || file.pen_only,
            touch_only: cli.touch_only || file.touch_only,
            output: cli.output.or(file.output).unwrap_or_default(),
            relative: cli.relative || file.relative,
            mode: cli.mode.or(file.mode).unwrap_or_default(),
            orientation: cli.orientation.or(file.orientation).unwrap_or_default(),
            monitor: cli.monitor.or(file.monitor).unwrap_or(0),
            region: cli.region.or(file.region),
            displays: if cli.displays.is_empty() {
                file.displays
            } else {
                cli.displays.clone()
            },
            threshold: cli.threshold.or(file.threshold).unwrap_or(DEFAULT_THRESHOLD),
            clamp: !cli.no_clamp && file.clamp.unwrap_or(true),
            reconnect: !cli.no_reconnect && file.reconnect.unwrap_or(true),
            read_timeout_ms: file.read_timeout_ms.unwrap_or(DEFAULT_READ_TIMEOUT_MS),
        }
    }

    /// Password wins, then an explicit key, then `~/.ssh/remarkable` if it
    /// exists, then the ssh-agent.
    pub fn auth(&self) -> Auth {
        if let Some(ref password) = self.password {
            return Auth::Password(password.clone());
        }
        if let Some(ref path) = self.key_path {
            return Auth::Key(PathBuf::from(path));
        }
        if let Ok(home) = std::env::var("HOME") {
            let default_key = PathBuf::from(home).join(DEFAULT_KEY);
            if default_key.exists() {
                return Auth::Key(default_key);
            }
        }
        Auth::Agent
    }

    /// Monitors from `displays`, or from `provider` when none are configured.
    pub fn layout(&self, provider: &dyn MonitorProvider) -> DisplayLayout {
        DisplayLayout::resolve(&self.displays, provider)
    }

    pub fn run_pen(&self) -> bool {
        !self.touch_only
    }

    pub fn run_touch(&self) -> bool {
        !self.pen_only
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        if self.touch_only && self.pen_only {
            return Err("Cannot use both --touch-only and --pen-only");
        }
        if self.read_timeout_ms == 0 {
            return Err("read_timeout_ms must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
impl Config {
    /// Configuration from command-line arguments alone.
    pub fn from_args(args: &[&str]) -> Self {
        use clap::Parser;
        let cli = Cli::parse_from(std::iter::once("rm-mouse").chain(args.iter().copied()));
        Self::merge(&cli, file::FileConfig::default())
    }
}
