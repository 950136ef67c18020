use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the decode loop, the coordinate mapper and the config
/// parsers that feed them.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Writing to the host-side virtual device failed.
    #[error("output device error: {0}")]
    Sink(#[source] std::io::Error),

    /// The stream ended (or was cut) in the middle of a record.
    #[error("malformed record: expected {expected} bytes, got {got}")]
    MalformedRecord { expected: usize, got: usize },

    #[error("unsupported scaling mode '{0}' (valid: fit, fill, stretch)")]
    UnsupportedMode(String),

    #[error("invalid orientation '{0}' (valid: top, bottom, left, right)")]
    InvalidOrientation(String),

    #[error("invalid geometry '{0}' (expected WxH or WxH+X+Y)")]
    InvalidGeometry(String),

    #[error("display {index} not found, only {count} configured")]
    DisplayNotFound { index: usize, count: usize },

    #[error("no displays detected (use --display WxH+X+Y or --region)")]
    NoDisplays,

    #[error("config file {} not found", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("config file {}: {source}", .path.display())]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("unsupported device '{0}' (valid: rm1, rm2, rmpp)")]
    UnsupportedDevice(String),
}
