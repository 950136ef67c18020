use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::cli::Output;
use crate::device::Model;
use crate::display::Rect;
use crate::error::RelayError;
use crate::mapping::ScalingMode;
use crate::orientation::Orientation;

pub const DEFAULT_HOST: &str = "10.11.99.1";

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub host: Option<String>,
    pub key_path: Option<String>,
    pub password: Option<String>,
    pub device: Option<Model>,
    pub pen_device: Option<String>,
    pub touch_device: Option<String>,
    pub pen_only: bool,
    pub touch_only: bool,
    pub output: Option<Output>,
    pub relative: bool,
    pub mode: Option<ScalingMode>,
    pub orientation: Option<Orientation>,
    pub monitor: Option<usize>,
    pub region: Option<Rect>,
    pub displays: Vec<Rect>,
    pub threshold: Option<i32>,
    pub clamp: Option<bool>,
    pub reconnect: Option<bool>,
    pub read_timeout_ms: Option<u32>,
}

pub fn load_from_path(path: &Path) -> Result<FileConfig, RelayError> {
    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str(&content).map_err(|source| RelayError::ConfigFile {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!("Loaded config from {}", path.display());
    Ok(config)
}

/// The config file in use: `explicit`, which must exist, else the first
/// default location that does.
pub fn resolve_path(explicit: Option<&Path>) -> Result<Option<PathBuf>, RelayError> {
    match explicit {
        Some(path) if path.exists() => Ok(Some(path.to_path_buf())),
        Some(path) => Err(RelayError::ConfigNotFound(path.to_path_buf())),
        None => Ok(default_config_paths().into_iter().find(|p| p.exists())),
    }
}

fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    paths.push(PathBuf::from("rm-mouse.toml"));

    if let Ok(home) = std::env::var("HOME") {
        paths.push(PathBuf::from(home).join(".config").join("rm-mouse.toml"));
    }

    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", body).unwrap();
        file
    }

    #[test]
    fn test_parse_full_file() {
        let file = write_config(
            r#"
host = "192.168.1.50"
device = "rm2"
output = "tablet"
mode = "fit"
orientation = "top"
monitor = 1
displays = ["1920x1080", "2560x1440+1920+0"]
threshold = 800
clamp = false
"#,
        );

        let config = load_from_path(file.path()).unwrap();
        assert_eq!(config.host.as_deref(), Some("192.168.1.50"));
        assert_eq!(config.device, Some(Model::Rm2));
        assert_eq!(config.output, Some(Output::Tablet));
        assert_eq!(config.mode, Some(ScalingMode::Fit));
        assert_eq!(config.orientation, Some(Orientation::Top));
        assert_eq!(config.monitor, Some(1));
        assert_eq!(config.displays[1], Rect::new(1920, 0, 2560, 1440));
        assert_eq!(config.threshold, Some(800));
        assert_eq!(config.clamp, Some(false));
        assert!(!config.pen_only);
    }

    #[test]
    fn test_values_are_case_insensitive() {
        let file = write_config("mode = \"Stretch\"\norientation = \"LEFT\"\n");
        let config = load_from_path(file.path()).unwrap();
        assert_eq!(config.mode, Some(ScalingMode::Stretch));
        assert_eq!(config.orientation, Some(Orientation::Left));
    }

    #[test]
    fn test_rejects_bad_values() {
        for (body, reason) in [
            ("mode = \"zoom\"\nthreshold = 900", "unsupported scaling mode 'zoom'"),
            ("orientation = \"portrait\"", "invalid orientation 'portrait'"),
            ("region = \"wide\"", "invalid geometry 'wide'"),
            ("colour = \"blue\"", "colour"),
        ] {
            let file = write_config(body);
            let err = load_from_path(file.path()).unwrap_err();
            assert!(matches!(err, RelayError::ConfigFile { .. }), "{}", body);
            assert!(err.to_string().contains(reason), "{}: {}", body, err);
        }
    }

    #[test]
    fn test_resolve_explicit_path() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert_eq!(
            resolve_path(Some(file.path())).unwrap(),
            Some(file.path().to_path_buf())
        );
    }

    #[test]
    fn test_missing_explicit_path() {
        let missing = Path::new("/nonexistent/rm-mouse.toml");
        assert!(matches!(
            resolve_path(Some(missing)),
            Err(RelayError::ConfigNotFound(p)) if p == missing
        ));
        assert!(matches!(load_from_path(missing), Err(RelayError::Io(_))));
    }
}
