//! Sensor space to display space mapping.

use serde::{de, Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;

use crate::error::RelayError;
use crate::orientation::Orientation;

/// Size of a coordinate space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub width: f64,
    pub height: f64,
}

impl Extent {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn swapped(self) -> Self {
        Self::new(self.height, self.width)
    }

    pub fn center(&self) -> (f64, f64) {
        (self.width / 2.0, self.height / 2.0)
    }
}

/// Aspect-ratio policy used when the source and destination shapes differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScalingMode {
    /// The whole tablet lands inside the destination, letterboxed.
    Fit,
    /// The whole destination is covered, cropping the tablet.
    #[default]
    Fill,
    /// Both spaces are covered completely; aspect ratio is not kept.
    Stretch,
}

impl ScalingMode {
    pub const ALL: [ScalingMode; 3] = [ScalingMode::Fit, ScalingMode::Fill, ScalingMode::Stretch];

    /// Per-axis scale factors for mapping `source` onto `dest`.
    pub fn scale(&self, source: Extent, dest: Extent) -> (f64, f64) {
        let ratio_w = dest.width / source.width;
        let ratio_h = dest.height / source.height;
        match self {
            ScalingMode::Fit => {
                let s = ratio_w.min(ratio_h);
                (s, s)
            }
            ScalingMode::Fill => {
                let s = ratio_w.max(ratio_h);
                (s, s)
            }
            ScalingMode::Stretch => (ratio_w, ratio_h),
        }
    }
}

impl fmt::Display for ScalingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalingMode::Fit => write!(f, "fit"),
            ScalingMode::Fill => write!(f, "fill"),
            ScalingMode::Stretch => write!(f, "stretch"),
        }
    }
}

impl FromStr for ScalingMode {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|m| m.to_string() == wanted)
            .ok_or_else(|| RelayError::UnsupportedMode(s.to_string()))
    }
}

impl<'de> Deserialize<'de> for ScalingMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Map a sensor point into destination-local coordinates.
///
/// The source is first rotated for `orientation`, then scaled about its
/// center so that the source midpoint always lands on the destination
/// midpoint. The result is not clamped: with `Fill` (and for points outside
/// the sensor range) it can fall outside `dest`, and callers that need
/// in-bounds output must clamp it themselves.
pub fn map(
    x: f64,
    y: f64,
    source: Extent,
    dest: Extent,
    mode: ScalingMode,
    orientation: Orientation,
) -> (f64, f64) {
    let (x, y, source) = orientation.transform(x, y, source);
    let (scale_x, scale_y) = mode.scale(source, dest);
    let (src_cx, src_cy) = source.center();
    let (dst_cx, dst_cy) = dest.center();

    (
        scale_x * (x - src_cx) + dst_cx,
        scale_y * (y - src_cy) + dst_cy,
    )
}
