//! Tablet orientation handling for sensor coordinate transforms.
//!
//! All transforms work in the pen digitizer frame: origin at the corner
//! nearest the charging port on its left, X growing away from the port and
//! Y growing to the right (the frame the digitizer reports natively).

use serde::{de, Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;

use crate::error::RelayError;
use crate::mapping::Extent;

/// Which physical edge of the tablet carries the charging port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    /// Port at the top (portrait, upside down from the default UI).
    Top,
    /// Port at the bottom (regular portrait).
    Bottom,
    /// Port on the left (landscape, native digitizer orientation).
    Left,
    /// Port on the right (landscape, rotated 180° from `Left`).
    #[default]
    Right,
}

impl Orientation {
    pub const ALL: [Orientation; 4] = [
        Orientation::Top,
        Orientation::Bottom,
        Orientation::Left,
        Orientation::Right,
    ];

    /// Rotate a point into the upright frame for this orientation.
    ///
    /// Returns the transformed point together with the source extent as seen
    /// after the rotation (width and height swap for `Top`/`Bottom`).
    pub fn transform(&self, x: f64, y: f64, source: Extent) -> (f64, f64, Extent) {
        let Extent { width, height } = source;
        match self {
            Orientation::Right => (width - x, height - y, source),
            Orientation::Left => (x, y, source),
            Orientation::Top => (height - y, x, source.swapped()),
            Orientation::Bottom => (y, width - x, source.swapped()),
        }
    }

    /// Whether the host X axis runs along the sensor Y axis.
    pub fn swaps_axes(&self) -> bool {
        matches!(self, Orientation::Top | Orientation::Bottom)
    }

    /// Rotate a tilt vector the same way as [`Orientation::transform`],
    /// without the translation.
    pub fn transform_tilt(&self, tilt_x: i32, tilt_y: i32) -> (i32, i32) {
        match self {
            Orientation::Right => (-tilt_x, -tilt_y),
            Orientation::Left => (tilt_x, tilt_y),
            Orientation::Top => (-tilt_y, tilt_x),
            Orientation::Bottom => (tilt_y, -tilt_x),
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Top => write!(f, "top"),
            Orientation::Bottom => write!(f, "bottom"),
            Orientation::Left => write!(f, "left"),
            Orientation::Right => write!(f, "right"),
        }
    }
}

impl FromStr for Orientation {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|o| o.to_string() == wanted)
            .ok_or_else(|| RelayError::InvalidOrientation(s.to_string()))
    }
}

impl<'de> Deserialize<'de> for Orientation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}
