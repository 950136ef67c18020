//! Destination rectangles on the host desktop.

mod wayland;

pub use wayland::WaylandOutputs;

use serde::{de, Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, RwLock};

use crate::error::RelayError;
use crate::mapping::Extent;

/// A monitor or region in desktop pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn extent(&self) -> Extent {
        Extent::new(self.width as f64, self.height as f64)
    }

    /// Clamp a rect-local point onto the rect's pixels,
    /// `[0, width - 1] x [0, height - 1]`.
    pub fn clamp_local(&self, x: f64, y: f64) -> (f64, f64) {
        (
            x.clamp(0.0, self.width.saturating_sub(1) as f64),
            y.clamp(0.0, self.height.saturating_sub(1) as f64),
        )
    }

    /// Translate a rect-local point to desktop coordinates.
    pub fn to_desktop(&self, x: f64, y: f64) -> (i32, i32) {
        (
            self.x + x.round() as i32,
            self.y + y.round() as i32,
        )
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}{:+}{:+}", self.width, self.height, self.x, self.y)
    }
}

/// Parses X11-style geometry: `WxH`, `WxH+X+Y`, offsets may be negative.
impl FromStr for Rect {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || RelayError::InvalidGeometry(s.to_string());

        let s = s.trim();
        let offset_at = s.find(['+', '-']).unwrap_or(s.len());
        let (size, offsets) = s.split_at(offset_at);

        let (w, h) = size.split_once(['x', 'X']).ok_or_else(invalid)?;
        let width: u32 = w.parse().map_err(|_| invalid())?;
        let height: u32 = h.parse().map_err(|_| invalid())?;
        if width == 0 || height == 0 {
            return Err(invalid());
        }

        let (x, y) = if offsets.is_empty() {
            (0, 0)
        } else {
            let second = offsets[1..].find(['+', '-']).ok_or_else(invalid)? + 1;
            let (x, y) = offsets.split_at(second);
            (
                x.parse::<i32>().map_err(|_| invalid())?,
                y.parse::<i32>().map_err(|_| invalid())?,
            )
        };

        Ok(Rect::new(x, y, width, height))
    }
}

impl<'de> Deserialize<'de> for Rect {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Source of the host's monitor geometry.
pub trait MonitorProvider {
    fn monitors(&self) -> Result<Vec<Rect>, Box<dyn std::error::Error + Send + Sync>>;
}

/// The host's monitors, in the order the provider reports them.
#[derive(Debug, Clone, Default)]
pub struct DisplayLayout {
    pub monitors: Vec<Rect>,
}

impl DisplayLayout {
    pub fn new(monitors: Vec<Rect>) -> Self {
        Self { monitors }
    }

    /// Use `configured` monitors if there are any, otherwise ask `provider`.
    /// A failed query yields an empty layout, which only works with a region.
    pub fn resolve(configured: &[Rect], provider: &dyn MonitorProvider) -> Self {
        if !configured.is_empty() {
            return Self::new(configured.to_vec());
        }
        match provider.monitors() {
            Ok(monitors) => {
                for (i, m) in monitors.iter().enumerate() {
                    log::debug!("Detected monitor {}: {}", i, m);
                }
                Self::new(monitors)
            }
            Err(e) => {
                log::warn!("Could not detect monitors: {}", e);
                Self::default()
            }
        }
    }

    /// Pick the destination: an explicit region wins over a monitor index.
    pub fn select(&self, monitor: usize, region: Option<Rect>) -> Result<Rect, RelayError> {
        if let Some(region) = region {
            return Ok(region);
        }
        if self.monitors.is_empty() {
            return Err(RelayError::NoDisplays);
        }
        self.monitors
            .get(monitor)
            .copied()
            .ok_or(RelayError::DisplayNotFound {
                index: monitor,
                count: self.monitors.len(),
            })
    }

    /// The box enclosing every monitor (and `extra`). Its origin is the
    /// top-left-most point, which may be negative.
    pub fn bounds(&self, extra: Option<Rect>) -> Rect {
        let edges = |m: &Rect| {
            (
                m.x as i64,
                m.y as i64,
                m.x as i64 + m.width as i64,
                m.y as i64 + m.height as i64,
            )
        };
        let mut rects = self.monitors.iter().chain(extra.as_ref());
        let Some(first) = rects.next() else {
            return Rect::new(0, 0, 1, 1);
        };
        let (min_x, min_y, max_x, max_y) = rects.fold(edges(first), |acc, m| {
            let (x0, y0, x1, y1) = edges(m);
            (acc.0.min(x0), acc.1.min(y0), acc.2.max(x1), acc.3.max(y1))
        });
        Rect::new(
            min_x as i32,
            min_y as i32,
            (max_x - min_x) as u32,
            (max_y - min_y) as u32,
        )
    }
}

/// Current destination, shared read-mostly between the relay loops and
/// whatever updates it.
#[derive(Debug, Clone)]
pub struct SharedRect(Arc<RwLock<Rect>>);

impl SharedRect {
    pub fn new(rect: Rect) -> Self {
        Self(Arc::new(RwLock::new(rect)))
    }

    pub fn get(&self) -> Rect {
        match self.0.read() {
            Ok(rect) => *rect,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    pub fn set(&self, rect: Rect) {
        match self.0.write() {
            Ok(mut current) => *current = rect,
            Err(poisoned) => *poisoned.into_inner() = rect,
        }
    }
}
