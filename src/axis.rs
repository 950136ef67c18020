//! Last-seen absolute axis values for one input stream.

use std::fmt;

use crate::event::{
    ABS_DISTANCE, ABS_MT_POSITION_X, ABS_MT_POSITION_Y, ABS_MT_PRESSURE, ABS_MT_SLOT,
    ABS_MT_TRACKING_ID, ABS_PRESSURE, ABS_TILT_X, ABS_TILT_Y, ABS_X, ABS_Y,
};

/// Which tablet sensor a stream comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Pen,
    Touch,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Pen => write!(f, "pen"),
            StreamKind::Touch => write!(f, "touch"),
        }
    }
}

/// An absolute axis the relay interprets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Pressure,
    Distance,
    TiltX,
    TiltY,
    Slot,
    TrackingId,
}

impl StreamKind {
    /// Interpret an `EV_ABS` code for this stream.
    pub fn axis(&self, code: u16) -> Option<Axis> {
        match (self, code) {
            (StreamKind::Pen, ABS_X) => Some(Axis::X),
            (StreamKind::Pen, ABS_Y) => Some(Axis::Y),
            (StreamKind::Pen, ABS_PRESSURE) => Some(Axis::Pressure),
            (StreamKind::Pen, ABS_DISTANCE) => Some(Axis::Distance),
            (StreamKind::Pen, ABS_TILT_X) => Some(Axis::TiltX),
            (StreamKind::Pen, ABS_TILT_Y) => Some(Axis::TiltY),
            (StreamKind::Touch, ABS_MT_POSITION_X) => Some(Axis::X),
            (StreamKind::Touch, ABS_MT_POSITION_Y) => Some(Axis::Y),
            (StreamKind::Touch, ABS_MT_PRESSURE) => Some(Axis::Pressure),
            (StreamKind::Touch, ABS_MT_SLOT) => Some(Axis::Slot),
            (StreamKind::Touch, ABS_MT_TRACKING_ID) => Some(Axis::TrackingId),
            _ => None,
        }
    }
}

/// The slot whose contact drives the pointer.
pub const PRIMARY_SLOT: i32 = 0;

/// Absolute axis values carried across sync boundaries.
///
/// The kernel only reports axes that changed, so anything not mentioned in
/// a frame keeps its previous value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisState {
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub pressure: i32,
    pub distance: i32,
    pub tilt_x: i32,
    pub tilt_y: i32,
    pub slot: i32,
    pub tracking_id: i32,
}

impl Default for AxisState {
    fn default() -> Self {
        Self {
            x: None,
            y: None,
            pressure: 0,
            distance: 0,
            tilt_x: 0,
            tilt_y: 0,
            slot: PRIMARY_SLOT,
            tracking_id: -1,
        }
    }
}

impl AxisState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new value. Per-contact axes are only tracked for the
    /// primary slot; other fingers are ignored.
    pub fn apply(&mut self, axis: Axis, value: i32) {
        match axis {
            Axis::Slot => self.slot = value,
            _ if self.slot != PRIMARY_SLOT => {}
            Axis::X => self.x = Some(value),
            Axis::Y => self.y = Some(value),
            Axis::Pressure => self.pressure = value,
            Axis::Distance => self.distance = value,
            Axis::TiltX => self.tilt_x = value,
            Axis::TiltY => self.tilt_y = value,
            Axis::TrackingId => self.tracking_id = value,
        }
    }

    pub fn position(&self) -> Option<(i32, i32)> {
        self.x.zip(self.y)
    }
}
