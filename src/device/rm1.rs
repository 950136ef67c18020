use super::{AxisRange, DeviceProfile, PenAxes, TouchAxes};
use crate::event::RecordLayout;

/// reMarkable 1: Wacom digitizer plus a Cypress touch panel whose X axis
/// runs right to left.
pub const RM1: DeviceProfile = DeviceProfile {
    name: "reMarkable 1",

    record_layout: RecordLayout::Timeval32,

    pen: PenAxes {
        x: AxisRange::new(0, 20967, 100),
        y: AxisRange::new(0, 15725, 100),
        pressure: AxisRange::new(0, 4095, 0),
        distance: AxisRange::new(0, 255, 0),
        tilt: AxisRange::new(-6400, 6400, 6400),
    },

    touch: TouchAxes {
        x: AxisRange::new(0, 767, 0),
        y: AxisRange::new(0, 1023, 0),
        invert_x: true,
    },

    pen_device: "/dev/input/event0",
    touch_device: "/dev/input/event1",
    button_device: "/dev/input/event2",
};
