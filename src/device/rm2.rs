use super::{AxisRange, DeviceProfile, PenAxes, TouchAxes};
use crate::event::RecordLayout;

pub const RM2: DeviceProfile = DeviceProfile {
    name: "reMarkable 2",

    record_layout: RecordLayout::Timeval32,

    // Pen digitizer ranges (from device dumps)
    pen: PenAxes {
        x: AxisRange::new(0, 20967, 100),
        y: AxisRange::new(0, 15725, 100),
        pressure: AxisRange::new(0, 4095, 0),
        distance: AxisRange::new(0, 255, 0),
        tilt: AxisRange::new(-6400, 6400, 6400),
    },

    // Touch screen: 1872×1404 display, ~210×158 mm → ~9 units/mm
    touch: TouchAxes {
        x: AxisRange::new(0, 1403, 9),
        y: AxisRange::new(0, 1871, 9),
        invert_x: false,
    },

    pen_device: "/dev/input/event1",
    touch_device: "/dev/input/event2",
    button_device: "/dev/input/event0",
};
