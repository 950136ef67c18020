use super::{AxisRange, DeviceProfile, PenAxes, TouchAxes};
use crate::event::RecordLayout;

/// reMarkable Paper Pro device profile.
///
/// Display: 1620×2160 pixels (11.8", 229 dpi). Architecture is aarch64, so
/// input events carry a 64-bit timeval.
pub const RMPP: DeviceProfile = DeviceProfile {
    name: "reMarkable Paper Pro",

    record_layout: RecordLayout::Timeval64,

    pen: PenAxes {
        x: AxisRange::new(0, 11180, 100),
        y: AxisRange::new(0, 15340, 100),
        pressure: AxisRange::new(0, 4096, 0),
        distance: AxisRange::new(0, 65535, 0),
        tilt: AxisRange::new(-9000, 9000, 0),
    },

    touch: TouchAxes {
        x: AxisRange::new(0, 2064, 9),
        y: AxisRange::new(0, 2832, 9),
        invert_x: false,
    },

    pen_device: "/dev/input/event2",
    touch_device: "/dev/input/event3",
    button_device: "/dev/input/event0",
};
