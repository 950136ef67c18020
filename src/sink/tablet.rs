//! Virtual pen tablet that keeps pressure and tilt.

use std::io;

use evdevil::event::{Abs, AbsEvent, Key, KeyEvent, KeyState};
use evdevil::uinput::{AbsSetup, UinputDevice};
use evdevil::{AbsInfo, Bus, InputId, InputProp};

use super::{Frame, Sink};
use crate::axis::Axis;
use crate::device::DeviceProfile;
use crate::display::{Rect, SharedRect};
use crate::event::{InputEvent, EV_KEY};
use crate::orientation::Orientation;

/// Pixels per millimetre so the device reports the tablet's physical size.
fn desktop_resolution(desktop_px: u32, sensor_span: f64, sensor_resolution: i32) -> i32 {
    if sensor_resolution <= 0 {
        return 1;
    }
    let mm = sensor_span / sensor_resolution as f64;
    ((desktop_px as f64 / mm).round() as i32).max(1)
}

/// Host X/Y resolutions; in portrait the host X axis follows the pen Y axis.
fn host_resolutions(profile: &DeviceProfile, orientation: Orientation, desktop: Rect) -> (i32, i32) {
    let pen = &profile.pen;
    let (along_x, along_y) = if orientation.swaps_axes() {
        (pen.y, pen.x)
    } else {
        (pen.x, pen.y)
    };
    (
        desktop_resolution(desktop.width, along_x.span(), along_x.resolution),
        desktop_resolution(desktop.height, along_y.span(), along_y.resolution),
    )
}

// libinput requires resolution on X/Y to accept the device as a tablet.
fn create_pen_device(
    profile: &DeviceProfile,
    orientation: Orientation,
    desktop: Rect,
) -> Result<UinputDevice, Box<dyn std::error::Error + Send + Sync>> {
    let pen = &profile.pen;
    let (res_x, res_y) = host_resolutions(profile, orientation, desktop);
    let axes = [
        AbsSetup::new(
            Abs::X,
            AbsInfo::new(0, desktop.width as i32 - 1).with_resolution(res_x),
        ),
        AbsSetup::new(
            Abs::Y,
            AbsInfo::new(0, desktop.height as i32 - 1).with_resolution(res_y),
        ),
        AbsSetup::new(Abs::PRESSURE, AbsInfo::new(pen.pressure.min, pen.pressure.max)),
        AbsSetup::new(Abs::DISTANCE, AbsInfo::new(pen.distance.min, pen.distance.max)),
        AbsSetup::new(Abs::TILT_X, AbsInfo::new(pen.tilt.min, pen.tilt.max)),
        AbsSetup::new(Abs::TILT_Y, AbsInfo::new(pen.tilt.min, pen.tilt.max)),
    ];

    // "Pen" must stay in the name or GTK treats the device as a touchscreen.
    let device = UinputDevice::builder()?
        .with_input_id(InputId::new(Bus::from_raw(0x03), 0x2d1f, 0x0001, 0))?
        .with_props([InputProp::DIRECT])?
        .with_abs_axes(axes)?
        .with_keys([
            Key::BTN_TOOL_PEN,
            Key::BTN_TOOL_RUBBER,
            Key::BTN_TOUCH,
            Key::BTN_STYLUS,
            Key::BTN_STYLUS2,
        ])?
        .build("reMarkable Pen")?;

    Ok(device)
}

/// Replays the pen on a local tablet device spanning the desktop.
pub struct TabletSink {
    frame: Frame,
    origin: (i32, i32),
    destination: SharedRect,
    position: Option<(i32, i32)>,
}

impl TabletSink {
    pub fn new(
        profile: &DeviceProfile,
        orientation: Orientation,
        desktop: Rect,
        destination: SharedRect,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        log::info!("Creating pen tablet device (desktop {}, {})", desktop, orientation);
        let device = create_pen_device(profile, orientation, desktop)?;
        Ok(Self {
            frame: Frame::new(device),
            origin: (desktop.x, desktop.y),
            destination,
            position: None,
        })
    }
}

impl Sink for TabletSink {
    fn destination(&self) -> Rect {
        self.destination.get()
    }

    fn move_absolute(&mut self, x: i32, y: i32) -> io::Result<()> {
        self.frame.push(AbsEvent::new(Abs::X, (x - self.origin.0).max(0)));
        self.frame.push(AbsEvent::new(Abs::Y, (y - self.origin.1).max(0)));
        self.position = Some((x, y));
        Ok(())
    }

    fn move_relative(&mut self, dx: i32, dy: i32) -> io::Result<()> {
        match self.position {
            Some((x, y)) => self.move_absolute(x + dx, y + dy),
            None => Ok(()),
        }
    }

    fn set_button(&mut self, pressed: bool) -> io::Result<()> {
        let state = if pressed {
            KeyState::PRESSED
        } else {
            KeyState::RELEASED
        };
        self.frame.push(KeyEvent::new(Key::BTN_TOUCH, state));
        Ok(())
    }

    fn emit_axis(&mut self, axis: Axis, value: i32) -> io::Result<()> {
        let abs = match axis {
            Axis::Pressure => Abs::PRESSURE,
            Axis::Distance => Abs::DISTANCE,
            Axis::TiltX => Abs::TILT_X,
            Axis::TiltY => Abs::TILT_Y,
            _ => return Ok(()),
        };
        self.frame.push(AbsEvent::new(abs, value));
        Ok(())
    }

    fn forward(&mut self, event: &InputEvent) -> io::Result<()> {
        // Tool and barrel buttons.
        if event.ty == EV_KEY {
            self.frame.push(event.to_evdev());
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.frame.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_desktop_resolution_matches_tablet_size() {
        // 20967 units at 100/mm is ~210 mm; 1920 px over that is ~9 px/mm.
        assert_eq!(desktop_resolution(1920, 20967.0, 100), 9);
        assert_eq!(desktop_resolution(1920, 20967.0, 0), 1);
        assert_eq!(desktop_resolution(10, 20967.0, 100), 1);
    }

    #[test]
    fn test_portrait_swaps_resolution_axes() {
        use crate::device::RM2;

        // 1000 px over the pen's long side (~210 mm) and short side (~157 mm).
        let desktop = Rect::new(0, 0, 1000, 1000);
        let landscape = host_resolutions(&RM2, Orientation::Right, desktop);
        let portrait = host_resolutions(&RM2, Orientation::Top, desktop);
        assert_eq!(portrait, (landscape.1, landscape.0));
        assert!(landscape.0 < landscape.1);
    }
}
