//! Host pointer driven through a virtual mouse.

use std::io;

use evdevil::event::{Abs, AbsEvent, Key, KeyEvent, KeyState, Rel, RelEvent};
use evdevil::uinput::{AbsSetup, UinputDevice};
use evdevil::{AbsInfo, InputProp};

use super::{Frame, Positioning, Sink};
use crate::axis::Axis;
use crate::display::{Rect, SharedRect};
use crate::event::InputEvent;

/// Moves the host cursor and clicks the left button.
///
/// An absolute device spans the whole desktop, so display-space coordinates
/// can be written directly. A relative device behaves like a plain mouse and
/// only takes `move_relative`.
pub struct CursorSink {
    frame: Frame,
    /// Desktop origin; absolute axes start at zero there.
    origin: (i32, i32),
    destination: SharedRect,
}

fn create_cursor_device(
    name: &str,
    desktop: Rect,
    positioning: Positioning,
) -> Result<UinputDevice, Box<dyn std::error::Error + Send + Sync>> {
    let builder = UinputDevice::builder()?;
    // Kernel uinput docs: a virtual mouse must declare BTN_LEFT for motion to move the cursor.
    let builder = match positioning {
        Positioning::Absolute => builder.with_abs_axes([
            AbsSetup::new(Abs::X, AbsInfo::new(0, desktop.width as i32 - 1)),
            AbsSetup::new(Abs::Y, AbsInfo::new(0, desktop.height as i32 - 1)),
        ])?,
        Positioning::Relative => builder
            .with_props([InputProp::POINTER])?
            .with_rel_axes([Rel::X, Rel::Y])?,
    };
    let device = builder
        .with_keys([Key::BTN_LEFT, Key::BTN_RIGHT])?
        .build(name)?;
    Ok(device)
}

impl CursorSink {
    pub fn new(
        name: &str,
        desktop: Rect,
        destination: SharedRect,
        positioning: Positioning,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        log::info!("Creating cursor device '{}' ({:?}, desktop {})", name, positioning, desktop);
        let device = create_cursor_device(name, desktop, positioning)?;
        Ok(Self {
            frame: Frame::new(device),
            origin: (desktop.x, desktop.y),
            destination,
        })
    }
}

impl Sink for CursorSink {
    fn destination(&self) -> Rect {
        self.destination.get()
    }

    fn move_absolute(&mut self, x: i32, y: i32) -> io::Result<()> {
        self.frame.push(AbsEvent::new(Abs::X, (x - self.origin.0).max(0)));
        self.frame.push(AbsEvent::new(Abs::Y, (y - self.origin.1).max(0)));
        Ok(())
    }

    fn move_relative(&mut self, dx: i32, dy: i32) -> io::Result<()> {
        self.frame.push(RelEvent::new(Rel::X, dx));
        self.frame.push(RelEvent::new(Rel::Y, dy));
        Ok(())
    }

    fn set_button(&mut self, pressed: bool) -> io::Result<()> {
        log::debug!("Cursor button {}", if pressed { "PRESS" } else { "RELEASE" });
        let state = if pressed {
            KeyState::PRESSED
        } else {
            KeyState::RELEASED
        };
        self.frame.push(KeyEvent::new(Key::BTN_LEFT, state));
        Ok(())
    }

    fn emit_axis(&mut self, _axis: Axis, _value: i32) -> io::Result<()> {
        Ok(())
    }

    fn forward(&mut self, _event: &InputEvent) -> io::Result<()> {
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.frame.flush()
    }
}
