//! Output side of the relay: where mapped coordinates end up.

mod cursor;
mod tablet;

pub use cursor::CursorSink;
pub use tablet::TabletSink;

use std::io;

use crate::axis::Axis;
use crate::display::Rect;
use crate::event::InputEvent;

/// Consumer of mapped samples.
///
/// Calls made between two `flush`es belong to one input frame; sinks are
/// free to buffer them until then.
pub trait Sink {
    /// The desktop rectangle samples should be mapped into. Read once per
    /// frame, so it may change while the relay runs.
    fn destination(&self) -> Rect;

    fn move_absolute(&mut self, x: i32, y: i32) -> io::Result<()>;

    fn move_relative(&mut self, dx: i32, dy: i32) -> io::Result<()>;

    fn set_button(&mut self, pressed: bool) -> io::Result<()>;

    /// Pen axes other than position, already oriented for the host.
    fn emit_axis(&mut self, axis: Axis, value: i32) -> io::Result<()>;

    /// An event the relay does not interpret.
    fn forward(&mut self, event: &InputEvent) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()>;
}

/// How pointer motion is delivered to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Positioning {
    #[default]
    Absolute,
    /// Deltas between consecutive samples, re-anchored on every lift.
    Relative,
}

/// Events collected for one frame, written with a trailing `SYN_REPORT`.
struct Frame {
    device: evdevil::uinput::UinputDevice,
    events: Vec<evdevil::event::InputEvent>,
}

impl Frame {
    fn new(device: evdevil::uinput::UinputDevice) -> Self {
        if let Ok(name) = device.sysname() {
            log::info!(
                "Virtual device ready: /sys/devices/virtual/input/{}",
                name.to_string_lossy()
            );
        }
        Self {
            device,
            events: Vec::with_capacity(16),
        }
    }

    fn push(&mut self, event: impl Into<evdevil::event::InputEvent>) {
        self.events.push(event.into());
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.events.is_empty() {
            return Ok(());
        }
        self.push(evdevil::event::SynEvent::new(evdevil::event::Syn::REPORT));
        let result = self.device.write(&self.events);
        self.events.clear();
        result
    }
}
