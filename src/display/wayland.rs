//! Monitor geometry from the Wayland compositor's `wl_output` globals.

use wayland_client::protocol::{wl_output, wl_registry};
use wayland_client::{Connection, Dispatch, QueueHandle, WEnum};

use super::{MonitorProvider, Rect};

/// Highest `wl_output` version we understand (adds `scale` and `done`).
const WL_OUTPUT_VERSION: u32 = 2;

/// Enumerates outputs over `$WAYLAND_DISPLAY`.
pub struct WaylandOutputs;

impl MonitorProvider for WaylandOutputs {
    fn monitors(&self) -> Result<Vec<Rect>, Box<dyn std::error::Error + Send + Sync>> {
        let conn = Connection::connect_to_env()?;
        let mut event_queue = conn.new_event_queue();
        let qhandle = event_queue.handle();
        conn.display().get_registry(&qhandle, ());

        let mut state = Outputs::default();
        // First roundtrip lists the globals, the second delivers output properties.
        event_queue.roundtrip(&mut state)?;
        event_queue.roundtrip(&mut state)?;

        Ok(state.outputs.iter().filter_map(OutputInfo::rect).collect())
    }
}

/// What one output has told us so far.
#[derive(Debug, Clone, Copy, PartialEq)]
struct OutputInfo {
    x: i32,
    y: i32,
    /// Current mode, in hardware pixels.
    mode: Option<(i32, i32)>,
    scale: i32,
    rotated: bool,
}

impl Default for OutputInfo {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            mode: None,
            scale: 1,
            rotated: false,
        }
    }
}

impl OutputInfo {
    /// The output in compositor coordinates: mode size rotated by the
    /// output transform and divided by its scale.
    fn rect(&self) -> Option<Rect> {
        let (mut width, mut height) = self.mode?;
        if self.rotated {
            std::mem::swap(&mut width, &mut height);
        }
        let scale = self.scale.max(1);
        let width = u32::try_from(width / scale).ok().filter(|&w| w > 0)?;
        let height = u32::try_from(height / scale).ok().filter(|&h| h > 0)?;
        Some(Rect::new(self.x, self.y, width, height))
    }
}

#[derive(Default)]
struct Outputs {
    outputs: Vec<OutputInfo>,
}

impl Dispatch<wl_registry::WlRegistry, ()> for Outputs {
    fn event(
        state: &mut Self,
        registry: &wl_registry::WlRegistry,
        event: wl_registry::Event,
        _: &(),
        _: &Connection,
        qhandle: &QueueHandle<Self>,
    ) {
        if let wl_registry::Event::Global {
            name,
            interface,
            version,
        } = event
        {
            if interface == "wl_output" {
                let index = state.outputs.len();
                state.outputs.push(OutputInfo::default());
                registry.bind::<wl_output::WlOutput, _, _>(
                    name,
                    version.min(WL_OUTPUT_VERSION),
                    qhandle,
                    index,
                );
            }
        }
    }
}

impl Dispatch<wl_output::WlOutput, usize> for Outputs {
    fn event(
        state: &mut Self,
        _: &wl_output::WlOutput,
        event: wl_output::Event,
        index: &usize,
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        let Some(info) = state.outputs.get_mut(*index) else {
            return;
        };
        match event {
            wl_output::Event::Geometry { x, y, transform, .. } => {
                info.x = x;
                info.y = y;
                info.rotated = matches!(
                    transform,
                    WEnum::Value(
                        wl_output::Transform::_90
                            | wl_output::Transform::_270
                            | wl_output::Transform::Flipped90
                            | wl_output::Transform::Flipped270
                    )
                );
            }
            wl_output::Event::Mode {
                flags,
                width,
                height,
                ..
            } => {
                if let WEnum::Value(flags) = flags {
                    if flags.contains(wl_output::Mode::Current) {
                        info.mode = Some((width, height));
                    }
                }
            }
            wl_output::Event::Scale { factor } => info.scale = factor,
            _ => {}
        }
    }
}
