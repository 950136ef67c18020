//! Wire one tablet stream (pen or touch) to a host sink.

use std::sync::atomic::AtomicBool;
use std::time::Duration;

use crate::axis::StreamKind;
use crate::config::{Config, Output};
use crate::contact::ContactPolicy;
use crate::device::DeviceProfile;
use crate::display::{Rect, SharedRect};
use crate::error::RelayError;
use crate::event::RecordReader;
use crate::relay::{Relay, RelaySettings};
use crate::sink::{CursorSink, Positioning, Sink, TabletSink};
use crate::ssh;

/// Host-side geometry shared by every stream.
#[derive(Clone)]
pub struct Target {
    /// Box enclosing all monitors; virtual devices span this.
    pub desktop: Rect,
    pub destination: SharedRect,
}

/// Failure of one stream session.
pub enum StreamError {
    /// The host side cannot be set up (e.g. no uinput access); retrying
    /// will not help.
    Fatal(Box<dyn std::error::Error + Send + Sync>),
    /// The tablet side went away; a reconnect may succeed.
    Disconnected(Box<dyn std::error::Error + Send + Sync>),
}

impl RelaySettings {
    pub fn for_stream(stream: StreamKind, config: &Config, profile: &DeviceProfile) -> Self {
        let (frame, contact) = match stream {
            StreamKind::Pen => (
                profile.pen_frame(),
                ContactPolicy::Pressure {
                    threshold: config.threshold,
                },
            ),
            StreamKind::Touch => (profile.touch_frame(), ContactPolicy::TrackingId),
        };
        Self {
            stream,
            frame,
            orientation: config.orientation,
            mode: config.mode,
            contact,
            positioning: if config.relative {
                Positioning::Relative
            } else {
                Positioning::Absolute
            },
            clamp: config.clamp,
        }
    }
}

fn device_path<'a>(stream: StreamKind, config: &'a Config, profile: &'a DeviceProfile) -> &'a str {
    match stream {
        StreamKind::Pen => config.pen_device.as_deref().unwrap_or(profile.pen_device),
        StreamKind::Touch => config
            .touch_device
            .as_deref()
            .unwrap_or(profile.touch_device),
    }
}

/// Run one connect-relay session for `stream`.
pub fn run_stream(
    stream: StreamKind,
    config: &Config,
    profile: &DeviceProfile,
    target: &Target,
    stop: &AtomicBool,
) -> Result<(), StreamError> {
    let settings = RelaySettings::for_stream(stream, config, profile);
    let path = device_path(stream, config, profile);

    let name = match stream {
        StreamKind::Pen => "reMarkable Pen Pointer",
        StreamKind::Touch => "reMarkable Touch Pointer",
    };

    // Create the host device first so permission problems surface before
    // we bother the tablet.
    match (stream, config.output) {
        (StreamKind::Pen, Output::Tablet) => {
            let sink = TabletSink::new(
                profile,
                config.orientation,
                target.desktop,
                target.destination.clone(),
            )
            .map_err(StreamError::Fatal)?;
            relay_stream(settings, sink, path, config, profile, stop)
        }
        _ => {
            let sink = CursorSink::new(
                name,
                target.desktop,
                target.destination.clone(),
                settings.positioning,
            )
            .map_err(StreamError::Fatal)?;
            relay_stream(settings, sink, path, config, profile, stop)
        }
    }
}

fn relay_stream<S: Sink>(
    settings: RelaySettings,
    sink: S,
    path: &str,
    config: &Config,
    profile: &DeviceProfile,
    stop: &AtomicBool,
) -> Result<(), StreamError> {
    let input = ssh::open_input_stream(path, config).map_err(StreamError::Disconnected)?;

    // Give udev/libinput time to attach before sending events (kernel uinput docs).
    std::thread::sleep(Duration::from_secs(1));
    log::info!(
        "[{}] forwarding ({} mode, orientation {}, destination {})",
        settings.stream,
        settings.mode,
        settings.orientation,
        sink.destination()
    );

    let mut reader = RecordReader::new(input, profile.record_layout);
    let mut relay = Relay::new(settings, sink);
    relay.run(&mut reader, stop).map_err(StreamError::from)
}

impl From<RelayError> for StreamError {
    fn from(e: RelayError) -> Self {
        match e {
            RelayError::Sink(_) => StreamError::Fatal(e.into()),
            _ => StreamError::Disconnected(e.into()),
        }
    }
}
