//! Decode loop: accumulate axis updates, map and dispatch at each report.

use std::io::{self, Read};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::axis::{Axis, AxisState, StreamKind};
use crate::contact::{ContactPolicy, ContactTracker, Edge};
use crate::device::SensorFrame;
use crate::display::Rect;
use crate::error::RelayError;
use crate::event::{
    code_name, InputEvent, RecordReader, BTN_TOUCH, EV_ABS, EV_KEY, EV_SYN, SYN_DROPPED,
    SYN_REPORT,
};
use crate::mapping::{self, ScalingMode};
use crate::orientation::Orientation;
use crate::sink::{Positioning, Sink};

/// Everything that stays fixed for the lifetime of one relay loop.
#[derive(Debug, Clone, Copy)]
pub struct RelaySettings {
    pub stream: StreamKind,
    pub frame: SensorFrame,
    pub orientation: Orientation,
    pub mode: ScalingMode,
    pub contact: ContactPolicy,
    pub positioning: Positioning,
    /// Keep mapped points inside the destination rect.
    pub clamp: bool,
}

pub struct Relay<S> {
    settings: RelaySettings,
    axes: AxisState,
    contact: ContactTracker,
    sink: S,
    destination: Rect,
    anchor: Option<(i32, i32)>,
    frame_count: u64,
}

impl<S: Sink> Relay<S> {
    pub fn new(settings: RelaySettings, sink: S) -> Self {
        let destination = sink.destination();
        Self {
            settings,
            axes: AxisState::new(),
            contact: ContactTracker::new(settings.contact),
            sink,
            destination,
            anchor: None,
            frame_count: 0,
        }
    }

    /// Pull records until the stream fails or `stop` is raised.
    ///
    /// A truncated record ends the loop with `MalformedRecord`; read
    /// timeouts just give the loop a chance to notice a new destination.
    pub fn run<R: Read>(
        &mut self,
        reader: &mut RecordReader<R>,
        stop: &AtomicBool,
    ) -> Result<(), RelayError> {
        loop {
            if stop.load(Ordering::Relaxed) {
                log::debug!("[{}] stop requested", self.settings.stream);
                return Ok(());
            }
            match reader.next_event()? {
                Some(event) => self.handle(&event)?,
                None => self.refresh_destination(),
            }
        }
    }

    pub fn handle(&mut self, event: &InputEvent) -> Result<(), RelayError> {
        log::trace!(
            "[{}] {:.6} - {:<22} {:>6}",
            self.settings.stream,
            event.timestamp(),
            code_name(event.ty, event.code),
            event.value
        );

        match event.ty {
            EV_SYN if event.code == SYN_REPORT => self.dispatch()?,
            EV_SYN if event.code == SYN_DROPPED => {
                log::warn!("[{}] tablet dropped events", self.settings.stream);
            }
            EV_SYN => {}
            EV_ABS => match self.settings.stream.axis(event.code) {
                Some(axis) => self.axes.apply(axis, event.value),
                None => self.sink.forward(event).map_err(RelayError::Sink)?,
            },
            // Contact comes from the configured policy, not the device.
            EV_KEY if event.code == BTN_TOUCH => {}
            _ => self.sink.forward(event).map_err(RelayError::Sink)?,
        }
        Ok(())
    }

    fn refresh_destination(&mut self) {
        let current = self.sink.destination();
        if current != self.destination {
            log::info!(
                "[{}] destination changed: {} -> {}",
                self.settings.stream,
                self.destination,
                current
            );
            self.destination = current;
            self.anchor = None;
        }
    }

    fn dispatch(&mut self) -> Result<(), RelayError> {
        // Nothing to map until both axes have been reported once.
        let Some((raw_x, raw_y)) = self.axes.position() else {
            self.sink.flush().map_err(RelayError::Sink)?;
            return Ok(());
        };

        self.refresh_destination();
        let settings = self.settings;
        let dest = self.destination;

        let (sx, sy) = settings.frame.align(raw_x, raw_y);
        let (mx, my) = mapping::map(
            sx,
            sy,
            settings.frame.extent(),
            dest.extent(),
            settings.mode,
            settings.orientation,
        );
        let (mx, my) = if settings.clamp {
            dest.clamp_local(mx, my)
        } else {
            (mx, my)
        };
        let (x, y) = dest.to_desktop(mx, my);

        if settings.stream == StreamKind::Pen {
            self.emit_pen_axes().map_err(RelayError::Sink)?;
        }

        match settings.positioning {
            Positioning::Absolute => {
                self.sink.move_absolute(x, y).map_err(RelayError::Sink)?
            }
            Positioning::Relative => {
                if let Some((px, py)) = self.anchor {
                    self.sink.move_relative(x - px, y - py).map_err(RelayError::Sink)?;
                }
                self.anchor = Some((x, y));
            }
        }

        match self.contact.update(&self.axes) {
            Some(Edge::Press) => {
                log::debug!("[{}] PRESS at ({}, {})", settings.stream, x, y);
                self.sink.set_button(true).map_err(RelayError::Sink)?;
            }
            Some(Edge::Release) => {
                log::debug!("[{}] RELEASE", settings.stream);
                self.sink.set_button(false).map_err(RelayError::Sink)?;
                self.anchor = None;
            }
            None => {}
        }

        self.sink.flush().map_err(RelayError::Sink)?;
        self.log_frame_progress();
        Ok(())
    }

    /// Pressure, distance and tilt, with tilt rotated like the position.
    fn emit_pen_axes(&mut self) -> io::Result<()> {
        let (tilt_x, tilt_y) = self
            .settings
            .orientation
            .transform_tilt(self.axes.tilt_x, self.axes.tilt_y);
        self.sink.emit_axis(Axis::Pressure, self.axes.pressure)?;
        self.sink.emit_axis(Axis::Distance, self.axes.distance)?;
        self.sink.emit_axis(Axis::TiltX, tilt_x)?;
        self.sink.emit_axis(Axis::TiltY, tilt_y)
    }

    fn log_frame_progress(&mut self) {
        if self.frame_count == 0 {
            log::info!("[{}] events flowing", self.settings.stream);
        }
        self.frame_count += 1;

        if self.frame_count % 500 == 0 {
            log::debug!(
                "[{}] frames forwarded: {}, contact: {}",
                self.settings.stream,
                self.frame_count,
                self.contact.is_down()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::RM2;
    use crate::display::SharedRect;
    use crate::event::tests::{record, ScriptedReader};
    use crate::event::{
        RecordLayout, ABS_MT_POSITION_X, ABS_MT_POSITION_Y, ABS_MT_TOUCH_MAJOR,
        ABS_MT_TRACKING_ID, ABS_PRESSURE, ABS_TILT_X, ABS_TILT_Y, ABS_X, ABS_Y, BTN_STYLUS,
        EV_MSC,
    };

    #[derive(Debug, Clone, PartialEq)]
    enum Action {
        Move(i32, i32),
        MoveBy(i32, i32),
        Button(bool),
        Axis(Axis, i32),
        Forward(u16, u16),
        Flush,
    }

    struct RecordingSink {
        destination: SharedRect,
        actions: Vec<Action>,
        fail_flush: bool,
    }

    impl RecordingSink {
        fn new(destination: Rect) -> Self {
            Self {
                destination: SharedRect::new(destination),
                actions: Vec::new(),
                fail_flush: false,
            }
        }

        fn moves(&self) -> Vec<(i32, i32)> {
            self.actions
                .iter()
                .filter_map(|a| match a {
                    Action::Move(x, y) => Some((*x, *y)),
                    _ => None,
                })
                .collect()
        }

        fn buttons(&self) -> Vec<bool> {
            self.actions
                .iter()
                .filter_map(|a| match a {
                    Action::Button(p) => Some(*p),
                    _ => None,
                })
                .collect()
        }
    }

    impl Sink for RecordingSink {
        fn destination(&self) -> Rect {
            self.destination.get()
        }
        fn move_absolute(&mut self, x: i32, y: i32) -> io::Result<()> {
            self.actions.push(Action::Move(x, y));
            Ok(())
        }
        fn move_relative(&mut self, dx: i32, dy: i32) -> io::Result<()> {
            self.actions.push(Action::MoveBy(dx, dy));
            Ok(())
        }
        fn set_button(&mut self, pressed: bool) -> io::Result<()> {
            self.actions.push(Action::Button(pressed));
            Ok(())
        }
        fn emit_axis(&mut self, axis: Axis, value: i32) -> io::Result<()> {
            self.actions.push(Action::Axis(axis, value));
            Ok(())
        }
        fn forward(&mut self, event: &InputEvent) -> io::Result<()> {
            self.actions.push(Action::Forward(event.ty, event.code));
            Ok(())
        }
        fn flush(&mut self) -> io::Result<()> {
            if self.fail_flush {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "uinput"));
            }
            self.actions.push(Action::Flush);
            Ok(())
        }
    }

    /// Destination the same size as the pen sensor, so `left` + `stretch`
    /// maps every point onto itself.
    fn identity_dest() -> Rect {
        let e = RM2.pen_frame().extent();
        Rect::new(0, 0, e.width as u32, e.height as u32)
    }

    fn pen_settings() -> RelaySettings {
        RelaySettings {
            stream: StreamKind::Pen,
            frame: RM2.pen_frame(),
            orientation: Orientation::Left,
            mode: ScalingMode::Stretch,
            contact: ContactPolicy::Pressure { threshold: 600 },
            positioning: Positioning::Absolute,
            clamp: true,
        }
    }

    fn stream(events: &[(u16, u16, i32)]) -> RecordReader<ScriptedReader> {
        let bytes: Vec<u8> = events
            .iter()
            .flat_map(|&(ty, code, value)| record(ty, code, value))
            .collect();
        RecordReader::new(ScriptedReader::new(vec![Ok(bytes)]), RecordLayout::Timeval32)
    }

    fn run_to_end(relay: &mut Relay<RecordingSink>, reader: &mut RecordReader<ScriptedReader>) {
        let stop = AtomicBool::new(false);
        let err = relay.run(reader, &stop).unwrap_err();
        assert!(matches!(err, RelayError::MalformedRecord { got: 0, .. }), "{}", err);
    }

    const SYN: (u16, u16, i32) = (EV_SYN, SYN_REPORT, 0);

    #[test]
    fn test_x_update_dispatches_once_with_tracked_y() {
        let mut relay = Relay::new(pen_settings(), RecordingSink::new(identity_dest()));
        let mut reader = stream(&[(EV_ABS, ABS_X, 50), (EV_ABS, ABS_Y, 60), SYN]);
        run_to_end(&mut relay, &mut reader);
        assert_eq!(relay.sink.moves(), vec![(50, 60)]);

        let mut reader = stream(&[(EV_ABS, ABS_X, 1234), SYN]);
        run_to_end(&mut relay, &mut reader);
        assert_eq!(relay.sink.moves(), vec![(50, 60), (1234, 60)]);
    }

    #[test]
    fn test_no_dispatch_before_position_known() {
        let mut relay = Relay::new(pen_settings(), RecordingSink::new(identity_dest()));
        let mut reader = stream(&[(EV_ABS, ABS_Y, 60), SYN, (EV_ABS, ABS_X, 70), SYN]);
        run_to_end(&mut relay, &mut reader);
        assert_eq!(relay.sink.moves(), vec![(70, 60)]);
    }

    #[test]
    fn test_pressure_edges_are_not_repeated() {
        let mut relay = Relay::new(pen_settings(), RecordingSink::new(identity_dest()));
        let mut events = vec![(EV_ABS, ABS_X, 10), (EV_ABS, ABS_Y, 10)];
        for p in [0, 700, 700, 700, 0] {
            events.push((EV_ABS, ABS_PRESSURE, p));
            events.push(SYN);
        }
        let mut reader = stream(&events);
        run_to_end(&mut relay, &mut reader);

        assert_eq!(relay.sink.buttons(), vec![true, false]);
        assert_eq!(relay.sink.moves().len(), 5);
    }

    #[test]
    fn test_truncated_stream_emits_nothing() {
        let mut bytes: Vec<u8> = [(EV_ABS, ABS_X, 10), (EV_ABS, ABS_Y, 10)]
            .iter()
            .flat_map(|&(ty, code, value)| record(ty, code, value))
            .collect();
        bytes.extend_from_slice(&record(EV_SYN, SYN_REPORT, 0)[..8]);
        let mut reader =
            RecordReader::new(ScriptedReader::new(vec![Ok(bytes)]), RecordLayout::Timeval32);
        let mut relay = Relay::new(pen_settings(), RecordingSink::new(identity_dest()));

        let err = relay.run(&mut reader, &AtomicBool::new(false)).unwrap_err();
        assert!(matches!(
            err,
            RelayError::MalformedRecord {
                expected: 16,
                got: 8
            }
        ));
        assert!(relay.sink.actions.is_empty());
    }

    #[test]
    fn test_timeouts_are_retried() {
        let mut steps = vec![Ok(record(EV_ABS, ABS_X, 5))];
        steps.push(Err(io::Error::new(io::ErrorKind::TimedOut, "idle")));
        steps.push(Ok(record(EV_ABS, ABS_Y, 6)));
        steps.push(Err(io::Error::new(io::ErrorKind::WouldBlock, "idle")));
        steps.push(Ok(record(EV_SYN, SYN_REPORT, 0)));
        let mut reader = RecordReader::new(ScriptedReader::new(steps), RecordLayout::Timeval32);
        let mut relay = Relay::new(pen_settings(), RecordingSink::new(identity_dest()));

        run_to_end(&mut relay, &mut reader);
        assert_eq!(relay.sink.moves(), vec![(5, 6)]);
    }

    #[test]
    fn test_stop_flag_halts_before_output() {
        let mut relay = Relay::new(pen_settings(), RecordingSink::new(identity_dest()));
        let mut reader = stream(&[(EV_ABS, ABS_X, 1), (EV_ABS, ABS_Y, 1), SYN]);
        relay.run(&mut reader, &AtomicBool::new(true)).unwrap();
        assert!(relay.sink.actions.is_empty());
    }

    #[test]
    fn test_pen_axes_follow_orientation() {
        let mut settings = pen_settings();
        settings.orientation = Orientation::Right;
        let mut relay = Relay::new(settings, RecordingSink::new(identity_dest()));
        let mut reader = stream(&[
            (EV_ABS, ABS_X, 0),
            (EV_ABS, ABS_Y, 0),
            (EV_ABS, ABS_TILT_X, 100),
            (EV_ABS, ABS_TILT_Y, -50),
            (EV_ABS, ABS_PRESSURE, 900),
            SYN,
        ]);
        run_to_end(&mut relay, &mut reader);

        let dest = identity_dest();
        assert_eq!(
            relay.sink.actions,
            vec![
                Action::Axis(Axis::Pressure, 900),
                Action::Axis(Axis::Distance, 0),
                Action::Axis(Axis::TiltX, -100),
                Action::Axis(Axis::TiltY, 50),
                // Clamped to the last pixel.
                Action::Move(dest.width as i32 - 1, dest.height as i32 - 1),
                Action::Button(true),
                Action::Flush,
            ]
        );
    }

    #[test]
    fn test_uninterpreted_events_are_forwarded() {
        let mut relay = Relay::new(pen_settings(), RecordingSink::new(identity_dest()));
        for (ty, code, value) in [
            (EV_KEY, BTN_TOUCH, 1),
            (EV_KEY, BTN_STYLUS, 1),
            (EV_MSC, 5, 77),
            (EV_ABS, ABS_MT_TOUCH_MAJOR, 3),
        ] {
            relay.handle(&InputEvent::new(ty, code, value)).unwrap();
        }
        assert_eq!(
            relay.sink.actions,
            vec![
                Action::Forward(EV_KEY, BTN_STYLUS),
                Action::Forward(EV_MSC, 5),
                Action::Forward(EV_ABS, ABS_MT_TOUCH_MAJOR),
            ]
        );
    }

    #[test]
    fn test_destination_is_read_each_frame() {
        let sink = RecordingSink::new(identity_dest());
        let shared = sink.destination.clone();
        let mut relay = Relay::new(pen_settings(), sink);

        relay.handle(&InputEvent::new(EV_ABS, ABS_X, 0)).unwrap();
        relay.handle(&InputEvent::new(EV_ABS, ABS_Y, 0)).unwrap();
        relay.handle(&InputEvent::new(EV_SYN, SYN_REPORT, 0)).unwrap();

        let mut moved = identity_dest();
        moved.x = 1920;
        moved.y = 100;
        shared.set(moved);
        relay.handle(&InputEvent::new(EV_SYN, SYN_REPORT, 0)).unwrap();

        assert_eq!(relay.sink.moves(), vec![(0, 0), (1920, 100)]);
    }

    #[test]
    fn test_clamping_is_optional() {
        let mut relay = Relay::new(pen_settings(), RecordingSink::new(identity_dest()));
        let mut reader = stream(&[(EV_ABS, ABS_X, -40), (EV_ABS, ABS_Y, 30), SYN]);
        run_to_end(&mut relay, &mut reader);
        assert_eq!(relay.sink.moves(), vec![(0, 30)]);

        let mut settings = pen_settings();
        settings.clamp = false;
        let mut relay = Relay::new(settings, RecordingSink::new(identity_dest()));
        let mut reader = stream(&[(EV_ABS, ABS_X, -40), (EV_ABS, ABS_Y, 30), SYN]);
        run_to_end(&mut relay, &mut reader);
        assert_eq!(relay.sink.moves(), vec![(-40, 30)]);
    }

    #[test]
    fn test_touch_contact_from_tracking_id() {
        let frame = RM2.touch_frame();
        let e = frame.extent();
        let dest = Rect::new(0, 0, e.width as u32, e.height as u32);
        let settings = RelaySettings {
            stream: StreamKind::Touch,
            frame,
            contact: ContactPolicy::TrackingId,
            ..pen_settings()
        };
        let mut relay = Relay::new(settings, RecordingSink::new(dest));
        let mut reader = stream(&[
            (EV_ABS, ABS_MT_TRACKING_ID, 3),
            (EV_ABS, ABS_MT_POSITION_X, 100),
            (EV_ABS, ABS_MT_POSITION_Y, 200),
            SYN,
            (EV_ABS, ABS_MT_TRACKING_ID, -1),
            SYN,
        ]);
        run_to_end(&mut relay, &mut reader);

        // Touch axes are swapped into the pen frame.
        assert_eq!(relay.sink.moves(), vec![(200, 100), (200, 100)]);
        assert_eq!(relay.sink.buttons(), vec![true, false]);
        assert!(!relay
            .sink
            .actions
            .iter()
            .any(|a| matches!(a, Action::Axis(..))));
    }

    #[test]
    fn test_relative_positioning_sends_deltas() {
        let mut settings = pen_settings();
        settings.positioning = Positioning::Relative;
        let mut relay = Relay::new(settings, RecordingSink::new(identity_dest()));
        let mut reader = stream(&[
            (EV_ABS, ABS_X, 100),
            (EV_ABS, ABS_Y, 100),
            SYN,
            (EV_ABS, ABS_X, 110),
            SYN,
            (EV_ABS, ABS_Y, 95),
            SYN,
        ]);
        run_to_end(&mut relay, &mut reader);

        let deltas: Vec<_> = relay
            .sink
            .actions
            .iter()
            .filter(|a| matches!(a, Action::MoveBy(..)))
            .cloned()
            .collect();
        assert_eq!(deltas, vec![Action::MoveBy(10, 0), Action::MoveBy(0, -5)]);
        assert!(relay.sink.moves().is_empty());
        assert_eq!(relay.axes.position(), Some((110, 95)));
    }

    #[test]
    fn test_sink_failure_is_not_a_stream_error() {
        let mut sink = RecordingSink::new(identity_dest());
        sink.fail_flush = true;
        let mut relay = Relay::new(pen_settings(), sink);
        let mut reader = stream(&[(EV_ABS, ABS_X, 1), (EV_ABS, ABS_Y, 1), SYN]);

        let err = relay.run(&mut reader, &AtomicBool::new(false)).unwrap_err();
        assert!(matches!(err, RelayError::Sink(ref e) if e.kind() == io::ErrorKind::PermissionDenied));
    }

    #[test]
    fn test_stream_read_failure_is_io() {
        let steps = vec![Err(io::Error::new(io::ErrorKind::ConnectionReset, "gone"))];
        let mut reader = RecordReader::new(ScriptedReader::new(steps), RecordLayout::Timeval32);
        let mut relay = Relay::new(pen_settings(), RecordingSink::new(identity_dest()));

        let err = relay.run(&mut reader, &AtomicBool::new(false)).unwrap_err();
        assert!(matches!(err, RelayError::Io(_)));
    }
}
