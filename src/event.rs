//! Decode Linux `input_event` records streamed from the tablet.

use std::io::{self, Read};

use evdevil::event::EventType;

use crate::error::RelayError;

pub const EV_SYN: u16 = 0x00;
pub const EV_KEY: u16 = 0x01;
pub const EV_REL: u16 = 0x02;
pub const EV_ABS: u16 = 0x03;
pub const EV_MSC: u16 = 0x04;

pub const SYN_REPORT: u16 = 0;
pub const SYN_DROPPED: u16 = 3;

pub const ABS_X: u16 = 0x00;
pub const ABS_Y: u16 = 0x01;
pub const ABS_PRESSURE: u16 = 0x18;
pub const ABS_DISTANCE: u16 = 0x19;
pub const ABS_TILT_X: u16 = 0x1a;
pub const ABS_TILT_Y: u16 = 0x1b;
pub const ABS_MT_SLOT: u16 = 0x2f;
pub const ABS_MT_TOUCH_MAJOR: u16 = 0x30;
pub const ABS_MT_TOUCH_MINOR: u16 = 0x31;
pub const ABS_MT_ORIENTATION: u16 = 0x34;
pub const ABS_MT_POSITION_X: u16 = 0x35;
pub const ABS_MT_POSITION_Y: u16 = 0x36;
pub const ABS_MT_TOOL_TYPE: u16 = 0x37;
pub const ABS_MT_TRACKING_ID: u16 = 0x39;
pub const ABS_MT_PRESSURE: u16 = 0x3a;

pub const BTN_TOOL_PEN: u16 = 0x140;
pub const BTN_TOOL_RUBBER: u16 = 0x141;
pub const BTN_TOUCH: u16 = 0x14a;
pub const BTN_STYLUS: u16 = 0x14b;
pub const BTN_STYLUS2: u16 = 0x14c;

/// One decoded `struct input_event`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    pub sec: u64,
    pub usec: u64,
    pub ty: u16,
    pub code: u16,
    pub value: i32,
}

impl InputEvent {
    pub fn new(ty: u16, code: u16, value: i32) -> Self {
        Self {
            sec: 0,
            usec: 0,
            ty,
            code,
            value,
        }
    }

    pub fn timestamp(&self) -> f64 {
        self.sec as f64 + self.usec as f64 / 1_000_000.0
    }

    /// Convert to an evdevil event for writing to a uinput device.
    pub fn to_evdev(&self) -> evdevil::event::InputEvent {
        evdevil::event::InputEvent::new(EventType::from_raw(self.ty), self.code, self.value)
    }
}

/// Wire layout of `struct input_event` on the tablet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordLayout {
    /// 32-bit ARM: `u32 sec, u32 usec, u16 type, u16 code, i32 value`.
    Timeval32,
    /// aarch64: `u64 sec, u64 usec, u16 type, u16 code, i32 value`.
    Timeval64,
}

impl RecordLayout {
    pub fn size(&self) -> usize {
        match self {
            RecordLayout::Timeval32 => 16,
            RecordLayout::Timeval64 => 24,
        }
    }

    /// Decode one record in native byte order. `buf` must hold exactly
    /// `self.size()` bytes.
    pub fn decode(&self, buf: &[u8]) -> Result<InputEvent, RelayError> {
        if buf.len() != self.size() {
            return Err(RelayError::MalformedRecord {
                expected: self.size(),
                got: buf.len(),
            });
        }
        let (sec, usec, rest) = match self {
            RecordLayout::Timeval32 => (
                u32::from_ne_bytes([buf[0], buf[1], buf[2], buf[3]]) as u64,
                u32::from_ne_bytes([buf[4], buf[5], buf[6], buf[7]]) as u64,
                &buf[8..],
            ),
            RecordLayout::Timeval64 => (
                ne_u64(&buf[0..8]),
                ne_u64(&buf[8..16]),
                &buf[16..],
            ),
        };
        Ok(InputEvent {
            sec,
            usec,
            ty: u16::from_ne_bytes([rest[0], rest[1]]),
            code: u16::from_ne_bytes([rest[2], rest[3]]),
            value: i32::from_ne_bytes([rest[4], rest[5], rest[6], rest[7]]),
        })
    }
}

/// Pulls fixed-size records out of a byte stream.
///
/// Read timeouts are not errors: a partially read record is kept and
/// completed on the next call.
pub struct RecordReader<R> {
    inner: R,
    layout: RecordLayout,
    buf: [u8; 24],
    filled: usize,
}

impl<R: Read> RecordReader<R> {
    pub fn new(inner: R, layout: RecordLayout) -> Self {
        Self {
            inner,
            layout,
            buf: [0; 24],
            filled: 0,
        }
    }

    /// Read the next record.
    ///
    /// Returns `Ok(None)` when the source timed out with no complete record
    /// available, and `MalformedRecord` when the stream ends mid-record or
    /// before one starts.
    pub fn next_event(&mut self) -> Result<Option<InputEvent>, RelayError> {
        let size = self.layout.size();
        while self.filled < size {
            match self.inner.read(&mut self.buf[self.filled..size]) {
                Ok(0) => {
                    return Err(RelayError::MalformedRecord {
                        expected: size,
                        got: self.filled,
                    })
                }
                Ok(n) => self.filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) if is_timeout(&e) => return Ok(None),
                Err(e) => return Err(e.into()),
            }
        }
        self.filled = 0;
        self.layout.decode(&self.buf[..size]).map(Some)
    }
}

fn ne_u64(bytes: &[u8]) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(bytes);
    u64::from_ne_bytes(raw)
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}

/// Symbolic name of an event type/code pair, for logs and `dump`.
pub fn code_name(ty: u16, code: u16) -> String {
    match ty {
        EV_SYN => match code {
            SYN_REPORT => "SYN_REPORT".into(),
            SYN_DROPPED => "SYN_DROPPED".into(),
            _ => format!("SYN/{}", code),
        },
        EV_KEY => {
            let name = match code {
                BTN_TOOL_PEN => "BTN_TOOL_PEN",
                BTN_TOOL_RUBBER => "BTN_TOOL_RUBBER",
                BTN_TOUCH => "BTN_TOUCH",
                BTN_STYLUS => "BTN_STYLUS",
                BTN_STYLUS2 => "BTN_STYLUS2",
                _ => return format!("KEY/{}", code),
            };
            name.into()
        }
        EV_ABS => {
            let abs = match code {
                ABS_X => "X",
                ABS_Y => "Y",
                ABS_PRESSURE => "PRESSURE",
                ABS_DISTANCE => "DISTANCE",
                ABS_TILT_X => "TILT_X",
                ABS_TILT_Y => "TILT_Y",
                ABS_MT_SLOT => "MT_SLOT",
                ABS_MT_TOUCH_MAJOR => "MT_TOUCH_MAJOR",
                ABS_MT_TOUCH_MINOR => "MT_TOUCH_MINOR",
                ABS_MT_ORIENTATION => "MT_ORIENTATION",
                ABS_MT_POSITION_X => "MT_POSITION_X",
                ABS_MT_POSITION_Y => "MT_POSITION_Y",
                ABS_MT_TOOL_TYPE => "MT_TOOL_TYPE",
                ABS_MT_TRACKING_ID => "MT_TRACKING_ID",
                ABS_MT_PRESSURE => "MT_PRESSURE",
                _ => return format!("ABS/{}", code),
            };
            format!("ABS_{}", abs)
        }
        EV_REL => format!("REL/{}", code),
        EV_MSC => format!("MSC/{}", code),
        _ => format!("type{} code{}", ty, code),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Encode a 16-byte record the way the 32-bit kernel lays it out.
    pub(crate) fn record(ty: u16, code: u16, value: i32) -> Vec<u8> {
        let mut buf = Vec::with_capacity(16);
        buf.extend_from_slice(&7u32.to_ne_bytes());
        buf.extend_from_slice(&250_000u32.to_ne_bytes());
        buf.extend_from_slice(&ty.to_ne_bytes());
        buf.extend_from_slice(&code.to_ne_bytes());
        buf.extend_from_slice(&value.to_ne_bytes());
        buf
    }

    /// Yields queued results one per `read`, then EOF.
    pub(crate) struct ScriptedReader {
        pub steps: std::collections::VecDeque<io::Result<Vec<u8>>>,
    }

    impl ScriptedReader {
        pub(crate) fn new(steps: Vec<io::Result<Vec<u8>>>) -> Self {
            Self {
                steps: steps.into(),
            }
        }
    }

    impl Read for ScriptedReader {
        fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
            match self.steps.pop_front() {
                None => Ok(0),
                Some(Err(e)) => Err(e),
                Some(Ok(mut chunk)) => {
                    let n = chunk.len().min(out.len());
                    out[..n].copy_from_slice(&chunk[..n]);
                    if n < chunk.len() {
                        self.steps.push_front(Ok(chunk.split_off(n)));
                    }
                    Ok(n)
                }
            }
        }
    }

    #[test]
    fn test_decode_32bit_record() {
        let ev = RecordLayout::Timeval32
            .decode(&record(EV_ABS, ABS_PRESSURE, -42))
            .unwrap();
        assert_eq!(ev.ty, EV_ABS);
        assert_eq!(ev.code, ABS_PRESSURE);
        assert_eq!(ev.value, -42);
        assert_eq!(ev.timestamp(), 7.25);
    }

    #[test]
    fn test_decode_64bit_record() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&1_700_000_000u64.to_ne_bytes());
        buf.extend_from_slice(&500_000u64.to_ne_bytes());
        buf.extend_from_slice(&EV_KEY.to_ne_bytes());
        buf.extend_from_slice(&BTN_STYLUS.to_ne_bytes());
        buf.extend_from_slice(&1i32.to_ne_bytes());

        let ev = RecordLayout::Timeval64.decode(&buf).unwrap();
        assert_eq!((ev.ty, ev.code, ev.value), (EV_KEY, BTN_STYLUS, 1));
        assert_eq!(ev.timestamp(), 1_700_000_000.5);
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        let err = RecordLayout::Timeval32.decode(&[0u8; 10]).unwrap_err();
        assert!(matches!(
            err,
            RelayError::MalformedRecord {
                expected: 16,
                got: 10
            }
        ));
    }

    #[test]
    fn test_reader_reports_truncated_stream() {
        let mut bytes = record(EV_ABS, ABS_X, 1);
        bytes.extend_from_slice(&record(EV_ABS, ABS_Y, 2)[..9]);
        let mut reader = RecordReader::new(ScriptedReader::new(vec![Ok(bytes)]), RecordLayout::Timeval32);

        assert_eq!(reader.next_event().unwrap().unwrap().value, 1);
        let err = reader.next_event().unwrap_err();
        assert!(matches!(
            err,
            RelayError::MalformedRecord {
                expected: 16,
                got: 9
            }
        ));
    }

    #[test]
    fn test_reader_keeps_partial_record_across_timeout() {
        let full = record(EV_ABS, ABS_Y, 99);
        let steps = vec![
            Ok(full[..5].to_vec()),
            Err(io::Error::new(io::ErrorKind::TimedOut, "idle")),
            Err(io::Error::new(io::ErrorKind::WouldBlock, "idle")),
            Ok(full[5..].to_vec()),
        ];
        let mut reader = RecordReader::new(ScriptedReader::new(steps), RecordLayout::Timeval32);

        assert_eq!(reader.next_event().unwrap(), None);
        assert_eq!(reader.next_event().unwrap(), None);
        let ev = reader.next_event().unwrap().unwrap();
        assert_eq!((ev.code, ev.value), (ABS_Y, 99));
    }

    #[test]
    fn test_reader_propagates_hard_errors() {
        let steps = vec![Err(io::Error::new(io::ErrorKind::ConnectionReset, "gone"))];
        let mut reader = RecordReader::new(ScriptedReader::new(steps), RecordLayout::Timeval32);
        assert!(matches!(reader.next_event(), Err(RelayError::Io(_))));
    }

    #[test]
    fn test_code_names() {
        assert_eq!(code_name(EV_SYN, SYN_REPORT), "SYN_REPORT");
        assert_eq!(code_name(EV_ABS, ABS_MT_TRACKING_ID), "ABS_MT_TRACKING_ID");
        assert_eq!(code_name(EV_ABS, 0x99), "ABS/153");
        assert_eq!(code_name(EV_KEY, BTN_TOUCH), "BTN_TOUCH");
        assert_eq!(code_name(EV_KEY, 30), "KEY/30");
    }
}
