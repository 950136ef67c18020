//! Dump raw input events from the reMarkable for debugging.
//! Run: rm-mouse dump pen  (or touch, button) to stream and print events.

use std::io::Read;

use crate::config::Config;
use crate::device::DeviceProfile;
use crate::error::RelayError;
use crate::event::{code_name, InputEvent, RecordReader};
use crate::ssh;

/// Resolve a dump target ("pen", "touch", "button") to its device path.
fn device_path<'a>(
    which: &str,
    config: &'a Config,
    profile: &'a DeviceProfile,
) -> Result<&'a str, String> {
    match which {
        "pen" => Ok(config.pen_device.as_deref().unwrap_or(profile.pen_device)),
        "touch" => Ok(config
            .touch_device
            .as_deref()
            .unwrap_or(profile.touch_device)),
        "button" => Ok(profile.button_device),
        other => Err(format!(
            "unknown device '{}' (expected pen, touch or button)",
            other
        )),
    }
}

fn format_event(n: u64, event: &InputEvent) -> String {
    format!(
        "{:6}  {:.6}  {:<22} value={}",
        n,
        event.timestamp(),
        code_name(event.ty, event.code),
        event.value
    )
}

pub fn run_dump(
    which: &str,
    config: &Config,
    profile: &DeviceProfile,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let path = device_path(which, config, profile)?;
    let input = ssh::open_input_stream(path, config)?;
    eprintln!("Dumping {} events from {} (Ctrl+C to stop):\n", which, path);
    dump_records(RecordReader::new(input, profile.record_layout))
}

fn dump_records<R: Read>(mut reader: RecordReader<R>) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut n = 0u64;
    loop {
        match reader.next_event() {
            Ok(Some(event)) => {
                n += 1;
                println!("{}", format_event(n, &event));
            }
            Ok(None) => {}
            Err(RelayError::MalformedRecord { got: 0, .. }) => {
                eprintln!("\nStream closed after {} events", n);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }
    }
}
