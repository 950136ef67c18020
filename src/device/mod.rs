mod rm1;
mod rm2;
mod rmpp;

use std::io::Read;
use std::str::FromStr;

use serde::Deserialize;

pub use rm1::RM1;
pub use rm2::RM2;
pub use rmpp::RMPP;

use crate::error::RelayError;
use crate::event::RecordLayout;
use crate::mapping::Extent;

/// Range of one absolute axis as reported by the tablet's evdev driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisRange {
    pub min: i32,
    pub max: i32,
    /// Units per mm (0 when the driver does not report one).
    pub resolution: i32,
}

impl AxisRange {
    pub const fn new(min: i32, max: i32, resolution: i32) -> Self {
        Self { min, max, resolution }
    }

    pub fn span(&self) -> f64 {
        (self.max - self.min) as f64
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PenAxes {
    pub x: AxisRange,
    pub y: AxisRange,
    pub pressure: AxisRange,
    pub distance: AxisRange,
    pub tilt: AxisRange,
}

#[derive(Debug, Clone, Copy)]
pub struct TouchAxes {
    pub x: AxisRange,
    pub y: AxisRange,
    /// Touch X grows away from the pen digitizer's Y axis.
    pub invert_x: bool,
}

/// Device-specific parameters for input handling.
#[derive(Debug, Clone, Copy)]
pub struct DeviceProfile {
    pub name: &'static str,

    pub record_layout: RecordLayout,

    pub pen: PenAxes,
    pub touch: TouchAxes,

    // Default device paths
    pub pen_device: &'static str,
    pub touch_device: &'static str,
    pub button_device: &'static str,
}

/// Places a sensor's raw axes into the pen digitizer frame used by the
/// mapper.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorFrame {
    x: AxisRange,
    y: AxisRange,
    swap: bool,
    invert_x: bool,
}

impl SensorFrame {
    /// Size of the sensor once aligned to the pen frame.
    pub fn extent(&self) -> Extent {
        let raw = Extent::new(self.x.span(), self.y.span());
        if self.swap {
            raw.swapped()
        } else {
            raw
        }
    }

    /// Convert a raw sensor reading into pen-frame coordinates.
    pub fn align(&self, x: i32, y: i32) -> (f64, f64) {
        let mut fx = (x - self.x.min) as f64;
        let fy = (y - self.y.min) as f64;
        if self.invert_x {
            fx = self.x.span() - fx;
        }
        if self.swap {
            (fy, fx)
        } else {
            (fx, fy)
        }
    }
}

impl DeviceProfile {
    pub fn pen_frame(&self) -> SensorFrame {
        SensorFrame {
            x: self.pen.x,
            y: self.pen.y,
            swap: false,
            invert_x: false,
        }
    }

    /// The touch panel is mounted portrait; its Y runs along the pen X.
    pub fn touch_frame(&self) -> SensorFrame {
        SensorFrame {
            x: self.touch.x,
            y: self.touch.y,
            swap: true,
            invert_x: self.touch.invert_x,
        }
    }

    /// Match the contents of `/proc/device-tree/model`.
    pub fn from_model(model: &str) -> Option<&'static Self> {
        // Check for rMPP first (more specific)
        if model.contains("reMarkable Ferrari") || model.contains("Paper Pro") {
            return Some(&RMPP);
        }
        if model.contains("reMarkable 2") {
            return Some(&RM2);
        }
        if model.contains("reMarkable 1") || model.contains("reMarkable Prototype 1") {
            return Some(&RM1);
        }
        None
    }

    /// Detect device via SSH connection.
    ///
    /// Reads the device model from /proc/device-tree/model on the remote
    /// device, falling back to where `/dev/input/touchscreen0` points (the
    /// pen is `event0` only on the reMarkable 1).
    pub fn detect_via_ssh(
        session: &ssh2::Session,
    ) -> Result<&'static Self, Box<dyn std::error::Error + Send + Sync>> {
        let model = run_remote(session, "cat /proc/device-tree/model")?;
        let model = model.trim_end_matches('\0').trim();
        log::debug!("Detected remote device model: {:?}", model);

        if let Some(profile) = Self::from_model(model) {
            log::info!("Detected {}", profile.name);
            return Ok(profile);
        }

        let pen_file = run_remote(session, "readlink -f /dev/input/touchscreen0")?;
        match pen_file.trim() {
            "/dev/input/event0" => {
                log::info!("Detected {} (by input layout)", RM1.name);
                Ok(&RM1)
            }
            "/dev/input/event1" => {
                log::info!("Detected {} (by input layout)", RM2.name);
                Ok(&RM2)
            }
            _ => Err(RelayError::UnsupportedDevice(model.to_string()).into()),
        }
    }
}

/// Device model name accepted on the command line and in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Model {
    Rm1,
    Rm2,
    Rmpp,
}

impl Model {
    pub fn profile(&self) -> &'static DeviceProfile {
        match self {
            Model::Rm1 => &RM1,
            Model::Rm2 => &RM2,
            Model::Rmpp => &RMPP,
        }
    }
}

impl FromStr for Model {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rm1" => Ok(Model::Rm1),
            "rm2" => Ok(Model::Rm2),
            "rmpp" => Ok(Model::Rmpp),
            _ => Err(RelayError::UnsupportedDevice(s.to_string())),
        }
    }
}

fn run_remote(
    session: &ssh2::Session,
    cmd: &str,
) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
    let mut channel = session.channel_session()?;
    channel.exec(cmd)?;

    let mut output = String::new();
    channel.read_to_string(&mut output)?;
    channel.close()?;
    channel.wait_close()?;

    let status = channel.exit_status()?;
    if status != 0 {
        return Err(format!("'{}' failed (exit status {})", cmd, status).into());
    }
    Ok(output)
}
