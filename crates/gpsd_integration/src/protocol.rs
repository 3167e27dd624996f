//! gpsd JSON watch protocol: the commands we send and the reports we read.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use shared::domain::SpeedSample;
use thiserror::Error;

pub const POLL_DEVICES: &[u8] = b"?DEVICES;\n";
pub const WATCH_ENABLE: &[u8] = b"?WATCH={\"enable\":true,\"json\":true};\n";
pub const WATCH_DISABLE: &[u8] = b"?WATCH={\"enable\":false};\n";

#[derive(Debug, Error)]
pub enum GpsdError {
    #[error("malformed gpsd report: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// One report line from gpsd, discriminated by its `class` field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "class", rename_all = "UPPERCASE")]
pub enum GpsdMessage {
    Version(Version),
    Devices(Devices),
    Device(Device),
    Tpv(Tpv),
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Version {
    #[serde(default)]
    pub release: String,
    #[serde(default)]
    pub proto_major: u32,
    #[serde(default)]
    pub proto_minor: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Devices {
    #[serde(default)]
    pub devices: Vec<Device>,
}

impl Devices {
    pub fn any_active(&self) -> bool {
        self.devices.iter().any(Device::is_active)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Device {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub driver: Option<String>,
    /// Activation timestamp, or the number 0 once the device is gone.
    #[serde(default)]
    pub activated: Option<serde_json::Value>,
}

impl Device {
    /// Listed devices count as active unless gpsd marked them deactivated.
    pub fn is_active(&self) -> bool {
        !matches!(&self.activated, Some(serde_json::Value::Number(n)) if n.as_f64() == Some(0.0))
    }
}

/// Time-position-velocity report.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Tpv {
    #[serde(default)]
    pub device: Option<String>,
    /// 0/1 no fix, 2 = 2D, 3 = 3D.
    #[serde(default)]
    pub mode: u8,
    #[serde(default)]
    pub time: Option<DateTime<Utc>>,
    /// Ground speed in m/s.
    #[serde(default)]
    pub speed: Option<f64>,
}

impl Tpv {
    pub fn has_fix(&self) -> bool {
        self.mode >= 2
    }

    pub fn to_sample(&self) -> SpeedSample {
        let sample = match self.speed {
            Some(speed) if self.has_fix() => SpeedSample::with_speed(speed),
            _ => SpeedSample::without_speed(),
        };
        match self.time {
            Some(time) => sample.at(time),
            None => sample,
        }
    }
}

pub fn parse_line(line: &str) -> Result<GpsdMessage, GpsdError> {
    Ok(serde_json::from_str(line.trim())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tpv_with_speed() {
        let line = r#"{"class":"TPV","device":"/dev/ttyUSB0","mode":3,"time":"2024-05-01T10:34:48.283Z","lat":46.49,"lon":7.72,"speed":27.77}"#;
        let GpsdMessage::Tpv(tpv) = parse_line(line).expect("parse") else {
            panic!("expected TPV");
        };

        let sample = tpv.to_sample();
        assert_eq!(sample.speed_mps(), Some(27.77));
        assert!(sample.time.is_some());
        assert_eq!(tpv.device.as_deref(), Some("/dev/ttyUSB0"));
    }

    #[test]
    fn tpv_without_fix_has_no_speed() {
        let line = r#"{"class":"TPV","mode":1,"speed":3.0}"#;
        let GpsdMessage::Tpv(tpv) = parse_line(line).expect("parse") else {
            panic!("expected TPV");
        };
        assert!(!tpv.to_sample().has_speed());
    }

    #[test]
    fn tpv_without_speed_field_has_no_speed() {
        let line = r#"{"class":"TPV","mode":3,"lat":1.0,"lon":2.0}"#;
        let GpsdMessage::Tpv(tpv) = parse_line(line).expect("parse") else {
            panic!("expected TPV");
        };
        assert!(!tpv.to_sample().has_speed());
    }

    #[test]
    fn devices_report_tracks_activation() {
        let line = r#"{"class":"DEVICES","devices":[{"class":"DEVICE","path":"/dev/ttyACM0","driver":"u-blox","activated":"2024-05-01T10:00:00.000Z"}]}"#;
        let GpsdMessage::Devices(devices) = parse_line(line).expect("parse") else {
            panic!("expected DEVICES");
        };
        assert!(devices.any_active());

        let empty = parse_line(r#"{"class":"DEVICES","devices":[]}"#).expect("parse");
        assert_eq!(empty, GpsdMessage::Devices(Devices { devices: vec![] }));
    }

    #[test]
    fn deactivated_device_is_not_active() {
        let line = r#"{"class":"DEVICE","path":"/dev/ttyACM0","activated":0}"#;
        let GpsdMessage::Device(device) = parse_line(line).expect("parse") else {
            panic!("expected DEVICE");
        };
        assert!(!device.is_active());
    }

    #[test]
    fn unknown_classes_are_tolerated() {
        let line = r#"{"class":"SKY","satellites":[]}"#;
        assert_eq!(parse_line(line).expect("parse"), GpsdMessage::Other);
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            parse_line("not json"),
            Err(GpsdError::Malformed(_))
        ));
    }
}
