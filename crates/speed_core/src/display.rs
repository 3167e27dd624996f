//! Text shown on the display surface.

use shared::domain::SpeedReading;

pub const LABEL_START: &str = "Start";
pub const LABEL_STOP: &str = "Stop";
pub const NO_MPS: &str = "-- m/s";
pub const NO_KMH: &str = "-- km/h";
pub const PROVIDER_DISABLED_NOTICE: &str = "GPS disabled";
pub const SUBSCRIBE_FAILED_NOTICE: &str = "Unable to start GPS updates";
pub const SETTINGS_FAILED_NOTICE: &str = "Unable to open location settings";
pub const ENABLE_PROVIDER_PROMPT: &str = "GPS is disabled. Open location settings to enable it?";

pub fn format_mps(reading: &SpeedReading) -> String {
    format!("{:.2} m/s", reading.mps)
}

pub fn format_kmh(reading: &SpeedReading) -> String {
    format!("{} km/h", reading.kmh)
}
