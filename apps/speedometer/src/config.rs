use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use clap::ValueEnum;
use gpsd_integration::{GpsdConfig, DEFAULT_GPSD_ADDR};
use shared::domain::ProviderId;
use tracing::{debug, warn};

const ENV_PREFIX: &str = "SPEEDOMETER_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    Gpsd,
    Replay,
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gpsd" => Ok(Self::Gpsd),
            "replay" => Ok(Self::Replay),
            other => Err(format!("unknown source '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub source: SourceKind,
    pub gpsd_addr: String,
    pub replay_path: Option<PathBuf>,
    pub replay_available: bool,
    pub state_path: PathBuf,
    pub settings_command: Option<String>,
    pub reconnect_delay_ms: u64,
    pub device_poll_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            source: SourceKind::Gpsd,
            gpsd_addr: DEFAULT_GPSD_ADDR.into(),
            replay_path: None,
            replay_available: true,
            state_path: default_state_path(),
            settings_command: None,
            reconnect_delay_ms: 2000,
            device_poll_ms: 5000,
        }
    }
}

impl Settings {
    pub fn gpsd_config(&self) -> GpsdConfig {
        GpsdConfig {
            addr: self.gpsd_addr.clone(),
            provider_id: ProviderId::gps(),
            reconnect_delay: Duration::from_millis(self.reconnect_delay_ms),
            device_poll_interval: Duration::from_millis(self.device_poll_ms.max(1)),
            settings_command: self.settings_command.clone(),
        }
    }

    /// Applies one `key = value` pair; invalid values keep the previous setting.
    pub fn apply(&mut self, key: &str, value: &str) {
        let value = value.trim();
        match key {
            "source" => match value.parse() {
                Ok(source) => self.source = source,
                Err(reason) => warn!(key, value, %reason, "ignoring invalid setting"),
            },
            "gpsd_addr" => self.gpsd_addr = value.to_string(),
            "replay_path" => self.replay_path = non_empty(value).map(PathBuf::from),
            "replay_available" => match value.parse() {
                Ok(available) => self.replay_available = available,
                Err(_) => warn!(key, value, "ignoring invalid setting"),
            },
            "state_path" => {
                if let Some(path) = non_empty(value) {
                    self.state_path = PathBuf::from(path);
                }
            }
            "settings_command" => self.settings_command = non_empty(value).map(str::to_string),
            "reconnect_delay_ms" => match value.parse() {
                Ok(ms) => self.reconnect_delay_ms = ms,
                Err(_) => warn!(key, value, "ignoring invalid setting"),
            },
            "device_poll_ms" => match value.parse() {
                Ok(ms) => self.device_poll_ms = ms,
                Err(_) => warn!(key, value, "ignoring invalid setting"),
            },
            _ => debug!(key, "ignoring unknown setting"),
        }
    }

    pub fn apply_toml(&mut self, raw: &str) {
        let file_cfg = match toml::from_str::<HashMap<String, toml::Value>>(raw) {
            Ok(file_cfg) => file_cfg,
            Err(error) => {
                warn!(%error, "ignoring unparsable config file");
                return;
            }
        };

        for (key, value) in file_cfg {
            let value = match value {
                toml::Value::String(s) => s,
                other => other.to_string(),
            };
            self.apply(&key, &value);
        }
    }

    pub fn apply_env(&mut self, vars: impl IntoIterator<Item = (String, String)>) {
        for (name, value) in vars {
            if let Some(key) = name.strip_prefix(ENV_PREFIX) {
                self.apply(&key.to_ascii_lowercase(), &value);
            }
        }
    }
}

/// Defaults, then the TOML file (if present), then `SPEEDOMETER_*` variables.
pub fn load_settings(config_path: &Path) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(config_path) {
        debug!(path = %config_path.display(), "loading config file");
        settings.apply_toml(&raw);
    }
    settings.apply_env(std::env::vars());

    settings
}

pub fn default_state_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("speedometer")
        .join("state.json")
}

fn non_empty(value: &str) -> Option<&str> {
    (!value.is_empty()).then_some(value)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
