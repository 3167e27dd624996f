//! Location provider backed by a gpsd daemon.

use std::{
    process::Command,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::{anyhow, bail, Context};
use shared::{
    domain::{ProviderId, SubscriptionParams},
    protocol::ControllerEvent,
};
use speed_core::LocationProvider;
use tokio::{
    sync::mpsc::{self, UnboundedSender},
    task::JoinHandle,
};
use tracing::{debug, info};

pub mod protocol;
mod session;

use session::{Session, SessionCommand};

pub const DEFAULT_GPSD_ADDR: &str = "127.0.0.1:2947";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpsdConfig {
    pub addr: String,
    pub provider_id: ProviderId,
    pub reconnect_delay: Duration,
    pub device_poll_interval: Duration,
    /// Program (plus whitespace-separated arguments) launched when the user
    /// asks to enable location.
    pub settings_command: Option<String>,
}

impl Default for GpsdConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_GPSD_ADDR.into(),
            provider_id: ProviderId::gps(),
            reconnect_delay: Duration::from_secs(2),
            device_poll_interval: Duration::from_secs(5),
            settings_command: None,
        }
    }
}

pub struct GpsdProvider {
    config: GpsdConfig,
    available: Arc<AtomicBool>,
    commands: UnboundedSender<SessionCommand>,
    watching: bool,
    task: JoinHandle<()>,
}

impl GpsdProvider {
    /// Starts the gpsd session on the current tokio runtime. Samples and
    /// availability changes are pushed into `events`.
    pub fn spawn(config: GpsdConfig, events: UnboundedSender<ControllerEvent>) -> Self {
        let available = Arc::new(AtomicBool::new(false));
        let (commands, commands_rx) = mpsc::unbounded_channel();
        let session = Session {
            config: config.clone(),
            available: Arc::clone(&available),
            commands: commands_rx,
            events,
            watching: false,
        };
        let task = tokio::spawn(session.run());

        Self {
            config,
            available,
            commands,
            watching: false,
            task,
        }
    }

    pub fn config(&self) -> &GpsdConfig {
        &self.config
    }

    fn send(&self, command: SessionCommand) -> anyhow::Result<()> {
        self.commands
            .send(command)
            .map_err(|_| anyhow!("gpsd session for {} is not running", self.config.addr))
    }
}

impl LocationProvider for GpsdProvider {
    fn is_available(&self, provider: &ProviderId) -> bool {
        *provider == self.config.provider_id && self.available.load(Ordering::Acquire)
    }

    fn subscribe(
        &mut self,
        provider: &ProviderId,
        params: SubscriptionParams,
    ) -> anyhow::Result<()> {
        if *provider != self.config.provider_id {
            bail!("gpsd does not serve provider '{provider}'");
        }
        if params != SubscriptionParams::UNTHROTTLED {
            debug!(?params, "gpsd reports every fix; throttling parameters ignored");
        }
        if self.watching {
            return Ok(());
        }

        self.send(SessionCommand::Watch(true))?;
        self.watching = true;
        Ok(())
    }

    fn unsubscribe(&mut self) {
        if !self.watching {
            return;
        }
        // A stopped session has no watch to cancel.
        let _ = self.send(SessionCommand::Watch(false));
        self.watching = false;
    }

    fn open_location_settings(&mut self) -> anyhow::Result<()> {
        let Some(command_line) = self.config.settings_command.as_deref() else {
            info!(
                addr = %self.config.addr,
                "no settings command configured; start gpsd or attach a GPS receiver"
            );
            return Ok(());
        };

        let mut parts = command_line.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| anyhow!("settings command is empty"))?;
        Command::new(program)
            .args(parts)
            .spawn()
            .with_context(|| format!("failed to launch settings command '{command_line}'"))?;
        info!(command = command_line, "launched location settings command");
        Ok(())
    }
}

impl Drop for GpsdProvider {
    fn drop(&mut self) {
        if self.send(SessionCommand::Shutdown).is_err() {
            self.task.abort();
        }
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
