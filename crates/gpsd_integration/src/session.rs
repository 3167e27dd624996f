//! Long-lived connection to gpsd.
//!
//! The session owns the socket, tracks whether gpsd reports a usable
//! device and forwards TPV reports only while a watch is requested.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::{Context, Result};
use shared::protocol::ControllerEvent;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{tcp::OwnedWriteHalf, TcpStream},
    sync::mpsc::{UnboundedReceiver, UnboundedSender},
    time::MissedTickBehavior,
};
use tracing::{debug, info, warn};

use crate::{
    protocol::{parse_line, GpsdMessage, POLL_DEVICES, WATCH_DISABLE, WATCH_ENABLE},
    GpsdConfig,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionCommand {
    Watch(bool),
    Shutdown,
}

enum SessionEnd {
    Disconnected,
    Shutdown,
}

pub(crate) struct Session {
    pub(crate) config: GpsdConfig,
    pub(crate) available: Arc<AtomicBool>,
    pub(crate) commands: UnboundedReceiver<SessionCommand>,
    pub(crate) events: UnboundedSender<ControllerEvent>,
    pub(crate) watching: bool,
}

impl Session {
    pub(crate) async fn run(mut self) {
        loop {
            match TcpStream::connect(&self.config.addr).await {
                Ok(stream) => {
                    info!(addr = %self.config.addr, "connected to gpsd");
                    match self.drive(stream).await {
                        Ok(SessionEnd::Shutdown) => {
                            self.set_available(false);
                            return;
                        }
                        Ok(SessionEnd::Disconnected) => {
                            info!(addr = %self.config.addr, "gpsd closed the connection");
                        }
                        Err(error) => {
                            let error = format!("{error:#}");
                            warn!(addr = %self.config.addr, %error, "gpsd session failed");
                        }
                    }
                }
                Err(error) => {
                    debug!(addr = %self.config.addr, %error, "gpsd not reachable");
                }
            }

            self.set_available(false);
            if self.wait_for_reconnect().await.is_none() {
                return;
            }
        }
    }

    /// Sleeps out the reconnect delay while still taking watch commands.
    /// Returns `None` on shutdown.
    async fn wait_for_reconnect(&mut self) -> Option<()> {
        let delay = tokio::time::sleep(self.config.reconnect_delay);
        tokio::pin!(delay);
        loop {
            tokio::select! {
                _ = &mut delay => return Some(()),
                command = self.commands.recv() => match command {
                    None | Some(SessionCommand::Shutdown) => return None,
                    Some(SessionCommand::Watch(enable)) => self.watching = enable,
                },
            }
        }
    }

    async fn drive(&mut self, stream: TcpStream) -> Result<SessionEnd> {
        let (read_half, mut write_half) = stream.into_split();
        let mut lines = BufReader::new(read_half).lines();

        send(&mut write_half, POLL_DEVICES).await?;
        if self.watching {
            send(&mut write_half, WATCH_ENABLE).await?;
        }

        let mut poll = tokio::time::interval(self.config.device_poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
        poll.tick().await;

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line.context("failed to read from gpsd")? else {
                        return Ok(SessionEnd::Disconnected);
                    };
                    if self.handle_line(&line) {
                        send(&mut write_half, POLL_DEVICES).await?;
                    }
                }
                command = self.commands.recv() => match command {
                    None | Some(SessionCommand::Shutdown) => {
                        if self.watching {
                            let _ = send(&mut write_half, WATCH_DISABLE).await;
                        }
                        return Ok(SessionEnd::Shutdown);
                    }
                    Some(SessionCommand::Watch(enable)) => {
                        self.watching = enable;
                        let command = if enable { WATCH_ENABLE } else { WATCH_DISABLE };
                        send(&mut write_half, command).await?;
                        debug!(enable, "gpsd watch updated");
                    }
                },
                _ = poll.tick() => send(&mut write_half, POLL_DEVICES).await?,
            }
        }
    }

    /// Returns true when the device list should be polled again.
    fn handle_line(&self, line: &str) -> bool {
        let message = match parse_line(line) {
            Ok(message) => message,
            Err(error) => {
                warn!(%error, "skipping gpsd report");
                return false;
            }
        };

        match message {
            GpsdMessage::Version(version) => {
                debug!(release = %version.release, proto_major = version.proto_major, proto_minor = version.proto_minor, "gpsd version");
            }
            GpsdMessage::Devices(devices) => {
                debug!(count = devices.devices.len(), "gpsd devices");
                self.set_available(devices.any_active());
            }
            GpsdMessage::Device(device) => {
                if device.is_active() {
                    self.set_available(true);
                } else {
                    debug!(path = ?device.path, "gpsd device deactivated");
                    return true;
                }
            }
            GpsdMessage::Tpv(tpv) => {
                if self.watching {
                    let _ = self
                        .events
                        .send(ControllerEvent::LocationSample(tpv.to_sample()));
                }
            }
            GpsdMessage::Other => {}
        }
        false
    }

    fn set_available(&self, available: bool) {
        let previous = self.available.swap(available, Ordering::AcqRel);
        if previous == available {
            return;
        }

        let provider = self.config.provider_id.clone();
        info!(%provider, available, "gpsd availability changed");
        let event = if available {
            ControllerEvent::ProviderEnabled(provider)
        } else {
            ControllerEvent::ProviderDisabled(provider)
        };
        let _ = self.events.send(event);
    }
}

async fn send(write_half: &mut OwnedWriteHalf, command: &[u8]) -> Result<()> {
    write_half
        .write_all(command)
        .await
        .context("failed to write to gpsd")
}
