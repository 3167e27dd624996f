//! Location provider that plays back a recorded drive from a JSON-lines file.

use std::{
    fs,
    path::Path,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use shared::{
    domain::{ProviderId, SpeedSample, SubscriptionParams},
    protocol::ControllerEvent,
};
use speed_core::LocationProvider;
use tokio::{sync::mpsc::UnboundedSender, task::JoinHandle};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderChange {
    Enabled,
    Disabled,
}

/// One line of a replay file: either a sample (`speed` may be null) or a
/// provider availability change.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplayRecord {
    #[serde(default)]
    pub delay_ms: u64,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub provider: Option<ProviderChange>,
}

/// Blank lines and lines starting with `#` are skipped.
pub fn parse_replay(raw: &str) -> Result<Vec<ReplayRecord>> {
    raw.lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(index, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("invalid replay record on line {}", index + 1))
        })
        .collect()
}

pub fn load_replay(path: &Path) -> Result<Vec<ReplayRecord>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read replay file '{}'", path.display()))?;
    let records = parse_replay(&raw)?;
    if records.is_empty() {
        bail!("replay file '{}' has no records", path.display());
    }
    Ok(records)
}

pub struct ReplayProvider {
    records: Arc<[ReplayRecord]>,
    provider_id: ProviderId,
    available: Arc<AtomicBool>,
    cursor: Arc<AtomicUsize>,
    events: UnboundedSender<ControllerEvent>,
    task: Option<JoinHandle<()>>,
}

impl ReplayProvider {
    pub fn new(
        records: Vec<ReplayRecord>,
        provider_id: ProviderId,
        available: bool,
        events: UnboundedSender<ControllerEvent>,
    ) -> Self {
        Self {
            records: records.into(),
            provider_id,
            available: Arc::new(AtomicBool::new(available)),
            cursor: Arc::new(AtomicUsize::new(0)),
            events,
            task: None,
        }
    }

    #[cfg(test)]
    pub fn is_subscribed(&self) -> bool {
        self.task.is_some()
    }

    /// Index of the next record to play.
    pub fn position(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }
}

impl LocationProvider for ReplayProvider {
    fn is_available(&self, provider: &ProviderId) -> bool {
        *provider == self.provider_id && self.available.load(Ordering::Acquire)
    }

    fn subscribe(&mut self, provider: &ProviderId, params: SubscriptionParams) -> Result<()> {
        if *provider != self.provider_id {
            return Err(anyhow!("replay does not serve provider '{provider}'"));
        }
        if self.task.is_some() {
            return Ok(());
        }

        debug!(?params, position = self.position(), "starting replay");
        self.task = Some(tokio::spawn(play(
            Arc::clone(&self.records),
            self.provider_id.clone(),
            Arc::clone(&self.available),
            Arc::clone(&self.cursor),
            self.events.clone(),
        )));
        Ok(())
    }

    fn unsubscribe(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!(position = self.position(), "replay paused");
        }
    }

    fn open_location_settings(&mut self) -> Result<()> {
        if !self.available.swap(true, Ordering::AcqRel) {
            info!(provider = %self.provider_id, "replay provider enabled");
            let _ = self
                .events
                .send(ControllerEvent::ProviderEnabled(self.provider_id.clone()));
        }
        Ok(())
    }
}

impl Drop for ReplayProvider {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

async fn play(
    records: Arc<[ReplayRecord]>,
    provider_id: ProviderId,
    available: Arc<AtomicBool>,
    cursor: Arc<AtomicUsize>,
    events: UnboundedSender<ControllerEvent>,
) {
    loop {
        let index = cursor.load(Ordering::Acquire);
        let Some(record) = records.get(index) else {
            info!("replay finished");
            return;
        };

        if record.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(record.delay_ms)).await;
        }

        let event = match record.provider {
            Some(ProviderChange::Enabled) => {
                available.store(true, Ordering::Release);
                ControllerEvent::ProviderEnabled(provider_id.clone())
            }
            Some(ProviderChange::Disabled) => {
                available.store(false, Ordering::Release);
                ControllerEvent::ProviderDisabled(provider_id.clone())
            }
            None => ControllerEvent::LocationSample(match record.speed {
                Some(speed) => SpeedSample::with_speed(speed),
                None => SpeedSample::without_speed(),
            }),
        };
        cursor.store(index + 1, Ordering::Release);

        if events.send(event).is_err() {
            return;
        }
        tokio::task::yield_now().await;
    }
}

#[cfg(test)]
#[path = "tests/replay_tests.rs"]
mod tests;
