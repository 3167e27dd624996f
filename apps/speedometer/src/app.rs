//! Event loop: owns the controller and feeds it one event at a time.

use std::io::{self, Stdout};

use anyhow::{Context, Result};
use gpsd_integration::GpsdProvider;
use shared::{domain::ProviderId, protocol::ControllerEvent};
use speed_core::{DisplaySurface, LocationProvider, SpeedDisplayController};
use storage::StateStore;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{info, warn};

use crate::{
    config::{Settings, SourceKind},
    replay::{load_replay, ReplayProvider},
    terminal::{spawn_input_reader, TerminalDisplay, HELP},
};

type Controller = SpeedDisplayController<Box<dyn LocationProvider>, TerminalDisplay<Stdout>>;

pub async fn run(settings: Settings) -> Result<()> {
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let provider = build_provider(&settings, events_tx.clone())?;
    let mut controller = SpeedDisplayController::new(provider, TerminalDisplay::new(io::stdout()));

    let store = StateStore::new(&settings.state_path);
    restore_paused_state(&store, &mut controller);

    let (quit_tx, quit_rx) = mpsc::unbounded_channel();
    println!("{HELP}");
    spawn_input_reader(events_tx, quit_tx);

    controller.handle(ControllerEvent::EnterForeground);
    drive(&mut controller, &store, events_rx, quit_rx).await;

    controller.handle(ControllerEvent::EnterBackground);
    persist_paused_state(&store, &controller);
    println!();
    Ok(())
}

pub fn reset_saved_state(settings: &Settings) -> Result<()> {
    let store = StateStore::new(&settings.state_path);
    store.clear()?;
    info!(path = %store.path().display(), "cleared saved state");
    Ok(())
}

fn build_provider(
    settings: &Settings,
    events: UnboundedSender<ControllerEvent>,
) -> Result<Box<dyn LocationProvider>> {
    match settings.source {
        SourceKind::Gpsd => {
            let config = settings.gpsd_config();
            info!(addr = %config.addr, "using gpsd location provider");
            Ok(Box::new(GpsdProvider::spawn(config, events)))
        }
        SourceKind::Replay => {
            let path = settings
                .replay_path
                .as_deref()
                .context("replay source needs a replay file (--replay or replay_path)")?;
            let records = load_replay(path)?;
            info!(path = %path.display(), records = records.len(), "using replay location provider");
            Ok(Box::new(ReplayProvider::new(
                records,
                ProviderId::gps(),
                settings.replay_available,
                events,
            )))
        }
    }
}

async fn drive(
    controller: &mut Controller,
    store: &StateStore,
    mut events: UnboundedReceiver<ControllerEvent>,
    mut quit: UnboundedReceiver<()>,
) {
    loop {
        tokio::select! {
            Some(event) = events.recv() => handle_event(controller, store, event),
            _ = quit.recv() => {
                info!("quit requested");
                return;
            }
            result = tokio::signal::ctrl_c() => {
                if let Err(error) = result {
                    warn!(%error, "failed to listen for ctrl-c");
                }
                info!("interrupted");
                return;
            }
        }
    }
}

pub(crate) fn handle_event<P, D>(
    controller: &mut SpeedDisplayController<P, D>,
    store: &StateStore,
    event: ControllerEvent,
) where
    P: LocationProvider,
    D: DisplaySurface,
{
    let entering_background = event == ControllerEvent::EnterBackground;
    controller.handle(event);
    if entering_background {
        persist_paused_state(store, controller);
    }
}

pub(crate) fn restore_paused_state<P, D>(
    store: &StateStore,
    controller: &mut SpeedDisplayController<P, D>,
) where
    P: LocationProvider,
    D: DisplaySurface,
{
    match store.load_paused_state() {
        Ok(Some(token)) => {
            if let Err(error) = controller.restore_state(&token) {
                warn!(%error, "ignoring saved state");
            }
        }
        Ok(None) => {}
        Err(error) => {
            let error = format!("{error:#}");
            warn!(%error, "failed to load saved state; starting stopped");
        }
    }
}

pub(crate) fn persist_paused_state<P, D>(store: &StateStore, controller: &SpeedDisplayController<P, D>)
where
    P: LocationProvider,
    D: DisplaySurface,
{
    if let Err(error) = store.save_paused_state(&controller.save_state()) {
        let error = format!("{error:#}");
        warn!(%error, path = %store.path().display(), "failed to save state");
    }
}

#[cfg(test)]
#[path = "tests/app_tests.rs"]
mod tests;
