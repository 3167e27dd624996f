use super::*;
use shared::domain::{RunState, SubscriptionParams};

struct FixedProvider {
    available: bool,
    subscribed: bool,
}

impl LocationProvider for FixedProvider {
    fn is_available(&self, _provider: &ProviderId) -> bool {
        self.available
    }

    fn subscribe(&mut self, _provider: &ProviderId, _params: SubscriptionParams) -> Result<()> {
        self.subscribed = true;
        Ok(())
    }

    fn unsubscribe(&mut self) {
        self.subscribed = false;
    }

    fn open_location_settings(&mut self) -> Result<()> {
        Ok(())
    }
}

fn controller(
    available: bool,
) -> SpeedDisplayController<FixedProvider, TerminalDisplay<Vec<u8>>> {
    SpeedDisplayController::new(
        FixedProvider {
            available,
            subscribed: false,
        },
        TerminalDisplay::new(Vec::new()),
    )
}

fn store_in(dir: &tempfile::TempDir) -> StateStore {
    StateStore::new(dir.path().join("state.json"))
}

#[test]
fn background_persists_state_for_next_launch() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = store_in(&dir);

    let mut first = controller(true);
    handle_event(&mut first, &store, ControllerEvent::EnterForeground);
    handle_event(&mut first, &store, ControllerEvent::UserToggle);
    handle_event(&mut first, &store, ControllerEvent::EnterBackground);
    assert!(!first.provider().subscribed);
    assert_eq!(
        store.load_paused_state().expect("load").as_deref(),
        Some("STARTED")
    );

    let mut second = controller(true);
    restore_paused_state(&store, &mut second);
    handle_event(&mut second, &store, ControllerEvent::EnterForeground);
    assert_eq!(second.state(), RunState::Started);
    assert!(second.provider().subscribed);
}

#[test]
fn restored_started_state_yields_to_unavailable_provider() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = store_in(&dir);
    store.save_paused_state("STARTED").expect("seed");

    let mut controller = controller(false);
    restore_paused_state(&store, &mut controller);
    controller.handle(ControllerEvent::EnterForeground);

    assert_eq!(controller.state(), RunState::Stopped);
    assert!(!controller.provider().subscribed);
}

#[test]
fn unreadable_saved_state_starts_stopped() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = store_in(&dir);
    std::fs::write(store.path(), "{\"state\": \"RUNNING\"}").expect("seed");

    let mut controller = controller(true);
    restore_paused_state(&store, &mut controller);
    controller.handle(ControllerEvent::EnterForeground);

    assert_eq!(controller.paused_state(), RunState::Stopped);
    assert_eq!(controller.state(), RunState::Stopped);
}

#[test]
fn foreground_event_does_not_touch_saved_state() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = store_in(&dir);

    let mut controller = controller(true);
    handle_event(&mut controller, &store, ControllerEvent::EnterForeground);
    assert!(!store.path().exists());
}

#[tokio::test]
async fn queued_replay_samples_do_not_reach_stopped_display() {
    use crate::replay::ReplayRecord;

    let dir = tempfile::tempdir().expect("tempdir");
    let store = store_in(&dir);
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let records = [5.0, 6.0]
        .into_iter()
        .map(|speed| ReplayRecord {
            delay_ms: 0,
            speed: Some(speed),
            provider: None,
        })
        .collect();
    let provider = ReplayProvider::new(records, ProviderId::gps(), true, events_tx);
    let mut controller = SpeedDisplayController::new(provider, TerminalDisplay::new(Vec::new()));

    handle_event(&mut controller, &store, ControllerEvent::UserToggle);
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    handle_event(&mut controller, &store, ControllerEvent::UserToggle);

    while let Ok(event) = events_rx.try_recv() {
        handle_event(&mut controller, &store, event);
    }

    assert_eq!(controller.state(), RunState::Stopped);
    assert_eq!(
        controller.display().status_line(),
        "      -- m/s     -- km/h   [Start]"
    );
}

#[test]
fn reset_forgets_saved_state() {
    let dir = tempfile::tempdir().expect("tempdir");
    let settings = Settings {
        state_path: dir.path().join("state.json"),
        ..Settings::default()
    };
    let store = StateStore::new(&settings.state_path);
    store.save_paused_state("STARTED").expect("seed");

    reset_saved_state(&settings).expect("reset");
    reset_saved_state(&settings).expect("reset without file");

    let mut controller = controller(true);
    restore_paused_state(&store, &mut controller);
    controller.handle(ControllerEvent::EnterForeground);
    assert_eq!(controller.state(), RunState::Stopped);
}
