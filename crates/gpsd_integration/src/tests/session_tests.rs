use super::*;
use shared::domain::SpeedSample;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{tcp::OwnedReadHalf, TcpListener},
    sync::mpsc::UnboundedReceiver,
    time::timeout,
};

const STEP: Duration = Duration::from_secs(5);

fn test_config(addr: String) -> GpsdConfig {
    GpsdConfig {
        addr,
        reconnect_delay: Duration::from_millis(50),
        device_poll_interval: Duration::from_secs(60),
        ..GpsdConfig::default()
    }
}

async fn next_event(events: &mut UnboundedReceiver<ControllerEvent>) -> ControllerEvent {
    timeout(STEP, events.recv())
        .await
        .expect("event in time")
        .expect("event channel open")
}

async fn next_command(lines: &mut tokio::io::Lines<BufReader<OwnedReadHalf>>) -> String {
    timeout(STEP, lines.next_line())
        .await
        .expect("command in time")
        .expect("read")
        .expect("client still connected")
}

#[tokio::test]
async fn reports_availability_and_forwards_samples_only_while_watching() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr").to_string();
    let (events_tx, mut events) = mpsc::unbounded_channel();

    let mut provider = GpsdProvider::spawn(test_config(addr), events_tx);
    assert!(!provider.is_available(&ProviderId::gps()));

    let (socket, _) = timeout(STEP, listener.accept())
        .await
        .expect("accept in time")
        .expect("accept");
    let (read_half, mut write_half) = socket.into_split();
    let mut lines = BufReader::new(read_half).lines();

    assert_eq!(next_command(&mut lines).await, "?DEVICES;");
    write_half
        .write_all(b"{\"class\":\"DEVICES\",\"devices\":[{\"class\":\"DEVICE\",\"path\":\"/dev/ttyACM0\"}]}\n")
        .await
        .expect("write devices");

    assert_eq!(
        next_event(&mut events).await,
        ControllerEvent::ProviderEnabled(ProviderId::gps())
    );
    assert!(provider.is_available(&ProviderId::gps()));

    provider
        .subscribe(&ProviderId::gps(), SubscriptionParams::UNTHROTTLED)
        .expect("subscribe");
    assert!(next_command(&mut lines).await.starts_with("?WATCH={\"enable\":true"));

    write_half
        .write_all(b"{\"class\":\"TPV\",\"mode\":3,\"speed\":12.5}\n")
        .await
        .expect("write tpv");
    assert_eq!(
        next_event(&mut events).await,
        ControllerEvent::LocationSample(SpeedSample::with_speed(12.5))
    );

    provider.unsubscribe();
    assert!(next_command(&mut lines).await.starts_with("?WATCH={\"enable\":false"));

    write_half
        .write_all(b"{\"class\":\"TPV\",\"mode\":3,\"speed\":13.0}\n")
        .await
        .expect("write late tpv");
    drop(write_half);
    drop(lines);

    assert_eq!(
        next_event(&mut events).await,
        ControllerEvent::ProviderDisabled(ProviderId::gps())
    );
    assert!(!provider.is_available(&ProviderId::gps()));
}

#[tokio::test]
async fn subscribing_twice_sends_a_single_watch() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr").to_string();
    let (events_tx, _events) = mpsc::unbounded_channel();

    let mut provider = GpsdProvider::spawn(test_config(addr), events_tx);
    let (socket, _) = timeout(STEP, listener.accept())
        .await
        .expect("accept in time")
        .expect("accept");
    let (read_half, _write_half) = socket.into_split();
    let mut lines = BufReader::new(read_half).lines();
    assert_eq!(next_command(&mut lines).await, "?DEVICES;");

    provider
        .subscribe(&ProviderId::gps(), SubscriptionParams::UNTHROTTLED)
        .expect("subscribe");
    provider
        .subscribe(&ProviderId::gps(), SubscriptionParams::UNTHROTTLED)
        .expect("subscribe again");
    provider.unsubscribe();
    provider.unsubscribe();

    assert!(next_command(&mut lines).await.starts_with("?WATCH={\"enable\":true"));
    assert!(next_command(&mut lines).await.starts_with("?WATCH={\"enable\":false"));
}

#[tokio::test]
async fn rejects_foreign_provider() {
    let (events_tx, _events) = mpsc::unbounded_channel();
    let mut provider = GpsdProvider::spawn(test_config("127.0.0.1:9".into()), events_tx);

    let err = provider
        .subscribe(&ProviderId::new("network"), SubscriptionParams::UNTHROTTLED)
        .expect_err("foreign provider");
    assert!(err.to_string().contains("network"));
    assert!(!provider.is_available(&ProviderId::new("network")));
}

#[tokio::test]
async fn settings_without_command_is_a_hint_only() {
    let (events_tx, _events) = mpsc::unbounded_channel();
    let mut provider = GpsdProvider::spawn(test_config("127.0.0.1:9".into()), events_tx);
    provider.open_location_settings().expect("no command configured");
}
