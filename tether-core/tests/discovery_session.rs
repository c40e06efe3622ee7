mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{init_env_logger, sighting, MockSdk, Script};
use tether_core::tether_sdk::{DeviceKind, DiscoveryEvent, SdkError};
use tether_core::{DeviceIdentity, DiscoverySession, NoticeLevel, ScanUpdate, StopReason};

const CEILING: Duration = Duration::from_secs(60);
const TICK: Duration = Duration::from_millis(100);

fn session(script: Script) -> (Arc<MockSdk>, DiscoverySession<MockSdk>) {
    init_env_logger();
    let sdk = Arc::new(MockSdk::with_script(script));
    let session = DiscoverySession::new(sdk.clone(), CEILING, TICK);
    (sdk, session)
}

#[tokio::test(start_paused = true)]
async fn auto_stops_at_ceiling() {
    let (sdk, mut scan) = session(Script::default());
    scan.start().await.unwrap();
    assert!(scan.is_scanning());

    sdk.found(DeviceKind::KnownTypeA, sighting(Some("AA:00:00:00:00:01"), "p-1", -60)).await;
    assert!(matches!(scan.next_update().await, Some(ScanUpdate::Sighted(_))));

    assert_eq!(scan.run_to_end().await, Some(StopReason::Ceiling));
    assert!(!scan.is_scanning());
    assert_eq!(scan.elapsed(), CEILING);
    assert_eq!(scan.devices().len(), 1);

    let notice = scan.notice().unwrap();
    assert_eq!(notice.level, NoticeLevel::Info);
    assert_eq!(
        notice.text,
        "Scanning stopped after 60 seconds to save battery. Start a new scan to keep looking."
    );
    assert_eq!(sdk.calls().last().map(String::as_str), Some("stop_discovery"));

    // timers went with the scan
    assert_eq!(scan.next_update().await, None);
    assert!(scan
        .record_sighting(DeviceKind::KnownTypeA, sighting(None, "late", -30))
        .is_none());
    assert_eq!(scan.devices().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn ticks_report_elapsed_time() {
    let (_sdk, mut scan) = session(Script::default());
    scan.start().await.unwrap();

    assert_eq!(scan.next_update().await, Some(ScanUpdate::Tick(TICK)));
    assert_eq!(scan.next_update().await, Some(ScanUpdate::Tick(TICK * 2)));
    assert_eq!(scan.elapsed(), TICK * 2);
}

#[tokio::test(start_paused = true)]
async fn same_mac_is_one_device() {
    let (sdk, mut scan) = session(Script::default());
    scan.start().await.unwrap();

    sdk.found(DeviceKind::KnownTypeA, sighting(Some("aa:bb:cc:dd:ee:ff"), "p-1", -80)).await;
    sdk.found(DeviceKind::KnownTypeA, sighting(Some("AA:BB:CC:DD:EE:FF"), "p-2", -55)).await;
    sdk.found(DeviceKind::KnownTypeB, sighting(None, "p-3", -70)).await;
    for _ in 0..3 {
        assert!(matches!(scan.next_update().await, Some(ScanUpdate::Sighted(_))));
    }

    let devices = scan.devices();
    assert_eq!(devices.len(), 2);
    // strongest first; a re-sighting refreshes signal data and the handle to dial
    assert_eq!(devices[0].identity(), &DeviceIdentity::Mac("AA:BB:CC:DD:EE:FF".into()));
    assert_eq!(devices[0].rssi(), -55);
    assert_eq!(devices[0].peripheral_id(), "p-2");
    assert_eq!(devices[0].display_name(), "Tether-A p-1");
    assert_eq!(devices[1].identity(), &DeviceIdentity::Peripheral("p-3".into()));
    assert_eq!(devices[1].kind(), DeviceKind::KnownTypeB);
}

#[tokio::test(start_paused = true)]
async fn manual_stop_is_quiet_and_idempotent() {
    let (sdk, mut scan) = session(Script::default());
    scan.start().await.unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;

    scan.stop().await;
    assert!(!scan.is_scanning());
    assert!(scan.notice().is_none());
    assert_eq!(scan.elapsed(), Duration::from_secs(5));
    assert_eq!(scan.next_update().await, None);

    scan.stop().await;
    assert_eq!(sdk.calls(), vec!["discover", "stop_discovery"]);
}

#[tokio::test(start_paused = true)]
async fn start_while_scanning_keeps_results() {
    let (sdk, mut scan) = session(Script::default());
    scan.start().await.unwrap();
    sdk.found(DeviceKind::Unrecognized, sighting(None, "p-1", -60)).await;
    scan.next_update().await;

    scan.start().await.unwrap();
    assert_eq!(scan.devices().len(), 1);
    assert_eq!(sdk.calls(), vec!["discover"]);

    // a fresh scan after stopping starts from an empty list
    scan.stop().await;
    scan.start().await.unwrap();
    assert!(scan.devices().is_empty());
}

#[tokio::test(start_paused = true)]
async fn scan_error_stops_with_notice() {
    let (sdk, mut scan) = session(Script::default());
    scan.start().await.unwrap();

    sdk.emit(DiscoveryEvent::Error(SdkError::NoAdapter)).await;
    let update = scan.next_update().await;
    assert_eq!(update, Some(ScanUpdate::Stopped(StopReason::Failed(SdkError::NoAdapter))));
    assert!(!scan.is_scanning());

    let notice = scan.notice().unwrap();
    assert_eq!(notice.level, NoticeLevel::Error);
    assert_eq!(notice.text, "scan failed: no bluetooth adapter found");
}

#[tokio::test(start_paused = true)]
async fn closed_stream_stops_scan() {
    let (sdk, mut scan) = session(Script::default());
    scan.start().await.unwrap();
    sdk.close_scan();

    assert!(matches!(
        scan.next_update().await,
        Some(ScanUpdate::Stopped(StopReason::Failed(_)))
    ));
    assert!(!scan.is_scanning());
}

#[tokio::test(start_paused = true)]
async fn discover_failure_leaves_session_idle() {
    let (_sdk, mut scan) = session(Script {
        discover: Err(SdkError::NoAdapter),
        ..Script::default()
    });

    assert_eq!(scan.start().await, Err(SdkError::NoAdapter));
    assert!(!scan.is_scanning());
    assert_eq!(scan.notice().map(|n| n.level), Some(NoticeLevel::Error));
    assert_eq!(scan.next_update().await, None);
}
