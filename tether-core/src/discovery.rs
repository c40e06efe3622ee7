//! Discovery session - a bounded BLE scan that accumulates unique devices
//!
//! A session owns its scan timers. They live in `Option<ScanTimers>` and are
//! dropped on every stop path (manual stop, ceiling, scan error), so a timer
//! can never fire into a session that has already stopped.

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tether_sdk::{DeviceKind, DiscoveryEvent, Scanner, SdkError, Sighting};
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior, Sleep};

/// Stable identity of a discovered device
///
/// The MAC address wins when known, because platform peripheral identifiers
/// can change from one scan to the next.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeviceIdentity {
    Mac(String),
    Peripheral(String),
}

impl DeviceIdentity {
    fn of(sighting: &Sighting) -> Self {
        match &sighting.mac_address {
            Some(mac) if !mac.trim().is_empty() => DeviceIdentity::Mac(mac.trim().to_ascii_uppercase()),
            _ => DeviceIdentity::Peripheral(sighting.peripheral_id.clone()),
        }
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceIdentity::Mac(mac) => f.write_str(mac),
            DeviceIdentity::Peripheral(id) => f.write_str(id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDevice {
    identity: DeviceIdentity,
    kind: DeviceKind,
    peripheral_id: String,
    name: Option<String>,
    rssi: i16,
    last_seen: Instant,
    advertisement: Vec<u8>,
}

impl DiscoveredDevice {
    pub fn from_sighting(kind: DeviceKind, sighting: Sighting) -> Self {
        Self {
            identity: DeviceIdentity::of(&sighting),
            kind,
            peripheral_id: sighting.peripheral_id,
            name: sighting.name,
            rssi: sighting.rssi,
            last_seen: Instant::now(),
            advertisement: sighting.advertisement,
        }
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    pub fn peripheral_id(&self) -> &str {
        &self.peripheral_id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Advertised name, or the identity when the device did not send one
    pub fn display_name(&self) -> &str {
        match (&self.name, &self.identity) {
            (Some(name), _) => name,
            (None, DeviceIdentity::Mac(id) | DeviceIdentity::Peripheral(id)) => id,
        }
    }

    pub fn rssi(&self) -> i16 {
        self.rssi
    }

    pub fn last_seen(&self) -> Instant {
        self.last_seen
    }

    pub fn advertisement(&self) -> &[u8] {
        &self.advertisement
    }

    pub fn advertisement_hex(&self) -> String {
        data_encoding::HEXUPPER.encode(&self.advertisement)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// Message shown alongside the device list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    Manual,
    Ceiling,
    Failed(SdkError),
}

/// What `DiscoverySession::next_update` observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanUpdate {
    Sighted(DeviceIdentity),
    Tick(Duration),
    Stopped(StopReason),
}

struct ScanTimers {
    ceiling: Pin<Box<Sleep>>,
    ticker: Interval,
}

enum Wake {
    Ceiling,
    Tick,
    Event(Option<DiscoveryEvent>),
}

pub struct DiscoverySession<S> {
    scanner: Arc<S>,
    ceiling: Duration,
    tick: Duration,
    devices: Vec<DiscoveredDevice>,
    is_scanning: bool,
    timers: Option<ScanTimers>,
    events: Option<mpsc::Receiver<DiscoveryEvent>>,
    started_at: Option<Instant>,
    elapsed: Duration,
    notice: Option<Notice>,
}

impl<S: Scanner> DiscoverySession<S> {
    pub fn new(scanner: Arc<S>, ceiling: Duration, tick: Duration) -> Self {
        Self {
            scanner,
            ceiling,
            tick,
            devices: Vec::new(),
            is_scanning: false,
            timers: None,
            events: None,
            started_at: None,
            elapsed: Duration::ZERO,
            notice: None,
        }
    }

    pub fn is_scanning(&self) -> bool {
        self.is_scanning
    }

    /// Devices sorted by descending signal strength
    pub fn devices(&self) -> &[DiscoveredDevice] {
        &self.devices
    }

    pub fn find(&self, identity: &DeviceIdentity) -> Option<&DiscoveredDevice> {
        self.devices.iter().find(|d| &d.identity == identity)
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Clear previous results and start scanning; no-op while scanning
    pub async fn start(&mut self) -> Result<(), SdkError> {
        if self.is_scanning {
            log::debug!("scan already running");
            return Ok(());
        }

        self.devices.clear();
        self.notice = None;
        self.elapsed = Duration::ZERO;

        let events = match self.scanner.discover().await {
            Ok(events) => events,
            Err(e) => {
                log::warn!("scan failed to start: {e}");
                self.notice = Some(Notice {
                    level: NoticeLevel::Error,
                    text: format!("scan failed: {e}"),
                });
                return Err(e);
            }
        };

        let now = Instant::now();
        let mut ticker = tokio::time::interval_at(now + self.tick, self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.timers = Some(ScanTimers {
            ceiling: Box::pin(tokio::time::sleep_until(now + self.ceiling)),
            ticker,
        });
        self.events = Some(events);
        self.started_at = Some(now);
        self.is_scanning = true;

        log::info!("scan started (auto-stop after {:?})", self.ceiling);
        Ok(())
    }

    pub async fn stop(&mut self) {
        self.halt(StopReason::Manual).await;
    }

    async fn halt(&mut self, reason: StopReason) {
        // dropping these cancels both timers and detaches the event stream
        self.timers = None;
        self.events = None;

        if !self.is_scanning {
            return;
        }
        self.is_scanning = false;
        if let Some(started) = self.started_at.take() {
            self.elapsed = started.elapsed().min(self.ceiling);
        }

        if let Err(e) = self.scanner.stop_discovery().await {
            log::warn!("failed to halt scan: {e}");
        }

        self.notice = match &reason {
            StopReason::Manual => None,
            StopReason::Ceiling => Some(Notice {
                level: NoticeLevel::Info,
                text: format!(
                    "Scanning stopped after {} seconds to save battery. Start a new scan to keep looking.",
                    seconds(self.ceiling)
                ),
            }),
            StopReason::Failed(e) => Some(Notice {
                level: NoticeLevel::Error,
                text: format!("scan failed: {e}"),
            }),
        };
        log::info!("scan stopped ({reason:?}), {} devices", self.devices.len());
    }

    /// Insert or refresh a device; ignored unless a scan is running
    pub fn record_sighting(&mut self, kind: DeviceKind, sighting: Sighting) -> Option<&DiscoveredDevice> {
        if !self.is_scanning {
            log::debug!("dropping sighting of {} after scan stopped", sighting.peripheral_id);
            return None;
        }

        let identity = DeviceIdentity::of(&sighting);
        match self.devices.iter_mut().find(|d| d.identity == identity) {
            Some(existing) => {
                existing.rssi = sighting.rssi;
                existing.last_seen = Instant::now();
                // the platform may hand out a new handle for the same MAC
                existing.peripheral_id = sighting.peripheral_id;
            }
            None => {
                log::debug!("new {} device {identity} ({} dBm)", kind.label(), sighting.rssi);
                self.devices.push(DiscoveredDevice::from_sighting(kind, sighting));
            }
        }

        self.devices.sort_by(|a, b| b.rssi.cmp(&a.rssi));
        self.find(&identity)
    }

    /// Wait for the next sighting, display tick or stop
    ///
    /// Returns `None` once the session is not scanning.
    pub async fn next_update(&mut self) -> Option<ScanUpdate> {
        let wake = {
            let (Some(timers), Some(events)) = (self.timers.as_mut(), self.events.as_mut()) else {
                return None;
            };
            tokio::select! {
                biased;
                _ = timers.ceiling.as_mut() => Wake::Ceiling,
                _ = timers.ticker.tick() => Wake::Tick,
                event = events.recv() => Wake::Event(event),
            }
        };

        match wake {
            Wake::Ceiling => {
                self.halt(StopReason::Ceiling).await;
                Some(ScanUpdate::Stopped(StopReason::Ceiling))
            }
            Wake::Tick => {
                if let Some(started) = self.started_at {
                    self.elapsed = started.elapsed().min(self.ceiling);
                }
                Some(ScanUpdate::Tick(self.elapsed))
            }
            Wake::Event(Some(DiscoveryEvent::Found(kind, sighting))) => self
                .record_sighting(kind, sighting)
                .map(|d| ScanUpdate::Sighted(d.identity.clone())),
            Wake::Event(Some(DiscoveryEvent::Error(e))) => {
                let reason = StopReason::Failed(e);
                self.halt(reason.clone()).await;
                Some(ScanUpdate::Stopped(reason))
            }
            Wake::Event(None) => {
                let reason = StopReason::Failed(SdkError::other("scanner closed the event stream"));
                self.halt(reason.clone()).await;
                Some(ScanUpdate::Stopped(reason))
            }
        }
    }

    /// Drive the session until it stops, returning why
    pub async fn run_to_end(&mut self) -> Option<StopReason> {
        while let Some(update) = self.next_update().await {
            if let ScanUpdate::Stopped(reason) = update {
                return Some(reason);
            }
        }
        None
    }
}

/// Whole seconds when exact, otherwise one decimal
fn seconds(d: Duration) -> String {
    if d.subsec_nanos() == 0 {
        d.as_secs().to_string()
    } else {
        format!("{:.1}", d.as_secs_f64())
    }
}
