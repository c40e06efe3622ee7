//! Onboarding state machine
//!
//! Sequences a device through six provisioning steps:
//!
//! ```text
//! Discovery(1) -> SelectDevice(2) -> Connect(3) -> NetworkStatus(4) -> WifiConfig(5) -> CloudSync(6)
//! ```
//!
//! The session never talks to the SDK itself. Every device operation is
//! split in two: `begin_*` checks preconditions, sets the in-flight guard
//! and hands out an [`Attempt`]; `finish_*` applies the SDK result for that
//! attempt. `disconnect` and `reset` bump the session epoch, so a completion
//! that arrives after either is ignored rather than applied.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;
use tether_sdk::{ConnectInfo, ConnectivityRecord, SdkError, SyncTick, WifiNetwork};

use crate::discovery::DiscoveredDevice;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum OnboardingStep {
    Discovery = 1,
    SelectDevice = 2,
    Connect = 3,
    NetworkStatus = 4,
    WifiConfig = 5,
    CloudSync = 6,
}

impl OnboardingStep {
    pub const ALL: [OnboardingStep; 6] = [
        OnboardingStep::Discovery,
        OnboardingStep::SelectDevice,
        OnboardingStep::Connect,
        OnboardingStep::NetworkStatus,
        OnboardingStep::WifiConfig,
        OnboardingStep::CloudSync,
    ];

    /// Steps whose completion depends on a live device connection
    const CONNECTION_BOUND: [OnboardingStep; 4] = [
        OnboardingStep::Connect,
        OnboardingStep::NetworkStatus,
        OnboardingStep::WifiConfig,
        OnboardingStep::CloudSync,
    ];

    pub fn rank(self) -> u8 {
        self as u8
    }

    pub fn from_rank(rank: u8) -> Option<Self> {
        Self::ALL.get(usize::from(rank).checked_sub(1)?).copied()
    }

    pub fn next(self) -> Option<Self> {
        Self::from_rank(self.rank() + 1)
    }

    pub fn previous(self) -> Option<Self> {
        Self::from_rank(self.rank() - 1)
    }

    pub fn title(self) -> &'static str {
        match self {
            OnboardingStep::Discovery => "Discover",
            OnboardingStep::SelectDevice => "Select Device",
            OnboardingStep::Connect => "Connect",
            OnboardingStep::NetworkStatus => "Network Status",
            OnboardingStep::WifiConfig => "WiFi Setup",
            OnboardingStep::CloudSync => "Cloud Sync",
        }
    }
}

impl fmt::Display for OnboardingStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Asynchronous device operation driven from an onboarding step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Connect,
    CheckNetwork,
    ScanWifi,
    ConnectWifi,
    SyncToCloud,
}

impl Operation {
    pub fn name(self) -> &'static str {
        match self {
            Operation::Connect => "connect",
            Operation::CheckNetwork => "network check",
            Operation::ScanWifi => "wifi scan",
            Operation::ConnectWifi => "wifi connect",
            Operation::SyncToCloud => "cloud sync",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OnboardingError {
    #[error("another operation is in progress")]
    Busy,
    #[error("{0} is not reachable from the current step")]
    StepLocked(OnboardingStep),
    #[error("{0} is not complete")]
    Incomplete(OnboardingStep),
    #[error("no device selected")]
    NoDeviceSelected,
    #[error("device is not connected")]
    NotConnected,
    #[error("SSID must not be empty")]
    EmptySsid,
    #[error("device label must not be empty")]
    EmptyLabel,
    /// Completion arrived for an attempt that was disconnected or reset away
    #[error("{} result arrived after the session moved on", .0.name())]
    Stale(Operation),
    #[error("{} failed: {source}", .op.name())]
    Sdk {
        op: Operation,
        #[source]
        source: SdkError,
    },
}

/// Ticket for one in-flight operation
#[derive(Debug)]
pub struct Attempt {
    op: Operation,
    epoch: u64,
}

impl Attempt {
    pub fn operation(&self) -> Operation {
        self.op
    }
}

/// Where a cloud sync stands after a progress tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncState {
    InProgress(i32),
    Complete,
    Failed(OnboardingError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OnboardingSession {
    current: OnboardingStep,
    completed: BTreeSet<OnboardingStep>,
    selected: Option<DiscoveredDevice>,
    device_label: String,
    is_connected: bool,
    mac_address: Option<String>,
    provision_status: Option<i32>,
    connectivity: Vec<ConnectivityRecord>,
    wifi_networks: Vec<WifiNetwork>,
    wifi_connected: bool,
    sync_progress: Option<i32>,
    sync_complete: bool,
    error: Option<String>,
    in_flight: Option<Operation>,
    epoch: u64,
}

impl Default for OnboardingSession {
    fn default() -> Self {
        Self::new()
    }
}

impl OnboardingSession {
    pub fn new() -> Self {
        Self {
            current: OnboardingStep::Discovery,
            completed: BTreeSet::new(),
            selected: None,
            device_label: String::new(),
            is_connected: false,
            mac_address: None,
            provision_status: None,
            connectivity: Vec::new(),
            wifi_networks: Vec::new(),
            wifi_connected: false,
            sync_progress: None,
            sync_complete: false,
            error: None,
            in_flight: None,
            epoch: 0,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn current_step(&self) -> OnboardingStep {
        self.current
    }

    pub fn completed_steps(&self) -> &BTreeSet<OnboardingStep> {
        &self.completed
    }

    pub fn is_completed(&self, step: OnboardingStep) -> bool {
        self.completed.contains(&step)
    }

    pub fn selected_device(&self) -> Option<&DiscoveredDevice> {
        self.selected.as_ref()
    }

    pub fn device_label(&self) -> &str {
        &self.device_label
    }

    pub fn is_connected(&self) -> bool {
        self.is_connected
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn in_flight(&self) -> Option<Operation> {
        self.in_flight
    }

    pub fn mac_address(&self) -> Option<&str> {
        self.mac_address.as_deref()
    }

    pub fn provision_status(&self) -> Option<i32> {
        self.provision_status
    }

    pub fn connectivity(&self) -> &[ConnectivityRecord] {
        &self.connectivity
    }

    pub fn wifi_networks(&self) -> &[WifiNetwork] {
        &self.wifi_networks
    }

    pub fn is_wifi_connected(&self) -> bool {
        self.wifi_connected
    }

    /// Last reported sync percentage, kept after a failure for display
    pub fn sync_progress(&self) -> Option<i32> {
        self.sync_progress
    }

    pub fn is_sync_complete(&self) -> bool {
        self.sync_complete
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Whether `step`'s completion criterion currently holds
    pub fn criterion_met(&self, step: OnboardingStep) -> bool {
        match step {
            OnboardingStep::Discovery => true,
            OnboardingStep::SelectDevice => self.selected.is_some(),
            OnboardingStep::Connect => self.is_connected,
            OnboardingStep::NetworkStatus => true,
            OnboardingStep::WifiConfig => self.wifi_connected,
            OnboardingStep::CloudSync => self.sync_complete,
        }
    }

    /// Whether the forward button is enabled on the current step
    pub fn can_go_next(&self) -> bool {
        !self.is_loading() && self.criterion_met(self.current)
    }

    pub fn can_go_back(&self) -> bool {
        self.current.previous().is_some()
    }

    /// Whether the step indicator may jump to `step`
    pub fn can_jump_to(&self, step: OnboardingStep) -> bool {
        step.rank() <= self.current.rank()
            || step.previous().is_some_and(|prev| self.completed.contains(&prev))
    }

    pub fn next_button_label(&self) -> &'static str {
        match self.current {
            OnboardingStep::NetworkStatus if self.connectivity.is_empty() => "Skip",
            OnboardingStep::CloudSync => "Finish",
            _ => "Next",
        }
    }

    /// Mark the current step complete and move to the next one
    ///
    /// On the last step this only records completion.
    pub fn advance(&mut self) -> Result<OnboardingStep, OnboardingError> {
        if self.is_loading() {
            return Err(OnboardingError::Busy);
        }
        if !self.criterion_met(self.current) {
            return Err(OnboardingError::Incomplete(self.current));
        }

        self.completed.insert(self.current);
        if let Some(next) = self.current.next() {
            log::info!("onboarding: {} -> {}", self.current, next);
            self.current = next;
        }
        Ok(self.current)
    }

    /// Move back one step; completed steps are kept
    pub fn retreat(&mut self) -> Result<OnboardingStep, OnboardingError> {
        let prev = self
            .current
            .previous()
            .ok_or(OnboardingError::StepLocked(self.current))?;
        log::info!("onboarding: back to {prev}");
        self.current = prev;
        Ok(prev)
    }

    pub fn jump_to(&mut self, step: OnboardingStep) -> Result<OnboardingStep, OnboardingError> {
        if !self.can_jump_to(step) {
            return Err(OnboardingError::StepLocked(step));
        }
        self.current = step;
        Ok(step)
    }

    /// Choose the device to onboard
    ///
    /// Picking a different device drops any connection to the previous one.
    pub fn select_device(&mut self, device: DiscoveredDevice) {
        let same = self
            .selected
            .as_ref()
            .is_some_and(|d| d.identity() == device.identity());
        if !same {
            self.disconnect();
        }
        if self.device_label.is_empty() || !same {
            self.device_label = device.display_name().to_string();
        }
        log::info!("onboarding: selected {}", device.identity());
        self.selected = Some(device);
    }

    pub fn set_device_label(&mut self, label: impl Into<String>) {
        self.device_label = label.into();
    }

    /// Forget the connection and everything learned through it
    ///
    /// The current step and the selected device are left alone. Calling it
    /// again has no further effect.
    pub fn disconnect(&mut self) {
        if let Some(op) = self.in_flight.take() {
            log::warn!("onboarding: abandoning in-flight {}", op.name());
            self.epoch += 1;
        }
        self.is_connected = false;
        for step in OnboardingStep::CONNECTION_BOUND {
            self.completed.remove(&step);
        }
        self.mac_address = None;
        self.provision_status = None;
        self.connectivity.clear();
        self.wifi_networks.clear();
        self.wifi_connected = false;
        self.sync_progress = None;
        self.sync_complete = false;
    }

    /// Start over from Discovery with nothing completed
    pub fn reset(&mut self) {
        self.disconnect();
        self.current = OnboardingStep::Discovery;
        self.completed.clear();
        self.selected = None;
        self.device_label.clear();
        self.error = None;
        log::info!("onboarding: reset");
    }

    // =========================================================================
    // Device operations
    // =========================================================================

    fn begin(&mut self, op: Operation) -> Result<Attempt, OnboardingError> {
        if let Some(busy) = self.in_flight {
            log::debug!("{} refused while {} is in flight", op.name(), busy.name());
            return Err(OnboardingError::Busy);
        }

        match op {
            Operation::Connect if self.selected.is_none() => {
                return Err(OnboardingError::NoDeviceSelected);
            }
            Operation::Connect => {}
            _ if !self.is_connected => return Err(OnboardingError::NotConnected),
            _ => {}
        }

        self.error = None;
        self.in_flight = Some(op);
        Ok(Attempt { op, epoch: self.epoch })
    }

    /// Take the in-flight slot for `attempt`, or report it stale
    fn settle(&mut self, attempt: &Attempt) -> Result<(), OnboardingError> {
        if attempt.epoch != self.epoch || self.in_flight != Some(attempt.op) {
            log::warn!("ignoring late {} result", attempt.op.name());
            return Err(OnboardingError::Stale(attempt.op));
        }
        self.in_flight = None;
        Ok(())
    }

    fn fail(&mut self, op: Operation, source: SdkError) -> OnboardingError {
        log::warn!("{} failed: {source}", op.name());
        let err = OnboardingError::Sdk { op, source };
        self.error = Some(err.to_string());
        err
    }

    /// Peripheral to connect to, plus the attempt ticket
    pub fn begin_connect(&mut self) -> Result<(Attempt, String), OnboardingError> {
        let attempt = self.begin(Operation::Connect)?;
        let peripheral = self
            .selected
            .as_ref()
            .map(|d| d.peripheral_id().to_string())
            .unwrap_or_default();
        Ok((attempt, peripheral))
    }

    pub fn finish_connect(
        &mut self,
        attempt: Attempt,
        result: Result<ConnectInfo, SdkError>,
    ) -> Result<(), OnboardingError> {
        self.settle(&attempt)?;
        match result {
            Ok(info) => {
                log::info!("connected (mac {:?}, provision status {})", info.mac_address, info.provision_status);
                self.is_connected = true;
                self.mac_address = info.mac_address;
                self.provision_status = Some(info.provision_status);
                self.completed.insert(OnboardingStep::Connect);
                Ok(())
            }
            Err(e) => Err(self.fail(Operation::Connect, e)),
        }
    }

    pub fn begin_network_check(&mut self) -> Result<Attempt, OnboardingError> {
        self.begin(Operation::CheckNetwork)
    }

    pub fn finish_network_check(
        &mut self,
        attempt: Attempt,
        result: Result<Vec<ConnectivityRecord>, SdkError>,
    ) -> Result<(), OnboardingError> {
        self.settle(&attempt)?;
        match result {
            Ok(records) => {
                self.connectivity = records;
                self.completed.insert(OnboardingStep::NetworkStatus);
                Ok(())
            }
            Err(e) => Err(self.fail(Operation::CheckNetwork, e)),
        }
    }

    pub fn begin_wifi_scan(&mut self) -> Result<Attempt, OnboardingError> {
        self.begin(Operation::ScanWifi)
    }

    /// Store scan results; the WiFi step still needs a successful connect
    pub fn finish_wifi_scan(
        &mut self,
        attempt: Attempt,
        result: Result<Vec<WifiNetwork>, SdkError>,
    ) -> Result<(), OnboardingError> {
        self.settle(&attempt)?;
        match result {
            Ok(networks) => {
                log::debug!("wifi scan found {} networks", networks.len());
                self.wifi_networks = networks;
                Ok(())
            }
            Err(e) => Err(self.fail(Operation::ScanWifi, e)),
        }
    }

    pub fn begin_connect_wifi(&mut self, ssid: &str) -> Result<Attempt, OnboardingError> {
        if ssid.trim().is_empty() {
            return Err(OnboardingError::EmptySsid);
        }
        self.begin(Operation::ConnectWifi)
    }

    pub fn finish_connect_wifi(
        &mut self,
        attempt: Attempt,
        result: Result<(), SdkError>,
    ) -> Result<(), OnboardingError> {
        self.settle(&attempt)?;
        match result {
            Ok(()) => {
                self.wifi_connected = true;
                self.completed.insert(OnboardingStep::WifiConfig);
                Ok(())
            }
            Err(e) => Err(self.fail(Operation::ConnectWifi, e)),
        }
    }

    /// Start a sync under `label`, or under the device label when `label` is blank
    ///
    /// The label is only stored once the attempt is issued. A previous
    /// completion stands until a new sync reaches 100.
    pub fn begin_sync(&mut self, label: &str) -> Result<(Attempt, String), OnboardingError> {
        let label = if label.trim().is_empty() {
            self.device_label.clone()
        } else {
            label.to_string()
        };
        if label.trim().is_empty() {
            return Err(OnboardingError::EmptyLabel);
        }
        let attempt = self.begin(Operation::SyncToCloud)?;
        self.device_label = label.clone();
        self.sync_progress = Some(0);
        Ok((attempt, label))
    }

    /// Apply one progress report of a running sync
    ///
    /// `0..100` is a progress tick, `100` or more completes the sync and any
    /// negative value fails it. After a terminal tick, further ticks for the
    /// same attempt are stale.
    pub fn apply_sync_tick(&mut self, attempt: &Attempt, tick: SyncTick) -> Result<SyncState, OnboardingError> {
        if attempt.epoch != self.epoch || self.in_flight != Some(Operation::SyncToCloud) {
            log::warn!("ignoring late sync tick {}", tick.percent);
            return Err(OnboardingError::Stale(Operation::SyncToCloud));
        }

        match tick.percent {
            p if p < 0 => {
                self.in_flight = None;
                let source = tick
                    .error
                    .unwrap_or_else(|| SdkError::Aborted(format!("sync ended with status {p}")));
                Ok(SyncState::Failed(self.fail(Operation::SyncToCloud, source)))
            }
            p if p >= 100 => {
                self.in_flight = None;
                self.sync_progress = Some(100);
                self.sync_complete = true;
                self.completed.insert(OnboardingStep::CloudSync);
                log::info!("cloud sync complete");
                Ok(SyncState::Complete)
            }
            p => {
                if let Some(e) = tick.error {
                    log::warn!("sync tick {p} carried a non-terminal error: {e}");
                }
                log::debug!("sync progress {p}%");
                self.sync_progress = Some(p);
                Ok(SyncState::InProgress(p))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_sdk::{DeviceKind, Sighting};

    fn device() -> DiscoveredDevice {
        DiscoveredDevice::from_sighting(
            DeviceKind::KnownTypeA,
            Sighting {
                mac_address: Some("AA:BB:CC:DD:EE:FF".into()),
                peripheral_id: "p-1".into(),
                name: Some("Tether-A 01".into()),
                rssi: -50,
                advertisement: vec![1, 2],
            },
        )
    }

    fn connected() -> OnboardingSession {
        let mut s = OnboardingSession::new();
        s.advance().unwrap();
        s.select_device(device());
        s.advance().unwrap();
        let (attempt, _) = s.begin_connect().unwrap();
        s.finish_connect(
            attempt,
            Ok(ConnectInfo { mac_address: Some("AA:BB:CC:DD:EE:FF".into()), provision_status: 0 }),
        )
        .unwrap();
        s
    }

    #[test]
    fn ranks() {
        for (i, step) in OnboardingStep::ALL.iter().enumerate() {
            assert_eq!(usize::from(step.rank()), i + 1);
            assert_eq!(OnboardingStep::from_rank(step.rank()), Some(*step));
        }
        assert_eq!(OnboardingStep::from_rank(0), None);
        assert_eq!(OnboardingStep::from_rank(7), None);
        assert_eq!(OnboardingStep::CloudSync.next(), None);
        assert_eq!(OnboardingStep::Discovery.previous(), None);
    }

    #[test]
    fn select_gate() {
        let mut s = OnboardingSession::new();
        assert_eq!(s.advance(), Ok(OnboardingStep::SelectDevice));
        assert!(!s.can_go_next());
        assert_eq!(s.advance(), Err(OnboardingError::Incomplete(OnboardingStep::SelectDevice)));
        s.select_device(device());
        assert_eq!(s.device_label(), "Tether-A 01");
        assert_eq!(s.advance(), Ok(OnboardingStep::Connect));
    }

    #[test]
    fn connect_requires_selection() {
        let mut s = OnboardingSession::new();
        assert_eq!(s.begin_connect().err(), Some(OnboardingError::NoDeviceSelected));
    }

    #[test]
    fn busy_guard() {
        let mut s = OnboardingSession::new();
        s.select_device(device());
        let (attempt, peripheral) = s.begin_connect().unwrap();
        assert_eq!(peripheral, "p-1");
        assert!(s.is_loading());
        assert_eq!(s.begin_connect().err(), Some(OnboardingError::Busy));
        s.finish_connect(attempt, Err(SdkError::Timeout)).unwrap_err();
        assert!(!s.is_loading());
    }

    #[test]
    fn failure_leaves_step_incomplete() {
        let mut s = OnboardingSession::new();
        s.advance().unwrap();
        s.select_device(device());
        s.advance().unwrap();
        let (attempt, _) = s.begin_connect().unwrap();
        let err = s.finish_connect(attempt, Err(SdkError::Unreachable)).unwrap_err();
        assert_eq!(err.to_string(), "connect failed: device unreachable");
        assert_eq!(s.error(), Some("connect failed: device unreachable"));
        assert!(!s.is_completed(OnboardingStep::Connect));
        assert_eq!(s.current_step(), OnboardingStep::Connect);
        assert!(!s.can_go_next());

        // retry clears the error and succeeds
        let (attempt, _) = s.begin_connect().unwrap();
        assert_eq!(s.error(), None);
        s.finish_connect(attempt, Ok(ConnectInfo { mac_address: None, provision_status: 1 }))
            .unwrap();
        assert!(s.can_go_next());
    }

    #[test]
    fn operations_need_connection() {
        let mut s = OnboardingSession::new();
        assert_eq!(s.begin_network_check().err(), Some(OnboardingError::NotConnected));
        assert_eq!(s.begin_wifi_scan().err(), Some(OnboardingError::NotConnected));
    }

    #[test]
    fn empty_ssid_rejected_before_guard() {
        let mut s = connected();
        assert_eq!(s.begin_connect_wifi("  ").err(), Some(OnboardingError::EmptySsid));
        assert!(!s.is_loading());
    }

    #[test]
    fn network_status_is_optional() {
        let mut s = connected();
        assert_eq!(s.advance(), Ok(OnboardingStep::NetworkStatus));
        assert_eq!(s.next_button_label(), "Skip");
        assert_eq!(s.advance(), Ok(OnboardingStep::WifiConfig));
        assert!(s.is_completed(OnboardingStep::NetworkStatus));
    }

    #[test]
    fn wifi_scan_does_not_complete_step() {
        let mut s = connected();
        let attempt = s.begin_wifi_scan().unwrap();
        s.finish_wifi_scan(attempt, Ok(vec![WifiNetwork { ssid: "HomeNet".into() }]))
            .unwrap();
        assert_eq!(s.wifi_networks().len(), 1);
        assert!(!s.is_completed(OnboardingStep::WifiConfig));
    }

    #[test]
    fn retreat_keeps_completion() {
        let mut s = connected();
        s.advance().unwrap();
        assert_eq!(s.retreat(), Ok(OnboardingStep::Connect));
        assert!(s.is_completed(OnboardingStep::Connect));
        assert!(s.can_jump_to(OnboardingStep::NetworkStatus));
        assert_eq!(s.jump_to(OnboardingStep::NetworkStatus), Ok(OnboardingStep::NetworkStatus));
    }

    #[test]
    fn retreat_at_start_fails() {
        let mut s = OnboardingSession::new();
        assert!(!s.can_go_back());
        assert_eq!(s.retreat(), Err(OnboardingError::StepLocked(OnboardingStep::Discovery)));
    }

    #[test]
    fn jump_rules() {
        let mut s = OnboardingSession::new();
        assert!(!s.can_jump_to(OnboardingStep::SelectDevice));
        assert_eq!(
            s.jump_to(OnboardingStep::CloudSync),
            Err(OnboardingError::StepLocked(OnboardingStep::CloudSync))
        );
        s.advance().unwrap();
        assert!(s.can_jump_to(OnboardingStep::Discovery));
        assert!(!s.can_jump_to(OnboardingStep::Connect));
    }

    #[test]
    fn sync_ticks() {
        let mut s = connected();
        let (attempt, _) = s.begin_sync("").unwrap();
        assert_eq!(s.apply_sync_tick(&attempt, SyncTick::progress(10)), Ok(SyncState::InProgress(10)));
        assert!(!s.is_completed(OnboardingStep::CloudSync));
        assert_eq!(s.apply_sync_tick(&attempt, SyncTick::progress(45)), Ok(SyncState::InProgress(45)));
        assert!(!s.is_completed(OnboardingStep::CloudSync));
        assert_eq!(s.apply_sync_tick(&attempt, SyncTick::progress(100)), Ok(SyncState::Complete));
        assert!(s.is_completed(OnboardingStep::CloudSync));
        assert!(!s.is_loading());
        assert_eq!(
            s.apply_sync_tick(&attempt, SyncTick::progress(100)),
            Err(OnboardingError::Stale(Operation::SyncToCloud))
        );
    }

    #[test]
    fn sync_abort_keeps_last_percent() {
        let mut s = connected();
        let (attempt, _) = s.begin_sync("").unwrap();
        s.apply_sync_tick(&attempt, SyncTick::progress(10)).unwrap();
        let state = s
            .apply_sync_tick(&attempt, SyncTick::failed(SdkError::Unauthorized))
            .unwrap();
        assert!(matches!(state, SyncState::Failed(OnboardingError::Sdk { .. })));
        assert_eq!(s.sync_progress(), Some(10));
        assert_eq!(s.error(), Some("cloud sync failed: unauthorized"));
        assert!(!s.is_completed(OnboardingStep::CloudSync));
        assert!(!s.is_loading());
    }

    #[test]
    fn sync_needs_label() {
        let mut s = connected();
        s.set_device_label("");
        assert_eq!(s.begin_sync("  ").err(), Some(OnboardingError::EmptyLabel));
    }

    #[test]
    fn failed_resync_keeps_earlier_completion() {
        let mut s = connected();
        let (attempt, _) = s.begin_sync("").unwrap();
        s.apply_sync_tick(&attempt, SyncTick::progress(100)).unwrap();

        let (attempt, _) = s.begin_sync("").unwrap();
        assert!(s.is_sync_complete());
        s.apply_sync_tick(&attempt, SyncTick::progress(20)).unwrap();
        let state = s.apply_sync_tick(&attempt, SyncTick::failed(SdkError::Timeout)).unwrap();
        assert!(matches!(state, SyncState::Failed(_)));

        assert!(s.is_completed(OnboardingStep::CloudSync));
        assert!(s.criterion_met(OnboardingStep::CloudSync));
        assert!(s.is_sync_complete());
        assert_eq!(s.sync_progress(), Some(20));
        assert_eq!(s.error(), Some("cloud sync failed: timed out"));
    }

    #[test]
    fn refused_sync_keeps_label() {
        let mut s = connected();
        let _busy = s.begin_connect_wifi("HomeNet").unwrap();
        assert_eq!(s.begin_sync("Hall").err(), Some(OnboardingError::Busy));
        assert_eq!(s.device_label(), "Tether-A 01");

        let mut s = OnboardingSession::new();
        s.select_device(device());
        assert_eq!(s.begin_sync("Hall").err(), Some(OnboardingError::NotConnected));
        assert_eq!(s.device_label(), "Tether-A 01");
    }

    #[test]
    fn sync_label_stored_once_issued() {
        let mut s = connected();
        let (_, label) = s.begin_sync("Hall").unwrap();
        assert_eq!(label, "Hall");
        assert_eq!(s.device_label(), "Hall");
    }

    #[test]
    fn late_completion_after_disconnect_ignored() {
        let mut s = connected();
        let attempt = s.begin_connect_wifi("HomeNet").unwrap();
        s.disconnect();
        assert_eq!(
            s.finish_connect_wifi(attempt, Ok(())),
            Err(OnboardingError::Stale(Operation::ConnectWifi))
        );
        assert!(!s.is_wifi_connected());
        assert!(!s.is_completed(OnboardingStep::WifiConfig));
        assert_eq!(s.error(), None);
    }

    #[test]
    fn disconnect_clears_connection_state() {
        let mut s = connected();
        s.advance().unwrap();
        let attempt = s.begin_network_check().unwrap();
        s.finish_network_check(attempt, Ok(vec![ConnectivityRecord::default()])).unwrap();
        s.disconnect();
        assert_eq!(
            s.completed_steps().iter().copied().collect::<Vec<_>>(),
            vec![OnboardingStep::Discovery, OnboardingStep::SelectDevice]
        );
        assert!(s.connectivity().is_empty());
        assert_eq!(s.mac_address(), None);
        assert!(s.selected_device().is_some());
        assert_eq!(s.current_step(), OnboardingStep::NetworkStatus);

        let once = s.clone();
        s.disconnect();
        assert_eq!(s, once);
    }

    #[test]
    fn reset_returns_to_start() {
        let mut s = connected();
        s.reset();
        assert_eq!(s.current_step(), OnboardingStep::Discovery);
        assert!(s.completed_steps().is_empty());
        assert!(s.selected_device().is_none());
        assert_eq!(s.device_label(), "");
        assert_eq!(s.error(), None);
    }

    #[test]
    fn selecting_another_device_disconnects() {
        let mut s = connected();
        let other = DiscoveredDevice::from_sighting(
            DeviceKind::Unrecognized,
            Sighting {
                mac_address: None,
                peripheral_id: "p-2".into(),
                name: None,
                rssi: -70,
                advertisement: vec![],
            },
        );
        s.select_device(other);
        assert!(!s.is_connected());
        assert!(!s.is_completed(OnboardingStep::Connect));
        assert_eq!(s.device_label(), "p-2");
    }
}
