//! Device SDK operation contracts
//!
//! Everything the onboarding and control layer needs from the external SDK
//! beyond BLE scanning. Each call is fire-and-await-completion; the caller
//! is responsible for not issuing a second call on the same resource while
//! one is in flight.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::{ConnectInfo, ConnectivityRecord, SdkError, WifiNetwork};

/// Communication channel through which a command reaches a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Route {
    /// Short-range radio (BLE)
    ShortRange,
    /// Cloud messaging (MQTT)
    CloudMessaging,
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Route::ShortRange => f.write_str("ble"),
            Route::CloudMessaging => f.write_str("mqtt"),
        }
    }
}

/// Link state of one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkState {
    Connected,
    Connecting,
    Disconnected,
    Unavailable,
}

/// Connectivity of both channels for one device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkReport {
    pub short_range: LinkState,
    pub cloud: LinkState,
}

/// Parameters of a cloud sync
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncRequest {
    pub label: String,
    pub description: Option<String>,
    pub group_id: Option<String>,
    pub mesh_config: Option<String>,
}

/// One progress report of a running cloud sync
///
/// `percent == 100` is success; a negative percent carries an error and is
/// terminal; anything in `0..100` is a progress tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTick {
    pub percent: i32,
    pub error: Option<SdkError>,
}

impl SyncTick {
    pub fn progress(percent: i32) -> Self {
        Self { percent, error: None }
    }

    pub fn failed(error: SdkError) -> Self {
        Self { percent: -1, error: Some(error) }
    }
}

/// What a control command is addressed to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlTarget {
    Device(String),
    Group(String),
    Location(String),
}

/// Device state snapshot; its schema is not published by the SDK
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpaqueState(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificateKind {
    Https,
    Mqtt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Update,
    Delete,
}

/// Cloud REST passthrough request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudRequest {
    pub method: HttpMethod,
    pub path: String,
    /// Raw JSON parameters
    pub params: Option<String>,
    pub headers: Vec<(String, String)>,
}

/// Trait for the device-management SDK
#[allow(async_fn_in_trait)]
pub trait DeviceSdk {
    /// Connect to a discovered device over BLE
    async fn connect(&self, peripheral_id: &str) -> Result<ConnectInfo, SdkError>;

    /// Drop the BLE connection
    async fn disconnect(&self) -> Result<(), SdkError>;

    async fn network_connectivity(&self) -> Result<Vec<ConnectivityRecord>, SdkError>;

    async fn scan_wifi(&self, interface: u8, duration_secs: u32)
        -> Result<Vec<WifiNetwork>, SdkError>;

    async fn connect_wifi(&self, interface: u8, ssid: &str, password: &str)
        -> Result<(), SdkError>;

    /// Start a cloud sync; progress arrives on the returned channel
    async fn sync_device_to_cloud(&self, request: SyncRequest) -> mpsc::Receiver<SyncTick>;

    /// Send a control command, returning the device's ACK code
    async fn control(
        &self,
        target: &ControlTarget,
        elements: &[i64],
        values: &[i64],
        route: Route,
    ) -> Result<i32, SdkError>;

    async fn device_state(&self, device_id: &str) -> Result<OpaqueState, SdkError>;

    async fn log_block_count(&self, device_id: &str) -> Result<u32, SdkError>;

    /// Deliver a certificate; `progress` receives `(current, total)`
    async fn send_certificate(
        &self,
        kind: CertificateKind,
        payload: &[u8],
        progress: &mut (dyn FnMut(u32, u32) + Send),
    ) -> Result<(), SdkError>;

    async fn cloud_request(&self, request: &CloudRequest) -> Result<Vec<u8>, SdkError>;

    /// Current state of both channels for a device
    async fn link_report(&self, device_id: &str) -> Result<LinkReport, SdkError>;

    /// Open the cloud messaging session
    async fn connect_cloud(&self) -> Result<(), SdkError>;
}
