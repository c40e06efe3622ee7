//! BLE discovery types and the scanner trait
//!
//! A scan session is started with `Scanner::discover`, which hands back a
//! channel of `DiscoveryEvent`s. Events keep arriving until
//! `Scanner::stop_discovery` is called or the receiver is dropped.

use tokio::sync::mpsc;

use crate::SdkError;

/// Device category assigned from the advertisement on first sighting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum DeviceKind {
    KnownTypeA,
    KnownTypeB,
    Unrecognized,
}

impl DeviceKind {
    pub fn label(&self) -> &'static str {
        match self {
            DeviceKind::KnownTypeA => "type-a",
            DeviceKind::KnownTypeB => "type-b",
            DeviceKind::Unrecognized => "unrecognized",
        }
    }
}

/// One advertisement received during a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sighting {
    /// Hardware address, when the platform or advertisement exposes one
    pub mac_address: Option<String>,
    /// Platform-assigned identifier; may change between scans
    pub peripheral_id: String,
    pub name: Option<String>,
    /// Signal strength in dBm
    pub rssi: i16,
    pub advertisement: Vec<u8>,
}

/// Callback payloads of a running scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryEvent {
    Found(DeviceKind, Sighting),
    Error(SdkError),
}

/// Trait for BLE scan session control
///
/// `discover` fires zero or more events until stopped.
#[allow(async_fn_in_trait)]
pub trait Scanner {
    /// Start scanning and return the event stream
    async fn discover(&self) -> Result<mpsc::Receiver<DiscoveryEvent>, SdkError>;

    /// Halt the underlying scan
    async fn stop_discovery(&self) -> Result<(), SdkError>;
}

/// Result of a successful BLE connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectInfo {
    pub mac_address: Option<String>,
    pub provision_status: i32,
}
