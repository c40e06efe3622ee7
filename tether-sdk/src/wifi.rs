//! WiFi and connectivity types reported by a device

use serde::{Deserialize, Serialize};

/// WiFi network seen by the device during a scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiNetwork {
    pub ssid: String,
}

/// One entry of the device's network connectivity report
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConnectivityRecord {
    pub wifi_connected: bool,
    pub cloud_connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rssi: Option<i32>,
}
