//! Structured payloads attached to executed commands

use std::fmt;

use serde::Serialize;
use tether_sdk::{ConnectivityRecord, WifiNetwork};

/// What a command reported back besides success or failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum StructuredResponse {
    None,
    AckCode(i32),
    /// Opaque device-state snapshot; the SDK publishes no schema for it
    DeviceState(String),
    Connectivity(Vec<ConnectivityRecord>),
    WifiNetworks(Vec<WifiNetwork>),
    LogBlocks(u32),
}

impl StructuredResponse {
    pub fn is_none(&self) -> bool {
        matches!(self, StructuredResponse::None)
    }
}

impl fmt::Display for StructuredResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructuredResponse::None => Ok(()),
            StructuredResponse::AckCode(code) => write!(f, "{code}"),
            StructuredResponse::DeviceState(text) => f.write_str(text),
            StructuredResponse::Connectivity(records) => {
                for (i, r) in records.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(
                        f,
                        "wifi: {}, cloud: {}",
                        if r.wifi_connected { "connected" } else { "disconnected" },
                        if r.cloud_connected { "connected" } else { "disconnected" },
                    )?;
                    if let Some(ssid) = &r.ssid {
                        write!(f, ", ssid: {ssid}")?;
                    }
                    if let Some(rssi) = r.rssi {
                        write!(f, ", rssi: {rssi} dBm")?;
                    }
                }
                Ok(())
            }
            StructuredResponse::WifiNetworks(networks) => {
                let names: Vec<&str> = networks.iter().map(|n| n.ssid.as_str()).collect();
                f.write_str(&names.join("\n"))
            }
            StructuredResponse::LogBlocks(count) => write!(f, "{count} log blocks"),
        }
    }
}
