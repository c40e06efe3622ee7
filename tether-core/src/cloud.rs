//! Cloud REST passthrough responses
//!
//! Bodies of known endpoints decode into typed records. Anything else stays
//! as opaque bytes. A body that claims a known shape but does not match it
//! is an error, never a silently empty value.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub location_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub mac_address: Option<String>,
    #[serde(default)]
    pub group_id: Option<String>,
}

/// Which record shape an endpoint returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Locations,
    Groups,
    Devices,
    Other,
}

impl Endpoint {
    /// Classify a REST path by its first segment
    pub fn of_path(path: &str) -> Self {
        let first = path.trim_start_matches('/').split(['/', '?']).next().unwrap_or("");
        match first {
            "locations" => Endpoint::Locations,
            "groups" => Endpoint::Groups,
            "devices" => Endpoint::Devices,
            _ => Endpoint::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloudResponse {
    Locations(Vec<Location>),
    Groups(Vec<Group>),
    Devices(Vec<Device>),
    Opaque(Vec<u8>),
}

#[derive(Debug, thiserror::Error)]
#[error("unexpected {endpoint:?} response: {source}")]
pub struct CloudDecodeError {
    pub endpoint: Endpoint,
    #[source]
    pub source: serde_json::Error,
}

/// Accepts either a single record or an array of them
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> From<OneOrMany<T>> for Vec<T> {
    fn from(v: OneOrMany<T>) -> Self {
        match v {
            OneOrMany::Many(v) => v,
            OneOrMany::One(t) => vec![t],
        }
    }
}

fn decode_list<T: serde::de::DeserializeOwned>(endpoint: Endpoint, body: &[u8]) -> Result<Vec<T>, CloudDecodeError> {
    serde_json::from_slice::<OneOrMany<T>>(body)
        .map(Vec::from)
        .map_err(|source| CloudDecodeError { endpoint, source })
}

impl CloudResponse {
    pub fn decode(path: &str, body: &[u8]) -> Result<Self, CloudDecodeError> {
        let endpoint = Endpoint::of_path(path);
        Ok(match endpoint {
            Endpoint::Locations => CloudResponse::Locations(decode_list(endpoint, body)?),
            Endpoint::Groups => CloudResponse::Groups(decode_list(endpoint, body)?),
            Endpoint::Devices => CloudResponse::Devices(decode_list(endpoint, body)?),
            Endpoint::Other => CloudResponse::Opaque(body.to_vec()),
        })
    }

    /// One-line description for the history log
    pub fn summary(&self) -> String {
        match self {
            CloudResponse::Locations(v) => format!("{} locations", v.len()),
            CloudResponse::Groups(v) => format!("{} groups", v.len()),
            CloudResponse::Devices(v) => format!("{} devices", v.len()),
            CloudResponse::Opaque(bytes) => match std::str::from_utf8(bytes) {
                Ok(text) if text.len() <= 200 => text.to_string(),
                Ok(_) | Err(_) => format!("{} bytes", bytes.len()),
            },
        }
    }
}
