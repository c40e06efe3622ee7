//! Command catalog - the static registry of device commands
//!
//! Each entry names its parameters, a display category and the `CommandId`
//! the runner dispatches on.

use serde::Serialize;

/// Value type a parameter's text is parsed into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParamType {
    Integer,
    IntegerList,
    Text,
    ByteList,
}

impl ParamType {
    pub fn is_list(&self) -> bool {
        matches!(self, ParamType::IntegerList | ParamType::ByteList)
    }

    pub fn hint(&self) -> &'static str {
        match self {
            ParamType::Integer => "integer",
            ParamType::IntegerList => "comma-separated integers",
            ParamType::Text => "text",
            ParamType::ByteList => "comma-separated bytes (0-255)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    pub required: bool,
    pub default: Option<&'static str>,
    pub ty: ParamType,
}

impl ParamSpec {
    const fn required(name: &'static str, ty: ParamType) -> Self {
        Self { name, required: true, default: None, ty }
    }

    const fn optional(name: &'static str, ty: ParamType) -> Self {
        Self { name, required: false, default: None, ty }
    }

    const fn defaulted(name: &'static str, ty: ParamType, default: &'static str) -> Self {
        Self { name, required: false, default: Some(default), ty }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Category {
    Control,
    Status,
    Network,
    Certificate,
    Cloud,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Control,
        Category::Status,
        Category::Network,
        Category::Certificate,
        Category::Cloud,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Category::Control => "Control",
            Category::Status => "Status",
            Category::Network => "Network",
            Category::Certificate => "Certificates",
            Category::Cloud => "Cloud API",
        }
    }
}

/// Executor selector for a catalog entry
///
/// Declaration order matches `CATALOG`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CommandId {
    ControlDevice,
    ControlGroup,
    ControlLocation,
    DeviceState,
    NetworkConnectivity,
    LogBlockCount,
    ScanWifi,
    ConnectWifi,
    HttpsCertificate,
    MqttCertificate,
    CloudGet,
    CloudPost,
    CloudPatch,
    CloudUpdate,
    CloudDelete,
}

impl CommandId {
    pub fn definition(self) -> &'static CommandDefinition {
        &CATALOG[self as usize]
    }
}

#[derive(Debug, Serialize)]
pub struct CommandDefinition {
    pub id: CommandId,
    /// Stable identifier used on the command line and in history exports
    pub key: &'static str,
    pub category: Category,
    pub params: &'static [ParamSpec],
    pub display_name: &'static str,
    pub description: &'static str,
}

impl CommandDefinition {
    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }
}

use ParamType::{ByteList, Integer, IntegerList, Text};

const CONTROL_PARAMS: &[ParamSpec] = &[
    ParamSpec::required("target", Text),
    ParamSpec::required("elements", IntegerList),
    ParamSpec::required("values", IntegerList),
];

const DEVICE_PARAMS: &[ParamSpec] = &[ParamSpec::required("device", Text)];

const CERT_PARAMS: &[ParamSpec] = &[ParamSpec::required("payload", ByteList)];

const CLOUD_READ_PARAMS: &[ParamSpec] = &[
    ParamSpec::required("path", Text),
    ParamSpec::optional("params", Text),
];

const CLOUD_WRITE_PARAMS: &[ParamSpec] = &[
    ParamSpec::required("path", Text),
    ParamSpec::optional("params", Text),
    ParamSpec::optional("headers", Text),
];

pub static CATALOG: &[CommandDefinition] = &[
    CommandDefinition {
        id: CommandId::ControlDevice,
        key: "control-device",
        category: Category::Control,
        params: CONTROL_PARAMS,
        display_name: "Control Device",
        description: "Write attribute values to elements of one device",
    },
    CommandDefinition {
        id: CommandId::ControlGroup,
        key: "control-group",
        category: Category::Control,
        params: CONTROL_PARAMS,
        display_name: "Control Group",
        description: "Write attribute values to every device in a group",
    },
    CommandDefinition {
        id: CommandId::ControlLocation,
        key: "control-location",
        category: Category::Control,
        params: CONTROL_PARAMS,
        display_name: "Control Location",
        description: "Write attribute values to every device in a location",
    },
    CommandDefinition {
        id: CommandId::DeviceState,
        key: "device-state",
        category: Category::Status,
        params: DEVICE_PARAMS,
        display_name: "Get Device State",
        description: "Fetch the device's state snapshot",
    },
    CommandDefinition {
        id: CommandId::NetworkConnectivity,
        key: "network-connectivity",
        category: Category::Status,
        params: &[],
        display_name: "Network Connectivity",
        description: "Report WiFi and cloud connectivity of the connected device",
    },
    CommandDefinition {
        id: CommandId::LogBlockCount,
        key: "log-blocks",
        category: Category::Status,
        params: DEVICE_PARAMS,
        display_name: "Log Block Count",
        description: "Number of log blocks stored on the device",
    },
    CommandDefinition {
        id: CommandId::ScanWifi,
        key: "scan-wifi",
        category: Category::Network,
        params: &[
            ParamSpec::defaulted("interface", Integer, "0"),
            ParamSpec::defaulted("duration", Integer, "5"),
        ],
        display_name: "Scan WiFi",
        description: "Ask the device to scan for WiFi networks",
    },
    CommandDefinition {
        id: CommandId::ConnectWifi,
        key: "connect-wifi",
        category: Category::Network,
        params: &[
            ParamSpec::defaulted("interface", Integer, "0"),
            ParamSpec::required("ssid", Text),
            ParamSpec::optional("password", Text),
        ],
        display_name: "Connect WiFi",
        description: "Send WiFi credentials to the device",
    },
    CommandDefinition {
        id: CommandId::HttpsCertificate,
        key: "https-cert",
        category: Category::Certificate,
        params: CERT_PARAMS,
        display_name: "Send HTTPS Certificate",
        description: "Deliver an HTTPS client certificate to the device",
    },
    CommandDefinition {
        id: CommandId::MqttCertificate,
        key: "mqtt-cert",
        category: Category::Certificate,
        params: CERT_PARAMS,
        display_name: "Send MQTT Certificate",
        description: "Deliver an MQTT client certificate to the device",
    },
    CommandDefinition {
        id: CommandId::CloudGet,
        key: "cloud-get",
        category: Category::Cloud,
        params: CLOUD_READ_PARAMS,
        display_name: "GET",
        description: "Cloud REST GET",
    },
    CommandDefinition {
        id: CommandId::CloudPost,
        key: "cloud-post",
        category: Category::Cloud,
        params: CLOUD_WRITE_PARAMS,
        display_name: "POST",
        description: "Cloud REST POST",
    },
    CommandDefinition {
        id: CommandId::CloudPatch,
        key: "cloud-patch",
        category: Category::Cloud,
        params: CLOUD_WRITE_PARAMS,
        display_name: "PATCH",
        description: "Cloud REST PATCH",
    },
    CommandDefinition {
        id: CommandId::CloudUpdate,
        key: "cloud-update",
        category: Category::Cloud,
        params: CLOUD_WRITE_PARAMS,
        display_name: "UPDATE",
        description: "Cloud REST UPDATE",
    },
    CommandDefinition {
        id: CommandId::CloudDelete,
        key: "cloud-delete",
        category: Category::Cloud,
        params: CLOUD_READ_PARAMS,
        display_name: "DELETE",
        description: "Cloud REST DELETE",
    },
];

/// Find a command by its key
pub fn lookup(key: &str) -> Option<&'static CommandDefinition> {
    CATALOG.iter().find(|d| d.key == key)
}

pub fn by_category(category: Category) -> impl Iterator<Item = &'static CommandDefinition> {
    CATALOG.iter().filter(move |d| d.category == category)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_covers_every_id() {
        let ids = [
            CommandId::ControlDevice,
            CommandId::ControlGroup,
            CommandId::ControlLocation,
            CommandId::DeviceState,
            CommandId::NetworkConnectivity,
            CommandId::LogBlockCount,
            CommandId::ScanWifi,
            CommandId::ConnectWifi,
            CommandId::HttpsCertificate,
            CommandId::MqttCertificate,
            CommandId::CloudGet,
            CommandId::CloudPost,
            CommandId::CloudPatch,
            CommandId::CloudUpdate,
            CommandId::CloudDelete,
        ];
        assert_eq!(ids.len(), CATALOG.len());
        for id in ids {
            assert_eq!(CATALOG.iter().filter(|d| d.id == id).count(), 1, "{id:?}");
            assert_eq!(id.definition().id, id);
        }
    }

    #[test]
    fn keys_are_unique() {
        for def in CATALOG {
            assert_eq!(lookup(def.key).map(|d| d.id), Some(def.id));
        }
    }

    #[test]
    fn categories_partition_catalog() {
        let total: usize = Category::ALL.iter().map(|c| by_category(*c).count()).sum();
        assert_eq!(total, CATALOG.len());
        assert_eq!(by_category(Category::Control).count(), 3);
    }

    #[test]
    fn defaults_only_on_optional_params() {
        for def in CATALOG {
            for p in def.params {
                assert!(!(p.required && p.default.is_some()), "{}.{}", def.key, p.name);
            }
        }
    }
}
