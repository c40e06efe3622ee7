use tether_sdk::DeviceKind;

/// Sorts advertisements into device kinds by advertised name
///
/// A name matches a kind when it starts with the prefix, or carries it in
/// brackets the way some BLE stacks decorate names (`nimble [Tether-A-01]`).
#[derive(Debug, Clone)]
pub struct Classifier {
    type_a_prefix: String,
    type_b_prefix: String,
}

impl Classifier {
    pub fn new(type_a_prefix: impl Into<String>, type_b_prefix: impl Into<String>) -> Self {
        Self {
            type_a_prefix: type_a_prefix.into(),
            type_b_prefix: type_b_prefix.into(),
        }
    }

    pub fn classify(&self, name: Option<&str>) -> DeviceKind {
        let Some(name) = name.map(str::trim) else {
            return DeviceKind::Unrecognized;
        };
        if matches_prefix(name, &self.type_a_prefix) {
            DeviceKind::KnownTypeA
        } else if matches_prefix(name, &self.type_b_prefix) {
            DeviceKind::KnownTypeB
        } else {
            DeviceKind::Unrecognized
        }
    }
}

fn matches_prefix(name: &str, prefix: &str) -> bool {
    !prefix.is_empty() && (name.starts_with(prefix) || name.contains(&format!("[{prefix}")))
}
