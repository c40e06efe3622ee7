//! Plain-text and JSON rendering for the CLI

use serde_json::{json, Map, Value};
use tether_core::catalog::{self, Category, CommandDefinition};
use tether_core::{ArgValue, Arguments, DiscoveredDevice};

pub fn device_line(device: &DiscoveredDevice) -> String {
    let adv = if device.advertisement().is_empty() {
        String::new()
    } else {
        format!(" adv {}", device.advertisement_hex())
    };
    format!(
        "  {} ({}) RSSI: {} dBm [{}]{}",
        device.display_name(),
        device.identity(),
        device.rssi(),
        device.kind().label(),
        adv
    )
}

fn command_block(def: &CommandDefinition) -> String {
    let mut out = format!("  {:<22} {}\n", def.key, def.description);
    for p in def.params {
        let flag = match (p.required, p.default) {
            (true, _) => "required".to_string(),
            (false, Some(d)) => format!("default {d}"),
            (false, None) => "optional".to_string(),
        };
        out.push_str(&format!("      {:<10} {} ({flag})\n", p.name, p.ty.hint()));
    }
    out
}

/// Every catalog entry, grouped by category
pub fn catalog() -> String {
    let mut out = String::new();
    for category in Category::ALL {
        out.push_str(&format!("{}:\n", category.title()));
        for def in catalog::by_category(category) {
            out.push_str(&command_block(def));
        }
    }
    out
}

pub fn arguments_json(def: &CommandDefinition, args: &Arguments) -> Value {
    let typed: Map<String, Value> = args
        .iter()
        .map(|(name, value)| {
            let value = match value {
                ArgValue::Integer(v) => json!(v),
                ArgValue::IntegerList(v) => json!(v),
                ArgValue::Text(v) => json!(v),
                ArgValue::Bytes(v) => json!(v),
            };
            (name.to_string(), value)
        })
        .collect();
    json!({ "command": def.key, "arguments": typed })
}
