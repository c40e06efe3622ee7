//! Parameter parser - turns entered text into typed command arguments
//!
//! Parsing is all-or-nothing: a single bad token fails the whole parameter
//! and no partial list is ever returned.

use std::collections::BTreeMap;

use crate::catalog::{CommandDefinition, ParamSpec, ParamType};

/// Validation failure detected before anything is sent to a device
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParamError {
    #[error("missing required parameter `{0}`")]
    MissingRequired(String),
    #[error("parameter `{param}`: `{token}` is not a valid integer")]
    Malformed { param: String, token: String },
    #[error("parameter `{param}`: `{token}` is outside the byte range 0-255")]
    OutOfRange { param: String, token: String },
    #[error("parameter `{0}` is empty")]
    Empty(String),
    #[error("unknown parameter `{0}`")]
    Unknown(String),
}

/// Raw text as entered, keyed by parameter name
pub type ParamInputs = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    Integer(i64),
    IntegerList(Vec<i64>),
    Text(String),
    Bytes(Vec<u8>),
}

/// Typed arguments for one command invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Arguments {
    values: BTreeMap<&'static str, ArgValue>,
}

impl Arguments {
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values.get(name)
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        match self.values.get(name) {
            Some(ArgValue::Integer(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn integers(&self, name: &str) -> &[i64] {
        match self.values.get(name) {
            Some(ArgValue::IntegerList(v)) => v,
            _ => &[],
        }
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(ArgValue::Text(v)) => Some(v),
            _ => None,
        }
    }

    pub fn bytes(&self, name: &str) -> &[u8] {
        match self.values.get(name) {
            Some(ArgValue::Bytes(v)) => v,
            _ => &[],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &ArgValue)> {
        self.values.iter().map(|(k, v)| (*k, v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Parse a single base-10 integer
pub fn parse_integer(param: &str, text: &str) -> Result<i64, ParamError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ParamError::Empty(param.to_string()));
    }
    trimmed.parse().map_err(|_| ParamError::Malformed {
        param: param.to_string(),
        token: trimmed.to_string(),
    })
}

/// Parse comma-separated base-10 integers; blank input is an empty list
pub fn parse_integer_list(param: &str, text: &str) -> Result<Vec<i64>, ParamError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    text.split(',')
        .map(|token| {
            let token = token.trim();
            token.parse().map_err(|_| ParamError::Malformed {
                param: param.to_string(),
                token: token.to_string(),
            })
        })
        .collect()
}

/// Parse comma-separated integers constrained to 0-255
pub fn parse_byte_list(param: &str, text: &str) -> Result<Vec<u8>, ParamError> {
    parse_integer_list(param, text)?
        .into_iter()
        .map(|v| {
            u8::try_from(v).map_err(|_| ParamError::OutOfRange {
                param: param.to_string(),
                token: v.to_string(),
            })
        })
        .collect()
}

fn parse_value(spec: &ParamSpec, text: &str) -> Result<ArgValue, ParamError> {
    Ok(match spec.ty {
        ParamType::Integer => ArgValue::Integer(parse_integer(spec.name, text)?),
        ParamType::IntegerList => ArgValue::IntegerList(parse_integer_list(spec.name, text)?),
        ParamType::Text => ArgValue::Text(text.to_string()),
        ParamType::ByteList => ArgValue::Bytes(parse_byte_list(spec.name, text)?),
    })
}

/// Check required fields, apply defaults and parse every parameter of `def`
///
/// Required parameters must be non-blank before parsing is attempted.
/// Blank optional list parameters become empty lists; blank optional
/// scalars without a default are left out.
pub fn parse_arguments(def: &CommandDefinition, inputs: &ParamInputs) -> Result<Arguments, ParamError> {
    if let Some(unknown) = inputs.keys().find(|k| def.param(k).is_none()) {
        return Err(ParamError::Unknown(unknown.clone()));
    }

    let mut values = BTreeMap::new();
    for spec in def.params {
        let entered = inputs.get(spec.name).map(|s| s.as_str()).unwrap_or("");

        let text = if !entered.trim().is_empty() {
            entered
        } else if spec.required {
            return Err(ParamError::MissingRequired(spec.name.to_string()));
        } else if let Some(default) = spec.default {
            default
        } else if spec.ty.is_list() {
            ""
        } else {
            continue;
        };

        values.insert(spec.name, parse_value(spec, text)?);
    }

    Ok(Arguments { values })
}
