//! Command runner - validate, route, dispatch and record device commands
//!
//! Flow for one invocation: catalog lookup, required-field check and
//! parsing, transport resolution for routed commands, the SDK call, then a
//! history record. Anything rejected before the SDK call is returned as an
//! error and never recorded; SDK failures are recorded like successes.

use std::sync::Arc;

use tether_sdk::{CertificateKind, CloudRequest, ControlTarget, DeviceSdk, HttpMethod, Route, SdkError};

use crate::catalog::{self, CommandDefinition, CommandId};
use crate::cloud::CloudResponse;
use crate::config::TetherConfig;
use crate::history::{CommandExecution, CommandHistory, Invocation, Outcome};
use crate::params::{parse_arguments, Arguments, ParamError, ParamInputs};
use crate::response::StructuredResponse;
use crate::transport::{TransportError, TransportTracker};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("unknown command `{0}`")]
    UnknownCommand(String),
    #[error(transparent)]
    Param(#[from] ParamError),
    #[error("parameter `{param}` is invalid: {reason}")]
    InvalidParam { param: &'static str, reason: String },
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Why a dispatched command produced no result
enum DispatchError {
    Sdk(SdkError),
    Decode(String),
}

impl From<SdkError> for DispatchError {
    fn from(e: SdkError) -> Self {
        DispatchError::Sdk(e)
    }
}

impl std::fmt::Display for DispatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchError::Sdk(e) => write!(f, "{e}"),
            DispatchError::Decode(e) => f.write_str(e),
        }
    }
}

fn narrow<T: TryFrom<i64>>(param: &str, value: i64) -> Result<T, ParamError> {
    T::try_from(value).map_err(|_| ParamError::OutOfRange {
        param: param.to_string(),
        token: value.to_string(),
    })
}

/// Parse `Name: value` pairs separated by `;` or newlines
fn parse_headers(text: &str) -> Result<Vec<(String, String)>, CommandError> {
    text.split([';', '\n'])
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            let (name, value) = line.split_once(':').ok_or_else(|| CommandError::InvalidParam {
                param: "headers",
                reason: format!("expected `Name: value`, got `{line}`"),
            })?;
            Ok((name.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Work out everything a command needs before any SDK call
enum Prepared {
    Control { target: ControlTarget, elements: Vec<i64>, values: Vec<i64>, route: Route },
    DeviceState(String),
    NetworkConnectivity,
    LogBlockCount(String),
    ScanWifi { interface: u8, duration: u32 },
    ConnectWifi { interface: u8, ssid: String, password: String },
    Certificate { kind: CertificateKind, payload: Vec<u8> },
    Cloud(CloudRequest),
}

impl Prepared {
    fn route(&self) -> Option<Route> {
        match self {
            Prepared::Control { route, .. } => Some(*route),
            _ => None,
        }
    }
}

pub struct CommandRunner<S> {
    sdk: Arc<S>,
    transport: TransportTracker<S>,
    history: CommandHistory,
}

impl<S: DeviceSdk> CommandRunner<S> {
    pub fn new(sdk: Arc<S>, transport: TransportTracker<S>, history: CommandHistory) -> Self {
        Self { sdk, transport, history }
    }

    /// Runner with the configured transport preference and history size
    pub fn with_config(sdk: Arc<S>, config: &TetherConfig) -> Self {
        let transport = TransportTracker::new(sdk.clone(), config.default_transport);
        Self::new(sdk, transport, CommandHistory::new(config.history_capacity))
    }

    pub fn history(&self) -> &CommandHistory {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut CommandHistory {
        &mut self.history
    }

    pub fn transport(&self) -> &TransportTracker<S> {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut TransportTracker<S> {
        &mut self.transport
    }

    /// Run the command registered under `key`
    pub async fn execute_key(
        &mut self,
        key: &str,
        inputs: ParamInputs,
    ) -> Result<&CommandExecution, CommandError> {
        let def = catalog::lookup(key).ok_or_else(|| CommandError::UnknownCommand(key.to_string()))?;
        self.execute(def.id, inputs).await
    }

    /// Run one command and record its outcome
    ///
    /// `Err` means the command was rejected locally and nothing was sent.
    /// A device or SDK failure is recorded and returned as `Ok` with a
    /// failure outcome.
    pub async fn execute(
        &mut self,
        id: CommandId,
        inputs: ParamInputs,
    ) -> Result<&CommandExecution, CommandError> {
        let def = id.definition();
        let args = parse_arguments(def, &inputs)?;
        let prepared = self.prepare(def, &args)?;
        let route = prepared.route();

        log::info!("executing {}{}", def.key, route.map(|r| format!(" via {r}")).unwrap_or_default());
        let (outcome, response) = match self.dispatch(prepared).await {
            Ok((message, response)) => (Outcome::Success(message), response),
            Err(e) => {
                log::warn!("{} failed: {e}", def.key);
                (Outcome::Failure(format!("{} failed: {e}", def.display_name)), StructuredResponse::None)
            }
        };

        let transport = self.transport.selection();
        Ok(self.history.record(Invocation {
            command: id,
            params: inputs,
            transport,
            route,
            outcome,
            response,
        }))
    }

    fn prepare(&self, def: &CommandDefinition, args: &Arguments) -> Result<Prepared, CommandError> {
        // identifiers are trimmed; secrets and JSON bodies go through as entered
        let text = |name: &str| args.text(name).unwrap_or("").trim().to_string();

        Ok(match def.id {
            CommandId::ControlDevice | CommandId::ControlGroup | CommandId::ControlLocation => {
                let target = match def.id {
                    CommandId::ControlGroup => ControlTarget::Group(text("target")),
                    CommandId::ControlLocation => ControlTarget::Location(text("target")),
                    _ => ControlTarget::Device(text("target")),
                };
                Prepared::Control {
                    target,
                    elements: args.integers("elements").to_vec(),
                    values: args.integers("values").to_vec(),
                    route: self.transport.resolve()?,
                }
            }
            CommandId::DeviceState => Prepared::DeviceState(text("device")),
            CommandId::NetworkConnectivity => Prepared::NetworkConnectivity,
            CommandId::LogBlockCount => Prepared::LogBlockCount(text("device")),
            CommandId::ScanWifi => Prepared::ScanWifi {
                interface: narrow("interface", args.integer("interface").unwrap_or(0))?,
                duration: narrow("duration", args.integer("duration").unwrap_or(0))?,
            },
            CommandId::ConnectWifi => Prepared::ConnectWifi {
                interface: narrow("interface", args.integer("interface").unwrap_or(0))?,
                ssid: text("ssid"),
                password: args.text("password").unwrap_or("").to_string(),
            },
            CommandId::HttpsCertificate => Prepared::Certificate {
                kind: CertificateKind::Https,
                payload: args.bytes("payload").to_vec(),
            },
            CommandId::MqttCertificate => Prepared::Certificate {
                kind: CertificateKind::Mqtt,
                payload: args.bytes("payload").to_vec(),
            },
            CommandId::CloudGet
            | CommandId::CloudPost
            | CommandId::CloudPatch
            | CommandId::CloudUpdate
            | CommandId::CloudDelete => {
                let method = match def.id {
                    CommandId::CloudPost => HttpMethod::Post,
                    CommandId::CloudPatch => HttpMethod::Patch,
                    CommandId::CloudUpdate => HttpMethod::Update,
                    CommandId::CloudDelete => HttpMethod::Delete,
                    _ => HttpMethod::Get,
                };
                let params = args.text("params").map(str::to_string);
                if let Some(raw) = &params {
                    serde_json::from_str::<serde_json::Value>(raw).map_err(|e| CommandError::InvalidParam {
                        param: "params",
                        reason: format!("not valid JSON: {e}"),
                    })?;
                }
                let headers = match args.text("headers") {
                    Some(h) => parse_headers(h)?,
                    None => Vec::new(),
                };
                Prepared::Cloud(CloudRequest { method, path: text("path"), params, headers })
            }
        })
    }

    async fn dispatch(&self, prepared: Prepared) -> Result<(String, StructuredResponse), DispatchError> {
        let sdk = &self.sdk;
        Ok(match prepared {
            Prepared::Control { target, elements, values, route } => {
                let ack = sdk.control(&target, &elements, &values, route).await?;
                (format!("ACK {ack}"), StructuredResponse::AckCode(ack))
            }
            Prepared::DeviceState(device) => {
                let state = sdk.device_state(&device).await?;
                ("device state received".to_string(), StructuredResponse::DeviceState(state.0))
            }
            Prepared::NetworkConnectivity => {
                let records = sdk.network_connectivity().await?;
                (format!("{} connectivity records", records.len()), StructuredResponse::Connectivity(records))
            }
            Prepared::LogBlockCount(device) => {
                let count = sdk.log_block_count(&device).await?;
                (format!("{count} log blocks"), StructuredResponse::LogBlocks(count))
            }
            Prepared::ScanWifi { interface, duration } => {
                let networks = sdk.scan_wifi(interface, duration).await?;
                (format!("{} networks found", networks.len()), StructuredResponse::WifiNetworks(networks))
            }
            Prepared::ConnectWifi { interface, ssid, password } => {
                sdk.connect_wifi(interface, &ssid, &password).await?;
                (format!("connected to {ssid}"), StructuredResponse::None)
            }
            Prepared::Certificate { kind, payload } => {
                let mut last = (0, 0);
                let mut observe = |current: u32, total: u32| {
                    log::debug!("certificate transfer {current}/{total}");
                    last = (current, total);
                };
                sdk.send_certificate(kind, &payload, &mut observe).await?;
                let (current, total) = last;
                (
                    format!("certificate sent ({} bytes, {current}/{total})", payload.len()),
                    StructuredResponse::None,
                )
            }
            Prepared::Cloud(request) => {
                let body = sdk.cloud_request(&request).await?;
                let decoded = CloudResponse::decode(&request.path, &body)
                    .map_err(|e| DispatchError::Decode(e.to_string()))?;
                (decoded.summary(), StructuredResponse::None)
            }
        })
    }
}
