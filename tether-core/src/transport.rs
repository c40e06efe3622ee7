//! Transport status tracker - per-channel link state and the preferred route

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tether_sdk::{DeviceSdk, LinkReport, LinkState, Route, SdkError};

/// User-selectable transport preference
///
/// `Auto` only exists as a selection; it is never a channel status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransportChoice {
    ShortRange,
    CloudMessaging,
    #[default]
    Auto,
}

impl std::str::FromStr for TransportChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ble" | "short-range" => Ok(TransportChoice::ShortRange),
            "mqtt" | "cloud" => Ok(TransportChoice::CloudMessaging),
            "auto" => Ok(TransportChoice::Auto),
            other => Err(format!("unknown transport `{other}` (expected ble, mqtt or auto)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("a cloud reconnect is already in progress")]
    Busy,
    #[error("no connected transport")]
    NoRoute,
    #[error("{op} failed: {source}")]
    Sdk {
        op: &'static str,
        #[source]
        source: SdkError,
    },
}

pub struct TransportTracker<S> {
    sdk: Arc<S>,
    short_range: LinkState,
    cloud: LinkState,
    selection: TransportChoice,
    reconnecting: bool,
    error: Option<String>,
}

impl<S: DeviceSdk> TransportTracker<S> {
    pub fn new(sdk: Arc<S>, selection: TransportChoice) -> Self {
        Self {
            sdk,
            short_range: LinkState::Disconnected,
            cloud: LinkState::Disconnected,
            selection,
            reconnecting: false,
            error: None,
        }
    }

    pub fn status(&self, route: Route) -> LinkState {
        match route {
            Route::ShortRange => self.short_range,
            Route::CloudMessaging => self.cloud,
        }
    }

    pub fn selection(&self) -> TransportChoice {
        self.selection
    }

    pub fn is_reconnecting(&self) -> bool {
        self.reconnecting
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Store the preferred transport; does not open any connection
    pub fn select(&mut self, choice: TransportChoice) {
        if self.selection != choice {
            log::info!("transport selection {:?} -> {:?}", self.selection, choice);
        }
        self.selection = choice;
    }

    /// Overwrite both channel states from a report
    pub fn apply_report(&mut self, report: LinkReport) {
        self.short_range = report.short_range;
        self.cloud = report.cloud;
    }

    /// Query both channels for `device_id`
    pub async fn refresh(&mut self, device_id: &str) -> Result<LinkReport, TransportError> {
        match self.sdk.link_report(device_id).await {
            Ok(report) => {
                self.apply_report(report);
                self.error = None;
                Ok(report)
            }
            Err(source) => {
                log::warn!("link report for {device_id} failed: {source}");
                let err = TransportError::Sdk { op: "refresh", source };
                self.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Mark the cloud channel as connecting before the request goes out
    pub fn begin_cloud_reconnect(&mut self) -> Result<(), TransportError> {
        if self.reconnecting {
            return Err(TransportError::Busy);
        }
        self.reconnecting = true;
        self.cloud = LinkState::Connecting;
        self.error = None;
        Ok(())
    }

    pub fn finish_cloud_reconnect(&mut self, result: Result<(), SdkError>) -> Result<(), TransportError> {
        self.reconnecting = false;
        match result {
            Ok(()) => {
                log::info!("cloud channel connected");
                self.cloud = LinkState::Connected;
                Ok(())
            }
            Err(source) => {
                log::warn!("cloud reconnect failed: {source}");
                self.cloud = LinkState::Disconnected;
                let err = TransportError::Sdk { op: "reconnect", source };
                self.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    pub async fn reconnect_cloud(&mut self) -> Result<(), TransportError> {
        self.begin_cloud_reconnect()?;
        let result = self.sdk.connect_cloud().await;
        self.finish_cloud_reconnect(result)
    }

    /// Channel a command should use given the current selection
    ///
    /// An explicit selection is used as-is. `Auto` prefers a connected
    /// short-range link and falls back to a connected cloud link.
    pub fn resolve(&self) -> Result<Route, TransportError> {
        match self.selection {
            TransportChoice::ShortRange => Ok(Route::ShortRange),
            TransportChoice::CloudMessaging => Ok(Route::CloudMessaging),
            TransportChoice::Auto if self.short_range == LinkState::Connected => Ok(Route::ShortRange),
            TransportChoice::Auto if self.cloud == LinkState::Connected => Ok(Route::CloudMessaging),
            TransportChoice::Auto => Err(TransportError::NoRoute),
        }
    }
}
