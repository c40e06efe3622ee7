//! Tether Core - onboarding workflow and device control for Tether devices
//!
//! This crate holds the state that sits between a user interface and the
//! device SDK (see `tether-sdk`):
//! - the six-step onboarding state machine and its async driver
//! - a bounded BLE discovery session
//! - transport status and preferred-route selection
//! - the command catalog, parameter parser, runner and execution history
//!
//! Every component takes the SDK handle explicitly, so tests can substitute
//! a double for the real SDK.

pub mod catalog;
pub mod cloud;
mod config;
pub mod discovery;
pub mod history;
mod onboarder;
pub mod onboarding;
pub mod params;
mod response;
mod runner;
mod transport;

pub use config::{config_path, tether_home, ConfigError, TetherConfig};
pub use discovery::{DeviceIdentity, DiscoveredDevice, DiscoverySession, Notice, NoticeLevel, ScanUpdate, StopReason};
pub use history::{CommandExecution, CommandHistory, ExecutionId, Outcome};
pub use onboarder::Onboarder;
pub use onboarding::{OnboardingError, OnboardingSession, OnboardingStep, Operation, SyncState};
pub use params::{ArgValue, Arguments, ParamError, ParamInputs};
pub use response::StructuredResponse;
pub use runner::{CommandError, CommandRunner};
pub use transport::{TransportChoice, TransportError, TransportTracker};

// Re-export the SDK boundary for convenience
pub use tether_sdk;
