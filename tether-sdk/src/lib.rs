//! Tether SDK boundary
//!
//! Traits and types describing the external device-management SDK that the
//! onboarding and control layer talks to. The SDK itself is an opaque
//! collaborator: BLE central stack, WiFi credential delivery, MQTT session
//! and cloud authentication all live behind these traits.
//!
//! This crate provides:
//! - `Scanner`: BLE discovery session control with streamed sightings
//! - `DeviceSdk`: connect, network, WiFi, cloud sync, control and REST calls
//! - `SdkError`: the transport/SDK failure taxonomy
//!
//! # Implementations
//! - BLE scanning over btleplug: see `tether-ble`
//! - Test doubles: see `tether-core/tests/common`

pub mod ble;
pub mod device;
pub mod error;
pub mod wifi;

pub use ble::*;
pub use device::*;
pub use error::SdkError;
pub use wifi::*;
