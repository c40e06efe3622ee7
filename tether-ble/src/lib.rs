//! Tether BLE
//!
//! A [`Scanner`](tether_sdk::Scanner) backed by the host Bluetooth adapter.
//!
//! # Example
//!
//! ```ignore
//! use tether_ble::{BleScanner, Classifier};
//! use tether_sdk::{DiscoveryEvent, Scanner};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let scanner = BleScanner::new(Classifier::new("Tether-A", "Tether-B")).await?;
//!     let mut events = scanner.discover().await?;
//!     while let Some(DiscoveryEvent::Found(kind, sighting)) = events.recv().await {
//!         println!("{} {:?} {} dBm", kind.label(), sighting.name, sighting.rssi);
//!     }
//!     Ok(())
//! }
//! ```

mod classify;
mod scanner;

pub use classify::Classifier;
pub use scanner::BleScanner;
