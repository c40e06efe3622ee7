//! btleplug-backed discovery
//!
//! `discover` subscribes to adapter events before starting the scan and
//! forwards every discovered or updated peripheral as a sighting. The
//! forwarding task ends when the receiver is dropped or `stop_discovery`
//! aborts it.

use std::collections::{BTreeMap, HashMap};
use std::pin::Pin;
use std::sync::{Mutex, MutexGuard, PoisonError};

use btleplug::api::{BDAddr, Central, CentralEvent, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, PeripheralId};
use futures::{Stream, StreamExt};
use tether_sdk::{DiscoveryEvent, Scanner, SdkError, Sighting};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::Classifier;

const EVENT_BUFFER: usize = 64;

type AdapterEvents = Pin<Box<dyn Stream<Item = CentralEvent> + Send>>;

fn sdk_error(e: btleplug::Error) -> SdkError {
    SdkError::other(format!("bluetooth: {e}"))
}

/// Get the first Bluetooth adapter on this host
async fn get_adapter() -> Result<Adapter, SdkError> {
    let manager = Manager::new().await.map_err(sdk_error)?;
    let adapters = manager.adapters().await.map_err(sdk_error)?;
    adapters.into_iter().next().ok_or(SdkError::NoAdapter)
}

/// Manufacturer data flattened as company id (little endian) then payload,
/// ordered by company id
fn advertisement_bytes(manufacturer_data: &HashMap<u16, Vec<u8>>) -> Vec<u8> {
    let ordered: BTreeMap<_, _> = manufacturer_data.iter().collect();
    let mut bytes = Vec::new();
    for (company, data) in ordered {
        bytes.extend_from_slice(&company.to_le_bytes());
        bytes.extend_from_slice(data);
    }
    bytes
}

/// Some platforms (CoreBluetooth) hide the address and report all zeroes
fn mac_of(address: BDAddr) -> Option<String> {
    (address != BDAddr::default()).then(|| address.to_string())
}

pub struct BleScanner {
    adapter: Adapter,
    classifier: Classifier,
    forwarder: Mutex<Option<JoinHandle<()>>>,
}

impl BleScanner {
    pub async fn new(classifier: Classifier) -> Result<Self, SdkError> {
        let adapter = get_adapter().await?;
        Ok(Self::with_adapter(adapter, classifier))
    }

    pub fn with_adapter(adapter: Adapter, classifier: Classifier) -> Self {
        Self {
            adapter,
            classifier,
            forwarder: Mutex::new(None),
        }
    }

    fn forwarder(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.forwarder.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn abort_forwarder(&self) {
        if let Some(handle) = self.forwarder().take() {
            handle.abort();
        }
    }
}

async fn sighting_of(adapter: &Adapter, id: &PeripheralId) -> Result<Option<Sighting>, btleplug::Error> {
    let peripheral = adapter.peripheral(id).await?;
    let Some(props) = peripheral.properties().await? else {
        return Ok(None);
    };
    Ok(Some(Sighting {
        mac_address: mac_of(props.address),
        peripheral_id: format!("{id:?}"),
        name: props.local_name,
        rssi: props.rssi.unwrap_or(i16::MIN),
        advertisement: advertisement_bytes(&props.manufacturer_data),
    }))
}

async fn forward(
    adapter: Adapter,
    classifier: Classifier,
    mut events: AdapterEvents,
    tx: mpsc::Sender<DiscoveryEvent>,
) {
    while let Some(event) = events.next().await {
        let id = match event {
            CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => id,
            _ => continue,
        };
        let event = match sighting_of(&adapter, &id).await {
            Ok(Some(sighting)) => {
                let kind = classifier.classify(sighting.name.as_deref());
                DiscoveryEvent::Found(kind, sighting)
            }
            Ok(None) => continue,
            Err(e) => {
                log::debug!("skipping {id:?}: {e}");
                continue;
            }
        };
        if tx.send(event).await.is_err() {
            log::debug!("discovery receiver dropped");
            break;
        }
    }
}

impl Scanner for BleScanner {
    async fn discover(&self) -> Result<mpsc::Receiver<DiscoveryEvent>, SdkError> {
        self.abort_forwarder();

        let events = self.adapter.events().await.map_err(sdk_error)?;
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let handle = tokio::spawn(forward(self.adapter.clone(), self.classifier.clone(), events, tx));

        if let Err(e) = self.adapter.start_scan(ScanFilter::default()).await {
            handle.abort();
            return Err(sdk_error(e));
        }
        log::info!("bluetooth scan started");

        *self.forwarder() = Some(handle);
        Ok(rx)
    }

    async fn stop_discovery(&self) -> Result<(), SdkError> {
        self.abort_forwarder();
        self.adapter.stop_scan().await.map_err(sdk_error)?;
        log::info!("bluetooth scan stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manufacturer_data_is_ordered() {
        let mut data = HashMap::new();
        data.insert(0x0059, vec![0xAA]);
        data.insert(0x004C, vec![0x01, 0x02]);
        assert_eq!(advertisement_bytes(&data), vec![0x4C, 0x00, 0x01, 0x02, 0x59, 0x00, 0xAA]);
        assert!(advertisement_bytes(&HashMap::new()).is_empty());
    }

    #[test]
    fn hidden_address_is_no_mac() {
        assert_eq!(mac_of(BDAddr::default()), None);
        let addr = BDAddr::from([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
        assert_eq!(mac_of(addr), Some("AA:BB:CC:DD:EE:FF".to_string()));
    }
}
