//! Scripted stand-in for the device SDK

#![allow(dead_code)]

use std::sync::Mutex;

use tether_core::tether_sdk::{
    CertificateKind, CloudRequest, ConnectInfo, ConnectivityRecord, ControlTarget, DeviceKind, DeviceSdk,
    DiscoveryEvent, LinkReport, LinkState, OpaqueState, Route, Scanner, SdkError, Sighting, SyncRequest, SyncTick,
    WifiNetwork,
};
use tokio::sync::mpsc;

pub fn init_env_logger() {
    let _ = env_logger::try_init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );
}

pub const MAC: &str = "AA:BB:CC:DD:EE:FF";

pub fn sighting(mac: Option<&str>, peripheral: &str, rssi: i16) -> Sighting {
    Sighting {
        mac_address: mac.map(str::to_string),
        peripheral_id: peripheral.to_string(),
        name: Some(format!("Tether-A {peripheral}")),
        rssi,
        advertisement: vec![0x02, 0x01, 0x06],
    }
}

/// Results the mock hands back, one field per SDK call
pub struct Script {
    pub discover: Result<(), SdkError>,
    pub connect: Result<ConnectInfo, SdkError>,
    pub connectivity: Result<Vec<ConnectivityRecord>, SdkError>,
    pub wifi_networks: Result<Vec<WifiNetwork>, SdkError>,
    pub connect_wifi: Result<(), SdkError>,
    pub sync_ticks: Vec<SyncTick>,
    pub control: Result<i32, SdkError>,
    pub device_state: Result<String, SdkError>,
    pub log_blocks: Result<u32, SdkError>,
    pub certificate_chunks: u32,
    pub certificate: Result<(), SdkError>,
    pub cloud_body: Result<Vec<u8>, SdkError>,
    pub link_report: Result<LinkReport, SdkError>,
    pub connect_cloud: Result<(), SdkError>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            discover: Ok(()),
            connect: Ok(ConnectInfo { mac_address: Some(MAC.to_string()), provision_status: 0 }),
            connectivity: Ok(vec![ConnectivityRecord {
                wifi_connected: false,
                cloud_connected: false,
                ssid: None,
                rssi: None,
            }]),
            wifi_networks: Ok(vec![WifiNetwork { ssid: "HomeNet".to_string() }]),
            connect_wifi: Ok(()),
            sync_ticks: vec![SyncTick::progress(50), SyncTick::progress(100)],
            control: Ok(0),
            device_state: Ok("{power: on}".to_string()),
            log_blocks: Ok(3),
            certificate_chunks: 4,
            certificate: Ok(()),
            cloud_body: Ok(b"[]".to_vec()),
            link_report: Ok(LinkReport { short_range: LinkState::Connected, cloud: LinkState::Disconnected }),
            connect_cloud: Ok(()),
        }
    }
}

#[derive(Default)]
pub struct MockSdk {
    pub script: Mutex<Script>,
    /// One line per SDK call, in call order
    pub calls: Mutex<Vec<String>>,
    scan_tx: Mutex<Option<mpsc::Sender<DiscoveryEvent>>>,
}

impl MockSdk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(script: Script) -> Self {
        Self { script: Mutex::new(script), ..Self::default() }
    }

    pub fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn log(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    /// Push a scan event into the running discovery stream
    pub async fn emit(&self, event: DiscoveryEvent) {
        let tx = self.scan_tx.lock().unwrap().clone();
        if let Some(tx) = tx {
            let _ = tx.send(event).await;
        }
    }

    pub async fn found(&self, kind: DeviceKind, sighting: Sighting) {
        self.emit(DiscoveryEvent::Found(kind, sighting)).await;
    }

    /// Close the discovery stream from the scanner side
    pub fn close_scan(&self) {
        self.scan_tx.lock().unwrap().take();
    }
}

impl Scanner for MockSdk {
    async fn discover(&self) -> Result<mpsc::Receiver<DiscoveryEvent>, SdkError> {
        self.log("discover");
        self.script().discover.clone()?;
        let (tx, rx) = mpsc::channel(32);
        *self.scan_tx.lock().unwrap() = Some(tx);
        Ok(rx)
    }

    async fn stop_discovery(&self) -> Result<(), SdkError> {
        self.log("stop_discovery");
        self.scan_tx.lock().unwrap().take();
        Ok(())
    }
}

impl DeviceSdk for MockSdk {
    async fn connect(&self, peripheral_id: &str) -> Result<ConnectInfo, SdkError> {
        self.log(format!("connect {peripheral_id}"));
        self.script().connect.clone()
    }

    async fn disconnect(&self) -> Result<(), SdkError> {
        self.log("disconnect");
        Ok(())
    }

    async fn network_connectivity(&self) -> Result<Vec<ConnectivityRecord>, SdkError> {
        self.log("network_connectivity");
        self.script().connectivity.clone()
    }

    async fn scan_wifi(&self, interface: u8, duration_secs: u32) -> Result<Vec<WifiNetwork>, SdkError> {
        self.log(format!("scan_wifi {interface} {duration_secs}"));
        self.script().wifi_networks.clone()
    }

    async fn connect_wifi(&self, interface: u8, ssid: &str, password: &str) -> Result<(), SdkError> {
        self.log(format!("connect_wifi {interface} {ssid} {password:?}"));
        self.script().connect_wifi.clone()
    }

    async fn sync_device_to_cloud(&self, request: SyncRequest) -> mpsc::Receiver<SyncTick> {
        self.log(format!("sync {}", request.label));
        let ticks = self.script().sync_ticks.clone();
        let (tx, rx) = mpsc::channel(ticks.len().max(1));
        for tick in ticks {
            let _ = tx.try_send(tick);
        }
        rx
    }

    async fn control(
        &self,
        target: &ControlTarget,
        elements: &[i64],
        values: &[i64],
        route: Route,
    ) -> Result<i32, SdkError> {
        self.log(format!("control {target:?} {elements:?} {values:?} {route}"));
        self.script().control.clone()
    }

    async fn device_state(&self, device_id: &str) -> Result<OpaqueState, SdkError> {
        self.log(format!("device_state {device_id}"));
        self.script().device_state.clone().map(OpaqueState)
    }

    async fn log_block_count(&self, device_id: &str) -> Result<u32, SdkError> {
        self.log(format!("log_block_count {device_id}"));
        self.script().log_blocks.clone()
    }

    async fn send_certificate(
        &self,
        kind: CertificateKind,
        payload: &[u8],
        progress: &mut (dyn FnMut(u32, u32) + Send),
    ) -> Result<(), SdkError> {
        self.log(format!("send_certificate {kind:?} {}", payload.len()));
        let (chunks, result) = {
            let script = self.script();
            (script.certificate_chunks, script.certificate.clone())
        };
        for i in 1..=chunks {
            progress(i, chunks);
        }
        result
    }

    async fn cloud_request(&self, request: &CloudRequest) -> Result<Vec<u8>, SdkError> {
        self.log(format!("cloud {:?} {}", request.method, request.path));
        self.script().cloud_body.clone()
    }

    async fn link_report(&self, device_id: &str) -> Result<LinkReport, SdkError> {
        self.log(format!("link_report {device_id}"));
        self.script().link_report.clone()
    }

    async fn connect_cloud(&self) -> Result<(), SdkError> {
        self.log("connect_cloud");
        self.script().connect_cloud.clone()
    }
}
