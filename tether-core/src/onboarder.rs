//! Onboarding driver - runs each onboarding operation against the SDK
//!
//! Thin glue over [`OnboardingSession`]: begin the attempt, await the SDK,
//! finish the attempt. The session decides what the result means.

use std::sync::Arc;

use tether_sdk::{DeviceSdk, SdkError, SyncRequest, SyncTick};

use crate::config::TetherConfig;
use crate::discovery::DiscoveredDevice;
use crate::onboarding::{OnboardingError, OnboardingSession, OnboardingStep, SyncState};

pub struct Onboarder<S> {
    sdk: Arc<S>,
    session: OnboardingSession,
    wifi_interface: u8,
    wifi_scan_secs: u32,
}

impl<S: DeviceSdk> Onboarder<S> {
    pub fn new(sdk: Arc<S>, config: &TetherConfig) -> Self {
        Self {
            sdk,
            session: OnboardingSession::new(),
            wifi_interface: config.wifi_interface,
            wifi_scan_secs: config.wifi_scan_secs,
        }
    }

    pub fn session(&self) -> &OnboardingSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut OnboardingSession {
        &mut self.session
    }

    pub fn advance(&mut self) -> Result<OnboardingStep, OnboardingError> {
        self.session.advance()
    }

    pub fn retreat(&mut self) -> Result<OnboardingStep, OnboardingError> {
        self.session.retreat()
    }

    pub fn jump_to(&mut self, step: OnboardingStep) -> Result<OnboardingStep, OnboardingError> {
        self.session.jump_to(step)
    }

    pub fn select_device(&mut self, device: DiscoveredDevice) {
        self.session.select_device(device);
    }

    pub async fn connect(&mut self) -> Result<(), OnboardingError> {
        let (attempt, peripheral) = self.session.begin_connect()?;
        let result = self.sdk.connect(&peripheral).await;
        self.session.finish_connect(attempt, result)
    }

    pub async fn check_network(&mut self) -> Result<(), OnboardingError> {
        let attempt = self.session.begin_network_check()?;
        let result = self.sdk.network_connectivity().await;
        self.session.finish_network_check(attempt, result)
    }

    pub async fn scan_wifi(&mut self) -> Result<(), OnboardingError> {
        let attempt = self.session.begin_wifi_scan()?;
        let result = self.sdk.scan_wifi(self.wifi_interface, self.wifi_scan_secs).await;
        self.session.finish_wifi_scan(attempt, result)
    }

    pub async fn connect_wifi(&mut self, ssid: &str, password: &str) -> Result<(), OnboardingError> {
        let attempt = self.session.begin_connect_wifi(ssid)?;
        let result = self.sdk.connect_wifi(self.wifi_interface, ssid.trim(), password).await;
        self.session.finish_connect_wifi(attempt, result)
    }

    /// Sync the device to the cloud, consuming progress until a terminal tick
    ///
    /// `on_progress` sees every non-terminal percentage. An empty label in
    /// `request` is filled from the session's device label.
    pub async fn sync_to_cloud(
        &mut self,
        mut request: SyncRequest,
        mut on_progress: impl FnMut(i32),
    ) -> Result<(), OnboardingError> {
        let (attempt, label) = self.session.begin_sync(&request.label)?;
        request.label = label;
        let mut ticks = self.sdk.sync_device_to_cloud(request).await;

        loop {
            let tick = match ticks.recv().await {
                Some(tick) => tick,
                None => SyncTick::failed(SdkError::Aborted("progress stream closed".to_string())),
            };
            match self.session.apply_sync_tick(&attempt, tick)? {
                SyncState::InProgress(p) => on_progress(p),
                SyncState::Complete => return Ok(()),
                SyncState::Failed(e) => return Err(e),
            }
        }
    }

    /// Drop the device connection and the state that depended on it
    pub async fn disconnect(&mut self) {
        if self.session.is_connected() {
            if let Err(e) = self.sdk.disconnect().await {
                log::warn!("disconnect failed: {e}");
            }
        }
        self.session.disconnect();
    }

    pub async fn reset(&mut self) {
        self.disconnect().await;
        self.session.reset();
    }
}
