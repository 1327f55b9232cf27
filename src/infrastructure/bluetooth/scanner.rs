//! BLE Scanner Module
//!
//! Handles Bluetooth LE discovery of vehicles.

use crate::domain::error::VehicleError;
use crate::domain::models::ScannedDevice;
use crate::infrastructure::bluetooth::protocol;
use btleplug::api::{BDAddr, Central, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Peripheral};
use std::cmp::Reverse;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

/// BLE Scanner for discovering vehicles
pub struct BleScanner {
    adapter: Adapter,
}

impl BleScanner {
    /// Create a new scanner
    pub fn new(adapter: Adapter) -> Self {
        Self { adapter }
    }

    /// Scan for `timeout` and return what was seen, strongest signal first
    ///
    /// # Arguments
    /// * `timeout` - How long to listen for advertisements
    /// * `show_all_devices` - If true, list every BLE device instead of vehicles only
    pub async fn scan(
        &self,
        timeout: Duration,
        show_all_devices: bool,
    ) -> Result<Vec<ScannedDevice>, VehicleError> {
        info!(
            "Starting BLE scan for {:?} (service UUID {})",
            timeout,
            protocol::SERVICE_UUID
        );

        // Vehicles do not always put the service UUID in their advertisement,
        // so the filter is applied to names as well after the scan
        self.adapter.start_scan(ScanFilter::default()).await?;
        tokio::time::sleep(timeout).await;
        self.adapter.stop_scan().await?;

        let mut devices = Vec::new();
        for peripheral in self.adapter.peripherals().await? {
            let Some(properties) = peripheral.properties().await? else {
                continue;
            };

            let local_name = properties.local_name.as_deref();
            if !show_all_devices && !is_vehicle(local_name, &properties.services) {
                continue;
            }

            let device = ScannedDevice {
                name: display_name(local_name),
                address: peripheral_address(&peripheral, properties.address),
                signal_strength: properties.rssi,
            };
            debug!("Found {} ({:?} dBm)", device, device.signal_strength);
            devices.push(device);
        }

        devices.sort_by_key(|device| Reverse(device.signal_strength));
        info!("Scan finished, {} device(s) found", devices.len());
        Ok(devices)
    }
}

/// Match on the advertised name or the vehicle service UUID
pub fn is_vehicle(local_name: Option<&str>, services: &[Uuid]) -> bool {
    local_name.is_some_and(protocol::is_vehicle_name) || services.contains(&protocol::SERVICE_UUID)
}

pub fn display_name(local_name: Option<&str>) -> String {
    match local_name {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => "Unknown".to_string(),
    }
}

/// Address shown to the user and accepted by `pair`
///
/// Platforms that hide the MAC (CoreBluetooth) report an all-zero address;
/// the platform peripheral id is used instead.
pub fn peripheral_address(peripheral: &Peripheral, address: BDAddr) -> String {
    if address == BDAddr::from([0u8; 6]) {
        format!("{:?}", peripheral.id())
    } else {
        address.to_string()
    }
}
