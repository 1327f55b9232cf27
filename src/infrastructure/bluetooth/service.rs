//! Bluetooth Service Module
//!
//! Blocking [`VehicleLink`] over btleplug. The async BLE calls are driven on
//! a private tokio runtime, so callers see plain synchronous calls. The
//! runtime has one worker thread so notification tasks keep draining while
//! the shell is blocked on console input.

use crate::domain::command::VehicleAction;
use crate::domain::error::VehicleError;
use crate::domain::models::{ConnectionStatus, ScannedDevice};
use crate::domain::settings::Settings;
use crate::domain::vehicle::{Vehicle, VehicleLink};
use crate::infrastructure::bluetooth::{
    connection::{BleConnection, ConnectionConfig},
    protocol,
    scanner::BleScanner,
    signer::{self, CommandSigner},
};
use btleplug::api::{Characteristic, Manager as _, Peripheral as _, WriteType};
use btleplug::platform::{Adapter, Manager, Peripheral};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Runtime with a single worker, so spawned tasks run outside `block_on`
fn build_runtime() -> std::io::Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
}

/// Main Bluetooth service coordinating all BLE operations
pub struct BluetoothService {
    runtime: Arc<Runtime>,
    scanner: BleScanner,
    connection: BleConnection,
    scan_timeout: Duration,
    show_all_devices: bool,
    signer: Rc<dyn CommandSigner>,
}

impl BluetoothService {
    /// Open the first Bluetooth adapter and apply the scan/connect settings
    pub fn new(settings: &Settings) -> Result<Self, VehicleError> {
        let runtime = build_runtime()?;
        let adapter = runtime.block_on(first_adapter())?;

        let scan_timeout = Duration::from_secs(settings.scan_timeout_secs);
        let config = ConnectionConfig {
            max_retries: settings.connect_max_retries,
            retry_delay_ms: settings.connect_retry_delay_ms,
            lookup_timeout: scan_timeout,
        };

        if !settings.private_key_path.exists() {
            warn!(
                "Private key {} not found; vehicle commands will be rejected",
                settings.private_key_path.display()
            );
        }
        let signer = signer::signer_from_settings(
            settings.signer_command.as_deref(),
            &settings.signer_args,
            settings.private_key_path.clone(),
        );

        Ok(Self {
            runtime: Arc::new(runtime),
            scanner: BleScanner::new(adapter.clone()),
            connection: BleConnection::new(adapter, config),
            scan_timeout,
            show_all_devices: settings.show_all_devices,
            signer: Rc::from(signer),
        })
    }
}

async fn first_adapter() -> Result<Adapter, VehicleError> {
    let manager = Manager::new().await?;
    let adapter = manager
        .adapters()
        .await?
        .into_iter()
        .next()
        .ok_or(VehicleError::NoAdapter)?;
    info!("Using Bluetooth adapter");
    Ok(adapter)
}

impl VehicleLink for BluetoothService {
    type Vehicle = BleVehicle;

    fn scan(&mut self) -> Result<Vec<ScannedDevice>, VehicleError> {
        self.runtime
            .block_on(self.scanner.scan(self.scan_timeout, self.show_all_devices))
    }

    fn connect(&mut self, address: &str) -> Result<BleVehicle, VehicleError> {
        let result = self.runtime.block_on(self.connection.connect(address))?;

        Ok(BleVehicle {
            runtime: self.runtime.clone(),
            peripheral: result.peripheral,
            tx_characteristic: result.tx_characteristic,
            name: result.name,
            address: result.address,
            status: ConnectionStatus::Connected,
            notification_task: result.notification_task,
            signer: self.signer.clone(),
        })
    }
}

/// A connected vehicle
pub struct BleVehicle {
    runtime: Arc<Runtime>,
    peripheral: Peripheral,
    tx_characteristic: Characteristic,
    name: String,
    address: String,
    status: ConnectionStatus,
    notification_task: Option<JoinHandle<()>>,
    signer: Rc<dyn CommandSigner>,
}

impl Vehicle for BleVehicle {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn address(&self) -> String {
        self.address.clone()
    }

    fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
            && self
                .runtime
                .block_on(self.peripheral.is_connected())
                .unwrap_or(false)
    }

    fn perform(&mut self, action: VehicleAction) -> Result<(), VehicleError> {
        if !self.is_connected() {
            self.status = ConnectionStatus::Disconnected;
            return Err(VehicleError::NotConnected);
        }

        let body = self.signer.seal(action)?;
        let framed = protocol::frame_message(&body)?;

        info!("Sending '{}' ({} bytes) to {}", action, framed.len(), self.address);
        let sent = self.runtime.block_on(self.peripheral.write(
            &self.tx_characteristic,
            &framed,
            WriteType::WithResponse,
        ));
        if let Err(e) = sent {
            self.status = ConnectionStatus::Error;
            return Err(e.into());
        }

        info!("{} sent", action.description());
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), VehicleError> {
        if let Some(task) = self.notification_task.take() {
            task.abort();
        }

        self.status = ConnectionStatus::Disconnected;
        self.runtime.block_on(self.peripheral.disconnect())?;
        info!("Disconnected from {}", self.address);
        Ok(())
    }
}
