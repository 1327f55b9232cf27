//! BLE Connection Module
//!
//! Handles peripheral lookup, connection and GATT characteristic access.

use crate::domain::error::VehicleError;
use crate::infrastructure::bluetooth::protocol::{self, MessageAssembler};
use crate::infrastructure::bluetooth::scanner;
use btleplug::api::{Central, Characteristic, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Peripheral};
use futures::StreamExt;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Interval between peripheral list checks while waiting for a vehicle to advertise
const LOOKUP_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Configuration for connection behavior
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Maximum connection attempts
    pub max_retries: u32,
    /// Delay between connection attempts in milliseconds
    pub retry_delay_ms: u64,
    /// How long to scan for an address that is not cached yet
    pub lookup_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 1000,
            lookup_timeout: Duration::from_secs(5),
        }
    }
}

/// Result of a successful connection
pub struct ConnectionResult {
    pub peripheral: Peripheral,
    pub name: String,
    pub address: String,
    pub tx_characteristic: Characteristic,
    /// Reads vehicle responses until the connection drops
    pub notification_task: Option<JoinHandle<()>>,
}

/// BLE Connection handler
pub struct BleConnection {
    adapter: Adapter,
    config: ConnectionConfig,
}

impl BleConnection {
    /// Create a new connection handler
    pub fn new(adapter: Adapter, config: ConnectionConfig) -> Self {
        Self { adapter, config }
    }

    /// Connect to a vehicle by Bluetooth address
    pub async fn connect(&self, address: &str) -> Result<ConnectionResult, VehicleError> {
        let address = protocol::normalize_address(address);
        info!("Connecting to vehicle at {}", address);

        // Step 1: Find the peripheral
        let peripheral = self.find_peripheral(&address).await?;

        // Step 2: Connect
        self.connect_with_retry(&peripheral).await?;

        // Step 3: Get GATT characteristics
        peripheral.discover_services().await?;
        let (tx_char, rx_char) = find_characteristics(&peripheral)?;

        // Step 4: Subscribe to responses; commands still go out without them
        let notification_task = match self.enable_notifications(&peripheral, &rx_char).await {
            Ok(task) => Some(task),
            Err(e) => {
                warn!("Could not enable notifications: {}. Continuing without responses.", e);
                None
            }
        };

        let name = match peripheral.properties().await? {
            Some(properties) => scanner::display_name(properties.local_name.as_deref()),
            None => scanner::display_name(None),
        };
        info!("Connected to {} at {}", name, address);

        Ok(ConnectionResult {
            peripheral,
            name,
            address,
            tx_characteristic: tx_char,
            notification_task,
        })
    }

    /// Look in the adapter cache first, then scan until the address shows up
    async fn find_peripheral(&self, address: &str) -> Result<Peripheral, VehicleError> {
        if let Some(peripheral) = self.cached_peripheral(address).await? {
            return Ok(peripheral);
        }

        info!(
            "{} not cached, scanning for up to {:?}",
            address, self.config.lookup_timeout
        );
        self.adapter.start_scan(ScanFilter::default()).await?;

        let deadline = tokio::time::Instant::now() + self.config.lookup_timeout;
        let found = loop {
            if let Some(peripheral) = self.cached_peripheral(address).await? {
                break Some(peripheral);
            }
            if tokio::time::Instant::now() >= deadline {
                break None;
            }
            tokio::time::sleep(LOOKUP_POLL_INTERVAL).await;
        };

        self.adapter.stop_scan().await?;
        found.ok_or_else(|| VehicleError::NotFound(address.to_string()))
    }

    async fn cached_peripheral(&self, address: &str) -> Result<Option<Peripheral>, VehicleError> {
        for peripheral in self.adapter.peripherals().await? {
            let known = scanner::peripheral_address(&peripheral, peripheral.address());
            if protocol::normalize_address(&known) == address {
                return Ok(Some(peripheral));
            }
        }
        Ok(None)
    }

    async fn connect_with_retry(&self, peripheral: &Peripheral) -> Result<(), VehicleError> {
        if peripheral.is_connected().await? {
            info!("Peripheral already connected");
            return Ok(());
        }

        let attempts = self.config.max_retries.max(1);
        for attempt in 1..=attempts {
            info!("Connection attempt {}/{}...", attempt, attempts);
            match peripheral.connect().await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < attempts => {
                    warn!("Connection attempt {} failed: {}", attempt, e);
                    tokio::time::sleep(Duration::from_millis(self.config.retry_delay_ms)).await;
                }
                Err(e) => {
                    error!("Failed to connect after {} attempts", attempt);
                    return Err(e.into());
                }
            }
        }

        Err(VehicleError::NotConnected)
    }

    /// Subscribe to the RX characteristic and log every complete response
    ///
    /// The reader task runs on the runtime's worker thread, independent of
    /// the caller's `block_on`.
    async fn enable_notifications(
        &self,
        peripheral: &Peripheral,
        rx_char: &Characteristic,
    ) -> Result<JoinHandle<()>, VehicleError> {
        info!("Enabling notifications...");
        peripheral.subscribe(rx_char).await?;
        let mut notifications = peripheral.notifications().await?;

        let task = tokio::spawn(async move {
            let mut assembler = MessageAssembler::new();
            while let Some(notification) = notifications.next().await {
                if notification.uuid != protocol::RX_CHAR_UUID {
                    continue;
                }
                for message in assembler.push(&notification.value) {
                    debug!("Received {} byte response from vehicle", message.len());
                }
            }
            debug!("Notification stream closed");
        });

        info!("Notifications enabled successfully");
        Ok(task)
    }
}

/// Locate the write (TX) and notify (RX) characteristics
fn find_characteristics(
    peripheral: &Peripheral,
) -> Result<(Characteristic, Characteristic), VehicleError> {
    let characteristics = peripheral.characteristics();
    info!("Found {} characteristics", characteristics.len());

    let find = |uuid| {
        characteristics
            .iter()
            .find(|c| c.uuid == uuid)
            .cloned()
            .ok_or(VehicleError::MissingCharacteristic(uuid))
    };

    Ok((find(protocol::TX_CHAR_UUID)?, find(protocol::RX_CHAR_UUID)?))
}
