use crate::domain::command::VehicleAction;
use thiserror::Error;

/// Failures reported by the BLE collaborator
#[derive(Debug, Error)]
pub enum VehicleError {
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    #[error("no Bluetooth adapter available")]
    NoAdapter,

    #[error("no vehicle found at {0}")]
    NotFound(String),

    #[error("vehicle is not connected")]
    NotConnected,

    #[error("vehicle characteristic {0} not found")]
    MissingCharacteristic(uuid::Uuid),

    #[error("no command signer configured, cannot send '{0}'")]
    SignerUnavailable(VehicleAction),

    #[error("command signer failed: {0}")]
    Signer(String),

    #[error("message too long: max {max} bytes, got {actual}")]
    MessageTooLong { max: usize, actual: usize },

    #[error("runtime error: {0}")]
    Runtime(#[from] std::io::Error),
}

/// Reasons the setup phase ends the run early
///
/// Each one is reported to the user and the process still exits normally.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("No vehicles found.")]
    NoVehiclesFound,

    #[error("Failed to connect.")]
    ConnectFailed(#[source] VehicleError),

    #[error("Invalid choice.")]
    InvalidChoice(String),

    #[error("{0}")]
    InvalidVin(#[from] crate::domain::vin::VinError),

    #[error("Please scan and pair with a vehicle first.")]
    NotPaired,

    #[error("Bluetooth unavailable: {0}")]
    BluetoothUnavailable(#[source] VehicleError),

    #[error("Scan failed: {0}")]
    ScanFailed(#[source] VehicleError),

    #[error("input error: {0}")]
    Io(#[from] std::io::Error),
}
