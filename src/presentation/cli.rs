use crate::domain::command::VehicleAction;
use crate::domain::settings::Settings;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "vehicle-ble-shell",
    version,
    about = "Control vehicles over Bluetooth LE."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Private key used to authenticate vehicle commands
    #[arg(long, global = true, value_name = "PATH")]
    pub key: Option<PathBuf>,

    /// Seconds to listen for vehicle advertisements
    #[arg(long, global = true, value_name = "SECS")]
    pub scan_timeout: Option<u64>,

    /// Log filter, e.g. "debug" or "vehicle_ble_shell=trace"
    #[arg(long, global = true, value_name = "FILTER")]
    pub log_level: Option<String>,

    /// Settings file to use instead of the per-user one
    #[arg(long, global = true, value_name = "PATH")]
    pub settings: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Pair with a vehicle using a Bluetooth address
    Pair {
        /// Bluetooth address of the vehicle
        address: Option<String>,
    },
    /// Scan for nearby vehicles
    Scan,
    /// Lock the vehicle
    Lock,
    /// Unlock the vehicle
    Unlock,
    /// Open the vehicle's trunk
    Trunk,
    /// Open the vehicle's front trunk
    Frunk,
    /// Open or close the vehicle's charge port
    Charge {
        #[command(subcommand)]
        action: ChargeCommand,
    },
    /// Check the VIN for compatibility with the BLE protocol
    Check {
        /// The VIN to be checked
        vin: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum ChargeCommand {
    /// Open the vehicle's charge port
    Open,
    /// Close the vehicle's charge port
    Close,
}

/// What the setup phase is asked to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupRequest {
    Scan,
    Pair { address: Option<String> },
    Check { vin: String },
    /// A vehicle command given before any vehicle is paired
    Vehicle(VehicleAction),
}

impl From<Command> for SetupRequest {
    fn from(command: Command) -> Self {
        match command {
            Command::Pair { address } => Self::Pair { address },
            Command::Scan => Self::Scan,
            Command::Check { vin } => Self::Check { vin },
            Command::Lock => Self::Vehicle(VehicleAction::Lock),
            Command::Unlock => Self::Vehicle(VehicleAction::Unlock),
            Command::Trunk => Self::Vehicle(VehicleAction::OpenTrunk),
            Command::Frunk => Self::Vehicle(VehicleAction::OpenFrunk),
            Command::Charge {
                action: ChargeCommand::Open,
            } => Self::Vehicle(VehicleAction::OpenChargePort),
            Command::Charge {
                action: ChargeCommand::Close,
            } => Self::Vehicle(VehicleAction::CloseChargePort),
        }
    }
}

impl Cli {
    /// Command line options win over the settings file
    pub fn apply_overrides(&self, settings: &mut Settings) {
        if let Some(key) = &self.key {
            settings.private_key_path = key.clone();
        }
        if let Some(timeout) = self.scan_timeout {
            settings.scan_timeout_secs = timeout;
        }
    }
}

/// Command reference printed by `help`
pub fn help_text() -> String {
    let mut text = Cli::command().render_help().to_string();
    text.push_str("\nInteractive commands:\n");
    for action in VehicleAction::ALL {
        text.push_str(&format!("  {:<14}{}\n", action.token(), action.description()));
    }
    text.push_str(&format!("  {:<14}{}\n", "check", "Check a VIN for compatibility"));
    text.push_str(&format!("  {:<14}{}\n", "help", "Show this help"));
    text.push_str(&format!("  {:<14}{}\n", "exit", "Disconnect and quit"));
    text
}
