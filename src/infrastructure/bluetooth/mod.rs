//! Bluetooth Module
//!
//! Provides BLE communication with the vehicle.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    BluetoothService                      │
//! │   (VehicleLink - blocking facade over a tokio runtime)   │
//! └─────────────────────┬───────────────────────────────────┘
//!                       │
//!         ┌─────────────┼─────────────┬─────────────┐
//!         │             │             │             │
//!         ▼             ▼             ▼             ▼
//! ┌───────────┐  ┌────────────┐  ┌──────────┐  ┌──────────┐
//! │  Scanner  │  │ Connection │  │ Protocol │  │  Signer  │
//! │           │  │            │  │          │  │          │
//! │ - BLE     │  │ - Retries  │  │ - UUIDs  │  │ - Sealed │
//! │ discovery │  │ - GATT     │  │ - Names  │  │  payloads│
//! │           │  │   access   │  │ - Framing│  │          │
//! └───────────┘  └────────────┘  └──────────┘  └──────────┘
//! ```
//!
//! ## Modules
//!
//! - [`protocol`] - GATT UUIDs, advertisement names and message framing
//! - [`scanner`] - BLE device discovery
//! - [`connection`] - Peripheral lookup, connection retries and characteristic discovery
//! - [`signer`] - Hand-off to the program that authenticates vehicle actions
//! - [`service`] - Main service coordinator and the connected vehicle handle

pub mod connection;
pub mod protocol;
pub mod scanner;
pub mod service;
pub mod signer;

// Re-export main service for convenience
pub use service::BluetoothService;
