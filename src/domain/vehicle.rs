//! Capability surface of the BLE collaborator
//!
//! The dispatcher only talks to these traits. Transport, pairing keys and
//! message authentication live behind them.

use crate::domain::command::VehicleAction;
use crate::domain::error::VehicleError;
use crate::domain::models::ScannedDevice;
use tracing::{info, warn};

/// A connected vehicle
pub trait Vehicle {
    fn name(&self) -> String;

    fn address(&self) -> String;

    fn is_connected(&self) -> bool;

    /// Send one single-shot operation
    fn perform(&mut self, action: VehicleAction) -> Result<(), VehicleError>;

    fn disconnect(&mut self) -> Result<(), VehicleError>;

    fn lock(&mut self) -> Result<(), VehicleError> {
        self.perform(VehicleAction::Lock)
    }

    fn unlock(&mut self) -> Result<(), VehicleError> {
        self.perform(VehicleAction::Unlock)
    }

    fn open_trunk(&mut self) -> Result<(), VehicleError> {
        self.perform(VehicleAction::OpenTrunk)
    }

    fn open_frunk(&mut self) -> Result<(), VehicleError> {
        self.perform(VehicleAction::OpenFrunk)
    }

    fn open_charge_port(&mut self) -> Result<(), VehicleError> {
        self.perform(VehicleAction::OpenChargePort)
    }

    fn close_charge_port(&mut self) -> Result<(), VehicleError> {
        self.perform(VehicleAction::CloseChargePort)
    }
}

/// Discovery and connection
pub trait VehicleLink {
    type Vehicle: Vehicle;

    /// Enumerate nearby vehicles
    fn scan(&mut self) -> Result<Vec<ScannedDevice>, VehicleError>;

    fn connect(&mut self, address: &str) -> Result<Self::Vehicle, VehicleError>;
}

impl<K: VehicleLink + ?Sized> VehicleLink for &mut K {
    type Vehicle = K::Vehicle;

    fn scan(&mut self) -> Result<Vec<ScannedDevice>, VehicleError> {
        (**self).scan()
    }

    fn connect(&mut self, address: &str) -> Result<Self::Vehicle, VehicleError> {
        (**self).connect(address)
    }
}

/// Owns the single live vehicle handle
///
/// The handle is disconnected exactly once: by [`VehicleSession::close`], or
/// by `Drop` on any path that skips it.
#[derive(Debug)]
pub struct VehicleSession<V: Vehicle> {
    vehicle: Option<V>,
}

impl<V: Vehicle> VehicleSession<V> {
    pub fn new(vehicle: V) -> Self {
        Self {
            vehicle: Some(vehicle),
        }
    }

    pub fn vehicle(&self) -> Option<&V> {
        self.vehicle.as_ref()
    }

    pub fn vehicle_mut(&mut self) -> Option<&mut V> {
        self.vehicle.as_mut()
    }

    /// Disconnect now and hand back the released vehicle
    pub fn close(mut self) -> Result<V, VehicleError> {
        match self.vehicle.take() {
            Some(mut vehicle) => vehicle.disconnect().map(|_| vehicle),
            None => Err(VehicleError::NotConnected),
        }
    }
}

impl<V: Vehicle> Drop for VehicleSession<V> {
    fn drop(&mut self) {
        if let Some(mut vehicle) = self.vehicle.take() {
            info!("Releasing vehicle {} on scope exit", vehicle.address());
            if let Err(e) = vehicle.disconnect() {
                warn!("Failed to disconnect from {}: {}", vehicle.address(), e);
            }
        }
    }
}
