// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Vehicle domain events.
//!
//! Every event variant carries a stable string tag (`event_type`) chosen at
//! design time; the outbox stores the tag next to the canonical JSON payload
//! and the relay keys its topic lookup on it. Payload field names are
//! camelCase on the wire.

use serde::{Deserialize, Serialize};

/// A state change on the vehicle aggregate, buffered until persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum VehicleEvent {
    /// A vehicle entered the fleet.
    Created(VehicleCreated),
    /// A vehicle reported a new position.
    LocationUpdated(VehicleLocationUpdated),
    /// A vehicle's operational status changed.
    StatusChanged(VehicleStatusChanged),
    /// A vehicle's odometer reading changed.
    MileageUpdated(VehicleMileageUpdated),
    /// A vehicle's fuel level changed.
    FuelLevelUpdated(VehicleFuelLevelUpdated),
}

impl VehicleEvent {
    /// The stable type tag stored in the outbox and used for topic routing.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Created(_) => "VehicleCreated",
            Self::LocationUpdated(_) => "VehicleLocationUpdated",
            Self::StatusChanged(_) => "VehicleStatusChanged",
            Self::MileageUpdated(_) => "VehicleMileageUpdated",
            Self::FuelLevelUpdated(_) => "VehicleFuelLevelUpdated",
        }
    }

    /// The id of the aggregate this event belongs to.
    pub fn vehicle_id(&self) -> &str {
        match self {
            Self::Created(e) => &e.vehicle_id,
            Self::LocationUpdated(e) => &e.vehicle_id,
            Self::StatusChanged(e) => &e.vehicle_id,
            Self::MileageUpdated(e) => &e.vehicle_id,
            Self::FuelLevelUpdated(e) => &e.vehicle_id,
        }
    }

    /// Serialize the payload to canonical JSON bytes.
    pub fn payload_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        match self {
            Self::Created(e) => serde_json::to_vec(e),
            Self::LocationUpdated(e) => serde_json::to_vec(e),
            Self::StatusChanged(e) => serde_json::to_vec(e),
            Self::MileageUpdated(e) => serde_json::to_vec(e),
            Self::FuelLevelUpdated(e) => serde_json::to_vec(e),
        }
    }
}

/// Payload of `VehicleCreated`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleCreated {
    /// Aggregate id.
    pub vehicle_id: String,
    /// Vehicle identification number.
    pub vin: String,
    /// Display name.
    pub vehicle_name: String,
    /// Model designation.
    pub vehicle_model: String,
    /// License plate.
    pub license_number: String,
    /// Initial operational status.
    pub status: String,
    /// Initial latitude.
    pub latitude: f64,
    /// Initial longitude.
    pub longitude: f64,
    /// Initial odometer reading in kilometers.
    pub mileage: f64,
    /// Initial fuel level percentage.
    pub fuel_level: f64,
    /// Aggregate version after creation.
    pub version: i64,
    /// Creation time as a unix timestamp.
    pub timestamp: i64,
}

/// Payload of `VehicleLocationUpdated`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleLocationUpdated {
    /// Aggregate id.
    pub vehicle_id: String,
    /// New latitude.
    pub latitude: f64,
    /// New longitude.
    pub longitude: f64,
    /// New altitude.
    pub altitude: f64,
    /// Unix timestamp of the position sample.
    pub timestamp: i64,
    /// Update time as a unix timestamp.
    pub updated_at: i64,
    /// Aggregate version after the update.
    pub version: i64,
}

/// Payload of `VehicleStatusChanged`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleStatusChanged {
    /// Aggregate id.
    pub vehicle_id: String,
    /// Status before the change.
    pub old_status: String,
    /// Status after the change.
    pub new_status: String,
    /// Change time as a unix timestamp.
    pub changed_at: i64,
    /// Aggregate version after the change.
    pub version: i64,
}

/// Payload of `VehicleMileageUpdated`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleMileageUpdated {
    /// Aggregate id.
    pub vehicle_id: String,
    /// New odometer reading in kilometers.
    pub mileage: f64,
    /// Update time as a unix timestamp.
    pub updated_at: i64,
    /// Aggregate version after the update.
    pub version: i64,
}

/// Payload of `VehicleFuelLevelUpdated`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleFuelLevelUpdated {
    /// Aggregate id.
    pub vehicle_id: String,
    /// New fuel level percentage.
    pub fuel_level: f64,
    /// Whether the new level is below the low-fuel threshold.
    pub is_low: bool,
    /// Update time as a unix timestamp.
    pub updated_at: i64,
    /// Aggregate version after the update.
    pub version: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_uses_camel_case_field_names() {
        let event = VehicleEvent::FuelLevelUpdated(VehicleFuelLevelUpdated {
            vehicle_id: "v1".to_string(),
            fuel_level: 12.0,
            is_low: true,
            updated_at: 1,
            version: 2,
        });

        let json: serde_json::Value =
            serde_json::from_slice(&event.payload_json().unwrap()).unwrap();
        assert_eq!(json["vehicleId"], "v1");
        assert_eq!(json["fuelLevel"], 12.0);
        assert_eq!(json["isLow"], true);
        assert_eq!(json["updatedAt"], 1);
    }

    #[test]
    fn event_type_tags_are_stable() {
        let event = VehicleEvent::StatusChanged(VehicleStatusChanged {
            vehicle_id: "v1".to_string(),
            old_status: "active".to_string(),
            new_status: "retired".to_string(),
            changed_at: 0,
            version: 2,
        });
        assert_eq!(event.event_type(), "VehicleStatusChanged");
        assert_eq!(event.vehicle_id(), "v1");
    }
}
