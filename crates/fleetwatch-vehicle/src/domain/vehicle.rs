// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! The vehicle aggregate.
//!
//! Every mutator is a no-op when the target value equals the current one;
//! otherwise it bumps `version` by exactly one and buffers exactly one event
//! describing the change. The buffer is drained by the command pipeline after
//! a successful save; a second drain yields nothing. Because mutators
//! short-circuit on equality, retrying a failed command never duplicates
//! events for the same logical state change.

use chrono::{DateTime, Utc};

use super::event::{
    VehicleCreated, VehicleEvent, VehicleFuelLevelUpdated, VehicleLocationUpdated,
    VehicleMileageUpdated, VehicleStatusChanged,
};
use super::valueobject::{FuelLevel, LicenseNumber, Location, Mileage, VehicleId, VehicleStatus};
use crate::error::{Result, VehicleError};

/// The vehicle aggregate root.
///
/// Not thread-safe: a single command invocation owns the instance end-to-end.
#[derive(Debug, Clone)]
pub struct Vehicle {
    id: VehicleId,
    vin: String,
    name: String,
    model: String,
    license_number: LicenseNumber,
    status: VehicleStatus,
    location: Location,
    mileage: Mileage,
    fuel_level: FuelLevel,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    uncommitted_events: Vec<VehicleEvent>,
}

impl Vehicle {
    /// Create a new vehicle at version 1 and buffer the `VehicleCreated`
    /// event. VIN, name, and model must be non-empty.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: VehicleId,
        vin: impl Into<String>,
        name: impl Into<String>,
        model: impl Into<String>,
        license_number: LicenseNumber,
        status: VehicleStatus,
        location: Location,
        mileage: Mileage,
        fuel_level: FuelLevel,
    ) -> Result<Self> {
        let vin = vin.into();
        let name = name.into();
        let model = model.into();
        if vin.is_empty() {
            return Err(VehicleError::Validation {
                field: "vin",
                message: "cannot be empty".to_string(),
            });
        }
        if name.is_empty() {
            return Err(VehicleError::Validation {
                field: "vehicle_name",
                message: "cannot be empty".to_string(),
            });
        }
        if model.is_empty() {
            return Err(VehicleError::Validation {
                field: "vehicle_model",
                message: "cannot be empty".to_string(),
            });
        }

        let now = Utc::now();
        let created = VehicleCreated {
            vehicle_id: id.to_string(),
            vin: vin.clone(),
            vehicle_name: name.clone(),
            vehicle_model: model.clone(),
            license_number: license_number.as_str().to_string(),
            status: status.as_str().to_string(),
            latitude: location.latitude(),
            longitude: location.longitude(),
            mileage: mileage.kilometers(),
            fuel_level: fuel_level.percentage(),
            version: 1,
            timestamp: now.timestamp(),
        };

        Ok(Self {
            id,
            vin,
            name,
            model,
            license_number,
            status,
            location,
            mileage,
            fuel_level,
            version: 1,
            created_at: now,
            updated_at: now,
            uncommitted_events: vec![VehicleEvent::Created(created)],
        })
    }

    /// Rehydrate a vehicle from persisted state. No event is buffered.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: VehicleId,
        vin: String,
        name: String,
        model: String,
        license_number: LicenseNumber,
        status: VehicleStatus,
        location: Location,
        mileage: Mileage,
        fuel_level: FuelLevel,
        version: i64,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            vin,
            name,
            model,
            license_number,
            status,
            location,
            mileage,
            fuel_level,
            version,
            created_at,
            updated_at,
            uncommitted_events: Vec::new(),
        }
    }

    /// The vehicle id.
    pub fn id(&self) -> VehicleId {
        self.id
    }

    /// The vehicle identification number.
    pub fn vin(&self) -> &str {
        &self.vin
    }

    /// The display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The model designation.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// The license plate.
    pub fn license_number(&self) -> &LicenseNumber {
        &self.license_number
    }

    /// The operational status.
    pub fn status(&self) -> VehicleStatus {
        self.status
    }

    /// The last reported location.
    pub fn location(&self) -> Location {
        self.location
    }

    /// The odometer reading.
    pub fn mileage(&self) -> Mileage {
        self.mileage
    }

    /// The fuel level.
    pub fn fuel_level(&self) -> FuelLevel {
        self.fuel_level
    }

    /// The optimistic-concurrency version.
    pub fn version(&self) -> i64 {
        self.version
    }

    /// When the vehicle was created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// When the vehicle was last updated.
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Update the location. No-op if unchanged.
    pub fn update_location(&mut self, location: Location) {
        if location == self.location {
            return;
        }

        self.location = location;
        self.touch();
        self.uncommitted_events
            .push(VehicleEvent::LocationUpdated(VehicleLocationUpdated {
                vehicle_id: self.id.to_string(),
                latitude: location.latitude(),
                longitude: location.longitude(),
                altitude: location.altitude(),
                timestamp: location.timestamp(),
                updated_at: self.updated_at.timestamp(),
                version: self.version,
            }));
    }

    /// Update the odometer reading. No-op if unchanged.
    pub fn update_mileage(&mut self, mileage: Mileage) {
        if mileage == self.mileage {
            return;
        }

        self.mileage = mileage;
        self.touch();
        self.uncommitted_events
            .push(VehicleEvent::MileageUpdated(VehicleMileageUpdated {
                vehicle_id: self.id.to_string(),
                mileage: mileage.kilometers(),
                updated_at: self.updated_at.timestamp(),
                version: self.version,
            }));
    }

    /// Update the fuel level. No-op if unchanged.
    pub fn update_fuel_level(&mut self, fuel_level: FuelLevel) {
        if fuel_level == self.fuel_level {
            return;
        }

        self.fuel_level = fuel_level;
        self.touch();
        self.uncommitted_events
            .push(VehicleEvent::FuelLevelUpdated(VehicleFuelLevelUpdated {
                vehicle_id: self.id.to_string(),
                fuel_level: fuel_level.percentage(),
                is_low: fuel_level.is_low(),
                updated_at: self.updated_at.timestamp(),
                version: self.version,
            }));
    }

    /// Change the operational status. No-op if unchanged.
    pub fn change_status(&mut self, new_status: VehicleStatus) {
        if new_status == self.status {
            return;
        }

        let old_status = self.status;
        self.status = new_status;
        self.touch();
        self.uncommitted_events
            .push(VehicleEvent::StatusChanged(VehicleStatusChanged {
                vehicle_id: self.id.to_string(),
                old_status: old_status.as_str().to_string(),
                new_status: new_status.as_str().to_string(),
                changed_at: self.updated_at.timestamp(),
                version: self.version,
            }));
    }

    /// Drain the uncommitted-event buffer in FIFO order.
    ///
    /// Called by the command pipeline after a successful save; a second call
    /// returns an empty vector.
    pub fn take_uncommitted_events(&mut self) -> Vec<VehicleEvent> {
        std::mem::take(&mut self.uncommitted_events)
    }

    /// Events buffered but not yet drained.
    pub fn uncommitted_events(&self) -> &[VehicleEvent] {
        &self.uncommitted_events
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
        self.version += 1;
    }
}
