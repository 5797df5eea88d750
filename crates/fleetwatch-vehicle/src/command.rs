// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! The command pipeline.
//!
//! Per command: validate inputs into value objects, load the aggregate (or
//! check uniqueness for creation), apply the mutation, save, then append every
//! drained event to the outbox. Save and append are not atomic across the two
//! tables; a failed append surfaces to the caller and a retry is safe because
//! mutators no-op on equal values, so version only moves (and events are only
//! re-appended) when the state actually changes.

use std::sync::Arc;

use tracing::info;

use crate::domain::{
    FuelLevel, LicenseNumber, Location, Mileage, Vehicle, VehicleId, VehicleStatus,
};
use crate::error::{Result, VehicleError};
use crate::store::{OutboxStore, VehicleStore};

/// Register a new vehicle.
#[derive(Debug, Clone)]
pub struct CreateVehicle {
    /// Vehicle identification number; must be unique.
    pub vin: String,
    /// Display name.
    pub name: String,
    /// Model designation.
    pub model: String,
    /// License plate.
    pub license_number: String,
    /// Initial status string.
    pub status: String,
    /// Initial latitude.
    pub latitude: f64,
    /// Initial longitude.
    pub longitude: f64,
    /// Initial altitude.
    pub altitude: f64,
    /// Initial odometer reading.
    pub mileage: f64,
    /// Initial fuel level percentage.
    pub fuel_level: f64,
}

/// Report a new position for a vehicle.
#[derive(Debug, Clone)]
pub struct UpdateVehicleLocation {
    /// Target vehicle id.
    pub vehicle_id: String,
    /// New latitude.
    pub latitude: f64,
    /// New longitude.
    pub longitude: f64,
    /// New altitude.
    pub altitude: f64,
    /// Unix timestamp of the position sample.
    pub timestamp: i64,
}

/// Change a vehicle's operational status.
#[derive(Debug, Clone)]
pub struct ChangeVehicleStatus {
    /// Target vehicle id.
    pub vehicle_id: String,
    /// New status string.
    pub new_status: String,
}

/// Update a vehicle's odometer reading.
#[derive(Debug, Clone)]
pub struct UpdateVehicleMileage {
    /// Target vehicle id.
    pub vehicle_id: String,
    /// New odometer reading in kilometers.
    pub mileage: f64,
}

/// Update a vehicle's fuel level.
#[derive(Debug, Clone)]
pub struct UpdateVehicleFuelLevel {
    /// Target vehicle id.
    pub vehicle_id: String,
    /// New fuel level percentage.
    pub fuel_level: f64,
}

/// The per-request write path: load → mutate → save → outbox.
pub struct CommandPipeline {
    vehicles: Arc<dyn VehicleStore>,
    outbox: Arc<dyn OutboxStore>,
}

impl CommandPipeline {
    /// Create a pipeline over the given stores.
    pub fn new(vehicles: Arc<dyn VehicleStore>, outbox: Arc<dyn OutboxStore>) -> Self {
        Self { vehicles, outbox }
    }

    /// Handle [`CreateVehicle`]. Returns the generated vehicle id.
    pub async fn create_vehicle(&self, cmd: CreateVehicle) -> Result<VehicleId> {
        let status = VehicleStatus::parse(&cmd.status)?;
        let location = Location::new(cmd.latitude, cmd.longitude, cmd.altitude, 0)?;
        let license_number = LicenseNumber::new(cmd.license_number)?;
        let mileage = Mileage::new(cmd.mileage)?;
        let fuel_level = FuelLevel::new(cmd.fuel_level)?;

        if self.vehicles.exists_by_vin(&cmd.vin).await? {
            return Err(VehicleError::DuplicateVin { vin: cmd.vin });
        }

        let id = VehicleId::generate();
        let mut vehicle = Vehicle::new(
            id,
            cmd.vin,
            cmd.name,
            cmd.model,
            license_number,
            status,
            location,
            mileage,
            fuel_level,
        )?;

        self.persist(&mut vehicle).await?;
        info!(vehicle_id = %id, "Vehicle created");
        Ok(id)
    }

    /// Handle [`UpdateVehicleLocation`].
    pub async fn update_location(&self, cmd: UpdateVehicleLocation) -> Result<()> {
        let id = VehicleId::parse(&cmd.vehicle_id)?;
        let location = Location::new(cmd.latitude, cmd.longitude, cmd.altitude, cmd.timestamp)?;

        let mut vehicle = self.vehicles.find_by_id(&id).await?;
        vehicle.update_location(location);
        self.persist(&mut vehicle).await
    }

    /// Handle [`ChangeVehicleStatus`].
    pub async fn change_status(&self, cmd: ChangeVehicleStatus) -> Result<()> {
        let id = VehicleId::parse(&cmd.vehicle_id)?;
        let new_status = VehicleStatus::parse(&cmd.new_status)?;

        let mut vehicle = self.vehicles.find_by_id(&id).await?;
        vehicle.change_status(new_status);
        self.persist(&mut vehicle).await
    }

    /// Handle [`UpdateVehicleMileage`].
    pub async fn update_mileage(&self, cmd: UpdateVehicleMileage) -> Result<()> {
        let id = VehicleId::parse(&cmd.vehicle_id)?;
        let mileage = Mileage::new(cmd.mileage)?;

        let mut vehicle = self.vehicles.find_by_id(&id).await?;
        vehicle.update_mileage(mileage);
        self.persist(&mut vehicle).await
    }

    /// Handle [`UpdateVehicleFuelLevel`].
    pub async fn update_fuel_level(&self, cmd: UpdateVehicleFuelLevel) -> Result<()> {
        let id = VehicleId::parse(&cmd.vehicle_id)?;
        let fuel_level = FuelLevel::new(cmd.fuel_level)?;

        let mut vehicle = self.vehicles.find_by_id(&id).await?;
        vehicle.update_fuel_level(fuel_level);
        self.persist(&mut vehicle).await
    }

    /// Remove a vehicle from the fleet.
    pub async fn delete_vehicle(&self, vehicle_id: &str) -> Result<()> {
        let id = VehicleId::parse(vehicle_id)?;
        self.vehicles.delete(&id).await?;
        info!(vehicle_id = %id, "Vehicle deleted");
        Ok(())
    }

    async fn persist(&self, vehicle: &mut Vehicle) -> Result<()> {
        self.vehicles.save(vehicle).await?;

        let aggregate_id = vehicle.id().to_string();
        for event in vehicle.take_uncommitted_events() {
            self.outbox.append(&aggregate_id, &event).await?;
        }
        Ok(())
    }
}
