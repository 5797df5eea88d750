// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! PostgreSQL-backed vehicle and outbox stores.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{OutboxRecord, OutboxStore, VehicleStore};
use crate::domain::{
    FuelLevel, LicenseNumber, Location, Mileage, Vehicle, VehicleEvent, VehicleId, VehicleStatus,
};
use crate::error::{Result, VehicleError};

/// PostgreSQL-backed vehicle store.
#[derive(Clone)]
pub struct PostgresVehicleStore {
    pool: PgPool,
}

impl PostgresVehicleStore {
    /// Create a store over an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct VehicleRow {
    id: Uuid,
    vin: String,
    vehicle_name: String,
    vehicle_model: String,
    license_number: String,
    status: String,
    latitude: f64,
    longitude: f64,
    altitude: f64,
    location_timestamp: i64,
    mileage: f64,
    fuel_level: f64,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl VehicleRow {
    fn into_vehicle(self) -> Result<Vehicle> {
        Ok(Vehicle::from_parts(
            VehicleId::from(self.id),
            self.vin,
            self.vehicle_name,
            self.vehicle_model,
            LicenseNumber::new(self.license_number)?,
            VehicleStatus::parse(&self.status)?,
            Location::new(
                self.latitude,
                self.longitude,
                self.altitude,
                self.location_timestamp,
            )?,
            Mileage::new(self.mileage)?,
            FuelLevel::new(self.fuel_level)?,
            self.version,
            self.created_at,
            self.updated_at,
        ))
    }
}

#[async_trait]
impl VehicleStore for PostgresVehicleStore {
    async fn save(&self, vehicle: &Vehicle) -> Result<()> {
        // Conditional upsert: a fresh id inserts, an existing id updates only
        // when the stored version is exactly one behind the aggregate's.
        let result = sqlx::query(
            r#"
            INSERT INTO vehicles (
                id, vin, vehicle_name, vehicle_model, license_number, status,
                latitude, longitude, altitude, location_timestamp,
                mileage, fuel_level, version, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            ON CONFLICT (id) DO UPDATE
            SET vin = EXCLUDED.vin,
                vehicle_name = EXCLUDED.vehicle_name,
                vehicle_model = EXCLUDED.vehicle_model,
                license_number = EXCLUDED.license_number,
                status = EXCLUDED.status,
                latitude = EXCLUDED.latitude,
                longitude = EXCLUDED.longitude,
                altitude = EXCLUDED.altitude,
                location_timestamp = EXCLUDED.location_timestamp,
                mileage = EXCLUDED.mileage,
                fuel_level = EXCLUDED.fuel_level,
                version = EXCLUDED.version,
                updated_at = EXCLUDED.updated_at
            WHERE vehicles.version = EXCLUDED.version - 1
            "#,
        )
        .bind(vehicle.id().as_uuid())
        .bind(vehicle.vin())
        .bind(vehicle.name())
        .bind(vehicle.model())
        .bind(vehicle.license_number().as_str())
        .bind(vehicle.status().as_str())
        .bind(vehicle.location().latitude())
        .bind(vehicle.location().longitude())
        .bind(vehicle.location().altitude())
        .bind(vehicle.location().timestamp())
        .bind(vehicle.mileage().kilometers())
        .bind(vehicle.fuel_level().percentage())
        .bind(vehicle.version())
        .bind(vehicle.created_at())
        .bind(vehicle.updated_at())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(VehicleError::ConcurrencyConflict {
                vehicle_id: vehicle.id().to_string(),
            });
        }

        Ok(())
    }

    async fn find_by_id(&self, id: &VehicleId) -> Result<Vehicle> {
        let row = sqlx::query_as::<_, VehicleRow>(
            r#"
            SELECT id, vin, vehicle_name, vehicle_model, license_number, status,
                   latitude, longitude, altitude, location_timestamp,
                   mileage, fuel_level, version, created_at, updated_at
            FROM vehicles
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row.into_vehicle(),
            None => Err(VehicleError::VehicleNotFound {
                vehicle_id: id.to_string(),
            }),
        }
    }

    async fn find_all(&self, limit: i64, offset: i64) -> Result<Vec<Vehicle>> {
        let rows = sqlx::query_as::<_, VehicleRow>(
            r#"
            SELECT id, vin, vehicle_name, vehicle_model, license_number, status,
                   latitude, longitude, altitude, location_timestamp,
                   mileage, fuel_level, version, created_at, updated_at
            FROM vehicles
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(VehicleRow::into_vehicle).collect()
    }

    async fn exists_by_vin(&self, vin: &str) -> Result<bool> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM vehicles WHERE vin = $1)")
                .bind(vin)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn delete(&self, id: &VehicleId) -> Result<()> {
        let result = sqlx::query("DELETE FROM vehicles WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(VehicleError::VehicleNotFound {
                vehicle_id: id.to_string(),
            });
        }

        Ok(())
    }
}

/// PostgreSQL-backed outbox store.
#[derive(Clone)]
pub struct PostgresOutboxStore {
    pool: PgPool,
}

impl PostgresOutboxStore {
    /// Create a store over an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OutboxStore for PostgresOutboxStore {
    async fn append(&self, aggregate_id: &str, event: &VehicleEvent) -> Result<()> {
        let payload = event.payload_json()?;
        sqlx::query(
            r#"
            INSERT INTO outbox (id, aggregate_id, event_type, payload, created_at)
            VALUES ($1, $2, $3, $4, NOW())
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(aggregate_id)
        .bind(event.event_type())
        .bind(payload)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_pending(&self, limit: i64) -> Result<Vec<OutboxRecord>> {
        let rows = sqlx::query_as::<_, OutboxRecord>(
            r#"
            SELECT id, aggregate_id, event_type, payload, created_at, published_at
            FROM outbox
            WHERE published_at IS NULL
            ORDER BY created_at ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn mark_published(&self, event_id: Uuid) -> Result<()> {
        let result = sqlx::query(
            "UPDATE outbox SET published_at = NOW() WHERE id = $1 AND published_at IS NULL",
        )
        .bind(event_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Either the row is gone or a previous mark already landed;
            // the latter is a no-op success.
            let (exists,): (bool,) =
                sqlx::query_as("SELECT EXISTS(SELECT 1 FROM outbox WHERE id = $1)")
                    .bind(event_id)
                    .fetch_one(&self.pool)
                    .await?;
            if !exists {
                return Err(VehicleError::OutboxEventNotFound {
                    event_id: event_id.to_string(),
                });
            }
        }

        Ok(())
    }
}
