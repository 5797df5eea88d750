// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! In-memory vehicle and outbox stores.
//!
//! Same contracts as the PostgreSQL backends, backed by mutex-guarded maps.
//! Used by tests and by embedded single-process deployments.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use uuid::Uuid;

use super::{OutboxRecord, OutboxStore, VehicleStore};
use crate::domain::{Vehicle, VehicleEvent, VehicleId};
use crate::error::{Result, VehicleError};

/// In-memory vehicle store with the same version-predicate semantics as the
/// PostgreSQL backend.
#[derive(Clone, Default)]
pub struct MemoryVehicleStore {
    vehicles: Arc<Mutex<HashMap<Uuid, Vehicle>>>,
}

impl MemoryVehicleStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Strip the uncommitted-event buffer so a later read does not resurrect
/// already-drained events.
fn snapshot(vehicle: &Vehicle) -> Vehicle {
    Vehicle::from_parts(
        vehicle.id(),
        vehicle.vin().to_string(),
        vehicle.name().to_string(),
        vehicle.model().to_string(),
        vehicle.license_number().clone(),
        vehicle.status(),
        vehicle.location(),
        vehicle.mileage(),
        vehicle.fuel_level(),
        vehicle.version(),
        vehicle.created_at(),
        vehicle.updated_at(),
    )
}

#[async_trait]
impl VehicleStore for MemoryVehicleStore {
    async fn save(&self, vehicle: &Vehicle) -> Result<()> {
        let mut vehicles = self.vehicles.lock();
        match vehicles.get(&vehicle.id().as_uuid()) {
            None => {
                vehicles.insert(vehicle.id().as_uuid(), snapshot(vehicle));
                Ok(())
            }
            Some(existing) if existing.version() == vehicle.version() - 1 => {
                vehicles.insert(vehicle.id().as_uuid(), snapshot(vehicle));
                Ok(())
            }
            Some(_) => Err(VehicleError::ConcurrencyConflict {
                vehicle_id: vehicle.id().to_string(),
            }),
        }
    }

    async fn find_by_id(&self, id: &VehicleId) -> Result<Vehicle> {
        self.vehicles
            .lock()
            .get(&id.as_uuid())
            .cloned()
            .ok_or_else(|| VehicleError::VehicleNotFound {
                vehicle_id: id.to_string(),
            })
    }

    async fn find_all(&self, limit: i64, offset: i64) -> Result<Vec<Vehicle>> {
        let mut vehicles: Vec<Vehicle> = self.vehicles.lock().values().cloned().collect();
        vehicles.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(vehicles
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn exists_by_vin(&self, vin: &str) -> Result<bool> {
        Ok(self.vehicles.lock().values().any(|v| v.vin() == vin))
    }

    async fn delete(&self, id: &VehicleId) -> Result<()> {
        if self.vehicles.lock().remove(&id.as_uuid()).is_none() {
            return Err(VehicleError::VehicleNotFound {
                vehicle_id: id.to_string(),
            });
        }
        Ok(())
    }
}

/// In-memory outbox store.
#[derive(Clone, Default)]
pub struct MemoryOutboxStore {
    rows: Arc<Mutex<Vec<OutboxRecord>>>,
}

impl MemoryOutboxStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every row currently stored, pending and published. For tests.
    pub fn all_rows(&self) -> Vec<OutboxRecord> {
        self.rows.lock().clone()
    }
}

#[async_trait]
impl OutboxStore for MemoryOutboxStore {
    async fn append(&self, aggregate_id: &str, event: &VehicleEvent) -> Result<()> {
        let payload = event.payload_json()?;
        self.rows.lock().push(OutboxRecord {
            id: Uuid::new_v4(),
            aggregate_id: aggregate_id.to_string(),
            event_type: event.event_type().to_string(),
            payload,
            created_at: Utc::now(),
            published_at: None,
        });
        Ok(())
    }

    async fn get_pending(&self, limit: i64) -> Result<Vec<OutboxRecord>> {
        let rows = self.rows.lock();
        let mut pending: Vec<OutboxRecord> = rows
            .iter()
            .filter(|r| r.published_at.is_none())
            .cloned()
            .collect();
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        pending.truncate(limit.max(0) as usize);
        Ok(pending)
    }

    async fn mark_published(&self, event_id: Uuid) -> Result<()> {
        let mut rows = self.rows.lock();
        match rows.iter_mut().find(|r| r.id == event_id) {
            Some(row) => {
                if row.published_at.is_none() {
                    row.published_at = Some(Utc::now());
                }
                Ok(())
            }
            None => Err(VehicleError::OutboxEventNotFound {
                event_id: event_id.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FuelLevel, LicenseNumber, Location, Mileage, VehicleStatus};

    fn test_vehicle() -> Vehicle {
        Vehicle::new(
            VehicleId::generate(),
            "VIN123456",
            "Van 3",
            "Sprinter",
            LicenseNumber::new("AB-123").unwrap(),
            VehicleStatus::Active,
            Location::new(0.0, 0.0, 0.0, 0).unwrap(),
            Mileage::new(0.0).unwrap(),
            FuelLevel::new(50.0).unwrap(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn save_detects_version_conflicts() {
        let store = MemoryVehicleStore::new();
        let vehicle = test_vehicle();
        store.save(&vehicle).await.unwrap();

        // Two writers load the same version and both mutate.
        let mut writer_a = store.find_by_id(&vehicle.id()).await.unwrap();
        let mut writer_b = store.find_by_id(&vehicle.id()).await.unwrap();
        writer_a.change_status(VehicleStatus::Maintenance);
        writer_b.change_status(VehicleStatus::Retired);

        store.save(&writer_a).await.unwrap();
        let conflict = store.save(&writer_b).await;
        assert!(matches!(
            conflict,
            Err(VehicleError::ConcurrencyConflict { .. })
        ));

        // Store contents are the first writer's image.
        let stored = store.find_by_id(&vehicle.id()).await.unwrap();
        assert_eq!(stored.status(), VehicleStatus::Maintenance);
        assert_eq!(stored.version(), 2);
    }

    #[tokio::test]
    async fn stored_vehicles_do_not_resurrect_drained_events() {
        let store = MemoryVehicleStore::new();
        let vehicle = test_vehicle();
        store.save(&vehicle).await.unwrap();

        let loaded = store.find_by_id(&vehicle.id()).await.unwrap();
        assert!(loaded.uncommitted_events().is_empty());
    }

    #[tokio::test]
    async fn mark_published_is_idempotent_and_excludes_from_pending() {
        let store = MemoryOutboxStore::new();
        let mut vehicle = test_vehicle();
        for event in vehicle.take_uncommitted_events() {
            store.append(&vehicle.id().to_string(), &event).await.unwrap();
        }

        let pending = store.get_pending(10).await.unwrap();
        assert_eq!(pending.len(), 1);

        store.mark_published(pending[0].id).await.unwrap();
        store.mark_published(pending[0].id).await.unwrap();
        assert!(store.get_pending(10).await.unwrap().is_empty());

        let missing = store.mark_published(Uuid::new_v4()).await;
        assert!(matches!(
            missing,
            Err(VehicleError::OutboxEventNotFound { .. })
        ));
    }
}
