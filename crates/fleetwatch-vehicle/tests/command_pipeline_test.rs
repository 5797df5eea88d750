// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Integration tests for the command pipeline against in-memory stores.

use std::sync::Arc;

use fleetwatch_vehicle::command::{
    ChangeVehicleStatus, CommandPipeline, CreateVehicle, UpdateVehicleFuelLevel,
    UpdateVehicleLocation, UpdateVehicleMileage,
};
use fleetwatch_vehicle::domain::{VehicleId, VehicleStatus};
use fleetwatch_vehicle::error::VehicleError;
use fleetwatch_vehicle::store::{MemoryOutboxStore, MemoryVehicleStore, VehicleStore};

fn create_command() -> CreateVehicle {
    CreateVehicle {
        vin: "1HGBH41JXMN109186".to_string(),
        name: "Truck 7".to_string(),
        model: "Volvo FH16".to_string(),
        license_number: "WX-1234".to_string(),
        status: "active".to_string(),
        latitude: 52.23,
        longitude: 21.01,
        altitude: 100.0,
        mileage: 1000.0,
        fuel_level: 80.0,
    }
}

fn pipeline() -> (CommandPipeline, Arc<MemoryVehicleStore>, Arc<MemoryOutboxStore>) {
    let vehicles = Arc::new(MemoryVehicleStore::new());
    let outbox = Arc::new(MemoryOutboxStore::new());
    let pipeline = CommandPipeline::new(vehicles.clone(), outbox.clone());
    (pipeline, vehicles, outbox)
}

#[tokio::test]
async fn create_vehicle_saves_aggregate_and_appends_created_event() {
    let (pipeline, vehicles, outbox) = pipeline();

    let id = pipeline.create_vehicle(create_command()).await.unwrap();

    let stored = vehicles.find_by_id(&id).await.unwrap();
    assert_eq!(stored.version(), 1);
    assert_eq!(stored.vin(), "1HGBH41JXMN109186");

    let rows = outbox.all_rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].event_type, "VehicleCreated");
    assert_eq!(rows[0].aggregate_id, id.to_string());
    assert!(rows[0].published_at.is_none());
}

#[tokio::test]
async fn duplicate_vin_is_rejected() {
    let (pipeline, _, outbox) = pipeline();

    pipeline.create_vehicle(create_command()).await.unwrap();
    let result = pipeline.create_vehicle(create_command()).await;

    assert!(matches!(result, Err(VehicleError::DuplicateVin { .. })));
    assert_eq!(outbox.all_rows().len(), 1);
}

#[tokio::test]
async fn out_of_range_input_fails_before_store_io() {
    let (pipeline, vehicles, outbox) = pipeline();
    let id = pipeline.create_vehicle(create_command()).await.unwrap();
    let version_before = vehicles.find_by_id(&id).await.unwrap().version();

    let result = pipeline
        .update_location(UpdateVehicleLocation {
            vehicle_id: id.to_string(),
            latitude: 95.0,
            longitude: 0.0,
            altitude: 0.0,
            timestamp: 0,
        })
        .await;
    assert!(matches!(
        result,
        Err(VehicleError::Validation { field: "latitude", .. })
    ));

    let result = pipeline
        .update_fuel_level(UpdateVehicleFuelLevel {
            vehicle_id: id.to_string(),
            fuel_level: 120.0,
        })
        .await;
    assert!(matches!(
        result,
        Err(VehicleError::Validation { field: "fuel_level", .. })
    ));

    let result = pipeline
        .update_mileage(UpdateVehicleMileage {
            vehicle_id: id.to_string(),
            mileage: -5.0,
        })
        .await;
    assert!(matches!(
        result,
        Err(VehicleError::Validation { field: "mileage", .. })
    ));

    // Nothing changed: no version bump, no new outbox rows.
    assert_eq!(vehicles.find_by_id(&id).await.unwrap().version(), version_before);
    assert_eq!(outbox.all_rows().len(), 1);
}

#[tokio::test]
async fn exactly_one_outbox_row_per_version_increment() {
    let (pipeline, vehicles, outbox) = pipeline();
    let id = pipeline.create_vehicle(create_command()).await.unwrap();

    pipeline
        .update_location(UpdateVehicleLocation {
            vehicle_id: id.to_string(),
            latitude: 52.3,
            longitude: 21.1,
            altitude: 90.0,
            timestamp: 1,
        })
        .await
        .unwrap();
    pipeline
        .update_mileage(UpdateVehicleMileage {
            vehicle_id: id.to_string(),
            mileage: 1100.0,
        })
        .await
        .unwrap();
    pipeline
        .change_status(ChangeVehicleStatus {
            vehicle_id: id.to_string(),
            new_status: "maintenance".to_string(),
        })
        .await
        .unwrap();

    let stored = vehicles.find_by_id(&id).await.unwrap();
    assert_eq!(stored.version(), 4);
    assert_eq!(stored.status(), VehicleStatus::Maintenance);
    assert_eq!(outbox.all_rows().len(), 4);
}

#[tokio::test]
async fn equal_value_command_is_a_no_op_on_state_and_outbox() {
    let (pipeline, vehicles, outbox) = pipeline();
    let id = pipeline.create_vehicle(create_command()).await.unwrap();

    // Same mileage and status as the initial values.
    pipeline
        .update_mileage(UpdateVehicleMileage {
            vehicle_id: id.to_string(),
            mileage: 1000.0,
        })
        .await
        .unwrap();
    pipeline
        .change_status(ChangeVehicleStatus {
            vehicle_id: id.to_string(),
            new_status: "active".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(vehicles.find_by_id(&id).await.unwrap().version(), 1);
    assert_eq!(outbox.all_rows().len(), 1);
}

#[tokio::test]
async fn commands_against_unknown_vehicles_fail_with_not_found() {
    let (pipeline, _, _) = pipeline();
    let unknown = VehicleId::generate();

    let result = pipeline
        .update_mileage(UpdateVehicleMileage {
            vehicle_id: unknown.to_string(),
            mileage: 10.0,
        })
        .await;
    assert!(matches!(result, Err(VehicleError::VehicleNotFound { .. })));
}

#[tokio::test]
async fn malformed_vehicle_id_is_a_validation_error() {
    let (pipeline, _, _) = pipeline();

    let result = pipeline
        .change_status(ChangeVehicleStatus {
            vehicle_id: "not-a-uuid".to_string(),
            new_status: "active".to_string(),
        })
        .await;
    assert!(matches!(
        result,
        Err(VehicleError::Validation { field: "vehicle_id", .. })
    ));
}
