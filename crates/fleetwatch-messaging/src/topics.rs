// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Event-tag → topic registry.
//!
//! Every outbox row carries a stable string tag chosen at design time; the
//! relay resolves the destination topic from that tag alone. Unknown tags go
//! to the catch-all topic so nothing is silently dropped.

/// Topic for vehicle creation events.
pub const VEHICLE_CREATED: &str = "vehicle.created";
/// Topic for vehicle location updates.
pub const VEHICLE_LOCATION_UPDATED: &str = "vehicle.location.updated";
/// Topic for vehicle status changes.
pub const VEHICLE_STATUS_CHANGED: &str = "vehicle.status.changed";
/// Topic for vehicle mileage updates.
pub const VEHICLE_MILEAGE_UPDATED: &str = "vehicle.mileage.updated";
/// Topic for vehicle fuel-level updates.
pub const VEHICLE_FUEL_UPDATED: &str = "vehicle.fuel.updated";
/// Catch-all topic for event tags without a dedicated topic.
pub const VEHICLE_EVENTS: &str = "vehicle.events";
/// Topic the workflow engine publishes state transitions to.
pub const WORKFLOW_TRANSITIONS: &str = "workflow.transitions";

/// Resolve the destination topic for an outbox event tag.
pub fn topic_for_event(tag: &str) -> &'static str {
    match tag {
        "VehicleCreated" => VEHICLE_CREATED,
        "VehicleLocationUpdated" => VEHICLE_LOCATION_UPDATED,
        "VehicleStatusChanged" => VEHICLE_STATUS_CHANGED,
        "VehicleMileageUpdated" => VEHICLE_MILEAGE_UPDATED,
        "VehicleFuelLevelUpdated" => VEHICLE_FUEL_UPDATED,
        "WorkflowTransition" => WORKFLOW_TRANSITIONS,
        _ => VEHICLE_EVENTS,
    }
}
