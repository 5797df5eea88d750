// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Validated value objects for the vehicle aggregate.
//!
//! Constructors reject out-of-range input with `Validation` errors before any
//! store I/O happens. Equality on these types is what the aggregate's no-op
//! guard compares against.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, VehicleError};

/// Unique vehicle identifier (UUID).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleId(Uuid);

impl VehicleId {
    /// Generate a fresh random id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an id from its string form.
    pub fn parse(value: &str) -> Result<Self> {
        if value.is_empty() {
            return Err(VehicleError::Validation {
                field: "vehicle_id",
                message: "cannot be empty".to_string(),
            });
        }
        let uuid = Uuid::from_str(value).map_err(|e| VehicleError::Validation {
            field: "vehicle_id",
            message: format!("invalid id format: {e}"),
        })?;
        Ok(Self(uuid))
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for VehicleId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Operational status of a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleStatus {
    /// In service.
    Active,
    /// Temporarily out of service.
    Inactive,
    /// Undergoing maintenance.
    Maintenance,
    /// Permanently withdrawn from the fleet.
    Retired,
}

impl VehicleStatus {
    /// Parse a status from its wire string.
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "maintenance" => Ok(Self::Maintenance),
            "retired" => Ok(Self::Retired),
            other => Err(VehicleError::Validation {
                field: "status",
                message: format!("invalid vehicle status: {other}"),
            }),
        }
    }

    /// The wire string for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Maintenance => "maintenance",
            Self::Retired => "retired",
        }
    }
}

impl fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A geographic coordinate with the sampling timestamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    latitude: f64,
    longitude: f64,
    altitude: f64,
    timestamp: i64,
}

impl Location {
    /// Create a location. Latitude must be within [-90, 90], longitude within
    /// [-180, 180], and the timestamp non-negative.
    pub fn new(latitude: f64, longitude: f64, altitude: f64, timestamp: i64) -> Result<Self> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(VehicleError::Validation {
                field: "latitude",
                message: format!("out of range: {latitude}"),
            });
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(VehicleError::Validation {
                field: "longitude",
                message: format!("out of range: {longitude}"),
            });
        }
        if timestamp < 0 {
            return Err(VehicleError::Validation {
                field: "timestamp",
                message: format!("cannot be negative: {timestamp}"),
            });
        }
        Ok(Self {
            latitude,
            longitude,
            altitude,
            timestamp,
        })
    }

    /// Latitude in degrees.
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in degrees.
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Altitude in meters.
    pub fn altitude(&self) -> f64 {
        self.altitude
    }

    /// Unix timestamp of the position sample.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

/// Vehicle mileage in kilometers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mileage(f64);

impl Mileage {
    /// Create a mileage value; negative values are rejected.
    pub fn new(kilometers: f64) -> Result<Self> {
        if kilometers < 0.0 {
            return Err(VehicleError::Validation {
                field: "mileage",
                message: format!("cannot be negative: {kilometers}"),
            });
        }
        Ok(Self(kilometers))
    }

    /// Kilometers driven.
    pub fn kilometers(&self) -> f64 {
        self.0
    }

    /// Add kilometers to the current mileage.
    pub fn add_kilometers(&self, km: f64) -> Result<Self> {
        if km < 0.0 {
            return Err(VehicleError::Validation {
                field: "mileage",
                message: "cannot add negative kilometers".to_string(),
            });
        }
        Self::new(self.0 + km)
    }
}

/// Fuel level percentage in [0, 100].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuelLevel(f64);

impl FuelLevel {
    /// Threshold below which a fuel level counts as low.
    const LOW_THRESHOLD: f64 = 15.0;

    /// Create a fuel level; values outside [0, 100] are rejected.
    pub fn new(percentage: f64) -> Result<Self> {
        if !(0.0..=100.0).contains(&percentage) {
            return Err(VehicleError::Validation {
                field: "fuel_level",
                message: format!("must be between 0 and 100: {percentage}"),
            });
        }
        Ok(Self(percentage))
    }

    /// Fuel level percentage.
    pub fn percentage(&self) -> f64 {
        self.0
    }

    /// Whether the tank is below the low-fuel threshold.
    pub fn is_low(&self) -> bool {
        self.0 < Self::LOW_THRESHOLD
    }
}

/// Vehicle license plate number, 3 to 20 characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseNumber(String);

impl LicenseNumber {
    /// Create a license number; length outside [3, 20] is rejected.
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(VehicleError::Validation {
                field: "license_number",
                message: "cannot be empty".to_string(),
            });
        }
        if value.len() < 3 || value.len() > 20 {
            return Err(VehicleError::Validation {
                field: "license_number",
                message: "must be between 3 and 20 characters".to_string(),
            });
        }
        Ok(Self(value))
    }

    /// The license number string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LicenseNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
