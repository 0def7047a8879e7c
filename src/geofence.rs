// src/geofence.rs

use crate::assignment::AssignmentResolver;
use crate::geo::distance_meters;
use crate::location::{LocationError, LocationProvider};
use crate::workplace::WorkplaceLocation;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const ERROR_NO_LOCATION_ASSIGNED: &str = "No location assigned";
pub const ERROR_LOCATION_PERMISSION_DENIED: &str = "Location permission denied";

/// Outcome of a single radius check. Ephemeral; recomputed on every check,
/// never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeofenceCheckResult {
    pub is_within_radius: bool,
    /// Rounded to the nearest whole meter for display, kept numeric.
    pub distance_meters: f64,
    pub assigned_location: Option<WorkplaceLocation>,
    pub error: Option<String>,
}

impl GeofenceCheckResult {
    fn failed(assigned_location: Option<WorkplaceLocation>, error: &str) -> Self {
        Self {
            is_within_radius: false,
            distance_meters: 0.0,
            assigned_location,
            error: Some(error.to_string()),
        }
    }
}

// --- Geofence Evaluator ---

/// Determines whether the device currently sits inside the assigned
/// workplace's radius. Every failure along the way (no assignment, denied
/// permission, no position fix) is absorbed into a populated result with
/// `error` set and `is_within_radius == false`; nothing propagates to the
/// caller as an error.
#[derive(Clone)]
pub struct GeofenceEvaluator {
    resolver: AssignmentResolver,
    location: Arc<dyn LocationProvider>,
}

impl GeofenceEvaluator {
    pub fn new(resolver: AssignmentResolver, location: Arc<dyn LocationProvider>) -> Self {
        Self { resolver, location }
    }

    pub async fn check_workplace_radius(
        &self,
        employee_id: Option<&str>,
    ) -> GeofenceCheckResult {
        let assignment = match employee_id {
            Some(id) => self.resolver.assignment_for(id).await,
            None => self.resolver.my_assignment(false).await,
        };

        let assigned = match assignment {
            Some(a) => a.workplace_location,
            None => {
                warn!("Geofence check without an assigned location");
                return GeofenceCheckResult::failed(None, ERROR_NO_LOCATION_ASSIGNED);
            }
        };

        if let Err(e) = self.location.request_permission().await {
            warn!("Location permission not granted: {}", e);
            let message = match e {
                LocationError::PermissionDenied => ERROR_LOCATION_PERMISSION_DENIED.to_string(),
                other => other.to_string(),
            };
            return GeofenceCheckResult::failed(Some(assigned), &message);
        }

        let position = match self.location.current_position().await {
            Ok(p) => p,
            Err(e) => {
                warn!("Failed to acquire device position: {}", e);
                return GeofenceCheckResult::failed(Some(assigned), &e.to_string());
            }
        };

        let raw_distance = distance_meters(position, assigned.center());
        let distance = raw_distance.round();
        let is_within_radius = distance <= assigned.radius_meters as f64;

        debug!(
            "Geofence check against {}: distance={}m, radius={}m",
            assigned.name, distance, assigned.radius_meters
        );
        if !is_within_radius {
            info!(
                "Device is outside the {}m radius of {} ({}m away)",
                assigned.radius_meters, assigned.name, distance
            );
        }

        GeofenceCheckResult {
            is_within_radius,
            distance_meters: distance,
            assigned_location: Some(assigned),
            error: None,
        }
    }
}
