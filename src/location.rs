// src/location.rs

use crate::geo::Coordinates;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Location unavailable: {0}")]
    Unavailable(String),
}

/// Seam over the device platform's location services: a foreground
/// permission request followed by a single-shot high-accuracy fix.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn request_permission(&self) -> Result<(), LocationError>;
    async fn current_position(&self) -> Result<Coordinates, LocationError>;
}

/// Provider backed by coordinates supplied up front (CLI flags stand in
/// for the device GPS). With no position configured, fixes fail.
pub struct FixedLocationProvider {
    position: Option<Coordinates>,
}

impl FixedLocationProvider {
    pub fn new(position: Option<Coordinates>) -> Self {
        Self { position }
    }
}

#[async_trait]
impl LocationProvider for FixedLocationProvider {
    async fn request_permission(&self) -> Result<(), LocationError> {
        Ok(())
    }

    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        self.position
            .ok_or_else(|| LocationError::Unavailable("no device position configured".to_string()))
    }
}

/// Scriptable provider for tests: permission and fix outcomes can each be
/// swapped while a test runs.
#[derive(Clone)]
pub struct MockLocationProvider {
    permission: Arc<Mutex<Result<(), LocationError>>>,
    position: Arc<Mutex<Result<Coordinates, LocationError>>>,
}

impl MockLocationProvider {
    pub fn new(position: Coordinates) -> Self {
        Self {
            permission: Arc::new(Mutex::new(Ok(()))),
            position: Arc::new(Mutex::new(Ok(position))),
        }
    }

    pub fn set_position(&self, position: Coordinates) {
        *self.position.lock().unwrap() = Ok(position);
    }

    pub fn fail_position(&self, error: LocationError) {
        *self.position.lock().unwrap() = Err(error);
    }

    pub fn deny_permission(&self) {
        *self.permission.lock().unwrap() = Err(LocationError::PermissionDenied);
    }
}

#[async_trait]
impl LocationProvider for MockLocationProvider {
    async fn request_permission(&self) -> Result<(), LocationError> {
        self.permission.lock().unwrap().clone()
    }

    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        self.position.lock().unwrap().clone()
    }
}
