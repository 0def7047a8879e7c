// src/workplace.rs

use crate::backend::BackendError;
use crate::geo::Coordinates;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

// --- Workplace Data Structures ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkplaceLocation {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_meters: u32,
    #[serde(default)]
    pub address: Option<String>,
    pub is_active: bool,
}

impl WorkplaceLocation {
    pub fn center(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

/// Wire envelope for the workplace-locations endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkplaceLocationsResponse {
    pub locations: Vec<WorkplaceLocation>,
}

/// Fallback directory contents used until (and whenever) the backend cannot
/// be reached. These mirror the deployment's known sites.
static DEFAULT_LOCATIONS: Lazy<Vec<WorkplaceLocation>> = Lazy::new(|| {
    vec![
        WorkplaceLocation {
            id: "loc-main-plant".to_string(),
            name: "Main Plant".to_string(),
            latitude: 14.2753,
            longitude: 121.1298,
            radius_meters: 100,
            address: Some("Brgy. Mamatid, Cabuyao, Laguna".to_string()),
            is_active: true,
        },
        WorkplaceLocation {
            id: "loc-warehouse-b".to_string(),
            name: "Warehouse B".to_string(),
            latitude: 14.2789,
            longitude: 121.1241,
            radius_meters: 150,
            address: None,
            is_active: true,
        },
        WorkplaceLocation {
            id: "loc-old-depot".to_string(),
            name: "Old Depot".to_string(),
            latitude: 14.2691,
            longitude: 121.1355,
            radius_meters: 80,
            address: None,
            is_active: false,
        },
    ]
});

pub fn default_locations() -> Vec<WorkplaceLocation> {
    DEFAULT_LOCATIONS.clone()
}

/// Where the directory gets its locations from (the REST backend in
/// production, a scripted mock in tests).
#[async_trait]
pub trait WorkplaceSource: Send + Sync {
    async fn fetch_workplace_locations(&self) -> Result<Vec<WorkplaceLocation>, BackendError>;
}

// --- Workplace Directory Service ---

/// Holds the set of known workplace locations. The list is replaced
/// wholesale on each successful fetch; there is no merge logic.
#[derive(Clone)]
pub struct WorkplaceDirectory {
    source: Arc<dyn WorkplaceSource>,
    locations: Arc<Mutex<Vec<WorkplaceLocation>>>,
}

impl WorkplaceDirectory {
    pub fn new(source: Arc<dyn WorkplaceSource>) -> Self {
        Self {
            source,
            locations: Arc::new(Mutex::new(default_locations())),
        }
    }

    /// Fetches the location list from the backend. On success the in-memory
    /// list is replaced wholesale and the fresh list returned. On failure
    /// the built-in default list is returned and previously fetched state is
    /// left untouched; the caller never sees an error.
    pub async fn refresh(&self) -> Vec<WorkplaceLocation> {
        match self.source.fetch_workplace_locations().await {
            Ok(fresh) => {
                info!("Workplace directory refreshed: {} locations", fresh.len());
                *self.locations.lock().unwrap() = fresh.clone();
                fresh
            }
            Err(e) => {
                warn!(
                    "Failed to fetch workplace locations, serving built-in defaults: {}",
                    e
                );
                default_locations()
            }
        }
    }

    /// Last fetched (or default) list, synchronously, no network call.
    pub fn all(&self) -> Vec<WorkplaceLocation> {
        self.locations.lock().unwrap().clone()
    }

    pub fn active(&self) -> Vec<WorkplaceLocation> {
        let active: Vec<WorkplaceLocation> = self
            .locations
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.is_active)
            .cloned()
            .collect();
        debug!("Active workplace locations: {}", active.len());
        active
    }

    pub fn by_id(&self, id: &str) -> Option<WorkplaceLocation> {
        self.locations
            .lock()
            .unwrap()
            .iter()
            .find(|l| l.id == id)
            .cloned()
    }
}
