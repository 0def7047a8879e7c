// src/assignment.rs

use crate::backend::BackendError;
use crate::clock::Clock;
use crate::workplace::WorkplaceLocation;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

// --- Assignment Data Structures ---

/// The single active workplace assignment for an employee. Owned by the
/// backend; this layer only holds a read-only cached copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeAssignment {
    pub employee_id: String,
    pub workplace_location: WorkplaceLocation,
    pub assigned_by: String,
    pub assigned_at: DateTime<Utc>,
}

/// Wire envelope for the assignment endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentResponse {
    pub assignment: Option<EmployeeAssignment>,
}

#[async_trait]
pub trait AssignmentSource: Send + Sync {
    async fn fetch_my_assignment(&self) -> Result<Option<EmployeeAssignment>, BackendError>;
    async fn fetch_assignment_for(
        &self,
        employee_id: &str,
    ) -> Result<Option<EmployeeAssignment>, BackendError>;
}

#[derive(Debug, Clone)]
struct CachedAssignment {
    assignment: EmployeeAssignment,
    fetched_at: DateTime<Utc>,
}

impl CachedAssignment {
    fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now.signed_duration_since(self.fetched_at) < ttl
    }
}

// --- Assignment Resolver ---

/// Resolves the caller's current workplace assignment with a short-lived
/// cache in front of the backend. Cache entries older than the TTL are
/// refreshed on next access; on fetch failure the last-known-good value is
/// served even if stale. `None` is only returned when nothing has ever been
/// fetched successfully.
///
/// Not reentrant-safe against concurrent forced refreshes: two simultaneous
/// calls may both hit the network. The fetch is idempotent and results
/// converge, so no in-flight de-duplication exists.
#[derive(Clone)]
pub struct AssignmentResolver {
    source: Arc<dyn AssignmentSource>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    cache: Arc<Mutex<Option<CachedAssignment>>>,
}

impl AssignmentResolver {
    pub fn new(source: Arc<dyn AssignmentSource>, clock: Arc<dyn Clock>, ttl_secs: u64) -> Self {
        Self {
            source,
            clock,
            ttl: Duration::seconds(ttl_secs as i64),
            cache: Arc::new(Mutex::new(None)),
        }
    }

    pub async fn my_assignment(&self, force_refresh: bool) -> Option<EmployeeAssignment> {
        let now = self.clock.now_utc();

        if !force_refresh {
            let cache = self.cache.lock().unwrap();
            if let Some(cached) = cache.as_ref() {
                if cached.is_fresh(now, self.ttl) {
                    debug!("Assignment cache hit (age < TTL), skipping backend call");
                    return Some(cached.assignment.clone());
                }
                debug!("Assignment cache entry is stale, refreshing");
            }
        }

        match self.source.fetch_my_assignment().await {
            Ok(Some(assignment)) => {
                info!(
                    "Fetched assignment for {}: {} ({})",
                    assignment.employee_id,
                    assignment.workplace_location.name,
                    assignment.workplace_location.id
                );
                *self.cache.lock().unwrap() = Some(CachedAssignment {
                    assignment: assignment.clone(),
                    fetched_at: now,
                });
                Some(assignment)
            }
            Ok(None) => {
                info!("Backend reports no active assignment");
                *self.cache.lock().unwrap() = None;
                None
            }
            Err(e) => {
                // Serve stale rather than degrading to "no assignment".
                let cache = self.cache.lock().unwrap();
                match cache.as_ref() {
                    Some(cached) => {
                        warn!(
                            "Assignment fetch failed, serving cached value from {}: {}",
                            cached.fetched_at, e
                        );
                        Some(cached.assignment.clone())
                    }
                    None => {
                        warn!("Assignment fetch failed and nothing cached: {}", e);
                        None
                    }
                }
            }
        }
    }

    /// Lookup for a specific employee. These go straight to the backend;
    /// only the caller's own assignment is cached.
    pub async fn assignment_for(&self, employee_id: &str) -> Option<EmployeeAssignment> {
        match self.source.fetch_assignment_for(employee_id).await {
            Ok(assignment) => assignment,
            Err(e) => {
                warn!("Assignment fetch for {} failed: {}", employee_id, e);
                None
            }
        }
    }

    /// Resets the cached value and timestamp, forcing the next call to hit
    /// the backend.
    pub fn clear_cache(&self) {
        debug!("Clearing assignment cache");
        *self.cache.lock().unwrap() = None;
    }

    pub async fn has_assignment(&self) -> bool {
        self.my_assignment(false).await.is_some()
    }
}
