// src/service.rs

use crate::attendance::{AttendanceError, AttendanceLedger, AttendanceRecord, DayStatus};
use crate::backend::{AttendanceSubmission, BackendClient, BackendError};
use crate::clock::Clock;
use crate::geofence::{GeofenceCheckResult, GeofenceEvaluator, ERROR_NO_LOCATION_ASSIGNED};
use crate::location::LocationProvider;
use crate::policy;
use crate::workplace::{WorkplaceDirectory, WorkplaceLocation};
use chrono::NaiveDate;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Backend request failed")]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Attendance(#[from] AttendanceError),
}

/// A clock action either goes through or is blocked by a guarded
/// precondition (outside the geofence, outside the time window, wrong
/// state). Blocks are not errors; they carry the inline explanation the UI
/// shows next to the disabled action.
#[derive(Debug, Clone, PartialEq)]
pub enum ClockInOutcome {
    Recorded { time: String, late: bool },
    Blocked(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClockOutOutcome {
    Recorded { time: String },
    Blocked(String),
}

#[derive(Debug, Clone)]
pub struct TodayOverview {
    pub date: NaiveDate,
    pub status: DayStatus,
    pub record: Option<AttendanceRecord>,
    pub clock_in: policy::ClockInAvailability,
    /// Countdown to the end of the working day, present while clocked in
    /// and not yet past it. The caller owns the refresh tick.
    pub clock_out_countdown_millis: Option<i64>,
}

// --- Orchestration Facade ---

/// Ties the engine together for the UI layer: geofence evaluation gates the
/// action, the window policy gates the time, the backend receives the
/// submission, and the local ledger records the outcome.
#[derive(Clone)]
pub struct FieldOpsService {
    backend: BackendClient,
    directory: WorkplaceDirectory,
    geofence: GeofenceEvaluator,
    ledger: AttendanceLedger,
    location: Arc<dyn LocationProvider>,
    clock: Arc<dyn Clock>,
}

impl FieldOpsService {
    pub fn new(
        backend: BackendClient,
        directory: WorkplaceDirectory,
        geofence: GeofenceEvaluator,
        ledger: AttendanceLedger,
        location: Arc<dyn LocationProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            backend,
            directory,
            geofence,
            ledger,
            location,
            clock,
        }
    }

    pub async fn locations(&self, refresh: bool) -> Vec<WorkplaceLocation> {
        if refresh {
            self.directory.refresh().await
        } else {
            self.directory.all()
        }
    }

    pub async fn check_location(&self, employee_id: Option<&str>) -> GeofenceCheckResult {
        self.geofence.check_workplace_radius(employee_id).await
    }

    pub async fn clock_in(&self, employee_id: &str) -> Result<ClockInOutcome, ServiceError> {
        let check = self.geofence.check_workplace_radius(None).await;
        if let Some(error) = check.error {
            return Ok(ClockInOutcome::Blocked(error));
        }
        let location = match check.assigned_location {
            Some(l) => l,
            None => {
                return Ok(ClockInOutcome::Blocked(
                    ERROR_NO_LOCATION_ASSIGNED.to_string(),
                ))
            }
        };
        if !check.is_within_radius {
            return Ok(ClockInOutcome::Blocked(format!(
                "Outside the workplace radius: {:.0} m from {}, allowed {} m",
                check.distance_meters, location.name, location.radius_meters
            )));
        }

        let availability = policy::clock_in_availability(self.clock.time_of_day());
        if !availability.available {
            let reason = if availability.is_expired {
                "The clock-in window has closed for today"
            } else {
                "Clock-in has not opened yet"
            };
            return Ok(ClockInOutcome::Blocked(reason.to_string()));
        }

        if self.ledger.today_status(employee_id) != DayStatus::NotStarted {
            return Ok(ClockInOutcome::Blocked(
                "Already clocked in today".to_string(),
            ));
        }

        // The geofence check already obtained permission; grab the fix
        // again so the submission carries the device's coordinates.
        let position = match self.location.current_position().await {
            Ok(p) => p,
            Err(e) => return Ok(ClockInOutcome::Blocked(e.to_string())),
        };

        let submission = AttendanceSubmission {
            employee_id: employee_id.to_string(),
            workplace_location_id: location.id.clone(),
            latitude: position.latitude,
            longitude: position.longitude,
            distance_meters: check.distance_meters,
            recorded_at: self.clock.now_utc(),
        };
        self.backend.submit_check_in(&submission).await?;

        let date = self.clock.today();
        self.ledger.record_clock_in(employee_id, date)?;
        let time = self
            .ledger
            .record(employee_id, date)
            .and_then(|r| r.clock_in_time)
            .unwrap_or_default();

        info!(
            "Clock-in completed for {} at {} ({})",
            employee_id,
            time,
            if availability.is_late { "late" } else { "on time" }
        );
        Ok(ClockInOutcome::Recorded {
            time,
            late: availability.is_late,
        })
    }

    pub async fn clock_out(&self, employee_id: &str) -> Result<ClockOutOutcome, ServiceError> {
        let record = self.ledger.today_record(employee_id);
        let has_clock_in = record
            .as_ref()
            .map(|r| r.clock_in_time.is_some())
            .unwrap_or(false);
        let has_clock_out = record
            .as_ref()
            .map(|r| r.clock_out_time.is_some())
            .unwrap_or(false);

        if let Err(block) =
            policy::clock_out_availability(self.clock.time_of_day(), has_clock_in, has_clock_out)
        {
            return Ok(ClockOutOutcome::Blocked(block.to_string()));
        }

        let check = self.geofence.check_workplace_radius(None).await;
        if let Some(error) = check.error {
            return Ok(ClockOutOutcome::Blocked(error));
        }
        let location = match check.assigned_location {
            Some(l) => l,
            None => {
                return Ok(ClockOutOutcome::Blocked(
                    ERROR_NO_LOCATION_ASSIGNED.to_string(),
                ))
            }
        };
        if !check.is_within_radius {
            return Ok(ClockOutOutcome::Blocked(format!(
                "Outside the workplace radius: {:.0} m from {}, allowed {} m",
                check.distance_meters, location.name, location.radius_meters
            )));
        }

        let position = match self.location.current_position().await {
            Ok(p) => p,
            Err(e) => return Ok(ClockOutOutcome::Blocked(e.to_string())),
        };

        let submission = AttendanceSubmission {
            employee_id: employee_id.to_string(),
            workplace_location_id: location.id.clone(),
            latitude: position.latitude,
            longitude: position.longitude,
            distance_meters: check.distance_meters,
            recorded_at: self.clock.now_utc(),
        };
        self.backend.submit_check_out(&submission).await?;

        let date = self.clock.today();
        self.ledger.record_clock_out(employee_id, date)?;
        let time = self
            .ledger
            .record(employee_id, date)
            .and_then(|r| r.clock_out_time)
            .unwrap_or_default();

        info!("Clock-out completed for {} at {}", employee_id, time);
        Ok(ClockOutOutcome::Recorded { time })
    }

    pub fn today_overview(&self, employee_id: &str) -> TodayOverview {
        let date = self.clock.today();
        let now = self.clock.time_of_day();
        let status = self.ledger.status(employee_id, date);
        let record = self.ledger.record(employee_id, date);

        let clock_out_countdown_millis = if status == DayStatus::InProgress
            && now <= policy::work_end_time()
        {
            Some(policy::millis_until(policy::work_end_time(), now))
        } else {
            None
        };

        TodayOverview {
            date,
            status,
            record,
            clock_in: policy::clock_in_availability(now),
            clock_out_countdown_millis,
        }
    }
}
