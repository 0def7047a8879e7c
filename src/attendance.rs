// src/attendance.rs

use crate::clock::Clock;
use crate::store::{get_json, set_json, KeyValueStore, StoreError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const ATTENDANCE_RECORDS_KEY: &str = "attendance_records";

const DATE_KEY_FORMAT: &str = "%Y-%m-%d";
const TIME_DISPLAY_FORMAT: &str = "%H:%M:%S";

// --- Attendance Data Structures ---

/// One employee's attendance for one calendar day. Created on the first
/// successful clock-in of the day, mutated once more on clock-out,
/// immutable thereafter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub clock_in_time: Option<String>,
    pub clock_in_instant: Option<chrono::DateTime<chrono::Utc>>,
    pub clock_out_time: Option<String>,
}

/// Two-level mapping: ISO date string -> employee id -> record.
type LedgerMap = HashMap<String, HashMap<String, AttendanceRecord>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DayStatus {
    NotStarted,
    InProgress,
    Completed,
}

#[derive(Error, Debug)]
pub enum AttendanceError {
    #[error("Already clocked in on {date} for employee {employee_id}")]
    AlreadyClockedIn {
        employee_id: String,
        date: NaiveDate,
    },

    #[error("No clock-in recorded on {date} for employee {employee_id}")]
    NotClockedIn {
        employee_id: String,
        date: NaiveDate,
    },

    #[error("Already clocked out on {date} for employee {employee_id}")]
    AlreadyClockedOut {
        employee_id: String,
        date: NaiveDate,
    },

    #[error("Failed to persist attendance records")]
    Store(#[from] StoreError),
}

// --- Attendance Ledger ---

/// Day-keyed, then employee-keyed attendance records. The full mapping is
/// loaded into memory at construction and written back wholesale after
/// every mutation, so records survive restarts. The read-modify-write is
/// not guarded across processes (single-device assumption).
#[derive(Clone)]
pub struct AttendanceLedger {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    records: Arc<Mutex<LedgerMap>>,
}

impl AttendanceLedger {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        let records = match get_json::<LedgerMap>(store.as_ref(), ATTENDANCE_RECORDS_KEY) {
            Ok(Some(map)) => {
                debug!("Loaded attendance records for {} dates", map.len());
                map
            }
            Ok(None) => LedgerMap::new(),
            Err(e) => {
                // A corrupt blob should not brick attendance; start fresh.
                warn!("Could not load attendance records, starting empty: {}", e);
                LedgerMap::new()
            }
        };

        Self {
            store,
            clock,
            records: Arc::new(Mutex::new(records)),
        }
    }

    pub fn record_clock_in(
        &self,
        employee_id: &str,
        date: NaiveDate,
    ) -> Result<(), AttendanceError> {
        let date_key = date.format(DATE_KEY_FORMAT).to_string();
        let time = self.clock.time_of_day().format(TIME_DISPLAY_FORMAT).to_string();
        let instant = self.clock.now_utc();

        {
            let mut records = self.records.lock().unwrap();
            let record = records
                .entry(date_key)
                .or_default()
                .entry(employee_id.to_string())
                .or_default();

            if record.clock_in_time.is_some() {
                return Err(AttendanceError::AlreadyClockedIn {
                    employee_id: employee_id.to_string(),
                    date,
                });
            }

            record.clock_in_time = Some(time.clone());
            record.clock_in_instant = Some(instant);
        }

        info!("Recorded clock-in for {} on {} at {}", employee_id, date, time);
        self.persist()
    }

    pub fn record_clock_out(
        &self,
        employee_id: &str,
        date: NaiveDate,
    ) -> Result<(), AttendanceError> {
        let date_key = date.format(DATE_KEY_FORMAT).to_string();
        let time = self.clock.time_of_day().format(TIME_DISPLAY_FORMAT).to_string();

        {
            let mut records = self.records.lock().unwrap();
            let record = records
                .get_mut(&date_key)
                .and_then(|day| day.get_mut(employee_id));

            let record = match record {
                Some(r) if r.clock_in_time.is_some() => r,
                _ => {
                    return Err(AttendanceError::NotClockedIn {
                        employee_id: employee_id.to_string(),
                        date,
                    })
                }
            };

            if record.clock_out_time.is_some() {
                return Err(AttendanceError::AlreadyClockedOut {
                    employee_id: employee_id.to_string(),
                    date,
                });
            }

            record.clock_out_time = Some(time.clone());
        }

        info!("Recorded clock-out for {} on {} at {}", employee_id, date, time);
        self.persist()
    }

    pub fn record(&self, employee_id: &str, date: NaiveDate) -> Option<AttendanceRecord> {
        let date_key = date.format(DATE_KEY_FORMAT).to_string();
        self.records
            .lock()
            .unwrap()
            .get(&date_key)
            .and_then(|day| day.get(employee_id))
            .cloned()
    }

    pub fn status(&self, employee_id: &str, date: NaiveDate) -> DayStatus {
        match self.record(employee_id, date) {
            Some(r) if r.clock_out_time.is_some() => DayStatus::Completed,
            Some(r) if r.clock_in_time.is_some() => DayStatus::InProgress,
            _ => DayStatus::NotStarted,
        }
    }

    pub fn today_status(&self, employee_id: &str) -> DayStatus {
        self.status(employee_id, self.clock.today())
    }

    pub fn today_record(&self, employee_id: &str) -> Option<AttendanceRecord> {
        self.record(employee_id, self.clock.today())
    }

    fn persist(&self) -> Result<(), AttendanceError> {
        let records = self.records.lock().unwrap().clone();
        set_json(self.store.as_ref(), ATTENDANCE_RECORDS_KEY, &records)?;
        Ok(())
    }
}
