// src/attendance_tests.rs

#[cfg(test)]
mod tests {
    use crate::attendance::*;
    use crate::clock::{Clock, TestClock};
    use crate::store::MemoryStore;
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn create_test_ledger(datetime: &str) -> (AttendanceLedger, MemoryStore, TestClock) {
        let store = MemoryStore::new();
        let clock = TestClock::new(datetime);
        let ledger = AttendanceLedger::new(Arc::new(store.clone()), Arc::new(clock.clone()));
        (ledger, store, clock)
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_clock_in_creates_record_with_time() {
        let (ledger, _store, clock) = create_test_ledger("2025-06-02 14:25:00");
        let today = clock.today();

        ledger.record_clock_in("emp-1", today).unwrap();

        let record = ledger.record("emp-1", today).unwrap();
        assert_eq!(record.clock_in_time.as_deref(), Some("14:25:00"));
        assert!(record.clock_in_instant.is_some());
        assert!(record.clock_out_time.is_none());
        assert_eq!(ledger.status("emp-1", today), DayStatus::InProgress);
    }

    #[test]
    fn test_second_clock_in_errors_and_keeps_first_record() {
        let (ledger, _store, clock) = create_test_ledger("2025-06-02 14:25:00");
        let today = clock.today();

        ledger.record_clock_in("emp-1", today).unwrap();
        clock.set_time("2025-06-02 14:40:00");

        let result = ledger.record_clock_in("emp-1", today);
        assert!(matches!(
            result,
            Err(AttendanceError::AlreadyClockedIn { .. })
        ));

        // Exactly one clock-in remains, with the original timestamp.
        let record = ledger.record("emp-1", today).unwrap();
        assert_eq!(record.clock_in_time.as_deref(), Some("14:25:00"));
    }

    #[test]
    fn test_clock_out_without_clock_in_errors() {
        let (ledger, _store, clock) = create_test_ledger("2025-06-02 18:35:00");
        let result = ledger.record_clock_out("emp-1", clock.today());
        assert!(matches!(result, Err(AttendanceError::NotClockedIn { .. })));
        assert_eq!(ledger.today_status("emp-1"), DayStatus::NotStarted);
    }

    #[test]
    fn test_full_day_cycle_completes() {
        let (ledger, _store, clock) = create_test_ledger("2025-06-02 14:25:00");
        let today = clock.today();

        ledger.record_clock_in("emp-1", today).unwrap();
        clock.set_time("2025-06-02 18:35:00");
        ledger.record_clock_out("emp-1", today).unwrap();

        let record = ledger.record("emp-1", today).unwrap();
        assert_eq!(record.clock_in_time.as_deref(), Some("14:25:00"));
        assert_eq!(record.clock_out_time.as_deref(), Some("18:35:00"));
        assert_eq!(ledger.status("emp-1", today), DayStatus::Completed);
    }

    #[test]
    fn test_second_clock_out_errors() {
        let (ledger, _store, clock) = create_test_ledger("2025-06-02 14:25:00");
        let today = clock.today();

        ledger.record_clock_in("emp-1", today).unwrap();
        clock.set_time("2025-06-02 18:35:00");
        ledger.record_clock_out("emp-1", today).unwrap();

        let result = ledger.record_clock_out("emp-1", today);
        assert!(matches!(
            result,
            Err(AttendanceError::AlreadyClockedOut { .. })
        ));
    }

    #[test]
    fn test_records_survive_reload_from_same_store() {
        let (ledger, store, clock) = create_test_ledger("2025-06-02 14:25:00");
        let today = clock.today();
        ledger.record_clock_in("emp-1", today).unwrap();

        // A fresh ledger over the same store sees the persisted state.
        let reloaded = AttendanceLedger::new(Arc::new(store), Arc::new(clock));
        assert_eq!(reloaded.status("emp-1", today), DayStatus::InProgress);
        let record = reloaded.record("emp-1", today).unwrap();
        assert_eq!(record.clock_in_time.as_deref(), Some("14:25:00"));
    }

    #[test]
    fn test_corrupt_stored_blob_starts_empty() {
        use crate::store::KeyValueStore;

        let store = MemoryStore::new();
        store
            .set_raw(ATTENDANCE_RECORDS_KEY, "not valid json".to_string())
            .unwrap();

        let clock = TestClock::new("2025-06-02 14:25:00");
        let ledger = AttendanceLedger::new(Arc::new(store), Arc::new(clock));
        assert_eq!(ledger.today_status("emp-1"), DayStatus::NotStarted);
    }

    #[test]
    fn test_employees_are_independent_per_day() {
        let (ledger, _store, clock) = create_test_ledger("2025-06-02 14:25:00");
        let today = clock.today();

        ledger.record_clock_in("emp-1", today).unwrap();
        assert_eq!(ledger.status("emp-1", today), DayStatus::InProgress);
        assert_eq!(ledger.status("emp-2", today), DayStatus::NotStarted);
    }

    #[test]
    fn test_days_are_independent_per_employee() {
        let (ledger, _store, _clock) = create_test_ledger("2025-06-03 14:25:00");

        ledger.record_clock_in("emp-1", date("2025-06-03")).unwrap();
        assert_eq!(ledger.status("emp-1", date("2025-06-02")), DayStatus::NotStarted);
        assert_eq!(ledger.status("emp-1", date("2025-06-03")), DayStatus::InProgress);
    }
}
