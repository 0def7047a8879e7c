// src/policy_tests.rs

#[cfg(test)]
mod tests {
    use crate::policy::*;
    use chrono::NaiveTime;

    fn t(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    // --- Clock-in window ---

    #[test]
    fn test_clock_in_unavailable_before_window() {
        let availability = clock_in_availability(t(13, 59));
        assert!(!availability.available);
        assert!(!availability.is_late);
        assert!(!availability.is_expired);
    }

    #[test]
    fn test_clock_in_gated_during_first_twenty_minutes() {
        // The advertised window opens at 14:00, but clock-in is held until
        // 14:20. Not available yet, and not expired either.
        for minute in [0, 10, 19] {
            let availability = clock_in_availability(t(14, minute));
            assert!(!availability.available, "14:{:02} should be gated", minute);
            assert!(!availability.is_expired, "14:{:02} is not expired", minute);
        }
    }

    #[test]
    fn test_clock_in_opens_at_gate_and_is_on_time_before_work_start() {
        for minute in [20, 25, 29] {
            let availability = clock_in_availability(t(14, minute));
            assert!(availability.available, "14:{:02} should be open", minute);
            assert!(!availability.is_late, "14:{:02} is on time", minute);
            assert!(!availability.is_expired);
        }
    }

    #[test]
    fn test_clock_in_is_late_from_work_start() {
        let at_boundary = clock_in_availability(t(14, 30));
        assert!(at_boundary.available);
        assert!(at_boundary.is_late);

        let later = clock_in_availability(t(14, 35));
        assert!(later.available);
        assert!(later.is_late);

        let last_minute = clock_in_availability(t(15, 29));
        assert!(last_minute.available);
        assert!(last_minute.is_late);
    }

    #[test]
    fn test_clock_in_expires_at_cutoff() {
        for (hour, minute) in [(15, 30), (15, 31), (16, 0), (18, 30), (18, 41)] {
            let availability = clock_in_availability(t(hour, minute));
            assert!(
                !availability.available,
                "{:02}:{:02} should be closed",
                hour, minute
            );
            assert!(
                availability.is_expired,
                "{:02}:{:02} should be expired",
                hour, minute
            );
        }
    }

    // --- Clock-out window ---

    #[test]
    fn test_clock_out_requires_prior_clock_in() {
        assert_eq!(
            clock_out_availability(t(18, 35), false, false),
            Err(ClockOutBlock::NotClockedIn)
        );
    }

    #[test]
    fn test_clock_out_rejected_when_already_clocked_out() {
        assert_eq!(
            clock_out_availability(t(18, 35), true, true),
            Err(ClockOutBlock::AlreadyClockedOut)
        );
    }

    #[test]
    fn test_clock_out_rejected_before_work_end() {
        assert_eq!(
            clock_out_availability(t(18, 29), true, false),
            Err(ClockOutBlock::NotYetOpen)
        );
        assert_eq!(
            clock_out_availability(t(12, 0), true, false),
            Err(ClockOutBlock::NotYetOpen)
        );
    }

    #[test]
    fn test_clock_out_accepted_inside_window() {
        assert!(clock_out_availability(t(18, 30), true, false).is_ok());
        assert!(clock_out_availability(t(18, 35), true, false).is_ok());
        assert!(clock_out_availability(t(18, 39), true, false).is_ok());
    }

    #[test]
    fn test_clock_out_rejected_at_absolute_cutoff() {
        assert_eq!(
            clock_out_availability(t(18, 40), true, false),
            Err(ClockOutBlock::DayEnded)
        );
        assert_eq!(
            clock_out_availability(t(18, 41), true, false),
            Err(ClockOutBlock::DayEnded)
        );
    }

    // --- Countdown ---

    #[test]
    fn test_millis_until_counts_down_to_work_end() {
        assert_eq!(millis_until(work_end_time(), t(17, 30)), 3_600_000);
        assert_eq!(
            millis_until(work_end_time(), NaiveTime::from_hms_opt(18, 29, 30).unwrap()),
            30_000
        );
    }

    #[test]
    fn test_millis_until_stops_at_zero() {
        assert_eq!(millis_until(work_end_time(), t(18, 30)), 0);
        assert_eq!(millis_until(work_end_time(), t(18, 35)), 0);
    }

    #[test]
    fn test_window_constants_are_ordered() {
        assert!(CLOCK_IN_WINDOW_START_MIN < CLOCK_IN_GATE_OPEN_MIN);
        assert!(CLOCK_IN_GATE_OPEN_MIN < WORK_START_MIN);
        assert!(WORK_START_MIN < CLOCK_IN_CUTOFF_MIN);
        assert!(CLOCK_IN_CUTOFF_MIN < WORK_END_MIN);
        assert!(WORK_END_MIN < EXTENDED_CLOCK_OUT_MIN);
    }
}
