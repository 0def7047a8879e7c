// src/policy.rs

use chrono::{NaiveTime, Timelike};
use thiserror::Error;

// --- Attendance Window Constants ---
//
// All thresholds are minutes-of-day so the windows can be audited and
// adjusted in one place. The advertised clock-in window opens at 14:00, but
// the observed gate holds new clock-ins until 14:20; both are kept as
// distinct constants.

/// 14:00, start of the advertised clock-in window.
pub const CLOCK_IN_WINDOW_START_MIN: u32 = 14 * 60;
/// 14:20, when clock-in actually opens (20 minutes into the window).
pub const CLOCK_IN_GATE_OPEN_MIN: u32 = 14 * 60 + 20;
/// 14:30, the lateness boundary. Clock-ins at or after this count as late.
pub const WORK_START_MIN: u32 = 14 * 60 + 30;
/// 15:30, hard cutoff for clock-in.
pub const CLOCK_IN_CUTOFF_MIN: u32 = 15 * 60 + 30;
/// 18:30, end of the working day. Clock-out opens here; no new clock-ins.
pub const WORK_END_MIN: u32 = 18 * 60 + 30;
/// 18:40, absolute end of day. No actions permitted at or after this.
pub const EXTENDED_CLOCK_OUT_MIN: u32 = 18 * 60 + 40;

fn minute_of_day(t: NaiveTime) -> u32 {
    t.hour() * 60 + t.minute()
}

// --- Clock-in Gating ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClockInAvailability {
    pub available: bool,
    pub is_late: bool,
    pub is_expired: bool,
}

/// Whether a clock-in is permitted at `now`.
///
/// Before 14:00 and in [14:00, 14:20) the window has not opened yet (not
/// expired). In [14:20, 15:30) clock-in is available, late from 14:30. At
/// or after 15:30 the window has expired.
pub fn clock_in_availability(now: NaiveTime) -> ClockInAvailability {
    let minute = minute_of_day(now);

    if minute < CLOCK_IN_GATE_OPEN_MIN {
        return ClockInAvailability::default();
    }

    if minute < CLOCK_IN_CUTOFF_MIN {
        return ClockInAvailability {
            available: true,
            is_late: minute >= WORK_START_MIN,
            is_expired: false,
        };
    }

    ClockInAvailability {
        available: false,
        is_late: false,
        is_expired: true,
    }
}

// --- Clock-out Gating ---

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockOutBlock {
    #[error("Cannot clock out without a prior clock-in")]
    NotClockedIn,

    #[error("Already clocked out for today")]
    AlreadyClockedOut,

    #[error("Clock-out has not opened yet; it opens at the end of the working day")]
    NotYetOpen,

    #[error("The day has ended; clock-out is no longer permitted")]
    DayEnded,
}

/// Whether a clock-out is permitted at `now`, given the day's recorded
/// state. Clock-out is only open in [18:30, 18:40), and only with a prior
/// clock-in and no prior clock-out.
pub fn clock_out_availability(
    now: NaiveTime,
    has_clock_in: bool,
    has_clock_out: bool,
) -> Result<(), ClockOutBlock> {
    if !has_clock_in {
        return Err(ClockOutBlock::NotClockedIn);
    }
    if has_clock_out {
        return Err(ClockOutBlock::AlreadyClockedOut);
    }

    let minute = minute_of_day(now);
    if minute >= EXTENDED_CLOCK_OUT_MIN {
        return Err(ClockOutBlock::DayEnded);
    }
    if minute < WORK_END_MIN {
        return Err(ClockOutBlock::NotYetOpen);
    }

    Ok(())
}

// --- Countdown ---

/// Milliseconds from `now` until `target`, clamped at zero. The caller owns
/// the tick; this stays a pure function so the policy carries no timers.
pub fn millis_until(target: NaiveTime, now: NaiveTime) -> i64 {
    target.signed_duration_since(now).num_milliseconds().max(0)
}

pub fn work_end_time() -> NaiveTime {
    NaiveTime::from_hms_opt(WORK_END_MIN / 60, WORK_END_MIN % 60, 0)
        .expect("work end constant is a valid time of day")
}
