//! # Clock
//! Wall-clock fields, the UTC offset table and the clock source that keeps them moving.
//!
//! The clock source free-runs from a monotonic millisecond counter and can be
//! re-anchored at any time from an external time authority. Free-running
//! continues seamlessly from the last synchronized value.

/// Milliseconds in one wall-clock minute
pub const MS_PER_MINUTE: u64 = 60_000;

/// Seconds in one day
const SECONDS_PER_DAY: i64 = 86_400;

/// Selectable minute parts of a UTC offset, addressed by index
pub const OFFSET_MINUTE_STEPS: [u8; 3] = [0, 30, 45];

/// Lowest selectable offset hour
pub const MIN_OFFSET_HOURS: i8 = -12;

/// Highest selectable offset hour
pub const MAX_OFFSET_HOURS: i8 = 14;

/// Normalized wall-clock fields
///
/// `day` is a day-of-month when the value came from a time authority and a
/// plain counter while free-running; it is only ever compared for change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockState {
    /// Day number
    pub day: u32,
    /// Hour, 0..=23
    pub hour: u8,
    /// Minute, 0..=59
    pub minute: u8,
    /// Second, 0..=59
    pub second: u8,
}

impl ClockState {
    /// Create a clock state, folding out-of-range fields back into range
    pub const fn new(day: u32, hour: u8, minute: u8, second: u8) -> Self {
        Self {
            day,
            hour: hour % 24,
            minute: minute % 60,
            second: second % 60,
        }
    }

    /// Advance by one minute, carrying into hour and day.
    /// Returns `true` when the day rolled over.
    pub const fn advance_minute(&mut self) -> bool {
        self.minute += 1;
        if self.minute < 60 {
            return false;
        }
        self.minute = 0;
        self.hour += 1;
        if self.hour < 24 {
            return false;
        }
        self.hour = 0;
        self.day = self.day.wrapping_add(1);
        true
    }

    /// Hour and minute `minutes` from now, wrapping at midnight. The day is not tracked.
    pub const fn after_minutes(&self, minutes: u16) -> (u8, u8) {
        let total = (self.hour as u16 * 60 + self.minute as u16 + minutes) % (24 * 60);
        ((total / 60) as u8, (total % 60) as u8)
    }

    /// Build clock fields from local Unix seconds (offset already applied)
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub const fn from_unix_seconds(secs: i64) -> Self {
        let days = secs.div_euclid(SECONDS_PER_DAY);
        let rem = secs.rem_euclid(SECONDS_PER_DAY);
        Self {
            day: day_of_month(days),
            hour: (rem / 3600) as u8,
            minute: (rem % 3600 / 60) as u8,
            second: (rem % 60) as u8,
        }
    }
}

/// Day of month for a count of days since 1970-01-01 (proleptic Gregorian)
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
const fn day_of_month(days: i64) -> u32 {
    let z = days + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    (doy - (153 * mp + 2) / 5 + 1) as u32
}

/// Fixed UTC offset: whole hours plus one of [`OFFSET_MINUTE_STEPS`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UtcOffset {
    /// Signed hours, -12..=14
    hours: i8,
    /// Index into [`OFFSET_MINUTE_STEPS`]
    minutes_index: u8,
}

impl UtcOffset {
    /// Create an offset, clamping both parts into their valid ranges
    pub const fn new(hours: i8, minutes_index: u8) -> Self {
        let hours = if hours < MIN_OFFSET_HOURS {
            MIN_OFFSET_HOURS
        } else if hours > MAX_OFFSET_HOURS {
            MAX_OFFSET_HOURS
        } else {
            hours
        };
        let last = (OFFSET_MINUTE_STEPS.len() - 1) as u8;
        let minutes_index = if minutes_index > last { last } else { minutes_index };
        Self { hours, minutes_index }
    }

    /// Signed hour part
    pub const fn hours(&self) -> i8 {
        self.hours
    }

    /// Index of the minute part
    pub const fn minutes_index(&self) -> u8 {
        self.minutes_index
    }

    /// Minute part, always non-negative
    pub const fn minutes(&self) -> u8 {
        OFFSET_MINUTE_STEPS[self.minutes_index as usize]
    }

    /// Offset in seconds. The sign of the hours applies to the whole magnitude,
    /// so -5:30 is -19800 and 0:30 is +1800.
    pub const fn seconds(&self) -> i32 {
        let magnitude = self.hours.unsigned_abs() as i32 * 3600 + self.minutes() as i32 * 60;
        if self.hours >= 0 { magnitude } else { -magnitude }
    }
}

impl Default for UtcOffset {
    /// +5:30
    fn default() -> Self {
        Self::new(5, 1)
    }
}

/// Where the clock's current value comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockMode {
    /// Counting minutes from the monotonic tick
    FreeRunning,
    /// Last cycle took its value from the time authority
    Synchronized,
}

/// Result of one clock update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Tick {
    /// Clock value after the update
    pub state: ClockState,
    /// The update crossed midnight
    pub day_rolled: bool,
}

/// Owner of the wall clock
#[derive(Debug, Clone)]
pub struct ClockSource {
    /// Current value
    state: ClockState,
    /// Monotonic time at which the current minute started; negative when
    /// the clock was anchored less than a minute after boot
    minute_start_ms: i64,
    /// Current mode
    mode: ClockMode,
    /// Whether any synchronization has happened since boot
    synchronized_once: bool,
    /// Day whose alarms are armed; a rollover is reported once per day
    armed_day: u32,
}

impl ClockSource {
    /// Start free-running from `initial` at monotonic time `now_ms`
    pub const fn new(initial: ClockState, now_ms: u64) -> Self {
        Self {
            state: initial,
            minute_start_ms: anchor(now_ms, initial.second),
            mode: ClockMode::FreeRunning,
            synchronized_once: false,
            armed_day: initial.day,
        }
    }

    /// Current value without advancing
    pub const fn state(&self) -> ClockState {
        self.state
    }

    /// Current mode
    pub const fn mode(&self) -> ClockMode {
        self.mode
    }

    /// Advance by the real time elapsed since the minute anchor, catching up
    /// every whole minute that passed.
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    pub fn tick(&mut self, now_ms: u64) -> Tick {
        let now_ms = now_ms as i64;
        let mut crossed_midnight = false;
        while now_ms - self.minute_start_ms >= MS_PER_MINUTE as i64 {
            self.minute_start_ms += MS_PER_MINUTE as i64;
            crossed_midnight |= self.state.advance_minute();
        }
        self.state.second = ((now_ms - self.minute_start_ms).max(0) / 1000) as u8;
        let day_rolled = crossed_midnight && self.arm_day(self.state.day);
        if day_rolled {
            debug!("day rolled over while free-running");
        }
        Tick {
            state: self.state,
            day_rolled,
        }
    }

    /// Replace the whole value with one fetched from the time authority.
    ///
    /// Reports a day rollover when the new value carries the clock forward
    /// across midnight into a day that has not been rolled into yet. The
    /// first synchronization after boot never does, and a correction that
    /// steps back across midnight leaves the armed day alone.
    pub fn synchronize(&mut self, fetched: ClockState, now_ms: u64) -> Tick {
        let previous = self.state;
        let day_rolled = if self.synchronized_once {
            let forward = fetched.day != previous.day && previous.hour >= 12 && fetched.hour < 12;
            forward && self.arm_day(fetched.day)
        } else {
            self.armed_day = fetched.day;
            false
        };

        self.state = fetched;
        self.minute_start_ms = anchor(now_ms, fetched.second);
        self.synchronized_once = true;
        if self.mode != ClockMode::Synchronized {
            info!(
                "clock synchronized to {:02}:{:02}:{:02}",
                fetched.hour, fetched.minute, fetched.second
            );
            self.mode = ClockMode::Synchronized;
        }

        Tick {
            state: fetched,
            day_rolled,
        }
    }

    /// Make `day` the armed day. Returns `false` if it already was.
    const fn arm_day(&mut self, day: u32) -> bool {
        if self.armed_day == day {
            return false;
        }
        self.armed_day = day;
        true
    }

    /// Note that the authority could not be reached; the clock keeps free-running
    pub fn lose_sync(&mut self) {
        if self.mode == ClockMode::Synchronized {
            warn!("time authority unavailable, clock is free-running");
            self.mode = ClockMode::FreeRunning;
        }
    }
}

/// Monotonic start of the minute that is `second` seconds old at `now_ms`
#[allow(clippy::cast_possible_wrap)]
const fn anchor(now_ms: u64, second: u8) -> i64 {
    now_ms as i64 - second as i64 * 1000
}
