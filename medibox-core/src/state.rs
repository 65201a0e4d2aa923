//! # System state
//! Everything the main loop owns: the clock, the UTC offset and the alarm registry.

use crate::alarm::{AlarmRegistry, UserAlarm};
use crate::clock::{ClockSource, ClockState, Tick, UtcOffset};

/// Owned application state
#[derive(Debug, Clone)]
pub struct SystemState {
    /// Wall clock
    pub clock: ClockSource,
    /// Offset passed to the time authority
    pub offset: UtcOffset,
    /// Alarm slots
    pub alarms: AlarmRegistry,
}

impl SystemState {
    /// Fresh state: clock at midnight of day 0, default offset, no alarms
    pub const fn new(now_ms: u64) -> Self {
        Self {
            clock: ClockSource::new(ClockState::new(0, 0, 0, 0), now_ms),
            offset: UtcOffset::new(5, 1),
            alarms: AlarmRegistry::new(),
        }
    }

    /// Current clock value
    pub const fn now(&self) -> ClockState {
        self.clock.state()
    }

    /// Take a clock update into account, clearing `fired_today` on a day rollover
    pub fn apply(&mut self, tick: Tick) -> ClockState {
        if tick.day_rolled {
            info!("new day, alarms re-armed");
            self.alarms.day_rolled();
        }
        tick.state
    }

    /// Advance the clock in free-running mode
    pub fn advance(&mut self, now_ms: u64) -> ClockState {
        let tick = self.clock.tick(now_ms);
        self.apply(tick)
    }

    /// Use `offset` for the next synchronization
    pub fn set_offset(&mut self, offset: UtcOffset) {
        info!("UTC offset set to {}:{:02}", offset.hours(), offset.minutes());
        self.offset = offset;
    }

    /// Arm a user alarm
    pub fn arm_alarm(&mut self, alarm: UserAlarm, hour: u8, minute: u8) {
        info!("alarm {} set to {:02}:{:02}", alarm.number(), hour, minute);
        self.alarms.set_alarm(alarm, hour, minute);
    }

    /// Disarm a user alarm
    pub fn disarm_alarm(&mut self, alarm: UserAlarm) {
        info!("alarm {} disabled", alarm.number());
        self.alarms.clear_alarm(alarm);
    }
}
