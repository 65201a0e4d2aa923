//! # Alarm registry
//! Two user alarms plus one snooze alarm, each firing at most once per day.
//!
//! Slots compare against the clock by hour and minute only. A slot that
//! matched keeps `fired_today` set until the next day boundary, so a match
//! lasting a whole minute still produces a single event.

use crate::clock::ClockState;

/// Total number of alarm slots
pub const ALARM_SLOTS: usize = 3;

/// Slot reserved for snoozed alarms
pub const SNOOZE_SLOT: usize = 2;

/// How far a snooze pushes the alarm
pub const SNOOZE_MINUTES: u16 = 5;

/// One alarm slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AlarmSlot {
    /// Disabled slots are never evaluated
    pub enabled: bool,
    /// Target hour
    pub hour: u8,
    /// Target minute
    pub minute: u8,
    /// Set when the slot matched, cleared at the day boundary
    pub fired_today: bool,
}

impl AlarmSlot {
    /// A disabled slot that counts as already fired
    pub const fn new() -> Self {
        Self {
            enabled: false,
            hour: 0,
            minute: 0,
            fired_today: true,
        }
    }

    /// Enabled, not yet fired, and matching the clock
    const fn is_due(&self, clock: &ClockState) -> bool {
        self.enabled && !self.fired_today && self.hour == clock.hour && self.minute == clock.minute
    }
}

impl Default for AlarmSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// The user-configurable alarms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UserAlarm {
    /// Slot 0
    First,
    /// Slot 1
    Second,
}

impl UserAlarm {
    /// Slot index in the registry
    pub const fn index(self) -> usize {
        match self {
            Self::First => 0,
            Self::Second => 1,
        }
    }

    /// Number shown to the user
    pub const fn number(self) -> u8 {
        match self {
            Self::First => 1,
            Self::Second => 2,
        }
    }
}

/// A slot matched the clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AlarmEvent {
    /// Index of the slot that matched
    pub slot: usize,
}

/// The three alarm slots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmRegistry {
    /// Slots 0 and 1 belong to the user, slot 2 to snooze
    slots: [AlarmSlot; ALARM_SLOTS],
}

impl AlarmRegistry {
    /// All slots disabled
    pub const fn new() -> Self {
        Self {
            slots: [AlarmSlot::new(); ALARM_SLOTS],
        }
    }

    /// Snapshot of every slot
    pub const fn slots(&self) -> &[AlarmSlot; ALARM_SLOTS] {
        &self.slots
    }

    /// Snapshot of one user slot
    pub const fn user_slot(&self, alarm: UserAlarm) -> &AlarmSlot {
        &self.slots[alarm.index()]
    }

    /// Fire the first due slot in index order, if any.
    ///
    /// Coincident slots are served on later calls, one per call. The snooze
    /// slot is disabled as it fires.
    pub fn evaluate(&mut self, clock: &ClockState) -> Option<AlarmEvent> {
        let (index, slot) = self
            .slots
            .iter_mut()
            .enumerate()
            .find(|(_, slot)| slot.is_due(clock))?;

        slot.fired_today = true;
        if index == SNOOZE_SLOT {
            slot.enabled = false;
        }
        info!(
            "alarm slot {} fired at {:02}:{:02}",
            index, clock.hour, clock.minute
        );
        Some(AlarmEvent { slot: index })
    }

    /// Arm a user alarm for `hour:minute`
    pub const fn set_alarm(&mut self, alarm: UserAlarm, hour: u8, minute: u8) {
        self.slots[alarm.index()] = AlarmSlot {
            enabled: true,
            hour: hour % 24,
            minute: minute % 60,
            fired_today: false,
        };
    }

    /// Disarm a user alarm and forget its time
    pub const fn clear_alarm(&mut self, alarm: UserAlarm) {
        self.slots[alarm.index()] = AlarmSlot::new();
    }

    /// Toggle a user alarm without touching its time or `fired_today`
    pub const fn set_enabled(&mut self, alarm: UserAlarm, enabled: bool) {
        self.slots[alarm.index()].enabled = enabled;
    }

    /// Arm the snooze slot for `hour:minute`, replacing any pending snooze
    pub const fn schedule_snooze(&mut self, hour: u8, minute: u8) {
        self.slots[SNOOZE_SLOT] = AlarmSlot {
            enabled: true,
            hour: hour % 24,
            minute: minute % 60,
            fired_today: false,
        };
    }

    /// Make every slot eligible again
    pub fn day_rolled(&mut self) {
        for slot in &mut self.slots {
            slot.fired_today = false;
        }
    }
}

impl Default for AlarmRegistry {
    fn default() -> Self {
        Self::new()
    }
}
