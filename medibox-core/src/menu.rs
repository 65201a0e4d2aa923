//! # Menu
//! Menu options, the cursor over them and the two value editors.
//!
//! Editors work on a private copy of the value; nothing is applied until the
//! caller confirms the last step.

use crate::alarm::{AlarmSlot, UserAlarm};
use crate::clock::{MAX_OFFSET_HOURS, MIN_OFFSET_HOURS, OFFSET_MINUTE_STEPS, UtcOffset};

/// Entries of the main menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MenuOption {
    /// Edit the UTC offset
    SetTimeZone,
    /// Edit and arm a user alarm
    SetAlarm(UserAlarm),
    /// Disarm a user alarm
    RemoveAlarm(UserAlarm),
}

/// Menu entries in display order
pub const MENU_OPTIONS: [MenuOption; 5] = [
    MenuOption::SetTimeZone,
    MenuOption::SetAlarm(UserAlarm::First),
    MenuOption::RemoveAlarm(UserAlarm::First),
    MenuOption::SetAlarm(UserAlarm::Second),
    MenuOption::RemoveAlarm(UserAlarm::Second),
];

impl MenuOption {
    /// Text shown in the menu list
    pub const fn label(self) -> &'static str {
        match self {
            Self::SetTimeZone => " 1 : Set Time Zone",
            Self::SetAlarm(UserAlarm::First) => " 2 : Set Alarm 1",
            Self::RemoveAlarm(UserAlarm::First) => " 3 : Remove Alarm 1",
            Self::SetAlarm(UserAlarm::Second) => " 4 : Set Alarm 2",
            Self::RemoveAlarm(UserAlarm::Second) => " 5 : Remove Alarm 2",
        }
    }
}

/// Highlighted menu entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MenuCursor {
    /// Index into [`MENU_OPTIONS`]
    index: usize,
}

impl MenuCursor {
    /// Cursor on the first entry
    pub const fn new() -> Self {
        Self { index: 0 }
    }

    /// Index of the highlighted entry
    pub const fn index(&self) -> usize {
        self.index
    }

    /// The highlighted entry
    pub const fn selected(&self) -> MenuOption {
        MENU_OPTIONS[self.index]
    }

    /// Move down, wrapping to the top
    pub const fn next(&mut self) {
        self.index = (self.index + 1) % MENU_OPTIONS.len();
    }

    /// Move up, wrapping to the bottom
    pub const fn previous(&mut self) {
        self.index = (self.index + MENU_OPTIONS.len() - 1) % MENU_OPTIONS.len();
    }
}

/// Working copy of a UTC offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetEditor {
    /// Signed hours
    hours: i8,
    /// Index into [`OFFSET_MINUTE_STEPS`]
    minutes_index: u8,
}

impl OffsetEditor {
    /// Start from `offset`
    pub const fn new(offset: UtcOffset) -> Self {
        Self {
            hours: offset.hours(),
            minutes_index: offset.minutes_index(),
        }
    }

    /// Hours being edited
    pub const fn hours(&self) -> i8 {
        self.hours
    }

    /// Minutes being edited
    pub const fn minutes(&self) -> u8 {
        OFFSET_MINUTE_STEPS[self.minutes_index as usize]
    }

    /// One hour later, 14 wraps to -12
    pub const fn hours_up(&mut self) {
        self.hours = if self.hours >= MAX_OFFSET_HOURS { MIN_OFFSET_HOURS } else { self.hours + 1 };
    }

    /// One hour earlier, -12 wraps to 14
    pub const fn hours_down(&mut self) {
        self.hours = if self.hours <= MIN_OFFSET_HOURS { MAX_OFFSET_HOURS } else { self.hours - 1 };
    }

    /// Next minute step
    #[allow(clippy::cast_possible_truncation)]
    pub const fn minutes_up(&mut self) {
        self.minutes_index = (self.minutes_index + 1) % OFFSET_MINUTE_STEPS.len() as u8;
    }

    /// Previous minute step
    #[allow(clippy::cast_possible_truncation)]
    pub const fn minutes_down(&mut self) {
        let steps = OFFSET_MINUTE_STEPS.len() as u8;
        self.minutes_index = (self.minutes_index + steps - 1) % steps;
    }

    /// The edited offset
    pub const fn offset(&self) -> UtcOffset {
        UtcOffset::new(self.hours, self.minutes_index)
    }
}

/// Working copy of an alarm time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlarmTimeEditor {
    /// Hour being edited
    pub hour: u8,
    /// Minute being edited
    pub minute: u8,
}

impl AlarmTimeEditor {
    /// Start from the slot's stored time
    pub const fn new(slot: &AlarmSlot) -> Self {
        Self {
            hour: slot.hour % 24,
            minute: slot.minute % 60,
        }
    }

    /// Next hour, 23 wraps to 0
    pub const fn hour_up(&mut self) {
        self.hour = (self.hour + 1) % 24;
    }

    /// Previous hour, 0 wraps to 23
    pub const fn hour_down(&mut self) {
        self.hour = (self.hour + 23) % 24;
    }

    /// Next minute, 59 wraps to 0
    pub const fn minute_up(&mut self) {
        self.minute = (self.minute + 1) % 60;
    }

    /// Previous minute, 0 wraps to 59
    pub const fn minute_down(&mut self) {
        self.minute = (self.minute + 59) % 60;
    }
}
