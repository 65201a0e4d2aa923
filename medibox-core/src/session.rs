//! # Alarm session
//! The ringing state and its two ways out.
//!
//! A session starts when an alarm fires and ends on the first cancel
//! (dismissed, registry untouched) or confirm (snoozed, snooze slot armed
//! five minutes out). Signals after that are ignored.

use crate::alarm::{AlarmEvent, AlarmRegistry, SNOOZE_MINUTES};
use crate::clock::ClockState;
use crate::traits::AlertOutput;

/// User input that can end a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionSignal {
    /// Dismiss the alarm
    Cancel,
    /// Snooze the alarm
    Confirm,
}

/// Where a session stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionState {
    /// Alert is sounding
    Ringing,
    /// Alarm was dismissed
    Dismissed,
    /// Alarm was snoozed until the given time
    Snoozed {
        /// Hour of the snooze alarm
        hour: u8,
        /// Minute of the snooze alarm
        minute: u8,
    },
}

impl SessionState {
    /// Whether the session has ended
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Ringing)
    }
}

/// One ringing alarm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlarmSession {
    /// The alarm that started the session
    event: AlarmEvent,
    /// Current state
    state: SessionState,
}

impl AlarmSession {
    /// Start ringing for `event`
    pub fn begin<A: AlertOutput>(event: AlarmEvent, alert: &mut A) -> Self {
        alert.activate();
        Self {
            event,
            state: SessionState::Ringing,
        }
    }

    /// The alarm that started the session
    pub const fn event(&self) -> AlarmEvent {
        self.event
    }

    /// Current state
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Resolve the session. A snooze always lands in the snooze slot, whichever slot rang.
    pub fn handle<A: AlertOutput>(
        &mut self,
        signal: SessionSignal,
        now: &ClockState,
        registry: &mut AlarmRegistry,
        alert: &mut A,
    ) -> SessionState {
        if self.state.is_terminal() {
            return self.state;
        }

        self.state = match signal {
            SessionSignal::Cancel => SessionState::Dismissed,
            SessionSignal::Confirm => {
                let (hour, minute) = now.after_minutes(SNOOZE_MINUTES);
                registry.schedule_snooze(hour, minute);
                SessionState::Snoozed { hour, minute }
            }
        };
        alert.deactivate();
        info!("alarm slot {} resolved: {}", self.event.slot, self.state);
        self.state
    }
}
