//! Board-agnostic core logic for the medibox medication reminder
//!
//! Everything that does not touch hardware lives here:
//!
//! - Wall clock with free-running and network-synchronized modes
//! - Alarm registry with two user alarms and a one-shot snooze slot
//! - The ring session that resolves an alarm into dismiss or snooze
//! - Menu cursor and value editors
//! - Temperature and humidity thresholds
//! - SNTP packet encoding and decoding
//! - Collaborator traits the firmware implements, and the main loop driving them

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

#[macro_use]
mod fmt;

pub mod alarm;
pub mod clock;
pub mod controller;
pub mod environment;
pub mod menu;
pub mod ntp;
pub mod session;
pub mod signal;
pub mod state;
pub mod traits;

#[cfg(test)]
mod mock;

pub use alarm::{AlarmEvent, AlarmRegistry, AlarmSlot, UserAlarm};
pub use clock::{ClockMode, ClockSource, ClockState, Tick, UtcOffset};
pub use controller::{Medibox, RingReport};
pub use session::{AlarmSession, SessionSignal, SessionState};
pub use signal::CancelFlag;
pub use state::SystemState;
