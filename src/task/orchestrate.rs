//! # Orchestrate Task
//! Binds the board's drivers to the medibox main loop and runs it.
//!
//! The loop owns the display, siren, sensor and warning lamp; buttons and
//! network time reach it through the input queue, the cancel flag and the
//! latest NTP sample.
use defmt::info;
use embassy_rp::gpio::Output;
use embassy_time::{Delay, Instant};
use medibox_core::Medibox;
use medibox_core::traits::{Board, Devices, Monotonic};

use crate::event::CANCEL;
use crate::task::{
    buttons::ButtonInput, display::OledDisplay, environment::Dht22, sound::Siren,
    time_updater::NtpTimeAuthority,
};

/// Milliseconds since boot from the embassy time driver
pub struct EmbassyClock;

impl Monotonic for EmbassyClock {
    fn now_ms(&self) -> u64 {
        Instant::now().as_millis()
    }
}

/// The Pico W medibox board
pub struct PicoBoard;

impl Board for PicoBoard {
    type Display = OledDisplay;
    type Alert = Siren;
    type Input = ButtonInput;
    type Authority = NtpTimeAuthority;
    type Sensor = Dht22;
    type Lamp = Output<'static>;
    type Clock = EmbassyClock;
    type Delay = Delay;
}

/// Runs the main loop forever
#[embassy_executor::task]
pub async fn orchestrator(devices: Devices<PicoBoard>) {
    info!("Orchestrate task starting");
    let mut medibox = Medibox::new(devices, &CANCEL);
    medibox.run().await
}
