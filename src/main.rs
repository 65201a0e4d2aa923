//! # Medibox
//! Medication reminder for the Raspberry Pi Pico W.
//!
//! Keeps local time from NTP (free-running between syncs), rings two daily
//! alarms with snooze, offers a four-button menu on the OLED, and warns when
//! the storage climate leaves its safe range.
// we are in an environment with constrained resources, so we do not use the standard library and we define a different entry point.
#![no_std]
#![no_main]

use crate::task::buttons::{ButtonInput, button_handler};
use crate::task::display::OledDisplay;
use crate::task::environment::Dht22;
use crate::task::orchestrate::{EmbassyClock, orchestrator};
use crate::task::sound::Siren;
use crate::task::time_updater::{NtpTimeAuthority, time_updater};
use defmt::{error, info, unwrap};
use embassy_executor::Spawner;
use embassy_rp::gpio::{Flex, Input, Level, Output, Pull};
use embassy_time::{Delay, Timer};
use medibox_core::traits::{Button, Devices};
use {defmt_rtt as _, panic_probe as _};

mod event;
mod task;

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Program start");
    let p = embassy_rp::init(Default::default());
    let r = crate::split_resources!(p);

    // buttons
    info!("init buttons");
    unwrap!(spawner.spawn(button_handler(
        Input::new(r.btn_up.button_pin, Pull::Up),
        Button::Up
    )));
    unwrap!(spawner.spawn(button_handler(
        Input::new(r.btn_down.button_pin, Pull::Up),
        Button::Down
    )));
    unwrap!(spawner.spawn(button_handler(
        Input::new(r.btn_ok.button_pin, Pull::Up),
        Button::Ok
    )));
    unwrap!(spawner.spawn(button_handler(
        Input::new(r.btn_cancel.button_pin, Pull::Up),
        Button::Cancel
    )));

    // network time
    unwrap!(spawner.spawn(time_updater(spawner, r.wifi)));

    // the main loop needs the display, there is nothing to show without it
    info!("init display");
    let display = match OledDisplay::new(r.display).await {
        Ok(display) => display,
        Err(e) => {
            error!("display unavailable: {}", e);
            loop {
                Timer::after_secs(3600).await;
            }
        }
    };

    let devices = Devices {
        display,
        alert: Siren::new(r.alert),
        input: ButtonInput,
        authority: NtpTimeAuthority::new(),
        sensor: Dht22::new(Flex::new(r.climate.sensor_pin)),
        lamp: Output::new(r.climate.warning_led_pin, Level::Low),
        clock: EmbassyClock,
        delay: Delay,
    };
    unwrap!(spawner.spawn(orchestrator(devices)));
}
