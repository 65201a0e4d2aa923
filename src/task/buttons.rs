//! # Button Tasks
//! This module contains the tasks for the buttons. Each button has its own task.
//!
//! Up, Down and Ok presses are queued for the main loop; Cancel sets the cancel flag instead.

use crate::event::{request_cancel, send_button, try_receive_button};
use defmt::info;
use embassy_rp::gpio::{Input, Level};
use embassy_time::{Duration, Instant, Timer, with_deadline};
use medibox_core::traits::{Button, InputSource};

/// Handles button press and hold.
/// Debounces button press
pub struct ButtonManager<'a> {
    /// The input pin for the button
    input: Input<'a>,
    /// The debounce duration
    debounce_duration: Duration,
    /// The button being managed
    button: Button,
    /// How long a press must last before it starts repeating
    hold_threshold: Duration,
    /// The interval between hold events
    hold_event_interval: Duration,
}

impl<'a> ButtonManager<'a> {
    /// Create a new `ButtonManager`
    pub const fn new(input: Input<'a>, button: Button) -> Self {
        Self {
            input,
            debounce_duration: Duration::from_millis(80), // all buttons share the debounce duration
            button,
            hold_threshold: Duration::from_millis(600),
            hold_event_interval: Duration::from_millis(150),
        }
    }

    /// Up and Down repeat while held, so editors can scroll through values
    const fn repeats(&self) -> bool {
        matches!(self.button, Button::Up | Button::Down)
    }

    /// Hand the press to the main loop
    fn emit(&self) {
        match self.button {
            Button::Cancel => request_cancel(),
            button => send_button(button),
        }
    }

    /// Handle the button press event. This function is an infinite loop that waits for a debounced press,
    /// emits it, and for repeating buttons keeps emitting while the button is held.
    /// The button is normally high and goes low when pressed.
    pub async fn handle_button_press(&mut self) {
        'mainloop: loop {
            let init_level = self.debounce().await;
            // if the button is not pressed, we continue with the main loop
            if init_level != Level::Low {
                continue 'mainloop;
            }

            // the press counts right away, so a ringing alarm reacts without waiting for the release
            self.emit();
            if !self.repeats() {
                continue 'mainloop;
            }

            // released before the hold threshold: a one-time press
            let level_result =
                with_deadline(Instant::now() + self.hold_threshold, self.debounce()).await;
            if level_result.is_ok() {
                continue 'mainloop;
            }

            // button held, repeat until it changes level
            'holding: loop {
                let level_result = with_deadline(
                    Instant::now() + self.hold_event_interval,
                    self.input.wait_for_any_edge(),
                )
                .await;

                if level_result.is_ok() {
                    break 'holding;
                }

                // Timeout occurred - check if button is still held
                if self.input.get_level() == Level::High {
                    continue 'mainloop;
                }

                self.emit();
            }
        }
    }

    /// Debounce the button press by waiting for the button to be stable for a given duration. We determine the input level, then await any edge,
    /// then wait for the debounce duration, then check if the input level has changed. If it has, we break the loop and return the new level.
    pub async fn debounce(&mut self) -> Level {
        loop {
            let l1 = self.input.get_level();

            self.input.wait_for_any_edge().await;

            Timer::after(self.debounce_duration).await;

            let l2 = self.input.get_level();
            if l1 != l2 {
                break l2;
            }
        }
    }
}

#[embassy_executor::task(pool_size = 4)]
pub async fn button_handler(input: Input<'static>, button: Button) {
    let mut btn = ButtonManager::new(input, button);
    info!("{} button task started", btn.button);
    btn.handle_button_press().await;
}

/// The main loop's view of the button tasks
pub struct ButtonInput;

impl InputSource for ButtonInput {
    fn poll(&mut self) -> Option<Button> {
        try_receive_button()
    }
}
