//! # Sound
//! The alarm siren: a passive buzzer on a PWM slice plus the alarm LED.
//!
//! While active, every step moves the tone 20 Hz along a 440 Hz to 880 Hz and back sweep.
use crate::task::resources::AlertResources;
use defmt::debug;
use embassy_rp::clocks::clk_sys_freq;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::pwm::{Config as PwmConfig, Pwm};
use medibox_core::traits::AlertOutput;

/// Bottom of the sweep in Hz
const LOW_HZ: u32 = 440;
/// Top of the sweep in Hz
const HIGH_HZ: u32 = 880;
/// Frequency change per step in Hz
const STEP_HZ: u32 = 20;
/// PWM clock divider, keeps `top` within 16 bits down to 440 Hz
const DIVIDER: u8 = 16;

/// Buzzer and alarm LED
pub struct Siren {
    /// PWM output driving the buzzer
    pwm: Pwm<'static>,
    /// Current PWM configuration
    config: PwmConfig,
    /// Alarm LED
    led: Output<'static>,
    /// Current tone
    frequency: u32,
    /// Sweep direction
    rising: bool,
}

impl Siren {
    /// Silent siren with the LED off
    pub fn new(r: AlertResources) -> Self {
        let mut config = PwmConfig::default();
        config.divider = DIVIDER.into();
        config.compare_a = 0;
        let pwm = Pwm::new_output_a(r.pwm_slice, r.buzzer_pin, config.clone());
        Self {
            pwm,
            config,
            led: Output::new(r.led_pin, Level::Low),
            frequency: LOW_HZ,
            rising: true,
        }
    }

    /// Square wave at `frequency`, 50 % duty
    #[allow(clippy::cast_possible_truncation)]
    fn play(&mut self, frequency: u32) {
        let top = (clk_sys_freq() / u32::from(DIVIDER) / frequency).saturating_sub(1);
        let top = top.min(u32::from(u16::MAX)) as u16;
        self.config.top = top;
        self.config.compare_a = top / 2;
        self.pwm.set_config(&self.config);
    }

    /// No output
    fn silence(&mut self) {
        self.config.compare_a = 0;
        self.pwm.set_config(&self.config);
    }
}

impl AlertOutput for Siren {
    fn activate(&mut self) {
        debug!("siren on");
        self.led.set_high();
        self.frequency = LOW_HZ;
        self.rising = true;
        self.play(LOW_HZ);
    }

    fn deactivate(&mut self) {
        debug!("siren off");
        self.silence();
        self.led.set_low();
    }

    fn step(&mut self) {
        if self.rising {
            self.frequency += STEP_HZ;
            if self.frequency >= HIGH_HZ {
                self.frequency = HIGH_HZ;
                self.rising = false;
            }
        } else {
            self.frequency -= STEP_HZ;
            if self.frequency <= LOW_HZ {
                self.frequency = LOW_HZ;
                self.rising = true;
            }
        }
        self.play(self.frequency);
    }
}
