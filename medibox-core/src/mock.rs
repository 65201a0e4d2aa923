//! Host-side collaborators driven by simulated time
//!
//! Simulated time only moves when the main loop awaits [`SimDelay`], so every
//! test run is deterministic.
#![allow(clippy::panic, missing_docs, clippy::missing_docs_in_private_items)]

use std::cell::Cell;
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;
use std::string::{String, ToString};
use std::vec::Vec;

use embedded_hal::digital::{ErrorType, OutputPin};
use embedded_hal_async::delay::DelayNs;

use crate::clock::ClockState;
use crate::environment::EnvironmentReading;
use crate::signal::CancelFlag;
use crate::traits::{
    AlertOutput, Board, Button, Devices, Display, DisplayError, EnvironmentSensor, InputSource,
    Monotonic, SensorError, TextLine, TimeAuthority, TimeAuthorityUnavailable,
};

/// Simulated time never runs past this; a test that gets here is stuck in a loop
const TIME_LIMIT_MS: u64 = 3 * 24 * 3600 * 1000;

#[derive(Debug, Clone, Default)]
pub struct SimTime(Rc<Cell<u64>>);

impl SimTime {
    pub fn now(&self) -> u64 {
        self.0.get()
    }

    pub fn advance(&self, ms: u64) {
        let now = self.0.get() + ms;
        if now > TIME_LIMIT_MS {
            panic!("simulated time ran away: {now} ms");
        }
        self.0.set(now);
    }
}

pub struct SimClock(pub SimTime);

impl Monotonic for SimClock {
    fn now_ms(&self) -> u64 {
        self.0.now()
    }
}

pub struct SimDelay(pub SimTime);

impl DelayNs for SimDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.0.advance(u64::from(ns).div_ceil(1_000_000));
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.0.advance(u64::from(ms));
    }
}

/// Drawn line, owned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawnLine {
    pub text: String,
    pub size: u8,
    pub row: u8,
    pub column: u8,
    pub inverted: bool,
}

#[derive(Debug, Default)]
pub struct MockDisplay {
    buffer: Vec<DrawnLine>,
    pub frames: Vec<Vec<DrawnLine>>,
    pub fail_flush: bool,
}

impl MockDisplay {
    pub fn last_frame(&self) -> &[DrawnLine] {
        self.frames.last().map_or(&[], Vec::as_slice)
    }

    pub fn shown(&self, text: &str) -> bool {
        self.frames.iter().flatten().any(|line| line.text == text)
    }

    pub fn last_frame_has(&self, text: &str) -> bool {
        self.last_frame().iter().any(|line| line.text == text)
    }
}

impl Display for MockDisplay {
    fn clear(&mut self) {
        self.buffer.clear();
    }

    fn render_line(&mut self, line: &TextLine<'_>) {
        self.buffer.push(DrawnLine {
            text: line.text.to_string(),
            size: line.size,
            row: line.row,
            column: line.column,
            inverted: line.inverted,
        });
    }

    async fn flush(&mut self) -> Result<(), DisplayError> {
        if self.fail_flush {
            return Err(DisplayError::Bus);
        }
        self.frames.push(self.buffer.clone());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MockAlert {
    pub active: bool,
    pub activations: u32,
    pub deactivations: u32,
    pub steps: u32,
}

impl AlertOutput for MockAlert {
    fn activate(&mut self) {
        self.active = true;
        self.activations += 1;
    }

    fn deactivate(&mut self) {
        self.active = false;
        self.deactivations += 1;
    }

    fn step(&mut self) {
        assert!(self.active, "siren stepped while silent");
        self.steps += 1;
    }
}

/// Presses released at fixed simulated times. With a cancel flag attached,
/// Cancel presses set the flag instead of being queued, like the firmware does.
pub struct MockInput {
    time: SimTime,
    script: VecDeque<(u64, Button)>,
    cancel: Option<&'static CancelFlag>,
}

impl MockInput {
    pub const fn new(time: SimTime, cancel: Option<&'static CancelFlag>) -> Self {
        Self {
            time,
            script: VecDeque::new(),
            cancel,
        }
    }

    pub fn press(&mut self, at_ms: u64, button: Button) {
        self.script.push_back((at_ms, button));
    }

    pub fn pending(&self) -> usize {
        self.script.len()
    }
}

impl InputSource for MockInput {
    fn poll(&mut self) -> Option<Button> {
        while let Some(&(at, button)) = self.script.front() {
            if at > self.time.now() {
                return None;
            }
            self.script.pop_front();
            match (button, self.cancel) {
                (Button::Cancel, Some(flag)) => flag.request(),
                _ => return Some(button),
            }
        }
        None
    }
}

/// Network time that starts at `base_unix` when simulated time is 0
pub struct MockAuthority {
    time: SimTime,
    pub base_unix: Option<i64>,
    pub offsets: Vec<i32>,
}

impl MockAuthority {
    pub const fn new(time: SimTime) -> Self {
        Self {
            time,
            base_unix: None,
            offsets: Vec::new(),
        }
    }
}

impl TimeAuthority for MockAuthority {
    #[allow(clippy::cast_possible_wrap)]
    async fn fetch(&mut self, offset_seconds: i32) -> Result<ClockState, TimeAuthorityUnavailable> {
        self.offsets.push(offset_seconds);
        let base = self.base_unix.ok_or(TimeAuthorityUnavailable)?;
        let now = base + (self.time.now() / 1000) as i64 + i64::from(offset_seconds);
        Ok(ClockState::from_unix_seconds(now))
    }
}

pub struct MockSensor {
    pub reading: Result<EnvironmentReading, SensorError>,
    pub reads: u32,
}

impl Default for MockSensor {
    fn default() -> Self {
        Self {
            reading: Ok(EnvironmentReading {
                temperature_tenths: 260,
                humidity_tenths: 700,
            }),
            reads: 0,
        }
    }
}

impl EnvironmentSensor for MockSensor {
    async fn read(&mut self) -> Result<EnvironmentReading, SensorError> {
        self.reads += 1;
        self.reading
    }
}

#[derive(Debug, Default)]
pub struct MockLamp {
    pub lit: bool,
}

impl ErrorType for MockLamp {
    type Error = Infallible;
}

impl OutputPin for MockLamp {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.lit = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.lit = true;
        Ok(())
    }
}

pub struct MockBoard;

impl Board for MockBoard {
    type Display = MockDisplay;
    type Alert = MockAlert;
    type Input = MockInput;
    type Authority = MockAuthority;
    type Sensor = MockSensor;
    type Lamp = MockLamp;
    type Clock = SimClock;
    type Delay = SimDelay;
}

/// A full set of mocks sharing one simulated clock, plus a leaked cancel flag
pub fn mock_devices() -> (Devices<MockBoard>, SimTime, &'static CancelFlag) {
    let time = SimTime::default();
    let cancel: &'static CancelFlag = Box::leak(Box::new(CancelFlag::new()));
    let devices = Devices {
        display: MockDisplay::default(),
        alert: MockAlert::default(),
        input: MockInput::new(time.clone(), Some(cancel)),
        authority: MockAuthority::new(time.clone()),
        sensor: MockSensor::default(),
        lamp: MockLamp::default(),
        clock: SimClock(time.clone()),
        delay: SimDelay(time.clone()),
    };
    (devices, time, cancel)
}
