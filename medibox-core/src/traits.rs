//! Collaborator traits implemented by the board
//!
//! The core never touches hardware directly. The firmware implements these
//! traits on top of embassy drivers and the tests implement them with mocks.

use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;

use crate::clock::ClockState;
use crate::environment::EnvironmentReading;

/// Errors that can occur while talking to the display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayError {
    /// Controller did not come up
    Init,
    /// Transfer to the controller failed
    Bus,
}

/// Errors from the temperature/humidity sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorError {
    /// Sensor did not answer in time
    Timeout,
    /// Frame arrived but failed its checksum
    Checksum,
}

/// No usable time from the network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimeAuthorityUnavailable;

/// One line of text on the display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextLine<'a> {
    /// Text to draw
    pub text: &'a str,
    /// Font scale, 1 for small and 2 for large
    pub size: u8,
    /// Top edge in pixels
    pub row: u8,
    /// Left edge in pixels
    pub column: u8,
    /// Draw dark text on a lit background
    pub inverted: bool,
}

impl<'a> TextLine<'a> {
    /// Small text at `row`, `column`
    pub const fn new(text: &'a str, row: u8, column: u8) -> Self {
        Self {
            text,
            size: 1,
            row,
            column,
            inverted: false,
        }
    }

    /// Same line with a different font scale
    #[must_use]
    pub const fn with_size(self, size: u8) -> Self {
        Self { size, ..self }
    }

    /// Same line, highlighted
    #[must_use]
    pub const fn inverted(self) -> Self {
        Self {
            inverted: true,
            ..self
        }
    }
}

/// Buffered text display
///
/// Drawing only touches the frame buffer; nothing reaches the panel until
/// [`Display::flush`].
#[allow(async_fn_in_trait)]
pub trait Display {
    /// Blank the frame buffer
    fn clear(&mut self);

    /// Draw one line into the frame buffer
    fn render_line(&mut self, line: &TextLine<'_>);

    /// Draw several lines into the frame buffer
    fn render_lines(&mut self, lines: &[TextLine<'_>]) {
        for line in lines {
            self.render_line(line);
        }
    }

    /// Send the frame buffer to the panel
    async fn flush(&mut self) -> Result<(), DisplayError>;
}

/// Alarm sounder and lamp
pub trait AlertOutput {
    /// Start sounding
    fn activate(&mut self);
    /// Stop sounding
    fn deactivate(&mut self);
    /// Advance the siren pattern by one step; called every alert step while ringing
    fn step(&mut self);
}

/// The four front-panel buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Button {
    /// Up
    Up,
    /// Down
    Down,
    /// Ok / confirm / snooze
    Ok,
    /// Cancel / menu / dismiss
    Cancel,
}

/// Source of debounced button presses
pub trait InputSource {
    /// Next queued press, without waiting
    fn poll(&mut self) -> Option<Button>;
}

/// Network time
#[allow(async_fn_in_trait)]
pub trait TimeAuthority {
    /// Current local time for the given UTC offset
    async fn fetch(&mut self, offset_seconds: i32) -> Result<ClockState, TimeAuthorityUnavailable>;
}

/// Temperature and humidity sensor
#[allow(async_fn_in_trait)]
pub trait EnvironmentSensor {
    /// Take one measurement
    async fn read(&mut self) -> Result<EnvironmentReading, SensorError>;
}

/// Monotonic millisecond counter
pub trait Monotonic {
    /// Milliseconds since an arbitrary fixed point
    fn now_ms(&self) -> u64;
}

/// Bundle of collaborator types for one board
pub trait Board {
    /// Text display
    type Display: Display;
    /// Siren and alarm lamp
    type Alert: AlertOutput;
    /// Button queue
    type Input: InputSource;
    /// Network time
    type Authority: TimeAuthority;
    /// Climate sensor
    type Sensor: EnvironmentSensor;
    /// Climate warning lamp
    type Lamp: OutputPin;
    /// Monotonic clock
    type Clock: Monotonic;
    /// Async delay
    type Delay: DelayNs;
}

/// Concrete collaborators for a [`Board`]
pub struct Devices<B: Board> {
    /// Text display
    pub display: B::Display,
    /// Siren and alarm lamp
    pub alert: B::Alert,
    /// Button queue
    pub input: B::Input,
    /// Network time
    pub authority: B::Authority,
    /// Climate sensor
    pub sensor: B::Sensor,
    /// Climate warning lamp
    pub lamp: B::Lamp,
    /// Monotonic clock
    pub clock: B::Clock,
    /// Async delay
    pub delay: B::Delay,
}
