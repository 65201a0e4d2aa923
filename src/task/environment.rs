//! # Environment sensor
//! DHT22 temperature/humidity sensor on a single bidirectional pin.
//!
//! The host pulls the line low to request a reading; the sensor answers with
//! a 80 µs low / 80 µs high preamble followed by 40 bits. Each bit is a 50 µs
//! low followed by a high pulse of ~27 µs (0) or ~70 µs (1).
use defmt::debug;
use embassy_rp::gpio::{Flex, Pull};
use embassy_time::{Duration, Instant, Timer, with_timeout};
use medibox_core::environment::{EnvironmentReading, decode_dht22};
use medibox_core::traits::{EnvironmentSensor, SensorError};

/// High pulses longer than this are ones
const ONE_THRESHOLD: Duration = Duration::from_micros(48);
/// Longest wait for any single edge
const EDGE_TIMEOUT: Duration = Duration::from_micros(200);
/// Length of the start request
const START_PULSE: Duration = Duration::from_millis(2);

/// Which way the line should go next
#[derive(Clone, Copy)]
enum Edge {
    /// Falling
    Low,
    /// Rising
    High,
}

/// DHT22 on one GPIO
pub struct Dht22 {
    /// Data line
    pin: Flex<'static>,
}

impl Dht22 {
    /// Idle the line high through the pull-up
    pub fn new(mut pin: Flex<'static>) -> Self {
        pin.set_pull(Pull::Up);
        pin.set_as_input();
        Self { pin }
    }

    /// Wait until the line reaches `edge`
    async fn wait(&mut self, edge: Edge) -> Result<(), SensorError> {
        let pin = &mut self.pin;
        let result = match edge {
            Edge::Low => with_timeout(EDGE_TIMEOUT, pin.wait_for_low()).await,
            Edge::High => with_timeout(EDGE_TIMEOUT, pin.wait_for_high()).await,
        };
        result.map_err(|_| SensorError::Timeout)
    }

    /// Read the 5-byte frame
    async fn read_frame(&mut self) -> Result<[u8; 5], SensorError> {
        self.pin.set_low();
        self.pin.set_as_output();
        Timer::after(START_PULSE).await;
        self.pin.set_as_input();

        // preamble
        self.wait(Edge::Low).await?;
        self.wait(Edge::High).await?;
        self.wait(Edge::Low).await?;

        let mut frame = [0u8; 5];
        for bit in 0..40 {
            self.wait(Edge::High).await?;
            let rise = Instant::now();
            self.wait(Edge::Low).await?;
            if rise.elapsed() > ONE_THRESHOLD {
                frame[bit / 8] |= 0x80 >> (bit % 8);
            }
        }
        Ok(frame)
    }
}

impl EnvironmentSensor for Dht22 {
    async fn read(&mut self) -> Result<EnvironmentReading, SensorError> {
        let frame = self.read_frame().await;
        // leave the line released whatever happened
        self.pin.set_as_input();
        let frame = frame?;
        debug!("dht22 frame {=[u8]:02x}", frame);
        decode_dht22(frame)
    }
}
