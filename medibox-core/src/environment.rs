//! # Environment
//! Temperature and humidity readings and the comfort band for medicine storage.
//!
//! Values are kept in tenths (0.1 °C, 0.1 %RH), which is the sensor's native resolution.

use crate::traits::SensorError;

/// Above this the temperature is too high (tenths of °C)
pub const TEMPERATURE_HIGH: i16 = 320;
/// Below this the temperature is too low (tenths of °C)
pub const TEMPERATURE_LOW: i16 = 240;
/// Above this the humidity is too high (tenths of %RH)
pub const HUMIDITY_HIGH: u16 = 800;
/// Below this the humidity is too low (tenths of %RH)
pub const HUMIDITY_LOW: u16 = 650;

/// One sensor measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EnvironmentReading {
    /// Temperature in 0.1 °C
    pub temperature_tenths: i16,
    /// Relative humidity in 0.1 %
    pub humidity_tenths: u16,
}

/// Position relative to the comfort band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    /// Below the band
    Low,
    /// Inside the band
    #[default]
    Normal,
    /// Above the band
    High,
}

/// Assessment of one reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EnvironmentStatus {
    /// Temperature level
    pub temperature: Level,
    /// Humidity level
    pub humidity: Level,
}

impl EnvironmentStatus {
    /// Whether the warning lamp should be lit
    pub const fn needs_warning(&self) -> bool {
        !matches!(self.temperature, Level::Normal) || !matches!(self.humidity, Level::Normal)
    }

    /// Home screen text for the temperature, if out of band
    pub const fn temperature_label(&self) -> Option<&'static str> {
        match self.temperature {
            Level::High => Some("Temp:HIGH"),
            Level::Low => Some("Temp:LOW"),
            Level::Normal => None,
        }
    }

    /// Home screen text for the humidity, if out of band
    pub const fn humidity_label(&self) -> Option<&'static str> {
        match self.humidity {
            Level::High => Some("Hum :HIGH"),
            Level::Low => Some("Hum :LOW"),
            Level::Normal => None,
        }
    }
}

/// Place a reading relative to the comfort band. The band edges count as normal.
pub const fn assess(reading: &EnvironmentReading) -> EnvironmentStatus {
    let temperature = if reading.temperature_tenths > TEMPERATURE_HIGH {
        Level::High
    } else if reading.temperature_tenths < TEMPERATURE_LOW {
        Level::Low
    } else {
        Level::Normal
    };
    let humidity = if reading.humidity_tenths > HUMIDITY_HIGH {
        Level::High
    } else if reading.humidity_tenths < HUMIDITY_LOW {
        Level::Low
    } else {
        Level::Normal
    };
    EnvironmentStatus {
        temperature,
        humidity,
    }
}

/// Decode a 40-bit DHT22 frame: humidity, temperature (sign-magnitude), checksum.
#[allow(clippy::cast_possible_wrap)]
pub const fn decode_dht22(frame: [u8; 5]) -> Result<EnvironmentReading, SensorError> {
    let sum = frame[0]
        .wrapping_add(frame[1])
        .wrapping_add(frame[2])
        .wrapping_add(frame[3]);
    if sum != frame[4] {
        return Err(SensorError::Checksum);
    }

    let humidity_tenths = u16::from_be_bytes([frame[0], frame[1]]);
    let magnitude = u16::from_be_bytes([frame[2] & 0x7F, frame[3]]) as i16;
    let temperature_tenths = if frame[2] & 0x80 == 0 { magnitude } else { -magnitude };

    Ok(EnvironmentReading {
        temperature_tenths,
        humidity_tenths,
    })
}
