//! # Display
//! The SSD1306 OLED behind the text-line display interface of the main loop.
//!
//! Drawing goes into the driver's frame buffer; only `flush` touches the I2C bus.
use crate::task::resources::{DisplayResources, Irqs};
use defmt::{Debug2Format, error, warn};
use embassy_rp::i2c::{self, Config, I2c};
use embassy_rp::peripherals::I2C0;
use embedded_graphics::{
    mono_font::{
        MonoFont, MonoTextStyleBuilder,
        ascii::{FONT_6X10, FONT_10X20},
    },
    pixelcolor::BinaryColor,
    prelude::*,
    text::{Baseline, Text},
};
use medibox_core::traits::{Display, DisplayError, TextLine};
use ssd1306_async::{I2CDisplayInterface, Ssd1306, mode::BufferedGraphicsMode, prelude::*};

/// The concrete driver type for the 128x64 panel on I2C0
type Oled = Ssd1306<
    I2CInterface<I2c<'static, I2C0, i2c::Async>>,
    DisplaySize128x64,
    BufferedGraphicsMode<DisplaySize128x64>,
>;

/// Font for a text scale
const fn font(size: u8) -> &'static MonoFont<'static> {
    match size {
        0 | 1 => &FONT_6X10,
        _ => &FONT_10X20,
    }
}

/// The OLED display
pub struct OledDisplay {
    /// Buffered driver
    display: Oled,
}

impl OledDisplay {
    /// Bring up I2C and the panel
    pub async fn new(r: DisplayResources) -> Result<Self, DisplayError> {
        let mut config = Config::default();
        config.frequency = 400_000;
        let i2c = I2c::new_async(r.i2c0, r.scl, r.sda, Irqs, config);

        let interface = I2CDisplayInterface::new(i2c);
        let mut display = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
            .into_buffered_graphics_mode();
        if let Err(e) = display.init().await {
            error!("Failed to initialize display: {}", Debug2Format(&e));
            return Err(DisplayError::Init);
        }
        display.clear();
        if display.flush().await.is_err() {
            return Err(DisplayError::Init);
        }
        Ok(Self { display })
    }
}

impl Display for OledDisplay {
    fn clear(&mut self) {
        self.display.clear();
    }

    fn render_line(&mut self, line: &TextLine<'_>) {
        let builder = MonoTextStyleBuilder::new().font(font(line.size));
        let style = if line.inverted {
            builder
                .text_color(BinaryColor::Off)
                .background_color(BinaryColor::On)
                .build()
        } else {
            builder.text_color(BinaryColor::On).build()
        };
        let position = Point::new(i32::from(line.column), i32::from(line.row));
        if Text::with_baseline(line.text, position, style, Baseline::Top)
            .draw(&mut self.display)
            .is_err()
        {
            warn!("failed to draw {}", line.text);
        }
    }

    async fn flush(&mut self) -> Result<(), DisplayError> {
        self.display.flush().await.map_err(|e| {
            warn!("display flush failed: {}", Debug2Format(&e));
            DisplayError::Bus
        })
    }
}
