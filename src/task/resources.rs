//! Peripheral assignment and interrupt bindings
use assign_resources::assign_resources;
use embassy_rp::i2c::InterruptHandler as I2cInterruptHandler;
use embassy_rp::peripherals::{I2C0, PIO0};
use embassy_rp::pio::InterruptHandler;
use embassy_rp::{Peri, bind_interrupts, peripherals};

// group the peripherals into resources, to be used in the tasks
// the resources are assigned to the tasks in main.rs
assign_resources! {
    btn_up: UpButtonResources {
        button_pin: PIN_20,
    },
    btn_down: DownButtonResources {
        button_pin: PIN_21,
    },
    btn_ok: OkButtonResources {
        button_pin: PIN_22,
    },
    btn_cancel: CancelButtonResources {
        button_pin: PIN_19,
    },
    wifi: WifiResources {
        pwr_pin: PIN_23,
        cs_pin: PIN_25,
        pio_sm: PIO0,
        dio_pin: PIN_24,
        clk_pin: PIN_29,
        dma_ch: DMA_CH0,
    },
    display: DisplayResources {
        scl: PIN_13,
        sda: PIN_12,
        i2c0: I2C0,
    },
    alert: AlertResources {
        pwm_slice: PWM_SLICE1,
        buzzer_pin: PIN_18,
        led_pin: PIN_15,
    },
    climate: ClimateResources {
        sensor_pin: PIN_16,
        warning_led_pin: PIN_14,
    },
}

// bind the interrupts, on a global scope
bind_interrupts!(pub struct Irqs {
    PIO0_IRQ_0 => InterruptHandler<PIO0>;
    I2C0_IRQ => I2cInterruptHandler<I2C0>;
});
