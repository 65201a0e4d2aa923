//! Button events and the cancel request shared with the main loop

use defmt::warn;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use medibox_core::CancelFlag;
use medibox_core::traits::Button;

/// The capacity of the input channel
const INPUT_CHANNEL_CAPACITY: usize = 8;

/// Debounced Up, Down and Ok presses, consumed by the main loop
pub static INPUT_CHANNEL: Channel<CriticalSectionRawMutex, Button, INPUT_CHANNEL_CAPACITY> =
    Channel::new();

/// Pending cancel press. Cancel bypasses the input channel so it is seen at every poll point.
pub static CANCEL: CancelFlag = CancelFlag::new();

/// Queues a button press. A full queue drops the press; the main loop is not listening then.
pub fn send_button(button: Button) {
    if INPUT_CHANNEL.try_send(button).is_err() {
        warn!("input queue full, dropping {}", button);
    }
}

/// Takes the next queued press without waiting
pub fn try_receive_button() -> Option<Button> {
    INPUT_CHANNEL.try_receive().ok()
}

/// Records a cancel press
pub fn request_cancel() {
    CANCEL.request();
}
