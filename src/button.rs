//! Push-button polling.

use crate::registers::{RegisterFile, Status};

/// Hardware access for the encoder push button.
pub trait ButtonPin {
    /// Returns true while the button is held down.
    fn is_held(&mut self) -> bool;
}

/// Single-sample edge detector for the button, polled once per main-loop
/// tick. There is no debounce beyond the one-sample comparison.
#[derive(Debug, Default)]
pub struct ButtonPoller {
    prev_held: bool,
}

impl ButtonPoller {
    pub const fn new() -> Self {
        Self { prev_held: false }
    }

    /// Computes the status flags for a new sample and remembers it.
    pub fn poll(&mut self, held: bool) -> Status {
        let mut status = Status::empty();
        if held {
            status |= Status::HELD;
        }
        if held && !self.prev_held {
            status |= Status::PRESSED;
        }
        if !held && self.prev_held {
            status |= Status::RELEASED;
        }
        self.prev_held = held;
        status
    }

    /// Samples `pin` and writes the result to the `status` register.
    pub fn poll_into<B: ButtonPin, const LEDS: usize>(
        &mut self,
        pin: &mut B,
        registers: &RegisterFile<LEDS>,
    ) -> Status {
        let status = self.poll(pin.is_held());
        registers.set_status(status);
        status
    }
}
