//! GPIO output abstractions
//!
//! The half-duplex transceiver is driven through two output lines. Boards
//! either implement [`OutputPin`] directly or wrap an `embedded-hal` pin in
//! [`HalOutput`].

use embedded_hal::digital::OutputPin as EhOutputPin;

/// Digital output pin
///
/// Implementations should handle the actual hardware register manipulation
/// for the specific chip.
pub trait OutputPin {
    /// Set the pin high (logic 1)
    fn set_high(&mut self);

    /// Set the pin low (logic 0)
    fn set_low(&mut self);

    /// Set the pin to a specific state
    fn set_state(&mut self, high: bool) {
        if high {
            self.set_high();
        } else {
            self.set_low();
        }
    }

    /// Check if the pin is currently set high
    fn is_set_high(&self) -> bool;

    /// Check if the pin is currently set low
    fn is_set_low(&self) -> bool {
        !self.is_set_high()
    }
}

/// Adapter from an `embedded-hal` 1.0 output pin
///
/// The level is tracked locally so `is_set_high` does not need mutable
/// access. Write errors from the underlying pin are dropped: GPIO writes on
/// the supported chips are infallible.
pub struct HalOutput<P> {
    pin: P,
    high: bool,
}

impl<P: EhOutputPin> HalOutput<P> {
    /// Wrap a pin, driving it low
    pub fn new(mut pin: P) -> Self {
        let _ = pin.set_low();
        Self { pin, high: false }
    }

    /// Return the wrapped pin
    pub fn into_inner(self) -> P {
        self.pin
    }
}

impl<P: EhOutputPin> OutputPin for HalOutput<P> {
    fn set_high(&mut self) {
        let _ = self.pin.set_high();
        self.high = true;
    }

    fn set_low(&mut self) {
        let _ = self.pin.set_low();
        self.high = false;
    }

    fn is_set_high(&self) -> bool {
        self.high
    }
}
