//! Board resource ownership
//!
//! A [`Board`] hands out the peripherals a provider needs and takes them back
//! on teardown. Releasing must leave the hardware inert: the UART/CAN driver
//! stopped and output pins reconfigured as inputs, so that a provider built
//! afterwards can claim the same pins for a different purpose.

use core::fmt;

use crate::can::CanReceiver;
use crate::external::{ExternalDecoder, ExternalKind};
use crate::gpio::OutputPin;
use crate::uart::{Serial, UartConfig};

/// Errors returned when claiming a board resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClaimError {
    /// Pin number does not exist or cannot serve this function
    InvalidPin(u8),
    /// Pin is already claimed
    PinInUse(u8),
    /// Peripheral (UART, CAN controller) is already in use
    PeripheralUnavailable,
    /// Driver installation or start failed
    DriverFailure,
}

impl fmt::Display for ClaimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClaimError::InvalidPin(pin) => write!(f, "invalid pin {}", pin),
            ClaimError::PinInUse(pin) => write!(f, "pin {} already in use", pin),
            ClaimError::PeripheralUnavailable => write!(f, "peripheral unavailable"),
            ClaimError::DriverFailure => write!(f, "driver failure"),
        }
    }
}

/// Hardware resources available to battery providers
pub trait Board {
    /// Serial port type
    type Serial: Serial;
    /// Output pin type
    type Pin: OutputPin;
    /// CAN receiver type
    type Can: CanReceiver;
    /// External decoder type
    type External: ExternalDecoder;

    /// Start a UART on the given pins
    fn claim_serial(
        &mut self,
        rx: u8,
        tx: u8,
        config: &UartConfig,
    ) -> Result<Self::Serial, ClaimError>;

    /// Stop a UART and release its pins
    fn release_serial(&mut self, serial: Self::Serial);

    /// Configure a pin as push-pull output
    fn claim_output(&mut self, pin: u8) -> Result<Self::Pin, ClaimError>;

    /// Return an output pin to input (high impedance)
    fn release_output(&mut self, pin: Self::Pin);

    /// Install and start the CAN driver
    fn claim_can(&mut self, rx: u8, tx: u8, bitrate: u32) -> Result<Self::Can, ClaimError>;

    /// Stop and uninstall the CAN driver
    fn release_can(&mut self, can: Self::Can);

    /// Construct an externally supplied decoder
    fn claim_external(
        &mut self,
        kind: ExternalKind,
        rx: Option<u8>,
        tx: Option<u8>,
    ) -> Result<Self::External, ClaimError>;

    /// Shut an external decoder down
    fn release_external(&mut self, external: Self::External);
}
