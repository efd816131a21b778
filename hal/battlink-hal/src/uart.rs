//! UART serial communication abstractions
//!
//! Providers are polled from a cooperative scheduler, so both directions are
//! non-blocking: reads return `None` when nothing is buffered and writers
//! report whether the transmit buffer can take a request right now.

use embedded_io::{Read, ReadReady, Write, WriteReady};

/// Non-blocking byte source (UART receive side)
pub trait ByteSource {
    /// Error type for receive operations
    type Error;

    /// Read one byte if one is available
    fn read_byte(&mut self) -> Result<Option<u8>, Self::Error>;
}

/// Byte sink (UART transmit side)
pub trait ByteSink {
    /// Error type for transmit operations
    type Error;

    /// Check whether the transmitter can accept data right now
    fn ready_for_write(&mut self) -> bool;

    /// Queue data for transmission
    fn write_bytes(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Block until all queued data has left the shift register
    fn flush(&mut self) -> Result<(), Self::Error>;
}

/// Combined serial interface
///
/// For UARTs that provide both TX and RX on a single peripheral.
pub trait Serial: ByteSource + ByteSink {}

// Blanket implementation
impl<T: ByteSource + ByteSink> Serial for T {}

/// Adapter from `embedded-io` blocking traits
///
/// Reads are gated on `read_ready` so they never block.
pub struct IoSerial<T> {
    inner: T,
}

impl<T> IoSerial<T> {
    /// Wrap an `embedded-io` port
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    /// Return the wrapped port
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Read + ReadReady> ByteSource for IoSerial<T> {
    type Error = T::Error;

    fn read_byte(&mut self) -> Result<Option<u8>, Self::Error> {
        if !self.inner.read_ready()? {
            return Ok(None);
        }
        let mut buf = [0u8; 1];
        match self.inner.read(&mut buf)? {
            0 => Ok(None),
            _ => Ok(Some(buf[0])),
        }
    }
}

impl<T: Write + WriteReady> ByteSink for IoSerial<T> {
    type Error = T::Error;

    fn ready_for_write(&mut self) -> bool {
        self.inner.write_ready().unwrap_or(false)
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.inner.write_all(data)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.inner.flush()
    }
}

/// UART configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UartConfig {
    /// Baud rate in bits per second
    pub baudrate: u32,
    /// Number of data bits (typically 8)
    pub data_bits: DataBits,
    /// Parity mode
    pub parity: Parity,
    /// Number of stop bits
    pub stop_bits: StopBits,
}

impl Default for UartConfig {
    fn default() -> Self {
        Self {
            baudrate: 115200,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
        }
    }
}

/// Number of data bits per frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataBits {
    Seven,
    Eight,
    Nine,
}

/// Parity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Parity {
    None,
    Even,
    Odd,
}

/// Number of stop bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StopBits {
    One,
    Two,
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embedded_io::ErrorType;
    use std::collections::VecDeque;
    use std::vec::Vec;

    #[derive(Default)]
    struct Loopback {
        rx: VecDeque<u8>,
        tx: Vec<u8>,
        flushed: bool,
    }

    impl ErrorType for Loopback {
        type Error = Infallible;
    }

    impl Read for Loopback {
        fn read(&mut self, buf: &mut [u8]) -> Result<usize, Infallible> {
            let mut n = 0;
            while n < buf.len() {
                match self.rx.pop_front() {
                    Some(b) => {
                        buf[n] = b;
                        n += 1;
                    }
                    None => break,
                }
            }
            Ok(n)
        }
    }

    impl ReadReady for Loopback {
        fn read_ready(&mut self) -> Result<bool, Infallible> {
            Ok(!self.rx.is_empty())
        }
    }

    impl Write for Loopback {
        fn write(&mut self, buf: &[u8]) -> Result<usize, Infallible> {
            self.tx.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> Result<(), Infallible> {
            self.flushed = true;
            Ok(())
        }
    }

    impl WriteReady for Loopback {
        fn write_ready(&mut self) -> Result<bool, Infallible> {
            Ok(true)
        }
    }

    #[test]
    fn test_read_byte_empty_does_not_block() {
        let mut serial = IoSerial::new(Loopback::default());
        assert_eq!(serial.read_byte(), Ok(None));
    }

    #[test]
    fn test_read_byte_in_order() {
        let mut port = Loopback::default();
        port.rx.extend([0x4E, 0x57]);
        let mut serial = IoSerial::new(port);
        assert_eq!(serial.read_byte(), Ok(Some(0x4E)));
        assert_eq!(serial.read_byte(), Ok(Some(0x57)));
        assert_eq!(serial.read_byte(), Ok(None));
    }

    #[test]
    fn test_write_and_flush() {
        let mut serial = IoSerial::new(Loopback::default());
        assert!(serial.ready_for_write());
        serial.write_bytes(&[1, 2, 3]).unwrap();
        serial.flush().unwrap();
        let port = serial.into_inner();
        assert_eq!(port.tx, [1, 2, 3]);
        assert!(port.flushed);
    }

    #[test]
    fn test_default_config_is_115200_8n1() {
        let config = UartConfig::default();
        assert_eq!(config.baudrate, 115200);
        assert_eq!(config.data_bits, DataBits::Eight);
        assert_eq!(config.parity, Parity::None);
        assert_eq!(config.stop_bits, StopBits::One);
    }
}
