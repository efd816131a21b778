//! Half-duplex RS485 transceiver control
//!
//! The transceiver has an active-low receive enable and an active-high
//! transmit enable. Receiving is switched off for the whole transmission so
//! the UART never sees the local echo of the request.

use battlink_hal::OutputPin;

/// Direction control lines of a half-duplex transceiver
pub struct Transceiver<P> {
    /// Receive enable, active low
    rx_enable: P,
    /// Transmit enable, active high
    tx_enable: P,
}

impl<P: OutputPin> Transceiver<P> {
    /// Take the direction pins and put the transceiver into receive mode
    pub fn new(rx_enable: P, tx_enable: P) -> Self {
        let mut transceiver = Self {
            rx_enable,
            tx_enable,
        };
        transceiver.end_transmit();
        transceiver
    }

    /// Disable reception, then enable the driver
    pub fn begin_transmit(&mut self) {
        self.rx_enable.set_high();
        self.tx_enable.set_high();
    }

    /// Release the bus, then enable reception
    ///
    /// Call only after the request has been flushed.
    pub fn end_transmit(&mut self) {
        self.tx_enable.set_low();
        self.rx_enable.set_low();
    }

    /// Whether the receiver is currently enabled
    pub fn is_receiving(&self) -> bool {
        self.rx_enable.is_set_low()
    }

    /// Give the pins back as (rx_enable, tx_enable)
    pub fn into_pins(self) -> (P, P) {
        (self.rx_enable, self.tx_enable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::rc::Rc;
    use core::cell::RefCell;
    use std::vec::Vec;

    type Log = Rc<RefCell<Vec<(&'static str, bool)>>>;

    struct LoggedPin {
        name: &'static str,
        high: bool,
        log: Log,
    }

    impl OutputPin for LoggedPin {
        fn set_high(&mut self) {
            self.high = true;
            self.log.borrow_mut().push((self.name, true));
        }

        fn set_low(&mut self) {
            self.high = false;
            self.log.borrow_mut().push((self.name, false));
        }

        fn is_set_high(&self) -> bool {
            self.high
        }
    }

    fn transceiver() -> (Transceiver<LoggedPin>, Log) {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let rx = LoggedPin {
            name: "rx_enable",
            high: true,
            log: log.clone(),
        };
        let tx = LoggedPin {
            name: "tx_enable",
            high: true,
            log: log.clone(),
        };
        (Transceiver::new(rx, tx), log)
    }

    #[test]
    fn test_starts_receiving() {
        let (transceiver, log) = transceiver();
        assert!(transceiver.is_receiving());
        assert_eq!(
            *log.borrow(),
            [("tx_enable", false), ("rx_enable", false)]
        );
    }

    #[test]
    fn test_transmit_ordering() {
        let (mut transceiver, log) = transceiver();
        log.borrow_mut().clear();

        transceiver.begin_transmit();
        assert!(!transceiver.is_receiving());
        transceiver.end_transmit();
        assert!(transceiver.is_receiving());

        assert_eq!(
            *log.borrow(),
            [
                ("rx_enable", true),
                ("tx_enable", true),
                ("tx_enable", false),
                ("rx_enable", false),
            ]
        );
    }
}
