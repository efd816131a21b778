//! Pylontech CAN receiver
//!
//! The BMS broadcasts on its own, so this provider only listens. At most one
//! frame is handled per poll.

use alloc::rc::Rc;

use battlink_hal::{Board, CanReceiver};
use battlink_protocol::pylontech::{self, Label};
use battlink_protocol::Text;
use embedded_can::{Frame, Id};

use crate::config::{BatteryConfig, PinRole, ProviderKind};
use crate::manager::InitError;
use crate::stats::{StatsSnapshot, Telemetry};

/// How long a single receive call may wait for a frame
pub const RECEIVE_TIMEOUT_MS: u32 = 100;

/// Listener for Pylontech bus messages
pub struct PylontechReceiver<C> {
    can: C,
    verbose: bool,
    stats: Rc<StatsSnapshot>,
}

impl<C: CanReceiver> PylontechReceiver<C> {
    /// Wrap a started bus driver
    pub fn new(can: C, verbose: bool) -> Self {
        Self {
            can,
            verbose,
            stats: Rc::new(StatsSnapshot::new(Telemetry::Pylontech(Default::default()))),
        }
    }

    /// Install and start the bus driver
    pub fn init<B>(board: &mut B, config: &BatteryConfig) -> Result<Self, InitError>
    where
        B: Board<Can = C>,
    {
        config.validate_for(ProviderKind::BusDecoder)?;
        let rx = config.pins.require(PinRole::Rx)?;
        let tx = config.pins.require(PinRole::Tx)?;
        info!("[Pylontech] Initialize interface rx = {}, tx = {}", rx, tx);

        let can = board.claim_can(rx, tx, pylontech::BITRATE)?;
        info!("[Pylontech] Driver started");
        Ok(Self::new(can, config.verbose_logging))
    }

    /// Stop and uninstall the bus driver
    pub fn deinit<B>(self, board: &mut B)
    where
        B: Board<Can = C>,
    {
        board.release_can(self.can);
        info!("[Pylontech] Driver uninstalled");
    }

    /// Receive and decode at most one pending frame
    pub fn poll(&mut self, now_ms: u32) {
        match self.can.pending() {
            Ok(0) => return,
            Ok(_) => {}
            Err(_) => {
                warn!("[Pylontech] Failed to get bus status");
                return;
            }
        }

        match self.can.receive(RECEIVE_TIMEOUT_MS) {
            Ok(frame) => self.handle_frame(&frame, now_ms),
            Err(_) => warn!("[Pylontech] Failed to receive message"),
        }
    }

    /// Decode one frame and merge its fields
    ///
    /// Remote frames, extended identifiers, unknown identifiers and short
    /// payloads leave the snapshot untouched.
    pub fn handle_frame<F: Frame>(&mut self, frame: &F, now_ms: u32) {
        if frame.is_remote_frame() {
            return;
        }
        let id = match frame.id() {
            Id::Standard(id) => id.as_raw(),
            Id::Extended(_) => return,
        };
        let Some(points) = pylontech::decode(id, frame.data(), now_ms) else {
            return;
        };
        if self.verbose {
            debug!("[Pylontech] {=u16:#x}: {} fields", id, points.len());
        }

        let stats = Rc::make_mut(&mut self.stats);
        if let Some(soc) = points.get_as::<u16>(Label::StateOfCharge) {
            stats.set_state_of_charge(u8::try_from(soc).unwrap_or(u8::MAX), now_ms);
        }
        if let Some(name) = points.get_as::<Text>(Label::Manufacturer) {
            stats.set_manufacturer(&name);
        }
        if let Telemetry::Pylontech(registry) = stats.telemetry_mut() {
            let _ = registry.update_from(&points);
        }
        stats.set_last_update(now_ms);
    }

    pub fn stats(&self) -> Rc<StatsSnapshot> {
        Rc::clone(&self.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::collections::VecDeque;
    use battlink_hal::CanMessage;
    use embedded_can::{ExtendedId, StandardId};

    #[derive(Debug, PartialEq)]
    struct BusError;

    #[derive(Default)]
    struct FakeBus {
        frames: VecDeque<CanMessage>,
        fail_receive: bool,
    }

    impl CanReceiver for FakeBus {
        type Frame = CanMessage;
        type Error = BusError;

        fn pending(&mut self) -> Result<usize, BusError> {
            Ok(self.frames.len())
        }

        fn receive(&mut self, _timeout_ms: u32) -> Result<CanMessage, BusError> {
            if self.fail_receive {
                return Err(BusError);
            }
            self.frames.pop_front().ok_or(BusError)
        }
    }

    fn standard(id: u16, data: &[u8]) -> CanMessage {
        let id = StandardId::new(id).unwrap();
        CanMessage::new(id, data).unwrap()
    }

    fn receiver(frames: &[CanMessage]) -> PylontechReceiver<FakeBus> {
        let bus = FakeBus {
            frames: frames.iter().cloned().collect(),
            fail_receive: false,
        };
        PylontechReceiver::new(bus, false)
    }

    #[test]
    fn test_state_of_charge() {
        let mut receiver = receiver(&[standard(0x355, &[0x64, 0x00, 0x5A, 0x00])]);
        receiver.poll(1_000);

        let stats = receiver.stats();
        assert_eq!(stats.state_of_charge(), Some(100));
        assert_eq!(stats.last_update_ms(), Some(1_000));
        match stats.telemetry() {
            Telemetry::Pylontech(points) => {
                assert_eq!(points.get_as::<u16>(Label::StateOfHealth), Some(90));
            }
            other => panic!("unexpected telemetry {:?}", other),
        }
    }

    #[test]
    fn test_one_frame_per_poll() {
        let mut receiver = receiver(&[
            standard(0x355, &[0x50, 0x00, 0x5A, 0x00]),
            standard(0x35E, b"PYLON   "),
        ]);
        receiver.poll(10);
        assert_eq!(receiver.stats().manufacturer(), "unknown");

        receiver.poll(20);
        let stats = receiver.stats();
        assert_eq!(stats.manufacturer(), "PYLON");
        assert_eq!(stats.state_of_charge_age_ms(20), Some(10));
    }

    #[test]
    fn test_ignored_frames() {
        let extended = CanMessage::new(ExtendedId::new(0x355).unwrap(), &[0x64, 0, 0x5A, 0]).unwrap();
        let remote = CanMessage::new_remote(StandardId::new(0x355).unwrap(), 4).unwrap();
        let unknown = standard(0x370, &[1, 2, 3, 4]);
        let short = standard(0x355, &[0x64]);

        let mut receiver = receiver(&[extended, remote, unknown, short]);
        for now in 0..4 {
            receiver.poll(now);
        }
        assert_eq!(receiver.stats().last_update_ms(), None);
    }

    #[test]
    fn test_nothing_pending() {
        let mut receiver = receiver(&[]);
        receiver.poll(0);
        assert_eq!(receiver.stats().last_update_ms(), None);
    }

    #[test]
    fn test_receive_failure_keeps_snapshot() {
        let mut receiver = receiver(&[standard(0x355, &[0x64, 0x00, 0x5A, 0x00])]);
        receiver.can.fail_receive = true;
        receiver.poll(0);
        assert_eq!(receiver.stats().state_of_charge(), None);
    }

    #[test]
    fn test_later_values_win() {
        let mut receiver = receiver(&[
            standard(0x355, &[0x50, 0x00, 0x5A, 0x00]),
            standard(0x355, &[0x4F, 0x00, 0x5A, 0x00]),
        ]);
        receiver.poll(0);
        receiver.poll(500);
        assert_eq!(receiver.stats().state_of_charge(), Some(79));
    }
}
