//! JK BMS serial controller
//!
//! Runs the request/response cycle against a JK BMS on a TTL UART or behind
//! an RS485 transceiver. Every call to [`JkBmsController::poll`] does three
//! things in this order:
//!
//! 1. Feed all buffered bytes into the frame assembler and process any
//!    completed frame
//! 2. Send a read-all request if the assembler is idle, the poll interval has
//!    elapsed and the transmitter can take it
//! 3. Drop a half-received frame once the response timeout has passed
//!
//! None of these steps block.

use alloc::rc::Rc;

use battlink_hal::{Board, OutputPin, Serial, UartConfig};
use battlink_protocol::jkbms::{Command, FrameAssembler, Label, Message, RawFrame};
use battlink_protocol::Text;

use super::transceiver::Transceiver;
use crate::config::{BatteryConfig, PinRole, ProviderKind};
use crate::manager::InitError;
use crate::stats::{StatsSnapshot, Telemetry};
use crate::status::{Status, StatusReporter};

/// Extra time granted on top of two poll intervals before giving up on a
/// response
pub const RESPONSE_GRACE_MS: u32 = 250;

/// Manufacturer reported until the BMS sends its product id
pub const DEFAULT_MANUFACTURER: &str = "JKBMS";

/// Physical interface to the BMS
pub enum Interface<P> {
    /// Plain TTL UART, full duplex
    Ttl,
    /// Half-duplex RS485 transceiver with direction control
    Transceiver(Transceiver<P>),
}

/// Request/response controller for a JK BMS
pub struct JkBmsController<S, P> {
    serial: S,
    interface: Interface<P>,
    assembler: FrameAssembler,
    reporter: StatusReporter,
    /// Protocol version last reported by the BMS
    protocol_version: Option<u8>,
    /// When the last request was written
    last_request_ms: Option<u32>,
    poll_interval_ms: u32,
    verbose: bool,
    stats: Rc<StatsSnapshot>,
}

impl<S: Serial, P: OutputPin> JkBmsController<S, P> {
    /// Create a controller on an already configured serial port
    pub fn new(serial: S, interface: Interface<P>, config: &BatteryConfig) -> Self {
        let mut stats = StatsSnapshot::new(Telemetry::JkBms(Default::default()));
        stats.set_manufacturer(DEFAULT_MANUFACTURER);
        Self {
            serial,
            interface,
            assembler: FrameAssembler::new(),
            reporter: StatusReporter::new(),
            protocol_version: None,
            last_request_ms: None,
            poll_interval_ms: config.poll_interval_ms(),
            verbose: config.verbose_logging,
            stats: Rc::new(stats),
        }
    }

    /// Claim the interface resources and create a controller
    ///
    /// `kind` selects between the TTL and transceiver interface. Resources
    /// claimed before a failure are released again.
    pub fn init<B>(
        board: &mut B,
        kind: ProviderKind,
        config: &BatteryConfig,
        now_ms: u32,
    ) -> Result<Self, InitError>
    where
        B: Board<Serial = S, Pin = P>,
    {
        config.validate_for(kind)?;
        let rx = config.pins.require(PinRole::Rx)?;
        let tx = config.pins.require(PinRole::Tx)?;

        let interface = match kind {
            ProviderKind::SerialTransceiver => {
                let rx_enable_pin = config.pins.require(PinRole::RxEnable)?;
                let tx_enable_pin = config.pins.require(PinRole::TxEnable)?;
                info!(
                    "[JK BMS] Transceiver rx_enable = {}, tx_enable = {}",
                    rx_enable_pin, tx_enable_pin
                );
                let rx_enable = board.claim_output(rx_enable_pin)?;
                let tx_enable = match board.claim_output(tx_enable_pin) {
                    Ok(pin) => pin,
                    Err(e) => {
                        board.release_output(rx_enable);
                        return Err(e.into());
                    }
                };
                Interface::Transceiver(Transceiver::new(rx_enable, tx_enable))
            }
            _ => Interface::Ttl,
        };

        info!("[JK BMS] Initialize interface rx = {}, tx = {}", rx, tx);
        let serial = match board.claim_serial(rx, tx, &UartConfig::default()) {
            Ok(serial) => serial,
            Err(e) => {
                release_interface(board, interface);
                return Err(e.into());
            }
        };

        let mut controller = Self::new(serial, interface, config);
        controller.announce(Status::Initializing, now_ms);
        Ok(controller)
    }

    /// Stop the UART and release the pins in reverse claim order
    pub fn deinit<B>(self, board: &mut B)
    where
        B: Board<Serial = S, Pin = P>,
    {
        board.release_serial(self.serial);
        release_interface(board, self.interface);
        info!("[JK BMS] Serial driver uninstalled");
    }

    pub fn kind(&self) -> ProviderKind {
        match self.interface {
            Interface::Ttl => ProviderKind::SerialTtl,
            Interface::Transceiver(_) => ProviderKind::SerialTransceiver,
        }
    }

    /// Run one receive/request/timeout cycle
    pub fn poll(&mut self, now_ms: u32) {
        self.receive(now_ms);
        self.send_request(now_ms);

        if let Some(sent) = self.last_request_ms {
            if now_ms.wrapping_sub(sent) > self.response_timeout_ms() {
                self.assembler.reset();
                self.announce(Status::Timeout, now_ms);
            }
        }
    }

    pub fn stats(&self) -> Rc<StatsSnapshot> {
        Rc::clone(&self.stats)
    }

    /// Most recent status condition
    pub fn status(&self) -> Option<Status> {
        self.reporter.current()
    }

    pub fn protocol_version(&self) -> Option<u8> {
        self.protocol_version
    }

    fn response_timeout_ms(&self) -> u32 {
        self.poll_interval_ms
            .saturating_mul(2)
            .saturating_add(RESPONSE_GRACE_MS)
    }

    fn announce(&mut self, status: Status, now_ms: u32) {
        if self.reporter.announce(status, now_ms) {
            info!("[JK BMS] {}", status.as_str());
        }
    }

    fn receive(&mut self, now_ms: u32) {
        loop {
            let byte = match self.serial.read_byte() {
                Ok(Some(byte)) => byte,
                Ok(None) => break,
                Err(_) => {
                    self.announce(Status::ReceiveFailed, now_ms);
                    break;
                }
            };

            match self.assembler.feed(byte) {
                Ok(None) => {}
                Ok(Some(frame)) => self.frame_complete(frame, now_ms),
                Err(e) => {
                    warn!("[JK BMS] Dropped frame: {}", e);
                    self.announce(Status::MalformedFrame, now_ms);
                }
            }
        }
    }

    fn frame_complete(&mut self, frame: RawFrame, now_ms: u32) {
        self.announce(Status::FrameCompleted, now_ms);
        if self.verbose {
            debug!("[JK BMS] Raw frame: {=[u8]:x}", frame.as_slice());
        }

        match Message::parse(frame) {
            Ok(message) => self.process(&message, now_ms),
            Err(e) => {
                warn!("[JK BMS] Invalid frame: {}", e);
                self.announce(Status::MalformedFrame, now_ms);
            }
        }
    }

    fn process(&mut self, message: &Message, now_ms: u32) {
        let points = message.data_points(self.protocol_version, now_ms);
        if let Some(version) = points.get_as::<u8>(Label::ProtocolVersion) {
            self.protocol_version = Some(version);
        }

        let stats = Rc::make_mut(&mut self.stats);
        if let Some(soc) = points.get_as::<u8>(Label::BatterySoCPercent) {
            stats.set_state_of_charge(soc, now_ms);
        }

        let mut product_id = None;
        if let Telemetry::JkBms(registry) = stats.telemetry_mut() {
            // both sides share one capacity; the merge cannot run out of room
            let _ = registry.update_from(&points);
            product_id = registry.get_as::<Text>(Label::ProductId);
        }
        if let Some(product_id) = product_id {
            stats.set_manufacturer(manufacturer_from_product_id(&product_id));
        }
        stats.set_last_update(now_ms);
    }

    fn send_request(&mut self, now_ms: u32) {
        if !self.assembler.is_idle() {
            return self.announce(Status::BusyReading, now_ms);
        }

        if let Some(sent) = self.last_request_ms {
            if now_ms.wrapping_sub(sent) < self.poll_interval_ms {
                return self.announce(Status::WaitingForPollInterval, now_ms);
            }
        }

        if !self.serial.ready_for_write() {
            return self.announce(Status::SerialNotAvailableForWrite, now_ms);
        }

        let request = Message::command(Command::ReadAll);

        if let Interface::Transceiver(transceiver) = &mut self.interface {
            transceiver.begin_transmit();
        }
        let written = match self.serial.write_bytes(request.as_bytes()) {
            Ok(()) => self.serial.flush(),
            Err(e) => Err(e),
        };
        if let Interface::Transceiver(transceiver) = &mut self.interface {
            transceiver.end_transmit();
        }

        self.last_request_ms = Some(now_ms);
        match written {
            Ok(()) => {
                self.assembler.await_response();
                self.announce(Status::RequestSent, now_ms);
            }
            Err(_) => self.announce(Status::WriteFailed, now_ms),
        }
    }
}

fn release_interface<B: Board>(board: &mut B, interface: Interface<B::Pin>) {
    if let Interface::Transceiver(transceiver) = interface {
        let (rx_enable, tx_enable) = transceiver.into_pins();
        board.release_output(tx_enable);
        board.release_output(rx_enable);
    }
}

/// Manufacturer name derived from the product id
///
/// The product id carries a vendor prefix before the model, e.g.
/// `"BT-JK-B2A24S"`; everything from the last `"JK"` on is reported.
pub fn manufacturer_from_product_id(product_id: &str) -> &str {
    match product_id.rfind("JK") {
        Some(at) => &product_id[at..],
        None if product_id.is_empty() => DEFAULT_MANUFACTURER,
        None => product_id,
    }
}
