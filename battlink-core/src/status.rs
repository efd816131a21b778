//! Provider status conditions
//!
//! Providers report what they are doing on every poll. Reporting the same
//! condition over and over would flood the log, so a [`StatusReporter`]
//! decides whether a condition is worth emitting. The decision never affects
//! the provider's state machine.

/// Repeat interval for an unchanged status
pub const STATUS_REPEAT_MS: u32 = 10_000;

/// Provider status condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Status {
    /// Provider is starting up
    Initializing,
    /// No complete frame within the response timeout
    Timeout,
    /// Poll interval has not elapsed yet
    WaitingForPollInterval,
    /// Transmitter cannot take a request right now
    SerialNotAvailableForWrite,
    /// A frame is being received
    BusyReading,
    /// Request frame written
    RequestSent,
    /// Announced number of frame bytes received
    FrameCompleted,
    /// Frame failed marker, length or checksum validation
    MalformedFrame,
    /// Request could not be written
    WriteFailed,
    /// Driver returned an error while receiving
    ReceiveFailed,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Initializing => "initializing",
            Status::Timeout => "timeout",
            Status::WaitingForPollInterval => "waiting for poll interval",
            Status::SerialNotAvailableForWrite => "serial port not available for writing",
            Status::BusyReading => "busy reading",
            Status::RequestSent => "request for data sent",
            Status::FrameCompleted => "frame completed",
            Status::MalformedFrame => "malformed frame",
            Status::WriteFailed => "request write failed",
            Status::ReceiveFailed => "receive failed",
        }
    }
}

/// Check whether `interval_ms` has passed since `last_emitted_ms`
///
/// Uses wrapping arithmetic so it keeps working across timer overflow.
pub fn rate_limit_elapsed(now_ms: u32, last_emitted_ms: u32, interval_ms: u32) -> bool {
    now_ms.wrapping_sub(last_emitted_ms) >= interval_ms
}

/// Suppresses repeated status reports
#[derive(Debug, Clone, Default)]
pub struct StatusReporter {
    /// Last emitted status and when
    last_emitted: Option<(Status, u32)>,
    /// Most recently announced status, emitted or not
    current: Option<Status>,
}

impl StatusReporter {
    /// Create a new reporter that has emitted nothing yet
    pub fn new() -> Self {
        Self {
            last_emitted: None,
            current: None,
        }
    }

    /// Record `status` and decide whether it should be emitted
    ///
    /// A status different from the last emitted one is always emitted. The
    /// same status is emitted again once [`STATUS_REPEAT_MS`] have passed.
    pub fn announce(&mut self, status: Status, now_ms: u32) -> bool {
        self.current = Some(status);

        let emit = match self.last_emitted {
            Some((last, at)) if last == status => rate_limit_elapsed(now_ms, at, STATUS_REPEAT_MS),
            _ => true,
        };
        if emit {
            self.last_emitted = Some((status, now_ms));
        }
        emit
    }

    /// Most recently announced status
    pub fn current(&self) -> Option<Status> {
        self.current
    }
}
