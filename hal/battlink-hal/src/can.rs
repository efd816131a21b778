//! CAN bus receive abstraction
//!
//! The bus decoder never blocks on an empty queue: it asks for the number of
//! pending frames first and only then calls [`CanReceiver::receive`], whose
//! timeout bounds the wait on the actual driver call.

use embedded_can::{Frame, Id};

/// Non-blocking CAN frame receiver
pub trait CanReceiver {
    /// Frame type produced by the driver
    type Frame: Frame;
    /// Error type for driver operations
    type Error;

    /// Number of frames waiting in the receive queue
    fn pending(&mut self) -> Result<usize, Self::Error>;

    /// Receive one frame, waiting at most `timeout_ms`
    fn receive(&mut self, timeout_ms: u32) -> Result<Self::Frame, Self::Error>;
}

/// Classic CAN data or remote frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanMessage {
    id: Id,
    remote: bool,
    dlc: u8,
    data: [u8; 8],
}

impl Frame for CanMessage {
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        if data.len() > 8 {
            return None;
        }
        let mut buf = [0u8; 8];
        buf[..data.len()].copy_from_slice(data);
        Some(Self {
            id: id.into(),
            remote: false,
            dlc: data.len() as u8,
            data: buf,
        })
    }

    fn new_remote(id: impl Into<Id>, dlc: usize) -> Option<Self> {
        if dlc > 8 {
            return None;
        }
        Some(Self {
            id: id.into(),
            remote: true,
            dlc: dlc as u8,
            data: [0u8; 8],
        })
    }

    fn is_extended(&self) -> bool {
        matches!(self.id, Id::Extended(_))
    }

    fn is_remote_frame(&self) -> bool {
        self.remote
    }

    fn id(&self) -> Id {
        self.id
    }

    fn dlc(&self) -> usize {
        self.dlc as usize
    }

    fn data(&self) -> &[u8] {
        if self.remote {
            &[]
        } else {
            &self.data[..self.dlc as usize]
        }
    }
}
