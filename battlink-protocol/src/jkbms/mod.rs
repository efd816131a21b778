//! JK BMS serial protocol
//!
//! The BMS answers a 20-byte request with one frame carrying all of its
//! records. It may also send frames on its own.

pub mod assembler;
pub mod frame;
pub mod labels;
pub mod records;

pub use assembler::{AssemblerState, FrameAssembler};
pub use frame::{
    checksum, validate, Command, FrameError, FrameType, Message, RawFrame, Source,
    COMMAND_FRAME_SIZE, MAX_FRAME_SIZE,
};
pub use labels::{set_bits, Label, ALARM_BITS, STATUS_BITS};
pub use records::{decode_current, decode_temperature, DataPoints};

impl Message {
    /// Decode the payload records of this frame
    pub fn data_points(&self, protocol_version: Option<u8>, now_ms: u32) -> DataPoints {
        records::decode(self.payload(), protocol_version, now_ms)
    }
}

/// Build a valid response frame around `payload`
#[cfg(test)]
pub(crate) fn test_frame(payload: &[u8]) -> RawFrame {
    use frame::{END_MARKER, LENGTH_OVERHEAD, START_BYTE_1, START_BYTE_2};

    let mut raw = RawFrame::new();
    raw.extend_from_slice(&[START_BYTE_1, START_BYTE_2]).unwrap();
    let length = LENGTH_OVERHEAD + payload.len() as u16;
    raw.extend_from_slice(&length.to_be_bytes()).unwrap();
    raw.extend_from_slice(&[0x00, 0x00, 0x00, 0x01]).unwrap();
    raw.extend_from_slice(&[0x06, 0x00, 0x01]).unwrap();
    raw.extend_from_slice(payload).unwrap();
    raw.extend_from_slice(&[0x00, 0x00, 0x2A, 0x00]).unwrap();
    raw.push(END_MARKER).unwrap();
    raw.extend_from_slice(&[0x00, 0x00]).unwrap();
    let sum = checksum(&raw);
    raw.extend_from_slice(&sum.to_be_bytes()).unwrap();
    raw
}
