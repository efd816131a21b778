//! Frame validation, encoding and header access
//!
//! A frame on the wire:
//! - START (2 bytes): 0x4E 0x57
//! - LENGTH (2 bytes, BE): total frame size minus 2
//! - TERMINAL (4 bytes, BE): terminal id
//! - CMD, SOURCE, TYPE (1 byte each)
//! - RECORDS (LENGTH - 18 bytes): payload
//! - RECORD NUMBER (4 bytes): sequence in the upper three bytes
//! - END (1 byte): 0x68
//! - RESERVED (2 bytes)
//! - CHECKSUM (2 bytes, BE): truncated 16-bit sum of everything before RESERVED

use core::fmt;

use heapless::Vec;

/// First start marker byte
pub const START_BYTE_1: u8 = 0x4E;

/// Second start marker byte
pub const START_BYTE_2: u8 = 0x57;

/// End marker byte
pub const END_MARKER: u8 = 0x68;

/// Offset of the first payload byte
pub const PAYLOAD_OFFSET: usize = 11;

/// LENGTH value of a frame without payload
pub const LENGTH_OVERHEAD: u16 = 18;

/// Size of an outgoing command frame
pub const COMMAND_FRAME_SIZE: usize = LENGTH_OVERHEAD as usize + 2;

/// Largest frame the assembler keeps
pub const MAX_FRAME_SIZE: usize = 512;

/// Assembled frame bytes
pub type RawFrame = Vec<u8, MAX_FRAME_SIZE>;

/// Errors that can occur during frame assembly, validation or encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Declared or actual length below the fixed overhead
    TooShort,
    /// Declared length does not match the number of bytes
    LengthMismatch,
    /// Frame exceeded the assembly buffer
    Oversized,
    /// First two bytes are not 0x4E 0x57
    InvalidStartMarker,
    /// Byte at total-5 is not 0x68
    InvalidEndMarker,
    /// Stored checksum differs from the computed one
    InvalidChecksum { expected: u16, actual: u16 },
    /// Buffer too small for encoding
    BufferTooSmall,
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::TooShort => write!(f, "frame too short"),
            FrameError::LengthMismatch => write!(f, "declared length does not match frame"),
            FrameError::Oversized => write!(f, "frame exceeds {} bytes", MAX_FRAME_SIZE),
            FrameError::InvalidStartMarker => write!(f, "invalid start marker"),
            FrameError::InvalidEndMarker => write!(f, "invalid end marker"),
            FrameError::InvalidChecksum { expected, actual } => write!(
                f,
                "checksum mismatch: computed 0x{:04X}, frame has 0x{:04X}",
                expected, actual
            ),
            FrameError::BufferTooSmall => write!(f, "buffer too small"),
        }
    }
}

/// Frame command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    Activate,
    Write,
    Read,
    Password,
    ReadAll,
    Other(u8),
}

impl Command {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0x01 => Command::Activate,
            0x02 => Command::Write,
            0x03 => Command::Read,
            0x05 => Command::Password,
            0x06 => Command::ReadAll,
            other => Command::Other(other),
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            Command::Activate => 0x01,
            Command::Write => 0x02,
            Command::Read => 0x03,
            Command::Password => 0x05,
            Command::ReadAll => 0x06,
            Command::Other(byte) => byte,
        }
    }
}

/// Frame originator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Source {
    Bms,
    Bluetooth,
    Gps,
    Host,
    Other(u8),
}

impl Source {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0x00 => Source::Bms,
            0x01 => Source::Bluetooth,
            0x02 => Source::Gps,
            0x03 => Source::Host,
            other => Source::Other(other),
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            Source::Bms => 0x00,
            Source::Bluetooth => 0x01,
            Source::Gps => 0x02,
            Source::Host => 0x03,
            Source::Other(byte) => byte,
        }
    }
}

/// Frame transmission type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameType {
    Command,
    Response,
    Unsolicited,
    Other(u8),
}

impl FrameType {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0x00 => FrameType::Command,
            0x01 => FrameType::Response,
            0x02 => FrameType::Unsolicited,
            other => FrameType::Other(other),
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            FrameType::Command => 0x00,
            FrameType::Response => 0x01,
            FrameType::Unsolicited => 0x02,
            FrameType::Other(byte) => byte,
        }
    }
}

/// 16-bit truncated byte sum
pub fn checksum(bytes: &[u8]) -> u16 {
    bytes
        .iter()
        .fold(0u16, |sum, &byte| sum.wrapping_add(byte as u16))
}

/// Check start marker, end marker and checksum of a complete frame
pub fn validate(bytes: &[u8]) -> Result<(), FrameError> {
    let total = bytes.len();
    if total < COMMAND_FRAME_SIZE {
        return Err(FrameError::TooShort);
    }

    if bytes[0] != START_BYTE_1 || bytes[1] != START_BYTE_2 {
        return Err(FrameError::InvalidStartMarker);
    }

    let declared = u16::from_be_bytes([bytes[2], bytes[3]]) as usize;
    if declared + 2 != total {
        return Err(FrameError::LengthMismatch);
    }

    if bytes[total - 5] != END_MARKER {
        return Err(FrameError::InvalidEndMarker);
    }

    let expected = checksum(&bytes[..total - 4]);
    let actual = u16::from_be_bytes([bytes[total - 2], bytes[total - 1]]);
    if expected != actual {
        return Err(FrameError::InvalidChecksum { expected, actual });
    }

    Ok(())
}

/// A validated frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    raw: RawFrame,
}

impl Message {
    /// Validate assembled bytes and wrap them
    pub fn parse(raw: RawFrame) -> Result<Self, FrameError> {
        validate(&raw)?;
        Ok(Self { raw })
    }

    /// Create a validated copy of `bytes`
    pub fn from_slice(bytes: &[u8]) -> Result<Self, FrameError> {
        let raw = RawFrame::from_slice(bytes).map_err(|_| FrameError::Oversized)?;
        Self::parse(raw)
    }

    /// Build the 20-byte request frame for `command`
    ///
    /// Terminal id and record number are zero, the source is [`Source::Host`]
    /// and the type is [`FrameType::Command`].
    pub fn command(command: Command) -> Self {
        let mut raw = RawFrame::new();
        // COMMAND_FRAME_SIZE is far below MAX_FRAME_SIZE
        let _ = raw.resize_default(COMMAND_FRAME_SIZE);
        let total = raw.len();

        raw[0] = START_BYTE_1;
        raw[1] = START_BYTE_2;
        raw[2..4].copy_from_slice(&LENGTH_OVERHEAD.to_be_bytes());
        raw[8] = command.to_byte();
        raw[9] = Source::Host.to_byte();
        raw[10] = FrameType::Command.to_byte();
        raw[total - 5] = END_MARKER;

        let sum = checksum(&raw[..total - 4]);
        raw[total - 2..].copy_from_slice(&sum.to_be_bytes());

        Self { raw }
    }

    /// Copy the frame into `buffer`, returning the number of bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        let len = self.raw.len();
        if buffer.len() < len {
            return Err(FrameError::BufferTooSmall);
        }
        buffer[..len].copy_from_slice(&self.raw);
        Ok(len)
    }

    /// Complete frame bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    /// Declared LENGTH field
    pub fn frame_length(&self) -> u16 {
        u16::from_be_bytes([self.raw[2], self.raw[3]])
    }

    pub fn terminal_id(&self) -> u32 {
        u32::from_be_bytes([self.raw[4], self.raw[5], self.raw[6], self.raw[7]])
    }

    pub fn command_kind(&self) -> Command {
        Command::from_byte(self.raw[8])
    }

    pub fn source(&self) -> Source {
        Source::from_byte(self.raw[9])
    }

    pub fn frame_type(&self) -> FrameType {
        FrameType::from_byte(self.raw[10])
    }

    /// Record section of the frame
    pub fn payload(&self) -> &[u8] {
        let len = self.frame_length().saturating_sub(LENGTH_OVERHEAD) as usize;
        &self.raw[PAYLOAD_OFFSET..PAYLOAD_OFFSET + len]
    }

    /// Record sequence number (upper three bytes of the record number field)
    pub fn sequence(&self) -> u32 {
        let at = self.raw.len() - 9;
        u32::from_be_bytes([
            self.raw[at],
            self.raw[at + 1],
            self.raw[at + 2],
            self.raw[at + 3],
        ]) >> 8
    }

    /// Stored checksum
    pub fn checksum(&self) -> u16 {
        let total = self.raw.len();
        u16::from_be_bytes([self.raw[total - 2], self.raw[total - 1]])
    }

    /// Give back the raw bytes
    pub fn into_raw(self) -> RawFrame {
        self.raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jkbms::test_frame as response;

    #[test]
    fn test_command_frame_layout() {
        let message = Message::command(Command::ReadAll);
        let bytes = message.as_bytes();

        assert_eq!(bytes.len(), COMMAND_FRAME_SIZE);
        assert_eq!(&bytes[0..4], &[0x4E, 0x57, 0x00, 0x12]);
        assert_eq!(&bytes[4..8], &[0, 0, 0, 0]);
        assert_eq!(bytes[8], 0x06);
        assert_eq!(bytes[9], 0x03);
        assert_eq!(bytes[10], 0x00);
        assert_eq!(bytes[15], END_MARKER);
        assert_eq!(&bytes[16..18], &[0, 0]);

        // 0x4E + 0x57 + 0x12 + 0x06 + 0x03 + 0x68
        assert_eq!(message.checksum(), 0x0128);
        assert_eq!(&bytes[18..20], &[0x01, 0x28]);
    }

    #[test]
    fn test_command_frame_validates() {
        let message = Message::command(Command::Read);
        assert_eq!(validate(message.as_bytes()), Ok(()));
        assert_eq!(message.command_kind(), Command::Read);
        assert_eq!(message.source(), Source::Host);
        assert_eq!(message.frame_type(), FrameType::Command);
        assert!(message.payload().is_empty());
    }

    #[test]
    fn test_response_accessors() {
        let raw = response(&[0x85, 0x50]);
        let message = Message::parse(raw).unwrap();

        assert_eq!(message.frame_length(), 20);
        assert_eq!(message.terminal_id(), 1);
        assert_eq!(message.command_kind(), Command::ReadAll);
        assert_eq!(message.source(), Source::Bms);
        assert_eq!(message.frame_type(), FrameType::Response);
        assert_eq!(message.payload(), &[0x85, 0x50]);
        assert_eq!(message.sequence(), 0x2A);
    }

    #[test]
    fn test_unknown_header_values_preserved() {
        assert_eq!(Command::from_byte(0x04), Command::Other(0x04));
        assert_eq!(Command::Other(0x04).to_byte(), 0x04);
        assert_eq!(Source::from_byte(0x09), Source::Other(0x09));
        assert_eq!(FrameType::from_byte(0x07).to_byte(), 0x07);
    }

    #[test]
    fn test_invalid_start_marker() {
        let mut raw = response(&[]);
        raw[1] = 0x58;
        assert_eq!(validate(&raw), Err(FrameError::InvalidStartMarker));
    }

    #[test]
    fn test_invalid_end_marker() {
        let mut raw = response(&[0x85, 0x50]);
        let at = raw.len() - 5;
        raw[at] = 0x69;
        assert_eq!(validate(&raw), Err(FrameError::InvalidEndMarker));
    }

    #[test]
    fn test_invalid_checksum() {
        let mut raw = response(&[0x85, 0x50]);
        raw[12] = 0x51;
        let result = validate(&raw);
        assert!(matches!(result, Err(FrameError::InvalidChecksum { .. })));
    }

    #[test]
    fn test_reserved_bytes_not_checked() {
        let mut raw = response(&[0x85, 0x50]);
        let at = raw.len() - 4;
        raw[at] = 0xFF;
        raw[at + 1] = 0xFF;
        assert_eq!(validate(&raw), Ok(()));
    }

    #[test]
    fn test_checksum_wraps() {
        let bytes = [0xFFu8; 300];
        assert_eq!(checksum(&bytes), (300u32 * 0xFF) as u16);
    }

    #[test]
    fn test_too_short() {
        assert_eq!(validate(&[0x4E, 0x57]), Err(FrameError::TooShort));
    }

    #[test]
    fn test_encode_buffer_too_small() {
        let message = Message::command(Command::Activate);
        let mut small = [0u8; 10];
        assert_eq!(message.encode(&mut small), Err(FrameError::BufferTooSmall));

        let mut buffer = [0u8; 32];
        assert_eq!(message.encode(&mut buffer), Ok(COMMAND_FRAME_SIZE));
        assert_eq!(&buffer[..COMMAND_FRAME_SIZE], message.as_bytes());
    }
}
