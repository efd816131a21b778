//! Byte-stream frame assembly
//!
//! The assembler recovers frame boundaries from an unreliable serial stream.
//! It looks for the two-byte start marker, reads the big-endian length and
//! then collects exactly as many bytes as the length announces. It does not
//! validate markers or checksums beyond the start marker; completed frames
//! go through [`validate`](super::frame::validate).

use super::frame::{FrameError, RawFrame, START_BYTE_1, START_BYTE_2};

/// Assembly state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AssemblerState {
    /// Nothing requested, hunting for unsolicited frames
    Idle,
    /// Request sent, hunting for the response
    WaitingForStart,
    /// Got 0x4E
    StartByte1Seen,
    /// Got 0x4E 0x57
    StartMarkerConfirmed,
    /// Got the length high byte
    LengthHighByteSeen,
    /// Collecting the rest of the frame
    ReadingPayload,
}

/// State machine assembling frames one byte at a time
#[derive(Debug, Clone)]
pub struct FrameAssembler {
    state: AssemblerState,
    buffer: RawFrame,
    remaining: u16,
    awaiting_response: bool,
    overflow: bool,
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameAssembler {
    /// Create a new assembler in [`AssemblerState::Idle`]
    pub fn new() -> Self {
        Self {
            state: AssemblerState::Idle,
            buffer: RawFrame::new(),
            remaining: 0,
            awaiting_response: false,
            overflow: false,
        }
    }

    pub fn state(&self) -> AssemblerState {
        self.state
    }

    /// No frame in progress and no response expected
    pub fn is_idle(&self) -> bool {
        self.state == AssemblerState::Idle
    }

    /// Bytes collected for the frame in progress
    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    /// Mark that a request went out and a response is expected
    pub fn await_response(&mut self) {
        self.reset();
        self.awaiting_response = true;
        self.state = AssemblerState::WaitingForStart;
    }

    /// Drop any partial frame and return to [`AssemblerState::Idle`]
    pub fn reset(&mut self) {
        self.state = AssemblerState::Idle;
        self.buffer.clear();
        self.remaining = 0;
        self.awaiting_response = false;
        self.overflow = false;
    }

    fn hunting_state(&self) -> AssemblerState {
        if self.awaiting_response {
            AssemblerState::WaitingForStart
        } else {
            AssemblerState::Idle
        }
    }

    fn push(&mut self, byte: u8) {
        if self.buffer.push(byte).is_err() {
            self.overflow = true;
        }
    }

    fn complete(&mut self) -> Result<Option<RawFrame>, FrameError> {
        let frame = core::mem::take(&mut self.buffer);
        let overflow = self.overflow;
        self.reset();
        if overflow {
            Err(FrameError::Oversized)
        } else {
            Ok(Some(frame))
        }
    }

    /// Feed a single byte to the assembler
    ///
    /// Returns `Ok(Some(frame))` when the announced number of bytes has been
    /// collected, `Ok(None)` when more bytes are needed, or `Err` when the
    /// frame had to be dropped. Either way the assembler is back in
    /// [`AssemblerState::Idle`] after a frame ends.
    pub fn feed(&mut self, byte: u8) -> Result<Option<RawFrame>, FrameError> {
        match self.state {
            AssemblerState::Idle | AssemblerState::WaitingForStart => {
                if byte == START_BYTE_1 {
                    self.push(byte);
                    self.state = AssemblerState::StartByte1Seen;
                }
                Ok(None)
            }
            AssemblerState::StartByte1Seen => {
                if byte == START_BYTE_2 {
                    self.push(byte);
                    self.state = AssemblerState::StartMarkerConfirmed;
                } else {
                    // the byte is dropped, even if it is 0x4E
                    self.buffer.clear();
                    self.state = self.hunting_state();
                }
                Ok(None)
            }
            AssemblerState::StartMarkerConfirmed => {
                self.push(byte);
                self.remaining = (byte as u16) << 8;
                self.state = AssemblerState::LengthHighByteSeen;
                Ok(None)
            }
            AssemblerState::LengthHighByteSeen => {
                self.push(byte);
                let declared = self.remaining | byte as u16;
                if declared < 2 {
                    self.reset();
                    return Err(FrameError::TooShort);
                }
                // the length bytes themselves are already in the buffer
                self.remaining = declared - 2;
                if self.remaining == 0 {
                    return self.complete();
                }
                self.state = AssemblerState::ReadingPayload;
                Ok(None)
            }
            AssemblerState::ReadingPayload => {
                self.push(byte);
                self.remaining -= 1;
                if self.remaining == 0 {
                    return self.complete();
                }
                Ok(None)
            }
        }
    }

    /// Feed multiple bytes to the assembler
    ///
    /// Returns the first complete frame found, if any.
    /// Remaining bytes after a complete frame are not consumed.
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> Result<Option<RawFrame>, FrameError> {
        for &byte in bytes {
            if let Some(frame) = self.feed(byte)? {
                return Ok(Some(frame));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jkbms::frame::{validate, Command, Message, MAX_FRAME_SIZE};
    use crate::jkbms::test_frame;

    #[test]
    fn test_assemble_command_frame() {
        let message = Message::command(Command::ReadAll);
        let mut assembler = FrameAssembler::new();
        let frame = assembler.feed_bytes(message.as_bytes()).unwrap().unwrap();

        assert_eq!(frame.as_slice(), message.as_bytes());
        assert!(assembler.is_idle());
        assert!(assembler.buffered().is_empty());
    }

    #[test]
    fn test_resync_after_garbage() {
        let raw = test_frame(&[0x85, 0x50]);
        let mut data = heapless::Vec::<u8, 64>::new();
        data.extend_from_slice(&[0x00, 0xFF, 0x12, 0x68]).unwrap();
        data.extend_from_slice(&raw).unwrap();

        let mut assembler = FrameAssembler::new();
        let frame = assembler.feed_bytes(&data).unwrap().unwrap();
        assert_eq!(frame, raw);
        assert_eq!(validate(&frame), Ok(()));
    }

    #[test]
    fn test_noise_keeps_hunting_state() {
        let mut assembler = FrameAssembler::new();
        assembler.await_response();
        assert_eq!(assembler.feed(0x11), Ok(None));
        assert_eq!(assembler.state(), AssemblerState::WaitingForStart);

        assembler.reset();
        assert_eq!(assembler.feed(0x11), Ok(None));
        assert_eq!(assembler.state(), AssemblerState::Idle);
    }

    #[test]
    fn test_bad_second_marker_byte_drops_byte() {
        let mut assembler = FrameAssembler::new();
        assembler.await_response();
        assembler.feed(0x4E).unwrap();
        assert_eq!(assembler.state(), AssemblerState::StartByte1Seen);

        // 0x4E 0x4E 0x57: the second 0x4E is consumed by the mismatch
        assembler.feed(0x4E).unwrap();
        assert_eq!(assembler.state(), AssemblerState::WaitingForStart);
        assembler.feed(0x57).unwrap();
        assert_eq!(assembler.state(), AssemblerState::WaitingForStart);
        assert!(assembler.buffered().is_empty());
    }

    #[test]
    fn test_length_two_completes_immediately() {
        let mut assembler = FrameAssembler::new();
        let frame = assembler
            .feed_bytes(&[0x4E, 0x57, 0x00, 0x02])
            .unwrap()
            .unwrap();
        assert_eq!(frame.as_slice(), &[0x4E, 0x57, 0x00, 0x02]);
        assert!(validate(&frame).is_err());
        assert!(assembler.is_idle());
    }

    #[test]
    fn test_length_below_two_rejected() {
        let mut assembler = FrameAssembler::new();
        assert_eq!(assembler.feed_bytes(&[0x4E, 0x57, 0x00]), Ok(None));
        assert_eq!(assembler.feed(0x01), Err(FrameError::TooShort));
        assert!(assembler.is_idle());
    }

    #[test]
    fn test_oversized_frame_consumed_and_dropped() {
        let declared: u16 = 600;
        let mut assembler = FrameAssembler::new();
        assembler.feed_bytes(&[0x4E, 0x57]).unwrap();
        assembler.feed_bytes(&declared.to_be_bytes()).unwrap();

        for _ in 0..(declared - 3) {
            assert_eq!(assembler.feed(0xAA), Ok(None));
        }
        assert_eq!(assembler.buffered().len(), MAX_FRAME_SIZE);
        assert_eq!(assembler.feed(0xAA), Err(FrameError::Oversized));
        assert!(assembler.is_idle());

        // next frame assembles normally
        let raw = test_frame(&[]);
        assert_eq!(assembler.feed_bytes(&raw).unwrap(), Some(raw));
    }

    #[test]
    fn test_complete_clears_awaiting_response() {
        let raw = test_frame(&[0x85, 0x10]);
        let mut assembler = FrameAssembler::new();
        assembler.await_response();
        assert!(!assembler.is_idle());

        assembler.feed_bytes(&raw).unwrap().unwrap();
        assert!(assembler.is_idle());

        // noise after completion no longer counts as awaiting
        assembler.feed(0x4E).unwrap();
        assembler.feed(0x00).unwrap();
        assert_eq!(assembler.state(), AssemblerState::Idle);
    }

    #[test]
    fn test_back_to_back_frames() {
        let first = test_frame(&[0x85, 0x10]);
        let second = test_frame(&[0x85, 0x20]);
        let mut assembler = FrameAssembler::new();

        let mut frames = 0;
        for &byte in first.iter().chain(second.iter()) {
            if let Some(frame) = assembler.feed(byte).unwrap() {
                frames += 1;
                assert_eq!(validate(&frame), Ok(()));
            }
        }
        assert_eq!(frames, 2);
    }
}
