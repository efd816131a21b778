//! Property tests for frame assembly and validation

use battlink_protocol::jkbms::{
    checksum, validate, AssemblerState, Command, FrameAssembler, FrameError, FrameType, Message,
    RawFrame, Source,
};
use proptest::prelude::*;

/// Build a valid response frame around `payload`
fn response(payload: &[u8]) -> RawFrame {
    let mut raw = RawFrame::new();
    raw.extend_from_slice(&[0x4E, 0x57]).unwrap();
    raw.extend_from_slice(&(18 + payload.len() as u16).to_be_bytes())
        .unwrap();
    raw.extend_from_slice(&[0, 0, 0, 0, 0x06, 0x00, 0x01]).unwrap();
    raw.extend_from_slice(payload).unwrap();
    raw.extend_from_slice(&[0, 0, 0, 0, 0x68, 0, 0]).unwrap();
    let sum = checksum(&raw);
    raw.extend_from_slice(&sum.to_be_bytes()).unwrap();
    raw
}

fn command() -> impl Strategy<Value = Command> {
    prop_oneof![
        Just(Command::Activate),
        Just(Command::Write),
        Just(Command::Read),
        Just(Command::Password),
        Just(Command::ReadAll),
        any::<u8>().prop_map(Command::from_byte),
    ]
}

proptest! {
    #[test]
    fn encoded_command_survives_assembly(cmd in command(), noise in proptest::collection::vec(0u8..0x4E, 0..16)) {
        let message = Message::command(cmd);
        let mut assembler = FrameAssembler::new();
        assembler.await_response();

        for byte in noise {
            prop_assert_eq!(assembler.feed(byte), Ok(None));
        }
        let frame = assembler.feed_bytes(message.as_bytes()).unwrap().unwrap();
        let parsed = Message::parse(frame).unwrap();

        prop_assert_eq!(parsed.command_kind(), cmd);
        prop_assert_eq!(parsed.source(), Source::Host);
        prop_assert_eq!(parsed.frame_type(), FrameType::Command);
        prop_assert!(assembler.is_idle());
    }

    #[test]
    fn assembler_consumes_declared_length(length in 2u16..=u16::MAX) {
        let mut assembler = FrameAssembler::new();
        assembler.feed_bytes(&[0x4E, 0x57]).unwrap();
        let header = length.to_be_bytes();
        prop_assert_eq!(assembler.feed(header[0]), Ok(None));

        if length == 2 {
            prop_assert!(matches!(assembler.feed(header[1]), Ok(Some(_))));
            return Ok(());
        }

        prop_assert_eq!(assembler.feed(header[1]), Ok(None));
        for _ in 0..(length - 3) {
            prop_assert_eq!(assembler.feed(0), Ok(None));
        }
        let last = assembler.feed(0);
        prop_assert!(last.is_ok() || last == Err(FrameError::Oversized));
        prop_assert!(last != Ok(None));
        prop_assert!(assembler.is_idle());
    }

    #[test]
    fn single_byte_flip_fails_validation(
        payload in proptest::collection::vec(any::<u8>(), 1..64),
        index in any::<prop::sample::Index>(),
        flip in 1u8..=255,
    ) {
        let mut raw = response(&payload);
        prop_assert_eq!(validate(&raw), Ok(()));

        let at = 11 + index.index(payload.len());
        raw[at] ^= flip;
        let result = validate(&raw);
        prop_assert!(
            matches!(result, Err(FrameError::InvalidChecksum { .. })),
            "expected checksum failure, got {:?}",
            result
        );
    }

    #[test]
    fn missing_second_marker_never_progresses(noise in proptest::collection::vec(any::<u8>().prop_filter("not a marker", |b| *b != 0x4E && *b != 0x57), 1..64)) {
        let mut assembler = FrameAssembler::new();
        assembler.await_response();
        prop_assert_eq!(assembler.feed(0x4E), Ok(None));

        for byte in noise {
            prop_assert_eq!(assembler.feed(byte), Ok(None));
            prop_assert_eq!(assembler.state(), AssemblerState::WaitingForStart);
        }
        prop_assert!(assembler.buffered().is_empty());
    }
}
