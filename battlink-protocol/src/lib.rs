//! BMS wire protocols for Battlink
//!
//! This crate turns raw battery telemetry into label-keyed data points:
//!
//! - [`datapoints`]: the telemetry registry (typed, timestamped values keyed
//!   by a vendor label, last-writer-wins merge)
//! - [`jkbms`]: the framed serial protocol (byte-stream assembler, frame
//!   validation/encoding, payload record decoding)
//! - [`pylontech`]: the fixed-identifier CAN messages
//!
//! # Serial frame format
//!
//! ```text
//! ┌────────┬────────┬──────────┬─────┬─────┬──────┬─────────┬────────┬─────┬──────────┬──────────┐
//! │ START  │ LENGTH │ TERMINAL │ CMD │ SRC │ TYPE │ RECORDS │ RECORD │ END │ RESERVED │ CHECKSUM │
//! │ 4E 57  │ 2B BE  │ 4B       │ 1B  │ 1B  │ 1B   │ 0–N B   │ NO. 4B │ 68  │ 2B       │ 2B BE    │
//! └────────┴────────┴──────────┴─────┴─────┴──────┴─────────┴────────┴─────┴──────────┴──────────┘
//! ```
//!
//! LENGTH counts every byte after the start marker. CHECKSUM is the 16-bit
//! truncated sum of all bytes before RESERVED.
//!
//! Everything here is pure and allocation-free: time is passed in as a
//! millisecond timestamp by the caller.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod datapoints;
pub mod jkbms;
pub mod pylontech;

pub use datapoints::{
    CellTable, DataPoint, DataPointContainer, DataPointError, FromValue, Label, Text, Value,
    ValueKind,
};
