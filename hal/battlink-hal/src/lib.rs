//! Battlink Hardware Abstraction Layer
//!
//! This crate defines the hardware contracts the battery providers need.
//! Board support code implements them on top of the chip HAL (or the
//! `embedded-hal`/`embedded-io` ecosystem traits via the adapters in
//! [`gpio`] and [`uart`]).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  battlink-core (providers, manager)     │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  battlink-hal (this crate - traits)     │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  board support (UART, TWAI/CAN, GPIO)   │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Traits
//!
//! - [`gpio::OutputPin`] - Transceiver enable lines
//! - [`uart::ByteSource`], [`uart::ByteSink`] - Non-blocking serial I/O
//! - [`can::CanReceiver`] - Non-blocking bus frame reception
//! - [`external::ExternalDecoder`] - Pre-built third-party decoders
//! - [`board::Board`] - Claiming and releasing all of the above

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod board;
pub mod can;
pub mod external;
pub mod gpio;
pub mod uart;

// Re-export key traits at crate root for convenience
pub use board::{Board, ClaimError};
pub use can::{CanMessage, CanReceiver};
pub use external::{ExternalDecoder, ExternalKind, ExternalReading};
pub use gpio::OutputPin;
pub use uart::{ByteSink, ByteSource, Serial, UartConfig};
