//! Board-agnostic battery provider runtime
//!
//! This crate contains everything between the hardware contracts in
//! `battlink-hal` and the pure decoders in `battlink-protocol`:
//!
//! - Configuration types, validation and a small text parser
//! - Status reporting with time-based suppression
//! - Shareable stats snapshots with per-field freshness
//! - Providers: serial BMS controller, CAN receiver, external decoder adapter
//! - The lifecycle manager owning exactly one active provider
//!
//! Everything is driven by repeated, non-blocking calls from an external
//! scheduler; the current time is passed in as milliseconds since boot.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

extern crate alloc;

#[macro_use]
mod fmt;

pub mod config;
pub mod manager;
pub mod provider;
pub mod stats;
pub mod status;

pub use config::{BatteryConfig, ConfigError, PinMapping, PinRole, ProviderKind};
pub use manager::{BatteryManager, InitError};
pub use stats::{FieldValue, FieldView, StatsSnapshot, Telemetry};
pub use status::{Status, StatusReporter};
