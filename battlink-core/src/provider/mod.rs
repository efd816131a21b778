//! Battery data providers
//!
//! A provider owns the board resources of one data source and turns its
//! traffic into a [`StatsSnapshot`]. The manager holds exactly one
//! [`Provider`] at a time.

pub mod external;
pub mod jkbms;
pub mod pylontech;
pub mod transceiver;

use alloc::rc::Rc;

use battlink_hal::Board;

pub use external::ExternalProvider;
pub use jkbms::{Interface, JkBmsController};
pub use pylontech::PylontechReceiver;
pub use transceiver::Transceiver;

use crate::config::{BatteryConfig, ProviderKind};
use crate::manager::InitError;
use crate::stats::StatsSnapshot;

/// The active data source
pub enum Provider<B: Board> {
    /// Battery support disabled or selection failed
    None,
    JkBms(JkBmsController<B::Serial, B::Pin>),
    Pylontech(PylontechReceiver<B::Can>),
    External(ExternalProvider<B::External>),
}

impl<B: Board> Provider<B> {
    /// Claim resources and construct the provider for `kind`
    pub fn init(
        board: &mut B,
        kind: ProviderKind,
        config: &BatteryConfig,
        now_ms: u32,
    ) -> Result<Self, InitError> {
        match kind {
            ProviderKind::None => Ok(Provider::None),
            ProviderKind::SerialTtl | ProviderKind::SerialTransceiver => {
                JkBmsController::init(board, kind, config, now_ms).map(Provider::JkBms)
            }
            ProviderKind::BusDecoder => PylontechReceiver::init(board, config).map(Provider::Pylontech),
            ProviderKind::ExternalShunt | ProviderKind::ExternalGeneric => {
                ExternalProvider::init(board, kind, config).map(Provider::External)
            }
        }
    }

    /// Release every resource held by the provider
    pub fn deinit(self, board: &mut B) {
        match self {
            Provider::None => {}
            Provider::JkBms(controller) => controller.deinit(board),
            Provider::Pylontech(receiver) => receiver.deinit(board),
            Provider::External(external) => external.deinit(board),
        }
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            Provider::None => ProviderKind::None,
            Provider::JkBms(controller) => controller.kind(),
            Provider::Pylontech(_) => ProviderKind::BusDecoder,
            Provider::External(external) => external.kind(),
        }
    }

    /// Service the provider once
    pub fn poll(&mut self, now_ms: u32) {
        match self {
            Provider::None => {}
            Provider::JkBms(controller) => controller.poll(now_ms),
            Provider::Pylontech(receiver) => receiver.poll(now_ms),
            Provider::External(external) => external.poll(now_ms),
        }
    }

    /// Current snapshot, `None` when no provider is active
    pub fn stats(&self) -> Option<Rc<StatsSnapshot>> {
        match self {
            Provider::None => None,
            Provider::JkBms(controller) => Some(controller.stats()),
            Provider::Pylontech(receiver) => Some(receiver.stats()),
            Provider::External(external) => Some(external.stats()),
        }
    }
}
