//! Provider lifecycle
//!
//! [`BatteryManager`] owns the board and at most one provider. Selecting a
//! provider always tears the previous one down first, so pins and peripherals
//! are free again before the new provider claims them. A failed selection
//! leaves the manager with no provider.

use alloc::rc::Rc;
use core::fmt;

use battlink_hal::{Board, ClaimError};

use crate::config::{BatteryConfig, ConfigError, ProviderKind};
use crate::provider::Provider;
use crate::stats::StatsSnapshot;

/// Reasons a provider could not be started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InitError {
    /// Configuration cannot drive the requested provider
    Config(ConfigError),
    /// The board refused a resource
    Claim(ClaimError),
}

impl From<ConfigError> for InitError {
    fn from(e: ConfigError) -> Self {
        InitError::Config(e)
    }
}

impl From<ClaimError> for InitError {
    fn from(e: ClaimError) -> Self {
        InitError::Claim(e)
    }
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitError::Config(e) => write!(f, "configuration error: {}", e),
            InitError::Claim(e) => write!(f, "resource error: {}", e),
        }
    }
}

/// Owner of the single active battery provider
pub struct BatteryManager<B: Board> {
    board: B,
    provider: Provider<B>,
    /// Handed out while no provider is active
    empty: Rc<StatsSnapshot>,
}

impl<B: Board> BatteryManager<B> {
    /// Create a manager with no active provider
    pub fn new(board: B) -> Self {
        Self {
            board,
            provider: Provider::None,
            empty: Rc::new(StatsSnapshot::empty()),
        }
    }

    /// Replace the active provider with one of `kind`
    ///
    /// The previous provider is torn down even when the new one fails to
    /// start; in that case no provider is active afterwards.
    pub fn select(
        &mut self,
        kind: ProviderKind,
        config: &BatteryConfig,
        now_ms: u32,
    ) -> Result<(), InitError> {
        self.teardown();
        if kind == ProviderKind::None {
            return Ok(());
        }

        info!("[Battery] Selecting provider {}", kind.name());
        match Provider::init(&mut self.board, kind, config, now_ms) {
            Ok(provider) => {
                self.provider = provider;
                Ok(())
            }
            Err(e) => {
                error!("[Battery] Failed to start {}: {}", kind.name(), e);
                Err(e)
            }
        }
    }

    /// Apply a (possibly changed) configuration
    ///
    /// Disabled battery support stops the active provider. Otherwise the
    /// configured provider is rebuilt, picking up pin and interval changes.
    pub fn reload(&mut self, config: &BatteryConfig, now_ms: u32) -> Result<(), InitError> {
        if !config.enabled {
            info!("[Battery] Battery support disabled");
            self.teardown();
            return Ok(());
        }
        self.select(config.provider, config, now_ms)
    }

    /// Stop the active provider and release its resources
    pub fn teardown(&mut self) {
        let provider = core::mem::replace(&mut self.provider, Provider::None);
        if !matches!(provider, Provider::None) {
            info!("[Battery] Stopping provider {}", provider.kind().name());
        }
        provider.deinit(&mut self.board);
    }

    /// Service the active provider
    pub fn poll(&mut self, now_ms: u32) {
        self.provider.poll(now_ms);
    }

    /// Current stats; an empty snapshot while no provider is active
    pub fn stats(&self) -> Rc<StatsSnapshot> {
        self.provider
            .stats()
            .unwrap_or_else(|| Rc::clone(&self.empty))
    }

    pub fn kind(&self) -> ProviderKind {
        self.provider.kind()
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.provider, Provider::None)
    }

    pub fn board(&self) -> &B {
        &self.board
    }

    /// Tear down and give the board back
    pub fn into_board(mut self) -> B {
        self.teardown();
        self.board
    }
}
