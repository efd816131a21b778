//! Configuration type definitions
//!
//! These types represent the battery configuration. How they are persisted is
//! up to the caller; with the `serde` feature they can be serialized with any
//! serde format.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default request interval for polled providers
pub const DEFAULT_POLL_INTERVAL_S: u8 = 5;

/// Battery data source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ProviderKind {
    /// No battery telemetry
    #[default]
    None,
    /// Serial BMS on a plain TTL UART
    SerialTtl,
    /// Serial BMS behind a half-duplex RS485 transceiver
    SerialTransceiver,
    /// CAN bus BMS
    BusDecoder,
    /// Externally decoded battery shunt
    ExternalShunt,
    /// Any other externally decoded source
    ExternalGeneric,
}

impl ProviderKind {
    /// Every provider kind
    pub const ALL: [ProviderKind; 6] = [
        ProviderKind::None,
        ProviderKind::SerialTtl,
        ProviderKind::SerialTransceiver,
        ProviderKind::BusDecoder,
        ProviderKind::ExternalShunt,
        ProviderKind::ExternalGeneric,
    ];

    /// Name used in configuration files
    pub fn name(self) -> &'static str {
        match self {
            ProviderKind::None => "none",
            ProviderKind::SerialTtl => "serial_ttl",
            ProviderKind::SerialTransceiver => "serial_transceiver",
            ProviderKind::BusDecoder => "can",
            ProviderKind::ExternalShunt => "shunt",
            ProviderKind::ExternalGeneric => "generic",
        }
    }

    /// Look up a provider kind by its configuration name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Pins that must be assigned for this kind
    pub fn required_pins(self) -> &'static [PinRole] {
        match self {
            ProviderKind::None | ProviderKind::ExternalGeneric => &[],
            ProviderKind::SerialTtl | ProviderKind::BusDecoder => &[PinRole::Rx, PinRole::Tx],
            ProviderKind::SerialTransceiver => &[
                PinRole::Rx,
                PinRole::Tx,
                PinRole::RxEnable,
                PinRole::TxEnable,
            ],
            ProviderKind::ExternalShunt => &[PinRole::Rx],
        }
    }

    /// Whether this kind sends periodic requests
    pub fn is_polled(self) -> bool {
        matches!(self, ProviderKind::SerialTtl | ProviderKind::SerialTransceiver)
    }
}

/// Function of a battery interface pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PinRole {
    /// UART / CAN receive
    Rx,
    /// UART / CAN transmit
    Tx,
    /// Transceiver receive enable (active low)
    RxEnable,
    /// Transceiver transmit enable
    TxEnable,
}

impl PinRole {
    pub fn name(self) -> &'static str {
        match self {
            PinRole::Rx => "rx",
            PinRole::Tx => "tx",
            PinRole::RxEnable => "rx_enable",
            PinRole::TxEnable => "tx_enable",
        }
    }
}

/// Pin assignment for the battery interface
///
/// Unassigned pins are `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PinMapping {
    pub rx: Option<u8>,
    pub tx: Option<u8>,
    pub rx_enable: Option<u8>,
    pub tx_enable: Option<u8>,
}

impl PinMapping {
    /// Pin assigned to `role`
    pub fn get(&self, role: PinRole) -> Option<u8> {
        match role {
            PinRole::Rx => self.rx,
            PinRole::Tx => self.tx,
            PinRole::RxEnable => self.rx_enable,
            PinRole::TxEnable => self.tx_enable,
        }
    }

    /// Assign (or clear) the pin for `role`
    pub fn set(&mut self, role: PinRole, pin: Option<u8>) {
        match role {
            PinRole::Rx => self.rx = pin,
            PinRole::Tx => self.tx = pin,
            PinRole::RxEnable => self.rx_enable = pin,
            PinRole::TxEnable => self.tx_enable = pin,
        }
    }

    /// Pin assigned to `role`, or the matching error
    pub fn require(&self, role: PinRole) -> Result<u8, ConfigError> {
        self.get(role).ok_or(ConfigError::MissingPin(role))
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// A pin required by the provider kind is unassigned
    MissingPin(PinRole),
    /// The same pin is assigned to two roles
    DuplicatePin(u8),
    /// Poll interval must be at least one second
    InvalidPollInterval,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingPin(role) => write!(f, "missing {} pin", role.name()),
            ConfigError::DuplicatePin(pin) => write!(f, "pin {} assigned twice", pin),
            ConfigError::InvalidPollInterval => write!(f, "poll interval must be at least 1 s"),
        }
    }
}

/// Battery configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BatteryConfig {
    /// Battery support enabled
    pub enabled: bool,
    /// Selected data source
    pub provider: ProviderKind,
    /// Seconds between requests (polled providers only)
    pub poll_interval_s: u8,
    /// Log every received frame
    pub verbose_logging: bool,
    /// Interface pins
    pub pins: PinMapping,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: ProviderKind::None,
            poll_interval_s: DEFAULT_POLL_INTERVAL_S,
            verbose_logging: false,
            pins: PinMapping::default(),
        }
    }
}

impl BatteryConfig {
    /// Poll interval in milliseconds
    pub fn poll_interval_ms(&self) -> u32 {
        self.poll_interval_s as u32 * 1000
    }

    /// Check that the configuration can drive `self.provider`
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_for(self.provider)
    }

    /// Check that the configuration can drive `kind`
    pub fn validate_for(&self, kind: ProviderKind) -> Result<(), ConfigError> {
        if kind.is_polled() && self.poll_interval_s == 0 {
            return Err(ConfigError::InvalidPollInterval);
        }

        let roles = kind.required_pins();
        for (i, &role) in roles.iter().enumerate() {
            let pin = self.pins.require(role)?;
            let duplicate = roles[..i]
                .iter()
                .any(|&other| self.pins.get(other) == Some(pin));
            if duplicate {
                return Err(ConfigError::DuplicatePin(pin));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transceiver_pins() -> PinMapping {
        PinMapping {
            rx: Some(16),
            tx: Some(17),
            rx_enable: Some(4),
            tx_enable: Some(5),
        }
    }

    #[test]
    fn test_defaults() {
        let config = BatteryConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.provider, ProviderKind::None);
        assert_eq!(config.poll_interval_ms(), 5000);
        assert!(!config.verbose_logging);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_provider_names_roundtrip() {
        for kind in ProviderKind::ALL {
            assert_eq!(ProviderKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ProviderKind::from_name("victron"), None);
    }

    #[test]
    fn test_ttl_requires_rx_and_tx() {
        let mut config = BatteryConfig {
            provider: ProviderKind::SerialTtl,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::MissingPin(PinRole::Rx)));

        config.pins.rx = Some(16);
        assert_eq!(config.validate(), Err(ConfigError::MissingPin(PinRole::Tx)));

        config.pins.tx = Some(17);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_transceiver_requires_enable_pins() {
        let mut config = BatteryConfig {
            provider: ProviderKind::SerialTransceiver,
            pins: transceiver_pins(),
            ..Default::default()
        };
        assert_eq!(config.validate(), Ok(()));

        config.pins.tx_enable = None;
        assert_eq!(
            config.validate(),
            Err(ConfigError::MissingPin(PinRole::TxEnable))
        );
    }

    #[test]
    fn test_duplicate_pin_rejected() {
        let mut pins = transceiver_pins();
        pins.tx_enable = Some(4);
        let config = BatteryConfig {
            provider: ProviderKind::SerialTransceiver,
            pins,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::DuplicatePin(4)));
    }

    #[test]
    fn test_unused_pins_ignored() {
        // the shunt only needs rx; tx colliding with rx does not matter
        let config = BatteryConfig {
            provider: ProviderKind::ExternalShunt,
            pins: PinMapping {
                rx: Some(3),
                tx: Some(3),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_zero_poll_interval() {
        let config = BatteryConfig {
            provider: ProviderKind::SerialTtl,
            poll_interval_s: 0,
            pins: transceiver_pins(),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidPollInterval));

        // not polled, interval irrelevant
        assert_eq!(config.validate_for(ProviderKind::BusDecoder), Ok(()));
    }
}
