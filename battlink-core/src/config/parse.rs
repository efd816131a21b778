//! Simple TOML parser for battery configuration
//!
//! This is a minimal TOML parser that handles only the subset needed for the
//! battery settings. It does NOT support the full TOML spec.
//!
//! Supported features:
//! - Key = value pairs (string, integer, boolean)
//! - `[battery]` and `[battery.pins]` headers
//! - Comments (# ...)
//!
//! ```toml
//! [battery]
//! enabled = true
//! provider = "serial_transceiver"
//! poll_interval = 5
//! verbose_logging = false
//!
//! [battery.pins]
//! rx = 16
//! tx = 17
//! rx_enable = 4
//! tx_enable = 5
//! ```
//!
//! A pin value of `-1` leaves the pin unassigned.

use core::fmt;

use super::types::{BatteryConfig, PinRole, ProviderKind};

/// Parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Invalid or unknown section header
    InvalidSection,
    /// Invalid value type
    InvalidValue,
    /// Provider name not recognized
    UnknownProvider,
    /// Key not valid in its section
    UnknownKey,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::InvalidSection => write!(f, "invalid section header"),
            ParseError::InvalidValue => write!(f, "invalid value"),
            ParseError::UnknownProvider => write!(f, "unknown battery provider"),
            ParseError::UnknownKey => write!(f, "unknown key"),
        }
    }
}

/// Current parsing context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Root,
    Battery,
    Pins,
}

/// Parse TOML configuration into a [`BatteryConfig`]
///
/// Keys that are not given keep their default values. The result is not
/// validated; call [`BatteryConfig::validate`] before use.
pub fn parse_config(input: &str) -> Result<BatteryConfig, ParseError> {
    let mut config = BatteryConfig::default();
    let mut section = Section::Root;

    for line in input.lines() {
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') {
            section = parse_section_header(&line[1..line.len() - 1])?;
            continue;
        }

        let (key, value) = parse_key_value(line).ok_or(ParseError::InvalidValue)?;
        match section {
            Section::Root => return Err(ParseError::UnknownKey),
            Section::Battery => apply_battery(&mut config, key, value)?,
            Section::Pins => apply_pin(&mut config, key, value)?,
        }
    }

    Ok(config)
}

fn parse_section_header(header: &str) -> Result<Section, ParseError> {
    match header.trim() {
        "battery" => Ok(Section::Battery),
        "battery.pins" => Ok(Section::Pins),
        _ => Err(ParseError::InvalidSection),
    }
}

fn apply_battery(config: &mut BatteryConfig, key: &str, value: &str) -> Result<(), ParseError> {
    match key {
        "enabled" => config.enabled = parse_bool(value)?,
        "provider" => {
            let name = parse_string(value)?;
            config.provider = ProviderKind::from_name(name).ok_or(ParseError::UnknownProvider)?;
        }
        "poll_interval" => config.poll_interval_s = parse_int(value)?,
        "verbose_logging" => config.verbose_logging = parse_bool(value)?,
        _ => return Err(ParseError::UnknownKey),
    }
    Ok(())
}

fn apply_pin(config: &mut BatteryConfig, key: &str, value: &str) -> Result<(), ParseError> {
    let role = match key {
        "rx" => PinRole::Rx,
        "tx" => PinRole::Tx,
        "rx_enable" => PinRole::RxEnable,
        "tx_enable" => PinRole::TxEnable,
        _ => return Err(ParseError::UnknownKey),
    };
    config.pins.set(role, parse_pin(value)?);
    Ok(())
}

/// Parse "key = value", dropping trailing comments
fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let eq_pos = line.find('=')?;
    let key = line[..eq_pos].trim();
    let value = line[eq_pos + 1..].trim();

    // Remove inline comments
    let value = match value.find('#') {
        // Make sure # is not inside a string
        Some(hash_pos) if value[..hash_pos].matches('"').count() % 2 == 0 => {
            value[..hash_pos].trim()
        }
        _ => value,
    };

    if key.is_empty() || value.is_empty() {
        return None;
    }

    Some((key, value))
}

/// Parse a string value (removes quotes)
fn parse_string(value: &str) -> Result<&str, ParseError> {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        Ok(&value[1..value.len() - 1])
    } else {
        // Allow unquoted strings for simple values
        Ok(value)
    }
}

/// Parse an integer value
fn parse_int<T: core::str::FromStr>(value: &str) -> Result<T, ParseError> {
    value.parse().map_err(|_| ParseError::InvalidValue)
}

/// Parse a boolean value
fn parse_bool(value: &str) -> Result<bool, ParseError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ParseError::InvalidValue),
    }
}

/// Parse a GPIO number, `-1` meaning unassigned
fn parse_pin(value: &str) -> Result<Option<u8>, ParseError> {
    match parse_int::<i16>(value)? {
        -1 => Ok(None),
        pin => u8::try_from(pin).map(Some).map_err(|_| ParseError::InvalidValue),
    }
}
