//! Configuration types
//!
//! Battery configuration, its validation and a minimal TOML reader.

pub mod parse;
pub mod types;

pub use parse::{parse_config, ParseError};
pub use types::*;

#[cfg(all(test, feature = "serde"))]
mod tests {
    use super::*;

    #[test]
    fn test_postcard_roundtrip() {
        let config = BatteryConfig {
            enabled: true,
            provider: ProviderKind::SerialTtl,
            poll_interval_s: 3,
            verbose_logging: false,
            pins: PinMapping {
                rx: Some(16),
                tx: Some(17),
                ..Default::default()
            },
        };
        let bytes = postcard::to_allocvec(&config).unwrap();
        let decoded: BatteryConfig = postcard::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, config);
    }
}
