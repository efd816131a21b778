//! Externally supplied decoders
//!
//! Some battery monitors (e.g. a VE.Direct shunt) are handled by pre-built
//! libraries. Those only need to hand over their latest reading; everything
//! else (freshness, snapshots, lifecycle) is handled by the provider.

/// Which externally supplied protocol a board should construct
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ExternalKind {
    /// Serial battery shunt (receive only)
    Shunt,
    /// Any other board-provided decoder
    Generic,
}

/// One reading from an external decoder
///
/// Fields the device did not report are `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ExternalReading {
    /// Pack voltage in mV
    pub voltage_mv: Option<u32>,
    /// Pack current in mA (positive = charging)
    pub current_ma: Option<i32>,
    /// State of charge in ‰
    pub state_of_charge_permille: Option<u16>,
    /// Temperature in 0.1°C
    pub temperature_x10: Option<i16>,
    /// Consumed charge in mAh
    pub consumed_mah: Option<i32>,
    /// Time to go in minutes
    pub time_to_go_min: Option<u16>,
    /// Device alarm active
    pub alarm: Option<bool>,
}

/// Decoder living in an external library
pub trait ExternalDecoder {
    /// Service the decoder (read bytes, parse frames)
    fn poll(&mut self, now_ms: u32);

    /// Latest complete reading, if any arrived since the previous call
    fn reading(&mut self) -> Option<ExternalReading>;

    /// Manufacturer name to report
    fn manufacturer(&self) -> &'static str;
}
