//! Adapter for externally supplied decoders
//!
//! The decoder does its own framing and parsing; this provider only turns
//! each reading into data points and merges them into the stats snapshot.

use alloc::rc::Rc;

use battlink_hal::{Board, ExternalDecoder, ExternalKind, ExternalReading};
use battlink_protocol::datapoints::{self, DataPointContainer, Value, ValueKind};

use crate::config::{BatteryConfig, PinRole, ProviderKind};
use crate::manager::InitError;
use crate::stats::{StatsSnapshot, Telemetry};

/// Label of a value reported by an external decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Label {
    Voltage,
    Current,
    StateOfCharge,
    Temperature,
    ConsumedAmpHours,
    TimeToGo,
    Alarm,
}

impl datapoints::Label for Label {
    fn kind(self) -> ValueKind {
        match self {
            Label::Voltage => ValueKind::U32,
            Label::Current | Label::ConsumedAmpHours => ValueKind::I32,
            Label::StateOfCharge | Label::TimeToGo => ValueKind::U16,
            Label::Temperature => ValueKind::I16,
            Label::Alarm => ValueKind::Bool,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Label::Voltage => "voltage",
            Label::Current => "current",
            Label::StateOfCharge => "stateOfCharge",
            Label::Temperature => "temperature",
            Label::ConsumedAmpHours => "consumedAmpHours",
            Label::TimeToGo => "timeToGo",
            Label::Alarm => "alarm",
        }
    }

    fn unit(self) -> &'static str {
        match self {
            Label::Voltage => "V",
            Label::Current => "A",
            Label::StateOfCharge => "%",
            Label::Temperature => "°C",
            Label::ConsumedAmpHours => "Ah",
            Label::TimeToGo => "min",
            Label::Alarm => "",
        }
    }

    fn scale(self) -> f32 {
        match self {
            Label::Voltage | Label::Current | Label::ConsumedAmpHours => 0.001,
            Label::StateOfCharge | Label::Temperature => 0.1,
            _ => 1.0,
        }
    }

    fn precision(self) -> u8 {
        match self {
            Label::Voltage | Label::Current | Label::ConsumedAmpHours => 2,
            Label::StateOfCharge | Label::Temperature => 1,
            _ => 0,
        }
    }
}

/// Data points of one external reading
pub type DataPoints = DataPointContainer<Label, 8>;

/// Convert a reading into data points stamped with `now_ms`
pub fn data_points(reading: &ExternalReading, now_ms: u32) -> DataPoints {
    let mut points = DataPoints::new();
    let fields = [
        (Label::Voltage, reading.voltage_mv.map(Value::U32)),
        (Label::Current, reading.current_ma.map(Value::I32)),
        (
            Label::StateOfCharge,
            reading.state_of_charge_permille.map(Value::U16),
        ),
        (Label::Temperature, reading.temperature_x10.map(Value::I16)),
        (Label::ConsumedAmpHours, reading.consumed_mah.map(Value::I32)),
        (Label::TimeToGo, reading.time_to_go_min.map(Value::U16)),
        (Label::Alarm, reading.alarm.map(Value::Bool)),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            // kinds match the label table and there are fewer fields than slots
            let _ = points.add(label, value, now_ms);
        }
    }
    points
}

/// Provider driving an externally supplied decoder
pub struct ExternalProvider<E> {
    decoder: E,
    kind: ProviderKind,
    verbose: bool,
    stats: Rc<StatsSnapshot>,
}

impl<E: ExternalDecoder> ExternalProvider<E> {
    /// Wrap an already constructed decoder
    pub fn new(decoder: E, kind: ProviderKind, verbose: bool) -> Self {
        let mut stats = StatsSnapshot::new(Telemetry::External(DataPoints::new()));
        stats.set_manufacturer(decoder.manufacturer());
        Self {
            decoder,
            kind,
            verbose,
            stats: Rc::new(stats),
        }
    }

    /// Ask the board for the decoder matching `kind`
    pub fn init<B>(board: &mut B, kind: ProviderKind, config: &BatteryConfig) -> Result<Self, InitError>
    where
        B: Board<External = E>,
    {
        config.validate_for(kind)?;

        let external_kind = match kind {
            ProviderKind::ExternalShunt => ExternalKind::Shunt,
            _ => ExternalKind::Generic,
        };
        let rx = config.pins.get(PinRole::Rx);
        let tx = config.pins.get(PinRole::Tx);
        info!("[External] Initialize {}", kind.name());

        let decoder = board.claim_external(external_kind, rx, tx)?;
        Ok(Self::new(decoder, kind, config.verbose_logging))
    }

    /// Hand the decoder back to the board
    pub fn deinit<B>(self, board: &mut B)
    where
        B: Board<External = E>,
    {
        board.release_external(self.decoder);
        info!("[External] Deinitialized");
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    /// Service the decoder and merge its latest reading
    pub fn poll(&mut self, now_ms: u32) {
        self.decoder.poll(now_ms);

        let Some(reading) = self.decoder.reading() else {
            return;
        };
        let points = data_points(&reading, now_ms);
        if points.is_empty() {
            return;
        }
        if self.verbose {
            debug!("[External] reading with {} fields", points.len());
        }

        let stats = Rc::make_mut(&mut self.stats);
        if let Some(permille) = reading.state_of_charge_permille {
            let percent = u8::try_from(permille / 10).unwrap_or(u8::MAX);
            stats.set_state_of_charge(percent, now_ms);
        }
        if let Telemetry::External(registry) = stats.telemetry_mut() {
            // same container type on both sides, capacity always suffices
            let _ = registry.update_from(&points);
        }
        stats.set_last_update(now_ms);
    }

    pub fn stats(&self) -> Rc<StatsSnapshot> {
        Rc::clone(&self.stats)
    }

    pub fn decoder(&self) -> &E {
        &self.decoder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::vec::Vec;

    struct FakeShunt {
        queued: Vec<ExternalReading>,
        polls: u32,
    }

    impl ExternalDecoder for FakeShunt {
        fn poll(&mut self, _now_ms: u32) {
            self.polls += 1;
        }

        fn reading(&mut self) -> Option<ExternalReading> {
            if self.queued.is_empty() {
                None
            } else {
                Some(self.queued.remove(0))
            }
        }

        fn manufacturer(&self) -> &'static str {
            "Victron"
        }
    }

    fn provider(queued: Vec<ExternalReading>) -> ExternalProvider<FakeShunt> {
        let shunt = FakeShunt { queued, polls: 0 };
        ExternalProvider::new(shunt, ProviderKind::ExternalShunt, false)
    }

    #[test]
    fn test_only_reported_fields_become_points() {
        let reading = ExternalReading {
            voltage_mv: Some(26_450),
            alarm: Some(false),
            ..Default::default()
        };
        let points = data_points(&reading, 40);
        assert_eq!(points.len(), 2);
        assert_eq!(points.get_as::<u32>(Label::Voltage), Some(26_450));
        assert_eq!(points.get_as::<bool>(Label::Alarm), Some(false));
        assert!(!points.contains(Label::Current));
    }

    #[test]
    fn test_manufacturer_from_decoder() {
        let provider = provider(Vec::new());
        assert_eq!(provider.stats().manufacturer(), "Victron");
        assert_eq!(provider.stats().last_update_ms(), None);
    }

    #[test]
    fn test_poll_merges_readings() {
        let first = ExternalReading {
            voltage_mv: Some(26_450),
            state_of_charge_permille: Some(873),
            ..Default::default()
        };
        let second = ExternalReading {
            current_ma: Some(-1_500),
            ..Default::default()
        };
        let mut provider = provider(std::vec![first, second]);

        provider.poll(100);
        let before = provider.stats();
        assert_eq!(before.state_of_charge(), Some(87));

        provider.poll(200);
        provider.poll(300);
        assert_eq!(provider.decoder().polls, 3);

        let stats = provider.stats();
        assert_eq!(stats.last_update_ms(), Some(200));
        assert_eq!(stats.state_of_charge_age_ms(300), Some(200));
        match stats.telemetry() {
            Telemetry::External(points) => {
                assert_eq!(points.get_with_timestamp(Label::Voltage).map(|(_, t)| t), Some(100));
                assert_eq!(points.get_as::<i32>(Label::Current), Some(-1_500));
            }
            other => panic!("unexpected telemetry {:?}", other),
        }

        // the earlier snapshot is unchanged
        assert_eq!(before.last_update_ms(), Some(100));
    }

    #[test]
    fn test_scaled_state_of_charge() {
        let reading = ExternalReading {
            state_of_charge_permille: Some(873),
            temperature_x10: Some(-55),
            ..Default::default()
        };
        let points = data_points(&reading, 0);
        let soc = points.get_scaled(Label::StateOfCharge).unwrap();
        assert!((soc - 87.3).abs() < 0.01);
        let temperature = points.get_scaled(Label::Temperature).unwrap();
        assert!((temperature + 5.5).abs() < 0.01);
    }
}
