//! Battery stats snapshots
//!
//! A [`StatsSnapshot`] is what reporting layers see of the active provider:
//! a few common fields plus the provider's telemetry registry. Providers hand
//! snapshots out as `Rc<StatsSnapshot>` and update them copy-on-write, so a
//! reader keeps an unchanged view for as long as it holds its `Rc`.

use heapless::String;

use battlink_protocol::datapoints::{DataPoint, Label, Value};
use battlink_protocol::jkbms::{self, set_bits, ALARM_BITS, STATUS_BITS};
use battlink_protocol::pylontech;

use crate::provider::external;

/// Maximum manufacturer name length
pub const MAX_MANUFACTURER_LEN: usize = 32;

/// Manufacturer reported before the provider learned one
pub const UNKNOWN_MANUFACTURER: &str = "unknown";

/// Provider-specific telemetry
#[derive(Debug, Clone, PartialEq)]
pub enum Telemetry {
    /// No provider active
    Empty,
    JkBms(jkbms::DataPoints),
    Pylontech(pylontech::DataPoints),
    External(external::DataPoints),
}

/// Presentation value of a field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    /// Numeric value already scaled to the field's unit
    Number(f32),
    Bool(bool),
    Text(&'a str),
    Cells(&'a [(u8, u16)]),
}

/// One telemetry field prepared for reporting
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldView<'a> {
    /// Stable field name
    pub name: &'static str,
    pub value: FieldValue<'a>,
    /// Physical unit of `value`
    pub unit: &'static str,
    /// Number of decimals worth displaying
    pub precision: u8,
    /// Milliseconds since the field was decoded
    pub age_ms: u32,
}

impl<'a> FieldView<'a> {
    fn from_point<L: Label>(point: &'a DataPoint<L>, now_ms: u32) -> Self {
        let label = point.label();
        let value = match point.value() {
            Value::Bool(b) => FieldValue::Bool(*b),
            Value::Text(text) => FieldValue::Text(text.as_str()),
            Value::Cells(cells) => FieldValue::Cells(cells.as_slice()),
            _ => FieldValue::Number(point.scaled().unwrap_or_default()),
        };
        Self {
            name: label.name(),
            value,
            unit: label.unit(),
            precision: label.precision(),
            age_ms: point.age_ms(now_ms),
        }
    }
}

/// Immutable view of the battery state
#[derive(Debug, Clone, PartialEq)]
pub struct StatsSnapshot {
    manufacturer: String<MAX_MANUFACTURER_LEN>,
    state_of_charge: Option<u8>,
    state_of_charge_updated_ms: Option<u32>,
    last_update_ms: Option<u32>,
    telemetry: Telemetry,
}

impl Default for StatsSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

impl StatsSnapshot {
    /// Create a snapshot with no data yet
    pub fn new(telemetry: Telemetry) -> Self {
        let mut snapshot = Self {
            manufacturer: String::new(),
            state_of_charge: None,
            state_of_charge_updated_ms: None,
            last_update_ms: None,
            telemetry,
        };
        snapshot.set_manufacturer(UNKNOWN_MANUFACTURER);
        snapshot
    }

    /// Snapshot reported while no provider is active
    pub fn empty() -> Self {
        Self::new(Telemetry::Empty)
    }

    pub fn manufacturer(&self) -> &str {
        &self.manufacturer
    }

    /// State of charge in %
    pub fn state_of_charge(&self) -> Option<u8> {
        self.state_of_charge
    }

    /// Milliseconds since the state of charge was last updated
    pub fn state_of_charge_age_ms(&self, now_ms: u32) -> Option<u32> {
        self.state_of_charge_updated_ms
            .map(|at| now_ms.wrapping_sub(at))
    }

    /// Time of the most recent update of any field
    pub fn last_update_ms(&self) -> Option<u32> {
        self.last_update_ms
    }

    /// Milliseconds since the most recent update of any field
    pub fn age_ms(&self, now_ms: u32) -> Option<u32> {
        self.last_update_ms.map(|at| now_ms.wrapping_sub(at))
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    /// Call `visit` for every field present in the telemetry
    pub fn for_each_field<'a, F>(&'a self, now_ms: u32, mut visit: F)
    where
        F: FnMut(FieldView<'a>),
    {
        match &self.telemetry {
            Telemetry::Empty => {}
            Telemetry::JkBms(points) => {
                points
                    .iter()
                    .for_each(|p| visit(FieldView::from_point(p, now_ms)));
            }
            Telemetry::Pylontech(points) => {
                points
                    .iter()
                    .for_each(|p| visit(FieldView::from_point(p, now_ms)));
            }
            Telemetry::External(points) => {
                points
                    .iter()
                    .for_each(|p| visit(FieldView::from_point(p, now_ms)));
            }
        }
    }

    fn jk_bitmask(&self, label: jkbms::Label) -> u16 {
        match &self.telemetry {
            Telemetry::JkBms(points) => points.get_as::<u16>(label).unwrap_or(0),
            _ => 0,
        }
    }

    /// Names of the active alarm bits reported by a JK BMS
    pub fn active_alarms(&self) -> impl Iterator<Item = &'static str> {
        set_bits(self.jk_bitmask(jkbms::Label::AlarmsBitmask), &ALARM_BITS)
    }

    /// Names of the active status bits reported by a JK BMS
    pub fn active_status(&self) -> impl Iterator<Item = &'static str> {
        set_bits(self.jk_bitmask(jkbms::Label::StatusBitmask), &STATUS_BITS)
    }

    /// Replace the manufacturer, truncating to [`MAX_MANUFACTURER_LEN`] bytes
    pub(crate) fn set_manufacturer(&mut self, name: &str) {
        self.manufacturer.clear();
        for c in name.chars() {
            if self.manufacturer.push(c).is_err() {
                break;
            }
        }
    }

    pub(crate) fn set_state_of_charge(&mut self, percent: u8, timestamp_ms: u32) {
        self.state_of_charge = Some(percent);
        self.state_of_charge_updated_ms = Some(timestamp_ms);
    }

    pub(crate) fn set_last_update(&mut self, timestamp_ms: u32) {
        self.last_update_ms = Some(timestamp_ms);
    }

    pub(crate) fn telemetry_mut(&mut self) -> &mut Telemetry {
        &mut self.telemetry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::rc::Rc;

    fn jk_snapshot() -> StatsSnapshot {
        let mut points = jkbms::DataPoints::new();
        points
            .add(jkbms::Label::BatteryVoltageMilliVolt, Value::U32(52_340), 1_000)
            .unwrap();
        points
            .add(jkbms::Label::BatteryChargeEnabled, Value::Bool(true), 1_500)
            .unwrap();
        points
            .add(jkbms::Label::AlarmsBitmask, Value::U16(0b0100_0001), 1_500)
            .unwrap();
        let mut snapshot = StatsSnapshot::new(Telemetry::JkBms(points));
        snapshot.set_last_update(1_500);
        snapshot
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = StatsSnapshot::empty();
        assert_eq!(snapshot.manufacturer(), UNKNOWN_MANUFACTURER);
        assert_eq!(snapshot.state_of_charge(), None);
        assert_eq!(snapshot.age_ms(5_000), None);

        let mut count = 0;
        snapshot.for_each_field(0, |_| count += 1);
        assert_eq!(count, 0);
    }

    #[test]
    fn test_field_views() {
        let snapshot = jk_snapshot();
        let mut fields = std::vec::Vec::new();
        snapshot.for_each_field(2_000, |f| {
            fields.push((f.name, f.value, f.unit, f.precision, f.age_ms))
        });

        let voltage = fields.iter().find(|f| f.0 == "batteryVoltage").unwrap();
        match voltage.1 {
            FieldValue::Number(v) => assert!((v - 52.34).abs() < 0.001),
            other => panic!("unexpected value {:?}", other),
        }
        assert_eq!(voltage.2, "V");
        assert_eq!(voltage.3, 2);
        assert_eq!(voltage.4, 1_000);

        let charge = fields
            .iter()
            .find(|f| f.0 == "batteryChargeEnabled")
            .unwrap();
        assert_eq!(charge.1, FieldValue::Bool(true));
        assert_eq!(charge.4, 500);
    }

    #[test]
    fn test_active_alarms() {
        let snapshot = jk_snapshot();
        let alarms: std::vec::Vec<_> = snapshot.active_alarms().collect();
        assert_eq!(alarms, ["lowCapacity", "dischargeOvercurrent"]);
        assert_eq!(snapshot.active_status().count(), 0);
        assert_eq!(StatsSnapshot::empty().active_alarms().count(), 0);
    }

    #[test]
    fn test_manufacturer_truncated() {
        let mut snapshot = StatsSnapshot::empty();
        snapshot.set_manufacturer("0123456789012345678901234567890123456789");
        assert_eq!(snapshot.manufacturer().len(), MAX_MANUFACTURER_LEN);
    }

    #[test]
    fn test_copy_on_write_isolates_readers() {
        let mut shared = Rc::new(jk_snapshot());
        let reader = Rc::clone(&shared);

        let snapshot = Rc::make_mut(&mut shared);
        snapshot.set_state_of_charge(80, 3_000);
        snapshot.set_last_update(3_000);

        assert_eq!(reader.state_of_charge(), None);
        assert_eq!(reader.last_update_ms(), Some(1_500));
        assert_eq!(shared.state_of_charge(), Some(80));
        assert_eq!(shared.state_of_charge_age_ms(3_500), Some(500));
    }
}
