//! Pylontech CAN protocol
//!
//! The BMS broadcasts six fixed-layout messages on a 500 kbit/s bus. Each
//! message is decoded on its own; nothing is accumulated across messages.
//! Integers are little endian.
//!
//! | Id    | Content                                                   |
//! |-------|-----------------------------------------------------------|
//! | 0x351 | charge voltage limit, charge/discharge current limit      |
//! | 0x355 | state of charge, state of health                          |
//! | 0x356 | pack voltage, current, temperature                        |
//! | 0x359 | alarm and warning bit fields                              |
//! | 0x35C | charge status bit field                                   |
//! | 0x35E | manufacturer name                                         |

use crate::datapoints::{self, DataPointContainer, Value, ValueKind};

/// Bus bitrate used by the BMS
pub const BITRATE: u32 = 500_000;

pub const ID_LIMITS: u16 = 0x351;
pub const ID_STATE: u16 = 0x355;
pub const ID_MEASUREMENTS: u16 = 0x356;
pub const ID_ALARMS: u16 = 0x359;
pub const ID_CHARGE_STATUS: u16 = 0x35C;
pub const ID_MANUFACTURER: u16 = 0x35E;

/// Pylontech data point label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Label {
    ChargeVoltage,
    ChargeCurrentLimitation,
    DischargeCurrentLimitation,
    StateOfCharge,
    StateOfHealth,
    Voltage,
    Current,
    Temperature,
    AlarmOverCurrentDischarge,
    AlarmUnderTemperature,
    AlarmOverTemperature,
    AlarmUnderVoltage,
    AlarmOverVoltage,
    AlarmBmsInternal,
    AlarmOverCurrentCharge,
    WarningHighCurrentDischarge,
    WarningLowTemperature,
    WarningHighTemperature,
    WarningLowVoltage,
    WarningHighVoltage,
    WarningBmsInternal,
    WarningHighCurrentCharge,
    ChargeEnabled,
    DischargeEnabled,
    ChargeImmediately,
    Manufacturer,
}

impl datapoints::Label for Label {
    fn kind(self) -> ValueKind {
        match self {
            Label::ChargeVoltage | Label::StateOfCharge | Label::StateOfHealth => ValueKind::U16,
            Label::ChargeCurrentLimitation
            | Label::DischargeCurrentLimitation
            | Label::Voltage
            | Label::Current
            | Label::Temperature => ValueKind::I16,
            Label::Manufacturer => ValueKind::Text,
            _ => ValueKind::Bool,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Label::ChargeVoltage => "chargeVoltage",
            Label::ChargeCurrentLimitation => "chargeCurrentLimitation",
            Label::DischargeCurrentLimitation => "dischargeCurrentLimitation",
            Label::StateOfCharge => "stateOfCharge",
            Label::StateOfHealth => "stateOfHealth",
            Label::Voltage => "voltage",
            Label::Current => "current",
            Label::Temperature => "temperature",
            Label::AlarmOverCurrentDischarge => "alarmOverCurrentDischarge",
            Label::AlarmUnderTemperature => "alarmUnderTemperature",
            Label::AlarmOverTemperature => "alarmOverTemperature",
            Label::AlarmUnderVoltage => "alarmUnderVoltage",
            Label::AlarmOverVoltage => "alarmOverVoltage",
            Label::AlarmBmsInternal => "alarmBmsInternal",
            Label::AlarmOverCurrentCharge => "alarmOverCurrentCharge",
            Label::WarningHighCurrentDischarge => "warningHighCurrentDischarge",
            Label::WarningLowTemperature => "warningLowTemperature",
            Label::WarningHighTemperature => "warningHighTemperature",
            Label::WarningLowVoltage => "warningLowVoltage",
            Label::WarningHighVoltage => "warningHighVoltage",
            Label::WarningBmsInternal => "warningBmsInternal",
            Label::WarningHighCurrentCharge => "warningHighCurrentCharge",
            Label::ChargeEnabled => "chargeEnabled",
            Label::DischargeEnabled => "dischargeEnabled",
            Label::ChargeImmediately => "chargeImmediately",
            Label::Manufacturer => "manufacturer",
        }
    }

    fn unit(self) -> &'static str {
        match self {
            Label::ChargeVoltage | Label::Voltage => "V",
            Label::ChargeCurrentLimitation | Label::DischargeCurrentLimitation | Label::Current => {
                "A"
            }
            Label::StateOfCharge | Label::StateOfHealth => "%",
            Label::Temperature => "°C",
            _ => "",
        }
    }

    fn scale(self) -> f32 {
        match self {
            Label::Voltage => 0.01,
            Label::ChargeVoltage
            | Label::ChargeCurrentLimitation
            | Label::DischargeCurrentLimitation
            | Label::Current
            | Label::Temperature => 0.1,
            _ => 1.0,
        }
    }

    fn precision(self) -> u8 {
        match self {
            Label::Voltage => 2,
            Label::ChargeVoltage
            | Label::ChargeCurrentLimitation
            | Label::DischargeCurrentLimitation
            | Label::Current
            | Label::Temperature => 1,
            _ => 0,
        }
    }
}

/// Capacity of a Pylontech data point container
pub const MAX_DATA_POINTS: usize = 32;

/// Data points decoded from one or more messages
pub type DataPoints = DataPointContainer<Label, MAX_DATA_POINTS>;

/// (byte, bit, label) positions within the 0x359 alarm message
const ALARM_BITS: [(usize, u8, Label); 14] = [
    (0, 7, Label::AlarmOverCurrentDischarge),
    (0, 4, Label::AlarmUnderTemperature),
    (0, 3, Label::AlarmOverTemperature),
    (0, 2, Label::AlarmUnderVoltage),
    (0, 1, Label::AlarmOverVoltage),
    (1, 3, Label::AlarmBmsInternal),
    (1, 0, Label::AlarmOverCurrentCharge),
    (2, 7, Label::WarningHighCurrentDischarge),
    (2, 4, Label::WarningLowTemperature),
    (2, 3, Label::WarningHighTemperature),
    (2, 2, Label::WarningLowVoltage),
    (2, 1, Label::WarningHighVoltage),
    (3, 3, Label::WarningBmsInternal),
    (3, 0, Label::WarningHighCurrentCharge),
];

/// (bit, label) positions within the 0x35C charge status byte
const CHARGE_STATUS_BITS: [(u8, Label); 3] = [
    (7, Label::ChargeEnabled),
    (6, Label::DischargeEnabled),
    (5, Label::ChargeImmediately),
];

fn read_u16(data: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([data[at], data[at + 1]])
}

fn read_i16(data: &[u8], at: usize) -> i16 {
    i16::from_le_bytes([data[at], data[at + 1]])
}

fn bit(byte: u8, bit: u8) -> bool {
    byte & (1 << bit) != 0
}

/// Minimum payload length for a known identifier
pub fn required_len(id: u16) -> Option<usize> {
    match id {
        ID_LIMITS | ID_MEASUREMENTS => Some(6),
        ID_STATE | ID_ALARMS => Some(4),
        ID_CHARGE_STATUS | ID_MANUFACTURER => Some(1),
        _ => None,
    }
}

/// Decode one message
///
/// Returns `None` for unknown identifiers, payloads shorter than the
/// identifier's layout and empty manufacturer names. Callers must not
/// update any freshness timestamp in that case.
pub fn decode(id: u16, data: &[u8], now_ms: u32) -> Option<DataPoints> {
    if data.len() < required_len(id)? {
        return None;
    }

    let mut points = DataPoints::new();
    let mut add = |label: Label, value: Value| {
        // labels are unique per message and value kinds match
        let _ = points.add(label, value, now_ms);
    };

    match id {
        ID_LIMITS => {
            add(Label::ChargeVoltage, Value::U16(read_u16(data, 0)));
            add(Label::ChargeCurrentLimitation, Value::I16(read_i16(data, 2)));
            add(Label::DischargeCurrentLimitation, Value::I16(read_i16(data, 4)));
        }
        ID_STATE => {
            add(Label::StateOfCharge, Value::U16(read_u16(data, 0)));
            add(Label::StateOfHealth, Value::U16(read_u16(data, 2)));
        }
        ID_MEASUREMENTS => {
            add(Label::Voltage, Value::I16(read_i16(data, 0)));
            add(Label::Current, Value::I16(read_i16(data, 2)));
            add(Label::Temperature, Value::I16(read_i16(data, 4)));
        }
        ID_ALARMS => {
            for (byte, index, label) in ALARM_BITS {
                add(label, Value::Bool(bit(data[byte], index)));
            }
        }
        ID_CHARGE_STATUS => {
            for (index, label) in CHARGE_STATUS_BITS {
                add(label, Value::Bool(bit(data[0], index)));
            }
        }
        ID_MANUFACTURER => {
            let name = data.split(|&b| b == 0).next().unwrap_or(&[]);
            let name = core::str::from_utf8(name).ok()?.trim();
            if name.is_empty() {
                return None;
            }
            add(Label::Manufacturer, Value::text(name));
        }
        _ => return None,
    }

    Some(points)
}
