//! Payload record decoding
//!
//! The payload is a sequence of records: one identifier byte followed by a
//! value whose width depends on the identifier. Multi-byte integers are big
//! endian. Decoding stops at the first unknown identifier or truncated
//! record; everything decoded up to that point is kept.

use super::labels::Label;
use crate::datapoints::{CellTable, DataPointContainer, Text, Value, MAX_TEXT_LEN};

/// Capacity of a decoded data point container
pub const MAX_DATA_POINTS: usize = 64;

/// Data points decoded from one frame
pub type DataPoints = DataPointContainer<Label, MAX_DATA_POINTS>;

/// Cursor over the payload bytes
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(len)?;
        let slice = self.bytes.get(self.pos..end)?;
        self.pos = end;
        Some(slice)
    }

    fn u8(&mut self) -> Option<u8> {
        self.take(1).map(|b| b[0])
    }

    fn u16(&mut self) -> Option<u16> {
        self.take(2).map(|b| u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Option<u32> {
        self.take(4).map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn bool(&mut self) -> Option<bool> {
        self.u8().map(|b| b != 0)
    }

    fn temperature(&mut self) -> Option<i16> {
        self.u16().map(decode_temperature)
    }

    fn text(&mut self, len: usize) -> Option<Text> {
        self.take(len).map(decode_text)
    }
}

/// Temperatures above 100 encode negative values offset by 100
pub fn decode_temperature(raw: u16) -> i16 {
    if raw <= 100 {
        raw as i16
    } else {
        let magnitude = (raw as i32 - 100).min(i16::MAX as i32);
        -(magnitude as i16)
    }
}

/// Decode the 16-bit current field into mA (positive = charging)
///
/// Returns `None` when the protocol version is unknown.
pub fn decode_current(raw: u16, protocol_version: Option<u8>) -> Option<i32> {
    match protocol_version {
        Some(0) => Some((10_000 - raw as i32) * 10),
        Some(1) => {
            let magnitude = (raw & 0x7FFF) as i32 * 10;
            if raw & 0x8000 != 0 {
                Some(magnitude)
            } else {
                Some(-magnitude)
            }
        }
        _ => None,
    }
}

fn decode_text(bytes: &[u8]) -> Text {
    let mut text = Text::new();
    for &byte in bytes.iter().take_while(|&&b| b != 0).take(MAX_TEXT_LEN) {
        let c = if byte.is_ascii_graphic() || byte == b' ' {
            byte as char
        } else {
            '?'
        };
        // bounded by MAX_TEXT_LEN above
        let _ = text.push(c);
    }
    while text.ends_with(' ') {
        text.pop();
    }
    text
}

fn text_len(label: Label) -> usize {
    match label {
        Label::ModificationPassword => 10,
        Label::EquipmentId => 8,
        Label::DateOfManufacturing => 4,
        Label::BmsSoftwareVersion => 15,
        Label::ProductId => 24,
        _ => 0,
    }
}

/// Decode the value following `label`
///
/// The outer `None` marks a truncated record. `Some(None)` means the record
/// was consumed but yields no data point.
fn read_value(label: Label, reader: &mut Reader<'_>, protocol_version: Option<u8>) -> Option<Option<Value>> {
    let value = match label {
        Label::CellsMilliVolt => {
            let len = reader.u8()? as usize;
            let bytes = reader.take(len)?;
            let mut cells = CellTable::new();
            for cell in bytes.chunks_exact(3) {
                if cells.push((cell[0], u16::from_be_bytes([cell[1], cell[2]]))).is_err() {
                    break;
                }
            }
            Value::Cells(cells)
        }

        Label::BmsTempCelsius
        | Label::BatteryTempOneCelsius
        | Label::BatteryTempTwoCelsius
        | Label::ChargeLowTempThresholdCelsius
        | Label::ChargeLowTempRecoveryCelsius
        | Label::DischargeLowTempThresholdCelsius
        | Label::DischargeLowTempRecoveryCelsius => Value::I16(reader.temperature()?),

        Label::BatteryVoltageMilliVolt
        | Label::TotalOvervoltageThresholdMilliVolt
        | Label::TotalUndervoltageThresholdMilliVolt => Value::U32(reader.u16()? as u32 * 10),

        Label::BatteryCurrentMilliAmps => {
            let raw = reader.u16()?;
            return Some(decode_current(raw, protocol_version).map(Value::I32));
        }

        Label::BatterySoCPercent
        | Label::BatteryTemperatureSensorAmount
        | Label::CellAmountSetting
        | Label::BmsAddress
        | Label::BatteryType
        | Label::LowCapacityAlarmThresholdPercent
        | Label::ProtocolVersion => Value::U8(reader.u8()?),

        Label::BatteryCycleCapacity
        | Label::BatteryCapacitySettingAmpHours
        | Label::BmsHourMeterMinutes
        | Label::ActualBatteryCapacityAmpHours => Value::U32(reader.u32()?),

        Label::BalancingEnabled
        | Label::BatteryChargeEnabled
        | Label::BatteryDischargeEnabled
        | Label::DedicatedChargerSwitch
        | Label::CurrentCalibration => Value::Bool(reader.bool()?),

        Label::ModificationPassword
        | Label::EquipmentId
        | Label::DateOfManufacturing
        | Label::BmsSoftwareVersion
        | Label::ProductId => Value::Text(reader.text(text_len(label))?),

        // remaining labels are plain 16-bit registers
        _ => Value::U16(reader.u16()?),
    };
    Some(Some(value))
}

/// Decode all records of a payload
///
/// `protocol_version` is the version reported by a previous frame; the
/// current record is skipped while it is unknown.
pub fn decode(payload: &[u8], protocol_version: Option<u8>, now_ms: u32) -> DataPoints {
    let mut points = DataPoints::new();
    let mut reader = Reader::new(payload);

    while !reader.is_empty() {
        let Some(id) = reader.u8() else { break };
        let Some(label) = Label::from_record_id(id) else {
            break;
        };
        let Some(value) = read_value(label, &mut reader, protocol_version) else {
            break;
        };
        if let Some(value) = value {
            // labels are unique and below capacity, values match their kind
            let _ = points.add(label, value, now_ms);
        }
    }

    points
}
