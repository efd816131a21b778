//! Record identifiers
//!
//! Each record in a frame payload starts with a one-byte identifier. The
//! identifier doubles as the data point label.

use crate::datapoints::{self, ValueKind};

macro_rules! labels {
    ($($name:ident = $id:literal, $kind:ident, $field:literal, $unit:literal, $scale:literal, $precision:literal;)+) => {
        /// Record identifier / data point label
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[cfg_attr(feature = "defmt", derive(defmt::Format))]
        #[repr(u8)]
        pub enum Label {
            $($name = $id,)+
        }

        impl Label {
            /// Every label, in identifier order
            pub const ALL: &'static [Label] = &[$(Label::$name,)+];

            /// Look up the label for a record identifier
            pub fn from_record_id(id: u8) -> Option<Self> {
                match id {
                    $($id => Some(Label::$name),)+
                    _ => None,
                }
            }

            /// Record identifier on the wire
            pub fn record_id(self) -> u8 {
                self as u8
            }
        }

        impl datapoints::Label for Label {
            fn kind(self) -> ValueKind {
                match self {
                    $(Label::$name => ValueKind::$kind,)+
                }
            }

            fn name(self) -> &'static str {
                match self {
                    $(Label::$name => $field,)+
                }
            }

            fn unit(self) -> &'static str {
                match self {
                    $(Label::$name => $unit,)+
                }
            }

            fn scale(self) -> f32 {
                match self {
                    $(Label::$name => $scale,)+
                }
            }

            fn precision(self) -> u8 {
                match self {
                    $(Label::$name => $precision,)+
                }
            }
        }
    };
}

labels! {
    CellsMilliVolt = 0x79, Cells, "cellsMilliVolt", "mV", 1.0, 0;
    BmsTempCelsius = 0x80, I16, "bmsTemp", "°C", 1.0, 0;
    BatteryTempOneCelsius = 0x81, I16, "batteryTempOne", "°C", 1.0, 0;
    BatteryTempTwoCelsius = 0x82, I16, "batteryTempTwo", "°C", 1.0, 0;
    BatteryVoltageMilliVolt = 0x83, U32, "batteryVoltage", "V", 0.001, 2;
    BatteryCurrentMilliAmps = 0x84, I32, "batteryCurrent", "A", 0.001, 2;
    BatterySoCPercent = 0x85, U8, "batterySoC", "%", 1.0, 0;
    BatteryTemperatureSensorAmount = 0x86, U8, "batteryTemperatureSensorAmount", "", 1.0, 0;
    BatteryCycles = 0x87, U16, "batteryCycles", "", 1.0, 0;
    BatteryCycleCapacity = 0x89, U32, "batteryCycleCapacity", "Ah", 1.0, 0;
    BatteryCellAmount = 0x8A, U16, "batteryCellAmount", "", 1.0, 0;
    AlarmsBitmask = 0x8B, U16, "alarmsBitmask", "", 1.0, 0;
    StatusBitmask = 0x8C, U16, "statusBitmask", "", 1.0, 0;
    TotalOvervoltageThresholdMilliVolt = 0x8E, U32, "totalOvervoltageThreshold", "V", 0.001, 2;
    TotalUndervoltageThresholdMilliVolt = 0x8F, U32, "totalUndervoltageThreshold", "V", 0.001, 2;
    CellOvervoltageThresholdMilliVolt = 0x90, U16, "cellOvervoltageThreshold", "V", 0.001, 3;
    CellOvervoltageRecoveryMilliVolt = 0x91, U16, "cellOvervoltageRecovery", "V", 0.001, 3;
    CellOvervoltageProtectionDelaySeconds = 0x92, U16, "cellOvervoltageProtectionDelay", "s", 1.0, 0;
    CellUndervoltageThresholdMilliVolt = 0x93, U16, "cellUndervoltageThreshold", "V", 0.001, 3;
    CellUndervoltageRecoveryMilliVolt = 0x94, U16, "cellUndervoltageRecovery", "V", 0.001, 3;
    CellUndervoltageProtectionDelaySeconds = 0x95, U16, "cellUndervoltageProtectionDelay", "s", 1.0, 0;
    CellVoltageDiffThresholdMilliVolt = 0x96, U16, "cellVoltageDiffThreshold", "mV", 1.0, 0;
    DischargeOvercurrentThresholdAmperes = 0x97, U16, "dischargeOvercurrentThreshold", "A", 1.0, 0;
    DischargeOvercurrentDelaySeconds = 0x98, U16, "dischargeOvercurrentDelay", "s", 1.0, 0;
    ChargeOvercurrentThresholdAmps = 0x99, U16, "chargeOvercurrentThreshold", "A", 1.0, 0;
    ChargeOvercurrentDelaySeconds = 0x9A, U16, "chargeOvercurrentDelay", "s", 1.0, 0;
    BalanceCellVoltageThresholdMilliVolt = 0x9B, U16, "balanceCellVoltageThreshold", "V", 0.001, 3;
    BalanceVoltageDiffThresholdMilliVolt = 0x9C, U16, "balanceVoltageDiffThreshold", "mV", 1.0, 0;
    BalancingEnabled = 0x9D, Bool, "balancingEnabled", "", 1.0, 0;
    BmsTempProtectionThresholdCelsius = 0x9E, U16, "bmsTempProtectionThreshold", "°C", 1.0, 0;
    BmsTempRecoveryThresholdCelsius = 0x9F, U16, "bmsTempRecoveryThreshold", "°C", 1.0, 0;
    BatteryTempProtectionThresholdCelsius = 0xA0, U16, "batteryTempProtectionThreshold", "°C", 1.0, 0;
    BatteryTempRecoveryThresholdCelsius = 0xA1, U16, "batteryTempRecoveryThreshold", "°C", 1.0, 0;
    BatteryTempDiffThresholdCelsius = 0xA2, U16, "batteryTempDiffThreshold", "°C", 1.0, 0;
    ChargeHighTempThresholdCelsius = 0xA3, U16, "chargeHighTempThreshold", "°C", 1.0, 0;
    DischargeHighTempThresholdCelsius = 0xA4, U16, "dischargeHighTempThreshold", "°C", 1.0, 0;
    ChargeLowTempThresholdCelsius = 0xA5, I16, "chargeLowTempThreshold", "°C", 1.0, 0;
    ChargeLowTempRecoveryCelsius = 0xA6, I16, "chargeLowTempRecovery", "°C", 1.0, 0;
    DischargeLowTempThresholdCelsius = 0xA7, I16, "dischargeLowTempThreshold", "°C", 1.0, 0;
    DischargeLowTempRecoveryCelsius = 0xA8, I16, "dischargeLowTempRecovery", "°C", 1.0, 0;
    CellAmountSetting = 0xA9, U8, "cellAmountSetting", "", 1.0, 0;
    BatteryCapacitySettingAmpHours = 0xAA, U32, "batteryCapacitySetting", "Ah", 1.0, 0;
    BatteryChargeEnabled = 0xAB, Bool, "batteryChargeEnabled", "", 1.0, 0;
    BatteryDischargeEnabled = 0xAC, Bool, "batteryDischargeEnabled", "", 1.0, 0;
    CurrentCalibrationMilliAmps = 0xAD, U16, "currentCalibration", "mA", 1.0, 0;
    BmsAddress = 0xAE, U8, "bmsAddress", "", 1.0, 0;
    BatteryType = 0xAF, U8, "batteryType", "", 1.0, 0;
    SleepWaitTime = 0xB0, U16, "sleepWaitTime", "s", 1.0, 0;
    LowCapacityAlarmThresholdPercent = 0xB1, U8, "lowCapacityAlarmThreshold", "%", 1.0, 0;
    ModificationPassword = 0xB2, Text, "modificationPassword", "", 1.0, 0;
    DedicatedChargerSwitch = 0xB3, Bool, "dedicatedChargerSwitch", "", 1.0, 0;
    EquipmentId = 0xB4, Text, "equipmentId", "", 1.0, 0;
    DateOfManufacturing = 0xB5, Text, "dateOfManufacturing", "", 1.0, 0;
    BmsHourMeterMinutes = 0xB6, U32, "bmsHourMeter", "min", 1.0, 0;
    BmsSoftwareVersion = 0xB7, Text, "bmsSoftwareVersion", "", 1.0, 0;
    CurrentCalibration = 0xB8, Bool, "currentCalibration", "", 1.0, 0;
    ActualBatteryCapacityAmpHours = 0xB9, U32, "actualBatteryCapacity", "Ah", 1.0, 0;
    ProductId = 0xBA, Text, "productId", "", 1.0, 0;
    ProtocolVersion = 0xC0, U8, "protocolVersion", "", 1.0, 0;
}

/// Bit names of [`Label::AlarmsBitmask`], least significant bit first
pub const ALARM_BITS: [&str; 14] = [
    "lowCapacity",
    "bmsOvertemperature",
    "chargingOvervoltage",
    "dischargeUndervoltage",
    "batteryOvertemperature",
    "chargingOvercurrent",
    "dischargeOvercurrent",
    "cellVoltageDifference",
    "overtemperatureAlarmInBatteryBox",
    "batteryLowTemperature",
    "cellOvervoltage",
    "cellUndervoltage",
    "309AProtection",
    "309BProtection",
];

/// Bit names of [`Label::StatusBitmask`], least significant bit first
pub const STATUS_BITS: [&str; 4] = [
    "chargingActive",
    "dischargeActive",
    "balancingActive",
    "batteryOnline",
];

/// Iterate over the names of the bits set in `mask`
pub fn set_bits(mask: u16, names: &'static [&'static str]) -> impl Iterator<Item = &'static str> {
    names
        .iter()
        .enumerate()
        .filter(move |(bit, _)| mask & (1 << bit) != 0)
        .map(|(_, name)| *name)
}
