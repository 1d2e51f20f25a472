//! # Elevator Inputs
//!
//! The per-cycle telemetry snapshot filled by an [`ElevatorIo`](super::ElevatorIo) backend.
//!
//! One instance lives for the lifetime of the subsystem and is overwritten in place every cycle.
//! History belongs to the telemetry logger, not here.
//!
//! ## Logged Fields
//!
//! | Key | Unit | Source |
//! |-----|------|--------|
//! | `elevatorDisplacement` | m | measured |
//! | `elevatorTargetDisplacement` | m | last command (echo) |
//! | `isLeadMotorConnected` | - | signal read succeeded |
//! | `leadMotorPosition` | rot | derived from `elevatorDisplacement` |
//! | `leadMotorTargetPosition` | rot | derived from `elevatorTargetDisplacement` |
//! | `leadMotorVelocity` | rot/s | measured |
//! | `leadMotorOutputVoltage` | V | measured |
//! | `leadMotorSupplyCurrent` | A | measured |
//! | `isFollowerMotorConnected` | - | signal read succeeded |
//! | `followerMotorOutputVoltage` | V | measured |
//! | `followerMotorSupplyCurrent` | A | measured |
//!
//! Key names and units are part of the log format: recorded matches are replayed against these
//! exact strings, so they must not change.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ElevatorError, Result};
use crate::mechanics::MechanicalConstants;

/// Stable log keys.
pub mod keys {
    pub const ELEVATOR_DISPLACEMENT: &str = "elevatorDisplacement";
    pub const ELEVATOR_TARGET_DISPLACEMENT: &str = "elevatorTargetDisplacement";
    pub const IS_LEAD_MOTOR_CONNECTED: &str = "isLeadMotorConnected";
    pub const LEAD_MOTOR_POSITION: &str = "leadMotorPosition";
    pub const LEAD_MOTOR_TARGET_POSITION: &str = "leadMotorTargetPosition";
    pub const LEAD_MOTOR_VELOCITY: &str = "leadMotorVelocity";
    pub const LEAD_MOTOR_OUTPUT_VOLTAGE: &str = "leadMotorOutputVoltage";
    pub const LEAD_MOTOR_SUPPLY_CURRENT: &str = "leadMotorSupplyCurrent";
    pub const IS_FOLLOWER_MOTOR_CONNECTED: &str = "isFollowerMotorConnected";
    pub const FOLLOWER_MOTOR_OUTPUT_VOLTAGE: &str = "followerMotorOutputVoltage";
    pub const FOLLOWER_MOTOR_SUPPLY_CURRENT: &str = "followerMotorSupplyCurrent";
}

/// Number of fields in one snapshot.
pub const FIELD_COUNT: usize = 11;

/// Unit attached to a logged field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    Meters,
    Rotations,
    RotationsPerSecond,
    Volts,
    Amps,
    /// Flags carry no unit.
    None,
}

impl Unit {
    /// Short symbol written next to the value in telemetry files.
    #[must_use]
    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::Meters => "m",
            Unit::Rotations => "rot",
            Unit::RotationsPerSecond => "rot/s",
            Unit::Volts => "V",
            Unit::Amps => "A",
            Unit::None => "",
        }
    }
}

/// Value of a logged field.
///
/// JSON has no encoding for NaN or infinities, so those numbers are written as the strings
/// `"NaN"`, `"inf"` and `"-inf"`. A `null` number reads back as NaN.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LogValue {
    Bool(bool),
    Number(#[serde(with = "non_finite")] f64),
}

mod non_finite {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    const NAN: &str = "NaN";
    const INFINITY: &str = "inf";
    const NEG_INFINITY: &str = "-inf";

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else if value.is_nan() {
            serializer.serialize_str(NAN)
        } else if value.is_sign_positive() {
            serializer.serialize_str(INFINITY)
        } else {
            serializer.serialize_str(NEG_INFINITY)
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Encoded {
        Number(f64),
        Text(String),
        Null(()),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Encoded::deserialize(deserializer)? {
            Encoded::Number(n) => Ok(n),
            Encoded::Null(()) => Ok(f64::NAN),
            Encoded::Text(text) => match text.as_str() {
                NAN => Ok(f64::NAN),
                INFINITY => Ok(f64::INFINITY),
                NEG_INFINITY => Ok(f64::NEG_INFINITY),
                other => Err(D::Error::custom(format!("invalid number '{}'", other))),
            },
        }
    }
}

impl LogValue {
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            LogValue::Number(n) => Some(*n),
            LogValue::Bool(_) => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            LogValue::Bool(b) => Some(*b),
            LogValue::Number(_) => None,
        }
    }
}

/// One entry of [`ElevatorInputs::log_fields`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogField {
    pub key: &'static str,
    pub value: LogValue,
    pub unit: Unit,
}

impl LogField {
    fn number(key: &'static str, value: f64, unit: Unit) -> Self {
        Self { key, value: LogValue::Number(value), unit }
    }

    fn flag(key: &'static str, value: bool) -> Self {
        Self { key, value: LogValue::Bool(value), unit: Unit::None }
    }
}

/// Telemetry snapshot of the elevator and both motors.
///
/// Lead-motor position fields are not stored: they are computed from the linear fields with the
/// mechanical constants the snapshot was created with, so they can never disagree with them.
/// The follower has no position or velocity of its own; it is rigidly coupled to the lead.
#[derive(Debug, Clone, PartialEq)]
pub struct ElevatorInputs {
    mechanics: MechanicalConstants,

    /// Measured carriage displacement (m).
    pub elevator_displacement: f64,
    /// Last commanded carriage displacement (m).
    pub elevator_target_displacement: f64,

    pub is_lead_motor_connected: bool,
    /// Lead motor velocity (rot/s).
    pub lead_motor_velocity: f64,
    /// Lead motor output voltage (V).
    pub lead_motor_output_voltage: f64,
    /// Lead motor supply current (A).
    pub lead_motor_supply_current: f64,

    pub is_follower_motor_connected: bool,
    /// Follower motor output voltage (V).
    pub follower_motor_output_voltage: f64,
    /// Follower motor supply current (A).
    pub follower_motor_supply_current: f64,
}

impl ElevatorInputs {
    /// Creates a zeroed snapshot with both motors reported disconnected.
    #[must_use]
    pub fn new(mechanics: MechanicalConstants) -> Self {
        Self {
            mechanics,
            elevator_displacement: 0.0,
            elevator_target_displacement: 0.0,
            is_lead_motor_connected: false,
            lead_motor_velocity: 0.0,
            lead_motor_output_voltage: 0.0,
            lead_motor_supply_current: 0.0,
            is_follower_motor_connected: false,
            follower_motor_output_voltage: 0.0,
            follower_motor_supply_current: 0.0,
        }
    }

    #[must_use]
    pub fn mechanics(&self) -> &MechanicalConstants {
        &self.mechanics
    }

    /// Lead motor position (rot), derived from `elevator_displacement`.
    #[must_use]
    pub fn lead_motor_position(&self) -> f64 {
        self.mechanics.displacement_to_motor_rotations(self.elevator_displacement)
    }

    /// Lead motor target position (rot), derived from `elevator_target_displacement`.
    #[must_use]
    pub fn lead_motor_target_position(&self) -> f64 {
        self.mechanics.displacement_to_motor_rotations(self.elevator_target_displacement)
    }

    /// Every field of the snapshot with its stable key and unit, in log order.
    #[must_use]
    pub fn log_fields(&self) -> [LogField; FIELD_COUNT] {
        [
            LogField::number(keys::ELEVATOR_DISPLACEMENT, self.elevator_displacement, Unit::Meters),
            LogField::number(
                keys::ELEVATOR_TARGET_DISPLACEMENT,
                self.elevator_target_displacement,
                Unit::Meters,
            ),
            LogField::flag(keys::IS_LEAD_MOTOR_CONNECTED, self.is_lead_motor_connected),
            LogField::number(
                keys::LEAD_MOTOR_POSITION,
                self.lead_motor_position(),
                Unit::Rotations,
            ),
            LogField::number(
                keys::LEAD_MOTOR_TARGET_POSITION,
                self.lead_motor_target_position(),
                Unit::Rotations,
            ),
            LogField::number(
                keys::LEAD_MOTOR_VELOCITY,
                self.lead_motor_velocity,
                Unit::RotationsPerSecond,
            ),
            LogField::number(
                keys::LEAD_MOTOR_OUTPUT_VOLTAGE,
                self.lead_motor_output_voltage,
                Unit::Volts,
            ),
            LogField::number(
                keys::LEAD_MOTOR_SUPPLY_CURRENT,
                self.lead_motor_supply_current,
                Unit::Amps,
            ),
            LogField::flag(keys::IS_FOLLOWER_MOTOR_CONNECTED, self.is_follower_motor_connected),
            LogField::number(
                keys::FOLLOWER_MOTOR_OUTPUT_VOLTAGE,
                self.follower_motor_output_voltage,
                Unit::Volts,
            ),
            LogField::number(
                keys::FOLLOWER_MOTOR_SUPPLY_CURRENT,
                self.follower_motor_supply_current,
                Unit::Amps,
            ),
        ]
    }

    /// Overwrites the stored fields from a recorded key/value map.
    ///
    /// Derived rotational keys are ignored; they are recomputed from the restored linear fields.
    ///
    /// # Errors
    ///
    /// Returns `Replay` if a stored field is missing or has the wrong type. The snapshot is left
    /// untouched in that case.
    pub fn restore_from(&mut self, values: &BTreeMap<String, LogValue>) -> Result<()> {
        let number = |key: &str| -> Result<f64> {
            values
                .get(key)
                .and_then(LogValue::as_f64)
                .ok_or_else(|| ElevatorError::Replay(format!("missing numeric field '{}'", key)))
        };
        let flag = |key: &str| -> Result<bool> {
            values
                .get(key)
                .and_then(LogValue::as_bool)
                .ok_or_else(|| ElevatorError::Replay(format!("missing boolean field '{}'", key)))
        };

        let restored = Self {
            mechanics: self.mechanics,
            elevator_displacement: number(keys::ELEVATOR_DISPLACEMENT)?,
            elevator_target_displacement: number(keys::ELEVATOR_TARGET_DISPLACEMENT)?,
            is_lead_motor_connected: flag(keys::IS_LEAD_MOTOR_CONNECTED)?,
            lead_motor_velocity: number(keys::LEAD_MOTOR_VELOCITY)?,
            lead_motor_output_voltage: number(keys::LEAD_MOTOR_OUTPUT_VOLTAGE)?,
            lead_motor_supply_current: number(keys::LEAD_MOTOR_SUPPLY_CURRENT)?,
            is_follower_motor_connected: flag(keys::IS_FOLLOWER_MOTOR_CONNECTED)?,
            follower_motor_output_voltage: number(keys::FOLLOWER_MOTOR_OUTPUT_VOLTAGE)?,
            follower_motor_supply_current: number(keys::FOLLOWER_MOTOR_SUPPLY_CURRENT)?,
        };
        *self = restored;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mechanics() -> MechanicalConstants {
        MechanicalConstants::new(0.025, 12.0).unwrap()
    }

    #[test]
    fn test_new_snapshot_is_zeroed() {
        let inputs = ElevatorInputs::new(mechanics());
        assert_eq!(inputs.elevator_displacement, 0.0);
        assert_eq!(inputs.elevator_target_displacement, 0.0);
        assert!(!inputs.is_lead_motor_connected);
        assert!(!inputs.is_follower_motor_connected);
        assert_eq!(inputs.lead_motor_position(), 0.0);
        assert_eq!(inputs.lead_motor_target_position(), 0.0);
        assert_eq!(inputs.lead_motor_output_voltage, 0.0);
        assert_eq!(inputs.follower_motor_supply_current, 0.0);
    }

    #[test]
    fn test_rotational_fields_follow_linear_fields() {
        let mut inputs = ElevatorInputs::new(mechanics());
        inputs.elevator_displacement = 0.15;
        inputs.elevator_target_displacement = 0.30;

        let m = mechanics();
        assert_eq!(inputs.lead_motor_position(), m.displacement_to_motor_rotations(0.15));
        assert!((inputs.lead_motor_target_position() - 22.918).abs() < 0.001);
    }

    #[test]
    fn test_log_fields_cover_every_key_once() {
        let inputs = ElevatorInputs::new(mechanics());
        let fields = inputs.log_fields();
        let mut names: Vec<&str> = fields.iter().map(|f| f.key).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), FIELD_COUNT);
    }

    #[test]
    fn test_log_field_units() {
        let inputs = ElevatorInputs::new(mechanics());
        for field in inputs.log_fields() {
            let expected = match field.key {
                keys::ELEVATOR_DISPLACEMENT | keys::ELEVATOR_TARGET_DISPLACEMENT => Unit::Meters,
                keys::LEAD_MOTOR_POSITION | keys::LEAD_MOTOR_TARGET_POSITION => Unit::Rotations,
                keys::LEAD_MOTOR_VELOCITY => Unit::RotationsPerSecond,
                keys::LEAD_MOTOR_OUTPUT_VOLTAGE | keys::FOLLOWER_MOTOR_OUTPUT_VOLTAGE => {
                    Unit::Volts
                }
                keys::LEAD_MOTOR_SUPPLY_CURRENT | keys::FOLLOWER_MOTOR_SUPPLY_CURRENT => Unit::Amps,
                _ => Unit::None,
            };
            assert_eq!(field.unit, expected, "unit mismatch for {}", field.key);
        }
    }

    #[test]
    fn test_unit_symbols() {
        assert_eq!(Unit::Meters.symbol(), "m");
        assert_eq!(Unit::RotationsPerSecond.symbol(), "rot/s");
        assert_eq!(Unit::None.symbol(), "");
    }

    #[test]
    fn test_restore_round_trip_through_log_fields() {
        let mut original = ElevatorInputs::new(mechanics());
        original.elevator_displacement = 0.42;
        original.elevator_target_displacement = 0.5;
        original.is_lead_motor_connected = true;
        original.lead_motor_velocity = 3.5;
        original.lead_motor_output_voltage = 4.2;
        original.lead_motor_supply_current = 11.0;
        original.is_follower_motor_connected = true;
        original.follower_motor_output_voltage = 4.1;
        original.follower_motor_supply_current = 10.5;

        let values: BTreeMap<String, LogValue> = original
            .log_fields()
            .iter()
            .map(|f| (f.key.to_string(), f.value))
            .collect();

        let mut restored = ElevatorInputs::new(mechanics());
        restored.restore_from(&values).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn test_restore_missing_field_leaves_snapshot_untouched() {
        let mut inputs = ElevatorInputs::new(mechanics());
        inputs.elevator_displacement = 0.7;

        let mut values = BTreeMap::new();
        values.insert(keys::ELEVATOR_DISPLACEMENT.to_string(), LogValue::Number(0.1));

        let result = inputs.restore_from(&values);
        assert!(matches!(result, Err(ElevatorError::Replay(_))));
        assert_eq!(inputs.elevator_displacement, 0.7);
    }

    #[test]
    fn test_non_finite_values_survive_json() {
        let values = [
            LogValue::Number(f64::INFINITY),
            LogValue::Number(f64::NEG_INFINITY),
            LogValue::Number(2.5),
            LogValue::Bool(true),
        ];
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(json, r#"["inf","-inf",2.5,true]"#);
        let decoded: Vec<LogValue> = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, values);

        let nan = serde_json::to_string(&LogValue::Number(f64::NAN)).unwrap();
        assert_eq!(nan, r#""NaN""#);
        let decoded: LogValue = serde_json::from_str(&nan).unwrap();
        assert!(decoded.as_f64().unwrap().is_nan());
    }

    #[test]
    fn test_null_number_reads_as_nan() {
        let decoded: LogValue = serde_json::from_str("null").unwrap();
        assert!(decoded.as_f64().unwrap().is_nan());
        assert!(serde_json::from_str::<LogValue>(r#""fast""#).is_err());
    }

    #[test]
    fn test_restore_rejects_wrong_type() {
        let source = ElevatorInputs::new(mechanics());
        let mut values: BTreeMap<String, LogValue> = source
            .log_fields()
            .iter()
            .map(|f| (f.key.to_string(), f.value))
            .collect();
        values.insert(keys::IS_LEAD_MOTOR_CONNECTED.to_string(), LogValue::Number(1.0));

        let mut inputs = ElevatorInputs::new(mechanics());
        assert!(inputs.restore_from(&values).is_err());
    }
}
