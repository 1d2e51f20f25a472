//! One line of a telemetry file.

use std::collections::BTreeMap;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ElevatorError, Result};
use crate::io::inputs::{ElevatorInputs, LogValue};

/// Snapshot of one cycle, keyed by the stable log names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryFrame {
    /// Cycle counter since the logger was created
    pub cycle: u64,
    /// RFC 3339 wall-clock time, millisecond precision
    pub timestamp: String,
    /// Subsystem the snapshot belongs to
    pub table: String,
    pub values: BTreeMap<String, LogValue>,
    /// Unit symbol per key; empty for flags
    pub units: BTreeMap<String, String>,
}

impl TelemetryFrame {
    /// Captures every field of `inputs`, stamped with the current time.
    pub fn from_inputs(cycle: u64, table: &str, inputs: &ElevatorInputs) -> Self {
        let mut values = BTreeMap::new();
        let mut units = BTreeMap::new();
        for field in inputs.log_fields() {
            values.insert(field.key.to_string(), field.value);
            units.insert(field.key.to_string(), field.unit.symbol().to_string());
        }

        Self {
            cycle,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            table: table.to_string(),
            values,
            units,
        }
    }

    /// Verifies that every unit recorded in this frame matches what `inputs` would log today.
    ///
    /// # Errors
    ///
    /// Returns `Replay` naming the first key whose recorded unit differs.
    pub fn check_units(&self, inputs: &ElevatorInputs) -> Result<()> {
        for field in inputs.log_fields() {
            if let Some(recorded) = self.units.get(field.key) {
                if recorded != field.unit.symbol() {
                    return Err(ElevatorError::Replay(format!(
                        "cycle {}: '{}' recorded in '{}', expected '{}'",
                        self.cycle,
                        field.key,
                        recorded,
                        field.unit.symbol()
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::inputs::keys;
    use crate::mechanics::MechanicalConstants;

    fn inputs() -> ElevatorInputs {
        let mut inputs = ElevatorInputs::new(MechanicalConstants::new(0.025, 12.0).unwrap());
        inputs.elevator_displacement = 0.3;
        inputs.is_lead_motor_connected = true;
        inputs
    }

    #[test]
    fn test_frame_captures_every_field() {
        let frame = TelemetryFrame::from_inputs(7, "Elevator", &inputs());
        assert_eq!(frame.cycle, 7);
        assert_eq!(frame.table, "Elevator");
        assert_eq!(frame.values.len(), 11);
        assert_eq!(frame.units.len(), 11);
        assert_eq!(frame.values[keys::ELEVATOR_DISPLACEMENT], LogValue::Number(0.3));
        assert_eq!(frame.values[keys::IS_LEAD_MOTOR_CONNECTED], LogValue::Bool(true));
        assert_eq!(frame.units[keys::LEAD_MOTOR_VELOCITY], "rot/s");
        assert_eq!(frame.units[keys::IS_FOLLOWER_MOTOR_CONNECTED], "");
    }

    #[test]
    fn test_frame_json_shape() {
        let frame = TelemetryFrame::from_inputs(0, "Elevator", &inputs());
        let json = serde_json::to_string(&frame).unwrap();
        assert!(json.contains("\"elevatorDisplacement\":0.3"));
        assert!(json.contains("\"isLeadMotorConnected\":true"));

        let parsed: TelemetryFrame = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, frame);
    }

    #[test]
    fn test_timestamp_is_rfc3339() {
        let frame = TelemetryFrame::from_inputs(0, "Elevator", &inputs());
        assert!(chrono::DateTime::parse_from_rfc3339(&frame.timestamp).is_ok());
    }

    #[test]
    fn test_check_units_accepts_own_frame() {
        let frame = TelemetryFrame::from_inputs(0, "Elevator", &inputs());
        assert!(frame.check_units(&inputs()).is_ok());
    }

    #[test]
    fn test_check_units_rejects_mismatch() {
        let mut frame = TelemetryFrame::from_inputs(3, "Elevator", &inputs());
        frame.units.insert(keys::ELEVATOR_DISPLACEMENT.to_string(), "in".to_string());

        let err = frame.check_units(&inputs()).unwrap_err();
        assert!(err.to_string().contains("elevatorDisplacement"));
    }
}
