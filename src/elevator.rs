//! # Elevator Subsystem
//!
//! Bridge between the control loop and an [`ElevatorIo`] backend.
//!
//! All elevator policy lives here: the travel limits, the voltage clamp applied before the backend
//! sees a request, disconnection alerts and telemetry recording. The backend only receives orders.

use tracing::{error, info};

use crate::alert::{Alert, AlertLevel};
use crate::io::inputs::ElevatorInputs;
use crate::io::{ElevatorIo, IdleMode};
use crate::limits::DisplacementLimits;
use crate::mechanics::clamp_voltage;
use crate::telemetry::TelemetrySink;

/// Telemetry table elevator snapshots are recorded under.
pub const TABLE: &str = "Elevator";

/// Lead/follower elevator driven through a backend `Io`.
pub struct Elevator<Io: ElevatorIo> {
    io: Io,
    inputs: ElevatorInputs,
    limits: DisplacementLimits,
    telemetry: Option<Box<dyn TelemetrySink>>,
    telemetry_failing: bool,
    lead_disconnected: Alert,
    follower_disconnected: Alert,
}

impl<Io: ElevatorIo> Elevator<Io> {
    /// The snapshot is built with the backend's own mechanical constants.
    pub fn new(io: Io, limits: DisplacementLimits) -> Self {
        let inputs = ElevatorInputs::new(io.mechanics());
        info!(
            "Elevator limits {:.4}-{:.4} m",
            limits.minimum(),
            limits.maximum()
        );
        Self {
            io,
            inputs,
            limits,
            telemetry: None,
            telemetry_failing: false,
            lead_disconnected: Alert::new(
                "Elevator's lead motor lost connection",
                AlertLevel::Error,
            ),
            follower_disconnected: Alert::new(
                "Elevator's follower motor lost connection",
                AlertLevel::Error,
            ),
        }
    }

    /// Records every refreshed snapshot to `sink`.
    pub fn with_telemetry(mut self, sink: Box<dyn TelemetrySink>) -> Self {
        self.telemetry = Some(sink);
        self
    }

    /// Refreshes the snapshot, records it and updates the disconnection alerts.
    ///
    /// Call once per cycle, before issuing the cycle's command.
    pub fn periodic(&mut self) {
        self.io.update_inputs(&mut self.inputs);

        if let Some(sink) = self.telemetry.as_mut() {
            match sink.record(TABLE, &self.inputs) {
                Ok(()) => {
                    if self.telemetry_failing {
                        info!("Elevator telemetry recording resumed");
                        self.telemetry_failing = false;
                    }
                }
                Err(e) => {
                    if !self.telemetry_failing {
                        error!("Elevator telemetry recording failed: {}", e);
                        self.telemetry_failing = true;
                    }
                }
            }
        }

        self.lead_disconnected.set(!self.inputs.is_lead_motor_connected);
        self.follower_disconnected.set(!self.inputs.is_follower_motor_connected);
    }

    /// Open-loop voltage, clamped to the battery range. Meant for characterization.
    pub fn set_voltage(&mut self, volts: f64) {
        self.io.set_voltage(clamp_voltage(volts));
    }

    /// Carriage target (m), coerced into the travel limits.
    pub fn set_target_displacement(&mut self, meters: f64) {
        self.io.set_target_displacement(self.limits.coerce_in(meters));
    }

    pub fn stop(&mut self) {
        self.io.stop();
    }

    pub fn coast(&mut self) {
        self.io.coast_motors();
    }

    pub fn brake(&mut self) {
        self.io.brake_motors();
    }

    pub fn idle_mode(&self) -> IdleMode {
        self.io.idle_mode()
    }

    /// Lead motor position (rot)
    pub fn motor_position(&self) -> f64 {
        self.io.motor_position()
    }

    /// Lead motor velocity (rot/s)
    pub fn motor_velocity(&self) -> f64 {
        self.io.motor_velocity()
    }

    /// Lead motor output in `[-1, 1]`
    pub fn power(&self) -> f64 {
        self.io.motor_power()
    }

    /// Upward characterization may continue: the carriage is below its maximum.
    pub fn sysid_forward_allowed(&self) -> bool {
        self.inputs.elevator_displacement < self.limits.maximum()
    }

    /// Downward characterization may continue: the carriage is above its minimum.
    pub fn sysid_backward_allowed(&self) -> bool {
        self.inputs.elevator_displacement > self.limits.minimum()
    }

    pub fn inputs(&self) -> &ElevatorInputs {
        &self.inputs
    }

    pub fn limits(&self) -> &DisplacementLimits {
        &self.limits
    }

    pub fn lead_disconnected_alert(&self) -> &Alert {
        &self.lead_disconnected
    }

    pub fn follower_disconnected_alert(&self) -> &Alert {
        &self.follower_disconnected
    }

    /// Flushes buffered telemetry.
    pub fn flush_telemetry(&mut self) {
        if let Some(sink) = self.telemetry.as_mut() {
            if let Err(e) = sink.flush() {
                error!("Elevator telemetry flush failed: {}", e);
            }
        }
    }

    pub fn io(&self) -> &Io {
        &self.io
    }

    pub fn io_mut(&mut self) -> &mut Io {
        &mut self.io
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::ElevatorError;
    use crate::io::sim::{ElevatorIoSim, MotorSide};
    use crate::telemetry::MockTelemetrySink;

    fn sim_elevator() -> Elevator<ElevatorIoSim> {
        let config = Config::default();
        let io = ElevatorIoSim::from_config(&config).unwrap();
        Elevator::new(io, config.limits().unwrap())
    }

    #[test]
    fn test_target_is_coerced_into_limits() {
        let mut elevator = sim_elevator();
        elevator.set_target_displacement(5.0);
        elevator.periodic();
        assert_eq!(elevator.inputs().elevator_target_displacement, 1.3208);

        elevator.set_target_displacement(-1.0);
        elevator.periodic();
        assert_eq!(elevator.inputs().elevator_target_displacement, 0.0127);
    }

    #[test]
    fn test_target_scenario_rotations() {
        let config = Config::from_toml(
            r#"
            [mechanical]
            sprocket_radius_m = 0.025
            gear_reduction = 12.0
            "#,
        )
        .unwrap();
        let io = ElevatorIoSim::from_config(&config).unwrap();
        let mut elevator = Elevator::new(io, config.limits().unwrap());

        elevator.set_target_displacement(0.30);
        elevator.periodic();
        assert!((elevator.inputs().lead_motor_target_position() - 22.92).abs() < 0.01);
    }

    #[test]
    fn test_snapshot_uses_backend_mechanics() {
        let config = Config::from_toml(
            r#"
            [mechanical]
            sprocket_radius_m = 0.025
            gear_reduction = 12.0
            "#,
        )
        .unwrap();
        let io = ElevatorIoSim::from_config(&config).unwrap();
        let mut elevator = Elevator::new(io, Config::default().limits().unwrap());
        assert_eq!(*elevator.inputs().mechanics(), config.mechanics().unwrap());

        elevator.set_voltage(6.0);
        for _ in 0..10 {
            elevator.periodic();
        }
        assert!(elevator.motor_position() > 0.0);
        assert!((elevator.inputs().lead_motor_position() - elevator.motor_position()).abs() < 1e-9);
    }

    #[test]
    fn test_voltage_clamped_and_power_reported() {
        let mut elevator = sim_elevator();
        elevator.set_voltage(15.0);
        elevator.periodic();
        assert_eq!(elevator.inputs().lead_motor_output_voltage, 12.0);
        assert_eq!(elevator.power(), 1.0);
    }

    #[test]
    fn test_idle_mode_passthrough() {
        let mut elevator = sim_elevator();
        assert_eq!(elevator.idle_mode(), IdleMode::Brake);
        elevator.coast();
        assert_eq!(elevator.idle_mode(), IdleMode::Coast);
        elevator.brake();
        assert_eq!(elevator.idle_mode(), IdleMode::Brake);
    }

    #[test]
    fn test_stop_zeroes_output() {
        let mut elevator = sim_elevator();
        elevator.set_voltage(6.0);
        elevator.periodic();
        elevator.stop();
        elevator.periodic();
        assert_eq!(elevator.inputs().lead_motor_output_voltage, 0.0);
        assert_eq!(elevator.power(), 0.0);
    }

    #[test]
    fn test_disconnect_alerts_follow_connectivity() {
        let mut elevator = sim_elevator();
        elevator.periodic();
        assert!(!elevator.lead_disconnected_alert().is_active());

        elevator.io_mut().inject_read_failure(MotorSide::Lead, true);
        elevator.periodic();
        assert!(elevator.lead_disconnected_alert().is_active());
        assert!(!elevator.follower_disconnected_alert().is_active());

        elevator.io_mut().inject_read_failure(MotorSide::Lead, false);
        elevator.io_mut().inject_read_failure(MotorSide::Follower, true);
        elevator.periodic();
        assert!(!elevator.lead_disconnected_alert().is_active());
        assert!(elevator.follower_disconnected_alert().is_active());
    }

    #[test]
    fn test_sysid_conditions() {
        let mut elevator = sim_elevator();
        // Resting on the bottom stop, below the soft minimum
        elevator.periodic();
        assert!(elevator.sysid_forward_allowed());
        assert!(!elevator.sysid_backward_allowed());

        elevator.set_target_displacement(0.6);
        for _ in 0..100 {
            elevator.periodic();
        }
        assert!(elevator.sysid_forward_allowed());
        assert!(elevator.sysid_backward_allowed());
    }

    #[test]
    fn test_records_every_cycle() {
        let mut sink = MockTelemetrySink::new();
        sink.expect_record()
            .withf(|table, _| table.to_string() == TABLE)
            .times(3)
            .returning(|_, _| Ok(()));
        sink.expect_flush().times(1).returning(|| Ok(()));

        let mut elevator = sim_elevator().with_telemetry(Box::new(sink));
        for _ in 0..3 {
            elevator.periodic();
        }
        elevator.flush_telemetry();
    }

    #[test]
    fn test_telemetry_failure_does_not_stop_the_loop() {
        let mut sink = MockTelemetrySink::new();
        sink.expect_record()
            .times(2)
            .returning(|_, _| Err(ElevatorError::Replay("disk full".to_string())));

        let mut elevator = sim_elevator().with_telemetry(Box::new(sink));
        elevator.set_voltage(3.0);
        elevator.periodic();
        elevator.periodic();
        assert_eq!(elevator.inputs().lead_motor_output_voltage, 3.0);
    }
}
