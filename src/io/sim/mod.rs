//! # Simulation Backend
//!
//! [`ElevatorIo`] over a physics model of the carriage, for running the control loop off-robot.
//!
//! Each refresh advances the model by one loop period in fixed substeps. Position targets are
//! tracked by a PID loop on lead-motor rotations with the same gravity and static-friction
//! feedforward the motor controllers would apply, clamped to the battery voltage.
//!
//! Both motors share the one carriage, so they always report the same voltage and current. Read
//! failures can be injected per motor to exercise disconnect handling.

pub mod physics;
pub mod pid;

use std::time::Duration;

use tracing::{debug, info, warn};

use self::physics::{DcMotor, ElevatorPhysics};
use self::pid::Pid;
use super::inputs::ElevatorInputs;
use super::motor::MotorSignals;
use super::{ElevatorIo, IdleMode};
use crate::config::{Config, ControlGains, SimConfig};
use crate::error::Result;
use crate::mechanics::{
    clamp_voltage, voltage_to_power, MechanicalConstants, MAX_VOLTAGE, MIN_VOLTAGE,
};

/// Physics substep (s)
pub const SUBSTEP: f64 = 0.001;

/// Position error (rot) below which static-friction feedforward is withheld.
const STATIC_DEADBAND: f64 = 0.05;

/// Which motor a simulated fault applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorSide {
    Lead,
    Follower,
}

/// What the simulated controllers are currently doing.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Request {
    Voltage(f64),
    /// Target lead-motor position (rot)
    Position(f64),
}

/// Simulated elevator with two Kraken X60 motors.
#[derive(Debug)]
pub struct ElevatorIoSim {
    physics: ElevatorPhysics,
    mechanics: MechanicalConstants,
    gains: ControlGains,
    pid: Pid,
    request: Request,
    applied_voltage: f64,
    period: f64,
    target_displacement: f64,
    idle_mode: IdleMode,
    lead: MotorSignals,
    lead_read_fails: bool,
    follower_read_fails: bool,
}

impl ElevatorIoSim {
    /// # Errors
    ///
    /// Returns `InvalidMechanism` if the simulated carriage is not physically meaningful.
    pub fn new(
        mechanics: MechanicalConstants,
        gains: ControlGains,
        sim: &SimConfig,
        period: Duration,
    ) -> Result<Self> {
        let physics = ElevatorPhysics::new(DcMotor::kraken_x60(2), mechanics, sim)?;
        let pid = Pid::new(gains.kp, gains.ki, gains.kd)
            .with_output_limits(MIN_VOLTAGE, MAX_VOLTAGE)
            .with_integral_limits(MIN_VOLTAGE, MAX_VOLTAGE);

        info!(
            "Elevator sim ready ({:.1} kg carriage, {:.3}-{:.3} m travel, starting at {:.3} m)",
            sim.carriage_mass_kg, sim.min_height_m, sim.max_height_m, sim.starting_height_m
        );

        let mut io = Self {
            physics,
            mechanics,
            gains,
            pid,
            request: Request::Voltage(0.0),
            applied_voltage: 0.0,
            period: period.as_secs_f64(),
            target_displacement: 0.0,
            idle_mode: IdleMode::Brake,
            lead: MotorSignals::default(),
            lead_read_fails: false,
            follower_read_fails: false,
        };
        io.lead = io.sample();
        Ok(io)
    }

    /// Builds the simulator described by the `[sim]`, `[mechanical]` and `[control]` sections.
    ///
    /// # Errors
    ///
    /// Returns `InvalidMechanism` for bad mechanical or simulation values.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.mechanics()?,
            config.control.gains,
            &config.sim,
            Duration::from_millis(config.robot.loop_period_ms),
        )
    }

    #[must_use]
    pub fn physics(&self) -> &ElevatorPhysics {
        &self.physics
    }

    /// Makes signal reads from one motor fail (or succeed again).
    pub fn inject_read_failure(&mut self, side: MotorSide, failing: bool) {
        match side {
            MotorSide::Lead => self.lead_read_fails = failing,
            MotorSide::Follower => self.follower_read_fails = failing,
        }
        let state = if failing { "injected" } else { "cleared" };
        warn!("Simulated {:?} motor read failure {}", side, state);
    }

    /// Advances the model by `dt` seconds.
    pub fn step(&mut self, dt: f64) {
        if !(dt > 0.0) {
            return;
        }
        let substeps = (dt / SUBSTEP).ceil().max(1.0) as usize;
        let h = dt / substeps as f64;
        for _ in 0..substeps {
            self.applied_voltage = self.controller_output(h);
            self.physics.advance(self.applied_voltage, self.idle_mode, h);
        }
    }

    fn controller_output(&mut self, dt: f64) -> f64 {
        match self.request {
            Request::Voltage(volts) => volts,
            Request::Position(target) => {
                let position =
                    self.mechanics.displacement_to_motor_rotations(self.physics.position());
                let error = target - position;
                let static_friction = if error.abs() > STATIC_DEADBAND {
                    self.gains.ks * error.signum()
                } else {
                    0.0
                };
                let feedback = self.pid.update(target, position, dt);
                clamp_voltage(feedback + self.gains.kg + static_friction)
            }
        }
    }

    /// Signals either motor would report right now.
    fn sample(&self) -> MotorSignals {
        let volts = self.applied_voltage;
        let stator_per_motor = self.physics.current() / self.physics.motor().count as f64;
        MotorSignals {
            position: self.mechanics.displacement_to_motor_rotations(self.physics.position()),
            velocity: self.mechanics.linear_velocity_to_motor_velocity(self.physics.velocity()),
            output_voltage: volts,
            supply_current: stator_per_motor * volts / MAX_VOLTAGE,
        }
    }
}

impl ElevatorIo for ElevatorIoSim {
    fn mechanics(&self) -> MechanicalConstants {
        self.mechanics
    }

    fn update_inputs(&mut self, inputs: &mut ElevatorInputs) {
        self.step(self.period);
        let signals = self.sample();

        inputs.elevator_target_displacement = self.target_displacement;

        inputs.is_lead_motor_connected = !self.lead_read_fails;
        if !self.lead_read_fails {
            self.lead = signals;
            inputs.elevator_displacement =
                self.mechanics.motor_rotations_to_displacement(signals.position);
            inputs.lead_motor_velocity = signals.velocity;
            inputs.lead_motor_output_voltage = signals.output_voltage;
            inputs.lead_motor_supply_current = signals.supply_current;
        }

        inputs.is_follower_motor_connected = !self.follower_read_fails;
        if !self.follower_read_fails {
            inputs.follower_motor_output_voltage = signals.output_voltage;
            inputs.follower_motor_supply_current = signals.supply_current;
        }
    }

    fn set_voltage(&mut self, volts: f64) {
        self.request = Request::Voltage(clamp_voltage(volts));
        self.pid.reset();
    }

    fn set_target_displacement(&mut self, meters: f64) {
        if !meters.is_finite() {
            warn!("Simulated elevator ignores non-finite target ({} m)", meters);
            return;
        }
        self.target_displacement = meters;
        if !matches!(self.request, Request::Position(_)) {
            self.pid.reset();
        }
        self.request = Request::Position(self.mechanics.displacement_to_motor_rotations(meters));
    }

    fn motor_position(&self) -> f64 {
        self.lead.position
    }

    fn motor_velocity(&self) -> f64 {
        self.lead.velocity
    }

    fn motor_power(&self) -> f64 {
        voltage_to_power(self.lead.output_voltage)
    }

    fn coast_motors(&mut self) {
        self.idle_mode = IdleMode::Coast;
        debug!("Simulated elevator motors set to Coast");
    }

    fn brake_motors(&mut self) {
        self.idle_mode = IdleMode::Brake;
        debug!("Simulated elevator motors set to Brake");
    }

    fn idle_mode(&self) -> IdleMode {
        self.idle_mode
    }
}
