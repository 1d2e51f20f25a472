//! # Hardware Backend
//!
//! [`ElevatorIo`] over two physical motor controllers, a lead and a follower.
//!
//! No control logic runs here. Commands are converted to motor units and forwarded; the
//! controllers' own position loop tracks setpoints. The only arithmetic is the sprocket/reduction
//! transform between carriage meters and lead-motor rotations.
//!
//! The follower is slaved to the lead either over the bus ([`FollowerMode::Hardware`]) or by
//! repeating every lead command ([`FollowerMode::Mirrored`]). Both motors are assumed rigidly
//! coupled through the chain, so only the lead's position and velocity are reported.

use tracing::{debug, info, warn};

use super::inputs::ElevatorInputs;
use super::motor::{require, MotorConfig, MotorController, MotorError, MotorSignals};
use super::{ElevatorIo, IdleMode};
use crate::config::{Config, FollowerMode};
use crate::error::{ElevatorError, Result};
use crate::mechanics::{clamp_voltage, voltage_to_power, MechanicalConstants};

/// How the hardware backend is wired up.
#[derive(Debug, Clone, PartialEq)]
pub struct HardwareOptions {
    /// Bus both controllers sit on. Reported at startup.
    pub can_bus: String,
    /// Device ids the lead and follower drivers must answer with.
    pub lead_id: u8,
    pub follower_id: u8,
    pub motor_config: MotorConfig,
    pub follower_mode: FollowerMode,
    pub follower_opposes_lead: bool,
}

impl HardwareOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            can_bus: config.motors.can_bus.clone(),
            lead_id: config.motors.lead_id,
            follower_id: config.motors.follower_id,
            motor_config: MotorConfig::from_config(config),
            follower_mode: config.motors.follower_mode,
            follower_opposes_lead: config.motors.follower_opposes_lead,
        }
    }
}

impl Default for HardwareOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Last-known state of one controller.
#[derive(Debug, Clone, Copy, Default)]
struct MotorState {
    signals: MotorSignals,
    connected: bool,
}

impl MotorState {
    /// Reads fresh signals, keeping the previous ones on failure.
    fn refresh<M: MotorController>(&mut self, motor: &mut M, name: &str) {
        match motor.read_signals() {
            Ok(signals) => {
                if !self.connected {
                    info!("Elevator {} motor (id {}) connected", name, motor.device_id());
                }
                self.signals = signals;
                self.connected = true;
            }
            Err(e) => {
                if self.connected {
                    warn!(
                        "Elevator {} motor (id {}) lost connection: {}",
                        name,
                        motor.device_id(),
                        e
                    );
                }
                self.connected = false;
            }
        }
    }
}

/// Elevator driven by a lead and a follower motor controller.
pub struct ElevatorIoHardware<L, F> {
    lead: L,
    follower: F,
    mechanics: MechanicalConstants,
    follower_mode: FollowerMode,
    follower_sign: f64,
    target_displacement: f64,
    lead_state: MotorState,
    follower_state: MotorState,
    idle_mode: IdleMode,
}

impl<L, F> std::fmt::Debug for ElevatorIoHardware<L, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElevatorIoHardware")
            .field("follower_mode", &self.follower_mode)
            .field("idle_mode", &self.idle_mode)
            .field("target_displacement", &self.target_displacement)
            .finish_non_exhaustive()
    }
}

impl<L: MotorController, F: MotorController> ElevatorIoHardware<L, F> {
    /// Configures both controllers, slaves the follower and engages brake mode.
    ///
    /// # Errors
    ///
    /// Returns `Actuator` if a driver answers with a different device id than configured, or if
    /// either controller rejects its configuration, the follow request or the initial brake
    /// request. The elevator must not run half-configured.
    pub fn new(
        mut lead: L,
        mut follower: F,
        mechanics: MechanicalConstants,
        options: HardwareOptions,
    ) -> Result<Self> {
        check_device_id("lead", options.lead_id, lead.device_id())?;
        check_device_id("follower", options.follower_id, follower.device_id())?;

        require("lead", lead.apply_config(&options.motor_config))?;
        require("follower", follower.apply_config(&options.motor_config))?;

        if options.follower_mode == FollowerMode::Hardware {
            require(
                "follower",
                follower.follow(lead.device_id(), options.follower_opposes_lead),
            )?;
        }

        require("lead", lead.set_idle_mode(IdleMode::Brake))?;
        require("follower", follower.set_idle_mode(IdleMode::Brake))?;

        info!(
            "Elevator hardware ready on {} (lead id {}, follower id {}, {:?} follow)",
            options.can_bus,
            options.lead_id,
            options.follower_id,
            options.follower_mode
        );

        Ok(Self {
            lead,
            follower,
            mechanics,
            follower_mode: options.follower_mode,
            follower_sign: if options.follower_opposes_lead { -1.0 } else { 1.0 },
            target_displacement: 0.0,
            lead_state: MotorState::default(),
            follower_state: MotorState::default(),
            idle_mode: IdleMode::Brake,
        })
    }

    pub fn lead(&self) -> &L {
        &self.lead
    }

    pub fn follower(&self) -> &F {
        &self.follower
    }

    fn mirroring(&self) -> bool {
        self.follower_mode == FollowerMode::Mirrored
    }

    fn set_both_idle_modes(&mut self, mode: IdleMode) {
        log_failure("lead", "idle mode", self.lead.set_idle_mode(mode));
        log_failure("follower", "idle mode", self.follower.set_idle_mode(mode));
        self.idle_mode = mode;
        debug!("Elevator motors set to {:?}", mode);
    }
}

fn check_device_id(which: &str, expected: u8, actual: u8) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(ElevatorError::Actuator(format!(
            "{} motor driver has device id {}, configured id is {}",
            which, actual, expected
        )))
    }
}

fn log_failure(motor: &str, request: &str, result: std::result::Result<(), MotorError>) {
    if let Err(e) = result {
        warn!("Elevator {} motor {} request failed: {}", motor, request, e);
    }
}

impl<L: MotorController, F: MotorController> ElevatorIo for ElevatorIoHardware<L, F> {
    fn mechanics(&self) -> MechanicalConstants {
        self.mechanics
    }

    fn update_inputs(&mut self, inputs: &mut ElevatorInputs) {
        self.lead_state.refresh(&mut self.lead, "lead");
        self.follower_state.refresh(&mut self.follower, "follower");

        inputs.elevator_target_displacement = self.target_displacement;

        inputs.is_lead_motor_connected = self.lead_state.connected;
        if self.lead_state.connected {
            let lead = self.lead_state.signals;
            inputs.elevator_displacement =
                self.mechanics.motor_rotations_to_displacement(lead.position);
            inputs.lead_motor_velocity = lead.velocity;
            inputs.lead_motor_output_voltage = lead.output_voltage;
            inputs.lead_motor_supply_current = lead.supply_current;
        }

        inputs.is_follower_motor_connected = self.follower_state.connected;
        if self.follower_state.connected {
            let follower = self.follower_state.signals;
            inputs.follower_motor_output_voltage = follower.output_voltage;
            inputs.follower_motor_supply_current = follower.supply_current;
        }
    }

    fn set_voltage(&mut self, volts: f64) {
        let volts = clamp_voltage(volts);
        log_failure("lead", "voltage", self.lead.set_voltage(volts));
        if self.mirroring() {
            log_failure(
                "follower",
                "voltage",
                self.follower.set_voltage(volts * self.follower_sign),
            );
        }
    }

    fn set_target_displacement(&mut self, meters: f64) {
        self.target_displacement = meters;
        let rotations = self.mechanics.displacement_to_motor_rotations(meters);
        log_failure("lead", "position", self.lead.set_position(rotations));
        if self.mirroring() {
            log_failure(
                "follower",
                "position",
                self.follower.set_position(rotations * self.follower_sign),
            );
        }
    }

    fn motor_position(&self) -> f64 {
        self.lead_state.signals.position
    }

    fn motor_velocity(&self) -> f64 {
        self.lead_state.signals.velocity
    }

    fn motor_power(&self) -> f64 {
        voltage_to_power(self.lead_state.signals.output_voltage)
    }

    fn coast_motors(&mut self) {
        self.set_both_idle_modes(IdleMode::Coast);
    }

    fn brake_motors(&mut self) {
        self.set_both_idle_modes(IdleMode::Brake);
    }

    fn idle_mode(&self) -> IdleMode {
        self.idle_mode
    }
}
