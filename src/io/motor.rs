//! Trait abstraction for a single motor controller, to enable testing and alternate drivers.
//!
//! The concrete driver (bus protocol, device firmware) lives outside this crate. It only has to
//! report signals, accept voltage and position requests, follow another controller and switch
//! neutral mode.

use thiserror::Error;

use super::IdleMode;
use crate::config::{Config, ControlGains};
use crate::error::{ElevatorError, Result};

/// Signals sampled from one controller, in motor units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotorSignals {
    /// Rotor position (rot)
    pub position: f64,
    /// Rotor velocity (rot/s)
    pub velocity: f64,
    /// Voltage applied to the windings (V)
    pub output_voltage: f64,
    /// Current drawn from the supply (A)
    pub supply_current: f64,
}

/// Errors reported by a motor controller driver
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MotorError {
    /// No fresh signal within the configured timeout
    #[error("signal read timed out")]
    Timeout,

    /// The controller refused a request
    #[error("request rejected: {0}")]
    Rejected(String),
}

/// Settings applied to a controller once, at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct MotorConfig {
    pub neutral_mode: IdleMode,
    /// Clockwise-positive when true.
    pub inverted: bool,
    pub supply_current_limit: f64,
    pub gains: ControlGains,
    /// Staleness bound on signal reads
    pub signal_timeout_ms: u64,
}

impl MotorConfig {
    /// Controller settings for the elevator motors described by `config`.
    pub fn from_config(config: &Config) -> Self {
        Self {
            neutral_mode: IdleMode::Brake,
            inverted: config.motors.inverted,
            supply_current_limit: config.motors.supply_current_limit_a,
            gains: config.control.gains,
            signal_timeout_ms: config.motors.signal_timeout_ms,
        }
    }
}

impl Default for MotorConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Trait for motor controller operations
#[cfg_attr(test, mockall::automock)]
pub trait MotorController: Send {
    /// Bus identifier of the device
    fn device_id(&self) -> u8;

    /// Clear sticky faults and apply `config`
    fn apply_config(&mut self, config: &MotorConfig) -> std::result::Result<(), MotorError>;

    /// Sample the latest signals
    fn read_signals(&mut self) -> std::result::Result<MotorSignals, MotorError>;

    /// Open-loop voltage request
    fn set_voltage(&mut self, volts: f64) -> std::result::Result<(), MotorError>;

    /// On-board closed-loop position request (rot)
    fn set_position(&mut self, rotations: f64) -> std::result::Result<(), MotorError>;

    /// Slave this controller to `leader_id`
    fn follow(&mut self, leader_id: u8, oppose_leader: bool) -> std::result::Result<(), MotorError>;

    /// Switch neutral behavior
    fn set_idle_mode(&mut self, mode: IdleMode) -> std::result::Result<(), MotorError>;
}

/// Turns a controller failure during construction into a fatal error.
pub(crate) fn require(which: &str, result: std::result::Result<(), MotorError>) -> Result<()> {
    result.map_err(|e| {
        ElevatorError::Actuator(format!("{} motor configuration failed: {}", which, e))
    })
}
