//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section and every field has a default, so a partial file (or an empty one) is valid.
//! Values that would make unit conversions silently wrong are rejected at load time.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{ElevatorError, Result};
use crate::limits::DisplacementLimits;
use crate::mechanics::MechanicalConstants;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub robot: RobotConfig,
    #[serde(default)]
    pub mechanical: MechanicalConfig,
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub motors: MotorsConfig,
    #[serde(default)]
    pub sim: SimConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which backend drives the elevator.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RobotMode {
    /// Physical motor controllers.
    Real,
    /// Physics simulation.
    #[default]
    Sim,
    /// Recorded telemetry played back.
    Replay,
}

/// How the follower motor tracks the lead motor.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FollowerMode {
    /// The follower controller follows the lead over the bus.
    #[default]
    Hardware,
    /// Every command sent to the lead is repeated to the follower.
    Mirrored,
}

/// Control loop configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RobotConfig {
    #[serde(default)]
    pub mode: RobotMode,

    #[serde(default = "default_loop_period_ms")]
    pub loop_period_ms: u64,

    #[serde(default = "default_demo_setpoints_m")]
    pub demo_setpoints_m: Vec<f64>,

    #[serde(default = "default_demo_hold_ms")]
    pub demo_hold_ms: u64,
}

/// Sprocket and gearing
#[derive(Debug, Deserialize, Clone)]
pub struct MechanicalConfig {
    #[serde(default = "default_sprocket_radius_m")]
    pub sprocket_radius_m: f64,

    #[serde(default = "default_gear_reduction")]
    pub gear_reduction: f64,
}

/// Travel limits and position-loop gains
#[derive(Debug, Deserialize, Clone)]
pub struct ControlConfig {
    #[serde(default = "default_min_displacement_m")]
    pub min_displacement_m: f64,

    #[serde(default = "default_max_displacement_m")]
    pub max_displacement_m: f64,

    #[serde(default)]
    pub gains: ControlGains,
}

/// Slot-0 gains, in motor units (volts per rotation of error, etc.)
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct ControlGains {
    #[serde(default = "default_kp")]
    pub kp: f64,
    #[serde(default)]
    pub ki: f64,
    #[serde(default)]
    pub kd: f64,
    #[serde(default = "default_ks")]
    pub ks: f64,
    #[serde(default = "default_kv")]
    pub kv: f64,
    #[serde(default)]
    pub ka: f64,
    #[serde(default = "default_kg")]
    pub kg: f64,
}

/// Motor controller configuration
#[derive(Debug, Deserialize, Clone)]
pub struct MotorsConfig {
    #[serde(default = "default_can_bus")]
    pub can_bus: String,

    #[serde(default = "default_lead_id")]
    pub lead_id: u8,

    #[serde(default = "default_follower_id")]
    pub follower_id: u8,

    #[serde(default)]
    pub follower_opposes_lead: bool,

    #[serde(default)]
    pub follower_mode: FollowerMode,

    /// Clockwise-positive when true.
    #[serde(default)]
    pub inverted: bool,

    #[serde(default = "default_supply_current_limit_a")]
    pub supply_current_limit_a: f64,

    #[serde(default = "default_signal_timeout_ms")]
    pub signal_timeout_ms: u64,
}

/// Simulated mechanism
#[derive(Debug, Deserialize, Clone)]
pub struct SimConfig {
    #[serde(default = "default_carriage_mass_kg")]
    pub carriage_mass_kg: f64,

    #[serde(default = "default_min_height_m")]
    pub min_height_m: f64,

    #[serde(default = "default_max_height_m")]
    pub max_height_m: f64,

    #[serde(default = "default_starting_height_m")]
    pub starting_height_m: f64,

    #[serde(default = "default_simulate_gravity")]
    pub simulate_gravity: bool,
}

/// Telemetry configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default = "default_telemetry_enabled")]
    pub enabled: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,

    /// File or directory of recorded frames, used in replay mode.
    #[serde(default)]
    pub replay_path: String,
}

/// Diagnostic log output
#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    /// Directory for daily-rolling log files. Empty disables file logging.
    #[serde(default)]
    pub file_log_dir: String,
}

// Default value functions
fn default_loop_period_ms() -> u64 { 20 }
fn default_demo_setpoints_m() -> Vec<f64> { vec![0.3, 0.9, 0.5, 0.1] }
fn default_demo_hold_ms() -> u64 { 2000 }

fn default_sprocket_radius_m() -> f64 { 0.0254 }
fn default_gear_reduction() -> f64 { 12.0 }

fn default_min_displacement_m() -> f64 { 0.0127 }
fn default_max_displacement_m() -> f64 { 1.3208 }

fn default_kp() -> f64 { 4.0 }
fn default_ks() -> f64 { 0.05 }
fn default_kv() -> f64 { 0.12 }
fn default_kg() -> f64 { 0.15 }

fn default_can_bus() -> String { "canBus".to_string() }
fn default_lead_id() -> u8 { 1 }
fn default_follower_id() -> u8 { 2 }
fn default_supply_current_limit_a() -> f64 { 40.0 }
fn default_signal_timeout_ms() -> u64 { 100 }

fn default_carriage_mass_kg() -> f64 { 8.0 }
fn default_min_height_m() -> f64 { 0.0 }
fn default_max_height_m() -> f64 { 1.35 }
fn default_starting_height_m() -> f64 { 0.0 }
fn default_simulate_gravity() -> bool { true }

fn default_telemetry_enabled() -> bool { true }
fn default_log_dir() -> String { "./logs".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            mode: RobotMode::default(),
            loop_period_ms: default_loop_period_ms(),
            demo_setpoints_m: default_demo_setpoints_m(),
            demo_hold_ms: default_demo_hold_ms(),
        }
    }
}

impl Default for MechanicalConfig {
    fn default() -> Self {
        Self {
            sprocket_radius_m: default_sprocket_radius_m(),
            gear_reduction: default_gear_reduction(),
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            min_displacement_m: default_min_displacement_m(),
            max_displacement_m: default_max_displacement_m(),
            gains: ControlGains::default(),
        }
    }
}

impl Default for ControlGains {
    fn default() -> Self {
        Self {
            kp: default_kp(),
            ki: 0.0,
            kd: 0.0,
            ks: default_ks(),
            kv: default_kv(),
            ka: 0.0,
            kg: default_kg(),
        }
    }
}

impl Default for MotorsConfig {
    fn default() -> Self {
        Self {
            can_bus: default_can_bus(),
            lead_id: default_lead_id(),
            follower_id: default_follower_id(),
            follower_opposes_lead: false,
            follower_mode: FollowerMode::default(),
            inverted: false,
            supply_current_limit_a: default_supply_current_limit_a(),
            signal_timeout_ms: default_signal_timeout_ms(),
        }
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            carriage_mass_kg: default_carriage_mass_kg(),
            min_height_m: default_min_height_m(),
            max_height_m: default_max_height_m(),
            starting_height_m: default_starting_height_m(),
            simulate_gravity: default_simulate_gravity(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: default_telemetry_enabled(),
            log_dir: default_log_dir(),
            max_records_per_file: default_max_records_per_file(),
            max_files_to_keep: default_max_files_to_keep(),
            replay_path: String::new(),
        }
    }
}

fn invalid(message: impl std::fmt::Display) -> ElevatorError {
    ElevatorError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use elevator_io::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Sprocket/reduction transform described by `[mechanical]`
    ///
    /// # Errors
    ///
    /// Returns `InvalidMechanism` for zero, negative or non-finite values.
    pub fn mechanics(&self) -> Result<MechanicalConstants> {
        MechanicalConstants::new(self.mechanical.sprocket_radius_m, self.mechanical.gear_reduction)
    }

    /// Soft travel limits described by `[control]`
    pub fn limits(&self) -> Result<DisplacementLimits> {
        DisplacementLimits::new(self.control.min_displacement_m, self.control.max_displacement_m)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        // Mechanism and limits must be constructible
        self.mechanics()?;
        self.limits()?;

        if self.robot.loop_period_ms == 0 || self.robot.loop_period_ms > 1000 {
            return Err(invalid("loop_period_ms must be between 1 and 1000"));
        }

        if self.robot.demo_hold_ms == 0 {
            return Err(invalid("demo_hold_ms must be greater than 0"));
        }

        if self.robot.demo_setpoints_m.iter().any(|s| !s.is_finite()) {
            return Err(invalid("demo_setpoints_m must all be finite"));
        }

        for (name, value) in [
            ("kp", self.control.gains.kp),
            ("ki", self.control.gains.ki),
            ("kd", self.control.gains.kd),
            ("ks", self.control.gains.ks),
            ("kv", self.control.gains.kv),
            ("ka", self.control.gains.ka),
            ("kg", self.control.gains.kg),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(format!("{} must be a finite, non-negative number", name)));
            }
        }

        if self.motors.can_bus.is_empty() {
            return Err(invalid("can_bus cannot be empty"));
        }

        if self.motors.lead_id == self.motors.follower_id {
            return Err(invalid("lead_id and follower_id must differ"));
        }

        let current_limit = self.motors.supply_current_limit_a;
        if !(current_limit > 0.0 && current_limit <= 120.0) {
            return Err(invalid("supply_current_limit_a must be between 0 and 120"));
        }

        if self.motors.signal_timeout_ms == 0 || self.motors.signal_timeout_ms > 10000 {
            return Err(invalid("signal_timeout_ms must be between 1 and 10000"));
        }

        // Simulation
        if !(self.sim.carriage_mass_kg.is_finite() && self.sim.carriage_mass_kg > 0.0) {
            return Err(invalid("carriage_mass_kg must be greater than 0"));
        }

        if !(self.sim.min_height_m.is_finite() && self.sim.max_height_m.is_finite())
            || self.sim.min_height_m >= self.sim.max_height_m
        {
            return Err(invalid("sim min_height_m must be less than max_height_m"));
        }

        if self.sim.starting_height_m < self.sim.min_height_m
            || self.sim.starting_height_m > self.sim.max_height_m
        {
            return Err(invalid("starting_height_m must be within sim height range"));
        }

        // Telemetry
        if self.telemetry.enabled && self.telemetry.log_dir.is_empty() {
            return Err(invalid("telemetry log_dir cannot be empty when enabled"));
        }

        if self.telemetry.max_records_per_file == 0 {
            return Err(invalid("max_records_per_file must be greater than 0"));
        }

        if self.telemetry.max_files_to_keep == 0 {
            return Err(invalid("max_files_to_keep must be greater than 0"));
        }

        if self.robot.mode == RobotMode::Replay && self.telemetry.replay_path.is_empty() {
            return Err(invalid("replay_path is required in replay mode"));
        }

        Ok(())
    }
}
