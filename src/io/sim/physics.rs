//! Rigid-body model of a chain-driven elevator carriage.
//!
//! The carriage is a point mass lifted by brushed-DC-equivalent motors through the same sprocket
//! and reduction the hardware uses. Between steps the applied voltage is held constant, which makes
//! the velocity equation linear,
//!
//! ```text
//! dv/dt = A·v + B·V − g
//! A = −G²·Kt / (R·r²·m·Kv)      B = G·Kt / (R·r·m)
//! ```
//!
//! and it is integrated exactly. With coast selected and zero volts the windings are open: no
//! current flows, so neither term acts and the carriage falls freely.

use std::f64::consts::TAU;

use crate::config::SimConfig;
use crate::error::{ElevatorError, Result};
use crate::io::IdleMode;
use crate::mechanics::MechanicalConstants;

/// Standard gravity (m/s²)
pub const GRAVITY: f64 = 9.80665;

/// Electrical model of one or more identical motors driving a common shaft.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DcMotor {
    pub nominal_voltage: f64,
    /// Combined stall torque (N·m)
    pub stall_torque: f64,
    /// Combined stall current (A)
    pub stall_current: f64,
    /// Combined free current (A)
    pub free_current: f64,
    /// Free speed (rad/s)
    pub free_speed: f64,
    /// Winding resistance (Ω)
    pub resistance: f64,
    /// Speed constant (rad/s per V)
    pub kv: f64,
    /// Torque constant (N·m per A)
    pub kt: f64,
    pub count: usize,
}

impl DcMotor {
    /// Builds a gearbox of `count` motors from single-motor datasheet values.
    pub fn new(
        nominal_voltage: f64,
        stall_torque: f64,
        stall_current: f64,
        free_current: f64,
        free_speed: f64,
        count: usize,
    ) -> Self {
        let n = count as f64;
        let stall_torque = stall_torque * n;
        let stall_current = stall_current * n;
        let free_current = free_current * n;
        let resistance = nominal_voltage / stall_current;
        Self {
            nominal_voltage,
            stall_torque,
            stall_current,
            free_current,
            free_speed,
            resistance,
            kv: free_speed / (nominal_voltage - resistance * free_current),
            kt: stall_torque / stall_current,
            count,
        }
    }

    /// Kraken X60: 7.09 N·m stall, 366 A stall, 2 A free, 6000 rpm free.
    pub fn kraken_x60(count: usize) -> Self {
        Self::new(12.0, 7.09, 366.0, 2.0, 6000.0 / 60.0 * TAU, count)
    }

    /// Total winding current at `speed` (rad/s) under `voltage`.
    #[must_use]
    pub fn current(&self, speed: f64, voltage: f64) -> f64 {
        (voltage - speed / self.kv) / self.resistance
    }
}

/// Carriage state and the constants that move it.
#[derive(Debug, Clone)]
pub struct ElevatorPhysics {
    motor: DcMotor,
    mechanics: MechanicalConstants,
    mass: f64,
    min_height: f64,
    max_height: f64,
    gravity: f64,
    position: f64,
    velocity: f64,
    current: f64,
}

impl ElevatorPhysics {
    /// # Errors
    ///
    /// Returns `InvalidMechanism` for a non-positive mass, an empty height range or a starting
    /// height outside it.
    pub fn new(motor: DcMotor, mechanics: MechanicalConstants, sim: &SimConfig) -> Result<Self> {
        if !(sim.carriage_mass_kg.is_finite() && sim.carriage_mass_kg > 0.0) {
            return Err(ElevatorError::InvalidMechanism(format!(
                "carriage mass must be greater than 0, got {}",
                sim.carriage_mass_kg
            )));
        }
        if !(sim.min_height_m < sim.max_height_m) {
            return Err(ElevatorError::InvalidMechanism(
                "simulated min height must be below max height".to_string(),
            ));
        }
        if !(sim.min_height_m..=sim.max_height_m).contains(&sim.starting_height_m) {
            return Err(ElevatorError::InvalidMechanism(
                "simulated starting height is outside the travel range".to_string(),
            ));
        }

        Ok(Self {
            motor,
            mechanics,
            mass: sim.carriage_mass_kg,
            min_height: sim.min_height_m,
            max_height: sim.max_height_m,
            gravity: if sim.simulate_gravity { GRAVITY } else { 0.0 },
            position: sim.starting_height_m,
            velocity: 0.0,
            current: 0.0,
        })
    }

    /// Carriage height (m)
    #[must_use]
    pub fn position(&self) -> f64 {
        self.position
    }

    /// Carriage velocity (m/s)
    #[must_use]
    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    /// Total winding current of all motors (A)
    #[must_use]
    pub fn current(&self) -> f64 {
        self.current
    }

    #[must_use]
    pub fn motor(&self) -> &DcMotor {
        &self.motor
    }

    /// Motor shaft speed (rad/s) for the current carriage velocity.
    #[must_use]
    pub fn motor_speed(&self) -> f64 {
        self.mechanics.linear_velocity_to_motor_velocity(self.velocity) * TAU
    }

    /// Velocity coefficients `(A, B)` of the closed-winding model.
    fn coefficients(&self) -> (f64, f64) {
        let g = self.mechanics.reduction().ratio();
        let r = self.mechanics.sprocket().radius();
        let m = &self.motor;
        let a = -(g * g * m.kt) / (m.resistance * r * r * self.mass * m.kv);
        let b = (g * m.kt) / (m.resistance * r * self.mass);
        (a, b)
    }

    /// Advances the carriage by `dt` seconds with `voltage` held on the windings.
    pub fn advance(&mut self, voltage: f64, idle_mode: IdleMode, dt: f64) {
        let windings_open = voltage == 0.0 && idle_mode == IdleMode::Coast;
        let (a, b) = if windings_open { (0.0, 0.0) } else { self.coefficients() };
        let c = b * voltage - self.gravity;
        let v0 = self.velocity;

        if a == 0.0 {
            self.velocity = v0 + c * dt;
            self.position += v0 * dt + 0.5 * c * dt * dt;
        } else {
            let decay = (a * dt).exp();
            let terminal = -c / a;
            self.velocity = terminal + (v0 - terminal) * decay;
            self.position += terminal * dt + (v0 - terminal) * (decay - 1.0) / a;
        }

        // Hard stops
        if self.position <= self.min_height {
            self.position = self.min_height;
            self.velocity = self.velocity.max(0.0);
        } else if self.position >= self.max_height {
            self.position = self.max_height;
            self.velocity = self.velocity.min(0.0);
        }

        self.current = if windings_open {
            0.0
        } else {
            self.motor.current(self.motor_speed(), voltage)
        };
    }
}
