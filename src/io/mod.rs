//! # Elevator I/O Module
//!
//! The contract between the elevator control loop and whatever moves the carriage.
//!
//! This module handles:
//! - The [`ElevatorIo`] capability trait every backend implements
//! - The per-cycle telemetry snapshot ([`inputs::ElevatorInputs`])
//! - The motor-controller driver seam ([`motor::MotorController`])
//! - Hardware, simulation and replay backends
//! - Serialized access for backends shared between tasks ([`SharedIo`])
//!
//! Backends only carry out orders. Limits, alerts and logging live in
//! [`Elevator`](crate::elevator::Elevator).

pub mod hardware;
pub mod inputs;
pub mod motor;
pub mod replay;
pub mod sim;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use inputs::ElevatorInputs;

use crate::mechanics::MechanicalConstants;

/// Behavior of both motors when no voltage is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdleMode {
    /// Motors free-spin; the carriage can be moved by hand.
    Coast,
    /// Motors resist motion; the carriage holds against gravity.
    #[default]
    Brake,
}

/// Capability interface between the elevator control loop and an actuator backend.
///
/// One control cycle calls [`update_inputs`](Self::update_inputs) first, then at most one of
/// [`set_voltage`](Self::set_voltage), [`set_target_displacement`](Self::set_target_displacement)
/// or [`stop`](Self::stop), then optionally an idle-mode change.
///
/// No method fails: a motor that does not answer shows up as a cleared connectivity flag in the
/// snapshot, and a command that cannot be delivered is logged and dropped.
pub trait ElevatorIo {
    /// Sprocket and reduction this backend converts between carriage and motor units with.
    ///
    /// The snapshot derives its rotational fields from the same constants, so logged motor
    /// positions always agree with what the backend commands and reports.
    fn mechanics(&self) -> MechanicalConstants;

    /// Refreshes every field of `inputs` from the backend.
    ///
    /// A motor whose signals cannot be read gets its connectivity flag cleared and keeps its other
    /// fields at their last-known values.
    fn update_inputs(&mut self, inputs: &mut ElevatorInputs);

    /// Applies `volts` to the lead motor; the follower mirrors it.
    ///
    /// Implementations clamp to `[-12, 12]` before applying, whatever the caller passes.
    fn set_voltage(&mut self, volts: f64);

    /// Hands a carriage target (m) to the actuator's own position loop.
    fn set_target_displacement(&mut self, meters: f64);

    /// Neutral output. Zero volts unless the backend knows better.
    fn stop(&mut self) {
        self.set_voltage(0.0);
    }

    /// Lead motor position (rot) as of the last refresh.
    fn motor_position(&self) -> f64;

    /// Lead motor velocity (rot/s) as of the last refresh.
    fn motor_velocity(&self) -> f64;

    /// Lead motor output as a fraction of 12 V, in `[-1, 1]`, as of the last refresh.
    fn motor_power(&self) -> f64;

    /// Switches both motors to [`IdleMode::Coast`].
    fn coast_motors(&mut self);

    /// Switches both motors to [`IdleMode::Brake`].
    fn brake_motors(&mut self);

    /// Idle mode most recently requested. [`IdleMode::Brake`] after construction.
    fn idle_mode(&self) -> IdleMode;
}

/// Backend shared between tasks.
///
/// Every call locks the backend, so a refresh running on one task can never interleave with a
/// command issued from another.
///
/// # Examples
///
/// ```
/// use elevator_io::io::{ElevatorIo, SharedIo};
/// use elevator_io::io::sim::ElevatorIoSim;
/// use elevator_io::config::Config;
///
/// let io = SharedIo::new(ElevatorIoSim::from_config(&Config::default())?);
/// let commands = io.clone();
///
/// std::thread::spawn(move || {
///     let mut commands = commands;
///     commands.set_voltage(3.0);
/// })
/// .join()
/// .unwrap();
/// # Ok::<(), elevator_io::error::ElevatorError>(())
/// ```
pub struct SharedIo<T> {
    inner: Arc<Mutex<T>>,
}

impl<T> Clone for SharedIo<T> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<T> SharedIo<T> {
    pub fn new(io: T) -> Self {
        Self { inner: Arc::new(Mutex::new(io)) }
    }

    /// Locks the backend. A panic on another task does not leave it unusable.
    pub fn lock(&self) -> MutexGuard<'_, T> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: ElevatorIo> ElevatorIo for SharedIo<T> {
    fn mechanics(&self) -> MechanicalConstants {
        self.lock().mechanics()
    }

    fn update_inputs(&mut self, inputs: &mut ElevatorInputs) {
        self.lock().update_inputs(inputs);
    }

    fn set_voltage(&mut self, volts: f64) {
        self.lock().set_voltage(volts);
    }

    fn set_target_displacement(&mut self, meters: f64) {
        self.lock().set_target_displacement(meters);
    }

    fn stop(&mut self) {
        self.lock().stop();
    }

    fn motor_position(&self) -> f64 {
        self.lock().motor_position()
    }

    fn motor_velocity(&self) -> f64 {
        self.lock().motor_velocity()
    }

    fn motor_power(&self) -> f64 {
        self.lock().motor_power()
    }

    fn coast_motors(&mut self) {
        self.lock().coast_motors();
    }

    fn brake_motors(&mut self) {
        self.lock().brake_motors();
    }

    fn idle_mode(&self) -> IdleMode {
        self.lock().idle_mode()
    }
}
