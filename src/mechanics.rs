//! # Mechanics Module
//!
//! Fixed arithmetic between the elevator carriage and its motors.
//!
//! The carriage is driven by a chain wrapped around a sprocket; the sprocket is driven by the lead
//! motor through a gear reduction. One motor rotation therefore moves the carriage by
//! `2π · radius / reduction` meters:
//!
//! ```text
//! motor_rotations = displacement / (radius · 2π) · reduction
//! ```
//!
//! The voltage bounds live here as well so every backend (hardware, simulation, replay) clamps
//! against the same numbers.
//!
//! ## Usage
//!
//! ```
//! use elevator_io::mechanics::MechanicalConstants;
//!
//! let mechanics = MechanicalConstants::new(0.025, 12.0)?;
//! let rotations = mechanics.displacement_to_motor_rotations(0.30);
//! assert!((rotations - 22.918).abs() < 0.001);
//! # Ok::<(), elevator_io::error::ElevatorError>(())
//! ```

use std::f64::consts::TAU;

use crate::error::{ElevatorError, Result};

/// Lowest voltage any backend will ever apply.
pub const MIN_VOLTAGE: f64 = -12.0;

/// Highest voltage any backend will ever apply.
pub const MAX_VOLTAGE: f64 = 12.0;

/// Clamps a requested voltage into `[MIN_VOLTAGE, MAX_VOLTAGE]`.
///
/// NaN maps to 0 V.
///
/// # Examples
///
/// ```
/// use elevator_io::mechanics::clamp_voltage;
///
/// assert_eq!(clamp_voltage(15.0), 12.0);
/// assert_eq!(clamp_voltage(-13.5), -12.0);
/// assert_eq!(clamp_voltage(f64::NAN), 0.0);
/// ```
#[must_use]
pub fn clamp_voltage(volts: f64) -> f64 {
    if volts.is_nan() {
        return 0.0;
    }
    volts.clamp(MIN_VOLTAGE, MAX_VOLTAGE)
}

/// Normalized power in `[-1.0, 1.0]` for an output voltage.
#[must_use]
pub fn voltage_to_power(volts: f64) -> f64 {
    if volts.is_nan() {
        return 0.0;
    }
    (volts / MAX_VOLTAGE).clamp(-1.0, 1.0)
}

/// Sprocket converting rotation into linear chain travel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sprocket {
    radius: f64,
}

impl Sprocket {
    /// Creates a sprocket from its pitch radius in meters.
    ///
    /// # Errors
    ///
    /// Returns `InvalidMechanism` if the radius is not a finite, strictly positive number.
    pub fn from_radius(radius: f64) -> Result<Self> {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(ElevatorError::InvalidMechanism(format!(
                "sprocket radius must be finite and greater than 0, got {}",
                radius
            )));
        }
        Ok(Self { radius })
    }

    /// Pitch radius in meters.
    #[must_use]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Chain travel per sprocket rotation, in meters.
    #[must_use]
    pub fn circumference(&self) -> f64 {
        self.radius * TAU
    }

    /// Sprocket rotations needed to travel `meters`.
    #[must_use]
    pub fn linear_to_rotations(&self, meters: f64) -> f64 {
        meters / self.circumference()
    }

    /// Chain travel produced by `rotations` of the sprocket.
    #[must_use]
    pub fn rotations_to_linear(&self, rotations: f64) -> f64 {
        rotations * self.circumference()
    }
}

/// Gear reduction between the motor shaft and the sprocket.
///
/// A ratio of 12.0 means 12 motor rotations per sprocket rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reduction {
    ratio: f64,
}

impl Reduction {
    /// # Errors
    ///
    /// Returns `InvalidMechanism` if the ratio is not a finite, strictly positive number.
    pub fn new(ratio: f64) -> Result<Self> {
        if !ratio.is_finite() || ratio <= 0.0 {
            return Err(ElevatorError::InvalidMechanism(format!(
                "gear reduction must be finite and greater than 0, got {}",
                ratio
            )));
        }
        Ok(Self { ratio })
    }

    #[must_use]
    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    /// Motor-side value for a mechanism-side value.
    #[must_use]
    pub fn to_motor(&self, mechanism: f64) -> f64 {
        mechanism * self.ratio
    }

    /// Mechanism-side value for a motor-side value.
    #[must_use]
    pub fn to_mechanism(&self, motor: f64) -> f64 {
        motor / self.ratio
    }
}

/// Sprocket and reduction of one elevator, fixed for its lifetime.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MechanicalConstants {
    sprocket: Sprocket,
    reduction: Reduction,
}

impl MechanicalConstants {
    /// Builds the transform from a sprocket radius (m) and a gear reduction ratio.
    ///
    /// # Errors
    ///
    /// Returns `InvalidMechanism` for zero, negative or non-finite values.
    pub fn new(sprocket_radius: f64, gear_reduction: f64) -> Result<Self> {
        Ok(Self {
            sprocket: Sprocket::from_radius(sprocket_radius)?,
            reduction: Reduction::new(gear_reduction)?,
        })
    }

    #[must_use]
    pub fn sprocket(&self) -> Sprocket {
        self.sprocket
    }

    #[must_use]
    pub fn reduction(&self) -> Reduction {
        self.reduction
    }

    /// Motor rotations corresponding to a carriage displacement in meters.
    #[must_use]
    pub fn displacement_to_motor_rotations(&self, meters: f64) -> f64 {
        self.reduction.to_motor(self.sprocket.linear_to_rotations(meters))
    }

    /// Carriage displacement in meters corresponding to motor rotations.
    #[must_use]
    pub fn motor_rotations_to_displacement(&self, rotations: f64) -> f64 {
        self.sprocket.rotations_to_linear(self.reduction.to_mechanism(rotations))
    }

    /// Motor rotations per second for a carriage speed in meters per second.
    #[must_use]
    pub fn linear_velocity_to_motor_velocity(&self, meters_per_second: f64) -> f64 {
        self.displacement_to_motor_rotations(meters_per_second)
    }

    /// Carriage speed in meters per second for a motor speed in rotations per second.
    #[must_use]
    pub fn motor_velocity_to_linear_velocity(&self, rotations_per_second: f64) -> f64 {
        self.motor_rotations_to_displacement(rotations_per_second)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_voltage_clamp_bounds() {
        assert_eq!(MIN_VOLTAGE, -12.0);
        assert_eq!(MAX_VOLTAGE, 12.0);
    }

    #[test]
    fn test_clamp_voltage_matches_clamp_for_any_input() {
        let requests = [-1000.0, -12.5, -12.0, -3.3, 0.0, 0.5, 11.99, 12.0, 15.0, 1e9];
        for &v in &requests {
            let applied = clamp_voltage(v);
            assert!((MIN_VOLTAGE..=MAX_VOLTAGE).contains(&applied), "{} escaped bounds", v);
            assert_eq!(applied, v.clamp(-12.0, 12.0));
        }
    }

    #[test]
    fn test_clamp_voltage_infinities_and_nan() {
        assert_eq!(clamp_voltage(f64::INFINITY), 12.0);
        assert_eq!(clamp_voltage(f64::NEG_INFINITY), -12.0);
        assert_eq!(clamp_voltage(f64::NAN), 0.0);
    }

    #[test]
    fn test_voltage_to_power() {
        assert_eq!(voltage_to_power(12.0), 1.0);
        assert_eq!(voltage_to_power(-6.0), -0.5);
        assert_eq!(voltage_to_power(0.0), 0.0);
        assert_eq!(voltage_to_power(24.0), 1.0);
        assert_eq!(voltage_to_power(-24.0), -1.0);
        assert_eq!(voltage_to_power(f64::NAN), 0.0);
    }

    #[test]
    fn test_sprocket_rejects_invalid_radius() {
        assert!(Sprocket::from_radius(0.0).is_err());
        assert!(Sprocket::from_radius(-0.02).is_err());
        assert!(Sprocket::from_radius(f64::NAN).is_err());
        assert!(Sprocket::from_radius(f64::INFINITY).is_err());
    }

    #[test]
    fn test_reduction_rejects_invalid_ratio() {
        assert!(Reduction::new(0.0).is_err());
        assert!(Reduction::new(-5.0).is_err());
        assert!(Reduction::new(f64::NAN).is_err());
    }

    #[test]
    fn test_invalid_mechanism_error_message() {
        match MechanicalConstants::new(0.0, 12.0) {
            Err(ElevatorError::InvalidMechanism(msg)) => assert!(msg.contains("sprocket radius")),
            other => panic!("Expected InvalidMechanism, got: {:?}", other),
        }
        match MechanicalConstants::new(0.025, 0.0) {
            Err(ElevatorError::InvalidMechanism(msg)) => assert!(msg.contains("gear reduction")),
            other => panic!("Expected InvalidMechanism, got: {:?}", other),
        }
    }

    #[test]
    fn test_sprocket_circumference() {
        let sprocket = Sprocket::from_radius(0.5).unwrap();
        assert!((sprocket.circumference() - std::f64::consts::PI).abs() < EPSILON);
        assert!((sprocket.linear_to_rotations(std::f64::consts::PI) - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_scenario_target_rotations() {
        // 0.30 m on a 0.025 m sprocket behind a 12:1 reduction
        let mechanics = MechanicalConstants::new(0.025, 12.0).unwrap();
        let expected = 0.30 / (0.025 * TAU) * 12.0;
        let rotations = mechanics.displacement_to_motor_rotations(0.30);
        assert!((rotations - expected).abs() < EPSILON);
        assert!((rotations - 22.92).abs() < 0.01);
    }

    #[test]
    fn test_displacement_round_trip() {
        let mechanics = MechanicalConstants::new(0.0508, 9.0).unwrap();
        for &d in &[0.0, 0.0127, 0.3, 1.3208, -0.25, 2.5] {
            let back = mechanics
                .motor_rotations_to_displacement(mechanics.displacement_to_motor_rotations(d));
            assert!((back - d).abs() < EPSILON, "{} came back as {}", d, back);
        }
    }

    #[test]
    fn test_velocity_conversion_is_linear() {
        let mechanics = MechanicalConstants::new(0.025, 12.0).unwrap();
        let rps = mechanics.linear_velocity_to_motor_velocity(1.0);
        assert!((rps - 12.0 / (0.025 * TAU)).abs() < EPSILON);
        assert!((mechanics.motor_velocity_to_linear_velocity(rps) - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_unity_reduction() {
        let mechanics = MechanicalConstants::new(1.0 / TAU, 1.0).unwrap();
        assert!((mechanics.displacement_to_motor_rotations(1.0) - 1.0).abs() < EPSILON);
    }
}
