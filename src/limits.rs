//! # Travel Limits
//!
//! Soft limits on carriage displacement, enforced by the [`Elevator`](crate::elevator::Elevator)
//! before a setpoint reaches the I/O layer.

use crate::error::{ElevatorError, Result};

/// Closed range of allowed carriage displacement, in meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplacementLimits {
    minimum: f64,
    maximum: f64,
}

impl DisplacementLimits {
    /// # Errors
    ///
    /// Returns `InvalidMechanism` unless both bounds are finite and `maximum > minimum`.
    pub fn new(minimum: f64, maximum: f64) -> Result<Self> {
        if !minimum.is_finite() || !maximum.is_finite() {
            return Err(ElevatorError::InvalidMechanism(
                "displacement limits must be finite".to_string(),
            ));
        }
        if maximum <= minimum {
            return Err(ElevatorError::InvalidMechanism(format!(
                "maximum displacement ({}) must be greater than minimum ({})",
                maximum, minimum
            )));
        }
        Ok(Self { minimum, maximum })
    }

    #[must_use]
    pub fn minimum(&self) -> f64 {
        self.minimum
    }

    #[must_use]
    pub fn maximum(&self) -> f64 {
        self.maximum
    }

    /// Clamps `meters` into the limits. NaN maps to the minimum.
    #[must_use]
    pub fn coerce_in(&self, meters: f64) -> f64 {
        if meters.is_nan() {
            return self.minimum;
        }
        meters.clamp(self.minimum, self.maximum)
    }

    /// True when `meters` lies strictly between the bounds.
    #[must_use]
    pub fn contains(&self, meters: f64) -> bool {
        self.minimum < meters && meters < self.maximum
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_inverted_limits() {
        assert!(DisplacementLimits::new(1.0, 0.5).is_err());
        assert!(DisplacementLimits::new(1.0, 1.0).is_err());
    }

    #[test]
    fn test_rejects_non_finite_limits() {
        assert!(DisplacementLimits::new(f64::NAN, 1.0).is_err());
        assert!(DisplacementLimits::new(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_coerce_in() {
        let limits = DisplacementLimits::new(0.0127, 1.3208).unwrap();
        assert_eq!(limits.coerce_in(0.5), 0.5);
        assert_eq!(limits.coerce_in(-1.0), 0.0127);
        assert_eq!(limits.coerce_in(3.0), 1.3208);
        assert_eq!(limits.coerce_in(f64::NAN), 0.0127);
    }

    #[test]
    fn test_contains_is_exclusive() {
        let limits = DisplacementLimits::new(0.0, 1.0).unwrap();
        assert!(limits.contains(0.5));
        assert!(!limits.contains(0.0));
        assert!(!limits.contains(1.0));
        assert!(!limits.contains(1.5));
    }
}
