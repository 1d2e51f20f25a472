//! PID controller standing in for the motor controller's on-board position loop.

/// PID controller with output clamping and integral anti-windup.
#[derive(Debug, Clone)]
pub struct Pid {
    kp: f64,
    ki: f64,
    kd: f64,

    /// Integrator state, already scaled by `ki`
    integral: f64,
    /// Last process variable (for derivative term)
    prev_measurement: f64,

    out_min: f64,
    out_max: f64,

    int_min: f64,
    int_max: f64,

    first_update: bool,
}

impl Pid {
    /// Create a new PID controller with unbounded output.
    pub fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self {
            kp,
            ki,
            kd,
            integral: 0.0,
            prev_measurement: 0.0,
            out_min: f64::NEG_INFINITY,
            out_max: f64::INFINITY,
            int_min: f64::NEG_INFINITY,
            int_max: f64::INFINITY,
            first_update: true,
        }
    }

    /// Set output limits.
    pub fn with_output_limits(mut self, min: f64, max: f64) -> Self {
        self.out_min = min;
        self.out_max = max;
        self
    }

    /// Set integral limits for anti-windup.
    pub fn with_integral_limits(mut self, min: f64, max: f64) -> Self {
        self.int_min = min;
        self.int_max = max;
        self
    }

    /// Reset integrator + derivative history.
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.prev_measurement = 0.0;
        self.first_update = true;
    }

    /// Advance the controller by `dt` seconds.
    ///
    /// The derivative acts on the measurement, so setpoint steps do not kick the output.
    /// A non-finite setpoint or measurement yields zero and leaves the controller state alone.
    pub fn update(&mut self, setpoint: f64, measurement: f64, dt: f64) -> f64 {
        let error = setpoint - measurement;
        if !error.is_finite() {
            return 0.0;
        }

        let p = self.kp * error;

        self.integral = (self.integral + error * dt * self.ki).clamp(self.int_min, self.int_max);

        let d = if self.first_update || dt <= 0.0 {
            self.first_update = false;
            0.0
        } else {
            self.kd * (self.prev_measurement - measurement) / dt
        };
        self.prev_measurement = measurement;

        (p + self.integral + d).clamp(self.out_min, self.out_max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proportional_only() {
        let mut pid = Pid::new(2.0, 0.0, 0.0);
        assert_eq!(pid.update(10.0, 7.0, 0.001), 6.0);
    }

    #[test]
    fn test_output_is_clamped() {
        let mut pid = Pid::new(100.0, 0.0, 0.0).with_output_limits(-12.0, 12.0);
        assert_eq!(pid.update(1.0, 0.0, 0.001), 12.0);
        assert_eq!(pid.update(-1.0, 0.0, 0.001), -12.0);
    }

    #[test]
    fn test_integral_accumulates_and_is_limited() {
        let mut pid = Pid::new(0.0, 1.0, 0.0).with_integral_limits(-0.5, 0.5);
        pid.update(1.0, 0.0, 0.1);
        assert!((pid.update(1.0, 0.0, 0.1) - 0.2).abs() < 1e-12);
        for _ in 0..100 {
            pid.update(1.0, 0.0, 0.1);
        }
        assert_eq!(pid.update(1.0, 0.0, 0.1), 0.5);
    }

    #[test]
    fn test_derivative_skips_first_update() {
        let mut pid = Pid::new(0.0, 0.0, 1.0);
        assert_eq!(pid.update(0.0, 5.0, 0.1), 0.0);
        // Measurement rising by 1 over 0.1 s opposes the motion
        assert!((pid.update(0.0, 6.0, 0.1) - (-10.0)).abs() < 1e-9);
    }

    #[test]
    fn test_non_finite_setpoint_keeps_state() {
        let mut pid = Pid::new(1.0, 1.0, 0.0);
        pid.update(1.0, 0.0, 0.1);
        assert_eq!(pid.update(f64::NAN, 0.0, 0.1), 0.0);
        assert_eq!(pid.update(f64::INFINITY, 0.0, 0.1), 0.0);
        // Integral still holds the single finite step
        assert!((pid.update(1.0, 1.0, 0.1) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_reset_clears_history() {
        let mut pid = Pid::new(0.0, 1.0, 1.0);
        pid.update(1.0, 0.0, 0.1);
        pid.update(1.0, 0.5, 0.1);
        pid.reset();
        assert_eq!(pid.update(0.0, 0.0, 0.1), 0.0);
    }
}
