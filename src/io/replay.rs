//! # Replay Backend
//!
//! [`ElevatorIo`] over recorded telemetry. Each refresh restores the next recorded frame into the
//! snapshot, so the control loop and any analysis downstream see exactly what was logged.
//!
//! Commands cannot change the past and are ignored. Once the recording runs out the snapshot
//! holds the last frame.

use std::path::Path;

use tracing::{debug, info, warn};

use super::inputs::ElevatorInputs;
use super::{ElevatorIo, IdleMode};
use crate::config::Config;
use crate::elevator::TABLE;
use crate::error::{ElevatorError, Result};
use crate::mechanics::{voltage_to_power, MechanicalConstants};
use crate::telemetry::{TelemetryFrame, TelemetryReader};

/// Elevator played back from recorded frames.
#[derive(Debug)]
pub struct ElevatorIoReplay {
    frames: Vec<TelemetryFrame>,
    next: usize,
    current: ElevatorInputs,
    idle_mode: IdleMode,
    finished_logged: bool,
}

impl ElevatorIoReplay {
    /// # Errors
    ///
    /// Returns `Replay` if there are no frames, or if any frame records a field in a different
    /// unit than this build logs it in.
    pub fn new(frames: Vec<TelemetryFrame>, mechanics: MechanicalConstants) -> Result<Self> {
        if frames.is_empty() {
            return Err(ElevatorError::Replay("recording holds no elevator frames".to_string()));
        }

        let current = ElevatorInputs::new(mechanics);
        for frame in &frames {
            frame.check_units(&current)?;
        }

        info!("Replaying {} elevator frames", frames.len());
        Ok(Self {
            frames,
            next: 0,
            current,
            idle_mode: IdleMode::Brake,
            finished_logged: false,
        })
    }

    /// Reads the elevator frames of a telemetry file or directory.
    ///
    /// # Errors
    ///
    /// Returns `Io` or `Replay` if the recording cannot be read or holds no elevator frames.
    pub fn open<P: AsRef<Path>>(path: P, mechanics: MechanicalConstants) -> Result<Self> {
        let frames: Vec<TelemetryFrame> = TelemetryReader::open(path)?
            .read_all()?
            .into_iter()
            .filter(|frame| frame.table == TABLE)
            .collect();
        Self::new(frames, mechanics)
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::open(&config.telemetry.replay_path, config.mechanics()?)
    }

    /// Frames not yet restored.
    pub fn remaining(&self) -> usize {
        self.frames.len() - self.next
    }

    pub fn is_finished(&self) -> bool {
        self.remaining() == 0
    }
}

impl ElevatorIo for ElevatorIoReplay {
    fn update_inputs(&mut self, inputs: &mut ElevatorInputs) {
        if let Some(frame) = self.frames.get(self.next) {
            self.next += 1;
            if let Err(e) = self.current.restore_from(&frame.values) {
                warn!("Skipping replay frame {}: {}", frame.cycle, e);
            }
        } else if !self.finished_logged {
            info!("Replay finished; holding last frame");
            self.finished_logged = true;
        }
        inputs.clone_from(&self.current);
    }

    fn mechanics(&self) -> MechanicalConstants {
        *self.current.mechanics()
    }

    fn set_voltage(&mut self, volts: f64) {
        debug!("Replay ignores voltage request ({:.2} V)", volts);
    }

    fn set_target_displacement(&mut self, meters: f64) {
        debug!("Replay ignores target request ({:.3} m)", meters);
    }

    fn motor_position(&self) -> f64 {
        self.current.lead_motor_position()
    }

    fn motor_velocity(&self) -> f64 {
        self.current.lead_motor_velocity
    }

    fn motor_power(&self) -> f64 {
        voltage_to_power(self.current.lead_motor_output_voltage)
    }

    fn coast_motors(&mut self) {
        self.idle_mode = IdleMode::Coast;
    }

    fn brake_motors(&mut self) {
        self.idle_mode = IdleMode::Brake;
    }

    fn idle_mode(&self) -> IdleMode {
        self.idle_mode
    }
}
