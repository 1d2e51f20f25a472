//! Fixed-rate control loop driving an [`Elevator`] through a list of setpoints.

use std::future::Future;

use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::info;

use crate::config::RobotConfig;
use crate::elevator::Elevator;
use crate::io::ElevatorIo;

/// Cycles between status log messages
const LOG_INTERVAL_CYCLES: u64 = 250;

/// Setpoints visited in order, each held for a fixed number of cycles, wrapping around.
#[derive(Debug, Clone)]
pub struct SetpointSchedule {
    setpoints: Vec<f64>,
    hold_cycles: u64,
    index: usize,
    cycles_at_setpoint: u64,
}

impl SetpointSchedule {
    pub fn new(setpoints: Vec<f64>, hold: Duration, period: Duration) -> Self {
        let period_ms = period.as_millis().max(1);
        let hold_cycles = (hold.as_millis() / period_ms).max(1) as u64;
        Self { setpoints, hold_cycles, index: 0, cycles_at_setpoint: 0 }
    }

    pub fn from_config(robot: &RobotConfig) -> Self {
        Self::new(
            robot.demo_setpoints_m.clone(),
            Duration::from_millis(robot.demo_hold_ms),
            Duration::from_millis(robot.loop_period_ms),
        )
    }

    pub fn hold_cycles(&self) -> u64 {
        self.hold_cycles
    }

    /// Setpoint for this cycle, or `None` if the schedule is empty.
    pub fn tick(&mut self) -> Option<f64> {
        if self.setpoints.is_empty() {
            return None;
        }
        if self.cycles_at_setpoint >= self.hold_cycles {
            self.index = (self.index + 1) % self.setpoints.len();
            self.cycles_at_setpoint = 0;
        }
        self.cycles_at_setpoint += 1;
        self.setpoints.get(self.index).copied()
    }
}

/// One control cycle: refresh, then command.
pub fn cycle<Io: ElevatorIo>(elevator: &mut Elevator<Io>, schedule: &mut SetpointSchedule) {
    elevator.periodic();
    if let Some(target) = schedule.tick() {
        elevator.set_target_displacement(target);
    }
}

/// Runs cycles every `period` until `shutdown` completes, then stops and brakes the elevator.
///
/// Returns the number of cycles run.
pub async fn run<Io, F>(
    elevator: &mut Elevator<Io>,
    period: Duration,
    mut schedule: SetpointSchedule,
    shutdown: F,
) -> u64
where
    Io: ElevatorIo,
    F: Future<Output = ()>,
{
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    info!("Starting elevator control loop at {:?} period", period);

    let mut cycles: u64 = 0;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                cycle(elevator, &mut schedule);
                cycles += 1;

                if cycles % LOG_INTERVAL_CYCLES == 0 {
                    let inputs = elevator.inputs();
                    info!(
                        "Elevator at {:.3} m (target {:.3} m, {:.2} V) after {} cycles",
                        inputs.elevator_displacement,
                        inputs.elevator_target_displacement,
                        inputs.lead_motor_output_voltage,
                        cycles
                    );
                }
            }

            _ = &mut shutdown => {
                info!("Shutdown requested after {} cycles", cycles);
                break;
            }
        }
    }

    elevator.stop();
    elevator.brake();
    elevator.periodic();
    elevator.flush_telemetry();
    info!("Elevator stopped and braked");

    cycles
}
