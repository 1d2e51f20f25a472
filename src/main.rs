//! # Elevator IO
//!
//! Runs the elevator control loop against the backend selected in the configuration.

use anyhow::{Context, Result};
use tokio::time::Duration;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use elevator_io::config::{Config, LoggingConfig, RobotMode};
use elevator_io::control_loop::{self, SetpointSchedule};
use elevator_io::elevator::Elevator;
use elevator_io::error::ElevatorError;
use elevator_io::io::replay::ElevatorIoReplay;
use elevator_io::io::sim::ElevatorIoSim;
use elevator_io::io::ElevatorIo;
use elevator_io::telemetry::TelemetryLogger;

/// Configuration file used when none is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Main entry point for Elevator IO
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration (first argument, or `config/default.toml`)
///    - Set up logging with tracing subscriber, plus a daily log file if configured
///    - Build the simulation or replay backend
///
/// 2. **Main Loop**
///    - Refresh and record the elevator snapshot every loop period
///    - Command the demo setpoints in turn
///    - Handle Ctrl+C for graceful shutdown
///
/// 3. **Graceful Shutdown**
///    - Stop and brake the elevator
///    - Flush telemetry
///
/// # Errors
///
/// Returns error if:
/// - The configuration cannot be loaded or is invalid
/// - The robot mode is `real` (no motor controller driver is linked into this binary)
/// - The backend or telemetry logger cannot be created
///
/// # Examples
///
/// ```bash
/// cargo run --release -- config/default.toml
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load configuration from {}", config_path))?;

    let _log_guard = init_logging(&config.logging);

    info!("Elevator IO v{} starting...", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded from {} ({:?} mode)", config_path, config.robot.mode);

    match config.robot.mode {
        RobotMode::Sim => {
            let io = ElevatorIoSim::from_config(&config)?;
            drive(io, &config).await
        }
        RobotMode::Replay => {
            let io = ElevatorIoReplay::from_config(&config)?;
            drive(io, &config).await
        }
        RobotMode::Real => {
            let err = ElevatorError::UnsupportedMode(
                "real hardware needs a motor controller driver; wire one into ElevatorIoHardware"
                    .to_string(),
            );
            error!("{}", err);
            Err(err.into())
        }
    }
}

/// Runs the control loop on `io` until Ctrl+C.
async fn drive<Io: ElevatorIo>(io: Io, config: &Config) -> Result<()> {
    let mut elevator = Elevator::new(io, config.limits()?);
    if config.telemetry.enabled {
        let logger = TelemetryLogger::from_config(&config.telemetry)?;
        elevator = elevator.with_telemetry(Box::new(logger));
    }

    let period = Duration::from_millis(config.robot.loop_period_ms);
    let schedule = SetpointSchedule::from_config(&config.robot);

    info!("Press Ctrl+C to exit");

    let cycles = control_loop::run(&mut elevator, period, schedule, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
        }
    })
    .await;

    info!("Elevator IO stopped after {} cycles", cycles);
    Ok(())
}

/// Console logging, plus a daily-rolling file when `file_log_dir` is set.
///
/// The returned guard must be held until exit so buffered file output is written.
fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    let registry = tracing_subscriber::registry().with(filter).with(fmt::layer());

    if config.file_log_dir.is_empty() {
        registry.init();
        return None;
    }

    let appender = tracing_appender::rolling::daily(&config.file_log_dir, "elevator-io.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    registry
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .init();
    Some(guard)
}
